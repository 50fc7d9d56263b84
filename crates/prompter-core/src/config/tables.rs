use super::defaults;
use super::models::{FollowStrategy, LogLevel, PrompterConfig};
use serde::Deserialize;

/// On-disk shape of the config file: one TOML table per concern.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    scroll: ScrollTable,
    #[serde(default)]
    voice: VoiceTable,
    #[serde(default)]
    alignment: AlignmentTable,
    #[serde(default)]
    layout: LayoutTable,
    #[serde(default)]
    recognition: RecognitionTable,
    #[serde(default)]
    logging: LoggingTable,
}

impl From<ConfigTables> for PrompterConfig {
    fn from(tables: ConfigTables) -> Self {
        PrompterConfig {
            base_velocity: tables.scroll.base_velocity,
            autoplay_speed_factor: tables.scroll.autoplay_speed_factor,
            scroll_blend: tables.scroll.scroll_blend,
            settle_threshold_px: tables.scroll.settle_threshold_px,
            drag_threshold_px: tables.scroll.drag_threshold_px,
            calibration_events_per_second: tables.voice.calibration_events_per_second,
            max_multiplier: tables.voice.max_multiplier,
            min_multiplier: tables.voice.min_multiplier,
            resume_multiplier: tables.voice.resume_multiplier,
            resume_nudge: tables.voice.resume_nudge,
            multiplier_blend: tables.voice.multiplier_blend,
            multiplier_snap_epsilon: tables.voice.multiplier_snap_epsilon,
            rate_window_ms: tables.voice.rate_window_ms,
            rate_span_floor_ms: tables.voice.rate_span_floor_ms,
            silence_timeout_ms: tables.recognition.silence_timeout_ms,
            reading_line_fraction: tables.alignment.reading_line_fraction,
            lookahead_tokens: tables.alignment.lookahead_tokens,
            highlight_ms: tables.alignment.highlight_ms,
            follow_strategy: tables.recognition.follow_strategy,
            language: tables.recognition.language,
            font_size: tables.layout.font_size,
            line_spacing: tables.layout.line_spacing,
            content_width_px: tables.layout.content_width_px,
            paragraph_gap_lines: tables.layout.paragraph_gap_lines,
            top_padding_px: tables.layout.top_padding_px,
            viewport_height_px: tables.layout.viewport_height_px,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&PrompterConfig> for ConfigTables {
    fn from(config: &PrompterConfig) -> Self {
        ConfigTables {
            scroll: ScrollTable {
                base_velocity: config.base_velocity,
                autoplay_speed_factor: config.autoplay_speed_factor,
                scroll_blend: config.scroll_blend,
                settle_threshold_px: config.settle_threshold_px,
                drag_threshold_px: config.drag_threshold_px,
            },
            voice: VoiceTable {
                calibration_events_per_second: config.calibration_events_per_second,
                max_multiplier: config.max_multiplier,
                min_multiplier: config.min_multiplier,
                resume_multiplier: config.resume_multiplier,
                resume_nudge: config.resume_nudge,
                multiplier_blend: config.multiplier_blend,
                multiplier_snap_epsilon: config.multiplier_snap_epsilon,
                rate_window_ms: config.rate_window_ms,
                rate_span_floor_ms: config.rate_span_floor_ms,
            },
            alignment: AlignmentTable {
                reading_line_fraction: config.reading_line_fraction,
                lookahead_tokens: config.lookahead_tokens,
                highlight_ms: config.highlight_ms,
            },
            layout: LayoutTable {
                font_size: config.font_size,
                line_spacing: config.line_spacing,
                content_width_px: config.content_width_px,
                paragraph_gap_lines: config.paragraph_gap_lines,
                top_padding_px: config.top_padding_px,
                viewport_height_px: config.viewport_height_px,
            },
            recognition: RecognitionTable {
                follow_strategy: config.follow_strategy,
                language: config.language.clone(),
                silence_timeout_ms: config.silence_timeout_ms,
            },
            logging: LoggingTable {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ScrollTable {
    #[serde(default = "defaults::default_base_velocity")]
    base_velocity: f32,
    #[serde(default = "defaults::default_autoplay_speed_factor")]
    autoplay_speed_factor: f32,
    #[serde(default = "defaults::default_scroll_blend")]
    scroll_blend: f32,
    #[serde(default = "defaults::default_settle_threshold_px")]
    settle_threshold_px: f32,
    #[serde(default = "defaults::default_drag_threshold_px")]
    drag_threshold_px: f32,
}

impl Default for ScrollTable {
    fn default() -> Self {
        ScrollTable {
            base_velocity: defaults::default_base_velocity(),
            autoplay_speed_factor: defaults::default_autoplay_speed_factor(),
            scroll_blend: defaults::default_scroll_blend(),
            settle_threshold_px: defaults::default_settle_threshold_px(),
            drag_threshold_px: defaults::default_drag_threshold_px(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct VoiceTable {
    #[serde(default = "defaults::default_calibration_events_per_second")]
    calibration_events_per_second: f32,
    #[serde(default = "defaults::default_max_multiplier")]
    max_multiplier: f32,
    #[serde(default = "defaults::default_min_multiplier")]
    min_multiplier: f32,
    #[serde(default = "defaults::default_resume_multiplier")]
    resume_multiplier: f32,
    #[serde(default = "defaults::default_resume_nudge")]
    resume_nudge: f32,
    #[serde(default = "defaults::default_multiplier_blend")]
    multiplier_blend: f32,
    #[serde(default = "defaults::default_multiplier_snap_epsilon")]
    multiplier_snap_epsilon: f32,
    #[serde(default = "defaults::default_rate_window_ms")]
    rate_window_ms: u64,
    #[serde(default = "defaults::default_rate_span_floor_ms")]
    rate_span_floor_ms: u64,
}

impl Default for VoiceTable {
    fn default() -> Self {
        VoiceTable {
            calibration_events_per_second: defaults::default_calibration_events_per_second(),
            max_multiplier: defaults::default_max_multiplier(),
            min_multiplier: defaults::default_min_multiplier(),
            resume_multiplier: defaults::default_resume_multiplier(),
            resume_nudge: defaults::default_resume_nudge(),
            multiplier_blend: defaults::default_multiplier_blend(),
            multiplier_snap_epsilon: defaults::default_multiplier_snap_epsilon(),
            rate_window_ms: defaults::default_rate_window_ms(),
            rate_span_floor_ms: defaults::default_rate_span_floor_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AlignmentTable {
    #[serde(default = "defaults::default_reading_line_fraction")]
    reading_line_fraction: f32,
    #[serde(default = "defaults::default_lookahead_tokens")]
    lookahead_tokens: usize,
    #[serde(default = "defaults::default_highlight_ms")]
    highlight_ms: u64,
}

impl Default for AlignmentTable {
    fn default() -> Self {
        AlignmentTable {
            reading_line_fraction: defaults::default_reading_line_fraction(),
            lookahead_tokens: defaults::default_lookahead_tokens(),
            highlight_ms: defaults::default_highlight_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LayoutTable {
    #[serde(default = "defaults::default_font_size")]
    font_size: f32,
    #[serde(default = "defaults::default_line_spacing")]
    line_spacing: f32,
    #[serde(default = "defaults::default_content_width_px")]
    content_width_px: f32,
    #[serde(default = "defaults::default_paragraph_gap_lines")]
    paragraph_gap_lines: f32,
    #[serde(default = "defaults::default_top_padding_px")]
    top_padding_px: f32,
    #[serde(default = "defaults::default_viewport_height_px")]
    viewport_height_px: f32,
}

impl Default for LayoutTable {
    fn default() -> Self {
        LayoutTable {
            font_size: defaults::default_font_size(),
            line_spacing: defaults::default_line_spacing(),
            content_width_px: defaults::default_content_width_px(),
            paragraph_gap_lines: defaults::default_paragraph_gap_lines(),
            top_padding_px: defaults::default_top_padding_px(),
            viewport_height_px: defaults::default_viewport_height_px(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct RecognitionTable {
    #[serde(default = "defaults::default_follow_strategy")]
    follow_strategy: FollowStrategy,
    #[serde(default = "defaults::default_language")]
    language: String,
    #[serde(default = "defaults::default_silence_timeout_ms")]
    silence_timeout_ms: u64,
}

impl Default for RecognitionTable {
    fn default() -> Self {
        RecognitionTable {
            follow_strategy: defaults::default_follow_strategy(),
            language: defaults::default_language(),
            silence_timeout_ms: defaults::default_silence_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingTable {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingTable {
    fn default() -> Self {
        LoggingTable {
            log_level: defaults::default_log_level(),
        }
    }
}
