use crate::aligner::AlignmentConfig;
use crate::controller::ControllerConfig;
use crate::layout::LayoutMetrics;
use crate::voice_activity::VoiceActivityConfig;
use serde::Deserialize;
use std::time::Duration;
use ts_rs::TS;

use super::defaults;

/// Flat prompter configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct PrompterConfig {
    #[serde(default = "crate::config::defaults::default_base_velocity")]
    pub base_velocity: f32,
    #[serde(default = "crate::config::defaults::default_autoplay_speed_factor")]
    pub autoplay_speed_factor: f32,
    #[serde(default = "crate::config::defaults::default_scroll_blend")]
    pub scroll_blend: f32,
    #[serde(default = "crate::config::defaults::default_settle_threshold_px")]
    pub settle_threshold_px: f32,
    #[serde(default = "crate::config::defaults::default_drag_threshold_px")]
    pub drag_threshold_px: f32,
    #[serde(default = "crate::config::defaults::default_calibration_events_per_second")]
    pub calibration_events_per_second: f32,
    #[serde(default = "crate::config::defaults::default_max_multiplier")]
    pub max_multiplier: f32,
    #[serde(default = "crate::config::defaults::default_min_multiplier")]
    pub min_multiplier: f32,
    #[serde(default = "crate::config::defaults::default_resume_multiplier")]
    pub resume_multiplier: f32,
    #[serde(default = "crate::config::defaults::default_resume_nudge")]
    pub resume_nudge: f32,
    #[serde(default = "crate::config::defaults::default_multiplier_blend")]
    pub multiplier_blend: f32,
    #[serde(default = "crate::config::defaults::default_multiplier_snap_epsilon")]
    pub multiplier_snap_epsilon: f32,
    #[serde(default = "crate::config::defaults::default_rate_window_ms")]
    pub rate_window_ms: u64,
    #[serde(default = "crate::config::defaults::default_rate_span_floor_ms")]
    pub rate_span_floor_ms: u64,
    #[serde(default = "crate::config::defaults::default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,
    #[serde(default = "crate::config::defaults::default_reading_line_fraction")]
    pub reading_line_fraction: f32,
    #[serde(default = "crate::config::defaults::default_lookahead_tokens")]
    pub lookahead_tokens: usize,
    #[serde(default = "crate::config::defaults::default_highlight_ms")]
    pub highlight_ms: u64,
    #[serde(default = "crate::config::defaults::default_follow_strategy")]
    pub follow_strategy: FollowStrategy,
    #[serde(default = "crate::config::defaults::default_language")]
    pub language: String,
    #[serde(default = "crate::config::defaults::default_font_size")]
    pub font_size: f32,
    #[serde(default = "crate::config::defaults::default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "crate::config::defaults::default_content_width_px")]
    pub content_width_px: f32,
    #[serde(default = "crate::config::defaults::default_paragraph_gap_lines")]
    pub paragraph_gap_lines: f32,
    #[serde(default = "crate::config::defaults::default_top_padding_px")]
    pub top_padding_px: f32,
    #[serde(default = "crate::config::defaults::default_viewport_height_px")]
    pub viewport_height_px: f32,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for PrompterConfig {
    fn default() -> Self {
        PrompterConfig {
            base_velocity: defaults::default_base_velocity(),
            autoplay_speed_factor: defaults::default_autoplay_speed_factor(),
            scroll_blend: defaults::default_scroll_blend(),
            settle_threshold_px: defaults::default_settle_threshold_px(),
            drag_threshold_px: defaults::default_drag_threshold_px(),
            calibration_events_per_second: defaults::default_calibration_events_per_second(),
            max_multiplier: defaults::default_max_multiplier(),
            min_multiplier: defaults::default_min_multiplier(),
            resume_multiplier: defaults::default_resume_multiplier(),
            resume_nudge: defaults::default_resume_nudge(),
            multiplier_blend: defaults::default_multiplier_blend(),
            multiplier_snap_epsilon: defaults::default_multiplier_snap_epsilon(),
            rate_window_ms: defaults::default_rate_window_ms(),
            rate_span_floor_ms: defaults::default_rate_span_floor_ms(),
            silence_timeout_ms: defaults::default_silence_timeout_ms(),
            reading_line_fraction: defaults::default_reading_line_fraction(),
            lookahead_tokens: defaults::default_lookahead_tokens(),
            highlight_ms: defaults::default_highlight_ms(),
            follow_strategy: defaults::default_follow_strategy(),
            language: defaults::default_language(),
            font_size: defaults::default_font_size(),
            line_spacing: defaults::default_line_spacing(),
            content_width_px: defaults::default_content_width_px(),
            paragraph_gap_lines: defaults::default_paragraph_gap_lines(),
            top_padding_px: defaults::default_top_padding_px(),
            viewport_height_px: defaults::default_viewport_height_px(),
            log_level: defaults::default_log_level(),
        }
    }
}

fn clamp_or(value: f32, fallback: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl PrompterConfig {
    /// Copy with every value forced into a usable range. Non-finite floats
    /// fall back to their defaults.
    pub fn sanitized(&self) -> Self {
        let mut cfg = self.clone();
        cfg.base_velocity = clamp_or(cfg.base_velocity, defaults::default_base_velocity(), 0.0, 2000.0);
        cfg.autoplay_speed_factor = clamp_or(
            cfg.autoplay_speed_factor,
            defaults::default_autoplay_speed_factor(),
            0.0,
            10.0,
        );
        cfg.scroll_blend = clamp_or(cfg.scroll_blend, defaults::default_scroll_blend(), 0.001, 0.999);
        cfg.settle_threshold_px = clamp_or(
            cfg.settle_threshold_px,
            defaults::default_settle_threshold_px(),
            0.0,
            50.0,
        );
        cfg.drag_threshold_px = clamp_or(
            cfg.drag_threshold_px,
            defaults::default_drag_threshold_px(),
            0.0,
            200.0,
        );
        cfg.calibration_events_per_second = clamp_or(
            cfg.calibration_events_per_second,
            defaults::default_calibration_events_per_second(),
            0.1,
            100.0,
        );
        cfg.max_multiplier = clamp_or(cfg.max_multiplier, defaults::default_max_multiplier(), 0.1, 10.0);
        cfg.min_multiplier = clamp_or(
            cfg.min_multiplier,
            defaults::default_min_multiplier(),
            0.0,
            cfg.max_multiplier,
        );
        cfg.resume_multiplier = clamp_or(
            cfg.resume_multiplier,
            defaults::default_resume_multiplier(),
            0.0,
            cfg.max_multiplier,
        );
        cfg.resume_nudge = clamp_or(cfg.resume_nudge, defaults::default_resume_nudge(), 0.0, 1.0);
        cfg.multiplier_blend = clamp_or(
            cfg.multiplier_blend,
            defaults::default_multiplier_blend(),
            0.001,
            0.999,
        );
        cfg.multiplier_snap_epsilon = clamp_or(
            cfg.multiplier_snap_epsilon,
            defaults::default_multiplier_snap_epsilon(),
            0.0,
            0.5,
        );
        cfg.rate_window_ms = cfg.rate_window_ms.clamp(100, 60_000);
        cfg.rate_span_floor_ms = cfg.rate_span_floor_ms.clamp(1, cfg.rate_window_ms);
        cfg.silence_timeout_ms = cfg.silence_timeout_ms.clamp(100, 60_000);
        cfg.reading_line_fraction = clamp_or(
            cfg.reading_line_fraction,
            defaults::default_reading_line_fraction(),
            0.0,
            1.0,
        );
        cfg.lookahead_tokens = cfg.lookahead_tokens.clamp(1, 10_000);
        cfg.highlight_ms = cfg.highlight_ms.min(60_000);
        if cfg.language.trim().is_empty() {
            cfg.language = defaults::default_language();
        }
        cfg.font_size = clamp_or(cfg.font_size, defaults::default_font_size(), 8.0, 400.0);
        cfg.line_spacing = clamp_or(cfg.line_spacing, defaults::default_line_spacing(), 0.8, 4.0);
        cfg.content_width_px = clamp_or(
            cfg.content_width_px,
            defaults::default_content_width_px(),
            100.0,
            10_000.0,
        );
        cfg.paragraph_gap_lines = clamp_or(
            cfg.paragraph_gap_lines,
            defaults::default_paragraph_gap_lines(),
            0.0,
            10.0,
        );
        cfg.top_padding_px = clamp_or(
            cfg.top_padding_px,
            defaults::default_top_padding_px(),
            0.0,
            10_000.0,
        );
        cfg.viewport_height_px = clamp_or(
            cfg.viewport_height_px,
            defaults::default_viewport_height_px(),
            1.0,
            20_000.0,
        );
        cfg
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            base_velocity: self.base_velocity,
            autoplay_speed_factor: self.autoplay_speed_factor,
            blend: self.scroll_blend,
            settle_threshold_px: self.settle_threshold_px,
        }
    }

    pub fn voice_activity_config(&self) -> VoiceActivityConfig {
        VoiceActivityConfig {
            calibration_events_per_second: self.calibration_events_per_second,
            max_multiplier: self.max_multiplier,
            min_multiplier: self.min_multiplier,
            resume_multiplier: self.resume_multiplier,
            resume_nudge: self.resume_nudge,
            blend: self.multiplier_blend,
            snap_epsilon: self.multiplier_snap_epsilon,
            rate_window: Duration::from_millis(self.rate_window_ms),
            rate_span_floor: Duration::from_millis(self.rate_span_floor_ms),
        }
    }

    pub fn alignment_config(&self) -> AlignmentConfig {
        AlignmentConfig {
            lookahead_tokens: self.lookahead_tokens,
            reading_line_fraction: self.reading_line_fraction,
        }
    }

    pub fn layout_metrics(&self) -> LayoutMetrics {
        LayoutMetrics {
            font_size: self.font_size,
            line_spacing: self.line_spacing,
            content_width_px: self.content_width_px,
            paragraph_gap_lines: self.paragraph_gap_lines,
            top_padding_px: self.top_padding_px,
        }
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}

/// Which mic-driven controller runs while the microphone is on.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum FollowStrategy {
    /// Speed follows how often the recognizer fires.
    #[default]
    VoiceActivity,
    /// Position follows what the recognizer heard.
    Transcript,
}

impl std::fmt::Display for FollowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FollowStrategy::VoiceActivity => "voice-activity",
            FollowStrategy::Transcript => "transcript",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for FollowStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "voice-activity" | "voice" => Ok(FollowStrategy::VoiceActivity),
            "transcript" => Ok(FollowStrategy::Transcript),
            other => Err(format!(
                "unknown follow strategy {other:?} (expected \"voice-activity\" or \"transcript\")"
            )),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
