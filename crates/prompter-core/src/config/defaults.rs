pub(crate) fn default_base_velocity() -> f32 {
    25.0
}

pub(crate) fn default_autoplay_speed_factor() -> f32 {
    1.5
}

pub(crate) fn default_scroll_blend() -> f32 {
    0.12
}

pub(crate) fn default_settle_threshold_px() -> f32 {
    0.3
}

pub(crate) fn default_drag_threshold_px() -> f32 {
    8.0
}

pub(crate) fn default_calibration_events_per_second() -> f32 {
    4.0
}

pub(crate) fn default_max_multiplier() -> f32 {
    1.6
}

pub(crate) fn default_min_multiplier() -> f32 {
    0.35
}

pub(crate) fn default_resume_multiplier() -> f32 {
    1.0
}

pub(crate) fn default_resume_nudge() -> f32 {
    0.5
}

pub(crate) fn default_multiplier_blend() -> f32 {
    0.08
}

pub(crate) fn default_multiplier_snap_epsilon() -> f32 {
    0.01
}

pub(crate) fn default_rate_window_ms() -> u64 {
    1500
}

pub(crate) fn default_rate_span_floor_ms() -> u64 {
    500
}

pub(crate) fn default_silence_timeout_ms() -> u64 {
    1200
}

pub(crate) fn default_reading_line_fraction() -> f32 {
    0.4
}

pub(crate) fn default_lookahead_tokens() -> usize {
    30
}

pub(crate) fn default_highlight_ms() -> u64 {
    1200
}

pub(crate) fn default_follow_strategy() -> crate::config::FollowStrategy {
    crate::config::FollowStrategy::VoiceActivity
}

pub(crate) fn default_language() -> String {
    "en-US".to_string()
}

pub(crate) fn default_font_size() -> f32 {
    48.0
}

pub(crate) fn default_line_spacing() -> f32 {
    1.4
}

pub(crate) fn default_content_width_px() -> f32 {
    900.0
}

pub(crate) fn default_paragraph_gap_lines() -> f32 {
    1.0
}

pub(crate) fn default_top_padding_px() -> f32 {
    0.0
}

pub(crate) fn default_viewport_height_px() -> f32 {
    1000.0
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
