//! The single owner of the scroll coordinate.
//!
//! `current` is what the renderer shows; `target` is where it should be.
//! Every frame `current` decays exponentially toward `target`, so it never
//! overshoots. Exactly one [`ScrollMode`] decides how `target` moves.

use crate::voice_activity::{VelocitySource, frame_blend};
use serde::Serialize;
use tracing::{debug, trace, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ScrollMode {
    #[default]
    Idle,
    ManualAutoplay,
    Dragging,
    VoiceActivity,
    TranscriptFollow,
}

impl ScrollMode {
    pub fn is_mic_driven(self) -> bool {
        matches!(self, Self::VoiceActivity | Self::TranscriptFollow)
    }
}

impl std::fmt::Display for ScrollMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScrollMode::Idle => "idle",
            ScrollMode::ManualAutoplay => "manual-autoplay",
            ScrollMode::Dragging => "dragging",
            ScrollMode::VoiceActivity => "voice-activity",
            ScrollMode::TranscriptFollow => "transcript-follow",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, TS)]
#[ts(export)]
pub struct ScrollState {
    pub current: f32,
    pub target: f32,
}

/// Result of [`PositionController::set_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: ScrollMode,
    pub to: ScrollMode,
    /// The caller must drop transient velocity (the estimator glide).
    pub reset_velocity: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Pixels per second at 1.0x.
    pub base_velocity: f32,
    /// Manual autoplay runs at `base_velocity * autoplay_speed_factor`.
    pub autoplay_speed_factor: f32,
    /// Per-60Hz-frame fraction of the remaining gap closed.
    pub blend: f32,
    /// Gaps at or below this are left alone.
    pub settle_threshold_px: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_velocity: 25.0,
            autoplay_speed_factor: 1.5,
            blend: 0.12,
            settle_threshold_px: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionController {
    config: ControllerConfig,
    state: ScrollState,
    mode: ScrollMode,
}

impl PositionController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            state: ScrollState::default(),
            mode: ScrollMode::Idle,
        }
    }

    pub fn set_config(&mut self, config: ControllerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Session start: both coordinates back to zero, mode back to idle.
    pub fn reset(&mut self) {
        self.state = ScrollState::default();
        self.mode = ScrollMode::Idle;
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ScrollMode) -> ModeChange {
        let from = self.mode;
        let reset_velocity =
            from != mode && (mode == ScrollMode::Dragging || from.is_mic_driven());
        if from != mode {
            debug!(%from, to = %mode, reset_velocity, "Scroll mode changed");
        }
        self.mode = mode;
        ModeChange {
            from,
            to: mode,
            reset_velocity,
        }
    }

    /// Direct 1:1 movement. Ignored unless dragging.
    pub fn on_drag(&mut self, delta_px: f32) -> bool {
        if self.mode != ScrollMode::Dragging {
            warn!(mode = %self.mode, delta_px, "Drag delta outside drag mode ignored");
            return false;
        }
        if !delta_px.is_finite() {
            return false;
        }
        let position = (self.state.target + delta_px).max(0.0);
        self.state.target = position;
        self.state.current = position;
        true
    }

    /// Discrete jump requested by the transcript aligner. Only honoured in
    /// transcript-follow mode.
    pub fn set_target(&mut self, position: f32) -> bool {
        if self.mode != ScrollMode::TranscriptFollow || !position.is_finite() {
            return false;
        }
        self.state.target = position.max(0.0);
        true
    }

    /// One animation frame. `dt_secs <= 0` leaves state untouched.
    pub fn tick(&mut self, dt_secs: f32, voice: &mut dyn VelocitySource) -> ScrollState {
        if !dt_secs.is_finite() || dt_secs <= 0.0 {
            return self.state;
        }

        match self.mode {
            ScrollMode::ManualAutoplay => {
                self.state.target +=
                    self.config.base_velocity * self.config.autoplay_speed_factor * dt_secs;
            }
            ScrollMode::VoiceActivity => {
                let multiplier = voice.step(dt_secs);
                self.state.target += multiplier * self.config.base_velocity * dt_secs;
            }
            ScrollMode::Dragging => return self.state,
            ScrollMode::TranscriptFollow | ScrollMode::Idle => {}
        }
        self.state.target = self.state.target.max(0.0);

        let gap = self.state.target - self.state.current;
        if gap.abs() > self.config.settle_threshold_px {
            self.state.current += gap * frame_blend(self.config.blend, dt_secs);
            trace!(
                current = self.state.current,
                target_px = self.state.target,
                "Scroll frame"
            );
        }
        self.state
    }
}
