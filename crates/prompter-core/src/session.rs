//! One prompter session: the object that owns every piece of mutable state
//! between entering the prompter and leaving it.
//!
//! All timestamps handed to a session (`frame(now, ..)`, recognition signal
//! `at` fields) share one monotonic origin chosen by the host.

use crate::aligner::TranscriptAligner;
use crate::cancellation::Liveness;
use crate::config::{FollowStrategy, PrompterConfig};
use crate::controller::{PositionController, ScrollMode, ScrollState};
use crate::error::{PrompterError, Result};
use crate::gesture::{DragGesture, GestureEvent};
use crate::layout::{AnchorResolver, EstimatedLayout};
use crate::recognition::{
    RecognitionEngine, RecognitionManager, RecognitionSignal, RecognitionUpdate,
};
use crate::tokenizer::{Script, ScriptToken};
use crate::voice_activity::{VelocitySource, VoiceActivityEstimator};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use ts_rs::TS;

/// What the user-facing status line shows about the microphone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum MicStatus {
    #[default]
    Off,
    Listening,
    Speaking {
        multiplier: f32,
    },
    Paused,
    Failed {
        reason: String,
    },
}

impl MicStatus {
    pub fn label(&self) -> String {
        match self {
            MicStatus::Off => String::new(),
            MicStatus::Listening => "Listening - speak to scroll".to_string(),
            MicStatus::Speaking { multiplier } => format!("Speaking - {multiplier:.1}x speed"),
            MicStatus::Paused => "Paused - waiting for speech".to_string(),
            MicStatus::Failed { reason } => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PrompterSnapshot {
    pub mode: ScrollMode,
    pub scroll: ScrollState,
    pub playing: bool,
    pub controls_visible: bool,
    pub mic_active: bool,
    pub follow_strategy: FollowStrategy,
    pub mic_status: MicStatus,
    pub status_label: String,
    pub multiplier: f32,
    pub last_matched_index: usize,
    pub highlighted_token: Option<ScriptToken>,
    pub token_count: usize,
    pub viewport_height: f32,
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    GetSnapshot,
    TogglePlay,
    ToggleControls,
    StartMic,
    StopMic,
    ToggleMic,
    SetFollowStrategy { strategy: FollowStrategy },
    TouchStart { y: f32 },
    TouchMove { y: f32 },
    TouchEnd,
    SetViewport { height: f32 },
    End,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "prompter_get_snapshot",
            Self::TogglePlay => "prompter_toggle_play",
            Self::ToggleControls => "prompter_toggle_controls",
            Self::StartMic => "prompter_start_mic",
            Self::StopMic => "prompter_stop_mic",
            Self::ToggleMic => "prompter_toggle_mic",
            Self::SetFollowStrategy { .. } => "prompter_set_follow_strategy",
            Self::TouchStart { .. } => "prompter_touch_start",
            Self::TouchMove { .. } => "prompter_touch_move",
            Self::TouchEnd => "prompter_touch_end",
            Self::SetViewport { .. } => "prompter_set_viewport",
            Self::End => "prompter_end",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub error: Option<PrompterError>,
    pub snapshot: PrompterSnapshot,
}

#[derive(Debug, Clone, Copy)]
struct Highlight {
    index: usize,
    until: Duration,
}

pub struct PrompterSession {
    config: PrompterConfig,
    script: Arc<Script>,
    anchors: Box<dyn AnchorResolver>,
    renderer_anchors: bool,
    controller: PositionController,
    estimator: VoiceActivityEstimator,
    aligner: TranscriptAligner,
    recognition: RecognitionManager<Box<dyn RecognitionEngine>>,
    gesture: DragGesture,
    follow_strategy: FollowStrategy,
    playing: bool,
    controls_visible: bool,
    mic_status: MicStatus,
    highlight: Option<Highlight>,
    viewport_height: f32,
    liveness: Liveness,
}

impl PrompterSession {
    /// Enter the prompter with `raw_script`. Scroll starts at zero, idle,
    /// with the controls visible.
    pub fn start(
        raw_script: &str,
        config: PrompterConfig,
        engine: Box<dyn RecognitionEngine>,
    ) -> Result<Self> {
        let config = config.sanitized();
        let script = Arc::new(Script::load(raw_script)?);
        let anchors: Box<dyn AnchorResolver> =
            Box::new(EstimatedLayout::new(&script, config.layout_metrics()));
        let recognition =
            RecognitionManager::new(engine, config.language.clone(), config.silence_timeout());

        info!(
            tokens = script.len(),
            strategy = %config.follow_strategy,
            "Prompter session started"
        );

        Ok(Self {
            controller: PositionController::new(config.controller_config()),
            estimator: VoiceActivityEstimator::new(config.voice_activity_config()),
            aligner: TranscriptAligner::new(config.alignment_config()),
            recognition,
            gesture: DragGesture::new(config.drag_threshold_px),
            follow_strategy: config.follow_strategy,
            viewport_height: config.viewport_height_px,
            playing: false,
            controls_visible: true,
            mic_status: MicStatus::Off,
            highlight: None,
            renderer_anchors: false,
            liveness: Liveness::new(),
            anchors,
            script,
            config,
        })
    }

    pub fn script(&self) -> Arc<Script> {
        Arc::clone(&self.script)
    }

    pub fn config(&self) -> &PrompterConfig {
        &self.config
    }

    pub fn mode(&self) -> ScrollMode {
        self.controller.mode()
    }

    pub fn scroll(&self) -> ScrollState {
        self.controller.state()
    }

    pub fn mic_status(&self) -> &MicStatus {
        &self.mic_status
    }

    pub fn is_mic_active(&self) -> bool {
        self.recognition.is_listening()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn last_matched_index(&self) -> usize {
        self.aligner.last_matched_index()
    }

    /// Handle cloned into whatever may end the session from outside the
    /// frame loop.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_active(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn recognition(&self) -> &RecognitionManager<Box<dyn RecognitionEngine>> {
        &self.recognition
    }

    /// Replace the script. An identical text keeps tokens, alignment and
    /// scroll; anything else starts over from the top. Returns whether the
    /// script changed.
    ///
    /// Renderer anchors are indexed by token, so a new script drops them and
    /// falls back to the estimate until the renderer measures again.
    pub fn reload_script(&mut self, raw_script: &str) -> Result<bool> {
        let script = Script::load(raw_script)?;
        if script.fingerprint() == self.script.fingerprint() {
            debug!("Script unchanged; keeping alignment and scroll state");
            return Ok(false);
        }
        self.script = Arc::new(script);
        if self.renderer_anchors {
            debug!("Dropping renderer anchors measured for the previous script");
        }
        self.renderer_anchors = false;
        self.anchors = Box::new(EstimatedLayout::new(
            &self.script,
            self.config.layout_metrics(),
        ));
        self.aligner.reset();
        self.highlight = None;
        let mode = self.controller.mode();
        self.controller.reset();
        self.controller.set_mode(mode);
        info!(tokens = self.script.len(), "Script reloaded");
        Ok(true)
    }

    /// Anchors measured by a renderer replace the built-in estimate until
    /// the script changes.
    pub fn set_anchor_resolver(&mut self, anchors: Box<dyn AnchorResolver>) {
        self.anchors = anchors;
        self.renderer_anchors = true;
    }

    /// Settings changed mid-session. Script and alignment state survive.
    pub fn apply_config(&mut self, config: PrompterConfig) {
        let config = config.sanitized();
        self.controller.set_config(config.controller_config());
        self.estimator.set_config(config.voice_activity_config());
        self.aligner.set_config(config.alignment_config());
        self.gesture.set_threshold(config.drag_threshold_px);
        self.recognition.set_silence_timeout(config.silence_timeout());
        self.recognition.set_language(config.language.clone());
        if !self.renderer_anchors {
            self.anchors = Box::new(EstimatedLayout::new(&self.script, config.layout_metrics()));
        }
        // a renderer-reported height wins until the configured one changes
        if config.viewport_height_px != self.config.viewport_height_px {
            self.viewport_height = config.viewport_height_px;
        }
        if config.follow_strategy != self.config.follow_strategy {
            self.set_follow_strategy(config.follow_strategy);
        }
        self.config = config;
        debug!("Applied settings to running session");
    }

    pub fn set_viewport(&mut self, height: f32) {
        if height.is_finite() && height > 0.0 {
            self.viewport_height = height;
        } else {
            warn!(height, "Ignoring invalid viewport height");
        }
    }

    /// Flip manual autoplay. Ignored while the microphone drives the scroll.
    pub fn toggle_play(&mut self) -> bool {
        if self.recognition.is_listening() {
            debug!("Play toggle ignored while the microphone is active");
            return false;
        }
        self.playing = !self.playing;
        if self.playing {
            self.controls_visible = false;
        }
        self.sync_mode();
        true
    }

    pub fn toggle_controls(&mut self) {
        self.controls_visible = !self.controls_visible;
    }

    pub fn start_mic(&mut self) -> Result<()> {
        if self.recognition.is_listening() {
            return Ok(());
        }
        self.playing = false;
        self.estimator.reset();
        self.aligner.reset();
        self.highlight = None;
        if let Err(err) = self.recognition.start() {
            self.mic_status = MicStatus::Failed {
                reason: err.to_string(),
            };
            self.sync_mode();
            return Err(err);
        }
        self.mic_status = MicStatus::Listening;
        self.sync_mode();
        Ok(())
    }

    pub fn stop_mic(&mut self) {
        self.recognition.stop();
        self.estimator.reset();
        self.mic_status = MicStatus::Off;
        self.sync_mode();
    }

    pub fn toggle_mic(&mut self) -> Result<()> {
        if self.recognition.is_listening() {
            self.stop_mic();
            Ok(())
        } else {
            self.start_mic()
        }
    }

    pub fn set_follow_strategy(&mut self, strategy: FollowStrategy) {
        if strategy == self.follow_strategy {
            return;
        }
        info!(from = %self.follow_strategy, to = %strategy, "Follow strategy changed");
        self.follow_strategy = strategy;
        self.config.follow_strategy = strategy;
        self.estimator.reset();
        if self.recognition.is_listening() {
            self.mic_status = MicStatus::Listening;
        }
        self.sync_mode();
    }

    pub fn touch_start(&mut self, y: f32) {
        self.gesture.touch_start(y);
    }

    pub fn touch_move(&mut self, y: f32) {
        match self.gesture.touch_move(y) {
            GestureEvent::DragStarted { delta_px } => {
                self.sync_mode();
                self.controller.on_drag(delta_px);
            }
            GestureEvent::Dragged { delta_px } => {
                self.controller.on_drag(delta_px);
            }
            _ => {}
        }
    }

    pub fn touch_end(&mut self) {
        match self.gesture.touch_end() {
            GestureEvent::Tap => self.toggle_controls(),
            GestureEvent::DragEnded => self.sync_mode(),
            _ => {}
        }
    }

    /// Feed one engine signal. A fatal error stops every voice-driven mode
    /// and is returned so the host can alert the user.
    pub fn handle_recognition(&mut self, signal: RecognitionSignal) -> Result<()> {
        match self.recognition.handle(signal) {
            Some(update) => self.apply_update(update),
            None => Ok(()),
        }
    }

    /// One animation frame at time `now`, `dt_secs` after the previous one.
    pub fn frame(&mut self, now: Duration, dt_secs: f32) -> Result<ScrollState> {
        if !self.liveness.is_alive() {
            return Ok(self.controller.state());
        }

        let mut outcome = Ok(());
        if let Some(update) = self.recognition.poll(now) {
            outcome = self.apply_update(update);
        }
        if self.highlight.is_some_and(|h| now >= h.until) {
            self.highlight = None;
        }

        let state = self.controller.tick(dt_secs, &mut self.estimator);
        if self.controller.mode() == ScrollMode::VoiceActivity
            && matches!(self.mic_status, MicStatus::Speaking { .. })
        {
            self.mic_status = MicStatus::Speaking {
                multiplier: self.estimator.smoothed_multiplier(),
            };
        }
        outcome.map(|_| state)
    }

    /// Leave the prompter. The frame loop exits at its next iteration.
    pub fn end(&mut self) {
        if !self.liveness.is_alive() {
            return;
        }
        self.playing = false;
        self.stop_mic();
        self.liveness.end();
        info!("Prompter session ended");
    }

    pub fn snapshot(&self) -> PrompterSnapshot {
        PrompterSnapshot {
            mode: self.controller.mode(),
            scroll: self.controller.state(),
            playing: self.playing,
            controls_visible: self.controls_visible,
            mic_active: self.recognition.is_listening(),
            follow_strategy: self.follow_strategy,
            mic_status: self.mic_status.clone(),
            status_label: self.mic_status.label(),
            multiplier: self.estimator.smoothed_multiplier(),
            last_matched_index: self.aligner.last_matched_index(),
            highlighted_token: self
                .highlight
                .and_then(|h| self.script.token(h.index).cloned()),
            token_count: self.script.len(),
            viewport_height: self.viewport_height,
        }
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        let mut error = None;
        match command {
            SessionCommand::GetSnapshot => {}
            SessionCommand::TogglePlay => {
                self.toggle_play();
            }
            SessionCommand::ToggleControls => self.toggle_controls(),
            SessionCommand::StartMic => error = self.start_mic().err(),
            SessionCommand::StopMic => self.stop_mic(),
            SessionCommand::ToggleMic => error = self.toggle_mic().err(),
            SessionCommand::SetFollowStrategy { strategy } => self.set_follow_strategy(strategy),
            SessionCommand::TouchStart { y } => self.touch_start(y),
            SessionCommand::TouchMove { y } => self.touch_move(y),
            SessionCommand::TouchEnd => self.touch_end(),
            SessionCommand::SetViewport { height } => self.set_viewport(height),
            SessionCommand::End => self.end(),
        }
        SessionEvent {
            action,
            error,
            snapshot: self.snapshot(),
        }
    }

    fn apply_update(&mut self, update: RecognitionUpdate) -> Result<()> {
        match update {
            RecognitionUpdate::Listening => {
                self.estimator.reset();
                self.aligner.reset();
                self.mic_status = MicStatus::Listening;
            }
            RecognitionUpdate::Activity { at } => match self.follow_strategy {
                FollowStrategy::VoiceActivity => self.on_voice_event(at),
                FollowStrategy::Transcript => self.leave_pause(),
            },
            RecognitionUpdate::Transcript { at, text, .. } => match self.follow_strategy {
                FollowStrategy::VoiceActivity => self.on_voice_event(at),
                FollowStrategy::Transcript => self.on_transcript(at, &text),
            },
            RecognitionUpdate::SilenceElapsed => {
                self.estimator.on_silence_timeout();
                self.mic_status = MicStatus::Paused;
            }
            RecognitionUpdate::Fatal(err) => {
                warn!("Voice-driven scrolling stopped: {err}");
                self.estimator.reset();
                self.mic_status = MicStatus::Failed {
                    reason: err.to_string(),
                };
                self.sync_mode();
                return Err(err);
            }
        }
        Ok(())
    }

    fn on_voice_event(&mut self, at: Duration) {
        self.estimator.on_event(at);
        self.mic_status = MicStatus::Speaking {
            multiplier: self.estimator.smoothed_multiplier(),
        };
    }

    fn leave_pause(&mut self) {
        if matches!(self.mic_status, MicStatus::Paused) {
            self.mic_status = MicStatus::Listening;
        }
    }

    fn on_transcript(&mut self, at: Duration, text: &str) {
        self.leave_pause();
        let Some(found) = self.aligner.on_transcript(
            text,
            &self.script,
            self.anchors.as_ref(),
            self.viewport_height,
        ) else {
            return;
        };
        self.controller.set_target(found.target_position);
        self.highlight = Some(Highlight {
            index: found.index,
            until: at + self.config.highlight_duration(),
        });
    }

    /// Exactly one source owns the scroll: a drag beats the microphone,
    /// which beats manual autoplay.
    fn desired_mode(&self) -> ScrollMode {
        if self.gesture.is_dragging() {
            ScrollMode::Dragging
        } else if self.recognition.is_listening() {
            match self.follow_strategy {
                FollowStrategy::VoiceActivity => ScrollMode::VoiceActivity,
                FollowStrategy::Transcript => ScrollMode::TranscriptFollow,
            }
        } else if self.playing {
            ScrollMode::ManualAutoplay
        } else {
            ScrollMode::Idle
        }
    }

    fn sync_mode(&mut self) {
        let change = self.controller.set_mode(self.desired_mode());
        if change.reset_velocity {
            self.estimator.reset_motion();
        }
    }
}
