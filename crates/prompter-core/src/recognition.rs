//! Recognition session management.
//!
//! Wraps an opaque speech-recognition engine behind [`RecognitionEngine`],
//! hides its restart churn from the rest of the core, and owns the silence
//! timer so every stop path clears it.

use crate::error::{PrompterError, Result};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Engine error codes, classified by how the core must react.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    PermissionDenied,
    NoSpeech,
    Aborted,
    Network,
    AudioCapture,
    Other(String),
}

impl RecognitionErrorKind {
    /// Map an engine error code (`not-allowed`, `no-speech`, ...).
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "service-not-allowed" | "permission-denied" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            "audio-capture" => Self::AudioCapture,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Everything an engine binding can report.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionSignal {
    Started,
    /// Frequency signal: something was recognized, content unknown.
    Activity { at: Duration },
    /// Content signal for the utterance in progress.
    Transcript {
        at: Duration,
        text: String,
        is_final: bool,
    },
    Ended,
    Error(RecognitionErrorKind),
}

/// What the session sees after the manager has absorbed engine churn.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionUpdate {
    /// First start of a listening run; reset voice and alignment state.
    Listening,
    Activity {
        at: Duration,
    },
    Transcript {
        at: Duration,
        text: String,
        is_final: bool,
    },
    SilenceElapsed,
    Fatal(PrompterError),
}

/// Capabilities of a concrete recognizer binding.
pub trait RecognitionEngine {
    /// Begin delivering signals. `InputUnavailable` means there is no
    /// recognizer at all; `PermissionDenied` means the user refused the mic.
    fn start(&mut self, language: &str) -> Result<()>;

    fn stop(&mut self);
}

impl<E: RecognitionEngine + ?Sized> RecognitionEngine for Box<E> {
    fn start(&mut self, language: &str) -> Result<()> {
        (**self).start(language)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndAction {
    Restart,
    Finish,
}

/// Decides what an engine `end` means. Engines stop on their own
/// periodically; while the user still wants to listen that is noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    WhileListening,
    Never,
}

impl RestartPolicy {
    pub fn on_end(self, listening: bool) -> EndAction {
        match self {
            RestartPolicy::WhileListening if listening => EndAction::Restart,
            _ => EndAction::Finish,
        }
    }
}

/// Debounced one-shot deadline.
#[derive(Debug, Clone, Copy, Default)]
struct SilenceTimer {
    deadline: Option<Duration>,
}

impl SilenceTimer {
    fn restart(&mut self, now: Duration, timeout: Duration) {
        self.deadline = Some(now + timeout);
    }

    fn clear(&mut self) {
        self.deadline = None;
    }

    fn fire_if_due(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

pub struct RecognitionManager<E: RecognitionEngine> {
    engine: E,
    language: String,
    policy: RestartPolicy,
    silence_timeout: Duration,
    silence: SilenceTimer,
    listening: bool,
    announced: bool,
    restart_pending: bool,
    restarts: u64,
}

impl<E: RecognitionEngine> RecognitionManager<E> {
    pub fn new(engine: E, language: impl Into<String>, silence_timeout: Duration) -> Self {
        Self {
            engine,
            language: language.into(),
            policy: RestartPolicy::WhileListening,
            silence_timeout,
            silence: SilenceTimer::default(),
            listening: false,
            announced: false,
            restart_pending: false,
            restarts: 0,
        }
    }

    pub fn with_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_silence_timeout(&mut self, timeout: Duration) {
        self.silence_timeout = timeout;
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    pub fn silence_timer_armed(&self) -> bool {
        self.silence.is_armed()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Start a listening run. Errors are surfaced once and not retried.
    pub fn start(&mut self) -> Result<()> {
        if self.listening {
            return Ok(());
        }
        self.silence.clear();
        self.restart_pending = false;
        self.announced = false;
        self.restarts = 0;
        if let Err(err) = self.engine.start(&self.language) {
            error!(language = %self.language, "Failed to start recognition: {err}");
            return Err(err);
        }
        self.listening = true;
        info!(language = %self.language, "Recognition started");
        Ok(())
    }

    /// Intentional stop. Clears the silence timer on every path.
    pub fn stop(&mut self) {
        self.silence.clear();
        self.restart_pending = false;
        if self.listening {
            self.listening = false;
            self.engine.stop();
            info!(restarts = self.restarts, "Recognition stopped");
        }
    }

    pub fn handle(&mut self, signal: RecognitionSignal) -> Option<RecognitionUpdate> {
        match signal {
            RecognitionSignal::Started => {
                if !self.listening || self.announced {
                    return None;
                }
                self.announced = true;
                Some(RecognitionUpdate::Listening)
            }
            RecognitionSignal::Activity { at } => {
                if !self.listening {
                    return None;
                }
                self.silence.restart(at, self.silence_timeout);
                Some(RecognitionUpdate::Activity { at })
            }
            RecognitionSignal::Transcript { at, text, is_final } => {
                if !self.listening {
                    return None;
                }
                self.silence.restart(at, self.silence_timeout);
                Some(RecognitionUpdate::Transcript { at, text, is_final })
            }
            RecognitionSignal::Ended => match self.policy.on_end(self.listening) {
                EndAction::Restart => self.restart(),
                EndAction::Finish => {
                    if self.listening {
                        self.stop();
                    }
                    None
                }
            },
            RecognitionSignal::Error(kind) => {
                if kind.is_fatal() {
                    error!(?kind, "Fatal recognition error; stopping");
                    self.stop();
                    Some(RecognitionUpdate::Fatal(PrompterError::PermissionDenied))
                } else {
                    debug!(?kind, "Transient recognition error");
                    None
                }
            }
        }
    }

    /// Frame-rate housekeeping: fire the silence timer and retry a failed
    /// restart.
    pub fn poll(&mut self, now: Duration) -> Option<RecognitionUpdate> {
        if self.restart_pending && self.listening {
            if let Some(update) = self.restart() {
                return Some(update);
            }
        }
        if self.silence.fire_if_due(now) {
            return Some(RecognitionUpdate::SilenceElapsed);
        }
        None
    }

    fn restart(&mut self) -> Option<RecognitionUpdate> {
        match self.engine.start(&self.language) {
            Ok(()) => {
                self.restart_pending = false;
                self.restarts += 1;
                debug!(restarts = self.restarts, "Recognition engine restarted");
                None
            }
            Err(err) if err.is_fatal() => {
                error!("Recognition restart failed fatally: {err}");
                self.stop();
                Some(RecognitionUpdate::Fatal(err))
            }
            Err(err) => {
                warn!("Recognition restart failed; retrying next frame: {err}");
                self.restart_pending = true;
                None
            }
        }
    }
}
