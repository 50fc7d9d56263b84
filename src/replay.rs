//! Recorded recognition sessions.
//!
//! A replay file holds one JSON object per line:
//! `{"at_ms": 1200, "kind": "transcript", "text": "good morning", "is_final": false}`.
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use prompter_core::recognition::{RecognitionEngine, RecognitionErrorKind, RecognitionSignal};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplayKind {
    Activity,
    Transcript,
    End,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayEvent {
    pub at_ms: u64,
    pub kind: ReplayKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReplayEvent {
    pub fn at(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }

    pub fn into_signal(self) -> RecognitionSignal {
        let at = self.at();
        match self.kind {
            ReplayKind::Activity => RecognitionSignal::Activity { at },
            ReplayKind::Transcript => RecognitionSignal::Transcript {
                at,
                text: self.text.unwrap_or_default(),
                is_final: self.is_final,
            },
            ReplayKind::End => RecognitionSignal::Ended,
            ReplayKind::Error => RecognitionSignal::Error(RecognitionErrorKind::from_code(
                self.error.as_deref().unwrap_or("unknown"),
            )),
        }
    }
}

pub fn parse_replay(contents: &str) -> Result<Vec<ReplayEvent>> {
    let mut events = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: ReplayEvent = serde_json::from_str(line)
            .with_context(|| format!("Invalid replay event on line {}", line_no + 1))?;
        events.push(event);
    }
    events.sort_by_key(|event| event.at_ms);
    Ok(events)
}

pub fn load_replay(path: &Path) -> Result<Vec<ReplayEvent>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay {}", path.display()))?;
    let events = parse_replay(&contents)?;
    info!(path = %path.display(), events = events.len(), "Loaded replay");
    Ok(events)
}

/// Cursor over recorded events in timestamp order.
#[derive(Debug)]
pub struct Replay {
    events: VecDeque<ReplayEvent>,
    last_at: Duration,
}

impl Replay {
    pub fn new(events: Vec<ReplayEvent>) -> Self {
        let last_at = events.last().map_or(Duration::ZERO, ReplayEvent::at);
        Self {
            events: events.into(),
            last_at,
        }
    }

    /// Pop every event due at or before `now`.
    pub fn due(&mut self, now: Duration) -> Vec<ReplayEvent> {
        let mut due = Vec::new();
        while self.events.front().is_some_and(|event| event.at() <= now) {
            if let Some(event) = self.events.pop_front() {
                due.push(event);
            }
        }
        due
    }

    pub fn is_finished(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last_at(&self) -> Duration {
        self.last_at
    }
}

/// Recognition binding backed by a replay. It only tracks whether it is
/// running and reports its own start signals; recorded events are fed by
/// the host as they come due.
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    running: Rc<Cell<bool>>,
    pending: Rc<RefCell<VecDeque<RecognitionSignal>>>,
}

impl ReplayEngine {
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn drain(&self) -> Vec<RecognitionSignal> {
        self.pending.borrow_mut().drain(..).collect()
    }
}

impl RecognitionEngine for ReplayEngine {
    fn start(&mut self, language: &str) -> prompter_core::Result<()> {
        self.running.set(true);
        debug!(%language, "Replay engine started");
        self.pending
            .borrow_mut()
            .push_back(RecognitionSignal::Started);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.set(false);
        debug!("Replay engine stopped");
    }
}
