use approx::assert_abs_diff_eq;
use prompter_core::config::{FollowStrategy, PrompterConfig};
use prompter_core::controller::ScrollMode;
use prompter_core::driver::{SimulatedClock, run_frame_loop};
use prompter_core::layout::FixedAnchors;
use prompter_core::recognition::{RecognitionEngine, RecognitionErrorKind, RecognitionSignal};
use prompter_core::session::MicStatus;
use prompter_core::{PrompterError, PrompterSession, Result, SessionCommand};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct EngineLog {
    starts: usize,
    stops: usize,
    start_results: VecDeque<Result<()>>,
}

/// Fake recognizer whose start/stop calls are observable from the test.
#[derive(Clone, Default)]
struct FakeEngine {
    log: Rc<RefCell<EngineLog>>,
}

impl RecognitionEngine for FakeEngine {
    fn start(&mut self, _language: &str) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.starts += 1;
        log.start_results.pop_front().unwrap_or(Ok(()))
    }

    fn stop(&mut self) {
        self.log.borrow_mut().stops += 1;
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn transcript_config() -> PrompterConfig {
    PrompterConfig {
        follow_strategy: FollowStrategy::Transcript,
        ..PrompterConfig::default()
    }
}

fn transcript(at: Duration, text: &str) -> RecognitionSignal {
    RecognitionSignal::Transcript {
        at,
        text: text.to_string(),
        is_final: false,
    }
}

#[test]
fn spoken_word_lands_on_the_reading_line() {
    let engine = FakeEngine::default();
    let mut session = PrompterSession::start(
        "Hello world. Good morning.",
        transcript_config(),
        Box::new(engine),
    )
    .expect("session starts");
    assert_eq!(session.script().len(), 4);

    session.set_viewport(1000.0);
    session.set_anchor_resolver(Box::new(FixedAnchors::new(vec![
        0.0, 0.0, 2000.0, 2000.0,
    ])));
    session.start_mic().expect("mic starts");
    assert_eq!(session.mode(), ScrollMode::TranscriptFollow);

    session
        .handle_recognition(RecognitionSignal::Started)
        .expect("start is benign");
    session
        .handle_recognition(transcript(ms(100), "good"))
        .expect("transcript is benign");
    assert_eq!(session.last_matched_index(), 2);

    // token at 2000px pinned 400px below the top of a 1000px viewport
    assert_abs_diff_eq!(session.scroll().target, 1600.0, epsilon = 1e-3);
    let snapshot = session.snapshot();
    let highlighted = snapshot.highlighted_token.expect("matched token highlighted");
    assert_eq!(highlighted.normalized, "good");

    let mut clock = SimulatedClock::sixty_hz();
    let mut frames = 0;
    run_frame_loop(&mut session, &mut clock, |_, _| {
        frames += 1;
        if frames > 600 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    let scroll = session.scroll();
    assert_abs_diff_eq!(scroll.current, 1600.0, epsilon = 0.5);
    assert!(scroll.current <= 1600.0);
    assert!(session.snapshot().highlighted_token.is_none());
}

#[test]
fn steady_speech_scrolls_at_base_velocity_then_pauses_on_silence() {
    let engine = FakeEngine::default();
    let mut session =
        PrompterSession::start("some words to read", PrompterConfig::default(), Box::new(engine))
            .expect("session starts");
    session.start_mic().expect("mic starts");
    assert_eq!(session.mode(), ScrollMode::VoiceActivity);
    assert_eq!(session.mic_status(), &MicStatus::Listening);

    let mut clock = SimulatedClock::new(ms(10));
    let mut next_event = ms(0);
    let speech_until = ms(6000);
    run_frame_loop(&mut session, &mut clock, |session, now| {
        while next_event <= now && next_event < speech_until {
            session
                .handle_recognition(RecognitionSignal::Activity { at: next_event })
                .expect("activity is benign");
            next_event += ms(250);
        }
        if now >= ms(5000) {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    let snapshot = session.snapshot();
    assert_abs_diff_eq!(snapshot.multiplier, 1.0, epsilon = 0.02);
    assert_eq!(snapshot.status_label, "Speaking - 1.0x speed");
    let position_at_5s = session.scroll().target;

    // no more events: the silence timer fires and the scroll stops dead
    let mut now = ms(5000);
    for _ in 0..600 {
        now += ms(10);
        session.frame(now, 0.01).expect("no fatal errors");
    }
    let snapshot = session.snapshot();
    assert_eq!(snapshot.mic_status, MicStatus::Paused);
    assert_eq!(snapshot.multiplier, 0.0);
    let stopped_at = session.scroll().target;
    session.frame(now + ms(500), 0.5).expect("no fatal errors");
    assert_eq!(session.scroll().target, stopped_at);
    assert!(stopped_at > position_at_5s);

    // one event after silence resumes at baseline speed
    session
        .handle_recognition(RecognitionSignal::Activity { at: now + ms(600) })
        .expect("benign");
    assert_abs_diff_eq!(session.snapshot().multiplier, 0.5, epsilon = 1e-6);
}

#[test]
fn engine_restarts_are_transparent_and_stop_clears_the_timer() {
    let engine = FakeEngine::default();
    let log = Rc::clone(&engine.log);
    let mut session =
        PrompterSession::start("some words", PrompterConfig::default(), Box::new(engine))
            .expect("session starts");
    session.start_mic().expect("mic starts");

    session
        .handle_recognition(RecognitionSignal::Activity { at: ms(0) })
        .expect("benign");
    for _ in 0..3 {
        session
            .handle_recognition(RecognitionSignal::Ended)
            .expect("restart is benign");
        session
            .handle_recognition(RecognitionSignal::Started)
            .expect("benign");
        session
            .handle_recognition(RecognitionSignal::Error(RecognitionErrorKind::NoSpeech))
            .expect("no-speech is benign");
    }
    assert_eq!(log.borrow().starts, 4);
    assert!(session.is_mic_active());
    assert_eq!(session.mode(), ScrollMode::VoiceActivity);

    session.stop_mic();
    assert_eq!(log.borrow().stops, 1);
    assert!(!session.recognition().silence_timer_armed());
    session.frame(ms(10_000), 0.016).expect("no stale timer");
    assert_eq!(session.mic_status(), &MicStatus::Off);
    assert_eq!(session.mode(), ScrollMode::Idle);
}

#[test]
fn permission_denial_stops_voice_modes_without_retry() {
    let engine = FakeEngine::default();
    let log = Rc::clone(&engine.log);
    let mut session =
        PrompterSession::start("some words", transcript_config(), Box::new(engine))
            .expect("session starts");
    session.start_mic().expect("mic starts");

    let err = session
        .handle_recognition(RecognitionSignal::Error(RecognitionErrorKind::from_code(
            "not-allowed",
        )))
        .expect_err("permission denial is fatal");
    assert_eq!(err, PrompterError::PermissionDenied);
    assert!(!session.is_mic_active());
    assert_eq!(session.mode(), ScrollMode::Idle);
    assert!(matches!(session.mic_status(), MicStatus::Failed { .. }));

    session
        .handle_recognition(RecognitionSignal::Ended)
        .expect("late end is ignored");
    assert_eq!(log.borrow().starts, 1);
}

#[test]
fn fatal_restart_failure_surfaces_through_the_frame() {
    let engine = FakeEngine::default();
    {
        let mut log = engine.log.borrow_mut();
        log.start_results.push_back(Ok(()));
        log.start_results
            .push_back(Err(PrompterError::EngineStart("device busy".into())));
        log.start_results
            .push_back(Err(PrompterError::PermissionDenied));
    }
    let mut session =
        PrompterSession::start("some words", PrompterConfig::default(), Box::new(engine))
            .expect("session starts");
    session.start_mic().expect("mic starts");
    session
        .handle_recognition(RecognitionSignal::Ended)
        .expect("transient failure is retried");
    assert!(session.is_mic_active());

    let err = session
        .frame(ms(16), 0.016)
        .expect_err("retry hits a fatal error");
    assert_eq!(err, PrompterError::PermissionDenied);
    assert!(!session.is_mic_active());
}

#[test]
fn drag_overrides_voice_and_returns_to_it() {
    let engine = FakeEngine::default();
    let mut session =
        PrompterSession::start("some words", PrompterConfig::default(), Box::new(engine))
            .expect("session starts");
    session.apply_command(SessionCommand::StartMic);
    session
        .handle_recognition(RecognitionSignal::Activity { at: ms(0) })
        .expect("benign");

    session.apply_command(SessionCommand::TouchStart { y: 500.0 });
    let event = session.apply_command(SessionCommand::TouchMove { y: 380.0 });
    assert_eq!(event.snapshot.mode, ScrollMode::Dragging);
    assert_eq!(event.snapshot.scroll.current, 120.0);
    assert_eq!(event.snapshot.multiplier, 0.0);

    for i in 1..=30 {
        session.frame(ms(i * 16), 0.016).expect("benign");
        assert_eq!(session.scroll().current, 120.0);
    }

    let event = session.apply_command(SessionCommand::TouchEnd);
    assert_eq!(event.snapshot.mode, ScrollMode::VoiceActivity);
    assert!(event.snapshot.controls_visible);
}
