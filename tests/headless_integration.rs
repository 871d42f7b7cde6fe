use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use sous::app::{App, AppState, Flow};
use sous::clock::ManualTime;
use sous::config::Config;
use sous::controller::{Ack, CaptureController, ControllerStatus, Health, SpeechResponder};
use sous::recipe::{load_recipes, pick, Recipe};
use sous::runtime::{
    dispatch, run_command, FixedTicker, Runner, SessionEvent, StatusPoller, TestEventSource,
};
use sous::session::SessionStatus;
use sous::step::Step;

// Headless integration using the internal runtime without a TTY.
// A fake kitchen backend stands in for the HTTP controller.
#[derive(Default)]
struct FakeKitchen {
    starts: AtomicUsize,
    stops: AtomicUsize,
    polls: AtomicUsize,
}

impl CaptureController for FakeKitchen {
    fn start_session(&self, timeline: &[Step], session_id: &str) -> anyhow::Result<Ack> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(Ack {
            status: "started".into(),
            session_id: Some(session_id.to_string()),
            quotes_generated: Some(timeline.len() as u32),
            ..Ack::default()
        })
    }

    fn stop_session(&self) -> anyhow::Result<Ack> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(Ack {
            status: "stopped".into(),
            ..Ack::default()
        })
    }

    fn get_status(&self) -> anyhow::Result<ControllerStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        if n % 3 == 2 {
            anyhow::bail!("poll {n} timed out");
        }
        Ok(ControllerStatus {
            session_active: true,
            capture_running: true,
            pid: Some(1000 + n as u32),
            ..ControllerStatus::default()
        })
    }

    fn health(&self) -> anyhow::Result<Health> {
        Ok(Health {
            status: "healthy".into(),
            ..Health::default()
        })
    }
}

impl SpeechResponder for FakeKitchen {
    fn respond(&self, transcript: &str, current_step: Option<&str>) -> anyhow::Result<Option<String>> {
        Ok(Some(format!(
            "you said {transcript:?} while on {:?}",
            current_step.unwrap_or("nothing")
        )))
    }
}

fn key(c: char) -> SessionEvent {
    SessionEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn demo_app(time: &ManualTime) -> App<ManualTime> {
    App::new(
        Recipe::demo("grilled-cheese").unwrap(),
        Config::default(),
        time.clone(),
    )
}

#[test]
fn headless_session_runs_to_summary() {
    let time = ManualTime::new();
    let mut app = demo_app(&time);
    let kitchen = Arc::new(FakeKitchen::default());

    let (tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let mut runner = Runner::new(es, FixedTicker::new(Duration::from_millis(5)));

    tx.send(key(' ')).unwrap();

    // Each tick stands in for one simulated second
    let mut ticks = 0;
    for _ in 0..500u32 {
        let event = runner.step();
        if matches!(event, SessionEvent::Tick) {
            time.advance(1_000);
            ticks += 1;
            if ticks == 30 {
                tx.send(key('e')).unwrap();
            }
        }
        assert_eq!(app.handle(event), Flow::Continue);
        for command in app.take_commands() {
            dispatch(command, kitchen.clone(), tx.clone()).join().unwrap();
        }
        if app.state == AppState::Summary && kitchen.stops.load(Ordering::SeqCst) == 1 {
            break;
        }
    }

    assert_eq!(app.state, AppState::Summary);
    assert_eq!(app.session.status(), SessionStatus::Completed);
    assert_eq!(kitchen.starts.load(Ordering::SeqCst), 1);
    assert_eq!(kitchen.stops.load(Ordering::SeqCst), 1);
    assert!(app.final_elapsed_ms.unwrap() >= 30_000);

    // The stop acknowledgement is already queued and arrives before any further tick
    let outcome = loop {
        match runner.step() {
            SessionEvent::Done(outcome) => break outcome,
            other => {
                app.handle(other);
            }
        }
    };
    app.handle(SessionEvent::Done(outcome));
    assert!(app.notices.iter().any(|n| n.text == "Capture stopped"));
}

#[test]
fn quitting_right_after_end_still_stops_capture() {
    let time = ManualTime::new();
    let mut app = demo_app(&time);
    let kitchen = FakeKitchen::default();

    app.handle(key(' '));
    for command in app.take_commands() {
        run_command(command, &kitchen);
    }
    time.advance(5_000);
    app.handle(key('e'));
    // the stop handed to a background thread never completes before exit
    let in_flight = app.take_commands();
    assert_eq!(in_flight.len(), 1);
    assert_eq!(app.handle(key('q')), Flow::Quit);

    for command in app.teardown() {
        run_command(command, &kitchen);
    }
    assert_eq!(kitchen.starts.load(Ordering::SeqCst), 1);
    assert_eq!(kitchen.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn status_polls_never_touch_timeline_or_clock() {
    let time = ManualTime::new();
    let mut app = demo_app(&time);
    app.toggle();
    app.take_commands();

    let kitchen = Arc::new(FakeKitchen::default());
    let (tx, rx) = mpsc::channel();
    let mut poller = StatusPoller::spawn(kitchen.clone(), Duration::from_millis(1), tx.clone());
    let es = TestEventSource::new(rx);
    let mut runner = Runner::new(es, FixedTicker::new(Duration::from_millis(3)));

    let mut merges = 0;
    let mut ticks: u64 = 0;
    while merges < 20 || ticks < 5 {
        match runner.step() {
            SessionEvent::Tick => {
                time.advance(1_000);
                app.handle(SessionEvent::Tick);
                ticks += 1;
            }
            SessionEvent::Status(report) => {
                let next = app.session.next_action().clone();
                let clock = app.session.clock_state();
                let status = app.session.status();

                app.handle(SessionEvent::Status(report));
                merges += 1;

                assert_eq!(app.session.next_action(), &next);
                assert_eq!(app.session.clock_state(), clock);
                assert_eq!(app.session.status(), status);
            }
            other => {
                app.handle(other);
            }
        }
    }
    poller.shutdown();

    assert!(app.status.polls() >= 20);
    assert!(app.status.failures() > 0);
    assert!(app.status.fields().capture_running);
    assert_eq!(app.session.next_action().now_seconds, ticks);
}

#[test]
fn pause_interval_is_excluded_from_elapsed() {
    let time = ManualTime::new();
    let mut app = demo_app(&time);

    app.handle(key(' '));
    time.advance(10_000);
    app.handle(SessionEvent::Tick);
    app.handle(key(' '));
    assert_eq!(app.session.status(), SessionStatus::Paused);

    time.advance(5_000);
    app.handle(SessionEvent::Tick);
    assert_eq!(app.session.elapsed_ms(), 10_000);

    app.handle(key(' '));
    time.advance(5_000);
    app.handle(SessionEvent::Tick);

    assert_eq!(app.session.elapsed_ms(), 15_000);
    assert_eq!(app.session.next_action().now_seconds, 15);
    assert_eq!(app.display.shown_secs(), 15);
}

#[test]
fn talk_round_trip_through_dispatch() {
    let time = ManualTime::new();
    let mut app = demo_app(&time);
    let kitchen = Arc::new(FakeKitchen::default());
    let (tx, rx) = mpsc::channel();

    app.handle(key(' '));
    app.take_commands();
    app.handle(key('t'));
    for c in "is it hot enough".chars() {
        app.handle(key(c));
    }
    app.handle(SessionEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));

    for command in app.take_commands() {
        dispatch(command, kitchen.clone(), tx.clone()).join().unwrap();
    }
    let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    app.handle(event);

    let reply = app.chef_reply.as_deref().unwrap();
    assert!(reply.contains("is it hot enough"));
    assert!(reply.contains("Slice the tomato"));
}

#[test]
fn recipe_file_drives_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recipes.json");
    std::fs::write(
        &path,
        r#"{"recipes": [
            {"id": "a", "name": "Toast", "timeline": [
                {"id": "t1", "tStart": 0, "tEnd": 60, "type": "instruction", "text": "Toast the bread"},
                {"id": "t2", "tStart": 60, "type": "end", "text": "Butter and eat"}
            ]},
            {"id": "b", "name": "Tea", "cookTime": 5, "timeline": [
                {"id": "s1", "tStart": 0, "tEnd": 180, "type": "progress", "text": "Steep", "category": "brew"},
                {"id": "s2", "tStart": 180, "tEnd": 300, "type": "end", "text": "Drink"}
            ]}
        ]}"#,
    )
    .unwrap();

    let recipe = pick(load_recipes(&path).unwrap(), 1).unwrap();
    assert_eq!(recipe.total_seconds(), 300);

    let time = ManualTime::new();
    let mut app = App::new(recipe, Config::default(), time.clone());
    let updates = app.session.subscribe();

    app.handle(key(' '));
    time.advance(200_000);
    app.handle(SessionEvent::Tick);

    let latest = updates.try_iter().last().unwrap();
    assert_eq!(latest.status, SessionStatus::Running);
    assert_eq!(latest.next.active.id, "s2");
    assert!(latest.next.queue.is_empty());
}
