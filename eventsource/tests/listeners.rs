mod common;

use common::{wait_ms, MockTransport, Recorder};
use eventsource::{EventSourceConfig, Listener, MessageEvent, ReconnectingEventSource};
use std::sync::{Arc, Mutex};

fn connect(transport: &MockTransport) -> ReconnectingEventSource<MockTransport> {
    ReconnectingEventSource::new(
        transport.clone(),
        "https://x/stream",
        EventSourceConfig::default(),
    )
    .expect("mock transport should connect")
}

fn recording(recorder: &Recorder, name: &'static str) -> Listener {
    let recorder = recorder.clone();
    Listener::new(move |event| recorder.push(format!("{name}:{}", event.data)))
}

#[tokio::test(start_paused = true)]
async fn test_listeners_run_in_registration_order() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();

    source.add_event_listener("update", &recording(&recorder, "A"));
    source.add_event_listener("update", &recording(&recorder, "B"));

    transport.last().open();
    transport.last().emit(MessageEvent::new("update", "1"));

    assert_eq!(recorder.entries(), vec!["A:1", "B:1"]);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_registration_is_invoked_once() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let a = recording(&recorder, "A");

    source.add_event_listener("update", &a);
    source.add_event_listener("update", &a);
    source.add_event_listener("update", &a.clone());

    transport.last().emit(MessageEvent::new("update", "1"));

    assert_eq!(recorder.entries(), vec!["A:1"]);
}

#[tokio::test(start_paused = true)]
async fn test_same_listener_may_serve_several_types() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let a = recording(&recorder, "A");

    source.add_event_listener("created", &a);
    source.add_event_listener("deleted", &a);

    transport.last().emit(MessageEvent::new("created", "1"));
    transport.last().emit(MessageEvent::new("deleted", "2"));

    assert_eq!(recorder.entries(), vec!["A:1", "A:2"]);
}

#[tokio::test(start_paused = true)]
async fn test_first_listener_attaches_type_and_last_removal_detaches_it() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let a = recording(&recorder, "A");
    let b = recording(&recorder, "B");

    assert_eq!(transport.last().event_types(), vec!["message"]);

    source.add_event_listener("update", &a);
    source.add_event_listener("update", &b);
    assert_eq!(transport.last().event_types(), vec!["message", "update"]);

    source.remove_event_listener("update", &a);
    assert_eq!(transport.last().event_types(), vec!["message", "update"]);

    source.remove_event_listener("update", &b);
    assert_eq!(transport.last().event_types(), vec!["message"]);

    transport.last().emit(MessageEvent::new("update", "1"));
    assert!(recorder.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_removing_unknown_listener_is_a_noop() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let a = recording(&recorder, "A");

    source.remove_event_listener("update", &a);
    source.add_event_listener("update", &a);
    source.remove_event_listener("update", &recording(&recorder, "other"));
    source.remove_event_listener("missing", &a);

    transport.last().emit(MessageEvent::new("update", "1"));

    assert_eq!(recorder.entries(), vec!["A:1"]);
}

#[tokio::test(start_paused = true)]
async fn test_types_are_reattached_on_reconnect() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();

    source.add_event_listener("update", &recording(&recorder, "A"));
    source.add_event_listener("stream-reset", &recording(&recorder, "R"));

    transport.last().open();
    transport.last().terminal_failure();
    wait_ms(3001).await;

    let second = transport.last();
    assert_eq!(transport.attempts(), 2);
    assert_eq!(
        second.event_types(),
        vec!["message", "stream-reset", "update"]
    );

    second.open();
    second.emit(MessageEvent::new("update", "after"));
    assert_eq!(recorder.entries(), vec!["A:after"]);
}

#[tokio::test(start_paused = true)]
async fn test_listener_added_while_disconnected_is_attached_on_reconnect() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();

    transport.last().terminal_failure();
    source.add_event_listener("update", &recording(&recorder, "A"));
    wait_ms(3001).await;

    assert_eq!(transport.last().event_types(), vec!["message", "update"]);
}

#[tokio::test(start_paused = true)]
async fn test_self_removal_during_dispatch_completes_snapshot() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();

    let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));
    let once = {
        let source = source.clone();
        let recorder = recorder.clone();
        let slot = Arc::clone(&slot);
        Listener::new(move |event| {
            recorder.push(format!("once:{}", event.data));
            if let Some(me) = slot.lock().unwrap().as_ref() {
                source.remove_event_listener("message", me);
            }
        })
    };
    *slot.lock().unwrap() = Some(once.clone());

    source.add_event_listener("message", &once);
    source.add_event_listener("message", &recording(&recorder, "B"));

    transport.last().emit(MessageEvent::new("message", "1"));
    transport.last().emit(MessageEvent::new("message", "2"));

    assert_eq!(recorder.entries(), vec!["once:1", "B:1", "B:2"]);
}

#[tokio::test(start_paused = true)]
async fn test_listener_added_during_dispatch_waits_for_next_event() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let late = recording(&recorder, "late");

    let adder = {
        let source = source.clone();
        let recorder = recorder.clone();
        Listener::new(move |event| {
            recorder.push(format!("adder:{}", event.data));
            source.add_event_listener("update", &late);
        })
    };
    source.add_event_listener("update", &adder);

    transport.last().emit(MessageEvent::new("update", "1"));
    transport.last().emit(MessageEvent::new("update", "2"));

    assert_eq!(
        recorder.entries(),
        vec!["adder:1", "adder:2", "late:2"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cursor_is_updated_before_listeners_run() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let observed = Arc::new(Mutex::new(None));

    let listener = {
        let source = source.clone();
        let observed = Arc::clone(&observed);
        Listener::new(move |_| *observed.lock().unwrap() = source.last_event_id())
    };
    source.add_event_listener("update", &listener);

    transport
        .last()
        .emit(MessageEvent::new("update", "").with_id("5"));

    assert_eq!(observed.lock().unwrap().as_deref(), Some("5"));
}

#[tokio::test(start_paused = true)]
async fn test_events_without_id_keep_the_cursor() {
    let transport = MockTransport::new();
    let source = connect(&transport);

    transport
        .last()
        .emit(MessageEvent::new("message", "").with_id("5"));
    transport.last().emit(MessageEvent::new("message", ""));
    transport
        .last()
        .emit(MessageEvent::new("message", "").with_id(""));

    assert_eq!(source.last_event_id().as_deref(), Some("5"));
}

#[tokio::test(start_paused = true)]
async fn test_on_message_runs_after_listeners_for_default_type_only() {
    let transport = MockTransport::new();
    let recorder = Recorder::new();
    let hook = recorder.clone();
    let source = ReconnectingEventSource::new(
        transport.clone(),
        "https://x/stream",
        EventSourceConfig::default().on_message(move |event| hook.push(format!("hook:{}", event.data))),
    )
    .unwrap();

    source.add_event_listener("message", &recording(&recorder, "A"));
    source.add_event_listener("update", &recording(&recorder, "U"));

    transport.last().emit(MessageEvent::new("message", "1"));
    transport.last().emit(MessageEvent::new("update", "2"));

    assert_eq!(recorder.entries(), vec!["A:1", "hook:1", "U:2"]);
}

#[tokio::test(start_paused = true)]
async fn test_on_message_works_without_listeners() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let hook = recorder.clone();
    source.set_on_message(move |event| hook.push(event.data.clone()));

    transport.last().emit(MessageEvent::new("message", "hi"));

    assert_eq!(recorder.entries(), vec!["hi"]);
}

#[tokio::test(start_paused = true)]
async fn test_close_inside_listener_stops_the_rest_of_dispatch() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let closer = {
        let source = source.clone();
        let recorder = recorder.clone();
        Listener::new(move |_| {
            recorder.push("closer");
            source.close();
        })
    };

    source.add_event_listener("update", &closer);
    source.add_event_listener("update", &recording(&recorder, "B"));

    transport.last().emit(MessageEvent::new("update", "1"));

    assert_eq!(recorder.entries(), vec!["closer"]);
}

#[tokio::test(start_paused = true)]
async fn test_add_after_close_is_ignored() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let recorder = Recorder::new();
    let attempt = transport.last();

    source.close();
    source.add_event_listener("update", &recording(&recorder, "A"));
    attempt.emit_unfiltered(MessageEvent::new("update", "1"));

    assert_eq!(attempt.event_types(), vec!["message"]);
    assert!(recorder.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_close_drops_callbacks_holding_the_client() {
    let transport = MockTransport::new();
    let source = connect(&transport);
    let token = Arc::new(());

    let listener = {
        let token = Arc::clone(&token);
        let handle = source.clone();
        Listener::new(move |_| {
            let _held = Arc::clone(&token);
            handle.close();
        })
    };
    source.add_event_listener("update", &listener);
    drop(listener);
    source.set_on_error({
        let token = Arc::clone(&token);
        move |_| {
            let _held = Arc::clone(&token);
        }
    });
    assert_eq!(Arc::strong_count(&token), 3);

    source.close();

    assert_eq!(Arc::strong_count(&token), 1);
    source.remove_event_listener("update", &recording(&Recorder::new(), "late"));
}
