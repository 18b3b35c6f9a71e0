//! Unit tests for control centre dispatch, events and construction.

use std::net::TcpListener;
use std::ops::ControlFlow;
use std::sync::mpsc;
use std::time::Duration;

use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tether_config::{Config, LogLevel};
use tether_protocol::{Event, UNHANDLED_MESSAGE};

use super::support::{AnsweringHandler, Harness, text_field};
use crate::components::MemoryTree;
use crate::transport::{Frame, FrameSink};
use crate::{ControlCentre, Modifiers};

mock! {
    Sink {}
    impl FrameSink for Sink {
        fn is_connected(&self) -> bool;
        fn send(&self, frame: &[u8]);
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[rstest]
fn unhandled_command_gets_exact_failure_frame(mut harness: Harness) {
    harness.push(r#"{"type":"ping","uuid":"abc"}"#);

    assert_eq!(harness.process(), ControlFlow::Continue(()));

    assert_eq!(
        harness.sink.frames(),
        vec![b"{\"uuid\":\"abc\",\"failure\":\"Unhandled message\"}\n".to_vec()]
    );
}

#[rstest]
fn quit_is_answered_then_breaks(mut harness: Harness) {
    harness.push(r#"{"type":"quit","uuid":"x"}"#);
    harness.push(r#"{"type":"ping","uuid":"later"}"#);

    assert_eq!(harness.process(), ControlFlow::Break(()));
    let responses = harness.sink.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].uuid(), Some("x"));
    assert!(responses[0].is_success());

    assert_eq!(harness.process(), ControlFlow::Continue(()));
    let responses = harness.sink.responses();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[1].uuid(), Some("later"));
}

#[rstest]
fn every_responder_produces_its_own_response(mut harness: Harness) {
    harness
        .centre
        .add_command_handler(AnsweringHandler::new("greet", "first"));
    harness
        .centre
        .add_command_handler(AnsweringHandler::new("greet", "second"));
    harness.push(r#"{"type":"greet","uuid":"g1"}"#);

    assert_eq!(harness.process(), ControlFlow::Continue(()));

    let responses = harness.sink.responses();
    let responders: Vec<_> = responses
        .iter()
        .map(|response| text_field(response, "responder"))
        .collect();
    assert_eq!(responders, [Some("first"), Some("second")]);
    assert!(responses.iter().all(|response| response.uuid() == Some("g1")));
}

#[rstest]
fn every_handler_sees_every_command(mut harness: Harness) {
    let answering = AnsweringHandler::new("greet", "first");
    let silent = AnsweringHandler::new("never", "silent");
    let answering_seen = answering.seen();
    let silent_seen = silent.seen();
    harness.centre.add_command_handler(answering);
    harness.centre.add_command_handler(silent);

    harness.push(r#"{"type":"greet","uuid":"1"}"#);
    harness.push(r#"{"type":"other","uuid":"2"}"#);
    assert_eq!(harness.process(), ControlFlow::Continue(()));

    assert_eq!(answering_seen.get(), 2);
    assert_eq!(silent_seen.get(), 2);
}

#[rstest]
fn removed_handlers_no_longer_respond(mut harness: Harness) {
    let id = harness
        .centre
        .add_command_handler(AnsweringHandler::new("greet", "first"));

    assert!(harness.centre.remove_command_handler(id));
    assert!(!harness.centre.remove_command_handler(id));

    harness.push(r#"{"type":"greet","uuid":"g"}"#);
    assert_eq!(harness.process(), ControlFlow::Continue(()));
    let responses = harness.sink.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].failure_message(), Some(UNHANDLED_MESSAGE));
}

#[rstest]
#[case::not_json("not json")]
#[case::array("[1,2]")]
#[case::missing_type(r#"{"uuid":"u"}"#)]
#[case::blank_type(r#"{"type":"  ","uuid":"u"}"#)]
#[case::numeric_type(r#"{"type":3,"uuid":"u"}"#)]
fn invalid_frames_get_no_response(mut harness: Harness, #[case] frame: &str) {
    harness.push(frame);

    assert_eq!(harness.process(), ControlFlow::Continue(()));
    assert!(harness.sink.frames().is_empty());
}

#[rstest]
fn invalid_frame_does_not_block_later_commands(mut harness: Harness) {
    harness.push("{broken");
    harness.push(r#"{"type":"ping","uuid":"after"}"#);

    assert_eq!(harness.process(), ControlFlow::Continue(()));

    let responses = harness.sink.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].uuid(), Some("after"));
}

#[rstest]
fn events_carry_no_uuid(harness: Harness) {
    harness
        .centre
        .send_event(&Event::new("opened").with_field("window", "main"));

    let frames = harness.sink.frames();
    assert_eq!(frames.len(), 1);
    let value: Value = serde_json::from_slice(&frames[0]).expect("json");
    assert_eq!(value, json!({"type": "opened", "window": "main"}));
}

#[rstest]
fn events_are_dropped_while_disconnected(harness: Harness) {
    harness.sink.set_connected(false);
    harness.centre.send_event(&Event::new("opened"));
    harness.sink.set_connected(true);

    assert!(harness.sink.frames().is_empty());
}

#[test]
fn disconnected_sink_never_sees_event_bytes() {
    let mut sink = MockSink::new();
    sink.expect_is_connected().return_const(false);
    let (_inbound, frames) = mpsc::channel();
    let centre: ControlCentre<MemoryTree> =
        ControlCentre::with_sink(LogLevel::Info, Box::new(sink), frames);

    centre.send_event(&Event::new("tick"));

    assert!(!centre.is_connected());
}

#[test]
fn unhandled_response_is_written_once() {
    let mut sink = MockSink::new();
    sink.expect_is_connected().return_const(true);
    sink.expect_send()
        .once()
        .withf(|frame| {
            frame.to_vec() == b"{\"uuid\":\"abc\",\"failure\":\"Unhandled message\"}\n".to_vec()
        })
        .return_const(());
    let (inbound, frames) = mpsc::channel();
    let mut centre: ControlCentre<MemoryTree> =
        ControlCentre::with_sink(LogLevel::Info, Box::new(sink), frames);
    let mut tree = MemoryTree::new();

    inbound
        .send(Frame::new(0, br#"{"type":"ping","uuid":"abc"}"#.to_vec()))
        .expect("queue frame");

    assert_eq!(centre.process_pending(&mut tree), ControlFlow::Continue(()));
}

#[rstest]
fn frames_from_a_replaced_peer_are_discarded(mut harness: Harness) {
    harness.push_from(1, r#"{"type":"quit","uuid":"stale"}"#);
    harness.push_from(2, r#"{"type":"ping","uuid":"fresh"}"#);
    harness.sink.set_peer(Some(2));

    assert_eq!(harness.process(), ControlFlow::Continue(()));

    let uuids: Vec<_> = harness
        .sink
        .responses()
        .iter()
        .map(|response| response.uuid().map(str::to_owned))
        .collect();
    assert_eq!(uuids, [Some("fresh".to_owned())]);
}

#[rstest]
fn frames_are_dispatched_when_the_sink_tracks_no_peer(mut harness: Harness) {
    harness.push_from(1, r#"{"type":"quit","uuid":"q"}"#);
    harness.sink.set_peer(None);

    assert_eq!(harness.process(), ControlFlow::Break(()));
}

#[rstest]
fn wait_and_process_times_out_quietly(mut harness: Harness) {
    let flow = harness
        .centre
        .wait_and_process(&mut harness.tree, Duration::from_millis(10));

    assert_eq!(flow, ControlFlow::Continue(()));
    assert!(harness.sink.frames().is_empty());
}

#[rstest]
fn wait_and_process_dispatches_queued_frames(mut harness: Harness) {
    harness.push(r#"{"type":"ping","uuid":"1"}"#);
    harness.push(r#"{"type":"ping","uuid":"2"}"#);

    let flow = harness
        .centre
        .wait_and_process(&mut harness.tree, Duration::from_secs(1));

    assert_eq!(flow, ControlFlow::Continue(()));
    let uuids: Vec<_> = harness
        .sink
        .responses()
        .iter()
        .map(|response| response.uuid().map(str::to_owned))
        .collect();
    assert_eq!(uuids, [Some("1".to_owned()), Some("2".to_owned())]);
}

#[test]
fn centre_without_port_is_inert() {
    let mut centre: ControlCentre<MemoryTree> =
        ControlCentre::new(&Config::default(), ["app", "--verbose"]);
    let mut tree = MemoryTree::new();

    assert!(!centre.is_active());
    assert!(!centre.is_connected());
    assert_eq!(centre.local_addr(), None);
    assert_eq!(centre.process_pending(&mut tree), ControlFlow::Continue(()));
    centre.send_event(&Event::new("ignored"));
}

#[test]
fn launch_argument_starts_listener_on_ephemeral_port() {
    let centre: ControlCentre<MemoryTree> =
        ControlCentre::new(&Config::default(), ["app", "--e2e-test-port=0"]);

    assert!(centre.is_active());
    let addr = centre.local_addr().expect("bound address");
    assert_ne!(addr.port(), 0);
    assert!(!centre.is_connected());
}

#[test]
fn configured_zero_port_starts_listener() {
    let config = Config::default().with_port(0);

    let centre: ControlCentre<MemoryTree> = ControlCentre::new(&config, ["app"]);

    assert!(centre.is_active());
    let addr = centre.local_addr().expect("bound address");
    assert_ne!(addr.port(), 0);
}

#[test]
fn bind_failure_leaves_centre_inert() {
    let taken = TcpListener::bind("127.0.0.1:0").expect("occupy port");
    let port = taken.local_addr().expect("addr").port();
    let config = Config::default().with_port(port);

    let centre: ControlCentre<MemoryTree> = ControlCentre::new(&config, ["app"]);

    assert!(!centre.is_active());
}

#[rstest]
fn component_path_is_exposed_to_embedding_code(mut harness: Harness) {
    let leaf = harness.build_two_root_scene();

    let path = harness
        .centre
        .component_path(&harness.tree, leaf)
        .expect("path");

    assert_eq!(path.to_string(), "R2/0/1");
    assert_eq!(harness.centre.resolve(&harness.tree, "R2/0/1"), Ok(leaf));
}

#[rstest]
fn inspector_reports_paths_for_pointer_gestures(mut harness: Harness) {
    let leaf = harness.build_two_root_scene();
    let inspector = harness.centre.inspector();

    let clicked = inspector.on_double_click(&harness.tree, leaf);
    assert_eq!(clicked.map(|path| path.to_string()).as_deref(), Some("R2/0/1"));

    assert_eq!(inspector.on_hover(&harness.tree, leaf, Modifiers::default()), None);
    let hovered = inspector.on_hover(&harness.tree, leaf, Modifiers::SHIFT);
    assert_eq!(hovered.map(|path| path.to_string()).as_deref(), Some("R2/0/1"));
}

#[rstest]
fn inspector_ignores_unregistered_components(mut harness: Harness) {
    let orphan = harness.tree.create_node(Some("orphan"));

    assert_eq!(
        harness.centre.inspector().on_double_click(&harness.tree, orphan),
        None
    );
}
