//! End-to-end tests driving a host over a real TCP connection.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rstest::rstest;
use serde_json::{Map, Value};
use tether::components::MemoryTree;
use tether::dispatch::{CommandHandler, ComponentScope, GET_COMPONENT_PATH_COMMAND};
use tether::{Command, Config, ControlCentre, Event, Response};
use tether_driver::{Driver, DriverError};

const HOST_DEADLINE: Duration = Duration::from_secs(10);

type Setup = fn(&mut ControlCentre<MemoryTree>, &mut MemoryTree);

/// Echoes `text` back.
struct EchoHandler;

impl CommandHandler<MemoryTree> for EchoHandler {
    fn process(
        &mut self,
        command: &Command,
        _scope: &mut ComponentScope<'_, MemoryTree>,
    ) -> Option<Response> {
        (command.kind() == "echo").then(|| {
            let text = command.argument::<String>("text").unwrap_or_default();
            Response::ok().with_field("text", text)
        })
    }
}

/// Answers `echo` with a fixed marker so fan-out is observable.
struct SecondOpinion;

impl CommandHandler<MemoryTree> for SecondOpinion {
    fn process(
        &mut self,
        command: &Command,
        _scope: &mut ComponentScope<'_, MemoryTree>,
    ) -> Option<Response> {
        (command.kind() == "echo").then(|| Response::ok().with_field("text", "second"))
    }
}

struct Host {
    addr: SocketAddr,
    thread: JoinHandle<bool>,
}

impl Host {
    /// Runs a host application on its own thread until it is told to quit.
    ///
    /// The thread yields `true` when it stopped because of a quit command.
    fn spawn(setup: Setup) -> Self {
        let (addr_tx, addr_rx) = mpsc::channel();
        let thread = thread::spawn(move || {
            let mut tree = MemoryTree::new();
            let mut centre: ControlCentre<MemoryTree> =
                ControlCentre::new(&Config::default(), ["host", "--e2e-test-port=0"]);
            setup(&mut centre, &mut tree);
            addr_tx
                .send(centre.local_addr().expect("endpoint bound"))
                .expect("report address");
            let started = Instant::now();
            let mut announced = false;
            while started.elapsed() < HOST_DEADLINE {
                let flow = centre.wait_and_process(&mut tree, Duration::from_millis(20));
                if flow == ControlFlow::Break(()) {
                    return true;
                }
                if !announced && centre.is_connected() {
                    centre.send_event(&Event::new("driver-connected").with_field("host", "demo"));
                    announced = true;
                }
            }
            false
        });
        let addr = addr_rx.recv_timeout(HOST_DEADLINE).expect("host address");
        Self { addr, thread }
    }

    fn driver(&self) -> Driver {
        Driver::connect_with_retry(self.addr, HOST_DEADLINE).expect("connect to host")
    }

    fn quit(self, driver: &mut Driver) {
        let response = driver.request(Command::new("quit", "")).expect("quit");
        assert!(response.is_success());
        driver.wait_for_disconnect().expect("host closes connection");
        assert!(self.thread.join().expect("host thread"));
    }
}

fn scene(centre: &mut ControlCentre<MemoryTree>, tree: &mut MemoryTree) {
    let r1 = tree.create_node(Some("R1"));
    let r2 = tree.create_node(Some("R2"));
    let panel = tree.create_child(r2, None).expect("panel");
    tree.create_child(panel, None).expect("first child");
    tree.create_child(panel, None).expect("second child");
    centre.add_root_component(r1);
    centre.add_root_component(r2);
}

fn with_handlers(centre: &mut ControlCentre<MemoryTree>, tree: &mut MemoryTree) {
    scene(centre, tree);
    centre.add_command_handler(EchoHandler);
    centre.add_command_handler(SecondOpinion);
}

fn bare(_centre: &mut ControlCentre<MemoryTree>, _tree: &mut MemoryTree) {}

#[rstest]
fn unknown_command_is_reported_unhandled() {
    let host = Host::spawn(bare);
    let mut driver = host.driver();

    let response = driver
        .request(Command::new("ping", "abc"))
        .expect("response");

    assert_eq!(response.uuid(), Some("abc"));
    assert_eq!(response.failure_message(), Some("Unhandled message"));
    host.quit(&mut driver);
}

#[rstest]
#[case::positional("R2/0/1", "R2/0/1")]
#[case::named_root("R1", "R1")]
fn paths_are_canonicalised_over_the_wire(#[case] path: &str, #[case] expected: &str) {
    let host = Host::spawn(scene);
    let mut driver = host.driver();

    let mut arguments = Map::new();
    arguments.insert("path".to_owned(), Value::from(path));
    let response = driver
        .request_with(GET_COMPONENT_PATH_COMMAND, arguments)
        .expect("response");

    assert!(response.is_success(), "{response:?}");
    assert_eq!(
        response.field("path").and_then(Value::as_str),
        Some(expected)
    );
    host.quit(&mut driver);
}

#[rstest]
fn every_handler_answers_in_registration_order() {
    let host = Host::spawn(with_handlers);
    let mut driver = host.driver();

    let uuid = driver
        .send(Command::new("echo", "").with_argument("text", "first"))
        .expect("send");
    let responses = driver.collect_responses(&uuid, 2).expect("responses");

    let texts: Vec<_> = responses
        .iter()
        .map(|response| response.field("text").and_then(Value::as_str))
        .collect();
    assert_eq!(texts, [Some("first"), Some("second")]);
    host.quit(&mut driver);
}

#[rstest]
fn malformed_frames_do_not_disturb_the_session() {
    let host = Host::spawn(bare);
    let mut driver = host.driver();

    driver.send_raw(b"{not json\n\n").expect("write");
    let response = driver
        .request(Command::new("ping", "after"))
        .expect("response");

    assert_eq!(response.uuid(), Some("after"));
    assert!(driver.drain_unclaimed().is_empty());
    host.quit(&mut driver);
}

#[rstest]
fn quit_is_acknowledged_before_disconnect() {
    let host = Host::spawn(bare);
    let mut driver = host.driver();

    let uuid = driver.send(Command::new("quit", "")).expect("send");
    let response = driver.await_response(&uuid).expect("acknowledgement");
    assert!(response.is_success());

    let closed = driver.wait_for_disconnect();
    assert!(closed.is_ok(), "{closed:?}");
    assert!(host.thread.join().expect("host thread"));
}

#[rstest]
fn host_events_reach_the_driver_without_a_uuid() {
    let host = Host::spawn(bare);
    let mut driver = host.driver();

    let event = driver.next_event().expect("event");

    assert_eq!(event.kind(), "driver-connected");
    assert_eq!(event.field("host").and_then(Value::as_str), Some("demo"));
    assert_eq!(event.field("uuid"), None);
    host.quit(&mut driver);
}

#[rstest]
fn driver_times_out_without_a_host_reply() {
    let host = Host::spawn(bare);
    let mut driver = host.driver();
    driver
        .set_timeout(Duration::from_millis(100))
        .expect("timeout");

    let result = driver.await_response("never-sent");

    assert!(matches!(result, Err(DriverError::Timeout { .. })));
    driver
        .set_timeout(tether_driver::DEFAULT_TIMEOUT)
        .expect("timeout");
    host.quit(&mut driver);
}
