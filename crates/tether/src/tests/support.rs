//! Shared fixtures for the control centre test suites.

use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};

use serde_json::{Value, json};
use tether_config::LogLevel;
use tether_protocol::{Command, Event, PeerMessage, Response};

use crate::ControlCentre;
use crate::components::{MemoryTree, NodeId};
use crate::dispatch::{CommandHandler, ComponentScope};
use crate::transport::{Frame, FrameSink};

/// Sink recording every frame written while connected.
#[derive(Debug, Clone)]
pub(crate) struct RecordingSink {
    frames: Rc<RefCell<Vec<Vec<u8>>>>,
    connected: Rc<Cell<bool>>,
    peer: Rc<Cell<Option<u64>>>,
}

impl RecordingSink {
    pub(crate) fn connected() -> Self {
        Self {
            frames: Rc::default(),
            connected: Rc::new(Cell::new(true)),
            peer: Rc::default(),
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    pub(crate) fn set_peer(&self, peer: Option<u64>) {
        self.peer.set(peer);
    }

    pub(crate) fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.borrow().clone()
    }

    pub(crate) fn messages(&self) -> Vec<PeerMessage> {
        self.frames
            .borrow()
            .iter()
            .map(|frame| PeerMessage::from_json(frame).expect("decode outbound frame"))
            .collect()
    }

    pub(crate) fn responses(&self) -> Vec<Response> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                PeerMessage::Response(response) => Some(response),
                PeerMessage::Event(_) => None,
            })
            .collect()
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                PeerMessage::Event(event) => Some(event),
                PeerMessage::Response(_) => None,
            })
            .collect()
    }
}

impl FrameSink for RecordingSink {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn send(&self, frame: &[u8]) {
        if self.connected.get() {
            self.frames.borrow_mut().push(frame.to_vec());
        }
    }

    fn peer(&self) -> Option<u64> {
        self.peer.get()
    }
}

/// Answers one command type with a success carrying `responder`.
#[derive(Debug)]
pub(crate) struct AnsweringHandler {
    kind: String,
    responder: String,
    seen: Rc<Cell<usize>>,
}

impl AnsweringHandler {
    pub(crate) fn new(kind: impl Into<String>, responder: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            responder: responder.into(),
            seen: Rc::default(),
        }
    }

    pub(crate) fn seen(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.seen)
    }
}

impl CommandHandler<MemoryTree> for AnsweringHandler {
    fn process(
        &mut self,
        command: &Command,
        _scope: &mut ComponentScope<'_, MemoryTree>,
    ) -> Option<Response> {
        self.seen.set(self.seen.get() + 1);
        (command.kind() == self.kind)
            .then(|| Response::ok().with_field("responder", self.responder.clone()))
    }
}

/// Control centre wired to a recording sink and an in-memory tree.
pub(crate) struct Harness {
    pub(crate) centre: ControlCentre<MemoryTree>,
    pub(crate) tree: MemoryTree,
    pub(crate) sink: RecordingSink,
    inbound: Sender<Frame>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let sink = RecordingSink::connected();
        let (inbound, frames) = mpsc::channel();
        let centre = ControlCentre::with_sink(LogLevel::Debug, Box::new(sink.clone()), frames);
        Self {
            centre,
            tree: MemoryTree::new(),
            sink,
            inbound,
        }
    }

    pub(crate) fn push(&self, frame: &str) {
        self.push_from(0, frame);
    }

    pub(crate) fn push_from(&self, peer: u64, frame: &str) {
        self.inbound
            .send(Frame::new(peer, frame.as_bytes().to_vec()))
            .expect("queue frame");
    }

    pub(crate) fn push_command(&self, kind: &str, uuid: &str, path: Option<&str>) {
        let mut command = json!({"type": kind, "uuid": uuid});
        if let (Some(path), Some(object)) = (path, command.as_object_mut()) {
            object.insert("path".to_owned(), Value::from(path));
        }
        self.push(&command.to_string());
    }

    pub(crate) fn process(&mut self) -> ControlFlow<()> {
        self.centre.process_pending(&mut self.tree)
    }

    /// Builds roots `R1` and `R2`; under `R2` an unnamed panel with two
    /// unnamed children. Returns the second child.
    pub(crate) fn build_two_root_scene(&mut self) -> NodeId {
        let r1 = self.tree.create_node(Some("R1"));
        let r2 = self.tree.create_node(Some("R2"));
        let panel = self.tree.create_child(r2, None).expect("panel");
        self.tree.create_child(panel, None).expect("first child");
        let leaf = self.tree.create_child(panel, None).expect("leaf");
        self.centre.add_root_component(r1);
        self.centre.add_root_component(r2);
        leaf
    }
}

/// Looks up a string field of a success response.
pub(crate) fn text_field<'a>(response: &'a Response, key: &str) -> Option<&'a str> {
    response.field(key).and_then(Value::as_str)
}
