//! Test-driver client for the tether control endpoint.
//!
//! A [`Driver`] connects to a host application's endpoint, sends commands
//! stamped with fresh uuids and waits for the responses correlated to them.
//! Events and responses for other commands that arrive in the meantime are
//! buffered rather than discarded.

use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tether_protocol::{Command, Event, PeerMessage, ProtocolError, Response, encode_frame};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

const DRIVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::driver");

/// Default time to wait for a single inbound message.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Errors raised while talking to an endpoint.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The endpoint could not be reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address the connection was attempted on.
        addr: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading from or writing to the socket failed.
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// No message arrived within the read timeout.
    #[error("timed out waiting for {waiting_for}")]
    Timeout {
        /// What the driver was waiting for.
        waiting_for: String,
    },
    /// The endpoint closed the connection.
    #[error("endpoint closed the connection")]
    Disconnected,
}

impl DriverError {
    fn timeout(waiting_for: impl Into<String>) -> Self {
        Self::Timeout {
            waiting_for: waiting_for.into(),
        }
    }
}

/// Client side of the control protocol.
#[derive(Debug)]
pub struct Driver {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    line: String,
    responses: HashMap<String, VecDeque<Response>>,
    events: VecDeque<Event>,
}

impl Driver {
    /// Connects to an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Connect`] when the endpoint is unreachable.
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self, DriverError> {
        let label = format!("{addr:?}");
        let stream = TcpStream::connect(addr).map_err(|source| DriverError::Connect {
            addr: label,
            source,
        })?;
        Self::from_stream(stream)
    }

    /// Connects to an endpoint, retrying until `deadline` elapses.
    ///
    /// Useful when the host application is still starting.
    ///
    /// # Errors
    ///
    /// Returns the last [`DriverError::Connect`] once the deadline passes.
    pub fn connect_with_retry(addr: SocketAddr, deadline: Duration) -> Result<Self, DriverError> {
        let started = Instant::now();
        loop {
            match TcpStream::connect(addr) {
                Ok(stream) => return Self::from_stream(stream),
                Err(source) if started.elapsed() >= deadline => {
                    return Err(DriverError::Connect {
                        addr: addr.to_string(),
                        source,
                    });
                }
                Err(error) => {
                    debug!(target: DRIVER_TARGET, %addr, error = %error, "endpoint not ready; retrying");
                    thread::sleep(CONNECT_RETRY_INTERVAL);
                }
            }
        }
    }

    fn from_stream(stream: TcpStream) -> Result<Self, DriverError> {
        stream
            .set_read_timeout(Some(DEFAULT_TIMEOUT))
            .map_err(DriverError::Io)?;
        stream.set_nodelay(true).map_err(DriverError::Io)?;
        let writer = stream.try_clone().map_err(DriverError::Io)?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            line: String::new(),
            responses: HashMap::new(),
            events: VecDeque::new(),
        })
    }

    /// Changes how long a single read may block.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Io`] if the socket rejects the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), DriverError> {
        self.reader
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(DriverError::Io)
    }

    /// Sends a command, assigning a fresh uuid when it has none.
    ///
    /// Returns the uuid the command was sent with.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when encoding or writing fails.
    pub fn send(&mut self, command: Command) -> Result<String, DriverError> {
        let stamped = if command.uuid().is_empty() {
            command.with_uuid(Uuid::new_v4().to_string())
        } else {
            command
        };
        let frame = encode_frame(&stamped)?;
        self.send_raw(&frame)?;
        debug!(target: DRIVER_TARGET, command = %stamped.describe(), "command sent");
        Ok(stamped.uuid().to_owned())
    }

    /// Writes raw bytes to the endpoint, for exercising malformed input.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Io`] when the write fails.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        self.writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush())
            .map_err(DriverError::Io)
    }

    /// Sends a command and waits for its first response.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when sending fails, the read times out or the
    /// endpoint disconnects.
    pub fn request(&mut self, command: Command) -> Result<Response, DriverError> {
        let uuid = self.send(command)?;
        self.await_response(&uuid)
    }

    /// Sends a command of type `kind` with the given payload fields.
    ///
    /// # Errors
    ///
    /// See [`Driver::request`].
    pub fn request_with(
        &mut self,
        kind: &str,
        arguments: Map<String, Value>,
    ) -> Result<Response, DriverError> {
        let command = arguments
            .into_iter()
            .fold(Command::new(kind, ""), |command, (key, value)| {
                command.with_argument(key, value)
            });
        self.request(command)
    }

    /// Waits for the next response correlated to `uuid`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Timeout`] or [`DriverError::Disconnected`] when
    /// no such response arrives.
    pub fn await_response(&mut self, uuid: &str) -> Result<Response, DriverError> {
        loop {
            if let Some(response) = self.take_buffered(uuid) {
                return Ok(response);
            }
            self.read_message(uuid)?;
        }
    }

    /// Waits for `count` responses correlated to `uuid`.
    ///
    /// # Errors
    ///
    /// See [`Driver::await_response`].
    pub fn collect_responses(
        &mut self,
        uuid: &str,
        count: usize,
    ) -> Result<Vec<Response>, DriverError> {
        (0..count).map(|_| self.await_response(uuid)).collect()
    }

    /// Waits for the next event.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Timeout`] or [`DriverError::Disconnected`] when
    /// no event arrives.
    pub fn next_event(&mut self) -> Result<Event, DriverError> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(event);
            }
            self.read_message("an event")?;
        }
    }

    /// Returns responses that arrived but were never awaited.
    pub fn drain_unclaimed(&mut self) -> Vec<Response> {
        self.responses.drain().flat_map(|(_, queue)| queue).collect()
    }

    /// Reads until the endpoint closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Timeout`] when the connection stays open.
    pub fn wait_for_disconnect(&mut self) -> Result<(), DriverError> {
        loop {
            match self.read_message("the endpoint to disconnect") {
                Err(DriverError::Disconnected) => return Ok(()),
                Err(error) => return Err(error),
                Ok(()) => {}
            }
        }
    }

    fn take_buffered(&mut self, uuid: &str) -> Option<Response> {
        let queue = self.responses.get_mut(uuid)?;
        let response = queue.pop_front();
        if queue.is_empty() {
            self.responses.remove(uuid);
        }
        response
    }

    /// Reads one message and files it as a response or an event.
    fn read_message(&mut self, waiting_for: &str) -> Result<(), DriverError> {
        loop {
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return Err(DriverError::Disconnected),
                Ok(_) if !self.line.ends_with('\n') => return Err(DriverError::Disconnected),
                Ok(_) => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(DriverError::timeout(waiting_for));
                }
                Err(error) => return Err(DriverError::Io(error)),
            }
        }
        let line = std::mem::take(&mut self.line);
        if line.trim().is_empty() {
            return Ok(());
        }
        match PeerMessage::from_json(line.as_bytes()) {
            Ok(PeerMessage::Response(response)) => {
                let uuid = response.uuid().unwrap_or_default().to_owned();
                self.responses.entry(uuid).or_default().push_back(response);
            }
            Ok(PeerMessage::Event(event)) => self.events.push_back(event),
            Err(error) => {
                warn!(target: DRIVER_TARGET, error = %error, line = line.trim(), "ignoring undecodable message");
            }
        }
        Ok(())
    }
}
