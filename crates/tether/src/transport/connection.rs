//! Single-peer TCP connection with a background accept loop.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::framing::FrameDecoder;
use super::{Frame, FrameSink, TRANSPORT_TARGET, TransportError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const READ_BUFFER_BYTES: usize = 8 * 1024;

/// Listening endpoint serving at most one peer at a time.
///
/// The connected flag is readable from any thread. Dropping the connection
/// stops the accept loop, shuts the current peer down and joins every
/// transport thread.
#[derive(Debug)]
pub struct Connection {
    local_addr: SocketAddr,
    listener: Option<TcpListener>,
    shared: Arc<Shared>,
    accept_thread: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Shared {
    connected: AtomicBool,
    shutdown: AtomicBool,
    next_peer: AtomicU64,
    peer: Mutex<Option<Peer>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Debug)]
struct Peer {
    id: u64,
    stream: TcpStream,
}

impl Shared {
    fn peer(&self) -> MutexGuard<'_, Option<Peer>> {
        self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn readers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.readers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the peer slot if it still holds the peer identified by `id`.
    fn release(&self, id: u64) {
        let mut slot = self.peer();
        if slot.as_ref().is_some_and(|peer| peer.id == id) {
            *slot = None;
            self.connected.store(false, Ordering::SeqCst);
            info!(target: TRANSPORT_TARGET, peer = id, "peer disconnected");
        }
    }
}

impl Connection {
    /// Binds a TCP listener on `host:port`.
    ///
    /// Port `0` asks the operating system for an ephemeral port; read it back
    /// with [`Connection::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the address does not resolve or the
    /// listener cannot be bound.
    pub fn bind(host: &str, port: u16) -> Result<Self, TransportError> {
        let listener = bind_tcp(host, port)?;
        listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::NonBlocking { source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::LocalAddr { source })?;
        Ok(Self {
            local_addr,
            listener: Some(listener),
            shared: Arc::new(Shared::default()),
            accept_thread: None,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting peers, delivering their frames to `inbound`.
    ///
    /// Calling this again after a successful start does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spawn`] when the accept thread cannot be
    /// created.
    pub fn start(&mut self, inbound: Sender<Frame>) -> Result<(), TransportError> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("tether-accept".to_owned())
            .spawn(move || run_accept_loop(&listener, &shared, &inbound))
            .map_err(|source| TransportError::Spawn { source })?;
        self.accept_thread = Some(handle);
        Ok(())
    }

    /// Returns `true` while a peer is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Identifier of the attached peer.
    #[must_use]
    pub fn peer(&self) -> Option<u64> {
        self.shared.peer().as_ref().map(|peer| peer.id)
    }

    /// Writes one frame to the peer.
    ///
    /// Does nothing while disconnected. A failed write detaches the peer.
    pub fn send(&self, frame: &[u8]) {
        if !self.is_connected() {
            return;
        }
        let mut slot = self.shared.peer();
        let Some(peer) = slot.as_mut() else {
            return;
        };
        if let Err(error) = peer
            .stream
            .write_all(frame)
            .and_then(|()| peer.stream.flush())
        {
            warn!(
                target: TRANSPORT_TARGET,
                peer = peer.id,
                error = %error,
                "write failed; detaching peer"
            );
            shutdown_stream(&peer.stream);
            *slot = None;
            self.shared.connected.store(false, Ordering::SeqCst);
        }
    }
}

impl FrameSink for Connection {
    fn is_connected(&self) -> bool {
        Self::is_connected(self)
    }

    fn send(&self, frame: &[u8]) {
        Self::send(self, frame);
    }

    fn peer(&self) -> Option<u64> {
        Self::peer(self)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take()
            && handle.join().is_err()
        {
            warn!(target: TRANSPORT_TARGET, "accept thread panicked");
        }
        if let Some(peer) = self.shared.peer().take() {
            shutdown_stream(&peer.stream);
        }
        self.shared.connected.store(false, Ordering::SeqCst);
        let readers = std::mem::take(&mut *self.shared.readers());
        for reader in readers {
            if reader.join().is_err() {
                warn!(target: TRANSPORT_TARGET, "reader thread panicked");
            }
        }
        debug!(target: TRANSPORT_TARGET, addr = %self.local_addr, "connection closed");
    }
}

fn run_accept_loop(listener: &TcpListener, shared: &Arc<Shared>, inbound: &Sender<Frame>) {
    info!(
        target: TRANSPORT_TARGET,
        addr = ?listener.local_addr().ok(),
        "control endpoint listening"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shared.shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                last_error = None;
                admit_peer(shared, stream, addr, inbound);
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: TRANSPORT_TARGET, error = %error, "accept error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

fn admit_peer(shared: &Arc<Shared>, stream: TcpStream, addr: SocketAddr, inbound: &Sender<Frame>) {
    let mut slot = shared.peer();
    if slot.is_some() {
        warn!(
            target: TRANSPORT_TARGET,
            %addr,
            "refusing connection; a peer is already attached"
        );
        shutdown_stream(&stream);
        return;
    }
    let reader = match stream
        .set_nonblocking(false)
        .and_then(|()| stream.try_clone())
    {
        Ok(reader) => reader,
        Err(error) => {
            warn!(target: TRANSPORT_TARGET, %addr, error = %error, "failed to prepare peer stream");
            shutdown_stream(&stream);
            return;
        }
    };
    let id = shared.next_peer.fetch_add(1, Ordering::SeqCst);
    let reader_shared = Arc::clone(shared);
    let reader_inbound = inbound.clone();
    let spawned = thread::Builder::new()
        .name("tether-reader".to_owned())
        .spawn(move || run_read_loop(&reader_shared, id, reader, &reader_inbound));
    match spawned {
        Ok(handle) => {
            *slot = Some(Peer { id, stream });
            shared.connected.store(true, Ordering::SeqCst);
            drop(slot);
            let mut readers = shared.readers();
            readers.retain(|reader| !reader.is_finished());
            readers.push(handle);
            info!(target: TRANSPORT_TARGET, peer = id, %addr, "peer connected");
        }
        Err(error) => {
            warn!(target: TRANSPORT_TARGET, %addr, error = %error, "failed to spawn reader");
            shutdown_stream(&stream);
        }
    }
}

fn run_read_loop(shared: &Shared, id: u64, mut stream: TcpStream, inbound: &Sender<Frame>) {
    let mut decoder = FrameDecoder::default();
    let mut buffer = vec![0_u8; READ_BUFFER_BYTES];
    'read: loop {
        match read_with_retry(&mut stream, &mut buffer) {
            Ok(0) => break,
            Ok(count) => {
                let chunk = buffer.get(..count).unwrap_or_default();
                for bytes in decoder.push(chunk) {
                    if inbound.send(Frame::new(id, bytes)).is_err() {
                        debug!(target: TRANSPORT_TARGET, peer = id, "inbound channel closed");
                        break 'read;
                    }
                }
            }
            Err(error) => {
                if !shared.shutdown.load(Ordering::SeqCst) {
                    debug!(target: TRANSPORT_TARGET, peer = id, error = %error, "read failed");
                }
                break;
            }
        }
    }
    decoder.finish();
    shared.release(id);
}

fn read_with_retry(stream: &mut TcpStream, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn shutdown_stream(stream: &TcpStream) {
    if let Err(error) = stream.shutdown(Shutdown::Both)
        && error.kind() != io::ErrorKind::NotConnected
    {
        debug!(target: TRANSPORT_TARGET, error = %error, "stream shutdown failed");
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, TransportError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .next()
        .ok_or_else(|| TransportError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| TransportError::BindTcp { addr, source })
}
