//! Accept loop: one thread per client connection.
//!
//! The supervisor never touches the process state itself. It hands each
//! accepted socket to a codec, starts a [`ClientSession`] on its own thread
//! and keeps a control handle to the socket so shutdown can unblock a session
//! parked in `decode`.
//!
//! Sessions are unbounded unless `max_clients` is configured. Client sockets
//! carry no read/write timeouts: a silent peer holds its own thread, never
//! the state lock.

use super::session::{ClientSession, SessionEnd};
use crate::codec::CodecFactory;
use crate::error::PlcError;
use crate::process::{FaultMonitor, SharedProcess};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Accept poll period while no connection is pending.
pub const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Live client count. Telemetry only; not part of the plant state.
#[derive(Debug, Clone, Default)]
pub struct ClientCounter {
    count: Arc<AtomicUsize>,
}

impl ClientCounter {
    /// Current number of connected clients.
    #[inline]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Count one client in until the guard drops.
    pub fn enter(&self) -> ClientGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        ClientGuard {
            count: Arc::clone(&self.count),
        }
    }
}

/// Decrements the client count on drop.
#[derive(Debug)]
pub struct ClientGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Control handles to live session sockets.
#[derive(Debug, Default)]
struct SessionRegistry {
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl SessionRegistry {
    fn insert(&self, id: u64, stream: TcpStream) {
        self.streams.lock().insert(id, stream);
    }

    fn remove(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    fn close_all(&self) -> usize {
        let streams = self.streams.lock();
        for stream in streams.values() {
            // Already-closed sockets report NotConnected; nothing to do.
            let _ = stream.shutdown(Shutdown::Both);
        }
        streams.len()
    }
}

/// Accepts connections and spawns one session thread per client.
pub struct ConnectionSupervisor<F: CodecFactory> {
    listener: TcpListener,
    factory: Arc<F>,
    process: SharedProcess,
    faults: FaultMonitor,
    clients: ClientCounter,
    shutdown: Arc<AtomicBool>,
    max_clients: Option<usize>,
    registry: Arc<SessionRegistry>,
    next_id: u64,
}

impl<F: CodecFactory> ConnectionSupervisor<F> {
    /// Create a supervisor over a bound listener.
    ///
    /// The listener is switched to non-blocking so the accept loop can
    /// observe `shutdown`.
    pub fn new(
        listener: TcpListener,
        factory: F,
        process: SharedProcess,
        clients: ClientCounter,
        shutdown: Arc<AtomicBool>,
        max_clients: Option<usize>,
    ) -> io::Result<Self> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            factory: Arc::new(factory),
            faults: FaultMonitor::new(process.clone()),
            process,
            clients,
            shutdown,
            max_clients,
            registry: Arc::new(SessionRegistry::default()),
            next_id: 1,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until shutdown, then close and join all sessions.
    pub fn run(mut self) -> Result<(), PlcError> {
        info!("Waiting for client connections...");
        let mut sessions: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Some(handle) = self.admit(stream, peer) {
                        sessions.push(handle);
                    }
                    sessions.retain(|handle| !handle.is_finished());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        let closed = self.registry.close_all();
        info!("Supervisor stopping, closed {} live sessions", closed);
        for handle in sessions {
            if handle.join().is_err() {
                warn!("Session thread panicked");
            }
        }
        Ok(())
    }

    /// Hand an accepted stream to a new session thread.
    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) -> Option<JoinHandle<()>> {
        if let Some(max) = self.max_clients {
            if self.clients.get() >= max {
                warn!(%peer, max, "Client limit reached, rejecting connection");
                let _ = stream.shutdown(Shutdown::Both);
                return None;
            }
        }
        if let Err(e) = stream.set_nonblocking(false) {
            warn!(%peer, "Failed to configure client socket: {}", e);
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        let guard = self.clients.enter();

        let control = match stream.try_clone() {
            Ok(control) => control,
            Err(e) => {
                warn!(%peer, "Failed to clone client socket: {}", e);
                return None;
            }
        };
        let codec = match self.factory.open(stream) {
            Ok(codec) => codec,
            Err(e) => {
                warn!(%peer, "Failed to open codec: {}", e);
                return None;
            }
        };
        self.registry.insert(id, control);
        info!(session = id, %peer, clients = self.clients.get(), "Client connected");

        let mut session = ClientSession::new(
            id,
            peer,
            codec,
            self.process.clone(),
            self.faults.clone(),
            Arc::clone(&self.shutdown),
        );
        let registry = Arc::clone(&self.registry);
        let clients = self.clients.clone();

        let spawned = thread::Builder::new()
            .name(format!("session-{id}"))
            .spawn(move || {
                let end = session.run();
                let served = session.requests();
                drop(session);
                registry.remove(id);
                drop(guard);
                match end {
                    SessionEnd::BackendCrash => warn!(
                        session = id,
                        %peer,
                        served,
                        clients = clients.get(),
                        "Client disconnected after backend crash"
                    ),
                    end => info!(
                        session = id,
                        %peer,
                        served,
                        clients = clients.get(),
                        reason = ?end,
                        "Client disconnected"
                    ),
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(session = id, %peer, "Failed to spawn session thread: {}", e);
                self.registry.remove(id);
                None
            }
        }
    }
}
