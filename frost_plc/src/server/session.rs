//! Per-connection request loop.
//!
//! Decode and encode happen outside the state lock; only the register
//! snapshot (and, for writes, the bridge update) runs inside it.

use crate::codec::{CodecError, FieldCodec, Request};
use crate::process::bridge::{to_registers, write_registers};
use crate::process::{FaultMonitor, SharedProcess};
use frost_common::registers::RegisterFile;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Peer disconnected.
    PeerClosed,
    /// Global shutdown.
    Shutdown,
    /// Transient fault; only this connection is affected.
    Fault(CodecError),
    /// Backend crash; the controller has been taken down.
    BackendCrash,
}

/// One client connection and the shared plant it talks to.
pub struct ClientSession<C> {
    id: u64,
    peer: SocketAddr,
    codec: C,
    process: SharedProcess,
    faults: FaultMonitor,
    shutdown: Arc<AtomicBool>,
    requests: u64,
}

impl<C: FieldCodec> ClientSession<C> {
    /// Create a session over an opened codec.
    pub fn new(
        id: u64,
        peer: SocketAddr,
        codec: C,
        process: SharedProcess,
        faults: FaultMonitor,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            peer,
            codec,
            process,
            faults,
            shutdown,
            requests: 0,
        }
    }

    /// Requests served so far.
    #[inline]
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Serve requests until disconnect, codec error or shutdown.
    pub fn run(&mut self) -> SessionEnd {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return SessionEnd::Shutdown;
            }

            let request = match self.codec.decode() {
                Ok(request) => request,
                Err(err) => return self.terminate(err),
            };
            debug!(
                session = self.id,
                bytes = request.wire_len,
                "Received Modbus request: {} bytes",
                request.wire_len
            );

            let registers = self.serve(&request);

            match self.codec.encode_reply(&request, &registers) {
                Ok(bytes) => {
                    self.requests += 1;
                    debug!(session = self.id, bytes, "Sent Modbus reply: {} bytes", bytes);
                }
                Err(err) => return self.terminate(err),
            }
        }
    }

    /// Register snapshot for the reply, applying the request first if it writes.
    fn serve(&self, request: &Request) -> RegisterFile {
        if let Some((start, values)) = request.action.written() {
            self.process.mutate(|state| {
                write_registers(state, start, values);
                to_registers(state)
            })
        } else {
            to_registers(&self.process.snapshot())
        }
    }

    fn terminate(&self, err: CodecError) -> SessionEnd {
        if err.is_backend_crash() {
            error!(session = self.id, peer = %self.peer, "Modbus backend failed: {}", err);
            self.faults.crash(&err.to_string());
            return SessionEnd::BackendCrash;
        }
        if self.shutdown.load(Ordering::SeqCst) {
            return SessionEnd::Shutdown;
        }
        match err {
            CodecError::Closed => SessionEnd::PeerClosed,
            err => {
                warn!(session = self.id, peer = %self.peer, "Dropping connection: {}", err);
                SessionEnd::Fault(err)
            }
        }
    }
}
