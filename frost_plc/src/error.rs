//! Service-level error type.

use frost_common::config::ConfigError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that stop the PLC service from starting or running.
///
/// Per-connection faults never surface here; they end their session only
/// (see [`crate::codec::CodecError`]).
#[derive(Debug, Error)]
pub enum PlcError {
    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Listener or socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker thread could not be started or panicked.
    #[error("Thread error: {0}")]
    Thread(String),
}
