//! Field-protocol codec interface.
//!
//! A codec owns one client connection: it frames requests off the wire and
//! serializes replies from a register snapshot. Client sessions only see
//! this trait, so the state/concurrency logic can run against a scripted
//! fake in tests.
//!
//! Any `Err` from either call is terminal for the connection.

pub mod modbus;

use frost_common::registers::RegisterFile;
use std::io;
use std::net::TcpStream;
use thiserror::Error;

pub use modbus::{ModbusTcpCodec, ModbusTcpFactory};

/// Terminal codec failure for one connection.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Peer disconnected (EOF, reset, broken pipe).
    #[error("connection closed by peer")]
    Closed,

    /// Frame could not be parsed. Transient: only this connection is dropped.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The protocol backend itself failed mid-request.
    #[error("protocol backend failure: {0}")]
    BackendFault(String),

    /// Any other transport error.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Whether this error means the protocol backend crashed, as opposed to
    /// an ordinary disconnect or a bad frame.
    #[inline]
    pub fn is_backend_crash(&self) -> bool {
        matches!(self, Self::BackendFault(_))
    }

    /// Map an I/O error, folding the usual disconnect kinds into `Closed`.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => Self::Closed,
            _ => Self::Io(err),
        }
    }
}

/// Protocol exception returned to the client instead of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionCode {
    /// Function code not supported.
    IllegalFunction = 0x01,
    /// Address range outside the register file.
    IllegalDataAddress = 0x02,
    /// Quantity, byte count or PDU size invalid.
    IllegalDataValue = 0x03,
}

/// What a decoded request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAction {
    /// Read `count` registers starting at `start`.
    Read {
        /// Function code the client used (holding or input registers).
        function: u8,
        /// First register.
        start: u16,
        /// Number of registers.
        count: u16,
    },
    /// Write one register.
    WriteSingle {
        /// Register address.
        address: u16,
        /// New value.
        value: u16,
    },
    /// Write a contiguous block of registers.
    WriteMultiple {
        /// First register.
        start: u16,
        /// New values.
        values: Vec<u16>,
    },
    /// Well-framed request answered with an exception.
    Reject {
        /// Function code the client used.
        function: u8,
        /// Exception to report.
        exception: ExceptionCode,
    },
}

impl RequestAction {
    /// The registers this request writes: first index and values.
    ///
    /// `None` for reads and rejected requests.
    pub fn written(&self) -> Option<(usize, &[u16])> {
        match self {
            Self::WriteSingle { address, value } => {
                Some((*address as usize, std::slice::from_ref(value)))
            }
            Self::WriteMultiple { start, values } => Some((*start as usize, values.as_slice())),
            Self::Read { .. } | Self::Reject { .. } => None,
        }
    }
}

/// One framed application request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Transaction id echoed in the reply.
    pub transaction_id: u16,
    /// Addressed unit.
    pub unit_id: u8,
    /// Decoded action.
    pub action: RequestAction,
    /// Size of the request on the wire [bytes].
    pub wire_len: usize,
}

/// Per-connection request/reply codec.
pub trait FieldCodec {
    /// Block until one full request is framed, or the connection ends.
    fn decode(&mut self) -> Result<Request, CodecError>;

    /// Serialize and send the reply to `request` from a register snapshot.
    ///
    /// Returns the number of bytes written.
    fn encode_reply(
        &mut self,
        request: &Request,
        registers: &RegisterFile,
    ) -> Result<usize, CodecError>;
}

/// Opens a codec over each accepted connection.
pub trait CodecFactory: Send + Sync + 'static {
    /// Codec type produced by this factory.
    type Codec: FieldCodec + Send + 'static;

    /// Wrap an accepted stream.
    fn open(&self, stream: TcpStream) -> io::Result<Self::Codec>;
}
