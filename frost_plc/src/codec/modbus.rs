//! Modbus/TCP framing for the plant's holding register file.
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────┬───────────────────────┐
//! │ tid (2)  │ pid (2)  │ len (2)  │ unit (1)│ PDU (len - 1 bytes)   │
//! └──────────┴──────────┴──────────┴─────────┴───────────────────────┘
//! ```
//!
//! Supported functions: 0x03/0x04 read, 0x06 write single, 0x10 write
//! multiple. Bad addresses and quantities become exception replies.
//!
//! The declared MBAP length is the one field a naive backend trusts when it
//! sizes its receive buffer. A length beyond the largest legal ADU is
//! reported as [`CodecError::BackendFault`]: that is the request that takes
//! the real controller down.

use super::{CodecError, CodecFactory, ExceptionCode, FieldCodec, Request, RequestAction};
use frost_common::consts::REGISTER_COUNT;
use frost_common::registers::RegisterFile;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use tracing::trace;

/// MBAP header size [bytes].
pub const MBAP_HEADER_LEN: usize = 7;

/// Largest legal PDU [bytes].
pub const MAX_PDU_LEN: usize = 253;

/// Largest legal MBAP length field (unit id + PDU).
pub const MAX_MBAP_LENGTH: u16 = (MAX_PDU_LEN + 1) as u16;

/// Smallest legal MBAP length field (unit id + function code).
pub const MIN_MBAP_LENGTH: u16 = 2;

/// Read holding registers.
pub const FC_READ_HOLDING: u8 = 0x03;
/// Read input registers (served from the same file).
pub const FC_READ_INPUT: u8 = 0x04;
/// Write single register.
pub const FC_WRITE_SINGLE: u8 = 0x06;
/// Write multiple registers.
pub const FC_WRITE_MULTIPLE: u8 = 0x10;

/// Max registers per read request.
const MAX_READ_COUNT: u16 = 125;
/// Max registers per write-multiple request.
const MAX_WRITE_COUNT: u16 = 123;

/// Modbus/TCP codec over any byte stream pair.
#[derive(Debug)]
pub struct ModbusTcpCodec<R, W> {
    reader: R,
    writer: W,
}

/// Codec over an accepted TCP connection.
pub type TcpModbusCodec = ModbusTcpCodec<BufReader<TcpStream>, TcpStream>;

impl<R: Read, W: Write> ModbusTcpCodec<R, W> {
    /// Create a codec reading requests from `reader` and writing replies to `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consume the codec, returning the underlying reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl TcpModbusCodec {
    /// Split an accepted stream into buffered reader and writer halves.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self::new(BufReader::new(stream), writer))
    }
}

impl<R: Read, W: Write> FieldCodec for ModbusTcpCodec<R, W> {
    fn decode(&mut self) -> Result<Request, CodecError> {
        let mut header = [0u8; MBAP_HEADER_LEN];
        self.reader
            .read_exact(&mut header)
            .map_err(CodecError::from_io)?;

        let transaction_id = u16::from_be_bytes([header[0], header[1]]);
        let protocol_id = u16::from_be_bytes([header[2], header[3]]);
        let length = u16::from_be_bytes([header[4], header[5]]);
        let unit_id = header[6];

        if length > MAX_MBAP_LENGTH {
            return Err(CodecError::BackendFault(format!(
                "MBAP length {length} exceeds maximum ADU ({MAX_MBAP_LENGTH})"
            )));
        }
        if length < MIN_MBAP_LENGTH {
            return Err(CodecError::Malformed(format!("MBAP length {length} too short")));
        }
        if protocol_id != 0 {
            return Err(CodecError::Malformed(format!(
                "unexpected protocol id {protocol_id:#06x}"
            )));
        }

        let mut pdu = vec![0u8; length as usize - 1];
        self.reader.read_exact(&mut pdu).map_err(CodecError::from_io)?;
        trace!(transaction_id, unit_id, pdu_len = pdu.len(), "Framed request");

        Ok(Request {
            transaction_id,
            unit_id,
            action: parse_pdu(&pdu),
            wire_len: MBAP_HEADER_LEN + pdu.len(),
        })
    }

    fn encode_reply(
        &mut self,
        request: &Request,
        registers: &RegisterFile,
    ) -> Result<usize, CodecError> {
        let pdu = reply_pdu(&request.action, registers);

        let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
        frame.extend_from_slice(&request.transaction_id.to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
        frame.push(request.unit_id);
        frame.extend_from_slice(&pdu);

        self.writer.write_all(&frame).map_err(CodecError::from_io)?;
        self.writer.flush().map_err(CodecError::from_io)?;
        Ok(frame.len())
    }
}

/// Opens a [`TcpModbusCodec`] per accepted connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModbusTcpFactory;

impl CodecFactory for ModbusTcpFactory {
    type Codec = TcpModbusCodec;

    fn open(&self, stream: TcpStream) -> io::Result<Self::Codec> {
        TcpModbusCodec::from_stream(stream)
    }
}

fn be_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Decode a PDU (function code + data) into an action.
fn parse_pdu(pdu: &[u8]) -> RequestAction {
    let function = pdu[0];
    let body = &pdu[1..];
    let reject = |exception| RequestAction::Reject {
        function,
        exception,
    };

    match function {
        FC_READ_HOLDING | FC_READ_INPUT => {
            if body.len() != 4 {
                return reject(ExceptionCode::IllegalDataValue);
            }
            let start = be_u16(body, 0);
            let count = be_u16(body, 2);
            if count == 0 || count > MAX_READ_COUNT {
                return reject(ExceptionCode::IllegalDataValue);
            }
            if start as usize + count as usize > REGISTER_COUNT {
                return reject(ExceptionCode::IllegalDataAddress);
            }
            RequestAction::Read {
                function,
                start,
                count,
            }
        }
        FC_WRITE_SINGLE => {
            if body.len() != 4 {
                return reject(ExceptionCode::IllegalDataValue);
            }
            let address = be_u16(body, 0);
            if address as usize >= REGISTER_COUNT {
                return reject(ExceptionCode::IllegalDataAddress);
            }
            RequestAction::WriteSingle {
                address,
                value: be_u16(body, 2),
            }
        }
        FC_WRITE_MULTIPLE => {
            if body.len() < 5 {
                return reject(ExceptionCode::IllegalDataValue);
            }
            let start = be_u16(body, 0);
            let count = be_u16(body, 2);
            let byte_count = body[4] as usize;
            if count == 0
                || count > MAX_WRITE_COUNT
                || byte_count != count as usize * 2
                || body.len() != 5 + byte_count
            {
                return reject(ExceptionCode::IllegalDataValue);
            }
            if start as usize + count as usize > REGISTER_COUNT {
                return reject(ExceptionCode::IllegalDataAddress);
            }
            let values = body[5..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            RequestAction::WriteMultiple { start, values }
        }
        _ => reject(ExceptionCode::IllegalFunction),
    }
}

/// Build the reply PDU for an action.
fn reply_pdu(action: &RequestAction, registers: &RegisterFile) -> Vec<u8> {
    match action {
        RequestAction::Read {
            function,
            start,
            count,
        } => {
            let range = *start as usize..*start as usize + *count as usize;
            let Some(values) = registers.get(range) else {
                return exception_pdu(*function, ExceptionCode::IllegalDataAddress);
            };
            let mut pdu = Vec::with_capacity(2 + values.len() * 2);
            pdu.push(*function);
            pdu.push((values.len() * 2) as u8);
            for value in values {
                pdu.extend_from_slice(&value.to_be_bytes());
            }
            pdu
        }
        RequestAction::WriteSingle { address, value } => {
            let mut pdu = vec![FC_WRITE_SINGLE];
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&value.to_be_bytes());
            pdu
        }
        RequestAction::WriteMultiple { start, values } => {
            let mut pdu = vec![FC_WRITE_MULTIPLE];
            pdu.extend_from_slice(&start.to_be_bytes());
            pdu.extend_from_slice(&(values.len() as u16).to_be_bytes());
            pdu
        }
        RequestAction::Reject {
            function,
            exception,
        } => exception_pdu(*function, *exception),
    }
}

fn exception_pdu(function: u8, exception: ExceptionCode) -> Vec<u8> {
    vec![function | 0x80, exception as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(tid: u16, length: u16, unit: u8, pdu: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&tid.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.push(unit);
        bytes.extend_from_slice(pdu);
        bytes
    }

    fn request(pdu: &[u8]) -> Vec<u8> {
        frame(0x0102, (pdu.len() + 1) as u16, 1, pdu)
    }

    fn codec(input: Vec<u8>) -> ModbusTcpCodec<Cursor<Vec<u8>>, Vec<u8>> {
        ModbusTcpCodec::new(Cursor::new(input), Vec::new())
    }

    fn decode_one(pdu: &[u8]) -> RequestAction {
        codec(request(pdu)).decode().unwrap().action
    }

    #[test]
    fn decodes_read_holding() {
        let mut c = codec(request(&[0x03, 0x00, 0x00, 0x00, 0x0A]));
        let req = c.decode().unwrap();
        assert_eq!(req.transaction_id, 0x0102);
        assert_eq!(req.unit_id, 1);
        assert_eq!(req.wire_len, 12);
        assert_eq!(
            req.action,
            RequestAction::Read {
                function: FC_READ_HOLDING,
                start: 0,
                count: 10
            }
        );
    }

    #[test]
    fn decodes_writes() {
        assert_eq!(
            decode_one(&[0x06, 0x00, 0x02, 0x00, 0xE1]),
            RequestAction::WriteSingle {
                address: 2,
                value: 225
            }
        );
        assert_eq!(
            decode_one(&[0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x64, 0x00, 0xC8]),
            RequestAction::WriteMultiple {
                start: 1,
                values: vec![100, 200]
            }
        );
    }

    #[test]
    fn rejects_bad_requests_with_exceptions() {
        let reject = |exception| RequestAction::Reject {
            function: 0x03,
            exception,
        };
        // past the end of the register file
        assert_eq!(
            decode_one(&[0x03, 0x00, 0x08, 0x00, 0x03]),
            reject(ExceptionCode::IllegalDataAddress)
        );
        // zero quantity
        assert_eq!(
            decode_one(&[0x03, 0x00, 0x00, 0x00, 0x00]),
            reject(ExceptionCode::IllegalDataValue)
        );
        // short body
        assert_eq!(
            decode_one(&[0x03, 0x00]),
            reject(ExceptionCode::IllegalDataValue)
        );
        assert_eq!(
            decode_one(&[0x2B, 0x0E]),
            RequestAction::Reject {
                function: 0x2B,
                exception: ExceptionCode::IllegalFunction
            }
        );
        // byte count disagrees with quantity
        assert_eq!(
            decode_one(&[0x10, 0x00, 0x01, 0x00, 0x02, 0x02, 0x00, 0x64]),
            RequestAction::Reject {
                function: 0x10,
                exception: ExceptionCode::IllegalDataValue
            }
        );
        assert_eq!(
            decode_one(&[0x06, 0x00, 0x0A, 0x00, 0x01]),
            RequestAction::Reject {
                function: 0x06,
                exception: ExceptionCode::IllegalDataAddress
            }
        );
    }

    #[test]
    fn oversized_length_is_backend_fault() {
        let mut bytes = frame(1, 601, 1, &[0x03, 0x00, 0x00, 0x00, 0x0A]);
        bytes.extend(std::iter::repeat_n(0x41, 600));
        let err = codec(bytes).decode().unwrap_err();
        assert!(err.is_backend_crash(), "got {err:?}");
    }

    #[test]
    fn bad_protocol_id_is_malformed() {
        let mut bytes = request(&[0x03, 0x00, 0x00, 0x00, 0x01]);
        bytes[2] = 0x12;
        let err = codec(bytes).decode().unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
        assert!(!err.is_backend_crash());
    }

    #[test]
    fn short_length_is_malformed() {
        let err = codec(frame(1, 1, 1, &[])).decode().unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn eof_is_closed() {
        assert!(matches!(codec(Vec::new()).decode(), Err(CodecError::Closed)));
        let truncated = request(&[0x03, 0x00, 0x00, 0x00, 0x0A])[..9].to_vec();
        assert!(matches!(codec(truncated).decode(), Err(CodecError::Closed)));
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let mut bytes = request(&[0x03, 0x00, 0x00, 0x00, 0x01]);
        bytes.extend(request(&[0x06, 0x00, 0x01, 0x00, 0x00]));
        let mut c = codec(bytes);
        assert_eq!(c.decode().unwrap().action.written(), None);
        assert_eq!(c.decode().unwrap().action.written(), Some((1, &[0u16][..])));
        assert!(matches!(c.decode(), Err(CodecError::Closed)));
    }

    #[test]
    fn encodes_read_reply() {
        let mut c = codec(request(&[0x03, 0x00, 0x04, 0x00, 0x02]));
        let req = c.decode().unwrap();
        let mut regs = RegisterFile::default();
        regs[4] = 0xFF6A;
        regs[5] = 3;
        let written = c.encode_reply(&req, &regs).unwrap();
        let (_, out) = c.into_parts();
        assert_eq!(written, out.len());
        assert_eq!(
            out,
            vec![0x01, 0x02, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0xFF, 0x6A, 0x00, 0x03]
        );
    }

    #[test]
    fn encodes_write_echo_and_exception() {
        let regs = RegisterFile::default();

        let mut c = codec(request(&[0x10, 0x00, 0x01, 0x00, 0x01, 0x02, 0x00, 0x07]));
        let req = c.decode().unwrap();
        c.encode_reply(&req, &regs).unwrap();
        let (_, out) = c.into_parts();
        assert_eq!(&out[7..], &[0x10, 0x00, 0x01, 0x00, 0x01]);

        let mut c = codec(request(&[0x01, 0x00, 0x00, 0x00, 0x01]));
        let req = c.decode().unwrap();
        c.encode_reply(&req, &regs).unwrap();
        let (_, out) = c.into_parts();
        assert_eq!(&out[4..6], &[0x00, 0x03]);
        assert_eq!(&out[7..], &[0x81, 0x01]);
    }
}
