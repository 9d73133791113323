//! Minimal blocking Modbus/TCP client for integration tests.

#![allow(dead_code)]

use frost_plc::{PlcConfig, PlcRuntime, RunningPlc};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback PLC whose timer effectively never fires during a test.
pub fn frozen_clock_plc() -> RunningPlc {
    let mut config = PlcConfig::loopback();
    config.simulation.tick_interval_ms = 3_600_000;
    PlcRuntime::start(&config).unwrap()
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub struct ModbusClient {
    stream: TcpStream,
    next_tid: u16,
}

impl ModbusClient {
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            next_tid: 1,
        })
    }

    /// Send one PDU with a well-formed MBAP header, return the reply PDU.
    pub fn call(&mut self, pdu: &[u8]) -> io::Result<Vec<u8>> {
        let tid = self.next_tid;
        self.next_tid = self.next_tid.wrapping_add(1);
        self.send_raw(&frame(tid, (pdu.len() + 1) as u16, pdu))?;

        let mut header = [0u8; 7];
        self.stream.read_exact(&mut header)?;
        assert_eq!(u16::from_be_bytes([header[0], header[1]]), tid, "transaction id echo");
        assert_eq!(u16::from_be_bytes([header[2], header[3]]), 0, "protocol id");
        assert_eq!(header[6], 1, "unit id echo");
        let length = u16::from_be_bytes([header[4], header[5]]) as usize;
        let mut reply = vec![0u8; length - 1];
        self.stream.read_exact(&mut reply)?;
        Ok(reply)
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    pub fn read_holding(&mut self, start: u16, count: u16) -> io::Result<Vec<u16>> {
        let mut pdu = vec![0x03];
        pdu.extend_from_slice(&start.to_be_bytes());
        pdu.extend_from_slice(&count.to_be_bytes());
        let reply = self.call(&pdu)?;
        assert_eq!(reply[0], 0x03, "unexpected reply {reply:02x?}");
        assert_eq!(reply[1] as usize, count as usize * 2);
        Ok(reply[2..]
            .chunks_exact(2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .collect())
    }

    pub fn read_all(&mut self) -> io::Result<Vec<u16>> {
        self.read_holding(0, 10)
    }

    pub fn write_single(&mut self, address: u16, value: u16) -> io::Result<Vec<u8>> {
        let mut pdu = vec![0x06];
        pdu.extend_from_slice(&address.to_be_bytes());
        pdu.extend_from_slice(&value.to_be_bytes());
        self.call(&pdu)
    }

    pub fn write_multiple(&mut self, start: u16, values: &[u16]) -> io::Result<Vec<u8>> {
        let mut pdu = vec![0x10];
        pdu.extend_from_slice(&start.to_be_bytes());
        pdu.extend_from_slice(&(values.len() as u16).to_be_bytes());
        pdu.push((values.len() * 2) as u8);
        for value in values {
            pdu.extend_from_slice(&value.to_be_bytes());
        }
        self.call(&pdu)
    }

    /// True once the server has closed this connection.
    pub fn is_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(0) => true,
            Err(e) => e.kind() == io::ErrorKind::ConnectionReset,
            Ok(_) => false,
        }
    }
}

/// MBAP frame with an arbitrary declared length.
pub fn frame(tid: u16, length: u16, pdu: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(7 + pdu.len());
    bytes.extend_from_slice(&tid.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.push(1);
    bytes.extend_from_slice(pdu);
    bytes
}
