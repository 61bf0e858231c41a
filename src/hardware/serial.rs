//! Serial port link backed by the `serialport` crate

use crate::core::RawLine;
use crate::hardware::{ConnectionError, Link, LinkConfig, LinkError, LinkResult};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const READ_CHUNK: usize = 256;

/// Exclusively owned serial connection
///
/// Bytes read from the port are accumulated by a [`LineAssembler`] until a
/// full line is available. The port is released on `close` or drop.
pub struct SerialLink {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    lines: LineAssembler,
}

impl SerialLink {
    /// Open the port described by `config` and wait for the device to settle
    pub fn open(config: &LinkConfig) -> Result<Self, ConnectionError> {
        config.validate()?;

        info!(port = %config.port, baud = config.baud_rate, "opening serial link");

        let mut port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout())
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .open()
            .map_err(|source| ConnectionError::Open {
                port: config.port.clone(),
                source,
            })?;

        // Some boards only start talking once DTR/RTS are asserted
        if let Err(e) = port.write_data_terminal_ready(true) {
            warn!(err = %e, "could not assert DTR");
        }
        if let Err(e) = port.write_request_to_send(true) {
            warn!(err = %e, "could not assert RTS");
        }

        std::thread::sleep(config.open_settle());

        // Boot banners are not replies to anything we sent
        if let Err(e) = port.clear(ClearBuffer::Input) {
            warn!(err = %e, "could not discard start-up bytes");
        }

        debug!(port = %config.port, "serial link ready");

        Ok(Self {
            port_name: config.port.clone(),
            port: Some(port),
            lines: LineAssembler::default(),
        })
    }

    fn port_mut(&mut self) -> LinkResult<&mut Box<dyn SerialPort>> {
        match self.port.as_mut() {
            Some(port) => Ok(port),
            None => Err(LinkError::NotOpen {
                port: self.port_name.clone(),
            }),
        }
    }
}

/// Read whatever the port delivers within `timeout`; a timeout reads nothing
fn read_chunk(
    port: &mut dyn SerialPort,
    buf: &mut [u8],
    timeout: Duration,
) -> LinkResult<usize> {
    port.set_timeout(timeout)
        .map_err(|source| LinkError::Port { operation: "set timeout", source })?;

    match port.read(buf) {
        Ok(n) => Ok(n),
        Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(0),
        Err(source) => Err(LinkError::Io { operation: "read", source }),
    }
}

/// Splits a byte stream into lines
///
/// Bytes are pulled through a read function that honours a per-call timeout,
/// so the same assembly runs against a real port and against canned chunks.
#[derive(Debug, Default)]
pub(crate) struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    /// Next line within `timeout`, or the unterminated remainder once it expires
    pub(crate) fn read_line<F>(
        &mut self,
        timeout: Duration,
        mut read: F,
    ) -> LinkResult<Option<RawLine>>
    where
        F: FnMut(&mut [u8], Duration) -> LinkResult<usize>,
    {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(bytes) = take_line(&mut self.pending) {
                return decode_line(bytes).map(Some);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let n = read(&mut chunk, deadline - now)?;
            self.pending.extend_from_slice(&chunk[..n]);
        }

        // Timed out mid-line: hand back what arrived, like a terminal would
        if self.pending.is_empty() {
            Ok(None)
        } else {
            let mut partial = std::mem::take(&mut self.pending);
            if partial.last() == Some(&b'\r') {
                partial.pop();
            }
            debug!(bytes = partial.len(), "returning unterminated line after timeout");
            decode_line(partial).map(Some)
        }
    }
}

impl Link for SerialLink {
    fn write(&mut self, data: &[u8]) -> LinkResult<()> {
        let port = self.port_mut()?;
        port.write_all(data)
            .map_err(|source| LinkError::Io { operation: "write", source })?;
        port.flush()
            .map_err(|source| LinkError::Io { operation: "write", source })?;
        trace!(bytes = data.len(), "wrote to serial link");
        Ok(())
    }

    fn bytes_available(&mut self) -> LinkResult<usize> {
        let pending = self.lines.pending();
        let queued = self
            .port_mut()?
            .bytes_to_read()
            .map_err(|source| LinkError::Port { operation: "query input queue", source })?;
        Ok(pending + queued as usize)
    }

    fn read_line(&mut self, timeout: Duration) -> LinkResult<Option<RawLine>> {
        let Some(port) = self.port.as_mut() else {
            return Err(LinkError::NotOpen {
                port: self.port_name.clone(),
            });
        };
        self.lines
            .read_line(timeout, |buf, remaining| read_chunk(&mut **port, buf, remaining))
    }

    fn flush_input(&mut self) -> LinkResult<()> {
        self.lines.clear();
        self.port_mut()?
            .clear(ClearBuffer::Input)
            .map_err(|source| LinkError::Port { operation: "flush input", source })
    }

    fn flush_output(&mut self) -> LinkResult<()> {
        self.port_mut()?
            .clear(ClearBuffer::Output)
            .map_err(|source| LinkError::Port { operation: "flush output", source })
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            self.lines.clear();
            info!(port = %self.port_name, "serial link closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Split the first complete line off `pending`, without its terminator
pub(crate) fn take_line(pending: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = pending.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = pending.drain(..=end).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

pub(crate) fn decode_line(bytes: Vec<u8>) -> LinkResult<RawLine> {
    String::from_utf8(bytes)
        .map(RawLine::new)
        .map_err(|source| LinkError::Decode { source })
}
