//! Mock link implementation for testing and development
//!
//! The mock runs on a virtual clock that only moves when the caller pauses
//! or blocks in `read_line`, so timing-dependent behaviour is deterministic.

use crate::core::RawLine;
use crate::hardware::serial::decode_line;
use crate::hardware::{Link, LinkError, LinkResult};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Lines a simulated device emits in answer to one write
#[derive(Debug, Clone, Default)]
pub struct MockReply {
    lines: Vec<(Duration, Vec<u8>)>,
}

impl MockReply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `text` as soon as the command is written
    pub fn immediately(self, text: &str) -> Self {
        self.after(Duration::ZERO, text)
    }

    /// Emit `text` once `delay` has passed since the command was written
    pub fn after(mut self, delay: Duration, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(b'\n');
        self.lines.push((delay, bytes));
        self
    }

    /// Emit arbitrary bytes (terminator included by the caller)
    pub fn raw_after(mut self, delay: Duration, bytes: &[u8]) -> Self {
        self.lines.push((delay, bytes.to_vec()));
        self
    }
}

impl From<&[&str]> for MockReply {
    fn from(lines: &[&str]) -> Self {
        lines.iter().fold(MockReply::new(), |reply, line| reply.immediately(line))
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    at: Duration,
    bytes: Vec<u8>,
}

/// Scripted stand-in for a serial device
pub struct MockLink {
    port_name: String,
    open: bool,
    clock: Duration,
    echo: bool,
    inbox: VecDeque<InFlight>,
    script: VecDeque<MockReply>,
    written: Vec<Vec<u8>>,
    fail_next_write: bool,
    input_flushes: usize,
    output_flushes: usize,
    close_calls: usize,
}

impl MockLink {
    /// Create an open mock link
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            open: true,
            clock: Duration::ZERO,
            echo: false,
            inbox: VecDeque::new(),
            script: VecDeque::new(),
            written: Vec::new(),
            fail_next_write: false,
            input_flushes: 0,
            output_flushes: 0,
            close_calls: 0,
        }
    }

    /// Mirror every written line back before any scripted reply
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Queue the reply for the next write
    pub fn expect(&mut self, reply: MockReply) {
        self.script.push_back(reply);
    }

    /// Queue lines emitted immediately after the next write
    pub fn expect_reply(&mut self, lines: &[&str]) {
        self.expect(MockReply::from(lines));
    }

    /// Queue lines emitted together once `delay` has passed after the next write
    pub fn expect_delayed(&mut self, delay: Duration, lines: &[&str]) {
        let reply = lines
            .iter()
            .fold(MockReply::new(), |reply, line| reply.after(delay, line));
        self.expect(reply);
    }

    /// Queue a write that the device answers with nothing at all
    pub fn expect_silence(&mut self) {
        self.expect(MockReply::new());
    }

    /// Place an unread line in the receive buffer right now
    pub fn push_stale(&mut self, text: &str) {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(b'\n');
        self.schedule(self.clock, bytes);
    }

    /// Make the next write fail with an I/O error
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// Simulate the device being unplugged and plugged back in
    pub fn reopen(&mut self) {
        self.open = true;
    }

    /// Every write received, in order, exactly as sent
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn written_text(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn input_flushes(&self) -> usize {
        self.input_flushes
    }

    pub fn output_flushes(&self) -> usize {
        self.output_flushes
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    /// Lines emitted (or scheduled) by the device but not yet read
    pub fn unread_lines(&self) -> usize {
        self.inbox.len()
    }

    fn schedule(&mut self, at: Duration, bytes: Vec<u8>) {
        let index = self.inbox.iter().take_while(|l| l.at <= at).count();
        self.inbox.insert(index, InFlight { at, bytes });
    }

    fn ensure_open(&self) -> LinkResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(LinkError::NotOpen {
                port: self.port_name.clone(),
            })
        }
    }

    fn arrived(&self) -> impl Iterator<Item = &InFlight> {
        let now = self.clock;
        self.inbox.iter().take_while(move |l| l.at <= now)
    }

    fn pop_line(&mut self) -> LinkResult<Option<RawLine>> {
        let Some(mut next) = self.inbox.pop_front() else {
            return Ok(None);
        };
        if next.bytes.last() == Some(&b'\n') {
            next.bytes.pop();
        }
        if next.bytes.last() == Some(&b'\r') {
            next.bytes.pop();
        }
        decode_line(next.bytes).map(Some)
    }
}

impl Link for MockLink {
    fn write(&mut self, data: &[u8]) -> LinkResult<()> {
        self.ensure_open()?;

        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LinkError::Io {
                operation: "write",
                source: io::Error::new(io::ErrorKind::BrokenPipe, "simulated write failure"),
            });
        }

        self.written.push(data.to_vec());

        if self.echo {
            self.schedule(self.clock, data.to_vec());
        }

        if let Some(reply) = self.script.pop_front() {
            let sent_at = self.clock;
            for (delay, bytes) in reply.lines {
                self.schedule(sent_at + delay, bytes);
            }
        }

        Ok(())
    }

    fn bytes_available(&mut self) -> LinkResult<usize> {
        self.ensure_open()?;
        Ok(self.arrived().map(|l| l.bytes.len()).sum())
    }

    fn read_line(&mut self, timeout: Duration) -> LinkResult<Option<RawLine>> {
        self.ensure_open()?;

        let deadline = self.clock + timeout;
        match self.inbox.front().map(|l| l.at) {
            Some(at) if at <= deadline => {
                self.clock = self.clock.max(at);
                self.pop_line()
            }
            _ => {
                self.clock = deadline;
                Ok(None)
            }
        }
    }

    fn flush_input(&mut self) -> LinkResult<()> {
        self.ensure_open()?;
        self.input_flushes += 1;
        let now = self.clock;
        self.inbox.retain(|l| l.at > now);
        Ok(())
    }

    fn flush_output(&mut self) -> LinkResult<()> {
        self.ensure_open()?;
        self.output_flushes += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.close_calls += 1;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn pause(&mut self, duration: Duration) {
        self.clock += duration;
    }
}
