//! Core data types for serial transactions

use std::fmt;

/// Immutable text command sent to the device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes written to the link: the command text plus a `\n` terminator
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.push(b'\n');
        bytes
    }

    /// True if the text would be split into several lines on the wire
    pub fn has_line_break(&self) -> bool {
        self.0.contains(['\n', '\r'])
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single line read from the link with its terminator stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(String);

impl RawLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Line text with surrounding whitespace removed
    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }
}

/// Label assigned to each line observed during a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Mirror of the sent command, compared case-insensitively
    Echo,
    /// Bare shell prompt glyph such as `>`
    Prompt,
    /// Blank or single-character noise that is not a known prompt
    Noise,
    /// Genuine device output
    Content,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LineKind::Echo => "echo",
            LineKind::Prompt => "prompt",
            LineKind::Noise => "noise",
            LineKind::Content => "content",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub line: RawLine,
    pub kind: LineKind,
}

/// Meaningful reply extracted from a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    /// Whether the reply arrived only after the fallback window
    pub delayed: bool,
}

impl Response {
    pub fn immediate(text: impl Into<String>) -> Self {
        Self { text: text.into(), delayed: false }
    }

    pub fn delayed(text: impl Into<String>) -> Self {
        Self { text: text.into(), delayed: true }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Full record of one command/response exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub command: Command,
    /// Every line observed, in stream order, including the fallback read
    pub lines: Vec<ClassifiedLine>,
    pub response: Option<Response>,
    pub fallback_used: bool,
}

impl Transcript {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            lines: Vec::new(),
            response: None,
            fallback_used: false,
        }
    }

    pub fn content_lines(&self) -> impl Iterator<Item = &ClassifiedLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Content)
    }
}
