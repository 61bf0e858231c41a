//! Classification of lines observed during a transaction

use crate::core::constants::PROMPT_GLYPHS;
use crate::core::{Command, LineKind, RawLine};

/// Label a received line relative to the command that was sent
///
/// Comparison is done on the trimmed line. A line matching the command in
/// any letter case is an echo; terminals mirror input, devices do not
/// answer with the command text itself.
pub fn classify_line(command: &Command, line: &RawLine) -> LineKind {
    let text = line.trimmed();

    if is_echo(command, text) {
        LineKind::Echo
    } else if is_prompt(text) {
        LineKind::Prompt
    } else if text.chars().count() <= 1 {
        LineKind::Noise
    } else {
        LineKind::Content
    }
}

pub fn is_echo(command: &Command, text: &str) -> bool {
    text.to_lowercase() == command.as_str().trim().to_lowercase()
}

pub fn is_prompt(text: &str) -> bool {
    PROMPT_GLYPHS.contains(&text)
}
