//! Conversational front end: free text in, device action, text reply out
//!
//! Intent classification and reply phrasing are external collaborators
//! (a language model, or the keyword rules below). Their failures never
//! reach the device: a classifier error becomes [`Intent::Unknown`] and a
//! phraser error falls back to the plain description of the outcome.

use crate::api::commands::{DeviceCommand, DeviceController};
use crate::core::Response;
use crate::hardware::Link;
use crate::protocol::TransactionError;
use std::error::Error as _;
use std::fmt;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

/// Words that end an interactive session
pub const QUIT_WORDS: [&str; 3] = ["quit", "exit", "bye"];

const PROMPT: &str = "you> ";

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    PowerOn,
    PowerOff,
    Status,
    Unknown,
}

impl Intent {
    /// Parse a collaborator label such as `LED_ON`; anything unexpected is `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "LED_ON" | "POWER_ON" | "POWERON" => Intent::PowerOn,
            "LED_OFF" | "POWER_OFF" | "POWEROFF" => Intent::PowerOff,
            "STATUS" => Intent::Status,
            _ => Intent::Unknown,
        }
    }

    pub fn command(self) -> Option<DeviceCommand> {
        match self {
            Intent::PowerOn => Some(DeviceCommand::LedOn),
            Intent::PowerOff => Some(DeviceCommand::LedOff),
            Intent::Status => Some(DeviceCommand::Status),
            Intent::Unknown => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Intent::PowerOn => "POWER_ON",
            Intent::PowerOff => "POWER_OFF",
            Intent::Status => "STATUS",
            Intent::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure inside a classification or phrasing collaborator
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        collaborator: &'static str,
        reason: String,
    },

    #[error("{collaborator} returned unusable output: {output:?}")]
    Malformed {
        collaborator: &'static str,
        output: String,
    },
}

/// Maps free text to an [`Intent`]
pub trait IntentClassifier {
    fn classify(&mut self, text: &str) -> Result<Intent, CollaboratorError>;
}

/// Turns the outcome of a turn into a human-readable reply
pub trait ResponsePhraser {
    fn phrase(
        &mut self,
        user_text: &str,
        outcome: &TurnOutcome,
    ) -> Result<String, CollaboratorError>;
}

/// Result of acting on one user message
#[derive(Debug)]
pub enum TurnOutcome {
    /// Device answered with a content line
    Replied {
        command: DeviceCommand,
        response: Response,
    },
    /// Command went out, nothing classifiable came back
    NoResponse { command: DeviceCommand },
    /// Transaction failed; the device may or may not have acted
    Failed {
        command: DeviceCommand,
        error: TransactionError,
    },
    /// No device action was taken
    Unrecognized,
}

impl TurnOutcome {
    pub fn command(&self) -> Option<DeviceCommand> {
        match self {
            TurnOutcome::Replied { command, .. }
            | TurnOutcome::NoResponse { command }
            | TurnOutcome::Failed { command, .. } => Some(*command),
            TurnOutcome::Unrecognized => None,
        }
    }
}

#[derive(Debug)]
pub struct Turn {
    pub intent: Intent,
    pub outcome: TurnOutcome,
    pub reply: String,
}

/// Rule-based classifier over whole words
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    const ON_WORDS: [&'static str; 3] = ["on", "enable", "activate"];
    const OFF_WORDS: [&'static str; 3] = ["off", "disable", "deactivate"];
    const STATUS_WORDS: [&'static str; 4] = ["status", "state", "condition", "check"];

    pub fn new() -> Self {
        Self
    }

    /// Exactly one category must match; mixed or no matches are `Unknown`
    pub fn classify_text(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |set: &[&str]| words.iter().any(|w| set.contains(w));

        match (has(&Self::ON_WORDS), has(&Self::OFF_WORDS), has(&Self::STATUS_WORDS)) {
            (true, false, false) => Intent::PowerOn,
            (false, true, false) => Intent::PowerOff,
            (false, false, true) => Intent::Status,
            _ => Intent::Unknown,
        }
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&mut self, text: &str) -> Result<Intent, CollaboratorError> {
        Ok(self.classify_text(text))
    }
}

/// Fixed-template phraser; also the fallback when another phraser fails
#[derive(Debug, Clone, Default)]
pub struct PlainPhraser;

impl ResponsePhraser for PlainPhraser {
    fn phrase(
        &mut self,
        _user_text: &str,
        outcome: &TurnOutcome,
    ) -> Result<String, CollaboratorError> {
        Ok(describe(outcome))
    }
}

/// Plain description of an outcome; success, silence and failure read differently
pub fn describe(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Replied { command, response } => match command {
            DeviceCommand::LedOn => format!("LED turned ON. Device response: {}", response),
            DeviceCommand::LedOff => format!("LED turned OFF. Device response: {}", response),
            DeviceCommand::Status => format!("Device status: {}", response),
        },
        TurnOutcome::NoResponse { command } => {
            format!("Sent '{}', but the device gave no response", command)
        }
        TurnOutcome::Failed { command, error } => match error.source() {
            Some(cause) => format!("Could not send '{}': {}: {}", command, error, cause),
            None => format!("Could not send '{}': {}", command, error),
        },
        TurnOutcome::Unrecognized => {
            "I didn't understand that. \
             Try asking me to turn the LED on or off, or to check its status."
                .to_string()
        }
    }
}

/// Single-turn dispatch loop: classify, act, respond
pub struct Dispatcher<'a, L: Link, C: IntentClassifier, P: ResponsePhraser> {
    controller: &'a mut DeviceController<L>,
    classifier: C,
    phraser: P,
}

impl<'a, L: Link, C: IntentClassifier, P: ResponsePhraser> Dispatcher<'a, L, C, P> {
    pub fn new(controller: &'a mut DeviceController<L>, classifier: C, phraser: P) -> Self {
        Self {
            controller,
            classifier,
            phraser,
        }
    }

    /// Handle one user message
    pub fn handle(&mut self, text: &str) -> Turn {
        let intent = match self.classifier.classify(text) {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "intent classification failed");
                Intent::Unknown
            }
        };
        debug!(%intent, "classified");

        let outcome = match intent.command() {
            None => TurnOutcome::Unrecognized,
            Some(command) => match self.controller.execute(command) {
                Ok(Some(response)) => TurnOutcome::Replied { command, response },
                Ok(None) => TurnOutcome::NoResponse { command },
                Err(error) => {
                    warn!(%command, error = %error, "device command failed");
                    TurnOutcome::Failed { command, error }
                }
            },
        };

        let reply = match outcome {
            TurnOutcome::Unrecognized => describe(&outcome),
            _ => self.phraser.phrase(text, &outcome).unwrap_or_else(|e| {
                warn!(error = %e, "reply phrasing failed");
                describe(&outcome)
            }),
        };

        Turn { intent, outcome, reply }
    }

    /// Read messages line by line until EOF or a quit word; returns turns handled
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<usize> {
        let mut turns = 0;
        let mut line = String::new();

        loop {
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if QUIT_WORDS.iter().any(|w| text.eq_ignore_ascii_case(w)) {
                break;
            }

            let turn = self.handle(text);
            writeln!(output, "{}", turn.reply)?;
            turns += 1;
        }

        info!(turns, "dispatch loop finished");
        Ok(turns)
    }
}
