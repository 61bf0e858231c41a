//! Caller-facing API
//!
//! [`commands`] names the fixed device operations; [`dispatch`] routes
//! classified free text to them and phrases the result.

pub mod commands;
pub mod dispatch;

pub use commands::{DeviceCommand, DeviceController};
pub use dispatch::{
    describe, CollaboratorError, Dispatcher, Intent, IntentClassifier, KeywordClassifier,
    PlainPhraser, ResponsePhraser, Turn, TurnOutcome,
};
