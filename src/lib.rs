//! Serial Command Transactions
//!
//! Issues text commands to a microcontroller over a serial link and extracts
//! the single meaningful reply from its unframed, echo-prone output.

pub mod core;
pub mod hardware;
pub mod protocol;
pub mod api;
pub mod utils;
pub mod logging;

// Re-export commonly used types
pub use self::core::{Command, LineKind, RawLine, Response, Transcript};
pub use hardware::{ConnectionError, Link, LinkConfig, LinkError, MockLink, MockReply, SerialLink};
pub use protocol::{TransactionConfig, TransactionEngine, TransactionError, TransactionResult};
pub use api::{
    DeviceCommand, DeviceController, Dispatcher, Intent, IntentClassifier, KeywordClassifier,
    PlainPhraser, ResponsePhraser, Turn, TurnOutcome,
};
pub use utils::{AppConfig, ConfigError};
