//! Request/response transaction protocol
//!
//! Turns the unframed, echo-prone line stream of a [`Link`](crate::hardware::Link)
//! into single command/reply exchanges.

pub mod classify;
pub mod transaction;
pub mod error;

pub use classify::{classify_line, is_echo, is_prompt};
pub use transaction::{TransactionConfig, TransactionEngine};
pub use error::{TransactionError, TransactionResult};
