//! Core types and constants for the serial command protocol

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
