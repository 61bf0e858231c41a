//! Hardware abstraction layer for the device link
//!
//! This module owns the byte-stream connection to the device: a trait for
//! raw line I/O, a real serial port implementation and a scripted mock.

pub mod link;
pub mod serial;
pub mod mock;
pub mod error;

pub use link::{Link, LinkConfig};
pub use serial::SerialLink;
pub use mock::{MockLink, MockReply};
pub use error::{ConnectionError, LinkError, LinkResult};
