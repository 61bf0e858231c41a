//! Protocol timing constants and device defaults

/// Wait after writing a command before the receive buffer is drained (milliseconds)
pub const SETTLE_INTERVAL_MS: u64 = 200;

/// Extra wait used only when the first pass saw nothing but the echo (milliseconds)
pub const FALLBACK_INTERVAL_MS: u64 = 100;

/// Upper bound for a single blocking line read (milliseconds)
pub const READ_TIMEOUT_MS: u64 = 1000;

/// Wait after opening the port; many USB-serial adapters reset the board on open (milliseconds)
pub const OPEN_SETTLE_MS: u64 = 2000;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Single-character prompt glyphs emitted by common device shells
pub const PROMPT_GLYPHS: [&str; 3] = [">", "$", "#"];

/// Wire text of the fixed command vocabulary
pub const CMD_LED_ON: &str = "led on";
pub const CMD_LED_OFF: &str = "led off";
pub const CMD_STATUS: &str = "status";

/// Upper bound on lines read in one drain; a device that streams without pause
/// would otherwise keep the drain going forever
pub const MAX_DRAIN_LINES: usize = 256;
