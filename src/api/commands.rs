//! Named device operations on top of the transaction engine

use crate::core::constants::{CMD_LED_OFF, CMD_LED_ON, CMD_STATUS};
use crate::core::{Command, Response, Transcript};
use crate::hardware::Link;
use crate::protocol::{TransactionConfig, TransactionEngine, TransactionResult};
use std::fmt;

/// The fixed command vocabulary understood by the device firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
    LedOn,
    LedOff,
    Status,
}

impl DeviceCommand {
    pub const ALL: [DeviceCommand; 3] =
        [DeviceCommand::LedOn, DeviceCommand::LedOff, DeviceCommand::Status];

    /// Text sent on the wire (case-sensitive)
    pub fn wire_text(self) -> &'static str {
        match self {
            DeviceCommand::LedOn => CMD_LED_ON,
            DeviceCommand::LedOff => CMD_LED_OFF,
            DeviceCommand::Status => CMD_STATUS,
        }
    }

    /// Look up a vocabulary entry from user-typed text, ignoring case and padding
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.wire_text().eq_ignore_ascii_case(text))
    }
}

impl From<DeviceCommand> for Command {
    fn from(cmd: DeviceCommand) -> Self {
        Command::new(cmd.wire_text())
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_text())
    }
}

/// High-level controller for an LED device
pub struct DeviceController<L: Link> {
    engine: TransactionEngine<L>,
}

impl<L: Link> DeviceController<L> {
    pub fn new(link: L, config: TransactionConfig) -> Self {
        Self {
            engine: TransactionEngine::new(link, config),
        }
    }

    pub fn led_on(&mut self) -> TransactionResult<Option<Response>> {
        self.execute(DeviceCommand::LedOn)
    }

    pub fn led_off(&mut self) -> TransactionResult<Option<Response>> {
        self.execute(DeviceCommand::LedOff)
    }

    pub fn status(&mut self) -> TransactionResult<Option<Response>> {
        self.execute(DeviceCommand::Status)
    }

    pub fn execute(&mut self, command: DeviceCommand) -> TransactionResult<Option<Response>> {
        self.engine.send(command)
    }

    /// Send text outside the fixed vocabulary
    pub fn send_raw(&mut self, command: &str) -> TransactionResult<Transcript> {
        self.engine.send_detailed(command)
    }

    pub fn engine(&self) -> &TransactionEngine<L> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TransactionEngine<L> {
        &mut self.engine
    }

    pub fn close(&mut self) {
        self.engine.close();
    }
}
