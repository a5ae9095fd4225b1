//! I2C register file wrapped around the initiator.

use log::debug;

use super::bus::{I2cDrive, I2cPads};
use super::initiator::{AckPolicy, I2cCommand, I2cInitiator};
use crate::api::{I2cConfig, NullTrace, TraceSink, I2C_DIVISOR_MASK};
use crate::csr::{
    decode_register, validate_offset, CsrBus, I2cRegister, ACTION_READ_ACK, ACTION_READ_NACK,
    ACTION_RESET, ACTION_START, ACTION_STOP, STATUS_ACK, STATUS_BUSY,
};
use crate::BridgeError;

/// Register-file adapter that turns byte writes into initiator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cPeripheral {
    engine: I2cInitiator,
    divider: u16,
    divider_write_shadow: u8,
    divider_read_shadow: u16,
    reset_pending: bool,
}

impl Default for I2cPeripheral {
    fn default() -> Self {
        Self::new(I2cConfig::default())
    }
}

impl I2cPeripheral {
    /// Creates a peripheral whose divider register holds `config.divisor`.
    #[must_use]
    pub fn new(config: I2cConfig) -> Self {
        let engine = I2cInitiator::new(config);
        Self {
            divider: engine.divisor(),
            engine,
            divider_write_shadow: 0,
            divider_read_shadow: 0,
            reset_pending: false,
        }
    }

    /// Wrapped engine.
    #[must_use]
    pub const fn engine(&self) -> &I2cInitiator {
        &self.engine
    }

    /// Value of the divider register.
    #[must_use]
    pub const fn divider(&self) -> u16 {
        self.divider
    }

    /// What the engine currently does to both lines.
    #[must_use]
    pub const fn drive(&self) -> I2cDrive {
        self.engine.drive()
    }

    /// Advances one tick. A pending reset replaces the tick.
    pub fn tick(&mut self, pads: I2cPads) -> I2cDrive {
        self.tick_traced(pads, &mut NullTrace)
    }

    /// [`Self::tick`] reporting events to `sink`.
    pub fn tick_traced(&mut self, pads: I2cPads, sink: &mut impl TraceSink) -> I2cDrive {
        if std::mem::take(&mut self.reset_pending) {
            self.engine.reset();
            return self.engine.drive();
        }
        self.engine.tick_traced(pads, sink)
    }

    fn write_action(&mut self, value: u8) {
        if value & ACTION_RESET != 0 {
            debug!("i2c: reset requested through action register");
            self.reset_pending = true;
            return;
        }
        let command = if value & ACTION_START != 0 {
            Some(I2cCommand::Start)
        } else if value & ACTION_STOP != 0 {
            Some(I2cCommand::Stop)
        } else if value & (ACTION_READ_ACK | ACTION_READ_NACK) != 0 {
            let ack = if value & ACTION_READ_ACK != 0 {
                AckPolicy::Ack
            } else {
                AckPolicy::Nack
            };
            Some(I2cCommand::Read(ack))
        } else {
            None
        };
        if let Some(command) = command {
            self.engine.issue(command);
        }
    }

    fn status(&self) -> u8 {
        let mut status = 0;
        if self.engine.busy() {
            status |= STATUS_BUSY;
        }
        if self.engine.ack_received() {
            status |= STATUS_ACK;
        }
        status
    }
}

impl CsrBus for I2cPeripheral {
    fn read8(&mut self, offset: u8) -> Result<u8, BridgeError> {
        let offset = validate_offset(offset)?;
        let value = match decode_register(offset) {
            Some((I2cRegister::Divider, 0)) => {
                self.divider_read_shadow = self.divider;
                self.divider.to_le_bytes()[0]
            }
            Some((I2cRegister::Divider, _)) => self.divider_read_shadow.to_le_bytes()[1],
            Some((I2cRegister::RecvData, _)) => self.engine.data_out(),
            Some((I2cRegister::Status, _)) => self.status(),
            Some((I2cRegister::Action | I2cRegister::SendData, _)) | None => 0,
        };
        Ok(value)
    }

    fn write8(&mut self, offset: u8, value: u8) -> Result<(), BridgeError> {
        let offset = validate_offset(offset)?;
        match decode_register(offset) {
            Some((I2cRegister::Divider, 0)) => self.divider_write_shadow = value,
            Some((I2cRegister::Divider, _)) => {
                self.divider =
                    u16::from_le_bytes([self.divider_write_shadow, value]) & I2C_DIVISOR_MASK;
                self.engine.configure(self.divider);
            }
            Some((I2cRegister::Action, _)) => self.write_action(value),
            Some((I2cRegister::SendData, _)) => {
                self.engine.issue(I2cCommand::Write(value));
            }
            Some((I2cRegister::RecvData | I2cRegister::Status, _)) | None => {}
        }
        Ok(())
    }
}
