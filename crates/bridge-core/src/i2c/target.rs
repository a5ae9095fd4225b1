//! Collaborator side of the two-wire bus and a bounded poll loop around it.

use log::{debug, warn};

use super::bus::{I2cDrive, I2cPads};
use super::initiator::{AckPolicy, I2cCommand};
use super::peripheral::I2cPeripheral;
use crate::api::{PollBudget, TraceSink};
use crate::csr::{
    CsrBus, ACTION_OFFSET, ACTION_READ_ACK, ACTION_READ_NACK, ACTION_START, ACTION_STOP,
    RECV_DATA_OFFSET, SEND_DATA_OFFSET,
};
use crate::sync::SYNC_STAGES;
use crate::{BridgeError, Engine};

/// Idle ticks inserted before a command so the synchronizers reflect the
/// settled bus.
pub const SETTLE_TICKS: u64 = SYNC_STAGES as u64 + 2;

/// Device sharing the bus with the initiator.
pub trait I2cTarget {
    /// Observes this tick's resolved pad levels and returns the drive the
    /// device applies from the next tick on.
    fn step(&mut self, pads: I2cPads) -> I2cDrive;
}

/// Empty bus: only the pull-ups are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PullUpOnly;

impl I2cTarget for PullUpOnly {
    fn step(&mut self, _pads: I2cPads) -> I2cDrive {
        I2cDrive::RELEASED
    }
}

/// Peripheral and target joined through the open-drain bus.
#[derive(Debug, Clone)]
pub struct I2cLink<T> {
    peripheral: I2cPeripheral,
    target: T,
    target_drive: I2cDrive,
}

impl<T: I2cTarget> I2cLink<T> {
    /// Joins `peripheral` and `target` on an idle bus.
    pub const fn new(peripheral: I2cPeripheral, target: T) -> Self {
        Self {
            peripheral,
            target,
            target_drive: I2cDrive::RELEASED,
        }
    }

    /// Register-file side.
    #[must_use]
    pub const fn peripheral(&self) -> &I2cPeripheral {
        &self.peripheral
    }

    /// Mutable register-file side.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn peripheral_mut(&mut self) -> &mut I2cPeripheral {
        &mut self.peripheral
    }

    /// Attached device.
    #[must_use]
    pub const fn target(&self) -> &T {
        &self.target
    }

    /// Mutable attached device.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Resolved bus levels for the current tick.
    #[must_use]
    pub const fn pads(&self) -> I2cPads {
        self.peripheral.drive().resolve(self.target_drive)
    }

    /// Advances both participants by one tick.
    pub fn tick(&mut self) -> I2cPads {
        self.tick_traced(&mut crate::api::NullTrace)
    }

    /// [`Self::tick`] reporting engine events to `sink`.
    pub fn tick_traced(&mut self, sink: &mut impl TraceSink) -> I2cPads {
        let pads = self.pads();
        self.peripheral.tick_traced(pads, sink);
        self.target_drive = self.target.step(pads);
        pads
    }

    /// Runs `ticks` ticks unconditionally.
    pub fn settle(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Ticks until the engine drops `busy`.
    ///
    /// Returns the number of ticks spent, counting the first one.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when `budget` runs out first, e.g.
    /// because a device holds SCL low forever.
    pub fn run_until_idle(&mut self, budget: PollBudget) -> Result<u64, BridgeError> {
        let mut elapsed = 0;
        loop {
            self.tick();
            elapsed += 1;
            if !self.peripheral.engine().busy() {
                return Ok(elapsed);
            }
            if !budget.allows(elapsed) {
                warn!(
                    "i2c: still busy in {:?} after {elapsed} ticks",
                    self.peripheral.engine().state()
                );
                return Err(BridgeError::Timeout {
                    engine: Engine::I2c,
                    ticks: elapsed,
                });
            }
        }
    }

    /// Waits for idle, settles the bus, issues `command` through the register
    /// file and waits for it to complete.
    ///
    /// Returns the ticks spent on `command`, counted from the accepting tick.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when either wait exceeds `budget`.
    pub fn transact(
        &mut self,
        command: I2cCommand,
        budget: PollBudget,
    ) -> Result<u64, BridgeError> {
        self.run_until_idle(budget)?;
        self.settle(SETTLE_TICKS);
        let (offset, value) = match command {
            I2cCommand::Start => (ACTION_OFFSET, ACTION_START),
            I2cCommand::Stop => (ACTION_OFFSET, ACTION_STOP),
            I2cCommand::Write(octet) => (SEND_DATA_OFFSET, octet),
            I2cCommand::Read(AckPolicy::Ack) => (ACTION_OFFSET, ACTION_READ_ACK),
            I2cCommand::Read(AckPolicy::Nack) => (ACTION_OFFSET, ACTION_READ_NACK),
        };
        debug!("i2c: issuing {command:?}");
        self.peripheral.write8(offset, value)?;
        self.run_until_idle(budget)
    }

    /// Writes `octets` framed by START and STOP and returns the ACK seen for
    /// each octet.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when a command exceeds `budget`.
    pub fn write_frame(
        &mut self,
        octets: &[u8],
        budget: PollBudget,
    ) -> Result<Vec<bool>, BridgeError> {
        self.transact(I2cCommand::Start, budget)?;
        let mut acks = Vec::with_capacity(octets.len());
        for &octet in octets {
            self.transact(I2cCommand::Write(octet), budget)?;
            acks.push(self.peripheral.engine().ack_received());
        }
        self.transact(I2cCommand::Stop, budget)?;
        Ok(acks)
    }

    /// Reads `len` octets after addressing the device with `address_octet`,
    /// acknowledging all but the last.
    ///
    /// Returns `None` when the address octet is not acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when a command exceeds `budget`.
    pub fn read_frame(
        &mut self,
        address_octet: u8,
        len: usize,
        budget: PollBudget,
    ) -> Result<Option<Vec<u8>>, BridgeError> {
        self.transact(I2cCommand::Start, budget)?;
        self.transact(I2cCommand::Write(address_octet), budget)?;
        if !self.peripheral.engine().ack_received() {
            self.transact(I2cCommand::Stop, budget)?;
            return Ok(None);
        }
        let mut octets = Vec::with_capacity(len);
        for index in 0..len {
            let ack = if index + 1 == len {
                AckPolicy::Nack
            } else {
                AckPolicy::Ack
            };
            self.transact(I2cCommand::Read(ack), budget)?;
            octets.push(self.peripheral.read8(RECV_DATA_OFFSET)?);
        }
        self.transact(I2cCommand::Stop, budget)?;
        Ok(Some(octets))
    }
}
