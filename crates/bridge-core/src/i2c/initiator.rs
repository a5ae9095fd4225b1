//! Two-wire initiator state machine.
//!
//! The initiator advances exactly one state per [`I2cInitiator::tick`]. It
//! observes the pads only through two-stage synchronizers, so every decision
//! in a tick is taken on levels that entered the chain two ticks earlier.

use log::{debug, trace};

use super::bus::{BusConditionDecoder, I2cDrive, I2cPads, LineDrive};
use super::rules::{start_entry, stop_entry, transition_rule, HalfPhase, I2cState, RuleAction};
use crate::api::{I2cConfig, NullTrace, TraceEvent, TraceSink, I2C_DIVISOR_MASK};
use crate::sync::Synchronizer;

/// Acknowledge the initiator returns after reading an octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AckPolicy {
    /// Pull SDA low in the acknowledge slot; the target keeps sending.
    #[default]
    Ack,
    /// Leave SDA released; the target stops after this octet.
    Nack,
}

impl AckPolicy {
    const fn drive(self) -> LineDrive {
        match self {
            Self::Ack => LineDrive::Low,
            Self::Nack => LineDrive::Released,
        }
    }
}

/// Atomic bus operation accepted by the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum I2cCommand {
    /// START or repeated START condition.
    Start,
    /// STOP condition.
    Stop,
    /// Shift an octet out MSB first and sample the acknowledge.
    Write(u8),
    /// Shift an octet in MSB first and answer with the given acknowledge.
    Read(AckPolicy),
}

/// I2C initiator registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cInitiator {
    config: I2cConfig,
    state: I2cState,
    busy: bool,
    timer: u16,
    bit_index: u8,
    shift_out: u8,
    shift_in: u8,
    read_ack: AckPolicy,
    ack_received: bool,
    data_out: u8,
    drive: I2cDrive,
    scl_sync: Synchronizer<bool>,
    sda_sync: Synchronizer<bool>,
    decoder: BusConditionDecoder,
    pending: Option<I2cCommand>,
    dropped: Option<I2cCommand>,
    ticks: u64,
}

impl Default for I2cInitiator {
    fn default() -> Self {
        Self::new(I2cConfig::default())
    }
}

impl I2cInitiator {
    /// Creates an initiator in reset state.
    #[must_use]
    pub fn new(config: I2cConfig) -> Self {
        Self {
            config: config.masked(),
            state: I2cState::Idle,
            busy: true,
            timer: 0,
            bit_index: 0,
            shift_out: 0,
            shift_in: 0,
            read_ack: AckPolicy::Ack,
            ack_received: false,
            data_out: 0,
            drive: I2cDrive::RELEASED,
            scl_sync: Synchronizer::new(true),
            sda_sync: Synchronizer::new(true),
            decoder: BusConditionDecoder::default(),
            pending: None,
            dropped: None,
            ticks: 0,
        }
    }

    /// Returns every register to its reset value. The configuration and the
    /// tick counter survive.
    pub fn reset(&mut self) {
        debug!("i2c: engine reset in state {:?}", self.state);
        *self = Self {
            ticks: self.ticks,
            ..Self::new(self.config)
        };
    }

    /// Programs the half-period divisor (masked to 12 bits).
    ///
    /// Takes effect at the next divider reload; changing it mid-transaction
    /// yields undefined timing.
    pub fn configure(&mut self, divisor: u16) {
        self.config.divisor = divisor & I2C_DIVISOR_MASK;
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> I2cConfig {
        self.config
    }

    /// Programmed half-period divisor.
    #[must_use]
    pub const fn divisor(&self) -> u16 {
        self.config.divisor
    }

    /// Latches a command strobe for the next tick.
    ///
    /// Returns `false` and drops the command when the engine is busy or a
    /// strobe is already pending.
    pub fn issue(&mut self, command: I2cCommand) -> bool {
        if self.busy || self.pending.is_some() {
            debug!("i2c: dropped {command:?} while busy");
            self.dropped = Some(command);
            return false;
        }
        self.pending = Some(command);
        true
    }

    /// Issues a START.
    pub fn issue_start(&mut self) -> bool {
        self.issue(I2cCommand::Start)
    }

    /// Issues a STOP.
    pub fn issue_stop(&mut self) -> bool {
        self.issue(I2cCommand::Stop)
    }

    /// Issues an octet write.
    pub fn issue_write(&mut self, octet: u8) -> bool {
        self.issue(I2cCommand::Write(octet))
    }

    /// Issues an octet read.
    pub fn issue_read(&mut self, ack: AckPolicy) -> bool {
        self.issue(I2cCommand::Read(ack))
    }

    /// High while a command is in flight, and for the first idle tick after.
    #[must_use]
    pub const fn busy(&self) -> bool {
        self.busy
    }

    /// `true` when the target pulled SDA low in the last write's ACK slot.
    #[must_use]
    pub const fn ack_received(&self) -> bool {
        self.ack_received
    }

    /// Octet received by the last read.
    #[must_use]
    pub const fn data_out(&self) -> u8 {
        self.data_out
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> I2cState {
        self.state
    }

    /// What the initiator currently does to both lines.
    #[must_use]
    pub const fn drive(&self) -> I2cDrive {
        self.drive
    }

    /// Synchronized levels the next tick will act on.
    #[must_use]
    pub fn sampled(&self) -> I2cPads {
        I2cPads {
            scl: self.scl_sync.output(),
            sda: self.sda_sync.output(),
        }
    }

    /// Divider countdown; a strobe fires in the tick it reads zero.
    #[must_use]
    pub const fn countdown(&self) -> u16 {
        self.timer
    }

    /// Ticks elapsed since construction.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances one tick with the given raw pad levels and returns the new
    /// line drive.
    pub fn tick(&mut self, pads: I2cPads) -> I2cDrive {
        self.tick_traced(pads, &mut NullTrace)
    }

    /// [`Self::tick`] reporting events to `sink`.
    pub fn tick_traced(&mut self, pads: I2cPads, sink: &mut impl TraceSink) -> I2cDrive {
        let tick = self.ticks;
        self.ticks += 1;

        if let Some(command) = self.dropped.take() {
            sink.on_event(tick, TraceEvent::I2cCommandDropped { command });
        }
        let command = self.pending.take();

        let scl = self.scl_sync.clock(pads.scl);
        let sda = self.sda_sync.clock(pads.sda);
        if let Some(condition) = self.decoder.decode(scl, sda).condition() {
            sink.on_event(tick, TraceEvent::I2cBusCondition { condition });
        }

        let strobe = self.timer == 0;
        let timer = if strobe || !self.busy {
            self.config.divisor
        } else if !self.config.clock_stretch || self.drive.scl.is_released() == scl {
            self.timer - 1
        } else {
            self.timer
        };

        let from = self.state;
        match transition_rule(self.state) {
            None => self.idle(command, scl, sda, tick, sink),
            Some(rule) => {
                let fire = match rule.phase {
                    HalfPhase::SclLow => {
                        if strobe {
                            self.drive.scl = LineDrive::Low;
                        }
                        strobe
                    }
                    HalfPhase::SclHigh => {
                        if strobe {
                            self.drive.scl = LineDrive::Released;
                            false
                        } else {
                            self.drive.scl.is_released() && (!self.config.clock_stretch || scl)
                        }
                    }
                    HalfPhase::Strobe => strobe,
                };
                if fire {
                    self.state = match rule.last_bit_next {
                        Some(last) if self.bit_index == 7 => last,
                        _ => rule.next,
                    };
                    self.apply(rule.action, sda);
                }
            }
        }
        self.timer = timer;

        if from != self.state {
            trace!("i2c: {from:?} -> {:?} at tick {tick}", self.state);
            sink.on_event(
                tick,
                TraceEvent::I2cTransition {
                    from,
                    to: self.state,
                },
            );
        }
        self.drive
    }

    fn idle(
        &mut self,
        command: Option<I2cCommand>,
        scl: bool,
        sda: bool,
        tick: u64,
        sink: &mut impl TraceSink,
    ) {
        let was_busy = self.busy;
        self.busy = true;
        let Some(command) = command.filter(|_| !was_busy) else {
            self.busy = false;
            return;
        };

        self.state = match command {
            I2cCommand::Start => start_entry(scl, sda),
            I2cCommand::Stop => stop_entry(scl, self.drive.sda),
            I2cCommand::Write(octet) => {
                self.shift_out = octet;
                I2cState::WriteSclLow
            }
            I2cCommand::Read(ack) => {
                self.read_ack = ack;
                I2cState::ReadSclLow
            }
        };
        debug!(
            "i2c: accepted {command:?} (scl={scl}, sda={sda}) -> {:?}",
            self.state
        );
        sink.on_event(tick, TraceEvent::I2cCommandAccepted { command });
    }

    fn apply(&mut self, action: RuleAction, sda: bool) {
        match action {
            RuleAction::None => {}
            RuleAction::ReleaseSda => self.drive.sda = LineDrive::Released,
            RuleAction::DriveSdaLow => self.drive.sda = LineDrive::Low,
            RuleAction::DriveSdaMsb => {
                self.drive.sda = LineDrive::from_level(self.shift_out & 0x80 != 0);
            }
            RuleAction::ShiftOut => self.shift_out <<= 1,
            RuleAction::AdvanceBit => self.bit_index = (self.bit_index + 1) & 7,
            RuleAction::SampleAck => self.ack_received = !sda,
            RuleAction::ShiftIn => self.shift_in = (self.shift_in << 1) | u8::from(sda),
            RuleAction::DriveAckBit => self.drive.sda = self.read_ack.drive(),
            RuleAction::LatchData => self.data_out = self.shift_in,
        }
    }
}
