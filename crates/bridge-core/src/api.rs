//! Host-facing configuration, poll budgets and deterministic trace hooks.

use crate::{BusCondition, I2cCommand, I2cState, LineDirective, TranslatorState};

/// Mask applied to every I2C divisor write (12-bit field).
pub const I2C_DIVISOR_MASK: u16 = 0x0FFF;

/// Default I2C half-period divisor.
pub const DEFAULT_I2C_DIVISOR: u16 = 1;

/// Configuration of one I2C initiator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct I2cConfig {
    /// Ticks counted down between divider strobes, masked to 12 bits.
    pub divisor: u16,
    /// Waits for the synchronized SCL to read high before leaving a
    /// clock-high half-phase, and freezes the countdown while it does not.
    pub clock_stretch: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_I2C_DIVISOR,
            clock_stretch: true,
        }
    }
}

impl I2cConfig {
    /// Returns a copy with the divisor masked to its register width.
    #[must_use]
    pub const fn masked(self) -> Self {
        Self {
            divisor: self.divisor & I2C_DIVISOR_MASK,
            clock_stretch: self.clock_stretch,
        }
    }
}

/// Configuration of the QSPI read engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct QspiConfig {
    /// SCK half-period minus one, in ticks.
    pub divisor: u16,
}

/// Upper bound on how long a collaborator poll loop keeps ticking.
///
/// The engines themselves wait forever on a stuck bus. Poll loops driven by
/// a host adapter may bound that wait and turn it into
/// [`crate::BridgeError::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PollBudget {
    /// Maximum ticks to spend, `None` meaning no bound.
    pub ticks: Option<u64>,
}

impl PollBudget {
    /// Waits forever.
    pub const UNBOUNDED: Self = Self { ticks: None };

    /// Gives up after `ticks` ticks.
    #[must_use]
    pub const fn bounded(ticks: u64) -> Self {
        Self { ticks: Some(ticks) }
    }

    /// Returns `true` while `elapsed` ticks are still within budget.
    #[must_use]
    pub fn allows(self, elapsed: u64) -> bool {
        self.ticks.is_none_or(|limit| elapsed < limit)
    }
}

/// Deterministic events emitted by the engines when traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// I2C command strobe accepted while idle.
    I2cCommandAccepted {
        /// Accepted command.
        command: I2cCommand,
    },
    /// I2C command strobe dropped because the engine was busy.
    I2cCommandDropped {
        /// Dropped command.
        command: I2cCommand,
    },
    /// I2C initiator changed state.
    I2cTransition {
        /// State left.
        from: I2cState,
        /// State entered.
        to: I2cState,
    },
    /// START or STOP observed on the synchronized bus lines.
    I2cBusCondition {
        /// Decoded condition.
        condition: BusCondition,
    },
    /// Command translator changed state.
    QspiTransition {
        /// State left.
        from: TranslatorState,
        /// State entered.
        to: TranslatorState,
    },
    /// Line serializer accepted an outbound directive.
    QspiDirective {
        /// Accepted directive.
        directive: LineDirective,
    },
    /// Translator took an octet assembled by the serializer.
    QspiInbound {
        /// Received octet.
        data: u8,
    },
    /// Bus read acknowledged with the assembled word.
    QspiAcknowledge {
        /// Word returned to the bus.
        word: u32,
    },
}

/// Event paired with the engine tick it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TraceRecord {
    /// Tick counter of the emitting engine.
    pub tick: u64,
    /// Recorded event.
    pub event: TraceEvent,
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in tick order.
    fn on_event(&mut self, tick: u64, event: TraceEvent);
}

impl TraceSink for Vec<TraceRecord> {
    fn on_event(&mut self, tick: u64, event: TraceEvent) {
        self.push(TraceRecord { tick, event });
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn on_event(&mut self, _tick: u64, _event: TraceEvent) {}
}
