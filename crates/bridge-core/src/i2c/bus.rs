//! Open-drain line model and I2C bus condition decoding.

use crate::sync::EdgeDetector;

/// What a participant does to an open-drain line.
///
/// Nobody ever drives a line high: a released line floats to the pull-up level
/// unless another participant pulls it low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LineDrive {
    /// Pull the line to ground.
    Low,
    /// Stop driving; the pull-up decides.
    #[default]
    Released,
}

impl LineDrive {
    /// Maps a desired logical level onto an open-drain drive.
    #[must_use]
    pub const fn from_level(high: bool) -> Self {
        if high {
            Self::Released
        } else {
            Self::Low
        }
    }

    /// Returns `true` when the line is not pulled low by this participant.
    #[must_use]
    pub const fn is_released(self) -> bool {
        matches!(self, Self::Released)
    }

    /// Wired-AND of two participants on the same line.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        if self.is_released() && other.is_released() {
            Self::Released
        } else {
            Self::Low
        }
    }

    /// Logical line level with only this participant and the pull-up present.
    #[must_use]
    pub const fn level(self) -> bool {
        self.is_released()
    }
}

/// Resolves the level of an open-drain line shared by several participants.
#[must_use]
pub fn resolve_line(drivers: impl IntoIterator<Item = LineDrive>) -> bool {
    drivers
        .into_iter()
        .fold(LineDrive::Released, LineDrive::and)
        .level()
}

/// Drive state of both I2C lines as presented by one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct I2cDrive {
    /// Clock line drive.
    pub scl: LineDrive,
    /// Data line drive.
    pub sda: LineDrive,
}

impl I2cDrive {
    /// Both lines released.
    pub const RELEASED: Self = Self {
        scl: LineDrive::Released,
        sda: LineDrive::Released,
    };

    /// Combines two participants into the resulting bus levels.
    #[must_use]
    pub const fn resolve(self, other: Self) -> I2cPads {
        I2cPads {
            scl: self.scl.and(other.scl).level(),
            sda: self.sda.and(other.sda).level(),
        }
    }
}

/// Raw line levels at the pads, `true` meaning high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct I2cPads {
    /// Clock line level.
    pub scl: bool,
    /// Data line level.
    pub sda: bool,
}

impl Default for I2cPads {
    fn default() -> Self {
        Self::IDLE
    }
}

impl I2cPads {
    /// Both lines pulled up.
    pub const IDLE: Self = Self {
        scl: true,
        sda: true,
    };
}

/// Framing conditions visible on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusCondition {
    /// SDA fell while SCL was high.
    Start,
    /// SDA rose while SCL was high.
    Stop,
}

/// Per-tick events derived from synchronized SCL/SDA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusEvents {
    /// SCL rising edge; receivers sample SDA here.
    pub sample: bool,
    /// SCL falling edge; transmitters change SDA here.
    pub setup: bool,
    /// START or repeated START condition.
    pub start: bool,
    /// STOP condition.
    pub stop: bool,
}

impl BusEvents {
    /// Returns the framing condition detected in this tick, if any.
    #[must_use]
    pub const fn condition(self) -> Option<BusCondition> {
        if self.start {
            Some(BusCondition::Start)
        } else if self.stop {
            Some(BusCondition::Stop)
        } else {
            None
        }
    }
}

/// Decodes bus conditions from the synchronized line levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusConditionDecoder {
    scl: EdgeDetector,
    sda: EdgeDetector,
}

impl BusConditionDecoder {
    /// Consumes this tick's synchronized levels.
    pub fn decode(&mut self, scl: bool, sda: bool) -> BusEvents {
        let sda_was_high = self.sda.previous();
        let scl_edges = self.scl.update(scl);
        self.sda.update(sda);

        BusEvents {
            sample: scl_edges.rising,
            setup: scl_edges.falling,
            start: scl && sda_was_high && !sda,
            stop: scl && !sda_was_high && sda,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_line, BusCondition, BusConditionDecoder, I2cDrive, LineDrive};

    #[test]
    fn open_drain_line_is_wired_and() {
        assert!(resolve_line([]));
        assert!(resolve_line([LineDrive::Released, LineDrive::Released]));
        assert!(!resolve_line([LineDrive::Released, LineDrive::Low]));
        assert!(!resolve_line([LineDrive::Low, LineDrive::Low]));
    }

    #[test]
    fn from_level_never_drives_high() {
        assert_eq!(LineDrive::from_level(true), LineDrive::Released);
        assert_eq!(LineDrive::from_level(false), LineDrive::Low);
    }

    #[test]
    fn drive_pairs_resolve_per_line() {
        let initiator = I2cDrive {
            scl: LineDrive::Released,
            sda: LineDrive::Low,
        };
        let pads = initiator.resolve(I2cDrive::RELEASED);
        assert!(pads.scl);
        assert!(!pads.sda);

        let stretching = I2cDrive {
            scl: LineDrive::Low,
            sda: LineDrive::Released,
        };
        assert!(!initiator.resolve(stretching).scl);
    }

    #[test]
    fn decoder_sees_start_then_stop() {
        let mut decoder = BusConditionDecoder::default();
        assert_eq!(decoder.decode(true, true).condition(), None);
        assert_eq!(
            decoder.decode(true, false).condition(),
            Some(BusCondition::Start)
        );
        let falling = decoder.decode(false, false);
        assert!(falling.setup && !falling.sample);
        let rising = decoder.decode(true, false);
        assert!(rising.sample);
        assert_eq!(
            decoder.decode(true, true).condition(),
            Some(BusCondition::Stop)
        );
    }

    #[test]
    fn data_change_while_clock_low_is_not_a_condition() {
        let mut decoder = BusConditionDecoder::default();
        decoder.decode(false, true);
        assert_eq!(decoder.decode(false, false).condition(), None);
        assert_eq!(decoder.decode(false, true).condition(), None);
    }
}
