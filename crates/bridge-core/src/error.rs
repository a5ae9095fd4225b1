use thiserror::Error;

/// Protocol engine identifiers used to attribute collaborator-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Engine {
    /// Two-wire open-drain initiator.
    I2c,
    /// Memory-mapped flash read path.
    Qspi,
}

impl Engine {
    /// Short peripheral name used in logs and trace records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I2c => "i2c",
            Self::Qspi => "qspi",
        }
    }
}

impl core::fmt::Display for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Failures raised at the collaborator boundary.
///
/// The engines themselves have no error channel: a stuck bus simply keeps the
/// state machine where it is. These variants are produced by register decoding,
/// the read-only flash window, and poll loops that were given a tick budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BridgeError {
    /// Register access outside the 5-bit CSR window.
    #[error("csr offset {offset:#04x} is outside the register window")]
    OffsetOutOfRange {
        /// Offending byte offset.
        offset: u8,
    },
    /// Write issued to the memory-mapped flash window.
    #[error("flash window is read-only (write to word {addr:#08x})")]
    ReadOnlyWindow {
        /// Word index targeted by the rejected write.
        addr: u32,
    },
    /// A bounded poll loop ran out of ticks before the engine completed.
    #[error("{engine} engine did not complete within {ticks} ticks")]
    Timeout {
        /// Engine that stalled.
        engine: Engine,
        /// Tick budget that was exhausted.
        ticks: u64,
    },
    /// Flash image does not fit into the device model's storage.
    #[error("image of {len} bytes at offset {offset:#x} exceeds flash capacity {capacity:#x}")]
    ImageOutOfRange {
        /// Requested load offset.
        offset: usize,
        /// Image length in bytes.
        len: usize,
        /// Flash storage capacity in bytes.
        capacity: usize,
    },
}

impl BridgeError {
    /// Returns the engine a failure is attributed to, when there is one.
    #[must_use]
    pub const fn engine(self) -> Option<Engine> {
        match self {
            Self::OffsetOutOfRange { .. } => Some(Engine::I2c),
            Self::ReadOnlyWindow { .. } | Self::ImageOutOfRange { .. } => Some(Engine::Qspi),
            Self::Timeout { engine, .. } => Some(engine),
        }
    }

    /// Hangs are the only failures a watchdog reset can clear.
    #[must_use]
    pub const fn is_hang(self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{BridgeError, Engine};

    #[test]
    fn errors_are_attributed_to_their_engine() {
        assert_eq!(
            BridgeError::OffsetOutOfRange { offset: 0x20 }.engine(),
            Some(Engine::I2c)
        );
        assert_eq!(
            BridgeError::ReadOnlyWindow { addr: 4 }.engine(),
            Some(Engine::Qspi)
        );
        assert_eq!(
            BridgeError::Timeout {
                engine: Engine::I2c,
                ticks: 10
            }
            .engine(),
            Some(Engine::I2c)
        );
    }

    #[test]
    fn only_timeouts_are_hangs() {
        assert!(BridgeError::Timeout {
            engine: Engine::Qspi,
            ticks: 1
        }
        .is_hang());
        assert!(!BridgeError::OffsetOutOfRange { offset: 0xFF }.is_hang());
    }

    #[test]
    fn display_messages_name_the_failure() {
        let timeout = BridgeError::Timeout {
            engine: Engine::Qspi,
            ticks: 500,
        };
        assert_eq!(
            timeout.to_string(),
            "qspi engine did not complete within 500 ticks"
        );
        assert_eq!(
            BridgeError::OffsetOutOfRange { offset: 0x21 }.to_string(),
            "csr offset 0x21 is outside the register window"
        );
    }
}
