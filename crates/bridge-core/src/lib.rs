//! Serial bus protocol bridge: an I2C initiator and a QSPI flash read engine,
//! both modelled as synchronous state machines advancing one tick at a time.

/// Two-stage input synchronizer and edge detection shared by both engines.
pub mod sync;
pub use sync::{EdgeDetector, LineEvents, Synchronizer, SYNC_STAGES};

/// Error taxonomy of the collaborator boundary.
pub mod error;
pub use error::{BridgeError, Engine};

/// Configuration, poll budgets and trace hooks.
pub mod api;
pub use api::{
    I2cConfig, NullTrace, PollBudget, QspiConfig, TraceEvent, TraceRecord, TraceSink,
    DEFAULT_I2C_DIVISOR, I2C_DIVISOR_MASK,
};

/// Byte-wide register bus contract and the I2C register map.
pub mod csr;
pub use csr::{
    decode_register, validate_offset, CsrAccess, CsrBus, I2cRegister, RegisterDescriptor,
    ACTION_OFFSET, ACTION_READ_ACK, ACTION_READ_NACK, ACTION_RESET, ACTION_START, ACTION_STOP,
    CSR_WINDOW_BYTES, DIVIDER_OFFSET, I2C_REGISTER_MAP, RECV_DATA_OFFSET, SEND_DATA_OFFSET,
    STATUS_ACK, STATUS_BUSY, STATUS_OFFSET,
};

/// I2C initiator, register file and bus model.
pub mod i2c;
pub use i2c::{
    AckPolicy, BusCondition, BusConditionDecoder, BusEvents, I2cCommand, I2cDrive, I2cInitiator,
    I2cLink, I2cPads, I2cPeripheral, I2cState, I2cTarget, LineDrive, PullUpOnly,
};

/// QSPI flash read engine and flash device model.
pub mod qspi;
pub use qspi::{
    CommandTranslator, FlashCommand, FlashDevice, FlashModel, FlashWindow, LineDirective,
    LineSerializer, LineWidth, QspiController, QspiMode, QspiPins, TranslatorState,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
