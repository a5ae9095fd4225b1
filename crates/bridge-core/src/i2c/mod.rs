//! Two-wire initiator, its register file and the bus model it drives.

pub mod bus;
pub mod initiator;
pub mod peripheral;
pub mod rules;
pub mod target;

pub use bus::{
    resolve_line, BusCondition, BusConditionDecoder, BusEvents, I2cDrive, I2cPads, LineDrive,
};
pub use initiator::{AckPolicy, I2cCommand, I2cInitiator};
pub use peripheral::I2cPeripheral;
pub use rules::{
    start_entry, stop_entry, transition_rule, HalfPhase, I2cState, RuleAction, TransitionRule,
    TRANSITION_TABLE,
};
pub use target::{I2cLink, I2cTarget, PullUpOnly, SETTLE_TICKS};
