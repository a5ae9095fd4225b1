//! State set and per-state transition rules of the I2C initiator.
//!
//! Every non-idle state is one half-phase of the bus clock. Instead of spelling
//! out each state by hand, the initiator looks up a [`TransitionRule`] that says
//! how the state waits for the divider strobe, where it goes next, and which
//! single side effect it commits on the way out.

use super::bus::LineDrive;

/// Initiator state. `Idle` is both the initial and the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum I2cState {
    #[default]
    Idle,
    StartSclLow,
    StartSdaHigh,
    StartSclHigh,
    StartSdaLow,
    StopSclLow,
    StopSdaLow,
    StopSclHigh,
    StopSdaHigh,
    WriteSclLow,
    WriteSdaBit,
    WriteSclHigh,
    WriteSdaNext,
    WriteAckSclLow,
    WriteAckSdaRelease,
    WriteAckSclHigh,
    WriteAckSdaNext,
    ReadSclLow,
    ReadSdaRelease,
    ReadSclHigh,
    ReadSdaNext,
    ReadAckSclLow,
    ReadAckSdaBit,
    ReadAckSclHigh,
    ReadAckSdaNext,
}

/// How a state waits before it may leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalfPhase {
    /// On the strobe, pull SCL low and leave.
    SclLow,
    /// On the strobe, release SCL; leave once SCL is seen released (and, with
    /// clock stretching, once the synchronized SCL actually reads high).
    SclHigh,
    /// Leave on the strobe without touching SCL.
    Strobe,
}

/// Side effect committed in the tick a state is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleAction {
    /// Nothing besides the state change.
    None,
    /// Release SDA.
    ReleaseSda,
    /// Pull SDA low.
    DriveSdaLow,
    /// Present the most significant outbound bit on SDA.
    DriveSdaMsb,
    /// Shift the outbound register left by one.
    ShiftOut,
    /// Move to the next bit slot.
    AdvanceBit,
    /// Latch the acknowledge bit driven by the receiver.
    SampleAck,
    /// Shift the sampled SDA level into the inbound register.
    ShiftIn,
    /// Drive the ACK or NACK chosen when the read was accepted.
    DriveAckBit,
    /// Publish the inbound register as received data.
    LatchData,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionRule {
    /// State this rule applies to.
    pub state: I2cState,
    /// Waiting discipline of the state.
    pub phase: HalfPhase,
    /// Successor state.
    pub next: I2cState,
    /// Successor taken instead of `next` when the bit slot index is 7.
    pub last_bit_next: Option<I2cState>,
    /// Side effect applied on exit.
    pub action: RuleAction,
}

const fn rule(
    state: I2cState,
    phase: HalfPhase,
    next: I2cState,
    action: RuleAction,
) -> TransitionRule {
    TransitionRule {
        state,
        phase,
        next,
        last_bit_next: None,
        action,
    }
}

const fn bit_rule(state: I2cState, next: I2cState, last_bit_next: I2cState) -> TransitionRule {
    TransitionRule {
        state,
        phase: HalfPhase::Strobe,
        next,
        last_bit_next: Some(last_bit_next),
        action: RuleAction::AdvanceBit,
    }
}

/// Transition rules for every non-idle state.
pub const TRANSITION_TABLE: &[TransitionRule] = {
    use HalfPhase::{SclHigh, SclLow, Strobe};
    use I2cState as S;
    use RuleAction as A;

    &[
        rule(S::StartSclLow, SclLow, S::StartSdaHigh, A::None),
        rule(S::StartSdaHigh, Strobe, S::StartSclHigh, A::ReleaseSda),
        rule(S::StartSclHigh, SclHigh, S::StartSdaLow, A::None),
        rule(S::StartSdaLow, Strobe, S::Idle, A::DriveSdaLow),
        rule(S::StopSclLow, SclLow, S::StopSdaLow, A::None),
        rule(S::StopSdaLow, Strobe, S::StopSclHigh, A::DriveSdaLow),
        rule(S::StopSclHigh, SclHigh, S::StopSdaHigh, A::None),
        rule(S::StopSdaHigh, Strobe, S::Idle, A::ReleaseSda),
        rule(S::WriteSclLow, SclLow, S::WriteSdaBit, A::None),
        rule(S::WriteSdaBit, Strobe, S::WriteSclHigh, A::DriveSdaMsb),
        rule(S::WriteSclHigh, SclHigh, S::WriteSdaNext, A::ShiftOut),
        bit_rule(S::WriteSdaNext, S::WriteSclLow, S::WriteAckSclLow),
        rule(S::WriteAckSclLow, SclLow, S::WriteAckSdaRelease, A::None),
        rule(S::WriteAckSdaRelease, Strobe, S::WriteAckSclHigh, A::ReleaseSda),
        rule(S::WriteAckSclHigh, SclHigh, S::WriteAckSdaNext, A::SampleAck),
        rule(S::WriteAckSdaNext, Strobe, S::Idle, A::None),
        rule(S::ReadSclLow, SclLow, S::ReadSdaRelease, A::None),
        rule(S::ReadSdaRelease, Strobe, S::ReadSclHigh, A::ReleaseSda),
        rule(S::ReadSclHigh, SclHigh, S::ReadSdaNext, A::ShiftIn),
        bit_rule(S::ReadSdaNext, S::ReadSclLow, S::ReadAckSclLow),
        rule(S::ReadAckSclLow, SclLow, S::ReadAckSdaBit, A::None),
        rule(S::ReadAckSdaBit, Strobe, S::ReadAckSclHigh, A::DriveAckBit),
        rule(S::ReadAckSclHigh, SclHigh, S::ReadAckSdaNext, A::LatchData),
        rule(S::ReadAckSdaNext, Strobe, S::Idle, A::None),
    ]
};

/// Looks up the transition rule of a state. `Idle` has none.
#[must_use]
pub fn transition_rule(state: I2cState) -> Option<&'static TransitionRule> {
    TRANSITION_TABLE.iter().find(|entry| entry.state == state)
}

/// First state of a START, chosen from the synchronized bus levels.
///
/// | SCL | SDA | path |
/// |-----|-----|------|
/// | 1   | 1   | bus idle: only pull SDA low |
/// | 0   | x   | SCL low: raise SCL, then pull SDA low |
/// | 1   | 0   | repeated start: lower SCL, raise SDA, raise SCL, pull SDA low |
#[must_use]
pub const fn start_entry(scl: bool, sda: bool) -> I2cState {
    match (scl, sda) {
        (true, true) => I2cState::StartSdaLow,
        (false, _) => I2cState::StartSclHigh,
        (true, false) => I2cState::StartSclLow,
    }
}

/// First state of a STOP, chosen from the synchronized SCL level and the SDA
/// drive the initiator itself is applying.
///
/// | SCL | own SDA  | path |
/// |-----|----------|------|
/// | 1   | low      | only release SDA |
/// | 0   | x        | raise SCL, then release SDA |
/// | 1   | released | lower SCL, pull SDA low, raise SCL, release SDA |
#[must_use]
pub const fn stop_entry(scl: bool, sda_drive: LineDrive) -> I2cState {
    match (scl, sda_drive) {
        (true, LineDrive::Low) => I2cState::StopSdaHigh,
        (false, _) => I2cState::StopSclHigh,
        (true, LineDrive::Released) => I2cState::StopSclLow,
    }
}
