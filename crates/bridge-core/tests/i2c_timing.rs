//! Tick-exact I2C initiator timing, START/STOP entry paths and frame traffic
//! against a behavioral EEPROM.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]

use bridge_core::i2c::SETTLE_TICKS;
use bridge_core::{
    AckPolicy, CsrBus, I2cCommand, I2cConfig, I2cDrive, I2cInitiator, I2cLink, I2cPads,
    I2cPeripheral, I2cState, I2cTarget, LineDrive, PollBudget, PullUpOnly, ACTION_OFFSET,
    ACTION_START, ACTION_STOP,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const BUDGET: PollBudget = PollBudget::UNBOUNDED;

fn new_link<T: I2cTarget>(divisor: u16, clock_stretch: bool, target: T) -> I2cLink<T> {
    I2cLink::new(
        I2cPeripheral::new(I2cConfig {
            divisor,
            clock_stretch,
        }),
        target,
    )
}

const fn octet_ticks(divisor: u64) -> u64 {
    36 * (divisor + 1) + 38
}

/// Issues an action strobe by hand so the first state after acceptance can be
/// observed. Returns that state and the ticks until `busy` drops.
fn strobe<T: I2cTarget>(link: &mut I2cLink<T>, action: u8) -> (I2cState, u64) {
    link.run_until_idle(BUDGET).expect("idle");
    link.settle(SETTLE_TICKS);
    link.peripheral_mut()
        .write8(ACTION_OFFSET, action)
        .expect("action register");
    link.tick();
    let first = link.peripheral().engine().state();
    let rest = link.run_until_idle(BUDGET).expect("completes");
    (first, rest + 1)
}

/// Holds SCL low for the first `ticks` steps after power-up.
struct HoldClock {
    ticks: u64,
    seen: u64,
}

impl I2cTarget for HoldClock {
    fn step(&mut self, _pads: I2cPads) -> I2cDrive {
        self.seen += 1;
        I2cDrive {
            scl: LineDrive::from_level(self.seen > self.ticks),
            sda: LineDrive::Released,
        }
    }
}

/// Stretches the clock for `hold` ticks after the `edge`-th SCL falling edge.
struct Stretcher {
    edge: u32,
    hold: u64,
    falls: u32,
    remaining: u64,
    last_scl: bool,
}

impl Stretcher {
    fn new(edge: u32, hold: u64) -> Self {
        Self {
            edge,
            hold,
            falls: 0,
            remaining: 0,
            last_scl: true,
        }
    }
}

impl I2cTarget for Stretcher {
    fn step(&mut self, pads: I2cPads) -> I2cDrive {
        if self.last_scl && !pads.scl {
            self.falls += 1;
            if self.falls == self.edge {
                self.remaining = self.hold;
            }
        }
        self.last_scl = pads.scl;
        let scl = if self.remaining > 0 {
            self.remaining -= 1;
            LineDrive::Low
        } else {
            LineDrive::Released
        };
        I2cDrive {
            scl,
            sda: LineDrive::Released,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Receive,
    Transmit,
    Ignore,
}

/// 24Cxx-style EEPROM: `[addr|W, pointer, data..]` writes, `[addr|R]` reads
/// sequentially from the pointer.
struct Eeprom {
    address: u8,
    memory: [u8; 16],
    pointer: usize,
    last: I2cPads,
    phase: Phase,
    bits: u8,
    shift: u8,
    octet_index: usize,
    read: bool,
    outgoing: u8,
    master_ack: bool,
    sda: LineDrive,
}

impl Eeprom {
    fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0; 16],
            pointer: 0,
            last: I2cPads::IDLE,
            phase: Phase::Idle,
            bits: 0,
            shift: 0,
            octet_index: 0,
            read: false,
            outgoing: 0,
            master_ack: false,
            sda: LineDrive::Released,
        }
    }

    fn load(&mut self) {
        self.outgoing = self.memory[self.pointer];
        self.pointer = (self.pointer + 1) % self.memory.len();
        self.sda = LineDrive::from_level(self.outgoing & 0x80 != 0);
    }

    fn octet_received(&mut self) {
        let mut ack = true;
        match self.octet_index {
            0 if self.shift >> 1 == self.address => self.read = self.shift & 1 != 0,
            0 => {
                ack = false;
                self.phase = Phase::Ignore;
            }
            1 => self.pointer = usize::from(self.shift) % self.memory.len(),
            _ => {
                self.memory[self.pointer] = self.shift;
                self.pointer = (self.pointer + 1) % self.memory.len();
            }
        }
        self.octet_index += 1;
        if ack {
            self.sda = LineDrive::Low;
        }
    }
}

impl I2cTarget for Eeprom {
    fn step(&mut self, pads: I2cPads) -> I2cDrive {
        let rise = pads.scl && !self.last.scl;
        let fall = !pads.scl && self.last.scl;
        let scl_high = pads.scl && self.last.scl;
        if scl_high && self.last.sda && !pads.sda {
            self.phase = Phase::Receive;
            self.bits = 0;
            self.octet_index = 0;
            self.read = false;
            self.sda = LineDrive::Released;
        } else if scl_high && !self.last.sda && pads.sda {
            self.phase = Phase::Idle;
            self.sda = LineDrive::Released;
        } else if rise {
            match self.phase {
                Phase::Receive => {
                    if self.bits < 8 {
                        self.shift = (self.shift << 1) | u8::from(pads.sda);
                    }
                    self.bits += 1;
                }
                Phase::Transmit => {
                    self.bits += 1;
                    if self.bits == 9 {
                        self.master_ack = !pads.sda;
                    }
                }
                Phase::Idle | Phase::Ignore => {}
            }
        } else if fall {
            match self.phase {
                Phase::Receive if self.bits == 8 => self.octet_received(),
                Phase::Receive if self.bits == 9 => {
                    self.bits = 0;
                    self.sda = LineDrive::Released;
                    if self.read {
                        self.phase = Phase::Transmit;
                        self.load();
                    }
                }
                Phase::Transmit if self.bits < 8 => {
                    self.sda = LineDrive::from_level(self.outgoing & (0x80 >> self.bits) != 0);
                }
                Phase::Transmit if self.bits == 8 => self.sda = LineDrive::Released,
                Phase::Transmit => {
                    self.bits = 0;
                    if self.master_ack {
                        self.load();
                    } else {
                        self.phase = Phase::Ignore;
                        self.sda = LineDrive::Released;
                    }
                }
                _ => {}
            }
        }
        self.last = pads;
        I2cDrive {
            scl: LineDrive::Released,
            sda: self.sda,
        }
    }
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
#[case(10)]
fn empty_bus_command_latencies(#[case] divisor: u16) {
    let d = u64::from(divisor);
    let mut link = new_link(divisor, true, PullUpOnly);

    assert_eq!(link.transact(I2cCommand::Start, BUDGET), Ok(d + 3));
    assert_eq!(
        link.transact(I2cCommand::Write(0xAB), BUDGET),
        Ok(octet_ticks(d))
    );
    assert!(!link.peripheral().engine().ack_received());
    assert_eq!(
        link.transact(I2cCommand::Read(AckPolicy::Ack), BUDGET),
        Ok(octet_ticks(d))
    );
    assert_eq!(link.peripheral().engine().data_out(), 0xFF);
    assert_eq!(link.transact(I2cCommand::Start, BUDGET), Ok(4 * d + 10));
    assert_eq!(link.transact(I2cCommand::Stop, BUDGET), Ok(d + 3));
    assert_eq!(link.pads(), I2cPads::IDLE);
}

#[rstest]
#[case(1, 74)]
#[case(2, 110)]
#[case(5, 218)]
fn disabling_clock_stretch_skips_the_scl_wait(#[case] divisor: u16, #[case] expected: u64) {
    let mut link = new_link(divisor, false, PullUpOnly);
    link.transact(I2cCommand::Start, BUDGET).expect("start");
    assert_eq!(link.transact(I2cCommand::Write(0x5A), BUDGET), Ok(expected));
    assert_eq!(
        link.transact(I2cCommand::Read(AckPolicy::Nack), BUDGET),
        Ok(expected)
    );
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn start_from_idle_bus_drops_sda_directly(#[case] divisor: u16) {
    let d = u64::from(divisor);
    let mut link = new_link(divisor, true, PullUpOnly);
    let (first, ticks) = strobe(&mut link, ACTION_START);
    assert_eq!(first, I2cState::StartSdaLow);
    assert_eq!(ticks, d + 3);
    assert_eq!(
        link.pads(),
        I2cPads {
            scl: true,
            sda: false
        }
    );

    let (first, ticks) = strobe(&mut link, ACTION_STOP);
    assert_eq!(first, I2cState::StopSdaHigh);
    assert_eq!(ticks, d + 3);
    assert_eq!(link.pads(), I2cPads::IDLE);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
fn repeated_start_lowers_scl_first(#[case] divisor: u16) {
    let d = u64::from(divisor);
    let mut link = new_link(divisor, true, PullUpOnly);
    strobe(&mut link, ACTION_START);
    let (first, ticks) = strobe(&mut link, ACTION_START);
    assert_eq!(first, I2cState::StartSclLow);
    assert_eq!(ticks, 4 * d + 10);

    let (first, ticks) = strobe(&mut link, ACTION_STOP);
    assert_eq!(first, I2cState::StopSdaHigh);
    assert_eq!(ticks, d + 3);
    assert_eq!(link.pads(), I2cPads::IDLE);
}

#[rstest]
#[case(1, 20)]
#[case(2, 20)]
#[case(3, 40)]
fn start_with_scl_held_low_waits_for_release(#[case] divisor: u16, #[case] hold: u64) {
    let d = u64::from(divisor);
    let mut link = new_link(divisor, true, HoldClock { ticks: hold, seen: 0 });
    let (first, ticks) = strobe(&mut link, ACTION_START);
    assert_eq!(first, I2cState::StartSclHigh);
    assert_eq!(ticks, hold + d);
    assert_eq!(
        link.pads(),
        I2cPads {
            scl: true,
            sda: false
        }
    );

    assert_eq!(link.transact(I2cCommand::Stop, BUDGET), Ok(d + 3));
    assert_eq!(link.pads(), I2cPads::IDLE);
}

#[rstest]
#[case(1, 0)]
#[case(1, 7)]
#[case(2, 1)]
#[case(2, 33)]
#[case(4, 7)]
fn stretching_adds_exactly_the_held_ticks(#[case] divisor: u16, #[case] extra: u64) {
    let d = u64::from(divisor);
    let hold = 2 * (d + 1) + 1 + extra;
    let mut link = new_link(divisor, true, Stretcher::new(4, hold));
    link.transact(I2cCommand::Start, BUDGET).expect("start");
    assert_eq!(
        link.transact(I2cCommand::Write(0xAB), BUDGET),
        Ok(octet_ticks(d) + extra)
    );
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn eeprom_round_trip_through_frames(#[case] divisor: u16) {
    let mut link = new_link(divisor, true, Eeprom::new(0x50));

    let acks = link
        .write_frame(&[0xA0, 0x04, 0xDE, 0xAD, 0xBE], BUDGET)
        .expect("write frame");
    assert_eq!(acks, vec![true; 5]);
    assert_eq!(&link.target().memory[4..7], &[0xDE, 0xAD, 0xBE]);
    assert_eq!(link.pads(), I2cPads::IDLE);

    link.write_frame(&[0xA0, 0x04], BUDGET).expect("set pointer");
    assert_eq!(
        link.read_frame(0xA1, 3, BUDGET),
        Ok(Some(vec![0xDE, 0xAD, 0xBE]))
    );
    assert_eq!(link.pads(), I2cPads::IDLE);
}

#[test]
fn eeprom_ignores_other_addresses() {
    let mut link = new_link(1, true, Eeprom::new(0x50));
    assert_eq!(
        link.write_frame(&[0xA2, 0x00], BUDGET),
        Ok(vec![false, false])
    );
    assert_eq!(link.read_frame(0xA3, 1, BUDGET), Ok(None));
    assert_eq!(link.target().phase, Phase::Idle);
}

#[test]
fn reset_strobe_aborts_a_transfer_and_keeps_the_divider() {
    let mut link = new_link(3, true, PullUpOnly);
    link.transact(I2cCommand::Start, BUDGET).expect("start");
    link.peripheral_mut()
        .write8(bridge_core::SEND_DATA_OFFSET, 0x55)
        .expect("send data");
    link.settle(10);
    assert!(link.peripheral().engine().busy());
    link.peripheral_mut()
        .write8(ACTION_OFFSET, bridge_core::ACTION_RESET)
        .expect("reset");
    link.tick();
    assert_eq!(link.peripheral().engine().state(), I2cState::Idle);
    assert_eq!(link.peripheral().engine().drive(), I2cDrive::RELEASED);
    assert_eq!(link.peripheral().divider(), 3);
    assert_eq!(link.run_until_idle(BUDGET), Ok(1));
}

fn settled_engine() -> I2cInitiator {
    let mut engine = I2cInitiator::default();
    for _ in 0..6 {
        engine.tick(engine.drive().resolve(I2cDrive::RELEASED));
    }
    assert!(engine.issue_start());
    loop {
        engine.tick(engine.drive().resolve(I2cDrive::RELEASED));
        if !engine.busy() {
            break;
        }
    }
    for _ in 0..SETTLE_TICKS {
        engine.tick(engine.drive().resolve(I2cDrive::RELEASED));
    }
    engine
}

fn command_strategy() -> impl Strategy<Value = I2cCommand> {
    prop_oneof![
        Just(I2cCommand::Start),
        Just(I2cCommand::Stop),
        any::<u8>().prop_map(I2cCommand::Write),
        any::<bool>().prop_map(|ack| I2cCommand::Read(if ack {
            AckPolicy::Ack
        } else {
            AckPolicy::Nack
        })),
    ]
}

proptest! {
    #[test]
    fn commands_issued_while_busy_change_nothing(
        octet in any::<u8>(),
        at in 1_usize..100,
        extra in command_strategy(),
    ) {
        let mut reference = settled_engine();
        let mut probed = reference.clone();
        prop_assert!(reference.issue_write(octet));
        prop_assert!(probed.issue_write(octet));

        for tick in 0..200 {
            if tick == at {
                prop_assert!(probed.busy());
                prop_assert!(!probed.issue(extra));
            }
            let pads = reference.drive().resolve(I2cDrive::RELEASED);
            reference.tick(pads);
            probed.tick(pads);
            prop_assert_eq!(reference.state(), probed.state());
            prop_assert_eq!(reference.drive(), probed.drive());
            prop_assert_eq!(reference.busy(), probed.busy());
            prop_assert_eq!(reference.ack_received(), probed.ack_received());
            prop_assert_eq!(reference.data_out(), probed.data_out());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn octet_timing_holds_for_every_divisor(
        divisor in 1_u16..=0x0FFF,
        clock_stretch in any::<bool>(),
        octet in any::<u8>(),
    ) {
        let d = u64::from(divisor);
        let expected = if clock_stretch {
            octet_ticks(d)
        } else {
            octet_ticks(d) - 36
        };
        let mut link = new_link(divisor, clock_stretch, PullUpOnly);
        prop_assert_eq!(link.transact(I2cCommand::Start, BUDGET), Ok(d + 3));
        prop_assert_eq!(link.transact(I2cCommand::Write(octet), BUDGET), Ok(expected));
        prop_assert_eq!(
            link.transact(I2cCommand::Read(AckPolicy::Nack), BUDGET),
            Ok(expected)
        );
    }
}
