//! Octet to N-wire line serializer with the matching deserializer.
//!
//! Outbound directives are accepted only while the serializer is idle and no
//! inbound octet is still in flight. One SCK half-period lasts `divisor + 1`
//! ticks. Puts change data on the falling edge; gets sample on the rising edge.
//! Inbound pads pass through the bit-line synchronizer, so every sample point
//! is delayed by [`SYNC_STAGES`] ticks. The captured value is the pad level of
//! the last SCK-low tick before the rising edge, which matches the level at
//! the edge for devices that only change data on falling edges.

use log::trace;

use super::mode::{LineDirective, LineWidth, QspiMode};
use crate::sync::{Synchronizer, SYNC_STAGES};

/// Outputs presented to the flash pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct QspiPins {
    /// Serial clock.
    pub sck: bool,
    /// Chip-select, `true` meaning selected.
    pub cs: bool,
    /// Output levels of io3..io0.
    pub d_o: u8,
    /// Output enables of io3..io0.
    pub d_oe: u8,
}

impl QspiPins {
    /// Active-low chip-select level as seen at the board.
    #[must_use]
    pub const fn cs_n(self) -> bool {
        !self.cs
    }

    /// Levels on io3..io0 when the flash drives `device_out` on every wire the
    /// serializer leaves undriven.
    #[must_use]
    pub const fn resolve(self, device_out: u8) -> u8 {
        ((self.d_o & self.d_oe) | (device_out & !self.d_oe)) & 0x0F
    }
}

/// SCK phase of the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SerializerPhase {
    /// Waiting for a directive.
    #[default]
    Idle,
    /// SCK low, counting down to the rising edge.
    Low,
    /// SCK high, counting down to the falling edge.
    High,
}

/// Line serializer registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSerializer {
    divisor: u16,
    phase: SerializerPhase,
    timer: u16,
    cycles_left: u8,
    mode: QspiMode,
    shift_out: u8,
    pins: QspiPins,
    sync: Synchronizer<u8>,
    sample_pipe: [Option<LineWidth>; SYNC_STAGES],
    shift_in: u8,
    in_cycles_left: u8,
    hold: Option<u8>,
}

impl LineSerializer {
    /// Creates an idle serializer with chip-select released.
    #[must_use]
    pub fn new(divisor: u16) -> Self {
        Self {
            divisor,
            phase: SerializerPhase::Idle,
            timer: 0,
            cycles_left: 0,
            mode: QspiMode::Dummy,
            shift_out: 0,
            pins: QspiPins::default(),
            sync: Synchronizer::new(0x0F),
            sample_pipe: [None; SYNC_STAGES],
            shift_in: 0,
            in_cycles_left: 0,
            hold: None,
        }
    }

    /// SCK half-period minus one.
    #[must_use]
    pub const fn divisor(&self) -> u16 {
        self.divisor
    }

    /// Reprograms the SCK divisor; takes effect at the next half-period.
    pub fn set_divisor(&mut self, divisor: u16) {
        self.divisor = divisor;
    }

    /// Current pin outputs.
    #[must_use]
    pub const fn pins(&self) -> QspiPins {
        self.pins
    }

    /// Current SCK phase.
    #[must_use]
    pub const fn phase(&self) -> SerializerPhase {
        self.phase
    }

    /// Mode of the directive accepted last.
    #[must_use]
    pub const fn mode(&self) -> QspiMode {
        self.mode
    }

    /// Outbound ready: a directive offered now would be accepted.
    #[must_use]
    pub fn outbound_ready(&self) -> bool {
        self.phase == SerializerPhase::Idle
            && self.hold.is_none()
            && self.sample_pipe.iter().all(Option::is_none)
            && self.in_cycles_left == 0
    }

    /// Inbound valid: the assembled octet waiting to be taken.
    #[must_use]
    pub const fn inbound(&self) -> Option<u8> {
        self.hold
    }

    fn drive_next(&mut self, width: LineWidth) {
        let bits = width.bits();
        self.pins.d_o = (self.shift_out >> (8 - bits)) & width.mask();
        self.shift_out <<= bits;
    }

    /// Advances one tick.
    ///
    /// `accepted` is the directive handed over this tick (only when
    /// [`Self::outbound_ready`] held), `inbound_taken` acknowledges the octet
    /// reported by [`Self::inbound`], and `pads` are the raw io3..io0 levels.
    pub fn tick(&mut self, accepted: Option<LineDirective>, inbound_taken: bool, pads: u8) {
        let synced = self.sync.clock(pads & 0x0F);

        if inbound_taken {
            self.hold = None;
        }

        let due = self.sample_pipe[SYNC_STAGES - 1];
        self.sample_pipe.copy_within(0..SYNC_STAGES - 1, 1);
        self.sample_pipe[0] = None;
        if let Some(width) = due {
            self.shift_in = (self.shift_in << width.bits()) | width.sample(synced);
            self.in_cycles_left -= 1;
            if self.in_cycles_left == 0 {
                self.hold = Some(self.shift_in);
            }
        }

        match self.phase {
            SerializerPhase::Idle => {
                if let Some(directive) = accepted {
                    self.accept(directive);
                }
            }
            SerializerPhase::Low => {
                if self.timer == 0 {
                    self.pins.sck = true;
                    if self.mode.is_get() {
                        self.sample_pipe[0] = self.mode.width();
                    }
                    self.phase = SerializerPhase::High;
                    self.timer = self.divisor;
                } else {
                    self.timer -= 1;
                }
            }
            SerializerPhase::High => {
                if self.timer == 0 {
                    self.pins.sck = false;
                    self.cycles_left -= 1;
                    if self.cycles_left == 0 {
                        self.phase = SerializerPhase::Idle;
                    } else {
                        if let (false, Some(width)) = (self.mode.is_get(), self.mode.width()) {
                            self.drive_next(width);
                        }
                        self.phase = SerializerPhase::Low;
                        self.timer = self.divisor;
                    }
                } else {
                    self.timer -= 1;
                }
            }
        }
    }

    fn accept(&mut self, directive: LineDirective) {
        trace!("qspi: serializer accepted {directive:?}");
        self.pins.cs = directive.chip;
        self.mode = directive.mode;
        let Some(width) = directive.mode.width() else {
            self.pins.d_oe = 0;
            self.pins.d_o = 0;
            return;
        };

        self.cycles_left = width.cycles_per_octet();
        self.timer = self.divisor;
        self.phase = SerializerPhase::Low;
        if directive.mode.is_get() {
            self.pins.d_o = 0;
            self.pins.d_oe = if width == LineWidth::X1 { 0b0001 } else { 0 };
            self.in_cycles_left = width.cycles_per_octet();
            self.shift_in = 0;
        } else {
            self.shift_out = directive.data;
            self.drive_next(width);
            self.pins.d_oe = width.mask();
        }
    }
}
