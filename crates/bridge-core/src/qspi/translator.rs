//! Bus read request to flash command translator.

use super::mode::{FlashCommand, LineDirective};

/// Octets per bus word.
pub const WORD_OCTETS: u8 = 4;
/// Address octets sent after the opcode.
pub const ADDRESS_OCTETS: u8 = 3;
/// Flash byte addresses are 24 bits wide.
pub const FLASH_ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Converts a bus word index into the flash byte address.
#[must_use]
pub const fn flash_address(word: u32) -> u32 {
    (word << WORD_OCTETS.trailing_zeros()) & FLASH_ADDRESS_MASK
}

/// Translator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TranslatorState {
    /// Offers the opcode once a request is pending.
    #[default]
    Wait,
    /// Offers address octets, most significant first.
    Address,
    /// Offers one placeholder directive.
    Dummy,
    /// Offers gets and collects inbound octets.
    DataRead,
    /// Offers one directive that releases chip-select.
    Deselect,
}

/// Translator registers.
///
/// The outbound and inbound streams are counted separately; the data phase
/// ends only once both reached [`WORD_OCTETS`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandTranslator {
    state: TranslatorState,
    word: u32,
    address_index: u8,
    outbound_count: u8,
    inbound_count: u8,
    data: u32,
    ack: bool,
}

impl CommandTranslator {
    /// Opcode every request is translated into.
    pub const COMMAND: FlashCommand = FlashCommand::Read;

    /// Creates a translator waiting for a request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TranslatorState {
        self.state
    }

    /// High for the one tick after the last inbound octet was packed.
    #[must_use]
    pub const fn ack(&self) -> bool {
        self.ack
    }

    /// Response word, valid while [`Self::ack`] is high.
    #[must_use]
    pub const fn data(&self) -> u32 {
        self.data
    }

    /// Directive offered this tick, if any. `request` is the word index the
    /// bus is asking for.
    #[must_use]
    pub fn offer(&self, request: Option<u32>) -> Option<LineDirective> {
        match self.state {
            TranslatorState::Wait => request.map(|_| LineDirective::put_x1(Self::COMMAND.opcode())),
            TranslatorState::Address => {
                let octets = flash_address(self.word).to_be_bytes();
                let index = usize::from(ADDRESS_OCTETS - self.address_index);
                Some(LineDirective::put_x1(octets[index]))
            }
            TranslatorState::Dummy => Some(LineDirective::dummy()),
            TranslatorState::DataRead => {
                if self.outbound_count < WORD_OCTETS {
                    Some(LineDirective::get_x1())
                } else {
                    None
                }
            }
            TranslatorState::Deselect => Some(LineDirective::deselect()),
        }
    }

    /// Inbound ready: an octet offered now would be taken.
    #[must_use]
    pub const fn inbound_ready(&self) -> bool {
        matches!(self.state, TranslatorState::DataRead) && self.inbound_count < WORD_OCTETS
    }

    /// Advances one tick.
    ///
    /// `outbound_fired` reports that the directive from [`Self::offer`] was
    /// accepted; `inbound` carries the octet taken this tick.
    pub fn tick(&mut self, request: Option<u32>, outbound_fired: bool, inbound: Option<u8>) {
        match self.state {
            TranslatorState::Wait => {
                if let (true, Some(word)) = (outbound_fired, request) {
                    self.word = word;
                    self.address_index = ADDRESS_OCTETS - 1;
                    self.state = TranslatorState::Address;
                }
            }
            TranslatorState::Address => {
                if outbound_fired {
                    if self.address_index == 0 {
                        self.state = TranslatorState::Dummy;
                    } else {
                        self.address_index -= 1;
                    }
                }
            }
            TranslatorState::Dummy => {
                if outbound_fired {
                    self.state = TranslatorState::DataRead;
                }
            }
            TranslatorState::DataRead => {
                let outbound = self.outbound_count + u8::from(outbound_fired);
                let mut inbound_count = self.inbound_count;
                if let Some(octet) = inbound {
                    let lane = 8 * u32::from(inbound_count);
                    self.data = (self.data & !(0xFF << lane)) | (u32::from(octet) << lane);
                    inbound_count += 1;
                }
                if outbound == WORD_OCTETS && inbound_count == WORD_OCTETS {
                    self.ack = true;
                    self.outbound_count = 0;
                    self.inbound_count = 0;
                    self.state = TranslatorState::Deselect;
                } else {
                    self.outbound_count = outbound;
                    self.inbound_count = inbound_count;
                }
            }
            TranslatorState::Deselect => {
                self.ack = false;
                if outbound_fired {
                    self.state = TranslatorState::Wait;
                }
            }
        }
    }
}
