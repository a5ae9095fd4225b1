//! Behavioral serial NOR flash used as the device side of the read path.
//!
//! The model samples io lines on SCK rising edges, updates its output on
//! falling edges and forgets the current command when chip-select is released.
//! Storage is erased to `0xFF`; reads past the end wrap around the capacity.

use log::warn;

use super::mode::FlashCommand;
use super::serializer::QspiPins;
use crate::BridgeError;

/// Identification bytes returned by `ReadId`, repeated for as long as SCK runs.
pub const FLASH_ID: [u8; 4] = [0xCA, 0x7C, 0xA7, 0xFF];

/// `ReadId` opcode.
pub const READ_ID_OPCODE: u8 = 0x9F;

/// Opcodes accepted without any effect on the model.
pub const NO_OP_OPCODES: [u8; 8] = [0xAB, 0xFF, 0x35, 0x31, 0x50, 0x05, 0x01, 0x06];

/// Octets preceding quad data: opcode, three address octets, mode and dummy.
const QUAD_DATA_START: usize = 6;

/// Device side of the QSPI pins.
pub trait FlashDevice {
    /// Observes the serializer outputs of this tick and returns the device's
    /// drive on io3..io0.
    fn step(&mut self, pins: QspiPins) -> u8;
}

/// Serial NOR flash model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashModel {
    data: Vec<u8>,
    last_sck: bool,
    last_cs_n: bool,
    bit_count: u8,
    byte_count: usize,
    width: u8,
    command: u8,
    current: u8,
    addr: u32,
    out: u8,
    d_i: u8,
    unknown_command: Option<u8>,
}

impl FlashModel {
    /// Creates an erased flash of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0xFF; capacity],
            last_sck: false,
            last_cs_n: true,
            bit_count: 0,
            byte_count: 0,
            width: 1,
            command: 0,
            current: 0,
            addr: 0,
            out: 0,
            d_i: 0,
            unknown_command: None,
        }
    }

    /// Creates a flash holding exactly `image`.
    #[must_use]
    pub fn with_image(image: &[u8]) -> Self {
        Self {
            data: image.to_vec(),
            ..Self::new(0)
        }
    }

    /// Storage size in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Copies `image` into storage at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ImageOutOfRange`] when the image does not fit.
    pub fn load(&mut self, offset: usize, image: &[u8]) -> Result<(), BridgeError> {
        let out_of_range = BridgeError::ImageOutOfRange {
            offset,
            len: image.len(),
            capacity: self.data.len(),
        };
        let end = offset.checked_add(image.len()).ok_or(out_of_range)?;
        let slot = self.data.get_mut(offset..end).ok_or(out_of_range)?;
        slot.copy_from_slice(image);
        Ok(())
    }

    /// Opcode of the command in progress.
    #[must_use]
    pub const fn command(&self) -> u8 {
        self.command
    }

    /// Most recent opcode the model did not recognize.
    #[must_use]
    pub const fn unknown_command(&self) -> Option<u8> {
        self.unknown_command
    }

    fn storage(&self, addr: u32) -> u8 {
        let Ok(addr) = usize::try_from(addr) else {
            return 0xFF;
        };
        if self.data.is_empty() {
            0xFF
        } else {
            self.data[addr % self.data.len()]
        }
    }

    fn accumulate_address(&mut self) {
        if self.byte_count <= 3 {
            self.addr |= u32::from(self.current) << ((3 - self.byte_count) * 8);
        }
    }

    fn read_next(&mut self) {
        self.out = self.storage(self.addr);
        self.addr = (self.addr + 1) & 0x00FF_FFFF;
    }

    fn process_octet(&mut self) {
        self.out = 0;
        if self.byte_count == 0 {
            self.addr = 0;
            self.width = 1;
            self.command = self.current;
            if self.command == FlashCommand::FastReadQuadInOut.opcode() {
                self.width = 4;
            } else if self.command != FlashCommand::Read.opcode()
                && self.command != READ_ID_OPCODE
                && !NO_OP_OPCODES.contains(&self.command)
            {
                warn!("flash: unknown command {:#04x}", self.command);
                self.unknown_command = Some(self.command);
            }
        } else if self.command == FlashCommand::Read.opcode() {
            self.accumulate_address();
            if self.byte_count >= 3 {
                self.read_next();
            }
        } else if self.command == FlashCommand::FastReadQuadInOut.opcode() {
            self.accumulate_address();
            if self.byte_count >= QUAD_DATA_START {
                self.read_next();
            }
        }
        if self.command == READ_ID_OPCODE {
            self.out = FLASH_ID[self.byte_count % FLASH_ID.len()];
        }
    }
}

impl FlashDevice for FlashModel {
    fn step(&mut self, pins: QspiPins) -> u8 {
        let cs_n = pins.cs_n();
        if cs_n && !self.last_cs_n {
            self.bit_count = 0;
            self.byte_count = 0;
            self.width = 1;
        } else if pins.sck && !self.last_sck && !cs_n {
            self.current = if self.width == 4 {
                (self.current << 4) | (pins.d_o & 0x0F)
            } else {
                (self.current << 1) | (pins.d_o & 1)
            };
            self.out <<= self.width;
            self.bit_count += self.width;
            if self.bit_count == 8 {
                self.process_octet();
                self.byte_count += 1;
                self.bit_count = 0;
            }
        } else if !pins.sck && self.last_sck && !cs_n {
            self.d_i = if self.width == 4 {
                self.out >> 4
            } else {
                (self.out >> 7) << 1
            };
        }
        self.last_sck = pins.sck;
        self.last_cs_n = cs_n;
        self.d_i
    }
}
