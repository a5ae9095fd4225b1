//! Byte-addressable control/status register contract and the I2C register map.

use crate::BridgeError;

/// Number of byte offsets decoded by a register window (5-bit address).
pub const CSR_WINDOW_BYTES: u8 = 0x20;

/// Offset of the divider low chunk.
pub const DIVIDER_OFFSET: u8 = 0x00;
/// Offset of the action strobe register.
pub const ACTION_OFFSET: u8 = 0x04;
/// Offset of the outbound data register.
pub const SEND_DATA_OFFSET: u8 = 0x08;
/// Offset of the inbound data register.
pub const RECV_DATA_OFFSET: u8 = 0x0C;
/// Offset of the status register.
pub const STATUS_OFFSET: u8 = 0x10;

/// `Action` bit resetting the engine.
pub const ACTION_RESET: u8 = 1 << 0;
/// `Action` bit issuing a START.
pub const ACTION_START: u8 = 1 << 1;
/// `Action` bit issuing a STOP.
pub const ACTION_STOP: u8 = 1 << 2;
/// `Action` bit issuing a read answered with ACK.
pub const ACTION_READ_ACK: u8 = 1 << 3;
/// `Action` bit issuing a read answered with NACK.
pub const ACTION_READ_NACK: u8 = 1 << 4;

/// `Status` bit mirroring the engine busy flag.
pub const STATUS_BUSY: u8 = 1 << 0;
/// `Status` bit holding the last acknowledge.
pub const STATUS_ACK: u8 = 1 << 1;

/// Byte-wide register bus as seen by a peripheral.
pub trait CsrBus {
    /// Reads one byte at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OffsetOutOfRange`] when `offset` is outside the
    /// register window.
    fn read8(&mut self, offset: u8) -> Result<u8, BridgeError>;

    /// Writes one byte at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OffsetOutOfRange`] when `offset` is outside the
    /// register window.
    fn write8(&mut self, offset: u8, value: u8) -> Result<(), BridgeError>;

    /// Reads four ascending bytes starting at `offset`, little-endian.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OffsetOutOfRange`] for the first lane outside
    /// the window, before any byte is accessed.
    fn read32(&mut self, offset: u8) -> Result<u32, BridgeError> {
        validate_word(offset)?;
        let mut bytes = [0_u8; 4];
        for (lane, byte) in (0_u8..).zip(bytes.iter_mut()) {
            *byte = self.read8(lane_offset(offset, lane)?)?;
        }
        Ok(u32::from_le_bytes(bytes))
    }

    /// Writes four ascending bytes starting at `offset`, little-endian.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OffsetOutOfRange`] for the first lane outside
    /// the window, in which case no byte is written.
    fn write32(&mut self, offset: u8, value: u32) -> Result<(), BridgeError> {
        validate_word(offset)?;
        for (lane, byte) in (0_u8..).zip(value.to_le_bytes()) {
            self.write8(lane_offset(offset, lane)?, byte)?;
        }
        Ok(())
    }
}

fn lane_offset(offset: u8, lane: u8) -> Result<u8, BridgeError> {
    offset
        .checked_add(lane)
        .ok_or(BridgeError::OffsetOutOfRange { offset })
}

fn validate_word(offset: u8) -> Result<(), BridgeError> {
    (0..4).try_for_each(|lane| lane_offset(offset, lane).and_then(validate_offset).map(drop))
}

/// Validates that `offset` lies inside the register window.
///
/// # Errors
///
/// Returns [`BridgeError::OffsetOutOfRange`] otherwise.
pub const fn validate_offset(offset: u8) -> Result<u8, BridgeError> {
    if offset < CSR_WINDOW_BYTES {
        Ok(offset)
    } else {
        Err(BridgeError::OffsetOutOfRange { offset })
    }
}

/// Access rights of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrAccess {
    /// Readable and writable.
    ReadWrite,
    /// Writes trigger side effects; reads return zero.
    WriteOnly,
    /// Writes are ignored.
    ReadOnly,
}

/// Registers of the I2C register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum I2cRegister {
    /// 12-bit half-period divisor.
    Divider,
    /// Command strobes.
    Action,
    /// Octet to write; writing issues the command.
    SendData,
    /// Last octet read.
    RecvData,
    /// Busy and acknowledge flags.
    Status,
}

/// Placement of one register in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    /// Register identity.
    pub register: I2cRegister,
    /// Offset of the first chunk.
    pub offset: u8,
    /// Number of byte chunks backing the field.
    pub chunks: u8,
    /// Access rights.
    pub access: CsrAccess,
}

impl I2cRegister {
    /// Returns the canonical descriptor for this register.
    #[must_use]
    pub const fn descriptor(self) -> RegisterDescriptor {
        let (offset, chunks, access) = match self {
            Self::Divider => (DIVIDER_OFFSET, 2, CsrAccess::ReadWrite),
            Self::Action => (ACTION_OFFSET, 1, CsrAccess::WriteOnly),
            Self::SendData => (SEND_DATA_OFFSET, 1, CsrAccess::WriteOnly),
            Self::RecvData => (RECV_DATA_OFFSET, 1, CsrAccess::ReadOnly),
            Self::Status => (STATUS_OFFSET, 1, CsrAccess::ReadOnly),
        };
        RegisterDescriptor {
            register: self,
            offset,
            chunks,
            access,
        }
    }
}

/// I2C register layout in ascending offset order.
pub const I2C_REGISTER_MAP: [RegisterDescriptor; 5] = [
    I2cRegister::Divider.descriptor(),
    I2cRegister::Action.descriptor(),
    I2cRegister::SendData.descriptor(),
    I2cRegister::RecvData.descriptor(),
    I2cRegister::Status.descriptor(),
];

const _: () = assert_register_layout();

const fn assert_register_layout() {
    let mut index = 0;
    while index < I2C_REGISTER_MAP.len() {
        let descriptor = I2C_REGISTER_MAP[index];
        assert!(descriptor.chunks > 0, "register must span at least one chunk");
        assert!(
            descriptor.offset % 4 == 0,
            "registers start on 32-bit boundaries"
        );
        assert!(
            descriptor.offset + descriptor.chunks <= CSR_WINDOW_BYTES,
            "register must fit in the window"
        );
        if index > 0 {
            let previous = I2C_REGISTER_MAP[index - 1];
            assert!(
                previous.offset + previous.chunks <= descriptor.offset,
                "registers must not overlap"
            );
        }
        index += 1;
    }
}

/// Decodes an in-window offset into a register and chunk index.
///
/// Offsets inside the window that no register occupies decode to `None`.
#[must_use]
pub const fn decode_register(offset: u8) -> Option<(I2cRegister, u8)> {
    let mut index = 0;
    while index < I2C_REGISTER_MAP.len() {
        let descriptor = I2C_REGISTER_MAP[index];
        if offset >= descriptor.offset && offset < descriptor.offset + descriptor.chunks {
            return Some((descriptor.register, offset - descriptor.offset));
        }
        index += 1;
    }
    None
}
