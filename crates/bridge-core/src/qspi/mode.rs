//! Line modes, typed line directives and flash opcodes.

/// Number of data wires taking part in one SCK cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LineWidth {
    /// io0 out, io1 in.
    X1,
    /// io1:io0.
    X2,
    /// io3..io0.
    X4,
}

impl LineWidth {
    /// Bits moved per SCK cycle.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// Output-enable mask of the wires a put drives.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::X1 => 0b0001,
            Self::X2 => 0b0011,
            Self::X4 => 0b1111,
        }
    }

    /// SCK cycles needed for one octet.
    #[must_use]
    pub const fn cycles_per_octet(self) -> u8 {
        8 / self.bits()
    }

    /// Bits of `pads` carrying inbound data, right aligned.
    #[must_use]
    pub const fn sample(self, pads: u8) -> u8 {
        match self {
            Self::X1 => (pads >> 1) & 1,
            Self::X2 | Self::X4 => pads & self.mask(),
        }
    }
}

/// Electrical mode of one outbound directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum QspiMode {
    PutX1,
    PutX2,
    PutX4,
    GetX1,
    GetX2,
    GetX4,
    /// No SCK edges and no data wires driven.
    #[default]
    Dummy,
}

impl QspiMode {
    /// Line width of a put or get, `None` for `Dummy`.
    #[must_use]
    pub const fn width(self) -> Option<LineWidth> {
        match self {
            Self::PutX1 | Self::GetX1 => Some(LineWidth::X1),
            Self::PutX2 | Self::GetX2 => Some(LineWidth::X2),
            Self::PutX4 | Self::GetX4 => Some(LineWidth::X4),
            Self::Dummy => None,
        }
    }

    /// Returns `true` for modes that shift data in from the flash.
    #[must_use]
    pub const fn is_get(self) -> bool {
        matches!(self, Self::GetX1 | Self::GetX2 | Self::GetX4)
    }
}

/// Octet handed to the line serializer together with its line mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LineDirective {
    /// Chip-select level to apply, `true` meaning selected.
    pub chip: bool,
    /// How the octet moves over the wires.
    pub mode: QspiMode,
    /// Outbound payload; ignored by gets and dummies.
    pub data: u8,
}

impl LineDirective {
    /// Selected single-wire put of `data`.
    #[must_use]
    pub const fn put_x1(data: u8) -> Self {
        Self {
            chip: true,
            mode: QspiMode::PutX1,
            data,
        }
    }

    /// Selected single-wire get.
    #[must_use]
    pub const fn get_x1() -> Self {
        Self {
            chip: true,
            mode: QspiMode::GetX1,
            data: 0,
        }
    }

    /// Placeholder cycle with chip-select held.
    #[must_use]
    pub const fn dummy() -> Self {
        Self {
            chip: true,
            mode: QspiMode::Dummy,
            data: 0,
        }
    }

    /// Chip-select released for one cycle.
    #[must_use]
    pub const fn deselect() -> Self {
        Self {
            chip: false,
            mode: QspiMode::Dummy,
            data: 0,
        }
    }
}

/// Read opcodes understood by serial NOR flash.
///
/// Only [`FlashCommand::Read`] is issued by the translator; the multi-wire
/// variants are listed for the line layout they imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FlashCommand {
    /// Single-wire read without dummy cycles.
    Read = 0x03,
    /// Single-wire read with dummy cycles.
    FastRead = 0x0B,
    /// Dual-output fast read.
    FastReadDualOut = 0x3B,
    /// Quad-output fast read.
    FastReadQuadOut = 0x6B,
    /// Dual input/output fast read.
    FastReadDualInOut = 0xBB,
    /// Quad input/output fast read.
    FastReadQuadInOut = 0xEB,
}

impl FlashCommand {
    /// Wire value of the opcode.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Maps a wire value back to a read opcode.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0x03 => Some(Self::Read),
            0x0B => Some(Self::FastRead),
            0x3B => Some(Self::FastReadDualOut),
            0x6B => Some(Self::FastReadQuadOut),
            0xBB => Some(Self::FastReadDualInOut),
            0xEB => Some(Self::FastReadQuadInOut),
            _ => None,
        }
    }

    /// Width used for the address phase.
    #[must_use]
    pub const fn address_width(self) -> LineWidth {
        match self {
            Self::Read | Self::FastRead | Self::FastReadDualOut | Self::FastReadQuadOut => {
                LineWidth::X1
            }
            Self::FastReadDualInOut => LineWidth::X2,
            Self::FastReadQuadInOut => LineWidth::X4,
        }
    }

    /// Width used for the data phase.
    #[must_use]
    pub const fn data_width(self) -> LineWidth {
        match self {
            Self::Read | Self::FastRead => LineWidth::X1,
            Self::FastReadDualOut | Self::FastReadDualInOut => LineWidth::X2,
            Self::FastReadQuadOut | Self::FastReadQuadInOut => LineWidth::X4,
        }
    }
}
