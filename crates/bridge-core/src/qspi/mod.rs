//! Memory-mapped flash read path: command translator, line serializer and
//! the flash device model they talk to.

pub mod controller;
pub mod flash_model;
pub mod mode;
pub mod serializer;
pub mod translator;

pub use controller::{FlashWindow, QspiController};
pub use flash_model::{FlashDevice, FlashModel, FLASH_ID, NO_OP_OPCODES, READ_ID_OPCODE};
pub use mode::{FlashCommand, LineDirective, LineWidth, QspiMode};
pub use serializer::{LineSerializer, QspiPins, SerializerPhase};
pub use translator::{
    flash_address, CommandTranslator, TranslatorState, ADDRESS_OCTETS, FLASH_ADDRESS_MASK,
    WORD_OCTETS,
};
