#![no_main]

use bridge_core::{
    validate_offset, CsrBus, FlashModel, FlashWindow, I2cLink, I2cPads, I2cPeripheral,
    PollBudget, PullUpOnly, QspiConfig, QspiController, ACTION_OFFSET,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let mut link = I2cLink::new(I2cPeripheral::default(), PullUpOnly);
    for chunk in data.chunks_exact(3) {
        let (offset, value, ticks) = (chunk[0], chunk[1], chunk[2]);
        let _ = validate_offset(offset);
        if value & 1 == 0 {
            let _ = link.peripheral_mut().write8(offset, value);
        } else {
            let _ = link.peripheral_mut().read8(offset);
        }
        link.settle(u64::from(ticks));
    }

    let mut peripheral = I2cPeripheral::default();
    for (index, &byte) in data.iter().enumerate() {
        if index % 16 == 0 {
            let _ = peripheral.write8(ACTION_OFFSET, byte);
        }
        for bit in (0..8).step_by(2) {
            let pads = I2cPads {
                scl: byte & (1 << bit) != 0,
                sda: byte & (2 << bit) != 0,
            };
            peripheral.tick(pads);
        }
    }

    let divisor = u16::from(data[0] & 0x07);
    let mut window = FlashWindow::new(
        QspiController::new(QspiConfig { divisor }),
        FlashModel::with_image(&data[1..]),
    );
    let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let _ = window.read_word(word, PollBudget::bounded(4_096));
    let _ = window.write_word(word, 0);
});
