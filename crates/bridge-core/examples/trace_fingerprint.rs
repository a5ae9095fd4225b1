//! Deterministic trace fingerprint used for cross-host comparison of both
//! engines.
//!
//! ```sh
//! cargo run -p bridge-core --example trace_fingerprint
//! ```

use bridge_core::{
    CsrBus, FlashModel, FlashWindow, I2cLink, I2cPeripheral, PollBudget, PullUpOnly, QspiConfig,
    QspiController, TraceRecord, ACTION_OFFSET, ACTION_READ_NACK, ACTION_START, ACTION_STOP,
    SEND_DATA_OFFSET,
};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn hash_records(hash: &mut u64, records: &[TraceRecord]) {
    for record in records {
        hash_bytes(hash, &record.tick.to_le_bytes());
        hash_bytes(hash, format!("{:?}", record.event).as_bytes());
    }
}

fn i2c_trace() -> Vec<TraceRecord> {
    let mut link = I2cLink::new(I2cPeripheral::default(), PullUpOnly);
    let mut records = Vec::new();
    let strobes = [
        (ACTION_OFFSET, ACTION_START),
        (SEND_DATA_OFFSET, 0xA1),
        (ACTION_OFFSET, ACTION_READ_NACK),
        (ACTION_OFFSET, ACTION_STOP),
    ];
    for (offset, value) in strobes {
        link.settle(6);
        link.peripheral_mut()
            .write8(offset, value)
            .expect("register offsets are in the window");
        loop {
            link.tick_traced(&mut records);
            if !link.peripheral().engine().busy() {
                break;
            }
        }
    }
    records
}

fn qspi_trace() -> Vec<TraceRecord> {
    let image: Vec<u8> = (0_u8..=255).collect();
    let mut window = FlashWindow::new(
        QspiController::new(QspiConfig { divisor: 1 }),
        FlashModel::with_image(&image),
    );
    let mut records = Vec::new();
    for word in [0, 1, 0x3F, 0x40] {
        window
            .read_word_traced(word, PollBudget::UNBOUNDED, &mut records)
            .expect("unbounded reads complete");
    }
    records
}

fn fingerprint() -> String {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_records(&mut hash, &i2c_trace());
    hash_records(&mut hash, &qspi_trace());
    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
