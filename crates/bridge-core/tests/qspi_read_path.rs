//! Memory-mapped flash reads end to end: directive streams, latencies and the
//! ready/valid contract between translator and serializer.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]

use bridge_core::qspi::{flash_address, WORD_OCTETS};
use bridge_core::{
    CommandTranslator, FlashModel, FlashWindow, LineDirective, PollBudget, QspiConfig,
    QspiController, QspiMode, TraceEvent, TraceRecord, TranslatorState,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const IMAGE: [u8; 12] = [4, 3, 2, 1, 0x0D, 0x0C, 0x0B, 0x0A, 0, 0, 0, 0];

fn window(divisor: u16, image: &[u8]) -> FlashWindow<FlashModel> {
    FlashWindow::new(
        QspiController::new(QspiConfig { divisor }),
        FlashModel::with_image(image),
    )
}

fn directives(records: &[TraceRecord]) -> Vec<LineDirective> {
    records
        .iter()
        .filter_map(|record| match record.event {
            TraceEvent::QspiDirective { directive } => Some(directive),
            _ => None,
        })
        .collect()
}

#[rstest]
#[case(0, [145, 146, 146])]
#[case(1, [269, 270, 270])]
#[case(3, [520, 522, 522])]
fn back_to_back_reads_complete_in_fixed_ticks(#[case] divisor: u16, #[case] ticks: [u64; 3]) {
    let mut window = window(divisor, &IMAGE);
    let expected = [0x0102_0304, 0x0A0B_0C0D, 0];
    let mut last = 0;
    for (word, (value, latency)) in (0_u32..).zip(expected.into_iter().zip(ticks)) {
        assert_eq!(window.read_word(word, PollBudget::UNBOUNDED), Ok(value));
        let now = window.controller().ticks();
        assert_eq!(now - last, latency, "word {word}");
        last = now;
    }
}

#[test]
fn word_index_is_scaled_to_a_byte_address() {
    let mut window = window(0, &IMAGE);
    let mut records = Vec::new();
    let word = 0x0001_2345;
    let value = window
        .read_word_traced(word, PollBudget::UNBOUNDED, &mut records)
        .expect("read completes");

    let expected = vec![
        LineDirective::put_x1(0x03),
        LineDirective::put_x1(0x04),
        LineDirective::put_x1(0x8D),
        LineDirective::put_x1(0x14),
        LineDirective::dummy(),
        LineDirective::get_x1(),
        LineDirective::get_x1(),
        LineDirective::get_x1(),
        LineDirective::get_x1(),
    ];
    assert_eq!(directives(&records), expected);
    assert_eq!(flash_address(word) % 12, 0);
    assert_eq!(value, 0x0102_0304);
}

#[test]
fn chip_select_drops_for_one_tick_between_reads() {
    let mut window = window(0, &IMAGE);
    let mut cs = Vec::new();
    for word in 0..3 {
        loop {
            let ack = window.tick(Some(word));
            cs.push(window.controller().pins().cs);
            if ack {
                break;
            }
        }
    }
    assert!(cs[0]);
    let gaps: Vec<usize> = cs
        .split(|&selected| selected)
        .map(<[bool]>::len)
        .filter(|&len| len > 0)
        .collect();
    assert_eq!(gaps, vec![1, 1]);
    assert_eq!(cs.iter().position(|&selected| !selected), Some(145));
}

#[test]
fn reads_past_the_image_wrap_around() {
    let image: Vec<u8> = (0..64).collect();
    let mut window = window(2, &image);
    assert_eq!(
        window.read_word(3, PollBudget::UNBOUNDED),
        Ok(0x0F0E_0D0C)
    );
    assert_eq!(
        window.read_word(15, PollBudget::UNBOUNDED),
        Ok(0x3F3E_3D3C)
    );
    assert_eq!(
        window.read_word(16, PollBudget::UNBOUNDED),
        Ok(0x0302_0100)
    );
}

#[test]
fn acknowledge_is_a_single_tick_pulse() {
    let mut window = window(0, &IMAGE);
    let acks: Vec<bool> = (0..400).map(|_| window.tick(Some(1))).collect();
    let pulses: Vec<usize> = acks
        .iter()
        .enumerate()
        .filter_map(|(tick, &ack)| ack.then_some(tick))
        .collect();
    assert_eq!(pulses[0], 144);
    assert!(pulses.windows(2).all(|pair| pair[1] - pair[0] == 146));
    assert_eq!(window.controller().data(), 0x0A0B_0C0D);
}

#[test]
fn translator_trace_walks_states_in_order() {
    let mut window = window(1, &IMAGE);
    let mut records = Vec::new();
    window
        .read_word_traced(2, PollBudget::UNBOUNDED, &mut records)
        .expect("read completes");
    let states: Vec<TranslatorState> = records
        .iter()
        .filter_map(|record| match record.event {
            TraceEvent::QspiTransition { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            TranslatorState::Address,
            TranslatorState::Dummy,
            TranslatorState::DataRead,
            TranslatorState::Deselect,
        ]
    );
    let inbound = records
        .iter()
        .filter(|record| matches!(record.event, TraceEvent::QspiInbound { .. }))
        .count();
    assert_eq!(inbound, usize::from(WORD_OCTETS));
}

#[test]
fn reconfigured_divisor_applies_to_the_next_read() {
    let mut window = window(0, &IMAGE);
    window.read_word(0, PollBudget::UNBOUNDED).expect("first read");
    window.controller_mut().set_divisor(1);
    let before = window.controller().ticks();
    assert_eq!(window.read_word(1, PollBudget::UNBOUNDED), Ok(0x0A0B_0C0D));
    assert_eq!(window.controller().ticks() - before, 270);
}

proptest! {
    #[test]
    fn translator_tolerates_skewed_handshakes(
        word in 0_u32..0x0100_0000,
        bytes in prop::array::uniform4(any::<u8>()),
        ready in prop::collection::vec(any::<bool>(), 1..24),
        valid in prop::collection::vec(any::<bool>(), 1..24),
    ) {
        let mut translator = CommandTranslator::new();
        let request = Some(word);
        let mut accepted = Vec::new();
        let mut in_flight = std::collections::VecDeque::new();
        let mut source = bytes.into_iter();
        let mut acks = 0;

        for tick in 0..2_000 {
            let ready_now = ready[tick % ready.len()] || tick % ready.len() == 0;
            let valid_now = valid[tick % valid.len()] || tick % valid.len() == 0;

            let fired = translator.offer(request).filter(|_| ready_now);
            let inbound = if translator.inbound_ready() && valid_now {
                in_flight.pop_front()
            } else {
                None
            };
            if let Some(directive) = fired {
                if directive.mode == QspiMode::GetX1 {
                    in_flight.extend(source.next());
                }
                accepted.push(directive);
            }
            translator.tick(request, fired.is_some(), inbound);
            if translator.ack() {
                acks += 1;
                break;
            }
        }

        prop_assert_eq!(acks, 1);
        prop_assert_eq!(translator.data(), u32::from_le_bytes(bytes));
        prop_assert_eq!(translator.state(), TranslatorState::Deselect);
        let address = flash_address(word).to_be_bytes();
        let mut expected = vec![
            LineDirective::put_x1(CommandTranslator::COMMAND.opcode()),
            LineDirective::put_x1(address[1]),
            LineDirective::put_x1(address[2]),
            LineDirective::put_x1(address[3]),
            LineDirective::dummy(),
        ];
        expected.extend([LineDirective::get_x1(); 4]);
        prop_assert_eq!(accepted, expected);
    }
}
