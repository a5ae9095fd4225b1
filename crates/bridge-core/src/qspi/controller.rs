//! Translator and serializer joined by their ready/valid handshakes, plus the
//! memory-mapped read window that drives a flash device through them.

use log::{debug, trace, warn};

use super::flash_model::FlashDevice;
use super::serializer::{LineSerializer, QspiPins};
use super::translator::CommandTranslator;
use crate::api::{NullTrace, PollBudget, QspiConfig, TraceEvent, TraceSink};
use crate::{BridgeError, Engine};

/// QSPI read engine: command translator feeding the line serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QspiController {
    config: QspiConfig,
    translator: CommandTranslator,
    serializer: LineSerializer,
    ticks: u64,
}

impl Default for QspiController {
    fn default() -> Self {
        Self::new(QspiConfig::default())
    }
}

impl QspiController {
    /// Creates an engine waiting for a request with chip-select released.
    #[must_use]
    pub fn new(config: QspiConfig) -> Self {
        Self {
            config,
            translator: CommandTranslator::new(),
            serializer: LineSerializer::new(config.divisor),
            ticks: 0,
        }
    }

    /// Returns both state machines to reset; the configuration survives.
    pub fn reset(&mut self) {
        debug!("qspi: engine reset in {:?}", self.translator.state());
        *self = Self {
            ticks: self.ticks,
            ..Self::new(self.config)
        };
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> QspiConfig {
        self.config
    }

    /// Reprograms the SCK divisor.
    pub fn set_divisor(&mut self, divisor: u16) {
        self.config.divisor = divisor;
        self.serializer.set_divisor(divisor);
    }

    /// Command translator.
    #[must_use]
    pub const fn translator(&self) -> &CommandTranslator {
        &self.translator
    }

    /// Line serializer.
    #[must_use]
    pub const fn serializer(&self) -> &LineSerializer {
        &self.serializer
    }

    /// Pin outputs after the last tick.
    #[must_use]
    pub const fn pins(&self) -> QspiPins {
        self.serializer.pins()
    }

    /// Bus acknowledge, high for one tick per completed read.
    #[must_use]
    pub const fn ack(&self) -> bool {
        self.translator.ack()
    }

    /// Read data returned with [`Self::ack`].
    #[must_use]
    pub const fn data(&self) -> u32 {
        self.translator.data()
    }

    /// Ticks elapsed since construction.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances one tick. `request` is the word index of a pending bus read,
    /// `pads` the raw io3..io0 levels.
    pub fn tick(&mut self, request: Option<u32>, pads: u8) {
        self.tick_traced(request, pads, &mut NullTrace);
    }

    /// [`Self::tick`] reporting events to `sink`.
    pub fn tick_traced(&mut self, request: Option<u32>, pads: u8, sink: &mut impl TraceSink) {
        let tick = self.ticks;
        self.ticks += 1;

        let accepted = self
            .translator
            .offer(request)
            .filter(|_| self.serializer.outbound_ready());
        let inbound = self
            .serializer
            .inbound()
            .filter(|_| self.translator.inbound_ready());

        let from = self.translator.state();
        self.translator.tick(request, accepted.is_some(), inbound);
        self.serializer.tick(accepted, inbound.is_some(), pads);

        if let Some(directive) = accepted {
            sink.on_event(tick, TraceEvent::QspiDirective { directive });
        }
        if let Some(data) = inbound {
            sink.on_event(tick, TraceEvent::QspiInbound { data });
        }
        let to = self.translator.state();
        if from != to {
            trace!("qspi: {from:?} -> {to:?} at tick {tick}");
            sink.on_event(tick, TraceEvent::QspiTransition { from, to });
        }
        if self.translator.ack() {
            sink.on_event(
                tick,
                TraceEvent::QspiAcknowledge {
                    word: self.translator.data(),
                },
            );
        }
    }
}

/// Read-only memory window backed by a flash device.
#[derive(Debug, Clone)]
pub struct FlashWindow<D> {
    controller: QspiController,
    device: D,
    pads: u8,
}

impl<D: FlashDevice> FlashWindow<D> {
    /// Connects `controller` to `device`.
    pub const fn new(controller: QspiController, device: D) -> Self {
        Self {
            controller,
            device,
            pads: 0x0F,
        }
    }

    /// Read engine.
    #[must_use]
    pub const fn controller(&self) -> &QspiController {
        &self.controller
    }

    /// Mutable read engine.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn controller_mut(&mut self) -> &mut QspiController {
        &mut self.controller
    }

    /// Attached device.
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Mutable attached device.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// io3..io0 levels the engine samples on the next tick.
    #[must_use]
    pub const fn pads(&self) -> u8 {
        self.pads
    }

    /// Advances engine and device by one tick and returns the bus acknowledge.
    pub fn tick(&mut self, request: Option<u32>) -> bool {
        self.tick_traced(request, &mut NullTrace)
    }

    /// [`Self::tick`] reporting engine events to `sink`.
    pub fn tick_traced(&mut self, request: Option<u32>, sink: &mut impl TraceSink) -> bool {
        self.controller.tick_traced(request, self.pads, sink);
        let pins = self.controller.pins();
        let device_out = self.device.step(pins);
        self.pads = pins.resolve(device_out);
        self.controller.ack()
    }

    /// Holds a read of word index `word` until it is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when `budget` runs out first.
    pub fn read_word(&mut self, word: u32, budget: PollBudget) -> Result<u32, BridgeError> {
        self.read_word_traced(word, budget, &mut NullTrace)
    }

    /// [`Self::read_word`] reporting engine events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Timeout`] when `budget` runs out first.
    pub fn read_word_traced(
        &mut self,
        word: u32,
        budget: PollBudget,
        sink: &mut impl TraceSink,
    ) -> Result<u32, BridgeError> {
        let mut elapsed = 0;
        loop {
            let ack = self.tick_traced(Some(word), sink);
            elapsed += 1;
            if ack {
                debug!("qspi: word {word:#08x} read in {elapsed} ticks");
                return Ok(self.controller.data());
            }
            if !budget.allows(elapsed) {
                warn!(
                    "qspi: word {word:#08x} still pending in {:?} after {elapsed} ticks",
                    self.controller.translator().state()
                );
                return Err(BridgeError::Timeout {
                    engine: Engine::Qspi,
                    ticks: elapsed,
                });
            }
        }
    }

    /// Writes are not supported by the window.
    ///
    /// # Errors
    ///
    /// Always returns [`BridgeError::ReadOnlyWindow`].
    pub fn write_word(&mut self, word: u32, _value: u32) -> Result<(), BridgeError> {
        debug!("qspi: rejected write to word {word:#08x}");
        Err(BridgeError::ReadOnlyWindow { addr: word })
    }
}
