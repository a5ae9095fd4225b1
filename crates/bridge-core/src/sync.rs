//! Bit-line synchronizer shared by both protocol engines.
//!
//! Raw pad levels are registered through a two-flop chain before any state
//! machine looks at them. The engine always observes the value that entered the
//! chain two ticks earlier, never the level presented in the current tick.

/// Number of register stages between a raw pad and its synchronized output.
pub const SYNC_STAGES: usize = 2;

/// Two-stage register chain for one or more asynchronous input lines.
///
/// `T` is `bool` for a single wire or a bitmask for a bundle of wires. Every
/// stage starts at the reset value, so lines read idle-high after reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Synchronizer<T> {
    stages: [T; SYNC_STAGES],
    reset: T,
}

impl<T: Copy> Synchronizer<T> {
    /// Creates a synchronizer whose stages hold `reset`.
    pub fn new(reset: T) -> Self {
        Self {
            stages: [reset; SYNC_STAGES],
            reset,
        }
    }

    /// Stable output visible to the state machine in the current tick.
    #[must_use]
    pub fn output(&self) -> T {
        self.stages[SYNC_STAGES - 1]
    }

    /// Advances the chain by one tick.
    ///
    /// Returns the output that was visible during this tick, i.e. before `raw`
    /// entered the chain.
    pub fn clock(&mut self, raw: T) -> T {
        let visible = self.output();
        self.stages[1] = self.stages[0];
        self.stages[0] = raw;
        visible
    }

    /// Returns every stage to the reset value.
    pub fn reset(&mut self) {
        self.stages = [self.reset; SYNC_STAGES];
    }
}

/// Level and edge information reconstructed for one synchronized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineEvents {
    /// Synchronized level in this tick.
    pub level: bool,
    /// Line went from low to high since the previous tick.
    pub rising: bool,
    /// Line went from high to low since the previous tick.
    pub falling: bool,
}

/// Registers the previous synchronized level of a line to derive edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EdgeDetector {
    previous: bool,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self { previous: true }
    }
}

impl EdgeDetector {
    /// Level registered in the previous tick.
    #[must_use]
    pub const fn previous(&self) -> bool {
        self.previous
    }

    /// Compares `level` against the registered value and stores it.
    pub fn update(&mut self, level: bool) -> LineEvents {
        let events = LineEvents {
            level,
            rising: !self.previous && level,
            falling: self.previous && !level,
        };
        self.previous = level;
        events
    }
}
