//! Animated time cursor over the distinct years or months of the table.
//!
//! The cursor is a small state machine. [`CursorState::next`] is a pure
//! function of the previous state, the triggering event and the axis, so a
//! replayed event sequence always lands on the same frame.

use serde::{Deserialize, Serialize};
use wqe_store::SampleStore;
use wqe_utils::dates;

/// Label shown when the axis for the current mode is empty.
pub const NO_DATA_LABEL: &str = "No Data";

/// Default delay between automatic advances.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Year,
    Month,
}

/// A concrete time value under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeValue {
    Year(i32),
    Month(u32),
}

impl TimeValue {
    pub fn label(&self) -> String {
        match self {
            TimeValue::Year(y) => y.to_string(),
            TimeValue::Month(m) => dates::month_abbr(*m).to_string(),
        }
    }
}

/// Distinct sorted years and months of the full, unfiltered table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeAxis {
    years: Vec<i32>,
    months: Vec<u32>,
}

impl TimeAxis {
    pub fn new(mut years: Vec<i32>, mut months: Vec<u32>) -> Self {
        years.sort_unstable();
        years.dedup();
        months.sort_unstable();
        months.dedup();
        Self { years, months }
    }

    pub fn from_store(store: &SampleStore) -> Self {
        Self::new(store.years().to_vec(), store.months().to_vec())
    }

    pub fn len(&self, mode: PlaybackMode) -> usize {
        match mode {
            PlaybackMode::Year => self.years.len(),
            PlaybackMode::Month => self.months.len(),
        }
    }

    pub fn is_empty(&self, mode: PlaybackMode) -> bool {
        self.len(mode) == 0
    }

    /// Upper cursor bound; 0 for an empty axis.
    pub fn max_index(&self, mode: PlaybackMode) -> usize {
        self.len(mode).saturating_sub(1)
    }

    pub fn value(&self, mode: PlaybackMode, index: usize) -> Option<TimeValue> {
        match mode {
            PlaybackMode::Year => self.years.get(index).copied().map(TimeValue::Year),
            PlaybackMode::Month => self.months.get(index).copied().map(TimeValue::Month),
        }
    }

    pub fn label(&self, mode: PlaybackMode, index: usize) -> String {
        self.value(mode, index)
            .map(|v| v.label())
            .unwrap_or_else(|| NO_DATA_LABEL.to_string())
    }

    /// Slider marks: every position with its label.
    pub fn marks(&self, mode: PlaybackMode) -> Vec<(usize, String)> {
        if self.is_empty(mode) {
            return vec![(0, NO_DATA_LABEL.to_string())];
        }
        (0..self.len(mode)).map(|i| (i, self.label(mode, i))).collect()
    }
}

/// Something that moves the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    SwitchMode(PlaybackMode),
    TogglePlay,
    Tick,
    Scrub(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CursorState {
    pub mode: PlaybackMode,
    pub index: usize,
    pub max_index: usize,
    pub playing: bool,
}

impl CursorState {
    pub fn initial(mode: PlaybackMode, axis: &TimeAxis) -> Self {
        Self {
            mode,
            index: 0,
            max_index: axis.max_index(mode),
            playing: false,
        }
    }

    pub fn next(self, event: PlaybackEvent, axis: &TimeAxis) -> Self {
        match event {
            PlaybackEvent::SwitchMode(mode) => Self {
                mode,
                index: 0,
                max_index: axis.max_index(mode),
                ..self
            },
            PlaybackEvent::TogglePlay => Self {
                playing: !self.playing,
                ..self
            },
            PlaybackEvent::Tick if self.playing => {
                let index = if self.index + 1 > self.max_index { 0 } else { self.index + 1 };
                Self { index, ..self }
            }
            PlaybackEvent::Tick => self,
            PlaybackEvent::Scrub(index) => Self {
                index: index.min(self.max_index),
                ..self
            },
        }
    }
}

/// Cursor plus the axis it moves over.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    axis: TimeAxis,
    state: CursorState,
}

impl PlaybackController {
    pub fn new(axis: TimeAxis, mode: PlaybackMode) -> Self {
        let state = CursorState::initial(mode, &axis);
        Self { axis, state }
    }

    pub fn for_store(store: &SampleStore, mode: PlaybackMode) -> Self {
        Self::new(TimeAxis::from_store(store), mode)
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn apply(&mut self, event: PlaybackEvent) -> CursorState {
        self.state = self.state.next(event, &self.axis);
        log::debug!("[WQE] playback: {:?} -> {:?}", event, self.state);
        self.state
    }

    /// Time value under the cursor, `None` when the axis is empty.
    pub fn current(&self) -> Option<TimeValue> {
        self.axis.value(self.state.mode, self.state.index)
    }

    pub fn label(&self) -> String {
        self.axis.label(self.state.mode, self.state.index)
    }

    pub fn marks(&self) -> Vec<(usize, String)> {
        self.axis.marks(self.state.mode)
    }
}
