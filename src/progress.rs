// Progress percentage and status text for the replay position.
// Rule: never show 100% before the last event has been replayed.

use serde::{Deserialize, Serialize};

/// Percentage of `count` events replayed once the event at `position` is shown.
/// Rounds half up, reports 100 only for the last event and clamps earlier 100s to 99.
pub fn percent(position: usize, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    if position + 1 >= count {
        return 100;
    }
    let (position, count) = (position as u128, count as u128);
    let raw = (200 * position + count) / (2 * count);
    raw.min(99) as u8
}

/// `percent` formatted for display, e.g. "42%".
pub fn percent_text(position: usize, count: usize) -> String {
    format!("{}%", percent(position, count))
}

/// One progress update for the status text and the progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub percent: u8,
    /// Display label of the event at the current position.
    pub label: String,
}

impl Progress {
    pub fn percent_text(&self) -> String {
        format!("{}%", self.percent)
    }

    /// Status line, e.g. "2023-07-26 10:00:01 42%".
    pub fn status_text(&self) -> String {
        format!("{} {}", self.label, self.percent_text())
    }

    /// CSS width for the progress bar.
    pub fn width(&self) -> String {
        self.percent_text()
    }
}

/// Tracks the displayed percentage within one playback cycle so it never regresses.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    shown: Option<u8>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        ProgressReporter::default()
    }

    pub fn report(&mut self, position: usize, count: usize, label: &str) -> Progress {
        let percent = percent(position, count).max(self.shown.unwrap_or(0));
        self.shown = Some(percent);
        Progress {
            percent,
            label: label.to_string(),
        }
    }

    /// Last percentage shown in this cycle, if any.
    pub fn shown(&self) -> Option<u8> {
        self.shown
    }

    pub fn reset(&mut self) {
        self.shown = None;
    }
}
