//! Change detection between consecutive observations.

use coinwatch_core::PriceSnapshot;

/// Direction of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A change worth telling the user about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    /// No earlier price for this user and symbol. Always reported, no delta.
    FirstSighting,
    /// Moved by at least the threshold since the previous observation.
    Moved { percent: f64, direction: Direction },
}

/// A detected change together with the snapshot that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub snapshot: PriceSnapshot,
    pub change: Change,
}

/// Absolute percent change from `old` to `new`.
///
/// A zero `old` counts as a 100% move.
pub fn percent_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 100.0;
    }
    ((new - old) / old).abs() * 100.0
}

/// Decide whether `current` is worth a notification given the previous price.
///
/// The comparison is against the immediately preceding observation only, so
/// slow drift below the threshold is never reported.
pub fn detect(previous: Option<f64>, current: f64, threshold_pct: f64) -> Option<Change> {
    let Some(old) = previous else {
        return Some(Change::FirstSighting);
    };

    let percent = percent_change(old, current);
    if percent < threshold_pct {
        return None;
    }

    let direction = if current > old {
        Direction::Up
    } else {
        Direction::Down
    };
    Some(Change::Moved { percent, direction })
}
