//! Timeline intervals produced by silence detection.

use serde::{Deserialize, Serialize};

/// Whether an interval carries sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Audible,
    Inaudible,
}

impl IntervalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalKind::Audible => "audible",
            IntervalKind::Inaudible => "inaudible",
        }
    }
}

impl std::fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A half-open time range `[start, end)` in seconds.
///
/// `end == None` means the interval runs to the end of the input; only the
/// final interval of a timeline may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub kind: IntervalKind,
    pub start: f64,
    pub end: Option<f64>,
}

impl Interval {
    pub fn audible(start: f64, end: f64) -> Self {
        Self {
            kind: IntervalKind::Audible,
            start,
            end: Some(end),
        }
    }

    pub fn inaudible(start: f64, end: f64) -> Self {
        Self {
            kind: IntervalKind::Inaudible,
            start,
            end: Some(end),
        }
    }

    /// Audible interval running to the end of the input.
    pub fn audible_open(start: f64) -> Self {
        Self {
            kind: IntervalKind::Audible,
            start,
            end: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn is_audible(&self) -> bool {
        self.kind == IntervalKind::Audible
    }

    /// Length in seconds, or `None` for an open interval.
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} [{:.3}s, {:.3}s)", self.kind, self.start, end),
            None => write!(f, "{} [{:.3}s, end)", self.kind, self.start),
        }
    }
}

/// Parsed result of a silence-detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Contiguous intervals in chronological order, starting at 0.
    pub intervals: Vec<Interval>,
    /// Sum of the silence durations reported by the detector, in seconds.
    pub total_silence: f64,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Sum of the bounded inaudible interval lengths.
    pub fn inaudible_duration(&self) -> f64 {
        self.intervals
            .iter()
            .filter(|i| !i.is_audible())
            .filter_map(Interval::duration)
            .sum()
    }
}
