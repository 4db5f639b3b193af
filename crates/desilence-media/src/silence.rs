//! Parsing of ffmpeg `silencedetect` diagnostics into a timeline.
//!
//! The filter writes lines such as
//!
//! ```text
//! [silencedetect @ 0x55d0c8a0f440] silence_start: 2.000000
//! [silencedetect @ 0x55d0c8a0f440] silence_end: 3.000000 | silence_duration: 1.000000
//! ```
//!
//! to stderr. Silence markers are inverted into alternating audible and
//! inaudible intervals covering the whole input:
//!
//! ```text
//!   0s          start        end                EOF
//!   ├─ Audible ──┼─ Inaudible ─┼─ Audible (open) ──►
//! ```
//!
//! Untagged lines are ignored. A tagged line matching neither marker is an
//! error: the output format of the filter is not stable across ffmpeg
//! versions and guessing would silently drop content.

use std::sync::LazyLock;

use desilence_models::{Interval, Timeline};
use regex::Regex;
use thiserror::Error;

static TAGGED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[silencedetect[^\]]+\] (.+)$").expect("valid regex"));

static START_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^silence_start: ([-+0-9.eE]+)$").expect("valid regex"));

static END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^silence_end: ([-+0-9.eE]+) \| silence_duration: ([-+0-9.eE]+)$")
        .expect("valid regex")
});

/// A single marker emitted by the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SilenceEvent {
    Start { at: f64 },
    End { at: f64, duration: f64 },
}

/// A tagged diagnostic line that does not follow either marker grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized silencedetect output on line {line_number}: {line}")]
pub struct SilenceParseError {
    /// 1-based line number in the diagnostic text
    pub line_number: usize,
    pub line: String,
}

/// Parse one line. Returns `Ok(None)` for lines not produced by the filter.
pub fn parse_silence_line(line: &str) -> Result<Option<SilenceEvent>, String> {
    let Some(caps) = TAGGED_LINE.captures(line.trim_end()) else {
        return Ok(None);
    };
    let payload = &caps[1];

    if let Some(caps) = START_MARKER.captures(payload) {
        let at = parse_seconds(&caps[1])?;
        return Ok(Some(SilenceEvent::Start { at }));
    }

    if let Some(caps) = END_MARKER.captures(payload) {
        let at = parse_seconds(&caps[1])?;
        let duration = parse_seconds(&caps[2])?;
        return Ok(Some(SilenceEvent::End { at, duration }));
    }

    Err(payload.to_string())
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| value.to_string())
}

/// Parse the complete diagnostic stream of a detection pass.
///
/// Intervals are contiguous and start at 0. When the input ends inside an
/// audible section (the last marker closed a silence, or there were no
/// markers at all) a final open-ended audible interval is appended. An
/// unmatched `silence_start` means the input ends in silence, so no open
/// interval follows it.
///
/// ffmpeg ends progress updates with a bare `\r`, so a marker can follow one
/// on the same `\n`-terminated line; both characters separate records.
/// Line numbers in errors count `\n`-terminated lines.
pub fn parse_silencedetect(text: &str) -> Result<Timeline, SilenceParseError> {
    let mut intervals = Vec::new();
    let mut total_silence = 0.0;
    let mut last_start = 0.0;
    let mut last_end = 0.0;
    let mut in_silence = false;

    let records = text.split('\n').enumerate().flat_map(|(i, line)| {
        line.split('\r')
            .filter(|record| !record.is_empty())
            .map(move |record| (i + 1, record))
    });

    for (line_number, record) in records {
        let event = parse_silence_line(record).map_err(|_| SilenceParseError {
            line_number,
            line: record.to_string(),
        })?;

        match event {
            Some(SilenceEvent::Start { at }) => {
                intervals.push(Interval::audible(last_end, at));
                last_start = at;
                in_silence = true;
            }
            Some(SilenceEvent::End { at, duration }) => {
                intervals.push(Interval::inaudible(last_start, at));
                total_silence += duration;
                last_end = at;
                in_silence = false;
            }
            None => {}
        }
    }

    if !in_silence {
        intervals.push(Interval::audible_open(last_end));
    }

    Ok(Timeline {
        intervals,
        total_silence,
    })
}
