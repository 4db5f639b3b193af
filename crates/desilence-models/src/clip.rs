//! Clip results and the per-segment lifecycle.
//!
//! # State Machine
//!
//! ```text
//! Planned ──► Encoding ──► Encoded ──► Validating ──┬──► Valid
//!                │                                  └──► Rejected
//!                └──► Failed (fatal for the whole run)
//! ```
//!
//! Only `Valid` clips reach the manifest. `Rejected` and `Failed` are
//! terminal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobIndex;

/// Lifecycle of a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentState {
    #[default]
    Planned,
    Encoding,
    Encoded,
    Validating,
    Valid,
    Rejected,
    Failed,
}

/// Attempted a transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid segment transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SegmentState,
    pub to: SegmentState,
}

impl SegmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentState::Planned => "planned",
            SegmentState::Encoding => "encoding",
            SegmentState::Encoded => "encoded",
            SegmentState::Validating => "validating",
            SegmentState::Valid => "valid",
            SegmentState::Rejected => "rejected",
            SegmentState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SegmentState::Valid | SegmentState::Rejected | SegmentState::Failed
        )
    }

    pub fn can_transition_to(&self, next: SegmentState) -> bool {
        use SegmentState::*;
        matches!(
            (self, next),
            (Planned, Encoding)
                | (Encoding, Encoded)
                | (Encoding, Failed)
                | (Encoded, Validating)
                | (Validating, Valid)
                | (Validating, Rejected)
        )
    }

    /// Move to `next`, refusing transitions outside the lifecycle.
    pub fn advance(self, next: SegmentState) -> Result<SegmentState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for SegmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a clip was left out of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The probe could not read the clip.
    Corrupt { detail: String },
    /// One entry per stream without a usable frame count.
    EmptyStreams { streams: Vec<String> },
}

impl RejectReason {
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt {
            detail: detail.into(),
        }
    }

    /// One human readable line per offending stream.
    pub fn messages(&self) -> Vec<String> {
        match self {
            RejectReason::Corrupt { .. } => vec!["corrupt".to_string()],
            RejectReason::EmptyStreams { streams } => streams
                .iter()
                .map(|s| format!("empty stream: {}", s))
                .collect(),
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

/// Outcome of validating a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipValidity {
    #[default]
    Pending,
    Valid,
    Rejected(RejectReason),
}

/// A clip produced by the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipResult {
    pub index: JobIndex,
    pub path: PathBuf,
    pub validity: ClipValidity,
}

impl ClipResult {
    /// Freshly encoded clip awaiting validation.
    pub fn pending(index: JobIndex, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            path: path.into(),
            validity: ClipValidity::Pending,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity == ClipValidity::Valid
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match &self.validity {
            ClipValidity::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}
