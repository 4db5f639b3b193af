//! Ordered list of clips handed to the final concatenation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::clip::ClipResult;
use crate::job::JobIndex;

/// Valid clip paths in timeline order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: Vec<(JobIndex, PathBuf)>,
}

impl Manifest {
    /// Build from clips in any completion order.
    ///
    /// Keeps only `Valid` clips and sorts them by job index.
    pub fn from_clips<'a, I>(clips: I) -> Self
    where
        I: IntoIterator<Item = &'a ClipResult>,
    {
        let mut entries: Vec<(JobIndex, PathBuf)> = clips
            .into_iter()
            .filter(|clip| clip.is_valid())
            .map(|clip| (clip.index, clip.path.clone()))
            .collect();
        entries.sort_by_key(|(index, _)| *index);

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = JobIndex> + '_ {
        self.entries.iter().map(|(index, _)| *index)
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.entries.iter().map(|(_, path)| path)
    }
}
