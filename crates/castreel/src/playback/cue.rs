use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An author-placed marker in a clip's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MediaCue {
    /// External ticks. Ordered first so the set sorts by time.
    pub time: i64,
    pub id: u32,
}

impl MediaCue {
    pub fn new(time: i64, id: u32) -> Self {
        Self { time, id }
    }
}

/// Ordered set of cues checked for crossings on every timestamp change.
#[derive(Debug, Clone, Default)]
pub struct CueSet {
    cues: BTreeSet<MediaCue>,
}

impl CueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cue: MediaCue) -> bool {
        self.cues.insert(cue)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Cues crossed moving from `from` to `to`, in traversal order.
    ///
    /// Forward moves cover `(from, to]`, backward moves `[to, from)`, so a cue
    /// sitting exactly on the starting timestamp never fires twice.
    pub fn crossed(&self, from: i64, to: i64) -> Vec<MediaCue> {
        if from < to {
            self.cues
                .range(MediaCue::new(from + 1, 0)..MediaCue::new(to + 1, 0))
                .copied()
                .collect()
        } else if from > to {
            self.cues
                .range(MediaCue::new(to, 0)..MediaCue::new(from, 0))
                .rev()
                .copied()
                .collect()
        } else {
            Vec::new()
        }
    }
}

impl FromIterator<MediaCue> for CueSet {
    fn from_iter<I: IntoIterator<Item = MediaCue>>(iter: I) -> Self {
        Self {
            cues: iter.into_iter().collect(),
        }
    }
}
