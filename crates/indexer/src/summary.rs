//! Run counters shared by the indexing and publish engines.

use std::fmt;

/// Counters for one subdirectory run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries in the committed state before this run.
    pub old: usize,
    /// Entries in the current input.
    pub current: usize,
    /// Entries processed to completion.
    pub updated: usize,
    /// Entries removed.
    pub deleted: usize,
    /// Entries that started processing and did not finish.
    pub failed: usize,
    /// Entries rejected before processing.
    pub skipped: usize,
    /// Entries that needed no work.
    pub up_to_date: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Old -> New) = ({} -> {}), Updated = {}, Deleted = {}, Failed = {}, Skipped = {}, Up-to-date = {}",
            self.old,
            self.current,
            self.updated,
            self.deleted,
            self.failed,
            self.skipped,
            self.up_to_date
        )
    }
}
