//! State differ: classifies devices between two problem sets

use crate::report::{ProblemRecord, ProblemSet};

/// Result of comparing the retained problem set with a fresh one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    /// Present now with a description that differs from before (or absent before)
    pub changed_or_new: Vec<ProblemRecord>,
    /// Present before, absent now; only the key survives
    pub resolved: Vec<String>,
}

impl StateDiff {
    /// Whether anything warrants a notification
    pub fn is_changed(&self) -> bool {
        !self.changed_or_new.is_empty() || !self.resolved.is_empty()
    }
}

/// Compare key by key and description by description.
///
/// A counter-only change on an already flagged device lands in
/// `changed_or_new`; identical entries appear in neither list.
pub fn diff(previous: &ProblemSet, current: &ProblemSet) -> StateDiff {
    let changed_or_new = current
        .records()
        .filter(|record| {
            previous
                .get(&record.device_key)
                .map_or(true, |old| old.description != record.description)
        })
        .cloned()
        .collect();

    let resolved = previous
        .keys()
        .filter(|key| !current.contains(key))
        .map(str::to_string)
        .collect();

    StateDiff {
        changed_or_new,
        resolved,
    }
}
