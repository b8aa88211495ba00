use std::collections::BTreeSet;

/// Players who joined and left between two rosters, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RosterDiff {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl RosterDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

#[must_use]
pub fn diff(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> RosterDiff {
    // BTreeSet iterates in order, so both lists come out sorted.
    RosterDiff {
        joined: current.difference(previous).cloned().collect(),
        left: previous.difference(current).cloned().collect(),
    }
}
