use crate::report::ProblemSet;

/// What the orchestrator remembers between cycles (memory only, reset on restart)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetainedState {
    /// Last successfully parsed report
    Problems(ProblemSet),
    /// Last acquisition failure text; replaces any previous problem set
    AcquisitionFailed(String),
}

impl Default for RetainedState {
    fn default() -> Self {
        RetainedState::Problems(ProblemSet::new())
    }
}

impl RetainedState {
    /// Problems as last known; empty while the source is failing
    pub fn problems(&self) -> ProblemSet {
        match self {
            RetainedState::Problems(set) => set.clone(),
            RetainedState::AcquisitionFailed(_) => ProblemSet::new(),
        }
    }

    pub fn acquisition_failure(&self) -> Option<&str> {
        match self {
            RetainedState::AcquisitionFailed(message) => Some(message),
            RetainedState::Problems(_) => None,
        }
    }
}
