/*!
Scripted health source

Replays a queue of probe results instead of running PowerShell. Once the
queue is drained the last step keeps repeating, like a probe whose output
no longer changes.
*/

use async_trait::async_trait;
use diskwatch_core::{AcquisitionError, HealthSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const SCRIPTED_PROGRAM: &str = "scripted-probe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Report(String),
    /// Probe exits non-zero with this stderr
    Failure(String),
}

impl ScriptStep {
    fn to_result(&self) -> Result<String, AcquisitionError> {
        match self {
            ScriptStep::Report(raw) => Ok(raw.clone()),
            ScriptStep::Failure(stderr) => Err(AcquisitionError::Failed {
                program: SCRIPTED_PROGRAM.to_string(),
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
        }
    }
}

#[derive(Clone, Default)]
pub struct ScriptedSource {
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
    last: Arc<Mutex<Option<ScriptStep>>>,
    probes: Arc<Mutex<usize>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_report(&self, raw: impl Into<String>) {
        self.steps.lock().unwrap().push_back(ScriptStep::Report(raw.into()));
    }

    pub fn push_failure(&self, stderr: impl Into<String>) {
        self.steps
            .lock()
            .unwrap()
            .push_back(ScriptStep::Failure(stderr.into()));
    }

    /// Number of `acquire` calls so far
    pub fn probes(&self) -> usize {
        *self.probes.lock().unwrap()
    }
}

#[async_trait]
impl HealthSource for ScriptedSource {
    async fn acquire(&self) -> Result<String, AcquisitionError> {
        *self.probes.lock().unwrap() += 1;

        let step = self.steps.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = step {
            *last = Some(step);
        }

        match last.as_ref() {
            Some(step) => step.to_result(),
            // Nothing scripted yet: an empty report
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_step_repeats() {
        let source = ScriptedSource::new();
        assert_eq!(source.acquire().await.unwrap(), "");

        source.push_report("Disk[0](A) - Wear: 1");
        source.push_failure("Access denied");

        assert_eq!(source.acquire().await.unwrap(), "Disk[0](A) - Wear: 1");
        assert!(source.acquire().await.is_err());
        assert!(source.acquire().await.is_err());
        assert_eq!(source.probes(), 4);
    }
}
