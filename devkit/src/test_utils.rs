/*!
Test harness for the monitoring loop

Wires an `Orchestrator` to a scripted source and a mock transport:
- Scripted probe output per cycle
- Assertions on what reached the chat
- Retry behaviour without waiting real time (run under a paused clock)
*/

use crate::source_stub::ScriptedSource;
use crate::transport_stub::{MockTransport, SentMessage};
use anyhow::Result;
use diskwatch_core::{
    CycleOutcome, DeliveryEngine, HostIdentity, ManualCheckReport, Orchestrator, RetainedState,
    RetryPolicy, Schedule,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const TEST_HOST: &str = "test-host";

pub struct TestHarness {
    pub source: ScriptedSource,
    pub transport: MockTransport,
    pub orchestrator: Arc<Orchestrator>,
    pub shutdown: CancellationToken,
}

impl TestHarness {
    /// Default retry policy, hourly schedule
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self::build(policy, Schedule::default())
    }

    pub fn with_schedule(schedule: Schedule) -> Self {
        Self::build(RetryPolicy::default(), schedule)
    }

    fn build(policy: RetryPolicy, schedule: Schedule) -> Self {
        env_logger::try_init().ok();

        let source = ScriptedSource::new();
        let transport = MockTransport::new();
        let delivery = DeliveryEngine::new(
            Arc::new(transport.clone()),
            policy,
            HostIdentity::Fixed(TEST_HOST.to_string()),
        );
        let orchestrator = Orchestrator::new(Arc::new(source.clone()), delivery, schedule);

        Self {
            source,
            transport,
            orchestrator: Arc::new(orchestrator),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn cycle(&self) -> CycleOutcome {
        let outcome = self.orchestrator.run_cycle(&self.shutdown).await;
        log::info!("🔁 Cycle outcome: {:?}", outcome);
        outcome
    }

    pub async fn manual_check(&self) -> ManualCheckReport {
        self.orchestrator.run_manual_check(&self.shutdown).await
    }

    pub async fn state(&self) -> RetainedState {
        self.orchestrator.retained_state().await
    }

    /// Body of the last delivered message without the host header
    pub fn last_body(&self) -> Option<String> {
        let header = format!("🖥️ *Host:* `{}`\n\n", TEST_HOST);
        self.transport
            .last_message()
            .map(|msg| msg.body().strip_prefix(header.as_str()).unwrap_or(msg.body()).to_string())
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.transport.sent_messages()
    }

    /// Exactly `expected` messages delivered so far
    pub fn assert_sent_count(&self, expected: usize) -> Result<()> {
        let actual = self.transport.sent_messages().len();
        if actual != expected {
            anyhow::bail!("expected {} delivered messages, got {}", expected, actual);
        }
        Ok(())
    }

    /// Last delivered message contains every fragment
    pub fn assert_last_contains(&self, fragments: &[&str]) -> Result<()> {
        let Some(body) = self.last_body() else {
            anyhow::bail!("no message was delivered");
        };

        for fragment in fragments {
            if !body.contains(fragment) {
                anyhow::bail!("last message does not contain {:?}:\n{}", fragment, body);
            }
        }
        Ok(())
    }

    /// Last delivered message contains none of the fragments
    pub fn assert_last_lacks(&self, fragments: &[&str]) -> Result<()> {
        let body = self.last_body().unwrap_or_default();
        for fragment in fragments {
            if body.contains(fragment) {
                anyhow::bail!("last message unexpectedly contains {:?}:\n{}", fragment, body);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.transport.clear();
        log::info!("🧹 Test harness reset");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_basic_functionality() {
        let harness = TestHarness::new();
        harness.source.push_report("Disk[0](A) - Wear: 4");

        let outcome = harness.cycle().await;
        assert!(matches!(outcome, CycleOutcome::Notified { changed: 1, .. }));

        harness.assert_sent_count(1).unwrap();
        harness.assert_last_contains(&["Disk[0](A) - Wear: 4"]).unwrap();
        assert!(harness.assert_last_lacks(&["Wear: 4"]).is_err());

        harness.reset();
        harness.assert_sent_count(0).unwrap();
    }
}
