//! Check orchestrator
//!
//! Owns the retained state and drives one change cycle per tick:
//! acquire → parse → diff → compose → deliver → commit.
//! Cycles are serialized by holding the state lock for their whole duration.

use crate::compose;
use crate::config::MonitorConfig;
use crate::delivery::telegram::TelegramTransport;
use crate::delivery::{DeliveryEngine, DeliveryOutcome};
use crate::diff::diff;
use crate::error::MonitorError;
use crate::report::parse_report;
use crate::source::HealthSource;
use crate::state::RetainedState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest supported check interval
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(30 * 24 * 3600);

/// When the timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    /// Run a cycle immediately instead of waiting one interval
    pub check_on_start: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            check_on_start: false,
        }
    }
}

/// Result of one diff-mode cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Unchanged,
    Notified {
        changed: usize,
        resolved: usize,
        delivery: DeliveryOutcome,
    },
    AcquisitionAlerted { delivery: DeliveryOutcome },
    /// Same acquisition failure as last time, nothing sent
    AcquisitionSuppressed,
}

/// Result of an on-demand check
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCheckReport {
    pub cycle: CycleOutcome,
    pub active_problems: usize,
    pub probe_failing: bool,
    pub summary_delivery: DeliveryOutcome,
}

pub struct Orchestrator {
    source: Arc<dyn HealthSource>,
    delivery: DeliveryEngine,
    schedule: Schedule,
    state: Mutex<RetainedState>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn HealthSource>,
        delivery: DeliveryEngine,
        schedule: Schedule,
    ) -> Self {
        Self {
            source,
            delivery,
            schedule,
            state: Mutex::new(RetainedState::default()),
        }
    }

    /// Wire the command source and Telegram transport from validated settings
    pub fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;

        let credentials = config.credentials()?;
        let transport = TelegramTransport::new(
            &credentials,
            &config.telegram.api_base,
            config.request_timeout(),
        )?;
        let delivery = DeliveryEngine::new(
            Arc::new(transport),
            config.retry_policy(),
            config.host_identity(),
        );
        let schedule = Schedule {
            interval: config.check_interval(),
            check_on_start: config.monitor.check_on_start,
        };

        Ok(Self::new(Arc::new(config.health_source()), delivery, schedule))
    }

    /// Snapshot of what is currently remembered
    pub async fn retained_state(&self) -> RetainedState {
        self.state.lock().await.clone()
    }

    /// One change-detection cycle
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> CycleOutcome {
        let mut state = self.state.lock().await;
        self.cycle_locked(&mut state, shutdown).await
    }

    /// Diff cycle followed by an unconditional summary of current state
    pub async fn run_manual_check(&self, shutdown: &CancellationToken) -> ManualCheckReport {
        info!("Manual check triggered.");
        let mut state = self.state.lock().await;
        let cycle = self.cycle_locked(&mut state, shutdown).await;

        info!("Sending test summary notification.");
        let summary = compose::summary_message(&state);
        let summary_delivery = self.delivery.deliver(&summary, shutdown).await;

        ManualCheckReport {
            cycle,
            active_problems: state.problems().len(),
            probe_failing: state.acquisition_failure().is_some(),
            summary_delivery,
        }
    }

    /// Timer loop; returns once `shutdown` is cancelled. A cycle already
    /// running completes, only its backoff waits are cut short.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut period = self.schedule.interval;
        if period > MAX_CHECK_INTERVAL {
            warn!("Check interval {:?} is too long, using {:?}", period, MAX_CHECK_INTERVAL);
            period = MAX_CHECK_INTERVAL;
        }
        let first_tick = if self.schedule.check_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };

        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Monitoring loop running, checking every {:?}", period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, monitoring loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.run_cycle(&shutdown).await;
                    debug!("Cycle finished: {:?}", outcome);
                }
            }
        }
    }

    async fn cycle_locked(
        &self,
        state: &mut RetainedState,
        shutdown: &CancellationToken,
    ) -> CycleOutcome {
        let raw = match self.source.acquire().await {
            Ok(raw) => raw,
            Err(err) => {
                let failure = err.to_string();

                if state.acquisition_failure() == Some(failure.as_str()) {
                    debug!("Acquisition still failing with the same error, alert already sent");
                    return CycleOutcome::AcquisitionSuppressed;
                }

                error!("Failed to run health probe: {}", failure);
                let delivery = self
                    .delivery
                    .deliver(&compose::acquisition_alert(&failure), shutdown)
                    .await;
                *state = RetainedState::AcquisitionFailed(failure);
                return CycleOutcome::AcquisitionAlerted { delivery };
            }
        };

        info!("Health probe result:\n{}", raw.trim_end());

        let current = parse_report(&raw);
        let recovered_from = state.acquisition_failure().map(str::to_string);
        let changes = diff(&state.problems(), &current);

        if !changes.is_changed() && recovered_from.is_none() {
            info!("Disk status unchanged. No notification needed.");
            return CycleOutcome::Unchanged;
        }

        info!(
            "Disk status has changed ({} new/changed, {} resolved). Sending notification.",
            changes.changed_or_new.len(),
            changes.resolved.len()
        );
        for record in &changes.changed_or_new {
            info!("Problem on {}: {}", record.device_key, record.fault_summary());
        }
        for device_key in &changes.resolved {
            info!("{} is now OK", device_key);
        }

        let message = compose::diff_message(&changes, recovered_from.as_deref());
        let delivery = self.delivery.deliver(&message, shutdown).await;

        // Committed whatever the delivery outcome
        *state = RetainedState::Problems(current);

        CycleOutcome::Notified {
            changed: changes.changed_or_new.len(),
            resolved: changes.resolved.len(),
            delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{RetryPolicy, Transport};
    use crate::error::{AcquisitionError, DeliveryError};
    use crate::host::HostIdentity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct HealthyDisks {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl HealthSource for HealthyDisks {
        async fn acquire(&self) -> Result<String, AcquisitionError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok("Disk[0](X) - Wear: 0 - ReallocatedSectors: 0".to_string())
        }
    }

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send_text(&self, _text: &str) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn send_document(
            &self,
            _file_name: &str,
            _content: Vec<u8>,
        ) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn orchestrator(source: Arc<HealthyDisks>, check_on_start: bool) -> Orchestrator {
        let delivery = DeliveryEngine::new(
            Arc::new(NullTransport),
            RetryPolicy::default(),
            HostIdentity::Fixed("test".into()),
        );
        Orchestrator::new(
            source,
            delivery,
            Schedule {
                interval: Duration::from_secs(3600),
                check_on_start,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_hourly_and_stops_on_shutdown() {
        let source = Arc::new(HealthyDisks {
            probes: AtomicUsize::new(0),
        });
        let orchestrator = Arc::new(orchestrator(source.clone(), false));
        let token = CancellationToken::new();

        let handle = {
            let orchestrator = orchestrator.clone();
            let token = token.clone();
            tokio::spawn(async move { orchestrator.run(token).await })
        };

        tokio::time::sleep(Duration::from_secs(3599)).await;
        assert_eq!(source.probes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert_eq!(source.probes.load(Ordering::SeqCst), 2);

        token.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(5 * 3600)).await;
        assert_eq!(source.probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_interval_is_clamped() {
        let source = Arc::new(HealthyDisks {
            probes: AtomicUsize::new(0),
        });
        let delivery = DeliveryEngine::new(
            Arc::new(NullTransport),
            RetryPolicy::default(),
            HostIdentity::Fixed("test".into()),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            source.clone(),
            delivery,
            Schedule {
                interval: Duration::from_secs(u64::MAX),
                check_on_start: false,
            },
        ));
        let token = CancellationToken::new();

        let handle = {
            let orchestrator = orchestrator.clone();
            let token = token.clone();
            tokio::spawn(async move { orchestrator.run(token).await })
        };

        tokio::time::sleep(MAX_CHECK_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(source.probes.load(Ordering::SeqCst), 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_on_start_runs_immediately() {
        let source = Arc::new(HealthyDisks {
            probes: AtomicUsize::new(0),
        });
        let orchestrator = Arc::new(orchestrator(source.clone(), true));
        let token = CancellationToken::new();

        let handle = {
            let orchestrator = orchestrator.clone();
            let token = token.clone();
            tokio::spawn(async move { orchestrator.run(token).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.probes.load(Ordering::SeqCst), 1);

        token.cancel();
        handle.await.unwrap();
    }
}
