//! Notification delivery engine
//!
//! Handles:
//! - Host header on every message
//! - Transport selection by size (inline text up to 4096 UTF-16 units, document above)
//! - Bounded retry with exponential backoff, interruptible on shutdown

pub mod telegram;

use crate::compose::with_host_header;
use crate::error::DeliveryError;
use crate::host::HostIdentity;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Telegram's text message limit, in UTF-16 code units
pub const TEXT_MESSAGE_LIMIT: usize = 4096;

/// The two operations the notification endpoint offers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short message with rich-text formatting
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError>;

    /// File attachment for messages over the text limit
    async fn send_document(&self, file_name: &str, content: Vec<u8>) -> Result<(), DeliveryError>;
}

/// How a message travels to the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Text,
    Document,
}

impl DeliveryMode {
    /// Inline up to and including the limit, measured the way Telegram does
    pub fn for_message(message: &str) -> Self {
        if message.encode_utf16().count() > TEXT_MESSAGE_LIMIT {
            DeliveryMode::Document
        } else {
            DeliveryMode::Text
        }
    }
}

/// One scheduled attempt within a delivery call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based
    pub number: u32,
    /// `None` on the last attempt
    pub delay_before_next: Option<Duration>,
}

/// Attempts and backoff growth: `initial_delay * factor^i` before retry `i`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            factor: 3,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        self.initial_delay
            .saturating_mul(self.factor.saturating_pow(retry_index))
    }

    pub fn schedule(&self) -> impl Iterator<Item = RetryAttempt> + '_ {
        let attempts = self.max_attempts.max(1);
        (0..attempts).map(move |i| RetryAttempt {
            number: i + 1,
            delay_before_next: (i + 1 < attempts).then(|| self.delay_for(i)),
        })
    }
}

/// What happened to one notification
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32, mode: DeliveryMode },
    GaveUp { attempts: u32, last_error: DeliveryError },
    /// Shutdown arrived during a backoff wait
    Interrupted { attempts: u32 },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Sends composed messages with retry; never returns an error to the caller
#[derive(Clone)]
pub struct DeliveryEngine {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    host: HostIdentity,
}

impl DeliveryEngine {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy, host: HostIdentity) -> Self {
        Self {
            transport,
            policy,
            host,
        }
    }

    /// Prefix the host header, pick the transport and deliver with retry
    pub async fn deliver(&self, body: &str, shutdown: &CancellationToken) -> DeliveryOutcome {
        let host = self.host.resolve();
        let message = with_host_header(&host, body);
        let mode = DeliveryMode::for_message(&message);
        let total = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in self.policy.schedule() {
            let result = match mode {
                DeliveryMode::Text => self.transport.send_text(&message).await,
                DeliveryMode::Document => {
                    let file_name = document_file_name(&host);
                    self.transport
                        .send_document(&file_name, message.clone().into_bytes())
                        .await
                }
            };

            let err = match result {
                Ok(()) => {
                    info!(
                        "Telegram notification sent successfully ({:?}, attempt {}/{})",
                        mode, attempt.number, total
                    );
                    return DeliveryOutcome::Delivered {
                        attempts: attempt.number,
                        mode,
                    };
                }
                Err(err) => err,
            };

            warn!("Failed to send notification (attempt {}/{}): {}", attempt.number, total, err);
            last_error = Some(err);

            let Some(delay) = attempt.delay_before_next else {
                break;
            };

            info!("Waiting for {:?} before retrying...", delay);
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    warn!(
                        "Shutdown requested, abandoning notification after {} attempt(s)",
                        attempt.number
                    );
                    return DeliveryOutcome::Interrupted { attempts: attempt.number };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        error!("Gave up sending notification after {} attempts.", total);
        DeliveryOutcome::GaveUp {
            attempts: total,
            last_error: last_error
                .unwrap_or_else(|| DeliveryError::Request("no attempt was made".to_string())),
        }
    }
}

/// `log_<host>_<YYYY-MM-DD_HH-MM-SS>.txt`, local time
pub fn document_file_name(host: &str) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}_{}.txt", host, now)
}
