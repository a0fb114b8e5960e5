/*!
Mock transport for development without a Telegram bot

Records every message that would have reached the chat and can be scripted
to fail a number of attempts, to exercise the retry path.
*/

use async_trait::async_trait;
use diskwatch_core::delivery::Transport;
use diskwatch_core::DeliveryError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text(String),
    Document { file_name: String, content: String },
}

impl SentMessage {
    /// Text of the message, whichever way it travelled
    pub fn body(&self) -> &str {
        match self {
            SentMessage::Text(text) => text,
            SentMessage::Document { content, .. } => content,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, SentMessage::Document { .. })
    }
}

/// Mock transport implementing `diskwatch_core::Transport`
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    scripted_failures: Arc<Mutex<VecDeque<DeliveryError>>>,
    attempts: Arc<Mutex<usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `times` attempts fail with `err`
    pub fn fail_times(&self, times: usize, err: DeliveryError) {
        let mut failures = self.scripted_failures.lock().unwrap();
        failures.extend(std::iter::repeat(err).take(times));
    }

    /// Next attempts fail with a generic network error
    pub fn fail_next(&self, times: usize) {
        self.fail_times(times, DeliveryError::Network("connection refused".to_string()));
    }

    /// Successful deliveries only
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_message(&self) -> Option<SentMessage> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Every call, including the failed ones
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn find_messages_containing(&self, needle: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.body().contains(needle))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.scripted_failures.lock().unwrap().clear();
        *self.attempts.lock().unwrap() = 0;
    }

    fn record(&self, message: SentMessage) -> Result<(), DeliveryError> {
        *self.attempts.lock().unwrap() += 1;

        if let Some(err) = self.scripted_failures.lock().unwrap().pop_front() {
            log::info!("📤 [MOCK] Scripted failure: {}", err);
            return Err(err);
        }

        log::info!("📤 [MOCK] Delivered {} chars", message.body().chars().count());
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        self.record(SentMessage::Text(text.to_string()))
    }

    async fn send_document(&self, file_name: &str, content: Vec<u8>) -> Result<(), DeliveryError> {
        self.record(SentMessage::Document {
            file_name: file_name.to_string(),
            content: String::from_utf8_lossy(&content).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_records_and_fails() {
        let transport = MockTransport::new();
        transport.fail_next(1);

        assert!(transport.send_text("first").await.is_err());
        transport.send_text("second").await.unwrap();
        transport
            .send_document("log.txt", b"third".to_vec())
            .await
            .unwrap();

        assert_eq!(transport.attempts(), 3);
        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], SentMessage::Text("second".to_string()));
        assert!(sent[1].is_document());
        assert_eq!(transport.find_messages_containing("third").len(), 1);

        transport.clear();
        assert!(transport.last_message().is_none());
    }
}
