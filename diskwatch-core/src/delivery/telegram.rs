//! Telegram Bot API transport
//!
//! `sendMessage` for inline text (legacy Markdown), `sendDocument`
//! (multipart upload) for long messages.

use super::Transport;
use crate::config::Credentials;
use crate::error::DeliveryError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramTransport {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramTransport {
    /// Only validated credentials can build a transport
    pub fn new(
        credentials: &Credentials,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("diskwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: credentials.token().to_string(),
            chat_id: credentials.chat_id().to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn check_response(response: reqwest::Response) -> Result<(), DeliveryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        debug!("sendMessage: {} chars", text.chars().count());

        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "Markdown"),
        ];

        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .form(&params)
            .send()
            .await?;

        Self::check_response(response).await
    }

    async fn send_document(&self, file_name: &str, content: Vec<u8>) -> Result<(), DeliveryError> {
        debug!("sendDocument: {} ({} bytes)", file_name, content.len());

        let document = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| DeliveryError::Request(format!("invalid MIME type: {}", e)))?;

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", document);

        let response = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        Self::check_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> TelegramTransport {
        let credentials = Credentials::new("123:abc", "-100200300").unwrap();
        TelegramTransport::new(&credentials, &server.uri(), Duration::from_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn test_send_text_posts_form() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_string_contains("chat_id=-100200300"))
            .and(body_string_contains("parse_mode=Markdown"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        transport(&server).send_text("hello disks").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_keeps_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("Bad Request: chat not found"),
            )
            .mount(&server)
            .await;

        let err = transport(&server).send_text("hello").await.unwrap_err();
        assert_eq!(
            err,
            DeliveryError::Rejected {
                status: 400,
                body: "Bad Request: chat not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_document_uploads_file() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendDocument"))
            .and(body_string_contains("filename=\"log_srv_2024-01-01_00-00-00.txt\""))
            .and(body_string_contains("long report body"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        transport(&server)
            .send_document("log_srv_2024-01-01_00-00-00.txt", b"long report body".to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let credentials = Credentials::new("123:abc", "1").unwrap();
        let transport =
            TelegramTransport::new(&credentials, "http://127.0.0.1:9", Duration::from_secs(2))
                .unwrap();

        let err = transport.send_text("hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Network(_)));
        assert!(!err.to_string().contains("123:abc"));
    }
}
