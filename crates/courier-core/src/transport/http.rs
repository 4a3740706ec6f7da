//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::{
    ConversationQuery, ReadReceiptRequest, RemoteTransport, SendMessageRequest, TransportError,
    TransportResult, ACTOR_TOKEN_HEADER,
};

const MESSAGES_PATH: &str = "/v1/messages";

/// HTTP/JSON transport for the message server
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn execute(&self, request: RequestBuilder, actor_token: Option<&str>) -> TransportResult {
        let request = match actor_token {
            Some(token) => request.header(ACTOR_TOKEN_HEADER, token),
            None => request,
        };

        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| self.map_error(error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.map_error(error))?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_success_body(status.as_u16(), &body))
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn send_message(&self, base_url: &str, request: &SendMessageRequest) -> TransportResult {
        let builder = self
            .client
            .post(format!("{base_url}{MESSAGES_PATH}"))
            .json(request);
        self.execute(builder, request.actor_token.as_deref()).await
    }

    async fn fetch_conversation(
        &self,
        base_url: &str,
        query: &ConversationQuery,
    ) -> TransportResult {
        let builder = self
            .client
            .get(format!("{base_url}{MESSAGES_PATH}"))
            .query(query);
        self.execute(builder, query.actor_token.as_deref()).await
    }

    async fn send_read_receipt(
        &self,
        base_url: &str,
        server_message_id: &str,
        request: &ReadReceiptRequest,
    ) -> TransportResult {
        let url = read_receipt_url(base_url, server_message_id);
        let builder = self.client.post(url).json(request);
        self.execute(builder, request.actor_token.as_deref()).await
    }
}

/// A 2xx is a success regardless of its body; anything but JSON carries no payload.
fn decode_success_body(status: u16, body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(status, %error, "Ignoring non-JSON success body");
            None
        }
    }
}

fn read_receipt_url(base_url: &str, server_message_id: &str) -> String {
    format!(
        "{base_url}{MESSAGES_PATH}/{}/read",
        urlencoding::encode(server_message_id)
    )
}
