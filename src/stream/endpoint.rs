//! HTTP client for the streaming text-generation endpoint.
//!
//! Opens one chunked connection per turn and hands the body to the
//! [`FrameReassembler`](super::FrameReassembler). Transport failures are
//! surfaced to the caller as retryable errors; nothing here retries.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use serde::Serialize;
use serde_json::Value;

use super::reassembler::FrameReassembler;
use crate::config::Config;

/// Categories of endpoint errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointErrorKind {
    /// HTTP status error (4xx, 5xx).
    HttpStatus,
    /// Connection or request timeout.
    Timeout,
    /// Connection dropped mid-stream.
    Disconnect,
    /// Request could not be built or sent for a non-transport reason.
    Parse,
}

impl fmt::Display for EndpointErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointErrorKind::HttpStatus => write!(f, "http_status"),
            EndpointErrorKind::Timeout => write!(f, "timeout"),
            EndpointErrorKind::Disconnect => write!(f, "disconnect"),
            EndpointErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured endpoint error with kind and details.
#[derive(Debug, Clone)]
pub struct EndpointError {
    pub kind: EndpointErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl EndpointError {
    pub fn new(kind: EndpointErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(EndpointErrorKind::Timeout, message)
    }

    pub fn disconnect(message: impl Into<String>) -> Self {
        Self::new(EndpointErrorKind::Disconnect, message)
    }

    /// Creates an HTTP status error, pulling `error.message` out of a
    /// JSON body when the endpoint provides one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body) {
                if let Some(msg) = json
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                {
                    message = format!("HTTP {status}: {msg}");
                }
            }
            Some(body.to_string())
        };
        Self {
            kind: EndpointErrorKind::HttpStatus,
            message,
            details,
        }
    }

    /// Transport-level failures may succeed on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            EndpointErrorKind::Timeout | EndpointErrorKind::Disconnect
        )
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for EndpointError {}

/// Boxed byte stream from a chunked HTTP response body.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Send>>;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Client for the streaming endpoint.
pub struct EndpointClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl EndpointClient {
    /// Creates a client from config. The request timeout bounds time to
    /// first byte, not the whole stream.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.into()))
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.endpoint_base_url.clone(),
            model: config.model.clone(),
            http,
        }
    }

    /// Opens a streaming completion for `prompt` and returns the frame
    /// reassembler over the response body.
    ///
    /// Dropping the returned stream closes the connection, including on
    /// caller cancellation or process interrupt.
    ///
    /// # Errors
    /// Transport failures (timeout, disconnect) and non-success statuses
    /// are returned to the caller, which may reconnect.
    pub async fn open_stream(
        &self,
        prompt: &str,
    ) -> std::result::Result<FrameReassembler<ByteStream>, EndpointError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EndpointError::http_status(status.as_u16(), &body));
        }

        let bytes: ByteStream = Box::pin(response.bytes_stream());
        Ok(FrameReassembler::new(bytes))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> EndpointError {
    if err.is_timeout() {
        EndpointError::timeout(format!("request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        EndpointError::disconnect(format!("connection failed: {err}"))
    } else {
        EndpointError::new(EndpointErrorKind::Parse, err.to_string())
    }
}
