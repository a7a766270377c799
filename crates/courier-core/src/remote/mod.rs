//! Remote delivery client.
//!
//! Every transport-level failure is classified here, before it reaches the
//! sync coordinator: the coordinator only ever sees `Accepted`, `Rejected`
//! (permanent), or `Unavailable` (transient).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Record;
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Default bound on a single delivery request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Classified result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Remote durably stored the record and assigned it an identifier
    Accepted { remote_id: String },
    /// Remote explicitly refused the content; never retried automatically
    Rejected { reason: String },
    /// The exchange could not complete; retried with backoff
    Unavailable { reason: String },
}

/// Trait for sending a record to the remote service
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn send(&self, record: &Record) -> Outcome;
}

/// Configuration for the HTTP remote client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    endpoint: String,
    timeout: Duration,
}

impl RemoteConfig {
    /// Create a configuration for the given endpoint base URL
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint.into())?,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The normalized endpoint base URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// HTTP implementation of `RemoteClient`
pub struct HttpRemoteClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRemoteClient {
    /// Build a client from the given configuration
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            endpoint: config.endpoint,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    client_id: String,
    title: &'a str,
    body: &'a str,
    created_at: i64,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    id: Option<String>,
    remote_id: Option<String>,
}

impl CreateRecordResponse {
    fn assigned_id(self) -> Option<String> {
        self.id
            .or(self.remote_id)
            .and_then(|id| normalize_text_option(Some(id)))
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn send(&self, record: &Record) -> Outcome {
        let url = format!("{}/records", self.endpoint);
        let payload = CreateRecordRequest {
            client_id: record.id.as_str(),
            title: &record.title,
            body: &record.body,
            created_at: record.created_at,
        };

        let response = match self.client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(error) => {
                return Outcome::Unavailable {
                    reason: describe_transport_error(&error),
                }
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<CreateRecordResponse>().await {
                Ok(body) => match body.assigned_id() {
                    Some(remote_id) => Outcome::Accepted { remote_id },
                    // Without an id we cannot witness durable acceptance
                    None => Outcome::Unavailable {
                        reason: "Response did not include an assigned id".to_string(),
                    },
                },
                Err(error) => Outcome::Unavailable {
                    reason: format!("Invalid response payload: {error}"),
                },
            };
        }

        let body = response.text().await.unwrap_or_default();
        let reason = parse_api_error(status, &body);

        if status.is_client_error() {
            Outcome::Rejected { reason }
        } else {
            Outcome::Unavailable { reason }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {error}")
    } else {
        format!("Request failed: {error}")
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Validation("Endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Validation(
            "Endpoint must include http:// or https://".to_string(),
        ))
    }
}
