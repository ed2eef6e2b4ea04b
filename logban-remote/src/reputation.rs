//! IP reputation lookup.
//!
//! Queries the AbuseIPDB `check` endpoint for an abuse confidence score.
//! A response that arrives but lacks a usable score reads as 0; a request that
//! never produces a response is an error so the caller can tell the two apart.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::USER_AGENT;

const SERVICE: &str = "abuseipdb";

/// Default AbuseIPDB check endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.abuseipdb.com/api/v2/check";

/// Default report age considered by the lookup, in days.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for looking up an IP's abuse confidence score (0-100).
pub trait ReputationLookup: Send + Sync {
    fn score(&self, ip: &str) -> Result<u8, RemoteError>;
}

/// AbuseIPDB client configuration.
#[derive(Debug, Clone)]
pub struct AbuseIpDbConfig {
    pub api_key: String,
    pub endpoint: String,
    pub max_age_days: u32,
    pub timeout: Duration,
}

impl AbuseIpDbConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: set endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Builder: set max_age_days.
    pub fn with_max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = days;
        self
    }

    /// Builder: set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Blocking AbuseIPDB client.
#[derive(Debug, Clone)]
pub struct AbuseIpDbClient {
    http: Client,
    config: AbuseIpDbConfig,
}

impl AbuseIpDbClient {
    pub fn new(config: AbuseIpDbConfig) -> Result<Self, RemoteError> {
        if config.api_key.is_empty() {
            return Err(RemoteError::Config("AbuseIPDB API key is empty".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self { http, config })
    }
}

impl ReputationLookup for AbuseIpDbClient {
    fn score(&self, ip: &str) -> Result<u8, RemoteError> {
        debug!(ip, endpoint = %self.config.endpoint, "querying reputation");

        let max_age = self.config.max_age_days.to_string();
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[("ipAddress", ip), ("maxAgeInDays", max_age.as_str())])
            .header("Key", &self.config.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| RemoteError::transport(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(ip, status = status.as_u16(), "reputation lookup rejected");
            return Err(RemoteError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| RemoteError::transport(SERVICE, e))?;
        Ok(parse_score(&body))
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: Option<CheckData>,
}

#[derive(Debug, Deserialize)]
struct CheckData {
    #[serde(rename = "abuseConfidenceScore")]
    abuse_confidence_score: Option<f64>,
}

/// Extract `data.abuseConfidenceScore` from a check response body.
///
/// Malformed bodies and missing or non-numeric scores read as 0.
/// Out-of-range values are clamped to 0-100.
pub fn parse_score(body: &str) -> u8 {
    let score = serde_json::from_str::<CheckResponse>(body)
        .ok()
        .and_then(|r| r.data)
        .and_then(|d| d.abuse_confidence_score)
        .unwrap_or(0.0);

    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u8
}

/// Mock reputation lookup for testing.
/// Cloning creates a new handle to the same call log.
#[derive(Debug, Clone, Default)]
pub struct MockReputation {
    scores: HashMap<String, Result<u8, RemoteError>>,
    default_score: u8,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockReputation {
    /// Create a mock that scores every IP 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Score returned for IPs without an explicit entry.
    pub fn with_default_score(mut self, score: u8) -> Self {
        self.default_score = score;
        self
    }

    /// Set the score for an IP.
    pub fn with_score(mut self, ip: &str, score: u8) -> Self {
        self.scores.insert(ip.to_string(), Ok(score));
        self
    }

    /// Make lookups for an IP fail with a transport error.
    pub fn with_failure(mut self, ip: &str) -> Self {
        self.scores.insert(
            ip.to_string(),
            Err(RemoteError::Transport {
                service: SERVICE,
                message: "connection refused".to_string(),
            }),
        );
        self
    }

    /// IPs looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

impl ReputationLookup for MockReputation {
    fn score(&self, ip: &str) -> Result<u8, RemoteError> {
        self.calls.write().unwrap().push(ip.to_string());
        self.scores
            .get(ip)
            .cloned()
            .unwrap_or(Ok(self.default_score))
    }
}
