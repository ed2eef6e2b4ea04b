//! Firewall block enforcement via Cloudflare IP access rules.
//!
//! Rules are created either account-wide or for a single zone. The outcome is
//! read from the response's own `success` flag; anything that does not
//! positively report success, transport failures included, is a failed block.

use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::USER_AGENT;

/// Default Cloudflare API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default note attached to created rules.
pub const DEFAULT_NOTE: &str = "Auto-blocked by script";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one block attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockResult {
    pub success: bool,
    /// Response body, or the transport error text when there was none.
    pub raw: String,
}

impl BlockResult {
    pub fn failed(raw: impl Into<String>) -> Self {
        Self {
            success: false,
            raw: raw.into(),
        }
    }
}

/// Trait for installing a block rule for an IP.
pub trait BlockEnforcer: Send + Sync {
    fn block(&self, ip: &str, note: &str) -> BlockResult;
}

/// Where access rules are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleScope {
    Account(String),
    Zone(String),
}

impl RuleScope {
    /// Pick the scope from configured identifiers. Account wins over zone;
    /// empty identifiers count as unset.
    pub fn select(account_id: Option<&str>, zone_id: Option<&str>) -> Option<Self> {
        fn non_empty(id: Option<&str>) -> Option<&str> {
            id.map(str::trim).filter(|s| !s.is_empty())
        }
        match (non_empty(account_id), non_empty(zone_id)) {
            (Some(account), _) => Some(RuleScope::Account(account.to_string())),
            (None, Some(zone)) => Some(RuleScope::Zone(zone.to_string())),
            (None, None) => None,
        }
    }

    /// Access rule collection URL under `base_url`.
    pub fn endpoint(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            RuleScope::Account(id) => format!("{}/accounts/{}/firewall/access_rules/rules", base, id),
            RuleScope::Zone(id) => format!("{}/zones/{}/firewall/access_rules/rules", base, id),
        }
    }
}

/// Cloudflare client configuration.
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub email: String,
    pub api_key: String,
    pub scope: RuleScope,
    pub base_url: String,
    pub timeout: Duration,
}

impl CloudflareConfig {
    pub fn new(email: impl Into<String>, api_key: impl Into<String>, scope: RuleScope) -> Self {
        Self {
            email: email.into(),
            api_key: api_key.into(),
            scope,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: set base_url.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder: set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct AccessRuleRequest<'a> {
    mode: &'static str,
    configuration: RuleConfiguration<'a>,
    notes: &'a str,
}

#[derive(Debug, Serialize)]
struct RuleConfiguration<'a> {
    target: &'static str,
    value: &'a str,
}

impl<'a> AccessRuleRequest<'a> {
    fn block(ip: &'a str, notes: &'a str) -> Self {
        Self {
            mode: "block",
            configuration: RuleConfiguration {
                target: rule_target(ip),
                value: ip,
            },
            notes,
        }
    }
}

/// Access rule target for an address: `ip6` for IPv6 literals, `ip` otherwise.
fn rule_target(ip: &str) -> &'static str {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => "ip6",
        _ => "ip",
    }
}

#[derive(Debug, Deserialize)]
struct AccessRuleResponse {
    success: Option<bool>,
}

/// Read the top-level `success` flag. Missing, non-boolean or unparseable
/// means failure.
pub fn parse_block_response(body: &str) -> bool {
    serde_json::from_str::<AccessRuleResponse>(body)
        .ok()
        .and_then(|r| r.success)
        .unwrap_or(false)
}

/// Blocking Cloudflare access-rule client.
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    http: Client,
    endpoint: String,
    config: CloudflareConfig,
}

impl CloudflareClient {
    pub fn new(config: CloudflareConfig) -> Result<Self, RemoteError> {
        if config.email.is_empty() || config.api_key.is_empty() {
            return Err(RemoteError::Config(
                "Cloudflare email and API key are required".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        let endpoint = config.scope.endpoint(&config.base_url);
        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    /// URL rules are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BlockEnforcer for CloudflareClient {
    fn block(&self, ip: &str, note: &str) -> BlockResult {
        debug!(ip, endpoint = %self.endpoint, "creating access rule");

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Auth-Email", &self.config.email)
            .header("X-Auth-Key", &self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&AccessRuleRequest::block(ip, note))
            .send();

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(ip, error = %e, "access rule request failed");
                return BlockResult::failed(e.to_string());
            }
        };

        let status = response.status();
        let raw = match response.text() {
            Ok(raw) => raw,
            Err(e) => return BlockResult::failed(e.to_string()),
        };

        let success = parse_block_response(&raw);
        if !success {
            warn!(ip, status = status.as_u16(), "access rule not created");
        }
        BlockResult { success, raw }
    }
}

/// Mock enforcer for testing.
/// Cloning creates a new handle to the same call log.
#[derive(Debug, Clone)]
pub struct MockEnforcer {
    succeed: bool,
    calls: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockEnforcer {
    /// Enforcer whose blocks all succeed.
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            calls: Arc::default(),
        }
    }

    /// Enforcer whose blocks all fail.
    pub fn failing() -> Self {
        Self {
            succeed: false,
            calls: Arc::default(),
        }
    }

    /// (ip, note) pairs blocked so far, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().unwrap().clone()
    }

    /// IPs blocked so far, in call order.
    pub fn blocked_ips(&self) -> Vec<String> {
        self.calls().into_iter().map(|(ip, _)| ip).collect()
    }
}

impl BlockEnforcer for MockEnforcer {
    fn block(&self, ip: &str, note: &str) -> BlockResult {
        self.calls
            .write()
            .unwrap()
            .push((ip.to_string(), note.to_string()));
        BlockResult {
            success: self.succeed,
            raw: format!(r#"{{"success":{}}}"#, self.succeed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    // ===========================================
    // Scope selection
    // ===========================================

    #[test]
    fn test_scope_account_takes_precedence() {
        assert_eq!(
            RuleScope::select(Some("acc"), Some("zone")),
            Some(RuleScope::Account("acc".to_string()))
        );
    }

    #[test]
    fn test_scope_zone_when_no_account() {
        assert_eq!(
            RuleScope::select(None, Some("zone")),
            Some(RuleScope::Zone("zone".to_string()))
        );
        assert_eq!(
            RuleScope::select(Some("  "), Some("zone")),
            Some(RuleScope::Zone("zone".to_string()))
        );
    }

    #[test]
    fn test_scope_trims_identifiers() {
        assert_eq!(
            RuleScope::select(Some(" acc "), Some("zone")),
            Some(RuleScope::Account("acc".to_string()))
        );
        assert_eq!(
            RuleScope::select(None, Some("\tzone\n")),
            Some(RuleScope::Zone("zone".to_string()))
        );
    }

    #[test]
    fn test_scope_none_configured() {
        assert_eq!(RuleScope::select(None, None), None);
        assert_eq!(RuleScope::select(Some(""), Some("")), None);
    }

    #[test]
    fn test_scope_endpoints() {
        assert_eq!(
            RuleScope::Account("a1".to_string()).endpoint(DEFAULT_BASE_URL),
            "https://api.cloudflare.com/client/v4/accounts/a1/firewall/access_rules/rules"
        );
        assert_eq!(
            RuleScope::Zone("z1".to_string()).endpoint("https://example.test/v4/"),
            "https://example.test/v4/zones/z1/firewall/access_rules/rules"
        );
    }

    // ===========================================
    // Request / response bodies
    // ===========================================

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(AccessRuleRequest::block("1.2.3.4", "note")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "mode": "block",
                "configuration": {"target": "ip", "value": "1.2.3.4"},
                "notes": "note"
            })
        );
    }

    #[test]
    fn test_request_body_ipv6_target() {
        let body = serde_json::to_value(AccessRuleRequest::block("2001:db8::1", "n")).unwrap();
        assert_eq!(body["configuration"]["target"], "ip6");
    }

    #[test]
    fn test_parse_block_response() {
        assert!(parse_block_response(r#"{"success":true,"errors":[],"result":{"id":"x"}}"#));
        assert!(!parse_block_response(r#"{"success":false,"errors":[{"code":10000}]}"#));
    }

    #[test]
    fn test_parse_block_response_ambiguous_is_failure() {
        assert!(!parse_block_response(r#"{"result":{"id":"x"}}"#));
        assert!(!parse_block_response(r#"{"success":"true"}"#));
        assert!(!parse_block_response(r#"{"success":null}"#));
        assert!(!parse_block_response(""));
        assert!(!parse_block_response("<html>"));
    }

    // ===========================================
    // HTTP client
    // ===========================================

    #[test]
    fn test_client_requires_credentials() {
        let config = CloudflareConfig::new("", "key", RuleScope::Zone("z".to_string()));
        assert!(matches!(
            CloudflareClient::new(config),
            Err(RemoteError::Config(_))
        ));
    }

    #[test]
    fn test_client_sends_expected_request() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/accounts/acc1/firewall/access_rules/rules")
            .match_header("x-auth-email", "ops@example.com")
            .match_header("x-auth-key", "cf-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "mode": "block",
                "configuration": {"target": "ip", "value": "203.0.113.7"},
                "notes": "Auto-blocked by script"
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"result":{"id":"r1"}}"#)
            .create();

        let config = CloudflareConfig::new(
            "ops@example.com",
            "cf-key",
            RuleScope::Account("acc1".to_string()),
        )
        .with_base_url(server.url());
        let client = CloudflareClient::new(config).expect("client");

        let result = client.block("203.0.113.7", "Auto-blocked by script");
        assert!(result.success);
        assert!(result.raw.contains("r1"));
        mock.assert();
    }

    #[test]
    fn test_client_zone_scope_posts_to_zone() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/zones/z1/firewall/access_rules/rules")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "configuration": {"target": "ip6", "value": "2001:db8::1"}
            })))
            .with_body(r#"{"success":true}"#)
            .create();

        let config = CloudflareConfig::new("e", "k", RuleScope::Zone("z1".to_string()))
            .with_base_url(server.url());
        let client = CloudflareClient::new(config).expect("client");

        assert!(client.block("2001:db8::1", "n").success);
        mock.assert();
    }

    #[test]
    fn test_client_reported_failure() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/zones/z/firewall/access_rules/rules")
            .with_status(400)
            .with_body(r#"{"success":false,"errors":[{"code":10009,"message":"duplicate"}]}"#)
            .create();

        let config = CloudflareConfig::new("e", "k", RuleScope::Zone("z".to_string()))
            .with_base_url(server.url());
        let client = CloudflareClient::new(config).expect("client");

        let result = client.block("1.2.3.4", "n");
        assert!(!result.success);
        assert!(result.raw.contains("duplicate"));
        mock.assert();
    }

    #[test]
    fn test_client_ok_status_without_flag_is_failure() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/zones/z/firewall/access_rules/rules")
            .with_body(r#"{"result":{}}"#)
            .create();

        let config = CloudflareConfig::new("e", "k", RuleScope::Zone("z".to_string()))
            .with_base_url(server.url());
        let client = CloudflareClient::new(config).expect("client");

        assert!(!client.block("1.2.3.4", "n").success);
        mock.assert();
    }

    #[test]
    fn test_client_transport_failure_is_failed_block() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = CloudflareConfig::new("e", "k", RuleScope::Zone("z".to_string()))
            .with_base_url(format!("http://127.0.0.1:{}", port))
            .with_timeout(Duration::from_secs(2));
        let client = CloudflareClient::new(config).expect("client");

        let result = client.block("1.2.3.4", "n");
        assert!(!result.success);
        assert!(!result.raw.is_empty());
    }

    // ===========================================
    // Mock
    // ===========================================

    #[test]
    fn test_mock_enforcer_records_calls() {
        let mock = MockEnforcer::failing();
        assert!(!mock.block("1.1.1.1", "note").success);
        assert_eq!(
            mock.calls(),
            vec![("1.1.1.1".to_string(), "note".to_string())]
        );

        let mock = MockEnforcer::succeeding();
        assert!(mock.block("2.2.2.2", "note").success);
        assert_eq!(mock.blocked_ips(), vec!["2.2.2.2"]);
    }
}
