//! Remote collaborators for logban.
//!
//! Provides:
//! - `ReputationLookup` trait with the AbuseIPDB client and a mock
//! - `BlockEnforcer` trait with the Cloudflare access-rule client and a mock
//!
//! Both HTTP clients are blocking and carry a bounded request timeout.

pub mod error;
pub mod firewall;
pub mod reputation;

pub use error::RemoteError;
pub use firewall::{
    parse_block_response, BlockEnforcer, BlockResult, CloudflareClient, CloudflareConfig,
    MockEnforcer, RuleScope,
};
pub use reputation::{
    parse_score, AbuseIpDbClient, AbuseIpDbConfig, MockReputation, ReputationLookup,
};

/// User agent sent by both clients.
pub const USER_AGENT: &str = concat!("logban/", env!("CARGO_PKG_VERSION"));
