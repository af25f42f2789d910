//! Policy configuration.
//!
//! [`FilteringConfig`] is the per-policy configuration surface, deserialized
//! from JSON with the same key names the gateway uses. [`DnsConfig`] is the
//! gateway-wide DNS override read once when the resolver is built.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::types::LookupIpVersion;

/// Gateway property holding the custom DNS server host.
pub const DNS_HOST_PROPERTY: &str = "policy.ip-filtering.dns.host";
/// Gateway property holding the custom DNS server port.
pub const DNS_PORT_PROPERTY: &str = "policy.ip-filtering.dns.port";

/// IP filtering policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringConfig {
    /// Rule tokens that admit a caller. Empty means no restriction.
    #[serde(default, alias = "whitelistIps", deserialize_with = "deserialize_entries")]
    pub whitelist: Vec<Option<String>>,

    /// Rule tokens that reject a caller.
    #[serde(default, alias = "blacklistIps", deserialize_with = "deserialize_entries")]
    pub blacklist: Vec<Option<String>>,

    /// Check every X-Forwarded-For hop instead of the remote address.
    #[serde(default)]
    pub match_all_from_x_forwarded_for: bool,

    /// Take the caller address from `custom_ip_address`.
    #[serde(default, rename = "useCustomIPAddress")]
    pub use_custom_ip_address: bool,

    /// Expression producing the caller address(es), comma separated.
    #[serde(default, rename = "customIPAddress")]
    pub custom_ip_address: Option<String>,

    #[serde(default)]
    pub lookup_ip_version: LookupIpVersion,

    /// Count network and broadcast addresses of IPv4 blocks as in range.
    #[serde(default)]
    pub inclusive_host_count: bool,
}

/// A configured list entry: either a bare token or `{ "ipOrCIDR": .., "info": .. }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleEntry {
    Token(String),
    Block {
        #[serde(rename = "ipOrCIDR")]
        ip_or_cidr: Option<String>,
        #[allow(dead_code)]
        info: Option<String>,
    },
}

fn deserialize_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<Option<RuleEntry>>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            Some(RuleEntry::Token(token)) => Some(token),
            Some(RuleEntry::Block { ip_or_cidr, .. }) => ip_or_cidr,
            None => None,
        })
        .collect())
}

impl FilteringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a policy configuration from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_whitelist<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = tokens.into_iter().map(|t| Some(t.into())).collect();
        self
    }

    pub fn with_blacklist<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = tokens.into_iter().map(|t| Some(t.into())).collect();
        self
    }

    pub fn with_match_all_from_x_forwarded_for(mut self, enabled: bool) -> Self {
        self.match_all_from_x_forwarded_for = enabled;
        self
    }

    pub fn with_custom_ip_address(mut self, expression: impl Into<String>) -> Self {
        self.use_custom_ip_address = true;
        self.custom_ip_address = Some(expression.into());
        self
    }

    pub fn with_lookup_ip_version(mut self, version: LookupIpVersion) -> Self {
        self.lookup_ip_version = version;
        self
    }

    pub fn with_inclusive_host_count(mut self, inclusive: bool) -> Self {
        self.inclusive_host_count = inclusive;
        self
    }
}

/// Custom DNS server. Only used when both host and port are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl DnsConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
        }
    }

    /// Read the DNS override from flat gateway properties.
    ///
    /// An unparsable port is treated as absent, which disables the override.
    pub fn from_properties(properties: &HashMap<String, String>) -> Self {
        let host = properties
            .get(DNS_HOST_PROPERTY)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        let port = properties
            .get(DNS_PORT_PROPERTY)
            .and_then(|p| p.trim().parse::<u16>().ok());
        Self { host, port }
    }

    /// Host and port, when the override is complete.
    pub fn server(&self) -> Option<(&str, u16)> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some((host.as_str(), port)),
            _ => None,
        }
    }
}
