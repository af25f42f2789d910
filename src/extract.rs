//! Candidate address extraction.
//!
//! The transport layer exposes the caller through [`ClientInfo`]; the policy
//! configuration decides which of the observed addresses are checked.

use crate::config::FilteringConfig;
use crate::parser::ValueResolver;

/// What the transport knows about the caller.
pub trait ClientInfo: Send + Sync {
    /// Address reported by the transport for the remote peer.
    fn remote_address(&self) -> String;

    /// Raw `X-Forwarded-For` header value, if present.
    fn forwarded_for(&self) -> Option<String>;
}

/// Plain [`ClientInfo`] value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientAddress {
    pub remote_address: String,
    pub forwarded_for: Option<String>,
}

impl ClientAddress {
    pub fn new(remote_address: impl Into<String>) -> Self {
        Self {
            remote_address: remote_address.into(),
            forwarded_for: None,
        }
    }

    pub fn with_forwarded_for(mut self, header: impl Into<String>) -> Self {
        self.forwarded_for = Some(header.into());
        self
    }
}

impl ClientInfo for ClientAddress {
    fn remote_address(&self) -> String {
        self.remote_address.clone()
    }

    fn forwarded_for(&self) -> Option<String> {
        self.forwarded_for.clone()
    }
}

fn split_trimmed(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

/// Addresses to check during the request phase, in extraction order.
///
/// Custom address expression first, then every `X-Forwarded-For` hop, then
/// the remote address. Entries are trimmed but otherwise kept verbatim, empty
/// pieces included.
pub fn extract_candidates(
    config: &FilteringConfig,
    client: &dyn ClientInfo,
    values: &dyn ValueResolver,
) -> Vec<String> {
    if config.use_custom_ip_address {
        if let Some(custom) = config
            .custom_ip_address
            .as_deref()
            .and_then(|expr| values.resolve_value(expr))
        {
            return split_trimmed(&custom);
        }
    } else if config.match_all_from_x_forwarded_for {
        if let Some(header) = client.forwarded_for() {
            return split_trimmed(&header);
        }
    }
    vec![client.remote_address()]
}

/// The single address checked at connection accept.
///
/// With a custom address expression, the first non-empty comma-separated
/// entry wins; a blank expression falls back to the remote address.
pub fn extract_connect_address(
    config: &FilteringConfig,
    remote_address: &str,
    values: &dyn ValueResolver,
) -> String {
    if !config.use_custom_ip_address {
        return remote_address.to_string();
    }

    config
        .custom_ip_address
        .as_deref()
        .and_then(|expr| values.resolve_value(expr))
        .and_then(|custom| {
            custom
                .split(',')
                .map(str::trim)
                .find(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| remote_address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{LiteralValues, MapValues};

    #[test]
    fn test_remote_address_by_default() {
        let config = FilteringConfig::new();
        let client = ClientAddress::new("10.0.0.1").with_forwarded_for("1.1.1.1, 2.2.2.2");
        assert_eq!(extract_candidates(&config, &client, &LiteralValues), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_all_forwarded_for_hops() {
        let config = FilteringConfig::new().with_match_all_from_x_forwarded_for(true);
        let client = ClientAddress::new("10.0.0.1").with_forwarded_for("1.1.1.1,  unknown ,2.2.2.2");
        assert_eq!(
            extract_candidates(&config, &client, &LiteralValues),
            vec!["1.1.1.1", "unknown", "2.2.2.2"]
        );
    }

    #[test]
    fn test_missing_forwarded_for_falls_back() {
        let config = FilteringConfig::new().with_match_all_from_x_forwarded_for(true);
        let client = ClientAddress::new("10.0.0.1");
        assert_eq!(extract_candidates(&config, &client, &LiteralValues), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_custom_address_wins() {
        let config = FilteringConfig::new()
            .with_match_all_from_x_forwarded_for(true)
            .with_custom_ip_address("{#request.headers['X-Real-IP']}");
        let values = MapValues::new().with_value("{#request.headers['X-Real-IP']}", Some("3.3.3.3, 4.4.4.4"));
        let client = ClientAddress::new("10.0.0.1").with_forwarded_for("1.1.1.1");
        assert_eq!(extract_candidates(&config, &client, &values), vec!["3.3.3.3", "4.4.4.4"]);
    }

    #[test]
    fn test_custom_flag_without_expression_falls_back() {
        let config = FilteringConfig {
            use_custom_ip_address: true,
            ..FilteringConfig::default()
        };
        let client = ClientAddress::new("10.0.0.1").with_forwarded_for("1.1.1.1");
        assert_eq!(extract_candidates(&config, &client, &LiteralValues), vec!["10.0.0.1"]);
        assert_eq!(extract_connect_address(&config, "10.0.0.1", &LiteralValues), "10.0.0.1");
    }

    #[test]
    fn test_connect_address_first_non_empty() {
        let config = FilteringConfig::new().with_custom_ip_address(" , 5.5.5.5, 6.6.6.6");
        assert_eq!(extract_connect_address(&config, "10.0.0.1", &LiteralValues), "5.5.5.5");
    }

    #[test]
    fn test_connect_address_blank_falls_back() {
        let config = FilteringConfig::new().with_custom_ip_address("{#attr}");
        let values = MapValues::new().with_value("{#attr}", Some("  "));
        assert_eq!(extract_connect_address(&config, "10.0.0.1", &values), "10.0.0.1");

        let values = MapValues::new().with_value("{#attr}", None);
        assert_eq!(extract_connect_address(&config, "10.0.0.1", &values), "10.0.0.1");
    }

    #[test]
    fn test_connect_address_without_custom() {
        let config = FilteringConfig::new();
        assert_eq!(extract_connect_address(&config, "10.0.0.1", &LiteralValues), "10.0.0.1");
    }
}
