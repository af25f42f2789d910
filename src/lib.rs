//! IP Filter Engine - blacklist/whitelist access control for gateways and proxies
//!
//! Decides ALLOW or DENY for a caller from its address(es) and two rule lists:
//! - Literal IPv4/IPv6 addresses
//! - CIDR blocks, with optional inclusion of IPv4 network/broadcast addresses
//! - Hostnames, resolved through DNS (A, AAAA, or A with AAAA fallback)
//!
//! Two entry points:
//! - [`DecisionEngine`] for the request phase, where hostname rules are
//!   resolved concurrently
//! - [`ConnectGuard`] for connection accept, fully synchronous and without DNS
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ip_filter_engine::{
//!     ClientAddress, DecisionEngine, FilteringConfig, LazyResolver, LiteralValues, StaticResolver,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = FilteringConfig::new()
//!     .with_blacklist(["192.168.0.0/24"])
//!     .with_whitelist(["10.0.0.0/8"]);
//!
//! let resolver = Arc::new(LazyResolver::from_resolver(Arc::new(StaticResolver::new())));
//! let engine = DecisionEngine::new(config, resolver);
//!
//! let verdict = engine
//!     .on_request(&ClientAddress::new("10.1.2.3"), &LiteralValues)
//!     .await
//!     .unwrap();
//! assert!(verdict.is_allowed());
//! # });
//! ```
//!
//! # Rule Syntax
//!
//! | Type | Example | Matching |
//! |------|---------|----------|
//! | IP | `1.2.3.4` | Exact string equality |
//! | CIDR | `192.168.0.0/16` | Range check in the candidate's family |
//! | Hostname | `gravitee.io` | Candidate among the resolved addresses |
//!
//! A configured entry may hold several comma-separated tokens.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod guard;
pub mod matcher;
pub mod parser;
pub mod resolver;
pub mod types;

// Re-export commonly used items
pub use config::{DnsConfig, FilteringConfig, DNS_HOST_PROPERTY, DNS_PORT_PROPERTY};
pub use engine::DecisionEngine;
pub use error::{AclError, ResolveErrorKind, Result};
pub use evaluator::{HostCheck, ListEvaluation, PendingChecks, RuleListEvaluator};
pub use extract::{extract_candidates, extract_connect_address, ClientAddress, ClientInfo};
pub use guard::ConnectGuard;
pub use matcher::CidrMatcher;
pub use parser::{
    classify, compute_rule_set, ClassifiedRules, LiteralValues, MapValues, Rule, RuleSet,
    ValueResolver,
};
pub use types::{EvaluationOutcome, ListKind, LookupIpVersion, Rejection, Verdict, FORBIDDEN_STATUS};

// Re-export resolver types
pub use resolver::{lookup, LazyResolver, RecordKind, Resolver, StaticResolver, SystemResolver};

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_full_workflow() {
        let config = FilteringConfig::from_json(
            r#"{
                "blacklist": ["192.168.0.0/24", "bad.example"],
                "whitelist": ["10.0.0.0/8, partner.example", null],
                "matchAllFromXForwardedFor": true
            }"#,
        )
        .unwrap();

        let resolver = StaticResolver::new()
            .with_ipv4("bad.example", &[Ipv4Addr::new(6, 6, 6, 6)])
            .with_ipv4("partner.example", &[Ipv4Addr::new(172, 16, 0, 9)]);
        let engine = DecisionEngine::new(
            config,
            Arc::new(LazyResolver::from_resolver(Arc::new(resolver))),
        );

        // Whitelisted CIDR
        let client = ClientAddress::new("127.0.0.1").with_forwarded_for("10.1.1.1");
        assert!(engine.on_request(&client, &LiteralValues).await.unwrap().is_allowed());

        // Whitelisted through hostname
        let client = ClientAddress::new("127.0.0.1").with_forwarded_for("172.16.0.9");
        assert!(engine.on_request(&client, &LiteralValues).await.unwrap().is_allowed());

        // Blacklisted hop anywhere in the chain
        let client = ClientAddress::new("127.0.0.1").with_forwarded_for("10.1.1.1, 192.168.0.7");
        let verdict = engine.on_request(&client, &LiteralValues).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(Rejection::forbidden("192.168.0.7")));

        // Blacklisted through hostname
        let client = ClientAddress::new("127.0.0.1").with_forwarded_for("10.1.1.1, 6.6.6.6");
        let verdict = engine.on_request(&client, &LiteralValues).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(Rejection::forbidden("10.1.1.1, 6.6.6.6")));

        // Not whitelisted
        let client = ClientAddress::new("127.0.0.1").with_forwarded_for("8.8.8.8, unknown");
        let verdict = engine.on_request(&client, &LiteralValues).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(Rejection::forbidden("8.8.8.8, unknown")));
    }
}
