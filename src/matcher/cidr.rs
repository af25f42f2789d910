use std::net::{IpAddr, Ipv4Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use tracing::debug;

use crate::parser::Rule;

/// Matches candidate addresses against literal and CIDR rules.
///
/// The address family of the candidate picks the algorithm: IPv4 blocks are
/// checked against their network/broadcast bounds (optionally excluding both),
/// IPv6 blocks by prefix containment. A rule of the other family, or any
/// malformed rule, simply does not match.
#[derive(Debug, Clone, Copy, Default)]
pub struct CidrMatcher {
    inclusive_host_count: bool,
}

impl CidrMatcher {
    pub fn new(inclusive_host_count: bool) -> Self {
        Self {
            inclusive_host_count,
        }
    }

    pub fn inclusive_host_count(&self) -> bool {
        self.inclusive_host_count
    }

    /// Whether `address` equals `rule` or lies inside the `rule` block.
    pub fn is_in_range(&self, address: &str, rule: &str) -> bool {
        if address == rule {
            return true;
        }

        match address.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => rule
                .parse::<Ipv4Net>()
                .is_ok_and(|net| self.contains_v4(&net, ip)),
            Ok(IpAddr::V6(ip)) => rule.parse::<Ipv6Net>().is_ok_and(|net| net.contains(&ip)),
            Err(_) => false,
        }
    }

    /// Whether `address` matches a single classified rule. Hostnames never match here.
    pub fn matches(&self, address: &str, rule: &Rule) -> bool {
        match rule {
            Rule::Literal(literal) => literal == address,
            Rule::Cidr {
                prefix_len: None,
                token,
                ..
            } => token == address,
            Rule::Cidr { token, .. } => self.is_in_range(address, token),
            Rule::Hostname(_) => false,
        }
    }

    /// Whether `address` matches any of `rules`.
    ///
    /// An empty address or an empty rule list never matches.
    pub fn is_filtered(&self, address: &str, rules: &[Rule]) -> bool {
        debug!(ip = address, rules = rules.len(), "filtering IP against rule list");

        if rules.is_empty() || address.trim().is_empty() {
            return false;
        }

        rules.iter().any(|rule| self.matches(address, rule))
    }

    fn contains_v4(&self, net: &Ipv4Net, ip: Ipv4Addr) -> bool {
        let low = u32::from(net.network());
        let high = u32::from(net.broadcast());
        let ip = u32::from(ip);

        if self.inclusive_host_count {
            return low <= ip && ip <= high;
        }

        // /31 and /32 have no usable hosts
        high - low > 1 && low < ip && ip < high
    }
}
