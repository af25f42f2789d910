use serde::{Deserialize, Serialize};

/// HTTP status carried by every rejection.
pub const FORBIDDEN_STATUS: u16 = 403;

/// Which record types a hostname rule is resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LookupIpVersion {
    /// A records only
    #[serde(rename = "IPV4")]
    Ipv4,
    /// AAAA records only
    #[serde(rename = "IPV6")]
    Ipv6,
    /// A records, falling back to AAAA only when A yields nothing
    #[default]
    #[serde(rename = "ALL")]
    All,
}

/// The two rule lists of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Blacklist,
    Whitelist,
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListKind::Blacklist => f.write_str("blacklist"),
            ListKind::Whitelist => f.write_str("whitelist"),
        }
    }
}

/// Rejection handed back to the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Always [`FORBIDDEN_STATUS`]
    pub status: u16,
    /// Human-readable reason
    pub message: String,
}

impl Rejection {
    /// Rejection citing `addresses` exactly as extracted.
    pub fn forbidden(addresses: &str) -> Self {
        Self {
            status: FORBIDDEN_STATUS,
            message: format!(
                "Your IP ({}) or some proxies whereby your request pass through are not allowed to reach this resource.",
                addresses
            ),
        }
    }
}

/// Final decision of one evaluation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Rejection),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny(r) => Some(r),
        }
    }
}

/// Per-list outcome once every hostname check of the list has been folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// A candidate matched; carries the matching candidate (or the joined
    /// candidate list when the match came from hostname checks)
    Deny(String),
    Allow,
    /// The list holds no rule
    Indeterminate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ip_version_serde_names() {
        let v: LookupIpVersion = serde_json::from_str("\"IPV6\"").unwrap();
        assert_eq!(v, LookupIpVersion::Ipv6);
        assert_eq!(serde_json::to_string(&LookupIpVersion::All).unwrap(), "\"ALL\"");
        assert_eq!(LookupIpVersion::default(), LookupIpVersion::All);
    }

    #[test]
    fn test_forbidden_message() {
        let r = Rejection::forbidden("10.0.0.1, unknown");
        assert_eq!(r.status, 403);
        assert_eq!(
            r.message,
            "Your IP (10.0.0.1, unknown) or some proxies whereby your request pass through are not allowed to reach this resource."
        );
    }
}
