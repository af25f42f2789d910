//! Rule token handling.
//!
//! Raw configuration entries go through [`compute_rule_set`] (template
//! resolution, comma splitting, de-duplication) and then [`classify`], which
//! separates literal IP / CIDR rules from hostnames using address syntax only.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

/// Resolves a configuration value that may be a template expression.
pub trait ValueResolver: Send + Sync {
    /// Evaluate `expression`; `None` when it produces no value.
    fn resolve_value(&self, expression: &str) -> Option<String>;
}

/// Treats every expression as a plain literal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralValues;

impl ValueResolver for LiteralValues {
    fn resolve_value(&self, expression: &str) -> Option<String> {
        Some(expression.to_string())
    }
}

/// Looks expressions up in a fixed table; unknown expressions pass through as literals.
#[derive(Debug, Clone, Default)]
pub struct MapValues {
    values: HashMap<String, Option<String>>,
}

impl MapValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `expression` to `value` (`None` evaluates to nothing).
    pub fn with_value(mut self, expression: impl Into<String>, value: Option<&str>) -> Self {
        self.values
            .insert(expression.into(), value.map(|v| v.to_string()));
        self
    }
}

impl ValueResolver for MapValues {
    fn resolve_value(&self, expression: &str) -> Option<String> {
        match self.values.get(expression) {
            Some(value) => value.clone(),
            None => Some(expression.to_string()),
        }
    }
}

/// De-duplicated rule tokens of one list, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    tokens: Vec<String>,
}

impl RuleSet {
    /// Build a rule set from already-resolved tokens. Empty tokens are dropped.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let tokens = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

/// Resolve and split configured entries into a [`RuleSet`].
///
/// Null entries and entries that evaluate to nothing are skipped; a single
/// entry may carry several comma-separated tokens.
pub fn compute_rule_set(values: &dyn ValueResolver, entries: &[Option<String>]) -> RuleSet {
    RuleSet::new(
        entries
            .iter()
            .flatten()
            .filter_map(|entry| values.resolve_value(entry))
            .flat_map(|value| {
                value
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .collect::<Vec<_>>()
            }),
    )
}

/// A classified rule token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Single address, matched byte-for-byte
    Literal(String),
    /// `network/prefix`; `prefix_len` is `None` when the suffix is not a number
    Cidr {
        network: String,
        prefix_len: Option<u8>,
        token: String,
    },
    /// Anything that is not address syntax; needs DNS
    Hostname(String),
}

impl Rule {
    /// Classify a token by the address syntax of the part before the first `/`.
    pub fn parse(token: &str) -> Self {
        let (head, prefix) = match token.split_once('/') {
            Some((head, prefix)) => (head, Some(prefix)),
            None => (token, None),
        };

        if head.parse::<IpAddr>().is_err() {
            return Rule::Hostname(token.to_string());
        }

        match prefix {
            None => Rule::Literal(token.to_string()),
            Some(prefix) => Rule::Cidr {
                network: head.to_string(),
                prefix_len: prefix.parse().ok(),
                token: token.to_string(),
            },
        }
    }

    /// The original configuration token.
    pub fn token(&self) -> &str {
        match self {
            Rule::Literal(t) | Rule::Hostname(t) => t,
            Rule::Cidr { token, .. } => token,
        }
    }

    pub fn is_hostname(&self) -> bool {
        matches!(self, Rule::Hostname(_))
    }
}

/// Rules of one list split by how they are matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedRules {
    /// Literal and CIDR rules, matched synchronously
    pub networks: Vec<Rule>,
    /// Hostnames, matched after DNS resolution
    pub hostnames: Vec<String>,
}

impl ClassifiedRules {
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty() && self.hostnames.is_empty()
    }
}

/// Split a rule set into literal/CIDR rules and hostnames, keeping order.
pub fn classify(rules: &RuleSet) -> ClassifiedRules {
    let mut classified = ClassifiedRules::default();
    for token in rules.iter() {
        match Rule::parse(token) {
            Rule::Hostname(host) => classified.hostnames.push(host),
            rule => classified.networks.push(rule),
        }
    }
    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_parse() {
        assert_eq!(Rule::parse("10.0.0.1"), Rule::Literal("10.0.0.1".into()));
        assert_eq!(
            Rule::parse("10.0.0.0/8"),
            Rule::Cidr {
                network: "10.0.0.0".into(),
                prefix_len: Some(8),
                token: "10.0.0.0/8".into()
            }
        );
        assert_eq!(
            Rule::parse("2001:db8::/64"),
            Rule::Cidr {
                network: "2001:db8::".into(),
                prefix_len: Some(64),
                token: "2001:db8::/64".into()
            }
        );
        assert_eq!(Rule::parse("gravitee.io"), Rule::Hostname("gravitee.io".into()));
        assert!(Rule::parse("localhost").is_hostname());
    }

    #[test]
    fn test_rule_parse_bad_prefix_stays_network() {
        let rule = Rule::parse("10.0.0.0/abc");
        assert!(matches!(rule, Rule::Cidr { prefix_len: None, .. }));
        assert_eq!(rule.token(), "10.0.0.0/abc");
    }

    #[test]
    fn test_classify_keeps_order() {
        let rules = RuleSet::new(["b.example", "10.0.0.1", "a.example", "192.168.0.0/16"]);
        let classified = classify(&rules);
        let networks: Vec<&str> = classified.networks.iter().map(Rule::token).collect();
        assert_eq!(networks, vec!["10.0.0.1", "192.168.0.0/16"]);
        assert_eq!(classified.hostnames, vec!["b.example", "a.example"]);
    }

    #[test]
    fn test_rule_set_dedup_and_empty() {
        let rules = RuleSet::new(["1.1.1.1", "", "1.1.1.1", "2.2.2.2"]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.iter().collect::<Vec<_>>(), vec!["1.1.1.1", "2.2.2.2"]);
    }

    #[test]
    fn test_compute_rule_set_splits_and_skips_nulls() {
        let entries = vec![
            Some("1.1.1.1, 2.2.2.2".to_string()),
            None,
            Some(String::new()),
            Some("{#context.attributes['extra']}".to_string()),
            Some("{#missing}".to_string()),
        ];
        let values = MapValues::new()
            .with_value("{#context.attributes['extra']}", Some("3.3.3.3,1.1.1.1"))
            .with_value("{#missing}", None);

        let rules = compute_rule_set(&values, &entries);
        assert_eq!(
            rules.iter().collect::<Vec<_>>(),
            vec!["1.1.1.1", "2.2.2.2", "3.3.3.3"]
        );
    }

    #[test]
    fn test_compute_rule_set_literal_values() {
        let entries = vec![Some("gravitee.io".to_string())];
        let rules = compute_rule_set(&LiteralValues, &entries);
        assert_eq!(rules.iter().collect::<Vec<_>>(), vec!["gravitee.io"]);
    }
}
