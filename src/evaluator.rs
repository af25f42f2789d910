//! Evaluation of one rule list against the candidate addresses.
//!
//! The literal/CIDR pass runs synchronously. Hostname rules are only
//! dispatched when that pass found nothing; each one becomes a task in a
//! [`PendingChecks`] group that the caller joins exactly once.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{AclError, ResolveErrorKind, Result};
use crate::matcher::CidrMatcher;
use crate::parser::{classify, RuleSet};
use crate::resolver::{lookup, LazyResolver};
use crate::types::LookupIpVersion;

/// Outcome of resolving one hostname rule.
#[derive(Debug)]
pub enum HostCheck {
    /// A candidate is among the resolved addresses
    Matched { host: String, address: String },
    /// Resolved, but no candidate is among the addresses
    NoMatch { host: String },
    /// The lookup failed
    Failed { host: String, error: AclError },
}

/// Hostname checks dispatched for one list.
#[derive(Debug, Default)]
pub struct PendingChecks {
    tasks: JoinSet<(usize, HostCheck)>,
}

impl PendingChecks {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every check, returned in rule order.
    pub async fn join(mut self) -> Vec<HostCheck> {
        let mut checks = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(check) => checks.push(check),
                Err(e) => {
                    error!(error = %e, "hostname check task did not complete");
                    checks.push((
                        usize::MAX,
                        HostCheck::Failed {
                            host: String::new(),
                            error: AclError::resolve("", ResolveErrorKind::Other, e.to_string()),
                        },
                    ));
                }
            }
        }
        checks.sort_by_key(|(index, _)| *index);
        checks.into_iter().map(|(_, check)| check).collect()
    }
}

/// Result of [`RuleListEvaluator::evaluate`].
#[derive(Debug)]
pub struct ListEvaluation {
    /// First candidate matching a literal or CIDR rule
    pub matched: Option<String>,
    /// Hostname checks still running; empty when `matched` is set
    pub pending: PendingChecks,
}

/// Tests candidates against one rule list.
#[derive(Debug, Clone)]
pub struct RuleListEvaluator {
    matcher: CidrMatcher,
    version: LookupIpVersion,
    resolver: Arc<LazyResolver>,
}

impl RuleListEvaluator {
    pub fn new(matcher: CidrMatcher, version: LookupIpVersion, resolver: Arc<LazyResolver>) -> Self {
        Self {
            matcher,
            version,
            resolver,
        }
    }

    /// Run the synchronous pass and dispatch hostname checks if it was not decisive.
    ///
    /// Must be called within a Tokio runtime when `rules` contains hostnames.
    /// Fails only when the resolver cannot be built.
    pub fn evaluate(&self, candidates: &[String], rules: &RuleSet) -> Result<ListEvaluation> {
        let classified = classify(rules);

        let matched = candidates
            .iter()
            .find(|ip| self.matcher.is_filtered(ip, &classified.networks))
            .cloned();

        let mut pending = PendingChecks::default();
        if matched.is_some() || classified.hostnames.is_empty() {
            return Ok(ListEvaluation { matched, pending });
        }

        let resolver = self.resolver.get()?;
        let candidates: Arc<[(String, IpAddr)]> = candidates
            .iter()
            .filter_map(|c| c.parse::<IpAddr>().ok().map(|ip| (c.clone(), ip)))
            .collect();

        for (index, host) in classified.hostnames.into_iter().enumerate() {
            let resolver = resolver.clone();
            let candidates = candidates.clone();
            let version = self.version;
            pending.tasks.spawn(async move {
                let resolved = lookup(resolver.as_ref(), &host, version).await;
                let check = match resolved {
                    Ok(addrs) => match candidates.iter().find(|(_, ip)| addrs.contains(ip)) {
                        Some((address, _)) => {
                            debug!(host = %host, address = %address, "candidate matches resolved host");
                            HostCheck::Matched {
                                address: address.clone(),
                                host,
                            }
                        }
                        None => HostCheck::NoMatch { host },
                    },
                    Err(e) => {
                        error!(host = %host, error = %e, "cannot resolve host");
                        HostCheck::Failed { host, error: e }
                    }
                };
                (index, check)
            });
        }

        Ok(ListEvaluation { matched, pending })
    }
}
