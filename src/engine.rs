//! Request-phase decision engine.
//!
//! Blacklist first, then whitelist. Within a list the literal/CIDR pass can
//! decide on its own; otherwise every dispatched hostname check is awaited
//! before the list's outcome is fixed.

use std::sync::Arc;

use tracing::debug;

use crate::config::{DnsConfig, FilteringConfig};
use crate::error::Result;
use crate::evaluator::{HostCheck, RuleListEvaluator};
use crate::extract::{extract_candidates, ClientInfo};
use crate::matcher::CidrMatcher;
use crate::parser::{compute_rule_set, RuleSet, ValueResolver};
use crate::resolver::LazyResolver;
use crate::types::{EvaluationOutcome, ListKind, Rejection, Verdict};

/// Decides ALLOW or DENY for a request.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: FilteringConfig,
    evaluator: RuleListEvaluator,
}

impl DecisionEngine {
    /// Create an engine sharing `resolver` with other engines of the same context.
    pub fn new(config: FilteringConfig, resolver: Arc<LazyResolver>) -> Self {
        let evaluator = RuleListEvaluator::new(
            CidrMatcher::new(config.inclusive_host_count),
            config.lookup_ip_version,
            resolver,
        );
        Self { config, evaluator }
    }

    /// Create an engine with its own lazily built system resolver.
    pub fn with_dns_config(config: FilteringConfig, dns: DnsConfig) -> Self {
        Self::new(config, Arc::new(LazyResolver::new(dns)))
    }

    pub fn config(&self) -> &FilteringConfig {
        &self.config
    }

    /// Extract the caller's addresses, resolve the configured lists and evaluate.
    pub async fn on_request(
        &self,
        client: &dyn ClientInfo,
        values: &dyn ValueResolver,
    ) -> Result<Verdict> {
        let candidates = extract_candidates(&self.config, client, values);
        let blacklist = compute_rule_set(values, &self.config.blacklist);
        let whitelist = compute_rule_set(values, &self.config.whitelist);
        self.evaluate(&candidates, &blacklist, &whitelist).await
    }

    /// Evaluate `candidates` against already computed lists.
    ///
    /// Errors only when hostname rules are present and the resolver cannot be
    /// built; DNS failures are folded into the verdict.
    pub async fn evaluate(
        &self,
        candidates: &[String],
        blacklist: &RuleSet,
        whitelist: &RuleSet,
    ) -> Result<Verdict> {
        if let EvaluationOutcome::Deny(addresses) = self.check_blacklist(candidates, blacklist).await? {
            debug!(list = %ListKind::Blacklist, addresses = %addresses, "request denied");
            return Ok(Verdict::Deny(Rejection::forbidden(&addresses)));
        }

        if let EvaluationOutcome::Deny(addresses) = self.check_whitelist(candidates, whitelist).await? {
            debug!(list = %ListKind::Whitelist, addresses = %addresses, "request denied");
            return Ok(Verdict::Deny(Rejection::forbidden(&addresses)));
        }

        debug!(candidates = ?candidates, "request allowed");
        Ok(Verdict::Allow)
    }

    /// A literal/CIDR match, a hostname match, or a failed lookup all deny.
    async fn check_blacklist(&self, candidates: &[String], rules: &RuleSet) -> Result<EvaluationOutcome> {
        if rules.is_empty() {
            return Ok(EvaluationOutcome::Indeterminate);
        }

        let evaluation = self.evaluator.evaluate(candidates, rules)?;
        if let Some(ip) = evaluation.matched {
            return Ok(EvaluationOutcome::Deny(ip));
        }

        let checks = evaluation.pending.join().await;
        let denied = checks
            .iter()
            .any(|check| matches!(check, HostCheck::Matched { .. } | HostCheck::Failed { .. }));
        if denied {
            return Ok(EvaluationOutcome::Deny(candidates.join(", ")));
        }
        Ok(EvaluationOutcome::Allow)
    }

    /// Only a literal/CIDR match or a hostname match admits; failed lookups do not.
    async fn check_whitelist(&self, candidates: &[String], rules: &RuleSet) -> Result<EvaluationOutcome> {
        if rules.is_empty() {
            return Ok(EvaluationOutcome::Indeterminate);
        }

        let evaluation = self.evaluator.evaluate(candidates, rules)?;
        if evaluation.matched.is_some() {
            return Ok(EvaluationOutcome::Allow);
        }

        let checks = evaluation.pending.join().await;
        if checks.iter().any(|check| matches!(check, HostCheck::Matched { .. })) {
            return Ok(EvaluationOutcome::Allow);
        }
        Ok(EvaluationOutcome::Deny(candidates.join(", ")))
    }
}
