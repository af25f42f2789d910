//! Connection-accept filtering.
//!
//! Runs before authentication where no network I/O is allowed: one candidate
//! address, literal and CIDR rules only, no resolver.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::config::FilteringConfig;
use crate::error::{AclError, Result};
use crate::extract::extract_connect_address;
use crate::matcher::CidrMatcher;
use crate::parser::{classify, compute_rule_set, ValueResolver};

/// Synchronous filter for incoming connections.
#[derive(Debug)]
pub struct ConnectGuard {
    config: FilteringConfig,
    matcher: CidrMatcher,
    hostnames_reported: AtomicBool,
}

impl ConnectGuard {
    pub fn new(config: FilteringConfig) -> Self {
        let matcher = CidrMatcher::new(config.inclusive_host_count);
        Self {
            config,
            matcher,
            hostnames_reported: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &FilteringConfig {
        &self.config
    }

    /// Accept or interrupt a connection from `remote_address`.
    ///
    /// Hostname rules are ignored here; the first time any are seen a warning
    /// lists them.
    pub fn on_connect(&self, remote_address: &str, values: &dyn ValueResolver) -> Result<()> {
        let address = extract_connect_address(&self.config, remote_address, values);

        let blacklist = classify(&compute_rule_set(values, &self.config.blacklist));
        let whitelist = classify(&compute_rule_set(values, &self.config.whitelist));

        if (!blacklist.hostnames.is_empty() || !whitelist.hostnames.is_empty())
            && !self.hostnames_reported.swap(true, Ordering::Relaxed)
        {
            warn!(
                blacklist = ?blacklist.hostnames,
                whitelist = ?whitelist.hostnames,
                "hostnames are not supported when filtering at connection time, only IP addresses and CIDR ranges are evaluated"
            );
        }

        if self.matcher.is_filtered(&address, &blacklist.networks) {
            return Err(interrupt(format!(
                "IP {} is blacklisted and not allowed to connect",
                address
            )));
        }

        if !whitelist.networks.is_empty() && !self.matcher.is_filtered(&address, &whitelist.networks) {
            return Err(interrupt(format!("IP {} is not whitelisted", address)));
        }

        Ok(())
    }
}

fn interrupt(reason: String) -> AclError {
    debug!(reason = %reason, "connection interrupted");
    AclError::ConnectionInterrupted { reason }
}
