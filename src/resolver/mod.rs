//! DNS resolver module.
//!
//! Hostname rules are resolved through the [`Resolver`] trait. [`lookup`]
//! applies the configured [`LookupIpVersion`] policy on top of the raw A and
//! AAAA queries, and [`LazyResolver`] builds the concrete resolver the first
//! time a hostname rule actually needs it.

mod system;

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::DnsConfig;
use crate::error::{AclError, ResolveErrorKind, Result};
use crate::types::LookupIpVersion;

pub use system::SystemResolver;

/// DNS resolver interface.
///
/// An `Ok` with an empty list means the name exists but has no record of the
/// requested type; failures (NXDOMAIN, timeouts, I/O) are errors.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve A records.
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<IpAddr>>;

    /// Resolve AAAA records.
    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<IpAddr>>;
}

/// Resolve `host` according to `version`.
///
/// `All` queries A first and only falls back to AAAA when the A lookup fails
/// or comes back empty; the AAAA result is then returned as-is.
pub async fn lookup(
    resolver: &dyn Resolver,
    host: &str,
    version: LookupIpVersion,
) -> Result<Vec<IpAddr>> {
    match version {
        LookupIpVersion::Ipv4 => resolver.lookup_ipv4(host).await,
        LookupIpVersion::Ipv6 => resolver.lookup_ipv6(host).await,
        LookupIpVersion::All => {
            match resolver.lookup_ipv4(host).await {
                Ok(addrs) if !addrs.is_empty() => return Ok(addrs),
                Ok(_) => debug!(host, "no A record, trying AAAA"),
                Err(e) => debug!(host, error = %e, "A lookup failed, trying AAAA"),
            }
            resolver.lookup_ipv6(host).await
        }
    }
}

type ResolverFactory = dyn Fn(&DnsConfig) -> Result<Arc<dyn Resolver>> + Send + Sync;

/// Resolver built on first use and shared afterwards.
///
/// The DNS configuration is captured at construction. A failed build is
/// reported to the caller and attempted again on the next use.
pub struct LazyResolver {
    config: DnsConfig,
    factory: Box<ResolverFactory>,
    resolver: OnceCell<Arc<dyn Resolver>>,
}

impl LazyResolver {
    /// Lazily build a [`SystemResolver`] from `config`.
    pub fn new(config: DnsConfig) -> Self {
        Self::with_factory(config, |config| {
            Ok(Arc::new(SystemResolver::new(config)?) as Arc<dyn Resolver>)
        })
    }

    /// Lazily build the resolver with a custom factory.
    pub fn with_factory<F>(config: DnsConfig, factory: F) -> Self
    where
        F: Fn(&DnsConfig) -> Result<Arc<dyn Resolver>> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            resolver: OnceCell::new(),
        }
    }

    /// Use an already constructed resolver.
    pub fn from_resolver(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            config: DnsConfig::default(),
            factory: Box::new(|_: &DnsConfig| {
                Err(AclError::ResolverInit(
                    "resolver was supplied pre-built".to_string(),
                ))
            }),
            resolver: OnceCell::with_value(resolver),
        }
    }

    /// The shared resolver, building it if this is the first use.
    ///
    /// The build runs on the calling thread and may read the platform
    /// resolver configuration. Concurrent first callers block until it
    /// finishes. Later calls only clone the `Arc`.
    pub fn get(&self) -> Result<Arc<dyn Resolver>> {
        self.resolver
            .get_or_try_init(|| {
                debug!(server = ?self.config.server(), "creating DNS resolver");
                (self.factory)(&self.config)
            })
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.resolver.get().is_some()
    }

    pub fn config(&self) -> &DnsConfig {
        &self.config
    }
}

impl fmt::Debug for LazyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResolver")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// DNS record type of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    Aaaa,
}

#[derive(Debug, Clone)]
enum Answer {
    Addrs(Vec<IpAddr>),
    Fail(ResolveErrorKind),
}

impl Default for Answer {
    fn default() -> Self {
        Answer::Addrs(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
struct HostRecords {
    a: Answer,
    aaaa: Answer,
}

/// Static resolver with predefined answers.
///
/// Unknown hosts fail with [`ResolveErrorKind::NotFound`]. Every query is
/// recorded and can be inspected with [`StaticResolver::queries`].
#[derive(Debug, Default)]
pub struct StaticResolver {
    records: HashMap<String, HostRecords>,
    queries: Mutex<Vec<(String, RecordKind)>>,
}

impl StaticResolver {
    /// Create a new empty static resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer A queries for `host` with `addrs`.
    pub fn with_ipv4(mut self, host: impl Into<String>, addrs: &[Ipv4Addr]) -> Self {
        self.records.entry(host.into()).or_default().a =
            Answer::Addrs(addrs.iter().map(|a| IpAddr::V4(*a)).collect());
        self
    }

    /// Answer AAAA queries for `host` with `addrs`.
    pub fn with_ipv6(mut self, host: impl Into<String>, addrs: &[Ipv6Addr]) -> Self {
        self.records.entry(host.into()).or_default().aaaa =
            Answer::Addrs(addrs.iter().map(|a| IpAddr::V6(*a)).collect());
        self
    }

    /// Fail A queries for `host`.
    pub fn with_ipv4_failure(mut self, host: impl Into<String>, kind: ResolveErrorKind) -> Self {
        self.records.entry(host.into()).or_default().a = Answer::Fail(kind);
        self
    }

    /// Fail AAAA queries for `host`.
    pub fn with_ipv6_failure(mut self, host: impl Into<String>, kind: ResolveErrorKind) -> Self {
        self.records.entry(host.into()).or_default().aaaa = Answer::Fail(kind);
        self
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<(String, RecordKind)> {
        self.queries.lock().clone()
    }

    fn answer(&self, host: &str, kind: RecordKind) -> Result<Vec<IpAddr>> {
        self.queries.lock().push((host.to_string(), kind));

        let records = self.records.get(host).ok_or_else(|| {
            AclError::resolve(host, ResolveErrorKind::NotFound, "host not found")
        })?;
        let answer = match kind {
            RecordKind::A => &records.a,
            RecordKind::Aaaa => &records.aaaa,
        };
        match answer {
            Answer::Addrs(addrs) => Ok(addrs.clone()),
            Answer::Fail(kind) => Err(AclError::resolve(host, *kind, "lookup failed")),
        }
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<IpAddr>> {
        self.answer(host, RecordKind::A)
    }

    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<IpAddr>> {
        self.answer(host, RecordKind::Aaaa)
    }
}
