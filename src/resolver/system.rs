use std::net::{IpAddr, ToSocketAddrs};

use async_trait::async_trait;
use tracing::debug;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind as DnsErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

use super::Resolver;
use crate::config::DnsConfig;
use crate::error::{AclError, ResolveErrorKind, Result};

/// DNS resolver backed by trust-dns.
///
/// Targets the configured server when [`DnsConfig`] names one, the platform
/// resolver configuration otherwise. Queries are sent with recursion desired.
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn new(config: &DnsConfig) -> Result<Self> {
        let inner = match config.server() {
            Some((host, port)) => {
                let ips = server_ips(host, port)?;
                debug!(host, ?ips, port, "using custom DNS server");
                let servers = NameServerConfigGroup::from_ips_clear(&ips, port, true);
                TokioAsyncResolver::tokio(
                    ResolverConfig::from_parts(None, vec![], servers),
                    ResolverOpts::default(),
                )
            }
            None => TokioAsyncResolver::tokio_from_system_conf()
                .map_err(|e| AclError::ResolverInit(e.to_string()))?,
        };
        Ok(Self { inner })
    }
}

/// Addresses of the configured DNS server. A name is resolved once here
/// through the platform resolver.
fn server_ips(host: &str, port: u16) -> Result<Vec<IpAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| AclError::ResolverInit(format!("Cannot resolve DNS server '{}': {}", host, e)))?;

    let mut ips: Vec<IpAddr> = Vec::new();
    for addr in addrs {
        if !ips.contains(&addr.ip()) {
            ips.push(addr.ip());
        }
    }
    if ips.is_empty() {
        return Err(AclError::ResolverInit(format!(
            "DNS server '{}' has no addresses",
            host
        )));
    }
    Ok(ips)
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<IpAddr>> {
        match self.inner.ipv4_lookup(host).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| IpAddr::V4(a.0)).collect()),
            Err(e) => empty_or_error(host, e),
        }
    }

    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<IpAddr>> {
        match self.inner.ipv6_lookup(host).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| IpAddr::V6(a.0)).collect()),
            Err(e) => empty_or_error(host, e),
        }
    }
}

/// A NOERROR answer without records is an empty result, not a failure.
fn empty_or_error(host: &str, err: ResolveError) -> Result<Vec<IpAddr>> {
    let kind = match err.kind() {
        DnsErrorKind::NoRecordsFound { response_code, .. } if *response_code == ResponseCode::NoError => {
            return Ok(Vec::new());
        }
        DnsErrorKind::NoRecordsFound { .. } => ResolveErrorKind::NotFound,
        DnsErrorKind::Timeout => ResolveErrorKind::Timeout,
        DnsErrorKind::Io(_) | DnsErrorKind::NoConnections => ResolveErrorKind::Io,
        DnsErrorKind::Proto(_) => ResolveErrorKind::Protocol,
        _ => ResolveErrorKind::Other,
    };
    Err(AclError::resolve(host, kind, err.to_string()))
}
