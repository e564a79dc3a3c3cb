// src/core/scanner/resolver.rs

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{Name, RecordType};
use hickory_resolver::TokioAsyncResolver;
use rand::Rng;
use tracing::{debug, warn};

use super::SetupError;
use crate::core::models::Issue;

/// Port every pool entry is queried on.
pub const DNS_PORT: u16 = 53;

/// Public recursive resolvers used when no pool is configured.
pub const DEFAULT_NAMESERVERS: &[IpAddr] = &[
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),         // google
    IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),         // google
    IpAddr::V4(Ipv4Addr::new(209, 244, 0, 3)),     // level3
    IpAddr::V4(Ipv4Addr::new(209, 244, 0, 4)),     // level3
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),         // cloudflare
    IpAddr::V4(Ipv4Addr::new(1, 0, 0, 1)),         // cloudflare
    IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)),         // quad9
    IpAddr::V4(Ipv4Addr::new(149, 112, 112, 112)), // quad9
];

/// A non-empty, ordered set of nameserver endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameserverPool {
    endpoints: Vec<SocketAddr>,
}

impl NameserverPool {
    pub fn new(ips: impl IntoIterator<Item = IpAddr>) -> Result<Self, SetupError> {
        let endpoints: Vec<SocketAddr> = ips
            .into_iter()
            .map(|ip| SocketAddr::new(ip, DNS_PORT))
            .collect();
        if endpoints.is_empty() {
            return Err(SetupError::EmptyNameserverPool);
        }
        Ok(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[SocketAddr] {
        &self.endpoints
    }
}

impl Default for NameserverPool {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_NAMESERVERS
                .iter()
                .map(|ip| SocketAddr::new(*ip, DNS_PORT))
                .collect(),
        }
    }
}

/// Decides whether a domain is live enough to be worth probing.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Returns the first disqualifying DNS condition for `domain`, or `None` when it resolves.
    async fn resolve(&self, domain: &str) -> Option<Issue>;
}

/// Resolves A records against one randomly chosen nameserver per call.
pub struct DnsResolver {
    nameservers: Vec<(SocketAddr, TokioAsyncResolver)>,
}

impl DnsResolver {
    /// Builds one single-upstream resolver per pool entry, so choosing a nameserver
    /// never needs a lock or a shared cursor.
    pub fn new(pool: &NameserverPool, timeout: Duration) -> Self {
        let nameservers = pool
            .endpoints()
            .iter()
            .map(|addr| (*addr, build_resolver(*addr, timeout)))
            .collect();
        Self { nameservers }
    }
}

fn build_resolver(addr: SocketAddr, timeout: Duration) -> TokioAsyncResolver {
    let group = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
    let config = ResolverConfig::from_parts(None, Vec::new(), group);

    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    // No retries: a failed exchange is reported once.
    opts.attempts = 0;
    opts.cache_size = 0;
    opts.ndots = 0;
    opts.recursion_desired = true;
    opts.use_hosts_file = false;

    TokioAsyncResolver::tokio(config, opts)
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, domain: &str) -> Option<Issue> {
        let mut name = match Name::from_str(domain) {
            Ok(name) => name,
            Err(e) => {
                warn!(domain, error = %e, "Domain is not a valid DNS name.");
                return Some(Issue::dns(domain, format!("{} could not be resolved ({})", domain, e)));
            }
        };
        name.set_fqdn(true);

        // Index into a non-empty pool.
        let (nameserver, resolver) = &self.nameservers[pick(self.nameservers.len())];
        debug!(domain, %nameserver, "Querying A record.");

        let outcome = resolver.lookup(name, RecordType::A).await;
        let issue = classify(domain, nameserver, outcome.map(|lookup| lookup.records().len()));
        if let Some(issue) = &issue {
            warn!(domain, %nameserver, cause = %issue.cause, "Resolution failed.");
        }
        issue
    }
}

/// Picks an index with a per-call random source; no state is shared between callers.
fn pick(len: usize) -> usize {
    rand::rng().random_range(0..len)
}

/// Maps a lookup outcome (the number of answer records, or the error) onto a DNS issue.
fn classify(
    domain: &str,
    nameserver: &SocketAddr,
    outcome: Result<usize, ResolveError>,
) -> Option<Issue> {
    let ns = nameserver.ip();
    match outcome {
        Ok(0) => Some(no_answer(domain, ns)),
        Ok(_) => None,
        Err(e) => match e.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. }
                if *response_code == ResponseCode::NoError =>
            {
                Some(no_answer(domain, ns))
            }
            ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(Issue::dns(
                domain,
                format!("{} could not be resolved ({} from {})", domain, response_code, ns),
            )),
            _ => Some(Issue::dns(
                domain,
                format!("{} could not be resolved ({})", domain, e),
            )),
        },
    }
}

fn no_answer(domain: &str, ns: IpAddr) -> Issue {
    Issue::dns(
        domain,
        format!("{} could not be resolved (no answer from {})", domain, ns),
    )
}
