// src/core/scanner/mod.rs

// This file acts as the public interface for the `scanner` module.
// It declares the pipeline stages and wires them together from a `ScanConfig`.
pub mod checker;
pub mod matcher;
pub mod prober;
pub mod resolver;
pub mod scheduler;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::ScanConfig;
use crate::core::models::ScanReport;
use crate::core::patterns::PatternCatalog;
use self::checker::DomainChecker;
use self::matcher::VulnerabilityMatcher;
use self::prober::{FetchError, HttpFetcher, HttpProber};
use self::resolver::{DnsResolver, NameserverPool};
use self::scheduler::{ScanControl, ScanScheduler};

/// Failures that stop a scan before any domain is checked.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("the nameserver pool is empty")]
    EmptyNameserverPool,
    #[error(transparent)]
    HttpClient(#[from] FetchError),
}

/// Builds the production pipeline (hickory DNS, reqwest HTTP) described by `config`.
pub fn build_scheduler(config: &ScanConfig) -> Result<ScanScheduler, SetupError> {
    let pool = NameserverPool::new(config.nameservers.iter().copied())?;
    let resolver = DnsResolver::new(&pool, config.dns_timeout());

    let catalog = Arc::new(PatternCatalog::with_extra(config.patterns.iter().cloned()));
    let matcher = VulnerabilityMatcher::new(catalog);
    let fetcher = HttpFetcher::new(&config.probe_settings())?;
    let prober = HttpProber::new(fetcher, matcher);

    let checker = DomainChecker::new(Arc::new(resolver), Arc::new(prober));
    Ok(ScanScheduler::new(checker, config.concurrency))
}

/// Executes a complete scan of `domains` with the settings in `config`.
///
/// This is the main orchestration function: it builds the pipeline, runs every
/// domain through it on a fixed worker pool and returns the frozen report.
/// Only setup can fail; per-domain problems end up as issues in the report.
pub async fn run_full_scan(
    domains: Vec<String>,
    config: &ScanConfig,
    control: ScanControl,
) -> Result<ScanReport, SetupError> {
    let scheduler = build_scheduler(config)?;
    info!(
        domains = domains.len(),
        nameservers = config.nameservers.len(),
        patterns = PatternCatalog::builtin().len() + config.patterns.len(),
        "Scan pipeline ready."
    );
    Ok(scheduler
        .scan_with(domains, config.protocols.clone(), control)
        .await)
}
