// src/core/scanner/checker.rs

use std::sync::Arc;

use tracing::debug;

use super::prober::Probe;
use super::resolver::Resolve;
use crate::core::models::{Issue, Protocol};

/// Per-domain pipeline: resolve first, probe only what resolves.
#[derive(Clone)]
pub struct DomainChecker {
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
}

impl DomainChecker {
    pub fn new(resolver: Arc<dyn Resolve>, prober: Arc<dyn Probe>) -> Self {
        Self { resolver, prober }
    }

    /// Returns every issue found for `domain`.
    ///
    /// A DNS issue ends the check and is the only issue returned.
    pub async fn check(&self, domain: &str, protocols: &[Protocol]) -> Vec<Issue> {
        if let Some(issue) = self.resolver.resolve(domain).await {
            debug!(domain, "Skipping probe for unresolvable domain.");
            return vec![issue];
        }
        self.prober.probe(domain, protocols).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::IssueKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoAnswer;

    #[async_trait]
    impl Resolve for NoAnswer {
        async fn resolve(&self, domain: &str) -> Option<Issue> {
            Some(Issue::dns(domain, format!("{} could not be resolved (no answer)", domain)))
        }
    }

    struct Resolves;

    #[async_trait]
    impl Resolve for Resolves {
        async fn resolve(&self, _domain: &str) -> Option<Issue> {
            None
        }
    }

    #[derive(Default)]
    struct CountingProber {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for CountingProber {
        async fn probe(&self, domain: &str, protocols: &[Protocol]) -> Vec<Issue> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            protocols
                .iter()
                .map(|p| Issue::request(domain, None, format!("{} timed out", p)))
                .collect()
        }
    }

    #[tokio::test]
    async fn dns_failure_skips_the_prober() {
        let prober = Arc::new(CountingProber::default());
        let checker = DomainChecker::new(Arc::new(NoAnswer), prober.clone());

        let issues = checker.check("dead.example.com", &Protocol::all()).await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Dns);
        assert_eq!(issues[0].domain, "dead.example.com");
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolved_domain_returns_probe_issues() {
        let prober = Arc::new(CountingProber::default());
        let checker = DomainChecker::new(Arc::new(Resolves), prober.clone());

        let issues = checker.check("unreachable.example.com", &Protocol::all()).await;

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == IssueKind::Request));
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }
}
