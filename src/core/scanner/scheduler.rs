// src/core/scanner/scheduler.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::checker::DomainChecker;
use crate::core::models::{Findings, Issue, IssueCounts, Protocol, ScanEvent, ScanReport};

/// Worker count used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// The findings shared by all workers of one scan. Append-only.
#[derive(Debug, Clone, Default)]
pub struct FindingsCollector {
    inner: Arc<Mutex<Vec<Issue>>>,
}

impl FindingsCollector {
    /// Appends a domain's issues. The lock covers only the append.
    pub fn extend(&self, issues: Vec<Issue>) {
        if issues.is_empty() {
            return;
        }
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(issues);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the collected issues once every worker is done.
    pub fn freeze(self) -> Findings {
        let issues = match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        };
        Findings::new(issues)
    }
}

/// Optional hooks into a running scan: a progress stream and a cancellation flag.
#[derive(Debug, Default)]
pub struct ScanControl {
    pub events: Option<mpsc::UnboundedSender<ScanEvent>>,
    /// When the flag turns `true`, workers stop before starting their next domain.
    pub cancel: Option<watch::Receiver<bool>>,
}

impl ScanControl {
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| *flag.borrow())
    }
}

/// Counts finished domains and emits one event for each.
struct Progress {
    completed: AtomicUsize,
    total: usize,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl Progress {
    fn finish(&self, domain: &str, counts: IssueCounts) {
        let index = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(index, total = self.total, domain, issues = counts.total(), "Domain finished.");
        if let Some(events) = &self.events {
            // The receiver may be gone if the UI has already exited.
            let _ = events.send(ScanEvent::DomainFinished {
                index,
                total: self.total,
                domain: domain.to_string(),
                counts,
            });
        }
    }
}

/// Fans a domain list out to a fixed pool of workers.
#[derive(Clone)]
pub struct ScanScheduler {
    checker: DomainChecker,
    concurrency: usize,
}

impl ScanScheduler {
    /// `concurrency` is clamped to at least one worker.
    pub fn new(checker: DomainChecker, concurrency: usize) -> Self {
        Self {
            checker,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scans every domain to completion.
    pub async fn scan(&self, domains: Vec<String>, protocols: Vec<Protocol>) -> ScanReport {
        self.scan_with(domains, protocols, ScanControl::default()).await
    }

    /// Scans the domains, reporting progress and honouring cancellation through `control`.
    ///
    /// Returns once every started domain has finished.
    pub async fn scan_with(
        &self,
        domains: Vec<String>,
        protocols: Vec<Protocol>,
        control: ScanControl,
    ) -> ScanReport {
        let started_at = Utc::now();
        let total = domains.len();
        info!(total, workers = self.concurrency, ?protocols, "Starting scan.");

        // Seed the queue with every domain, then close it so workers stop once drained.
        let (queue_tx, queue_rx) = mpsc::channel::<String>(total.max(1));
        for domain in domains {
            if queue_tx.send(domain).await.is_err() {
                break;
            }
        }
        drop(queue_tx);

        let queue = Arc::new(tokio::sync::Mutex::new(queue_rx));
        let collector = FindingsCollector::default();
        let protocols: Arc<[Protocol]> = protocols.into();
        let ScanControl { events, cancel } = control;
        let progress = Arc::new(Progress {
            completed: AtomicUsize::new(0),
            total,
            events,
        });
        let control = Arc::new(ScanControl { events: None, cancel });

        let mut workers = JoinSet::new();
        for id in 1..=self.concurrency {
            workers.spawn(run_worker(
                id,
                queue.clone(),
                self.checker.clone(),
                protocols.clone(),
                collector.clone(),
                progress.clone(),
                control.clone(),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Scan worker exited abnormally.");
            }
        }

        let completed = progress.completed.load(Ordering::SeqCst);
        let cancelled = completed < total;
        let findings = collector.freeze();
        info!(completed, total, issues = findings.len(), cancelled, "Scan finished.");

        ScanReport {
            findings,
            domains_total: total,
            domains_completed: completed,
            protocols: protocols.to_vec(),
            started_at,
            finished_at: Utc::now(),
            cancelled,
        }
    }
}

async fn run_worker(
    id: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    checker: DomainChecker,
    protocols: Arc<[Protocol]>,
    collector: FindingsCollector,
    progress: Arc<Progress>,
    control: Arc<ScanControl>,
) {
    loop {
        if control.is_cancelled() {
            debug!(worker = id, "Cancellation requested, worker stopping.");
            break;
        }

        let next = queue.lock().await.recv().await;
        let Some(domain) = next else {
            break;
        };

        // Run the check in its own task so a panic is contained to this domain.
        let task_checker = checker.clone();
        let task_domain = domain.clone();
        let task_protocols = protocols.clone();
        let outcome =
            tokio::spawn(async move { task_checker.check(&task_domain, &task_protocols).await })
                .await;

        let counts = match outcome {
            Ok(issues) => {
                let counts = IssueCounts::of(&issues);
                collector.extend(issues);
                counts
            }
            Err(e) => {
                error!(worker = id, domain = %domain, error = %e, "Domain check aborted.");
                IssueCounts::default()
            }
        };
        progress.finish(&domain, counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::IssueKind;
    use crate::core::scanner::prober::Probe;
    use crate::core::scanner::resolver::Resolve;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Names starting with "dead" fail to resolve; "boom" panics.
    struct FakeResolver;

    #[async_trait]
    impl Resolve for FakeResolver {
        async fn resolve(&self, domain: &str) -> Option<Issue> {
            tokio::time::sleep(Duration::from_millis((domain.len() % 5) as u64)).await;
            if domain.starts_with("boom") {
                panic!("resolver fault for {}", domain);
            }
            domain
                .starts_with("dead")
                .then(|| Issue::dns(domain, "no answer"))
        }
    }

    /// Names starting with "vuln" match on http; everything else times out on every protocol.
    struct FakeProber;

    #[async_trait]
    impl Probe for FakeProber {
        async fn probe(&self, domain: &str, protocols: &[Protocol]) -> Vec<Issue> {
            protocols
                .iter()
                .map(|p| {
                    let url = format!("{}://{}/", p, domain);
                    if domain.starts_with("vuln") && *p == Protocol::Http {
                        Issue::vuln(domain, &url, "S3")
                    } else {
                        Issue::request(domain, Some(&url), "timed out")
                    }
                })
                .collect()
        }
    }

    fn scheduler(concurrency: usize) -> ScanScheduler {
        ScanScheduler::new(
            DomainChecker::new(Arc::new(FakeResolver), Arc::new(FakeProber)),
            concurrency,
        )
    }

    fn domains(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| match i % 3 {
                0 => format!("dead{}.example.com", i),
                1 => format!("vuln{}.example.com", i),
                _ => format!("slow{}.example.com", i),
            })
            .collect()
    }

    fn sorted(report: &ScanReport) -> Vec<Issue> {
        let mut issues = report.findings.clone().into_vec();
        issues.sort();
        issues
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn issue_multiset_is_independent_of_concurrency() {
        let input = domains(12);
        let baseline = scheduler(1).scan(input.clone(), Protocol::all()).await;
        // 4 dns + 4 * (vuln + request) + 4 * 2 request
        assert_eq!(baseline.findings.len(), 20);

        for concurrency in [2, 5, 12, 50] {
            let report = scheduler(concurrency).scan(input.clone(), Protocol::all()).await;
            assert_eq!(sorted(&report), sorted(&baseline), "concurrency {}", concurrency);
            assert_eq!(report.domains_completed, 12);
            assert!(!report.cancelled);
        }
    }

    #[tokio::test]
    async fn one_event_per_domain() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = domains(7);
        let report = scheduler(3)
            .scan_with(input.clone(), Protocol::all(), ScanControl::default().with_events(tx))
            .await;

        let mut indices = Vec::new();
        let mut seen = Vec::new();
        let mut live = IssueCounts::default();
        while let Ok(ScanEvent::DomainFinished { index, total, domain, counts }) = rx.try_recv() {
            assert_eq!(total, 7);
            indices.push(index);
            seen.push(domain);
            live += counts;
        }
        assert_eq!(live.dns, report.findings.count(IssueKind::Dns));
        assert_eq!(live.vuln, report.findings.count(IssueKind::Vuln));
        assert_eq!(live.request, report.findings.count(IssueKind::Request));
        assert_eq!(indices, (1..=7).collect::<Vec<_>>());
        seen.sort();
        let mut expected = input;
        expected.sort();
        assert_eq!(seen, expected);
        assert_eq!(report.domains_completed, 7);
    }

    #[tokio::test]
    async fn panicking_check_still_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = vec![
            "boom.example.com".to_string(),
            "dead.example.com".to_string(),
            "vuln.example.com".to_string(),
        ];
        let report = scheduler(2)
            .scan_with(input, vec![Protocol::Http], ScanControl::default().with_events(tx))
            .await;

        let mut events = 0;
        while rx.try_recv().is_ok() {
            events += 1;
        }
        assert_eq!(events, 3);
        assert_eq!(report.domains_completed, 3);
        assert_eq!(report.findings.count(IssueKind::Dns), 1);
        assert_eq!(report.findings.count(IssueKind::Vuln), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_domain() {
        let (cancel_tx, cancel_rx) = watch::channel(true);
        let report = scheduler(4)
            .scan_with(domains(9), Protocol::all(), ScanControl::default().with_cancel(cancel_rx))
            .await;
        drop(cancel_tx);

        assert!(report.cancelled);
        assert_eq!(report.domains_completed, 0);
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn empty_domain_list_finishes_immediately() {
        let report = scheduler(10).scan(Vec::new(), Protocol::all()).await;
        assert_eq!(report.domains_total, 0);
        assert!(report.findings.is_empty());
        assert!(!report.cancelled);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(scheduler(0).concurrency(), 1);
    }

    #[test]
    fn collector_keeps_every_append() {
        let collector = FindingsCollector::default();
        let clone = collector.clone();
        collector.extend(vec![Issue::dns("a", "x")]);
        clone.extend(vec![Issue::dns("b", "y"), Issue::dns("c", "z")]);
        collector.extend(Vec::new());
        drop(clone);
        assert_eq!(collector.freeze().len(), 3);
    }
}
