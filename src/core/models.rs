// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use url::Url;

// --- Issue Classification ---

/// The three classes of finding a scan can produce.
///
/// The variant order is the order the report groups are rendered in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssueKind {
    /// The HTTP request for a resolved domain failed at the transport level.
    Request,
    /// The domain could not be resolved.
    Dns,
    /// The HTTP response matched an unclaimed-resource fingerprint.
    Vuln,
}

impl IssueKind {
    /// Heading used by the report views for this group of issues.
    pub fn title(&self) -> &'static str {
        match self {
            IssueKind::Request => "Request issues",
            IssueKind::Dns => "DNS issues",
            IssueKind::Vuln => "Potential vulnerabilities",
        }
    }
}

/// A single finding. Created once by the resolver, prober or matcher and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub domain: String,
    pub url: Option<String>,
    pub cause: String,
    /// Set only for `vuln` issues: the platform whose fingerprint matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl Issue {
    pub fn dns(domain: &str, cause: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Dns,
            domain: domain.to_string(),
            url: None,
            cause: cause.into(),
            platform: None,
        }
    }

    pub fn request(domain: &str, url: Option<&str>, cause: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Request,
            domain: domain.to_string(),
            url: url.map(str::to_string),
            cause: cause.into(),
            platform: None,
        }
    }

    pub fn vuln(domain: &str, url: &str, platform: &str) -> Self {
        Self {
            kind: IssueKind::Vuln,
            domain: domain.to_string(),
            url: Some(url.to_string()),
            cause: format!("matches fingerprint for platform {}", platform),
            platform: Some(platform.to_string()),
        }
    }
}

// --- Probing ---

/// The protocols a domain can be probed over.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Every supported protocol, in probing order (`http` then `https`).
    pub fn all() -> Vec<Protocol> {
        Protocol::iter().collect()
    }

    /// Builds the probe URL by prefixing the domain with this protocol's scheme.
    pub fn url_for(&self, domain: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}", self, domain))
    }
}

/// What a probe hands to the matcher: the status code and the body text, read once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

// --- Findings ---

/// The frozen set of issues produced by one scan run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Findings {
    issues: Vec<Issue>,
}

impl Findings {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Issues ordered by report group (request, dns, vuln), keeping discovery order within a group.
    pub fn grouped(&self) -> Vec<&Issue> {
        IssueKind::iter().flat_map(|kind| self.of_kind(kind)).collect()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

// --- Progress ---

/// Issue tallies per kind, for one domain or accumulated over a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueCounts {
    pub request: usize,
    pub dns: usize,
    pub vuln: usize,
}

impl IssueCounts {
    pub fn of(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.kind {
                IssueKind::Request => counts.request += 1,
                IssueKind::Dns => counts.dns += 1,
                IssueKind::Vuln => counts.vuln += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.request + self.dns + self.vuln
    }
}

impl std::ops::AddAssign for IssueCounts {
    fn add_assign(&mut self, other: Self) {
        self.request += other.request;
        self.dns += other.dns;
        self.vuln += other.vuln;
    }
}

/// Progress notifications emitted by the scheduler while a scan runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Emitted exactly once per finished domain, in completion order.
    /// `index` is the 1-based completion ordinal.
    DomainFinished {
        index: usize,
        total: usize,
        domain: String,
        counts: IssueCounts,
    },
}

// --- Main Report ---

/// The result of a scan run: the frozen findings plus run metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub findings: Findings,
    pub domains_total: usize,
    pub domains_completed: usize,
    pub protocols: Vec<Protocol>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn vulnerable_count(&self) -> usize {
        self.findings.count(IssueKind::Vuln)
    }
}
