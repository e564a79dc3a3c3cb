// src/core/patterns.rs

//! The catalog of "unclaimed resource" fingerprints.
//!
//! Each entry describes the error page a hosting platform serves when the
//! resource a DNS record points at no longer exists. The catalog is built once
//! at startup and only read afterwards; its order is significant because the
//! matcher stops at the first pattern that matches.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// How many of a pattern's body strings must be present for it to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every body string must occur. Used where one string alone is too generic.
    All,
    /// A single body string is enough.
    #[default]
    Any,
}

/// A fingerprint for one hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityPattern {
    /// The platform name reported in a `vuln` finding (e.g. "S3").
    pub platform: String,
    /// Accepted HTTP status codes. Empty means any status code.
    #[serde(default)]
    pub response_codes: Vec<u16>,
    /// Substrings searched for in the response body, in order.
    #[serde(default)]
    pub body_strings: Vec<String>,
    #[serde(default)]
    pub mode: MatchMode,
    /// Short guidance shown next to a match in the report views.
    #[serde(default)]
    pub remediation: String,
}

impl VulnerabilityPattern {
    pub fn new(
        platform: &str,
        response_codes: &[u16],
        body_strings: &[&str],
        mode: MatchMode,
    ) -> Self {
        Self {
            platform: platform.to_string(),
            response_codes: response_codes.to_vec(),
            body_strings: body_strings.iter().map(|s| s.to_string()).collect(),
            mode,
            remediation: String::new(),
        }
    }

    pub fn with_remediation(mut self, remediation: &str) -> Self {
        self.remediation = remediation.to_string();
        self
    }

    /// Whether a response with this status code is eligible for body matching.
    pub fn accepts_status(&self, status: u16) -> bool {
        self.response_codes.is_empty() || self.response_codes.contains(&status)
    }

    /// Applies the match mode to `body`.
    ///
    /// Evaluation short-circuits: under `All` the first missing string rejects,
    /// under `Any` the first present string accepts. An empty string list is
    /// trivially satisfied under `All` and never satisfied under `Any`.
    pub fn matches_body(&self, body: &str) -> bool {
        match self.mode {
            MatchMode::All => self.body_strings.iter().all(|s| body.contains(s.as_str())),
            MatchMode::Any => self.body_strings.iter().any(|s| body.contains(s.as_str())),
        }
    }
}

static BUILTIN_PATTERNS: Lazy<Vec<VulnerabilityPattern>> = Lazy::new(|| {
    vec![
        VulnerabilityPattern::new(
            "CloudFront",
            &[403],
            &["The request could not be satisfied."],
            MatchMode::All,
        )
        .with_remediation(
            "The CloudFront distribution this record points at no longer serves the name. \
             Remove the CNAME or attach the hostname as an alternate domain on a distribution you own.",
        ),
        VulnerabilityPattern::new(
            "Heroku",
            &[404],
            &["//www.herokucdn.com/error-pages/no-such-app.html"],
            MatchMode::All,
        )
        .with_remediation(
            "No Heroku app claims this hostname. Delete the DNS record or add the domain to an app in your account.",
        ),
        VulnerabilityPattern::new("S3", &[404], &["Code: NoSuchBucket"], MatchMode::All)
            .with_remediation(
                "The S3 bucket behind this record does not exist and can be created by anyone. \
                 Remove the record or create the bucket under your own account.",
            ),
        VulnerabilityPattern::new(
            "Tumblr",
            &[404],
            &["Not found.", "assets.tumblr.com"],
            MatchMode::All,
        )
        .with_remediation(
            "The Tumblr blog mapped to this domain is gone. Remove the record or re-map the domain from a blog you control.",
        ),
    ]
});

/// An ordered, read-only list of fingerprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternCatalog {
    patterns: Vec<VulnerabilityPattern>,
}

impl PatternCatalog {
    pub fn new(patterns: Vec<VulnerabilityPattern>) -> Self {
        Self { patterns }
    }

    /// The platforms known out of the box, in registration order.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_PATTERNS.clone())
    }

    /// The built-in catalog followed by `extra`, preserving the order of both.
    pub fn with_extra(extra: impl IntoIterator<Item = VulnerabilityPattern>) -> Self {
        let mut catalog = Self::builtin();
        catalog.patterns.extend(extra);
        catalog
    }

    pub fn iter(&self) -> impl Iterator<Item = &VulnerabilityPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Looks up a pattern by platform name.
    pub fn find(&self, platform: &str) -> Option<&VulnerabilityPattern> {
        self.patterns.iter().find(|p| p.platform == platform)
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
