// src/core/scanner/matcher.rs

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::core::models::{Issue, ProbeResponse};
use crate::core::patterns::PatternCatalog;

/// Classifies HTTP responses against a [`PatternCatalog`].
#[derive(Debug, Clone)]
pub struct VulnerabilityMatcher {
    catalog: Arc<PatternCatalog>,
}

impl VulnerabilityMatcher {
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    /// Returns a `vuln` issue for the first pattern in catalog order that matches.
    ///
    /// The response is consumed: its body is read exactly once for all patterns.
    pub fn check(&self, domain: &str, url: &Url, response: ProbeResponse) -> Option<Issue> {
        let ProbeResponse { status, body } = response;

        for pattern in self.catalog.iter() {
            if !pattern.accepts_status(status) {
                debug!(platform = %pattern.platform, status, "Status not accepted, skipping pattern.");
                continue;
            }
            if pattern.matches_body(&body) {
                info!(%url, platform = %pattern.platform, "Response matches takeover fingerprint.");
                return Some(Issue::vuln(domain, url.as_str(), &pattern.platform));
            }
        }

        debug!(%url, status, "No fingerprint matched.");
        None
    }
}
