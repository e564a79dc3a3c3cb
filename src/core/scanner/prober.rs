// src/core/scanner/prober.rs

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::matcher::VulnerabilityMatcher;
use crate::core::models::{Issue, ProbeResponse, Protocol};

/// Upper bound on how much of a response body is kept for matching.
pub const MAX_BODY_BYTES: usize = 512 * 1024;

/// Timeouts and identity used for every probe request.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub header_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            header_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(3),
            user_agent: format!("subtocheck-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{url}: no response headers within {timeout:?}")]
    HeaderTimeout { url: String, timeout: Duration },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Renders an error and its sources as one line, e.g. `outer: inner: root`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

/// Performs a single GET and returns the status and (bounded) body.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<ProbeResponse, FetchError>;
}

/// [`Fetch`] over `reqwest`, with certificate verification disabled.
pub struct HttpFetcher {
    client: reqwest::Client,
    header_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &ProbeSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            // Abandoned resources often serve expired or self-signed certificates.
            .danger_accept_invalid_certs(true)
            .timeout(settings.request_timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            header_timeout: settings.header_timeout,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<ProbeResponse, FetchError> {
        // `send` resolves once the response headers are in.
        let response = tokio::time::timeout(self.header_timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| FetchError::HeaderTimeout {
                url: url.to_string(),
                timeout: self.header_timeout,
            })??;

        let status = response.status().as_u16();
        debug!(%url, status, "Received HTTP response.");
        let body = read_body(response).await;
        Ok(ProbeResponse { status, body })
    }
}

/// Reads at most [`MAX_BODY_BYTES`]. A failed or timed-out read keeps what arrived so far.
async fn read_body(mut response: reqwest::Response) -> String {
    let mut buf: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = MAX_BODY_BYTES - buf.len();
                buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if buf.len() >= MAX_BODY_BYTES {
                    debug!(bytes = buf.len(), "Body truncated.");
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, bytes = buf.len(), "Body read failed, matching on partial body.");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Probes a resolved domain over each requested protocol.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, domain: &str, protocols: &[Protocol]) -> Vec<Issue>;
}

/// Fetches each protocol's URL and hands every response to the matcher.
pub struct HttpProber<F = HttpFetcher> {
    fetcher: F,
    matcher: VulnerabilityMatcher,
}

impl<F: Fetch> HttpProber<F> {
    pub fn new(fetcher: F, matcher: VulnerabilityMatcher) -> Self {
        Self { fetcher, matcher }
    }
}

#[async_trait]
impl<F: Fetch> Probe for HttpProber<F> {
    async fn probe(&self, domain: &str, protocols: &[Protocol]) -> Vec<Issue> {
        let mut issues = Vec::new();

        // Each protocol is independent: a failure on one never skips the next.
        for protocol in protocols {
            let url = match protocol.url_for(domain) {
                Ok(url) => url,
                Err(e) => {
                    warn!(domain, %protocol, error = %e, "Cannot build probe URL.");
                    issues.push(Issue::request(
                        domain,
                        None,
                        format!("{}://{}: invalid URL ({})", protocol, domain, e),
                    ));
                    continue;
                }
            };

            match self.fetcher.fetch(&url).await {
                Ok(response) => {
                    if let Some(issue) = self.matcher.check(domain, &url, response) {
                        issues.push(issue);
                    }
                }
                Err(e) => {
                    info!(%url, error = %e, "Request failed.");
                    issues.push(Issue::request(domain, Some(url.as_str()), error_chain(&e)));
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::IssueKind;
    use crate::core::patterns::PatternCatalog;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn builtin_matcher() -> VulnerabilityMatcher {
        VulnerabilityMatcher::new(Arc::new(PatternCatalog::builtin()))
    }

    fn fast_settings() -> ProbeSettings {
        ProbeSettings {
            header_timeout: Duration::from_millis(300),
            request_timeout: Duration::from_secs(1),
            ..ProbeSettings::default()
        }
    }

    /// The `host:port` of a mock server, used as the "domain" to probe.
    fn domain_of(server: &MockServer) -> String {
        server.address().to_string()
    }

    #[tokio::test]
    async fn fetcher_reads_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Code: NoSuchBucket"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let response = fetcher.fetch(&url).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "Code: NoSuchBucket");
    }

    #[tokio::test]
    async fn fetcher_times_out_waiting_for_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::HeaderTimeout { .. }));
    }

    #[tokio::test]
    async fn prober_flags_heroku_error_page() {
        let server = MockServer::start().await;
        let body = r#"<iframe src="//www.herokucdn.com/error-pages/no-such-app.html"></iframe>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(body))
            .mount(&server)
            .await;

        let prober = HttpProber::new(HttpFetcher::new(&fast_settings()).unwrap(), builtin_matcher());
        let issues = prober.probe(&domain_of(&server), &[Protocol::Http]).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Vuln);
        assert_eq!(issues[0].platform.as_deref(), Some("Heroku"));
    }

    #[tokio::test]
    async fn error_status_without_fingerprint_is_not_an_issue() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let prober = HttpProber::new(HttpFetcher::new(&fast_settings()).unwrap(), builtin_matcher());
        let issues = prober.probe(&domain_of(&server), &[Protocol::Http]).await;
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn https_failure_does_not_hide_http_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Code: NoSuchBucket"))
            .mount(&server)
            .await;

        // The mock server speaks plain HTTP, so the https probe fails at the TLS layer.
        let prober = HttpProber::new(HttpFetcher::new(&fast_settings()).unwrap(), builtin_matcher());
        let issues = prober
            .probe(&domain_of(&server), &[Protocol::Https, Protocol::Http])
            .await;
        let kinds: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![IssueKind::Request, IssueKind::Vuln]);
        assert!(issues[0].url.as_deref().is_some_and(|u| u.starts_with("https://")));
    }

    #[derive(Debug, Error)]
    #[error("error sending request")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn error_chain_joins_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(error_chain(&Outer(inner)), "error sending request: connection refused");
    }
}
