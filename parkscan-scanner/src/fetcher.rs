use crate::error::{Result, ScanError};
use crate::outcome::FetchOutcome;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, Response, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Mobile; ALCATELOneTouch4012X; rv:18.1) Gecko/18.1 Firefox/18.1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

const ACCEPT_TYPES: &str = "text/html,application/xml,application/xhtml+xml";

/// Fetches a target and resolves redirects itself, so that every hop can be
/// checked against the cross-domain policy before it is requested.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: Client,
    accept_new_domain: bool,
    max_redirects: usize,
}

#[derive(Debug, Clone)]
pub struct FetcherBuilder {
    timeout: Duration,
    insecure: bool,
    accept_new_domain: bool,
    max_redirects: usize,
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            insecure: false,
            accept_new_domain: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl FetcherBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip TLS certificate verification. This is an explicit security
    /// downgrade: any certificate, including self-signed or expired ones, is
    /// accepted.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_accept_new_domain(mut self, accept_new_domain: bool) -> Self {
        self.accept_new_domain = accept_new_domain;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn build(self) -> Result<Fetcher> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_TYPES));

        if self.insecure {
            warn!("TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.timeout)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(self.insecure)
            .build()
            .map_err(|e| ScanError::ClientBuild(e.to_string()))?;

        Ok(Fetcher {
            client,
            accept_new_domain: self.accept_new_domain,
            max_redirects: self.max_redirects,
        })
    }
}

impl Fetcher {
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// Fetch `url`, following permitted redirects, and settle on exactly one
    /// outcome. Never returns an error: failures are an outcome like any other.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.follow(url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Fetch of {} failed: {}", url, e);
                FetchOutcome::Failed(e.to_string())
            }
        }
    }

    async fn follow(&self, start_url: &str) -> Result<FetchOutcome> {
        let mut current = Url::parse(start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("'{}': {}", start_url, e)))?;
        let mut visited = HashSet::new();
        let mut hops = 0;

        loop {
            if !visited.insert(current.to_string()) {
                info!("Redirect loop detected at {}", current);
                return Ok(FetchOutcome::failed(format!("redirect loop at {}", current)));
            }

            debug!("Fetching {} (hop {})", current, hops);
            let response = self.client.get(current.clone()).send().await?;

            let Some(location) = redirect_location(&response) else {
                let status = response.status();
                let body = response.text().await?;
                debug!("{} answered {} with {} bytes", current, status, body.len());
                return Ok(FetchOutcome::Body(body));
            };

            let next = current.join(&location).map_err(|e| {
                ScanError::InvalidUrl(format!("redirect location '{}': {}", location, e))
            })?;

            if !redirect_allowed(&current, &next, self.accept_new_domain) {
                info!("Not following {} -> {}: different domain", current, next);
                return Ok(FetchOutcome::blocked(format!(
                    "redirect from {} to {} leaves the domain",
                    host_authority(&current),
                    host_authority(&next)
                )));
            }

            hops += 1;
            if hops > self.max_redirects {
                info!("Giving up on {} after {} redirects", start_url, self.max_redirects);
                return Ok(FetchOutcome::failed(format!(
                    "too many redirects (limit {})",
                    self.max_redirects
                )));
            }

            debug!("Following redirect {} -> {}", current, next);
            current = next;
        }
    }
}

/// Location of a redirect response, if `response` is one. Only the statuses
/// browsers treat as redirects count, and only when a Location is present.
fn redirect_location(response: &Response) -> Option<String> {
    let is_redirect = matches!(
        response.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !is_redirect {
        return None;
    }

    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Host plus explicit port: the part of a URL compared by the redirect policy.
pub fn host_authority(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Whether a redirect from `from` to `to` may be followed.
///
/// Same host, or the same host with a `www.` prefix added, is always allowed.
/// Anything else only when new domains are accepted.
pub fn redirect_allowed(from: &Url, to: &Url, accept_new_domain: bool) -> bool {
    let source = host_authority(from);
    let target = host_authority(to);
    source == target || target == format!("www.{}", source) || accept_new_domain
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, Request, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn fetcher(accept_new_domain: bool) -> Fetcher {
        Fetcher::builder()
            .with_timeout(Duration::from_secs(5))
            .with_accept_new_domain(accept_new_domain)
            .build()
            .unwrap()
    }

    fn redirect_to(location: &str) -> ResponseTemplate {
        ResponseTemplate::new(302).insert_header("location", location)
    }

    #[test]
    fn test_redirect_policy_same_host() {
        let from = Url::parse("http://example.com/").unwrap();
        let to = Url::parse("https://example.com/landing").unwrap();
        assert!(redirect_allowed(&from, &to, false));
    }

    #[test]
    fn test_redirect_policy_www_prefix() {
        let from = Url::parse("http://example.com").unwrap();
        let to = Url::parse("http://www.example.com/").unwrap();
        assert!(redirect_allowed(&from, &to, false));

        // The equivalence only goes one way
        assert!(!redirect_allowed(&to, &from, false));
    }

    #[test]
    fn test_redirect_policy_cross_domain() {
        let from = Url::parse("http://parked-example.test/").unwrap();
        let to = Url::parse("http://marketplace.test/listing").unwrap();
        assert!(!redirect_allowed(&from, &to, false));
        assert!(redirect_allowed(&from, &to, true));
    }

    #[test]
    fn test_redirect_policy_subdomain_is_another_domain() {
        let from = Url::parse("http://example.com/").unwrap();
        let to = Url::parse("http://shop.example.com/").unwrap();
        assert!(!redirect_allowed(&from, &to, false));
    }

    #[test]
    fn test_host_authority_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/path?q=1").unwrap();
        assert_eq!(host_authority(&url), "127.0.0.1:8080");

        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(host_authority(&url), "example.com");
    }

    #[test]
    fn test_builder_carries_insecure_flag() {
        let builder = Fetcher::builder();
        assert!(!builder.insecure);

        let builder = builder.with_insecure(true).with_accept_new_domain(false);
        assert!(builder.insecure);

        let fetcher = builder.build().unwrap();
        assert!(!fetcher.accept_new_domain);
    }

    #[tokio::test]
    async fn test_sends_browser_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", USER_AGENT))
            .and(header("accept-language", "en-US"))
            .and(header("accept-encoding", "gzip"))
            .and(|request: &Request| {
                request.headers.get("accept").and_then(|v| v.to_str().ok()) == Some(ACCEPT_TYPES)
            })
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = fetcher(true).fetch(&mock_server.uri()).await;
        assert_eq!(outcome, FetchOutcome::Body("welcome".to_string()));
    }

    #[tokio::test]
    async fn test_follows_same_host_chain() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(redirect_to("/step1"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/step1"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/step2", mock_server.uri())),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/step2"))
            .respond_with(redirect_to("/final"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200).set_body_string("final page"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = fetcher(false).fetch(&mock_server.uri()).await;
        assert_eq!(outcome, FetchOutcome::Body("final page".to_string()));
    }

    #[tokio::test]
    async fn test_blocks_cross_domain_redirect() {
        let origin = MockServer::start().await;
        let elsewhere = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(redirect_to(&format!("{}/landing", elsewhere.uri())))
            .mount(&origin)
            .await;

        // Verified on drop: the other domain is never contacted
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("buy this domain"))
            .expect(0)
            .mount(&elsewhere)
            .await;

        let outcome = fetcher(false).fetch(&origin.uri()).await;
        assert!(
            matches!(outcome, FetchOutcome::Blocked(_)),
            "Expected Blocked, got {:?}",
            outcome
        );
    }

    #[tokio::test]
    async fn test_follows_cross_domain_redirect_when_accepted() {
        let origin = MockServer::start().await;
        let elsewhere = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(redirect_to(&format!("{}/landing", elsewhere.uri())))
            .mount(&origin)
            .await;

        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("buy this domain"))
            .expect(1)
            .mount(&elsewhere)
            .await;

        let outcome = fetcher(true).fetch(&origin.uri()).await;
        assert_eq!(outcome, FetchOutcome::Body("buy this domain".to_string()));
    }

    #[tokio::test]
    async fn test_error_status_body_is_returned() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404).set_body_string("This domain has expired"))
            .mount(&mock_server)
            .await;

        let outcome = fetcher(true).fetch(&mock_server.uri()).await;
        assert_eq!(outcome, FetchOutcome::Body("This domain has expired".to_string()));
    }

    #[tokio::test]
    async fn test_redirect_status_without_location_is_terminal() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).set_body_string("moved, somewhere"))
            .mount(&mock_server)
            .await;

        let outcome = fetcher(true).fetch(&mock_server.uri()).await;
        assert_eq!(outcome, FetchOutcome::Body("moved, somewhere".to_string()));
    }

    #[tokio::test]
    async fn test_redirect_loop_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(redirect_to("/b"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(redirect_to("/a"))
            .mount(&mock_server)
            .await;

        let outcome = fetcher(true).fetch(&format!("{}/a", mock_server.uri())).await;
        match outcome {
            FetchOutcome::Failed(reason) => assert!(reason.contains("redirect loop"), "{}", reason),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hop_limit_fails() {
        let mock_server = MockServer::start().await;

        for i in 0..5 {
            Mock::given(method("GET"))
                .and(path(format!("/hop{}", i)))
                .respond_with(redirect_to(&format!("/hop{}", i + 1)))
                .mount(&mock_server)
                .await;
        }

        let fetcher = Fetcher::builder().with_max_redirects(2).build().unwrap();
        let outcome = fetcher.fetch(&format!("{}/hop0", mock_server.uri())).await;
        match outcome {
            FetchOutcome::Failed(reason) => assert!(reason.contains("too many redirects"), "{}", reason),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        // Nothing listens on port 1
        let outcome = fetcher(true).fetch("http://127.0.0.1:1/").await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_empty_target_fails() {
        let outcome = fetcher(true).fetch("http://").await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::builder()
            .with_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let outcome = fetcher.fetch(&mock_server.uri()).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)), "{:?}", outcome);
    }
}
