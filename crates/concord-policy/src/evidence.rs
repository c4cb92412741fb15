//! Host denylist for evidence URLs.
//!
//! `GuardedFetcher` wraps any `EvidenceFetcher` and checks the URL host
//! against a `HostDenylist` before the wrapped fetcher is called. A denied
//! host never sees a request.

use tracing::{debug, warn};
use url::Url;

use concord_contracts::error::{ConcordError, ConcordResult};
use concord_core::traits::EvidenceFetcher;

/// Domains whose pages are refused as evidence unless configured otherwise.
pub const DEFAULT_DENIED_HOSTS: &[&str] =
    &["x.com", "twitter.com", "facebook.com", "instagram.com", "linkedin.com"];

/// A set of denied domains, matched exactly or as a parent domain.
///
/// `twitter.com` denies `twitter.com` and `mobile.twitter.com` but not
/// `nottwitter.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDenylist {
    domains: Vec<String>,
}

impl HostDenylist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// The social-media hosts in `DEFAULT_DENIED_HOSTS`.
    pub fn social_media() -> Self {
        Self::new(DEFAULT_DENIED_HOSTS)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_denied(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.domains.iter().any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    /// Parse `url` and check its host.
    ///
    /// Returns `InputValidation` for an unparsable URL, a scheme other than
    /// http or https, or a URL without a host; `EvidenceDenied` for a
    /// denied host.
    pub fn check(&self, url: &str) -> ConcordResult<()> {
        let parsed = Url::parse(url.trim()).map_err(|e| ConcordError::InputValidation {
            reason: format!("source URL '{url}' is invalid: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConcordError::InputValidation {
                reason: format!("source URL must use http or https, got '{}'", parsed.scheme()),
            });
        }
        let host = parsed.host_str().ok_or_else(|| ConcordError::InputValidation {
            reason: format!("source URL '{url}' has no host"),
        })?;

        if self.is_denied(host) {
            warn!(host = %host, "evidence host denied");
            return Err(ConcordError::EvidenceDenied { host: host.to_string() });
        }
        Ok(())
    }
}

impl Default for HostDenylist {
    fn default() -> Self {
        Self::social_media()
    }
}

/// An `EvidenceFetcher` that refuses denied hosts before delegating.
pub struct GuardedFetcher<F> {
    inner: F,
    denylist: HostDenylist,
}

impl<F: EvidenceFetcher> GuardedFetcher<F> {
    pub fn new(inner: F, denylist: HostDenylist) -> Self {
        Self { inner, denylist }
    }

    pub fn denylist(&self) -> &HostDenylist {
        &self.denylist
    }
}

impl<F: EvidenceFetcher> EvidenceFetcher for GuardedFetcher<F> {
    fn fetch(&self, url: &str) -> ConcordResult<String> {
        self.denylist.check(url)?;
        debug!(url = %url, "fetching evidence");
        self.inner.fetch(url)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use concord_contracts::error::{ConcordError, ConcordResult};
    use concord_core::traits::EvidenceFetcher;

    use super::{GuardedFetcher, HostDenylist};

    struct CountingFetcher {
        calls: Arc<Mutex<u32>>,
    }

    impl EvidenceFetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> ConcordResult<String> {
            *self.calls.lock().unwrap() += 1;
            Ok("page text".to_string())
        }
    }

    fn guarded() -> (GuardedFetcher<CountingFetcher>, Arc<Mutex<u32>>) {
        let calls = Arc::new(Mutex::new(0));
        (GuardedFetcher::new(CountingFetcher { calls: calls.clone() }, HostDenylist::social_media()), calls)
    }

    #[test]
    fn denied_host_never_reaches_delegate() {
        let (fetcher, calls) = guarded();
        match fetcher.fetch("https://twitter.com/someone/status/1") {
            Err(ConcordError::EvidenceDenied { host }) => assert_eq!(host, "twitter.com"),
            other => panic!("expected EvidenceDenied, got {:?}", other),
        }
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn subdomains_are_denied_but_lookalikes_are_not() {
        let denylist = HostDenylist::social_media();
        assert!(denylist.is_denied("www.linkedin.com"));
        assert!(denylist.is_denied("MOBILE.X.COM"));
        assert!(!denylist.is_denied("notx.com"));
        assert!(!denylist.is_denied("example.org"));
    }

    #[test]
    fn allowed_host_is_fetched() {
        let (fetcher, calls) = guarded();
        assert_eq!(fetcher.fetch("https://www.example.org/report").unwrap(), "page text");
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn malformed_urls_are_input_errors() {
        let (fetcher, calls) = guarded();
        for url in ["not a url", "ftp://example.org/file", "mailto:someone@example.org"] {
            assert!(
                matches!(fetcher.fetch(url), Err(ConcordError::InputValidation { .. })),
                "url {url} should be rejected"
            );
        }
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn custom_denylist_normalizes_entries() {
        let denylist = HostDenylist::new([" Example.COM. ", ""]);
        assert_eq!(denylist.domains(), ["example.com".to_string()]);
        assert!(denylist.check("http://news.example.com/a").is_err());
    }
}
