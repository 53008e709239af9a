use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::error::{Result, ScorpionError};

/// Anything that can turn a URL into a page body.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

/// A URL that could not be fetched within the retry budget.
#[derive(Debug)]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub error: ScorpionError,
}

/// Outcome of one fan-out, in input order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub pages: Vec<Page>,
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    pub fn requested(&self) -> usize {
        self.pages.len() + self.failures.len()
    }

    /// True when something was attempted and nothing came back.
    pub fn all_failed(&self) -> bool {
        self.pages.is_empty() && !self.failures.is_empty()
    }

    pub fn failed_urls(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.url.as_str())
    }
}

/// Fetches batches of URLs with at most `concurrency` requests in flight.
pub struct Fetcher<S> {
    source: S,
    concurrency: usize,
    retry: RetryPolicy,
}

impl<S: PageSource> Fetcher<S> {
    pub fn new(source: S, concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            retry,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every URL once, returning after all of them settled.
    ///
    /// Duplicate URLs are fetched once. A failing URL never aborts the
    /// batch; it ends up in [`FetchReport::failures`].
    #[instrument(skip_all, fields(concurrency = self.concurrency))]
    pub async fn fetch_all<I>(&self, urls: I) -> FetchReport
    where
        I: IntoIterator<Item = String>,
    {
        let urls = urls.into_iter().unique().collect_vec();
        let results: Vec<(String, std::result::Result<String, (u32, ScorpionError)>)> =
            stream::iter(urls)
                .map(|url| async move {
                    let result = self.fetch_with_retry(&url).await;
                    (url, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut report = FetchReport::default();
        for (url, result) in results {
            match result {
                Ok(body) => report.pages.push(Page { url, body }),
                Err((attempts, error)) => {
                    warn!(%url, attempts, error = %error, "giving up on url");
                    report.failures.push(FetchFailure {
                        url,
                        attempts,
                        error,
                    });
                }
            }
        }
        debug!(
            fetched = report.pages.len(),
            failed = report.failures.len(),
            "fetch batch settled"
        );
        report
    }

    async fn fetch_with_retry(
        &self,
        url: &str,
    ) -> std::result::Result<String, (u32, ScorpionError)> {
        let mut attempt = 1;
        loop {
            match self.source.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    debug!(url, attempt, ?delay, error = %e, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err((attempt, e)),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{fetcher, StaticSource};
    use super::*;

    fn urls(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let fetcher = fetcher(StaticSource::new().page("a", "A").page("c", "C"));
        let report = fetcher.fetch_all(urls(&["a", "b", "c"])).await;

        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.pages[0].url, "a");
        assert_eq!(report.pages[1].body, "C");
        assert_eq!(report.failed_urls().collect_vec(), vec!["b"]);
        assert_eq!(report.failures[0].attempts, 3);
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let fetcher = fetcher(StaticSource::new().page("a", "A").flaky("a", 2));
        let report = fetcher.fetch_all(urls(&["a"])).await;

        assert_eq!(report.pages.len(), 1);
        assert_eq!(fetcher.source().calls("a"), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let fetcher = fetcher(StaticSource::new().status("gone", 404));
        let report = fetcher.fetch_all(urls(&["gone"])).await;

        assert!(report.all_failed());
        assert_eq!(report.failures[0].attempts, 1);
        assert_eq!(fetcher.source().calls("gone"), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let fetcher = fetcher(StaticSource::new().status("busy", 503));
        let report = fetcher.fetch_all(urls(&["busy"])).await;

        assert_eq!(report.failures[0].attempts, 3);
        assert_eq!(fetcher.source().calls("busy"), 3);
    }

    #[tokio::test]
    async fn test_duplicate_urls_fetched_once() {
        let fetcher = fetcher(StaticSource::new().page("a", "A"));
        let report = fetcher.fetch_all(urls(&["a", "a", "a"])).await;

        assert_eq!(report.requested(), 1);
        assert_eq!(fetcher.source().total_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let fetcher = fetcher(StaticSource::new());
        let report = fetcher.fetch_all(Vec::<String>::new()).await;
        assert_eq!(report.requested(), 0);
        assert!(!report.all_failed());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
