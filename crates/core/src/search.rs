//! Debounced catalog search.

use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::{catalog::CatalogFetcher, error::FetchError, models::Game};

/// Result of one debounced search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Generation of the request that produced this outcome.
    pub generation: u64,
    /// Query as submitted.
    pub query: String,
    /// Search result.
    pub result: Result<Vec<Game>, FetchError>,
}

/// Runs at most one search at a time; a newer query cancels the older one.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    /// Debouncer waiting `delay` before each request.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            task: None,
        }
    }

    /// Generation of the latest submitted query.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an outcome belongs to the latest query.
    pub fn is_current(&self, outcome: &SearchOutcome) -> bool {
        outcome.generation == self.generation
    }

    /// Whether a search is scheduled or running.
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the in-flight search, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Cancel the previous search and schedule `query`.
    ///
    /// Blank queries only cancel. Returns the generation assigned to the query.
    pub fn submit(
        &mut self,
        query: &str,
        fetcher: CatalogFetcher,
        sender: mpsc::Sender<SearchOutcome>,
    ) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let query = query.trim().to_string();
        if query.is_empty() {
            return generation;
        }

        let delay = self.delay;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(%query, generation, "search dispatched");
            let result = fetcher.search(&query).await;
            let _ = sender
                .send(SearchOutcome {
                    generation,
                    query,
                    result,
                })
                .await;
        }));
        generation
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::FixtureCatalog;

    fn fetcher() -> CatalogFetcher {
        CatalogFetcher::new(Arc::new(FixtureCatalog::new()), 20, 10)
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_query_is_delivered() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(300));

        debouncer.submit("port", fetcher(), tx.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit("hollow", fetcher(), tx.clone());
        drop(tx);

        let outcome = rx.recv().await.unwrap();
        assert!(debouncer.is_current(&outcome));
        assert_eq!(outcome.query, "hollow");
        assert_eq!(outcome.result.unwrap()[0].name, "Hollow Knight");

        drop(debouncer);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_queries_cancel_without_fetching() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(300));

        let first = debouncer.submit("portal", fetcher(), tx.clone());
        let second = debouncer.submit("   ", fetcher(), tx);
        assert!(second > first);

        drop(debouncer);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_outcomes_are_not_current() {
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(10));
        let (tx, _rx) = mpsc::channel(1);
        let first = debouncer.submit("limbo", fetcher(), tx.clone());
        debouncer.submit("skyrim", fetcher(), tx);
        let stale = SearchOutcome {
            generation: first,
            query: "limbo".to_string(),
            result: Ok(Vec::new()),
        };
        assert!(!debouncer.is_current(&stale));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_the_pending_search() {
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(300));
        let (tx, mut rx) = mpsc::channel(1);
        assert!(!debouncer.is_pending());
        debouncer.submit("celeste", fetcher(), tx);
        assert!(debouncer.is_pending());

        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(rx.recv().await.is_none());
    }
}
