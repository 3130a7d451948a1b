use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use super::{FetchError, FetchRequest, FetchResponse, Fetcher};

#[derive(Debug, Clone)]
enum Canned {
    Respond(FetchResponse),
    Fail(String),
}

/// Serves canned answers keyed by URL and records every request.
///
/// Answers queued for the same URL are served in order; the last one is
/// repeated once the queue runs dry. A URL is looked up verbatim first and
/// then without its query string. Unknown URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, VecDeque<Canned>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.push(url.into(), Canned::Respond(FetchResponse::new(status, body)));
        self
    }

    #[must_use]
    pub fn fail(self, url: impl Into<String>, reason: impl Into<String>) -> Self {
        self.push(url.into(), Canned::Fail(reason.into()));
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url == url)
            .count()
    }

    fn push(&self, url: String, canned: Canned) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url)
            .or_default()
            .push_back(canned);
    }

    fn next_for(&self, url: &str) -> Option<Canned> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let without_query = url.split('?').next().unwrap_or(url);
        let key = [url, without_query]
            .into_iter()
            .find(|candidate| routes.contains_key(*candidate))?
            .to_string();
        let queue = routes.get_mut(&key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.next_for(&request.url) {
            Some(Canned::Respond(response)) => Ok(response),
            Some(Canned::Fail(reason)) => Err(FetchError::Transport {
                url: request.url.clone(),
                reason,
            }),
            None => Err(FetchError::Transport {
                url: request.url.clone(),
                reason: "no route".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_answers_are_served_in_order_then_repeated() -> Result<(), FetchError> {
        let fetcher = FakeFetcher::new()
            .respond("https://example.com/a", 403, "")
            .respond("https://example.com/a", 200, "ok");
        let request = FetchRequest::get("https://example.com/a");

        assert_eq!(fetcher.fetch(&request).await?.status, 403);
        assert_eq!(fetcher.fetch(&request).await?.status, 200);
        assert_eq!(fetcher.fetch(&request).await?.status, 200);
        assert_eq!(fetcher.request_count("https://example.com/a"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn routes_match_without_the_query_string() -> Result<(), FetchError> {
        let fetcher = FakeFetcher::new().respond("https://example.com/export", 200, "x");
        let response = fetcher
            .fetch(&FetchRequest::get("https://example.com/export?format=csv&gid=0"))
            .await?;
        assert_eq!(response.body, "x");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_urls_fail() {
        let fetcher = FakeFetcher::new();
        let result = fetcher.fetch(&FetchRequest::get("https://nowhere.test/")).await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
