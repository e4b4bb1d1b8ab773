//! Search autocomplete
//!
//! Debounces keystrokes into suggestion fetches. Each input cancels the
//! pending fetch; short queries clear the list without fetching. Results are
//! delivered as a message on the owner's event channel and only accepted if
//! no newer input arrived in the meantime.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SearchConfig;
use crate::models::SearchResult;

/// Suggestions produced for one input
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestions {
    pub generation: u64,
    pub query: String,
    pub results: Vec<SearchResult>,
}

pub struct Autocomplete<M> {
    delay: Duration,
    min_chars: usize,
    limit: usize,
    sender: mpsc::UnboundedSender<M>,
    wrap: fn(Suggestions) -> M,
    pending: Option<JoinHandle<()>>,
    generation: u64,
    suggestions: Vec<SearchResult>,
}

impl<M: Send + 'static> Autocomplete<M> {
    /// `wrap` turns delivered suggestions into the owner's message type
    pub fn new(config: &SearchConfig, sender: mpsc::UnboundedSender<M>, wrap: fn(Suggestions) -> M) -> Self {
        Self {
            delay: Duration::from_millis(config.debounce_ms),
            min_chars: config.min_chars,
            limit: config.suggestion_limit,
            sender,
            wrap,
            pending: None,
            generation: 0,
            suggestions: Vec::new(),
        }
    }

    pub fn suggestions(&self) -> &[SearchResult] {
        &self.suggestions
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Handle an input change. `fetch` runs after the debounce delay unless a
    /// newer input cancels it first.
    pub fn input<F, Fut>(&mut self, query: &str, fetch: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Vec<SearchResult>> + Send + 'static,
    {
        self.cancel();

        if query.chars().count() < self.min_chars {
            self.suggestions.clear();
            return;
        }

        let generation = self.generation;
        let query = query.to_string();
        let delay = self.delay;
        let limit = self.limit;
        let sender = self.sender.clone();
        let wrap = self.wrap;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut results = fetch(query.clone()).await;
            results.truncate(limit);
            tracing::debug!(%query, count = results.len(), "Suggestions ready");
            let _ = sender.send(wrap(Suggestions {
                generation,
                query,
                results,
            }));
        }));
    }

    /// Apply delivered suggestions; stale ones are dropped
    pub fn accept(&mut self, suggestions: Suggestions) -> bool {
        if suggestions.generation != self.generation {
            return false;
        }
        self.pending = None;
        self.suggestions = suggestions.results;
        true
    }

    /// Abort the pending fetch and invalidate anything already in flight
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Hide the list (suggestion chosen, search submitted)
    pub fn clear(&mut self) {
        self.cancel();
        self.suggestions.clear();
    }
}

impl<M> Drop for Autocomplete<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
