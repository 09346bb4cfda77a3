//! Fetcher trait.
//!
//! Provides a trait-based abstraction over the upstream source so the
//! monitor can be driven by the real client or by a scripted mock.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dexwatch_core::Record;
use parking_lot::Mutex;

use crate::error::FetchResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of record batches.
///
/// Implementations must tolerate concurrent calls; each call is independent.
pub trait Fetcher: Send + Sync {
    /// Fetch and normalize the current batch.
    fn fetch(&self) -> BoxFuture<'_, FetchResult<Vec<Record>>>;
}

/// Arc wrapper for Fetcher trait objects.
pub type DynFetcher = Arc<dyn Fetcher>;

#[derive(Debug)]
struct ScriptedResponse {
    result: FetchResult<Vec<Record>>,
    delay: Option<Duration>,
}

/// Scripted fetcher for tests.
///
/// Each call consumes the next scripted response in call order; once the
/// script is exhausted the fallback result is returned.
#[derive(Debug)]
pub struct MockFetcher {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: Mutex<FetchResult<Vec<Record>>>,
    calls: AtomicUsize,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a mock whose fallback is an empty batch.
    pub fn new() -> Self {
        Self::returning(Vec::new())
    }

    /// Create a mock whose fallback is the given batch.
    pub fn returning(records: Vec<Record>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(records)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a result for the next unscripted call.
    pub fn push(&self, result: FetchResult<Vec<Record>>) {
        self.script.lock().push_back(ScriptedResponse {
            result,
            delay: None,
        });
    }

    /// Queue a result that resolves only after `delay`.
    pub fn push_delayed(&self, result: FetchResult<Vec<Record>>, delay: Duration) {
        self.script.lock().push_back(ScriptedResponse {
            result,
            delay: Some(delay),
        });
    }

    /// Replace the fallback result.
    pub fn set_fallback(&self, result: FetchResult<Vec<Record>>) {
        *self.fallback.lock() = result;
    }

    /// Number of `fetch` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self) -> BoxFuture<'_, FetchResult<Vec<Record>>> {
        // Resolve the response at call time so results follow call order,
        // not completion order.
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        let (result, delay) = match next {
            Some(scripted) => (scripted.result, scripted.delay),
            None => (self.fallback.lock().clone(), None),
        };

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}
