//! Route revalidation.
//!
//! Rendered views are cached per route path. After a successful mutation the
//! affected path is marked stale so the next view recomputes it.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Listing view that every invoice mutation invalidates (and the redirect target).
pub const INVOICES_PATH: &str = "/dashboard/invoices";

/// Consumer side of route revalidation.
pub trait RouteCache: Send + Sync {
    /// Mark `path` stale.
    fn revalidate_path(&self, path: &str);
}

impl<C> RouteCache for std::sync::Arc<C>
where
    C: RouteCache + ?Sized,
{
    fn revalidate_path(&self, path: &str) {
        (**self).revalidate_path(path)
    }
}

/// A path that was marked stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revalidation {
    pub path: String,
    /// Number of times this path has been revalidated, including this one.
    pub generation: u64,
    pub at: DateTime<Utc>,
}

/// Per-path generation counters plus a broadcast of every revalidation.
///
/// Views compare the generation they rendered at with [`generation`](Self::generation)
/// to decide whether to recompute. Subscribers get notified as it happens.
#[derive(Debug)]
pub struct InMemoryRouteCache {
    generations: RwLock<HashMap<String, u64>>,
    tx: broadcast::Sender<Revalidation>,
}

impl InMemoryRouteCache {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            generations: RwLock::new(HashMap::new()),
            tx,
        }
    }

    /// Current generation of `path`; 0 if it was never revalidated.
    pub fn generation(&self, path: &str) -> u64 {
        self.generations
            .read()
            .ok()
            .and_then(|g| g.get(path).copied())
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Revalidation> {
        self.tx.subscribe()
    }
}

impl Default for InMemoryRouteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteCache for InMemoryRouteCache {
    fn revalidate_path(&self, path: &str) {
        let generation = match self.generations.write() {
            Ok(mut generations) => {
                let counter = generations.entry(path.to_string()).or_insert(0);
                *counter += 1;
                *counter
            }
            Err(_) => {
                tracing::warn!(path, "route cache lock poisoned; revalidation dropped");
                return;
            }
        };

        tracing::debug!(path, generation, "route revalidated");

        // Lossy broadcast; having no subscribers is fine.
        let _ = self.tx.send(Revalidation {
            path: path.to_string(),
            generation,
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revalidation_bumps_only_that_path() {
        let cache = InMemoryRouteCache::new();
        cache.revalidate_path(INVOICES_PATH);
        cache.revalidate_path(INVOICES_PATH);
        cache.revalidate_path("/dashboard");

        assert_eq!(cache.generation(INVOICES_PATH), 2);
        assert_eq!(cache.generation("/dashboard"), 1);
        assert_eq!(cache.generation("/dashboard/customers"), 0);
    }

    #[tokio::test]
    async fn subscribers_see_revalidations() {
        let cache = InMemoryRouteCache::new();
        let mut rx = cache.subscribe();

        cache.revalidate_path(INVOICES_PATH);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.path, INVOICES_PATH);
        assert_eq!(event.generation, 1);
    }
}
