//! Keyed re-entrancy guard.
//!
//! At most one [`InFlightGuard`] exists per key. The key is released when
//! the guard drops, on success, error or cancellation alike.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` while another guard holds it.
    #[must_use]
    pub fn try_acquire(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { keys: Arc::clone(&self.keys), key })
    }

    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).contains(key)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let inflight = InFlight::new();
        let guard = inflight.try_acquire("generate:alice").unwrap();
        assert_eq!(guard.key(), "generate:alice");
        assert!(inflight.try_acquire("generate:alice").is_none());
        assert!(inflight.is_held("generate:alice"));
    }

    #[test]
    fn drop_releases_key() {
        let inflight = InFlight::new();
        drop(inflight.try_acquire("k").unwrap());
        assert!(!inflight.is_held("k"));
        assert!(inflight.try_acquire("k").is_some());
    }

    #[test]
    fn keys_are_independent() {
        let inflight = InFlight::new();
        let _a = inflight.try_acquire("a").unwrap();
        assert!(inflight.try_acquire("b").is_some());
    }

    #[tokio::test]
    async fn released_when_task_is_cancelled() {
        let inflight = InFlight::new();
        let guard = inflight.try_acquire("slow").unwrap();
        let task = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        task.abort();
        let _ = task.await;
        assert!(!inflight.is_held("slow"));
    }
}
