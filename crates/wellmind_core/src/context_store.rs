//! crates/wellmind_core/src/context_store.rs
//!
//! An explicit store of in-memory conversation contexts, keyed by session id.
//! Replaces an unscoped process-wide map with an injected object whose
//! lifecycle (insert on session start, remove on session end, idle eviction)
//! is explicit.
//!
//! Locking is two-level: a `std::sync::Mutex` guards the map itself and is
//! held only for lookups, while each context sits behind its own
//! `tokio::sync::Mutex`. Holding a context's lock across the whole message
//! pipeline serializes concurrent calls for the same session without any
//! cross-session contention.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use crate::context::ConversationContext;
use crate::error::ChatError;

pub type SharedContext = Arc<Mutex<ConversationContext>>;

#[derive(Default)]
pub struct ContextStore {
    inner: StdMutex<HashMap<String, SharedContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly initialized context. Duplicate session ids are
    /// rejected: re-starting an active session is a conflict, never a silent
    /// overwrite.
    pub fn insert(&self, context: ConversationContext) -> Result<SharedContext, ChatError> {
        let session_id = context.session_id().to_string();
        let mut map = self.inner.lock().expect("context map poisoned");
        if map.contains_key(&session_id) {
            return Err(ChatError::SessionAlreadyActive(session_id));
        }
        let shared = Arc::new(Mutex::new(context));
        map.insert(session_id, shared.clone());
        Ok(shared)
    }

    pub fn get(&self, session_id: &str) -> Option<SharedContext> {
        self.inner
            .lock()
            .expect("context map poisoned")
            .get(session_id)
            .cloned()
    }

    /// Returns the context for a session, reconstructing a fresh one via
    /// `make` if none is in memory (e.g., after a restart). Profile
    /// accumulation restarts in that case; this is a documented loss of
    /// fidelity, not a bug.
    pub fn get_or_insert_with(
        &self,
        session_id: &str,
        make: impl FnOnce() -> ConversationContext,
    ) -> SharedContext {
        let mut map = self.inner.lock().expect("context map poisoned");
        map.entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(make())))
            .clone()
    }

    pub fn remove(&self, session_id: &str) -> Option<SharedContext> {
        self.inner
            .lock()
            .expect("context map poisoned")
            .remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("context map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops contexts idle for longer than `max_idle`. Sessions currently
    /// being processed hold their context lock and are skipped. Returns the
    /// number of evicted contexts.
    pub fn evict_idle(&self, max_idle: chrono::Duration) -> usize {
        let now = chrono::Utc::now();
        let mut map = self.inner.lock().expect("context map poisoned");
        let before = map.len();
        map.retain(|_, shared| match shared.try_lock() {
            Ok(ctx) => now - ctx.last_active() < max_idle,
            Err(_) => true,
        });
        before - map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_is_a_conflict() {
        let store = ContextStore::new();
        store
            .insert(ConversationContext::new("dup", None))
            .unwrap();
        let err = store
            .insert(ConversationContext::new("dup", None))
            .unwrap_err();
        assert_eq!(err, ChatError::SessionAlreadyActive("dup".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_makes_room_for_reinsert() {
        let store = ContextStore::new();
        store.insert(ConversationContext::new("s", None)).unwrap();
        store.remove("s");
        store.insert(ConversationContext::new("s", None)).unwrap();
    }

    #[tokio::test]
    async fn get_or_insert_reconstructs_missing_context() {
        let store = ContextStore::new();
        let shared = store.get_or_insert_with("gone", || ConversationContext::new("gone", None));
        assert_eq!(shared.lock().await.session_id(), "gone");
        // A second call returns the same context, not a new one.
        let again = store.get_or_insert_with("gone", || ConversationContext::new("gone", None));
        assert!(Arc::ptr_eq(&shared, &again));
    }

    #[tokio::test]
    async fn evict_idle_skips_locked_contexts() {
        let store = ContextStore::new();
        let held = store.insert(ConversationContext::new("busy", None)).unwrap();
        store.insert(ConversationContext::new("idle", None)).unwrap();

        let _guard = held.lock().await;
        // Zero max-idle evicts everything not currently locked.
        let evicted = store.evict_idle(chrono::Duration::zero());
        assert_eq!(evicted, 1);
        assert!(store.get("busy").is_some());
        assert!(store.get("idle").is_none());
    }
}
