//! Per-user vendor conversation handles.
//!
//! The vendor keeps multi-turn context behind an opaque conversation
//! token. The relay remembers the latest token per user id so follow-up
//! turns reach the same vendor conversation. The store is an explicit
//! abstraction injected into the relay state: single-key overwrite
//! semantics, no expiry, and no coordination beyond the lock. Concurrent
//! requests racing to update one user's handle simply last-write-win.

use std::collections::HashMap;
use std::sync::RwLock;

/// Store of vendor conversation tokens keyed by user id
pub trait SessionStore: Send + Sync {
    /// The stored token for a user, if any
    fn get(&self, user_id: &str) -> Option<String>;

    /// Remember `token` as the user's current vendor conversation
    fn set(&self, user_id: &str, token: &str);

    /// Forget the user's vendor conversation
    fn clear(&self, user_id: &str);
}

/// In-memory session store
///
/// Suitable for a single relay process; handles do not survive restarts.
#[derive(Default)]
pub struct InMemorySessionStore {
    handles: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    /// Create an empty session store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user_id: &str) -> Option<String> {
        self.handles
            .read()
            .ok()
            .and_then(|handles| handles.get(user_id).cloned())
    }

    fn set(&self, user_id: &str, token: &str) {
        if let Ok(mut handles) = self.handles.write() {
            handles.insert(user_id.to_string(), token.to_string());
        }
    }

    fn clear(&self, user_id: &str) {
        if let Ok(mut handles) = self.handles.write() {
            handles.remove(user_id);
        }
    }
}
