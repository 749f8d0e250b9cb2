use dashmap::DashMap;

use scribe_core::cancel::CancelFlagStore;
use scribe_core::ids::ChatSessionId;

/// In-process cancel-flag store. Transport handlers call
/// `request_cancel` when a client goes away; the turn loop polls
/// `is_connected` between events. A session with no entry counts as
/// connected.
#[derive(Default)]
pub struct InMemoryCancelStore {
    disconnected: DashMap<String, bool>,
}

impl InMemoryCancelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cancel(&self, id: &ChatSessionId) {
        self.disconnected.insert(id.as_str().to_owned(), true);
    }
}

impl CancelFlagStore for InMemoryCancelStore {
    fn is_connected(&self, id: &ChatSessionId) -> bool {
        !self
            .disconnected
            .get(id.as_str())
            .map(|flag| *flag)
            .unwrap_or(false)
    }

    fn reset_cancel_status(&self, id: &ChatSessionId) {
        self.disconnected.remove(id.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_is_connected() {
        let store = InMemoryCancelStore::new();
        assert!(store.is_connected(&ChatSessionId::new()));
    }

    #[test]
    fn cancel_then_reset() {
        let store = InMemoryCancelStore::new();
        let id = ChatSessionId::new();

        store.request_cancel(&id);
        assert!(!store.is_connected(&id));

        store.reset_cancel_status(&id);
        assert!(store.is_connected(&id));
    }

    #[test]
    fn reset_is_idempotent() {
        let store = InMemoryCancelStore::new();
        let id = ChatSessionId::new();
        store.reset_cancel_status(&id);
        store.reset_cancel_status(&id);
        assert!(store.is_connected(&id));
    }
}
