use std::collections::HashMap;

use uuid::Uuid;

/// Key the widget keeps its session id under.
pub const SESSION_KEY: &str = "dialogflow_session_id";

/// Where a client keeps values that must outlive a single request.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns the stored session id, creating and storing one on first use.
pub fn load_or_create(store: &mut impl SessionStore) -> String {
    if let Some(existing) = store.get(SESSION_KEY).filter(|id| !id.trim().is_empty()) {
        return existing;
    }

    let id = new_session_id();
    store.set(SESSION_KEY, &id);
    tracing::debug!(session = %id, "created session id");
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_created_once() {
        let mut store = MemoryStore::default();

        let first = load_or_create(&mut store);
        let second = load_or_create(&mut store);

        assert_eq!(first, second);
        assert_eq!(store.get(SESSION_KEY), Some(first));
    }

    #[test]
    fn stored_session_id_is_reused() {
        let mut store = MemoryStore::default();
        store.set(SESSION_KEY, "1700000000000-abc1234");

        assert_eq!(load_or_create(&mut store), "1700000000000-abc1234");
    }

    #[test]
    fn blank_stored_value_is_replaced() {
        let mut store = MemoryStore::default();
        store.set(SESSION_KEY, " ");

        let id = load_or_create(&mut store);

        assert!(Uuid::parse_str(&id).is_ok());
    }
}
