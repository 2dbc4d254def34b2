use shared::session::SessionStore;

/// `window.localStorage`, when the browser grants it. Writes are dropped
/// otherwise, so the session only lives as long as the page.
pub struct LocalStorage {
    storage: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("localStorage unavailable, session id will not persist");
        }

        Self { storage }
    }
}

impl SessionStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if storage.set_item(key, value).is_err() {
                tracing::warn!(key, "could not write to localStorage");
            }
        }
    }
}
