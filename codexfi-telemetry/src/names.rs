//! Opaque scope id → human-readable name, persisted as one JSON map.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

/// Last-writer-wins registry backed by `names.json`.
pub struct NameRegistry {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl NameRegistry {
    pub fn init(dir: &std::path::Path) -> Self {
        let registry = Self {
            path: dir.join("names.json"),
            state: Mutex::new(HashMap::new()),
        };
        registry.load();
        registry
    }

    /// Associate `id` with `name`. Saves write-through; a no-op when the
    /// mapping is unchanged.
    pub fn register(&self, id: &str, name: &str) {
        {
            let mut state = self.state.lock().expect("names lock");
            if state.get(id).map(String::as_str) == Some(name) {
                return;
            }
            state.insert(id.to_string(), name.to_string());
        }
        self.save();
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.state.lock().expect("names lock").get(id).cloned()
    }

    /// Copy of the whole map.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.state.lock().expect("names lock").clone()
    }

    /// Re-read from disk for cross-process reads.
    pub fn load(&self) {
        if let Ok(raw) = std::fs::read_to_string(&self.path) {
            match serde_json::from_str(&raw) {
                Ok(map) => *self.state.lock().expect("names lock") = map,
                Err(e) => warn!(path = %self.path.display(), error = %e, "unreadable name registry"),
            }
        }
    }

    fn save(&self) {
        let snapshot = self.snapshot();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "name registry write failed");
                }
            }
            Err(e) => warn!(error = %e, "name registry serialize failed"),
        }
    }
}
