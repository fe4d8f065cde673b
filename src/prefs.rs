//! Client-side persistence: the user profile, saved outfits, auth token and
//! theme, kept under fixed keys in a string key-value store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::stylist::{Outfit, UserProfile};

pub const PROFILE_KEY: &str = "userProfile";
pub const SAVED_OUTFITS_KEY: &str = "savedOutfits";
pub const TOKEN_KEY: &str = "token";
pub const THEME_KEY: &str = "theme";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// All entries in one JSON object on disk, rewritten on every change.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
        let mut next = entries.clone();
        f(&mut next);
        let text = serde_json::to_string_pretty(&next)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("write {}", self.path.display()))?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.update(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.update(|m| {
            m.remove(key);
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Typed view over a [`KeyValueStore`].
pub struct Preferences<S> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads a JSON value; missing or corrupt entries yield the default.
    fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(error = %e, key, "failed to read stored value");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, key, "stored value is corrupt, using default");
            T::default()
        })
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)?;
        debug!(key, bytes = raw.len(), "stored");
        Ok(())
    }

    pub fn profile(&self) -> UserProfile {
        self.load_json(PROFILE_KEY)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        self.save_json(PROFILE_KEY, profile)
    }

    pub fn saved_outfits(&self) -> Vec<Outfit> {
        self.load_json(SAVED_OUTFITS_KEY)
    }

    pub fn save_outfits(&self, outfits: &[Outfit]) -> anyhow::Result<()> {
        self.save_json(SAVED_OUTFITS_KEY, &outfits)
    }

    /// Unsaves every outfit titled like `outfit`, or saves it when none is.
    /// Returns the new list.
    pub fn toggle_saved(&self, outfit: &Outfit) -> anyhow::Result<Vec<Outfit>> {
        let mut saved = self.saved_outfits();
        let before = saved.len();
        saved.retain(|o| o.style_title != outfit.style_title);
        if saved.len() == before {
            saved.push(outfit.clone());
        }
        self.save_outfits(&saved)?;
        Ok(saved)
    }

    pub fn token(&self) -> anyhow::Result<Option<String>> {
        self.store.get(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> anyhow::Result<()> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> anyhow::Result<()> {
        self.store.remove(TOKEN_KEY)
    }

    pub fn theme(&self) -> Theme {
        self.load_json(THEME_KEY)
    }

    pub fn set_theme(&self, theme: Theme) -> anyhow::Result<()> {
        self.save_json(THEME_KEY, &theme)
    }
}
