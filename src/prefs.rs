//! User preferences persisted by key across restarts.
//!
//! Stored as a small TOML file next to the config. The file is watched so an
//! edit made elsewhere (another widget instance, a text editor) shows up
//! without a restart.

use anyhow::{anyhow, Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
};

use crate::config::APP_DIR_NAME;

const PREFS_FILE: &str = "prefs.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub info_panel_expanded: bool,
    pub always_on_top_disabled: bool,
    pub rating_warning_disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKey {
    InfoPanelExpanded,
    AlwaysOnTopDisabled,
    RatingWarningDisabled,
}

impl Preferences {
    pub fn get(&self, key: PrefKey) -> bool {
        match key {
            PrefKey::InfoPanelExpanded => self.info_panel_expanded,
            PrefKey::AlwaysOnTopDisabled => self.always_on_top_disabled,
            PrefKey::RatingWarningDisabled => self.rating_warning_disabled,
        }
    }

    fn slot(&mut self, key: PrefKey) -> &mut bool {
        match key {
            PrefKey::InfoPanelExpanded => &mut self.info_panel_expanded,
            PrefKey::AlwaysOnTopDisabled => &mut self.always_on_top_disabled,
            PrefKey::RatingWarningDisabled => &mut self.rating_warning_disabled,
        }
    }
}

pub struct PrefsStore {
    path: Option<PathBuf>,
    prefs: Preferences,
    watcher: Option<RecommendedWatcher>,
    changes_rx: Option<Receiver<notify::Result<notify::Event>>>,
}

impl PrefsStore {
    /// Opens the store in the platform config directory. Without one the
    /// preferences live in memory only.
    pub fn open_default() -> Self {
        match dirs::config_dir() {
            Some(dir) => Self::open(dir.join(APP_DIR_NAME).join(PREFS_FILE)),
            None => {
                log::warn!("No config directory available; preferences will not persist");
                Self::in_memory()
            }
        }
    }

    /// A missing or unreadable file yields the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match read_prefs(&path) {
            Ok(prefs) => prefs,
            Err(err) => {
                log::warn!("Using default preferences: {err:#}");
                Preferences::default()
            }
        };
        Self {
            path: Some(path),
            prefs,
            watcher: None,
            changes_rx: None,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            prefs: Preferences::default(),
            watcher: None,
            changes_rx: None,
        }
    }

    pub fn prefs(&self) -> Preferences {
        self.prefs
    }

    pub fn get(&self, key: PrefKey) -> bool {
        self.prefs.get(key)
    }

    /// Updates one flag and writes the file if the value changed.
    pub fn set(&mut self, key: PrefKey, value: bool) -> Result<()> {
        let slot = self.prefs.slot(key);
        if *slot == value {
            return Ok(());
        }
        *slot = value;
        self.save()
    }

    pub fn toggle(&mut self, key: PrefKey) -> Result<bool> {
        let value = !self.get(key);
        self.set(key, value)?;
        Ok(value)
    }

    fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string(&self.prefs).context("Failed to serialise preferences")?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write preferences: {}", path.display()))
    }

    pub fn enable_watch(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("In-memory preferences cannot be watched"))?;
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("Preferences path {} has no parent", path.display()))?;
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        self.changes_rx = Some(rx);
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Drains watcher events; returns true if the preferences changed.
    pub fn poll_changes(&mut self) -> bool {
        let Some(path) = self.path.clone() else {
            return false;
        };

        let mut relevant = false;
        if let Some(rx) = self.changes_rx.as_ref() {
            while let Ok(event) = rx.try_recv() {
                match event {
                    Ok(evt) => {
                        relevant |= evt
                            .paths
                            .iter()
                            .any(|p| p.file_name() == path.file_name());
                    }
                    Err(err) => log::warn!("Preferences watcher error: {err}"),
                }
            }
        }

        if !relevant {
            return false;
        }

        match read_prefs(&path) {
            Ok(prefs) if prefs != self.prefs => {
                log::debug!("Preferences reloaded from {}", path.display());
                self.prefs = prefs;
                true
            }
            Ok(_) => false,
            Err(err) => {
                log::warn!("Ignoring preferences change: {err:#}");
                false
            }
        }
    }
}

fn read_prefs(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
    toml::from_str(&data)
        .with_context(|| format!("Failed to parse preferences: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_persist_by_key_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(PREFS_FILE);

        let mut store = PrefsStore::open(&path);
        assert_eq!(store.prefs(), Preferences::default());
        store.set(PrefKey::RatingWarningDisabled, true).unwrap();
        assert!(store.toggle(PrefKey::InfoPanelExpanded).unwrap());

        let reopened = PrefsStore::open(&path);
        assert!(reopened.get(PrefKey::RatingWarningDisabled));
        assert!(reopened.get(PrefKey::InfoPanelExpanded));
        assert!(!reopened.get(PrefKey::AlwaysOnTopDisabled));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("rating_warning_disabled = true"));
    }

    #[test]
    fn unknown_and_missing_keys_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        fs::write(&path, "always_on_top_disabled = true\nlegacy_flag = 3\n").unwrap();

        let store = PrefsStore::open(&path);
        assert!(store.get(PrefKey::AlwaysOnTopDisabled));
        assert!(!store.get(PrefKey::InfoPanelExpanded));
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(PrefsStore::open(&path).prefs(), Preferences::default());
    }

    #[test]
    fn in_memory_store_accepts_changes_without_a_file() {
        let mut store = PrefsStore::in_memory();
        store.set(PrefKey::AlwaysOnTopDisabled, true).unwrap();
        assert!(store.get(PrefKey::AlwaysOnTopDisabled));
        assert!(store.enable_watch().is_err());
        assert!(!store.poll_changes());
    }
}
