use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::artwork::DEFAULT_LIBRARY_LIMIT;

pub const APP_DIR_NAME: &str = "music-widget";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub timers: TimerConfig,
    pub rating_warning: RatingWarningConfig,
    pub window: WindowConfig,
    pub artwork: ArtworkConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        for path in candidate_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let doc: ConfigDocument = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(doc.into())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(current_dir) = env::current_dir() {
        candidates.push(current_dir.join("config.toml"));
        candidates.push(current_dir.join("config").join("music-widget.toml"));
    }

    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("config.toml"));
            candidates.push(dir.join("config").join("music-widget.toml"));
        }
    }

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR_NAME).join("config.toml"));
    }

    candidates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Music,
    Demo,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub backend: Backend,
    pub app_name: String,
    pub osascript: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Music,
            app_name: "Music".to_string(),
            osascript: PathBuf::from("/usr/bin/osascript"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerConfig {
    pub coarse_secs: f64,
    pub fine_secs: f64,
    pub startup_probe_secs: f64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            coarse_secs: 5.0,
            fine_secs: 2.0,
            startup_probe_secs: 1.0,
        }
    }
}

impl TimerConfig {
    pub fn coarse(&self) -> Duration {
        secs_clamped(self.coarse_secs, 0.5, 60.0)
    }

    pub fn fine(&self) -> Duration {
        secs_clamped(self.fine_secs, 0.25, 30.0)
    }

    pub fn startup_probe(&self) -> Duration {
        secs_clamped(self.startup_probe_secs, 0.25, 30.0)
    }
}

fn secs_clamped(value: f64, min: f64, max: f64) -> Duration {
    let value = if value.is_finite() { value } else { min };
    Duration::from_secs_f64(value.clamp(min, max))
}

#[derive(Debug, Clone)]
pub struct RatingWarningConfig {
    pub threshold: f64,
    pub volume: f32,
    pub sound: Option<PathBuf>,
}

impl Default for RatingWarningConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            volume: 0.3,
            sound: None,
        }
    }
}

impl RatingWarningConfig {
    pub fn threshold(&self) -> f64 {
        self.threshold.clamp(0.0, 1.0)
    }

    pub fn volume(&self) -> f32 {
        self.volume.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 395.0,
            height: 170.0,
        }
    }
}

impl WindowConfig {
    pub fn width(&self) -> f32 {
        self.width.clamp(240.0, 1200.0)
    }

    pub fn height(&self) -> f32 {
        self.height.clamp(80.0, 400.0)
    }
}

#[derive(Debug, Clone)]
pub struct ArtworkConfig {
    pub library_dir: Option<PathBuf>,
    pub max_entries: usize,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            library_dir: None,
            max_entries: DEFAULT_LIBRARY_LIMIT,
        }
    }
}

impl ArtworkConfig {
    pub fn max_entries(&self) -> usize {
        self.max_entries.max(1)
    }

    pub fn library_dir(&self) -> Option<PathBuf> {
        self.library_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_DIR_NAME).join("artwork")))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    bridge: BridgeSection,
    #[serde(default)]
    timers: TimersSection,
    #[serde(default)]
    rating_warning: RatingWarningSection,
    #[serde(default)]
    window: WindowSection,
    #[serde(default)]
    artwork: ArtworkSection,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let bridge_defaults = BridgeConfig::default();
        let timer_defaults = TimerConfig::default();
        let warning_defaults = RatingWarningConfig::default();
        let window_defaults = WindowConfig::default();

        Config {
            bridge: BridgeConfig {
                backend: value.bridge.backend.unwrap_or_default(),
                app_name: value.bridge.app_name.unwrap_or(bridge_defaults.app_name),
                osascript: value.bridge.osascript.unwrap_or(bridge_defaults.osascript),
            },
            timers: TimerConfig {
                coarse_secs: value.timers.coarse_secs.unwrap_or(timer_defaults.coarse_secs),
                fine_secs: value.timers.fine_secs.unwrap_or(timer_defaults.fine_secs),
                startup_probe_secs: value
                    .timers
                    .startup_probe_secs
                    .unwrap_or(timer_defaults.startup_probe_secs),
            },
            rating_warning: RatingWarningConfig {
                threshold: value
                    .rating_warning
                    .threshold
                    .unwrap_or(warning_defaults.threshold),
                volume: value.rating_warning.volume.unwrap_or(warning_defaults.volume),
                sound: value.rating_warning.sound,
            },
            window: WindowConfig {
                width: value.window.width.unwrap_or(window_defaults.width),
                height: value.window.height.unwrap_or(window_defaults.height),
            },
            artwork: ArtworkConfig {
                library_dir: value.artwork.library_dir,
                max_entries: value.artwork.max_entries.unwrap_or(DEFAULT_LIBRARY_LIMIT),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BridgeSection {
    backend: Option<Backend>,
    app_name: Option<String>,
    osascript: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct TimersSection {
    coarse_secs: Option<f64>,
    fine_secs: Option<f64>,
    startup_probe_secs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RatingWarningSection {
    threshold: Option<f64>,
    volume: Option<f32>,
    sound: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct WindowSection {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtworkSection {
    library_dir: Option<PathBuf>,
    max_entries: Option<usize>,
}
