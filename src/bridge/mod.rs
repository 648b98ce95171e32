//! Port to the external player application.
//!
//! Everything the widget knows about playback comes through [`PlayerBridge`].
//! The real adapter drives the Music app over AppleScript; the mock adapter
//! keeps the same state in memory for tests and the demo backend.

mod applescript;
mod mock;

pub use applescript::AppleScriptBridge;
pub use mock::{BridgeCall, DemoBridge, MockBridge};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("the player application is not running")]
    NotRunning,
    #[error("script failed: {0}")]
    Script(String),
    #[error("failed to launch osascript: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected reply for {field}: {reply:?}")]
    Parse { field: &'static str, reply: String },
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlayerStatus {
    #[default]
    Unknown,
    Stopped,
    Playing,
    Paused,
    FastForwarding,
    Rewinding,
}

impl PlayerStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => PlayerStatus::Stopped,
            2 => PlayerStatus::Playing,
            3 => PlayerStatus::Paused,
            4 => PlayerStatus::FastForwarding,
            5 => PlayerStatus::Rewinding,
            _ => PlayerStatus::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            PlayerStatus::Unknown => 0,
            PlayerStatus::Stopped => 1,
            PlayerStatus::Playing => 2,
            PlayerStatus::Paused => 3,
            PlayerStatus::FastForwarding => 4,
            PlayerStatus::Rewinding => 5,
        }
    }

    /// Parses the `player state as string` reply of the Music app.
    pub fn from_reply(reply: &str) -> Self {
        match reply.trim().to_ascii_lowercase().as_str() {
            "stopped" => PlayerStatus::Stopped,
            "playing" => PlayerStatus::Playing,
            "paused" => PlayerStatus::Paused,
            "fast forwarding" => PlayerStatus::FastForwarding,
            "rewinding" => PlayerStatus::Rewinding,
            _ => PlayerStatus::Unknown,
        }
    }

    /// Duration and position are meaningless while nothing is loaded.
    pub fn has_track(self) -> bool {
        !matches!(self, PlayerStatus::Unknown | PlayerStatus::Stopped)
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerStatus::Unknown => "Unknown",
            PlayerStatus::Stopped => "Stopped",
            PlayerStatus::Playing => "Playing",
            PlayerStatus::Paused => "Paused",
            PlayerStatus::FastForwarding => "Fast forwarding",
            PlayerStatus::Rewinding => "Rewinding",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Off -> All -> One -> Off.
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    /// Accepts both the plain `song repeat as string` values and the raw
    /// four-character event codes.
    pub fn from_reply(reply: &str) -> Option<Self> {
        match reply.trim() {
            "off" | "kRp0" | "kRpO" => Some(RepeatMode::Off),
            "all" | "kAll" => Some(RepeatMode::All),
            "one" | "kRp1" => Some(RepeatMode::One),
            _ => None,
        }
    }

    pub fn as_script_value(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }

    pub fn is_active(self) -> bool {
        self != RepeatMode::Off
    }
}

/// Raw metadata of the current track as the bridge reports it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub track_number: u32,
    pub duration_secs: f64,
    pub loved: bool,
    /// 0..=100, in steps of 20 for whole stars.
    pub rating: u8,
    pub date_added: Option<String>,
    pub date_played: Option<String>,
    pub play_count: u32,
}

pub trait PlayerBridge {
    fn is_running(&self) -> BridgeResult<bool>;
    fn player_status(&self) -> BridgeResult<PlayerStatus>;

    fn player_position(&self) -> BridgeResult<f64>;
    fn set_player_position(&mut self, secs: f64) -> BridgeResult<()>;

    /// `None` when no track is loaded.
    fn track_info(&self) -> BridgeResult<Option<TrackInfo>>;
    fn track_in_library(&self) -> BridgeResult<bool>;
    fn track_duration(&self) -> BridgeResult<f64>;

    fn sound_volume(&self) -> BridgeResult<f64>;
    fn set_sound_volume(&mut self, volume: f64) -> BridgeResult<()>;

    fn set_loved(&mut self, loved: bool) -> BridgeResult<()>;
    fn set_rating(&mut self, rating: u8) -> BridgeResult<()>;

    fn shuffle_enabled(&self) -> BridgeResult<bool>;
    fn toggle_shuffle(&mut self) -> BridgeResult<()>;
    fn song_repeat(&self) -> BridgeResult<RepeatMode>;
    fn toggle_song_repeat(&mut self) -> BridgeResult<()>;

    fn artwork_data(&self) -> BridgeResult<Option<Vec<u8>>>;
    fn favorited_playlists(&self) -> BridgeResult<Vec<String>>;
    fn play_playlist(&mut self, name: &str) -> BridgeResult<()>;

    fn play_pause(&mut self) -> BridgeResult<()>;
    fn previous_track(&mut self) -> BridgeResult<()>;
    fn next_track(&mut self) -> BridgeResult<()>;
}

impl<B: PlayerBridge + ?Sized> PlayerBridge for Box<B> {
    fn is_running(&self) -> BridgeResult<bool> {
        (**self).is_running()
    }
    fn player_status(&self) -> BridgeResult<PlayerStatus> {
        (**self).player_status()
    }
    fn player_position(&self) -> BridgeResult<f64> {
        (**self).player_position()
    }
    fn set_player_position(&mut self, secs: f64) -> BridgeResult<()> {
        (**self).set_player_position(secs)
    }
    fn track_info(&self) -> BridgeResult<Option<TrackInfo>> {
        (**self).track_info()
    }
    fn track_in_library(&self) -> BridgeResult<bool> {
        (**self).track_in_library()
    }
    fn track_duration(&self) -> BridgeResult<f64> {
        (**self).track_duration()
    }
    fn sound_volume(&self) -> BridgeResult<f64> {
        (**self).sound_volume()
    }
    fn set_sound_volume(&mut self, volume: f64) -> BridgeResult<()> {
        (**self).set_sound_volume(volume)
    }
    fn set_loved(&mut self, loved: bool) -> BridgeResult<()> {
        (**self).set_loved(loved)
    }
    fn set_rating(&mut self, rating: u8) -> BridgeResult<()> {
        (**self).set_rating(rating)
    }
    fn shuffle_enabled(&self) -> BridgeResult<bool> {
        (**self).shuffle_enabled()
    }
    fn toggle_shuffle(&mut self) -> BridgeResult<()> {
        (**self).toggle_shuffle()
    }
    fn song_repeat(&self) -> BridgeResult<RepeatMode> {
        (**self).song_repeat()
    }
    fn toggle_song_repeat(&mut self) -> BridgeResult<()> {
        (**self).toggle_song_repeat()
    }
    fn artwork_data(&self) -> BridgeResult<Option<Vec<u8>>> {
        (**self).artwork_data()
    }
    fn favorited_playlists(&self) -> BridgeResult<Vec<String>> {
        (**self).favorited_playlists()
    }
    fn play_playlist(&mut self, name: &str) -> BridgeResult<()> {
        (**self).play_playlist(name)
    }
    fn play_pause(&mut self) -> BridgeResult<()> {
        (**self).play_pause()
    }
    fn previous_track(&mut self) -> BridgeResult<()> {
        (**self).previous_track()
    }
    fn next_track(&mut self) -> BridgeResult<()> {
        (**self).next_track()
    }
}
