use crate::{
    artwork::Artwork,
    bridge::{PlayerStatus, RepeatMode, TrackInfo},
    rating::stars_from_bridge,
};

/// Local cache of the host's current track. Only valid until the next poll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub track_number: u32,
    pub duration_secs: f64,
    pub date_added: String,
    pub date_played: String,
    pub play_count: u32,
    pub loved: bool,
    /// 0..=5 stars.
    pub rating: u8,
}

impl Track {
    pub fn from_info(info: TrackInfo) -> Self {
        Self {
            name: info.name,
            artist: info.artist,
            album: info.album,
            track_number: info.track_number,
            duration_secs: info.duration_secs,
            date_added: info.date_added.unwrap_or_else(|| "-".to_string()),
            date_played: info.date_played.unwrap_or_else(|| "never".to_string()),
            play_count: info.play_count,
            loved: info.loved,
            rating: stars_from_bridge(info.rating),
        }
    }

    /// Two tracks are the same recording if these match; used to decide
    /// when artwork must be fetched again.
    pub fn identity(&self) -> TrackIdentity {
        TrackIdentity {
            name: self.name.clone(),
            album: self.album.clone(),
            track_number: self.track_number,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.artist.is_empty() && self.album.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    pub name: String,
    pub album: String,
    pub track_number: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Connection {
    /// Probing once per interval until the host reports running.
    #[default]
    Waiting,
    Running,
}

/// Everything the view renders. Owned by the controller.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub connection: Connection,
    pub status: PlayerStatus,
    pub track: Track,
    pub in_library: bool,
    pub artwork: Artwork,
    pub position_secs: f64,
    /// `None` until the host reports a usable duration.
    pub duration_secs: Option<f64>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub favorited_playlists: Vec<String>,
    pub last_error: Option<String>,
}

impl AppState {
    pub fn is_running(&self) -> bool {
        self.connection == Connection::Running
    }

    /// Resets everything that describes playback; used when the host goes
    /// away.
    pub fn clear_playback(&mut self) {
        self.status = PlayerStatus::Unknown;
        self.track = Track::default();
        self.in_library = false;
        self.artwork = Artwork::Placeholder;
        self.position_secs = 0.0;
        self.duration_secs = None;
    }
}
