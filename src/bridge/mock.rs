use super::{BridgeError, BridgeResult, PlayerBridge, PlayerStatus, RepeatMode, TrackInfo};
use std::{
    cell::{Cell, RefCell},
    time::Instant,
};

/// A mutator call received by [`MockBridge`].
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeCall {
    SetPosition(f64),
    SetVolume(f64),
    SetLoved(bool),
    SetRating(u8),
    ToggleShuffle,
    ToggleRepeat,
    PlayPlaylist(String),
    PlayPause,
    Previous,
    Next,
}

/// In-memory player. Fields are public so tests can script what the
/// "external" application reports between ticks.
#[derive(Debug, Clone)]
pub struct MockBridge {
    pub running: bool,
    pub status: PlayerStatus,
    pub position: f64,
    pub track: Option<TrackInfo>,
    pub in_library: bool,
    /// Reported duration; kept apart from `track` so tests can simulate the
    /// zero placeholder the host sometimes returns right after launch.
    pub duration: f64,
    pub volume: f64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub artwork: Option<Vec<u8>>,
    pub playlists: Vec<String>,
    pub queue: Vec<TrackInfo>,
    pub fail_reads: bool,
    calls: Vec<BridgeCall>,
    reads: RefCell<usize>,
}

impl Default for MockBridge {
    fn default() -> Self {
        Self {
            running: true,
            status: PlayerStatus::Stopped,
            position: 0.0,
            track: None,
            in_library: false,
            duration: 0.0,
            volume: 50.0,
            shuffle: false,
            repeat: RepeatMode::Off,
            artwork: None,
            playlists: Vec::new(),
            queue: Vec::new(),
            fail_reads: false,
            calls: Vec::new(),
            reads: RefCell::new(0),
        }
    }
}

impl MockBridge {
    pub fn not_running() -> Self {
        Self {
            running: false,
            status: PlayerStatus::Unknown,
            ..Self::default()
        }
    }

    /// A running player that is playing `track` from the library.
    pub fn playing(track: TrackInfo) -> Self {
        Self {
            status: PlayerStatus::Playing,
            duration: track.duration_secs,
            in_library: true,
            track: Some(track),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[BridgeCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of read operations served so far.
    pub fn read_count(&self) -> usize {
        *self.reads.borrow()
    }

    fn read(&self) -> BridgeResult<()> {
        *self.reads.borrow_mut() += 1;
        if !self.running {
            return Err(BridgeError::NotRunning);
        }
        if self.fail_reads {
            return Err(BridgeError::Script("scripted failure".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, call: BridgeCall) -> BridgeResult<()> {
        if !self.running {
            return Err(BridgeError::NotRunning);
        }
        self.calls.push(call);
        Ok(())
    }

    fn load(&mut self, track: TrackInfo) {
        self.position = 0.0;
        self.duration = track.duration_secs;
        self.track = Some(track);
    }

    /// Moves the playhead as if `secs` of playback elapsed.
    pub fn advance(&mut self, secs: f64) {
        if self.status != PlayerStatus::Playing || self.track.is_none() {
            return;
        }
        self.position += secs;
        if self.duration > 0.0 && self.position >= self.duration {
            if self.repeat == RepeatMode::One {
                self.position = 0.0;
            } else if let Some(track) = self.track.as_mut() {
                track.play_count += 1;
                self.skip(true);
            }
        }
    }

    fn skip(&mut self, forward: bool) {
        if self.queue.is_empty() {
            self.position = 0.0;
            return;
        }
        if let Some(current) = self.track.take() {
            if forward {
                self.queue.push(current);
            } else {
                self.queue.insert(0, current);
            }
        }
        let next = if forward {
            self.queue.remove(0)
        } else {
            self.queue.pop().unwrap_or_default()
        };
        self.load(next);
    }
}

impl PlayerBridge for MockBridge {
    fn is_running(&self) -> BridgeResult<bool> {
        *self.reads.borrow_mut() += 1;
        Ok(self.running)
    }

    fn player_status(&self) -> BridgeResult<PlayerStatus> {
        if !self.running {
            return Ok(PlayerStatus::Unknown);
        }
        self.read()?;
        Ok(self.status)
    }

    fn player_position(&self) -> BridgeResult<f64> {
        self.read()?;
        Ok(self.position)
    }

    fn set_player_position(&mut self, secs: f64) -> BridgeResult<()> {
        self.write(BridgeCall::SetPosition(secs))?;
        self.position = secs;
        Ok(())
    }

    fn track_info(&self) -> BridgeResult<Option<TrackInfo>> {
        self.read()?;
        if !self.status.has_track() {
            return Ok(None);
        }
        Ok(self.track.clone())
    }

    fn track_in_library(&self) -> BridgeResult<bool> {
        self.read()?;
        Ok(self.in_library)
    }

    fn track_duration(&self) -> BridgeResult<f64> {
        self.read()?;
        Ok(self.duration)
    }

    fn sound_volume(&self) -> BridgeResult<f64> {
        self.read()?;
        // The host reports zero while nothing is playing.
        if self.status == PlayerStatus::Stopped {
            return Ok(0.0);
        }
        Ok(self.volume)
    }

    fn set_sound_volume(&mut self, volume: f64) -> BridgeResult<()> {
        self.write(BridgeCall::SetVolume(volume))?;
        self.volume = volume;
        Ok(())
    }

    fn set_loved(&mut self, loved: bool) -> BridgeResult<()> {
        self.write(BridgeCall::SetLoved(loved))?;
        if let Some(track) = self.track.as_mut() {
            track.loved = loved;
        }
        Ok(())
    }

    fn set_rating(&mut self, rating: u8) -> BridgeResult<()> {
        self.write(BridgeCall::SetRating(rating))?;
        if let Some(track) = self.track.as_mut() {
            track.rating = rating.min(100);
        }
        Ok(())
    }

    fn shuffle_enabled(&self) -> BridgeResult<bool> {
        self.read()?;
        Ok(self.shuffle)
    }

    fn toggle_shuffle(&mut self) -> BridgeResult<()> {
        self.write(BridgeCall::ToggleShuffle)?;
        self.shuffle = !self.shuffle;
        Ok(())
    }

    fn song_repeat(&self) -> BridgeResult<RepeatMode> {
        self.read()?;
        Ok(self.repeat)
    }

    fn toggle_song_repeat(&mut self) -> BridgeResult<()> {
        self.write(BridgeCall::ToggleRepeat)?;
        self.repeat = self.repeat.next();
        Ok(())
    }

    fn artwork_data(&self) -> BridgeResult<Option<Vec<u8>>> {
        self.read()?;
        Ok(self.artwork.clone())
    }

    fn favorited_playlists(&self) -> BridgeResult<Vec<String>> {
        self.read()?;
        Ok(self.playlists.clone())
    }

    fn play_playlist(&mut self, name: &str) -> BridgeResult<()> {
        self.write(BridgeCall::PlayPlaylist(name.to_string()))?;
        self.status = PlayerStatus::Playing;
        self.position = 0.0;
        Ok(())
    }

    fn play_pause(&mut self) -> BridgeResult<()> {
        self.write(BridgeCall::PlayPause)?;
        self.status = match self.status {
            PlayerStatus::Playing => PlayerStatus::Paused,
            _ if self.track.is_some() => PlayerStatus::Playing,
            other => other,
        };
        Ok(())
    }

    fn previous_track(&mut self) -> BridgeResult<()> {
        self.write(BridgeCall::Previous)?;
        if self.position > 3.0 {
            self.position = 0.0;
        } else {
            self.skip(false);
        }
        Ok(())
    }

    fn next_track(&mut self) -> BridgeResult<()> {
        self.write(BridgeCall::Next)?;
        self.skip(true);
        Ok(())
    }
}

/// [`MockBridge`] driven by the wall clock, used by the `demo` backend.
pub struct DemoBridge {
    inner: RefCell<MockBridge>,
    last_sync: Cell<Instant>,
}

impl DemoBridge {
    pub fn new() -> Self {
        let tracks = [
            ("Northern Lights", "Aurora Drive", "Polar Nights", 1, 212.0),
            ("Glass Harbour", "Aurora Drive", "Polar Nights", 2, 187.0),
            ("Salt and Static", "The Low Tides", "Weather Report", 7, 264.0),
        ];
        let mut queue: Vec<TrackInfo> = tracks
            .into_iter()
            .map(|(name, artist, album, track_number, duration_secs)| TrackInfo {
                name: name.to_string(),
                artist: artist.to_string(),
                album: album.to_string(),
                track_number,
                duration_secs,
                play_count: 3,
                ..TrackInfo::default()
            })
            .collect();
        let first = queue.remove(0);

        let mut inner = MockBridge::playing(first);
        inner.queue = queue;
        inner.volume = 40.0;
        inner.playlists = vec!["Morning Coffee".to_string(), "Long Drive".to_string()];

        Self {
            inner: RefCell::new(inner),
            last_sync: Cell::new(Instant::now()),
        }
    }

    /// Catches the simulated playhead up with the wall clock.
    fn sync(&self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sync.get()).as_secs_f64();
        self.last_sync.set(now);
        self.inner.borrow_mut().advance(elapsed);
    }

    fn read<T>(&self, op: impl FnOnce(&MockBridge) -> BridgeResult<T>) -> BridgeResult<T> {
        self.sync();
        let inner = self.inner.borrow();
        op(&*inner)
    }

    fn write(&mut self, op: impl FnOnce(&mut MockBridge) -> BridgeResult<()>) -> BridgeResult<()> {
        self.sync();
        op(self.inner.get_mut())
    }
}

impl Default for DemoBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerBridge for DemoBridge {
    fn is_running(&self) -> BridgeResult<bool> {
        self.read(MockBridge::is_running)
    }
    fn player_status(&self) -> BridgeResult<PlayerStatus> {
        self.read(MockBridge::player_status)
    }
    fn player_position(&self) -> BridgeResult<f64> {
        self.read(MockBridge::player_position)
    }
    fn set_player_position(&mut self, secs: f64) -> BridgeResult<()> {
        self.write(|inner| inner.set_player_position(secs))
    }
    fn track_info(&self) -> BridgeResult<Option<TrackInfo>> {
        self.read(MockBridge::track_info)
    }
    fn track_in_library(&self) -> BridgeResult<bool> {
        self.read(MockBridge::track_in_library)
    }
    fn track_duration(&self) -> BridgeResult<f64> {
        self.read(MockBridge::track_duration)
    }
    fn sound_volume(&self) -> BridgeResult<f64> {
        self.read(MockBridge::sound_volume)
    }
    fn set_sound_volume(&mut self, volume: f64) -> BridgeResult<()> {
        self.write(|inner| inner.set_sound_volume(volume))
    }
    fn set_loved(&mut self, loved: bool) -> BridgeResult<()> {
        self.write(|inner| inner.set_loved(loved))
    }
    fn set_rating(&mut self, rating: u8) -> BridgeResult<()> {
        self.write(|inner| inner.set_rating(rating))
    }
    fn shuffle_enabled(&self) -> BridgeResult<bool> {
        self.read(MockBridge::shuffle_enabled)
    }
    fn toggle_shuffle(&mut self) -> BridgeResult<()> {
        self.write(MockBridge::toggle_shuffle)
    }
    fn song_repeat(&self) -> BridgeResult<RepeatMode> {
        self.read(MockBridge::song_repeat)
    }
    fn toggle_song_repeat(&mut self) -> BridgeResult<()> {
        self.write(MockBridge::toggle_song_repeat)
    }
    fn artwork_data(&self) -> BridgeResult<Option<Vec<u8>>> {
        self.read(MockBridge::artwork_data)
    }
    fn favorited_playlists(&self) -> BridgeResult<Vec<String>> {
        self.read(MockBridge::favorited_playlists)
    }
    fn play_playlist(&mut self, name: &str) -> BridgeResult<()> {
        self.write(|inner| inner.play_playlist(name))
    }
    fn play_pause(&mut self) -> BridgeResult<()> {
        self.write(MockBridge::play_pause)
    }
    fn previous_track(&mut self) -> BridgeResult<()> {
        self.write(MockBridge::previous_track)
    }
    fn next_track(&mut self) -> BridgeResult<()> {
        self.write(MockBridge::next_track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, duration: f64) -> TrackInfo {
        TrackInfo {
            name: name.to_string(),
            duration_secs: duration,
            ..TrackInfo::default()
        }
    }

    #[test]
    fn advance_rolls_over_to_the_next_queued_track() {
        let mut bridge = MockBridge::playing(track("a", 10.0));
        bridge.queue = vec![track("b", 20.0)];
        bridge.advance(11.0);
        assert_eq!(bridge.track.as_ref().map(|t| t.name.as_str()), Some("b"));
        assert_eq!(bridge.position, 0.0);
        assert_eq!(bridge.duration, 20.0);
    }

    #[test]
    fn stopped_player_reports_zero_volume() {
        let mut bridge = MockBridge::default();
        bridge.volume = 70.0;
        assert_eq!(bridge.sound_volume().unwrap(), 0.0);
        bridge.status = PlayerStatus::Playing;
        assert_eq!(bridge.sound_volume().unwrap(), 70.0);
    }

    #[test]
    fn writes_fail_while_not_running() {
        let mut bridge = MockBridge::not_running();
        assert!(matches!(bridge.play_pause(), Err(BridgeError::NotRunning)));
        assert!(bridge.calls().is_empty());
        assert_eq!(bridge.player_status().unwrap(), PlayerStatus::Unknown);
    }
}
