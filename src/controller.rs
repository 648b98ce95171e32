//! Refresh loop and user commands.
//!
//! The controller is the only owner of the bridge and the state model. The
//! view calls [`Controller::poll`] once per frame and reads back
//! [`Controller::state`]; every button ends up in one of the command methods
//! below.

use std::time::{Duration, Instant};

use crate::{
    artwork::{resolve_artwork, Artwork, ArtworkLibrary},
    bridge::{BridgeError, BridgeResult, PlayerBridge, PlayerStatus},
    config::TimerConfig,
    model::{AppState, Connection, Track},
    rating::{next_rating, progress, stars_to_bridge, RatingWarning, WarningStep},
    timers::{Probe, Ticks, Timers},
    volume::VolumeSlider,
};

/// What happened during one [`Controller::poll`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub ticks: Ticks,
    /// The startup probe ran this frame.
    pub probed: bool,
    /// The rating warning wants the alert chime played.
    pub chime: bool,
}

impl PollOutcome {
    pub fn changed(&self) -> bool {
        self.ticks.any() || self.probed
    }
}

pub struct Controller<B: PlayerBridge> {
    bridge: B,
    state: AppState,
    timers: Timers,
    probe: Probe,
    volume: VolumeSlider,
    warning: RatingWarning,
    library: ArtworkLibrary,
    attached: bool,
    seeking: bool,
    position_sampled_at: Option<Instant>,
    marquee_right: bool,
}

impl<B: PlayerBridge> Controller<B> {
    pub fn new(
        bridge: B,
        timers: &TimerConfig,
        warning_threshold: f64,
        library: ArtworkLibrary,
    ) -> Self {
        Self {
            bridge,
            state: AppState::default(),
            timers: Timers::new(timers.coarse(), timers.fine()),
            probe: Probe::new(timers.startup_probe()),
            volume: VolumeSlider::default(),
            warning: RatingWarning::new(warning_threshold),
            library,
            attached: false,
            seeking: false,
            position_sampled_at: None,
            marquee_right: false,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn volume(&self) -> &VolumeSlider {
        &self.volume
    }

    pub fn is_flashing(&self) -> bool {
        self.warning.is_flashing()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Alignment of overflowing labels; flips on every fine tick.
    pub fn marquee_right(&self) -> bool {
        self.marquee_right
    }

    /// Starts the timers and, unless the host is already known to be up,
    /// the startup probe. Called when the window becomes visible.
    pub fn attach(&mut self, now: Instant) {
        if self.attached {
            return;
        }
        self.attached = true;
        self.timers.start(now);
        self.warning.attach();
        if !self.state.is_running() {
            self.probe.arm(now);
        }
        log::debug!("Controller attached");
    }

    /// Stops all periodic work. Called when the window is minimised or
    /// closed.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.seeking = false;
        self.timers.stop();
        self.probe.disarm();
        log::debug!("Controller detached");
    }

    pub fn poll(&mut self, now: Instant, warning_disabled: bool) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if !self.attached {
            return outcome;
        }

        if self.probe.due(now) {
            outcome.probed = true;
            self.probe_host(now);
        }

        outcome.ticks = self.timers.poll(now);
        if outcome.ticks.coarse.is_some() {
            self.coarse_tick(now);
        }
        if outcome.ticks.fine.is_some() {
            outcome.chime = self.fine_tick(now, warning_disabled);
        }
        outcome
    }

    /// Time until the next timer or probe deadline, for repaint scheduling.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        match (
            self.timers.time_until_due(now),
            self.probe.time_until_due(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Position extrapolated from the last sample while playing, so the
    /// slider moves between coarse ticks.
    pub fn displayed_position(&self, now: Instant) -> f64 {
        let base = self.state.position_secs;
        let Some(duration) = self.state.duration_secs else {
            return base;
        };
        if self.seeking || self.state.status != PlayerStatus::Playing {
            return base;
        }
        let elapsed = self
            .position_sampled_at
            .map_or(0.0, |at| now.saturating_duration_since(at).as_secs_f64());
        (base + elapsed).clamp(0.0, duration)
    }

    /// Only a running host with a known status counts as up. Failures are
    /// reported and the next check stays on schedule.
    fn probe_host(&mut self, now: Instant) {
        let status = match self.bridge.is_running() {
            Ok(true) => self.bridge.player_status(),
            Ok(false) | Err(BridgeError::NotRunning) => Ok(PlayerStatus::Unknown),
            Err(err) => Err(err),
        };
        let status = match status {
            Ok(status) => status,
            Err(BridgeError::NotRunning) => PlayerStatus::Unknown,
            Err(err) => {
                self.report("Checking for the player", &err);
                PlayerStatus::Unknown
            }
        };

        if status != PlayerStatus::Unknown {
            log::info!("Player is running ({})", status.label());
            self.state.connection = Connection::Running;
            self.probe.disarm();
            self.full_refresh(now);
        } else if self.state.status != PlayerStatus::Unknown || !self.state.track.is_empty() {
            self.state.clear_playback();
        }
    }

    /// Switches back to waiting for the host.
    fn lose_host(&mut self, now: Instant) {
        if self.state.connection == Connection::Running {
            log::info!("Player is no longer running");
        }
        self.state.connection = Connection::Waiting;
        self.state.clear_playback();
        self.position_sampled_at = None;
        self.seeking = false;
        if self.attached {
            self.probe.arm(now);
        }
    }

    /// Unwraps a bridge result. `NotRunning` drops back to waiting; other
    /// failures are logged and kept for the status line.
    fn check<T>(&mut self, what: &str, result: BridgeResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(BridgeError::NotRunning) => {
                self.lose_host(Instant::now());
                None
            }
            Err(err) => {
                self.report(what, &err);
                None
            }
        }
    }

    /// Keeps the error for the status line. Repeats of the same message are
    /// not logged again.
    fn report(&mut self, what: &str, err: &BridgeError) {
        let message = format!("{what}: {err}");
        if self.state.last_error.as_deref() != Some(message.as_str()) {
            log::warn!("{what} failed: {err}");
        }
        self.state.last_error = Some(message);
    }

    /// Re-reads everything: status, volume, track, library flag, artwork,
    /// position and playlists.
    pub fn full_refresh(&mut self, now: Instant) {
        if !self.state.is_running() {
            return;
        }
        let Some(status) = self.refresh_status(now) else {
            return;
        };

        let volume = self.bridge.sound_volume();
        if let Some(volume) = self.check("Reading volume", volume) {
            if self.volume.needs_seed() {
                self.volume.assign(volume);
            } else {
                self.volume.pull(volume, status);
            }
        }

        self.refresh_track(true);
        self.refresh_position(now);
        if !self.state.is_running() {
            return;
        }

        let shuffle = self.bridge.shuffle_enabled();
        if let Some(shuffle) = self.check("Reading shuffle", shuffle) {
            self.state.shuffle = shuffle;
        }
        let repeat = self.bridge.song_repeat();
        if let Some(repeat) = self.check("Reading repeat", repeat) {
            self.state.repeat = repeat;
        }
        self.refresh_playlists();
    }

    fn refresh_status(&mut self, now: Instant) -> Option<PlayerStatus> {
        let status = self.bridge.player_status();
        let status = self.check("Reading player state", status)?;
        if status == PlayerStatus::Unknown {
            self.lose_host(now);
            return None;
        }
        self.state.status = status;
        self.state.last_error = None;
        Some(status)
    }

    /// Rebuilds the track. Artwork and the library flag are only
    /// re-resolved when the identity changed, unless `force` is set.
    fn refresh_track(&mut self, force: bool) {
        let info = self.bridge.track_info();
        let Some(info) = self.check("Reading track", info) else {
            return;
        };
        let Some(info) = info else {
            if !self.state.track.is_empty() {
                log::debug!("No current track");
            }
            self.state.track = Track::default();
            self.state.in_library = false;
            self.state.artwork = Artwork::Placeholder;
            return;
        };

        let track = Track::from_info(info);
        let changed = track.identity() != self.state.track.identity();
        if !changed && !force {
            self.state.track.loved = track.loved;
            self.state.track.rating = track.rating;
            self.state.track.play_count = track.play_count;
            self.state.track.date_played = track.date_played;
            return;
        }

        if changed {
            log::info!("Now playing: {} - {}", track.artist, track.name);
        }
        let identity = track.identity();
        self.state.track = track;

        let in_library = self.bridge.track_in_library();
        self.state.in_library = self.check("Reading library flag", in_library).unwrap_or(false);

        let (artwork, source) = resolve_artwork(&mut self.library, &identity, &self.bridge);
        log::debug!("Artwork for {:?} from {source:?}", identity.name);
        self.state.artwork = artwork;
    }

    fn refresh_position(&mut self, now: Instant) {
        if self.seeking {
            return;
        }
        let duration = self.bridge.track_duration();
        let Some(duration) = self.check("Reading duration", duration) else {
            return;
        };
        self.state.duration_secs = usable_duration(self.state.status, duration);

        let position = self.bridge.player_position();
        let Some(position) = self.check("Reading position", position) else {
            return;
        };
        let upper = self.state.duration_secs.unwrap_or(f64::INFINITY);
        self.state.position_secs = if position.is_finite() {
            position.clamp(0.0, upper)
        } else {
            0.0
        };
        self.position_sampled_at = Some(now);
    }

    fn refresh_playlists(&mut self) {
        let playlists = self.bridge.favorited_playlists();
        if let Some(playlists) = self.check("Reading playlists", playlists) {
            self.state.favorited_playlists = playlists;
        }
    }

    fn coarse_tick(&mut self, now: Instant) {
        if !self.state.is_running() {
            return;
        }
        let Some(status) = self.refresh_status(now) else {
            return;
        };
        self.refresh_track(false);
        if !self.state.is_running() {
            return;
        }
        self.refresh_position(now);

        let volume = self.bridge.sound_volume();
        if let Some(volume) = self.check("Reading volume", volume) {
            if self.volume.pull(volume, status) {
                log::debug!("Volume changed in the player: {volume}");
            }
        }
    }

    /// Returns true when the alert chime is due.
    fn fine_tick(&mut self, now: Instant, warning_disabled: bool) -> bool {
        self.marquee_right = !self.marquee_right;

        if self.state.is_running() {
            let shuffle = self.bridge.shuffle_enabled();
            if let Some(shuffle) = self.check("Reading shuffle", shuffle) {
                self.state.shuffle = shuffle;
            }
            let repeat = self.bridge.song_repeat();
            if let Some(repeat) = self.check("Reading repeat", repeat) {
                self.state.repeat = repeat;
            }
        }

        let progress = progress(self.displayed_position(now), self.state.duration_secs);
        let step = self
            .warning
            .step(self.state.track.rating, progress, warning_disabled);
        step == WarningStep::Alert
    }

    fn transport(&mut self, what: &str, op: fn(&mut B) -> BridgeResult<()>) {
        let result = op(&mut self.bridge);
        if self.check(what, result).is_some() {
            self.full_refresh(Instant::now());
        }
    }

    pub fn play_pause(&mut self) {
        self.transport("Play/pause", B::play_pause);
    }

    pub fn previous_track(&mut self) {
        self.transport("Previous track", B::previous_track);
    }

    pub fn next_track(&mut self) {
        self.transport("Next track", B::next_track);
    }

    pub fn play_playlist(&mut self, name: &str) {
        let result = self.bridge.play_playlist(name);
        if self.check("Playing playlist", result).is_some() {
            log::info!("Playing playlist {name:?}");
            self.full_refresh(Instant::now());
        }
    }

    pub fn toggle_loved(&mut self) {
        let loved = !self.state.track.loved;
        let result = self.bridge.set_loved(loved);
        if self.check("Setting loved", result).is_some() {
            self.state.track.loved = loved;
        }
    }

    /// Clicking the star that is already set clears the rating.
    pub fn set_rating(&mut self, stars: u8) {
        let stars = next_rating(self.state.track.rating, stars);
        let result = self.bridge.set_rating(stars_to_bridge(stars));
        if self.check("Setting rating", result).is_some() {
            self.state.track.rating = stars;
        }
    }

    /// Shuffle is mirrored from the player; the local flip only lasts until
    /// the next fine tick.
    pub fn toggle_shuffle(&mut self) {
        let result = self.bridge.toggle_shuffle();
        if self.check("Toggling shuffle", result).is_some() {
            self.state.shuffle = !self.state.shuffle;
        }
    }

    pub fn cycle_repeat(&mut self) {
        let result = self.bridge.toggle_song_repeat();
        if self.check("Cycling repeat", result).is_some() {
            self.state.repeat = self.state.repeat.next();
        }
    }

    pub fn begin_seek(&mut self) {
        self.seeking = true;
    }

    /// Writes a new position, clamped to the known duration. Ignored while
    /// the duration is unavailable.
    pub fn seek(&mut self, secs: f64, now: Instant) {
        let Some(duration) = self.state.duration_secs else {
            return;
        };
        let secs = if secs.is_finite() {
            secs.clamp(0.0, duration)
        } else {
            0.0
        };
        let result = self.bridge.set_player_position(secs);
        if self.check("Seeking", result).is_some() {
            self.state.position_secs = secs;
            self.position_sampled_at = Some(now);
        }
    }

    pub fn end_seek(&mut self) {
        self.seeking = false;
    }

    /// Jumps to one second before the end so the player counts the play
    /// and moves on by itself.
    pub fn end_track(&mut self, now: Instant) {
        if let Some(duration) = self.state.duration_secs {
            self.seek((duration - 1.0).max(0.0), now);
        }
    }

    pub fn set_volume(&mut self, value: f64) {
        if let Some(value) = self.volume.assign(value) {
            self.write_volume(value);
        }
    }

    pub fn mute(&mut self) {
        self.set_volume(crate::volume::MIN_VOLUME);
    }

    pub fn max_volume(&mut self) {
        self.set_volume(crate::volume::MAX_VOLUME);
    }

    pub fn begin_volume_drag(&mut self) {
        self.volume.begin_drag();
    }

    pub fn end_volume_drag(&mut self) {
        if let Some(value) = self.volume.end_drag() {
            self.write_volume(value);
        }
    }

    fn write_volume(&mut self, value: f64) {
        let result = self.bridge.set_sound_volume(value);
        self.check("Setting volume", result);
    }
}

/// The host reports zero (or garbage) for a while after launch and while
/// stopped; none of that is a usable duration.
pub fn usable_duration(status: PlayerStatus, reported: f64) -> Option<f64> {
    if status.has_track() && reported.is_finite() && reported > 0.0 {
        Some(reported)
    } else {
        None
    }
}
