use std::time::{Duration, Instant};

use music_widget::{
    artwork::ArtworkLibrary,
    bridge::{BridgeCall, MockBridge, PlayerStatus, TrackInfo},
    config::TimerConfig,
    controller::Controller,
};

const SEC: Duration = Duration::from_secs(1);

fn song(name: &str, duration: f64) -> TrackInfo {
    TrackInfo {
        name: name.to_string(),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        track_number: 3,
        duration_secs: duration,
        ..TrackInfo::default()
    }
}

fn controller(bridge: MockBridge) -> Controller<MockBridge> {
    Controller::new(
        bridge,
        &TimerConfig::default(),
        0.8,
        ArtworkLibrary::open(None),
    )
}

#[test]
fn zero_duration_shows_loading_until_the_player_catches_up() {
    let mut bridge = MockBridge::playing(song("Slow Start", 240.0));
    bridge.duration = 0.0;
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    assert!(c.state().is_running());
    assert_eq!(c.state().duration_secs, None);

    c.bridge_mut().duration = 240.0;
    c.bridge_mut().position = 30.0;
    c.poll(t0 + 5 * SEC, false);
    assert_eq!(c.state().duration_secs, Some(240.0));
    assert_eq!(c.state().position_secs, 30.0);

    c.bridge_mut().position = 35.0;
    c.poll(t0 + 10 * SEC, false);
    assert_eq!(c.state().duration_secs, Some(240.0));
    assert_eq!(c.state().position_secs, 35.0);
}

#[test]
fn volume_follows_the_player_only_while_playing() {
    let mut bridge = MockBridge::playing(song("a", 200.0));
    bridge.volume = 40.0;
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);
    assert_eq!(c.volume().value(), 40.0);

    c.bridge_mut().volume = 65.0;
    c.poll(t0 + 5 * SEC, false);
    assert_eq!(c.volume().value(), 65.0);

    // A stopped player reports zero; that must not reach the slider.
    c.bridge_mut().status = PlayerStatus::Stopped;
    c.poll(t0 + 10 * SEC, false);
    assert_eq!(c.volume().value(), 65.0);

    // Pulled values are never written back.
    assert!(c
        .bridge()
        .calls()
        .iter()
        .all(|call| !matches!(call, BridgeCall::SetVolume(_))));
}

#[test]
fn volume_drag_is_not_overwritten_and_writes_on_release() {
    let mut c = controller(MockBridge::playing(song("a", 200.0)));
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    c.begin_volume_drag();
    c.set_volume(20.0);
    c.bridge_mut().volume = 90.0;
    c.poll(t0 + 5 * SEC, false);
    assert_eq!(c.volume().value(), 20.0);

    c.end_volume_drag();
    assert_eq!(
        c.bridge().calls(),
        &[BridgeCall::SetVolume(20.0), BridgeCall::SetVolume(20.0)]
    );
}

#[test]
fn rating_warning_skips_the_first_tick_after_attach() {
    let mut bridge = MockBridge::playing(song("Unrated", 100.0));
    bridge.position = 90.0;
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    let first = c.poll(t0 + 2 * SEC, false);
    assert!(first.ticks.fine.is_some());
    assert!(!first.chime);
    assert!(!c.is_flashing());

    let second = c.poll(t0 + 4 * SEC, false);
    assert!(second.chime);
    assert!(c.is_flashing());

    let third = c.poll(t0 + 6 * SEC, false);
    assert!(third.chime);
    assert!(!c.is_flashing(), "flashing toggles on every alert");

    // Re-attaching resets the skip.
    c.detach();
    let t1 = t0 + 10 * SEC;
    c.attach(t1);
    assert!(!c.poll(t1 + 2 * SEC, false).chime);
}

#[test]
fn rating_warning_respects_the_preference_and_rated_tracks() {
    let mut bridge = MockBridge::playing(song("Unrated", 100.0));
    bridge.position = 90.0;
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);
    c.poll(t0 + 2 * SEC, true);

    assert!(!c.poll(t0 + 4 * SEC, true).chime);
    assert!(!c.is_flashing());

    c.set_rating(2);
    assert!(!c.poll(t0 + 6 * SEC, false).chime);
}

#[test]
fn probe_runs_once_per_second_until_the_player_starts() {
    let mut c = controller(MockBridge::not_running());
    let t0 = Instant::now();
    c.attach(t0);

    assert!(c.poll(t0, false).probed);
    assert!(!c.poll(t0 + SEC / 2, false).probed);
    assert!(c.poll(t0 + SEC, false).probed);
    assert!(!c.poll(t0 + SEC + SEC / 2, false).probed);
    assert!(!c.state().is_running());

    *c.bridge_mut() = MockBridge::playing(song("Hello", 180.0));
    assert!(c.poll(t0 + 2 * SEC, false).probed);
    assert!(c.state().is_running());
    assert_eq!(c.state().track.name, "Hello");

    // Connected: no more probing.
    assert!(!c.poll(t0 + 3 * SEC, false).probed);
}

#[test]
fn a_running_player_with_unknown_status_is_still_waited_for() {
    let mut bridge = MockBridge::not_running();
    bridge.running = true;
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);
    assert!(!c.state().is_running());
}

#[test]
fn nothing_is_read_while_detached() {
    let mut c = controller(MockBridge::playing(song("a", 100.0)));
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);
    c.detach();

    let reads = c.bridge().read_count();
    for secs in 1..30 {
        let outcome = c.poll(t0 + secs * SEC, false);
        assert!(!outcome.changed());
    }
    assert_eq!(c.bridge().read_count(), reads);
    assert_eq!(c.time_until_next(t0), None);
}

#[test]
fn track_change_is_picked_up_on_the_coarse_tick() {
    let mut bridge = MockBridge::playing(song("first", 10.0));
    bridge.queue = vec![song("second", 50.0)];
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    c.bridge_mut().advance(11.0);
    c.poll(t0 + 5 * SEC, false);
    assert_eq!(c.state().track.name, "second");
    assert_eq!(c.state().duration_secs, Some(50.0));
}

#[test]
fn loved_and_rating_changes_in_the_player_show_up() {
    let mut c = controller(MockBridge::playing(song("a", 100.0)));
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    if let Some(track) = c.bridge_mut().track.as_mut() {
        track.loved = true;
        track.rating = 100;
    }
    c.poll(t0 + 5 * SEC, false);
    assert!(c.state().track.loved);
    assert_eq!(c.state().track.rating, 5);
}

#[test]
fn dragging_the_position_holds_off_the_coarse_refresh() {
    let mut c = controller(MockBridge::playing(song("a", 100.0)));
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    c.begin_seek();
    c.seek(42.0, t0 + SEC);
    c.bridge_mut().position = 7.0;
    c.poll(t0 + 5 * SEC, false);
    assert_eq!(c.state().position_secs, 42.0);

    c.end_seek();
    c.poll(t0 + 10 * SEC, false);
    assert_eq!(c.state().position_secs, 7.0);
}

#[test]
fn playlist_selection_plays_and_refreshes() {
    let mut bridge = MockBridge::playing(song("a", 100.0));
    bridge.playlists = vec!["Road Trip".to_string()];
    let mut c = controller(bridge);
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);
    assert_eq!(c.state().favorited_playlists, vec!["Road Trip".to_string()]);

    c.play_playlist("Road Trip");
    assert_eq!(
        c.bridge().calls(),
        &[BridgeCall::PlayPlaylist("Road Trip".to_string())]
    );
}

#[test]
fn position_updates_resume_after_the_player_restarts_mid_drag() {
    let mut c = controller(MockBridge::playing(song("a", 100.0)));
    let t0 = Instant::now();
    c.attach(t0);
    c.poll(t0, false);

    c.begin_seek();
    c.bridge_mut().running = false;
    c.poll(t0 + 5 * SEC, false);
    assert!(!c.state().is_running());

    let mut bridge = MockBridge::playing(song("b", 200.0));
    bridge.position = 12.0;
    *c.bridge_mut() = bridge;
    c.poll(t0 + 6 * SEC, false);
    assert!(c.state().is_running());
    assert!(!c.is_seeking());
    assert_eq!(c.state().duration_secs, Some(200.0));

    c.bridge_mut().position = 20.0;
    c.poll(t0 + 10 * SEC, false);
    assert_eq!(c.state().position_secs, 20.0);
}
