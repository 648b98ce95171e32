use std::time::{Duration, Instant};

use music_widget::{config::TimerConfig, timers::Timers};

#[test]
fn default_cadence_over_a_minute() {
    let config = TimerConfig::default();
    let mut timers = Timers::new(config.coarse(), config.fine());
    let start = Instant::now();
    timers.start(start);

    // One frame every 100ms.
    let (mut coarse, mut fine) = (0, 0);
    for frame in 1..=600 {
        let ticks = timers.poll(start + Duration::from_millis(frame * 100));
        coarse += usize::from(ticks.coarse.is_some());
        fine += usize::from(ticks.fine.is_some());
    }

    assert_eq!(coarse, 12);
    assert_eq!(fine, 30);
    assert_eq!(timers.coarse.count(), 12);
    assert_eq!(timers.fine.count(), 30);
}

#[test]
fn counts_keep_growing_across_a_pause() {
    let mut timers = Timers::new(Duration::from_secs(5), Duration::from_secs(2));
    let start = Instant::now();
    timers.start(start);
    timers.poll(start + Duration::from_secs(5));
    let before = timers.fine.count();

    timers.stop();
    let resumed = start + Duration::from_secs(60);
    assert_eq!(timers.poll(resumed).fine, None);

    timers.start(resumed);
    let ticks = timers.poll(resumed + Duration::from_secs(2));
    assert_eq!(ticks.fine, Some(before + 1));
}
