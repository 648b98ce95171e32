pub const MAX_STARS: u8 = 5;
const BRIDGE_POINTS_PER_STAR: u8 = 20;

pub fn stars_from_bridge(rating: u8) -> u8 {
    let stars = (f64::from(rating.min(100)) / f64::from(BRIDGE_POINTS_PER_STAR)).round() as u8;
    stars.min(MAX_STARS)
}

pub fn stars_to_bridge(stars: u8) -> u8 {
    stars.min(MAX_STARS) * BRIDGE_POINTS_PER_STAR
}

/// Clicking the star that is already set clears the rating.
pub fn next_rating(current: u8, clicked: u8) -> u8 {
    let clicked = clicked.min(MAX_STARS);
    if current == clicked {
        0
    } else {
        clicked
    }
}

/// Playback progress as a fraction, if the duration is known.
pub fn progress(position: f64, duration: Option<f64>) -> Option<f64> {
    match duration {
        Some(duration) if duration > 0.0 && position.is_finite() => Some(position / duration),
        _ => None,
    }
}

/// Outcome of one warning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningStep {
    /// The first tick after attach is ignored; its inputs may be stale.
    Skipped,
    /// The warning holds: the highlight toggled and a chime is due.
    Alert,
    Clear,
}

/// Flashes the rating stars near the end of an unrated track.
#[derive(Debug, Clone)]
pub struct RatingWarning {
    threshold: f64,
    skip_next: bool,
    flashing: bool,
}

impl RatingWarning {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            skip_next: true,
            flashing: false,
        }
    }

    /// Called whenever the view (re)attaches.
    pub fn attach(&mut self) {
        self.skip_next = true;
        self.flashing = false;
    }

    pub fn is_flashing(&self) -> bool {
        self.flashing
    }

    pub fn step(&mut self, stars: u8, progress: Option<f64>, disabled: bool) -> WarningStep {
        if self.skip_next {
            self.skip_next = false;
            return WarningStep::Skipped;
        }

        let near_end = progress.is_some_and(|p| p >= self.threshold);
        if stars == 0 && near_end && !disabled {
            self.flashing = !self.flashing;
            WarningStep::Alert
        } else {
            self.flashing = false;
            WarningStep::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_up() -> RatingWarning {
        let mut warning = RatingWarning::new(0.8);
        assert_eq!(warning.step(0, Some(0.0), false), WarningStep::Skipped);
        warning
    }

    #[test]
    fn clicking_current_star_clears_rating() {
        assert_eq!(next_rating(3, 3), 0);
        assert_eq!(next_rating(3, 4), 4);
        assert_eq!(next_rating(0, 1), 1);
        assert_eq!(next_rating(0, 9), 5);
    }

    #[test]
    fn bridge_rating_maps_to_whole_stars() {
        assert_eq!(stars_from_bridge(0), 0);
        assert_eq!(stars_from_bridge(60), 3);
        assert_eq!(stars_from_bridge(50), 3);
        assert_eq!(stars_from_bridge(255), 5);
        assert_eq!(stars_to_bridge(4), 80);
        assert_eq!(stars_to_bridge(7), 100);
    }

    #[test]
    fn warning_flashes_only_for_unrated_tracks_near_the_end() {
        for stars in [0, 3] {
            for progress_value in [0.5, 0.8, 0.95] {
                for disabled in [false, true] {
                    let mut warning = warmed_up();
                    let expected = stars == 0 && progress_value >= 0.8 && !disabled;
                    let step = warning.step(stars, Some(progress_value), disabled);
                    assert_eq!(step == WarningStep::Alert, expected);
                    assert_eq!(warning.is_flashing(), expected);
                }
            }
        }
    }

    #[test]
    fn warning_toggles_while_conditions_hold_and_clears_after() {
        let mut warning = warmed_up();
        assert_eq!(warning.step(0, Some(0.9), false), WarningStep::Alert);
        assert!(warning.is_flashing());
        assert_eq!(warning.step(0, Some(0.92), false), WarningStep::Alert);
        assert!(!warning.is_flashing());
        assert_eq!(warning.step(0, Some(0.94), false), WarningStep::Alert);
        assert!(warning.is_flashing());
        assert_eq!(warning.step(2, Some(0.96), false), WarningStep::Clear);
        assert!(!warning.is_flashing());
    }

    #[test]
    fn first_tick_after_attach_is_skipped() {
        let mut warning = warmed_up();
        warning.step(0, Some(0.9), false);
        warning.attach();
        assert!(!warning.is_flashing());
        assert_eq!(warning.step(0, Some(0.9), false), WarningStep::Skipped);
        assert!(!warning.is_flashing());
        assert_eq!(warning.step(0, Some(0.9), false), WarningStep::Alert);
    }

    #[test]
    fn unknown_duration_clears_warning() {
        let mut warning = warmed_up();
        assert_eq!(warning.step(0, progress(200.0, None), false), WarningStep::Clear);
        assert_eq!(progress(200.0, Some(0.0)), None);
        assert_eq!(progress(80.0, Some(100.0)), Some(0.8));
    }
}
