pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0).floor() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Time left in the track, as a count-down label (`-1:05`).
pub fn format_remaining(position: f64, duration: f64) -> String {
    format!("-{}", format_timestamp(remaining_secs(position, duration)))
}

pub fn remaining_secs(position: f64, duration: f64) -> f64 {
    (duration - position).max(0.0)
}

/// Whole-number playback progress, `round(100 * position / duration)`.
pub fn progress_percent(position: f64, duration: f64) -> Option<u32> {
    if !(duration > 0.0) {
        return None;
    }
    let percent = (100.0 * position / duration).clamp(0.0, 100.0);
    Some(percent.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_switch_to_hours_past_an_hour() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
        assert_eq!(format_timestamp(-4.0), "0:00");
    }

    #[test]
    fn progress_and_remaining_hold_for_positions_within_the_track() {
        for duration in [1.0_f64, 59.0, 215.0, 3601.0] {
            let mut position: f64 = 0.0;
            while position <= duration {
                let expected = (100.0 * position / duration).round() as u32;
                assert_eq!(progress_percent(position, duration), Some(expected));
                assert_eq!(remaining_secs(position, duration), duration - position);
                position += duration / 7.0;
            }
        }
    }

    #[test]
    fn progress_is_unavailable_without_a_duration() {
        assert_eq!(progress_percent(10.0, 0.0), None);
        assert_eq!(progress_percent(10.0, f64::NAN), None);
    }

    #[test]
    fn remaining_label_counts_down() {
        assert_eq!(format_remaining(30.0, 95.0), "-1:05");
        assert_eq!(format_remaining(95.0, 95.0), "-0:00");
    }
}
