use crate::bridge::PlayerStatus;

pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 100.0;

/// Local side of the volume, reconciled against the bridge.
///
/// Local edits are returned from [`VolumeSlider::assign`] for write-through;
/// bridge-side changes come in through [`VolumeSlider::pull`] and are never
/// written back.
#[derive(Debug, Clone)]
pub struct VolumeSlider {
    value: f64,
    first_use: bool,
    dragging: bool,
}

impl Default for VolumeSlider {
    fn default() -> Self {
        Self {
            value: MIN_VOLUME,
            first_use: true,
            dragging: false,
        }
    }
}

impl VolumeSlider {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// True until the first value has been assigned.
    pub fn needs_seed(&self) -> bool {
        self.first_use
    }

    /// Sets the local value and returns what must be written to the bridge.
    ///
    /// The first assignment is the cold-start seed and returns `None`;
    /// writing it back could zero the player's volume.
    pub fn assign(&mut self, value: f64) -> Option<f64> {
        self.value = clamp_volume(value);
        if self.first_use {
            self.first_use = false;
            return None;
        }
        Some(self.value)
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Returns the value to write once more on release, in case a fast drag
    /// skipped the final position.
    pub fn end_drag(&mut self) -> Option<f64> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        self.assign(self.value)
    }

    /// Adopts an externally changed volume. Only applied while playing, since
    /// a stopped player reports zero.
    pub fn pull(&mut self, bridge_volume: f64, status: PlayerStatus) -> bool {
        let bridge_volume = clamp_volume(bridge_volume);
        let differs = (bridge_volume - self.value).abs() > f64::EPSILON;
        if differs && !self.dragging && status == PlayerStatus::Playing {
            self.value = bridge_volume;
            self.first_use = false;
            true
        } else {
            false
        }
    }
}

fn clamp_volume(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_VOLUME, MAX_VOLUME)
    } else {
        MIN_VOLUME
    }
}
