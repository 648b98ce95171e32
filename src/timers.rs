//! Deadline-based tickers fired from the frame loop.
//!
//! Nothing here owns a thread. The view calls [`Timers::poll`] once per frame
//! and asks [`Timers::time_until_due`] how long it may sleep before the next
//! repaint.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Option<Instant>,
    count: u64,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: None,
            count: 0,
        }
    }

    /// Arms the ticker; the first tick fires one period from `now`.
    /// Starting an already running ticker keeps its current deadline.
    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.period);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Ticks emitted so far. Survives stop/start.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the new tick count if a deadline passed. Several missed
    /// periods coalesce into one tick.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        let due = self.next_due?;
        if now < due {
            return None;
        }

        self.count += 1;
        let next = due + self.period;
        self.next_due = Some(if next <= now { now + self.period } else { next });
        Some(self.count)
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

/// Which tickers fired during one [`Timers::poll`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ticks {
    pub coarse: Option<u64>,
    pub fine: Option<u64>,
}

impl Ticks {
    pub fn any(&self) -> bool {
        self.coarse.is_some() || self.fine.is_some()
    }
}

/// The coarse ticker refreshes position, duration, loved/rating and volume;
/// the fine one refreshes shuffle/repeat, the rating warning and marquees.
#[derive(Debug, Clone)]
pub struct Timers {
    pub coarse: Ticker,
    pub fine: Ticker,
}

impl Timers {
    pub fn new(coarse: Duration, fine: Duration) -> Self {
        Self {
            coarse: Ticker::new(coarse),
            fine: Ticker::new(fine),
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.coarse.start(now);
        self.fine.start(now);
    }

    pub fn stop(&mut self) {
        self.coarse.stop();
        self.fine.stop();
    }

    pub fn poll(&mut self, now: Instant) -> Ticks {
        Ticks {
            coarse: self.coarse.poll(now),
            fine: self.fine.poll(now),
        }
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        match (
            self.coarse.time_until_due(now),
            self.fine.time_until_due(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Self-rescheduling probe used while waiting for the host application.
#[derive(Debug, Clone)]
pub struct Probe {
    interval: Duration,
    next_at: Option<Instant>,
}

impl Probe {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_at: None,
        }
    }

    /// Schedules an immediate probe.
    pub fn arm(&mut self, now: Instant) {
        self.next_at = Some(now);
    }

    pub fn disarm(&mut self) {
        self.next_at = None;
    }

    /// True when a probe is due; the next one is then scheduled one
    /// interval later.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_at {
            Some(at) if now >= at => {
                self.next_at = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_at.map(|at| at.saturating_duration_since(now))
    }
}
