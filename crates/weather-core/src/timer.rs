//! Non-blocking elapsed-time primitives
//!
//! Every periodic activity in the station is gated by "has N milliseconds
//! passed since I last ran" rather than by sleeping. Timestamps come from a
//! free-running 32-bit millisecond counter that wraps roughly every 49.7
//! days, so all arithmetic here is wrapping.

/// Milliseconds on the free-running station clock.
pub type Millis = u32;

/// Source of monotonic milliseconds.
///
/// The firmware reads the embassy time driver, the simulator a virtual
/// clock. Only differences between two readings are meaningful.
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// A resettable stopwatch.
///
/// The timer stores only the instant of its last reset; the caller passes
/// the current time in, so a single tick can evaluate many timers against
/// one consistent `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTimer {
    started_at: Millis,
}

impl ElapsedTimer {
    /// Create a timer whose elapsed time is zero at `now`.
    pub const fn new(now: Millis) -> Self {
        Self { started_at: now }
    }

    /// Set elapsed time back to zero.
    pub fn reset(&mut self, now: Millis) {
        self.started_at = now;
    }

    /// Milliseconds since the last reset.
    ///
    /// Uses wrapping subtraction, so a counter rollover between reset and
    /// `now` still yields the true (small) delta.
    pub const fn elapsed(&self, now: Millis) -> Millis {
        now.wrapping_sub(self.started_at)
    }
}

/// An [`ElapsedTimer`] paired with the period it gates.
///
/// A cadence is due once strictly more than `period` milliseconds have
/// elapsed since it was last restarted. A cadence created with
/// [`Cadence::due_immediately`] fires on its first check as well, which is
/// how the forecast is fetched at boot instead of one period later.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    timer: ElapsedTimer,
    period: Millis,
    pending: bool,
}

impl Cadence {
    pub const fn new(now: Millis, period: Millis) -> Self {
        Self {
            timer: ElapsedTimer::new(now),
            period,
            pending: false,
        }
    }

    pub const fn due_immediately(now: Millis, period: Millis) -> Self {
        Self {
            timer: ElapsedTimer::new(now),
            period,
            pending: true,
        }
    }

    pub fn is_due(&self, now: Millis) -> bool {
        self.pending || self.timer.elapsed(now) > self.period
    }

    /// Restart the period; call after every attempt, successful or not.
    pub fn restart(&mut self, now: Millis) {
        self.pending = false;
        self.timer.reset(now);
    }
}
