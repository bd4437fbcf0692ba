//! Monotonic timestamps and non-blocking deadlines.
//!
//! The control loop never sleeps inside a handler.  Anything that used to be
//! a long blocking delay (lock-open hold, OTP lockout) is a [`Deadline`]
//! stored in state and re-checked on every tick, so sensing and command
//! handling keep running while the window is open.
//!
//! ```text
//!   arm(now, 300s)          tick        tick        tick
//!        │                   │           │           │
//!        ▼                   ▼           ▼           ▼
//!   ─────●═══════════════════╪═══════════╪═══════════●──────▶ time
//!        start        is_pending()  is_pending()   expired
//! ```

use core::fmt;

/// Milliseconds since boot.  Monotonic; wraps only after ~584 million years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(u64);

impl Instant {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// `self + secs`, saturating.
    pub const fn add_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs as u64 * 1000))
    }

    /// Milliseconds elapsed from `earlier` to `self` (0 if `earlier` is later).
    pub const fn millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Instant {
    /// Uptime as `H:MM:SS`, the format the status messages use.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs();
        write!(f, "{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

/// A one-shot point in time after which something should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that is not armed.
    pub const fn none() -> Self {
        Self { at: None }
    }

    /// Arm the deadline `secs` seconds after `now`.
    pub fn arm(&mut self, now: Instant, secs: u32) {
        self.at = Some(now.add_secs(secs));
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Armed and not yet reached.
    pub fn is_pending(&self, now: Instant) -> bool {
        self.at.is_some_and(|at| now < at)
    }

    /// Armed and reached.  Does not disarm; pair with [`Deadline::take_expired`]
    /// when the expiry must be acted on exactly once.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.at.is_some_and(|at| now >= at)
    }

    /// If expired, disarm and return `true`.
    pub fn take_expired(&mut self, now: Instant) -> bool {
        if self.is_expired(now) {
            self.at = None;
            true
        } else {
            false
        }
    }

    /// Whole seconds until expiry, rounded up.  `None` when not pending.
    pub fn remaining_secs(&self, now: Instant) -> Option<u32> {
        match self.at {
            Some(at) if now < at => Some(at.millis_since(now).div_ceil(1000) as u32),
            _ => None,
        }
    }

    pub fn at(&self) -> Option<Instant> {
        self.at
    }
}
