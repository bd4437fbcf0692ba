//! One-time passcode generation and verification.
//!
//! Every delivered package gets a fresh 6-digit code.  The recipient sends it
//! back over chat; a matching code releases the lock.
//!
//! ```text
//!            wrong            wrong            wrong
//!   attempts 0 ────▶ 1 ────▶ 2 ────▶ LOCKED OUT (deadline armed, attempts = 0)
//!      ▲                                  │
//!      └──────────── deadline passes ─────┘
//! ```
//!
//! A lockout is a [`Deadline`] kept in the record, not a sleep: the control
//! loop keeps sensing and answering status queries while it runs.

use core::fmt::Write as _;

use log::{debug, info, warn};

use crate::timing::{Deadline, Instant};

// ── Constants ────────────────────────────────────────────────

/// Number of digits in a code.
pub const OTP_LEN: usize = 6;

/// Code space size (`000000`–`999999`).
const OTP_SPACE: u64 = 1_000_000;

/// A 6-digit code, leading zeros preserved.
pub type OtpCode = heapless::String<OTP_LEN>;

// ── Record ───────────────────────────────────────────────────

/// The live code for the package currently in the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    code: OtpCode,
    issued_at: Instant,
    attempts: u8,
    lockout: Deadline,
}

impl OtpRecord {
    /// Build a record around a known code.  Returns `None` unless `code` is
    /// exactly six ASCII digits.
    pub fn from_code(code: &str, issued_at: Instant) -> Option<Self> {
        if !is_well_formed(code) {
            return None;
        }
        let mut c = OtpCode::new();
        c.push_str(code).ok()?;
        Some(Self {
            code: c,
            issued_at,
            attempts: 0,
            lockout: Deadline::none(),
        })
    }

    pub fn code(&self) -> &OtpCode {
        &self.code
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Wrong submissions in the current window.
    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    /// When the running lockout ends, if any.
    pub fn lockout_until(&self) -> Option<Instant> {
        self.lockout.at()
    }

    pub fn is_locked_out(&self, now: Instant) -> bool {
        self.lockout.is_pending(now)
    }

    /// Seconds left in the running lockout.
    pub fn lockout_remaining_secs(&self, now: Instant) -> Option<u32> {
        self.lockout.remaining_secs(now)
    }

    /// Start a fresh attempt window.  A running lockout is kept.
    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
    }
}

// ── Check outcome ────────────────────────────────────────────

/// Result of checking a candidate against an [`OtpRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Granted,
    Denied { remaining: u8 },
    LockedOut { until: Instant },
    /// Not six digits.  Not counted as an attempt.
    Ignored,
}

/// `true` when `candidate` is exactly six ASCII digits.
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == OTP_LEN && candidate.bytes().all(|b| b.is_ascii_digit())
}

// ── Authenticator ────────────────────────────────────────────

/// Issues codes and enforces the attempt / lockout policy.
pub struct OtpAuthenticator {
    rng: SplitMix64,
    max_attempts: u8,
    lockout_secs: u32,
}

impl OtpAuthenticator {
    /// Deterministic generator, for tests and replay.
    pub fn with_seed(seed: u64, max_attempts: u8, lockout_secs: u32) -> Self {
        Self {
            rng: SplitMix64(seed),
            max_attempts: max_attempts.max(1),
            lockout_secs,
        }
    }

    /// Generator seeded from the platform entropy source.
    pub fn from_entropy(max_attempts: u8, lockout_secs: u32) -> Self {
        Self::with_seed(entropy_seed(), max_attempts, lockout_secs)
    }

    /// Change the attempt / lockout policy.  Applies to the next check.
    pub fn set_policy(&mut self, max_attempts: u8, lockout_secs: u32) {
        self.max_attempts = max_attempts.max(1);
        self.lockout_secs = lockout_secs;
    }

    /// Draw a fresh, uniformly distributed code.
    pub fn generate(&mut self, now: Instant) -> OtpRecord {
        let n = self.rng.below(OTP_SPACE);
        let mut code = OtpCode::new();
        // n < 10^6, so exactly six digits fit.
        let _ = write!(code, "{n:06}");
        debug!("OTP issued at {}", now);
        OtpRecord {
            code,
            issued_at: now,
            attempts: 0,
            lockout: Deadline::none(),
        }
    }

    /// Check `candidate` against `record`, updating its attempt counter and
    /// lockout deadline.
    pub fn check(&self, record: &mut OtpRecord, candidate: &str, now: Instant) -> AuthResult {
        if !is_well_formed(candidate) {
            debug!("OTP candidate ignored (not {} digits)", OTP_LEN);
            return AuthResult::Ignored;
        }

        if let Some(until) = record.lockout.at().filter(|_| record.lockout.is_pending(now)) {
            return AuthResult::LockedOut { until };
        }
        if record.lockout.take_expired(now) {
            info!("OTP lockout expired, accepting codes again");
            record.attempts = 0;
        }

        if candidate == record.code.as_str() {
            record.attempts = 0;
            return AuthResult::Granted;
        }

        record.attempts = record.attempts.saturating_add(1);
        if record.attempts >= self.max_attempts {
            record.attempts = 0;
            record.lockout.arm(now, self.lockout_secs);
            let until = now.add_secs(self.lockout_secs);
            warn!(
                "OTP: {} wrong codes, locked out for {}s",
                self.max_attempts, self.lockout_secs
            );
            AuthResult::LockedOut { until }
        } else {
            AuthResult::Denied {
                remaining: self.max_attempts - record.attempts,
            }
        }
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }
}

// ── PRNG ─────────────────────────────────────────────────────

/// SplitMix64: small, fast, and good enough to spread codes uniformly.
/// Not a CSPRNG.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `0..bound` by rejection sampling.
    fn below(&mut self, bound: u64) -> u64 {
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let x = self.next_u64();
            if x < zone {
                return x % bound;
            }
        }
    }
}

// ── Platform-specific seeding ────────────────────────────────

/// ESP-IDF: hardware RNG.
#[cfg(target_os = "espidf")]
fn entropy_seed() -> u64 {
    // SAFETY: esp_random has no preconditions and only reads the RNG register.
    let (hi, lo) = unsafe { (esp_idf_sys::esp_random(), esp_idf_sys::esp_random()) };
    ((hi as u64) << 32) | lo as u64
}

/// Simulation: `RandomState` keys are randomized per process.
#[cfg(not(target_os = "espidf"))]
fn entropy_seed() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    RandomState::new().build_hasher().finish()
}

// ── Tests ────────────────────────────────────────────────────
