//! ESP32 time adapter.
//!
//! Provides monotonic time for the control loop, the ultrasonic echo timer,
//! and the inbound command rate limiter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use core::time::Duration;

use crate::timing::Instant;

/// Microseconds since boot (monotonic).
#[cfg(target_os = "espidf")]
pub fn uptime_us() -> u64 {
    // SAFETY: reads the free-running system timer; no preconditions.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

/// Microseconds since first call (monotonic).
#[cfg(not(target_os = "espidf"))]
pub fn uptime_us() -> u64 {
    use std::sync::OnceLock;
    static START: OnceLock<std::time::Instant> = OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_micros() as u64
}

/// Uptime as a `Duration`, the shape `burster` time providers expect.
pub fn uptime() -> Duration {
    Duration::from_micros(uptime_us())
}

/// Clock handed to the control loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }

    /// Current tick timestamp.
    pub fn now(&self) -> Instant {
        Instant::from_millis(uptime_us() / 1000)
    }
}
