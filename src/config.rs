//! System configuration parameters
//!
//! All tunable parameters for the ParcelBox system.
//! Values can be overridden via NVS (non-volatile storage) or at runtime
//! through [`DeliveryStateMachine::update_config`](crate::app::service::DeliveryStateMachine::update_config).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxConfig {
    // --- Distance sensing ---
    /// Drop below the empty-box baseline (cm) that counts as a package
    pub package_threshold_cm: u16,
    /// Minimum number of readings accepted for baseline calibration
    pub calibration_min_samples: u8,
    /// Closest plausible ultrasonic reading (cm)
    pub min_valid_distance_cm: u16,
    /// Farthest plausible ultrasonic reading (cm)
    pub max_valid_distance_cm: u16,

    // --- Motion ---
    /// Minimum spacing between two motion alerts (seconds)
    pub motion_debounce_secs: u32,

    // --- Unlock ---
    /// Wrong OTP submissions allowed before a temporary lockout
    pub max_otp_attempts: u8,
    /// Length of the temporary lockout (seconds)
    pub lockout_duration_secs: u32,
    /// How long a granted unlock keeps the lock released if the lid
    /// stays shut (seconds)
    pub lock_open_hold_secs: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,

    // --- Indicators ---
    /// Drive the red/green status LEDs
    pub status_led_enabled: bool,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            // Distance
            package_threshold_cm: 5,
            calibration_min_samples: 10,
            min_valid_distance_cm: 2,
            max_valid_distance_cm: 400, // HC-SR04 datasheet range

            // Motion
            motion_debounce_secs: 30,

            // Unlock
            max_otp_attempts: 3,
            lockout_duration_secs: 300, // 5 min
            lock_open_hold_secs: 30,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz

            status_led_enabled: true,
        }
    }
}

impl BoxConfig {
    /// Range-check every field.
    ///
    /// Invalid values are rejected, not clamped: a bad config pushed over a
    /// command channel must not silently turn into a different one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.package_threshold_cm) {
            return Err(ConfigError::ValidationFailed(
                "package_threshold_cm must be 1–100",
            ));
        }
        if !(1..=100).contains(&self.calibration_min_samples) {
            return Err(ConfigError::ValidationFailed(
                "calibration_min_samples must be 1–100",
            ));
        }
        if self.min_valid_distance_cm >= self.max_valid_distance_cm {
            return Err(ConfigError::ValidationFailed(
                "min_valid_distance_cm must be < max_valid_distance_cm",
            ));
        }
        if self.max_valid_distance_cm > 600 {
            return Err(ConfigError::ValidationFailed(
                "max_valid_distance_cm must be <= 600",
            ));
        }
        if !(1..=3600).contains(&self.motion_debounce_secs) {
            return Err(ConfigError::ValidationFailed(
                "motion_debounce_secs must be 1–3600",
            ));
        }
        if !(1..=10).contains(&self.max_otp_attempts) {
            return Err(ConfigError::ValidationFailed(
                "max_otp_attempts must be 1–10",
            ));
        }
        if !(10..=86_400).contains(&self.lockout_duration_secs) {
            return Err(ConfigError::ValidationFailed(
                "lockout_duration_secs must be 10–86400",
            ));
        }
        if !(1..=600).contains(&self.lock_open_hold_secs) {
            return Err(ConfigError::ValidationFailed(
                "lock_open_hold_secs must be 1–600",
            ));
        }
        if !(100..=5000).contains(&self.control_loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be 100–5000",
            ));
        }
        Ok(())
    }
}
