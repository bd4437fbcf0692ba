//! SG90 lock servo on a 50 Hz PWM channel.
//!
//! The servo is positioned by pulse width inside a 20 ms frame:
//!
//! ```text
//!   0°  ──  500 µs
//!  90°  ── 1450 µs   (bolt thrown: LOCKED)
//! 180°  ── 2400 µs
//! ```
//!
//! The driver is generic over [`SetDutyCycle`], so it runs on an ESP-IDF
//! `LedcDriver` on device and on a recording fake in tests.  The servo
//! has no position feedback; an accepted duty write counts as done.

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::error::ActuatorError;

/// PWM frame length at 50 Hz.
pub const FRAME_US: u16 = 20_000;
pub const MIN_PULSE_US: u16 = 500;
pub const MAX_PULSE_US: u16 = 2_400;

pub const LOCKED_DEG: u8 = 90;
pub const UNLOCKED_DEG: u8 = 0;

/// Pulse width for `degrees`, clamped to the 0–180° travel.
pub fn angle_to_pulse_us(degrees: u8) -> u16 {
    let deg = u32::from(degrees.min(180));
    let span = u32::from(MAX_PULSE_US - MIN_PULSE_US);
    MIN_PULSE_US + (deg * span / 180) as u16
}

pub struct ServoLock<P> {
    pwm: P,
    angle: Option<u8>,
}

impl<P: SetDutyCycle> ServoLock<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, angle: None }
    }

    pub fn set_angle(&mut self, degrees: u8) -> Result<(), ActuatorError> {
        let pulse = angle_to_pulse_us(degrees);
        self.pwm
            .set_duty_cycle_fraction(pulse, FRAME_US)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        debug!("Servo: {}° ({} µs)", degrees, pulse);
        self.angle = Some(degrees);
        Ok(())
    }

    /// Throw (`true`) or withdraw (`false`) the bolt.
    pub fn engage(&mut self, locked: bool) -> Result<(), ActuatorError> {
        let target = if locked { LOCKED_DEG } else { UNLOCKED_DEG };
        self.set_angle(target)
    }

    /// Last angle written successfully.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }
}
