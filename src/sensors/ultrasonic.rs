//! HC-SR04 ultrasonic ranger.
//!
//! A 10 µs pulse on TRIG starts a measurement; ECHO then goes high for as
//! long as the sound takes to reach the target and come back.
//!
//! ```text
//!  TRIG ──┐‾‾‾‾‾‾‾‾‾‾┌────────────────────────────────
//!         │  10 µs   │
//!  ECHO ─────────────────┐‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾┌─────────
//!                        │◀── round trip ──▶│
//! ```
//!
//! Both edges are waited for with a bounded busy-poll so a disconnected
//! sensor reports [`SensorError::EchoTimeout`] instead of hanging the loop.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

use super::DistanceSensor;

/// ~4 m round trip plus margin.
pub const ECHO_TIMEOUT_US: u64 = 30_000;

/// Convert an echo pulse width to centimetres (343 m/s, halved for the
/// round trip).
pub fn echo_us_to_cm(pulse_us: u64) -> u16 {
    let cm = pulse_us as f32 * 0.034 / 2.0;
    cm.min(f32::from(u16::MAX)) as u16
}

/// HC-SR04 driver, generic over `embedded-hal` pins and a microsecond clock.
pub struct Ultrasonic<T, E, D> {
    trig: T,
    echo: E,
    delay: D,
    /// Monotonic microsecond counter used to time the echo pulse.
    micros: fn() -> u64,
}

impl<T: OutputPin, E: InputPin, D: DelayNs> Ultrasonic<T, E, D> {
    pub fn new(trig: T, echo: E, delay: D, micros: fn() -> u64) -> Self {
        Self {
            trig,
            echo,
            delay,
            micros,
        }
    }

    /// Fire one ping and time the echo.
    pub fn measure_cm(&mut self) -> Result<u16, SensorError> {
        self.trigger()?;
        let rise = self.wait_for(true)?;
        let fall = self.wait_for(false)?;
        Ok(echo_us_to_cm(fall.saturating_sub(rise)))
    }

    fn trigger(&mut self) -> Result<(), SensorError> {
        self.trig.set_low().map_err(|_| SensorError::GpioReadFailed)?;
        self.delay.delay_us(2);
        self.trig.set_high().map_err(|_| SensorError::GpioReadFailed)?;
        self.delay.delay_us(10);
        self.trig.set_low().map_err(|_| SensorError::GpioReadFailed)
    }

    /// Spin until ECHO reads `level`; returns the timestamp of the edge.
    fn wait_for(&mut self, level: bool) -> Result<u64, SensorError> {
        let start = (self.micros)();
        loop {
            let high = self.echo.is_high().map_err(|_| SensorError::GpioReadFailed)?;
            let now = (self.micros)();
            if high == level {
                return Ok(now);
            }
            if now.saturating_sub(start) > ECHO_TIMEOUT_US {
                return Err(SensorError::EchoTimeout);
            }
        }
    }
}

impl<T: OutputPin, E: InputPin, D: DelayNs> DistanceSensor for Ultrasonic<T, E, D> {
    fn measure_cm(&mut self) -> Result<u16, SensorError> {
        Ultrasonic::measure_cm(self)
    }
}
