//! Two-state digital inputs: PIR motion sensor, hall-effect lid switch and
//! the open push-button.
//!
//! The HC-SR501 PIR drives its output HIGH while it sees motion.  The A3144
//! hall switch is open-collector and pulls LOW while the lid magnet is
//! seated, so the lid input is active-low.  The open button shorts its
//! pulled-up pin to ground and is active-low too.

use embedded_hal::digital::InputPin;

use crate::error::SensorError;

use super::BinarySensor;

/// A GPIO input mapped to a logical `true`/`false`.
pub struct DigitalSensor<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> DigitalSensor<P> {
    /// Logical `true` when the pin reads HIGH (PIR).
    pub fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Logical `true` when the pin reads LOW (hall switch).
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn read(&mut self) -> Result<bool, SensorError> {
        let high = self.pin.is_high().map_err(|_| SensorError::GpioReadFailed)?;
        Ok(high != self.active_low)
    }
}

impl<P: InputPin> BinarySensor for DigitalSensor<P> {
    fn read(&mut self) -> Result<bool, SensorError> {
        DigitalSensor::read(self)
    }
}
