//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the sensor drivers (through any [`SensorPort`], normally a
//! [`SensorHub`](crate::sensors::SensorHub)), the lock servo, and the
//! status LEDs, and exposes them through [`SensorPort`] and
//! [`ActuatorPort`].  Everything is generic over `embedded-hal` traits;
//! the concrete ESP-IDF pin and LEDC drivers are chosen in `main`.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::error;

use crate::app::ports::{ActuatorPort, Indicator, SensorPort};
use crate::drivers::servo::ServoLock;
use crate::drivers::status_led::StatusLed;
use crate::error::{ActuatorError, SensorError};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<S, P, R, G> {
    sensors: S,
    servo: ServoLock<P>,
    led: StatusLed<R, G>,
}

impl<S, P, R, G> HardwareAdapter<S, P, R, G>
where
    S: SensorPort,
    P: SetDutyCycle,
    R: OutputPin,
    G: OutputPin,
{
    pub fn new(sensors: S, servo: ServoLock<P>, led: StatusLed<R, G>) -> Self {
        Self { sensors, servo, led }
    }

    /// Direct sensor access for startup calibration.
    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn servo(&self) -> &ServoLock<P> {
        &self.servo
    }

    pub fn led(&self) -> &StatusLed<R, G> {
        &self.led
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<S, P, R, G> SensorPort for HardwareAdapter<S, P, R, G>
where
    S: SensorPort,
{
    fn read_distance_cm(&mut self) -> Result<u16, SensorError> {
        self.sensors.read_distance_cm()
    }

    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.sensors.read_motion()
    }

    fn read_box_closed(&mut self) -> Result<bool, SensorError> {
        self.sensors.read_box_closed()
    }

    fn read_open_button(&mut self) -> Result<bool, SensorError> {
        self.sensors.read_open_button()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<S, P, R, G> ActuatorPort for HardwareAdapter<S, P, R, G>
where
    P: SetDutyCycle,
    R: OutputPin,
    G: OutputPin,
{
    fn set_lock(&mut self, locked: bool) -> Result<(), ActuatorError> {
        self.servo.engage(locked).inspect_err(|e| {
            error!("Lock servo: {}", e);
        })
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.led.show(indicator);
    }
}
