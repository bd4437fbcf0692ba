//! Red/green status LEDs.
//!
//! Two discrete LEDs on plain GPIOs.  Green means ready for a delivery,
//! red means a package is held, both together mean OTP entry is locked out.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::Indicator;

pub struct StatusLed<R, G> {
    red: R,
    green: G,
    current: Option<Indicator>,
}

impl<R: OutputPin, G: OutputPin> StatusLed<R, G> {
    pub fn new(red: R, green: G) -> Self {
        Self {
            red,
            green,
            current: None,
        }
    }

    pub fn show(&mut self, indicator: Indicator) {
        let (red, green) = match indicator {
            Indicator::Ready => (false, true),
            Indicator::PackageHeld => (true, false),
            Indicator::Lockout => (true, true),
        };
        let ok = set(&mut self.red, red) & set(&mut self.green, green);
        if !ok {
            warn!("StatusLed: GPIO write failed for {:?}", indicator);
        }
        self.current = Some(indicator);
    }

    pub fn current(&self) -> Option<Indicator> {
        self.current
    }
}

fn set(pin: &mut impl OutputPin, on: bool) -> bool {
    let r = if on { pin.set_high() } else { pin.set_low() };
    r.is_ok()
}
