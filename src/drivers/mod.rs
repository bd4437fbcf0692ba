//! Actuator drivers and the task watchdog.

pub mod servo;
pub mod status_led;
pub mod watchdog;
