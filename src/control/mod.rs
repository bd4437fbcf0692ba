//! Actuator control.

pub mod lock;
