//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the parcel box: delivery
//! state orchestration, unlock handling, and motion alerting.  All
//! interaction with hardware and the chat transport happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
