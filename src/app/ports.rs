//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeliveryStateMachine (domain)
//! ```
//!
//! Driven adapters (sensors, lock servo, notification transport, storage)
//! implement these traits.  The
//! [`DeliveryStateMachine`](super::service::DeliveryStateMachine) consumes
//! them via generics, so the domain core never touches hardware or the
//! network directly.

use std::collections::VecDeque;

use crate::config::BoxConfig;
use crate::error::{ActuatorError, SensorError};

use super::commands::InboundCommand;
use super::events::NotificationEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port.  Each call is a single hardware round-trip bounded by a
/// few milliseconds.
pub trait SensorPort {
    /// Raw ultrasonic distance to the box floor (or the package on it).
    fn read_distance_cm(&mut self) -> Result<u16, SensorError>;

    /// PIR output: `true` while motion is seen in front of the box.
    fn read_motion(&mut self) -> Result<bool, SensorError>;

    /// Hall-effect lid sensor: `true` while the lid magnet is seated.
    fn read_box_closed(&mut self) -> Result<bool, SensorError>;

    /// Open push-button: `true` while held down.
    fn read_open_button(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// What the status LEDs should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Green: box empty and ready for a delivery.
    Ready,
    /// Red: a package is inside.
    PackageHeld,
    /// Red + green: OTP entry is locked out.
    Lockout,
}

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Drive the lock servo.  `Err` means the command was not acknowledged;
    /// the caller must not assume the lock moved.
    fn set_lock(&mut self, locked: bool) -> Result<(), ActuatorError>;

    /// Update the status LEDs.
    fn set_indicator(&mut self, indicator: Indicator);
}

// ───────────────────────────────────────────────────────────────
// Notification sink port (domain → chat transport)
// ───────────────────────────────────────────────────────────────

/// Outbound event queue.
///
/// `enqueue` never fails from the domain's point of view.  Backpressure and
/// drop policy belong to the implementation.
pub trait NotificationSink {
    fn enqueue(&mut self, event: NotificationEvent);
}

impl NotificationSink for Vec<NotificationEvent> {
    fn enqueue(&mut self, event: NotificationEvent) {
        self.push(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Command source port (chat transport → domain)
// ───────────────────────────────────────────────────────────────

/// Inbound, already-parsed commands.  The domain never sees raw message text.
pub trait CommandSource {
    fn poll_inbound(&mut self) -> Option<InboundCommand>;
}

impl CommandSource for VecDeque<InboundCommand> {
    fn poll_inbound(&mut self) -> Option<InboundCommand> {
        self.pop_front()
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST call [`BoxConfig::validate`] before persisting.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`BoxConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<BoxConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &BoxConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}
