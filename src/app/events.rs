//! Outbound notification events.
//!
//! The [`DeliveryStateMachine`](super::service::DeliveryStateMachine) emits
//! these through the [`NotificationSink`](super::ports::NotificationSink)
//! port, in the order they happen.  Adapters on the other side decide what
//! to do with them: render a chat message, write a log line, etc.

use crate::control::lock::{LockCommand, LockStatus};
use crate::fsm::StateId;
use crate::otp::OtpCode;
use crate::timing::Instant;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Controller is up and the baseline is calibrated.
    SystemStarted { baseline_cm: u16 },

    /// Movement in front of the box (debounced, only while armed).
    MotionAlert { at: Instant },

    /// A package was detected and the box locked.  The only event that
    /// carries the OTP.
    PackageArrived {
        otp: OtpCode,
        distance_cm: u16,
        at: Instant,
    },

    /// The lid was opened while a package was inside.
    BoxOpened { at: Instant },

    /// The open button released the lock; it re-locks after the hold.
    ButtonUnlock { at: Instant },

    /// The package is gone; box unlocked and ready again.
    PickupConfirmed { at: Instant },

    /// Correct OTP; the lock was released.
    UnlockGranted,

    /// Wrong OTP.
    UnlockDenied { remaining_attempts: u8 },

    /// OTP entry is blocked until the lockout window closes.
    TemporaryLockout { remaining_secs: u32 },

    /// Reply to an unlock request without a code.
    UnlockPrompt { remaining_attempts: u8 },

    /// Reply to a status query.
    StatusReport(StatusSnapshot),

    /// Reply to a help query.
    Help,

    /// Motion alerts were enabled or silenced.
    ArmedChanged { armed: bool },

    /// The lock actuator did not acknowledge a command.
    ActuatorFault { command: LockCommand },
}

/// A point-in-time view of the box, suitable for a status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: StateId,
    /// Last good distance reading; `None` before the first one.
    pub distance_cm: Option<u16>,
    pub baseline_cm: Option<u16>,
    pub lock: LockStatus,
    pub box_closed: bool,
    pub armed: bool,
    pub at: Instant,
    /// Seconds left in an OTP lockout, if one is running.
    pub lockout_remaining_secs: Option<u32>,
    /// Latched sensor fault bitmask, 0 when every input is healthy.
    pub sensor_faults: u8,
}
