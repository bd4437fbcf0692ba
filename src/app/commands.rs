//! Inbound commands to the delivery state machine.
//!
//! The chat transport parses whatever wire format it receives (see
//! [`adapters::chat`](crate::adapters::chat)) into these values.  Each one
//! is consumed exactly once by
//! [`DeliveryStateMachine`](super::service::DeliveryStateMachine).

use crate::otp::OtpCode;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Report the current box state without changing it.
    StatusQuery,

    /// Ask how to unlock.  Answered with a prompt, never with the code.
    UnlockRequest,

    /// A candidate one-time code.  Malformed candidates are ignored by the
    /// authenticator, not counted as attempts.
    OtpAttempt { code: OtpCode },

    /// List the available commands.
    HelpQuery,

    /// Re-enable motion alerts.
    Arm,

    /// Silence motion alerts.
    Disarm,
}
