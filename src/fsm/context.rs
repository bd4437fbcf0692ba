//! Shared mutable context threaded through every FSM handler.
//!
//! `BoxContext` is the single struct that state handlers read from and
//! write to.  It contains the latest sensor snapshot, the [`BoxState`]
//! with its OTP record, pending lock requests, queued notifications,
//! timing, and configuration.
//! Think of it as the "blackboard" in a blackboard architecture.
//!
//! Handlers never touch hardware.  They leave a [`LockCommand`] in
//! `lock_request` and events in `outbox`; the
//! [`DeliveryStateMachine`](crate::app::service::DeliveryStateMachine)
//! applies and flushes them after the tick.

use crate::app::events::NotificationEvent;
use crate::config::BoxConfig;
use crate::control::lock::LockCommand;
use crate::otp::{OtpAuthenticator, OtpRecord};
use crate::sensors::fusion::DistanceSample;
use crate::timing::{Deadline, Instant};

use super::StateId;

// ---------------------------------------------------------------------------
// Sensor snapshot (read-only to state handlers; written by sensor fusion)
// ---------------------------------------------------------------------------

/// Last known view of every input.  Faulted inputs keep their previous
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSnapshot {
    /// Last good distance reading.
    pub distance: Option<DistanceSample>,
    /// Distance sits at least the threshold below the baseline.
    pub package_present: bool,
    /// PIR output (raw, not debounced).
    pub motion: bool,
    /// Lid magnet seated.
    pub box_closed: bool,
    /// Open button level.  A faulted read counts as released.
    pub open_button: bool,
    /// The open button went down on this read.
    pub open_pressed: bool,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            distance: None,
            package_present: false,
            motion: false,
            // Boxes ship closed; the first lid read corrects this.
            box_closed: true,
            open_button: false,
            open_pressed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Box state
// ---------------------------------------------------------------------------

/// The box state together with the data that only exists in that state.
///
/// The OTP record lives inside the package states, so a held package
/// without a code cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoxState {
    #[default]
    Empty,
    PackageDetected(OtpRecord),
    Opened(OtpRecord),
}

impl BoxState {
    pub fn id(&self) -> StateId {
        match self {
            Self::Empty => StateId::Empty,
            Self::PackageDetected(_) => StateId::PackageDetected,
            Self::Opened(_) => StateId::Opened,
        }
    }

    /// The live record, if a package is held.
    pub fn otp(&self) -> Option<&OtpRecord> {
        match self {
            Self::Empty => None,
            Self::PackageDetected(r) | Self::Opened(r) => Some(r),
        }
    }

    pub fn otp_mut(&mut self) -> Option<&mut OtpRecord> {
        match self {
            Self::Empty => None,
            Self::PackageDetected(r) | Self::Opened(r) => Some(r),
        }
    }

    /// Move the record out, leaving `Empty` behind.
    pub fn take_otp(&mut self) -> Option<OtpRecord> {
        match core::mem::take(self) {
            Self::Empty => None,
            Self::PackageDetected(r) | Self::Opened(r) => Some(r),
        }
    }
}

// ---------------------------------------------------------------------------
// BoxContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct BoxContext {
    // -- Timing --
    /// Timestamp of the current tick.
    pub now: Instant,
    /// When the current state was entered.
    pub state_entered_at: Instant,

    // -- Sensor data --
    /// Latest sensor readings.  Updated before each FSM tick.
    pub sensors: SensorSnapshot,

    // -- Delivery --
    /// What the box holds.  Written only by state `on_enter` handlers.
    pub state: BoxState,
    pub authenticator: OtpAuthenticator,
    /// Re-lock point after a granted unlock.
    pub unlock_hold: Deadline,

    // -- Outputs --
    /// Lock command to apply after the handler returns.  Last write wins.
    pub lock_request: Option<LockCommand>,
    /// Notifications produced this tick, in order.
    pub outbox: Vec<NotificationEvent>,

    // -- Configuration --
    pub config: BoxConfig,
}

impl BoxContext {
    pub fn new(config: BoxConfig, authenticator: OtpAuthenticator) -> Self {
        Self {
            now: Instant::ZERO,
            state_entered_at: Instant::ZERO,
            sensors: SensorSnapshot::default(),
            state: BoxState::Empty,
            authenticator,
            unlock_hold: Deadline::none(),
            lock_request: None,
            outbox: Vec::new(),
            config,
        }
    }

    /// Seconds elapsed since the current state was entered.
    pub fn secs_in_state(&self) -> u64 {
        self.now.millis_since(self.state_entered_at) / 1000
    }

    pub fn emit(&mut self, event: NotificationEvent) {
        self.outbox.push(event);
    }

    pub fn request_lock(&mut self, cmd: LockCommand) {
        self.lock_request = Some(cmd);
    }
}
