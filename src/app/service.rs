//! Delivery state machine: the hexagonal core.
//!
//! [`DeliveryStateMachine`] owns the FSM, sensor fusion, lock controller,
//! and shared context.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!     SensorPort ──▶ ┌──────────────────────────────┐ ──▶ NotificationSink
//!                    │     DeliveryStateMachine     │
//!   ActuatorPort ◀── │  Fusion · FSM · OTP · Lock   │ ◀── CommandSource
//!                    └──────────────────────────────┘
//! ```
//!
//! One [`tick`](DeliveryStateMachine::tick) per control period does all the
//! work: read sensors → motion alerting → FSM → inbound commands → lock →
//! LEDs → flush notifications.  Nothing in a tick sleeps.

use log::{debug, info, warn};

use crate::config::BoxConfig;
use crate::control::lock::{LockCommand, LockController, LockStatus};
use crate::error::CalibrationError;
use crate::fsm::context::BoxContext;
pub use crate::fsm::context::BoxState;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::otp::{AuthResult, OtpAuthenticator, OtpRecord};
use crate::sensors::fusion::SensorFusion;
use crate::timing::Instant;

use super::commands::InboundCommand;
use super::events::{NotificationEvent, StatusSnapshot};
use super::ports::{
    ActuatorPort, CommandSource, ConfigError, ConfigPort, Indicator, NotificationSink, SensorPort,
};

/// Upper bound on inbound commands handled in one tick.  The rest wait for
/// the next tick so a flood cannot stretch the control period.
pub const MAX_COMMANDS_PER_TICK: usize = 8;

// ───────────────────────────────────────────────────────────────
// Motion debouncing
// ───────────────────────────────────────────────────────────────

/// Rate-limits motion alerts to one per window.
#[derive(Debug, Default)]
struct MotionDebouncer {
    last_alert: Option<Instant>,
}

impl MotionDebouncer {
    fn should_alert(&mut self, motion: bool, now: Instant, window_secs: u32) -> bool {
        if !motion {
            return false;
        }
        let window_ms = u64::from(window_secs) * 1000;
        if self
            .last_alert
            .is_some_and(|last| now.millis_since(last) < window_ms)
        {
            return false;
        }
        self.last_alert = Some(now);
        true
    }
}

// ───────────────────────────────────────────────────────────────
// DeliveryStateMachine
// ───────────────────────────────────────────────────────────────

/// The delivery state machine orchestrates all domain logic.
pub struct DeliveryStateMachine {
    fsm: Fsm,
    ctx: BoxContext,
    fusion: SensorFusion,
    lock: LockController,
    motion: MotionDebouncer,
    armed: bool,
    last_indicator: Option<Indicator>,
    config_dirty: bool,
}

impl DeliveryStateMachine {
    /// Construct the state machine from configuration.
    ///
    /// Does **not** start the FSM; call [`calibrate`](Self::calibrate) and
    /// then [`start`](Self::start).
    pub fn new(config: BoxConfig, mut authenticator: OtpAuthenticator) -> Self {
        authenticator.set_policy(config.max_otp_attempts, config.lockout_duration_secs);
        let fusion = SensorFusion::new(&config);
        let ctx = BoxContext::new(config, authenticator);
        let fsm = Fsm::new(build_state_table(), StateId::Empty);

        Self {
            fsm,
            ctx,
            fusion,
            // Boxes leave the bench unlocked; `start` drives it there.
            lock: LockController::new(LockStatus::Unlocked),
            motion: MotionDebouncer::default(),
            armed: true,
            last_indicator: None,
            config_dirty: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Establish the empty-box baseline.  Errors are fatal to startup; the
    /// caller retries with fresh samples.
    pub fn calibrate(&mut self, samples: &[u16]) -> Result<u16, CalibrationError> {
        self.fusion.calibrate(samples)
    }

    /// Enter `Empty`, drive the lock open, and announce startup.
    pub fn start(
        &mut self,
        now: Instant,
        hw: &mut impl ActuatorPort,
        sink: &mut impl NotificationSink,
    ) {
        self.ctx.now = now;
        self.fsm.start(&mut self.ctx);
        self.apply_lock(hw);
        self.update_indicator(hw);

        let baseline_cm = self.fusion.baseline().unwrap_or(0);
        if self.fusion.baseline().is_none() {
            warn!("Starting without a calibrated baseline");
        }
        self.ctx
            .emit(NotificationEvent::SystemStarted { baseline_cm });
        self.flush(sink);
        info!("DeliveryStateMachine started in {}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now: Instant,
        hw: &mut (impl SensorPort + ActuatorPort),
        commands: &mut impl CommandSource,
        sink: &mut impl NotificationSink,
    ) {
        self.ctx.now = now;

        // 1. Read sensors (faults absorbed, last known values held)
        self.ctx.sensors = self.fusion.read(hw, now);

        // 2. Motion alerting, independent of box state
        if self.armed
            && self.motion.should_alert(
                self.ctx.sensors.motion,
                now,
                self.ctx.config.motion_debounce_secs,
            )
        {
            info!("Motion detected at {}", now);
            self.ctx.emit(NotificationEvent::MotionAlert { at: now });
        }

        // 3. FSM tick (pure state logic), then act on its lock request
        self.fsm.tick(&mut self.ctx);
        self.apply_lock(hw);

        // 4. Inbound commands
        for _ in 0..MAX_COMMANDS_PER_TICK {
            let Some(cmd) = commands.poll_inbound() else {
                break;
            };
            self.handle_command(cmd);
            self.apply_lock(hw);
        }

        // 5. Status LEDs
        self.update_indicator(hw);

        // 6. Hand notifications to the transport, in order
        self.flush(sink);
    }

    // ── Command handling ──────────────────────────────────────

    fn handle_command(&mut self, cmd: InboundCommand) {
        let now = self.ctx.now;
        match cmd {
            InboundCommand::StatusQuery => {
                let snapshot = self.status();
                self.ctx.emit(NotificationEvent::StatusReport(snapshot));
            }
            InboundCommand::HelpQuery => self.ctx.emit(NotificationEvent::Help),
            InboundCommand::Arm | InboundCommand::Disarm => {
                self.armed = cmd == InboundCommand::Arm;
                info!("Motion alerts {}", if self.armed { "armed" } else { "disarmed" });
                self.ctx
                    .emit(NotificationEvent::ArmedChanged { armed: self.armed });
            }
            InboundCommand::UnlockRequest => {
                let Some(record) = self.ctx.state.otp() else {
                    debug!("Unlock request ignored: box is empty");
                    return;
                };
                let event = match record.lockout_remaining_secs(now) {
                    Some(remaining_secs) => NotificationEvent::TemporaryLockout { remaining_secs },
                    None => NotificationEvent::UnlockPrompt {
                        remaining_attempts: self
                            .ctx
                            .authenticator
                            .max_attempts()
                            .saturating_sub(record.attempts()),
                    },
                };
                self.ctx.emit(event);
            }
            InboundCommand::OtpAttempt { code } => self.handle_otp_attempt(&code, now),
        }
    }

    fn handle_otp_attempt(&mut self, code: &str, now: Instant) {
        let BoxContext {
            state,
            authenticator,
            ..
        } = &mut self.ctx;
        let Some(record) = state.otp_mut() else {
            debug!("OTP attempt ignored: box is empty");
            return;
        };

        match authenticator.check(record, code, now) {
            AuthResult::Granted => {
                info!("OTP accepted, releasing lock");
                self.ctx.emit(NotificationEvent::UnlockGranted);
                self.ctx.request_lock(LockCommand::Unlock);
                let hold = self.ctx.config.lock_open_hold_secs;
                self.ctx.unlock_hold.arm(now, hold);
            }
            AuthResult::Denied { remaining } => {
                warn!("Wrong OTP, {} attempt(s) left", remaining);
                self.ctx.emit(NotificationEvent::UnlockDenied {
                    remaining_attempts: remaining,
                });
            }
            AuthResult::LockedOut { until } => {
                let remaining_secs = until.millis_since(now).div_ceil(1000) as u32;
                self.ctx
                    .emit(NotificationEvent::TemporaryLockout { remaining_secs });
            }
            AuthResult::Ignored => debug!("Malformed OTP candidate ignored"),
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Validate and apply a new configuration.  The calibrated baseline and
    /// any live OTP are kept.
    pub fn update_config(&mut self, config: BoxConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.fusion.apply_config(&config);
        self.ctx
            .authenticator
            .set_policy(config.max_otp_attempts, config.lockout_duration_secs);
        if !config.status_led_enabled {
            self.last_indicator = None;
        }
        self.ctx.config = config;
        self.config_dirty = true;
        info!("Configuration updated at runtime");
        Ok(())
    }

    /// Persist the configuration if it changed since the last save.
    /// Returns `true` if a save happened.
    pub fn save_config_if_dirty(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state_id(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Current state with its OTP record.
    pub fn state(&self) -> &BoxState {
        &self.ctx.state
    }

    /// The live OTP record, if a package is held.
    pub fn otp(&self) -> Option<&OtpRecord> {
        self.ctx.state.otp()
    }

    pub fn lock_status(&self) -> LockStatus {
        self.lock.status()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn baseline(&self) -> Option<u16> {
        self.fusion.baseline()
    }

    /// Latched sensor fault bitmask (0 = healthy).
    pub fn sensor_faults(&self) -> u8 {
        self.fusion.faults()
    }

    pub fn config(&self) -> &BoxConfig {
        &self.ctx.config
    }

    /// Build a status snapshot from the current context.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.fsm.current_state(),
            distance_cm: self.ctx.sensors.distance.map(|d| d.distance_cm),
            baseline_cm: self.fusion.baseline(),
            lock: self.lock.status(),
            box_closed: self.ctx.sensors.box_closed,
            armed: self.armed,
            at: self.ctx.now,
            lockout_remaining_secs: self
                .ctx
                .state
                .otp()
                .and_then(|r| r.lockout_remaining_secs(self.ctx.now)),
            sensor_faults: self.sensor_faults(),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Apply the pending lock request, if any.  A failure is reported, not
    /// retried.
    fn apply_lock(&mut self, hw: &mut impl ActuatorPort) {
        let Some(cmd) = self.ctx.lock_request.take() else {
            return;
        };
        if self.lock.apply(cmd, hw).is_err() {
            self.ctx
                .emit(NotificationEvent::ActuatorFault { command: cmd });
        }
    }

    fn update_indicator(&mut self, hw: &mut impl ActuatorPort) {
        if !self.ctx.config.status_led_enabled {
            return;
        }
        let now = self.ctx.now;
        let indicator = match self.ctx.state.otp() {
            None => Indicator::Ready,
            Some(r) if r.is_locked_out(now) => Indicator::Lockout,
            Some(_) => Indicator::PackageHeld,
        };
        if self.last_indicator != Some(indicator) {
            hw.set_indicator(indicator);
            self.last_indicator = Some(indicator);
        }
    }

    fn flush(&mut self, sink: &mut impl NotificationSink) {
        for event in self.ctx.outbox.drain(..) {
            sink.enqueue(event);
        }
    }
}
