//! Mock hardware adapter for integration tests.
//!
//! Plays back scripted sensor values and records every actuator call so
//! tests can assert on the full command history without touching real
//! GPIO/PWM registers.

use std::cell::RefCell;
use std::collections::VecDeque;

use parcelbox::app::commands::InboundCommand;
use parcelbox::app::events::NotificationEvent;
use parcelbox::app::ports::{
    ActuatorPort, ConfigError, ConfigPort, Indicator, SensorPort,
};
use parcelbox::app::service::DeliveryStateMachine;
use parcelbox::config::BoxConfig;
use parcelbox::error::{ActuatorError, SensorError};
use parcelbox::otp::OtpAuthenticator;
use parcelbox::timing::Instant;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    SetLock { locked: bool },
    Indicator(Indicator),
}

// ── MockBox ───────────────────────────────────────────────────

pub struct MockBox {
    pub distance: Result<u16, SensorError>,
    pub motion: Result<bool, SensorError>,
    pub closed: Result<bool, SensorError>,
    pub button: Result<bool, SensorError>,
    /// Make every `set_lock` fail with `NotAcknowledged`.
    pub lock_fails: bool,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockBox {
    /// Empty box (50 cm), lid shut, nobody around.
    pub fn new() -> Self {
        Self {
            distance: Ok(50),
            motion: Ok(false),
            closed: Ok(true),
            button: Ok(false),
            lock_fails: false,
            calls: Vec::new(),
        }
    }

    pub fn lock_writes(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::SetLock { locked } => Some(*locked),
                _ => None,
            })
            .collect()
    }

    pub fn last_indicator(&self) -> Option<Indicator> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Indicator(i) => Some(*i),
            _ => None,
        })
    }
}

impl Default for MockBox {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockBox {
    fn read_distance_cm(&mut self) -> Result<u16, SensorError> {
        self.distance
    }

    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.motion
    }

    fn read_box_closed(&mut self) -> Result<bool, SensorError> {
        self.closed
    }

    fn read_open_button(&mut self) -> Result<bool, SensorError> {
        self.button
    }
}

impl ActuatorPort for MockBox {
    fn set_lock(&mut self, locked: bool) -> Result<(), ActuatorError> {
        self.calls.push(ActuatorCall::SetLock { locked });
        if self.lock_fails {
            return Err(ActuatorError::NotAcknowledged);
        }
        Ok(())
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.calls.push(ActuatorCall::Indicator(indicator));
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    pub saved: RefCell<Vec<BoxConfig>>,
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<BoxConfig, ConfigError> {
        Ok(self.saved.borrow().last().cloned().unwrap_or_default())
    }

    fn save(&self, config: &BoxConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.saved.borrow_mut().push(config.clone());
        Ok(())
    }
}

// ── Test rig ──────────────────────────────────────────────────

/// A started state machine wired to mocks, with its own clock.
pub struct Rig {
    pub sm: DeliveryStateMachine,
    pub hw: MockBox,
    pub commands: VecDeque<InboundCommand>,
    pub events: Vec<NotificationEvent>,
    pub now: Instant,
}

#[allow(dead_code)]
impl Rig {
    /// Baseline 50 cm, threshold 5 cm, started at t = 0.
    pub fn new() -> Self {
        Self::with_config(BoxConfig::default())
    }

    pub fn with_config(config: BoxConfig) -> Self {
        let mut sm = DeliveryStateMachine::new(config, OtpAuthenticator::with_seed(0x5EED, 3, 300));
        sm.calibrate(&[50; 10]).expect("calibration");
        let mut hw = MockBox::new();
        let mut events = Vec::new();
        sm.start(Instant::ZERO, &mut hw, &mut events);
        Self {
            sm,
            hw,
            commands: VecDeque::new(),
            events,
            now: Instant::ZERO,
        }
    }

    /// Advance the clock by `secs` and run one tick.
    pub fn tick_after(&mut self, secs: u64) {
        self.now = Instant::from_millis(self.now.as_millis() + secs * 1000);
        self.sm
            .tick(self.now, &mut self.hw, &mut self.commands, &mut self.events);
    }

    pub fn tick(&mut self) {
        self.tick_after(1);
    }

    /// Queue a command and run one tick.
    pub fn send(&mut self, cmd: InboundCommand) {
        self.commands.push_back(cmd);
        self.tick();
    }

    pub fn send_code(&mut self, code: &str) {
        let mut c = parcelbox::otp::OtpCode::new();
        c.push_str(code).expect("code fits");
        self.send(InboundCommand::OtpAttempt { code: c });
    }

    /// Push and release the open button: one tick down, button up after.
    pub fn press_button(&mut self) {
        self.hw.button = Ok(true);
        self.tick();
        self.hw.button = Ok(false);
    }

    /// Drive the box into `PackageDetected` with a 44 cm reading.
    pub fn deliver(&mut self) {
        self.hw.distance = Ok(44);
        self.tick();
    }

    /// The live OTP, as a string.
    pub fn otp(&self) -> String {
        self.sm
            .otp()
            .map(|r| r.code().to_string())
            .expect("no live OTP")
    }

    /// A six-digit code guaranteed not to match the live OTP.
    pub fn wrong_code(&self) -> &'static str {
        if self.otp() == "000000" { "111111" } else { "000000" }
    }

    pub fn count(&self, pred: impl Fn(&NotificationEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn take_events(&mut self) -> Vec<NotificationEvent> {
        std::mem::take(&mut self.events)
    }
}
