//! Electronic lock controller.
//!
//! Wraps the lock actuator behind an idempotent `lock()` / `unlock()` API.
//! The controller remembers the last position the actuator *acknowledged*;
//! a failed command leaves that position unchanged and is reported to the
//! caller, never retried here.
//!
//! The servo has no position feedback, so "acknowledged" means the PWM
//! write succeeded.

use core::fmt;

use log::{debug, error, info};

use crate::app::ports::ActuatorPort;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCommand {
    Lock,
    Unlock,
}

impl LockCommand {
    /// Position this command drives towards.
    pub fn target(self) -> LockStatus {
        match self {
            Self::Lock => LockStatus::Locked,
            Self::Unlock => LockStatus::Unlocked,
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

impl fmt::Display for LockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => write!(f, "lock"),
            Self::Unlock => write!(f, "unlock"),
        }
    }
}

pub struct LockController {
    status: LockStatus,
    /// Set until the first acknowledged command.  While set, the recorded
    /// status is an assumption and the next command is always driven.
    unsynced: bool,
}

impl LockController {
    /// `assumed` is the position the actuator is believed to hold at boot.
    pub fn new(assumed: LockStatus) -> Self {
        Self {
            status: assumed,
            unsynced: true,
        }
    }

    pub fn status(&self) -> LockStatus {
        self.status
    }

    pub fn lock(&mut self, hw: &mut impl ActuatorPort) -> Result<bool, ActuatorError> {
        self.apply(LockCommand::Lock, hw)
    }

    pub fn unlock(&mut self, hw: &mut impl ActuatorPort) -> Result<bool, ActuatorError> {
        self.apply(LockCommand::Unlock, hw)
    }

    /// Drive the actuator towards `cmd`.
    ///
    /// Returns `Ok(true)` if the position changed, `Ok(false)` if it was
    /// already there (no actuator call).
    pub fn apply(
        &mut self,
        cmd: LockCommand,
        hw: &mut impl ActuatorPort,
    ) -> Result<bool, ActuatorError> {
        let target = cmd.target();
        if target == self.status && !self.unsynced {
            debug!("Lock already {}", target);
            return Ok(false);
        }

        match hw.set_lock(target == LockStatus::Locked) {
            Ok(()) => {
                let changed = target != self.status;
                self.status = target;
                self.unsynced = false;
                info!("Lock {}", target);
                Ok(changed)
            }
            Err(e) => {
                error!("Lock command '{}' failed: {}, still {}", cmd, e, self.status);
                Err(e)
            }
        }
    }
}
