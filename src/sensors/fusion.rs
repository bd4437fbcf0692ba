//! Sensor fusion: baseline calibration, package presence, fault absorption.
//!
//! The ultrasonic sensor looks down at the box floor.  With the box empty
//! it sees the floor at the *baseline* distance; a package shortens the
//! reading.
//!
//! ```text
//!   sensor ─┬─                 ─┬─
//!           │ baseline          │ distance
//!           │                  ┌┴─────────┐ ─┬─
//!           │                  │ package  │  │ >= threshold
//!   floor  ─┴─────────────     └──────────┘ ─┴─
//! ```
//!
//! A failed read is a *sensor fault*: the previous value is held, the fault
//! is logged once when it latches and once when it clears, and no state
//! transition or alert is derived from it.

use core::fmt;

use log::{error, info, warn};

use crate::app::ports::SensorPort;
use crate::config::BoxConfig;
use crate::error::{CalibrationError, SensorError};
use crate::fsm::context::SensorSnapshot;
use crate::timing::Instant;

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// One range-checked distance reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceSample {
    pub distance_cm: u16,
    pub at: Instant,
}

/// `true` when the reading sits at least `threshold_cm` below the baseline.
pub fn is_package_present(sample: &DistanceSample, baseline_cm: u16, threshold_cm: u16) -> bool {
    i32::from(baseline_cm) - i32::from(sample.distance_cm) >= i32::from(threshold_cm)
}

// ---------------------------------------------------------------------------
// Fault channels
// ---------------------------------------------------------------------------

/// Which input a latched sensor fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChannel {
    Distance,
    Motion,
    Lid,
    Button,
}

impl SensorChannel {
    /// Bit in the fault mask returned by [`SensorFusion::faults`].
    pub const fn mask(self) -> u8 {
        match self {
            Self::Distance => 1 << 0,
            Self::Motion => 1 << 1,
            Self::Lid => 1 << 2,
            Self::Button => 1 << 3,
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distance => write!(f, "ultrasonic distance"),
            Self::Motion => write!(f, "PIR motion"),
            Self::Lid => write!(f, "hall lid switch"),
            Self::Button => write!(f, "open button"),
        }
    }
}

// ---------------------------------------------------------------------------
// SensorFusion
// ---------------------------------------------------------------------------

pub struct SensorFusion {
    baseline_cm: Option<u16>,
    threshold_cm: u16,
    min_samples: usize,
    min_valid_cm: u16,
    max_valid_cm: u16,
    /// Latched fault bitmask (see [`SensorChannel::mask`]).
    faults: u8,
    /// Last known good view, held across faults.
    last: SensorSnapshot,
    warned_uncalibrated: bool,
}

impl SensorFusion {
    pub fn new(config: &BoxConfig) -> Self {
        let mut fusion = Self {
            baseline_cm: None,
            threshold_cm: 0,
            min_samples: 0,
            min_valid_cm: 0,
            max_valid_cm: 0,
            faults: 0,
            last: SensorSnapshot::default(),
            warned_uncalibrated: false,
        };
        fusion.apply_config(config);
        fusion
    }

    /// Pick up new thresholds.  The baseline is kept.
    pub fn apply_config(&mut self, config: &BoxConfig) {
        self.threshold_cm = config.package_threshold_cm;
        self.min_samples = usize::from(config.calibration_min_samples);
        self.min_valid_cm = config.min_valid_distance_cm;
        self.max_valid_cm = config.max_valid_distance_cm;
    }

    pub fn baseline(&self) -> Option<u16> {
        self.baseline_cm
    }

    pub fn threshold_cm(&self) -> u16 {
        self.threshold_cm
    }

    /// Establish the empty-box baseline from raw readings.
    ///
    /// Out-of-range samples (including zeros from a disconnected sensor) are
    /// discarded; the baseline is the rounded mean of the rest.
    pub fn calibrate(&mut self, samples: &[u16]) -> Result<u16, CalibrationError> {
        if samples.len() < self.min_samples {
            return Err(CalibrationError::InsufficientSamples {
                got: samples.len(),
                required: self.min_samples,
            });
        }

        let (sum, count) = samples
            .iter()
            .filter(|&&s| self.in_range(s))
            .fold((0u32, 0u32), |(sum, n), &s| (sum + u32::from(s), n + 1));
        if count == 0 {
            return Err(CalibrationError::NoValidSamples);
        }

        let baseline = ((sum + count / 2) / count) as u16;
        if (count as usize) < samples.len() {
            warn!(
                "Calibration: discarded {} of {} samples",
                samples.len() - count as usize,
                samples.len()
            );
        }
        info!("Calibration: baseline {} cm from {} samples", baseline, count);
        self.baseline_cm = Some(baseline);
        Ok(baseline)
    }

    /// One ultrasonic round-trip, range-checked.
    pub fn sample(
        &mut self,
        port: &mut impl SensorPort,
        now: Instant,
    ) -> Result<DistanceSample, SensorError> {
        let raw = port.read_distance_cm()?;
        if !self.in_range(raw) {
            return Err(SensorError::OutOfRange);
        }
        Ok(DistanceSample {
            distance_cm: raw,
            at: now,
        })
    }

    /// Presence test against the calibrated baseline.  Always `false` before
    /// calibration.
    pub fn is_package_present(&self, sample: &DistanceSample) -> bool {
        self.baseline_cm
            .is_some_and(|b| is_package_present(sample, b, self.threshold_cm))
    }

    /// Read every input and fold the results into the held snapshot.
    pub fn read(&mut self, port: &mut impl SensorPort, now: Instant) -> SensorSnapshot {
        match self.sample(port, now) {
            Ok(sample) => {
                self.eval_fault(SensorChannel::Distance, None);
                self.last.distance = Some(sample);
                if self.baseline_cm.is_none() && !self.warned_uncalibrated {
                    warn!("Distance read before calibration; presence disabled");
                    self.warned_uncalibrated = true;
                }
                self.last.package_present = self.is_package_present(&sample);
            }
            Err(e) => self.eval_fault(SensorChannel::Distance, Some(e)),
        }

        match port.read_motion() {
            Ok(motion) => {
                self.eval_fault(SensorChannel::Motion, None);
                self.last.motion = motion;
            }
            Err(e) => {
                // A stuck PIR must not turn into an alert storm.
                self.eval_fault(SensorChannel::Motion, Some(e));
                self.last.motion = false;
            }
        }

        match port.read_box_closed() {
            Ok(closed) => {
                self.eval_fault(SensorChannel::Lid, None);
                self.last.box_closed = closed;
            }
            Err(e) => self.eval_fault(SensorChannel::Lid, Some(e)),
        }

        match port.read_open_button() {
            Ok(pressed) => {
                self.eval_fault(SensorChannel::Button, None);
                self.last.open_pressed = pressed && !self.last.open_button;
                self.last.open_button = pressed;
            }
            Err(e) => {
                // A flaky button must never open the box.
                self.eval_fault(SensorChannel::Button, Some(e));
                self.last.open_button = false;
                self.last.open_pressed = false;
            }
        }

        self.last
    }

    /// Latched fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn has_fault(&self, channel: SensorChannel) -> bool {
        self.faults & channel.mask() != 0
    }

    pub fn last(&self) -> &SensorSnapshot {
        &self.last
    }

    // ── Internal ──────────────────────────────────────────────────

    fn in_range(&self, cm: u16) -> bool {
        (self.min_valid_cm..=self.max_valid_cm).contains(&cm)
    }

    fn eval_fault(&mut self, channel: SensorChannel, err: Option<SensorError>) {
        match err {
            Some(e) => {
                if self.faults & channel.mask() == 0 {
                    error!("SENSOR FAULT SET: {channel} ({e}), holding last value");
                }
                self.faults |= channel.mask();
            }
            None => {
                if self.faults & channel.mask() != 0 {
                    info!("SENSOR FAULT CLEARED: {channel}");
                }
                self.faults &= !channel.mask();
            }
        }
    }
}
