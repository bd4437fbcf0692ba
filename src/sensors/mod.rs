//! Sensor subsystem: individual drivers, fusion, and the aggregating
//! [`SensorHub`].
//!
//! The hub owns the four raw drivers and answers [`SensorPort`] reads.
//! [`fusion::SensorFusion`] turns those raw reads into the snapshot the
//! state machine consumes each tick.

pub mod digital;
pub mod fusion;
pub mod ultrasonic;

use crate::app::ports::SensorPort;
use crate::error::SensorError;

/// Anything that can produce a distance in centimetres.
pub trait DistanceSensor {
    fn measure_cm(&mut self) -> Result<u16, SensorError>;
}

/// Anything that produces a single boolean reading.
pub trait BinarySensor {
    fn read(&mut self) -> Result<bool, SensorError>;
}

/// Aggregates the box's sensor drivers.
pub struct SensorHub<U, M, L, B> {
    pub distance: U,
    pub motion: M,
    pub lid: L,
    pub button: B,
}

impl<U, M, L, B> SensorHub<U, M, L, B>
where
    U: DistanceSensor,
    M: BinarySensor,
    L: BinarySensor,
    B: BinarySensor,
{
    /// Construct a new hub.  Pass in pre-built drivers (built in main
    /// where peripheral ownership is established).
    pub fn new(distance: U, motion: M, lid: L, button: B) -> Self {
        Self {
            distance,
            motion,
            lid,
            button,
        }
    }
}

impl<U, M, L, B> SensorPort for SensorHub<U, M, L, B>
where
    U: DistanceSensor,
    M: BinarySensor,
    L: BinarySensor,
    B: BinarySensor,
{
    fn read_distance_cm(&mut self) -> Result<u16, SensorError> {
        self.distance.measure_cm()
    }

    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.motion.read()
    }

    fn read_box_closed(&mut self) -> Result<bool, SensorError> {
        self.lid.read()
    }

    fn read_open_button(&mut self) -> Result<bool, SensorError> {
        self.button.read()
    }
}
