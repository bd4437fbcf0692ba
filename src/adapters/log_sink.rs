//! Log-based notification sink adapter.
//!
//! Implements [`NotificationSink`] by writing every notification to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).  Useful on
//! the bench before the chat transport is wired up.  OTPs are masked.

use log::{info, warn};

use crate::app::events::NotificationEvent;
use crate::app::ports::NotificationSink;

/// Adapter that logs every [`NotificationEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogNotificationSink {
    fn enqueue(&mut self, event: NotificationEvent) {
        match event {
            NotificationEvent::SystemStarted { baseline_cm } => {
                info!("START | baseline={}cm", baseline_cm);
            }
            NotificationEvent::MotionAlert { at } => info!("MOTION | at={}", at),
            NotificationEvent::PackageArrived {
                distance_cm, at, ..
            } => {
                info!("ARRIVED | distance={}cm otp=****** at={}", distance_cm, at);
            }
            NotificationEvent::BoxOpened { at } => info!("OPENED | at={}", at),
            NotificationEvent::ButtonUnlock { at } => info!("UNLOCK | button at={}", at),
            NotificationEvent::PickupConfirmed { at } => info!("PICKUP | at={}", at),
            NotificationEvent::UnlockGranted => info!("UNLOCK | granted"),
            NotificationEvent::UnlockDenied { remaining_attempts } => {
                warn!("UNLOCK | denied, remaining={}", remaining_attempts);
            }
            NotificationEvent::TemporaryLockout { remaining_secs } => {
                warn!("UNLOCK | locked out for {}s", remaining_secs);
            }
            NotificationEvent::UnlockPrompt { remaining_attempts } => {
                info!("UNLOCK | prompt, remaining={}", remaining_attempts);
            }
            NotificationEvent::StatusReport(s) => {
                info!(
                    "STATUS | state={} lock={} lid={} armed={} distance={:?} baseline={:?} \
                     lockout={:?} faults={:#06b}",
                    s.state,
                    s.lock,
                    if s.box_closed { "closed" } else { "open" },
                    s.armed,
                    s.distance_cm,
                    s.baseline_cm,
                    s.lockout_remaining_secs,
                    s.sensor_faults,
                );
            }
            NotificationEvent::Help => info!("HELP | requested"),
            NotificationEvent::ArmedChanged { armed } => info!("ARMED | {}", armed),
            NotificationEvent::ActuatorFault { command } => {
                warn!("ACTUATOR | '{}' not acknowledged", command);
            }
        }
    }
}
