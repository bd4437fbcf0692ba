//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the box if the control loop stalls.  The loop calls
//! [`Watchdog::feed`] once per tick; a stuck ultrasonic read or a wedged
//! lock write then ends in a reboot instead of a box that never unlocks.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Default stall budget.  Several control periods even at the slowest
/// configurable interval.
pub const DEFAULT_TIMEOUT_MS: u32 = 15_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    timeout_ms: u32,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task during startup.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe");
                }
                Self {
                    subscribed,
                    timeout_ms,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms, no-op", timeout_ms);
            Self { timeout_ms }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Reset the countdown.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the calling task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
