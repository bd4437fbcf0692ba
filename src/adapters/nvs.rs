//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the parcel box.  The whole [`BoxConfig`]
//! is stored as one `postcard` blob under a single key.
//!
//! - Config validation: every field is range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - The simulation backend keeps blobs in an in-memory map.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::BoxConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// NUL-terminated for the C API.
#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &[u8] = b"parcelbox\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"boxcfg\0";

#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "parcelbox::boxcfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Load the stored config, falling back to defaults on any error.
    /// Startup must not stall on a bad flash page.
    pub fn load_or_default(&self) -> BoxConfig {
        match self.load() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("NvsAdapter: {}, using defaults", e);
                BoxConfig::default()
            }
        }
    }

    /// Open the config namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

/// Decode a stored blob and re-validate it: a blob written by an older
/// firmware with different ranges must not slip through.
fn decode(bytes: &[u8]) -> Result<BoxConfig, ConfigError> {
    let cfg: BoxConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
    cfg.validate()?;
    Ok(cfg)
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<BoxConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(CONFIG_KEY) {
                Some(bytes) => {
                    let cfg = decode(bytes)?;
                    info!("NvsAdapter: loaded config from store");
                    Ok(cfg)
                }
                None => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(BoxConfig::default())
                }
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let mut buf = [0u8; MAX_BLOB_SIZE];
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok((buf, size))
            });

            match result {
                Ok((buf, size)) => {
                    let cfg = decode(&buf[..size])?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", size);
                    Ok(cfg)
                }
                // A fresh partition has no namespace yet either.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(BoxConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn save(&self, config: &BoxConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let len = bytes.len();
            self.store.borrow_mut().insert(CONFIG_KEY.to_string(), bytes);
            info!("NvsAdapter: config saved (simulation, {} bytes)", len);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
