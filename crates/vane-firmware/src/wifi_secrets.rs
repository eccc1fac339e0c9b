//! Station WiFi credentials
//!
//! Credentials entered in the setup portal are kept in flash. A build-time
//! pair from `.env` (`WIFI_SSID` / `WIFI_PASSWORD`) is used until the portal
//! has stored one.

use core::fmt;

use heapless::String;
use log::warn;
use serde::{Deserialize, Serialize};
use vane_core::config::StorageError;
use vane_core::portal_form::{PASSWORD_MAX_LEN, SSID_MAX_LEN};

use crate::flash_settings::{RecordKey, SharedFlash};

const BUILT_IN_SSID: Option<&str> = option_env!("WIFI_SSID");
const BUILT_IN_PASSWORD: Option<&str> = option_env!("WIFI_PASSWORD");

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String<SSID_MAX_LEN>,
    pub password: String<PASSWORD_MAX_LEN>,
}

// Keep the password out of logs
impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .finish_non_exhaustive()
    }
}

impl WifiCredentials {
    /// `None` for an empty SSID or values longer than 802.11 allows
    pub fn new(ssid: &str, password: &str) -> Option<Self> {
        if ssid.is_empty() {
            return None;
        }
        Some(Self {
            ssid: String::try_from(ssid).ok()?,
            password: String::try_from(password).ok()?,
        })
    }

    pub fn built_in() -> Option<Self> {
        Self::new(BUILT_IN_SSID?, BUILT_IN_PASSWORD.unwrap_or(""))
    }

    /// Stored credentials, else the built-in pair
    pub async fn load(flash: &SharedFlash) -> Option<Self> {
        let stored = flash.lock().await.fetch(RecordKey::WifiCredentials).await;

        match stored {
            Ok(Some(bytes)) => match postcard::from_bytes::<Self>(&bytes) {
                Ok(credentials) => return Some(credentials),
                Err(e) => warn!("Stored WiFi credentials unreadable: {:?}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("WiFi credentials read failed: {}", e),
        }

        Self::built_in()
    }

    pub async fn save(&self, flash: &SharedFlash) -> Result<(), StorageError> {
        let record = postcard::to_allocvec(self).map_err(|_| StorageError::Write)?;
        flash
            .lock()
            .await
            .store(RecordKey::WifiCredentials, &record)
            .await
    }
}
