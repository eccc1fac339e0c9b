//! Settings persistence in the NVS flash region
//!
//! Records are kept with `sequential-storage`'s wear-levelled map. Each
//! record is an opaque byte blob under a one-byte key.

use core::ops::Range;

use alloc::vec::Vec;
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use esp_hal::peripherals::FLASH;
use esp_storage::FlashStorage;
use log::{debug, warn};
use sequential_storage::cache::NoCache;
use sequential_storage::map;
use vane_core::config::{NAMESPACE, SettingsStorage, StorageError};

/// Default `nvs` partition of the ESP-IDF partition table
pub const SETTINGS_RANGE: Range<u32> = 0x9000..0xF000;

/// Largest record we ever read or write, plus map item overhead
const RECORD_BUFFER_LEN: usize = 512;

/// Flash is shared by the settings store and the WiFi credential store.
pub type SharedFlash = Mutex<NoopRawMutex, FlashStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKey {
    Settings = 0,
    WifiCredentials = 1,
}

impl RecordKey {
    /// Map a settings namespace to its record
    pub fn for_namespace(namespace: &str) -> Option<Self> {
        (namespace == NAMESPACE).then_some(Self::Settings)
    }
}

pub struct FlashStore {
    flash: BlockingAsync<FlashStorage<'static>>,
}

impl FlashStore {
    pub fn new(flash: FLASH<'static>) -> Self {
        Self {
            flash: BlockingAsync::new(FlashStorage::new(flash)),
        }
    }

    pub async fn fetch(&mut self, key: RecordKey) -> Result<Option<Vec<u8>>, StorageError> {
        let mut buffer = [0u8; RECORD_BUFFER_LEN];

        let item = map::fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut buffer,
            &(key as u8),
        )
        .await
        .map_err(|e| {
            warn!("Flash read of {:?} failed: {:?}", key, e);
            StorageError::Read
        })?;

        debug!("Flash read {:?}: {:?} bytes", key, item.map(|data| data.len()));
        Ok(item.map(|data| data.to_vec()))
    }

    pub async fn store(&mut self, key: RecordKey, record: &[u8]) -> Result<(), StorageError> {
        let mut buffer = [0u8; RECORD_BUFFER_LEN];

        map::store_item(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut buffer,
            &(key as u8),
            &record,
        )
        .await
        .map_err(|e| {
            warn!("Flash write of {:?} failed: {:?}", key, e);
            match e {
                sequential_storage::Error::FullStorage => StorageError::Full,
                _ => StorageError::Write,
            }
        })
    }
}

/// [`SettingsStorage`] handle over the shared flash
#[derive(Clone, Copy)]
pub struct FlashSettings {
    flash: &'static SharedFlash,
}

impl FlashSettings {
    pub fn new(flash: &'static SharedFlash) -> Self {
        Self { flash }
    }
}

impl SettingsStorage for FlashSettings {
    async fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = RecordKey::for_namespace(namespace).ok_or(StorageError::Read)?;
        self.flash.lock().await.fetch(key).await
    }

    async fn write(&mut self, namespace: &str, record: &[u8]) -> Result<(), StorageError> {
        let key = RecordKey::for_namespace(namespace).ok_or(StorageError::Write)?;
        self.flash.lock().await.store(key, record).await
    }
}
