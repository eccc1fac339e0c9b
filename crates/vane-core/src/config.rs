//! Persisted device settings
//!
//! Settings live in a single `postcard` record under the [`NAMESPACE`] key of
//! whatever [`SettingsStorage`] backend the platform provides. Every field of
//! the record is optional so that a key missing from storage resolves to its
//! documented default instead of invalidating the whole record.
//!
//! Writing the whole record in one storage call is what makes a save atomic
//! from the caller's point of view: the next [`SettingsStore::load`] sees
//! either the complete new snapshot or the previous one.

use core::future::Future;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use heapless::String as BoundedString;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::app_state::FromTruncated;

/// Storage namespace holding the settings record
pub const NAMESPACE: &str = "weather";

/// Longest API key or city the portal form and the record accept, in bytes
pub const MAX_FIELD_LEN: usize = 64;

pub const DEFAULT_CITY: &str = "Beer Sheva,IL";
pub const DEFAULT_UPDATE_INTERVAL_HOURS: u32 = 12;
pub const DEFAULT_NIGHT_START_HOUR: u8 = 20;
pub const DEFAULT_NIGHT_END_HOUR: u8 = 7;
pub const DEFAULT_UTC_OFFSET_MINUTES: i16 = 120;

/// Valid range for a fixed UTC offset (UTC-12:00 to UTC+14:00)
const UTC_OFFSET_RANGE: core::ops::RangeInclusive<i16> = -720..=840;

pub type FieldString = BoundedString<MAX_FIELD_LEN>;

/// Unit system requested from the weather API
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of the `units` query parameter
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Letter printed after a temperature
    pub const fn temperature_suffix(self) -> char {
        match self {
            Self::Metric => 'C',
            Self::Imperial => 'F',
        }
    }
}

/// Device settings for one wake cycle.
///
/// Loaded once per wake and passed by value into each component; only the
/// connectivity manager produces a revised copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: FieldString,
    /// City query such as `"City,CountryCode"`, never empty
    pub city: FieldString,
    pub units: Units,
    /// Hours between wakes, at least 1
    pub update_interval_hours: u32,
    pub night_start_hour: u8,
    pub night_end_hour: u8,
    pub utc_offset_minutes: i16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: FieldString::new(),
            city: default_city(),
            units: Units::Metric,
            update_interval_hours: DEFAULT_UPDATE_INTERVAL_HOURS,
            night_start_hour: DEFAULT_NIGHT_START_HOUR,
            night_end_hour: DEFAULT_NIGHT_END_HOUR,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Build settings from a stored record, substituting the default for
    /// every missing or out-of-range field.
    fn from_stored(record: StoredSettings) -> Self {
        let defaults = Self::default();

        let city = match record.city {
            Some(city) if !city.trim().is_empty() => city,
            Some(_) => {
                warn!("Stored city is blank, using default");
                defaults.city
            }
            None => defaults.city,
        };

        let update_interval_hours = match record.interval {
            Some(0) => {
                warn!("Stored update interval is 0h, using default");
                defaults.update_interval_hours
            }
            Some(hours) => hours,
            None => defaults.update_interval_hours,
        };

        Self {
            api_key: record.api_key.unwrap_or(defaults.api_key),
            city,
            units: record.units.unwrap_or(defaults.units),
            update_interval_hours,
            night_start_hour: valid_hour(record.night_start, defaults.night_start_hour, "night start"),
            night_end_hour: valid_hour(record.night_end, defaults.night_end_hour, "night end"),
            utc_offset_minutes: match record.tz_offset {
                Some(offset) if UTC_OFFSET_RANGE.contains(&offset) => offset,
                Some(offset) => {
                    warn!("Stored UTC offset {}min out of range, using default", offset);
                    defaults.utc_offset_minutes
                }
                None => defaults.utc_offset_minutes,
            },
        }
    }
}

pub(crate) fn default_city() -> FieldString {
    FieldString::from_truncated(DEFAULT_CITY)
}

fn valid_hour(stored: Option<u8>, default: u8, name: &str) -> u8 {
    match stored {
        Some(hour) if hour < 24 => hour,
        Some(hour) => {
            warn!("Stored {} hour {} out of range, using default", name, hour);
            default
        }
        None => default,
    }
}

/// On-storage form of [`Settings`]; `None` means the key was never written.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
struct StoredSettings {
    api_key: Option<FieldString>,
    city: Option<FieldString>,
    units: Option<Units>,
    interval: Option<u32>,
    night_start: Option<u8>,
    night_end: Option<u8>,
    tz_offset: Option<i16>,
}

impl From<&Settings> for StoredSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            api_key: Some(settings.api_key.clone()),
            city: Some(settings.city.clone()),
            units: Some(settings.units),
            interval: Some(settings.update_interval_hours),
            night_start: Some(settings.night_start_hour),
            night_end: Some(settings.night_end_hour),
            tz_offset: Some(settings.utc_offset_minutes),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage read failed")]
    Read,
    #[error("storage write failed")]
    Write,
    #[error("storage is full")]
    Full,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("settings storage error: {0}")]
    Storage(StorageError),
    #[error("settings record could not be encoded")]
    Encode,
}

/// Key/value backend holding opaque records.
///
/// A single `write` must replace the value for `namespace` as a whole.
pub trait SettingsStorage {
    fn read(
        &mut self,
        namespace: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StorageError>>;

    fn write(
        &mut self,
        namespace: &str,
        record: &[u8],
    ) -> impl Future<Output = Result<(), StorageError>>;
}

/// Loads and saves [`Settings`] through a [`SettingsStorage`] backend
pub struct SettingsStore<S> {
    storage: S,
}

impl<S: SettingsStorage> SettingsStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load settings, falling back to defaults on any read or decode failure.
    pub async fn load(&mut self) -> Settings {
        match self.storage.read(NAMESPACE).await {
            Ok(Some(bytes)) => match postcard::from_bytes::<StoredSettings>(&bytes) {
                Ok(record) => Settings::from_stored(record),
                Err(e) => {
                    warn!("Stored settings unreadable ({:?}), using defaults", e);
                    Settings::default()
                }
            },
            Ok(None) => {
                info!("No stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("Settings read failed ({}), using defaults", e);
                Settings::default()
            }
        }
    }

    /// Persist every field of `settings` in one storage write.
    pub async fn save(&mut self, settings: &Settings) -> Result<(), ConfigError> {
        let record = postcard::to_allocvec(&StoredSettings::from(settings))
            .map_err(|_| ConfigError::Encode)?;

        self.storage
            .write(NAMESPACE, &record)
            .await
            .map_err(ConfigError::Storage)?;

        info!("Settings saved (city={}, key set={})", settings.city, settings.has_api_key());
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// RAM-backed [`SettingsStorage`] for the simulator and tests.
///
/// Read and write failures can be injected to exercise the fallback paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    records: BTreeMap<String, Vec<u8>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn insert_raw(&mut self, namespace: &str, record: Vec<u8>) {
        self.records.insert(namespace.to_string(), record);
    }
}

impl SettingsStorage for MemoryStorage {
    async fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Read);
        }
        Ok(self.records.get(namespace).cloned())
    }

    async fn write(&mut self, namespace: &str, record: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Write);
        }
        self.records.insert(namespace.to_string(), record.to_vec());
        self.writes += 1;
        Ok(())
    }
}

impl<T: SettingsStorage> SettingsStorage for &mut T {
    async fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).read(namespace).await
    }

    async fn write(&mut self, namespace: &str, record: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    fn custom_settings() -> Settings {
        Settings {
            api_key: FieldString::from_truncated("0123456789abcdef"),
            city: FieldString::from_truncated("Reykjavik,IS"),
            units: Units::Imperial,
            update_interval_hours: 3,
            night_start_hour: 22,
            night_end_hour: 6,
            utc_offset_minutes: -300,
        }
    }

    #[test]
    fn first_boot_yields_defaults() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let settings = block_on(store.load());

        assert_eq!(settings, Settings::default());
        assert!(settings.api_key.is_empty());
        assert_eq!(settings.city.as_str(), "Beer Sheva,IL");
        assert_eq!(settings.update_interval_hours, 12);
        assert_eq!(settings.night_start_hour, 20);
        assert_eq!(settings.night_end_hour, 7);
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let settings = custom_settings();

        block_on(store.save(&settings)).unwrap();
        assert_eq!(block_on(store.load()), settings);
    }

    #[test]
    fn boundary_settings_round_trip() {
        let city = "é".repeat(MAX_FIELD_LEN / 2);
        assert_eq!(city.len(), MAX_FIELD_LEN);
        let key = "k".repeat(MAX_FIELD_LEN);

        let cases = [
            Settings {
                api_key: FieldString::try_from(key.as_str()).unwrap(),
                city: FieldString::try_from(city.as_str()).unwrap(),
                update_interval_hours: 1,
                night_start_hour: 0,
                night_end_hour: 23,
                utc_offset_minutes: -720,
                ..Settings::default()
            },
            Settings {
                night_start_hour: 23,
                night_end_hour: 0,
                utc_offset_minutes: 840,
                update_interval_hours: u32::MAX,
                ..custom_settings()
            },
            Settings {
                utc_offset_minutes: -1,
                ..Settings::default()
            },
        ];

        for settings in cases {
            let mut store = SettingsStore::new(MemoryStorage::new());
            block_on(store.save(&settings)).unwrap();
            assert_eq!(block_on(store.load()), settings);
        }
    }

    #[test]
    fn read_failure_yields_defaults() {
        let mut storage = MemoryStorage::new();
        block_on(SettingsStore::new(&mut storage).save(&custom_settings())).unwrap();
        storage.fail_reads = true;

        let settings = block_on(SettingsStore::new(&mut storage).load());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn corrupt_record_yields_defaults() {
        let mut storage = MemoryStorage::new();
        storage.insert_raw(NAMESPACE, alloc::vec![0xff, 0xff, 0xff]);

        let settings = block_on(SettingsStore::new(&mut storage).load());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn missing_keys_resolve_individually() {
        let record = StoredSettings {
            api_key: Some(FieldString::from_truncated("k")),
            interval: Some(6),
            ..Default::default()
        };
        let mut storage = MemoryStorage::new();
        storage.insert_raw(NAMESPACE, postcard::to_allocvec(&record).unwrap());

        let settings = block_on(SettingsStore::new(&mut storage).load());
        assert_eq!(settings.api_key.as_str(), "k");
        assert_eq!(settings.update_interval_hours, 6);
        assert_eq!(settings.city.as_str(), DEFAULT_CITY);
        assert_eq!(settings.night_start_hour, DEFAULT_NIGHT_START_HOUR);
        assert_eq!(settings.utc_offset_minutes, DEFAULT_UTC_OFFSET_MINUTES);
    }

    #[test]
    fn out_of_range_values_fall_back_per_field() {
        let record = StoredSettings {
            city: Some(FieldString::from_truncated("   ")),
            interval: Some(0),
            night_start: Some(24),
            night_end: Some(5),
            tz_offset: Some(2000),
            ..Default::default()
        };
        let mut storage = MemoryStorage::new();
        storage.insert_raw(NAMESPACE, postcard::to_allocvec(&record).unwrap());

        let settings = block_on(SettingsStore::new(&mut storage).load());
        assert_eq!(settings.city.as_str(), DEFAULT_CITY);
        assert_eq!(settings.update_interval_hours, DEFAULT_UPDATE_INTERVAL_HOURS);
        assert_eq!(settings.night_start_hour, DEFAULT_NIGHT_START_HOUR);
        assert_eq!(settings.night_end_hour, 5);
        assert_eq!(settings.utc_offset_minutes, DEFAULT_UTC_OFFSET_MINUTES);
    }

    #[test]
    fn failed_save_keeps_previous_record() {
        let mut storage = MemoryStorage::new();
        let first = custom_settings();
        block_on(SettingsStore::new(&mut storage).save(&first)).unwrap();

        storage.fail_writes = true;
        let mut second = first.clone();
        second.city = FieldString::from_truncated("Oslo,NO");
        let err = block_on(SettingsStore::new(&mut storage).save(&second)).unwrap_err();
        assert_eq!(err, ConfigError::Storage(StorageError::Write));

        storage.fail_writes = false;
        assert_eq!(block_on(SettingsStore::new(&mut storage).load()), first);
    }
}
