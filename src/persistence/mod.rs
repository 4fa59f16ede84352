//! Climb progress persistence
//!
//! Only the seed and how far the climber got are saved; the mountain itself
//! is regenerated from the seed. Records are a small versioned JSON object,
//! kept in LocalStorage on the web and in a file on native.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AscentError, Result};

/// Newest record layout this build reads and writes
pub const SAVE_VERSION: u32 = 1;

/// What survives between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub version: u32,
    pub seed: u64,
    pub player_altitude: f32,
    #[serde(default)]
    pub best_altitude: f32,
}

impl SaveRecord {
    /// LocalStorage key
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "ascent_save";

    pub fn new(seed: u64, player_altitude: f32, best_altitude: f32) -> Self {
        Self {
            version: SAVE_VERSION,
            seed,
            player_altitude,
            best_altitude: best_altitude.max(player_altitude),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a record, rejecting versions from newer builds
    pub fn from_json(json: &str) -> Result<Self> {
        let mut record: SaveRecord = serde_json::from_str(json)?;
        if record.version > SAVE_VERSION {
            return Err(AscentError::UnsupportedVersion {
                max_supported: SAVE_VERSION,
                found: record.version,
            });
        }
        if !record.player_altitude.is_finite() {
            record.player_altitude = 0.0;
        }
        if !record.best_altitude.is_finite() {
            record.best_altitude = record.player_altitude;
        }
        Ok(record)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved climb (seed {}) to {}", self.seed, path.display());
        Ok(())
    }

    /// Load a record; a missing file is `Ok(None)`
    pub fn load_from_path(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| AscentError::Storage("LocalStorage unavailable".to_string()))
    }

    /// Load the saved climb from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Result<Option<Self>> {
        match Self::storage()?.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => {
                let record = Self::from_json(&json)?;
                log::info!("Loaded climb from LocalStorage (seed {})", record.seed);
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(_) => Err(AscentError::Storage("LocalStorage read failed".to_string())),
        }
    }

    /// Save the climb to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<()> {
        let json = self.to_json()?;
        Self::storage()?
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|_| AscentError::Storage("LocalStorage write refused".to_string()))?;
        log::info!("Climb saved");
        Ok(())
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Result<Option<Self>> {
        Ok(None)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<()> {
        // No-op for native; use save_to_path
        Ok(())
    }
}
