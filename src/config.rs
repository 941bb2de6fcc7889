//! Configuration management for ScanGuard
//!
//! Provides loading, saving and validation of calibration timings, the
//! simulation volume range and the procedure / danger-zone catalogs.

use crate::calibration::{FallbackPolicy, MIN_LUMINANCE};
use crate::errors::ScanError;
use crate::safety::{
    default_procedures, default_zones, DangerZone, DangerZoneCatalog, Procedure, ProcedureCatalog,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanGuardConfig {
    pub calibration: CalibrationConfig,
    pub simulation: SimulationConfig,
    #[serde(default = "default_zones")]
    pub zones: Vec<DangerZone>,
    #[serde(default = "default_procedures")]
    pub procedures: Vec<Procedure>,
}

/// Luminance calibration timings and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Minimum luminance (lux-equivalent, 0-255 luma scale)
    pub min_luminance: f32,
    /// Sampling cadence in milliseconds
    pub sample_interval_ms: u64,
    /// Degraded-mode fallback timer in milliseconds
    pub fallback_timeout_ms: u64,
    /// What the fallback timer is allowed to do
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,
    /// Progress added per capture step (percent)
    pub progress_step: u8,
    /// Delay between capture steps in milliseconds
    pub progress_interval_ms: u64,
    /// Processing delay after capture in milliseconds
    pub processing_delay_ms: u64,
}

/// Procedure simulation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Smallest volume per injection point
    pub min_volume: f32,
    /// Largest volume per injection point
    pub max_volume: f32,
    /// Initial volume per injection point
    pub default_volume: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_luminance: MIN_LUMINANCE,
            sample_interval_ms: 500,
            fallback_timeout_ms: 3000,
            fallback_policy: FallbackPolicy::AutoProceed,
            progress_step: 10,
            progress_interval_ms: 300,
            processing_delay_ms: 2000,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_volume: 0.5,
            max_volume: 2.0,
            default_volume: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Check that the volume range is usable for clamping
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_volume > 0.0 && self.min_volume <= self.max_volume) {
            return Err("Volume range must satisfy 0 < min <= max".to_string());
        }
        if !(self.min_volume..=self.max_volume).contains(&self.default_volume) {
            return Err("Default volume must lie within the volume range".to_string());
        }
        Ok(())
    }
}

impl Default for ScanGuardConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationConfig::default(),
            simulation: SimulationConfig::default(),
            zones: default_zones(),
            procedures: default_procedures(),
        }
    }
}

impl ScanGuardConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ScanGuardConfig = toml::from_str(&contents)
            .map_err(|e| ScanError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(ScanError::Config)?;

        log::info!(
            "Loaded configuration from {:?} ({} zones, {} procedures)",
            path,
            config.zones.len(),
            config.procedures.len()
        );
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ScanError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScanError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ScanError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ScanError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("scanguard.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Build the immutable catalogs handed to the safety validator
    pub fn catalogs(&self) -> (DangerZoneCatalog, ProcedureCatalog) {
        (
            DangerZoneCatalog::new(self.zones.clone()),
            ProcedureCatalog::new(self.procedures.clone()),
        )
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let cal = &self.calibration;
        if !(0.0..=255.0).contains(&cal.min_luminance) {
            return Err("Minimum luminance must be between 0 and 255".to_string());
        }
        if cal.sample_interval_ms == 0 {
            return Err("Sample interval must be greater than 0".to_string());
        }
        if cal.progress_step == 0 || cal.progress_step > 100 {
            return Err("Progress step must be between 1 and 100".to_string());
        }
        if cal.progress_interval_ms == 0 {
            return Err("Progress interval must be greater than 0".to_string());
        }

        self.simulation.validate()?;

        if self.procedures.is_empty() {
            return Err("Procedure catalog must not be empty".to_string());
        }
        let mut ids = HashSet::new();
        for procedure in &self.procedures {
            if procedure.id.trim().is_empty() {
                return Err("Procedure id must not be empty".to_string());
            }
            if !ids.insert(procedure.id.as_str()) {
                return Err(format!("Duplicate procedure id: {}", procedure.id));
            }
        }

        for zone in &self.zones {
            zone.region
                .validate()
                .map_err(|e| format!("Invalid region for zone {}: {}", zone.name, e))?;
        }

        Ok(())
    }
}
