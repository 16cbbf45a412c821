//! Driver configuration and session construction.
//!
//! # Example Configuration
//!
//! ```toml
//! serial = "B010114"
//! acquisition_timeout_ms = 2000
//! queue_timeout_ms = 250
//!
//! [acquisition]
//! center_frequency_hz = 2.4e9
//! reference_level_dbm = -10.0
//! span_hz = 40e6
//! ```
//!
//! With `mock = true` the session runs against [`SimulatedRsa`] modelling
//! `mock_model`; no vendor library is needed.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use serde::Deserialize;
use tracing::info;

use crate::api::SimulatedRsa;
use crate::config::AcquisitionConfig;
use crate::device::{DeviceSelector, DeviceVariant};
use crate::error::{ConfigError, Result};
use crate::session::{DeviceSession, SessionOptions};

/// Configuration for one RSA session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Connect to the instrument with this serial number
    #[serde(default)]
    pub serial: Option<String>,

    /// Connect to this driver device ID
    #[serde(default)]
    pub device_id: Option<i32>,

    /// Use the simulated instrument
    #[serde(default)]
    pub mock: bool,

    /// Model simulated when `mock` is set
    #[serde(default = "default_mock_model")]
    pub mock_model: DeviceVariant,

    /// Default data-ready timeout for acquisitions
    #[serde(default = "default_acquisition_timeout_ms")]
    pub acquisition_timeout_ms: u64,

    /// Native wait slice inside an acquisition
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Wait for a busy session this long (0 = reject immediately)
    #[serde(default)]
    pub queue_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub preset_on_connect: bool,

    #[serde(default = "default_true")]
    pub align_on_connect: bool,

    /// Realign before each acquisition when the instrument asks for it
    #[serde(default)]
    pub align_before_acquire: bool,

    #[serde(default = "default_warning_log_capacity")]
    pub warning_log_capacity: usize,

    #[serde(default = "default_connect_cycle_warning")]
    pub connect_cycle_warning: u64,

    /// Acquisition settings staged on the new session
    #[serde(default)]
    pub acquisition: Option<AcquisitionConfig>,
}

fn default_mock_model() -> DeviceVariant {
    DeviceVariant::Rsa306B
}

fn default_acquisition_timeout_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

fn default_warning_log_capacity() -> usize {
    crate::checker::DEFAULT_WARNING_CAPACITY
}

fn default_connect_cycle_warning() -> u64 {
    500
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            serial: None,
            device_id: None,
            mock: false,
            mock_model: default_mock_model(),
            acquisition_timeout_ms: default_acquisition_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            queue_timeout_ms: 0,
            preset_on_connect: true,
            align_on_connect: true,
            align_before_acquire: false,
            warning_log_capacity: default_warning_log_capacity(),
            connect_cycle_warning: default_connect_cycle_warning(),
            acquisition: None,
        }
    }
}

impl DriverConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// The underlying [`ConfigError`] stays reachable through
    /// `downcast_ref`.
    pub fn load(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let parsed = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|content| Self::from_toml_str(&content));
        parsed.with_context(|| format!("reading RSA driver config {}", path.display()))
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.serial.is_some() && self.device_id.is_some() {
            return Err(ConfigError::Invalid {
                message: "set at most one of 'serial' and 'device_id'".into(),
            });
        }
        if self.acquisition_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "acquisition_timeout_ms must be positive".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "poll_interval_ms must be positive".into(),
            });
        }
        if let Some(acquisition) = &self.acquisition {
            acquisition.validate()?;
        }
        Ok(())
    }

    /// Session options described by this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            acquisition_timeout: Duration::from_millis(self.acquisition_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            queue_timeout: Duration::from_millis(self.queue_timeout_ms),
            preset_on_connect: self.preset_on_connect,
            align_on_connect: self.align_on_connect,
            align_before_acquire: self.align_before_acquire,
            warning_log_capacity: self.warning_log_capacity,
            connect_cycle_warning: self.connect_cycle_warning,
        }
    }

    /// Instrument selection described by this configuration.
    pub fn selector(&self) -> DeviceSelector {
        match (&self.serial, self.device_id) {
            (Some(serial), _) => DeviceSelector::Serial(serial.clone()),
            (None, Some(id)) => DeviceSelector::Id(id),
            (None, None) => DeviceSelector::Any,
        }
    }
}

impl DeviceSession {
    /// Build a disconnected session from configuration.
    ///
    /// The `[acquisition]` table, if present, is staged for the first
    /// acquisition after connecting.
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        let options = config.session_options();
        let session = if config.mock {
            info!(model = %config.mock_model, "Creating simulated RSA session");
            Self::new(SimulatedRsa::single(config.mock_model), options)
        } else {
            Self::native(options)?
        };
        if let Some(acquisition) = &config.acquisition {
            session.stage(acquisition.clone())?;
        }
        Ok(session)
    }

    #[cfg(feature = "hardware")]
    fn native(options: SessionOptions) -> Result<Self> {
        info!("Creating RSA session over RSA_API");
        Ok(Self::new(crate::api::NativeRsa::acquire()?, options))
    }

    #[cfg(not(feature = "hardware"))]
    fn native(_options: SessionOptions) -> Result<Self> {
        use crate::error::{ConnectionFault, TekRsaError};

        Err(TekRsaError::connection(
            ConnectionFault::ConnectFailed,
            "built without the 'hardware' feature; set mock = true or rebuild with --features hardware",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionFault;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::from_toml_str("").unwrap();
        assert_eq!(config, DriverConfig::default());
        let options = config.session_options();
        assert_eq!(options.acquisition_timeout, Duration::from_secs(1));
        assert_eq!(options.queue_timeout, Duration::ZERO);
        assert_eq!(config.selector(), DeviceSelector::Any);
    }

    #[test]
    fn test_acquisition_table() {
        let config = DriverConfig::from_toml_str(
            r#"
            mock = true
            mock_model = "RSA507A"
            serial = "B020000"

            [acquisition]
            center_frequency_hz = 915e6
            reference_level_dbm = -20.0
            attenuation_db = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.mock_model, DeviceVariant::Rsa507A);
        assert_eq!(config.selector(), DeviceSelector::Serial("B020000".into()));
        let acquisition = config.acquisition.unwrap();
        assert_eq!(acquisition.center_frequency_hz, 915e6);
        assert_eq!(acquisition.attenuation_db, Some(10.0));
    }

    #[test]
    fn test_align_before_acquire_flows_to_options() {
        let config = DriverConfig::from_toml_str("align_before_acquire = true").unwrap();
        assert!(config.session_options().align_before_acquire);
        assert!(!DriverConfig::default().session_options().align_before_acquire);
    }

    #[test]
    fn test_load_keeps_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsa.toml");
        std::fs::write(&path, "poll_interval_ms = 0").unwrap();

        let err = DriverConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("reading RSA driver config"));
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_rejects_conflicting_selection() {
        let err = DriverConfig::from_toml_str("serial = \"X\"\ndevice_id = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_invalid_acquisition() {
        let err = DriverConfig::from_toml_str("[acquisition]\nreference_level_dbm = 45.0").unwrap_err();
        assert!(matches!(err, ConfigError::Acquisition(_)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = DriverConfig::from_toml_str("timeout = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_native_requires_feature() {
        let err = DeviceSession::from_config(&DriverConfig::default()).unwrap_err();
        assert_eq!(err.connection_fault(), Some(ConnectionFault::ConnectFailed));
    }
}
