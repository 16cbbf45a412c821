//! Error types for RSA operations.
//!
//! Failures fall into a small closed set: [`TekRsaError::Connection`],
//! [`TekRsaError::Configuration`], [`TekRsaError::Acquisition`] and
//! [`TekRsaError::DriverFault`]. Each carries an [`ErrorRecord`] naming the
//! native call and status code when the failure came from the driver.
//! Native codes are translated in exactly one place, [`crate::checker`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::NativeCall;
use crate::status::ReturnStatus;

/// Result type alias for RSA operations.
pub type Result<T> = std::result::Result<T, TekRsaError>;

/// Connection-class failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionFault {
    /// Search found no supported instrument
    NoDeviceFound,
    /// The instrument is claimed by another session or process
    DeviceBusy,
    /// The driver refused to open the instrument
    ConnectFailed,
    /// No instrument is connected to this session
    NotConnected,
    /// The instrument disappeared mid-session (USB unplug, node change)
    DeviceLost,
    /// The USB link is wedged; only a physical replug recovers it
    ResetRequiresReplug,
    /// Another operation holds the session
    SessionBusy,
}

impl fmt::Display for ConnectionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoDeviceFound => "no device found",
            Self::DeviceBusy => "device busy",
            Self::ConnectFailed => "connect failed",
            Self::NotConnected => "not connected",
            Self::DeviceLost => "device lost",
            Self::ResetRequiresReplug => "reset requires physical USB replug",
            Self::SessionBusy => "session busy",
        };
        f.write_str(text)
    }
}

/// Configuration-class failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationFault {
    /// A value is outside the range this device accepts
    OutOfRange,
    /// The setting does not exist on this device variant
    UnsupportedOnVariant,
    /// The device rejected a setting that passed local validation
    Rejected,
}

impl fmt::Display for ConfigurationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OutOfRange => "out of range",
            Self::UnsupportedOnVariant => "unsupported on variant",
            Self::Rejected => "rejected by device",
        };
        f.write_str(text)
    }
}

/// Acquisition-class failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionFault {
    /// Data was not ready within the caller's timeout
    Timeout,
    /// The driver reported an unrecoverable acquisition error
    NativeFault,
    /// The transferred buffer does not have the requested size
    BufferSizeMismatch,
}

impl fmt::Display for AcquisitionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Timeout => "acquisition timeout",
            Self::NativeFault => "native acquisition fault",
            Self::BufferSizeMismatch => "buffer size mismatch",
        };
        f.write_str(text)
    }
}

/// Top-level class of a [`TekRsaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// [`TekRsaError::Connection`]
    Connection,
    /// [`TekRsaError::Configuration`]
    Configuration,
    /// [`TekRsaError::Acquisition`]
    Acquisition,
    /// [`TekRsaError::DriverFault`]
    Driver,
}

/// What failed, and what the driver said about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Native function that failed, if the failure came from the driver
    pub call: Option<NativeCall>,
    /// Native status code, if any
    pub status: Option<ReturnStatus>,
    /// Arguments of the failed call, where safe to report
    pub args: Option<String>,
    /// Human-readable context
    pub context: String,
}

impl ErrorRecord {
    /// Record for a failed native call.
    pub fn native(call: NativeCall, status: ReturnStatus) -> Self {
        Self {
            call: Some(call),
            status: Some(status),
            args: None,
            context: String::new(),
        }
    }

    /// Record for a failure detected by this driver.
    pub fn local(context: impl Into<String>) -> Self {
        Self {
            call: None,
            status: None,
            args: None,
            context: context.into(),
        }
    }

    /// Attach context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(call) = self.call {
            write!(f, "{}({})", call, self.args.as_deref().unwrap_or(""))?;
            if let Some(status) = self.status {
                write!(f, " returned {}", status)?;
            }
            if !self.context.is_empty() {
                write!(f, ": {}", self.context)?;
            }
            Ok(())
        } else {
            f.write_str(&self.context)
        }
    }
}

/// Errors that can occur when working with RSA instruments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TekRsaError {
    /// Device discovery, connection or link failure
    #[error("Connection error ({kind}): {record}")]
    Connection {
        kind: ConnectionFault,
        record: ErrorRecord,
    },

    /// Invalid or rejected configuration
    #[error("Configuration error ({kind}): {record}")]
    Configuration {
        kind: ConfigurationFault,
        record: ErrorRecord,
    },

    /// Acquisition did not produce a complete result
    #[error("Acquisition error ({kind}): {record}")]
    Acquisition {
        kind: AcquisitionFault,
        record: ErrorRecord,
    },

    /// Native status code not otherwise classified
    #[error("Driver fault: {record}")]
    DriverFault { record: ErrorRecord },
}

impl TekRsaError {
    /// Connection error detected locally.
    pub fn connection(kind: ConnectionFault, context: impl Into<String>) -> Self {
        Self::Connection {
            kind,
            record: ErrorRecord::local(context),
        }
    }

    /// Configuration error detected locally.
    pub fn configuration(kind: ConfigurationFault, context: impl Into<String>) -> Self {
        Self::Configuration {
            kind,
            record: ErrorRecord::local(context),
        }
    }

    /// Acquisition error detected locally.
    pub fn acquisition(kind: AcquisitionFault, context: impl Into<String>) -> Self {
        Self::Acquisition {
            kind,
            record: ErrorRecord::local(context),
        }
    }

    /// Shorthand for `Configuration/OutOfRange`.
    pub(crate) fn out_of_range(context: impl Into<String>) -> Self {
        Self::configuration(ConfigurationFault::OutOfRange, context)
    }

    /// Top-level class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connection { .. } => ErrorClass::Connection,
            Self::Configuration { .. } => ErrorClass::Configuration,
            Self::Acquisition { .. } => ErrorClass::Acquisition,
            Self::DriverFault { .. } => ErrorClass::Driver,
        }
    }

    /// Error record.
    pub fn record(&self) -> &ErrorRecord {
        match self {
            Self::Connection { record, .. }
            | Self::Configuration { record, .. }
            | Self::Acquisition { record, .. }
            | Self::DriverFault { record } => record,
        }
    }

    fn record_mut(&mut self) -> &mut ErrorRecord {
        match self {
            Self::Connection { record, .. }
            | Self::Configuration { record, .. }
            | Self::Acquisition { record, .. }
            | Self::DriverFault { record } => record,
        }
    }

    /// Native status code behind this error, if any.
    pub fn native_status(&self) -> Option<ReturnStatus> {
        self.record().status
    }

    /// Connection fault kind, if this is a connection error.
    pub fn connection_fault(&self) -> Option<ConnectionFault> {
        match self {
            Self::Connection { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Configuration fault kind, if this is a configuration error.
    pub fn configuration_fault(&self) -> Option<ConfigurationFault> {
        match self {
            Self::Configuration { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Acquisition fault kind, if this is an acquisition error.
    pub fn acquisition_fault(&self) -> Option<AcquisitionFault> {
        match self {
            Self::Acquisition { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The instrument went away mid-session.
    pub fn is_device_lost(&self) -> bool {
        self.connection_fault() == Some(ConnectionFault::DeviceLost)
    }

    /// The USB link needs a physical replug.
    pub fn requires_replug(&self) -> bool {
        self.connection_fault() == Some(ConnectionFault::ResetRequiresReplug)
    }

    /// The session can no longer talk to the instrument.
    pub fn is_fatal(&self) -> bool {
        self.is_device_lost() || self.requires_replug()
    }

    /// The acquisition timed out.
    pub fn is_timeout(&self) -> bool {
        self.acquisition_fault() == Some(AcquisitionFault::Timeout)
    }

    /// Another operation holds the session.
    pub fn is_session_busy(&self) -> bool {
        self.connection_fault() == Some(ConnectionFault::SessionBusy)
    }

    /// Attach the arguments of the failed call.
    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.record_mut().args = Some(args.into());
        self
    }

    /// Attach context, replacing any previous context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.record_mut().context = context.into();
        self
    }
}

/// Errors from loading driver configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("Invalid config: {message}")]
    Invalid { message: String },

    /// The acquisition table failed validation
    #[error("Invalid acquisition settings: {0}")]
    Acquisition(#[from] TekRsaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_record_display() {
        let err = TekRsaError::Configuration {
            kind: ConfigurationFault::Rejected,
            record: ErrorRecord::native(NativeCall::ConfigSetCenterFreq, ReturnStatus::FrequencyOutOfRange),
        }
        .with_args("9.9e9");
        let text = err.to_string();
        assert!(text.contains("CONFIG_SetCenterFreq(9.9e9)"));
        assert!(text.contains("errorFrequencyOutOfRange (1104)"));
        assert_eq!(err.native_status(), Some(ReturnStatus::FrequencyOutOfRange));
    }

    #[test]
    fn test_local_record_display() {
        let err = TekRsaError::connection(ConnectionFault::NotConnected, "call connect() first");
        assert_eq!(
            err.to_string(),
            "Connection error (not connected): call connect() first"
        );
        assert_eq!(err.class(), ErrorClass::Connection);
        assert!(err.native_status().is_none());
    }

    #[test]
    fn test_fatal_kinds() {
        let lost = TekRsaError::connection(ConnectionFault::DeviceLost, "");
        let replug = TekRsaError::connection(ConnectionFault::ResetRequiresReplug, "");
        let busy = TekRsaError::connection(ConnectionFault::SessionBusy, "");
        assert!(lost.is_fatal());
        assert!(replug.is_fatal() && replug.requires_replug());
        assert!(!busy.is_fatal());
        assert!(busy.is_session_busy());
    }

    #[test]
    fn test_replug_display_names_the_remedy() {
        assert_eq!(
            ConnectionFault::ResetRequiresReplug.to_string(),
            "reset requires physical USB replug"
        );
    }
}
