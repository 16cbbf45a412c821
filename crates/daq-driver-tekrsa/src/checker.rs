//! Error Checker.
//!
//! Every [`Reply`] produced by the adapter passes through [`StatusChecker`]
//! before anything else sees it:
//!
//! - success passes the value through
//! - warning-class codes pass the value through, are logged with
//!   `tracing::warn!` and are appended to the session [`WarningLog`]
//! - failure-class codes become a [`TekRsaError`] via [`classify`]
//!
//! [`CheckedApi`] owns the adapter and exposes it only through
//! [`CheckedApi::call`], so there is no unchecked path to the driver.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::warn;

use crate::api::{NativeCall, Reply, RsaApi};
use crate::error::{
    AcquisitionFault, ConfigurationFault, ConnectionFault, ErrorRecord, Result, TekRsaError,
};
use crate::status::{ReturnStatus, Severity};

/// Default number of warnings retained by a [`WarningLog`].
pub const DEFAULT_WARNING_CAPACITY: usize = 32;

/// A warning-class status returned by a native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningRecord {
    /// Native function that returned the warning
    pub call: NativeCall,
    /// Warning code
    pub status: ReturnStatus,
    /// When the warning was observed
    pub at: DateTime<Utc>,
}

/// Bounded ring of recent warnings, shared between the checker and the
/// session status snapshot.
#[derive(Debug)]
pub struct WarningLog {
    entries: Mutex<VecDeque<WarningRecord>>,
    capacity: usize,
    total: AtomicU64,
}

impl WarningLog {
    /// Create a log retaining at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            total: AtomicU64::new(0),
        }
    }

    /// Append a warning, evicting the oldest entry when full.
    pub fn push(&self, record: WarningRecord) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Most recent warning.
    pub fn last(&self) -> Option<WarningRecord> {
        self.entries.lock().back().cloned()
    }

    /// Retained warnings, oldest first.
    pub fn recent(&self) -> Vec<WarningRecord> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Warnings observed since creation, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Retention limit.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for WarningLog {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_CAPACITY)
    }
}

/// Map a failure-class native status to the error taxonomy.
///
/// This is the only place native codes are interpreted.
pub fn classify(call: NativeCall, status: ReturnStatus) -> TekRsaError {
    use ReturnStatus as S;

    let record = ErrorRecord::native(call, status);
    let connection = |kind| TekRsaError::Connection {
        kind,
        record: record.clone(),
    };
    let configuration = |kind| TekRsaError::Configuration {
        kind,
        record: record.clone(),
    };
    let acquisition = |kind| TekRsaError::Acquisition {
        kind,
        record: record.clone(),
    };

    match status {
        S::NotConnected
        | S::DisconnectedDeviceRemoved
        | S::DisconnectedDeviceNodeChangedAndRemoved
        | S::DisconnectedTimeoutWaitingForADcData => connection(ConnectionFault::DeviceLost),

        S::RebootFailure | S::ChangeToFlashMode | S::ChangeToRunMode | S::DisconnectedIOBeginTransfer => {
            connection(ConnectionFault::ResetRequiresReplug)
        }

        S::IncompatibleFirmware
        | S::BootLoaderNotRunning
        | S::TooManyBootLoadersConnected
        | S::POSTFailureFPGALoad
        | S::POSTFailureHiPower
        | S::POSTFailureI2C
        | S::POSTFailureGPIF
        | S::POSTFailureUsbSpeed
        | S::POSTDiagFailure => connection(ConnectionFault::ConnectFailed),

        S::Transfer if call == NativeCall::DeviceConnect => connection(ConnectionFault::DeviceBusy),

        S::Parameter
        | S::ParameterTraceLength
        | S::SpanIsLessThanRBW
        | S::FrequencyOutOfRange
        | S::IQStreamInvalidFileDataType
        | S::IQStreamFileOpenFailed
        | S::IQStreamBandwidthOutOfRange
        | S::StreamingInvalidParameters
        | S::ExternalReferenceNotEnabled => configuration(ConfigurationFault::Rejected),

        S::NotSupported | S::OperationNotSupportedInSimMode | S::StreamingOperationNotSupported => {
            configuration(ConfigurationFault::UnsupportedOnVariant)
        }

        S::DataNotReady | S::Timeout => acquisition(AcquisitionFault::Timeout),

        S::MeasurementNotEnabled | S::DSPLError | S::LOLockFailure | S::AuxDataNotAvailable => {
            acquisition(AcquisitionFault::NativeFault)
        }

        S::BufferLengthTooSmall => acquisition(AcquisitionFault::BufferSizeMismatch),

        _ => TekRsaError::DriverFault { record },
    }
}

/// Applies the status policy to adapter replies.
#[derive(Debug, Clone)]
pub struct StatusChecker {
    warnings: Arc<WarningLog>,
}

impl StatusChecker {
    /// Create a checker feeding the given warning log.
    pub fn new(warnings: Arc<WarningLog>) -> Self {
        Self { warnings }
    }

    /// Shared warning log.
    pub fn warnings(&self) -> &Arc<WarningLog> {
        &self.warnings
    }

    /// Pass the value through or convert the status into an error.
    pub fn check<T>(&self, reply: Reply<T>) -> Result<T> {
        let (call, status, value) = reply.into_parts();
        match status.severity() {
            Severity::Success => {}
            Severity::Warning => {
                warn!(call = call.name(), status = %status, "RSA_API warning");
                self.warnings.push(WarningRecord {
                    call,
                    status,
                    at: Utc::now(),
                });
            }
            Severity::Failure => return Err(classify(call, status)),
        }
        value.ok_or_else(|| TekRsaError::DriverFault {
            record: ErrorRecord::native(call, status)
                .with_context("driver reported success without output"),
        })
    }
}

/// The adapter, reachable only through the checker.
pub struct CheckedApi {
    api: Box<dyn RsaApi>,
    checker: StatusChecker,
}

impl CheckedApi {
    /// Wrap an adapter.
    pub fn new(api: Box<dyn RsaApi>, warnings: Arc<WarningLog>) -> Self {
        Self {
            api,
            checker: StatusChecker::new(warnings),
        }
    }

    /// Invoke one adapter method and check its reply.
    pub fn call<T>(&mut self, f: impl FnOnce(&mut dyn RsaApi) -> Reply<T>) -> Result<T> {
        let reply = f(self.api.as_mut());
        self.checker.check(reply)
    }

    /// Shared warning log.
    pub fn warnings(&self) -> &Arc<WarningLog> {
        self.checker.warnings()
    }
}

impl std::fmt::Debug for CheckedApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckedApi").finish_non_exhaustive()
    }
}
