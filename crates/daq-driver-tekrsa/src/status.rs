//! Native status codes returned by every RSA_API function.
//!
//! The vendor library reports the outcome of each call as a `ReturnStatus`
//! integer. [`ReturnStatus`] names every documented code and keeps unknown
//! ones as [`ReturnStatus::Unknown`] so nothing is lost on the way to the
//! error checker.

use std::fmt;

use rsa_api_sys as sys;

/// How a status code affects the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call succeeded.
    Success,
    /// Informational: the call's outputs are valid, the code is logged.
    Warning,
    /// The call failed and its outputs must not be read.
    Failure,
}

macro_rules! return_status {
    ($($variant:ident = $sym:ident,)+) => {
        /// Typed view of a native `ReturnStatus` code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum ReturnStatus {
            $($variant,)+
            /// A code this driver does not know about.
            Unknown(i32),
        }

        impl ReturnStatus {
            /// Convert from a raw native status code.
            pub fn from_raw(raw: i32) -> Self {
                match raw {
                    $(x if x == sys::$sym as i32 => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            /// Raw native status code.
            pub fn to_raw(self) -> i32 {
                match self {
                    $(Self::$variant => sys::$sym as i32,)+
                    Self::Unknown(raw) => raw,
                }
            }

            /// Vendor symbol name, e.g. `errorNotConnected`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($sym),)+
                    Self::Unknown(_) => "unknownStatus",
                }
            }
        }
    };
}

return_status! {
    NoError = noError,
    NotConnected = errorNotConnected,
    IncompatibleFirmware = errorIncompatibleFirmware,
    BootLoaderNotRunning = errorBootLoaderNotRunning,
    TooManyBootLoadersConnected = errorTooManyBootLoadersConnected,
    RebootFailure = errorRebootFailure,
    POSTFailureFPGALoad = errorPOSTFailureFPGALoad,
    POSTFailureHiPower = errorPOSTFailureHiPower,
    POSTFailureI2C = errorPOSTFailureI2C,
    POSTFailureGPIF = errorPOSTFailureGPIF,
    POSTFailureUsbSpeed = errorPOSTFailureUsbSpeed,
    POSTDiagFailure = errorPOSTDiagFailure,
    BufferAllocFailed = errorBufferAllocFailed,
    Parameter = errorParameter,
    DataNotReady = errorDataNotReady,
    ParameterTraceLength = errorParameterTraceLength,
    MeasurementNotEnabled = errorMeasurementNotEnabled,
    SpanIsLessThanRBW = errorSpanIsLessThanRBW,
    FrequencyOutOfRange = errorFrequencyOutOfRange,
    StreamADCToDiskFileOpen = errorStreamADCToDiskFileOpen,
    StreamADCToDiskAlreadyStreaming = errorStreamADCToDiskAlreadyStreaming,
    StreamADCToDiskBadPath = errorStreamADCToDiskBadPath,
    StreamADCToDiskThreadFailure = errorStreamADCToDiskThreadFailure,
    StreamedFileInvalidHeader = errorStreamedFileInvalidHeader,
    StreamedFileOpenFailure = errorStreamedFileOpenFailure,
    StreamingOperationNotSupported = errorStreamingOperationNotSupported,
    StreamingFastForwardTimeInvalid = errorStreamingFastForwardTimeInvalid,
    StreamingInvalidParameters = errorStreamingInvalidParameters,
    StreamingEOF = errorStreamingEOF,
    IQStreamInvalidFileDataType = errorIQStreamInvalidFileDataType,
    IQStreamFileOpenFailed = errorIQStreamFileOpenFailed,
    IQStreamBandwidthOutOfRange = errorIQStreamBandwidthOutOfRange,
    Timeout = errorTimeout,
    Transfer = errorTransfer,
    FileOpen = errorFileOpen,
    Failed = errorFailed,
    CRC = errorCRC,
    ChangeToFlashMode = errorChangeToFlashMode,
    ChangeToRunMode = errorChangeToRunMode,
    DSPLError = errorDSPLError,
    LOLockFailure = errorLOLockFailure,
    ExternalReferenceNotEnabled = errorExternalReferenceNotEnabled,
    LogFailure = errorLogFailure,
    RegisterIO = errorRegisterIO,
    FileRead = errorFileRead,
    DisconnectedDeviceRemoved = errorDisconnectedDeviceRemoved,
    DisconnectedDeviceNodeChangedAndRemoved = errorDisconnectedDeviceNodeChangedAndRemoved,
    DisconnectedTimeoutWaitingForADcData = errorDisconnectedTimeoutWaitingForADcData,
    DisconnectedIOBeginTransfer = errorDisconnectedIOBeginTransfer,
    OperationNotSupportedInSimMode = errorOperationNotSupportedInSimMode,
    FPGAConfigureFailure = errorFPGAConfigureFailure,
    CalCWNormFailure = errorCalCWNormFailure,
    SystemAppDataDirectory = errorSystemAppDataDirectory,
    FileCreateMRU = errorFileCreateMRU,
    DeleteUnsuitableCachePath = errorDeleteUnsuitableCachePath,
    UnableToSetFilePermissions = errorUnableToSetFilePermissions,
    CreateCachePath = errorCreateCachePath,
    CreateCachePathBoost = errorCreateCachePathBoost,
    CreateCachePathStd = errorCreateCachePathStd,
    CreateCachePathGen = errorCreateCachePathGen,
    BufferLengthTooSmall = errorBufferLengthTooSmall,
    RemoveCachePath = errorRemoveCachePath,
    GetCachingDirectoryBoost = errorGetCachingDirectoryBoost,
    GetCachingDirectoryStd = errorGetCachingDirectoryStd,
    GetCachingDirectoryGen = errorGetCachingDirectoryGen,
    InconsistentFileSystem = errorInconsistentFileSystem,
    WriteCalConfigHeader = errorWriteCalConfigHeader,
    WriteCalConfigData = errorWriteCalConfigData,
    ReadCalConfigHeader = errorReadCalConfigHeader,
    ReadCalConfigData = errorReadCalConfigData,
    EraseCalConfig = errorEraseCalConfig,
    CalConfigFileSize = errorCalConfigFileSize,
    InvalidCalibConstantFileFormat = errorInvalidCalibConstantFileFormat,
    MismatchCalibConstantsSize = errorMismatchCalibConstantsSize,
    CalConfigInvalid = errorCalConfigInvalid,
    FlashFileSystemUnexpectedSize = errorFlashFileSystemUnexpectedSize,
    FlashFileSystemNotMounted = errorFlashFileSystemNotMounted,
    FlashFileSystemOutOfRange = errorFlashFileSystemOutOfRange,
    FlashFileSystemIndexNotFound = errorFlashFileSystemIndexNotFound,
    FlashFileSystemReadErrorCRC = errorFlashFileSystemReadErrorCRC,
    FlashFileSystemReadFileMissing = errorFlashFileSystemReadFileMissing,
    FlashFileSystemCreateCacheIndex = errorFlashFileSystemCreateCacheIndex,
    FlashFileSystemCreateCachedDataFile = errorFlashFileSystemCreateCachedDataFile,
    FlashFileSystemUnsupportedFileSize = errorFlashFileSystemUnsupportedFileSize,
    FlashFileSystemInsufficentSpace = errorFlashFileSystemInsufficentSpace,
    FlashFileSystemInconsistentState = errorFlashFileSystemInconsistentState,
    FlashFileSystemTooManyFiles = errorFlashFileSystemTooManyFiles,
    FlashFileSystemImportFileNotFound = errorFlashFileSystemImportFileNotFound,
    FlashFileSystemImportFileReadError = errorFlashFileSystemImportFileReadError,
    FlashFileSystemImportFileError = errorFlashFileSystemImportFileError,
    FlashFileSystemFileNotFoundError = errorFlashFileSystemFileNotFoundError,
    FlashFileSystemReadBufferTooSmall = errorFlashFileSystemReadBufferTooSmall,
    FlashWriteFailure = errorFlashWriteFailure,
    FlashReadFailure = errorFlashReadFailure,
    FlashFileSystemBadArgument = errorFlashFileSystemBadArgument,
    FlashFileSystemCreateFile = errorFlashFileSystemCreateFile,
    MonitoringNotSupported = errorMonitoringNotSupported,
    AuxDataNotAvailable = errorAuxDataNotAvailable,
    BatteryCommFailure = errorBatteryCommFailure,
    BatteryChargerCommFailure = errorBatteryChargerCommFailure,
    BatteryNotPresent = errorBatteryNotPresent,
    ESTOutputPathFile = errorESTOutputPathFile,
    ESTPathNotDirectory = errorESTPathNotDirectory,
    ESTPathDoesntExist = errorESTPathDoesntExist,
    ESTUnableToOpenLog = errorESTUnableToOpenLog,
    ESTUnableToOpenLimits = errorESTUnableToOpenLimits,
    RevisionDataNotFound = errorRevisionDataNotFound,
    AlignmentSignal112MHzTooLow = error112MHzAlignmentSignalLevelTooLow,
    AlignmentSignal10MHzTooLow = error10MHzAlignmentSignalLevelTooLow,
    InvalidCalConstant = errorInvalidCalConstant,
    NormalizationCacheInvalid = errorNormalizationCacheInvalid,
    InvalidAlignmentCache = errorInvalidAlignmentCache,
    ADCOverrange = errorADCOverrange,
    OscUnlock = errorOscUnlock,
    NotSupported = errorNotSupported,
    Placeholder = errorPlaceholder,
    NotImplemented = notImplemented,
}

impl ReturnStatus {
    /// Severity class of this code.
    pub fn severity(self) -> Severity {
        match self {
            Self::NoError => Severity::Success,
            Self::ADCOverrange | Self::OscUnlock | Self::LogFailure => Severity::Warning,
            _ => Severity::Failure,
        }
    }

    /// True for `noError`.
    pub fn is_success(self) -> bool {
        self == Self::NoError
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.to_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_round_trip() {
        for raw in [0, 101, 302, 1104, 3001, 3101, 3104, 9000, 9901, -1] {
            let status = ReturnStatus::from_raw(raw);
            assert!(!matches!(status, ReturnStatus::Unknown(_)), "code {raw}");
            assert_eq!(status.to_raw(), raw);
        }
    }

    #[test]
    fn test_unknown_code_preserved() {
        let status = ReturnStatus::from_raw(4242);
        assert_eq!(status, ReturnStatus::Unknown(4242));
        assert_eq!(status.to_raw(), 4242);
        assert_eq!(status.severity(), Severity::Failure);
    }

    #[test]
    fn test_names_follow_vendor_symbols() {
        assert_eq!(ReturnStatus::NotConnected.name(), "errorNotConnected");
        assert_eq!(ReturnStatus::NoError.name(), "noError");
        assert_eq!(
            ReturnStatus::DisconnectedDeviceRemoved.to_string(),
            "errorDisconnectedDeviceRemoved (3101)"
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(ReturnStatus::NoError.severity(), Severity::Success);
        assert_eq!(ReturnStatus::ADCOverrange.severity(), Severity::Warning);
        assert_eq!(ReturnStatus::OscUnlock.severity(), Severity::Warning);
        assert_eq!(ReturnStatus::Timeout.severity(), Severity::Failure);
        assert_eq!(ReturnStatus::NotImplemented.severity(), Severity::Failure);
    }
}
