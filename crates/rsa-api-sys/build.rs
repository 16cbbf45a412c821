//! Build script for rsa-api-sys FFI bindings.
//!
//! Two modes:
//!
//! 1. With `rsa-sdk` feature: bindings are generated from the vendor `RSA_API.h`
//!    and the crate links against `libRSA_API` and `libcyusb_shared`.
//! 2. Without the feature: dummy bindings with identical names and layouts are
//!    written so the workspace builds and tests on machines without the SDK.

use std::env;
use std::path::PathBuf;

#[cfg(feature = "rsa-sdk")]
const DEFAULT_SDK_DIR: &str = "/opt/tekrsa";

fn main() {
    println!("cargo:rerun-if-changed=wrapper.h");
    println!("cargo:rerun-if-env-changed=RSA_API_DIR");

    #[cfg(feature = "rsa-sdk")]
    generate_bindings();

    #[cfg(not(feature = "rsa-sdk"))]
    generate_dummy_bindings();

    #[cfg(feature = "rsa-sdk")]
    {
        let sdk_dir = sdk_dir();
        for lib_dir in [sdk_dir.join("lib"), PathBuf::from("/usr/local/lib"), PathBuf::from("/usr/lib")] {
            if lib_dir.join("libRSA_API.so").exists() {
                println!("cargo:rustc-link-search=native={}", lib_dir.display());
                break;
            }
        }
        println!("cargo:rustc-link-lib=dylib=RSA_API");
        println!("cargo:rustc-link-lib=dylib=cyusb_shared");
    }
}

#[cfg(feature = "rsa-sdk")]
fn sdk_dir() -> PathBuf {
    env::var("RSA_API_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SDK_DIR))
}

#[cfg(feature = "rsa-sdk")]
fn generate_bindings() {
    let sdk_dir = sdk_dir();
    let include_dir = if sdk_dir.join("include").join("RSA_API.h").exists() {
        sdk_dir.join("include")
    } else {
        sdk_dir.clone()
    };

    println!("cargo:rerun-if-changed={}", include_dir.join("RSA_API.h").display());

    let bindings = bindgen::Builder::default()
        .header("wrapper.h")
        .clang_arg(format!("-I{}", include_dir.display()))
        .allowlist_function("(DEVICE|CONFIG|TRIG|ALIGN|SPECTRUM|IQBLK|IQSTREAM|REFTIME|DPX|DPXSOGRAM)_.*")
        .allowlist_type("ReturnStatus")
        .allowlist_type("(DEVICE|SPECTRUM|IQBLK|IQSTREAM|DPX)_.*")
        .allowlist_type("IQSOUTD(EST|TYPE)")
        .allowlist_type("REFTIME_SRC")
        .allowlist_type("Spectrum.*")
        .allowlist_type("Trigger.*")
        .allowlist_type("FREQREF_SOURCE")
        .allowlist_type("VerticalUnitType")
        .allowlist_var("DEVSRCH_.*")
        .allowlist_var("DEVINFO_.*")
        .allowlist_var("DEVEVENT_.*")
        .allowlist_var("AcqDataStatus_.*")
        .allowlist_var("IQBLK_STATUS_.*")
        .allowlist_var("IQSTRM_.*")
        .allowlist_var("IQSSDFN_.*")
        // Flat constant names so the dummy bindings and the SDK agree
        .default_enum_style(bindgen::EnumVariation::Consts)
        .prepend_enum_name(false)
        .derive_debug(true)
        .derive_default(true)
        .derive_copy(true)
        .generate_comments(true)
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .generate()
        .expect("Unable to generate RSA_API bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}

/// Generate dummy bindings when the SDK is not available.
#[cfg(not(feature = "rsa-sdk"))]
fn generate_dummy_bindings() {
    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    let dummy = r#"
// Dummy bindings - rsa-sdk feature not enabled
//
// Names, layouts and constant values follow RSA_API.h. Every function panics;
// enable the `rsa-sdk` feature to link the real library.

use std::os::raw::{c_char, c_int, c_long, c_uint};

pub type ReturnStatus = c_int;
pub type wchar_t = c_int;
pub type time_t = c_long;

// Search and info string sizes
pub const DEVSRCH_MAX_NUM_DEVICES: u32 = 20;
pub const DEVSRCH_SERIAL_MAX_STRLEN: u32 = 100;
pub const DEVSRCH_TYPE_MAX_STRLEN: u32 = 20;
pub const DEVINFO_MAX_STRLEN: u32 = 100;

// Device events
pub const DEVEVENT_OVERRANGE: c_int = 0;
pub const DEVEVENT_TRIGGER: c_int = 1;
pub const DEVEVENT_1PPS: c_int = 2;

pub type SpectrumWindows = c_uint;
pub const SpectrumWindow_Kaiser: SpectrumWindows = 0;
pub const SpectrumWindow_Mil6dB: SpectrumWindows = 1;
pub const SpectrumWindow_BlackmanHarris: SpectrumWindows = 2;
pub const SpectrumWindow_Rectangle: SpectrumWindows = 3;
pub const SpectrumWindow_FlatTop: SpectrumWindows = 4;
pub const SpectrumWindow_Hann: SpectrumWindows = 5;

pub type SpectrumVerticalUnits = c_uint;
pub const SpectrumVerticalUnit_dBm: SpectrumVerticalUnits = 0;
pub const SpectrumVerticalUnit_Watt: SpectrumVerticalUnits = 1;
pub const SpectrumVerticalUnit_Volt: SpectrumVerticalUnits = 2;
pub const SpectrumVerticalUnit_Amp: SpectrumVerticalUnits = 3;
pub const SpectrumVerticalUnit_dBmV: SpectrumVerticalUnits = 4;

pub type SpectrumDetectors = c_uint;
pub const SpectrumDetector_PosPeak: SpectrumDetectors = 0;
pub const SpectrumDetector_NegPeak: SpectrumDetectors = 1;
pub const SpectrumDetector_AverageVRMS: SpectrumDetectors = 2;
pub const SpectrumDetector_Sample: SpectrumDetectors = 3;

pub type SpectrumTraces = c_uint;
pub const SpectrumTrace1: SpectrumTraces = 0;
pub const SpectrumTrace2: SpectrumTraces = 1;
pub const SpectrumTrace3: SpectrumTraces = 2;

pub type TriggerMode = c_uint;
pub const freeRun: TriggerMode = 0;
pub const triggered: TriggerMode = 1;

pub type TriggerSource = c_uint;
pub const TriggerSourceExternal: TriggerSource = 0;
pub const TriggerSourceIFPowerLevel: TriggerSource = 1;

pub type TriggerTransition = c_uint;
pub const TriggerTransitionLH: TriggerTransition = 1;
pub const TriggerTransitionHL: TriggerTransition = 2;
pub const TriggerTransitionEither: TriggerTransition = 3;

pub type FREQREF_SOURCE = c_uint;
pub const FRI_INTERNAL: FREQREF_SOURCE = 0;
pub const FRI_EXTREF: FREQREF_SOURCE = 1;
pub const FRI_GNSS: FREQREF_SOURCE = 2;
pub const FRI_USER: FREQREF_SOURCE = 3;

pub type VerticalUnitType = c_uint;
pub const VerticalUnit_dBm: VerticalUnitType = 0;
pub const VerticalUnit_Watt: VerticalUnitType = 1;
pub const VerticalUnit_Volt: VerticalUnitType = 2;
pub const VerticalUnit_Amp: VerticalUnitType = 3;

// Spectrum and DPX acquisition status bits
pub const AcqDataStatus_ADC_OVERRANGE: c_uint = 0x1;
pub const AcqDataStatus_REF_OSC_UNLOCK: c_uint = 0x2;
pub const AcqDataStatus_LOW_SUPPLY_VOLTAGE: c_uint = 0x10;
pub const AcqDataStatus_ADC_DATA_LOST: c_uint = 0x20;
pub const AcqDataStatus_VALID_BITS_MASK: c_uint = 0x33;

// IQ block acquisition status bits
pub const IQBLK_STATUS_INPUT_OVERRANGE: c_uint = 1 << 0;
pub const IQBLK_STATUS_FREQREF_UNLOCKED: c_uint = 1 << 1;
pub const IQBLK_STATUS_ACQ_SYS_ERROR: c_uint = 1 << 2;
pub const IQBLK_STATUS_DATA_XFER_ERROR: c_uint = 1 << 3;

// IQ streaming output
pub type IQSOUTDEST = c_uint;
pub const IQSOD_CLIENT: IQSOUTDEST = 0;
pub const IQSOD_FILE_TIQ: IQSOUTDEST = 1;
pub const IQSOD_FILE_SIQ: IQSOUTDEST = 2;
pub const IQSOD_FILE_SIQ_SPLIT: IQSOUTDEST = 3;

pub type IQSOUTDTYPE = c_uint;
pub const IQSODT_SINGLE: IQSOUTDTYPE = 0;
pub const IQSODT_INT32: IQSOUTDTYPE = 1;
pub const IQSODT_INT16: IQSOUTDTYPE = 2;
pub const IQSODT_SINGLE_SCALE_INT32: IQSOUTDTYPE = 3;

pub const IQSSDFN_SUFFIX_INCRINDEX_MIN: c_int = 0;
pub const IQSSDFN_SUFFIX_TIMESTAMP: c_int = -1;
pub const IQSSDFN_SUFFIX_NONE: c_int = -2;

// IQ streaming acqStatus; sticky copies sit IQSTRM_STATUS_STICKY_SHIFT higher
pub const IQSTRM_STATUS_OVERRANGE: c_uint = 1 << 0;
pub const IQSTRM_STATUS_XFER_DISCONTINUITY: c_uint = 1 << 1;
pub const IQSTRM_STATUS_IBUFF75PCT: c_uint = 1 << 2;
pub const IQSTRM_STATUS_IBUFFOVFLOW: c_uint = 1 << 3;
pub const IQSTRM_STATUS_OBUFF75PCT: c_uint = 1 << 4;
pub const IQSTRM_STATUS_OBUFFOVFLOW: c_uint = 1 << 5;
pub const IQSTRM_STATUS_NONSTICKY_SHIFT: c_uint = 0;
pub const IQSTRM_STATUS_STICKY_SHIFT: c_uint = 16;

// Reference time
pub type REFTIME_SRC = c_uint;
pub const RTSRC_NONE: REFTIME_SRC = 0;
pub const RTSRC_SYSTEM: REFTIME_SRC = 1;
pub const RTSRC_GNSS: REFTIME_SRC = 2;
pub const RTSRC_USER: REFTIME_SRC = 3;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct DEVICE_INFO {
    pub nomenclature: [c_char; 100],
    pub serialNum: [c_char; 100],
    pub apiVersion: [c_char; 100],
    pub fwVersion: [c_char; 100],
    pub fpgaVersion: [c_char; 100],
    pub hwVersion: [c_char; 100],
}

impl Default for DEVICE_INFO {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct SPECTRUM_LIMITS {
    pub maxSpan: f64,
    pub minSpan: f64,
    pub maxRBW: f64,
    pub minRBW: f64,
    pub maxVBW: f64,
    pub minVBW: f64,
    pub maxTraceLength: c_int,
    pub minTraceLength: c_int,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct SPECTRUM_SETTINGS {
    pub span: f64,
    pub rbw: f64,
    pub enableVBW: bool,
    pub vbw: f64,
    pub traceLength: c_int,
    pub window: SpectrumWindows,
    pub verticalUnit: SpectrumVerticalUnits,
    pub actualStartFreq: f64,
    pub actualStopFreq: f64,
    pub actualFreqStepSize: f64,
    pub actualRBW: f64,
    pub actualVBW: f64,
    pub actualNumIQSamples: c_int,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct Spectrum_TraceInfo {
    pub timestamp: i64,
    pub acqDataStatus: u16,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct IQBLK_ACQINFO {
    pub sample0Timestamp: u64,
    pub triggerSampleIndex: u64,
    pub triggerTimestamp: u64,
    pub acqStatus: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct IQSTREAM_File_Info {
    pub numberSamples: u64,
    pub sample0Timestamp: u64,
    pub triggerSampleIndex: u64,
    pub triggerTimestamp: u64,
    pub acqStatus: u32,
    pub filenames: *mut *mut wchar_t,
}

impl Default for IQSTREAM_File_Info {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct DPX_SettingsStruct {
    pub enableSpectrum: bool,
    pub enableSpectrogram: bool,
    pub bitmapWidth: i32,
    pub bitmapHeight: i32,
    pub traceLength: i32,
    pub decayFactor: f32,
    pub actualRBW: f64,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct DPX_SogramSettingsStruct {
    pub bitmapWidth: i32,
    pub bitmapHeight: i32,
    pub sogramTraceLineTime: f64,
    pub sogramBitmapLineTime: f64,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct DPX_FrameBuffer {
    pub fftPerSec: i32,
    pub fftCount: i64,
    pub frameCount: i64,
    pub timestamp: f64,
    pub acqDataStatus: u32,
    pub minSigDuration: f64,
    pub minSigDurOutOfRange: bool,
    pub spectrumBitmapWidth: i32,
    pub spectrumBitmapHeight: i32,
    pub spectrumBitmapSize: i32,
    pub spectrumTraceLength: i32,
    pub numSpectrumTraces: i32,
    pub spectrumEnabled: bool,
    pub spectrogramEnabled: bool,
    pub spectrumBitmap: *mut f32,
    pub spectrumTraces: *mut *mut f32,
    pub sogramBitmapWidth: i32,
    pub sogramBitmapHeight: i32,
    pub sogramBitmapSize: i32,
    pub sogramBitmapNumValidLines: i32,
    pub sogramBitmap: *mut u8,
    pub sogramBitmapTimestampArray: *mut f64,
    pub sogramBitmapContainTriggerArray: *mut i16,
    pub isDPXSpectrumZeroSpan: bool,
}

impl Default for DPX_FrameBuffer {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

// Status codes
pub const noError: ReturnStatus = 0;
pub const errorNotConnected: ReturnStatus = 101;
pub const errorIncompatibleFirmware: ReturnStatus = 102;
pub const errorBootLoaderNotRunning: ReturnStatus = 103;
pub const errorTooManyBootLoadersConnected: ReturnStatus = 104;
pub const errorRebootFailure: ReturnStatus = 105;
pub const errorPOSTFailureFPGALoad: ReturnStatus = 201;
pub const errorPOSTFailureHiPower: ReturnStatus = 202;
pub const errorPOSTFailureI2C: ReturnStatus = 203;
pub const errorPOSTFailureGPIF: ReturnStatus = 204;
pub const errorPOSTFailureUsbSpeed: ReturnStatus = 205;
pub const errorPOSTDiagFailure: ReturnStatus = 206;
pub const errorBufferAllocFailed: ReturnStatus = 301;
pub const errorParameter: ReturnStatus = 302;
pub const errorDataNotReady: ReturnStatus = 304;
pub const errorParameterTraceLength: ReturnStatus = 1101;
pub const errorMeasurementNotEnabled: ReturnStatus = 1102;
pub const errorSpanIsLessThanRBW: ReturnStatus = 1103;
pub const errorFrequencyOutOfRange: ReturnStatus = 1104;
pub const errorStreamADCToDiskFileOpen: ReturnStatus = 1201;
pub const errorStreamADCToDiskAlreadyStreaming: ReturnStatus = 1202;
pub const errorStreamADCToDiskBadPath: ReturnStatus = 1203;
pub const errorStreamADCToDiskThreadFailure: ReturnStatus = 1204;
pub const errorStreamedFileInvalidHeader: ReturnStatus = 1205;
pub const errorStreamedFileOpenFailure: ReturnStatus = 1206;
pub const errorStreamingOperationNotSupported: ReturnStatus = 1207;
pub const errorStreamingFastForwardTimeInvalid: ReturnStatus = 1208;
pub const errorStreamingInvalidParameters: ReturnStatus = 1209;
pub const errorStreamingEOF: ReturnStatus = 1210;
pub const errorIQStreamInvalidFileDataType: ReturnStatus = 1301;
pub const errorIQStreamFileOpenFailed: ReturnStatus = 1302;
pub const errorIQStreamBandwidthOutOfRange: ReturnStatus = 1303;
pub const errorTimeout: ReturnStatus = 3001;
pub const errorTransfer: ReturnStatus = 3002;
pub const errorFileOpen: ReturnStatus = 3003;
pub const errorFailed: ReturnStatus = 3004;
pub const errorCRC: ReturnStatus = 3005;
pub const errorChangeToFlashMode: ReturnStatus = 3006;
pub const errorChangeToRunMode: ReturnStatus = 3007;
pub const errorDSPLError: ReturnStatus = 3008;
pub const errorLOLockFailure: ReturnStatus = 3009;
pub const errorExternalReferenceNotEnabled: ReturnStatus = 3010;
pub const errorLogFailure: ReturnStatus = 3011;
pub const errorRegisterIO: ReturnStatus = 3012;
pub const errorFileRead: ReturnStatus = 3013;
pub const errorDisconnectedDeviceRemoved: ReturnStatus = 3101;
pub const errorDisconnectedDeviceNodeChangedAndRemoved: ReturnStatus = 3102;
pub const errorDisconnectedTimeoutWaitingForADcData: ReturnStatus = 3103;
pub const errorDisconnectedIOBeginTransfer: ReturnStatus = 3104;
pub const errorOperationNotSupportedInSimMode: ReturnStatus = 3015;
pub const errorFPGAConfigureFailure: ReturnStatus = 3201;
pub const errorCalCWNormFailure: ReturnStatus = 3202;
pub const errorSystemAppDataDirectory: ReturnStatus = 3203;
pub const errorFileCreateMRU: ReturnStatus = 3204;
pub const errorDeleteUnsuitableCachePath: ReturnStatus = 3205;
pub const errorUnableToSetFilePermissions: ReturnStatus = 3206;
pub const errorCreateCachePath: ReturnStatus = 3207;
pub const errorCreateCachePathBoost: ReturnStatus = 3208;
pub const errorCreateCachePathStd: ReturnStatus = 3209;
pub const errorCreateCachePathGen: ReturnStatus = 3210;
pub const errorBufferLengthTooSmall: ReturnStatus = 3211;
pub const errorRemoveCachePath: ReturnStatus = 3212;
pub const errorGetCachingDirectoryBoost: ReturnStatus = 3213;
pub const errorGetCachingDirectoryStd: ReturnStatus = 3214;
pub const errorGetCachingDirectoryGen: ReturnStatus = 3215;
pub const errorInconsistentFileSystem: ReturnStatus = 3216;
pub const errorWriteCalConfigHeader: ReturnStatus = 3301;
pub const errorWriteCalConfigData: ReturnStatus = 3302;
pub const errorReadCalConfigHeader: ReturnStatus = 3303;
pub const errorReadCalConfigData: ReturnStatus = 3304;
pub const errorEraseCalConfig: ReturnStatus = 3305;
pub const errorCalConfigFileSize: ReturnStatus = 3306;
pub const errorInvalidCalibConstantFileFormat: ReturnStatus = 3307;
pub const errorMismatchCalibConstantsSize: ReturnStatus = 3308;
pub const errorCalConfigInvalid: ReturnStatus = 3309;
pub const errorFlashFileSystemUnexpectedSize: ReturnStatus = 3401;
pub const errorFlashFileSystemNotMounted: ReturnStatus = 3402;
pub const errorFlashFileSystemOutOfRange: ReturnStatus = 3403;
pub const errorFlashFileSystemIndexNotFound: ReturnStatus = 3404;
pub const errorFlashFileSystemReadErrorCRC: ReturnStatus = 3405;
pub const errorFlashFileSystemReadFileMissing: ReturnStatus = 3406;
pub const errorFlashFileSystemCreateCacheIndex: ReturnStatus = 3407;
pub const errorFlashFileSystemCreateCachedDataFile: ReturnStatus = 3408;
pub const errorFlashFileSystemUnsupportedFileSize: ReturnStatus = 3409;
pub const errorFlashFileSystemInsufficentSpace: ReturnStatus = 3410;
pub const errorFlashFileSystemInconsistentState: ReturnStatus = 3411;
pub const errorFlashFileSystemTooManyFiles: ReturnStatus = 3412;
pub const errorFlashFileSystemImportFileNotFound: ReturnStatus = 3413;
pub const errorFlashFileSystemImportFileReadError: ReturnStatus = 3414;
pub const errorFlashFileSystemImportFileError: ReturnStatus = 3415;
pub const errorFlashFileSystemFileNotFoundError: ReturnStatus = 3416;
pub const errorFlashFileSystemReadBufferTooSmall: ReturnStatus = 3417;
pub const errorFlashWriteFailure: ReturnStatus = 3418;
pub const errorFlashReadFailure: ReturnStatus = 3419;
pub const errorFlashFileSystemBadArgument: ReturnStatus = 3420;
pub const errorFlashFileSystemCreateFile: ReturnStatus = 3421;
pub const errorMonitoringNotSupported: ReturnStatus = 3501;
pub const errorAuxDataNotAvailable: ReturnStatus = 3502;
pub const errorBatteryCommFailure: ReturnStatus = 3601;
pub const errorBatteryChargerCommFailure: ReturnStatus = 3602;
pub const errorBatteryNotPresent: ReturnStatus = 3603;
pub const errorESTOutputPathFile: ReturnStatus = 3701;
pub const errorESTPathNotDirectory: ReturnStatus = 3702;
pub const errorESTPathDoesntExist: ReturnStatus = 3703;
pub const errorESTUnableToOpenLog: ReturnStatus = 3704;
pub const errorESTUnableToOpenLimits: ReturnStatus = 3705;
pub const errorRevisionDataNotFound: ReturnStatus = 3801;
pub const error112MHzAlignmentSignalLevelTooLow: ReturnStatus = 3901;
pub const error10MHzAlignmentSignalLevelTooLow: ReturnStatus = 3902;
pub const errorInvalidCalConstant: ReturnStatus = 3903;
pub const errorNormalizationCacheInvalid: ReturnStatus = 3904;
pub const errorInvalidAlignmentCache: ReturnStatus = 3905;
pub const errorADCOverrange: ReturnStatus = 9000;
pub const errorOscUnlock: ReturnStatus = 9001;
pub const errorNotSupported: ReturnStatus = 9901;
pub const errorPlaceholder: ReturnStatus = 9999;
pub const notImplemented: ReturnStatus = -1;

// Panic stubs: linking succeeds without the SDK, any call fails loudly.

const RSA_SDK_PANIC_MSG: &str = "RSA_API function called but rsa-sdk feature is not enabled. \
    Enable the rsa-sdk feature (or `hardware` in daq-driver-tekrsa) to use the real library.";

#[no_mangle]
pub unsafe extern "C" fn DEVICE_Search(_numDevicesFound: *mut c_int, _deviceIDs: *mut c_int, _deviceSerial: *mut [c_char; 100], _deviceType: *mut [c_char; 20]) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_Connect(_deviceID: c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_Disconnect() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_Reset(_deviceID: c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_GetInfo(_devInfo: *mut DEVICE_INFO) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_Run() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_Stop() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_GetEnable(_enable: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_GetOverTemperatureStatus(_overTemperature: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DEVICE_GetEventStatus(_eventID: c_int, _eventOccurred: *mut bool, _eventTimestamp: *mut u64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn ALIGN_GetWarmupStatus(_warmedUp: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn ALIGN_GetAlignmentNeeded(_needed: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn ALIGN_RunAlignment() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_Preset() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_SetCenterFreq(_cf: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetCenterFreq(_cf: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetMinCenterFreq(_minCF: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetMaxCenterFreq(_maxCF: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_SetReferenceLevel(_refLevel: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetReferenceLevel(_refLevel: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_SetFrequencyReferenceSource(_src: FREQREF_SOURCE) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetFrequencyReferenceSource(_src: *mut FREQREF_SOURCE) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_SetAutoAttenuationEnable(_enable: bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetAutoAttenuationEnable(_enable: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_SetRFAttenuator(_value: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetRFAttenuator(_value: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_SetRFPreampEnable(_enable: bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn CONFIG_GetRFPreampEnable(_enable: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_SetTriggerMode(_mode: TriggerMode) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_GetTriggerMode(_mode: *mut TriggerMode) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_SetTriggerSource(_source: TriggerSource) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_GetTriggerSource(_source: *mut TriggerSource) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_SetTriggerTransition(_transition: TriggerTransition) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_GetTriggerTransition(_transition: *mut TriggerTransition) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_SetIFPowerTriggerLevel(_level: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_GetIFPowerTriggerLevel(_level: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_SetTriggerPositionPercent(_trigPosPercent: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_GetTriggerPositionPercent(_trigPosPercent: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn TRIG_ForceTrigger() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_SetEnable(_enable: bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_SetDefault() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_GetLimits(_limits: *mut SPECTRUM_LIMITS) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_SetSettings(_settings: SPECTRUM_SETTINGS) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_GetSettings(_settings: *mut SPECTRUM_SETTINGS) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_SetTraceType(_trace: SpectrumTraces, _enable: bool, _detector: SpectrumDetectors) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_AcquireTrace() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_WaitForTraceReady(_timeoutMsec: c_int, _ready: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_GetTrace(_trace: SpectrumTraces, _maxTracePoints: c_int, _traceData: *mut f32, _outTracePoints: *mut c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn SPECTRUM_GetTraceInfo(_traceInfo: *mut Spectrum_TraceInfo) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_SetIQBandwidth(_iqBandwidth: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetIQBandwidth(_iqBandwidth: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetMinIQBandwidth(_minBandwidth: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetMaxIQBandwidth(_maxBandwidth: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_SetIQRecordLength(_recordLength: c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetIQRecordLength(_recordLength: *mut c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetMaxIQRecordLength(_maxSamples: *mut c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetIQSampleRate(_iqSampleRate: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_AcquireIQData() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_WaitForIQDataReady(_timeoutMsec: c_int, _ready: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetIQDataDeinterleaved(_iData: *mut f32, _qData: *mut f32, _outLength: *mut c_int, _reqLength: c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQBLK_GetIQAcqInfo(_acqInfo: *mut IQBLK_ACQINFO) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_GetMaxAcqBandwidth(_maxBandwidthHz: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_GetMinAcqBandwidth(_minBandwidthHz: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_SetAcqBandwidth(_bwHz_req: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_GetAcqParameters(_bwHz_act: *mut f64, _srSps: *mut f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_SetOutputConfiguration(_dest: IQSOUTDEST, _dtype: IQSOUTDTYPE) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_SetDiskFilenameBase(_filenameBase: *const c_char) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_SetDiskFilenameSuffix(_suffixCtl: c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_SetDiskFileLength(_msec: c_int) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_ClearAcqStatus() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_Start() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_Stop() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_GetDiskFileWriteStatus(_isComplete: *mut bool, _isWriting: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn IQSTREAM_GetDiskFileInfo(_fileinfo: *mut IQSTREAM_File_Info) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn REFTIME_SetReferenceTime(_refTimeSec: time_t, _refTimeNsec: u64, _refTimestamp: u64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn REFTIME_GetReferenceTimeSource(_source: *mut REFTIME_SRC) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn REFTIME_GetCurrentTime(_o_timeSec: *mut time_t, _o_timeNsec: *mut u64, _o_timestamp: *mut u64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn REFTIME_GetTimeFromTimestamp(_i_timestamp: u64, _o_timeSec: *mut time_t, _o_timeNsec: *mut u64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn REFTIME_GetTimestampRate(_o_refTimestampRate: *mut u64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_SetEnable(_enable: bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_SetParameters(_fspan: f64, _rbw: f64, _bitmapWidth: i32, _tracePtsPerPixel: i32, _yUnit: VerticalUnitType, _yTop: f64, _yBottom: f64, _infinitePersistence: bool, _persistenceTimeSec: f64, _showOnlyTrigFrame: bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_Configure(_enableSpectrum: bool, _enableSpectrogram: bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_GetSettings(_pDPXSettings: *mut DPX_SettingsStruct) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPXSOGRAM_SetParameters(_timePerBitmapLine: f64, _timeResolution: f64, _maxPower: f64, _minPower: f64) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPXSOGRAM_GetSettings(_sSettings: *mut DPX_SogramSettingsStruct) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_Reset() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_WaitForDataReady(_timeoutMsec: c_int, _isReady: *mut bool) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_GetFrameBuffer(_frameBuffer: *mut DPX_FrameBuffer) -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}

#[no_mangle]
pub unsafe extern "C" fn DPX_FinishFrameBuffer() -> ReturnStatus {
    panic!("{}", RSA_SDK_PANIC_MSG);
}
"#;

    std::fs::write(out_path.join("bindings.rs"), dummy).expect("Couldn't write dummy bindings!");
}
