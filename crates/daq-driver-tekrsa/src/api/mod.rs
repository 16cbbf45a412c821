//! Native Call Adapter.
//!
//! Every RSA_API function is reached through the [`RsaApi`] trait. Each trait
//! method marshals typed arguments into the native layout, invokes exactly one
//! native function and returns a [`Reply`]: the decoded status code plus the
//! decoded outputs. Outputs are only decoded when the status is not a failure,
//! so a failed call never exposes uninitialized output parameters.
//!
//! Two implementations exist:
//! - [`NativeRsa`] calls the vendor library through `rsa-api-sys`
//! - [`SimulatedRsa`] models an instrument in-process for tests and mock setups
//!
//! Raw pointers never leave this module; all buffers are owned Rust values.

mod native;
mod sim;

pub use native::NativeRsa;
pub use sim::{SimControl, SimDevice, SimulatedRsa};

use std::fmt;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};

use crate::status::{ReturnStatus, Severity};
use crate::types::{
    DeviceEvent, FrequencyReference, ReferenceTimeSource, SpectrumDetector, SpectrumTrace,
    SpectrumWindow, StreamDataType, StreamDestination, TriggerMode, TriggerSource,
    TriggerTransition, VerticalUnit,
};

macro_rules! native_calls {
    ($($variant:ident = $name:literal,)+) => {
        /// Identifies the native function behind a [`Reply`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum NativeCall {
            $($variant,)+
        }

        impl NativeCall {
            /// C symbol name of the native function.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

native_calls! {
    DeviceSearch = "DEVICE_Search",
    DeviceConnect = "DEVICE_Connect",
    DeviceDisconnect = "DEVICE_Disconnect",
    DeviceReset = "DEVICE_Reset",
    DeviceGetInfo = "DEVICE_GetInfo",
    DeviceRun = "DEVICE_Run",
    DeviceStop = "DEVICE_Stop",
    DeviceGetEnable = "DEVICE_GetEnable",
    DeviceGetOverTemperatureStatus = "DEVICE_GetOverTemperatureStatus",
    DeviceGetEventStatus = "DEVICE_GetEventStatus",
    AlignGetWarmupStatus = "ALIGN_GetWarmupStatus",
    AlignGetAlignmentNeeded = "ALIGN_GetAlignmentNeeded",
    AlignRunAlignment = "ALIGN_RunAlignment",
    ConfigPreset = "CONFIG_Preset",
    ConfigSetCenterFreq = "CONFIG_SetCenterFreq",
    ConfigGetCenterFreq = "CONFIG_GetCenterFreq",
    ConfigGetMinCenterFreq = "CONFIG_GetMinCenterFreq",
    ConfigGetMaxCenterFreq = "CONFIG_GetMaxCenterFreq",
    ConfigSetReferenceLevel = "CONFIG_SetReferenceLevel",
    ConfigGetReferenceLevel = "CONFIG_GetReferenceLevel",
    ConfigSetFrequencyReferenceSource = "CONFIG_SetFrequencyReferenceSource",
    ConfigGetFrequencyReferenceSource = "CONFIG_GetFrequencyReferenceSource",
    ConfigSetAutoAttenuationEnable = "CONFIG_SetAutoAttenuationEnable",
    ConfigGetAutoAttenuationEnable = "CONFIG_GetAutoAttenuationEnable",
    ConfigSetRFAttenuator = "CONFIG_SetRFAttenuator",
    ConfigGetRFAttenuator = "CONFIG_GetRFAttenuator",
    ConfigSetRFPreampEnable = "CONFIG_SetRFPreampEnable",
    ConfigGetRFPreampEnable = "CONFIG_GetRFPreampEnable",
    TrigSetTriggerMode = "TRIG_SetTriggerMode",
    TrigGetTriggerMode = "TRIG_GetTriggerMode",
    TrigSetTriggerSource = "TRIG_SetTriggerSource",
    TrigGetTriggerSource = "TRIG_GetTriggerSource",
    TrigSetTriggerTransition = "TRIG_SetTriggerTransition",
    TrigGetTriggerTransition = "TRIG_GetTriggerTransition",
    TrigSetIFPowerTriggerLevel = "TRIG_SetIFPowerTriggerLevel",
    TrigGetIFPowerTriggerLevel = "TRIG_GetIFPowerTriggerLevel",
    TrigSetTriggerPositionPercent = "TRIG_SetTriggerPositionPercent",
    TrigGetTriggerPositionPercent = "TRIG_GetTriggerPositionPercent",
    TrigForceTrigger = "TRIG_ForceTrigger",
    SpectrumSetEnable = "SPECTRUM_SetEnable",
    SpectrumSetDefault = "SPECTRUM_SetDefault",
    SpectrumGetLimits = "SPECTRUM_GetLimits",
    SpectrumSetSettings = "SPECTRUM_SetSettings",
    SpectrumGetSettings = "SPECTRUM_GetSettings",
    SpectrumSetTraceType = "SPECTRUM_SetTraceType",
    SpectrumAcquireTrace = "SPECTRUM_AcquireTrace",
    SpectrumWaitForTraceReady = "SPECTRUM_WaitForTraceReady",
    SpectrumGetTrace = "SPECTRUM_GetTrace",
    SpectrumGetTraceInfo = "SPECTRUM_GetTraceInfo",
    IqblkSetIQBandwidth = "IQBLK_SetIQBandwidth",
    IqblkGetIQBandwidth = "IQBLK_GetIQBandwidth",
    IqblkGetMinIQBandwidth = "IQBLK_GetMinIQBandwidth",
    IqblkGetMaxIQBandwidth = "IQBLK_GetMaxIQBandwidth",
    IqblkSetIQRecordLength = "IQBLK_SetIQRecordLength",
    IqblkGetIQRecordLength = "IQBLK_GetIQRecordLength",
    IqblkGetMaxIQRecordLength = "IQBLK_GetMaxIQRecordLength",
    IqblkGetIQSampleRate = "IQBLK_GetIQSampleRate",
    IqblkAcquireIQData = "IQBLK_AcquireIQData",
    IqblkWaitForIQDataReady = "IQBLK_WaitForIQDataReady",
    IqblkGetIQDataDeinterleaved = "IQBLK_GetIQDataDeinterleaved",
    IqblkGetIQAcqInfo = "IQBLK_GetIQAcqInfo",
    DpxSetEnable = "DPX_SetEnable",
    DpxSetParameters = "DPX_SetParameters",
    DpxConfigure = "DPX_Configure",
    DpxGetSettings = "DPX_GetSettings",
    DpxSogramSetParameters = "DPXSOGRAM_SetParameters",
    DpxSogramGetSettings = "DPXSOGRAM_GetSettings",
    DpxReset = "DPX_Reset",
    DpxWaitForDataReady = "DPX_WaitForDataReady",
    DpxGetFrameBuffer = "DPX_GetFrameBuffer",
    DpxFinishFrameBuffer = "DPX_FinishFrameBuffer",
    IqstreamGetMinAcqBandwidth = "IQSTREAM_GetMinAcqBandwidth",
    IqstreamGetMaxAcqBandwidth = "IQSTREAM_GetMaxAcqBandwidth",
    IqstreamSetAcqBandwidth = "IQSTREAM_SetAcqBandwidth",
    IqstreamGetAcqParameters = "IQSTREAM_GetAcqParameters",
    IqstreamSetOutputConfiguration = "IQSTREAM_SetOutputConfiguration",
    IqstreamSetDiskFilenameBase = "IQSTREAM_SetDiskFilenameBase",
    IqstreamSetDiskFilenameSuffix = "IQSTREAM_SetDiskFilenameSuffix",
    IqstreamSetDiskFileLength = "IQSTREAM_SetDiskFileLength",
    IqstreamClearAcqStatus = "IQSTREAM_ClearAcqStatus",
    IqstreamStart = "IQSTREAM_Start",
    IqstreamStop = "IQSTREAM_Stop",
    IqstreamGetDiskFileWriteStatus = "IQSTREAM_GetDiskFileWriteStatus",
    IqstreamGetDiskFileInfo = "IQSTREAM_GetDiskFileInfo",
    ReftimeSetReferenceTime = "REFTIME_SetReferenceTime",
    ReftimeGetReferenceTimeSource = "REFTIME_GetReferenceTimeSource",
    ReftimeGetCurrentTime = "REFTIME_GetCurrentTime",
    ReftimeGetTimeFromTimestamp = "REFTIME_GetTimeFromTimestamp",
    ReftimeGetTimestampRate = "REFTIME_GetTimestampRate",
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one native call: status plus decoded outputs.
///
/// The value is present only when the status is success or warning class.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Reply<T> {
    call: NativeCall,
    status: ReturnStatus,
    value: Option<T>,
}

impl<T> Reply<T> {
    /// Build a reply from a raw status code, decoding outputs only when the
    /// call did not fail.
    pub fn decode(call: NativeCall, raw: i32, decode: impl FnOnce() -> T) -> Self {
        let status = ReturnStatus::from_raw(raw);
        let value = match status.severity() {
            Severity::Failure => None,
            Severity::Success | Severity::Warning => Some(decode()),
        };
        Self {
            call,
            status,
            value,
        }
    }

    /// Build a reply from an already typed status and value.
    pub fn new(call: NativeCall, status: ReturnStatus, value: T) -> Self {
        Self::decode(call, status.to_raw(), || value)
    }

    /// Successful reply.
    pub fn ok(call: NativeCall, value: T) -> Self {
        Self::new(call, ReturnStatus::NoError, value)
    }

    /// Failed reply with no outputs.
    pub fn failed(call: NativeCall, status: ReturnStatus) -> Self {
        Self {
            call,
            status,
            value: None,
        }
    }

    /// Native function that produced this reply.
    pub fn call(&self) -> NativeCall {
        self.call
    }

    /// Status code returned by the native function.
    pub fn status(&self) -> ReturnStatus {
        self.status
    }

    /// Split into call tag, status and value.
    pub fn into_parts(self) -> (NativeCall, ReturnStatus, Option<T>) {
        (self.call, self.status, self.value)
    }
}

/// One entry of a `DEVICE_Search` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundDevice {
    /// Device ID to pass to `DEVICE_Connect`
    pub id: i32,
    /// Serial number string
    pub serial: String,
    /// Device type string, e.g. "RSA306B"
    pub device_type: String,
}

/// Decoded `DEVICE_INFO`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeDeviceInfo {
    pub nomenclature: String,
    pub serial_number: String,
    pub api_version: String,
    pub fw_version: String,
    pub fpga_version: String,
    pub hw_version: String,
}

/// Decoded `SPECTRUM_LIMITS`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectrumLimits {
    pub max_span: f64,
    pub min_span: f64,
    pub max_rbw: f64,
    pub min_rbw: f64,
    pub max_vbw: f64,
    pub min_vbw: f64,
    pub max_trace_length: i32,
    pub min_trace_length: i32,
}

/// Request half of `SPECTRUM_SETTINGS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumSettings {
    pub span: f64,
    pub rbw: f64,
    pub enable_vbw: bool,
    pub vbw: f64,
    pub trace_length: i32,
    pub window: SpectrumWindow,
    pub vertical_unit: VerticalUnit,
}

/// Full `SPECTRUM_SETTINGS` as reported back by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumSettingsReport {
    pub settings: SpectrumSettings,
    pub actual_start_freq: f64,
    pub actual_stop_freq: f64,
    pub actual_freq_step: f64,
    pub actual_rbw: f64,
    pub actual_vbw: f64,
    pub actual_num_iq_samples: i32,
}

/// Decoded `Spectrum_TraceInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceInfo {
    pub timestamp: i64,
    pub acq_data_status: u16,
}

/// Deinterleaved IQ samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IqData {
    pub i: Vec<f32>,
    pub q: Vec<f32>,
}

/// Decoded `IQBLK_ACQINFO`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IqAcqInfo {
    pub sample0_timestamp: u64,
    pub trigger_sample_index: u64,
    pub trigger_timestamp: u64,
    pub acq_status: u32,
}

/// Arguments of `DPX_SetParameters`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpxParameters {
    pub span: f64,
    pub rbw: f64,
    pub bitmap_width: i32,
    pub trace_points_per_pixel: i32,
    pub y_top: f64,
    pub y_bottom: f64,
    pub infinite_persistence: bool,
    pub persistence_time_s: f64,
    pub show_only_triggered: bool,
}

/// Decoded `DPX_SettingsStruct`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DpxSettings {
    pub enable_spectrum: bool,
    pub enable_spectrogram: bool,
    pub bitmap_width: i32,
    pub bitmap_height: i32,
    pub trace_length: i32,
    pub decay_factor: f32,
    pub actual_rbw: f64,
}

/// Arguments of `DPXSOGRAM_SetParameters`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SogramParameters {
    pub time_per_bitmap_line: f64,
    pub time_resolution: f64,
    pub max_power: f64,
    pub min_power: f64,
}

/// Decoded `DPX_SogramSettingsStruct`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SogramSettings {
    pub bitmap_width: i32,
    pub bitmap_height: i32,
    pub trace_line_time: f64,
    pub bitmap_line_time: f64,
}

/// Spectrogram part of a `DPX_FrameBuffer`, copied out of driver memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DpxFrame {
    pub fft_per_sec: i32,
    pub fft_count: i64,
    pub frame_count: i64,
    pub timestamp: f64,
    pub acq_data_status: u32,
    pub sogram_width: i32,
    pub sogram_height: i32,
    pub sogram_size: i32,
    pub valid_lines: i32,
    pub bitmap: Vec<u8>,
    pub line_timestamps: Vec<f64>,
    pub line_triggered: Vec<bool>,
}

/// Decoded `DEVICE_GetEventStatus` outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStatus {
    /// Whether the event occurred since the last query
    pub occurred: bool,
    /// Sample timestamp of the event, valid when `occurred`
    pub timestamp: u64,
}

/// Decoded `IQSTREAM_GetDiskFileWriteStatus` outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamWriteStatus {
    /// The requested file length has been written
    pub complete: bool,
    /// Data is currently being written
    pub writing: bool,
}

/// Decoded `IQSTREAM_File_Info` (file names are not copied out).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamFileInfo {
    pub number_samples: u64,
    pub sample0_timestamp: u64,
    pub trigger_sample_index: u64,
    pub trigger_timestamp: u64,
    /// `IQSTRM_STATUS_*` bits, sticky bits shifted by 16
    pub acq_status: u32,
}

/// A wall-clock instant paired with the instrument timestamp counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimePoint {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Nanoseconds within the second
    pub nanos: u64,
    /// Timestamp counter value at that instant
    pub timestamp: u64,
}

impl TimePoint {
    /// Pair a wall-clock instant with a timestamp counter value.
    pub fn at(time: DateTime<Utc>, timestamp: u64) -> Self {
        Self {
            seconds: time.timestamp(),
            nanos: u64::from(time.timestamp_subsec_nanos()),
            timestamp,
        }
    }

    /// Wall-clock instant, `None` when out of range.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        Utc.timestamp_opt(self.seconds, nanos).single()
    }
}

/// Typed calling surface over the RSA_API functions.
///
/// One method per native function; every method performs exactly one native
/// call. Implementations must zero-initialize outputs and decode them only
/// when the status is not a failure (see [`Reply::decode`]).
#[allow(missing_docs)]
pub trait RsaApi: Send {
    // Device
    fn search(&mut self) -> Reply<Vec<FoundDevice>>;
    fn connect(&mut self, device_id: i32) -> Reply<()>;
    fn disconnect(&mut self) -> Reply<()>;
    fn reset(&mut self, device_id: i32) -> Reply<()>;
    fn device_info(&mut self) -> Reply<NativeDeviceInfo>;
    fn run(&mut self) -> Reply<()>;
    fn stop(&mut self) -> Reply<()>;
    fn is_running(&mut self) -> Reply<bool>;
    fn over_temperature(&mut self) -> Reply<bool>;
    fn event_status(&mut self, event: DeviceEvent) -> Reply<EventStatus>;

    // Alignment
    fn warmup_complete(&mut self) -> Reply<bool>;
    fn alignment_needed(&mut self) -> Reply<bool>;
    fn run_alignment(&mut self) -> Reply<()>;

    // Configuration
    fn preset(&mut self) -> Reply<()>;
    fn set_center_freq(&mut self, hz: f64) -> Reply<()>;
    fn center_freq(&mut self) -> Reply<f64>;
    fn min_center_freq(&mut self) -> Reply<f64>;
    fn max_center_freq(&mut self) -> Reply<f64>;
    fn set_reference_level(&mut self, dbm: f64) -> Reply<()>;
    fn reference_level(&mut self) -> Reply<f64>;
    fn set_frequency_reference(&mut self, source: FrequencyReference) -> Reply<()>;
    fn frequency_reference(&mut self) -> Reply<FrequencyReference>;
    fn set_auto_attenuation(&mut self, enable: bool) -> Reply<()>;
    fn auto_attenuation(&mut self) -> Reply<bool>;
    fn set_rf_attenuator(&mut self, db: f64) -> Reply<()>;
    fn rf_attenuator(&mut self) -> Reply<f64>;
    fn set_rf_preamp(&mut self, enable: bool) -> Reply<()>;
    fn rf_preamp(&mut self) -> Reply<bool>;

    // Trigger
    fn set_trigger_mode(&mut self, mode: TriggerMode) -> Reply<()>;
    fn trigger_mode(&mut self) -> Reply<TriggerMode>;
    fn set_trigger_source(&mut self, source: TriggerSource) -> Reply<()>;
    fn trigger_source(&mut self) -> Reply<TriggerSource>;
    fn set_trigger_transition(&mut self, transition: TriggerTransition) -> Reply<()>;
    fn trigger_transition(&mut self) -> Reply<TriggerTransition>;
    fn set_if_power_trigger_level(&mut self, dbm: f64) -> Reply<()>;
    fn if_power_trigger_level(&mut self) -> Reply<f64>;
    fn set_trigger_position_percent(&mut self, percent: f64) -> Reply<()>;
    fn trigger_position_percent(&mut self) -> Reply<f64>;
    fn force_trigger(&mut self) -> Reply<()>;

    // Spectrum
    fn spectrum_set_enable(&mut self, enable: bool) -> Reply<()>;
    fn spectrum_set_default(&mut self) -> Reply<()>;
    fn spectrum_limits(&mut self) -> Reply<SpectrumLimits>;
    fn spectrum_set_settings(&mut self, settings: &SpectrumSettings) -> Reply<()>;
    fn spectrum_settings(&mut self) -> Reply<SpectrumSettingsReport>;
    fn spectrum_set_trace_type(
        &mut self,
        trace: SpectrumTrace,
        enable: bool,
        detector: SpectrumDetector,
    ) -> Reply<()>;
    fn spectrum_acquire_trace(&mut self) -> Reply<()>;
    fn spectrum_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool>;
    fn spectrum_trace(&mut self, trace: SpectrumTrace, max_points: i32) -> Reply<Vec<f32>>;
    fn spectrum_trace_info(&mut self) -> Reply<TraceInfo>;

    // IQ block
    fn iq_set_bandwidth(&mut self, hz: f64) -> Reply<()>;
    fn iq_bandwidth(&mut self) -> Reply<f64>;
    fn iq_min_bandwidth(&mut self) -> Reply<f64>;
    fn iq_max_bandwidth(&mut self) -> Reply<f64>;
    fn iq_set_record_length(&mut self, samples: i32) -> Reply<()>;
    fn iq_record_length(&mut self) -> Reply<i32>;
    fn iq_max_record_length(&mut self) -> Reply<i32>;
    fn iq_sample_rate(&mut self) -> Reply<f64>;
    fn iq_acquire(&mut self) -> Reply<()>;
    fn iq_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool>;
    fn iq_data_deinterleaved(&mut self, samples: i32) -> Reply<IqData>;
    fn iq_acq_info(&mut self) -> Reply<IqAcqInfo>;

    // DPX
    fn dpx_set_enable(&mut self, enable: bool) -> Reply<()>;
    fn dpx_set_parameters(&mut self, params: &DpxParameters) -> Reply<()>;
    fn dpx_configure(&mut self, spectrum: bool, spectrogram: bool) -> Reply<()>;
    fn dpx_settings(&mut self) -> Reply<DpxSettings>;
    fn sogram_set_parameters(&mut self, params: &SogramParameters) -> Reply<()>;
    fn sogram_settings(&mut self) -> Reply<SogramSettings>;
    fn dpx_reset(&mut self) -> Reply<()>;
    fn dpx_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool>;
    fn dpx_frame_buffer(&mut self) -> Reply<DpxFrame>;
    fn dpx_finish_frame_buffer(&mut self) -> Reply<()>;

    // IQ streaming
    fn stream_min_bandwidth(&mut self) -> Reply<f64>;
    fn stream_max_bandwidth(&mut self) -> Reply<f64>;
    fn stream_set_bandwidth(&mut self, hz: f64) -> Reply<()>;
    /// Actual `(bandwidth, sample_rate)` for the requested bandwidth.
    fn stream_acq_parameters(&mut self) -> Reply<(f64, f64)>;
    fn stream_set_output(&mut self, dest: StreamDestination, dtype: StreamDataType) -> Reply<()>;
    fn stream_set_filename_base(&mut self, base: &Path) -> Reply<()>;
    fn stream_set_filename_suffix(&mut self, suffix: i32) -> Reply<()>;
    fn stream_set_file_length(&mut self, ms: i32) -> Reply<()>;
    fn stream_clear_status(&mut self) -> Reply<()>;
    fn stream_start(&mut self) -> Reply<()>;
    fn stream_stop(&mut self) -> Reply<()>;
    fn stream_write_status(&mut self) -> Reply<StreamWriteStatus>;
    fn stream_file_info(&mut self) -> Reply<StreamFileInfo>;

    // Reference time
    fn set_reference_time(&mut self, point: TimePoint) -> Reply<()>;
    fn reference_time_source(&mut self) -> Reply<ReferenceTimeSource>;
    fn current_time(&mut self) -> Reply<TimePoint>;
    /// Wall-clock time of a timestamp; the reply's `timestamp` echoes the input.
    fn time_from_timestamp(&mut self, timestamp: u64) -> Reply<TimePoint>;
    fn timestamp_rate(&mut self) -> Reply<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_names_are_c_symbols() {
        assert_eq!(NativeCall::DeviceConnect.name(), "DEVICE_Connect");
        assert_eq!(NativeCall::IqblkGetIQDataDeinterleaved.name(), "IQBLK_GetIQDataDeinterleaved");
        assert_eq!(NativeCall::DpxSogramSetParameters.to_string(), "DPXSOGRAM_SetParameters");
        assert_eq!(NativeCall::IqstreamGetDiskFileWriteStatus.name(), "IQSTREAM_GetDiskFileWriteStatus");
        assert_eq!(NativeCall::ReftimeGetTimeFromTimestamp.name(), "REFTIME_GetTimeFromTimestamp");
    }

    #[test]
    fn test_time_point_utc() {
        let point = TimePoint {
            seconds: 1_700_000_000,
            nanos: 250_000_000,
            timestamp: 42,
        };
        let utc = point.to_utc().unwrap();
        assert_eq!(utc.timestamp_subsec_millis(), 250);
        assert_eq!(TimePoint::at(utc, 42), point);
        let bad = TimePoint {
            nanos: 3_000_000_000,
            ..point
        };
        assert!(bad.to_utc().is_none());
    }

    #[test]
    fn test_failed_reply_never_decodes() {
        let mut decoded = false;
        let reply = Reply::decode(NativeCall::ConfigGetCenterFreq, 3101, || {
            decoded = true;
            0.0
        });
        assert!(!decoded);
        let (_, status, value) = reply.into_parts();
        assert_eq!(status, ReturnStatus::DisconnectedDeviceRemoved);
        assert!(value.is_none());
    }

    #[test]
    fn test_warning_reply_keeps_value() {
        let reply = Reply::decode(NativeCall::SpectrumGetTrace, 9000, || vec![1.0_f32; 4]);
        assert_eq!(reply.status(), ReturnStatus::ADCOverrange);
        assert_eq!(reply.into_parts().2.map(|v| v.len()), Some(4));
    }
}
