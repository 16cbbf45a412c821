//! [`RsaApi`] over the vendor library.
//!
//! `libRSA_API` keeps all device state in process-global storage, so at most
//! one [`NativeRsa`] may exist at a time. [`NativeRsa::acquire`] enforces that
//! with a process-wide flag that is released on drop.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use rsa_api_sys as sys;
use tracing::debug;

use super::{
    DpxFrame, DpxParameters, DpxSettings, EventStatus, FoundDevice, IqAcqInfo, IqData,
    NativeCall, NativeDeviceInfo, Reply, RsaApi, SogramParameters, SogramSettings,
    SpectrumLimits, SpectrumSettings, SpectrumSettingsReport, StreamFileInfo, StreamWriteStatus,
    TimePoint, TraceInfo,
};
use crate::error::{ConnectionFault, Result, TekRsaError};
use crate::status::{ReturnStatus, Severity};
use crate::types::{
    DeviceEvent, FrequencyReference, ReferenceTimeSource, SpectrumDetector, SpectrumTrace,
    SpectrumWindow, StreamDataType, StreamDestination, TriggerMode, TriggerSource,
    TriggerTransition, VerticalUnit,
};

static LIBRARY_IN_USE: AtomicBool = AtomicBool::new(false);

const MAX_DEVICES: usize = sys::DEVSRCH_MAX_NUM_DEVICES as usize;
const SERIAL_LEN: usize = sys::DEVSRCH_SERIAL_MAX_STRLEN as usize;
const TYPE_LEN: usize = sys::DEVSRCH_TYPE_MAX_STRLEN as usize;

/// Exclusive handle on the process-global RSA_API library.
#[derive(Debug)]
pub struct NativeRsa {
    _private: (),
}

impl NativeRsa {
    /// Claim the library for this process.
    ///
    /// Fails with `Connection/DeviceBusy` while another `NativeRsa` is alive.
    pub fn acquire() -> Result<Self> {
        if LIBRARY_IN_USE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TekRsaError::connection(
                ConnectionFault::DeviceBusy,
                "RSA_API is already owned by another session in this process",
            ));
        }
        debug!("Claimed RSA_API library");
        Ok(Self { _private: () })
    }
}

impl Drop for NativeRsa {
    fn drop(&mut self) {
        LIBRARY_IN_USE.store(false, Ordering::Release);
        debug!("Released RSA_API library");
    }
}

/// Decode a fixed-size, NUL-terminated C string buffer.
fn decode_c_chars(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

/// Non-negative native length as `usize`.
fn native_len(len: i32) -> usize {
    usize::try_from(len).unwrap_or(0)
}

/// Copy `len` elements out of driver-owned memory.
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `len` elements.
unsafe fn copy_driver_buffer<T: Copy>(ptr: *const T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr, len).to_vec()
}

/// Reply for a getter returning a native enum value.
///
/// A value outside the documented encoding is reported as `errorPlaceholder`,
/// which the checker classifies as a driver fault.
fn enum_reply<T>(call: NativeCall, raw_status: i32, raw: u32, map: fn(u32) -> Option<T>) -> Reply<T> {
    let status = ReturnStatus::from_raw(raw_status);
    if status.severity() == Severity::Failure {
        return Reply::failed(call, status);
    }
    match map(raw) {
        Some(value) => Reply::new(call, status, value),
        None => Reply::failed(call, ReturnStatus::Placeholder),
    }
}

macro_rules! unit_call {
    ($call:ident, $f:ident($($arg:expr),*)) => {{
        // SAFETY: the function takes only by-value arguments.
        let rs = unsafe { sys::$f($($arg),*) };
        Reply::decode(NativeCall::$call, rs as i32, || ())
    }};
}

macro_rules! out_call {
    ($call:ident, $f:ident($($arg:expr,)*) -> $ty:ty) => {{
        let mut out: $ty = Default::default();
        // SAFETY: `out` is a valid, initialized location for the single output.
        let rs = unsafe { sys::$f($($arg,)* &mut out) };
        Reply::decode(NativeCall::$call, rs as i32, || out)
    }};
}

impl RsaApi for NativeRsa {
    fn search(&mut self) -> Reply<Vec<FoundDevice>> {
        let mut found: c_int = 0;
        let mut ids = [0 as c_int; MAX_DEVICES];
        let mut serials = [[0 as c_char; SERIAL_LEN]; MAX_DEVICES];
        let mut types = [[0 as c_char; TYPE_LEN]; MAX_DEVICES];
        // SAFETY: buffers have the dimensions declared by the DEVSRCH_* constants.
        let rs = unsafe {
            sys::DEVICE_Search(
                &mut found,
                ids.as_mut_ptr(),
                serials.as_mut_ptr(),
                types.as_mut_ptr(),
            )
        };
        Reply::decode(NativeCall::DeviceSearch, rs as i32, || {
            let count = native_len(found).min(MAX_DEVICES);
            (0..count)
                .map(|n| FoundDevice {
                    id: ids[n],
                    serial: decode_c_chars(&serials[n]),
                    device_type: decode_c_chars(&types[n]),
                })
                .collect()
        })
    }

    fn connect(&mut self, device_id: i32) -> Reply<()> {
        unit_call!(DeviceConnect, DEVICE_Connect(device_id))
    }

    fn disconnect(&mut self) -> Reply<()> {
        unit_call!(DeviceDisconnect, DEVICE_Disconnect())
    }

    fn reset(&mut self, device_id: i32) -> Reply<()> {
        unit_call!(DeviceReset, DEVICE_Reset(device_id))
    }

    fn device_info(&mut self) -> Reply<NativeDeviceInfo> {
        let mut info = sys::DEVICE_INFO::default();
        // SAFETY: `info` is a zeroed DEVICE_INFO with the header's layout.
        let rs = unsafe { sys::DEVICE_GetInfo(&mut info) };
        Reply::decode(NativeCall::DeviceGetInfo, rs as i32, || NativeDeviceInfo {
            nomenclature: decode_c_chars(&info.nomenclature),
            serial_number: decode_c_chars(&info.serialNum),
            api_version: decode_c_chars(&info.apiVersion),
            fw_version: decode_c_chars(&info.fwVersion),
            fpga_version: decode_c_chars(&info.fpgaVersion),
            hw_version: decode_c_chars(&info.hwVersion),
        })
    }

    fn run(&mut self) -> Reply<()> {
        unit_call!(DeviceRun, DEVICE_Run())
    }

    fn stop(&mut self) -> Reply<()> {
        unit_call!(DeviceStop, DEVICE_Stop())
    }

    fn is_running(&mut self) -> Reply<bool> {
        out_call!(DeviceGetEnable, DEVICE_GetEnable() -> bool)
    }

    fn over_temperature(&mut self) -> Reply<bool> {
        out_call!(DeviceGetOverTemperatureStatus, DEVICE_GetOverTemperatureStatus() -> bool)
    }

    fn event_status(&mut self, event: DeviceEvent) -> Reply<EventStatus> {
        let mut occurred = false;
        let mut timestamp: u64 = 0;
        // SAFETY: both outputs point to initialized locals.
        let rs = unsafe { sys::DEVICE_GetEventStatus(event.to_raw(), &mut occurred, &mut timestamp) };
        Reply::decode(NativeCall::DeviceGetEventStatus, rs as i32, || EventStatus {
            occurred,
            timestamp,
        })
    }

    fn warmup_complete(&mut self) -> Reply<bool> {
        out_call!(AlignGetWarmupStatus, ALIGN_GetWarmupStatus() -> bool)
    }

    fn alignment_needed(&mut self) -> Reply<bool> {
        out_call!(AlignGetAlignmentNeeded, ALIGN_GetAlignmentNeeded() -> bool)
    }

    fn run_alignment(&mut self) -> Reply<()> {
        unit_call!(AlignRunAlignment, ALIGN_RunAlignment())
    }

    fn preset(&mut self) -> Reply<()> {
        unit_call!(ConfigPreset, CONFIG_Preset())
    }

    fn set_center_freq(&mut self, hz: f64) -> Reply<()> {
        unit_call!(ConfigSetCenterFreq, CONFIG_SetCenterFreq(hz))
    }

    fn center_freq(&mut self) -> Reply<f64> {
        out_call!(ConfigGetCenterFreq, CONFIG_GetCenterFreq() -> f64)
    }

    fn min_center_freq(&mut self) -> Reply<f64> {
        out_call!(ConfigGetMinCenterFreq, CONFIG_GetMinCenterFreq() -> f64)
    }

    fn max_center_freq(&mut self) -> Reply<f64> {
        out_call!(ConfigGetMaxCenterFreq, CONFIG_GetMaxCenterFreq() -> f64)
    }

    fn set_reference_level(&mut self, dbm: f64) -> Reply<()> {
        unit_call!(ConfigSetReferenceLevel, CONFIG_SetReferenceLevel(dbm))
    }

    fn reference_level(&mut self) -> Reply<f64> {
        out_call!(ConfigGetReferenceLevel, CONFIG_GetReferenceLevel() -> f64)
    }

    fn set_frequency_reference(&mut self, source: FrequencyReference) -> Reply<()> {
        unit_call!(
            ConfigSetFrequencyReferenceSource,
            CONFIG_SetFrequencyReferenceSource(source.to_raw() as sys::FREQREF_SOURCE)
        )
    }

    fn frequency_reference(&mut self) -> Reply<FrequencyReference> {
        let mut raw: sys::FREQREF_SOURCE = Default::default();
        // SAFETY: `raw` is an initialized enum-sized integer.
        let rs = unsafe { sys::CONFIG_GetFrequencyReferenceSource(&mut raw) };
        enum_reply(
            NativeCall::ConfigGetFrequencyReferenceSource,
            rs as i32,
            raw as u32,
            FrequencyReference::from_raw,
        )
    }

    fn set_auto_attenuation(&mut self, enable: bool) -> Reply<()> {
        unit_call!(ConfigSetAutoAttenuationEnable, CONFIG_SetAutoAttenuationEnable(enable))
    }

    fn auto_attenuation(&mut self) -> Reply<bool> {
        out_call!(ConfigGetAutoAttenuationEnable, CONFIG_GetAutoAttenuationEnable() -> bool)
    }

    fn set_rf_attenuator(&mut self, db: f64) -> Reply<()> {
        unit_call!(ConfigSetRFAttenuator, CONFIG_SetRFAttenuator(db))
    }

    fn rf_attenuator(&mut self) -> Reply<f64> {
        out_call!(ConfigGetRFAttenuator, CONFIG_GetRFAttenuator() -> f64)
    }

    fn set_rf_preamp(&mut self, enable: bool) -> Reply<()> {
        unit_call!(ConfigSetRFPreampEnable, CONFIG_SetRFPreampEnable(enable))
    }

    fn rf_preamp(&mut self) -> Reply<bool> {
        out_call!(ConfigGetRFPreampEnable, CONFIG_GetRFPreampEnable() -> bool)
    }

    fn set_trigger_mode(&mut self, mode: TriggerMode) -> Reply<()> {
        unit_call!(TrigSetTriggerMode, TRIG_SetTriggerMode(mode.to_raw() as sys::TriggerMode))
    }

    fn trigger_mode(&mut self) -> Reply<TriggerMode> {
        let mut raw: sys::TriggerMode = Default::default();
        // SAFETY: `raw` is an initialized enum-sized integer.
        let rs = unsafe { sys::TRIG_GetTriggerMode(&mut raw) };
        enum_reply(NativeCall::TrigGetTriggerMode, rs as i32, raw as u32, TriggerMode::from_raw)
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Reply<()> {
        unit_call!(
            TrigSetTriggerSource,
            TRIG_SetTriggerSource(source.to_raw() as sys::TriggerSource)
        )
    }

    fn trigger_source(&mut self) -> Reply<TriggerSource> {
        let mut raw: sys::TriggerSource = Default::default();
        // SAFETY: `raw` is an initialized enum-sized integer.
        let rs = unsafe { sys::TRIG_GetTriggerSource(&mut raw) };
        enum_reply(NativeCall::TrigGetTriggerSource, rs as i32, raw as u32, TriggerSource::from_raw)
    }

    fn set_trigger_transition(&mut self, transition: TriggerTransition) -> Reply<()> {
        unit_call!(
            TrigSetTriggerTransition,
            TRIG_SetTriggerTransition(transition.to_raw() as sys::TriggerTransition)
        )
    }

    fn trigger_transition(&mut self) -> Reply<TriggerTransition> {
        let mut raw: sys::TriggerTransition = Default::default();
        // SAFETY: `raw` is an initialized enum-sized integer.
        let rs = unsafe { sys::TRIG_GetTriggerTransition(&mut raw) };
        enum_reply(
            NativeCall::TrigGetTriggerTransition,
            rs as i32,
            raw as u32,
            TriggerTransition::from_raw,
        )
    }

    fn set_if_power_trigger_level(&mut self, dbm: f64) -> Reply<()> {
        unit_call!(TrigSetIFPowerTriggerLevel, TRIG_SetIFPowerTriggerLevel(dbm))
    }

    fn if_power_trigger_level(&mut self) -> Reply<f64> {
        out_call!(TrigGetIFPowerTriggerLevel, TRIG_GetIFPowerTriggerLevel() -> f64)
    }

    fn set_trigger_position_percent(&mut self, percent: f64) -> Reply<()> {
        unit_call!(TrigSetTriggerPositionPercent, TRIG_SetTriggerPositionPercent(percent))
    }

    fn trigger_position_percent(&mut self) -> Reply<f64> {
        out_call!(TrigGetTriggerPositionPercent, TRIG_GetTriggerPositionPercent() -> f64)
    }

    fn force_trigger(&mut self) -> Reply<()> {
        unit_call!(TrigForceTrigger, TRIG_ForceTrigger())
    }

    fn spectrum_set_enable(&mut self, enable: bool) -> Reply<()> {
        unit_call!(SpectrumSetEnable, SPECTRUM_SetEnable(enable))
    }

    fn spectrum_set_default(&mut self) -> Reply<()> {
        unit_call!(SpectrumSetDefault, SPECTRUM_SetDefault())
    }

    fn spectrum_limits(&mut self) -> Reply<SpectrumLimits> {
        let mut raw = sys::SPECTRUM_LIMITS::default();
        // SAFETY: `raw` is a zeroed SPECTRUM_LIMITS.
        let rs = unsafe { sys::SPECTRUM_GetLimits(&mut raw) };
        Reply::decode(NativeCall::SpectrumGetLimits, rs as i32, || SpectrumLimits {
            max_span: raw.maxSpan,
            min_span: raw.minSpan,
            max_rbw: raw.maxRBW,
            min_rbw: raw.minRBW,
            max_vbw: raw.maxVBW,
            min_vbw: raw.minVBW,
            max_trace_length: raw.maxTraceLength,
            min_trace_length: raw.minTraceLength,
        })
    }

    fn spectrum_set_settings(&mut self, settings: &SpectrumSettings) -> Reply<()> {
        let raw = sys::SPECTRUM_SETTINGS {
            span: settings.span,
            rbw: settings.rbw,
            enableVBW: settings.enable_vbw,
            vbw: settings.vbw,
            traceLength: settings.trace_length,
            window: settings.window.to_raw() as sys::SpectrumWindows,
            verticalUnit: settings.vertical_unit.to_raw() as sys::SpectrumVerticalUnits,
            ..Default::default()
        };
        unit_call!(SpectrumSetSettings, SPECTRUM_SetSettings(raw))
    }

    fn spectrum_settings(&mut self) -> Reply<SpectrumSettingsReport> {
        let mut raw = sys::SPECTRUM_SETTINGS::default();
        // SAFETY: `raw` is a zeroed SPECTRUM_SETTINGS.
        let rs = unsafe { sys::SPECTRUM_GetSettings(&mut raw) };
        let status = ReturnStatus::from_raw(rs as i32);
        if status.severity() == Severity::Failure {
            return Reply::failed(NativeCall::SpectrumGetSettings, status);
        }
        let (Some(window), Some(vertical_unit)) = (
            SpectrumWindow::from_raw(raw.window as u32),
            VerticalUnit::from_raw(raw.verticalUnit as u32),
        ) else {
            return Reply::failed(NativeCall::SpectrumGetSettings, ReturnStatus::Placeholder);
        };
        Reply::decode(NativeCall::SpectrumGetSettings, rs as i32, || SpectrumSettingsReport {
            settings: SpectrumSettings {
                span: raw.span,
                rbw: raw.rbw,
                enable_vbw: raw.enableVBW,
                vbw: raw.vbw,
                trace_length: raw.traceLength,
                window,
                vertical_unit,
            },
            actual_start_freq: raw.actualStartFreq,
            actual_stop_freq: raw.actualStopFreq,
            actual_freq_step: raw.actualFreqStepSize,
            actual_rbw: raw.actualRBW,
            actual_vbw: raw.actualVBW,
            actual_num_iq_samples: raw.actualNumIQSamples,
        })
    }

    fn spectrum_set_trace_type(
        &mut self,
        trace: SpectrumTrace,
        enable: bool,
        detector: SpectrumDetector,
    ) -> Reply<()> {
        unit_call!(
            SpectrumSetTraceType,
            SPECTRUM_SetTraceType(
                trace.to_raw() as sys::SpectrumTraces,
                enable,
                detector.to_raw() as sys::SpectrumDetectors
            )
        )
    }

    fn spectrum_acquire_trace(&mut self) -> Reply<()> {
        unit_call!(SpectrumAcquireTrace, SPECTRUM_AcquireTrace())
    }

    fn spectrum_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool> {
        out_call!(SpectrumWaitForTraceReady, SPECTRUM_WaitForTraceReady(timeout_ms,) -> bool)
    }

    fn spectrum_trace(&mut self, trace: SpectrumTrace, max_points: i32) -> Reply<Vec<f32>> {
        let mut data = vec![0.0_f32; native_len(max_points)];
        let mut out_points: c_int = 0;
        // SAFETY: `data` holds `max_points` floats; the driver writes at most that many.
        let rs = unsafe {
            sys::SPECTRUM_GetTrace(
                trace.to_raw() as sys::SpectrumTraces,
                max_points,
                data.as_mut_ptr(),
                &mut out_points,
            )
        };
        Reply::decode(NativeCall::SpectrumGetTrace, rs as i32, || {
            data.truncate(native_len(out_points));
            data
        })
    }

    fn spectrum_trace_info(&mut self) -> Reply<TraceInfo> {
        let mut raw = sys::Spectrum_TraceInfo::default();
        // SAFETY: `raw` is a zeroed Spectrum_TraceInfo.
        let rs = unsafe { sys::SPECTRUM_GetTraceInfo(&mut raw) };
        Reply::decode(NativeCall::SpectrumGetTraceInfo, rs as i32, || TraceInfo {
            timestamp: raw.timestamp,
            acq_data_status: raw.acqDataStatus,
        })
    }

    fn iq_set_bandwidth(&mut self, hz: f64) -> Reply<()> {
        unit_call!(IqblkSetIQBandwidth, IQBLK_SetIQBandwidth(hz))
    }

    fn iq_bandwidth(&mut self) -> Reply<f64> {
        out_call!(IqblkGetIQBandwidth, IQBLK_GetIQBandwidth() -> f64)
    }

    fn iq_min_bandwidth(&mut self) -> Reply<f64> {
        out_call!(IqblkGetMinIQBandwidth, IQBLK_GetMinIQBandwidth() -> f64)
    }

    fn iq_max_bandwidth(&mut self) -> Reply<f64> {
        out_call!(IqblkGetMaxIQBandwidth, IQBLK_GetMaxIQBandwidth() -> f64)
    }

    fn iq_set_record_length(&mut self, samples: i32) -> Reply<()> {
        unit_call!(IqblkSetIQRecordLength, IQBLK_SetIQRecordLength(samples))
    }

    fn iq_record_length(&mut self) -> Reply<i32> {
        out_call!(IqblkGetIQRecordLength, IQBLK_GetIQRecordLength() -> c_int)
    }

    fn iq_max_record_length(&mut self) -> Reply<i32> {
        out_call!(IqblkGetMaxIQRecordLength, IQBLK_GetMaxIQRecordLength() -> c_int)
    }

    fn iq_sample_rate(&mut self) -> Reply<f64> {
        out_call!(IqblkGetIQSampleRate, IQBLK_GetIQSampleRate() -> f64)
    }

    fn iq_acquire(&mut self) -> Reply<()> {
        unit_call!(IqblkAcquireIQData, IQBLK_AcquireIQData())
    }

    fn iq_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool> {
        out_call!(IqblkWaitForIQDataReady, IQBLK_WaitForIQDataReady(timeout_ms,) -> bool)
    }

    fn iq_data_deinterleaved(&mut self, samples: i32) -> Reply<IqData> {
        let len = native_len(samples);
        let mut i = vec![0.0_f32; len];
        let mut q = vec![0.0_f32; len];
        let mut out_len: c_int = 0;
        // SAFETY: `i` and `q` each hold `samples` floats.
        let rs = unsafe {
            sys::IQBLK_GetIQDataDeinterleaved(i.as_mut_ptr(), q.as_mut_ptr(), &mut out_len, samples)
        };
        Reply::decode(NativeCall::IqblkGetIQDataDeinterleaved, rs as i32, || {
            let got = native_len(out_len).min(len);
            i.truncate(got);
            q.truncate(got);
            IqData { i, q }
        })
    }

    fn iq_acq_info(&mut self) -> Reply<IqAcqInfo> {
        let mut raw = sys::IQBLK_ACQINFO::default();
        // SAFETY: `raw` is a zeroed IQBLK_ACQINFO.
        let rs = unsafe { sys::IQBLK_GetIQAcqInfo(&mut raw) };
        Reply::decode(NativeCall::IqblkGetIQAcqInfo, rs as i32, || IqAcqInfo {
            sample0_timestamp: raw.sample0Timestamp,
            trigger_sample_index: raw.triggerSampleIndex,
            trigger_timestamp: raw.triggerTimestamp,
            acq_status: raw.acqStatus,
        })
    }

    fn dpx_set_enable(&mut self, enable: bool) -> Reply<()> {
        unit_call!(DpxSetEnable, DPX_SetEnable(enable))
    }

    fn dpx_set_parameters(&mut self, params: &DpxParameters) -> Reply<()> {
        unit_call!(
            DpxSetParameters,
            DPX_SetParameters(
                params.span,
                params.rbw,
                params.bitmap_width,
                params.trace_points_per_pixel,
                sys::VerticalUnit_dBm,
                params.y_top,
                params.y_bottom,
                params.infinite_persistence,
                params.persistence_time_s,
                params.show_only_triggered
            )
        )
    }

    fn dpx_configure(&mut self, spectrum: bool, spectrogram: bool) -> Reply<()> {
        unit_call!(DpxConfigure, DPX_Configure(spectrum, spectrogram))
    }

    fn dpx_settings(&mut self) -> Reply<DpxSettings> {
        let mut raw = sys::DPX_SettingsStruct::default();
        // SAFETY: `raw` is a zeroed DPX_SettingsStruct.
        let rs = unsafe { sys::DPX_GetSettings(&mut raw) };
        Reply::decode(NativeCall::DpxGetSettings, rs as i32, || DpxSettings {
            enable_spectrum: raw.enableSpectrum,
            enable_spectrogram: raw.enableSpectrogram,
            bitmap_width: raw.bitmapWidth,
            bitmap_height: raw.bitmapHeight,
            trace_length: raw.traceLength,
            decay_factor: raw.decayFactor,
            actual_rbw: raw.actualRBW,
        })
    }

    fn sogram_set_parameters(&mut self, params: &SogramParameters) -> Reply<()> {
        unit_call!(
            DpxSogramSetParameters,
            DPXSOGRAM_SetParameters(
                params.time_per_bitmap_line,
                params.time_resolution,
                params.max_power,
                params.min_power
            )
        )
    }

    fn sogram_settings(&mut self) -> Reply<SogramSettings> {
        let mut raw = sys::DPX_SogramSettingsStruct::default();
        // SAFETY: `raw` is a zeroed DPX_SogramSettingsStruct.
        let rs = unsafe { sys::DPXSOGRAM_GetSettings(&mut raw) };
        Reply::decode(NativeCall::DpxSogramGetSettings, rs as i32, || SogramSettings {
            bitmap_width: raw.bitmapWidth,
            bitmap_height: raw.bitmapHeight,
            trace_line_time: raw.sogramTraceLineTime,
            bitmap_line_time: raw.sogramBitmapLineTime,
        })
    }

    fn dpx_reset(&mut self) -> Reply<()> {
        unit_call!(DpxReset, DPX_Reset())
    }

    fn dpx_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool> {
        out_call!(DpxWaitForDataReady, DPX_WaitForDataReady(timeout_ms,) -> bool)
    }

    fn dpx_frame_buffer(&mut self) -> Reply<DpxFrame> {
        let mut raw = sys::DPX_FrameBuffer::default();
        // SAFETY: `raw` is a zeroed DPX_FrameBuffer; the driver fills its pointers.
        let rs = unsafe { sys::DPX_GetFrameBuffer(&mut raw) };
        Reply::decode(NativeCall::DpxGetFrameBuffer, rs as i32, || {
            let size = native_len(raw.sogramBitmapSize);
            let lines = native_len(raw.sogramBitmapHeight);
            // SAFETY: the driver keeps these buffers valid until
            // DPX_FinishFrameBuffer, with the sizes it reported alongside them.
            let (bitmap, line_timestamps, triggers) = unsafe {
                (
                    copy_driver_buffer(raw.sogramBitmap, size),
                    copy_driver_buffer(raw.sogramBitmapTimestampArray, lines),
                    copy_driver_buffer(raw.sogramBitmapContainTriggerArray, lines),
                )
            };
            DpxFrame {
                fft_per_sec: raw.fftPerSec,
                fft_count: raw.fftCount,
                frame_count: raw.frameCount,
                timestamp: raw.timestamp,
                acq_data_status: raw.acqDataStatus,
                sogram_width: raw.sogramBitmapWidth,
                sogram_height: raw.sogramBitmapHeight,
                sogram_size: raw.sogramBitmapSize,
                valid_lines: raw.sogramBitmapNumValidLines,
                bitmap,
                line_timestamps,
                line_triggered: triggers.into_iter().map(|t| t != 0).collect(),
            }
        })
    }

    fn dpx_finish_frame_buffer(&mut self) -> Reply<()> {
        unit_call!(DpxFinishFrameBuffer, DPX_FinishFrameBuffer())
    }

    fn stream_min_bandwidth(&mut self) -> Reply<f64> {
        out_call!(IqstreamGetMinAcqBandwidth, IQSTREAM_GetMinAcqBandwidth() -> f64)
    }

    fn stream_max_bandwidth(&mut self) -> Reply<f64> {
        out_call!(IqstreamGetMaxAcqBandwidth, IQSTREAM_GetMaxAcqBandwidth() -> f64)
    }

    fn stream_set_bandwidth(&mut self, hz: f64) -> Reply<()> {
        unit_call!(IqstreamSetAcqBandwidth, IQSTREAM_SetAcqBandwidth(hz))
    }

    fn stream_acq_parameters(&mut self) -> Reply<(f64, f64)> {
        let mut bandwidth = 0.0_f64;
        let mut sample_rate = 0.0_f64;
        // SAFETY: both outputs point to initialized locals.
        let rs = unsafe { sys::IQSTREAM_GetAcqParameters(&mut bandwidth, &mut sample_rate) };
        Reply::decode(NativeCall::IqstreamGetAcqParameters, rs as i32, || (bandwidth, sample_rate))
    }

    fn stream_set_output(&mut self, dest: StreamDestination, dtype: StreamDataType) -> Reply<()> {
        unit_call!(
            IqstreamSetOutputConfiguration,
            IQSTREAM_SetOutputConfiguration(
                dest.to_raw() as sys::IQSOUTDEST,
                dtype.to_raw() as sys::IQSOUTDTYPE
            )
        )
    }

    fn stream_set_filename_base(&mut self, base: &Path) -> Reply<()> {
        let call = NativeCall::IqstreamSetDiskFilenameBase;
        let Some(base) = base.to_str().and_then(|s| CString::new(s).ok()) else {
            return Reply::failed(call, ReturnStatus::Parameter);
        };
        // SAFETY: `base` is a NUL-terminated string the driver copies before returning.
        let rs = unsafe { sys::IQSTREAM_SetDiskFilenameBase(base.as_ptr()) };
        Reply::decode(call, rs as i32, || ())
    }

    fn stream_set_filename_suffix(&mut self, suffix: i32) -> Reply<()> {
        unit_call!(IqstreamSetDiskFilenameSuffix, IQSTREAM_SetDiskFilenameSuffix(suffix))
    }

    fn stream_set_file_length(&mut self, ms: i32) -> Reply<()> {
        unit_call!(IqstreamSetDiskFileLength, IQSTREAM_SetDiskFileLength(ms))
    }

    fn stream_clear_status(&mut self) -> Reply<()> {
        unit_call!(IqstreamClearAcqStatus, IQSTREAM_ClearAcqStatus())
    }

    fn stream_start(&mut self) -> Reply<()> {
        unit_call!(IqstreamStart, IQSTREAM_Start())
    }

    fn stream_stop(&mut self) -> Reply<()> {
        unit_call!(IqstreamStop, IQSTREAM_Stop())
    }

    fn stream_write_status(&mut self) -> Reply<StreamWriteStatus> {
        let mut complete = false;
        let mut writing = false;
        // SAFETY: both outputs point to initialized locals.
        let rs = unsafe { sys::IQSTREAM_GetDiskFileWriteStatus(&mut complete, &mut writing) };
        Reply::decode(NativeCall::IqstreamGetDiskFileWriteStatus, rs as i32, || {
            StreamWriteStatus { complete, writing }
        })
    }

    fn stream_file_info(&mut self) -> Reply<StreamFileInfo> {
        let mut raw = sys::IQSTREAM_File_Info::default();
        // SAFETY: `raw` is a zeroed IQSTREAM_File_Info; the file name pointers
        // it receives stay owned by the driver and are not read here.
        let rs = unsafe { sys::IQSTREAM_GetDiskFileInfo(&mut raw) };
        Reply::decode(NativeCall::IqstreamGetDiskFileInfo, rs as i32, || StreamFileInfo {
            number_samples: raw.numberSamples,
            sample0_timestamp: raw.sample0Timestamp,
            trigger_sample_index: raw.triggerSampleIndex,
            trigger_timestamp: raw.triggerTimestamp,
            acq_status: raw.acqStatus,
        })
    }

    fn set_reference_time(&mut self, point: TimePoint) -> Reply<()> {
        unit_call!(
            ReftimeSetReferenceTime,
            REFTIME_SetReferenceTime(point.seconds as sys::time_t, point.nanos, point.timestamp)
        )
    }

    fn reference_time_source(&mut self) -> Reply<ReferenceTimeSource> {
        let mut raw: sys::REFTIME_SRC = Default::default();
        // SAFETY: `raw` is an initialized enum-sized integer.
        let rs = unsafe { sys::REFTIME_GetReferenceTimeSource(&mut raw) };
        enum_reply(
            NativeCall::ReftimeGetReferenceTimeSource,
            rs as i32,
            raw as u32,
            ReferenceTimeSource::from_raw,
        )
    }

    fn current_time(&mut self) -> Reply<TimePoint> {
        let mut seconds: sys::time_t = 0;
        let mut nanos: u64 = 0;
        let mut timestamp: u64 = 0;
        // SAFETY: all outputs point to initialized locals.
        let rs = unsafe { sys::REFTIME_GetCurrentTime(&mut seconds, &mut nanos, &mut timestamp) };
        Reply::decode(NativeCall::ReftimeGetCurrentTime, rs as i32, || TimePoint {
            seconds: seconds as i64,
            nanos,
            timestamp,
        })
    }

    fn time_from_timestamp(&mut self, timestamp: u64) -> Reply<TimePoint> {
        let mut seconds: sys::time_t = 0;
        let mut nanos: u64 = 0;
        // SAFETY: both outputs point to initialized locals.
        let rs = unsafe { sys::REFTIME_GetTimeFromTimestamp(timestamp, &mut seconds, &mut nanos) };
        Reply::decode(NativeCall::ReftimeGetTimeFromTimestamp, rs as i32, || TimePoint {
            seconds: seconds as i64,
            nanos,
            timestamp,
        })
    }

    fn timestamp_rate(&mut self) -> Reply<u64> {
        out_call!(ReftimeGetTimestampRate, REFTIME_GetTimestampRate() -> u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_c_chars_stops_at_nul() {
        let mut buf = [0 as c_char; 16];
        for (slot, byte) in buf.iter_mut().zip(b"RSA306B\0junk") {
            *slot = *byte as c_char;
        }
        assert_eq!(decode_c_chars(&buf), "RSA306B");
    }

    #[test]
    fn test_decode_c_chars_unterminated() {
        let buf = [b'A' as c_char; 4];
        assert_eq!(decode_c_chars(&buf), "AAAA");
    }

    #[test]
    fn test_native_len_rejects_negative() {
        assert_eq!(native_len(-5), 0);
        assert_eq!(native_len(801), 801);
    }

    #[test]
    fn test_enum_reply_unknown_value() {
        let reply = enum_reply(NativeCall::TrigGetTriggerMode, 0, 77, TriggerMode::from_raw);
        assert_eq!(reply.status(), ReturnStatus::Placeholder);
        let reply = enum_reply(NativeCall::TrigGetTriggerMode, 0, 1, TriggerMode::from_raw);
        assert_eq!(reply.into_parts().2, Some(TriggerMode::Triggered));
    }

    #[test]
    fn test_single_library_owner() {
        let first = NativeRsa::acquire().unwrap();
        assert!(NativeRsa::acquire().is_err());
        drop(first);
        assert!(NativeRsa::acquire().is_ok());
    }
}
