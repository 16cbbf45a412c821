//! Acquisition Helpers.
//!
//! Each helper runs the same protocol under the session token:
//!
//! 1. realign if enabled and needed, then push the desired configuration
//!    if the instrument may not hold it
//! 2. select the measurement and arm (`DEVICE_Run`)
//! 3. wait for data in `poll_interval` slices until the caller's timeout
//! 4. transfer into owned buffers
//! 5. check the transferred length and decode the status bits
//!
//! `DEVICE_Stop` runs after every attempt, so the session is never left
//! `Armed`. A result is only returned when its buffer has exactly the
//! requested size.

use std::time::{Duration, Instant};

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use num_complex::Complex32;
use rsa_api_sys as sys;
use tracing::{debug, warn};

use crate::api::{NativeCall, Reply, RsaApi};
use crate::checker::CheckedApi;
use crate::config::{self, AppliedConfig};
use crate::error::{AcquisitionFault, ConfigurationFault, ErrorRecord, Result, TekRsaError};
use crate::session::{DeviceSession, Inner, SessionState};
use crate::types::{SpectrumDetector, SpectrumTrace, VerticalUnit};

bitflags! {
    /// Conditions reported alongside acquired data.
    ///
    /// These never fail an acquisition on their own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AcquisitionFlags: u32 {
        /// Input exceeded the ADC range
        const ADC_OVERRANGE = 1 << 0;
        /// Reference oscillator or frequency reference unlocked
        const REF_OSC_UNLOCK = 1 << 1;
        /// Supply voltage below operating range
        const LOW_SUPPLY_VOLTAGE = 1 << 2;
        /// Samples were dropped in the instrument
        const ADC_DATA_LOST = 1 << 3;
        /// USB transfer error during the block
        const DATA_XFER_ERROR = 1 << 4;
        /// Instrument reported over-temperature
        const OVER_TEMPERATURE = 1 << 5;
        /// IQ streaming input buffer passed 75% full
        const INPUT_BUFFER_HIGH = 1 << 6;
        /// IQ streaming output buffer passed 75% full
        const OUTPUT_BUFFER_HIGH = 1 << 7;
    }
}

impl AcquisitionFlags {
    /// Decode an `AcqDataStatus` word (spectrum traces and DPX frames).
    pub fn from_data_status(status: u32) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::ADC_OVERRANGE, status & sys::AcqDataStatus_ADC_OVERRANGE != 0);
        flags.set(Self::REF_OSC_UNLOCK, status & sys::AcqDataStatus_REF_OSC_UNLOCK != 0);
        flags.set(Self::LOW_SUPPLY_VOLTAGE, status & sys::AcqDataStatus_LOW_SUPPLY_VOLTAGE != 0);
        flags.set(Self::ADC_DATA_LOST, status & sys::AcqDataStatus_ADC_DATA_LOST != 0);
        flags
    }

    /// Decode an `IQBLK_ACQINFO` status word.
    pub fn from_iq_status(status: u32) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::ADC_OVERRANGE, status & sys::IQBLK_STATUS_INPUT_OVERRANGE != 0);
        flags.set(Self::REF_OSC_UNLOCK, status & sys::IQBLK_STATUS_FREQREF_UNLOCKED != 0);
        flags.set(Self::DATA_XFER_ERROR, status & sys::IQBLK_STATUS_DATA_XFER_ERROR != 0);
        flags
    }

    /// Decode the sticky half of an IQ streaming `acqStatus` word.
    ///
    /// Overflow and discontinuity bits are data loss and are not flags; see
    /// [`stream_data_lost`](crate::stream::stream_data_lost).
    pub fn from_stream_status(status: u32) -> Self {
        let sticky = status >> sys::IQSTRM_STATUS_STICKY_SHIFT;
        let mut flags = Self::empty();
        flags.set(Self::ADC_OVERRANGE, sticky & sys::IQSTRM_STATUS_OVERRANGE != 0);
        flags.set(Self::INPUT_BUFFER_HIGH, sticky & sys::IQSTRM_STATUS_IBUFF75PCT != 0);
        flags.set(Self::OUTPUT_BUFFER_HIGH, sticky & sys::IQSTRM_STATUS_OBUFF75PCT != 0);
        flags
    }
}

/// One spectrum trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSweep {
    /// Trace values, one per bin
    pub values: Vec<f32>,
    pub start_frequency_hz: f64,
    pub stop_frequency_hz: f64,
    pub frequency_step_hz: f64,
    pub rbw_hz: f64,
    pub unit: VerticalUnit,
    pub detector: SpectrumDetector,
}

impl SpectrumSweep {
    /// Frequency of bin `index`.
    pub fn frequency(&self, index: usize) -> f64 {
        self.start_frequency_hz + index as f64 * self.frequency_step_hz
    }

    /// Index and value of the largest bin.
    pub fn peak(&self) -> Option<(usize, f32)> {
        self.values
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// One deinterleaved IQ block.
#[derive(Debug, Clone, PartialEq)]
pub struct IqBlock {
    pub i: Vec<f32>,
    pub q: Vec<f32>,
    pub sample_rate: f64,
    pub bandwidth_hz: f64,
    /// Sample index of the trigger within the block
    pub trigger_index: u64,
}

impl IqBlock {
    /// Samples as complex values.
    pub fn to_complex(&self) -> Vec<Complex32> {
        self.i
            .iter()
            .zip(&self.q)
            .map(|(&re, &im)| Complex32::new(re, im))
            .collect()
    }
}

/// One DPX spectrogram frame.
///
/// `bitmap` is row-major, `height` lines of `width` pixels; each line is
/// one time slice across the frequency axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    /// Lines holding data from this acquisition
    pub valid_lines: usize,
    pub bitmap: Vec<u8>,
    /// Timestamp of each line in seconds
    pub line_timestamps: Vec<f64>,
    /// Whether each line contains a trigger
    pub line_triggered: Vec<bool>,
    pub start_frequency_hz: f64,
    pub stop_frequency_hz: f64,
    pub top_dbm: f64,
    pub bottom_dbm: f64,
    pub line_time_s: f64,
    /// Frame timestamp in seconds
    pub timestamp_s: f64,
    pub fft_per_sec: i32,
    pub frame_count: i64,
}

impl FrameBuffer {
    /// Pixels of one line.
    pub fn line(&self, index: usize) -> Option<&[u8]> {
        if index >= self.height {
            return None;
        }
        let start = index * self.width;
        self.bitmap.get(start..start + self.width)
    }
}

/// Acquired data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Spectrum(SpectrumSweep),
    Iq(IqBlock),
    Frame(FrameBuffer),
}

/// Output of one acquisition helper call.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionResult {
    pub payload: Payload,
    /// Bins, samples or pixels in the payload
    pub len: usize,
    pub flags: AcquisitionFlags,
    /// Raw status word reported with the data
    pub status_word: u32,
    /// Instrument timestamp in device ticks, where the mode reports one
    pub device_timestamp: Option<u64>,
    /// `device_timestamp` on the instrument's reference clock
    pub device_time: Option<DateTime<Utc>>,
    pub captured_at: DateTime<Utc>,
    pub center_frequency_hz: f64,
    pub reference_level_dbm: f64,
}

impl AcquisitionResult {
    /// Spectrum payload.
    pub fn spectrum(&self) -> Option<&SpectrumSweep> {
        match &self.payload {
            Payload::Spectrum(s) => Some(s),
            _ => None,
        }
    }

    /// IQ payload.
    pub fn iq(&self) -> Option<&IqBlock> {
        match &self.payload {
            Payload::Iq(b) => Some(b),
            _ => None,
        }
    }

    /// Frame payload.
    pub fn frame(&self) -> Option<&FrameBuffer> {
        match &self.payload {
            Payload::Frame(f) => Some(f),
            _ => None,
        }
    }

    /// Whether no condition flags are set.
    pub fn is_clean(&self) -> bool {
        self.flags.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Spectrum,
    /// IQ block of `samples` after dropping the first `skip`
    Iq { samples: i32, skip: i32 },
    Frame,
    /// IQ stream of `samples` after dropping the first `skip`
    Stream { samples: usize, skip: usize },
}

impl Mode {
    fn name(self) -> &'static str {
        match self {
            Self::Spectrum => "spectrum",
            Self::Iq { .. } => "iq block",
            Self::Frame => "frame buffer",
            Self::Stream { .. } => "iq stream",
        }
    }
}

/// Block until `wait` reports ready, slicing the timeout by `poll`.
fn wait_ready(
    api: &mut CheckedApi,
    call: NativeCall,
    timeout: Duration,
    poll: Duration,
    mut wait: impl FnMut(&mut dyn RsaApi, i32) -> Reply<bool>,
) -> Result<()> {
    let started = Instant::now();
    let deadline = started + timeout;
    // Always ask at least once, so a zero timeout still picks up ready data.
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let slice = if remaining.is_zero() {
            Duration::ZERO
        } else {
            remaining.min(poll).max(Duration::from_millis(1))
        };
        let ms = i32::try_from(slice.as_millis()).unwrap_or(i32::MAX);
        if api.call(|a| wait(a, ms))? {
            debug!(call = call.name(), elapsed_ms = started.elapsed().as_millis() as u64, "Data ready");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(timed_out(call, timeout));
        }
    }
}

pub(crate) fn timed_out(call: NativeCall, timeout: Duration) -> TekRsaError {
    TekRsaError::Acquisition {
        kind: AcquisitionFault::Timeout,
        record: ErrorRecord {
            call: Some(call),
            status: None,
            args: None,
            context: format!("data not ready within {} ms", timeout.as_millis()),
        },
    }
}

/// Timestamp ticks spanned by `samples` at `sample_rate`.
pub(crate) fn sample_ticks(samples: u64, sample_rate: f64, timestamp_rate: u64) -> u64 {
    if sample_rate <= 0.0 {
        return 0;
    }
    (samples as f64 * timestamp_rate as f64 / sample_rate).round() as u64
}

/// Wall-clock time of an instrument timestamp.
pub(crate) fn device_time(inner: &mut Inner, timestamp: Option<u64>) -> Result<Option<DateTime<Utc>>> {
    let Some(timestamp) = timestamp else {
        return Ok(None);
    };
    let point = inner.api.call(|a| a.time_from_timestamp(timestamp))?;
    Ok(point.to_utc())
}

pub(crate) fn check_len(what: &str, got: usize, expected: usize) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(TekRsaError::acquisition(
            AcquisitionFault::BufferSizeMismatch,
            format!("{what}: transferred {got} of {expected} expected"),
        ))
    }
}

/// Record length for `samples` kept after `skip`, checked against `max`.
fn block_length(samples: i32, skip: i32, max: i32) -> Result<i32> {
    if skip < 0 {
        return Err(TekRsaError::out_of_range(format!("IQ skip count {skip} is negative")));
    }
    match samples.checked_add(skip) {
        Some(total) if samples >= 2 && total <= max => Ok(total),
        _ => Err(TekRsaError::out_of_range(format!(
            "IQ block length {samples} (+{skip} skipped) outside 2..={max}"
        ))),
    }
}

pub(crate) fn applied(inner: &Inner) -> Result<AppliedConfig> {
    inner.applied.clone().ok_or_else(|| {
        TekRsaError::configuration(ConfigurationFault::Rejected, "no configuration applied")
    })
}

impl DeviceSession {
    /// Acquire one spectrum trace with the default timeout.
    pub fn acquire_spectrum(&self) -> Result<AcquisitionResult> {
        self.acquire_spectrum_within(self.options().acquisition_timeout)
    }

    /// Acquire one spectrum trace, waiting at most `timeout` for data.
    pub fn acquire_spectrum_within(&self, timeout: Duration) -> Result<AcquisitionResult> {
        self.acquire(Mode::Spectrum, timeout)
    }

    /// Acquire a block of `n_samples` IQ samples with the default timeout.
    pub fn acquire_iq_block(&self, n_samples: i32) -> Result<AcquisitionResult> {
        self.acquire_iq_block_within(n_samples, self.options().acquisition_timeout)
    }

    /// Acquire a block of `n_samples` IQ samples, waiting at most `timeout`.
    ///
    /// The record length is set to `n_samples` for this block only; the
    /// configured length is restored by the next acquisition of another
    /// kind or the next configuration push.
    pub fn acquire_iq_block_within(&self, n_samples: i32, timeout: Duration) -> Result<AcquisitionResult> {
        self.acquire_iq_block_skipping_within(n_samples, 0, timeout)
    }

    /// Acquire `n_samples` IQ samples after discarding the first `skip`.
    pub fn acquire_iq_block_skipping(&self, n_samples: i32, skip: i32) -> Result<AcquisitionResult> {
        self.acquire_iq_block_skipping_within(n_samples, skip, self.options().acquisition_timeout)
    }

    /// Acquire `n_samples` IQ samples after discarding the first `skip`,
    /// waiting at most `timeout`.
    ///
    /// The instrument records `n_samples + skip`; timestamps and the trigger
    /// index refer to the first kept sample.
    pub fn acquire_iq_block_skipping_within(
        &self,
        n_samples: i32,
        skip: i32,
        timeout: Duration,
    ) -> Result<AcquisitionResult> {
        self.acquire(Mode::Iq { samples: n_samples, skip }, timeout)
    }

    /// Acquire one DPX spectrogram frame with the default timeout.
    pub fn acquire_frame_buffer(&self) -> Result<AcquisitionResult> {
        self.acquire_frame_buffer_within(self.options().acquisition_timeout)
    }

    /// Acquire one DPX spectrogram frame, waiting at most `timeout`.
    pub fn acquire_frame_buffer_within(&self, timeout: Duration) -> Result<AcquisitionResult> {
        self.acquire(Mode::Frame, timeout)
    }

    /// Whether an IQ block of `n_samples` comes back complete.
    pub fn health_check(&self, n_samples: i32) -> bool {
        match self.acquire_iq_block(n_samples) {
            Ok(result) => result.len == usize::try_from(n_samples).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "RSA health check failed");
                false
            }
        }
    }

    pub(crate) fn acquire(&self, mode: Mode, timeout: Duration) -> Result<AcquisitionResult> {
        let mut inner = self.token()?;
        inner.info()?;

        let outcome = self.run_mode(&mut inner, mode, timeout);
        let result = match outcome {
            Ok(result) => inner.api.call(|a| a.stop()).map(|()| result),
            Err(e) => {
                if let Err(stop) = inner.api.call(|a| a.stop()) {
                    debug!(error = %stop, "Disarm after failed acquisition failed");
                }
                Err(e)
            }
        };

        let result = self.settle(&mut inner, result);
        if inner.connection.is_some() {
            self.publish(&inner, SessionState::Connected);
        }
        match &result {
            Ok(r) => debug!(mode = mode.name(), len = r.len, flags = r.flags.bits(), "Acquisition complete"),
            Err(e) => debug!(mode = mode.name(), error = %e, "Acquisition failed"),
        }
        result
    }

    fn run_mode(&self, inner: &mut Inner, mode: Mode, timeout: Duration) -> Result<AcquisitionResult> {
        match mode {
            Mode::Iq { samples, skip } => {
                block_length(samples, skip, inner.info()?.max_iq_record_length)?;
            }
            Mode::Stream { samples, .. } if samples == 0 => {
                return Err(TekRsaError::out_of_range("IQ stream length must be positive"));
            }
            _ => {}
        }
        if self.options().align_before_acquire {
            self.align_if_needed(inner)?;
        }
        self.sync_config(inner)?;
        if !matches!(mode, Mode::Iq { .. }) {
            self.restore_record_length(inner)?;
        }
        match mode {
            Mode::Spectrum => self.spectrum(inner, timeout),
            Mode::Iq { samples, skip } => self.iq_block(inner, samples, skip, timeout),
            Mode::Frame => self.frame_buffer(inner, timeout),
            Mode::Stream { samples, skip } => self.iq_stream(inner, samples, skip, timeout),
        }
    }

    pub(crate) fn arm(&self, inner: &mut Inner) -> Result<()> {
        inner.api.call(|a| a.run())?;
        self.publish(inner, SessionState::Armed);
        Ok(())
    }

    pub(crate) fn over_temperature_flag(inner: &mut Inner) -> Result<AcquisitionFlags> {
        let hot = inner.api.call(|a| a.over_temperature())?;
        Ok(if hot {
            AcquisitionFlags::OVER_TEMPERATURE
        } else {
            AcquisitionFlags::empty()
        })
    }

    fn spectrum(&self, inner: &mut Inner, timeout: Duration) -> Result<AcquisitionResult> {
        let applied = applied(inner)?;
        inner.api.call(|a| a.dpx_set_enable(false))?;
        inner.api.call(|a| a.spectrum_set_enable(true))?;
        self.arm(inner)?;
        inner.api.call(|a| a.spectrum_acquire_trace())?;
        wait_ready(
            &mut inner.api,
            NativeCall::SpectrumWaitForTraceReady,
            timeout,
            self.options().poll_interval,
            |a, ms| a.spectrum_wait_ready(ms),
        )?;

        let expected = applied.trace_length;
        let values = inner
            .api
            .call(|a| a.spectrum_trace(SpectrumTrace::Trace1, expected))
            .map_err(|e| e.with_args(format!("Trace1, {expected}")))?;
        check_len("spectrum trace", values.len(), usize::try_from(expected).unwrap_or(0))?;
        let info = inner.api.call(|a| a.spectrum_trace_info())?;
        let status_word = u32::from(info.acq_data_status);
        let flags = AcquisitionFlags::from_data_status(status_word) | Self::over_temperature_flag(inner)?;
        let device_timestamp = u64::try_from(info.timestamp).ok();
        let device_time = device_time(inner, device_timestamp)?;

        Ok(AcquisitionResult {
            len: values.len(),
            payload: Payload::Spectrum(SpectrumSweep {
                values,
                start_frequency_hz: applied.start_frequency_hz,
                stop_frequency_hz: applied.stop_frequency_hz,
                frequency_step_hz: applied.frequency_step_hz,
                rbw_hz: applied.rbw_hz,
                unit: applied.vertical_unit,
                detector: applied.detector,
            }),
            flags,
            status_word,
            device_timestamp,
            device_time,
            captured_at: Utc::now(),
            center_frequency_hz: applied.center_frequency_hz,
            reference_level_dbm: applied.reference_level_dbm,
        })
    }

    /// Set the record length for one block, leaving the configuration alone.
    fn set_record_length(&self, inner: &mut Inner, n: i32) -> Result<()> {
        let current = inner.applied.as_ref().map(|a| a.iq_record_length);
        if current == Some(n) {
            return Ok(());
        }
        let actual = config::push_record_length(&mut inner.api, n)?;
        if let Some(applied) = inner.applied.as_mut() {
            applied.iq_record_length = actual;
        }
        if actual != n {
            // Neither the configured nor the requested length is in effect.
            inner.stale = true;
            inner.record_override = None;
            return Err(TekRsaError::configuration(
                ConfigurationFault::Rejected,
                format!("IQ record length {n} requested, instrument reports {actual}"),
            ));
        }
        let configured = inner.pushed.as_ref().map(|p| p.iq_record_length);
        inner.record_override = (configured != Some(n)).then_some(n);
        Ok(())
    }

    fn iq_block(&self, inner: &mut Inner, n: i32, skip: i32, timeout: Duration) -> Result<AcquisitionResult> {
        let total = block_length(n, skip, applied(inner)?.max_iq_record_length)?;
        self.set_record_length(inner, total)?;
        let applied = applied(inner)?;
        inner.api.call(|a| a.spectrum_set_enable(false))?;
        inner.api.call(|a| a.dpx_set_enable(false))?;
        self.arm(inner)?;
        inner.api.call(|a| a.iq_acquire())?;
        wait_ready(
            &mut inner.api,
            NativeCall::IqblkWaitForIQDataReady,
            timeout,
            self.options().poll_interval,
            |a, ms| a.iq_wait_ready(ms),
        )?;

        let mut data = inner
            .api
            .call(|a| a.iq_data_deinterleaved(total))
            .map_err(|e| e.with_args(total.to_string()))?;
        let info = inner.api.call(|a| a.iq_acq_info())?;
        if info.acq_status & sys::IQBLK_STATUS_ACQ_SYS_ERROR != 0 {
            return Err(TekRsaError::Acquisition {
                kind: AcquisitionFault::NativeFault,
                record: ErrorRecord::local(format!(
                    "instrument reported an acquisition system error (status {:#x})",
                    info.acq_status
                )),
            });
        }
        let expected = usize::try_from(total).unwrap_or(0);
        check_len("IQ I channel", data.i.len(), expected)?;
        check_len("IQ Q channel", data.q.len(), expected)?;
        let skipped = usize::try_from(skip).unwrap_or(0);
        data.i.drain(..skipped);
        data.q.drain(..skipped);
        let flags = AcquisitionFlags::from_iq_status(info.acq_status) | Self::over_temperature_flag(inner)?;

        let timestamp_rate = inner.info()?.timestamp_rate;
        let skipped_ticks = sample_ticks(skipped as u64, applied.iq_sample_rate, timestamp_rate);
        let device_timestamp = Some(info.sample0_timestamp + skipped_ticks);
        let device_time = device_time(inner, device_timestamp)?;

        Ok(AcquisitionResult {
            len: data.i.len(),
            payload: Payload::Iq(IqBlock {
                i: data.i,
                q: data.q,
                sample_rate: applied.iq_sample_rate,
                bandwidth_hz: applied.iq_bandwidth_hz,
                trigger_index: info.trigger_sample_index.saturating_sub(skipped as u64),
            }),
            flags,
            status_word: info.acq_status,
            device_timestamp,
            device_time,
            captured_at: Utc::now(),
            center_frequency_hz: applied.center_frequency_hz,
            reference_level_dbm: applied.reference_level_dbm,
        })
    }

    fn frame_buffer(&self, inner: &mut Inner, timeout: Duration) -> Result<AcquisitionResult> {
        let applied = applied(inner)?;
        inner.api.call(|a| a.spectrum_set_enable(false))?;
        inner.api.call(|a| a.dpx_set_enable(true))?;
        inner.api.call(|a| a.dpx_configure(false, true))?;
        inner.api.call(|a| a.dpx_reset())?;
        self.arm(inner)?;
        wait_ready(
            &mut inner.api,
            NativeCall::DpxWaitForDataReady,
            timeout,
            self.options().poll_interval,
            |a, ms| a.dpx_wait_ready(ms),
        )?;

        let frame = inner.api.call(|a| a.dpx_frame_buffer());
        let finished = inner.api.call(|a| a.dpx_finish_frame_buffer());
        let frame = match (frame, finished) {
            (Ok(frame), Ok(())) => frame,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), finished) => {
                if let Err(finish) = finished {
                    debug!(error = %finish, "Releasing DPX frame after failed transfer failed");
                }
                return Err(e);
            }
        };

        let width = usize::try_from(applied.spectrogram_width).unwrap_or(0);
        let height = usize::try_from(applied.spectrogram_height).unwrap_or(0);
        check_len("spectrogram bitmap", frame.bitmap.len(), width * height)?;
        check_len("spectrogram line timestamps", frame.line_timestamps.len(), height)?;
        check_len("spectrogram trigger marks", frame.line_triggered.len(), height)?;
        let flags = AcquisitionFlags::from_data_status(frame.acq_data_status) | Self::over_temperature_flag(inner)?;

        let half_span = applied.span_hz / 2.0;
        let len = frame.bitmap.len();
        Ok(AcquisitionResult {
            payload: Payload::Frame(FrameBuffer {
                width,
                height,
                valid_lines: usize::try_from(frame.valid_lines).unwrap_or(0).min(height),
                bitmap: frame.bitmap,
                line_timestamps: frame.line_timestamps,
                line_triggered: frame.line_triggered,
                start_frequency_hz: applied.center_frequency_hz - half_span,
                stop_frequency_hz: applied.center_frequency_hz + half_span,
                top_dbm: applied.spectrogram.top_dbm,
                bottom_dbm: applied.spectrogram.bottom_dbm,
                line_time_s: applied.spectrogram.line_time_s,
                timestamp_s: frame.timestamp,
                fft_per_sec: frame.fft_per_sec,
                frame_count: frame.frame_count,
            }),
            len,
            flags,
            status_word: frame.acq_data_status,
            device_timestamp: None,
            device_time: None,
            captured_at: Utc::now(),
            center_frequency_hz: applied.center_frequency_hz,
            reference_level_dbm: applied.reference_level_dbm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SimControl, SimulatedRsa};
    use crate::config::AcquisitionConfig;
    use crate::device::DeviceSelector;
    use crate::error::ErrorClass;
    use crate::session::SessionOptions;

    fn connected() -> (DeviceSession, SimControl) {
        let sim = SimulatedRsa::new();
        let control = sim.control();
        let options = SessionOptions {
            acquisition_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(20),
            ..SessionOptions::default()
        };
        let session = DeviceSession::new(sim, options);
        session.connect(DeviceSelector::Any).unwrap();
        (session, control)
    }

    #[test]
    fn test_flags_decode() {
        let flags = AcquisitionFlags::from_data_status(0x21);
        assert_eq!(flags, AcquisitionFlags::ADC_OVERRANGE | AcquisitionFlags::ADC_DATA_LOST);
        let flags = AcquisitionFlags::from_iq_status(0b1010);
        assert_eq!(flags, AcquisitionFlags::REF_OSC_UNLOCK | AcquisitionFlags::DATA_XFER_ERROR);
        let flags = AcquisitionFlags::from_stream_status(0x15_0000);
        assert_eq!(
            flags,
            AcquisitionFlags::ADC_OVERRANGE
                | AcquisitionFlags::INPUT_BUFFER_HIGH
                | AcquisitionFlags::OUTPUT_BUFFER_HIGH
        );
        // Only the sticky half counts
        assert!(AcquisitionFlags::from_stream_status(0x15).is_empty());
    }

    #[test]
    fn test_sample_ticks() {
        assert_eq!(sample_ticks(500, 14e6, 112_000_000), 4000);
        assert_eq!(sample_ticks(0, 56e6, 112_000_000), 0);
        assert_eq!(sample_ticks(10, 0.0, 112_000_000), 0);
    }

    #[test]
    fn test_block_length() {
        assert_eq!(block_length(1000, 24, 2048).unwrap(), 1024);
        assert!(block_length(1, 0, 2048).is_err());
        assert!(block_length(1000, -1, 2048).is_err());
        assert!(block_length(2048, 1, 2048).is_err());
        assert!(block_length(i32::MAX, 1, i32::MAX).is_err());
    }

    #[test]
    fn test_spectrum_pushes_desired_first() {
        let (session, control) = connected();
        let result = session.acquire_spectrum().unwrap();
        assert_eq!(result.len, 801);
        assert_eq!(control.call_count(NativeCall::SpectrumSetSettings), 1);
        session.acquire_spectrum().unwrap();
        assert_eq!(control.call_count(NativeCall::SpectrumSetSettings), 1);
        assert!(!control.is_running());
    }

    #[test]
    fn test_staged_config_is_pushed_by_next_acquisition() {
        let (session, control) = connected();
        let config = AcquisitionConfig::builder()
            .center_frequency(915e6)
            .trace_length(1601)
            .build()
            .unwrap();
        session.stage(config).unwrap();
        let result = session.acquire_spectrum().unwrap();
        assert_eq!(result.len, 1601);
        assert_eq!(control.center_freq(), 915e6);
    }

    #[test]
    fn test_short_transfer_is_mismatch() {
        let (session, control) = connected();
        control.set_short_transfer(1);
        let err = session.acquire_iq_block(1024).unwrap_err();
        assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::BufferSizeMismatch));
        assert!(!control.is_running());
        assert_eq!(session.status().state, SessionState::Connected);
    }

    #[test]
    fn test_iq_block_sets_record_length() {
        let (session, control) = connected();
        let result = session.acquire_iq_block(4096).unwrap();
        let block = result.iq().unwrap();
        assert_eq!(block.i.len(), 4096);
        assert_eq!(block.to_complex().len(), 4096);
        assert_eq!(session.status().applied.unwrap().iq_record_length, 4096);
        assert_eq!(session.desired_config().unwrap().iq_record_length, 1024);

        // Same length again needs no native call
        let sets = control.call_count(NativeCall::IqblkSetIQRecordLength);
        session.acquire_iq_block(4096).unwrap();
        assert_eq!(control.call_count(NativeCall::IqblkSetIQRecordLength), sets);
    }

    #[test]
    fn test_override_cleared_by_configure() {
        let (session, control) = connected();
        session.acquire_iq_block(4096).unwrap();
        let applied = session
            .configure(AcquisitionConfig::builder().iq_record_length(2048).build().unwrap())
            .unwrap();
        assert_eq!(applied.iq_record_length, 2048);

        // Nothing left to restore
        let sets = control.call_count(NativeCall::IqblkSetIQRecordLength);
        session.acquire_spectrum().unwrap();
        assert_eq!(control.call_count(NativeCall::IqblkSetIQRecordLength), sets);
    }

    #[test]
    fn test_iq_block_length_bounds() {
        let (session, _) = connected();
        let err = session.acquire_iq_block(1).unwrap_err();
        assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));
    }

    #[test]
    fn test_iq_system_error_is_native_fault() {
        let (session, control) = connected();
        control.set_iq_status(sys::IQBLK_STATUS_ACQ_SYS_ERROR);
        let err = session.acquire_iq_block(256).unwrap_err();
        assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::NativeFault));
    }

    #[test]
    fn test_overrange_is_metadata() {
        let (session, control) = connected();
        control.set_trace_status(sys::AcqDataStatus_ADC_OVERRANGE as u16);
        control.set_over_temperature(true);
        let result = session.acquire_spectrum().unwrap();
        assert!(result.flags.contains(AcquisitionFlags::ADC_OVERRANGE | AcquisitionFlags::OVER_TEMPERATURE));
        assert!(!result.is_clean());
    }

    #[test]
    fn test_frame_buffer_is_released() {
        let (session, control) = connected();
        let result = session.acquire_frame_buffer().unwrap();
        let frame = result.frame().unwrap();
        assert_eq!(frame.bitmap.len(), frame.width * frame.height);
        assert_eq!(frame.line(0).map(<[u8]>::len), Some(frame.width));
        assert!(frame.line(frame.height).is_none());
        assert!(!control.frame_held());
        assert!(!control.is_running());
    }

    #[test]
    fn test_frame_released_on_transfer_failure() {
        let (session, control) = connected();
        control.inject(NativeCall::DpxGetFrameBuffer, crate::status::ReturnStatus::DSPLError);
        let err = session.acquire_frame_buffer().unwrap_err();
        assert_eq!(err.class(), ErrorClass::Acquisition);
        assert_eq!(control.call_count(NativeCall::DpxFinishFrameBuffer), 1);
    }

    #[test]
    fn test_health_check() {
        let (session, control) = connected();
        assert!(session.health_check(1000));
        control.set_short_transfer(5);
        assert!(!session.health_check(1000));
    }

    #[test]
    fn test_peak_bin() {
        let sweep = SpectrumSweep {
            values: vec![-80.0, -30.0, -75.0],
            start_frequency_hz: 1e6,
            stop_frequency_hz: 3e6,
            frequency_step_hz: 1e6,
            rbw_hz: 1e3,
            unit: VerticalUnit::Dbm,
            detector: SpectrumDetector::PosPeak,
        };
        assert_eq!(sweep.peak(), Some((1, -30.0)));
        assert_eq!(sweep.frequency(1), 2e6);
    }
}
