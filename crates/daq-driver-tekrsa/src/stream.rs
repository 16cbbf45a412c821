//! IQ streaming to disk.
//!
//! Records a fixed number of IQ samples through the `IQSTREAM_*` interface,
//! which sustains the full real-time bandwidth for longer than an IQ block
//! can hold. The stream is written as split SIQ files (`.siqh` header and
//! `.siqd` raw float pairs) into a scratch directory that is removed once
//! the samples are read back.
//!
//! # Sequence
//!
//! 1. set the stream bandwidth from the configured IQ bandwidth and read
//!    back the actual bandwidth and sample rate
//! 2. choose the file length: `max(1, ceil(1000 * (n + skip) / rate))` ms
//! 3. clear the status, arm, start streaming
//! 4. poll the write status until the file is complete or the deadline
//!    (file length + caller timeout) passes
//! 5. `IQSTREAM_Stop`, always
//! 6. decode `acqStatus`: overflow or discontinuity is data loss and fails
//!    the acquisition; overrange and buffer-fill warnings become flags
//!
//! The first `skip` samples are dropped and the result holds exactly `n`.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use rsa_api_sys as sys;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::acquisition::{
    applied, check_len, device_time, sample_ticks, timed_out, AcquisitionFlags, AcquisitionResult,
    IqBlock, Mode, Payload,
};
use crate::api::NativeCall;
use crate::error::{AcquisitionFault, ErrorRecord, Result, TekRsaError};
use crate::session::{DeviceSession, Inner};
use crate::types::{StreamDataType, StreamDestination};

const FILE_BASE: &str = "iqstream";
const BYTES_PER_SAMPLE: usize = 8;

/// Sticky `acqStatus` bits that mean samples are missing from the file.
const DATA_LOST: u32 = sys::IQSTRM_STATUS_XFER_DISCONTINUITY
    | sys::IQSTRM_STATUS_IBUFFOVFLOW
    | sys::IQSTRM_STATUS_OBUFFOVFLOW;

/// True when a streaming `acqStatus` word reports lost samples.
pub fn stream_data_lost(status: u32) -> bool {
    (status >> sys::IQSTRM_STATUS_STICKY_SHIFT) & DATA_LOST != 0
}

/// File length in milliseconds covering `samples` at `sample_rate`.
pub fn stream_duration_ms(samples: usize, sample_rate: f64) -> i32 {
    if sample_rate <= 0.0 {
        return 1;
    }
    let ms = (1000.0 * samples as f64 / sample_rate).ceil();
    if ms >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        (ms as i32).max(1)
    }
}

/// Decode interleaved little-endian `f32` I/Q pairs.
fn parse_siq_data(bytes: &[u8]) -> (Vec<f32>, Vec<f32>) {
    let pairs = bytes.len() / BYTES_PER_SAMPLE;
    let mut i = Vec::with_capacity(pairs);
    let mut q = Vec::with_capacity(pairs);
    for pair in bytes.chunks_exact(BYTES_PER_SAMPLE) {
        i.push(f32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]));
        q.push(f32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]));
    }
    (i, q)
}

fn scratch_fault(context: String) -> TekRsaError {
    TekRsaError::DriverFault {
        record: ErrorRecord::local(context),
    }
}

impl DeviceSession {
    /// Stream `n_samples` IQ samples after discarding the first `skip`,
    /// with the default acquisition timeout on top of the stream length.
    pub fn acquire_iq_stream(&self, n_samples: usize, skip: usize) -> Result<AcquisitionResult> {
        self.acquire_iq_stream_within(n_samples, skip, self.options().acquisition_timeout)
    }

    /// Stream `n_samples` IQ samples after discarding the first `skip`.
    ///
    /// The write may take the stream's own duration plus `timeout`.
    pub fn acquire_iq_stream_within(
        &self,
        n_samples: usize,
        skip: usize,
        timeout: Duration,
    ) -> Result<AcquisitionResult> {
        self.acquire(Mode::Stream { samples: n_samples, skip }, timeout)
    }

    pub(crate) fn iq_stream(
        &self,
        inner: &mut Inner,
        n: usize,
        skip: usize,
        timeout: Duration,
    ) -> Result<AcquisitionResult> {
        let applied = applied(inner)?;
        let total = n.checked_add(skip).ok_or_else(|| {
            TekRsaError::out_of_range(format!("IQ stream length {n} + {skip} overflows"))
        })?;

        let min = inner.api.call(|a| a.stream_min_bandwidth())?;
        let max = inner.api.call(|a| a.stream_max_bandwidth())?;
        let requested = applied.iq_bandwidth_hz;
        if !(min..=max).contains(&requested) {
            return Err(TekRsaError::out_of_range(format!(
                "IQ stream bandwidth {requested} Hz outside {min}..={max}"
            )));
        }
        inner
            .api
            .call(|a| a.stream_set_bandwidth(requested))
            .map_err(|e| e.with_args(requested.to_string()))?;
        let (bandwidth, sample_rate) = inner.api.call(|a| a.stream_acq_parameters())?;
        let duration_ms = stream_duration_ms(total, sample_rate);

        let dir = TempDir::new()
            .map_err(|e| scratch_fault(format!("creating IQ stream directory: {e}")))?;
        let base = dir.path().join(FILE_BASE);
        inner
            .api
            .call(|a| a.stream_set_output(StreamDestination::FileSiqSplit, StreamDataType::Single))?;
        inner
            .api
            .call(|a| a.stream_set_filename_base(&base))
            .map_err(|e| e.with_args(base.display().to_string()))?;
        inner
            .api
            .call(|a| a.stream_set_filename_suffix(sys::IQSSDFN_SUFFIX_NONE))?;
        inner
            .api
            .call(|a| a.stream_set_file_length(duration_ms))
            .map_err(|e| e.with_args(duration_ms.to_string()))?;
        inner.api.call(|a| a.stream_clear_status())?;

        inner.api.call(|a| a.spectrum_set_enable(false))?;
        inner.api.call(|a| a.dpx_set_enable(false))?;
        self.arm(inner)?;
        inner.api.call(|a| a.stream_start())?;
        debug!(samples = total, duration_ms, sample_rate, "IQ stream started");

        let deadline = Duration::from_millis(u64::try_from(duration_ms).unwrap_or(0)) + timeout;
        let written = self.wait_stream_written(inner, deadline);
        let stopped = inner.api.call(|a| a.stream_stop());
        match (written, stopped) {
            (Ok(()), Ok(())) => {}
            (Ok(()), Err(e)) => return Err(e),
            (Err(e), stopped) => {
                if let Err(stop) = stopped {
                    debug!(error = %stop, "Stopping IQ stream after failed write failed");
                }
                return Err(e);
            }
        }

        let info = inner.api.call(|a| a.stream_file_info())?;
        if stream_data_lost(info.acq_status) {
            warn!(status = info.acq_status, "IQ stream lost samples");
            return Err(TekRsaError::Acquisition {
                kind: AcquisitionFault::NativeFault,
                record: ErrorRecord {
                    call: Some(NativeCall::IqstreamGetDiskFileInfo),
                    status: None,
                    args: None,
                    context: format!(
                        "IQ stream overflow or discontinuity, samples lost (status {:#x})",
                        info.acq_status
                    ),
                },
            });
        }

        let (mut i, mut q) = read_stream_file(&base.with_extension("siqd"))?;
        check_len("IQ stream", i.len().min(total), total)?;
        i.truncate(total);
        q.truncate(total);
        i.drain(..skip);
        q.drain(..skip);

        let flags = AcquisitionFlags::from_stream_status(info.acq_status)
            | Self::over_temperature_flag(inner)?;
        let timestamp_rate = inner.info()?.timestamp_rate;
        let device_timestamp =
            Some(info.sample0_timestamp + sample_ticks(skip as u64, sample_rate, timestamp_rate));
        let device_time = device_time(inner, device_timestamp)?;

        Ok(AcquisitionResult {
            len: i.len(),
            payload: Payload::Iq(IqBlock {
                i,
                q,
                sample_rate,
                bandwidth_hz: bandwidth,
                trigger_index: info.trigger_sample_index.saturating_sub(skip as u64),
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

    fn wait_stream_written(&self, inner: &mut Inner, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let deadline = started + timeout;
        let poll = self.options().poll_interval;
        loop {
            let status = inner.api.call(|a| a.stream_write_status())?;
            if status.complete {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "IQ stream written");
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timed_out(NativeCall::IqstreamGetDiskFileWriteStatus, timeout));
            }
            thread::sleep(remaining.min(poll));
        }
    }
}

fn read_stream_file(path: &Path) -> Result<(Vec<f32>, Vec<f32>)> {
    let bytes = fs::read(path).map_err(|e| {
        TekRsaError::acquisition(
            AcquisitionFault::NativeFault,
            format!("reading IQ stream data {}: {e}", path.display()),
        )
    })?;
    Ok(parse_siq_data(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_covers_samples() {
        assert_eq!(stream_duration_ms(56_000, 56e6), 1);
        assert_eq!(stream_duration_ms(1, 56e6), 1);
        assert_eq!(stream_duration_ms(1100, 13_671.875), 81);
        assert_eq!(stream_duration_ms(0, 0.0), 1);
    }

    #[test]
    fn test_data_lost_uses_sticky_bits() {
        assert!(stream_data_lost(0x8_0000));
        assert!(stream_data_lost(0x20_0000));
        assert!(stream_data_lost(0x2_0000));
        assert!(!stream_data_lost(0x1_0000));
        assert!(!stream_data_lost(0x4_0000));
        // Non-sticky copies only describe the current instant.
        assert!(!stream_data_lost(sys::IQSTRM_STATUS_IBUFFOVFLOW));
    }

    #[test]
    fn test_parse_interleaved_pairs() {
        let mut bytes = Vec::new();
        for v in [1.0f32, -1.0, 0.5, 0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(0);
        let (i, q) = parse_siq_data(&bytes);
        assert_eq!(i, vec![1.0, 0.5]);
        assert_eq!(q, vec![-1.0, 0.25]);
    }
}
