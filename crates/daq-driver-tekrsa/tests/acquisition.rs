//! RSA Acquisition Test Suite
//!
//! End-to-end configure and acquire scenarios against the simulated
//! instrument.
//!
//! # Running
//!
//! ```bash
//! cargo test -p daq-driver-tekrsa --test acquisition
//! ```
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_end_to_end_spectrum` | search, connect, configure, acquire, disconnect |
//! | `test_config_round_trip` | Applied config reported by `status()` matches the request |
//! | `test_variant_gated_fields` | Attenuator/preamp rejected on RSA306B, prior config kept |
//! | `test_rejected_push_keeps_previous` | Device rejection rolls back to the last applied config |
//! | `test_failed_rollback_marks_stale` | Rollback also rejected: stale, applied kept, next acquisition re-pushes |
//! | `test_first_push_failure_is_stale` | Rejected first push with nothing to restore |
//! | `test_iq_block_length_is_not_configuration` | Per-block length leaves the configured length alone |
//! | `test_record_length_mismatch_marks_stale` | Instrument clamps the block length: stale, then re-pushed |
//! | `test_record_limit_follows_iq_bandwidth` | Narrow IQ bandwidth caps the block length before any native call |
//! | `test_iq_timeout_within_bound` | Never-ready IQ block times out on time and disarms |
//! | `test_zero_timeout_takes_ready_data` | A zero timeout still asks the instrument once |
//! | `test_align_before_acquire` | Per-acquisition alignment only when enabled and needed |
//! | `test_no_partial_buffers` | Short transfers fail in every mode |
//! | `test_iq_block_metadata` | Sample rate, bandwidth and complex view |
//! | `test_frame_buffer_axes` | Spectrogram dimensions and axes |
//! | `test_iq_block_skip` | Skipped samples shift length, trigger index and timestamp |
//! | `test_device_time` | Results carry the instrument timestamp as wall-clock time |

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use daq_driver_tekrsa::api::{NativeCall, SimulatedRsa};
use daq_driver_tekrsa::{
    AcquisitionConfig, AcquisitionFault, ConfigurationFault, DeviceSelector, DeviceSession,
    DeviceVariant, ErrorClass, ReturnStatus, SessionOptions, SessionState, TriggerConfig,
    TriggerMode,
};

fn connected(variant: DeviceVariant) -> (DeviceSession, daq_driver_tekrsa::api::SimControl) {
    let sim = SimulatedRsa::single(variant);
    let control = sim.control();
    let session = DeviceSession::new(sim, SessionOptions::default());
    session.connect(DeviceSelector::Any).unwrap();
    (session, control)
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn test_end_to_end_spectrum() {
    let session = DeviceSession::new(SimulatedRsa::new(), SessionOptions::default());

    let found = session.search().unwrap();
    assert_eq!(found.len(), 1);
    session.connect(&found[0]).unwrap();

    let config = AcquisitionConfig::builder()
        .center_frequency(2.4e9)
        .span(40e6)
        .reference_level(-10.0)
        .build()
        .unwrap();
    let applied = session.configure(config).unwrap();
    assert_eq!(applied.center_frequency_hz, 2.4e9);

    let result = session.acquire_spectrum().unwrap();
    let sweep = result.spectrum().unwrap();
    assert_eq!(result.len, 801);
    assert_eq!(sweep.values.len(), 801);
    assert!(result.is_clean(), "unexpected flags {:?}", result.flags);
    assert_eq!(result.center_frequency_hz, 2.4e9);
    assert!((sweep.start_frequency_hz - (2.4e9 - 20e6)).abs() < 1.0);
    assert!((sweep.stop_frequency_hz - (2.4e9 + 20e6)).abs() < 1.0);

    // The simulated tone sits in the middle bin
    let (peak_bin, _) = sweep.peak().unwrap();
    assert_eq!(peak_bin, 400);

    session.disconnect();
    assert_eq!(session.status().state, SessionState::Disconnected);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_round_trip() {
    let (session, _) = connected(DeviceVariant::Rsa507A);
    let config = AcquisitionConfig::builder()
        .center_frequency(915e6)
        .reference_level(-30.0)
        .span(10e6)
        .rbw(10e3)
        .trace_length(1601)
        .iq_bandwidth(20e6)
        .iq_record_length(8192)
        .attenuation(10.0)
        .preamp(true)
        .trigger(TriggerConfig {
            mode: TriggerMode::Triggered,
            if_power_level_dbm: -40.0,
            position_percent: 25.0,
            ..TriggerConfig::default()
        })
        .build()
        .unwrap();

    let applied = session.configure(config.clone()).unwrap();
    let status = session.status();
    let reported = status.applied.unwrap();
    assert_eq!(reported, applied);

    let limits = status.device.unwrap().spectrum_limits;
    assert!(reported.matches(&config, &limits), "{reported:?}");
    assert_eq!(reported.attenuation_db, Some(10.0));
    assert_eq!(reported.preamp, Some(true));
    assert_eq!(reported.trigger.mode, TriggerMode::Triggered);
    assert_eq!(reported.iq_record_length, 8192);
    assert!(!status.config_stale);
}

#[test]
fn test_variant_gated_fields() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    let base = AcquisitionConfig::builder().center_frequency(100e6).build().unwrap();
    let applied = session.configure(base).unwrap();

    let err = session
        .configure(AcquisitionConfig::builder().attenuation(20.0).build().unwrap())
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::UnsupportedOnVariant));

    let err = session
        .configure(
            AcquisitionConfig::builder()
                .reference_level(-30.0)
                .preamp(true)
                .build()
                .unwrap(),
        )
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::UnsupportedOnVariant));

    let err = session
        .configure(AcquisitionConfig::builder().center_frequency(7e9).build().unwrap())
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));

    assert_eq!(session.status().applied, Some(applied));
    assert_eq!(control.center_freq(), 100e6);
}

#[test]
fn test_rejected_push_keeps_previous() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    let first = session
        .configure(AcquisitionConfig::builder().center_frequency(433e6).build().unwrap())
        .unwrap();

    control.inject(NativeCall::IqblkSetIQBandwidth, ReturnStatus::IQStreamBandwidthOutOfRange);
    let err = session
        .configure(AcquisitionConfig::builder().center_frequency(868e6).build().unwrap())
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::Rejected));
    assert_eq!(err.record().call, Some(NativeCall::IqblkSetIQBandwidth));

    let status = session.status();
    assert_eq!(status.applied, Some(first));
    assert!(!status.config_stale);
    assert_eq!(control.center_freq(), 433e6);
}

#[test]
fn test_failed_rollback_marks_stale() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    let first = session
        .configure(AcquisitionConfig::builder().center_frequency(433e6).build().unwrap())
        .unwrap();
    let pushes = control.call_count(NativeCall::SpectrumSetSettings);

    // Both the new push and the restore are rejected
    control.inject(NativeCall::IqblkSetIQBandwidth, ReturnStatus::IQStreamBandwidthOutOfRange);
    control.inject(NativeCall::IqblkSetIQBandwidth, ReturnStatus::IQStreamBandwidthOutOfRange);
    let err = session
        .configure(AcquisitionConfig::builder().center_frequency(868e6).build().unwrap())
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::Rejected));

    let status = session.status();
    assert!(status.config_stale);
    assert_eq!(status.applied, Some(first));
    assert_eq!(session.desired_config().unwrap().center_frequency_hz, 433e6);
    assert_eq!(control.call_count(NativeCall::SpectrumSetSettings), pushes + 2);

    session.acquire_spectrum().unwrap();
    assert_eq!(control.call_count(NativeCall::SpectrumSetSettings), pushes + 3);
    assert!(!session.status().config_stale);
    assert_eq!(control.center_freq(), 433e6);
}

#[test]
fn test_first_push_failure_is_stale() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    control.inject(NativeCall::IqblkSetIQBandwidth, ReturnStatus::IQStreamBandwidthOutOfRange);
    let err = session
        .configure(AcquisitionConfig::builder().center_frequency(868e6).build().unwrap())
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::Rejected));

    let status = session.status();
    assert!(status.applied.is_none());
    assert!(status.config_stale);

    assert_eq!(session.acquire_spectrum().unwrap().len, 801);
    let status = session.status();
    assert!(!status.config_stale);
    assert!(status.applied.is_some());
}

#[test]
fn test_iq_block_length_is_not_configuration() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    session
        .configure(AcquisitionConfig::builder().iq_record_length(8192).build().unwrap())
        .unwrap();

    let result = session.acquire_iq_block(100).unwrap();
    assert_eq!(result.len, 100);
    assert_eq!(session.desired_config().unwrap().iq_record_length, 8192);
    assert_eq!(session.status().applied.unwrap().iq_record_length, 100);

    // Another kind of acquisition puts the configured length back
    let sets = control.call_count(NativeCall::IqblkSetIQRecordLength);
    session.acquire_spectrum().unwrap();
    assert_eq!(control.call_count(NativeCall::IqblkSetIQRecordLength), sets + 1);
    let status = session.status();
    assert_eq!(status.applied.unwrap().iq_record_length, 8192);
    assert!(!status.config_stale);
}

#[test]
fn test_record_length_mismatch_marks_stale() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    session.acquire_spectrum().unwrap();
    let pushes = control.call_count(NativeCall::SpectrumSetSettings);

    control.clamp_record_length(Some(3000));
    let err = session.acquire_iq_block(4096).unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::Rejected));
    let status = session.status();
    assert!(status.config_stale);
    assert_eq!(status.applied.unwrap().iq_record_length, 3000);
    assert!(!control.is_running());

    control.clamp_record_length(None);
    session.acquire_spectrum().unwrap();
    assert_eq!(control.call_count(NativeCall::SpectrumSetSettings), pushes + 1);
    let status = session.status();
    assert!(!status.config_stale);
    assert_eq!(status.applied.unwrap().iq_record_length, 1024);
}

#[test]
fn test_record_limit_follows_iq_bandwidth() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    let applied = session
        .configure(AcquisitionConfig::builder().iq_bandwidth(9_765.625).build().unwrap())
        .unwrap();
    assert_eq!(applied.max_iq_record_length, 27_343);

    let err = session
        .configure(
            AcquisitionConfig::builder()
                .iq_bandwidth(9_765.625)
                .iq_record_length(30_000)
                .build()
                .unwrap(),
        )
        .unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));

    let sets = control.call_count(NativeCall::IqblkSetIQRecordLength);
    let err = session.acquire_iq_block(30_000).unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));
    assert_eq!(control.call_count(NativeCall::IqblkSetIQRecordLength), sets);

    assert_eq!(session.acquire_iq_block(27_343).unwrap().len, 27_343);
}

// =============================================================================
// Timeouts and validation
// =============================================================================

#[test]
fn test_iq_timeout_within_bound() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    control.set_never_ready(true);

    let bound = Duration::from_millis(300);
    let started = Instant::now();
    let err = session.acquire_iq_block_within(1024, bound).unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::Timeout));
    assert!(elapsed >= bound, "returned early after {elapsed:?}");
    assert!(elapsed < bound + Duration::from_millis(250), "overran: {elapsed:?}");

    let status = session.status();
    assert_eq!(status.state, SessionState::Connected);
    assert!(!status.armed);
    assert!(!control.is_running());
}

#[test]
fn test_zero_timeout_takes_ready_data() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    session.acquire_spectrum().unwrap();
    let waits = control.call_count(NativeCall::SpectrumWaitForTraceReady);

    let result = session.acquire_spectrum_within(Duration::ZERO).unwrap();
    assert_eq!(result.len, 801);
    assert_eq!(control.call_count(NativeCall::SpectrumWaitForTraceReady), waits + 1);

    control.set_never_ready(true);
    let err = session.acquire_spectrum_within(Duration::ZERO).unwrap_err();
    assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::Timeout));
    assert_eq!(control.call_count(NativeCall::SpectrumWaitForTraceReady), waits + 2);
}

#[test]
fn test_align_before_acquire() {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let options = SessionOptions {
        align_before_acquire: true,
        ..SessionOptions::default()
    };
    let session = DeviceSession::new(sim, options);
    session.connect(DeviceSelector::Any).unwrap();
    let aligned = control.call_count(NativeCall::AlignRunAlignment);

    session.acquire_spectrum().unwrap();
    assert_eq!(control.call_count(NativeCall::AlignRunAlignment), aligned);

    control.set_alignment_needed(true);
    session.acquire_iq_block(1024).unwrap();
    assert_eq!(control.call_count(NativeCall::AlignRunAlignment), aligned + 1);
    session.acquire_iq_block(1024).unwrap();
    assert_eq!(control.call_count(NativeCall::AlignRunAlignment), aligned + 1);

    // Cold instruments acquire unaligned
    control.set_alignment_needed(true);
    control.set_warmed_up(false);
    session.acquire_spectrum().unwrap();
    assert_eq!(control.call_count(NativeCall::AlignRunAlignment), aligned + 1);

    // Off by default
    let (session, control) = connected(DeviceVariant::Rsa306B);
    control.set_alignment_needed(true);
    let aligned = control.call_count(NativeCall::AlignRunAlignment);
    session.acquire_spectrum().unwrap();
    assert_eq!(control.call_count(NativeCall::AlignRunAlignment), aligned);
}

#[test]
fn test_no_partial_buffers() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    control.set_short_transfer(1);

    for err in [
        session.acquire_spectrum().unwrap_err(),
        session.acquire_iq_block(2048).unwrap_err(),
        session.acquire_frame_buffer().unwrap_err(),
    ] {
        assert_eq!(err.class(), ErrorClass::Acquisition);
        assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::BufferSizeMismatch));
    }
    assert!(!control.is_running());

    control.set_short_transfer(0);
    let result = session.acquire_iq_block(2048).unwrap();
    assert_eq!(result.len, 2048);
}

// =============================================================================
// Payloads
// =============================================================================

#[test]
fn test_iq_block_metadata() {
    let (session, _) = connected(DeviceVariant::Rsa306B);
    session
        .configure(
            AcquisitionConfig::builder()
                .build()
                .unwrap()
                .with_iq_sample_rate(14.0e6)
                .unwrap(),
        )
        .unwrap();

    let result = session.acquire_iq_block(4000).unwrap();
    let block = result.iq().unwrap();
    assert_eq!(block.sample_rate, 14.0e6);
    assert_eq!(block.bandwidth_hz, 10.0e6);
    let samples = block.to_complex();
    assert_eq!(samples.len(), 4000);
    assert!(samples.iter().all(|s| s.norm() < 1.0));
    assert!(result.device_timestamp.is_some());
}

#[test]
fn test_frame_buffer_axes() {
    let (session, control) = connected(DeviceVariant::Rsa306B);
    session
        .configure(AcquisitionConfig::builder().center_frequency(1e9).span(20e6).build().unwrap())
        .unwrap();

    let result = session.acquire_frame_buffer().unwrap();
    let frame = result.frame().unwrap();
    assert_eq!(result.len, frame.width * frame.height);
    assert_eq!(frame.line_timestamps.len(), frame.height);
    assert_eq!(frame.start_frequency_hz, 990e6);
    assert_eq!(frame.stop_frequency_hz, 1010e6);
    assert!(frame.top_dbm > frame.bottom_dbm);
    assert!(!control.frame_held());

    // Spectrum after a frame still works
    assert_eq!(session.acquire_spectrum().unwrap().len, 801);
}

#[test]
fn test_iq_block_skip() {
    let (session, _) = connected(DeviceVariant::Rsa306B);
    session
        .configure(AcquisitionConfig::builder().iq_bandwidth(10e6).build().unwrap())
        .unwrap();
    let tick = session.status().device.unwrap().timestamp_rate / 100;

    let plain = session.acquire_iq_block(1000).unwrap();
    assert_eq!(plain.device_timestamp.unwrap() % tick, 0);

    let result = session.acquire_iq_block_skipping(1000, 500).unwrap();
    let block = result.iq().unwrap();
    assert_eq!(result.len, 1000);
    assert_eq!(block.i.len(), 1000);
    assert_eq!(block.q.len(), 1000);
    assert_eq!(block.trigger_index, 0);
    assert_eq!(session.status().applied.unwrap().iq_record_length, 1500);
    // 500 samples at 14 MS/s on a 112 MHz counter
    assert_eq!(result.device_timestamp.unwrap() % tick, 4000);

    let err = session.acquire_iq_block_skipping(1000, -1).unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));
    let err = session.acquire_iq_block_skipping(i32::MAX, 10).unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));
}

#[test]
fn test_device_time() {
    let (session, _) = connected(DeviceVariant::Rsa306B);
    for result in [
        session.acquire_spectrum().unwrap(),
        session.acquire_iq_block(1024).unwrap(),
    ] {
        let device_time = result.device_time.expect("device time");
        let drift = (result.captured_at - device_time).num_seconds().abs();
        assert!(drift < 5, "device time {device_time} vs {}", result.captured_at);
    }
    let frame = session.acquire_frame_buffer().unwrap();
    assert!(frame.device_time.is_none());

    // A user reference time moves every later result with it
    let reference: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
    session.set_reference_time(reference).unwrap();
    let result = session.acquire_spectrum().unwrap();
    let device_time = result.device_time.unwrap();
    assert!(device_time >= reference && device_time < reference + chrono::Duration::seconds(5));
    assert!(result.captured_at > Utc::now() - chrono::Duration::seconds(5));
}
