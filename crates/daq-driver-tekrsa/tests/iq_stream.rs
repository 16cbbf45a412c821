//! RSA IQ Streaming Test Suite
//!
//! Streams to scratch SIQ files through the simulated instrument and checks
//! the file-length choice, status decoding and clean shutdown.
//!
//! # Running
//!
//! ```bash
//! cargo test -p daq-driver-tekrsa --test iq_stream
//! ```
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_stream_narrow_bandwidth` | Skip, sample rate, timestamps and the native call sequence |
//! | `test_stream_overflow_is_native_fault` | Buffer overflow loses data and fails the acquisition |
//! | `test_stream_warnings_are_flags` | Overrange and 75% buffer fill come back as flags |
//! | `test_stream_timeout_stops` | A write that never completes times out and still stops |
//! | `test_stream_short_file` | Fewer samples on disk than requested is a size mismatch |
//! | `test_stream_validation` | Zero length and disconnected sessions are rejected |

use std::time::{Duration, Instant};

use daq_driver_tekrsa::api::{NativeCall, SimControl, SimulatedRsa};
use daq_driver_tekrsa::{
    AcquisitionConfig, AcquisitionFault, AcquisitionFlags, ConfigurationFault, ConnectionFault,
    DeviceSelector, DeviceSession, SessionOptions, SessionState,
};

const NARROW_BANDWIDTH: f64 = 9_765.625;
const NARROW_SAMPLE_RATE: f64 = 13_671.875;

fn connected() -> (DeviceSession, SimControl) {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let session = DeviceSession::new(sim, SessionOptions::default());
    session.connect(DeviceSelector::Any).unwrap();
    (session, control)
}

fn narrow(session: &DeviceSession) {
    session
        .configure(
            AcquisitionConfig::builder()
                .center_frequency(1.5e9)
                .iq_bandwidth(NARROW_BANDWIDTH)
                .build()
                .unwrap(),
        )
        .unwrap();
}

// =============================================================================
// Successful streams
// =============================================================================

#[test]
fn test_stream_narrow_bandwidth() {
    let (session, control) = connected();
    narrow(&session);

    let result = session.acquire_iq_stream(1000, 100).unwrap();
    let block = result.iq().unwrap();
    assert_eq!(result.len, 1000);
    assert_eq!(block.i.len(), 1000);
    assert_eq!(block.q.len(), 1000);
    assert_eq!(block.sample_rate, NARROW_SAMPLE_RATE);
    assert_eq!(block.bandwidth_hz, NARROW_BANDWIDTH);
    assert_eq!(block.trigger_index, 0);
    assert_eq!(result.center_frequency_hz, 1.5e9);
    assert!(result.is_clean(), "unexpected flags {:?}", result.flags);
    assert!(block.to_complex().iter().all(|s| s.norm() < 1.0));

    // 100 skipped samples at 13.671875 kS/s on a 112 MHz counter
    let tick = session.status().device.unwrap().timestamp_rate / 100;
    assert_eq!(result.device_timestamp.unwrap() % tick, 819_200);
    assert!(result.device_time.is_some());

    for call in [
        NativeCall::IqstreamSetAcqBandwidth,
        NativeCall::IqstreamSetOutputConfiguration,
        NativeCall::IqstreamSetDiskFilenameBase,
        NativeCall::IqstreamSetDiskFilenameSuffix,
        NativeCall::IqstreamSetDiskFileLength,
        NativeCall::IqstreamClearAcqStatus,
        NativeCall::IqstreamStart,
        NativeCall::IqstreamStop,
        NativeCall::IqstreamGetDiskFileInfo,
    ] {
        assert_eq!(control.call_count(call), 1, "{}", call.name());
    }
    assert!(!control.is_streaming());
    assert!(!control.is_running());
    assert_eq!(session.status().state, SessionState::Connected);

    // Block acquisitions still work afterwards
    assert_eq!(session.acquire_iq_block(2048).unwrap().len, 2048);
}

#[test]
fn test_stream_warnings_are_flags() {
    let (session, control) = connected();

    control.set_stream_status(0x1_0000);
    let result = session.acquire_iq_stream(2000, 0).unwrap();
    assert_eq!(result.len, 2000);
    assert!(result.flags.contains(AcquisitionFlags::ADC_OVERRANGE));
    assert_eq!(result.status_word, 0x1_0000);

    control.set_stream_status(0x4_0000);
    let result = session.acquire_iq_stream(2000, 0).unwrap();
    assert_eq!(result.flags, AcquisitionFlags::INPUT_BUFFER_HIGH);
    assert!(!result.is_clean());

    control.set_stream_status(0x10_0000);
    let result = session.acquire_iq_stream(2000, 0).unwrap();
    assert_eq!(result.flags, AcquisitionFlags::OUTPUT_BUFFER_HIGH);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_stream_overflow_is_native_fault() {
    let (session, control) = connected();
    control.set_stream_status(0x8_0000);

    let err = session.acquire_iq_stream(2000, 0).unwrap_err();
    assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::NativeFault));
    assert_eq!(err.record().call, Some(NativeCall::IqstreamGetDiskFileInfo));
    assert!(!control.is_streaming());
    assert!(!control.is_running());
    assert_eq!(session.status().state, SessionState::Connected);

    // Output overflow and USB discontinuity lose data too
    for status in [0x20_0000, 0x2_0000] {
        control.set_stream_status(status);
        let err = session.acquire_iq_stream(2000, 0).unwrap_err();
        assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::NativeFault));
    }

    control.set_stream_status(0);
    assert_eq!(session.acquire_iq_stream(2000, 0).unwrap().len, 2000);
}

#[test]
fn test_stream_timeout_stops() {
    let (session, control) = connected();
    control.set_never_ready(true);

    let bound = Duration::from_millis(200);
    let started = Instant::now();
    let err = session.acquire_iq_stream_within(1000, 0, bound).unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::Timeout));
    assert!(elapsed >= bound, "returned early after {elapsed:?}");
    assert!(elapsed < bound + Duration::from_millis(300), "overran: {elapsed:?}");
    assert_eq!(control.call_count(NativeCall::IqstreamStop), 1);
    assert!(!control.is_streaming());
    assert!(!session.status().armed);
}

#[test]
fn test_stream_short_file() {
    let (session, control) = connected();
    narrow(&session);
    control.set_short_transfer(10);

    let err = session.acquire_iq_stream(1000, 100).unwrap_err();
    assert_eq!(err.acquisition_fault(), Some(AcquisitionFault::BufferSizeMismatch));
    assert_eq!(control.call_count(NativeCall::IqstreamStop), 1);
}

#[test]
fn test_stream_validation() {
    let (session, control) = connected();
    let err = session.acquire_iq_stream(0, 10).unwrap_err();
    assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));
    assert_eq!(control.call_count(NativeCall::IqstreamStart), 0);

    session.disconnect();
    let err = session.acquire_iq_stream(1000, 0).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::NotConnected));
}
