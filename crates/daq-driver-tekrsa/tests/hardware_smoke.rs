//! RSA Hardware Smoke Test
//!
//! Runs against a real instrument through the vendor library.
//!
//! # Running
//!
//! ```bash
//! export TEKRSA_HARDWARE_TEST=1
//! # optional: pick an instrument
//! export TEKRSA_SERIAL=B012345
//! cargo test -p daq-driver-tekrsa --features hardware --test hardware_smoke -- --ignored --nocapture
//! ```

#![cfg(feature = "hardware")]

use daq_driver_tekrsa::{AcquisitionConfig, DeviceSelector, DeviceSession, DriverConfig};

fn hardware_enabled() -> bool {
    std::env::var("TEKRSA_HARDWARE_TEST").is_ok()
}

fn selector() -> DeviceSelector {
    std::env::var("TEKRSA_SERIAL")
        .map(DeviceSelector::Serial)
        .unwrap_or(DeviceSelector::Any)
}

#[test]
#[ignore]
fn test_hardware_spectrum_and_iq() {
    if !hardware_enabled() {
        println!("TEKRSA_HARDWARE_TEST not set; skipping");
        return;
    }

    let session = DeviceSession::from_config(&DriverConfig::default()).unwrap();
    let found = session.search().unwrap();
    println!("found {found:?}");
    session.connect(selector()).unwrap();
    println!("connected: {:?}", session.status().device);

    let config = AcquisitionConfig::builder()
        .center_frequency(1e9)
        .span(40e6)
        .reference_level(0.0)
        .build()
        .unwrap();
    let applied = session.configure(config).unwrap();
    println!("applied: {applied:?}");

    let spectrum = session.acquire_spectrum().unwrap();
    println!("spectrum: {} bins, flags {:?}", spectrum.len, spectrum.flags);
    assert_eq!(spectrum.len, applied.trace_length as usize);

    let iq = session.acquire_iq_block(4096).unwrap();
    assert_eq!(iq.len, 4096);

    let frame = session.acquire_frame_buffer().unwrap();
    println!("frame: {} values", frame.len);

    let stream = session.acquire_iq_stream(100_000, 1000).unwrap();
    println!("stream: {} samples at {:?}, flags {:?}", stream.len, stream.device_time, stream.flags);
    assert_eq!(stream.len, 100_000);

    session.disconnect();
}
