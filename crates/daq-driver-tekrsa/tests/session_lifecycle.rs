//! RSA Session Lifecycle Test Suite
//!
//! Drives [`DeviceSession`] against the simulated instrument through search,
//! connect, disconnect and device loss.
//!
//! # Running
//!
//! ```bash
//! cargo test -p daq-driver-tekrsa --test session_lifecycle
//! ```
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_disconnect_is_idempotent` | Disconnect with and without a connection |
//! | `test_search_connect_disconnect` | Basic lifecycle and status snapshot |
//! | `test_selector_resolution` | Any / Id / Serial / Descriptor selection |
//! | `test_usb_loss_and_reconnect` | Device loss forces Disconnected, reconnect resumes |
//! | `test_replug_fault_is_fatal` | Reset-class codes end the session |
//! | `test_calls_require_connection` | Operations fail NotConnected before connect |

use daq_driver_tekrsa::api::{NativeCall, SimDevice, SimulatedRsa};
use daq_driver_tekrsa::{
    AcquisitionConfig, ConnectionFault, DeviceSelector, DeviceSession, DeviceVariant, ErrorClass,
    ReturnStatus, SessionOptions, SessionState,
};

fn session_with(sim: SimulatedRsa) -> DeviceSession {
    DeviceSession::new(sim, SessionOptions::default())
}

// =============================================================================
// Disconnect
// =============================================================================

#[test]
fn test_disconnect_is_idempotent() {
    let session = session_with(SimulatedRsa::new());

    session.disconnect();
    session.disconnect();
    assert_eq!(session.status().state, SessionState::Disconnected);

    session.connect(DeviceSelector::Any).unwrap();
    session.disconnect();
    session.disconnect();
    let status = session.status();
    assert_eq!(status.state, SessionState::Disconnected);
    assert!(!status.connected);
    assert!(!status.armed);
    assert!(status.handle.is_none());
}

// =============================================================================
// Search and connect
// =============================================================================

#[test]
fn test_search_connect_disconnect() {
    let sim = SimulatedRsa::single(DeviceVariant::Rsa507A);
    let control = sim.control();
    let session = session_with(sim);

    let found = session.search().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].variant, DeviceVariant::Rsa507A);

    let handle = session.connect(&found[0]).unwrap();
    let status = session.status();
    assert_eq!(status.state, SessionState::Connected);
    assert!(status.connected);
    assert_eq!(status.handle, Some(handle));
    let info = status.device.unwrap();
    assert_eq!(info.serial_number, found[0].serial);
    assert!(info.supports(daq_driver_tekrsa::Capabilities::ATTENUATOR));
    assert_eq!(control.connected_serial().as_deref(), Some(found[0].serial.as_str()));

    session.disconnect();
    assert!(control.connected_serial().is_none());
}

#[test]
fn test_selector_resolution() {
    let devices = vec![
        SimDevice::new(0, "B010001", DeviceVariant::Rsa306B),
        SimDevice::new(1, "B020002", DeviceVariant::Rsa607A),
    ];
    let session = session_with(SimulatedRsa::with_devices(devices));

    let err = session.connect(DeviceSelector::Any).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::ConnectFailed));

    let err = session.connect(DeviceSelector::Serial("NOPE".into())).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::NoDeviceFound));

    let handle = session.connect(DeviceSelector::Id(1)).unwrap();
    assert_eq!(handle.device_id(), 1);
    assert_eq!(session.status().device.unwrap().variant, DeviceVariant::Rsa607A);

    // Same instrument by serial is the same connection
    let again = session.connect(DeviceSelector::Serial("B020002".into())).unwrap();
    assert_eq!(again, handle);

    let err = session.connect(DeviceSelector::Id(0)).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::DeviceBusy));
}

// =============================================================================
// Device loss
// =============================================================================

#[test]
fn test_usb_loss_and_reconnect() {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let session = session_with(sim);

    let first = session.connect(DeviceSelector::Any).unwrap();
    session.acquire_spectrum().unwrap();

    control.unplug();
    let err = session.acquire_spectrum().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Connection);
    assert!(err.is_device_lost());

    let status = session.status();
    assert_eq!(status.state, SessionState::Disconnected);
    assert_eq!(status.last_fault, Some(err));

    let err = session.acquire_spectrum().unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::NotConnected));

    control.replug();
    let second = session.connect(DeviceSelector::Any).unwrap();
    assert_ne!(first, second);
    assert!(session.status().last_fault.is_none());

    let result = session.acquire_spectrum().unwrap();
    assert_eq!(result.len, 801);
}

#[test]
fn test_replug_fault_is_fatal() {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let session = session_with(sim);
    session.connect(DeviceSelector::Any).unwrap();

    control.inject(NativeCall::DeviceRun, ReturnStatus::DisconnectedIOBeginTransfer);
    let err = session.acquire_spectrum().unwrap_err();
    assert!(err.requires_replug());
    assert!(err.to_string().contains("reset requires physical USB replug"));
    assert_eq!(session.status().state, SessionState::Disconnected);
}

#[test]
fn test_calls_require_connection() {
    let session = session_with(SimulatedRsa::new());

    let err = session.configure(AcquisitionConfig::default()).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::NotConnected));
    let err = session.acquire_iq_block(1024).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::NotConnected));
    assert!(session.over_temperature().is_err());

    // Staging works offline and is validated locally
    session.stage(AcquisitionConfig::default()).unwrap();
    assert!(session
        .stage(AcquisitionConfig {
            reference_level_dbm: 99.0,
            ..AcquisitionConfig::default()
        })
        .is_err());
}
