//! RSA Warning and Logging Test Suite
//!
//! Warning-class status codes must never fail a call; they are logged and
//! kept for `status()`.
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_warning_does_not_fail_acquisition` | ADC overrange warning passes data through |
//! | `test_warning_log_is_bounded` | Old warnings are evicted, totals keep counting |
//! | `test_connect_cycle_warning` | High connect counts log the replug hazard once |

use daq_driver_tekrsa::api::{NativeCall, SimulatedRsa};
use daq_driver_tekrsa::{DeviceSelector, DeviceSession, ReturnStatus, SessionOptions};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_warning_does_not_fail_acquisition() {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let session = DeviceSession::new(sim, SessionOptions::default());
    session.connect(DeviceSelector::Any).unwrap();
    assert!(session.status().last_warning.is_none());

    control.inject(NativeCall::SpectrumGetTrace, ReturnStatus::ADCOverrange);
    let result = session.acquire_spectrum().unwrap();
    assert_eq!(result.len, 801);

    let status = session.status();
    let warning = status.last_warning.unwrap();
    assert_eq!(warning.call, NativeCall::SpectrumGetTrace);
    assert_eq!(warning.status, ReturnStatus::ADCOverrange);
    assert_eq!(status.warning_count, 1);
    assert!(logs_contain("RSA_API warning"));
    assert!(logs_contain("SPECTRUM_GetTrace"));
}

#[test]
fn test_warning_log_is_bounded() {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let options = SessionOptions {
        warning_log_capacity: 2,
        ..SessionOptions::default()
    };
    let session = DeviceSession::new(sim, options);
    session.connect(DeviceSelector::Any).unwrap();

    for _ in 0..3 {
        control.inject(NativeCall::IqblkGetIQAcqInfo, ReturnStatus::OscUnlock);
        session.acquire_iq_block(512).unwrap();
    }

    assert_eq!(session.warnings().recent().len(), 2);
    assert_eq!(session.status().warning_count, 3);
}

#[traced_test]
#[test]
fn test_connect_cycle_warning() {
    let options = SessionOptions {
        connect_cycle_warning: 1,
        ..SessionOptions::default()
    };
    let session = DeviceSession::new(SimulatedRsa::new(), options);
    for _ in 0..3 {
        session.connect(DeviceSelector::Any).unwrap();
        session.disconnect();
    }
    assert!(logs_contain("connect cycle count is high"));
    logs_assert(|lines: &[&str]| {
        match lines
            .iter()
            .filter(|line| line.contains("connect cycle count is high"))
            .count()
        {
            1 => Ok(()),
            n => Err(format!("expected one cycle warning, saw {n}")),
        }
    });
}
