//! RSA Session Concurrency Test Suite
//!
//! Checks the single in-flight operation rule from both blocking threads
//! and the async capability surface.
//!
//! # Running
//!
//! ```bash
//! cargo test -p daq-driver-tekrsa --test concurrency
//! ```
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_busy_session_rejects` | Second caller gets SessionBusy while an acquisition waits |
//! | `test_status_during_acquisition` | `status()` answers and shows Armed mid-acquisition |
//! | `test_queued_caller_proceeds` | With a queue timeout the second caller runs afterwards |
//! | `test_async_capability_surface` | SignalAnalyzer end to end on tokio |
//! | `test_async_concurrent_callers` | Parallel async callers either succeed or see SessionBusy |

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use daq_driver_tekrsa::api::{SimControl, SimulatedRsa};
use daq_driver_tekrsa::hal::{SignalAnalyzer, TekRsaAnalyzer};
use daq_driver_tekrsa::{
    AcquisitionConfig, ConnectionFault, DeviceSelector, DeviceSession, SessionOptions,
    SessionState, TekRsaError,
};

fn shared_session(options: SessionOptions) -> (Arc<DeviceSession>, SimControl) {
    let sim = SimulatedRsa::new();
    let control = sim.control();
    let session = Arc::new(DeviceSession::new(sim, options));
    session.connect(DeviceSelector::Any).unwrap();
    (session, control)
}

/// Wait until the session reports Armed.
fn wait_for_armed(session: &DeviceSession) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !session.status().armed {
        assert!(Instant::now() < deadline, "session never armed");
        thread::sleep(Duration::from_millis(2));
    }
}

// =============================================================================
// Blocking callers
// =============================================================================

#[test]
fn test_busy_session_rejects() {
    let (session, control) = shared_session(SessionOptions::default());
    control.set_ready_delay(Duration::from_millis(400));

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.acquire_spectrum_within(Duration::from_secs(2)))
    };
    wait_for_armed(&session);

    let err = session.configure(AcquisitionConfig::default()).unwrap_err();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::SessionBusy));
    assert!(session.acquire_iq_block(128).unwrap_err().is_session_busy());

    let result = worker.join().unwrap().unwrap();
    assert_eq!(result.len, 801);
}

#[test]
fn test_status_during_acquisition() {
    let (session, control) = shared_session(SessionOptions::default());
    control.set_ready_delay(Duration::from_millis(300));

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.acquire_iq_block(1024))
    };
    wait_for_armed(&session);

    let started = Instant::now();
    let status = session.status();
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(status.state, SessionState::Armed);
    assert!(status.connected);

    worker.join().unwrap().unwrap();
    let status = session.status();
    assert_eq!(status.state, SessionState::Connected);
    assert!(!status.armed);
}

#[test]
fn test_queued_caller_proceeds() {
    let options = SessionOptions {
        queue_timeout: Duration::from_secs(2),
        ..SessionOptions::default()
    };
    let (session, control) = shared_session(options);
    control.set_ready_delay(Duration::from_millis(200));

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.acquire_spectrum())
    };
    wait_for_armed(&session);

    let config = AcquisitionConfig::builder().center_frequency(2.4e9).build().unwrap();
    let applied = session.configure(config).unwrap();
    assert_eq!(applied.center_frequency_hz, 2.4e9);
    worker.join().unwrap().unwrap();
}

// =============================================================================
// Async capability
// =============================================================================

#[tokio::test]
async fn test_async_capability_surface() {
    let session = Arc::new(DeviceSession::new(SimulatedRsa::new(), SessionOptions::default()));
    let analyzer = TekRsaAnalyzer::new(session);

    let found = analyzer.search().await.unwrap();
    analyzer.connect(DeviceSelector::from(&found[0])).await.unwrap();
    assert!(analyzer.status().connected);

    let config = AcquisitionConfig::builder()
        .center_frequency(2.4e9)
        .span(40e6)
        .reference_level(-10.0)
        .build()
        .unwrap();
    analyzer.configure(config).await.unwrap();

    assert_eq!(analyzer.acquire_spectrum().await.unwrap().len, 801);
    assert_eq!(analyzer.acquire_iq_block(2000).await.unwrap().len, 2000);
    assert_eq!(analyzer.acquire_iq_stream(2000, 100).await.unwrap().len, 2000);
    assert!(analyzer.acquire_frame_buffer().await.unwrap().frame().is_some());
    assert!(analyzer.healthy().await.unwrap());

    analyzer.disconnect().await.unwrap();
    analyzer.disconnect().await.unwrap();

    let err = analyzer.acquire_spectrum().await.unwrap_err();
    let err = err.downcast_ref::<TekRsaError>().unwrap();
    assert_eq!(err.connection_fault(), Some(ConnectionFault::NotConnected));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_concurrent_callers() {
    let (session, control) = shared_session(SessionOptions::default());
    control.set_ready_delay(Duration::from_millis(100));
    let analyzer = TekRsaAnalyzer::new(session);

    let results =
        futures::future::join_all((0..4).map(|_| analyzer.acquire_spectrum())).await;

    let mut completed = 0;
    for result in results {
        match result {
            Ok(r) => {
                assert_eq!(r.len, 801);
                completed += 1;
            }
            Err(e) => {
                let err = e.downcast_ref::<TekRsaError>().unwrap();
                assert!(err.is_session_busy(), "{err}");
            }
        }
    }
    assert!(completed >= 1);
    assert!(!analyzer.status().armed);
}
