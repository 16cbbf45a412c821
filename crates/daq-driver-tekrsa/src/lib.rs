//! Safe Rust driver for Tektronix RSA real-time spectrum analyzers.
//!
//! This crate wraps the vendor `RSA_API` C library (through `rsa-api-sys`)
//! with typed calls, a single status-checking path, connection lifecycle
//! management and compound acquisition helpers.
//!
//! # Supported Hardware
//!
//! - RSA306, RSA306B
//! - RSA503A, RSA507A, RSA513A, RSA518A
//! - RSA603A, RSA607A
//!
//! # Architecture
//!
//! ## Native boundary
//! - [`api::RsaApi`] - one typed method per native function
//! - [`api::NativeRsa`] - implementation over the vendor library
//! - [`api::SimulatedRsa`] - in-process instrument model for tests and mock mode
//!
//! ## Status handling
//! - [`ReturnStatus`] - vendor status codes
//! - [`checker`] - the only place status codes become [`TekRsaError`]s
//!
//! ## Session
//! - [`DeviceSession`] - connect, configure, acquire, disconnect
//! - [`AcquisitionConfig`] / [`AppliedConfig`] - requested and device-reported settings
//! - [`AcquisitionResult`] - spectrum traces, IQ blocks and spectrogram frames
//! - [`stream`] - IQ streaming to disk for records longer than an IQ block
//!
//! ## Host integration
//! - [`SignalAnalyzer`] / [`TekRsaAnalyzer`] - async capability surface
//! - [`DriverConfig`] - TOML configuration
//!
//! # Example
//!
//! ```no_run
//! use daq_driver_tekrsa::{AcquisitionConfig, DeviceSelector, DeviceSession, SessionOptions};
//! use daq_driver_tekrsa::api::SimulatedRsa;
//!
//! # fn example() -> anyhow::Result<()> {
//! let session = DeviceSession::new(SimulatedRsa::new(), SessionOptions::default());
//! let found = session.search()?;
//! session.connect(&found[0])?;
//!
//! let config = AcquisitionConfig::builder()
//!     .center_frequency(2.4e9)
//!     .span(40e6)
//!     .reference_level(-10.0)
//!     .build()?;
//! session.configure(config)?;
//!
//! let result = session.acquire_spectrum()?;
//! println!("{} bins, flags {:?}", result.len, result.flags);
//!
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod api;
pub mod checker;
pub mod config;
pub mod device;
pub mod error;
pub mod factory;
pub mod hal;
pub mod session;
pub mod status;
pub mod stream;
pub mod types;

pub use acquisition::{
    AcquisitionFlags, AcquisitionResult, FrameBuffer, IqBlock, Payload, SpectrumSweep,
};
pub use checker::{WarningLog, WarningRecord};
pub use config::{
    AcquisitionConfig, AcquisitionConfigBuilder, AppliedConfig, SpectrogramConfig, TriggerConfig,
};
pub use device::{
    Capabilities, DeviceDescriptor, DeviceHandle, DeviceInfo, DeviceSelector, DeviceVariant,
};
pub use error::{
    AcquisitionFault, ConfigError, ConfigurationFault, ConnectionFault, ErrorClass, ErrorRecord,
    Result, TekRsaError,
};
pub use factory::DriverConfig;
pub use hal::{SignalAnalyzer, TekRsaAnalyzer};
pub use session::{DeviceSession, SessionOptions, SessionState, SessionStatus};
pub use status::ReturnStatus;
pub use types::{
    DeviceEvent, FrequencyReference, ReferenceTimeSource, SpectrumDetector, SpectrumWindow,
    StreamDataType, StreamDestination, TriggerMode, TriggerSource, TriggerTransition, VerticalUnit,
};
