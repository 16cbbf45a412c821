//! Async capability surface for host frameworks.
//!
//! [`SignalAnalyzer`] is what an orchestration layer programs against.
//! [`TekRsaAnalyzer`] implements it over a shared [`DeviceSession`], moving
//! every blocking driver call onto the tokio blocking pool.
//!
//! Errors are `anyhow::Error`; driver failures stay downcastable to
//! [`TekRsaError`](crate::error::TekRsaError):
//!
//! ```rust,ignore
//! use daq_driver_tekrsa::hal::{SignalAnalyzer, TekRsaAnalyzer};
//! use daq_driver_tekrsa::TekRsaError;
//!
//! let analyzer = TekRsaAnalyzer::new(session);
//! if let Err(e) = analyzer.acquire_spectrum().await {
//!     if let Some(TekRsaError::Connection { .. }) = e.downcast_ref::<TekRsaError>() {
//!         analyzer.connect(DeviceSelector::Any).await?;
//!     }
//! }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::acquisition::AcquisitionResult;
use crate::config::{AcquisitionConfig, AppliedConfig};
use crate::device::{DeviceDescriptor, DeviceHandle, DeviceSelector};
use crate::session::{DeviceSession, SessionStatus};

/// Default IQ block length for [`SignalAnalyzer::healthy`].
pub const HEALTH_CHECK_SAMPLES: i32 = 56_000;

/// Signal-analyzer capability.
#[async_trait]
pub trait SignalAnalyzer: Send + Sync {
    /// Enumerate attached supported instruments.
    async fn search(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open an instrument.
    async fn connect(&self, selector: DeviceSelector) -> Result<DeviceHandle>;

    /// Validate and apply a configuration.
    async fn configure(&self, config: AcquisitionConfig) -> Result<AppliedConfig>;

    /// Acquire one spectrum trace.
    async fn acquire_spectrum(&self) -> Result<AcquisitionResult>;

    /// Acquire a block of `n_samples` IQ samples.
    async fn acquire_iq_block(&self, n_samples: i32) -> Result<AcquisitionResult>;

    /// Acquire one spectrogram frame.
    async fn acquire_frame_buffer(&self) -> Result<AcquisitionResult>;

    /// Stream `n_samples` IQ samples after discarding the first `skip`.
    async fn acquire_iq_stream(&self, n_samples: usize, skip: usize) -> Result<AcquisitionResult>;

    /// Current session status. Does not wait for in-flight operations.
    fn status(&self) -> SessionStatus;

    /// Close the instrument. Idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Whether an IQ block comes back complete.
    async fn healthy(&self) -> Result<bool>;
}

/// [`SignalAnalyzer`] over a [`DeviceSession`].
#[derive(Debug, Clone)]
pub struct TekRsaAnalyzer {
    session: Arc<DeviceSession>,
}

impl TekRsaAnalyzer {
    /// Wrap a session.
    pub fn new(session: Arc<DeviceSession>) -> Self {
        Self { session }
    }

    /// Underlying session.
    pub fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DeviceSession) -> crate::error::Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        let value = tokio::task::spawn_blocking(move || op(&session))
            .await
            .context("RSA session task panicked or was cancelled")??;
        Ok(value)
    }
}

#[async_trait]
impl SignalAnalyzer for TekRsaAnalyzer {
    async fn search(&self) -> Result<Vec<DeviceDescriptor>> {
        self.blocking(DeviceSession::search).await
    }

    async fn connect(&self, selector: DeviceSelector) -> Result<DeviceHandle> {
        self.blocking(move |s| s.connect(selector)).await
    }

    async fn configure(&self, config: AcquisitionConfig) -> Result<AppliedConfig> {
        self.blocking(move |s| s.configure(config)).await
    }

    async fn acquire_spectrum(&self) -> Result<AcquisitionResult> {
        self.blocking(DeviceSession::acquire_spectrum).await
    }

    async fn acquire_iq_block(&self, n_samples: i32) -> Result<AcquisitionResult> {
        self.blocking(move |s| s.acquire_iq_block(n_samples)).await
    }

    async fn acquire_frame_buffer(&self) -> Result<AcquisitionResult> {
        self.blocking(DeviceSession::acquire_frame_buffer).await
    }

    async fn acquire_iq_stream(&self, n_samples: usize, skip: usize) -> Result<AcquisitionResult> {
        self.blocking(move |s| s.acquire_iq_stream(n_samples, skip)).await
    }

    fn status(&self) -> SessionStatus {
        self.session.status()
    }

    async fn disconnect(&self) -> Result<()> {
        self.blocking(|s| {
            s.disconnect();
            Ok(())
        })
        .await
    }

    async fn healthy(&self) -> Result<bool> {
        self.blocking(|s| Ok(s.health_check(HEALTH_CHECK_SAMPLES))).await
    }
}
