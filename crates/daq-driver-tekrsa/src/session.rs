//! Device Session.
//!
//! [`DeviceSession`] owns the adapter, the connection lifecycle and the
//! in-flight token. Every operation that touches the instrument takes the
//! token first; a caller that cannot get it within
//! [`SessionOptions::queue_timeout`] fails with `Connection/SessionBusy`.
//!
//! ```text
//! Disconnected ──search()──▶ Searching ──▶ Disconnected
//!      │                                        ▲
//!      └──connect()──▶ Connected ◀──▶ Armed     │
//!                          │    (acquire_*)     │
//!                          └──disconnect() / device lost
//! ```
//!
//! [`DeviceSession::status`] never takes the token. It reads a snapshot
//! that every transition republishes, so it answers even while an
//! acquisition is blocked waiting for data.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{EventStatus, RsaApi, TimePoint};
use crate::checker::{CheckedApi, WarningLog, WarningRecord, DEFAULT_WARNING_CAPACITY};
use crate::config::{self, AcquisitionConfig, AppliedConfig};
use crate::device::{DeviceDescriptor, DeviceHandle, DeviceInfo, DeviceSelector, DeviceVariant};
use crate::error::{ConnectionFault, Result, TekRsaError};
use crate::types::{DeviceEvent, ReferenceTimeSource};

/// Connects made by every session in this process.
static CONNECT_CYCLES: AtomicU64 = AtomicU64::new(0);

/// Number of successful connects in this process.
pub fn connect_cycles() -> u64 {
    CONNECT_CYCLES.load(Ordering::Relaxed)
}

/// Session tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Default data-ready timeout for the acquisition helpers
    pub acquisition_timeout: Duration,
    /// Length of each native blocking wait inside an acquisition
    pub poll_interval: Duration,
    /// How long a caller waits for the in-flight token; zero rejects at once
    pub queue_timeout: Duration,
    /// Run `CONFIG_Preset` after connecting
    pub preset_on_connect: bool,
    /// Run alignment after connecting when the instrument asks for it
    pub align_on_connect: bool,
    /// Check for needed alignment before every acquisition
    pub align_before_acquire: bool,
    /// Warnings retained for `status()`
    pub warning_log_capacity: usize,
    /// Process-wide connect count at which the replug hazard is logged; zero disables
    pub connect_cycle_warning: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            acquisition_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            queue_timeout: Duration::ZERO,
            preset_on_connect: true,
            align_on_connect: true,
            align_before_acquire: false,
            warning_log_capacity: DEFAULT_WARNING_CAPACITY,
            connect_cycle_warning: 500,
        }
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// No instrument open
    Disconnected,
    /// Enumerating instruments
    Searching,
    /// Instrument open and idle
    Connected,
    /// Instrument running an acquisition
    Armed,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub connected: bool,
    pub armed: bool,
    /// Most recent warning-class status
    pub last_warning: Option<WarningRecord>,
    /// Warnings seen since the session was created
    pub warning_count: u64,
    pub handle: Option<DeviceHandle>,
    pub device: Option<DeviceInfo>,
    /// Configuration the instrument last reported
    pub applied: Option<AppliedConfig>,
    /// Whether the instrument may hold settings other than `applied`
    pub config_stale: bool,
    /// Error that last forced the session to Disconnected
    pub last_fault: Option<TekRsaError>,
}

impl SessionStatus {
    fn disconnected() -> Self {
        Self {
            state: SessionState::Disconnected,
            connected: false,
            armed: false,
            last_warning: None,
            warning_count: 0,
            handle: None,
            device: None,
            applied: None,
            config_stale: false,
            last_fault: None,
        }
    }
}

pub(crate) struct Connection {
    pub(crate) handle: DeviceHandle,
    pub(crate) info: DeviceInfo,
}

/// State guarded by the in-flight token.
pub(crate) struct Inner {
    pub(crate) api: CheckedApi,
    pub(crate) connection: Option<Connection>,
    /// Configuration the helpers must run with
    pub(crate) desired: AcquisitionConfig,
    /// Configuration last pushed successfully in this connection
    pub(crate) pushed: Option<AcquisitionConfig>,
    pub(crate) applied: Option<AppliedConfig>,
    /// The instrument may hold a partially written configuration
    pub(crate) stale: bool,
    /// Record length set for one IQ block in place of the pushed one
    pub(crate) record_override: Option<i32>,
    generation: u64,
}

impl Inner {
    pub(crate) fn info(&self) -> Result<&DeviceInfo> {
        self.connection
            .as_ref()
            .map(|c| &c.info)
            .ok_or_else(not_connected)
    }

    pub(crate) fn needs_push(&self) -> bool {
        self.stale || self.pushed.as_ref() != Some(&self.desired)
    }

    /// Forget the instrument. The desired configuration survives and is
    /// pushed again after the next connect.
    fn clear_connection(&mut self) {
        self.connection = None;
        self.pushed = None;
        self.applied = None;
        self.stale = false;
        self.record_override = None;
    }
}

fn not_connected() -> TekRsaError {
    TekRsaError::connection(ConnectionFault::NotConnected, "no instrument connected")
}

/// Lifecycle owner for one RSA instrument.
pub struct DeviceSession {
    inner: Mutex<Inner>,
    snapshot: RwLock<SessionStatus>,
    warnings: Arc<WarningLog>,
    options: SessionOptions,
    cycle_warned: AtomicBool,
}

impl DeviceSession {
    /// Create a disconnected session over an adapter.
    pub fn new(api: impl RsaApi + 'static, options: SessionOptions) -> Self {
        let warnings = Arc::new(WarningLog::new(options.warning_log_capacity));
        Self {
            inner: Mutex::new(Inner {
                api: CheckedApi::new(Box::new(api), Arc::clone(&warnings)),
                connection: None,
                desired: AcquisitionConfig::default(),
                pushed: None,
                applied: None,
                stale: false,
                record_override: None,
                generation: 0,
            }),
            snapshot: RwLock::new(SessionStatus::disconnected()),
            warnings,
            options,
            cycle_warned: AtomicBool::new(false),
        }
    }

    /// Session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Shared warning log.
    pub fn warnings(&self) -> &Arc<WarningLog> {
        &self.warnings
    }

    /// Current status. Never blocks on an in-flight operation.
    pub fn status(&self) -> SessionStatus {
        let mut status = self.snapshot.read().clone();
        status.last_warning = self.warnings.last();
        status.warning_count = self.warnings.total();
        status
    }

    /// Handle of the connected instrument.
    pub fn handle(&self) -> Option<DeviceHandle> {
        self.snapshot.read().handle
    }

    /// Take the in-flight token.
    pub(crate) fn token(&self) -> Result<MutexGuard<'_, Inner>> {
        let guard = if self.options.queue_timeout.is_zero() {
            self.inner.try_lock()
        } else {
            self.inner.try_lock_for(self.options.queue_timeout)
        };
        guard.ok_or_else(|| {
            TekRsaError::connection(
                ConnectionFault::SessionBusy,
                "another operation is in progress on this session",
            )
        })
    }

    /// Republish the status snapshot from the guarded state.
    pub(crate) fn publish(&self, inner: &Inner, state: SessionState) {
        let mut snapshot = self.snapshot.write();
        snapshot.state = state;
        snapshot.connected = inner.connection.is_some();
        snapshot.armed = state == SessionState::Armed;
        snapshot.handle = inner.connection.as_ref().map(|c| c.handle);
        snapshot.device = inner.connection.as_ref().map(|c| c.info.clone());
        snapshot.applied = inner.applied.clone();
        snapshot.config_stale = inner.stale;
    }

    fn idle_state(inner: &Inner) -> SessionState {
        if inner.connection.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Drop the connection after a fatal error.
    fn lose_device(&self, inner: &mut Inner, fault: &TekRsaError) {
        warn!(error = %fault, "RSA instrument lost; session disconnected");
        if let Err(e) = inner.api.call(|a| a.disconnect()) {
            debug!(error = %e, "Disconnect after device loss failed");
        }
        inner.clear_connection();
        self.snapshot.write().last_fault = Some(fault.clone());
        self.publish(inner, SessionState::Disconnected);
    }

    /// Apply the fatal-error rule to an operation result.
    pub(crate) fn settle<T>(&self, inner: &mut Inner, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() && inner.connection.is_some() {
                self.lose_device(inner, e);
            }
        }
        result
    }

    /// Run `op` on a connected instrument under the token.
    fn with_device<T>(&self, op: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut inner = self.token()?;
        inner.info()?;
        let result = op(&mut inner);
        self.settle(&mut inner, result)
    }

    fn search_inner(&self, inner: &mut Inner) -> Result<Vec<DeviceDescriptor>> {
        let found = inner.api.call(|a| a.search())?;
        let total = found.len();
        let supported: Vec<DeviceDescriptor> = found
            .into_iter()
            .filter_map(DeviceDescriptor::from_found)
            .collect();
        info!(found = total, supported = supported.len(), "RSA search complete");
        if supported.is_empty() {
            return Err(TekRsaError::connection(
                ConnectionFault::NoDeviceFound,
                "no supported RSA instrument attached",
            ));
        }
        Ok(supported)
    }

    /// Enumerate attached supported instruments.
    pub fn search(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut inner = self.token()?;
        let idle = Self::idle_state(&inner);
        if idle == SessionState::Disconnected {
            self.publish(&inner, SessionState::Searching);
        }
        let result = self.search_inner(&mut inner);
        self.publish(&inner, idle);
        result
    }

    /// Open an instrument.
    ///
    /// Connecting again to the instrument that is already open returns its
    /// handle; any other instrument fails with `Connection/DeviceBusy`.
    pub fn connect(&self, selector: impl Into<DeviceSelector>) -> Result<DeviceHandle> {
        let selector = selector.into();
        let mut inner = self.token()?;

        if let Some(current) = &inner.connection {
            return if selects(&selector, current) {
                Ok(current.handle)
            } else {
                Err(TekRsaError::connection(
                    ConnectionFault::DeviceBusy,
                    format!(
                        "session is connected to {}; disconnect first",
                        current.info.serial_number
                    ),
                ))
            };
        }

        self.publish(&inner, SessionState::Searching);
        let result = self.open(&mut inner, &selector);
        match &result {
            Ok(_) => {
                self.snapshot.write().last_fault = None;
                self.publish(&inner, SessionState::Connected);
            }
            Err(_) => self.publish(&inner, SessionState::Disconnected),
        }
        result
    }

    fn open(&self, inner: &mut Inner, selector: &DeviceSelector) -> Result<DeviceHandle> {
        let candidates = self.search_inner(inner)?;
        let target = resolve(selector, candidates)?;

        inner
            .api
            .call(|a| a.connect(target.id))
            .map_err(|e| e.with_args(target.id.to_string()))?;
        self.count_cycle();

        match self.initialize(inner, &target) {
            Ok(info) => {
                inner.generation += 1;
                let handle = DeviceHandle::new(target.id, inner.generation);
                info!(
                    serial = %info.serial_number,
                    model = %info.variant,
                    firmware = %info.firmware_version,
                    api = %info.api_version,
                    "Connected to RSA instrument"
                );
                inner.clear_connection();
                inner.connection = Some(Connection { handle, info });
                Ok(handle)
            }
            Err(e) => {
                warn!(serial = %target.serial, error = %e, "RSA post-connect setup failed; disconnecting");
                if let Err(cleanup) = inner.api.call(|a| a.disconnect()) {
                    warn!(error = %cleanup, "Disconnect after failed setup also failed");
                }
                Err(e)
            }
        }
    }

    fn count_cycle(&self) {
        let cycles = CONNECT_CYCLES.fetch_add(1, Ordering::Relaxed) + 1;
        let threshold = self.options.connect_cycle_warning;
        if threshold > 0 && cycles >= threshold && !self.cycle_warned.swap(true, Ordering::Relaxed) {
            warn!(
                cycles,
                "RSA connect cycle count is high; the driver may crash under long connect/disconnect cycling and only a physical USB replug recovers it"
            );
        }
    }

    /// Preset, align and fetch device information.
    fn initialize(&self, inner: &mut Inner, target: &DeviceDescriptor) -> Result<DeviceInfo> {
        let api = &mut inner.api;
        if self.options.preset_on_connect {
            api.call(|a| a.preset())?;
        }
        if self.options.align_on_connect {
            if api.call(|a| a.warmup_complete())? {
                if api.call(|a| a.alignment_needed())? {
                    info!(serial = %target.serial, "Running RSA alignment");
                    api.call(|a| a.run_alignment())?;
                }
            } else {
                info!(serial = %target.serial, "RSA not warmed up; skipping alignment");
            }
        }

        let native = api.call(|a| a.device_info())?;
        let variant = DeviceVariant::from_device_type(&native.nomenclature).unwrap_or(target.variant);
        let center_range = (
            api.call(|a| a.min_center_freq())?,
            api.call(|a| a.max_center_freq())?,
        );
        let limits = api.call(|a| a.spectrum_limits())?;
        let iq_range = (
            api.call(|a| a.iq_min_bandwidth())?,
            api.call(|a| a.iq_max_bandwidth())?,
        );
        let max_record = api.call(|a| a.iq_max_record_length())?;
        let timestamp_rate = api.call(|a| a.timestamp_rate())?;
        Ok(DeviceInfo::assemble(
            native,
            variant,
            center_range,
            limits,
            iq_range,
            max_record,
            timestamp_rate,
        ))
    }

    /// Close the instrument. Safe from any state; never fails.
    ///
    /// Waits for an in-flight operation to finish.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        self.disconnect_inner(&mut inner);
    }

    fn disconnect_inner(&self, inner: &mut Inner) {
        if let Some(connection) = &inner.connection {
            let serial = connection.info.serial_number.clone();
            if let Err(e) = inner.api.call(|a| a.stop()) {
                warn!(serial = %serial, error = %e, "Failed to stop RSA before disconnect");
            }
            if let Err(e) = inner.api.call(|a| a.disconnect()) {
                warn!(serial = %serial, error = %e, "RSA disconnect reported an error");
            }
            info!(serial = %serial, "Disconnected from RSA instrument");
        }
        inner.clear_connection();
        self.publish(inner, SessionState::Disconnected);
    }

    /// Validate and push a configuration, returning what the instrument reports.
    ///
    /// On failure the previously applied configuration stays in effect.
    pub fn configure(&self, config: AcquisitionConfig) -> Result<AppliedConfig> {
        let mut inner = self.token()?;
        config.validate_for(inner.info()?)?;
        let result = self.push_desired(&mut inner, &config);
        let result = self.settle(&mut inner, result);
        if let Ok(applied) = &result {
            inner.desired = config;
            debug!(center_hz = applied.center_frequency_hz, "Configuration applied");
        }
        self.publish(&inner, Self::idle_state(&inner));
        result
    }

    /// Validate and record a configuration without pushing it.
    ///
    /// The next acquisition pushes it.
    pub fn stage(&self, config: AcquisitionConfig) -> Result<()> {
        let mut inner = self.token()?;
        match &inner.connection {
            Some(connection) => config.validate_for(&connection.info)?,
            None => config.validate()?,
        }
        inner.desired = config;
        Ok(())
    }

    /// Configuration the helpers will run with.
    pub fn desired_config(&self) -> Result<AcquisitionConfig> {
        Ok(self.token()?.desired.clone())
    }

    /// Push `config`; on failure try to restore the previous configuration.
    pub(crate) fn push_desired(&self, inner: &mut Inner, config: &AcquisitionConfig) -> Result<AppliedConfig> {
        let info = inner.info()?.clone();
        match config::push(&mut inner.api, config, &info) {
            Ok(applied) => {
                inner.pushed = Some(config.clone());
                inner.applied = Some(applied.clone());
                inner.stale = false;
                inner.record_override = None;
                Ok(applied)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                inner.stale = true;
                if let Some(previous) = inner.pushed.clone() {
                    warn!(error = %e, "Configuration push failed; restoring previous configuration");
                    match config::push(&mut inner.api, &previous, &info) {
                        Ok(restored) => {
                            inner.applied = Some(restored);
                            inner.stale = false;
                            inner.record_override = None;
                        }
                        Err(rollback) => {
                            warn!(error = %rollback, "Restoring previous configuration failed; marking stale");
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Push the desired configuration if it differs from the last push.
    pub(crate) fn sync_config(&self, inner: &mut Inner) -> Result<()> {
        if inner.needs_push() {
            let desired = inner.desired.clone();
            desired.validate_for(inner.info()?)?;
            self.push_desired(inner, &desired)?;
            self.publish(inner, SessionState::Connected);
        }
        Ok(())
    }

    /// Put back the pushed IQ record length after a per-block override.
    pub(crate) fn restore_record_length(&self, inner: &mut Inner) -> Result<()> {
        if inner.record_override.take().is_none() {
            return Ok(());
        }
        let Some(length) = inner.pushed.as_ref().map(|p| p.iq_record_length) else {
            return Ok(());
        };
        debug!(samples = length, "Restoring configured IQ record length");
        let actual = match config::push_record_length(&mut inner.api, length) {
            Ok(actual) => actual,
            Err(e) => {
                inner.stale = true;
                return Err(e);
            }
        };
        if let Some(applied) = inner.applied.as_mut() {
            applied.iq_record_length = actual;
        }
        if actual != length {
            inner.stale = true;
        }
        Ok(())
    }

    /// Realign when the instrument asks for it and is warm.
    pub(crate) fn align_if_needed(&self, inner: &mut Inner) -> Result<()> {
        if !inner.api.call(|a| a.alignment_needed())? {
            return Ok(());
        }
        if inner.api.call(|a| a.warmup_complete())? {
            warn!("RSA alignment needed; aligning before acquisition");
            inner.api.call(|a| a.stop())?;
            inner.api.call(|a| a.run_alignment())
        } else {
            warn!("RSA alignment needed but instrument not warmed up; acquiring unaligned");
            Ok(())
        }
    }

    /// Where the instrument's reference time was last set from.
    pub fn reference_time_source(&self) -> Result<ReferenceTimeSource> {
        self.with_device(|inner| inner.api.call(|a| a.reference_time_source()))
    }

    /// Instrument clock as wall-clock time and timestamp counter.
    pub fn device_time(&self) -> Result<TimePoint> {
        self.with_device(|inner| inner.api.call(|a| a.current_time()))
    }

    /// Set the instrument's wall clock to `time` at its current timestamp.
    pub fn set_reference_time(&self, time: DateTime<Utc>) -> Result<()> {
        self.with_device(|inner| {
            let now = inner.api.call(|a| a.current_time())?;
            inner
                .api
                .call(|a| a.set_reference_time(TimePoint::at(time, now.timestamp)))
                .map_err(|e| e.with_args(time.to_rfc3339()))
        })
    }

    /// Reset the instrument. The session ends Disconnected.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.token()?;
        let device_id = inner
            .connection
            .as_ref()
            .map(|c| c.handle.device_id())
            .ok_or_else(not_connected)?;
        if let Err(e) = inner.api.call(|a| a.stop()) {
            debug!(error = %e, "Stop before reset failed");
        }
        let result = inner.api.call(|a| a.reset(device_id));
        info!(device_id, ok = result.is_ok(), "RSA reset");
        inner.clear_connection();
        self.publish(&inner, SessionState::Disconnected);
        result
    }

    /// Run the instrument alignment now.
    pub fn run_alignment(&self) -> Result<()> {
        self.with_device(|inner| {
            inner.api.call(|a| a.stop())?;
            inner.api.call(|a| a.run_alignment())
        })
    }

    /// Whether the instrument reports over-temperature.
    pub fn over_temperature(&self) -> Result<bool> {
        self.with_device(|inner| inner.api.call(|a| a.over_temperature()))
    }

    /// Issue a software trigger.
    pub fn force_trigger(&self) -> Result<()> {
        self.with_device(|inner| inner.api.call(|a| a.force_trigger()))
    }

    /// Poll a device event.
    pub fn event_status(&self, event: DeviceEvent) -> Result<EventStatus> {
        self.with_device(|inner| inner.api.call(|a| a.event_status(event)))
    }
}

fn selects(selector: &DeviceSelector, current: &Connection) -> bool {
    match selector {
        DeviceSelector::Any => true,
        DeviceSelector::Id(id) => *id == current.handle.device_id(),
        DeviceSelector::Serial(serial) => *serial == current.info.serial_number,
        DeviceSelector::Descriptor(d) => d.serial == current.info.serial_number,
    }
}

fn resolve(selector: &DeviceSelector, candidates: Vec<DeviceDescriptor>) -> Result<DeviceDescriptor> {
    let missing = |what: String| {
        TekRsaError::connection(ConnectionFault::NoDeviceFound, format!("{what} not attached"))
    };
    match selector {
        DeviceSelector::Any => {
            if candidates.len() > 1 {
                let serials: Vec<&str> = candidates.iter().map(|d| d.serial.as_str()).collect();
                return Err(TekRsaError::connection(
                    ConnectionFault::ConnectFailed,
                    format!("{} instruments attached ({}); select one", candidates.len(), serials.join(", ")),
                ));
            }
            candidates
                .into_iter()
                .next()
                .ok_or_else(|| missing("instrument".into()))
        }
        DeviceSelector::Id(id) => candidates
            .into_iter()
            .find(|d| d.id == *id)
            .ok_or_else(|| missing(format!("device id {id}"))),
        DeviceSelector::Serial(serial) => candidates
            .into_iter()
            .find(|d| d.serial == *serial)
            .ok_or_else(|| missing(format!("serial {serial}"))),
        DeviceSelector::Descriptor(wanted) => candidates
            .into_iter()
            .find(|d| d.serial == wanted.serial)
            .ok_or_else(|| missing(format!("serial {}", wanted.serial))),
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.connection.is_some() {
            debug!("Disconnecting RSA instrument on session drop");
            if let Err(e) = inner.api.call(|a| a.stop()) {
                debug!(error = %e, "Stop on drop failed");
            }
            if let Err(e) = inner.api.call(|a| a.disconnect()) {
                warn!(error = %e, "Disconnect on drop failed");
            }
            inner.clear_connection();
        }
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("status", &*self.snapshot.read())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
