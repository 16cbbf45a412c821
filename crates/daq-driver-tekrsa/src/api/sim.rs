//! In-process simulated instrument.
//!
//! [`SimulatedRsa`] implements [`RsaApi`] over a register model of one or
//! more attached instruments. It reproduces the status codes the vendor
//! library returns for the situations the session has to handle: range
//! errors, missing variant features, data that never becomes ready, USB
//! unplug, a claimed interface and short transfers.
//!
//! Tests steer it through a cloned [`SimControl`]:
//!
//! ```
//! use daq_driver_tekrsa::api::{NativeCall, SimulatedRsa};
//! use daq_driver_tekrsa::status::ReturnStatus;
//!
//! let sim = SimulatedRsa::new();
//! let control = sim.control();
//! control.inject(NativeCall::SpectrumGetTrace, ReturnStatus::ADCOverrange);
//! control.set_never_ready(true);
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rsa_api_sys as sys;

use super::{
    DpxFrame, DpxParameters, DpxSettings, EventStatus, FoundDevice, IqAcqInfo, IqData,
    NativeCall, NativeDeviceInfo, Reply, RsaApi, SogramParameters, SogramSettings,
    SpectrumLimits, SpectrumSettings, SpectrumSettingsReport, StreamFileInfo, StreamWriteStatus,
    TimePoint, TraceInfo,
};
use crate::config::{max_iq_record_length, sample_rate_for_bandwidth, stream_parameters};
use crate::device::{Capabilities, DeviceVariant};
use crate::status::{ReturnStatus, Severity};
use crate::types::{
    DeviceEvent, FrequencyReference, ReferenceTimeSource, SpectrumDetector, SpectrumTrace,
    SpectrumWindow, StreamDataType, StreamDestination, TriggerMode, TriggerSource,
    TriggerTransition, VerticalUnit,
};

const DEFAULT_SEED: u64 = 0x5253_4133_3036;
const SIM_LIMITS: SpectrumLimits = SpectrumLimits {
    max_span: 40.0e6,
    min_span: 1.0e3,
    max_rbw: 10.0e6,
    min_rbw: 10.0,
    max_vbw: 10.0e6,
    min_vbw: 1.0,
    max_trace_length: 64001,
    min_trace_length: 801,
};
const MIN_IQ_BANDWIDTH: f64 = 100.0;
const MAX_IQ_BANDWIDTH: f64 = 40.0e6;
const SOGRAM_WIDTH: i32 = 801;
const SOGRAM_HEIGHT: i32 = 500;
const DPX_BITMAP_HEIGHT: i32 = 201;
const TIMESTAMP_RATE: u64 = 112_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// One simulated instrument on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDevice {
    /// Device ID returned by search
    pub id: i32,
    /// Serial number
    pub serial: String,
    /// Device type string
    pub device_type: String,
}

impl SimDevice {
    /// A supported model.
    pub fn new(id: i32, serial: impl Into<String>, variant: DeviceVariant) -> Self {
        Self::with_type(id, serial, variant.model())
    }

    /// Arbitrary device type string, including unsupported models.
    pub fn with_type(id: i32, serial: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            id,
            serial: serial.into(),
            device_type: device_type.into(),
        }
    }

    fn variant(&self) -> DeviceVariant {
        DeviceVariant::from_device_type(&self.device_type).unwrap_or(DeviceVariant::Rsa306B)
    }
}

/// Instrument registers; `Default` is the preset state.
#[derive(Debug, Clone)]
struct Registers {
    running: bool,
    center_freq: f64,
    reference_level: f64,
    frequency_reference: FrequencyReference,
    auto_attenuation: bool,
    attenuator: f64,
    preamp: bool,
    trigger_mode: TriggerMode,
    trigger_source: TriggerSource,
    trigger_transition: TriggerTransition,
    trigger_level: f64,
    trigger_position: f64,
    spectrum_enabled: bool,
    spectrum: SpectrumSettings,
    trace_enabled: bool,
    detector: SpectrumDetector,
    iq_bandwidth: f64,
    iq_record_length: i32,
    dpx_enabled: bool,
    dpx: Option<DpxParameters>,
    sogram: Option<SogramParameters>,
    dpx_spectrum: bool,
    dpx_spectrogram: bool,
    frame_held: bool,
    trace_ready_at: Option<Instant>,
    iq_ready_at: Option<Instant>,
    dpx_ready_at: Option<Instant>,
    trigger_forced: bool,
    stream_bandwidth: f64,
    stream_output: Option<(StreamDestination, StreamDataType)>,
    stream_base: Option<PathBuf>,
    stream_suffix: i32,
    stream_file_ms: i32,
    streaming: bool,
    stream_done_at: Option<Instant>,
    stream_samples: u64,
    stream_sample0: u64,
    stream_acq_status: u32,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            running: false,
            center_freq: 1.5e9,
            reference_level: 0.0,
            frequency_reference: FrequencyReference::Internal,
            auto_attenuation: true,
            attenuator: 0.0,
            preamp: false,
            trigger_mode: TriggerMode::FreeRun,
            trigger_source: TriggerSource::External,
            trigger_transition: TriggerTransition::Rising,
            trigger_level: -20.0,
            trigger_position: 10.0,
            spectrum_enabled: false,
            spectrum: default_spectrum(),
            trace_enabled: true,
            detector: SpectrumDetector::PosPeak,
            iq_bandwidth: 40.0e6,
            iq_record_length: 1024,
            dpx_enabled: false,
            dpx: None,
            sogram: None,
            dpx_spectrum: false,
            dpx_spectrogram: false,
            frame_held: false,
            trace_ready_at: None,
            iq_ready_at: None,
            dpx_ready_at: None,
            trigger_forced: false,
            stream_bandwidth: 40.0e6,
            stream_output: None,
            stream_base: None,
            stream_suffix: sys::IQSSDFN_SUFFIX_INCRINDEX_MIN as i32,
            stream_file_ms: 1000,
            streaming: false,
            stream_done_at: None,
            stream_samples: 0,
            stream_sample0: 0,
            stream_acq_status: 0,
        }
    }
}

fn default_spectrum() -> SpectrumSettings {
    SpectrumSettings {
        span: 40.0e6,
        rbw: 300.0e3,
        enable_vbw: false,
        vbw: 300.0e3,
        trace_length: 801,
        window: SpectrumWindow::Kaiser,
        vertical_unit: VerticalUnit::Dbm,
    }
}

enum Readiness {
    Ready,
    After(Duration),
    Never,
}

#[derive(Debug)]
struct SimState {
    devices: Vec<SimDevice>,
    connected: Option<SimDevice>,
    unplugged: bool,
    busy: bool,
    never_ready: bool,
    ready_delay: Duration,
    injected: HashMap<NativeCall, VecDeque<ReturnStatus>>,
    short_transfer: usize,
    trace_status: u16,
    iq_status: u32,
    dpx_status: u32,
    stream_status: u32,
    record_length_clamp: Option<i32>,
    reference: TimePoint,
    reference_source: ReferenceTimeSource,
    over_temperature: bool,
    warmed_up: bool,
    alignment_needed: bool,
    calls: HashMap<NativeCall, u64>,
    connect_count: u64,
    regs: Registers,
    clock: u64,
    rng: ChaCha8Rng,
}

impl SimState {
    fn new(devices: Vec<SimDevice>, seed: u64) -> Self {
        Self {
            devices,
            connected: None,
            unplugged: false,
            busy: false,
            never_ready: false,
            ready_delay: Duration::ZERO,
            injected: HashMap::new(),
            short_transfer: 0,
            trace_status: 0,
            iq_status: 0,
            dpx_status: 0,
            stream_status: 0,
            record_length_clamp: None,
            reference: TimePoint::default(),
            reference_source: ReferenceTimeSource::None,
            over_temperature: false,
            warmed_up: true,
            alignment_needed: false,
            calls: HashMap::new(),
            connect_count: 0,
            regs: Registers::default(),
            clock: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Count the call and return a one-shot injected status, if any.
    fn record(&mut self, call: NativeCall) -> Option<ReturnStatus> {
        *self.calls.entry(call).or_default() += 1;
        self.injected.get_mut(&call).and_then(VecDeque::pop_front)
    }

    fn link_fault(&self) -> Option<ReturnStatus> {
        if self.connected.is_none() {
            Some(ReturnStatus::NotConnected)
        } else if self.unplugged {
            Some(ReturnStatus::DisconnectedDeviceRemoved)
        } else {
            None
        }
    }

    fn variant(&self) -> DeviceVariant {
        self.connected
            .as_ref()
            .map_or(DeviceVariant::Rsa306B, SimDevice::variant)
    }

    fn has(&self, caps: Capabilities) -> bool {
        self.variant().capabilities().contains(caps)
    }

    fn tick(&mut self) -> u64 {
        self.clock += TIMESTAMP_RATE / 100;
        self.clock
    }

    fn ready_at(&self) -> Instant {
        Instant::now() + self.ready_delay
    }

    fn readiness(&self, at: Option<Instant>) -> Readiness {
        if self.never_ready || !self.regs.running {
            return Readiness::Never;
        }
        match at {
            None => Readiness::Never,
            Some(at) => {
                let now = Instant::now();
                if now >= at {
                    Readiness::Ready
                } else {
                    Readiness::After(at - now)
                }
            }
        }
    }

    fn is_ready(&self, at: Option<Instant>) -> bool {
        matches!(self.readiness(at), Readiness::Ready)
    }

    fn shortened(&self, len: usize) -> usize {
        len.saturating_sub(self.short_transfer)
    }

    fn noise(&mut self, spread: f32) -> f32 {
        self.rng.gen_range(-spread..=spread)
    }

    /// `len` samples of the test tone with a little noise.
    fn tone(&mut self, len: usize) -> IqData {
        let mut data = IqData {
            i: Vec::with_capacity(len),
            q: Vec::with_capacity(len),
        };
        for n in 0..len {
            let phase = std::f32::consts::FRAC_PI_4 * n as f32;
            let (i_noise, q_noise) = (self.noise(1e-3), self.noise(1e-3));
            data.i.push(0.1 * phase.cos() + i_noise);
            data.q.push(0.1 * phase.sin() + q_noise);
        }
        data
    }

    /// Wall-clock time of a timestamp counter value.
    fn wall_time(&self, timestamp: u64) -> TimePoint {
        let reference = self.reference;
        let ticks = i128::from(timestamp) - i128::from(reference.timestamp);
        let nanos = i128::from(reference.seconds) * NANOS_PER_SECOND
            + i128::from(reference.nanos)
            + ticks * NANOS_PER_SECOND / i128::from(TIMESTAMP_RATE);
        TimePoint {
            seconds: nanos.div_euclid(NANOS_PER_SECOND) as i64,
            nanos: nanos.rem_euclid(NANOS_PER_SECOND) as u64,
            timestamp,
        }
    }

    /// Write the streamed `.siqd` file: interleaved little-endian `f32` pairs.
    fn write_stream_file(&mut self, path: &Path, samples: usize) -> Outcome<()> {
        let data = self.tone(samples);
        let mut bytes = Vec::with_capacity(samples * 8);
        for (i, q) in data.i.iter().zip(&data.q) {
            bytes.extend_from_slice(&i.to_le_bytes());
            bytes.extend_from_slice(&q.to_le_bytes());
        }
        std::fs::write(path, bytes).map_err(|_| ReturnStatus::IQStreamFileOpenFailed)
    }
}

type Outcome<T> = std::result::Result<T, ReturnStatus>;

/// Test handle onto a [`SimulatedRsa`].
#[derive(Debug, Clone)]
pub struct SimControl {
    state: Arc<Mutex<SimState>>,
}

impl SimControl {
    /// Simulate pulling the USB cable.
    pub fn unplug(&self) {
        self.state.lock().unplugged = true;
    }

    /// Plug the instrument back in. The driver loses its connection.
    pub fn replug(&self) {
        let mut state = self.state.lock();
        state.unplugged = false;
        state.connected = None;
        state.regs = Registers::default();
    }

    /// Another process holds the USB interface.
    pub fn set_busy(&self, busy: bool) {
        self.state.lock().busy = busy;
    }

    /// Acquisitions never signal data-ready.
    pub fn set_never_ready(&self, never: bool) {
        self.state.lock().never_ready = never;
    }

    /// Delay between arming and data-ready.
    pub fn set_ready_delay(&self, delay: Duration) {
        self.state.lock().ready_delay = delay;
    }

    /// Return `status` from the next invocation of `call`. Queues per call.
    pub fn inject(&self, call: NativeCall, status: ReturnStatus) {
        self.state
            .lock()
            .injected
            .entry(call)
            .or_default()
            .push_back(status);
    }

    /// Drop `missing` elements from every transfer.
    pub fn set_short_transfer(&self, missing: usize) {
        self.state.lock().short_transfer = missing;
    }

    /// `acqDataStatus` reported with spectrum traces.
    pub fn set_trace_status(&self, bits: u16) {
        self.state.lock().trace_status = bits;
    }

    /// `acqStatus` reported with IQ blocks.
    pub fn set_iq_status(&self, bits: u32) {
        self.state.lock().iq_status = bits;
    }

    /// `acqDataStatus` reported with DPX frames.
    pub fn set_dpx_status(&self, bits: u32) {
        self.state.lock().dpx_status = bits;
    }

    /// `acqStatus` reported in the IQ streaming file info.
    pub fn set_stream_status(&self, bits: u32) {
        self.state.lock().stream_status = bits;
    }

    /// Silently cap accepted IQ record lengths, as a driver that clamps would.
    pub fn clamp_record_length(&self, limit: Option<i32>) {
        self.state.lock().record_length_clamp = limit;
    }

    /// Over-temperature flag.
    pub fn set_over_temperature(&self, hot: bool) {
        self.state.lock().over_temperature = hot;
    }

    /// Whether the instrument reports that it needs alignment.
    pub fn set_alignment_needed(&self, needed: bool) {
        self.state.lock().alignment_needed = needed;
    }

    /// Whether the instrument has finished warming up.
    pub fn set_warmed_up(&self, warm: bool) {
        self.state.lock().warmed_up = warm;
    }

    /// How many times `call` has been invoked.
    pub fn call_count(&self, call: NativeCall) -> u64 {
        self.state.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Successful `DEVICE_Connect` calls.
    pub fn connect_count(&self) -> u64 {
        self.state.lock().connect_count
    }

    /// Whether the instrument is running (armed).
    pub fn is_running(&self) -> bool {
        self.state.lock().regs.running
    }

    /// Serial number of the connected instrument.
    pub fn connected_serial(&self) -> Option<String> {
        self.state.lock().connected.as_ref().map(|d| d.serial.clone())
    }

    /// Center frequency register.
    pub fn center_freq(&self) -> f64 {
        self.state.lock().regs.center_freq
    }

    /// Whether IQ streaming is active.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().regs.streaming
    }

    /// Advance the instrument timestamp counter by `ticks`.
    pub fn advance_clock(&self, ticks: u64) {
        self.state.lock().clock += ticks;
    }

    /// Whether a DPX frame buffer is checked out and not yet finished.
    pub fn frame_held(&self) -> bool {
        self.state.lock().regs.frame_held
    }
}

/// Simulated [`RsaApi`].
#[derive(Debug)]
pub struct SimulatedRsa {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedRsa {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRsa {
    /// One RSA306B.
    pub fn new() -> Self {
        Self::single(DeviceVariant::Rsa306B)
    }

    /// One instrument of the given model.
    pub fn single(variant: DeviceVariant) -> Self {
        Self::with_devices(vec![SimDevice::new(0, "B010000", variant)])
    }

    /// The given instruments, in search order.
    pub fn with_devices(devices: Vec<SimDevice>) -> Self {
        Self::with_seed(devices, DEFAULT_SEED)
    }

    /// Explicit RNG seed for generated data.
    pub fn with_seed(devices: Vec<SimDevice>, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(devices, seed))),
        }
    }

    /// Control handle for tests.
    pub fn control(&self) -> SimControl {
        SimControl {
            state: Arc::clone(&self.state),
        }
    }

    /// Run `op` against a connected, present instrument.
    fn guarded<T>(&self, call: NativeCall, op: impl FnOnce(&mut SimState) -> Outcome<T>) -> Reply<T> {
        let mut state = self.state.lock();
        let injected = state.record(call);
        if let Some(status) = injected {
            if status.severity() == Severity::Failure {
                return Reply::failed(call, status);
            }
        }
        if let Some(status) = state.link_fault() {
            return Reply::failed(call, status);
        }
        match op(&mut *state) {
            Ok(value) => Reply::new(call, injected.unwrap_or(ReturnStatus::NoError), value),
            Err(status) => Reply::failed(call, status),
        }
    }

    fn set(&self, call: NativeCall, op: impl FnOnce(&mut SimState) -> Outcome<()>) -> Reply<()> {
        self.guarded(call, op)
    }

    fn get<T>(&self, call: NativeCall, read: impl FnOnce(&SimState) -> T) -> Reply<T> {
        self.guarded(call, |state| Ok(read(&*state)))
    }

    /// Blocking wait with the state lock released while sleeping.
    fn wait(
        &self,
        call: NativeCall,
        timeout_ms: i32,
        pending: fn(&Registers) -> Option<Instant>,
    ) -> Reply<bool> {
        let timeout = Duration::from_millis(u64::try_from(timeout_ms).unwrap_or(0));
        let pause = {
            let mut state = self.state.lock();
            let injected = state.record(call);
            if let Some(status) = injected {
                return Reply::failed(call, status);
            }
            if let Some(status) = state.link_fault() {
                return Reply::failed(call, status);
            }
            match state.readiness(pending(&state.regs)) {
                Readiness::Ready => return Reply::ok(call, true),
                Readiness::After(left) => left.min(timeout),
                Readiness::Never => timeout,
            }
        };
        thread::sleep(pause);
        let state = self.state.lock();
        Reply::ok(call, state.is_ready(pending(&state.regs)))
    }
}

fn in_range(value: f64, min: f64, max: f64) -> Outcome<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ReturnStatus::Parameter)
    }
}

fn requires(state: &SimState, caps: Capabilities) -> Outcome<()> {
    if state.has(caps) {
        Ok(())
    } else {
        Err(ReturnStatus::NotSupported)
    }
}

impl RsaApi for SimulatedRsa {
    fn search(&mut self) -> Reply<Vec<FoundDevice>> {
        let call = NativeCall::DeviceSearch;
        let mut state = self.state.lock();
        if let Some(status) = state.record(call) {
            return Reply::failed(call, status);
        }
        if state.unplugged {
            return Reply::ok(call, Vec::new());
        }
        let found = state
            .devices
            .iter()
            .map(|d| FoundDevice {
                id: d.id,
                serial: d.serial.clone(),
                device_type: d.device_type.clone(),
            })
            .collect();
        Reply::ok(call, found)
    }

    fn connect(&mut self, device_id: i32) -> Reply<()> {
        let call = NativeCall::DeviceConnect;
        let mut state = self.state.lock();
        if let Some(status) = state.record(call) {
            return Reply::failed(call, status);
        }
        if state.busy || state.connected.is_some() {
            return Reply::failed(call, ReturnStatus::Transfer);
        }
        if state.unplugged {
            return Reply::failed(call, ReturnStatus::NotConnected);
        }
        match state.devices.iter().find(|d| d.id == device_id).cloned() {
            Some(device) => {
                state.connected = Some(device);
                state.connect_count += 1;
                state.reference = TimePoint::at(Utc::now(), state.clock);
                state.reference_source = ReferenceTimeSource::System;
                Reply::ok(call, ())
            }
            None => Reply::failed(call, ReturnStatus::Parameter),
        }
    }

    fn disconnect(&mut self) -> Reply<()> {
        let call = NativeCall::DeviceDisconnect;
        let mut state = self.state.lock();
        if let Some(status) = state.record(call) {
            return Reply::failed(call, status);
        }
        state.connected = None;
        state.regs.running = false;
        Reply::ok(call, ())
    }

    fn reset(&mut self, device_id: i32) -> Reply<()> {
        let call = NativeCall::DeviceReset;
        let mut state = self.state.lock();
        if let Some(status) = state.record(call) {
            return Reply::failed(call, status);
        }
        if state.unplugged || !state.devices.iter().any(|d| d.id == device_id) {
            return Reply::failed(call, ReturnStatus::NotConnected);
        }
        state.connected = None;
        state.regs = Registers::default();
        Reply::ok(call, ())
    }

    fn device_info(&mut self) -> Reply<NativeDeviceInfo> {
        self.get(NativeCall::DeviceGetInfo, |state| {
            let device = state.connected.clone().unwrap_or_else(|| SimDevice::new(0, "", DeviceVariant::Rsa306B));
            NativeDeviceInfo {
                nomenclature: device.device_type,
                serial_number: device.serial,
                api_version: "3.11.0047".into(),
                fw_version: "V1.7".into(),
                fpga_version: "V2.1".into(),
                hw_version: "V7".into(),
            }
        })
    }

    fn run(&mut self) -> Reply<()> {
        self.set(NativeCall::DeviceRun, |state| {
            state.regs.running = true;
            if state.regs.dpx_enabled {
                state.regs.dpx_ready_at = Some(state.ready_at());
            }
            Ok(())
        })
    }

    fn stop(&mut self) -> Reply<()> {
        self.set(NativeCall::DeviceStop, |state| {
            state.regs.running = false;
            state.regs.trace_ready_at = None;
            state.regs.iq_ready_at = None;
            state.regs.dpx_ready_at = None;
            state.regs.streaming = false;
            Ok(())
        })
    }

    fn is_running(&mut self) -> Reply<bool> {
        self.get(NativeCall::DeviceGetEnable, |state| state.regs.running)
    }

    fn over_temperature(&mut self) -> Reply<bool> {
        self.get(NativeCall::DeviceGetOverTemperatureStatus, |state| state.over_temperature)
    }

    fn event_status(&mut self, event: DeviceEvent) -> Reply<EventStatus> {
        self.guarded(NativeCall::DeviceGetEventStatus, |state| {
            let occurred = match event {
                DeviceEvent::Overrange => {
                    state.trace_status & sys::AcqDataStatus_ADC_OVERRANGE as u16 != 0
                }
                DeviceEvent::Trigger => std::mem::take(&mut state.regs.trigger_forced),
                DeviceEvent::OnePps => {
                    requires(state, Capabilities::GNSS)?;
                    false
                }
            };
            let timestamp = if occurred { state.clock } else { 0 };
            Ok(EventStatus {
                occurred,
                timestamp,
            })
        })
    }

    fn warmup_complete(&mut self) -> Reply<bool> {
        self.get(NativeCall::AlignGetWarmupStatus, |state| state.warmed_up)
    }

    fn alignment_needed(&mut self) -> Reply<bool> {
        self.get(NativeCall::AlignGetAlignmentNeeded, |state| state.alignment_needed)
    }

    fn run_alignment(&mut self) -> Reply<()> {
        self.set(NativeCall::AlignRunAlignment, |state| {
            state.alignment_needed = false;
            Ok(())
        })
    }

    fn preset(&mut self) -> Reply<()> {
        self.set(NativeCall::ConfigPreset, |state| {
            state.regs = Registers::default();
            Ok(())
        })
    }

    fn set_center_freq(&mut self, hz: f64) -> Reply<()> {
        self.set(NativeCall::ConfigSetCenterFreq, |state| {
            let (min, max) = state.variant().nominal_frequency_range();
            if !(hz.is_finite() && hz >= min && hz <= max) {
                return Err(ReturnStatus::FrequencyOutOfRange);
            }
            state.regs.center_freq = hz;
            Ok(())
        })
    }

    fn center_freq(&mut self) -> Reply<f64> {
        self.get(NativeCall::ConfigGetCenterFreq, |state| state.regs.center_freq)
    }

    fn min_center_freq(&mut self) -> Reply<f64> {
        self.get(NativeCall::ConfigGetMinCenterFreq, |state| {
            state.variant().nominal_frequency_range().0
        })
    }

    fn max_center_freq(&mut self) -> Reply<f64> {
        self.get(NativeCall::ConfigGetMaxCenterFreq, |state| {
            state.variant().nominal_frequency_range().1
        })
    }

    fn set_reference_level(&mut self, dbm: f64) -> Reply<()> {
        self.set(NativeCall::ConfigSetReferenceLevel, |state| {
            in_range(dbm, -130.0, 30.0)?;
            state.regs.reference_level = dbm;
            Ok(())
        })
    }

    fn reference_level(&mut self) -> Reply<f64> {
        self.get(NativeCall::ConfigGetReferenceLevel, |state| state.regs.reference_level)
    }

    fn set_frequency_reference(&mut self, source: FrequencyReference) -> Reply<()> {
        self.set(NativeCall::ConfigSetFrequencyReferenceSource, |state| {
            if source == FrequencyReference::Gnss {
                requires(state, Capabilities::GNSS)?;
            }
            state.regs.frequency_reference = source;
            Ok(())
        })
    }

    fn frequency_reference(&mut self) -> Reply<FrequencyReference> {
        self.get(NativeCall::ConfigGetFrequencyReferenceSource, |state| {
            state.regs.frequency_reference
        })
    }

    fn set_auto_attenuation(&mut self, enable: bool) -> Reply<()> {
        self.set(NativeCall::ConfigSetAutoAttenuationEnable, |state| {
            requires(state, Capabilities::ATTENUATOR)?;
            state.regs.auto_attenuation = enable;
            Ok(())
        })
    }

    fn auto_attenuation(&mut self) -> Reply<bool> {
        self.guarded(NativeCall::ConfigGetAutoAttenuationEnable, |state| {
            requires(state, Capabilities::ATTENUATOR)?;
            Ok(state.regs.auto_attenuation)
        })
    }

    fn set_rf_attenuator(&mut self, db: f64) -> Reply<()> {
        self.set(NativeCall::ConfigSetRFAttenuator, |state| {
            requires(state, Capabilities::ATTENUATOR)?;
            in_range(db, -51.0, 0.0)?;
            state.regs.attenuator = db.round();
            Ok(())
        })
    }

    fn rf_attenuator(&mut self) -> Reply<f64> {
        self.guarded(NativeCall::ConfigGetRFAttenuator, |state| {
            requires(state, Capabilities::ATTENUATOR)?;
            Ok(state.regs.attenuator)
        })
    }

    fn set_rf_preamp(&mut self, enable: bool) -> Reply<()> {
        self.set(NativeCall::ConfigSetRFPreampEnable, |state| {
            requires(state, Capabilities::PREAMP)?;
            state.regs.preamp = enable;
            Ok(())
        })
    }

    fn rf_preamp(&mut self) -> Reply<bool> {
        self.guarded(NativeCall::ConfigGetRFPreampEnable, |state| {
            requires(state, Capabilities::PREAMP)?;
            Ok(state.regs.preamp)
        })
    }

    fn set_trigger_mode(&mut self, mode: TriggerMode) -> Reply<()> {
        self.set(NativeCall::TrigSetTriggerMode, |state| {
            state.regs.trigger_mode = mode;
            Ok(())
        })
    }

    fn trigger_mode(&mut self) -> Reply<TriggerMode> {
        self.get(NativeCall::TrigGetTriggerMode, |state| state.regs.trigger_mode)
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Reply<()> {
        self.set(NativeCall::TrigSetTriggerSource, |state| {
            state.regs.trigger_source = source;
            Ok(())
        })
    }

    fn trigger_source(&mut self) -> Reply<TriggerSource> {
        self.get(NativeCall::TrigGetTriggerSource, |state| state.regs.trigger_source)
    }

    fn set_trigger_transition(&mut self, transition: TriggerTransition) -> Reply<()> {
        self.set(NativeCall::TrigSetTriggerTransition, |state| {
            state.regs.trigger_transition = transition;
            Ok(())
        })
    }

    fn trigger_transition(&mut self) -> Reply<TriggerTransition> {
        self.get(NativeCall::TrigGetTriggerTransition, |state| {
            state.regs.trigger_transition
        })
    }

    fn set_if_power_trigger_level(&mut self, dbm: f64) -> Reply<()> {
        self.set(NativeCall::TrigSetIFPowerTriggerLevel, |state| {
            in_range(dbm, -130.0, 30.0)?;
            state.regs.trigger_level = dbm;
            Ok(())
        })
    }

    fn if_power_trigger_level(&mut self) -> Reply<f64> {
        self.get(NativeCall::TrigGetIFPowerTriggerLevel, |state| state.regs.trigger_level)
    }

    fn set_trigger_position_percent(&mut self, percent: f64) -> Reply<()> {
        self.set(NativeCall::TrigSetTriggerPositionPercent, |state| {
            in_range(percent, 1.0, 99.0)?;
            state.regs.trigger_position = percent;
            Ok(())
        })
    }

    fn trigger_position_percent(&mut self) -> Reply<f64> {
        self.get(NativeCall::TrigGetTriggerPositionPercent, |state| {
            state.regs.trigger_position
        })
    }

    fn force_trigger(&mut self) -> Reply<()> {
        self.set(NativeCall::TrigForceTrigger, |state| {
            state.regs.trigger_forced = true;
            Ok(())
        })
    }

    fn spectrum_set_enable(&mut self, enable: bool) -> Reply<()> {
        self.set(NativeCall::SpectrumSetEnable, |state| {
            state.regs.spectrum_enabled = enable;
            if enable {
                state.regs.dpx_enabled = false;
            }
            Ok(())
        })
    }

    fn spectrum_set_default(&mut self) -> Reply<()> {
        self.set(NativeCall::SpectrumSetDefault, |state| {
            state.regs.spectrum = default_spectrum();
            Ok(())
        })
    }

    fn spectrum_limits(&mut self) -> Reply<SpectrumLimits> {
        self.get(NativeCall::SpectrumGetLimits, |_| SIM_LIMITS)
    }

    fn spectrum_set_settings(&mut self, settings: &SpectrumSettings) -> Reply<()> {
        let settings = *settings;
        self.set(NativeCall::SpectrumSetSettings, |state| {
            let l = SIM_LIMITS;
            in_range(settings.span, l.min_span, l.max_span)?;
            in_range(settings.rbw, l.min_rbw, l.max_rbw)?;
            if settings.rbw > settings.span {
                return Err(ReturnStatus::SpanIsLessThanRBW);
            }
            if settings.trace_length < l.min_trace_length || settings.trace_length > l.max_trace_length {
                return Err(ReturnStatus::ParameterTraceLength);
            }
            state.regs.spectrum = settings;
            Ok(())
        })
    }

    fn spectrum_settings(&mut self) -> Reply<SpectrumSettingsReport> {
        self.get(NativeCall::SpectrumGetSettings, |state| {
            let s = state.regs.spectrum;
            let start = state.regs.center_freq - s.span / 2.0;
            SpectrumSettingsReport {
                settings: s,
                actual_start_freq: start,
                actual_stop_freq: start + s.span,
                actual_freq_step: s.span / f64::from((s.trace_length - 1).max(1)),
                actual_rbw: s.rbw,
                actual_vbw: if s.enable_vbw { s.vbw } else { s.rbw },
                actual_num_iq_samples: ((s.span / s.rbw) * 4.0) as i32,
            }
        })
    }

    fn spectrum_set_trace_type(
        &mut self,
        trace: SpectrumTrace,
        enable: bool,
        detector: SpectrumDetector,
    ) -> Reply<()> {
        self.set(NativeCall::SpectrumSetTraceType, |state| {
            if trace == SpectrumTrace::Trace1 {
                state.regs.trace_enabled = enable;
                state.regs.detector = detector;
            }
            Ok(())
        })
    }

    fn spectrum_acquire_trace(&mut self) -> Reply<()> {
        self.set(NativeCall::SpectrumAcquireTrace, |state| {
            if !state.regs.spectrum_enabled {
                return Err(ReturnStatus::MeasurementNotEnabled);
            }
            state.regs.trace_ready_at = Some(state.ready_at());
            Ok(())
        })
    }

    fn spectrum_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool> {
        self.wait(NativeCall::SpectrumWaitForTraceReady, timeout_ms, |r| r.trace_ready_at)
    }

    fn spectrum_trace(&mut self, trace: SpectrumTrace, max_points: i32) -> Reply<Vec<f32>> {
        self.guarded(NativeCall::SpectrumGetTrace, |state| {
            if !state.is_ready(state.regs.trace_ready_at) {
                return Err(ReturnStatus::DataNotReady);
            }
            if trace != SpectrumTrace::Trace1 || !state.regs.trace_enabled {
                return Err(ReturnStatus::MeasurementNotEnabled);
            }
            let bins = state.regs.spectrum.trace_length.min(max_points).max(0) as usize;
            let len = state.shortened(bins);
            let floor = (state.regs.reference_level - 70.0) as f32;
            let peak = (state.regs.reference_level - 20.0) as f32;
            let tone = bins / 2;
            let values = (0..len)
                .map(|n| {
                    let base = if n == tone { peak } else { floor };
                    base + state.noise(2.0)
                })
                .collect();
            Ok(values)
        })
    }

    fn spectrum_trace_info(&mut self) -> Reply<TraceInfo> {
        self.guarded(NativeCall::SpectrumGetTraceInfo, |state| {
            Ok(TraceInfo {
                timestamp: state.tick() as i64,
                acq_data_status: state.trace_status,
            })
        })
    }

    fn iq_set_bandwidth(&mut self, hz: f64) -> Reply<()> {
        self.set(NativeCall::IqblkSetIQBandwidth, |state| {
            in_range(hz, MIN_IQ_BANDWIDTH, MAX_IQ_BANDWIDTH)?;
            state.regs.iq_bandwidth = hz;
            Ok(())
        })
    }

    fn iq_bandwidth(&mut self) -> Reply<f64> {
        self.get(NativeCall::IqblkGetIQBandwidth, |state| state.regs.iq_bandwidth)
    }

    fn iq_min_bandwidth(&mut self) -> Reply<f64> {
        self.get(NativeCall::IqblkGetMinIQBandwidth, |_| MIN_IQ_BANDWIDTH)
    }

    fn iq_max_bandwidth(&mut self) -> Reply<f64> {
        self.get(NativeCall::IqblkGetMaxIQBandwidth, |_| MAX_IQ_BANDWIDTH)
    }

    fn iq_set_record_length(&mut self, samples: i32) -> Reply<()> {
        self.set(NativeCall::IqblkSetIQRecordLength, |state| {
            if !(2..=max_iq_record_length(state.regs.iq_bandwidth)).contains(&samples) {
                return Err(ReturnStatus::Parameter);
            }
            state.regs.iq_record_length = state.record_length_clamp.map_or(samples, |c| samples.min(c));
            Ok(())
        })
    }

    fn iq_record_length(&mut self) -> Reply<i32> {
        self.get(NativeCall::IqblkGetIQRecordLength, |state| state.regs.iq_record_length)
    }

    fn iq_max_record_length(&mut self) -> Reply<i32> {
        self.get(NativeCall::IqblkGetMaxIQRecordLength, |state| {
            max_iq_record_length(state.regs.iq_bandwidth)
        })
    }

    fn iq_sample_rate(&mut self) -> Reply<f64> {
        self.get(NativeCall::IqblkGetIQSampleRate, |state| {
            sample_rate_for_bandwidth(state.regs.iq_bandwidth)
        })
    }

    fn iq_acquire(&mut self) -> Reply<()> {
        self.set(NativeCall::IqblkAcquireIQData, |state| {
            if state.regs.spectrum_enabled || state.regs.dpx_enabled {
                return Err(ReturnStatus::MeasurementNotEnabled);
            }
            state.regs.iq_ready_at = Some(state.ready_at());
            Ok(())
        })
    }

    fn iq_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool> {
        self.wait(NativeCall::IqblkWaitForIQDataReady, timeout_ms, |r| r.iq_ready_at)
    }

    fn iq_data_deinterleaved(&mut self, samples: i32) -> Reply<IqData> {
        self.guarded(NativeCall::IqblkGetIQDataDeinterleaved, |state| {
            if !state.is_ready(state.regs.iq_ready_at) {
                return Err(ReturnStatus::DataNotReady);
            }
            if samples < 0 {
                return Err(ReturnStatus::Parameter);
            }
            let len = state.shortened(samples.min(state.regs.iq_record_length) as usize);
            Ok(state.tone(len))
        })
    }

    fn iq_acq_info(&mut self) -> Reply<IqAcqInfo> {
        self.guarded(NativeCall::IqblkGetIQAcqInfo, |state| {
            let stamp = state.tick();
            Ok(IqAcqInfo {
                sample0_timestamp: stamp,
                trigger_sample_index: 0,
                trigger_timestamp: stamp,
                acq_status: state.iq_status,
            })
        })
    }

    fn dpx_set_enable(&mut self, enable: bool) -> Reply<()> {
        self.set(NativeCall::DpxSetEnable, |state| {
            state.regs.dpx_enabled = enable;
            if enable {
                state.regs.spectrum_enabled = false;
            }
            Ok(())
        })
    }

    fn dpx_set_parameters(&mut self, params: &DpxParameters) -> Reply<()> {
        let params = *params;
        self.set(NativeCall::DpxSetParameters, |state| {
            in_range(params.span, SIM_LIMITS.min_span, SIM_LIMITS.max_span)?;
            in_range(params.rbw, SIM_LIMITS.min_rbw, params.span)?;
            if params.y_top <= params.y_bottom {
                return Err(ReturnStatus::Parameter);
            }
            state.regs.dpx = Some(params);
            Ok(())
        })
    }

    fn dpx_configure(&mut self, spectrum: bool, spectrogram: bool) -> Reply<()> {
        self.set(NativeCall::DpxConfigure, |state| {
            if state.regs.dpx.is_none() {
                return Err(ReturnStatus::Parameter);
            }
            state.regs.dpx_spectrum = spectrum;
            state.regs.dpx_spectrogram = spectrogram;
            Ok(())
        })
    }

    fn dpx_settings(&mut self) -> Reply<DpxSettings> {
        self.get(NativeCall::DpxGetSettings, |state| {
            let params = state.regs.dpx;
            DpxSettings {
                enable_spectrum: state.regs.dpx_spectrum,
                enable_spectrogram: state.regs.dpx_spectrogram,
                bitmap_width: params.map_or(SOGRAM_WIDTH, |p| p.bitmap_width),
                bitmap_height: DPX_BITMAP_HEIGHT,
                trace_length: params.map_or(SOGRAM_WIDTH, |p| p.bitmap_width),
                decay_factor: 0.0,
                actual_rbw: params.map_or(0.0, |p| p.rbw),
            }
        })
    }

    fn sogram_set_parameters(&mut self, params: &SogramParameters) -> Reply<()> {
        let params = *params;
        self.set(NativeCall::DpxSogramSetParameters, |state| {
            if params.time_per_bitmap_line <= 0.0 || params.max_power <= params.min_power {
                return Err(ReturnStatus::Parameter);
            }
            state.regs.sogram = Some(params);
            Ok(())
        })
    }

    fn sogram_settings(&mut self) -> Reply<SogramSettings> {
        self.get(NativeCall::DpxSogramGetSettings, |state| {
            let params = state.regs.sogram;
            SogramSettings {
                bitmap_width: SOGRAM_WIDTH,
                bitmap_height: SOGRAM_HEIGHT,
                trace_line_time: params.map_or(0.0, |p| p.time_resolution),
                bitmap_line_time: params.map_or(0.0, |p| p.time_per_bitmap_line),
            }
        })
    }

    fn dpx_reset(&mut self) -> Reply<()> {
        self.set(NativeCall::DpxReset, |state| {
            state.regs.frame_held = false;
            if state.regs.running && state.regs.dpx_enabled {
                state.regs.dpx_ready_at = Some(state.ready_at());
            }
            Ok(())
        })
    }

    fn dpx_wait_ready(&mut self, timeout_ms: i32) -> Reply<bool> {
        self.wait(NativeCall::DpxWaitForDataReady, timeout_ms, |r| {
            r.dpx_ready_at.filter(|_| r.dpx_spectrogram)
        })
    }

    fn dpx_frame_buffer(&mut self) -> Reply<DpxFrame> {
        self.guarded(NativeCall::DpxGetFrameBuffer, |state| {
            if !state.regs.dpx_spectrogram || !state.is_ready(state.regs.dpx_ready_at) {
                return Err(ReturnStatus::DataNotReady);
            }
            state.regs.frame_held = true;
            let width = SOGRAM_WIDTH as usize;
            let height = SOGRAM_HEIGHT as usize;
            let size = state.shortened(width * height);
            let line_time = state.regs.sogram.map_or(0.01, |p| p.time_per_bitmap_line);
            let mut bitmap = Vec::with_capacity(size);
            for n in 0..size {
                let level: f32 = if n % width == width / 2 { 200.0 } else { 20.0 };
                bitmap.push((level + state.noise(8.0)).clamp(0.0, 255.0) as u8);
            }
            let start = state.tick() as f64 / TIMESTAMP_RATE as f64;
            Ok(DpxFrame {
                fft_per_sec: 10_000,
                fft_count: 10_000,
                frame_count: 1,
                timestamp: start,
                acq_data_status: state.dpx_status,
                sogram_width: SOGRAM_WIDTH,
                sogram_height: SOGRAM_HEIGHT,
                sogram_size: size as i32,
                valid_lines: SOGRAM_HEIGHT,
                bitmap,
                line_timestamps: (0..height).map(|l| start + l as f64 * line_time).collect(),
                line_triggered: vec![false; height],
            })
        })
    }

    fn dpx_finish_frame_buffer(&mut self) -> Reply<()> {
        self.set(NativeCall::DpxFinishFrameBuffer, |state| {
            state.regs.frame_held = false;
            Ok(())
        })
    }

    fn stream_min_bandwidth(&mut self) -> Reply<f64> {
        self.get(NativeCall::IqstreamGetMinAcqBandwidth, |_| MIN_IQ_BANDWIDTH)
    }

    fn stream_max_bandwidth(&mut self) -> Reply<f64> {
        self.get(NativeCall::IqstreamGetMaxAcqBandwidth, |_| MAX_IQ_BANDWIDTH)
    }

    fn stream_set_bandwidth(&mut self, hz: f64) -> Reply<()> {
        self.set(NativeCall::IqstreamSetAcqBandwidth, |state| {
            in_range(hz, MIN_IQ_BANDWIDTH, MAX_IQ_BANDWIDTH)
                .map_err(|_| ReturnStatus::IQStreamBandwidthOutOfRange)?;
            state.regs.stream_bandwidth = hz;
            Ok(())
        })
    }

    fn stream_acq_parameters(&mut self) -> Reply<(f64, f64)> {
        self.get(NativeCall::IqstreamGetAcqParameters, |state| {
            stream_parameters(state.regs.stream_bandwidth)
        })
    }

    fn stream_set_output(&mut self, dest: StreamDestination, dtype: StreamDataType) -> Reply<()> {
        self.set(NativeCall::IqstreamSetOutputConfiguration, |state| {
            // Only split SIQ files of 32-bit floats are modelled.
            if (dest, dtype) != (StreamDestination::FileSiqSplit, StreamDataType::Single) {
                return Err(ReturnStatus::OperationNotSupportedInSimMode);
            }
            state.regs.stream_output = Some((dest, dtype));
            Ok(())
        })
    }

    fn stream_set_filename_base(&mut self, base: &Path) -> Reply<()> {
        self.set(NativeCall::IqstreamSetDiskFilenameBase, |state| {
            state.regs.stream_base = Some(base.to_path_buf());
            Ok(())
        })
    }

    fn stream_set_filename_suffix(&mut self, suffix: i32) -> Reply<()> {
        self.set(NativeCall::IqstreamSetDiskFilenameSuffix, |state| {
            if suffix < sys::IQSSDFN_SUFFIX_NONE as i32 {
                return Err(ReturnStatus::Parameter);
            }
            state.regs.stream_suffix = suffix;
            Ok(())
        })
    }

    fn stream_set_file_length(&mut self, ms: i32) -> Reply<()> {
        self.set(NativeCall::IqstreamSetDiskFileLength, |state| {
            if ms < 0 {
                return Err(ReturnStatus::Parameter);
            }
            state.regs.stream_file_ms = ms;
            Ok(())
        })
    }

    fn stream_clear_status(&mut self) -> Reply<()> {
        self.set(NativeCall::IqstreamClearAcqStatus, |state| {
            state.regs.stream_acq_status = 0;
            Ok(())
        })
    }

    fn stream_start(&mut self) -> Reply<()> {
        self.set(NativeCall::IqstreamStart, |state| {
            if !state.regs.running {
                return Err(ReturnStatus::MeasurementNotEnabled);
            }
            if state.regs.streaming || state.regs.stream_output.is_none() {
                return Err(ReturnStatus::StreamingInvalidParameters);
            }
            // Suffixed names are not modelled: the data lands in `<base>.siqd`.
            if state.regs.stream_suffix != sys::IQSSDFN_SUFFIX_NONE as i32 {
                return Err(ReturnStatus::OperationNotSupportedInSimMode);
            }
            let base = state
                .regs
                .stream_base
                .clone()
                .ok_or(ReturnStatus::IQStreamFileOpenFailed)?;
            let (_, sample_rate) = stream_parameters(state.regs.stream_bandwidth);
            let wanted = (f64::from(state.regs.stream_file_ms) / 1000.0 * sample_rate).ceil() as usize;
            let samples = state.shortened(wanted);
            state.write_stream_file(&base.with_extension("siqd"), samples)?;

            state.regs.streaming = true;
            state.regs.stream_samples = samples as u64;
            state.regs.stream_sample0 = state.tick();
            state.regs.stream_acq_status = state.stream_status;
            // A zero file length streams until stopped.
            state.regs.stream_done_at =
                (state.regs.stream_file_ms > 0).then(|| state.ready_at());
            Ok(())
        })
    }

    fn stream_stop(&mut self) -> Reply<()> {
        self.set(NativeCall::IqstreamStop, |state| {
            state.regs.streaming = false;
            Ok(())
        })
    }

    fn stream_write_status(&mut self) -> Reply<StreamWriteStatus> {
        self.get(NativeCall::IqstreamGetDiskFileWriteStatus, |state| {
            let complete = state.is_ready(state.regs.stream_done_at);
            StreamWriteStatus {
                complete,
                writing: state.regs.streaming && !complete,
            }
        })
    }

    fn stream_file_info(&mut self) -> Reply<StreamFileInfo> {
        self.get(NativeCall::IqstreamGetDiskFileInfo, |state| StreamFileInfo {
            number_samples: state.regs.stream_samples,
            sample0_timestamp: state.regs.stream_sample0,
            trigger_sample_index: 0,
            trigger_timestamp: state.regs.stream_sample0,
            acq_status: state.regs.stream_acq_status,
        })
    }

    fn set_reference_time(&mut self, point: TimePoint) -> Reply<()> {
        self.set(NativeCall::ReftimeSetReferenceTime, |state| {
            if point.nanos >= NANOS_PER_SECOND as u64 {
                return Err(ReturnStatus::Parameter);
            }
            state.reference = point;
            state.reference_source = ReferenceTimeSource::User;
            Ok(())
        })
    }

    fn reference_time_source(&mut self) -> Reply<ReferenceTimeSource> {
        self.get(NativeCall::ReftimeGetReferenceTimeSource, |state| state.reference_source)
    }

    fn current_time(&mut self) -> Reply<TimePoint> {
        self.get(NativeCall::ReftimeGetCurrentTime, |state| state.wall_time(state.clock))
    }

    fn time_from_timestamp(&mut self, timestamp: u64) -> Reply<TimePoint> {
        self.get(NativeCall::ReftimeGetTimeFromTimestamp, |state| state.wall_time(timestamp))
    }

    fn timestamp_rate(&mut self) -> Reply<u64> {
        self.get(NativeCall::ReftimeGetTimestampRate, |_| TIMESTAMP_RATE)
    }
}
