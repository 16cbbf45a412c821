//! Configuration Translator.
//!
//! [`AcquisitionConfig`] is the semantic configuration a caller supplies.
//! It is validated twice: once on its own ([`AcquisitionConfig::validate`],
//! run by the builder) and once against the connected instrument
//! ([`AcquisitionConfig::validate_for`]), which rejects variant-gated
//! fields with `Configuration/UnsupportedOnVariant`.
//!
//! Pushing writes the settings in a fixed order and then reads every
//! readable value back into an [`AppliedConfig`]. The applied config is what
//! the instrument reports, not what was requested.
//!
//! # Example
//!
//! ```
//! use daq_driver_tekrsa::config::AcquisitionConfig;
//!
//! let config = AcquisitionConfig::builder()
//!     .center_frequency(2.4e9)
//!     .span(40e6)
//!     .reference_level(-10.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.trace_length, 801);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{DpxParameters, SogramParameters, SpectrumLimits, SpectrumSettings};
use crate::checker::CheckedApi;
use crate::device::{Capabilities, DeviceInfo};
use crate::error::{ConfigurationFault, Result, TekRsaError};
use crate::types::{
    FrequencyReference, SpectrumDetector, SpectrumTrace, SpectrumWindow, TriggerMode,
    TriggerSource, TriggerTransition, VerticalUnit,
};

/// Reference level range in dBm.
pub const REFERENCE_LEVEL_RANGE: (f64, f64) = (-130.0, 30.0);
/// Attenuation range in dB (500/600 series).
pub const ATTENUATION_RANGE: (f64, f64) = (0.0, 51.0);
/// Highest reference level at which the preamp may be enabled, in dBm.
pub const PREAMP_MAX_REFERENCE_LEVEL: f64 = -15.0;
/// Width of the DPX bitmap in pixels.
pub const DPX_BITMAP_WIDTH: i32 = 801;

/// IQ block sample rate (S/s) and the bandwidth (Hz) that selects it,
/// greatest first.
pub const IQ_SAMPLE_RATE_TABLE: [(f64, f64); 13] = [
    (56.0e6, 40.0e6),
    (28.0e6, 20.0e6),
    (14.0e6, 10.0e6),
    (7.0e6, 5.0e6),
    (3.5e6, 2.5e6),
    (1.75e6, 1.25e6),
    (875.0e3, 625.0e3),
    (437.5e3, 312.5e3),
    (218.75e3, 156.25e3),
    (109.375e3, 78_125.0),
    (54_687.5, 39_062.5),
    (27_343.75, 19_531.25),
    (13_671.875, 9_765.625),
];

/// Bandwidth that yields exactly `sample_rate`, if it is a table rate.
pub fn bandwidth_for_sample_rate(sample_rate: f64) -> Option<f64> {
    IQ_SAMPLE_RATE_TABLE
        .iter()
        .find(|(rate, _)| (rate - sample_rate).abs() <= rate * 1e-9)
        .map(|&(_, bw)| bw)
}

/// Sample rate the instrument uses for a requested IQ bandwidth.
pub fn sample_rate_for_bandwidth(bandwidth: f64) -> f64 {
    IQ_SAMPLE_RATE_TABLE
        .iter()
        .rev()
        .find(|(_, bw)| *bw >= bandwidth)
        .map_or(IQ_SAMPLE_RATE_TABLE[0].0, |&(rate, _)| rate)
}

/// Actual `(bandwidth, sample_rate)` IQ streaming uses for a requested bandwidth.
///
/// Streaming runs at the narrowest table bandwidth covering the request.
pub fn stream_parameters(bandwidth: f64) -> (f64, f64) {
    IQ_SAMPLE_RATE_TABLE
        .iter()
        .rev()
        .find(|(_, bw)| *bw >= bandwidth)
        .map_or(
            (IQ_SAMPLE_RATE_TABLE[0].1, IQ_SAMPLE_RATE_TABLE[0].0),
            |&(rate, bw)| (bw, rate),
        )
}

/// Seconds of signal the instrument can hold in one IQ block.
pub const MAX_IQ_RECORD_SECONDS: f64 = 2.0;

/// Largest IQ block, in sample pairs, at the rate used for `bandwidth`.
pub fn max_iq_record_length(bandwidth: f64) -> i32 {
    let samples = (MAX_IQ_RECORD_SECONDS * sample_rate_for_bandwidth(bandwidth)).floor();
    if samples >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        samples as i32
    }
}

fn default_center_frequency() -> f64 {
    1.5e9
}

fn default_span() -> f64 {
    40.0e6
}

fn default_trace_length() -> i32 {
    801
}

fn default_iq_bandwidth() -> f64 {
    40.0e6
}

fn default_iq_record_length() -> i32 {
    1024
}

fn default_trigger_level() -> f64 {
    -20.0
}

fn default_trigger_position() -> f64 {
    10.0
}

fn default_sogram_bottom() -> f64 {
    -100.0
}

fn default_line_time() -> f64 {
    0.01
}

/// Trigger settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub mode: TriggerMode,
    #[serde(default)]
    pub source: TriggerSource,
    #[serde(default)]
    pub transition: TriggerTransition,
    /// IF power trigger level in dBm
    #[serde(default = "default_trigger_level")]
    pub if_power_level_dbm: f64,
    /// Pre-trigger position in percent of the record
    #[serde(default = "default_trigger_position")]
    pub position_percent: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            mode: TriggerMode::FreeRun,
            source: TriggerSource::External,
            transition: TriggerTransition::Rising,
            if_power_level_dbm: default_trigger_level(),
            position_percent: default_trigger_position(),
        }
    }
}

/// DPX spectrogram settings used by the frame buffer helper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    /// Amplitude mapped to the top of the color scale, dBm
    #[serde(default)]
    pub top_dbm: f64,
    /// Amplitude mapped to the bottom of the color scale, dBm
    #[serde(default = "default_sogram_bottom")]
    pub bottom_dbm: f64,
    /// Time covered by one bitmap line, seconds
    #[serde(default = "default_line_time")]
    pub line_time_s: f64,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            top_dbm: 0.0,
            bottom_dbm: default_sogram_bottom(),
            line_time_s: default_line_time(),
        }
    }
}

/// Semantic acquisition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Center frequency in Hz
    #[serde(default = "default_center_frequency")]
    pub center_frequency_hz: f64,
    /// Reference level in dBm
    #[serde(default)]
    pub reference_level_dbm: f64,
    /// Spectrum span in Hz
    #[serde(default = "default_span")]
    pub span_hz: f64,
    /// Resolution bandwidth in Hz; `None` derives span/100
    #[serde(default)]
    pub rbw_hz: Option<f64>,
    /// Spectrum trace length in bins
    #[serde(default = "default_trace_length")]
    pub trace_length: i32,
    #[serde(default)]
    pub window: SpectrumWindow,
    #[serde(default)]
    pub detector: SpectrumDetector,
    #[serde(default)]
    pub vertical_unit: VerticalUnit,
    /// IQ block bandwidth in Hz
    #[serde(default = "default_iq_bandwidth")]
    pub iq_bandwidth_hz: f64,
    /// IQ block record length in samples
    #[serde(default = "default_iq_record_length")]
    pub iq_record_length: i32,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub frequency_reference: FrequencyReference,
    /// Manual attenuation in dB; `None` selects auto attenuation
    #[serde(default)]
    pub attenuation_db: Option<f64>,
    /// Preamp state; `None` leaves it off
    #[serde(default)]
    pub preamp: Option<bool>,
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            center_frequency_hz: default_center_frequency(),
            reference_level_dbm: 0.0,
            span_hz: default_span(),
            rbw_hz: None,
            trace_length: default_trace_length(),
            window: SpectrumWindow::default(),
            detector: SpectrumDetector::default(),
            vertical_unit: VerticalUnit::default(),
            iq_bandwidth_hz: default_iq_bandwidth(),
            iq_record_length: default_iq_record_length(),
            trigger: TriggerConfig::default(),
            frequency_reference: FrequencyReference::default(),
            attenuation_db: None,
            preamp: None,
            spectrogram: SpectrogramConfig::default(),
        }
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(TekRsaError::out_of_range(format!(
            "{name} {value} outside [{min}, {max}]"
        )))
    }
}

fn unsupported(feature: &str, device: &DeviceInfo) -> TekRsaError {
    TekRsaError::configuration(
        ConfigurationFault::UnsupportedOnVariant,
        format!("{feature} is not available on {}", device.variant),
    )
}

impl AcquisitionConfig {
    /// Create a new builder.
    pub fn builder() -> AcquisitionConfigBuilder {
        AcquisitionConfigBuilder::default()
    }

    /// Select the IQ bandwidth that produces `sample_rate`.
    pub fn with_iq_sample_rate(mut self, sample_rate: f64) -> Result<Self> {
        self.iq_bandwidth_hz = bandwidth_for_sample_rate(sample_rate).ok_or_else(|| {
            let allowed: Vec<String> = IQ_SAMPLE_RATE_TABLE
                .iter()
                .map(|(rate, _)| rate.to_string())
                .collect();
            TekRsaError::out_of_range(format!(
                "sample rate {sample_rate} is not one of {}",
                allowed.join(", ")
            ))
        })?;
        Ok(self)
    }

    /// IQ sample rate implied by the configured bandwidth.
    pub fn iq_sample_rate(&self) -> f64 {
        sample_rate_for_bandwidth(self.iq_bandwidth_hz)
    }

    /// Resolution bandwidth that will be pushed, clamped to the device limits.
    pub fn effective_rbw(&self, limits: &SpectrumLimits) -> f64 {
        let requested = self.rbw_hz.unwrap_or(self.span_hz / 100.0);
        requested
            .min(limits.max_rbw)
            .min(self.span_hz)
            .max(limits.min_rbw)
    }

    /// Device-independent checks.
    pub fn validate(&self) -> Result<()> {
        if !(self.center_frequency_hz.is_finite() && self.center_frequency_hz > 0.0) {
            return Err(TekRsaError::out_of_range(format!(
                "center frequency {} must be positive",
                self.center_frequency_hz
            )));
        }
        let (ref_min, ref_max) = REFERENCE_LEVEL_RANGE;
        check_range("reference level", self.reference_level_dbm, ref_min, ref_max)?;
        check_range("span", self.span_hz, f64::MIN_POSITIVE, f64::MAX)?;
        if let Some(rbw) = self.rbw_hz {
            check_range("RBW", rbw, f64::MIN_POSITIVE, self.span_hz)?;
        }
        if self.trace_length < 2 {
            return Err(TekRsaError::out_of_range(format!(
                "trace length {} must be at least 2",
                self.trace_length
            )));
        }
        check_range("IQ bandwidth", self.iq_bandwidth_hz, f64::MIN_POSITIVE, f64::MAX)?;
        if self.iq_record_length < 2 {
            return Err(TekRsaError::out_of_range(format!(
                "IQ record length {} must be at least 2",
                self.iq_record_length
            )));
        }
        check_range("trigger level", self.trigger.if_power_level_dbm, ref_min, ref_max)?;
        check_range("trigger position", self.trigger.position_percent, 1.0, 99.0)?;
        if let Some(db) = self.attenuation_db {
            check_range("attenuation", db, ATTENUATION_RANGE.0, ATTENUATION_RANGE.1)?;
            if db.fract() != 0.0 {
                return Err(TekRsaError::out_of_range(format!(
                    "attenuation {db} dB must be a whole number of dB"
                )));
            }
        }
        if self.preamp == Some(true) && self.reference_level_dbm > PREAMP_MAX_REFERENCE_LEVEL {
            return Err(TekRsaError::out_of_range(format!(
                "preamp requires reference level <= {PREAMP_MAX_REFERENCE_LEVEL} dBm, got {}",
                self.reference_level_dbm
            )));
        }
        let sogram = &self.spectrogram;
        if !(sogram.top_dbm > sogram.bottom_dbm) {
            return Err(TekRsaError::out_of_range(format!(
                "spectrogram top {} dBm must be above bottom {} dBm",
                sogram.top_dbm, sogram.bottom_dbm
            )));
        }
        check_range("spectrogram line time", sogram.line_time_s, f64::MIN_POSITIVE, f64::MAX)?;
        Ok(())
    }

    /// Checks against the connected instrument, including variant gating.
    pub fn validate_for(&self, device: &DeviceInfo) -> Result<()> {
        self.validate()?;

        if self.attenuation_db.is_some() && !device.supports(Capabilities::ATTENUATOR) {
            return Err(unsupported("RF attenuator", device));
        }
        if self.preamp.is_some() && !device.supports(Capabilities::PREAMP) {
            return Err(unsupported("RF preamp", device));
        }
        if self.frequency_reference == FrequencyReference::Gnss
            && !device.supports(Capabilities::GNSS)
        {
            return Err(unsupported("GNSS frequency reference", device));
        }

        check_range(
            "center frequency",
            self.center_frequency_hz,
            device.min_center_freq,
            device.max_center_freq,
        )?;
        let limits = &device.spectrum_limits;
        check_range("span", self.span_hz, limits.min_span, limits.max_span)?;
        if let Some(rbw) = self.rbw_hz {
            check_range("RBW", rbw, limits.min_rbw, limits.max_rbw.min(self.span_hz))?;
        }
        if self.trace_length < limits.min_trace_length || self.trace_length > limits.max_trace_length
        {
            return Err(TekRsaError::out_of_range(format!(
                "trace length {} outside [{}, {}]",
                self.trace_length, limits.min_trace_length, limits.max_trace_length
            )));
        }
        check_range(
            "IQ bandwidth",
            self.iq_bandwidth_hz,
            device.min_iq_bandwidth,
            device.max_iq_bandwidth,
        )?;
        let max_record = device
            .max_iq_record_length
            .min(max_iq_record_length(self.iq_bandwidth_hz));
        if self.iq_record_length > max_record {
            return Err(TekRsaError::out_of_range(format!(
                "IQ record length {} exceeds {max_record} at {} Hz IQ bandwidth",
                self.iq_record_length, self.iq_bandwidth_hz
            )));
        }
        Ok(())
    }
}

/// Builder for [`AcquisitionConfig`].
#[derive(Debug, Default)]
pub struct AcquisitionConfigBuilder {
    config: AcquisitionConfig,
}

impl AcquisitionConfigBuilder {
    /// Center frequency in Hz.
    pub fn center_frequency(mut self, hz: f64) -> Self {
        self.config.center_frequency_hz = hz;
        self
    }

    /// Reference level in dBm.
    pub fn reference_level(mut self, dbm: f64) -> Self {
        self.config.reference_level_dbm = dbm;
        self
    }

    /// Spectrum span in Hz.
    pub fn span(mut self, hz: f64) -> Self {
        self.config.span_hz = hz;
        self
    }

    /// Resolution bandwidth in Hz.
    pub fn rbw(mut self, hz: f64) -> Self {
        self.config.rbw_hz = Some(hz);
        self
    }

    /// Spectrum trace length in bins.
    pub fn trace_length(mut self, bins: i32) -> Self {
        self.config.trace_length = bins;
        self
    }

    /// FFT window.
    pub fn window(mut self, window: SpectrumWindow) -> Self {
        self.config.window = window;
        self
    }

    /// Trace detector.
    pub fn detector(mut self, detector: SpectrumDetector) -> Self {
        self.config.detector = detector;
        self
    }

    /// Vertical unit of spectrum traces.
    pub fn vertical_unit(mut self, unit: VerticalUnit) -> Self {
        self.config.vertical_unit = unit;
        self
    }

    /// IQ block bandwidth in Hz.
    pub fn iq_bandwidth(mut self, hz: f64) -> Self {
        self.config.iq_bandwidth_hz = hz;
        self
    }

    /// IQ block record length in samples.
    pub fn iq_record_length(mut self, samples: i32) -> Self {
        self.config.iq_record_length = samples;
        self
    }

    /// Trigger settings.
    pub fn trigger(mut self, trigger: TriggerConfig) -> Self {
        self.config.trigger = trigger;
        self
    }

    /// Frequency reference source.
    pub fn frequency_reference(mut self, source: FrequencyReference) -> Self {
        self.config.frequency_reference = source;
        self
    }

    /// Manual attenuation in whole dB (disables auto attenuation).
    pub fn attenuation(mut self, db: f64) -> Self {
        self.config.attenuation_db = Some(db);
        self
    }

    /// RF preamp state.
    pub fn preamp(mut self, enable: bool) -> Self {
        self.config.preamp = Some(enable);
        self
    }

    /// DPX spectrogram settings.
    pub fn spectrogram(mut self, spectrogram: SpectrogramConfig) -> Self {
        self.config.spectrogram = spectrogram;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<AcquisitionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration as reported back by the instrument after a push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedConfig {
    pub center_frequency_hz: f64,
    pub reference_level_dbm: f64,
    pub frequency_reference: FrequencyReference,
    /// Manual attenuation in dB, `None` when auto attenuation is on or absent
    pub attenuation_db: Option<f64>,
    pub preamp: Option<bool>,
    pub trigger: TriggerConfig,
    pub span_hz: f64,
    pub rbw_hz: f64,
    pub trace_length: i32,
    pub window: SpectrumWindow,
    pub vertical_unit: VerticalUnit,
    /// Detector as requested; the driver has no getter for it
    pub detector: SpectrumDetector,
    pub start_frequency_hz: f64,
    pub stop_frequency_hz: f64,
    pub frequency_step_hz: f64,
    pub iq_bandwidth_hz: f64,
    pub iq_record_length: i32,
    pub iq_sample_rate: f64,
    /// Largest IQ block at the applied IQ bandwidth
    pub max_iq_record_length: i32,
    pub spectrogram: SpectrogramConfig,
    pub spectrogram_width: i32,
    pub spectrogram_height: i32,
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

impl AppliedConfig {
    /// Semantic configuration equivalent to what the instrument reports.
    pub fn as_config(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            center_frequency_hz: self.center_frequency_hz,
            reference_level_dbm: self.reference_level_dbm,
            span_hz: self.span_hz,
            rbw_hz: Some(self.rbw_hz),
            trace_length: self.trace_length,
            window: self.window,
            detector: self.detector,
            vertical_unit: self.vertical_unit,
            iq_bandwidth_hz: self.iq_bandwidth_hz,
            iq_record_length: self.iq_record_length,
            trigger: self.trigger,
            frequency_reference: self.frequency_reference,
            attenuation_db: self.attenuation_db,
            preamp: self.preamp,
            spectrogram: self.spectrogram,
        }
    }

    /// Whether every device-reported field equals the requested value.
    pub fn matches(&self, desired: &AcquisitionConfig, limits: &SpectrumLimits) -> bool {
        let trigger = &desired.trigger;
        close(self.center_frequency_hz, desired.center_frequency_hz)
            && close(self.reference_level_dbm, desired.reference_level_dbm)
            && self.frequency_reference == desired.frequency_reference
            && self.attenuation_db == desired.attenuation_db
            && self.preamp.unwrap_or(false) == desired.preamp.unwrap_or(false)
            && self.trigger.mode == trigger.mode
            && self.trigger.source == trigger.source
            && self.trigger.transition == trigger.transition
            && close(self.trigger.if_power_level_dbm, trigger.if_power_level_dbm)
            && close(self.trigger.position_percent, trigger.position_percent)
            && close(self.span_hz, desired.span_hz)
            && close(self.rbw_hz, desired.effective_rbw(limits))
            && self.trace_length == desired.trace_length
            && self.window == desired.window
            && self.vertical_unit == desired.vertical_unit
            && close(self.iq_bandwidth_hz, desired.iq_bandwidth_hz)
            && self.iq_record_length == desired.iq_record_length
            && close(self.spectrogram.line_time_s, desired.spectrogram.line_time_s)
    }
}

/// Write `config` to the instrument and read it back.
///
/// The instrument is stopped first. Writes happen in this order: tuning,
/// front end, trigger, spectrum, IQ block, DPX.
pub(crate) fn push(
    api: &mut CheckedApi,
    config: &AcquisitionConfig,
    device: &DeviceInfo,
) -> Result<AppliedConfig> {
    debug!(
        center_hz = config.center_frequency_hz,
        ref_dbm = config.reference_level_dbm,
        span_hz = config.span_hz,
        "Pushing acquisition config"
    );
    api.call(|a| a.stop())?;

    api.call(|a| a.set_center_freq(config.center_frequency_hz))
        .map_err(|e| e.with_args(config.center_frequency_hz.to_string()))?;
    api.call(|a| a.set_frequency_reference(config.frequency_reference))?;

    api.call(|a| a.set_reference_level(config.reference_level_dbm))
        .map_err(|e| e.with_args(config.reference_level_dbm.to_string()))?;
    if device.supports(Capabilities::ATTENUATOR) {
        match config.attenuation_db {
            Some(db) => {
                api.call(|a| a.set_auto_attenuation(false))?;
                // The driver takes attenuation as a negative value.
                api.call(|a| a.set_rf_attenuator(-db))
                    .map_err(|e| e.with_args((-db).to_string()))?;
            }
            None => api.call(|a| a.set_auto_attenuation(true))?,
        }
    }
    if device.supports(Capabilities::PREAMP) {
        let enable = config.preamp.unwrap_or(false);
        api.call(|a| a.set_rf_preamp(enable))?;
    }

    let trigger = &config.trigger;
    api.call(|a| a.set_trigger_mode(trigger.mode))?;
    api.call(|a| a.set_trigger_source(trigger.source))?;
    api.call(|a| a.set_trigger_transition(trigger.transition))?;
    api.call(|a| a.set_if_power_trigger_level(trigger.if_power_level_dbm))
        .map_err(|e| e.with_args(trigger.if_power_level_dbm.to_string()))?;
    api.call(|a| a.set_trigger_position_percent(trigger.position_percent))
        .map_err(|e| e.with_args(trigger.position_percent.to_string()))?;

    let rbw = config.effective_rbw(&device.spectrum_limits);
    let settings = SpectrumSettings {
        span: config.span_hz,
        rbw,
        enable_vbw: false,
        vbw: rbw,
        trace_length: config.trace_length,
        window: config.window,
        vertical_unit: config.vertical_unit,
    };
    api.call(|a| a.spectrum_set_settings(&settings))
        .map_err(|e| e.with_args(format!("span={}, rbw={rbw}, len={}", config.span_hz, config.trace_length)))?;
    api.call(|a| a.spectrum_set_trace_type(SpectrumTrace::Trace1, true, config.detector))?;

    api.call(|a| a.iq_set_bandwidth(config.iq_bandwidth_hz))
        .map_err(|e| e.with_args(config.iq_bandwidth_hz.to_string()))?;
    // The record length limit depends on the bandwidth just pushed.
    let max_record = api.call(|a| a.iq_max_record_length())?;
    if config.iq_record_length > max_record {
        return Err(TekRsaError::out_of_range(format!(
            "IQ record length {} exceeds {max_record} at {} Hz IQ bandwidth",
            config.iq_record_length, config.iq_bandwidth_hz
        )));
    }
    api.call(|a| a.iq_set_record_length(config.iq_record_length))
        .map_err(|e| e.with_args(config.iq_record_length.to_string()))?;

    let sogram = &config.spectrogram;
    let dpx = DpxParameters {
        span: config.span_hz,
        rbw,
        bitmap_width: DPX_BITMAP_WIDTH,
        trace_points_per_pixel: 1,
        y_top: sogram.top_dbm,
        y_bottom: sogram.bottom_dbm,
        infinite_persistence: false,
        persistence_time_s: 1.0,
        show_only_triggered: false,
    };
    api.call(|a| a.dpx_set_parameters(&dpx))?;
    let sogram_params = SogramParameters {
        time_per_bitmap_line: sogram.line_time_s,
        time_resolution: sogram.line_time_s,
        max_power: sogram.top_dbm,
        min_power: sogram.bottom_dbm,
    };
    api.call(|a| a.sogram_set_parameters(&sogram_params))?;

    read_back(api, config, device)
}

/// Read the instrument's current settings.
pub(crate) fn read_back(
    api: &mut CheckedApi,
    requested: &AcquisitionConfig,
    device: &DeviceInfo,
) -> Result<AppliedConfig> {
    let (attenuation_db, preamp) = if device.supports(Capabilities::ATTENUATOR) {
        let auto = api.call(|a| a.auto_attenuation())?;
        let attenuation = if auto {
            None
        } else {
            Some(-api.call(|a| a.rf_attenuator())?)
        };
        let preamp = if device.supports(Capabilities::PREAMP) {
            Some(api.call(|a| a.rf_preamp())?)
        } else {
            None
        };
        (attenuation, preamp)
    } else {
        (None, None)
    };

    let spectrum = api.call(|a| a.spectrum_settings())?;
    let sogram = api.call(|a| a.sogram_settings())?;
    let applied = AppliedConfig {
        center_frequency_hz: api.call(|a| a.center_freq())?,
        reference_level_dbm: api.call(|a| a.reference_level())?,
        frequency_reference: api.call(|a| a.frequency_reference())?,
        attenuation_db,
        preamp,
        trigger: TriggerConfig {
            mode: api.call(|a| a.trigger_mode())?,
            source: api.call(|a| a.trigger_source())?,
            transition: api.call(|a| a.trigger_transition())?,
            if_power_level_dbm: api.call(|a| a.if_power_trigger_level())?,
            position_percent: api.call(|a| a.trigger_position_percent())?,
        },
        span_hz: spectrum.settings.span,
        rbw_hz: spectrum.settings.rbw,
        trace_length: spectrum.settings.trace_length,
        window: spectrum.settings.window,
        vertical_unit: spectrum.settings.vertical_unit,
        detector: requested.detector,
        start_frequency_hz: spectrum.actual_start_freq,
        stop_frequency_hz: spectrum.actual_stop_freq,
        frequency_step_hz: spectrum.actual_freq_step,
        iq_bandwidth_hz: api.call(|a| a.iq_bandwidth())?,
        iq_record_length: api.call(|a| a.iq_record_length())?,
        iq_sample_rate: api.call(|a| a.iq_sample_rate())?,
        max_iq_record_length: api.call(|a| a.iq_max_record_length())?,
        spectrogram: SpectrogramConfig {
            top_dbm: requested.spectrogram.top_dbm,
            bottom_dbm: requested.spectrogram.bottom_dbm,
            line_time_s: sogram.bitmap_line_time,
        },
        spectrogram_width: sogram.bitmap_width,
        spectrogram_height: sogram.bitmap_height,
    };
    debug!(
        center_hz = applied.center_frequency_hz,
        rbw_hz = applied.rbw_hz,
        sample_rate = applied.iq_sample_rate,
        "Read back applied config"
    );
    Ok(applied)
}

/// Change only the IQ record length and return the device-reported value.
pub(crate) fn push_record_length(api: &mut CheckedApi, samples: i32) -> Result<i32> {
    api.call(|a| a.stop())?;
    api.call(|a| a.iq_set_record_length(samples))
        .map_err(|e| e.with_args(samples.to_string()))?;
    api.call(|a| a.iq_record_length())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NativeDeviceInfo;
    use crate::device::DeviceVariant;
    use crate::error::ErrorClass;

    fn device(variant: DeviceVariant) -> DeviceInfo {
        DeviceInfo::assemble(
            NativeDeviceInfo::default(),
            variant,
            variant.nominal_frequency_range(),
            SpectrumLimits {
                max_span: 40e6,
                min_span: 1e3,
                max_rbw: 10e6,
                min_rbw: 10.0,
                max_vbw: 10e6,
                min_vbw: 1.0,
                max_trace_length: 64001,
                min_trace_length: 801,
            },
            (100.0, 40e6),
            112_000_000,
            112_000_000,
        )
    }

    #[test]
    fn test_builder_defaults() {
        let config = AcquisitionConfig::builder().build().unwrap();
        assert_eq!(config, AcquisitionConfig::default());
        assert_eq!(config.iq_sample_rate(), 56.0e6);
    }

    #[test]
    fn test_reference_level_range() {
        assert!(AcquisitionConfig::builder().reference_level(30.0).build().is_ok());
        let err = AcquisitionConfig::builder()
            .reference_level(31.0)
            .build()
            .unwrap_err();
        assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));
    }

    #[test]
    fn test_attenuation_must_be_whole_db() {
        assert!(AcquisitionConfig::builder().attenuation(10.5).build().is_err());
        assert!(AcquisitionConfig::builder().attenuation(52.0).build().is_err());
        assert!(AcquisitionConfig::builder().attenuation(51.0).build().is_ok());
    }

    #[test]
    fn test_preamp_needs_low_reference_level() {
        assert!(AcquisitionConfig::builder().preamp(true).build().is_err());
        assert!(AcquisitionConfig::builder()
            .preamp(true)
            .reference_level(-20.0)
            .build()
            .is_ok());
    }

    #[test]
    fn test_sample_rate_table() {
        assert_eq!(bandwidth_for_sample_rate(56.0e6), Some(40.0e6));
        assert_eq!(bandwidth_for_sample_rate(27_343.75), Some(19_531.25));
        assert_eq!(bandwidth_for_sample_rate(50.0e6), None);
        assert_eq!(sample_rate_for_bandwidth(5.0e6), 7.0e6);
        assert_eq!(sample_rate_for_bandwidth(4.0e6), 7.0e6);
        assert_eq!(sample_rate_for_bandwidth(1.0), 13_671.875);

        let config = AcquisitionConfig::default().with_iq_sample_rate(14.0e6).unwrap();
        assert_eq!(config.iq_bandwidth_hz, 10.0e6);
        assert!(AcquisitionConfig::default().with_iq_sample_rate(1.0e6).is_err());
    }

    #[test]
    fn test_variant_gating() {
        let config = AcquisitionConfig::builder().attenuation(10.0).build().unwrap();
        let err = config.validate_for(&device(DeviceVariant::Rsa306B)).unwrap_err();
        assert_eq!(
            err.configuration_fault(),
            Some(ConfigurationFault::UnsupportedOnVariant)
        );
        assert!(config.validate_for(&device(DeviceVariant::Rsa507A)).is_ok());

        let gnss = AcquisitionConfig::builder()
            .frequency_reference(FrequencyReference::Gnss)
            .build()
            .unwrap();
        assert!(gnss.validate_for(&device(DeviceVariant::Rsa306B)).is_err());
        assert!(gnss.validate_for(&device(DeviceVariant::Rsa603A)).is_ok());
    }

    #[test]
    fn test_record_length_limit_follows_bandwidth() {
        assert_eq!(max_iq_record_length(40e6), 112_000_000);
        assert_eq!(max_iq_record_length(10e6), 28_000_000);
        assert_eq!(max_iq_record_length(9_765.625), 27_343);

        let info = device(DeviceVariant::Rsa306B);
        let narrow = AcquisitionConfig::builder()
            .iq_bandwidth(9_765.625)
            .iq_record_length(30_000)
            .build()
            .unwrap();
        let err = narrow.validate_for(&info).unwrap_err();
        assert_eq!(err.configuration_fault(), Some(ConfigurationFault::OutOfRange));

        let wide = AcquisitionConfig::builder()
            .iq_bandwidth(40e6)
            .iq_record_length(30_000)
            .build()
            .unwrap();
        assert!(wide.validate_for(&info).is_ok());
    }

    #[test]
    fn test_stream_parameters_round_up() {
        assert_eq!(stream_parameters(40e6), (40e6, 56e6));
        assert_eq!(stream_parameters(6e6), (10e6, 14e6));
        assert_eq!(stream_parameters(5e3), (9_765.625, 13_671.875));
        assert_eq!(stream_parameters(80e6), (40e6, 56e6));
    }

    #[test]
    fn test_frequency_range_per_variant() {
        let config = AcquisitionConfig::builder().center_frequency(5.0e9).build().unwrap();
        assert!(config.validate_for(&device(DeviceVariant::Rsa306B)).is_ok());
        let err = config.validate_for(&device(DeviceVariant::Rsa603A)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_effective_rbw() {
        let info = device(DeviceVariant::Rsa306B);
        let limits = &info.spectrum_limits;
        let config = AcquisitionConfig::builder().span(40e6).build().unwrap();
        assert_eq!(config.effective_rbw(limits), 400e3);
        let narrow = AcquisitionConfig::builder().span(1e3).build().unwrap();
        assert_eq!(narrow.effective_rbw(limits), 10.0);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: AcquisitionConfig = toml::from_str(
            r#"
            center_frequency_hz = 2.4e9
            reference_level_dbm = -10.0
            window = "hann"

            [trigger]
            mode = "triggered"
            source = "if_power_level"
            "#,
        )
        .unwrap();
        assert_eq!(config.center_frequency_hz, 2.4e9);
        assert_eq!(config.window, SpectrumWindow::Hann);
        assert_eq!(config.trigger.mode, TriggerMode::Triggered);
        assert_eq!(config.trigger.position_percent, 10.0);
        assert_eq!(config.span_hz, 40e6);
        config.validate().unwrap();
    }
}
