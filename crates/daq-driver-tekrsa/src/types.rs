//! Typed equivalents of the RSA_API enumerations.
//!
//! Each enum maps one-to-one onto the native integer encoding through
//! `to_raw()` / `from_raw()`, in the same way the analog reference and
//! trigger enums are handled in the streaming configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use rsa_api_sys as sys;

/// FFT window applied by the spectrum engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumWindow {
    /// Kaiser (vendor default)
    #[default]
    Kaiser,
    /// MIL 6 dB
    #[serde(rename = "mil_6db")]
    Mil6dB,
    /// Blackman-Harris
    BlackmanHarris,
    /// Rectangular (no window)
    Rectangle,
    /// Flat top
    FlatTop,
    /// Hann
    Hann,
}

impl SpectrumWindow {
    const ALL: [Self; 6] = [
        Self::Kaiser,
        Self::Mil6dB,
        Self::BlackmanHarris,
        Self::Rectangle,
        Self::FlatTop,
        Self::Hann,
    ];

    /// Native `SpectrumWindows` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Kaiser => sys::SpectrumWindow_Kaiser,
            Self::Mil6dB => sys::SpectrumWindow_Mil6dB,
            Self::BlackmanHarris => sys::SpectrumWindow_BlackmanHarris,
            Self::Rectangle => sys::SpectrumWindow_Rectangle,
            Self::FlatTop => sys::SpectrumWindow_FlatTop,
            Self::Hann => sys::SpectrumWindow_Hann,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.to_raw() == raw)
    }
}

/// Vertical unit of spectrum traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalUnit {
    /// dBm
    #[default]
    Dbm,
    /// Watts
    Watt,
    /// Volts
    Volt,
    /// Amperes
    Amp,
    /// dBmV
    Dbmv,
}

impl VerticalUnit {
    const ALL: [Self; 5] = [Self::Dbm, Self::Watt, Self::Volt, Self::Amp, Self::Dbmv];

    /// Native `SpectrumVerticalUnits` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Dbm => sys::SpectrumVerticalUnit_dBm,
            Self::Watt => sys::SpectrumVerticalUnit_Watt,
            Self::Volt => sys::SpectrumVerticalUnit_Volt,
            Self::Amp => sys::SpectrumVerticalUnit_Amp,
            Self::Dbmv => sys::SpectrumVerticalUnit_dBmV,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.to_raw() == raw)
    }
}

impl fmt::Display for VerticalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self {
            Self::Dbm => "dBm",
            Self::Watt => "W",
            Self::Volt => "V",
            Self::Amp => "A",
            Self::Dbmv => "dBmV",
        };
        f.write_str(unit)
    }
}

/// Trace detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumDetector {
    /// Positive peak
    #[default]
    PosPeak,
    /// Negative peak
    NegPeak,
    /// Average (VRMS)
    AverageVrms,
    /// Sample
    Sample,
}

impl SpectrumDetector {
    /// Native `SpectrumDetectors` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::PosPeak => sys::SpectrumDetector_PosPeak,
            Self::NegPeak => sys::SpectrumDetector_NegPeak,
            Self::AverageVrms => sys::SpectrumDetector_AverageVRMS,
            Self::Sample => sys::SpectrumDetector_Sample,
        }) as u32
    }
}

/// One of the three spectrum traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpectrumTrace {
    /// Trace 1, used by the spectrum sweep helper
    #[default]
    Trace1,
    /// Trace 2
    Trace2,
    /// Trace 3
    Trace3,
}

impl SpectrumTrace {
    /// Native `SpectrumTraces` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Trace1 => sys::SpectrumTrace1,
            Self::Trace2 => sys::SpectrumTrace2,
            Self::Trace3 => sys::SpectrumTrace3,
        }) as u32
    }
}

/// Trigger mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Acquire continuously without waiting for a trigger
    #[default]
    FreeRun,
    /// Wait for a trigger event
    Triggered,
}

impl TriggerMode {
    const ALL: [Self; 2] = [Self::FreeRun, Self::Triggered];

    /// Native `TriggerMode` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::FreeRun => sys::freeRun,
            Self::Triggered => sys::triggered,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.to_raw() == raw)
    }
}

/// Trigger source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Rear-panel external trigger input
    #[default]
    External,
    /// IF power level crossing
    IfPowerLevel,
}

impl TriggerSource {
    const ALL: [Self; 2] = [Self::External, Self::IfPowerLevel];

    /// Native `TriggerSource` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::External => sys::TriggerSourceExternal,
            Self::IfPowerLevel => sys::TriggerSourceIFPowerLevel,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.to_raw() == raw)
    }
}

/// Trigger edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTransition {
    /// Low to high
    #[default]
    Rising,
    /// High to low
    Falling,
    /// Either edge
    Either,
}

impl TriggerTransition {
    const ALL: [Self; 3] = [Self::Rising, Self::Falling, Self::Either];

    /// Native `TriggerTransition` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Rising => sys::TriggerTransitionLH,
            Self::Falling => sys::TriggerTransitionHL,
            Self::Either => sys::TriggerTransitionEither,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.to_raw() == raw)
    }
}

/// Frequency reference source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyReference {
    /// Internal oscillator
    #[default]
    Internal,
    /// External 10 MHz reference input
    External,
    /// GNSS-disciplined internal oscillator (500/600 series)
    Gnss,
}

impl FrequencyReference {
    const ALL: [Self; 3] = [Self::Internal, Self::External, Self::Gnss];

    /// Native `FREQREF_SOURCE` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Internal => sys::FRI_INTERNAL,
            Self::External => sys::FRI_EXTREF,
            Self::Gnss => sys::FRI_GNSS,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.to_raw() == raw)
    }
}

/// Device events that can be polled with `DEVICE_GetEventStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceEvent {
    /// ADC input overrange
    Overrange,
    /// Trigger occurred
    Trigger,
    /// GNSS 1PPS pulse (500/600 series)
    OnePps,
}

impl DeviceEvent {
    /// Native event identifier.
    pub fn to_raw(self) -> i32 {
        (match self {
            Self::Overrange => sys::DEVEVENT_OVERRANGE,
            Self::Trigger => sys::DEVEVENT_TRIGGER,
            Self::OnePps => sys::DEVEVENT_1PPS,
        }) as i32
    }
}

/// Where IQ streaming delivers its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDestination {
    /// Client buffers
    Client,
    /// One TIQ file
    FileTiq,
    /// One SIQ file, header and data together
    FileSiq,
    /// SIQ header (`.siqh`) and raw data (`.siqd`) in separate files
    FileSiqSplit,
}

impl StreamDestination {
    /// Native `IQSOUTDEST` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Client => sys::IQSOD_CLIENT,
            Self::FileTiq => sys::IQSOD_FILE_TIQ,
            Self::FileSiq => sys::IQSOD_FILE_SIQ,
            Self::FileSiqSplit => sys::IQSOD_FILE_SIQ_SPLIT,
        }) as u32
    }
}

/// Sample encoding of IQ streaming output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDataType {
    /// 32-bit float, volts
    Single,
    /// 32-bit integer
    Int32,
    /// 16-bit integer
    Int16,
    /// 32-bit float scaled to the integer range
    SingleScaleInt32,
}

impl StreamDataType {
    /// Native `IQSOUTDTYPE` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::Single => sys::IQSODT_SINGLE,
            Self::Int32 => sys::IQSODT_INT32,
            Self::Int16 => sys::IQSODT_INT16,
            Self::SingleScaleInt32 => sys::IQSODT_SINGLE_SCALE_INT32,
        }) as u32
    }
}

/// What the instrument's reference time was last set from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTimeSource {
    /// Not set
    None,
    /// Host system clock at connect
    System,
    /// GNSS receiver (500/600 series)
    Gnss,
    /// Set through `REFTIME_SetReferenceTime`
    User,
}

impl ReferenceTimeSource {
    const ALL: [Self; 4] = [Self::None, Self::System, Self::Gnss, Self::User];

    /// Native `REFTIME_SRC` value.
    pub fn to_raw(self) -> u32 {
        (match self {
            Self::None => sys::RTSRC_NONE,
            Self::System => sys::RTSRC_SYSTEM,
            Self::Gnss => sys::RTSRC_GNSS,
            Self::User => sys::RTSRC_USER,
        }) as u32
    }

    /// Convert from a native value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.to_raw() == raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_encoding() {
        assert_eq!(SpectrumWindow::Kaiser.to_raw(), 0);
        assert_eq!(SpectrumWindow::Hann.to_raw(), 5);
        assert_eq!(SpectrumWindow::from_raw(4), Some(SpectrumWindow::FlatTop));
        assert_eq!(SpectrumWindow::from_raw(17), None);
    }

    #[test]
    fn test_trigger_transition_starts_at_one() {
        assert_eq!(TriggerTransition::Rising.to_raw(), 1);
        assert_eq!(TriggerTransition::from_raw(3), Some(TriggerTransition::Either));
        assert_eq!(TriggerTransition::from_raw(0), None);
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Row {
            window: SpectrumWindow,
            source: TriggerSource,
            reference: FrequencyReference,
        }
        let row: Row = toml::from_str(
            "window = \"blackman_harris\"\nsource = \"if_power_level\"\nreference = \"external\"",
        )
        .unwrap();
        assert_eq!(row.window, SpectrumWindow::BlackmanHarris);
        assert_eq!(row.source, TriggerSource::IfPowerLevel);
        assert_eq!(row.reference, FrequencyReference::External);
    }

    #[test]
    fn test_stream_and_reftime_encoding() {
        assert_eq!(StreamDestination::FileSiqSplit.to_raw(), 3);
        assert_eq!(StreamDataType::Single.to_raw(), 0);
        assert_eq!(ReferenceTimeSource::from_raw(2), Some(ReferenceTimeSource::Gnss));
        assert_eq!(ReferenceTimeSource::from_raw(9), None);
    }
}
