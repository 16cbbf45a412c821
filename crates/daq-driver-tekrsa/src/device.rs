//! Device identity, variants and capability sets.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::api::{FoundDevice, NativeDeviceInfo, SpectrumLimits};

bitflags! {
    /// Variant-gated hardware features, fixed at connect time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Programmable RF attenuator
        const ATTENUATOR = 1 << 0;
        /// Built-in RF preamplifier
        const PREAMP = 1 << 1;
        /// GNSS receiver (frequency reference, 1PPS)
        const GNSS = 1 << 2;
        /// Battery pack
        const BATTERY = 1 << 3;
    }
}

/// Supported RSA models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceVariant {
    #[serde(rename = "RSA306")]
    Rsa306,
    #[serde(rename = "RSA306B")]
    Rsa306B,
    #[serde(rename = "RSA503A")]
    Rsa503A,
    #[serde(rename = "RSA507A")]
    Rsa507A,
    #[serde(rename = "RSA513A")]
    Rsa513A,
    #[serde(rename = "RSA518A")]
    Rsa518A,
    #[serde(rename = "RSA603A")]
    Rsa603A,
    #[serde(rename = "RSA607A")]
    Rsa607A,
}

impl DeviceVariant {
    /// Every supported model.
    pub const ALL: [Self; 8] = [
        Self::Rsa306,
        Self::Rsa306B,
        Self::Rsa503A,
        Self::Rsa507A,
        Self::Rsa513A,
        Self::Rsa518A,
        Self::Rsa603A,
        Self::Rsa607A,
    ];

    /// Model name as reported by the driver.
    pub fn model(self) -> &'static str {
        match self {
            Self::Rsa306 => "RSA306",
            Self::Rsa306B => "RSA306B",
            Self::Rsa503A => "RSA503A",
            Self::Rsa507A => "RSA507A",
            Self::Rsa513A => "RSA513A",
            Self::Rsa518A => "RSA518A",
            Self::Rsa603A => "RSA603A",
            Self::Rsa607A => "RSA607A",
        }
    }

    /// Parse a `DEVICE_Search` type string or `DEVICE_INFO` nomenclature.
    pub fn from_device_type(device_type: &str) -> Option<Self> {
        let device_type = device_type.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.model().eq_ignore_ascii_case(device_type))
    }

    /// Hardware features of this model.
    pub fn capabilities(self) -> Capabilities {
        match self {
            Self::Rsa306 | Self::Rsa306B => Capabilities::empty(),
            Self::Rsa503A | Self::Rsa507A | Self::Rsa513A | Self::Rsa518A => Capabilities::all(),
            Self::Rsa603A | Self::Rsa607A => {
                Capabilities::ATTENUATOR | Capabilities::PREAMP | Capabilities::GNSS
            }
        }
    }

    /// Datasheet center-frequency range in Hz.
    ///
    /// The device-reported range from `CONFIG_GetMin/MaxCenterFreq` is
    /// authoritative once connected.
    pub fn nominal_frequency_range(self) -> (f64, f64) {
        let max = match self {
            Self::Rsa306 | Self::Rsa306B => 6.2e9,
            Self::Rsa503A | Self::Rsa603A => 3.0e9,
            Self::Rsa507A | Self::Rsa607A => 7.5e9,
            Self::Rsa513A => 13.6e9,
            Self::Rsa518A => 18.0e9,
        };
        (9.0e3, max)
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model())
    }
}

/// A supported instrument found by `search()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Driver-assigned device ID, valid until the next search
    pub id: i32,
    /// Serial number
    pub serial: String,
    /// Raw device type string
    pub device_type: String,
    /// Parsed model
    pub variant: DeviceVariant,
}

impl DeviceDescriptor {
    /// Keep only supported models.
    pub(crate) fn from_found(found: FoundDevice) -> Option<Self> {
        let variant = DeviceVariant::from_device_type(&found.device_type)?;
        Some(Self {
            id: found.id,
            serial: found.serial,
            device_type: found.device_type,
            variant,
        })
    }
}

/// Which instrument `connect()` should open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// The only attached supported instrument
    #[default]
    Any,
    /// Driver device ID from a previous search
    Id(i32),
    /// Serial number
    Serial(String),
    /// A descriptor returned by `search()`
    Descriptor(DeviceDescriptor),
}

impl From<DeviceDescriptor> for DeviceSelector {
    fn from(descriptor: DeviceDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<&DeviceDescriptor> for DeviceSelector {
    fn from(descriptor: &DeviceDescriptor) -> Self {
        Self::Descriptor(descriptor.clone())
    }
}

/// Opaque handle to a connected instrument.
///
/// Valid for one connection; `generation` changes on every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    device_id: i32,
    generation: u64,
}

impl DeviceHandle {
    pub(crate) fn new(device_id: i32, generation: u64) -> Self {
        Self {
            device_id,
            generation,
        }
    }

    /// Driver device ID.
    pub fn device_id(&self) -> i32 {
        self.device_id
    }

    /// Connection generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Immutable snapshot of the connected instrument, fetched once per connect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub serial_number: String,
    pub nomenclature: String,
    pub api_version: String,
    pub firmware_version: String,
    pub fpga_version: String,
    pub hardware_version: String,
    pub variant: DeviceVariant,
    #[serde(skip)]
    pub capabilities: Capabilities,
    /// Device-reported center-frequency range in Hz
    pub min_center_freq: f64,
    pub max_center_freq: f64,
    #[serde(skip)]
    pub spectrum_limits: SpectrumLimits,
    /// IQ block bandwidth range in Hz
    pub min_iq_bandwidth: f64,
    pub max_iq_bandwidth: f64,
    /// Largest IQ block record length in samples, at the widest IQ bandwidth
    pub max_iq_record_length: i32,
    /// Timestamp counter ticks per second
    pub timestamp_rate: u64,
}

impl DeviceInfo {
    pub(crate) fn assemble(
        native: NativeDeviceInfo,
        variant: DeviceVariant,
        center_range: (f64, f64),
        spectrum_limits: SpectrumLimits,
        iq_bandwidth_range: (f64, f64),
        max_iq_record_length: i32,
        timestamp_rate: u64,
    ) -> Self {
        Self {
            serial_number: native.serial_number,
            nomenclature: native.nomenclature,
            api_version: native.api_version,
            firmware_version: native.fw_version,
            fpga_version: native.fpga_version,
            hardware_version: native.hw_version,
            variant,
            capabilities: variant.capabilities(),
            min_center_freq: center_range.0,
            max_center_freq: center_range.1,
            spectrum_limits,
            min_iq_bandwidth: iq_bandwidth_range.0,
            max_iq_bandwidth: iq_bandwidth_range.1,
            max_iq_record_length,
            timestamp_rate,
        }
    }

    /// Whether the instrument has every feature in `caps`.
    pub fn supports(&self, caps: Capabilities) -> bool {
        self.capabilities.contains(caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parsing() {
        assert_eq!(DeviceVariant::from_device_type("RSA306B"), Some(DeviceVariant::Rsa306B));
        assert_eq!(DeviceVariant::from_device_type(" rsa607a "), Some(DeviceVariant::Rsa607A));
        assert_eq!(DeviceVariant::from_device_type("RSA5126B"), None);
    }

    #[test]
    fn test_capabilities_by_series() {
        assert!(DeviceVariant::Rsa306B.capabilities().is_empty());
        assert!(DeviceVariant::Rsa507A.capabilities().contains(Capabilities::BATTERY));
        let caps = DeviceVariant::Rsa603A.capabilities();
        assert!(caps.contains(Capabilities::ATTENUATOR | Capabilities::PREAMP | Capabilities::GNSS));
        assert!(!caps.contains(Capabilities::BATTERY));
    }

    #[test]
    fn test_descriptor_filters_unsupported() {
        let found = FoundDevice {
            id: 3,
            serial: "B0100".into(),
            device_type: "RSA5126B".into(),
        };
        assert!(DeviceDescriptor::from_found(found).is_none());
    }

    #[test]
    fn test_variant_serde_uses_model_names() {
        #[derive(Deserialize)]
        struct Row {
            model: DeviceVariant,
        }
        let row: Row = toml::from_str("model = \"RSA513A\"").unwrap();
        assert_eq!(row.model, DeviceVariant::Rsa513A);
    }
}
