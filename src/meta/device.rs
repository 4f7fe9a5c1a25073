use std::fmt::Display;

use crate::impl_param_described;
use crate::params::ParamList;

/// The kinds of hardware a light path or acquisition may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    Microscope,
    ExcitationSource,
    OpticalFilter,
    DichroicMirror,
    Photodetector,
    Indicator,
    #[default]
    Unknown,
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Common behavior of device metadata records.
///
/// A device may record at most one wavelength that it treats as authoritative, e.g. the
/// emission peak of an excitation laser. Light paths referencing the device are checked
/// against that value when they are built.
pub trait DeviceLike {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn kind(&self) -> DeviceKind;

    /// The name and value, in nanometers, of the wavelength this device records, if any
    fn recorded_wavelength(&self) -> Option<(&'static str, f64)> {
        None
    }
}

macro_rules! impl_device_like {
    ($t:ty, $kind:expr) => {
        impl_device_like!($t, $kind, |_this: &$t| None);
    };
    ($t:ty, $kind:expr, $wavelength:expr) => {
        impl DeviceLike for $t {
            fn name(&self) -> &str {
                &self.name
            }

            fn description(&self) -> &str {
                &self.description
            }

            fn kind(&self) -> DeviceKind {
                $kind
            }

            fn recorded_wavelength(&self) -> Option<(&'static str, f64)> {
                ($wavelength)(self)
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Microscope {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub params: ParamList,
}

/// A light source used to excite the sample, e.g. a laser or LED
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExcitationSource {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub illumination_type: String,
    pub excitation_wavelength_in_nm: Option<f64>,
    pub power_in_w: Option<f64>,
    pub intensity_in_w_per_m2: Option<f64>,
    pub exposure_time_in_s: Option<f64>,
    pub params: ParamList,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpticalFilter {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub filter_type: String,
    /// Filters pass a band rather than a single wavelength, so this is descriptive only
    pub center_wavelength_in_nm: Option<f64>,
    pub bandwidth_in_nm: Option<f64>,
    pub params: ParamList,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DichroicMirror {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub cut_on_wavelength_in_nm: Option<f64>,
    pub cut_off_wavelength_in_nm: Option<f64>,
    pub params: ParamList,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Photodetector {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub detector_type: String,
    pub detected_wavelength_in_nm: Option<f64>,
    pub gain: Option<f64>,
    pub params: ParamList,
}

/// A fluorescent indicator expressed or injected in the imaged tissue
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Indicator {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub label: String,
    pub injection_location: String,
    pub emission_wavelength_in_nm: Option<f64>,
    pub params: ParamList,
}

impl_device_like!(Microscope, DeviceKind::Microscope);
impl_device_like!(OpticalFilter, DeviceKind::OpticalFilter);
impl_device_like!(DichroicMirror, DeviceKind::DichroicMirror);
impl_device_like!(
    ExcitationSource,
    DeviceKind::ExcitationSource,
    |this: &ExcitationSource| this
        .excitation_wavelength_in_nm
        .map(|w| ("excitation_wavelength_in_nm", w))
);
impl_device_like!(
    Photodetector,
    DeviceKind::Photodetector,
    |this: &Photodetector| this
        .detected_wavelength_in_nm
        .map(|w| ("detected_wavelength_in_nm", w))
);
impl_device_like!(Indicator, DeviceKind::Indicator, |this: &Indicator| this
    .emission_wavelength_in_nm
    .map(|w| ("emission_wavelength_in_nm", w)));

impl_param_described!(
    Microscope,
    ExcitationSource,
    OpticalFilter,
    DichroicMirror,
    Photodetector,
    Indicator
);
