//! Excitation and emission light paths, and the checks that keep them consistent with
//! the devices they reference.
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use super::device::{
    DeviceLike, DichroicMirror, ExcitationSource, Indicator, OpticalFilter, Photodetector,
};
use crate::error::ErrorKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LightPathError {
    #[error(
        "{path} `{path_attribute}` ({path_wavelength} nm) does not match \
         {device} `{device_attribute}` ({device_wavelength} nm)"
    )]
    WavelengthMismatch {
        path: String,
        path_attribute: &'static str,
        path_wavelength: f64,
        device: String,
        device_attribute: &'static str,
        device_wavelength: f64,
    },
    #[error(
        "Invalid excitation mode {0:?}, \
         expected one of: one-photon, two-photon, three-photon, other"
    )]
    InvalidExcitationMode(String),
}

impl LightPathError {
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Require a device's recorded wavelength to equal a light path's nominal wavelength.
///
/// The comparison is exact. A missing device, or one that records no wavelength, passes.
pub fn check_wavelength<D: DeviceLike + ?Sized>(
    path: &str,
    path_attribute: &'static str,
    path_wavelength: f64,
    device: Option<&D>,
) -> Result<(), LightPathError> {
    let Some(device) = device else {
        return Ok(());
    };
    match device.recorded_wavelength() {
        Some((device_attribute, device_wavelength)) if device_wavelength != path_wavelength => {
            Err(LightPathError::WavelengthMismatch {
                path: path.to_string(),
                path_attribute,
                path_wavelength,
                device: device.name().to_string(),
                device_attribute,
                device_wavelength,
            })
        }
        _ => Ok(()),
    }
}

/// The photon regime used to excite the sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExcitationMode {
    OnePhoton,
    TwoPhoton,
    ThreePhoton,
    Other,
}

impl ExcitationMode {
    pub const ALL: [ExcitationMode; 4] = [
        Self::OnePhoton,
        Self::TwoPhoton,
        Self::ThreePhoton,
        Self::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnePhoton => "one-photon",
            Self::TwoPhoton => "two-photon",
            Self::ThreePhoton => "three-photon",
            Self::Other => "other",
        }
    }
}

impl FromStr for ExcitationMode {
    type Err = LightPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| LightPathError::InvalidExcitationMode(s.to_string()))
    }
}

impl Display for ExcitationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The optical path that delivers excitation light to the sample.
///
/// Built through [`ExcitationLightPath::builder`], which validates the excitation mode and
/// the excitation source's wavelength before anything is returned.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExcitationLightPath {
    name: String,
    description: String,
    excitation_wavelength_in_nm: f64,
    excitation_mode: Option<ExcitationMode>,
    excitation_source: Option<Arc<ExcitationSource>>,
    excitation_filter: Option<Arc<OpticalFilter>>,
    dichroic_mirror: Option<Arc<DichroicMirror>>,
}

impl ExcitationLightPath {
    pub fn builder<S: Into<String>>(
        name: S,
        excitation_wavelength_in_nm: f64,
    ) -> ExcitationLightPathBuilder {
        ExcitationLightPathBuilder {
            name: name.into(),
            excitation_wavelength_in_nm,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn excitation_wavelength_in_nm(&self) -> f64 {
        self.excitation_wavelength_in_nm
    }

    pub fn excitation_mode(&self) -> Option<ExcitationMode> {
        self.excitation_mode
    }

    pub fn excitation_source(&self) -> Option<&Arc<ExcitationSource>> {
        self.excitation_source.as_ref()
    }

    pub fn excitation_filter(&self) -> Option<&Arc<OpticalFilter>> {
        self.excitation_filter.as_ref()
    }

    pub fn dichroic_mirror(&self) -> Option<&Arc<DichroicMirror>> {
        self.dichroic_mirror.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExcitationLightPathBuilder {
    name: String,
    description: String,
    excitation_wavelength_in_nm: f64,
    excitation_mode: Option<String>,
    excitation_source: Option<Arc<ExcitationSource>>,
    excitation_filter: Option<Arc<OpticalFilter>>,
    dichroic_mirror: Option<Arc<DichroicMirror>>,
}

impl ExcitationLightPathBuilder {
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Set the excitation mode from its textual form, which is checked by [`Self::build`]
    pub fn excitation_mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.excitation_mode = Some(mode.into());
        self
    }

    pub fn excitation_source(mut self, source: Arc<ExcitationSource>) -> Self {
        self.excitation_source = Some(source);
        self
    }

    pub fn excitation_filter(mut self, filter: Arc<OpticalFilter>) -> Self {
        self.excitation_filter = Some(filter);
        self
    }

    pub fn dichroic_mirror(mut self, mirror: Arc<DichroicMirror>) -> Self {
        self.dichroic_mirror = Some(mirror);
        self
    }

    pub fn build(self) -> Result<ExcitationLightPath, LightPathError> {
        let excitation_mode = self
            .excitation_mode
            .as_deref()
            .map(ExcitationMode::from_str)
            .transpose()?;

        check_wavelength(
            &self.name,
            "excitation_wavelength_in_nm",
            self.excitation_wavelength_in_nm,
            self.excitation_source.as_deref(),
        )?;

        log::debug!(
            "Built excitation light path {} at {} nm",
            self.name,
            self.excitation_wavelength_in_nm
        );
        Ok(ExcitationLightPath {
            name: self.name,
            description: self.description,
            excitation_wavelength_in_nm: self.excitation_wavelength_in_nm,
            excitation_mode,
            excitation_source: self.excitation_source,
            excitation_filter: self.excitation_filter,
            dichroic_mirror: self.dichroic_mirror,
        })
    }
}

/// The optical path that carries emitted light from the sample to the detector.
///
/// Built through [`EmissionLightPath::builder`], which checks the indicator's emission
/// wavelength and the photodetector's detected wavelength.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmissionLightPath {
    name: String,
    description: String,
    emission_wavelength_in_nm: f64,
    indicator: Option<Arc<Indicator>>,
    photodetector: Option<Arc<Photodetector>>,
    emission_filter: Option<Arc<OpticalFilter>>,
    dichroic_mirror: Option<Arc<DichroicMirror>>,
}

impl EmissionLightPath {
    pub fn builder<S: Into<String>>(
        name: S,
        emission_wavelength_in_nm: f64,
    ) -> EmissionLightPathBuilder {
        EmissionLightPathBuilder {
            name: name.into(),
            emission_wavelength_in_nm,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn emission_wavelength_in_nm(&self) -> f64 {
        self.emission_wavelength_in_nm
    }

    pub fn indicator(&self) -> Option<&Arc<Indicator>> {
        self.indicator.as_ref()
    }

    pub fn photodetector(&self) -> Option<&Arc<Photodetector>> {
        self.photodetector.as_ref()
    }

    pub fn emission_filter(&self) -> Option<&Arc<OpticalFilter>> {
        self.emission_filter.as_ref()
    }

    pub fn dichroic_mirror(&self) -> Option<&Arc<DichroicMirror>> {
        self.dichroic_mirror.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmissionLightPathBuilder {
    name: String,
    description: String,
    emission_wavelength_in_nm: f64,
    indicator: Option<Arc<Indicator>>,
    photodetector: Option<Arc<Photodetector>>,
    emission_filter: Option<Arc<OpticalFilter>>,
    dichroic_mirror: Option<Arc<DichroicMirror>>,
}

impl EmissionLightPathBuilder {
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn indicator(mut self, indicator: Arc<Indicator>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    pub fn photodetector(mut self, photodetector: Arc<Photodetector>) -> Self {
        self.photodetector = Some(photodetector);
        self
    }

    pub fn emission_filter(mut self, filter: Arc<OpticalFilter>) -> Self {
        self.emission_filter = Some(filter);
        self
    }

    pub fn dichroic_mirror(mut self, mirror: Arc<DichroicMirror>) -> Self {
        self.dichroic_mirror = Some(mirror);
        self
    }

    pub fn build(self) -> Result<EmissionLightPath, LightPathError> {
        check_wavelength(
            &self.name,
            "emission_wavelength_in_nm",
            self.emission_wavelength_in_nm,
            self.indicator.as_deref(),
        )?;
        check_wavelength(
            &self.name,
            "emission_wavelength_in_nm",
            self.emission_wavelength_in_nm,
            self.photodetector.as_deref(),
        )?;

        log::debug!(
            "Built emission light path {} at {} nm",
            self.name,
            self.emission_wavelength_in_nm
        );
        Ok(EmissionLightPath {
            name: self.name,
            description: self.description,
            emission_wavelength_in_nm: self.emission_wavelength_in_nm,
            indicator: self.indicator,
            photodetector: self.photodetector,
            emission_filter: self.emission_filter,
            dichroic_mirror: self.dichroic_mirror,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn laser(wavelength: Option<f64>) -> Arc<ExcitationSource> {
        Arc::new(ExcitationSource {
            name: "laser".into(),
            excitation_wavelength_in_nm: wavelength,
            ..Default::default()
        })
    }

    #[test_log::test]
    fn test_excitation_wavelength_mismatch() {
        let err = ExcitationLightPath::builder("excitation", 600.0)
            .excitation_source(laser(Some(488.0)))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let message = err.to_string();
        assert!(message.contains("600"), "{message}");
        assert!(message.contains("488"), "{message}");
        assert!(message.contains("excitation_wavelength_in_nm"), "{message}");
        assert!(message.contains("laser"), "{message}");
    }

    #[test_log::test]
    fn test_excitation_wavelength_match() -> Result<(), LightPathError> {
        let source = laser(Some(488.0));
        let path = ExcitationLightPath::builder("excitation", 488.0)
            .description("blue excitation")
            .excitation_mode("one-photon")
            .excitation_source(source.clone())
            .build()?;
        assert_eq!(path.excitation_mode(), Some(ExcitationMode::OnePhoton));
        assert_eq!(path.excitation_source(), Some(&source));
        assert_eq!(path.description(), "blue excitation");

        // No device, or a device with no recorded wavelength, is not a failure
        ExcitationLightPath::builder("bare", 920.0).build()?;
        ExcitationLightPath::builder("unrecorded", 920.0)
            .excitation_source(laser(None))
            .build()?;
        Ok(())
    }

    #[test]
    fn test_excitation_mode() {
        let err = ExcitationLightPath::builder("excitation", 920.0)
            .excitation_mode("2P")
            .build()
            .unwrap_err();
        assert_eq!(err, LightPathError::InvalidExcitationMode("2P".into()));
        let message = err.to_string();
        for mode in ExcitationMode::ALL {
            assert!(message.contains(mode.as_str()), "{message}");
        }
        assert_eq!("three-photon".parse::<ExcitationMode>().unwrap(), ExcitationMode::ThreePhoton);
    }

    #[test]
    fn test_mode_checked_before_wavelength() {
        let err = ExcitationLightPath::builder("excitation", 600.0)
            .excitation_mode("sideways")
            .excitation_source(laser(Some(488.0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, LightPathError::InvalidExcitationMode(_)));
    }

    #[test]
    fn test_emission_checks() {
        let indicator = Arc::new(Indicator {
            name: "GCaMP6f".into(),
            emission_wavelength_in_nm: Some(513.0),
            ..Default::default()
        });
        let detector = Arc::new(Photodetector {
            name: "PMT".into(),
            detected_wavelength_in_nm: Some(520.0),
            ..Default::default()
        });

        let path = EmissionLightPath::builder("emission", 513.0)
            .indicator(indicator.clone())
            .build()
            .unwrap();
        assert_eq!(path.emission_wavelength_in_nm(), 513.0);

        let err = EmissionLightPath::builder("emission", 513.0)
            .indicator(indicator)
            .photodetector(detector)
            .build()
            .unwrap_err();
        match err {
            LightPathError::WavelengthMismatch {
                device,
                device_attribute,
                device_wavelength,
                ..
            } => {
                assert_eq!(device, "PMT");
                assert_eq!(device_attribute, "detected_wavelength_in_nm");
                assert_eq!(device_wavelength, 520.0);
            }
            other => panic!("Unexpected error {other}"),
        }
    }
}
