pub mod device;
pub mod illumination;
pub mod imaging_space;
pub mod light_path;

pub use crate::meta::device::{
    DeviceKind, DeviceLike, DichroicMirror, ExcitationSource, Indicator, Microscope,
    OpticalFilter, Photodetector,
};
pub use crate::meta::illumination::{
    IlluminationKind, IlluminationPattern, IlluminationPatternError, LineScan, PlaneAcquisition,
    RandomAccessScan, ScanDirection,
};
pub use crate::meta::imaging_space::{Dimensionality, ImagingSpace};
pub use crate::meta::light_path::{
    check_wavelength, EmissionLightPath, EmissionLightPathBuilder, ExcitationLightPath,
    ExcitationLightPathBuilder, ExcitationMode, LightPathError,
};
