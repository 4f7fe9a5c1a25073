//! A set of foundational traits and types used throughout the library.
pub use crate::error::ErrorKind;
pub use crate::meta::{
    DeviceLike, Dimensionality, EmissionLightPath, ExcitationLightPath, ExcitationMode,
    IlluminationKind, IlluminationPattern, ImagingSpace,
};
pub use crate::params::{ParamDescribed, ParamLike};
pub use crate::roi::{
    PixelWeight, RegionSelector, RoiMask, RoiTableRegion, Segmentation, SegmentationContainer,
    SparseEntry, VoxelWeight,
};
pub use crate::series::Timing;
