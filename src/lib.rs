//! A data model for microscopy acquisitions and the regions of interest segmented from them.
//!
//! The crate keeps two kinds of data consistent:
//!
//! - ROI footprints, which may be stored as sparse pixel or voxel lists or as dense image
//!   masks. [`roi::mask`] converts between the encodings and [`Segmentation`] checks that
//!   every ROI fits the grid of its [`ImagingSpace`].
//! - Light paths, whose nominal wavelength must match the wavelength recorded on the
//!   devices they reference. See [`meta::light_path`].
//!
//! ```
//! use std::sync::Arc;
//! use microscopy_data::prelude::*;
//!
//! let space = Arc::new(ImagingSpace::planar("plane", "layer 2/3").with_grid_shape([3, 3])?);
//! let mut segmentations = SegmentationContainer::default();
//! let table = segmentations.add_segmentation(space, None, None)?;
//!
//! let pixels = vec![
//!     PixelWeight::new(0, 0, 1.0),
//!     PixelWeight::new(1, 0, 2.0),
//!     PixelWeight::new(2, 0, 2.0),
//! ];
//! table.add_roi(pixels, None)?;
//! let image = table.image_mask_of(0)?;
//! assert_eq!(image[[1, 0]], 2.0);
//!
//! let region = table.create_roi_table_region("all cells", .., None)?;
//! assert_eq!(region.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod error;
pub mod meta;
pub mod params;
pub mod prelude;
pub mod roi;
pub mod series;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::error::ErrorKind;
pub use crate::meta::{
    Dimensionality, EmissionLightPath, ExcitationLightPath, ExcitationMode, IlluminationPattern,
    IlluminationPatternError, ImagingSpace, LightPathError,
};
pub use crate::roi::{
    MaskError, PixelWeight, RoiMask, RoiTableError, RoiTableRegion, Segmentation,
    SegmentationContainer, SegmentationContainerError, VoxelWeight,
};
pub use crate::series::{
    MicroscopyResponseSeries, MicroscopyResponseSeriesContainer, MicroscopySeries,
    MultiChannelMicroscopyVolume, MultiPlaneMicroscopyContainer, SeriesError, Timing,
};
