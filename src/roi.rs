//! Regions of interest segmented within an imaging space.
//!
//! - [`mask`] converts ROI footprints between sparse and dense encodings
//! - [`Segmentation`] is the append-only table of ROIs
//! - [`RoiTableRegion`] selects rows of a table for per-ROI series
//! - [`SegmentationContainer`] groups tables by name
pub mod container;
pub mod mask;
pub mod region;
pub mod segmentation;

pub use container::{SegmentationContainer, SegmentationContainerError};
pub use mask::{
    image_to_pixel, image_to_voxel, pixel_to_image, voxel_to_image, MaskError, PixelMask,
    PixelWeight, SparseEntry, VoxelMask, VoxelWeight,
};
pub use region::{RegionSelector, RoiTableRegion};
pub use segmentation::{
    Roi, RoiMask, RoiTableError, Segmentation, SummaryImage, IMAGE_MASK, PIXEL_MASK, VOXEL_MASK,
};
