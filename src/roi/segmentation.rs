use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use ndarray::{Array, Array2, Array3, ArrayBase, ArrayD, Data, Dimension};
use thiserror::Error;

use super::mask::{
    self, check_within, sparse_to_dense, MaskError, PixelMask, PixelWeight, SparseEntry,
    VoxelMask, VoxelWeight,
};
use super::region::{RegionSelector, RoiTableRegion};
use crate::error::ErrorKind;
use crate::meta::{Dimensionality, ImagingSpace};

/// The name of the sparse 2-D mask column
pub const PIXEL_MASK: &str = "pixel_mask";
/// The name of the sparse 3-D mask column
pub const VOXEL_MASK: &str = "voxel_mask";
/// The name of the dense mask column
pub const IMAGE_MASK: &str = "image_mask";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoiTableError {
    #[error("Must provide a pixel mask, a voxel mask or an image mask")]
    MissingMask,
    #[error("A pixel mask and a voxel mask cannot be stored on the same ROI")]
    MixedSparseMasks,
    #[error("A {column} of rank {found} cannot be stored in a {expected} segmentation")]
    DimensionalityMismatch {
        column: &'static str,
        expected: Dimensionality,
        found: usize,
    },
    #[error("Image mask has shape {found:?} but the segmentation grid is {expected:?}")]
    GridShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("The {column} disagrees with the image mask at {coordinate:?}")]
    MaskDisagreement {
        column: &'static str,
        coordinate: Vec<usize>,
    },
    #[error("Row index {index} is out of range for a table of {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Region refers to the table {expected:?}, not {found:?}")]
    WrongTable { expected: String, found: String },
    #[error("An ROI with id {0} already exists")]
    DuplicateId(u64),
    #[error("A summary image named {0:?} already exists")]
    DuplicateSummaryImage(String),
    #[error("Summary image {name:?} has rank {found}, expected {expected}")]
    SummaryImageRank {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("An error occurred while converting a mask: {0}")]
    Mask(
        #[from]
        #[source]
        MaskError,
    ),
}

impl RoiTableError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingMask
            | Self::MixedSparseMasks
            | Self::DimensionalityMismatch { .. }
            | Self::MaskDisagreement { .. }
            | Self::IndexOutOfRange { .. }
            | Self::WrongTable { .. } => ErrorKind::Validation,
            Self::DuplicateId(_) | Self::DuplicateSummaryImage(_) => ErrorKind::DuplicateKey,
            Self::GridShapeMismatch { .. } | Self::SummaryImageRank { .. } => ErrorKind::Shape,
            Self::Mask(e) => e.kind(),
        }
    }
}

/// The footprint of a single ROI in one of the encodings a segmentation accepts.
///
/// A sparse mask may be paired with a dense one, in which case both must describe the
/// same footprint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoiMask {
    Pixel(PixelMask),
    Voxel(VoxelMask),
    Image(ArrayD<f64>),
    PixelAndImage(PixelMask, ArrayD<f64>),
    VoxelAndImage(VoxelMask, ArrayD<f64>),
}

impl RoiMask {
    /// Assemble a mask from optional parts, failing if none are given or if both sparse
    /// kinds are given.
    pub fn from_parts(
        pixel_mask: Option<PixelMask>,
        voxel_mask: Option<VoxelMask>,
        image_mask: Option<ArrayD<f64>>,
    ) -> Result<Self, RoiTableError> {
        match (pixel_mask, voxel_mask, image_mask) {
            (None, None, None) => Err(RoiTableError::MissingMask),
            (Some(_), Some(_), _) => Err(RoiTableError::MixedSparseMasks),
            (Some(p), None, None) => Ok(Self::Pixel(p)),
            (None, Some(v), None) => Ok(Self::Voxel(v)),
            (None, None, Some(i)) => Ok(Self::Image(i)),
            (Some(p), None, Some(i)) => Ok(Self::PixelAndImage(p, i)),
            (None, Some(v), Some(i)) => Ok(Self::VoxelAndImage(v, i)),
        }
    }

    pub fn pixel_mask(&self) -> Option<&[PixelWeight]> {
        match self {
            Self::Pixel(p) | Self::PixelAndImage(p, _) => Some(p),
            _ => None,
        }
    }

    pub fn voxel_mask(&self) -> Option<&[VoxelWeight]> {
        match self {
            Self::Voxel(v) | Self::VoxelAndImage(v, _) => Some(v),
            _ => None,
        }
    }

    pub fn image_mask(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Image(i) | Self::PixelAndImage(_, i) | Self::VoxelAndImage(_, i) => Some(i),
            _ => None,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        match column {
            PIXEL_MASK => self.pixel_mask().is_some(),
            VOXEL_MASK => self.voxel_mask().is_some(),
            IMAGE_MASK => self.image_mask().is_some(),
            _ => false,
        }
    }

    /// The number of spatial axes this mask spans
    pub fn rank(&self) -> usize {
        match self {
            Self::Pixel(_) | Self::PixelAndImage(_, _) => PixelWeight::RANK,
            Self::Voxel(_) | Self::VoxelAndImage(_, _) => VoxelWeight::RANK,
            Self::Image(i) => i.ndim(),
        }
    }
}

impl From<PixelMask> for RoiMask {
    fn from(value: PixelMask) -> Self {
        Self::Pixel(value)
    }
}

impl From<VoxelMask> for RoiMask {
    fn from(value: VoxelMask) -> Self {
        Self::Voxel(value)
    }
}

impl From<ArrayD<f64>> for RoiMask {
    fn from(value: ArrayD<f64>) -> Self {
        Self::Image(value)
    }
}

impl From<Array2<f64>> for RoiMask {
    fn from(value: Array2<f64>) -> Self {
        Self::Image(value.into_dyn())
    }
}

impl From<Array3<f64>> for RoiMask {
    fn from(value: Array3<f64>) -> Self {
        Self::Image(value.into_dyn())
    }
}

/// A single row of a [`Segmentation`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Roi {
    id: u64,
    mask: RoiMask,
}

impl Roi {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mask(&self) -> &RoiMask {
        &self.mask
    }

    pub fn pixel_mask(&self) -> Option<&[PixelWeight]> {
        self.mask.pixel_mask()
    }

    pub fn voxel_mask(&self) -> Option<&[VoxelWeight]> {
        self.mask.voxel_mask()
    }

    pub fn image_mask(&self) -> Option<&ArrayD<f64>> {
        self.mask.image_mask()
    }
}

/// A named 2-D or 3-D image summarizing a segmentation, e.g. a mean or max projection
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SummaryImage {
    pub name: String,
    pub description: String,
    pub data: ArrayD<f64>,
}

/**
An append-only table of ROIs segmented within a single [`ImagingSpace`].

Every ROI in the table shares the dimensionality of the imaging space, and every dense
mask shares a single grid shape. The grid shape comes from the imaging space when it
declares one, otherwise it is fixed by the first image mask added.

```
use std::sync::Arc;
use ndarray::Array2;
use microscopy_data::prelude::*;

let space = Arc::new(ImagingSpace::planar("plane", "layer 2/3"));
let mut segmentation = Segmentation::new("cells", "soma ROIs", space);

let row = segmentation.add_roi(Array2::<f64>::ones((4, 4)), None).unwrap();
assert_eq!(row, 0);
assert_eq!(segmentation.grid_shape(), Some(&[4, 4][..]));

let mask = vec![PixelWeight::new(1, 2, 0.5)];
segmentation.add_roi(mask, Some(10)).unwrap();
assert_eq!(segmentation.ids().collect::<Vec<_>>(), vec![0, 10]);
```
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SegmentationRecord"))]
pub struct Segmentation {
    name: String,
    description: String,
    imaging_space: Arc<ImagingSpace>,
    rois: Vec<Roi>,
    #[cfg_attr(feature = "serde", serde(skip))]
    ids: HashSet<u64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    grid_shape: Option<Vec<usize>>,
    #[cfg_attr(feature = "serde", serde(with = "indexmap::map::serde_seq"))]
    summary_images: IndexMap<String, SummaryImage>,
}

impl Segmentation {
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        imaging_space: Arc<ImagingSpace>,
    ) -> Self {
        let grid_shape = imaging_space.grid_shape().map(|s| s.to_vec());
        Self {
            name: name.into(),
            description: description.into(),
            imaging_space,
            rois: Vec::new(),
            ids: HashSet::new(),
            grid_shape,
            summary_images: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn imaging_space(&self) -> &Arc<ImagingSpace> {
        &self.imaging_space
    }

    pub fn dimensionality(&self) -> Dimensionality {
        self.imaging_space.dimensionality()
    }

    /// The shape every dense mask in this table has, if it is known yet
    pub fn grid_shape(&self) -> Option<&[usize]> {
        self.grid_shape.as_deref()
    }

    /// Append an ROI, returning its row index.
    ///
    /// When `id` is `None` the ROI receives the current row count as its id, or the next
    /// free id above it. Nothing is written unless every check passes.
    pub fn add_roi<M: Into<RoiMask>>(
        &mut self,
        mask: M,
        id: Option<u64>,
    ) -> Result<usize, RoiTableError> {
        let mask = mask.into();
        if let Some(id) = id {
            if self.ids.contains(&id) {
                return Err(RoiTableError::DuplicateId(id));
            }
        }
        let grid_shape = self.validate_mask(&mask)?;

        let id = id.unwrap_or_else(|| self.next_free_id());
        let row = self.rois.len();
        log::trace!("Adding ROI {id} at row {row} of {}", self.name);
        if self.grid_shape.is_none() && grid_shape.is_some() {
            log::debug!("Fixing the grid shape of {} to {:?}", self.name, grid_shape);
            self.grid_shape = grid_shape;
        }
        self.ids.insert(id);
        self.rois.push(Roi { id, mask });
        Ok(row)
    }

    fn next_free_id(&self) -> u64 {
        let mut id = self.rois.len() as u64;
        while self.ids.contains(&id) {
            id += 1;
        }
        id
    }

    /// Check `mask` against the table, returning the grid shape the table has after the
    /// mask is added.
    fn validate_mask(&self, mask: &RoiMask) -> Result<Option<Vec<usize>>, RoiTableError> {
        let dimensionality = self.dimensionality();
        let (column, rank) = match mask {
            RoiMask::Pixel(_) | RoiMask::PixelAndImage(_, _) => (PIXEL_MASK, PixelWeight::RANK),
            RoiMask::Voxel(_) | RoiMask::VoxelAndImage(_, _) => (VOXEL_MASK, VoxelWeight::RANK),
            RoiMask::Image(i) => (IMAGE_MASK, i.ndim()),
        };
        if rank != dimensionality.rank() {
            return Err(RoiTableError::DimensionalityMismatch {
                column,
                expected: dimensionality,
                found: rank,
            });
        }

        let mut grid_shape = self.grid_shape.clone();
        if let Some(image) = mask.image_mask() {
            if image.ndim() != dimensionality.rank() {
                return Err(RoiTableError::DimensionalityMismatch {
                    column: IMAGE_MASK,
                    expected: dimensionality,
                    found: image.ndim(),
                });
            }
            match grid_shape.as_deref() {
                Some(shape) if shape != image.shape() => {
                    return Err(RoiTableError::GridShapeMismatch {
                        expected: shape.to_vec(),
                        found: image.shape().to_vec(),
                    });
                }
                Some(_) => {}
                None => {
                    // The first image mask fixes the grid, so sparse rows already stored
                    // must fit inside it.
                    for roi in self.rois.iter() {
                        self.check_sparse_within(&roi.mask, image.shape())?;
                    }
                    grid_shape = Some(image.shape().to_vec());
                }
            }
        }

        if let Some(shape) = grid_shape.as_deref() {
            self.check_sparse_within(mask, shape)?;
        }

        if let Some(image) = mask.image_mask() {
            match mask {
                RoiMask::PixelAndImage(pixels, _) => check_agreement(pixels, image, PIXEL_MASK)?,
                RoiMask::VoxelAndImage(voxels, _) => check_agreement(voxels, image, VOXEL_MASK)?,
                _ => {}
            }
        }
        Ok(grid_shape)
    }

    fn check_sparse_within(&self, mask: &RoiMask, shape: &[usize]) -> Result<(), RoiTableError> {
        if let Some(pixels) = mask.pixel_mask() {
            check_within(pixels, shape)?;
        }
        if let Some(voxels) = mask.voxel_mask() {
            check_within(voxels, shape)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Roi> {
        self.rois.get(index)
    }

    pub fn get_by_id(&self, id: u64) -> Option<&Roi> {
        self.index_of_id(id).and_then(|i| self.get(i))
    }

    /// Find the row index of the ROI with `id`
    pub fn index_of_id(&self, id: u64) -> Option<usize> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.rois.iter().position(|roi| roi.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Roi> {
        self.rois.iter()
    }

    /// The ROI ids in row order
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.rois.iter().map(|roi| roi.id)
    }

    /// The `pixel_mask` column, with `None` for rows that do not store one
    pub fn pixel_masks(&self) -> impl Iterator<Item = Option<&[PixelWeight]>> + '_ {
        self.rois.iter().map(|roi| roi.pixel_mask())
    }

    /// The `voxel_mask` column, with `None` for rows that do not store one
    pub fn voxel_masks(&self) -> impl Iterator<Item = Option<&[VoxelWeight]>> + '_ {
        self.rois.iter().map(|roi| roi.voxel_mask())
    }

    /// The `image_mask` column, with `None` for rows that do not store one
    pub fn image_masks(&self) -> impl Iterator<Item = Option<&ArrayD<f64>>> + '_ {
        self.rois.iter().map(|roi| roi.image_mask())
    }

    /// The columns populated by at least one row, always starting with `id`
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["id"];
        for column in [PIXEL_MASK, VOXEL_MASK, IMAGE_MASK] {
            if self.has_column(column) {
                columns.push(column);
            }
        }
        columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        column == "id" || self.rois.iter().any(|roi| roi.mask.has_column(column))
    }

    /// The dense mask of the ROI at `index`, scattered from its sparse mask onto the table
    /// grid if it was not stored densely.
    pub fn image_mask_of(&self, index: usize) -> Result<Cow<'_, ArrayD<f64>>, RoiTableError> {
        let roi = self.get(index).ok_or(RoiTableError::IndexOutOfRange {
            index,
            len: self.len(),
        })?;
        let shape = self.grid_shape();
        match &roi.mask {
            RoiMask::Image(image)
            | RoiMask::PixelAndImage(_, image)
            | RoiMask::VoxelAndImage(_, image) => Ok(Cow::Borrowed(image)),
            RoiMask::Pixel(pixels) => Ok(Cow::Owned(sparse_to_dense(pixels, shape)?)),
            RoiMask::Voxel(voxels) => Ok(Cow::Owned(sparse_to_dense(voxels, shape)?)),
        }
    }

    /// Convert a pixel mask to an image mask on this table's grid, or on the mask's
    /// bounding shape when the grid is not known yet
    pub fn pixel_to_image(&self, pixel_mask: &[PixelWeight]) -> Result<Array2<f64>, MaskError> {
        let shape = self.grid_shape().and_then(|s| <[usize; 2]>::try_from(s).ok());
        mask::pixel_to_image(pixel_mask, shape)
    }

    pub fn image_to_pixel<S: Data<Elem = f64>, D: Dimension>(
        &self,
        image_mask: &ArrayBase<S, D>,
    ) -> Result<PixelMask, MaskError> {
        mask::image_to_pixel(image_mask)
    }

    /// Convert a voxel mask to an image mask on this table's grid, or on the mask's
    /// bounding shape when the grid is not known yet
    pub fn voxel_to_image(&self, voxel_mask: &[VoxelWeight]) -> Result<Array3<f64>, MaskError> {
        let shape = self.grid_shape().and_then(|s| <[usize; 3]>::try_from(s).ok());
        mask::voxel_to_image(voxel_mask, shape)
    }

    pub fn image_to_voxel<S: Data<Elem = f64>, D: Dimension>(
        &self,
        image_mask: &ArrayBase<S, D>,
    ) -> Result<VoxelMask, MaskError> {
        mask::image_to_voxel(image_mask)
    }

    /// Select rows of this table for use by a response series.
    ///
    /// `region` may be a list of row indices, a range, or [`RegionSelector::All`], which
    /// selects the rows present now and does not grow with later additions. `name`
    /// defaults to `"rois"`.
    pub fn create_roi_table_region<R: Into<RegionSelector>>(
        &self,
        description: &str,
        region: R,
        name: Option<&str>,
    ) -> Result<RoiTableRegion, RoiTableError> {
        RoiTableRegion::new(self, description, region, name)
    }

    /// Store a summary image under a unique name. Its rank must match the table's
    /// dimensionality.
    pub fn add_summary_image<N: Into<String>, S: Into<String>, D: Dimension>(
        &mut self,
        name: N,
        description: S,
        data: Array<f64, D>,
    ) -> Result<&SummaryImage, RoiTableError> {
        let name = name.into();
        if self.summary_images.contains_key(&name) {
            return Err(RoiTableError::DuplicateSummaryImage(name));
        }
        let expected = self.dimensionality().rank();
        if data.ndim() != expected {
            return Err(RoiTableError::SummaryImageRank {
                name,
                expected,
                found: data.ndim(),
            });
        }
        let image = SummaryImage {
            name: name.clone(),
            description: description.into(),
            data: data.into_dyn(),
        };
        let entry = self.summary_images.entry(name).or_insert(image);
        Ok(entry)
    }

    pub fn summary_image(&self, name: &str) -> Option<&SummaryImage> {
        self.summary_images.get(name)
    }

    pub fn summary_images(&self) -> impl Iterator<Item = &SummaryImage> + '_ {
        self.summary_images.values()
    }
}

/// The stored form of a [`Segmentation`]. Loading replays every row and summary image
/// through the same checks as [`Segmentation::add_roi`], so the id set and grid shape
/// are rebuilt rather than read.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SegmentationRecord {
    name: String,
    description: String,
    imaging_space: Arc<ImagingSpace>,
    rois: Vec<Roi>,
    summary_images: Vec<(String, SummaryImage)>,
}

#[cfg(feature = "serde")]
impl TryFrom<SegmentationRecord> for Segmentation {
    type Error = RoiTableError;

    fn try_from(value: SegmentationRecord) -> Result<Self, Self::Error> {
        if let Some(shape) = value.imaging_space.grid_shape() {
            let expected = value.imaging_space.dimensionality().rank();
            if shape.len() != expected {
                return Err(MaskError::ImageRank {
                    expected,
                    found: shape.len(),
                }
                .into());
            }
        }
        let mut table = Self::new(value.name, value.description, value.imaging_space);
        for roi in value.rois {
            table.add_roi(roi.mask, Some(roi.id))?;
        }
        for (_, image) in value.summary_images {
            table.add_summary_image(image.name, image.description, image.data)?;
        }
        Ok(table)
    }
}

impl<'a> IntoIterator for &'a Segmentation {
    type Item = &'a Roi;
    type IntoIter = std::slice::Iter<'a, Roi>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Require the dense form of `sparse` to equal `image` cell for cell
fn check_agreement<E: SparseEntry>(
    sparse: &[E],
    image: &ArrayD<f64>,
    column: &'static str,
) -> Result<(), RoiTableError> {
    let scattered = sparse_to_dense(sparse, Some(image.shape()))?;
    let disagreement = scattered
        .indexed_iter()
        .zip(image.iter())
        .find(|((_, a), b)| *a != *b)
        .map(|((index, _), _)| index.slice().to_vec());
    match disagreement {
        Some(coordinate) => Err(RoiTableError::MaskDisagreement { column, coordinate }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{arr2, Array3, ShapeBuilder};

    fn planar() -> Arc<ImagingSpace> {
        Arc::new(ImagingSpace::planar("plane", "layer 2/3"))
    }

    fn volumetric() -> Arc<ImagingSpace> {
        Arc::new(
            ImagingSpace::volumetric("volume", "cortex")
                .with_grid_shape([4, 4, 2])
                .unwrap(),
        )
    }

    #[test]
    fn test_missing_mask() {
        let err = RoiMask::from_parts(None, None, None).unwrap_err();
        assert_eq!(err, RoiTableError::MissingMask);
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = RoiMask::from_parts(Some(vec![]), Some(vec![]), None).unwrap_err();
        assert_eq!(err, RoiTableError::MixedSparseMasks);
    }

    #[test_log::test]
    fn test_add_image_mask() -> Result<(), RoiTableError> {
        let mut seg = Segmentation::new("seg", "test", planar());
        let image = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
        let row = seg.add_roi(image.clone(), None)?;
        assert_eq!(row, 0);
        assert_eq!(seg.get(0).unwrap().image_mask(), Some(&image.into_dyn()));
        assert_eq!(seg.grid_shape(), Some(&[2, 2][..]));
        assert_eq!(seg.columns(), vec!["id", IMAGE_MASK]);
        Ok(())
    }

    #[test]
    fn test_ids() -> Result<(), RoiTableError> {
        let mut seg = Segmentation::new("seg", "test", planar());
        let mask = vec![PixelWeight::new(0, 0, 1.0)];
        seg.add_roi(mask.clone(), None)?;
        seg.add_roi(mask.clone(), Some(2))?;
        // Row count is 2, but 2 is taken
        seg.add_roi(mask.clone(), None)?;
        assert_eq!(seg.ids().collect::<Vec<_>>(), vec![0, 2, 3]);

        let err = seg.add_roi(mask, Some(3)).unwrap_err();
        assert_eq!(err, RoiTableError::DuplicateId(3));
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(seg.len(), 3);
        assert_eq!(seg.index_of_id(2), Some(1));
        assert_eq!(seg.get_by_id(3).unwrap().id(), 3);
        assert!(seg.get_by_id(7).is_none());
        Ok(())
    }

    #[test]
    fn test_dimensionality() {
        let mut seg = Segmentation::new("seg", "test", planar());
        let err = seg
            .add_roi(vec![VoxelWeight::new(0, 0, 0, 1.0)], None)
            .unwrap_err();
        assert!(matches!(
            err,
            RoiTableError::DimensionalityMismatch {
                column: VOXEL_MASK,
                expected: Dimensionality::Planar,
                found: 3
            }
        ));

        let mut seg = Segmentation::new("seg", "test", volumetric());
        let err = seg.add_roi(Array2::<f64>::ones((4, 4)), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(seg.is_empty());
    }

    #[test]
    fn test_grid_shape() {
        let mut seg = Segmentation::new("seg", "test", volumetric());
        let err = seg.add_roi(Array3::<f64>::ones((4, 4, 3)), None).unwrap_err();
        assert_eq!(
            err,
            RoiTableError::GridShapeMismatch {
                expected: vec![4, 4, 2],
                found: vec![4, 4, 3]
            }
        );
        assert_eq!(err.kind(), ErrorKind::Shape);

        let err = seg
            .add_roi(vec![VoxelWeight::new(0, 0, 2, 1.0)], None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert!(seg.is_empty());

        seg.add_roi(vec![VoxelWeight::new(3, 3, 1, 1.0)], None)
            .unwrap();
        assert_eq!(seg.columns(), vec!["id", VOXEL_MASK]);
    }

    #[test]
    fn test_first_image_fixes_grid() {
        let mut seg = Segmentation::new("seg", "test", planar());
        seg.add_roi(vec![PixelWeight::new(5, 0, 1.0)], None).unwrap();
        // The stored pixel mask would not fit on a 3x3 grid
        let err = seg.add_roi(Array2::<f64>::zeros((3, 3)), None).unwrap_err();
        assert!(matches!(err, RoiTableError::Mask(MaskError::CoordinateOutOfBounds { .. })));
        assert_eq!(seg.grid_shape(), None);

        seg.add_roi(Array2::<f64>::zeros((6, 6)), None).unwrap();
        assert_eq!(seg.grid_shape(), Some(&[6, 6][..]));
    }

    #[test]
    fn test_combined_masks() -> Result<(), RoiTableError> {
        let mut seg = Segmentation::new("seg", "test", planar());
        let pixels = vec![PixelWeight::new(0, 1, 0.5)];
        let image = arr2(&[[0.0, 0.5], [0.0, 0.0]]).into_dyn();
        seg.add_roi(RoiMask::PixelAndImage(pixels.clone(), image), None)?;
        assert_eq!(seg.columns(), vec!["id", PIXEL_MASK, IMAGE_MASK]);

        let image = arr2(&[[0.0, 0.5], [0.25, 0.0]]).into_dyn();
        let err = seg
            .add_roi(RoiMask::PixelAndImage(pixels, image), None)
            .unwrap_err();
        assert_eq!(
            err,
            RoiTableError::MaskDisagreement {
                column: PIXEL_MASK,
                coordinate: vec![1, 0]
            }
        );
        assert_eq!(seg.len(), 1);
        Ok(())
    }

    #[test]
    fn test_combined_mask_extra_cell_rejected() {
        let mut seg = Segmentation::new("seg", "test", volumetric());
        let voxels = vec![VoxelWeight::new(0, 1, 0, 0.5)];
        let mut image = Array3::<f64>::zeros((4, 4, 2));
        image[[0, 1, 0]] = 0.5;
        // Every sparse entry is present, plus one cell the sparse form leaves at zero
        image[[3, 2, 1]] = 0.25;
        let err = seg
            .add_roi(RoiMask::VoxelAndImage(voxels.clone(), image.into_dyn()), None)
            .unwrap_err();
        assert_eq!(
            err,
            RoiTableError::MaskDisagreement {
                column: VOXEL_MASK,
                coordinate: vec![3, 2, 1]
            }
        );
        assert!(seg.is_empty());
        assert!(seg.ids().next().is_none());

        // A column-major image is compared by logical index, not memory order
        let mut image = Array3::<f64>::zeros((4, 4, 2).f());
        image[[0, 1, 0]] = 0.5;
        seg.add_roi(RoiMask::VoxelAndImage(voxels, image.into_dyn()), None)
            .unwrap();
        assert_eq!(seg.len(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_load_rebuilds_ids_and_grid() -> Result<(), Box<dyn std::error::Error>> {
        let mut seg = Segmentation::new("seg", "test", planar());
        seg.add_roi(vec![PixelWeight::new(1, 1, 1.0)], None)?;
        seg.add_roi(Array2::<f64>::zeros((3, 3)), None)?;
        seg.add_summary_image("mean", "", Array2::<f64>::ones((3, 3)))?;

        let text = serde_json::to_string(&seg)?;
        assert!(!text.contains("grid_shape\":[3"));
        let loaded: Segmentation = serde_json::from_str(&text)?;
        assert_eq!(loaded, seg);
        assert_eq!(loaded.grid_shape(), Some(&[3, 3][..]));

        // Two rows claiming the same id
        let tampered = text.replacen("\"id\":1,", "\"id\":0,", 1);
        assert_ne!(tampered, text);
        assert!(serde_json::from_str::<Segmentation>(&tampered).is_err());
        Ok(())
    }

    #[test]
    fn test_image_mask_of() -> Result<(), RoiTableError> {
        let space = ImagingSpace::planar("plane", "").with_grid_shape([3, 3])?;
        let mut seg = Segmentation::new("seg", "test", Arc::new(space));
        seg.add_roi(
            vec![
                PixelWeight::new(0, 0, 1.0),
                PixelWeight::new(1, 0, 2.0),
                PixelWeight::new(2, 0, 2.0),
            ],
            None,
        )?;
        let image = seg.image_mask_of(0)?;
        assert!(matches!(image, Cow::Owned(_)));
        assert_eq!(
            image.into_owned(),
            arr2(&[[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 0.0, 0.0]]).into_dyn()
        );
        assert_eq!(
            seg.image_mask_of(4).unwrap_err(),
            RoiTableError::IndexOutOfRange { index: 4, len: 1 }
        );

        let pixels = seg.image_to_pixel(&seg.pixel_to_image(&[PixelWeight::new(2, 2, 1.0)])?)?;
        assert_eq!(pixels, vec![PixelWeight::new(2, 2, 1.0)]);
        Ok(())
    }

    #[test]
    fn test_summary_images() {
        let mut seg = Segmentation::new("seg", "test", planar());
        seg.add_summary_image("mean", "mean projection", Array2::<f64>::ones((10, 10)))
            .unwrap();
        let err = seg
            .add_summary_image("mean", "again", Array2::<f64>::ones((10, 10)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        let err = seg
            .add_summary_image("max", "max projection", Array3::<f64>::ones((10, 10, 2)))
            .unwrap_err();
        assert_eq!(
            err,
            RoiTableError::SummaryImageRank {
                name: "max".into(),
                expected: 2,
                found: 3
            }
        );
        assert_eq!(seg.summary_images().count(), 1);
        assert_eq!(seg.summary_image("mean").unwrap().data.sum(), 100.0);
    }
}
