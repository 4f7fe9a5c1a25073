//! Conversion between the sparse (`pixel_mask`/`voxel_mask`) and dense (`image_mask`)
//! encodings of an ROI footprint.
//!
//! The first sparse coordinate always indexes the first dense axis: a pixel `(x, y, w)`
//! lands at `image[[x, y]]` and a voxel `(x, y, z, w)` at `image[[x, y, z]]`. Dense to
//! sparse conversion walks the array in row-major order, so the emitted entries are sorted
//! by `x`, then `y`, then `z`.
use std::fmt::Display;

use ndarray::{Array2, Array3, ArrayBase, ArrayD, ArrayView2, Data, Dimension, IxDyn};
use num_traits::ToPrimitive;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors raised while converting between mask encodings. All of them are shape errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MaskError {
    #[error("Expected mask rows with layout {expected_layout}, got rows with {found} columns")]
    RowWidth {
        expected_layout: &'static str,
        found: usize,
    },
    #[error("Mask row {row} has coordinate {value} which is not a non-negative integer")]
    InvalidCoordinate { row: usize, value: f64 },
    #[error("Expected a {expected}-dimensional image mask, got {found} dimensions")]
    ImageRank { expected: usize, found: usize },
    #[error("Coordinate {coordinate:?} lies outside of the image shape {shape:?}")]
    CoordinateOutOfBounds {
        coordinate: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("An image of shape {shape:?} is too large to allocate")]
    ShapeTooLarge { shape: Vec<usize> },
}

impl MaskError {
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Shape
    }
}

/// One entry of a sparse mask, generic over the number of spatial coordinates.
pub trait SparseEntry: Sized + Copy {
    /// The number of spatial coordinates, which is also the rank of the matching dense mask
    const RANK: usize;
    /// The row layout of the raw form, e.g. `(N, 3)`
    const LAYOUT: &'static str;

    fn coordinates(&self) -> IxDyn;
    fn weight(&self) -> f64;
    fn from_index(index: &[usize], weight: f64) -> Self;
}

/// A single weighted pixel of a 2-D ROI
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelWeight {
    pub x: usize,
    pub y: usize,
    pub weight: f64,
}

impl PixelWeight {
    pub const fn new(x: usize, y: usize, weight: f64) -> Self {
        Self { x, y, weight }
    }
}

impl From<(usize, usize, f64)> for PixelWeight {
    fn from((x, y, weight): (usize, usize, f64)) -> Self {
        Self::new(x, y, weight)
    }
}

impl Display for PixelWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.weight)
    }
}

impl SparseEntry for PixelWeight {
    const RANK: usize = 2;
    const LAYOUT: &'static str = "(N, 3)";

    fn coordinates(&self) -> IxDyn {
        IxDyn(&[self.x, self.y])
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn from_index(index: &[usize], weight: f64) -> Self {
        Self::new(index[0], index[1], weight)
    }
}

/// A single weighted voxel of a 3-D ROI
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoxelWeight {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub weight: f64,
}

impl VoxelWeight {
    pub const fn new(x: usize, y: usize, z: usize, weight: f64) -> Self {
        Self { x, y, z, weight }
    }
}

impl From<(usize, usize, usize, f64)> for VoxelWeight {
    fn from((x, y, z, weight): (usize, usize, usize, f64)) -> Self {
        Self::new(x, y, z, weight)
    }
}

impl Display for VoxelWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.weight)
    }
}

impl SparseEntry for VoxelWeight {
    const RANK: usize = 3;
    const LAYOUT: &'static str = "(N, 4)";

    fn coordinates(&self) -> IxDyn {
        IxDyn(&[self.x, self.y, self.z])
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn from_index(index: &[usize], weight: f64) -> Self {
        Self::new(index[0], index[1], index[2], weight)
    }
}

pub type PixelMask = Vec<PixelWeight>;
pub type VoxelMask = Vec<VoxelWeight>;

/// The shape spanned by a sparse mask, `max(coordinate) + 1` along each axis.
///
/// Fails if a coordinate is so large that its extent cannot be represented.
pub fn bounding_shape<E: SparseEntry>(mask: &[E]) -> Result<Vec<usize>, MaskError> {
    let mut shape = vec![0; E::RANK];
    for entry in mask {
        for (extent, coord) in shape.iter_mut().zip(entry.coordinates().slice()) {
            let end = coord.checked_add(1).ok_or_else(|| MaskError::ShapeTooLarge {
                shape: entry.coordinates().slice().to_vec(),
            })?;
            *extent = (*extent).max(end);
        }
    }
    Ok(shape)
}

/// Check that a dense `f64` array of `shape` can be allocated at all: the element count
/// must not overflow, and the buffer must stay within `isize::MAX` bytes.
pub fn check_allocatable(shape: &[usize]) -> Result<(), MaskError> {
    let limit = isize::MAX as usize / std::mem::size_of::<f64>();
    let elements = shape
        .iter()
        .filter(|extent| **extent != 0)
        .try_fold(1usize, |acc, extent| acc.checked_mul(*extent));
    match elements {
        Some(n) if n <= limit => Ok(()),
        _ => Err(MaskError::ShapeTooLarge {
            shape: shape.to_vec(),
        }),
    }
}

/// Check that every coordinate of a sparse mask falls inside `shape`
pub fn check_within<E: SparseEntry>(mask: &[E], shape: &[usize]) -> Result<(), MaskError> {
    for entry in mask {
        let coordinates = entry.coordinates();
        let inside = coordinates.slice().len() == shape.len()
            && coordinates.slice().iter().zip(shape).all(|(c, s)| c < s);
        if !inside {
            return Err(MaskError::CoordinateOutOfBounds {
                coordinate: coordinates.slice().to_vec(),
                shape: shape.to_vec(),
            });
        }
    }
    Ok(())
}

/// Scatter a sparse mask into a zero-initialized dense array.
///
/// When `shape` is `None` the shape is derived with [`bounding_shape`]. Colliding
/// coordinates are resolved last-write-wins.
pub fn sparse_to_dense<E: SparseEntry>(
    mask: &[E],
    shape: Option<&[usize]>,
) -> Result<ArrayD<f64>, MaskError> {
    let shape = match shape {
        Some(shape) => {
            if shape.len() != E::RANK {
                return Err(MaskError::ImageRank {
                    expected: E::RANK,
                    found: shape.len(),
                });
            }
            shape.to_vec()
        }
        None => bounding_shape(mask)?,
    };
    check_allocatable(&shape)?;
    let mut image = ArrayD::<f64>::zeros(IxDyn(&shape));
    for entry in mask {
        let coordinates = entry.coordinates();
        match image.get_mut(coordinates.slice()) {
            Some(cell) => *cell = entry.weight(),
            None => {
                return Err(MaskError::CoordinateOutOfBounds {
                    coordinate: coordinates.slice().to_vec(),
                    shape,
                });
            }
        }
    }
    log::trace!(
        "Scattered {} sparse entries into an image of shape {:?}",
        mask.len(),
        image.shape()
    );
    Ok(image)
}

/// Gather every strictly positive cell of a dense array into a sparse mask, in row-major order.
pub fn dense_to_sparse<E: SparseEntry, S: Data<Elem = f64>, D: Dimension>(
    image: &ArrayBase<S, D>,
) -> Result<Vec<E>, MaskError> {
    if image.ndim() != E::RANK {
        return Err(MaskError::ImageRank {
            expected: E::RANK,
            found: image.ndim(),
        });
    }
    let image = image.view().into_dyn();
    let mask = image
        .indexed_iter()
        .filter(|(_, weight)| **weight > 0.0)
        .map(|(index, weight)| E::from_index(index.slice(), *weight))
        .collect();
    Ok(mask)
}

fn to_coordinate(row: usize, value: f64) -> Result<usize, MaskError> {
    if value.fract() != 0.0 {
        return Err(MaskError::InvalidCoordinate { row, value });
    }
    value
        .to_usize()
        .ok_or(MaskError::InvalidCoordinate { row, value })
}

fn check_row_width<E: SparseEntry>(rows: &ArrayView2<'_, f64>) -> Result<(), MaskError> {
    if rows.ncols() != E::RANK + 1 {
        Err(MaskError::RowWidth {
            expected_layout: E::LAYOUT,
            found: rows.ncols(),
        })
    } else {
        Ok(())
    }
}

/// Convert a raw `(N, 3)` table of `(x, y, weight)` rows into a [`PixelMask`]
pub fn pixel_mask_from_rows(rows: ArrayView2<'_, f64>) -> Result<PixelMask, MaskError> {
    check_row_width::<PixelWeight>(&rows)?;
    rows.outer_iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(PixelWeight::new(
                to_coordinate(i, row[0])?,
                to_coordinate(i, row[1])?,
                row[2],
            ))
        })
        .collect()
}

/// Convert a raw `(N, 4)` table of `(x, y, z, weight)` rows into a [`VoxelMask`]
pub fn voxel_mask_from_rows(rows: ArrayView2<'_, f64>) -> Result<VoxelMask, MaskError> {
    check_row_width::<VoxelWeight>(&rows)?;
    rows.outer_iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(VoxelWeight::new(
                to_coordinate(i, row[0])?,
                to_coordinate(i, row[1])?,
                to_coordinate(i, row[2])?,
                row[3],
            ))
        })
        .collect()
}

/// Lay a sparse mask back out as raw rows, the inverse of [`pixel_mask_from_rows`]
/// and [`voxel_mask_from_rows`]
pub fn sparse_mask_to_rows<E: SparseEntry>(mask: &[E]) -> Array2<f64> {
    let mut rows = Array2::<f64>::zeros((mask.len(), E::RANK + 1));
    for (mut row, entry) in rows.outer_iter_mut().zip(mask) {
        for (i, coord) in entry.coordinates().slice().iter().enumerate() {
            row[i] = *coord as f64;
        }
        row[E::RANK] = entry.weight();
    }
    rows
}

/// Converts a 2-D pixel mask into an image mask of `shape`, or of the mask's bounding
/// shape if `shape` is `None`.
pub fn pixel_to_image(
    pixel_mask: &[PixelWeight],
    shape: Option<[usize; 2]>,
) -> Result<Array2<f64>, MaskError> {
    let image = sparse_to_dense(pixel_mask, shape.as_ref().map(|s| s.as_slice()))?;
    image
        .into_dimensionality()
        .map_err(|_| MaskError::ImageRank {
            expected: 2,
            found: PixelWeight::RANK,
        })
}

/// Converts a 2-D image mask into a pixel mask holding every strictly positive cell
pub fn image_to_pixel<S: Data<Elem = f64>, D: Dimension>(
    image_mask: &ArrayBase<S, D>,
) -> Result<PixelMask, MaskError> {
    dense_to_sparse(image_mask)
}

/// Converts a 3-D voxel mask into an image mask of `shape`, or of the mask's bounding
/// shape if `shape` is `None`.
pub fn voxel_to_image(
    voxel_mask: &[VoxelWeight],
    shape: Option<[usize; 3]>,
) -> Result<Array3<f64>, MaskError> {
    let image = sparse_to_dense(voxel_mask, shape.as_ref().map(|s| s.as_slice()))?;
    image
        .into_dimensionality()
        .map_err(|_| MaskError::ImageRank {
            expected: 3,
            found: VoxelWeight::RANK,
        })
}

/// Converts a 3-D image mask into a voxel mask holding every strictly positive cell
pub fn image_to_voxel<S: Data<Elem = f64>, D: Dimension>(
    image_mask: &ArrayBase<S, D>,
) -> Result<VoxelMask, MaskError> {
    dense_to_sparse(image_mask)
}
