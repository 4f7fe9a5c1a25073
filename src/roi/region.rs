use std::ops::{Range, RangeFull};

use super::segmentation::{Roi, RoiTableError, Segmentation};

/// Which rows of a [`Segmentation`] a region selects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RegionSelector {
    /// Every row present when the region is created
    #[default]
    All,
    Indices(Vec<usize>),
    Range(Range<usize>),
}

impl RegionSelector {
    fn resolve(self, len: usize) -> Result<Vec<usize>, RoiTableError> {
        let indices: Vec<usize> = match self {
            Self::All => (0..len).collect(),
            Self::Indices(indices) => indices,
            Self::Range(range) => range.collect(),
        };
        if let Some(index) = indices.iter().copied().find(|i| *i >= len) {
            return Err(RoiTableError::IndexOutOfRange { index, len });
        }
        Ok(indices)
    }
}

impl From<Vec<usize>> for RegionSelector {
    fn from(value: Vec<usize>) -> Self {
        Self::Indices(value)
    }
}

impl From<&[usize]> for RegionSelector {
    fn from(value: &[usize]) -> Self {
        Self::Indices(value.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for RegionSelector {
    fn from(value: [usize; N]) -> Self {
        Self::Indices(value.to_vec())
    }
}

impl From<Range<usize>> for RegionSelector {
    fn from(value: Range<usize>) -> Self {
        Self::Range(value)
    }
}

impl From<RangeFull> for RegionSelector {
    fn from(_: RangeFull) -> Self {
        Self::All
    }
}

/// A named, ordered selection of rows from a [`Segmentation`].
///
/// The region records the table's name and a snapshot of row indices rather than
/// borrowing the table, so the table may keep growing after the region is made.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoiTableRegion {
    name: String,
    description: String,
    table: String,
    indices: Vec<usize>,
}

impl RoiTableRegion {
    pub const DEFAULT_NAME: &'static str = "rois";

    pub fn new<R: Into<RegionSelector>>(
        table: &Segmentation,
        description: &str,
        region: R,
        name: Option<&str>,
    ) -> Result<Self, RoiTableError> {
        let indices = region.into().resolve(table.len())?;
        log::trace!(
            "Selected {} of {} rows from {}",
            indices.len(),
            table.len(),
            table.name()
        );
        Ok(Self {
            name: name.unwrap_or(Self::DEFAULT_NAME).to_string(),
            description: description.to_string(),
            table: table.name().to_string(),
            indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The name of the segmentation the rows were selected from
    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Look up the selected rows in `table`, which must be the segmentation this region
    /// was created from.
    pub fn rois<'a>(&self, table: &'a Segmentation) -> Result<Vec<&'a Roi>, RoiTableError> {
        if table.name() != self.table {
            return Err(RoiTableError::WrongTable {
                expected: self.table.clone(),
                found: table.name().to_string(),
            });
        }
        self.indices
            .iter()
            .map(|i| {
                table.get(*i).ok_or(RoiTableError::IndexOutOfRange {
                    index: *i,
                    len: table.len(),
                })
            })
            .collect()
    }

    /// The ids of the selected rows, in region order
    pub fn ids(&self, table: &Segmentation) -> Result<Vec<u64>, RoiTableError> {
        Ok(self.rois(table)?.into_iter().map(|roi| roi.id()).collect())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::meta::ImagingSpace;
    use crate::roi::PixelWeight;

    fn table(n: usize) -> Segmentation {
        let space = Arc::new(ImagingSpace::planar("plane", "layer 2/3"));
        let mut seg = Segmentation::new("PlaneSegmentation", "test", space);
        for i in 0..n {
            seg.add_roi(vec![PixelWeight::new(i, i, 1.0)], None).unwrap();
        }
        seg
    }

    #[test]
    fn test_explicit_indices() {
        let seg = table(5);
        let region = seg
            .create_roi_table_region("every other cell", vec![0, 2, 4], None)
            .unwrap();
        assert_eq!(region.len(), 3);
        assert_eq!(region.indices(), &[0, 2, 4]);
        assert_eq!(region.name(), "rois");
        assert_eq!(region.table_name(), "PlaneSegmentation");
        assert_eq!(region.ids(&seg).unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn test_all_rows_is_a_snapshot() {
        let mut seg = table(3);
        let region = seg
            .create_roi_table_region("all", RegionSelector::All, Some("cells"))
            .unwrap();
        seg.add_roi(vec![PixelWeight::new(9, 9, 1.0)], None).unwrap();
        assert_eq!(region.len(), 3);
        assert_eq!(region.rois(&seg).unwrap().len(), 3);
        assert_eq!(region.name(), "cells");

        let region = seg.create_roi_table_region("all", .., None).unwrap();
        assert_eq!(region.len(), 4);
    }

    #[test]
    fn test_ranges_and_bounds() {
        let seg = table(5);
        let region = seg.create_roi_table_region("middle", 1..4, None).unwrap();
        assert_eq!(region.indices(), &[1, 2, 3]);

        let err = seg
            .create_roi_table_region("bad", [1, 5], None)
            .unwrap_err();
        assert_eq!(err, RoiTableError::IndexOutOfRange { index: 5, len: 5 });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(seg.create_roi_table_region("bad", 3..6, None).is_err());

        let empty = table(0).create_roi_table_region("none", .., None).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_wrong_table() {
        let seg = table(2);
        let region = seg.create_roi_table_region("all", .., None).unwrap();
        let space = Arc::new(ImagingSpace::planar("other", ""));
        let other = Segmentation::new("Other", "", space);
        let err = region.rois(&other).unwrap_err();
        assert!(matches!(err, RoiTableError::WrongTable { .. }));
    }
}
