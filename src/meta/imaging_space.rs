use std::fmt::Display;

use crate::roi::mask::MaskError;

/// Whether an imaging space is a single plane or a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimensionality {
    #[default]
    Planar,
    Volumetric,
}

impl Dimensionality {
    /// The number of spatial axes of the grid
    pub const fn rank(&self) -> usize {
        match self {
            Self::Planar => 2,
            Self::Volumetric => 3,
        }
    }

    pub const fn from_rank(rank: usize) -> Option<Self> {
        match rank {
            2 => Some(Self::Planar),
            3 => Some(Self::Volumetric),
            _ => None,
        }
    }
}

impl Display for Dimensionality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planar => f.write_str("planar"),
            Self::Volumetric => f.write_str("volumetric"),
        }
    }
}

/// The 2-D or 3-D acquisition grid that images are recorded on and that ROIs are
/// segmented within.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImagingSpace {
    pub name: String,
    /// Free text describing the space, e.g. the depth or targeted structure
    pub description: String,
    dimensionality: Dimensionality,
    grid_shape: Option<Vec<usize>>,
    /// Physical location of the first grid element, in the reference frame
    pub origin_coordinates: Option<[f64; 3]>,
    /// Spacing between adjacent grid elements along each axis, in micrometers
    pub grid_spacing_in_um: Vec<f64>,
    pub location: String,
    pub reference_frame: String,
}

impl ImagingSpace {
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        dimensionality: Dimensionality,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            dimensionality,
            ..Default::default()
        }
    }

    pub fn planar<N: Into<String>, D: Into<String>>(name: N, description: D) -> Self {
        Self::new(name, description, Dimensionality::Planar)
    }

    pub fn volumetric<N: Into<String>, D: Into<String>>(name: N, description: D) -> Self {
        Self::new(name, description, Dimensionality::Volumetric)
    }

    /// Fix the number of grid elements along each axis. The shape must have one entry
    /// per axis of the space.
    pub fn with_grid_shape<S: Into<Vec<usize>>>(mut self, shape: S) -> Result<Self, MaskError> {
        let shape = shape.into();
        if shape.len() != self.dimensionality.rank() {
            return Err(MaskError::ImageRank {
                expected: self.dimensionality.rank(),
                found: shape.len(),
            });
        }
        self.grid_shape = Some(shape);
        Ok(self)
    }

    pub fn with_grid_spacing<S: Into<Vec<f64>>>(mut self, spacing: S) -> Self {
        self.grid_spacing_in_um = spacing.into();
        self
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin_coordinates = Some(origin);
        self
    }

    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_reference_frame<S: Into<String>>(mut self, reference_frame: S) -> Self {
        self.reference_frame = reference_frame.into();
        self
    }

    pub fn dimensionality(&self) -> Dimensionality {
        self.dimensionality
    }

    pub fn grid_shape(&self) -> Option<&[usize]> {
        self.grid_shape.as_deref()
    }

    pub fn is_planar(&self) -> bool {
        matches!(self.dimensionality, Dimensionality::Planar)
    }

    pub fn is_volumetric(&self) -> bool {
        matches!(self.dimensionality, Dimensionality::Volumetric)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_grid_shape_rank() {
        let space = ImagingSpace::planar("plane", "layer 2/3")
            .with_grid_shape([512, 512])
            .unwrap();
        assert_eq!(space.grid_shape(), Some(&[512, 512][..]));
        assert!(space.is_planar());

        let err = ImagingSpace::volumetric("volume", "cortex")
            .with_grid_shape(vec![10, 10])
            .unwrap_err();
        assert_eq!(err, MaskError::ImageRank { expected: 3, found: 2 });
        assert_eq!(Dimensionality::from_rank(3), Some(Dimensionality::Volumetric));
        assert_eq!(Dimensionality::from_rank(4), None);
    }
}
