//! Acquired image series and per-ROI response series.
pub mod multichannel;

use std::sync::Arc;

use indexmap::map::{Iter, Keys};
use indexmap::IndexMap;
use ndarray::{Array2, ArrayD, ArrayView1, Axis, IxDyn};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::meta::{
    Dimensionality, EmissionLightPath, ExcitationLightPath, IlluminationPattern, ImagingSpace,
    Microscope,
};
use crate::roi::RoiTableRegion;

pub use multichannel::{MultiChannelMicroscopyVolume, MultiChannelMicroscopyVolumeBuilder};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error("Expected {expected}-dimensional series data, got {found} dimensions")]
    DataRank { expected: usize, found: usize },
    #[error("Series frames have shape {found:?} but the imaging grid is {expected:?}")]
    FrameShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Expected one timestamp per frame ({expected}), got {found}")]
    TimestampCount { expected: usize, found: usize },
    #[error("Expected one depth per frame ({expected}), got {found}")]
    DepthCount { expected: usize, found: usize },
    #[error("Per-frame depths are only meaningful for a planar imaging space")]
    DepthOnVolume,
    #[error("Response data has {found} ROI columns but the table region selects {expected} ROIs")]
    RoiAxis { expected: usize, found: usize },
    #[error("A series needs either timestamps or a sampling rate")]
    MissingTiming,
    #[error("The sampling rate must be positive and finite, got {0}")]
    InvalidRate(f64),
    #[error("A series named {0:?} already exists")]
    DuplicateName(String),
    #[error("Data has {expected} channels but {found} {attribute} were given")]
    ChannelCount {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Expected a {expected} imaging space, got a {found} one")]
    Dimensionality {
        expected: Dimensionality,
        found: Dimensionality,
    },
}

impl SeriesError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DataRank { .. }
            | Self::FrameShape { .. }
            | Self::TimestampCount { .. }
            | Self::DepthCount { .. }
            | Self::RoiAxis { .. }
            | Self::ChannelCount { .. } => ErrorKind::Shape,
            Self::DepthOnVolume
            | Self::MissingTiming
            | Self::InvalidRate(_)
            | Self::Dimensionality { .. } => ErrorKind::Validation,
            Self::DuplicateName(_) => ErrorKind::DuplicateKey,
        }
    }
}

/// When each frame of a series was acquired
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Timing {
    /// Regular sampling, in seconds and hertz
    Rate { starting_time: f64, rate: f64 },
    /// One acquisition time per frame, in seconds
    Timestamps(Vec<f64>),
}

impl Timing {
    pub fn rate(starting_time: f64, rate: f64) -> Result<Self, SeriesError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SeriesError::InvalidRate(rate));
        }
        Ok(Self::Rate {
            starting_time,
            rate,
        })
    }

    /// Resolve timing from whichever parts a caller supplied.
    ///
    /// Timestamps take precedence. If a starting time or rate is also given, a warning
    /// is logged and those are ignored. A missing starting time is taken to be zero.
    pub fn from_parts(
        starting_time: Option<f64>,
        rate: Option<f64>,
        timestamps: Option<Vec<f64>>,
    ) -> Result<Self, SeriesError> {
        match (timestamps, rate) {
            (Some(timestamps), _) => {
                if starting_time.is_some() || rate.is_some() {
                    log::warn!(
                        "Timestamps were provided in addition to a rate or starting time, \
                         the timestamps take precedence"
                    );
                }
                Ok(Self::Timestamps(timestamps))
            }
            (None, Some(rate)) => Self::rate(starting_time.unwrap_or(0.0), rate),
            (None, None) => Err(SeriesError::MissingTiming),
        }
    }

    /// The acquisition time of `frame`, if it is known
    pub fn time_of(&self, frame: usize) -> Option<f64> {
        match self {
            Self::Rate {
                starting_time,
                rate,
            } => Some(starting_time + frame as f64 / rate),
            Self::Timestamps(timestamps) => timestamps.get(frame).copied(),
        }
    }

    fn check_frames(&self, frames: usize) -> Result<(), SeriesError> {
        match self {
            Self::Timestamps(timestamps) if timestamps.len() != frames => {
                Err(SeriesError::TimestampCount {
                    expected: frames,
                    found: timestamps.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// The stored-to-physical unit mapping shared by all series: `value * conversion + offset`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesUnit {
    pub unit: String,
    pub conversion: f64,
    pub offset: f64,
}

impl Default for SeriesUnit {
    fn default() -> Self {
        Self {
            unit: "n.a.".to_string(),
            conversion: 1.0,
            offset: 0.0,
        }
    }
}

impl SeriesUnit {
    pub fn apply(&self, value: f64) -> f64 {
        value * self.conversion + self.offset
    }
}

/// Imaging data acquired on an [`ImagingSpace`] through a pair of light paths.
///
/// Data is laid out as frames × grid axes, so a planar series has rank 3 and a
/// volumetric series rank 4.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicroscopySeries {
    name: String,
    description: String,
    microscope: Arc<Microscope>,
    excitation_light_path: Arc<ExcitationLightPath>,
    emission_light_path: Arc<EmissionLightPath>,
    imaging_space: Arc<ImagingSpace>,
    data: ArrayD<f64>,
    unit: SeriesUnit,
    timing: Timing,
    depth_per_frame_in_um: Option<Vec<f64>>,
    illumination_pattern: Option<Arc<IlluminationPattern>>,
}

impl MicroscopySeries {
    pub fn builder<S: Into<String>>(
        name: S,
        microscope: Arc<Microscope>,
        excitation_light_path: Arc<ExcitationLightPath>,
        emission_light_path: Arc<EmissionLightPath>,
        imaging_space: Arc<ImagingSpace>,
    ) -> MicroscopySeriesBuilder {
        MicroscopySeriesBuilder {
            name: name.into(),
            description: String::new(),
            microscope,
            excitation_light_path,
            emission_light_path,
            imaging_space,
            data: None,
            unit: SeriesUnit::default(),
            timing: None,
            depth_per_frame_in_um: None,
            illumination_pattern: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn microscope(&self) -> &Arc<Microscope> {
        &self.microscope
    }

    pub fn excitation_light_path(&self) -> &Arc<ExcitationLightPath> {
        &self.excitation_light_path
    }

    pub fn emission_light_path(&self) -> &Arc<EmissionLightPath> {
        &self.emission_light_path
    }

    pub fn imaging_space(&self) -> &Arc<ImagingSpace> {
        &self.imaging_space
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn unit(&self) -> &SeriesUnit {
        &self.unit
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// The imaging depth of each frame, for planar series acquired at varying depth
    pub fn depth_per_frame_in_um(&self) -> Option<&[f64]> {
        self.depth_per_frame_in_um.as_deref()
    }

    pub fn illumination_pattern(&self) -> Option<&Arc<IlluminationPattern>> {
        self.illumination_pattern.as_ref()
    }

    pub fn num_frames(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// The data mapped through the series' conversion and offset
    pub fn data_in_unit(&self) -> ArrayD<f64> {
        self.data.mapv(|v| self.unit.apply(v))
    }
}

#[derive(Debug, Clone)]
pub struct MicroscopySeriesBuilder {
    name: String,
    description: String,
    microscope: Arc<Microscope>,
    excitation_light_path: Arc<ExcitationLightPath>,
    emission_light_path: Arc<EmissionLightPath>,
    imaging_space: Arc<ImagingSpace>,
    data: Option<ArrayD<f64>>,
    unit: SeriesUnit,
    timing: Option<Timing>,
    depth_per_frame_in_um: Option<Vec<f64>>,
    illumination_pattern: Option<Arc<IlluminationPattern>>,
}

impl MicroscopySeriesBuilder {
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn data<D: ndarray::Dimension>(mut self, data: ndarray::Array<f64, D>) -> Self {
        self.data = Some(data.into_dyn());
        self
    }

    pub fn unit(mut self, unit: SeriesUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn depth_per_frame_in_um(mut self, depths: Vec<f64>) -> Self {
        self.depth_per_frame_in_um = Some(depths);
        self
    }

    pub fn illumination_pattern(mut self, pattern: Arc<IlluminationPattern>) -> Self {
        self.illumination_pattern = Some(pattern);
        self
    }

    pub fn build(self) -> Result<MicroscopySeries, SeriesError> {
        let dimensionality = self.imaging_space.dimensionality();
        let expected = dimensionality.rank() + 1;
        let data = self
            .data
            .unwrap_or_else(|| ArrayD::zeros(IxDyn(&vec![0; expected])));
        if data.ndim() != expected {
            return Err(SeriesError::DataRank {
                expected,
                found: data.ndim(),
            });
        }
        if let Some(grid) = self.imaging_space.grid_shape() {
            let frame_shape = &data.shape()[1..];
            if frame_shape != grid {
                return Err(SeriesError::FrameShape {
                    expected: grid.to_vec(),
                    found: frame_shape.to_vec(),
                });
            }
        }
        let frames = data.len_of(Axis(0));
        let timing = self.timing.ok_or(SeriesError::MissingTiming)?;
        timing.check_frames(frames)?;
        if let Some(depths) = self.depth_per_frame_in_um.as_ref() {
            if dimensionality != Dimensionality::Planar {
                return Err(SeriesError::DepthOnVolume);
            }
            if depths.len() != frames {
                return Err(SeriesError::DepthCount {
                    expected: frames,
                    found: depths.len(),
                });
            }
        }
        log::debug!(
            "Built {} series {} with {} frames",
            dimensionality,
            self.name,
            frames
        );
        Ok(MicroscopySeries {
            name: self.name,
            description: self.description,
            microscope: self.microscope,
            excitation_light_path: self.excitation_light_path,
            emission_light_path: self.emission_light_path,
            imaging_space: self.imaging_space,
            data,
            unit: self.unit,
            timing,
            depth_per_frame_in_um: self.depth_per_frame_in_um,
            illumination_pattern: self.illumination_pattern,
        })
    }
}

/// Per-ROI traces laid out as frames × ROIs, with columns aligned to the rows selected
/// by a [`RoiTableRegion`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicroscopyResponseSeries {
    name: String,
    description: String,
    data: Array2<f64>,
    table_region: RoiTableRegion,
    unit: SeriesUnit,
    timing: Timing,
}

impl MicroscopyResponseSeries {
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        data: Array2<f64>,
        table_region: RoiTableRegion,
        timing: Timing,
    ) -> Result<Self, SeriesError> {
        if data.ncols() != table_region.len() {
            return Err(SeriesError::RoiAxis {
                expected: table_region.len(),
                found: data.ncols(),
            });
        }
        timing.check_frames(data.nrows())?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            data,
            table_region,
            unit: SeriesUnit::default(),
            timing,
        })
    }

    pub fn with_unit(mut self, unit: SeriesUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn table_region(&self) -> &RoiTableRegion {
        &self.table_region
    }

    pub fn unit(&self) -> &SeriesUnit {
        &self.unit
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn num_frames(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_rois(&self) -> usize {
        self.data.ncols()
    }

    /// The trace of the ROI at `position` within the table region
    pub fn trace(&self, position: usize) -> Option<ArrayView1<'_, f64>> {
        (position < self.num_rois()).then(|| self.data.column(position))
    }
}

/// Response series grouped by unique name, in insertion order
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicroscopyResponseSeriesContainer {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(with = "indexmap::map::serde_seq"))]
    series: IndexMap<String, MicroscopyResponseSeries>,
}

impl Default for MicroscopyResponseSeriesContainer {
    fn default() -> Self {
        Self::new("MicroscopyResponseSeriesContainer")
    }
}

impl MicroscopyResponseSeriesContainer {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            series: IndexMap::new(),
        }
    }

    pub fn add(&mut self, series: MicroscopyResponseSeries) -> Result<(), SeriesError> {
        if self.series.contains_key(series.name()) {
            return Err(SeriesError::DuplicateName(series.name().to_string()));
        }
        self.series.insert(series.name().to_string(), series);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MicroscopyResponseSeries> {
        self.series.get(name)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn names(&self) -> Keys<'_, String, MicroscopyResponseSeries> {
        self.series.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, MicroscopyResponseSeries> {
        self.series.iter()
    }
}

/// Planar series of the same acquisition grouped by name, typically one per imaging plane
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiPlaneMicroscopyContainer {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(with = "indexmap::map::serde_seq"))]
    series: IndexMap<String, MicroscopySeries>,
}

impl Default for MultiPlaneMicroscopyContainer {
    fn default() -> Self {
        Self::new("MultiPlaneMicroscopyContainer")
    }
}

impl MultiPlaneMicroscopyContainer {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            series: IndexMap::new(),
        }
    }

    /// Store a planar series under its own name
    pub fn add(&mut self, series: MicroscopySeries) -> Result<(), SeriesError> {
        let found = series.imaging_space().dimensionality();
        if found != Dimensionality::Planar {
            return Err(SeriesError::Dimensionality {
                expected: Dimensionality::Planar,
                found,
            });
        }
        if self.series.contains_key(series.name()) {
            return Err(SeriesError::DuplicateName(series.name().to_string()));
        }
        log::trace!("Adding plane {} to {}", series.name(), self.name);
        self.series.insert(series.name().to_string(), series);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MicroscopySeries> {
        self.series.get(name)
    }

    pub fn get_index(&self, index: usize) -> Option<&MicroscopySeries> {
        self.series.get_index(index).map(|(_, series)| series)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn names(&self) -> Keys<'_, String, MicroscopySeries> {
        self.series.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, MicroscopySeries> {
        self.series.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::roi::{PixelWeight, Segmentation};
    use ndarray::{Array3, Array4};

    fn fixtures() -> (Arc<Microscope>, Arc<ExcitationLightPath>, Arc<EmissionLightPath>) {
        let microscope = Arc::new(Microscope {
            name: "scope".into(),
            ..Default::default()
        });
        let excitation = Arc::new(
            ExcitationLightPath::builder("excitation", 920.0)
                .build()
                .unwrap(),
        );
        let emission = Arc::new(EmissionLightPath::builder("emission", 513.0).build().unwrap());
        (microscope, excitation, emission)
    }

    #[test_log::test]
    fn test_timing() {
        assert_eq!(
            Timing::from_parts(None, Some(10.0), None).unwrap(),
            Timing::Rate {
                starting_time: 0.0,
                rate: 10.0
            }
        );
        // Timestamps win over a rate
        let timing = Timing::from_parts(Some(1.0), Some(10.0), Some(vec![0.0, 0.5])).unwrap();
        assert_eq!(timing, Timing::Timestamps(vec![0.0, 0.5]));
        assert_eq!(timing.time_of(1), Some(0.5));
        assert_eq!(timing.time_of(2), None);

        assert_eq!(
            Timing::from_parts(Some(1.0), None, None).unwrap_err(),
            SeriesError::MissingTiming
        );
        assert_eq!(Timing::rate(0.0, 0.0).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(Timing::rate(2.0, 4.0).unwrap().time_of(2), Some(2.5));
    }

    #[test]
    fn test_series_rank() {
        let (microscope, excitation, emission) = fixtures();
        let space = Arc::new(ImagingSpace::planar("plane", ""));
        let series = MicroscopySeries::builder(
            "series",
            microscope.clone(),
            excitation.clone(),
            emission.clone(),
            space.clone(),
        )
        .data(Array3::<f64>::ones((15, 5, 5)))
        .unit(SeriesUnit {
            unit: "a.u.".into(),
            conversion: 2.0,
            offset: 1.0,
        })
        .timing(Timing::rate(0.0, 10.0).unwrap())
        .build()
        .unwrap();
        assert_eq!(series.num_frames(), 15);
        assert_eq!(series.data_in_unit().sum(), 15.0 * 25.0 * 3.0);

        let err = MicroscopySeries::builder("series", microscope, excitation, emission, space)
            .data(Array4::<f64>::ones((5, 5, 5, 3)))
            .timing(Timing::rate(0.0, 10.0).unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err, SeriesError::DataRank { expected: 3, found: 4 });
    }

    #[test]
    fn test_series_grid_and_timestamps() {
        let (microscope, excitation, emission) = fixtures();
        let space = Arc::new(
            ImagingSpace::planar("plane", "")
                .with_grid_shape([4, 4])
                .unwrap(),
        );
        let builder = MicroscopySeries::builder("series", microscope, excitation, emission, space);
        let err = builder
            .clone()
            .data(Array3::<f64>::ones((3, 5, 5)))
            .timing(Timing::Timestamps(vec![0.0, 0.1, 0.2]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SeriesError::FrameShape { .. }));

        let err = builder
            .clone()
            .data(Array3::<f64>::ones((3, 4, 4)))
            .timing(Timing::Timestamps(vec![0.0, 0.1]))
            .build()
            .unwrap_err();
        assert_eq!(err, SeriesError::TimestampCount { expected: 3, found: 2 });

        let series = builder
            .data(Array3::<f64>::ones((3, 4, 4)))
            .timing(Timing::Timestamps(vec![0.0, 0.1, 0.2]))
            .depth_per_frame_in_um(vec![0.0, 15.0, 30.0])
            .illumination_pattern(Arc::new(
                IlluminationPattern::new("widefield", "", Default::default()).unwrap(),
            ))
            .build()
            .unwrap();
        assert_eq!(series.depth_per_frame_in_um(), Some(&[0.0, 15.0, 30.0][..]));
        assert_eq!(series.illumination_pattern().unwrap().name(), "widefield");
    }

    #[test]
    fn test_multi_plane_container() {
        let (microscope, excitation, emission) = fixtures();
        let plane = |name: &str, space: Arc<ImagingSpace>| {
            MicroscopySeries::builder(
                name,
                microscope.clone(),
                excitation.clone(),
                emission.clone(),
                space,
            )
            .timing(Timing::rate(0.0, 10.0).unwrap())
            .build()
            .unwrap()
        };
        let planar = Arc::new(ImagingSpace::planar("plane", ""));
        let mut container = MultiPlaneMicroscopyContainer::default();
        container.add(plane("plane0", planar.clone())).unwrap();
        container.add(plane("plane1", planar.clone())).unwrap();

        let err = container.add(plane("plane0", planar)).unwrap_err();
        assert_eq!(err, SeriesError::DuplicateName("plane0".into()));

        let volume = plane("volume", Arc::new(ImagingSpace::volumetric("volume", "")));
        let err = container.add(volume).unwrap_err();
        assert_eq!(
            err,
            SeriesError::Dimensionality {
                expected: Dimensionality::Planar,
                found: Dimensionality::Volumetric
            }
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            container.names().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["plane0", "plane1"]
        );
        assert_eq!(container.get_index(1).unwrap().name(), "plane1");
    }

    #[test]
    fn test_response_series() {
        let space = Arc::new(ImagingSpace::planar("plane", ""));
        let mut seg = Segmentation::new("PlaneSegmentation", "", space);
        for i in 0..5 {
            seg.add_roi(vec![PixelWeight::new(i, 0, 1.0)], None).unwrap();
        }
        let region = seg.create_roi_table_region("cells", vec![0, 2, 4], None).unwrap();
        let timing = Timing::rate(0.0, 30.0).unwrap();

        let err = MicroscopyResponseSeries::new(
            "dff",
            "",
            Array2::<f64>::ones((10, 5)),
            region.clone(),
            timing.clone(),
        )
        .unwrap_err();
        assert_eq!(err, SeriesError::RoiAxis { expected: 3, found: 5 });
        assert_eq!(err.kind(), ErrorKind::Shape);

        let series =
            MicroscopyResponseSeries::new("dff", "", Array2::<f64>::ones((10, 3)), region, timing)
                .unwrap();
        assert_eq!(series.num_rois(), 3);
        assert_eq!(series.trace(2).unwrap().len(), 10);
        assert!(series.trace(3).is_none());

        let mut container = MicroscopyResponseSeriesContainer::default();
        container.add(series.clone()).unwrap();
        let err = container.add(series).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(container.len(), 1);
    }
}
