use std::sync::Arc;

use ndarray::{Array, ArrayD, ArrayViewD, Axis, Dimension, IxDyn};

use super::{SeriesError, SeriesUnit};
use crate::meta::{
    Dimensionality, EmissionLightPath, ExcitationLightPath, IlluminationPattern, ImagingSpace,
    Microscope,
};

/// The rank of multi-channel volume data: three grid axes and a channel axis
const VOLUME_RANK: usize = 4;

/**
A single volume imaged through several optical channels at once.

Data is laid out as x × y × z × channel. Channel `c` was excited through
`excitation_light_paths()[c]` and recorded through `emission_light_paths()[c]`, so both
lists have one entry per channel.

```
use std::sync::Arc;
use ndarray::Array4;
use microscopy_data::meta::{EmissionLightPath, ExcitationLightPath, ImagingSpace, Microscope};
use microscopy_data::series::MultiChannelMicroscopyVolume;

let space = Arc::new(ImagingSpace::volumetric("volume", "").with_grid_shape([4, 4, 2])?);
let microscope = Arc::new(Microscope::default());
let volume = MultiChannelMicroscopyVolume::builder("volume", microscope, space)
    .data(Array4::<f64>::ones((4, 4, 2, 1)))
    .add_channel(
        Arc::new(ExcitationLightPath::builder("excitation", 920.0).build()?),
        Arc::new(EmissionLightPath::builder("emission", 513.0).build()?),
    )
    .build()?;
assert_eq!(volume.num_channels(), 1);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiChannelMicroscopyVolume {
    name: String,
    description: String,
    microscope: Arc<Microscope>,
    imaging_space: Arc<ImagingSpace>,
    excitation_light_paths: Vec<Arc<ExcitationLightPath>>,
    emission_light_paths: Vec<Arc<EmissionLightPath>>,
    data: ArrayD<f64>,
    unit: SeriesUnit,
    depth_per_frame_in_um: Option<Vec<f64>>,
    illumination_pattern: Option<Arc<IlluminationPattern>>,
}

impl MultiChannelMicroscopyVolume {
    pub fn builder<S: Into<String>>(
        name: S,
        microscope: Arc<Microscope>,
        imaging_space: Arc<ImagingSpace>,
    ) -> MultiChannelMicroscopyVolumeBuilder {
        MultiChannelMicroscopyVolumeBuilder {
            name: name.into(),
            description: String::new(),
            microscope,
            imaging_space,
            excitation_light_paths: Vec::new(),
            emission_light_paths: Vec::new(),
            data: None,
            unit: SeriesUnit::default(),
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

    pub fn imaging_space(&self) -> &Arc<ImagingSpace> {
        &self.imaging_space
    }

    pub fn excitation_light_paths(&self) -> &[Arc<ExcitationLightPath>] {
        &self.excitation_light_paths
    }

    pub fn emission_light_paths(&self) -> &[Arc<EmissionLightPath>] {
        &self.emission_light_paths
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn unit(&self) -> &SeriesUnit {
        &self.unit
    }

    /// The imaging depth of each z-plane, when the volume was sampled at uneven depths
    pub fn depth_per_frame_in_um(&self) -> Option<&[f64]> {
        self.depth_per_frame_in_um.as_deref()
    }

    pub fn illumination_pattern(&self) -> Option<&Arc<IlluminationPattern>> {
        self.illumination_pattern.as_ref()
    }

    pub fn num_channels(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    pub fn num_planes(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// The x × y × z volume recorded on `index`
    pub fn channel(&self, index: usize) -> Option<ArrayViewD<'_, f64>> {
        (index < self.num_channels()).then(|| self.data.index_axis(Axis(3), index))
    }
}

#[derive(Debug, Clone)]
pub struct MultiChannelMicroscopyVolumeBuilder {
    name: String,
    description: String,
    microscope: Arc<Microscope>,
    imaging_space: Arc<ImagingSpace>,
    excitation_light_paths: Vec<Arc<ExcitationLightPath>>,
    emission_light_paths: Vec<Arc<EmissionLightPath>>,
    data: Option<ArrayD<f64>>,
    unit: SeriesUnit,
    depth_per_frame_in_um: Option<Vec<f64>>,
    illumination_pattern: Option<Arc<IlluminationPattern>>,
}

impl MultiChannelMicroscopyVolumeBuilder {
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn data<D: Dimension>(mut self, data: Array<f64, D>) -> Self {
        self.data = Some(data.into_dyn());
        self
    }

    pub fn excitation_light_paths(mut self, paths: Vec<Arc<ExcitationLightPath>>) -> Self {
        self.excitation_light_paths = paths;
        self
    }

    pub fn emission_light_paths(mut self, paths: Vec<Arc<EmissionLightPath>>) -> Self {
        self.emission_light_paths = paths;
        self
    }

    /// Append one channel's pair of light paths
    pub fn add_channel(
        mut self,
        excitation: Arc<ExcitationLightPath>,
        emission: Arc<EmissionLightPath>,
    ) -> Self {
        self.excitation_light_paths.push(excitation);
        self.emission_light_paths.push(emission);
        self
    }

    pub fn unit(mut self, unit: SeriesUnit) -> Self {
        self.unit = unit;
        self
    }

    /// One depth per z-plane
    pub fn depth_per_frame_in_um(mut self, depths: Vec<f64>) -> Self {
        self.depth_per_frame_in_um = Some(depths);
        self
    }

    pub fn illumination_pattern(mut self, pattern: Arc<IlluminationPattern>) -> Self {
        self.illumination_pattern = Some(pattern);
        self
    }

    pub fn build(self) -> Result<MultiChannelMicroscopyVolume, SeriesError> {
        let found = self.imaging_space.dimensionality();
        if found != Dimensionality::Volumetric {
            return Err(SeriesError::Dimensionality {
                expected: Dimensionality::Volumetric,
                found,
            });
        }
        let channels = self.excitation_light_paths.len();
        let data = self
            .data
            .unwrap_or_else(|| ArrayD::zeros(IxDyn(&[0, 0, 0, channels])));
        if data.ndim() != VOLUME_RANK {
            return Err(SeriesError::DataRank {
                expected: VOLUME_RANK,
                found: data.ndim(),
            });
        }
        if let Some(grid) = self.imaging_space.grid_shape() {
            let volume_shape = &data.shape()[..3];
            if volume_shape != grid {
                return Err(SeriesError::FrameShape {
                    expected: grid.to_vec(),
                    found: volume_shape.to_vec(),
                });
            }
        }

        let channels = data.len_of(Axis(3));
        if self.excitation_light_paths.len() != channels {
            return Err(SeriesError::ChannelCount {
                attribute: "excitation light paths",
                expected: channels,
                found: self.excitation_light_paths.len(),
            });
        }
        if self.emission_light_paths.len() != channels {
            return Err(SeriesError::ChannelCount {
                attribute: "emission light paths",
                expected: channels,
                found: self.emission_light_paths.len(),
            });
        }

        let planes = data.len_of(Axis(2));
        if let Some(depths) = self.depth_per_frame_in_um.as_ref() {
            if depths.len() != planes {
                return Err(SeriesError::DepthCount {
                    expected: planes,
                    found: depths.len(),
                });
            }
        }
        log::debug!(
            "Built multi-channel volume {} with {} channels over {} planes",
            self.name,
            channels,
            planes
        );
        Ok(MultiChannelMicroscopyVolume {
            name: self.name,
            description: self.description,
            microscope: self.microscope,
            imaging_space: self.imaging_space,
            excitation_light_paths: self.excitation_light_paths,
            emission_light_paths: self.emission_light_paths,
            data,
            unit: self.unit,
            depth_per_frame_in_um: self.depth_per_frame_in_um,
            illumination_pattern: self.illumination_pattern,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::meta::{IlluminationKind, PlaneAcquisition};
    use ndarray::{Array3, Array4};

    fn builder(channels: usize) -> MultiChannelMicroscopyVolumeBuilder {
        let space = ImagingSpace::volumetric("volume", "")
            .with_grid_shape([10, 20, 7])
            .unwrap();
        let mut builder = MultiChannelMicroscopyVolume::builder(
            "volume",
            Arc::new(Microscope::default()),
            Arc::new(space),
        );
        for i in 0..channels {
            let wavelength = 400.0 + 100.0 * i as f64;
            builder = builder.add_channel(
                Arc::new(
                    ExcitationLightPath::builder(format!("excitation{i}"), wavelength)
                        .build()
                        .unwrap(),
                ),
                Arc::new(
                    EmissionLightPath::builder(format!("emission{i}"), wavelength + 50.0)
                        .build()
                        .unwrap(),
                ),
            );
        }
        builder
    }

    #[test_log::test]
    fn test_build_volume() {
        let pattern = IlluminationPattern::new(
            "sheet",
            "",
            IlluminationKind::PlaneAcquisition(PlaneAcquisition {
                point_spread_function_in_um: None,
                illumination_angle_in_degrees: Some(45.0),
                plane_rate_in_hz: Some(20.0),
            }),
        )
        .unwrap();
        let mut data = Array4::<f64>::zeros((10, 20, 7, 3));
        data[[1, 2, 3, 2]] = 5.0;
        let volume = builder(3)
            .data(data)
            .depth_per_frame_in_um((0..7).map(|z| z as f64 * 5.0).collect())
            .illumination_pattern(Arc::new(pattern))
            .build()
            .unwrap();
        assert_eq!(volume.num_channels(), 3);
        assert_eq!(volume.num_planes(), 7);
        assert_eq!(volume.channel(2).unwrap()[[1, 2, 3]], 5.0);
        assert!(volume.channel(3).is_none());
        assert_eq!(volume.emission_light_paths()[1].emission_wavelength_in_nm(), 550.0);
        assert_eq!(volume.depth_per_frame_in_um().unwrap()[6], 30.0);
        assert_eq!(
            volume.illumination_pattern().unwrap().kind().as_str(),
            "PlaneAcquisition"
        );
    }

    #[test]
    fn test_volume_validation() {
        let err = builder(2)
            .data(Array4::<f64>::ones((10, 20, 7, 3)))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SeriesError::ChannelCount {
                attribute: "excitation light paths",
                expected: 3,
                found: 2
            }
        );
        assert_eq!(err.kind(), ErrorKind::Shape);

        let err = builder(3)
            .emission_light_paths(Vec::new())
            .data(Array4::<f64>::ones((10, 20, 7, 3)))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SeriesError::ChannelCount {
                attribute: "emission light paths",
                ..
            }
        ));

        let err = builder(1)
            .data(Array3::<f64>::ones((10, 20, 7)))
            .build()
            .unwrap_err();
        assert_eq!(err, SeriesError::DataRank { expected: 4, found: 3 });

        let err = builder(1)
            .data(Array4::<f64>::ones((10, 20, 6, 1)))
            .build()
            .unwrap_err();
        assert!(matches!(err, SeriesError::FrameShape { .. }));

        let err = builder(1)
            .data(Array4::<f64>::ones((10, 20, 7, 1)))
            .depth_per_frame_in_um(vec![0.0, 1.0])
            .build()
            .unwrap_err();
        assert_eq!(err, SeriesError::DepthCount { expected: 7, found: 2 });

        let err = MultiChannelMicroscopyVolume::builder(
            "volume",
            Arc::new(Microscope::default()),
            Arc::new(ImagingSpace::planar("plane", "")),
        )
        .build()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
