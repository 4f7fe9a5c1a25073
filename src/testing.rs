//! Ready-made instances of the data model for use in tests.
//!
//! Every factory fills in sensible defaults and generates a unique name for the object
//! it returns, so several mocks of the same type can live in one container.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use ndarray::{Array2, Array3, Array4};

use crate::meta::{
    EmissionLightPath, ExcitationLightPath, ExcitationSource, IlluminationKind,
    IlluminationPattern, ImagingSpace, Indicator, LineScan, Microscope, Photodetector,
    ScanDirection,
};
use crate::roi::{RoiTableRegion, Segmentation, SegmentationContainer};
use crate::series::{
    MicroscopyResponseSeries, MicroscopySeries, MultiChannelMicroscopyVolume,
    MultiPlaneMicroscopyContainer, SeriesUnit, Timing,
};

static NAME_COUNTS: OnceLock<Mutex<HashMap<String, usize>>> = OnceLock::new();

/// Produce `base`, then `base2`, `base3` and so on across calls with the same `base`
pub fn name_generator(base: &str) -> String {
    let counts = NAME_COUNTS.get_or_init(Default::default);
    let mut counts = match counts.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let count = counts.entry(base.to_string()).or_insert(0);
    *count += 1;
    match *count {
        1 => base.to_string(),
        n => format!("{base}{n}"),
    }
}

fn mock_description(kind: &str) -> String {
    format!("A mock instance of a {kind} type to be used for rapid testing.")
}

pub fn mock_microscope() -> Microscope {
    Microscope {
        name: name_generator("Microscope"),
        description: "A mock instance of a Microscope type to be used for rapid testing.".into(),
        manufacturer: "A fake manufacturer of the mock microscope.".into(),
        model: "A fake model of the mock microscope.".into(),
        ..Default::default()
    }
}

pub fn mock_excitation_source(wavelength_in_nm: f64) -> ExcitationSource {
    ExcitationSource {
        name: name_generator("ExcitationSource"),
        description: "A mock instance of an ExcitationSource type to be used for rapid testing."
            .into(),
        illumination_type: "Laser".into(),
        excitation_wavelength_in_nm: Some(wavelength_in_nm),
        power_in_w: Some(0.7),
        ..Default::default()
    }
}

pub fn mock_indicator(wavelength_in_nm: f64) -> Indicator {
    Indicator {
        name: name_generator("Indicator"),
        description: "A mock instance of an Indicator type to be used for rapid testing.".into(),
        label: "GCaMP6f".into(),
        injection_location: "VISp".into(),
        emission_wavelength_in_nm: Some(wavelength_in_nm),
        ..Default::default()
    }
}

pub fn mock_photodetector(wavelength_in_nm: f64) -> Photodetector {
    Photodetector {
        name: name_generator("Photodetector"),
        description: "A mock instance of a Photodetector type to be used for rapid testing.".into(),
        detector_type: "PMT".into(),
        detected_wavelength_in_nm: Some(wavelength_in_nm),
        gain: Some(1.0),
        ..Default::default()
    }
}

/// An excitation light path at 500 nm, driven by a matching excitation source
pub fn mock_excitation_light_path() -> ExcitationLightPath {
    let wavelength = 500.0;
    ExcitationLightPath::builder(name_generator("ExcitationLightPath"), wavelength)
        .description("A mock instance of an ExcitationLightPath type to be used for rapid testing.")
        .excitation_mode("two-photon")
        .excitation_source(Arc::new(mock_excitation_source(wavelength)))
        .build()
        .expect("mock excitation light path is consistent")
}

/// An emission light path at 450 nm, with a matching indicator and photodetector
pub fn mock_emission_light_path() -> EmissionLightPath {
    let wavelength = 450.0;
    EmissionLightPath::builder(name_generator("EmissionLightPath"), wavelength)
        .description("A mock instance of an EmissionLightPath type to be used for rapid testing.")
        .indicator(Arc::new(mock_indicator(wavelength)))
        .photodetector(Arc::new(mock_photodetector(wavelength)))
        .build()
        .expect("mock emission light path is consistent")
}

pub fn mock_planar_imaging_space() -> ImagingSpace {
    ImagingSpace::planar(
        name_generator("PlanarImagingSpace"),
        "A mock instance of a PlanarImagingSpace type to be used for rapid testing.",
    )
    .with_origin([-1.2, -0.6, -2.0])
    .with_grid_spacing([0.2, 0.2])
    .with_location("The location targeted by the mock imaging space.")
    .with_reference_frame("The reference frame of the mock planar imaging space.")
}

pub fn mock_volumetric_imaging_space() -> ImagingSpace {
    ImagingSpace::volumetric(
        name_generator("VolumetricImagingSpace"),
        "A mock instance of a VolumetricImagingSpace type to be used for rapid testing.",
    )
    .with_origin([-1.2, -0.6, -2.0])
    .with_grid_spacing([0.2, 0.2, 0.5])
    .with_location("The location targeted by the mock imaging space.")
    .with_reference_frame("The reference frame of the mock volumetric imaging space.")
}

/// A planar segmentation of five 10×10 image masks with `mean` and `max` summary images
pub fn mock_planar_segmentation(imaging_space: Arc<ImagingSpace>) -> Segmentation {
    let mut segmentation = Segmentation::new(
        name_generator("PlanarSegmentation"),
        "A mock instance of a PlanarSegmentation type to be used for rapid testing.",
        imaging_space,
    );
    let shape = (10, 10);
    for i in 0..5 {
        let mut image = Array2::<f64>::zeros(shape);
        image[[i, i]] = 1.0;
        image[[i + 1, i]] = 0.5;
        segmentation
            .add_roi(image, None)
            .expect("mock image masks share a grid");
    }
    for name in ["mean", "max"] {
        segmentation
            .add_summary_image(name, format!("The {name} projection."), Array2::ones(shape))
            .expect("mock summary images are unique and planar");
    }
    segmentation
}

/// A volumetric segmentation of five 10×10×3 image masks with `mean` and `max` summary
/// images
pub fn mock_volumetric_segmentation(imaging_space: Arc<ImagingSpace>) -> Segmentation {
    let mut segmentation = Segmentation::new(
        name_generator("VolumetricSegmentation"),
        "A mock instance of a VolumetricSegmentation type to be used for rapid testing.",
        imaging_space,
    );
    for i in 0..5 {
        let mut image = Array3::<f64>::zeros((10, 10, 3));
        image[[i, i, i % 3]] = 1.0;
        segmentation
            .add_roi(image, None)
            .expect("mock image masks share a grid");
    }
    for name in ["mean", "max"] {
        segmentation
            .add_summary_image(
                name,
                format!("The {name} projection."),
                Array3::ones((10, 10, 3)),
            )
            .expect("mock summary images are unique and volumetric");
    }
    segmentation
}

/// A container of two planar segmentations over the same imaging space
pub fn mock_segmentation_container() -> SegmentationContainer {
    let imaging_space = Arc::new(mock_planar_imaging_space());
    let mut container = SegmentationContainer::new(name_generator("MicroscopySegmentations"));
    for _ in 0..2 {
        container
            .insert(mock_planar_segmentation(imaging_space.clone()))
            .expect("mock segmentation names are unique");
    }
    container
}

/// A planar series of 15 frames of 5×5 ones sampled at 10 Hz
pub fn mock_planar_microscopy_series(imaging_space: Arc<ImagingSpace>) -> MicroscopySeries {
    MicroscopySeries::builder(
        name_generator("PlanarMicroscopySeries"),
        Arc::new(mock_microscope()),
        Arc::new(mock_excitation_light_path()),
        Arc::new(mock_emission_light_path()),
        imaging_space,
    )
    .description("A mock instance of a PlanarMicroscopySeries type to be used for rapid testing.")
    .data(Array3::<f64>::ones((15, 5, 5)))
    .unit(SeriesUnit {
        unit: "a.u.".into(),
        ..Default::default()
    })
    .timing(Timing::Rate {
        starting_time: 0.0,
        rate: 10.0,
    })
    .build()
    .expect("mock series data matches a planar imaging space")
}

/// Like [`mock_planar_microscopy_series`], with depths evenly spaced from 0 to 30 um
pub fn mock_variable_depth_microscopy_series(
    imaging_space: Arc<ImagingSpace>,
) -> MicroscopySeries {
    let frames = 15;
    let depths = (0..frames)
        .map(|i| 30.0 * i as f64 / (frames - 1) as f64)
        .collect();
    MicroscopySeries::builder(
        name_generator("VariableDepthMicroscopySeries"),
        Arc::new(mock_microscope()),
        Arc::new(mock_excitation_light_path()),
        Arc::new(mock_emission_light_path()),
        imaging_space,
    )
    .description(mock_description("VariableDepthMicroscopySeries"))
    .data(Array3::<f64>::ones((frames, 5, 5)))
    .timing(Timing::Rate {
        starting_time: 0.0,
        rate: 10.0,
    })
    .depth_per_frame_in_um(depths)
    .build()
    .expect("mock series depths match its frames")
}

/// A volumetric series of 5 frames of 5×5×3 ones sampled at 10 Hz
pub fn mock_volumetric_microscopy_series(imaging_space: Arc<ImagingSpace>) -> MicroscopySeries {
    MicroscopySeries::builder(
        name_generator("VolumetricMicroscopySeries"),
        Arc::new(mock_microscope()),
        Arc::new(mock_excitation_light_path()),
        Arc::new(mock_emission_light_path()),
        imaging_space,
    )
    .description(mock_description("VolumetricMicroscopySeries"))
    .data(Array4::<f64>::ones((5, 5, 5, 3)))
    .timing(Timing::Rate {
        starting_time: 0.0,
        rate: 10.0,
    })
    .build()
    .expect("mock series data matches a volumetric imaging space")
}

/// A horizontal line scan at 8 kHz
pub fn mock_line_scan() -> IlluminationPattern {
    IlluminationPattern::new(
        name_generator("LineScan"),
        "A mock instance of a LineScan type to be used for rapid testing.",
        IlluminationKind::LineScan(LineScan {
            scan_direction: Some(ScanDirection::Horizontal),
            line_rate_in_hz: Some(8000.0),
            dwell_time_in_s: Some(1e-6),
        }),
    )
    .expect("mock line scan rates are positive")
}

/// A 10×20×7 volume recorded on `channels` channels, each with its own pair of light paths
pub fn mock_multi_channel_microscopy_volume(
    imaging_space: Arc<ImagingSpace>,
    channels: usize,
) -> MultiChannelMicroscopyVolume {
    let mut builder = MultiChannelMicroscopyVolume::builder(
        name_generator("MultiChannelMicroscopyVolume"),
        Arc::new(mock_microscope()),
        imaging_space,
    )
    .description(mock_description("MultiChannelMicroscopyVolume"))
    .data(Array4::<f64>::ones((10, 20, 7, channels)))
    .illumination_pattern(Arc::new(mock_line_scan()));
    for _ in 0..channels {
        builder = builder.add_channel(
            Arc::new(mock_excitation_light_path()),
            Arc::new(mock_emission_light_path()),
        );
    }
    builder
        .build()
        .expect("mock volume has one light path pair per channel")
}

/// Like [`mock_multi_channel_microscopy_volume`], with the 7 planes evenly spaced from 0
/// to 30 um
pub fn mock_variable_depth_multi_channel_microscopy_volume(
    imaging_space: Arc<ImagingSpace>,
    channels: usize,
) -> MultiChannelMicroscopyVolume {
    let planes = 7;
    let depths = (0..planes)
        .map(|i| 30.0 * i as f64 / (planes - 1) as f64)
        .collect();
    let mut builder = MultiChannelMicroscopyVolume::builder(
        name_generator("MultiChannelMicroscopyVolume"),
        Arc::new(mock_microscope()),
        imaging_space,
    )
    .description(mock_description("MultiChannelMicroscopyVolume"))
    .data(Array4::<f64>::ones((10, 20, planes, channels)))
    .depth_per_frame_in_um(depths);
    for _ in 0..channels {
        builder = builder.add_channel(
            Arc::new(mock_excitation_light_path()),
            Arc::new(mock_emission_light_path()),
        );
    }
    builder
        .build()
        .expect("mock volume has one depth per plane")
}

/// A container of `planes` planar series, one per imaging space
pub fn mock_multi_plane_microscopy_container(planes: usize) -> MultiPlaneMicroscopyContainer {
    let mut container =
        MultiPlaneMicroscopyContainer::new(name_generator("MultiPlaneMicroscopyContainer"));
    for _ in 0..planes {
        let series = mock_planar_microscopy_series(Arc::new(mock_planar_imaging_space()));
        container
            .add(series)
            .expect("mock planar series names are unique");
    }
    container
}

/// A response series of 100 frames covering every ROI in `table_region`
pub fn mock_microscopy_response_series(table_region: RoiTableRegion) -> MicroscopyResponseSeries {
    let data = Array2::<f64>::ones((100, table_region.len()));
    MicroscopyResponseSeries::new(
        name_generator("MicroscopyResponseSeries"),
        "A mock instance of a MicroscopyResponseSeries type to be used for rapid testing.",
        data,
        table_region,
        Timing::Rate {
            starting_time: 0.0,
            rate: 10.0,
        },
    )
    .expect("mock response data matches its region")
}
