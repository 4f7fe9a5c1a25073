//! How excitation light is delivered across the field of view during an acquisition.
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IlluminationPatternError {
    #[error("{attribute} must be positive and finite, got {value}")]
    NotPositive { attribute: &'static str, value: f64 },
    #[error("{attribute} must be finite, got {value}")]
    NotFinite { attribute: &'static str, value: f64 },
    #[error("A random access scan must visit at least one point")]
    NoScanPoints,
    #[error("Invalid scan direction {0:?}, expected one of: horizontal, vertical")]
    InvalidScanDirection(String),
}

impl IlluminationPatternError {
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

fn check_positive(attribute: &'static str, value: f64) -> Result<(), IlluminationPatternError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(IlluminationPatternError::NotPositive { attribute, value })
    }
}

fn check_optional_positive(
    attribute: &'static str,
    value: Option<f64>,
) -> Result<(), IlluminationPatternError> {
    value.map_or(Ok(()), |v| check_positive(attribute, v))
}

/// The axis a line scanner sweeps along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanDirection {
    Horizontal,
    Vertical,
}

impl ScanDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

impl FromStr for ScanDirection {
    type Err = IlluminationPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            _ => Err(IlluminationPatternError::InvalidScanDirection(s.to_string())),
        }
    }
}

impl Display for ScanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point or line swept across the field of view one line at a time
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineScan {
    pub scan_direction: Option<ScanDirection>,
    pub line_rate_in_hz: Option<f64>,
    pub dwell_time_in_s: Option<f64>,
}

/// Whole-plane illumination, as in light-sheet or widefield imaging
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneAcquisition {
    /// Free text, e.g. `"1.2 x 1.2 x 4.0"`
    pub point_spread_function_in_um: Option<String>,
    pub illumination_angle_in_degrees: Option<f64>,
    pub plane_rate_in_hz: Option<f64>,
}

/// Acousto-optic or similar scanning that visits an arbitrary list of points
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RandomAccessScan {
    pub max_scan_points: Option<u64>,
    pub dwell_time_in_s: Option<f64>,
    pub scanning_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IlluminationKind {
    #[default]
    Unspecified,
    LineScan(LineScan),
    PlaneAcquisition(PlaneAcquisition),
    RandomAccessScan(RandomAccessScan),
}

impl IlluminationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "IlluminationPattern",
            Self::LineScan(_) => "LineScan",
            Self::PlaneAcquisition(_) => "PlaneAcquisition",
            Self::RandomAccessScan(_) => "RandomAccessScan",
        }
    }

    fn validate(&self) -> Result<(), IlluminationPatternError> {
        match self {
            Self::Unspecified => Ok(()),
            Self::LineScan(scan) => {
                check_optional_positive("line_rate_in_hz", scan.line_rate_in_hz)?;
                check_optional_positive("dwell_time_in_s", scan.dwell_time_in_s)
            }
            Self::PlaneAcquisition(plane) => {
                if let Some(angle) = plane.illumination_angle_in_degrees {
                    if !angle.is_finite() {
                        return Err(IlluminationPatternError::NotFinite {
                            attribute: "illumination_angle_in_degrees",
                            value: angle,
                        });
                    }
                }
                check_optional_positive("plane_rate_in_hz", plane.plane_rate_in_hz)
            }
            Self::RandomAccessScan(scan) => {
                if scan.max_scan_points == Some(0) {
                    return Err(IlluminationPatternError::NoScanPoints);
                }
                check_optional_positive("dwell_time_in_s", scan.dwell_time_in_s)
            }
        }
    }
}

/**
The illumination strategy used to acquire a series.

```
use microscopy_data::meta::{IlluminationKind, IlluminationPattern, LineScan, ScanDirection};

let pattern = IlluminationPattern::new(
    "resonant",
    "bidirectional resonant scanning",
    IlluminationKind::LineScan(LineScan {
        scan_direction: Some(ScanDirection::Horizontal),
        line_rate_in_hz: Some(8000.0),
        dwell_time_in_s: None,
    }),
)?;
assert_eq!(pattern.kind().as_str(), "LineScan");
# Ok::<(), microscopy_data::meta::IlluminationPatternError>(())
```
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IlluminationPattern {
    name: String,
    description: String,
    kind: IlluminationKind,
}

impl IlluminationPattern {
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        kind: IlluminationKind,
    ) -> Result<Self, IlluminationPatternError> {
        kind.validate()?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &IlluminationKind {
        &self.kind
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scan_direction() {
        assert_eq!("vertical".parse::<ScanDirection>().unwrap(), ScanDirection::Vertical);
        let err = "diagonal".parse::<ScanDirection>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ScanDirection::Horizontal.to_string(), "horizontal");
    }

    #[test]
    fn test_pattern_validation() {
        let pattern = IlluminationPattern::new(
            "sheet",
            "",
            IlluminationKind::PlaneAcquisition(PlaneAcquisition {
                point_spread_function_in_um: Some("1.2 x 1.2 x 4.0".into()),
                illumination_angle_in_degrees: Some(-45.0),
                plane_rate_in_hz: Some(100.0),
            }),
        )
        .unwrap();
        assert_eq!(pattern.kind().as_str(), "PlaneAcquisition");

        let err = IlluminationPattern::new(
            "scan",
            "",
            IlluminationKind::LineScan(LineScan {
                scan_direction: None,
                line_rate_in_hz: Some(0.0),
                dwell_time_in_s: None,
            }),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IlluminationPatternError::NotPositive {
                attribute: "line_rate_in_hz",
                value: 0.0
            }
        );

        let err = IlluminationPattern::new(
            "sheet",
            "",
            IlluminationKind::PlaneAcquisition(PlaneAcquisition {
                point_spread_function_in_um: None,
                illumination_angle_in_degrees: Some(f64::NAN),
                plane_rate_in_hz: None,
            }),
        )
        .unwrap_err();
        assert!(matches!(err, IlluminationPatternError::NotFinite { .. }));

        let err = IlluminationPattern::new(
            "aod",
            "",
            IlluminationKind::RandomAccessScan(RandomAccessScan {
                max_scan_points: Some(0),
                dwell_time_in_s: Some(1e-6),
                scanning_pattern: "spiral".into(),
            }),
        )
        .unwrap_err();
        assert_eq!(err, IlluminationPatternError::NoScanPoints);

        let pattern = IlluminationPattern::new("default", "", IlluminationKind::default()).unwrap();
        assert_eq!(pattern.kind(), &IlluminationKind::Unspecified);
    }
}
