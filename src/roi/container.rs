#[cfg(feature = "serde")]
use std::io::prelude::*;
use std::sync::Arc;

use indexmap::map::{Iter, Keys, Values};
use indexmap::IndexMap;
use thiserror::Error;

use super::segmentation::Segmentation;
use crate::error::ErrorKind;
use crate::meta::ImagingSpace;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SegmentationContainerError {
    #[error("A segmentation named {0:?} already exists")]
    DuplicateName(String),
}

impl SegmentationContainerError {
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::DuplicateKey
    }
}

/**
An insertion-ordered collection of [`Segmentation`]s keyed by name, typically one per
imaging plane, depth or channel.

A wrapper around [`indexmap::IndexMap`].
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SegmentationContainerRecord"))]
pub struct SegmentationContainer {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(with = "indexmap::map::serde_seq"))]
    segmentations: IndexMap<String, Segmentation>,
}

impl Default for SegmentationContainer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}

impl SegmentationContainer {
    pub const DEFAULT_NAME: &'static str = "MicroscopySegmentations";
    pub const DEFAULT_SEGMENTATION_NAME: &'static str = "PlaneSegmentation";

    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            segmentations: IndexMap::new(),
        }
    }

    /// Create an empty segmentation of `imaging_space` and store it.
    ///
    /// The description defaults to the imaging space's description. The name defaults to
    /// the first free one of `PlaneSegmentation`, `PlaneSegmentation2`, `PlaneSegmentation3`
    /// and so on.
    pub fn add_segmentation(
        &mut self,
        imaging_space: Arc<ImagingSpace>,
        description: Option<&str>,
        name: Option<&str>,
    ) -> Result<&mut Segmentation, SegmentationContainerError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.next_default_name(),
        };
        if self.segmentations.contains_key(&name) {
            return Err(SegmentationContainerError::DuplicateName(name));
        }
        let description = description
            .map(|s| s.to_string())
            .unwrap_or_else(|| imaging_space.description.clone());
        log::debug!("Creating segmentation {name} of {}", imaging_space.name);
        let segmentation = Segmentation::new(name.clone(), description, imaging_space);
        Ok(self.segmentations.entry(name).or_insert(segmentation))
    }

    fn next_default_name(&self) -> String {
        let base = Self::DEFAULT_SEGMENTATION_NAME;
        if !self.segmentations.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{base}{i}"))
            .find(|name| !self.segmentations.contains_key(name))
            .unwrap_or_else(|| base.to_string())
    }

    /// Store a segmentation that was built elsewhere
    pub fn insert(&mut self, segmentation: Segmentation) -> Result<(), SegmentationContainerError> {
        let name = segmentation.name().to_string();
        if self.segmentations.contains_key(&name) {
            return Err(SegmentationContainerError::DuplicateName(name));
        }
        self.segmentations.insert(name, segmentation);
        Ok(())
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Segmentation> {
        self.segmentations.get(name)
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Segmentation> {
        self.segmentations.get_mut(name)
    }

    /// Get the segmentation at position `index` in insertion order
    pub fn get_index(&self, index: usize) -> Option<&Segmentation> {
        self.segmentations.get_index(index).map(|(_, seg)| seg)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.segmentations.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segmentations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segmentations.is_empty()
    }

    pub fn names(&self) -> Keys<'_, String, Segmentation> {
        self.segmentations.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, Segmentation> {
        self.segmentations.iter()
    }

    pub fn segmentations(&self) -> Values<'_, String, Segmentation> {
        self.segmentations.values()
    }

    #[cfg(feature = "serde")]
    /// Write the container out in JSON format to `writer`
    pub fn to_writer<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    #[cfg(feature = "serde")]
    /// Read a container in JSON format from `reader`
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

/// The stored form of a [`SegmentationContainer`]. Entries are re-inserted by their own
/// name on load, so a repeated name is an error instead of an overwrite.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SegmentationContainerRecord {
    name: String,
    segmentations: Vec<(String, Segmentation)>,
}

#[cfg(feature = "serde")]
impl TryFrom<SegmentationContainerRecord> for SegmentationContainer {
    type Error = SegmentationContainerError;

    fn try_from(value: SegmentationContainerRecord) -> Result<Self, Self::Error> {
        let mut container = Self::new(value.name);
        for (_, segmentation) in value.segmentations {
            container.insert(segmentation)?;
        }
        Ok(container)
    }
}

impl<'a> IntoIterator for &'a SegmentationContainer {
    type Item = (&'a String, &'a Segmentation);
    type IntoIter = Iter<'a, String, Segmentation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
