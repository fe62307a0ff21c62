//! Figure types.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Origin of a figure's primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureSource {
    /// Clustered vector paths
    Vector,
    /// An embedded image
    Raster,
    /// Vector and raster candidates merged together
    Mixed,
}

impl FigureSource {
    /// Source of a candidate that absorbed another one.
    pub fn combine(self, other: FigureSource) -> FigureSource {
        if self == other {
            self
        } else {
            FigureSource::Mixed
        }
    }
}

/// A detected figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Bounding box in page pixels
    pub bbox: Rect,
    /// Provenance of the figure
    pub source: FigureSource,
    /// Indices of contributing vector paths
    pub paths: Vec<usize>,
    /// Indices of contributing raster regions
    pub rasters: Vec<usize>,
    /// Index of the linked caption
    pub caption: Option<usize>,
}

impl Figure {
    /// Figure built from a cluster of vector paths.
    pub fn from_paths(bbox: Rect, paths: Vec<usize>) -> Self {
        Self {
            bbox,
            source: FigureSource::Vector,
            paths,
            rasters: Vec::new(),
            caption: None,
        }
    }

    /// Figure built from one raster region.
    pub fn from_raster(bbox: Rect, raster: usize) -> Self {
        Self {
            bbox,
            source: FigureSource::Raster,
            paths: Vec::new(),
            rasters: vec![raster],
            caption: None,
        }
    }

    /// Absorb another figure: union box, combined primitives and source.
    pub fn absorb(&mut self, other: Figure) {
        self.bbox = self.bbox.merge(&other.bbox);
        self.source = self.source.combine(other.source);
        self.paths.extend(other.paths);
        self.paths.sort_unstable();
        self.paths.dedup();
        self.rasters.extend(other.rasters);
        self.rasters.sort_unstable();
        self.rasters.dedup();
    }
}
