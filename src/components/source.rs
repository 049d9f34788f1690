use geo::AffineTransform;
use itertools::Itertools;
use ndarray::{Array2, ArrayView3};
use std::{fmt::Debug, path::Path, sync::Arc};

use crate::errors::{RasterPatchError, Result};

/// Georeferencing of a raster: pixel to world transform and projection (WKT).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    pub transform: AffineTransform,
    pub projection: String,
}

impl Default for GeoReference {
    fn default() -> Self {
        Self {
            transform: AffineTransform::identity(),
            projection: String::new(),
        }
    }
}

/// Raster access collaborator.
///
/// Shapes are `(height, width)`, native band indexes are zero based.
pub trait RasterSource: Debug + Send + Sync {
    fn native_shape(&self) -> (usize, usize);
    fn num_bands(&self) -> usize;
    /// Read native band `band` resampled to `shape`.
    fn resample(&self, band: usize, shape: (usize, usize)) -> Result<Array2<f64>>;
    fn georeference(&self) -> Result<GeoReference>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub enum RasterDataType {
    UInt8,
    UInt16,
    Int16,
    Int32,
    #[default]
    Float32,
    Float64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct WriteOptions {
    pub nodata: f64,
    pub data_type: RasterDataType,
    pub compression: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            nodata: 0.,
            data_type: RasterDataType::Float32,
            compression: Some("PACKBITS".into()),
        }
    }
}

pub trait RasterWriter {
    /// Write `bands` (C, H, W) as a `C` band raster.
    fn write_raster(
        &self,
        path: &Path,
        bands: ArrayView3<f64>,
        georeference: &GeoReference,
        options: &WriteOptions,
    ) -> Result<()>;
}

/// Several sources exposed as one list of native bands.
///
/// Bands keep the order of the sources and their order within each source.
/// Shape and georeference are those of the first source.
#[derive(Debug)]
pub struct StackedSource {
    sources: Vec<Arc<dyn RasterSource>>,
}

impl StackedSource {
    pub fn new(sources: Vec<Arc<dyn RasterSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(RasterPatchError::NoRasterSource);
        }
        Ok(Self { sources })
    }

    pub fn layout(&self) -> Vec<usize> {
        self.sources.iter().map(|source| source.num_bands()).collect_vec()
    }

    fn locate(&self, band: usize) -> Option<(&Arc<dyn RasterSource>, usize)> {
        let mut offset = 0;
        self.sources
            .iter()
            .find_map(|source| {
                let local = band.checked_sub(offset).filter(|local| *local < source.num_bands());
                offset += source.num_bands();
                local.map(|local| (source, local))
            })
    }
}

impl RasterSource for StackedSource {
    fn native_shape(&self) -> (usize, usize) {
        self.sources[0].native_shape()
    }

    fn num_bands(&self) -> usize {
        self.sources.iter().map(|source| source.num_bands()).sum()
    }

    fn resample(&self, band: usize, shape: (usize, usize)) -> Result<Array2<f64>> {
        let (source, local) = self
            .locate(band)
            .ok_or(RasterPatchError::BandUnavailable(band.into()))?;
        source.resample(local, shape)
    }

    fn georeference(&self) -> Result<GeoReference> {
        self.sources[0].georeference()
    }
}
