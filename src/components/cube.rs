use log::{debug, info};
use ndarray::{Array2, Array3, Axis};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    sync::Arc,
};

use crate::{
    components::{
        band::{normalized_difference, BandFormula, BandIdentifier, NormalizedDifference},
        source::{GeoReference, RasterSource},
    },
    errors::{RasterPatchError, Result},
    BandSelection,
};

type Slot = Arc<Mutex<Option<Arc<Array2<f64>>>>>;

/// Lazily evaluated collection of raw and derived bands at one shape.
///
/// Raw bands are resampled from the bound [RasterSource] to [BandCube::shape],
/// derived bands are computed by their registered [BandFormula].
/// Every band is materialized at most once per shape:
/// each band owns a slot that is locked while the band is computed,
/// so concurrent first accesses to one band wait for a single evaluation.
/// Formulas must not depend on themselves, directly or not.
pub struct BandCube {
    source: Option<Arc<dyn RasterSource>>,
    shape: Option<(usize, usize)>,
    scale: f64,
    formulas: BTreeMap<BandIdentifier, Arc<dyn BandFormula>>,
    loaded: Mutex<HashMap<BandIdentifier, Slot>>,
}

impl Debug for BandCube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let f = &mut f.debug_struct("BandCube");
        let formulas: Vec<String> = self.formulas.keys().map(ToString::to_string).collect();
        f.field("source", &self.source)
            .field("shape", &self.shape)
            .field("scale", &self.scale)
            .field("formulas", &formulas)
            .field("loaded", &self.loaded_bands())
            .finish()
    }
}

impl BandCube {
    pub fn new(source: Arc<dyn RasterSource>) -> Self {
        let cube = Self {
            source: Some(source),
            ..Self::empty()
        };
        info!("new {cube:?}");
        cube
    }

    pub fn empty() -> Self {
        Self {
            source: None,
            shape: None,
            scale: 1.,
            formulas: BTreeMap::new(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Factor applied to raw bands when read from the source.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self.clear();
        self
    }

    pub fn with_shape(mut self, shape: (usize, usize)) -> Self {
        self.reshape(shape);
        self
    }

    pub fn source(&self) -> Option<&Arc<dyn RasterSource>> {
        self.source.as_ref()
    }

    pub fn georeference(&self) -> Result<GeoReference> {
        self.source
            .as_ref()
            .ok_or(RasterPatchError::NoRasterSource)?
            .georeference()
    }

    /// Explicit shape if set, native shape of the source otherwise.
    pub fn shape(&self) -> Result<(usize, usize)> {
        self.shape
            .or_else(|| self.source.as_ref().map(|source| source.native_shape()))
            .ok_or(RasterPatchError::UnknownShape)
    }

    pub fn reshape(&mut self, shape: (usize, usize)) {
        self.shape = Some(shape);
        self.clear();
    }

    /// Fall back to the source native shape and drop every memoized band.
    pub fn reset_shape(&mut self) {
        self.shape = None;
        self.clear();
    }

    /// Drop every memoized band, formulas are kept.
    pub fn clear(&mut self) {
        self.loaded.get_mut().clear();
    }

    pub fn num_native_bands(&self) -> usize {
        self.source
            .as_ref()
            .map_or(0, |source| source.num_bands())
    }

    pub fn available(&self) -> Vec<BandIdentifier> {
        (0..self.num_native_bands())
            .map(BandIdentifier::Native)
            .filter(|band| !self.formulas.contains_key(band))
            .chain(self.formulas.keys().cloned())
            .collect()
    }

    pub fn is_available(&self, band: &BandIdentifier) -> bool {
        self.formulas.contains_key(band)
            || matches!(band, BandIdentifier::Native(index) if *index < self.num_native_bands())
    }

    /// Bands currently memoized. Bands being computed are skipped.
    pub fn loaded_bands(&self) -> Vec<BandIdentifier> {
        let loaded = self.loaded.lock();
        let mut bands: Vec<BandIdentifier> = loaded
            .iter()
            .filter(|(_, slot)| slot.try_lock().is_some_and(|guard| guard.is_some()))
            .map(|(band, _)| band.clone())
            .collect();
        bands.sort();
        bands
    }

    /// Install or replace the formula of `band`. Nothing is evaluated.
    pub fn register_formula(
        &mut self,
        band: impl Into<BandIdentifier>,
        formula: impl BandFormula + 'static,
    ) {
        let band = band.into();
        self.loaded.get_mut().remove(&band);
        self.formulas.insert(band, Arc::new(formula));
    }

    pub fn register_normalized_difference(
        &mut self,
        name: impl Into<BandIdentifier>,
        b1: impl Into<BandIdentifier>,
        b2: impl Into<BandIdentifier>,
    ) {
        self.register_formula(name, NormalizedDifference::new(b1, b2))
    }

    /// Band at the current shape, materialized on first access.
    pub fn get(&self, band: &BandIdentifier) -> Result<Arc<Array2<f64>>> {
        if !self.is_available(band) {
            return Err(RasterPatchError::BandUnavailable(band.clone()));
        }
        let slot = Arc::clone(self.loaded.lock().entry(band.clone()).or_default());
        let mut guard = slot.lock();
        if let Some(array) = guard.as_ref() {
            return Ok(Arc::clone(array));
        }
        let array = Arc::new(self.materialize(band)?);
        *guard = Some(Arc::clone(&array));
        Ok(array)
    }

    fn materialize(&self, band: &BandIdentifier) -> Result<Array2<f64>> {
        if let Some(formula) = self.formulas.get(band) {
            debug!("evaluating formula of band {band}");
            return formula.evaluate(self);
        }
        let BandIdentifier::Native(index) = band else {
            return Err(RasterPatchError::BandUnavailable(band.clone()));
        };
        let source = self.source.as_ref().ok_or(RasterPatchError::NoRasterSource)?;
        let shape = self.shape()?;
        debug!("reading band {band} at {shape:?}");
        let mut array = source.resample(*index, shape)?;
        if array.dim() != shape {
            return Err(RasterPatchError::ShapeMismatch(
                array.shape().to_vec(),
                vec![shape.0, shape.1],
            ));
        }
        if self.scale != 1. {
            let scale = self.scale;
            array.mapv_inplace(|value| value * scale);
        }
        Ok(array)
    }

    pub fn normalized_difference(
        &self,
        b1: &BandIdentifier,
        b2: &BandIdentifier,
    ) -> Result<Array2<f64>> {
        let b1 = self.get(b1)?;
        let b2 = self.get(b2)?;
        normalized_difference(b1.view(), b2.view())
    }

    pub fn as_list(&self, bands: impl Into<BandSelection>) -> Result<Vec<Arc<Array2<f64>>>> {
        let bands = bands.into().resolve(&self.available());
        bands.par_iter().map(|band| self.get(band)).collect()
    }

    /// Stack the selected bands along a new first (`channels_first`) or last axis.
    pub fn as_stack(
        &self,
        bands: impl Into<BandSelection>,
        channels_first: bool,
    ) -> Result<Array3<f64>> {
        let arrays = self.as_list(bands)?;
        if arrays.is_empty() {
            return Err(RasterPatchError::EmptyBandSet);
        }
        let views: Vec<_> = arrays.iter().map(|array| array.view()).collect();
        let axis = if channels_first { Axis(0) } else { Axis(2) };
        Ok(ndarray::stack(axis, &views)?)
    }
}
