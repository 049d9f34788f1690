use ndarray::{Array2, Array3, Axis};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    components::{
        backends::memory_backend::ArraySource,
        source::{GeoReference, RasterSource},
        BandCube, BandFormula,
    },
    errors::Result,
};

/// In memory source counting resample calls per band.
#[derive(Debug)]
pub struct CountingSource {
    data: Array3<f64>,
    inner: ArraySource,
    reads: Vec<AtomicUsize>,
}

impl CountingSource {
    pub fn new(data: Array3<f64>) -> Self {
        let reads = (0..data.len_of(Axis(0))).map(|_| AtomicUsize::new(0)).collect();
        Self {
            inner: ArraySource::new(data.clone()),
            data,
            reads,
        }
    }

    /// Strictly positive, pairwise distinct values `band * 1000 + y * width + x + 1`.
    pub fn ramp(num_bands: usize, shape: (usize, usize)) -> Self {
        Self::new(Array3::from_shape_fn(
            (num_bands, shape.0, shape.1),
            |(band, y, x)| (band * 1000 + y * shape.1 + x + 1) as f64,
        ))
    }

    pub fn band(&self, band: usize) -> Array2<f64> {
        self.data.index_axis(Axis(0), band).to_owned()
    }

    pub fn reads(&self, band: usize) -> usize {
        self.reads[band].load(Ordering::SeqCst)
    }
}

impl RasterSource for CountingSource {
    fn native_shape(&self) -> (usize, usize) {
        self.inner.native_shape()
    }

    fn num_bands(&self) -> usize {
        self.inner.num_bands()
    }

    fn resample(&self, band: usize, shape: (usize, usize)) -> Result<Array2<f64>> {
        if let Some(reads) = self.reads.get(band) {
            reads.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.resample(band, shape)
    }

    fn georeference(&self) -> Result<GeoReference> {
        self.inner.georeference()
    }
}

pub fn counting_formula(
    formula: impl BandFormula + 'static,
) -> (impl BandFormula + 'static, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let counted = move |cube: &BandCube| -> Result<Array2<f64>> {
        counter.fetch_add(1, Ordering::SeqCst);
        formula.evaluate(cube)
    };
    (counted, calls)
}

pub fn ramp_cube(num_bands: usize, shape: (usize, usize)) -> (BandCube, Arc<CountingSource>) {
    let source = Arc::new(CountingSource::ramp(num_bands, shape));
    let cube = BandCube::new(Arc::clone(&source) as Arc<dyn RasterSource>);
    (cube, source)
}
