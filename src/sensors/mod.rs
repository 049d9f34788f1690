use log::{info, warn};
use std::{fmt::Debug, path::Path, sync::Arc};

mod sentinel2;
pub use sentinel2::Sentinel2;

use crate::{
    components::{backends::gdal_backend::GdalFile, BandCube, BandIdentifier, RasterSource},
    errors::{RasterPatchError, Result},
};

/// Band layout of the products of one sensor.
pub trait Sensor: Debug {
    const NAME: &'static str;
    const BAND_NAMES: &'static [&'static str];
    /// Factor from stored digital numbers to reflectance.
    const REFLECTANCE_SCALE: f64;

    fn band(name: &str) -> Result<BandIdentifier> {
        Self::BAND_NAMES
            .iter()
            .position(|band| band.eq_ignore_ascii_case(name))
            .map(BandIdentifier::Native)
            .ok_or_else(|| RasterPatchError::BandUnavailable(name.into()))
    }

    /// Cube over a product of this sensor, read as reflectance.
    fn cube(source: Arc<dyn RasterSource>) -> BandCube {
        if source.num_bands() != Self::BAND_NAMES.len() {
            warn!(
                "{} products have {} bands, source has {}",
                Self::NAME,
                Self::BAND_NAMES.len(),
                source.num_bands()
            );
        }
        BandCube::new(source).with_scale(Self::REFLECTANCE_SCALE)
    }

    fn open<P: AsRef<Path>>(path: P) -> Result<BandCube> {
        info!("opening {} product {:?}", Self::NAME, path.as_ref());
        Ok(Self::cube(Arc::new(GdalFile::open(path)?)))
    }
}
