use crate::{components::BandCube, errors::Result};

use super::Sensor;

/// Sentinel-2 surface reflectance stacks, THEIA band order.
#[derive(Debug)]
pub struct Sentinel2;

impl Sensor for Sentinel2 {
    const NAME: &'static str = "Sentinel2";
    const BAND_NAMES: &'static [&'static str] = &[
        "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B11", "B12",
    ];
    const REFLECTANCE_SCALE: f64 = 1e-4;
}

impl Sentinel2 {
    /// Register the water indices `ndwi` (B3, B8) and `mndwi` (B3, B11).
    pub fn register_indices(cube: &mut BandCube) -> Result<()> {
        let (green, nir, swir) = (Self::band("B3")?, Self::band("B8")?, Self::band("B11")?);
        cube.register_normalized_difference("ndwi", green.clone(), nir);
        cube.register_normalized_difference("mndwi", green, swir);
        Ok(())
    }
}
