mod components;
mod errors;
mod indexes;
pub mod sensors;
#[cfg(test)]
mod testing;

pub use components::{
    assembly::{assemble, save_scene, Scene, SCENE_FILL_VALUE},
    backends::{
        gdal_backend::{GdalFile, GdalWriter},
        memory_backend::ArraySource,
    },
    band::{normalized_difference, NORMALIZED_DIFFERENCE_EPSILON},
    store::{load_patches, patch_file_name, patch_index, save_patches, scan_patches},
    tiling::{create_patches, cut_patches, grid_shape},
    BandCube, BandFormula, BandIdentifier, GeoReference, NormalizedDifference, PatchCollection,
    PatchFormat, Patches, RasterDataType, RasterSource, RasterWriter, SegmentPatches, StackedSource,
    WriteOptions,
};
pub use errors::{RasterPatchError, Result};
pub use indexes::BandSelection;
