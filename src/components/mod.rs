pub mod assembly;
pub mod backends;
pub mod band;
pub mod cube;
pub mod patches;
pub mod segment;
pub mod source;
pub mod store;
pub mod tiling;

pub use band::{BandFormula, BandIdentifier, NormalizedDifference};
pub use cube::BandCube;
pub use patches::{PatchCollection, PatchFormat, Patches};
pub use segment::SegmentPatches;
pub use source::{
    GeoReference, RasterDataType, RasterSource, RasterWriter, StackedSource, WriteOptions,
};
