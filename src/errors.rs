use std::path::PathBuf;

use crate::components::BandIdentifier;

pub type Result<T> = std::result::Result<T, RasterPatchError>;

#[derive(thiserror::Error, Debug)]
pub enum RasterPatchError {
    #[error("Band {0} not available")]
    BandUnavailable(BandIdentifier),
    #[error("Can not stack an empty set of bands")]
    EmptyBandSet,
    #[error("Invalid tiling of a {height}x{width} cube with size {size} and shift {shift}")]
    InvalidTiling {
        height: usize,
        width: usize,
        size: usize,
        shift: usize,
    },
    #[error("Invalid patch format: size {size} and shift {shift}, expected 0 < shift <= size")]
    InvalidPatchFormat { size: usize, shift: usize },
    #[error("Patch {index} not found, collection has {len} patches")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No patches to assemble")]
    EmptyCollection,
    #[error("Can not assemble {len} patches: {reason}")]
    AssemblyShapeError { len: usize, reason: String },
    #[error("Arrays with shapes {0:?} and {1:?} do not match")]
    ShapeMismatch(Vec<usize>, Vec<usize>),
    #[error("Cube shape is unknown, set one or bind a raster source")]
    UnknownShape,
    #[error("No raster source bound")]
    NoRasterSource,
    #[error("{images} image patches but {labels} label patches")]
    PairLengthMismatch { images: usize, labels: usize },
    #[error("Patch file name {0:?} does not end with an index")]
    InvalidPatchFileName(PathBuf),
    #[error(transparent)]
    RasterAccessFailure(#[from] gdal::errors::GdalError),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
    #[error(transparent)]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    #[error(transparent)]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
