use ndarray::{ArrayD, Axis, Ix2, Ix3};
use ndarray_npy::read_npy;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use crate::{
    components::BandIdentifier,
    errors::{RasterPatchError, Result},
    BandSelection,
};

/// Layout shared by every patch of a [PatchCollection].
///
/// Patches are `size` x `size` crops taken every `shift` pixels.
/// Single band patches are 2-D, multi band patches are 3-D
/// with channels on the first axis if `channels_first`, on the last otherwise.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PatchFormat {
    bands: Vec<BandIdentifier>,
    size: usize,
    shift: usize,
    channels_first: bool,
}

impl PatchFormat {
    pub fn new(
        bands: impl Into<BandSelection>,
        size: usize,
        shift: usize,
        channels_first: bool,
    ) -> Result<Self> {
        let bands = bands.into().resolve(&[]);
        if bands.is_empty() {
            return Err(RasterPatchError::EmptyBandSet);
        }
        if size == 0 || shift == 0 || shift > size {
            return Err(RasterPatchError::InvalidPatchFormat { size, shift });
        }
        Ok(Self {
            bands,
            size,
            shift,
            channels_first,
        })
    }

    pub fn bands(&self) -> &[BandIdentifier] {
        &self.bands
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shift(&self) -> usize {
        self.shift
    }

    pub fn channels_first(&self) -> bool {
        self.channels_first
    }

    /// Band identifiers concatenated in format order, e.g. `"012"` or `"ndwi"`.
    pub fn band_signature(&self) -> String {
        self.bands.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone)]
pub enum Patches {
    /// Patches created in memory, not saved yet.
    InMemory(Vec<ArrayD<f64>>),
    /// Patch files, read on every access.
    OnDisk(Vec<PathBuf>),
    Cached {
        paths: Vec<PathBuf>,
        arrays: Vec<ArrayD<f64>>,
    },
}

impl Patches {
    pub fn len(&self) -> usize {
        match self {
            Patches::InMemory(arrays) => arrays.len(),
            Patches::OnDisk(paths) => paths.len(),
            Patches::Cached { paths, arrays } => paths.len().max(arrays.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_memory_len(&self) -> usize {
        match self {
            Patches::InMemory(arrays) | Patches::Cached { arrays, .. } => arrays.len(),
            Patches::OnDisk(_) => 0,
        }
    }
}

/// Ordered patches sharing one [PatchFormat].
///
/// Index `i` always refers to the same tile, in row-major scan order.
#[derive(Debug, Clone)]
pub struct PatchCollection {
    format: PatchFormat,
    patches: Patches,
}

impl PatchCollection {
    pub fn new(format: PatchFormat, patches: Patches) -> Self {
        Self { format, patches }
    }

    pub fn empty(format: PatchFormat) -> Self {
        Self::new(format, Patches::InMemory(Vec::new()))
    }

    pub fn format(&self) -> &PatchFormat {
        &self.format
    }

    pub fn patches(&self) -> &Patches {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Patch `index`, borrowed when in memory, read from its file otherwise.
    pub fn get(&self, index: usize) -> Result<Cow<'_, ArrayD<f64>>> {
        let len = self.len();
        if index >= len {
            return Err(RasterPatchError::IndexOutOfRange { index, len });
        }
        match &self.patches {
            Patches::InMemory(arrays) => Ok(Cow::Borrowed(&arrays[index])),
            Patches::Cached { paths, arrays } => match arrays.get(index) {
                Some(array) => Ok(Cow::Borrowed(array)),
                None => read_patch(&paths[index]).map(Cow::Owned),
            },
            Patches::OnDisk(paths) => read_patch(&paths[index]).map(Cow::Owned),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Cow<'_, ArrayD<f64>>>> + '_ {
        (0..self.len()).map(|index| self.get(index))
    }

    pub fn patch_path(&self, index: usize) -> Option<&Path> {
        match &self.patches {
            Patches::OnDisk(paths) | Patches::Cached { paths, .. } => {
                paths.get(index).map(PathBuf::as_path)
            }
            Patches::InMemory(_) => None,
        }
    }

    /// Drop patches held in memory. File backed patches stay reachable.
    pub fn clear(&mut self) {
        self.patches = match std::mem::replace(&mut self.patches, Patches::InMemory(Vec::new())) {
            Patches::Cached { paths, .. } | Patches::OnDisk(paths) => Patches::OnDisk(paths),
            Patches::InMemory(_) => Patches::InMemory(Vec::new()),
        };
    }

    pub fn patch_height(&self) -> Result<usize> {
        self.patch_dims().map(|(height, _, _)| height)
    }

    pub fn patch_width(&self) -> Result<usize> {
        self.patch_dims().map(|(_, width, _)| width)
    }

    pub fn num_channels(&self) -> Result<usize> {
        self.patch_dims().map(|(_, _, channels)| channels)
    }

    fn patch_dims(&self) -> Result<(usize, usize, usize)> {
        if self.is_empty() {
            return Err(RasterPatchError::EmptyCollection);
        }
        let first = self.get(0)?;
        patch_dims(&first, self.format.channels_first)
    }

    /// Patch `index` ready for display.
    ///
    /// Channels last, first three channels (or the first one when fewer),
    /// negative values set to 0, multiplied by `bright`, clipped to 1.
    pub fn visual_patch(&self, index: usize, bright: f64) -> Result<ArrayD<f64>> {
        let patch = self.get(index)?;
        let visual = match patch.ndim() {
            2 => patch.into_owned(),
            _ => {
                let patch = channels_last(patch.view(), self.format.channels_first)?;
                if patch.len_of(Axis(2)) >= 3 {
                    patch.slice(ndarray::s![.., .., ..3]).into_owned().into_dyn()
                } else {
                    patch.index_axis(Axis(2), 0).into_owned().into_dyn()
                }
            }
        };
        Ok(visual.mapv(|value| (value.max(0.) * bright).min(1.)))
    }
}

pub(crate) fn read_patch(path: &Path) -> Result<ArrayD<f64>> {
    Ok(read_npy(path)?)
}

pub(crate) fn channels_last(
    patch: ndarray::ArrayViewD<'_, f64>,
    channels_first: bool,
) -> Result<ndarray::ArrayView3<'_, f64>> {
    let patch = patch.into_dimensionality::<Ix3>()?;
    Ok(if channels_first {
        patch.permuted_axes([1, 2, 0])
    } else {
        patch
    })
}

/// (height, width, channels) of a 2-D or 3-D patch.
pub(crate) fn patch_dims(patch: &ArrayD<f64>, channels_first: bool) -> Result<(usize, usize, usize)> {
    match patch.ndim() {
        2 => {
            let (height, width) = patch.view().into_dimensionality::<Ix2>()?.dim();
            Ok((height, width, 1))
        }
        _ => Ok(channels_last(patch.view(), channels_first)?.dim()),
    }
}
