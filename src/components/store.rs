use itertools::Itertools;
use log::{info, warn};
use ndarray_npy::write_npy;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    components::patches::{read_patch, PatchCollection, PatchFormat, Patches},
    errors::{RasterPatchError, Result},
};

pub const PATCH_EXTENSION: &str = "npy";

/// File name of patch `index`: `{base_name}_{band_signature}_{index}.npy`.
pub fn patch_file_name(base_name: &str, format: &PatchFormat, index: usize) -> String {
    format!(
        "{base_name}_{}_{index}.{PATCH_EXTENSION}",
        format.band_signature()
    )
}

/// Patch index encoded in a patch file name: its last `_` separated token.
pub fn patch_index(path: &Path) -> Result<usize> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit('_').next())
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| RasterPatchError::InvalidPatchFileName(path.to_path_buf()))
}

/// Write every patch of `collection` to its own file in `directory`.
///
/// Saving an empty collection writes nothing.
pub fn save_patches(
    collection: &PatchCollection,
    directory: impl AsRef<Path>,
    base_name: &str,
) -> Result<Vec<PathBuf>> {
    if collection.is_empty() {
        warn!("No patches to save");
        return Ok(Vec::new());
    }
    let directory = directory.as_ref();
    fs::create_dir_all(directory)?;
    let paths = collection
        .iter()
        .enumerate()
        .map(|(index, patch)| {
            let path = directory.join(patch_file_name(base_name, collection.format(), index));
            let patch = patch?;
            write_npy(&path, &*patch)?;
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;
    info!("saved {} patches to {directory:?}", paths.len());
    Ok(paths)
}

pub fn scan_patches(directory: impl AsRef<Path>, base_name: &str) -> Result<Vec<PathBuf>> {
    let mut indexed = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        let is_patch = path.is_file()
            && path
                .extension()
                .is_some_and(|extension| extension == PATCH_EXTENSION)
            && path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.contains(base_name));
        if is_patch {
            indexed.push((patch_index(&path)?, path));
        }
    }
    Ok(indexed
        .into_iter()
        .sorted_by_key(|(index, _)| *index)
        .map(|(_, path)| path)
        .collect())
}

/// Collection of the patches saved in `directory` under `base_name`.
///
/// The format is taken as given, it must match the one the patches were saved with.
/// With `in_memory` every patch is read now, otherwise on each access.
pub fn load_patches(
    directory: impl AsRef<Path>,
    format: PatchFormat,
    base_name: &str,
    in_memory: bool,
) -> Result<PatchCollection> {
    let directory = directory.as_ref();
    let paths = scan_patches(directory, base_name)?;
    info!(
        "found {} patches named {base_name:?} in {directory:?}",
        paths.len()
    );
    let patches = if in_memory {
        let arrays = paths
            .par_iter()
            .map(|path| read_patch(path))
            .collect::<Result<Vec<_>>>()?;
        Patches::Cached { paths, arrays }
    } else {
        Patches::OnDisk(paths)
    };
    Ok(PatchCollection::new(format, patches))
}
