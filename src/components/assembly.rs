use log::info;
use ndarray::{s, Array3, ArrayD, ArrayView3, Axis, Ix2, Ix3};
use num::integer::Roots;
use shrinkwraprs::Shrinkwrap;
use std::path::Path;

use crate::{
    components::{
        patches::{channels_last, patch_dims, PatchCollection},
        source::{RasterSource, RasterWriter, WriteOptions},
    },
    errors::{RasterPatchError, Result},
};

/// Value of scene pixels no patch was written to.
pub const SCENE_FILL_VALUE: f64 = 1.;

/// Scene rebuilt from a square grid of patches.
///
/// 2-D for single channel patches, 3-D with the channel axis
/// placed as in the patch format otherwise.
#[derive(Shrinkwrap, Debug, Clone, PartialEq)]
pub struct Scene {
    #[shrinkwrap(main_field)]
    data: ArrayD<f64>,
    channels_first: bool,
}

impl Scene {
    pub fn into_inner(self) -> ArrayD<f64> {
        self.data
    }

    pub fn channels_first(&self) -> bool {
        self.channels_first
    }

    pub fn bands(&self) -> Result<ArrayView3<'_, f64>> {
        Ok(match self.data.ndim() {
            2 => self
                .data
                .view()
                .into_dimensionality::<Ix2>()?
                .insert_axis(Axis(0)),
            _ if self.channels_first => self.data.view().into_dimensionality::<Ix3>()?,
            _ => self
                .data
                .view()
                .into_dimensionality::<Ix3>()?
                .permuted_axes([2, 0, 1]),
        })
    }
}

/// Rebuild the scene tiled into `collection`.
///
/// The collection must hold a square grid of patches.
/// Patches are placed in scan order every `shift` pixels,
/// later patches overwrite earlier ones where they overlap.
pub fn assemble(collection: &PatchCollection) -> Result<Scene> {
    let len = collection.len();
    if len == 0 {
        return Err(RasterPatchError::EmptyCollection);
    }
    let patches_per_row = len.sqrt();
    if patches_per_row * patches_per_row != len {
        return Err(RasterPatchError::AssemblyShapeError {
            len,
            reason: "patches do not form a square grid".into(),
        });
    }
    let format = collection.format();
    let channels_first = format.channels_first();
    let shift = format.shift();
    let first = collection.get(0)?;
    let (height, width, channels) = patch_dims(&first, channels_first)?;
    if height != format.size() || width != format.size() {
        return Err(RasterPatchError::AssemblyShapeError {
            len,
            reason: format!(
                "patches are {height}x{width}, format declares size {}",
                format.size()
            ),
        });
    }

    let mut scene = Array3::from_elem(
        (height * patches_per_row, width * patches_per_row, channels),
        SCENE_FILL_VALUE,
    );
    info!("Creating image shape {:?}", scene.dim());

    let patches = std::iter::once(Ok(first)).chain((1..len).map(|index| collection.get(index)));
    let (mut row, mut col) = (0, 0);
    for (index, patch) in patches.enumerate() {
        let patch = patch?;
        if index > 0 && index % patches_per_row == 0 {
            row += shift;
            col = 0;
        }
        let patch = match patch.ndim() {
            2 => patch.view().into_dimensionality::<Ix2>()?.insert_axis(Axis(2)),
            _ => channels_last(patch.view(), channels_first)?,
        };
        if patch.dim() != (height, width, channels) {
            return Err(RasterPatchError::AssemblyShapeError {
                len,
                reason: format!(
                    "patch {index} has shape {:?}, expected {:?}",
                    patch.dim(),
                    (height, width, channels)
                ),
            });
        }
        scene
            .slice_mut(s![row..row + height, col..col + width, ..])
            .assign(&patch);
        col += shift;
    }

    let data = if channels == 1 {
        scene.index_axis_move(Axis(2), 0).into_dyn()
    } else if channels_first {
        scene.permuted_axes([2, 0, 1]).as_standard_layout().into_owned().into_dyn()
    } else {
        scene.into_dyn()
    };
    Ok(Scene {
        data,
        channels_first,
    })
}

/// Assemble `collection` and write it to `path`,
/// georeferenced as `source`, one raster band per channel.
pub fn save_scene(
    collection: &PatchCollection,
    source: &dyn RasterSource,
    writer: &dyn RasterWriter,
    path: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<Scene> {
    let scene = assemble(collection)?;
    let georeference = source.georeference()?;
    writer.write_raster(path.as_ref(), scene.bands()?, &georeference, options)?;
    Ok(scene)
}
