use log::info;
use std::{borrow::Cow, path::Path};

use ndarray::ArrayD;

use crate::{
    components::{
        cube::BandCube,
        patches::{PatchCollection, PatchFormat},
        store::{load_patches, save_patches},
        tiling::create_patches,
    },
    errors::{RasterPatchError, Result},
    BandSelection,
};

pub const IMAGES_DIRECTORY: &str = "Images";
pub const LABELS_DIRECTORY: &str = "Labels";
/// Band of the label raster holding the segmentation classes.
pub const LABEL_BAND: usize = 0;

/// Image patches paired index by index with label patches of the same tiles.
#[derive(Debug, Clone)]
pub struct SegmentPatches {
    image: PatchCollection,
    label: PatchCollection,
}

impl SegmentPatches {
    pub fn new(image: PatchCollection, label: PatchCollection) -> Result<Self> {
        if image.len() != label.len() {
            return Err(RasterPatchError::PairLengthMismatch {
                images: image.len(),
                labels: label.len(),
            });
        }
        Ok(Self { image, label })
    }

    /// Tile `image` and the label band of `label` with the same grid,
    /// saving them under `directory/Images` and `directory/Labels`.
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        image: &BandCube,
        label: &BandCube,
        bands: impl Into<BandSelection>,
        directory: impl AsRef<Path>,
        base_name: &str,
        size: usize,
        shift: usize,
        channels_first: bool,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        let pair = Self::new(
            create_patches(image, bands, size, shift, channels_first)?,
            create_patches(label, LABEL_BAND, size, shift, channels_first)?,
        )?;
        save_patches(&pair.image, directory.join(IMAGES_DIRECTORY), base_name)?;
        save_patches(&pair.label, directory.join(LABELS_DIRECTORY), base_name)?;
        info!("generated {} image/label pairs in {directory:?}", pair.len());
        Ok(pair)
    }

    pub fn load(
        directory: impl AsRef<Path>,
        format: PatchFormat,
        base_name: &str,
        in_memory: bool,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        let label_format = PatchFormat::new(
            LABEL_BAND,
            format.size(),
            format.shift(),
            format.channels_first(),
        )?;
        Self::new(
            load_patches(directory.join(IMAGES_DIRECTORY), format, base_name, in_memory)?,
            load_patches(
                directory.join(LABELS_DIRECTORY),
                label_format,
                base_name,
                in_memory,
            )?,
        )
    }

    pub fn image(&self) -> &PatchCollection {
        &self.image
    }

    pub fn label(&self) -> &PatchCollection {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<(Cow<'_, ArrayD<f64>>, Cow<'_, ArrayD<f64>>)> {
        Ok((self.image.get(index)?, self.label.get(index)?))
    }
}
