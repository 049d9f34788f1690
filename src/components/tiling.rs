use log::info;
use ndarray::{s, Array3, ArrayD, Axis};
use rayon::prelude::*;

use crate::{
    components::{
        cube::BandCube,
        patches::{PatchCollection, PatchFormat, Patches},
    },
    errors::{RasterPatchError, Result},
    BandSelection,
};

/// Patch grid of a `height` x `width` cube: (rows, cols).
pub fn grid_shape(height: usize, width: usize, size: usize, shift: usize) -> Result<(usize, usize)> {
    if size == 0 || shift == 0 || shift > size || size > height || size > width {
        return Err(RasterPatchError::InvalidTiling {
            height,
            width,
            size,
            shift,
        });
    }
    Ok((1 + (height - size) / shift, 1 + (width - size) / shift))
}

/// Cut the selected bands of `cube` into `size` x `size` patches every `shift` pixels.
///
/// Patches are indexed in row-major scan order, `k = i * cols + j`
/// for the patch at `[i * shift.., j * shift..]`.
pub fn create_patches(
    cube: &BandCube,
    bands: impl Into<BandSelection>,
    size: usize,
    shift: usize,
    channels_first: bool,
) -> Result<PatchCollection> {
    let bands = bands.into().resolve(&cube.available());
    let format = PatchFormat::new(bands.clone(), size, shift, channels_first)?;
    let stack = cube.as_stack(bands, false)?;
    let patches = cut_patches(&stack, size, shift, channels_first)?;
    info!(
        "created {} patches of bands {} with size {size} and shift {shift}",
        patches.len(),
        format.band_signature()
    );
    Ok(PatchCollection::new(format, Patches::InMemory(patches)))
}

pub fn cut_patches(
    stack: &Array3<f64>,
    size: usize,
    shift: usize,
    channels_first: bool,
) -> Result<Vec<ArrayD<f64>>> {
    let (height, width, channels) = stack.dim();
    let (rows, cols) = grid_shape(height, width, size, shift)?;
    Ok((0..rows * cols)
        .into_par_iter()
        .map(|k| {
            let (i, j) = (k / cols, k % cols);
            let square = stack.slice(s![
                i * shift..i * shift + size,
                j * shift..j * shift + size,
                ..
            ]);
            let patch = if channels == 1 {
                square.index_axis_move(Axis(2), 0).into_dyn()
            } else if channels_first {
                square.permuted_axes([2, 0, 1]).into_dyn()
            } else {
                square.into_dyn()
            };
            patch.as_standard_layout().into_owned()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{components::BandIdentifier, testing::ramp_cube};
    use ndarray::Ix3;
    use rstest::rstest;

    #[rstest]
    #[case((10, 10), 4, 4, (2, 2))]
    #[case((10, 10), 4, 2, (4, 4))]
    #[case((10, 7), 4, 3, (3, 2))]
    #[case((4, 4), 4, 1, (1, 1))]
    #[case((9, 13), 3, 2, (4, 6))]
    fn patch_count(
        #[case] shape: (usize, usize),
        #[case] size: usize,
        #[case] shift: usize,
        #[case] grid: (usize, usize),
    ) {
        let (cube, _) = ramp_cube(2, shape);
        let collection = create_patches(&cube, [0usize, 1], size, shift, false).unwrap();
        let rows = (1. + (shape.0 - size) as f64 / shift as f64).floor() as usize;
        let cols = (1. + (shape.1 - size) as f64 / shift as f64).floor() as usize;
        assert_eq!((rows, cols), grid);
        assert_eq!(collection.len(), rows * cols);
    }

    #[rstest]
    #[case((3, 8), 4, 4)]
    #[case((8, 3), 4, 2)]
    #[case((8, 8), 9, 1)]
    fn invalid_tiling(#[case] shape: (usize, usize), #[case] size: usize, #[case] shift: usize) {
        let (cube, _) = ramp_cube(1, shape);
        assert!(matches!(
            create_patches(&cube, 0usize, size, shift, false),
            Err(RasterPatchError::InvalidTiling { height, width, .. }) if (height, width) == shape
        ));
    }

    #[rstest]
    #[case(4, 5)]
    #[case(0, 1)]
    #[case(4, 0)]
    fn invalid_format(#[case] size: usize, #[case] shift: usize) {
        let (cube, _) = ramp_cube(1, (8, 8));
        assert!(matches!(
            create_patches(&cube, 0usize, size, shift, false),
            Err(RasterPatchError::InvalidPatchFormat { .. })
        ));
    }

    #[test]
    fn patches_follow_row_major_scan() {
        let (cube, source) = ramp_cube(2, (6, 8));
        let collection = create_patches(&cube, [1usize, 0], 2, 2, false).unwrap();
        assert_eq!(collection.len(), 12);
        let (b1, b0) = (source.band(1), source.band(0));
        for k in 0..12 {
            let (i, j) = (k / 4, k % 4);
            let patch = collection.get(k).unwrap().into_owned();
            let patch = patch.into_dimensionality::<Ix3>().unwrap();
            assert_eq!(patch.dim(), (2, 2, 2));
            let (rows, cols) = (i * 2..i * 2 + 2, j * 2..j * 2 + 2);
            assert_eq!(
                patch.index_axis(Axis(2), 0),
                b1.slice(s![rows.clone(), cols.clone()])
            );
            assert_eq!(patch.index_axis(Axis(2), 1), b0.slice(s![rows, cols]));
        }
    }

    #[test]
    fn channels_first_moves_bands_to_first_axis() {
        let (cube, source) = ramp_cube(3, (4, 4));
        let collection = create_patches(&cube, [0usize, 1, 2], 2, 1, true).unwrap();
        assert_eq!(collection.len(), 9);
        let patch = collection.get(4).unwrap();
        assert_eq!(patch.shape(), &[3, 2, 2]);
        assert_eq!(
            patch.index_axis(Axis(0), 2),
            source.band(2).slice(s![1..3, 1..3]).into_dyn()
        );
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn single_band_patches_are_2d(#[case] channels_first: bool) {
        let (mut cube, source) = ramp_cube(2, (4, 4));
        cube.register_normalized_difference("nd", 0usize, 1usize);
        let collection = create_patches(&cube, 1usize, 2, 2, channels_first).unwrap();
        let patch = collection.get(3).unwrap();
        assert_eq!(patch.shape(), &[2, 2]);
        assert_eq!(*patch, source.band(1).slice(s![2..4, 2..4]).into_dyn());

        let derived = create_patches(&cube, "nd", 2, 2, channels_first).unwrap();
        assert_eq!(derived.get(0).unwrap().ndim(), 2);
        assert_eq!(derived.format().band_signature(), "nd");
    }

    #[test]
    fn format_records_parameters() {
        let (cube, _) = ramp_cube(3, (4, 4));
        let collection = create_patches(&cube, [2usize, 0], 2, 1, true).unwrap();
        let format = collection.format();
        assert_eq!(
            format.bands(),
            &[BandIdentifier::from(2usize), BandIdentifier::from(0usize)]
        );
        assert_eq!((format.size(), format.shift()), (2, 1));
        assert!(format.channels_first());
        assert_eq!(collection.patches().in_memory_len(), 9);
    }

    #[test]
    fn unavailable_band_fails() {
        let (cube, _) = ramp_cube(1, (4, 4));
        assert!(matches!(
            create_patches(&cube, 3usize, 2, 2, false),
            Err(RasterPatchError::BandUnavailable(_))
        ));
    }
}
