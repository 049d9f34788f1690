use ndarray::{Array2, ArrayView2, Zip};
use std::fmt::{Debug, Display};

use crate::{
    components::cube::BandCube,
    errors::{RasterPatchError, Result},
};

/// Shift added to both operands of a normalized difference
/// when their common minimum is not positive.
pub const NORMALIZED_DIFFERENCE_EPSILON: f64 = 1e-4;

/// Band address in a [BandCube].
///
/// `Native` indexes follow the physical band order of the raster source,
/// `Derived` names a registered [BandFormula].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum BandIdentifier {
    Native(usize),
    Derived(String),
}

impl Display for BandIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandIdentifier::Native(index) => write!(f, "{index}"),
            BandIdentifier::Derived(name) => write!(f, "{name}"),
        }
    }
}

impl From<usize> for BandIdentifier {
    fn from(value: usize) -> Self {
        BandIdentifier::Native(value)
    }
}

impl From<&str> for BandIdentifier {
    fn from(value: &str) -> Self {
        BandIdentifier::Derived(value.to_string())
    }
}

impl From<String> for BandIdentifier {
    fn from(value: String) -> Self {
        BandIdentifier::Derived(value)
    }
}

impl From<&BandIdentifier> for BandIdentifier {
    fn from(value: &BandIdentifier) -> Self {
        value.clone()
    }
}

/// Formula of a derived band.
///
/// Implementations only read the cube through [BandCube::get],
/// the cube memoizes the result.
pub trait BandFormula: Send + Sync {
    fn evaluate(&self, cube: &BandCube) -> Result<Array2<f64>>;
}

impl<F> BandFormula for F
where
    F: Fn(&BandCube) -> Result<Array2<f64>> + Send + Sync,
{
    fn evaluate(&self, cube: &BandCube) -> Result<Array2<f64>> {
        self(cube)
    }
}

/// `(b1 - b2) / (b1 + b2)` over two bands of the cube.
#[derive(Debug, Clone)]
pub struct NormalizedDifference {
    pub b1: BandIdentifier,
    pub b2: BandIdentifier,
}

impl NormalizedDifference {
    pub fn new(b1: impl Into<BandIdentifier>, b2: impl Into<BandIdentifier>) -> Self {
        Self {
            b1: b1.into(),
            b2: b2.into(),
        }
    }
}

impl BandFormula for NormalizedDifference {
    fn evaluate(&self, cube: &BandCube) -> Result<Array2<f64>> {
        cube.normalized_difference(&self.b1, &self.b2)
    }
}

/// Elementwise `(b1 - b2) / (b1 + b2)`.
///
/// With `m` the minimum over both arrays, both operands are shifted by
/// `-m + NORMALIZED_DIFFERENCE_EPSILON` when `m <= 0` and left as is otherwise.
pub fn normalized_difference(b1: ArrayView2<f64>, b2: ArrayView2<f64>) -> Result<Array2<f64>> {
    if b1.shape() != b2.shape() {
        return Err(RasterPatchError::ShapeMismatch(
            b1.shape().to_vec(),
            b2.shape().to_vec(),
        ));
    }
    let min = b1
        .iter()
        .chain(b2.iter())
        .fold(f64::INFINITY, |min, value| min.min(*value));
    let shift = if min <= 0. {
        -min + NORMALIZED_DIFFERENCE_EPSILON
    } else {
        0.
    };
    Ok(Zip::from(&b1)
        .and(&b2)
        .map_collect(|x, y| ((x + shift) - (y + shift)) / ((x + shift) + (y + shift))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case(BandIdentifier::Native(3), "3")]
    #[case(BandIdentifier::Derived("ndwi".into()), "ndwi")]
    fn identifier_display(#[case] band: BandIdentifier, #[case] expected: &str) {
        assert_eq!(band.to_string(), expected)
    }

    #[test]
    fn native_bands_sort_before_derived() {
        let mut bands = vec![
            BandIdentifier::from("mndwi"),
            BandIdentifier::from(2usize),
            BandIdentifier::from("ndwi"),
            BandIdentifier::from(0usize),
        ];
        bands.sort();
        assert_eq!(
            bands,
            vec![
                BandIdentifier::from(0usize),
                BandIdentifier::from(2usize),
                BandIdentifier::from("mndwi"),
                BandIdentifier::from("ndwi"),
            ]
        )
    }

    #[test]
    fn positive_bands_are_not_shifted() {
        let b1 = array![[0.3, 0.5], [0.2, 0.9]];
        let b2 = array![[0.1, 0.5], [0.6, 0.1]];
        let result = normalized_difference(b1.view(), b2.view()).unwrap();
        let expected = Zip::from(&b1)
            .and(&b2)
            .map_collect(|x, y| (x - y) / (x + y));
        assert_eq!(result, expected);
    }

    #[test]
    fn non_positive_minimum_shifts_both_operands() {
        let b1 = array![[-0.2, 0.5], [0.0, 0.9]];
        let b2 = array![[0.1, -0.4], [0.6, 0.0]];
        let shift = 0.4 + 1e-4;
        let result = normalized_difference(b1.view(), b2.view()).unwrap();
        let expected = Zip::from(&b1)
            .and(&b2)
            .map_collect(|x, y| ((x + shift) - (y + shift)) / ((x + shift) + (y + shift)));
        assert_eq!(result, expected);
        assert!(result.iter().all(|value| value.is_finite()));
    }

    #[test]
    fn zero_minimum_uses_epsilon_only() {
        let b1 = array![[0.0, 0.0]];
        let b2 = array![[0.0, 1.0]];
        let result = normalized_difference(b1.view(), b2.view()).unwrap();
        assert_eq!(result[[0, 0]], 0.);
        let eps = NORMALIZED_DIFFERENCE_EPSILON;
        assert_eq!(result[[0, 1]], (eps - (1. + eps)) / (eps + (1. + eps)));
    }

    #[test]
    fn mismatched_shapes_fail() {
        let b1 = Array2::<f64>::ones((2, 2));
        let b2 = Array2::<f64>::ones((2, 3));
        assert!(matches!(
            normalized_difference(b1.view(), b2.view()),
            Err(RasterPatchError::ShapeMismatch(_, _))
        ))
    }
}
