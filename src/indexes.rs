use std::collections::HashSet;

use crate::components::BandIdentifier;

/// Ordered selection of bands.
///
/// With `drop` set, the selection names the bands to leave out
/// of the available ones.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct BandSelection {
    selection: Vec<BandIdentifier>,
    drop: bool,
}

impl From<BandIdentifier> for BandSelection {
    fn from(value: BandIdentifier) -> Self {
        BandSelection {
            selection: vec![value],
            drop: false,
        }
    }
}

impl From<usize> for BandSelection {
    fn from(value: usize) -> Self {
        BandSelection::from(BandIdentifier::from(value))
    }
}

impl From<&str> for BandSelection {
    fn from(value: &str) -> Self {
        BandSelection::from(BandIdentifier::from(value))
    }
}

impl<T: Into<BandIdentifier>, const N: usize> From<[T; N]> for BandSelection {
    fn from(value: [T; N]) -> Self {
        BandSelection {
            selection: value.into_iter().map(Into::into).collect(),
            drop: false,
        }
    }
}

impl<T: Into<BandIdentifier>> From<Vec<T>> for BandSelection {
    fn from(value: Vec<T>) -> Self {
        BandSelection {
            selection: value.into_iter().map(Into::into).collect(),
            drop: false,
        }
    }
}

impl From<&[BandIdentifier]> for BandSelection {
    fn from(value: &[BandIdentifier]) -> Self {
        BandSelection {
            selection: value.to_vec(),
            drop: false,
        }
    }
}

impl From<std::ops::Range<usize>> for BandSelection {
    fn from(value: std::ops::Range<usize>) -> Self {
        BandSelection {
            selection: value.map(BandIdentifier::Native).collect(),
            drop: false,
        }
    }
}

impl BandSelection {
    pub fn all() -> Self {
        Self {
            selection: Vec::new(),
            drop: true,
        }
    }

    pub fn except(bands: impl Into<BandSelection>) -> Self {
        Self {
            selection: bands.into().selection,
            drop: true,
        }
    }

    /// Selected bands, in order. Availability is not checked for kept bands.
    pub fn resolve(self, available: &[BandIdentifier]) -> Vec<BandIdentifier> {
        if self.drop {
            let drop: HashSet<&BandIdentifier> = self.selection.iter().collect();
            available
                .iter()
                .filter(|band| !drop.contains(band))
                .cloned()
                .collect()
        } else {
            self.selection
        }
    }
}
