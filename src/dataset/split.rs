//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("{rows} rows cannot be split with test fraction {test_fraction}: one side would be empty")]
    TooFewRows { rows: usize, test_fraction: f64 },
}

/// Row indices for each side of a split, in permutation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Copy the rows of `items` selected by each side.
    pub fn select<T: Clone>(&self, items: &[T]) -> (Vec<T>, Vec<T>) {
        let pick = |indices: &[usize]| -> Vec<T> {
            indices.iter().map(|&i| items[i].clone()).collect()
        };
        (pick(&self.train), pick(&self.test))
    }
}

/// Shuffle `0..rows` with `seed` and hold out `ceil(rows * test_fraction)` rows.
///
/// No stratification. The same `(rows, test_fraction, seed)` always yields the
/// same partition.
pub fn train_test_split(
    rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    let n_test = (rows as f64 * test_fraction).ceil() as usize;
    let n_train = rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(SplitError::TooFewRows {
            rows,
            test_fraction,
        });
    }

    let mut permutation: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);
    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_partition() {
        let a = train_test_split(50, 0.2, 42).unwrap();
        let b = train_test_split(50, 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_changes_partition() {
        let a = train_test_split(50, 0.2, 42).unwrap();
        let b = train_test_split(50, 0.2, 43).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sizes_round_test_side_up_and_cover_all_rows() {
        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn single_row_cannot_be_split() {
        assert_eq!(
            train_test_split(1, 0.2, 42),
            Err(SplitError::TooFewRows {
                rows: 1,
                test_fraction: 0.2
            })
        );
    }

    #[test]
    fn rejects_fraction_outside_unit_interval() {
        assert!(train_test_split(10, 0.0, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
    }

    #[test]
    fn select_follows_indices() {
        let split = SplitIndices {
            train: vec![2, 0],
            test: vec![1],
        };
        let (train, test) = split.select(&["a", "b", "c"]);
        assert_eq!(train, vec!["c", "a"]);
        assert_eq!(test, vec!["b"]);
    }
}
