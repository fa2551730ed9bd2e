use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    #[error("Mismatched lengths: {x} feature rows but {y} targets")]
    MismatchedLengths { x: usize, y: usize },
    #[error("Empty dataset")]
    EmptyDataset,
    #[error("Dataset has no classes")]
    NoClasses,
    #[error("Row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row} has label {label} but only {classes} classes exist")]
    LabelOutOfRange {
        row: usize,
        label: usize,
        classes: usize,
    },
    #[error("Row {row} has a target of width {found}, expected {expected}")]
    TargetWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Invalid training option: {0}")]
    InvalidOption(String),
}

/// In-memory dataset with integer class labels.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Feature names in column order.
    pub feature_names: Vec<String>,
    /// Ordered list of class identifiers; labels index into it.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

impl TrainDataset {
    pub fn feature_len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        check_rows(&self.x, self.y.len(), self.feature_len(), &self.classes)?;
        let n_classes = self.classes.len();
        for (row, &label) in self.y.iter().enumerate() {
            if label >= n_classes {
                return Err(TrainError::LabelOutOfRange {
                    row,
                    label,
                    classes: n_classes,
                });
            }
        }
        Ok(())
    }
}

/// In-memory dataset with one-hot (or soft) target rows.
#[derive(Debug, Clone)]
pub struct OneHotDataset {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub x: Vec<Vec<f32>>,
    /// One row per sample, `classes.len()` wide.
    pub targets: Vec<Vec<f32>>,
}

impl OneHotDataset {
    pub fn feature_len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        check_rows(&self.x, self.targets.len(), self.feature_len(), &self.classes)?;
        let width = self.classes.len();
        for (row, target) in self.targets.iter().enumerate() {
            if target.len() != width {
                return Err(TrainError::TargetWidth {
                    row,
                    expected: width,
                    found: target.len(),
                });
            }
        }
        Ok(())
    }
}

fn check_rows(
    x: &[Vec<f32>],
    targets: usize,
    feature_len: usize,
    classes: &[String],
) -> Result<(), TrainError> {
    if x.len() != targets {
        return Err(TrainError::MismatchedLengths {
            x: x.len(),
            y: targets,
        });
    }
    if x.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    if classes.is_empty() {
        return Err(TrainError::NoClasses);
    }
    for (row, values) in x.iter().enumerate() {
        if values.len() != feature_len {
            return Err(TrainError::RaggedRow {
                row,
                expected: feature_len,
                found: values.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> TrainDataset {
        TrainDataset {
            feature_names: vec!["a".into(), "b".into()],
            classes: vec!["x".into(), "y".into()],
            x: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            y: vec![0, 1],
        }
    }

    #[test]
    fn valid_dataset_passes() {
        assert_eq!(dataset().validate(), Ok(()));
    }

    #[test]
    fn detects_ragged_rows_and_bad_labels() {
        let mut ragged = dataset();
        ragged.x[1].pop();
        assert!(matches!(
            ragged.validate(),
            Err(TrainError::RaggedRow { row: 1, .. })
        ));

        let mut bad_label = dataset();
        bad_label.y[0] = 5;
        assert!(matches!(
            bad_label.validate(),
            Err(TrainError::LabelOutOfRange { label: 5, .. })
        ));
    }

    #[test]
    fn one_hot_targets_must_match_class_count() {
        let data = OneHotDataset {
            feature_names: vec!["a".into()],
            classes: vec!["x".into(), "y".into()],
            x: vec![vec![0.0]],
            targets: vec![vec![1.0, 0.0, 0.0]],
        };
        assert!(matches!(
            data.validate(),
            Err(TrainError::TargetWidth { expected: 2, found: 3, .. })
        ));
    }
}
