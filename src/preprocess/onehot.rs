use super::PreprocessError;

/// Expand class codes into one-hot rows of length `width`.
pub fn one_hot(labels: &[usize], width: usize) -> Result<Vec<Vec<f32>>, PreprocessError> {
    labels
        .iter()
        .map(|&label| {
            if label >= width {
                return Err(PreprocessError::LabelOutOfRange { label, width });
            }
            let mut row = vec![0.0f32; width];
            row[label] = 1.0;
            Ok(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_row_has_a_single_one_at_the_label() {
        let rows = one_hot(&[2, 0, 1], 3).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![0.0, 0.0, 1.0],
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0]
            ]
        );
    }

    #[test]
    fn label_beyond_width_is_rejected() {
        assert_eq!(
            one_hot(&[0, 3], 3),
            Err(PreprocessError::LabelOutOfRange { label: 3, width: 3 })
        );
    }
}
