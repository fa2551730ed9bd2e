use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::PreprocessError;

/// How an encoder's vocabulary is sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyOrder {
    /// Every value parses as an integer; sorted by numeric value.
    Numeric,
    /// Plain byte-wise string order.
    Lexical,
}

impl VocabularyOrder {
    fn detect(values: &BTreeSet<&str>) -> Self {
        if values.iter().all(|value| value.parse::<i64>().is_ok()) {
            Self::Numeric
        } else {
            Self::Lexical
        }
    }

    fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Numeric => match (a.parse::<i64>(), b.parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            },
            Self::Lexical => a.cmp(b),
        }
    }
}

/// Maps raw identifier strings to contiguous codes `0..len`.
///
/// Codes follow sorted vocabulary order, so refitting on the same set of
/// values always reproduces the same mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Source column name, kept for error messages and manifests.
    pub column: String,
    pub order: VocabularyOrder,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Build the vocabulary from every value in the column.
    pub fn fit<'a, I>(column: &str, values: I) -> Result<Self, PreprocessError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = values.into_iter().collect();
        if unique.is_empty() {
            return Err(PreprocessError::EmptyVocabulary {
                column: column.to_string(),
            });
        }
        let order = VocabularyOrder::detect(&unique);
        // Numeric ids are stored in canonical form, so "007" and "7" share a code.
        let classes: Vec<String> = match order {
            VocabularyOrder::Numeric => unique
                .iter()
                .filter_map(|value| value.parse::<i64>().ok())
                .collect::<BTreeSet<i64>>()
                .into_iter()
                .map(|value| value.to_string())
                .collect(),
            VocabularyOrder::Lexical => unique.into_iter().map(str::to_string).collect(),
        };
        Ok(Self {
            column: column.to_string(),
            order,
            classes,
        })
    }

    /// Code for a raw value.
    pub fn transform(&self, value: &str) -> Result<usize, PreprocessError> {
        let unseen = || PreprocessError::UnseenLabel {
            column: self.column.clone(),
            value: value.to_string(),
        };
        if self.order == VocabularyOrder::Numeric && value.parse::<i64>().is_err() {
            return Err(unseen());
        }
        self.classes
            .binary_search_by(|probe| self.order.compare(probe, value))
            .map_err(|_| unseen())
    }

    pub fn transform_all<'a, I>(&self, values: I) -> Result<Vec<usize>, PreprocessError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        values.into_iter().map(|value| self.transform(value)).collect()
    }

    /// Raw value for a code, if the code is in range.
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Vocabulary in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check invariants of a deserialized encoder.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err(format!("encoder for {} has no classes", self.column));
        }
        if self.order == VocabularyOrder::Numeric
            && let Some(bad) = self.classes.iter().find(|c| c.parse::<i64>().is_err())
        {
            return Err(format!(
                "encoder for {} is numeric but contains {bad:?}",
                self.column
            ));
        }
        for pair in self.classes.windows(2) {
            if self.order.compare(&pair[0], &pair[1]) != Ordering::Less {
                return Err(format!(
                    "encoder for {} is not strictly sorted at {:?}",
                    self.column, pair[1]
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ids_sort_numerically() {
        let encoder = LabelEncoder::fit("User ID", ["10", "2", "33", "2", "1"]).unwrap();
        assert_eq!(encoder.order, VocabularyOrder::Numeric);
        assert_eq!(encoder.classes(), &["1", "2", "10", "33"]);
        assert_eq!(encoder.transform("10").unwrap(), 2);
    }

    #[test]
    fn zero_padded_integers_share_a_code() {
        let encoder = LabelEncoder::fit("User ID", ["007", "7", "12", "+12"]).unwrap();
        assert_eq!(encoder.classes(), &["7", "12"]);
        assert_eq!(encoder.transform("007").unwrap(), 0);
        assert_eq!(encoder.transform("7").unwrap(), 0);
        assert_eq!(encoder.transform("+12").unwrap(), 1);
        assert_eq!(encoder.inverse_transform(0), Some("7"));
        assert!(encoder.validate().is_ok());
    }

    #[test]
    fn mixed_ids_sort_lexically() {
        let encoder = LabelEncoder::fit("Course ID", ["C2", "C10", "A1"]).unwrap();
        assert_eq!(encoder.order, VocabularyOrder::Lexical);
        assert_eq!(encoder.classes(), &["A1", "C10", "C2"]);
    }

    #[test]
    fn mapping_is_stable_for_repeated_values() {
        let values = ["b", "a", "c", "a", "b"];
        let encoder = LabelEncoder::fit("x", values).unwrap();
        let first = encoder.transform_all(values).unwrap();
        let second = encoder.transform_all(values).unwrap();
        assert_eq!(first, vec![1, 0, 2, 0, 1]);
        assert_eq!(first, second);

        let refit = LabelEncoder::fit("x", ["c", "b", "a"]).unwrap();
        assert_eq!(refit, encoder);
    }

    #[test]
    fn unseen_value_is_an_error() {
        let encoder = LabelEncoder::fit("User ID", ["1", "2"]).unwrap();
        assert_eq!(
            encoder.transform("3"),
            Err(PreprocessError::UnseenLabel {
                column: "User ID".to_string(),
                value: "3".to_string()
            })
        );
        assert!(encoder.transform("abc").is_err());
    }

    #[test]
    fn inverse_round_trips_codes() {
        let encoder = LabelEncoder::fit("Course ID", ["x", "y", "z"]).unwrap();
        for (code, class) in encoder.classes().iter().enumerate() {
            assert_eq!(encoder.inverse_transform(code), Some(class.as_str()));
            assert_eq!(encoder.transform(class).unwrap(), code);
        }
        assert_eq!(encoder.inverse_transform(3), None);
    }

    #[test]
    fn empty_column_cannot_be_fitted() {
        let values: [&str; 0] = [];
        assert!(matches!(
            LabelEncoder::fit("User ID", values),
            Err(PreprocessError::EmptyVocabulary { .. })
        ));
    }

    #[test]
    fn json_round_trip_preserves_mapping() {
        let encoder = LabelEncoder::fit("User ID", ["7", "3", "12"]).unwrap();
        let json = serde_json::to_string(&encoder).unwrap();
        let restored: LabelEncoder = serde_json::from_str(&json).unwrap();
        assert!(restored.validate().is_ok());
        for value in ["3", "7", "12"] {
            assert_eq!(restored.transform(value), encoder.transform(value));
        }
    }

    #[test]
    fn validate_rejects_unsorted_vocabulary() {
        let json = r#"{"column":"c","order":"lexical","classes":["b","a"]}"#;
        let encoder: LabelEncoder = serde_json::from_str(json).unwrap();
        assert!(encoder.validate().is_err());
    }
}
