//! Base implementation of records.
use crate::error::ReplayError;
use std::{
    collections::{
        hash_map::{IntoIter, Iter, Keys},
        HashMap,
    },
    iter::IntoIterator,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically used for metrics.
    Scalar(f32),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of various data types.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        let mut record = Self::empty();
        record.insert(name, RecordValue::Scalar(value));
        record
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns an iterator that consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// Values of `record` overwrite those of `self` on the same key.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges another record into this one in place.
    pub fn merge_inplace(&mut self, record: Record) {
        for (k, v) in record.0.into_iter() {
            self.0.insert(k, v);
        }
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, ReplayError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::Scalar(v) => Ok(*v),
                _ => Err(ReplayError::RecordValueType("Scalar".to_string())),
            }
        } else {
            Err(ReplayError::RecordKey(k.to_string()))
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, ReplayError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::Array1(v) => Ok(v.clone()),
                _ => Err(ReplayError::RecordValueType("Array1".to_string())),
            }
        } else {
            Err(ReplayError::RecordKey(k.to_string()))
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, ReplayError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::String(s) => Ok(s.clone()),
                _ => Err(ReplayError::RecordValueType("String".to_string())),
            }
        } else {
            Err(ReplayError::RecordKey(k.to_string()))
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for Record {
    type Item = (String, RecordValue);
    type IntoIter = IntoIter<String, RecordValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_values() {
        let record = Record::from_slice(&[
            ("beta", RecordValue::Scalar(0.5)),
            ("slots", RecordValue::Array1(vec![1.0, 2.0])),
            ("note", RecordValue::String("ok".to_string())),
        ]);

        assert_eq!(record.get_scalar("beta").unwrap(), 0.5);
        assert_eq!(record.get_array1("slots").unwrap(), vec![1.0, 2.0]);
        assert_eq!(record.get_string("note").unwrap(), "ok");
        assert_eq!(
            record.get_scalar("slots"),
            Err(ReplayError::RecordValueType("Scalar".to_string()))
        );
        assert_eq!(
            record.get_scalar("missing"),
            Err(ReplayError::RecordKey("missing".to_string()))
        );
    }

    #[test]
    fn test_merge() {
        let r1 = Record::from_scalar("a", 1.0);
        let mut r2 = Record::from_scalar("b", 2.0);
        r2.insert("a", RecordValue::Scalar(3.0));

        let merged = r1.merge(r2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get_scalar("a").unwrap(), 3.0);
    }

    #[test]
    fn test_iterate_and_merge_inplace() {
        let mut record = Record::from_scalar("beta", 0.4);
        record.merge_inplace(Record::from_slice(&[
            ("beta", RecordValue::Scalar(0.5)),
            ("mean_weight", RecordValue::Scalar(0.9)),
        ]));
        assert_eq!(record.get_scalar("beta").unwrap(), 0.5);

        let mut keys = record.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec!["beta".to_string(), "mean_weight".to_string()]);

        let sum = record
            .iter()
            .map(|(_, v)| match v {
                RecordValue::Scalar(v) => *v,
                _ => 0.0,
            })
            .sum::<f32>();
        assert!((sum - 1.4).abs() < 1e-6);

        let mut pairs = record.clone().into_iter_in_record().collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(pairs[1], ("mean_weight".to_string(), RecordValue::Scalar(0.9)));
        assert_eq!(record.into_iter().count(), 2);
    }
}
