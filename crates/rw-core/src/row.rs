use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One record returned by a device, keyed by property name.
///
/// Values are kept as the raw text the device sent. A property the device
/// omitted reads back as the empty string, the same as an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn get(&self, property: &str) -> &str {
        self.fields.get(property).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, property: &str) -> bool {
        self.fields.contains_key(property)
    }

    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(property.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Row {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_property_reads_empty() {
        let row = Row::from([("chain", "forward")]);
        assert_eq!(row.get("chain"), "forward");
        assert_eq!(row.get("comment"), "");
        assert!(!row.contains("comment"));
    }

    #[test]
    fn test_insert_overwrites() {
        let mut row = Row::new();
        row.insert("bytes", "1");
        row.insert("bytes", "2");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("bytes"), "2");
    }
}
