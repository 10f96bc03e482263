use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// One extracted query: the derived label and its trimmed SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlEntry {
    pub label: String,
    pub sql: String,
}

/// Ordered label → SQL mapping produced by one extraction.
///
/// Entries keep discovery order (document, then node). Labels are unique:
/// a colliding label is suffixed with `_2`, `_3`, ... instead of replacing
/// the earlier entry. Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlMapping {
    entries: Vec<SqlEntry>,
    labels: HashSet<String>,
}

impl SqlMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `sql` under `label`, returning the label actually used.
    ///
    /// The returned label differs from the requested one only when the
    /// requested label was already taken.
    pub fn insert(&mut self, label: impl Into<String>, sql: impl Into<String>) -> String {
        let requested = label.into();
        let label = unique_name(&requested, |candidate| self.labels.contains(candidate));

        self.labels.insert(label.clone());
        self.entries.push(SqlEntry {
            label: label.clone(),
            sql: sql.into(),
        });
        label
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.sql.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SqlEntry> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }
}

impl<'a> IntoIterator for &'a SqlMapping {
    type Item = &'a SqlEntry;
    type IntoIter = std::slice::Iter<'a, SqlEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for SqlMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.label, &entry.sql)?;
        }
        map.end()
    }
}

/// Returns `base` if it is free, else the first free `base_<n>` for n >= 2.
pub(crate) fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }

    (2usize..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
