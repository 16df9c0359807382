//! Named string fields gathered from a request or callback payload

/// An insertion-ordered set of named string values.
///
/// Names are unique; inserting an existing name replaces its value in place.
/// Values are opaque text: amounts must already be formatted to the
/// provider's fixed-point representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, String)>,
}

impl FieldSet {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an explicit field-list builder
    pub fn builder() -> FieldSetBuilder {
        FieldSetBuilder::default()
    }

    /// Insert or replace a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a field value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Whether a field named `name` is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Iterate fields in ascending byte order of their names
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self.iter().collect();
        pairs.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        pairs
    }
}

impl<K, V> FromIterator<(K, V)> for FieldSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Builds a [`FieldSet`] from `(name, value, omit_if_empty)` entries.
#[derive(Debug, Default)]
pub struct FieldSetBuilder {
    fields: FieldSet,
}

impl FieldSetBuilder {
    /// Add a field that always participates, even when empty
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Add a field that is left out when its value is empty
    pub fn optional(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.fields.insert(name, value);
        }
        self
    }

    /// Add a field from an `Option`, skipping `None` and empty values
    pub fn maybe(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.optional(name, v),
            None => self,
        }
    }

    /// Add a field with an explicit omission flag
    pub fn entry(self, name: impl Into<String>, value: impl Into<String>, omit_if_empty: bool) -> Self {
        if omit_if_empty {
            self.optional(name, value)
        } else {
            self.field(name, value)
        }
    }

    /// Finish the field list
    pub fn build(self) -> FieldSet {
        self.fields
    }
}
