//! Attribute values of the current entry

use secrecy::zeroize::Zeroize;

use crate::gateway::Entry;

/// Owned copy of one attribute's values.
///
/// Buffers are wiped when the value set is released, either explicitly via
/// [`release`](Self::release) or by going out of scope.
#[derive(Debug, PartialEq, Eq)]
pub struct AttributeValues {
    name: String,
    values: Vec<Vec<u8>>,
}

impl AttributeValues {
    pub fn new(name: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Copy the values of `name` out of `entry`.
    ///
    /// `None` when the entry lacks the attribute.
    pub fn from_entry(entry: &Entry, name: &str) -> Option<Self> {
        entry
            .values(name)
            .map(|values| Self::new(name, values.to_vec()))
    }

    /// Attribute name as requested.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<&[u8]> {
        self.values.first().map(Vec::as_slice)
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.values.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.values.iter().map(Vec::as_slice)
    }

    /// Values decoded as UTF-8, replacing invalid sequences.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect()
    }

    /// Release the value set. Consumes it, so it cannot be released twice.
    pub fn release(self) {}
}

impl Drop for AttributeValues {
    fn drop(&mut self) {
        for value in &mut self.values {
            value.zeroize();
        }
    }
}
