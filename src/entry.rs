//! Raw directory entries as handed back by a [`crate::session::Session`].
//!
//! A `RawEntry` makes no promises about which attributes are present. Lookups
//! return `Option` so the normalizer can substitute sentinels explicitly.
//! Attribute names compare ASCII case-insensitively, since servers report
//! them in schema case (`memberOf`) while callers may ask for `memberof`.
use std::collections::BTreeMap;

use serde::Serialize;

/// One directory object: its DN plus ordered attribute values.
///
/// Equality and ordering cover every value, which is what result
/// deduplication and stable sorting rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RawEntry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl RawEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style helper, mostly for tests and fixtures.
    pub fn with_values<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes.insert(
            name.to_string(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with(self, name: &str, value: &str) -> Self {
        self.with_values(name, [value])
    }

    /// All values of `name`, or `None` when absent or empty.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .filter(|v| !v.is_empty())
    }

    /// First value of `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).and_then(|v| v.first()).map(String::as_str)
    }
}

impl From<ldap3::SearchEntry> for RawEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs.into_iter().collect(),
        }
    }
}
