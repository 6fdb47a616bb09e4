//! In-memory snapshots of a key subtree.

use crate::address::KeyAddress;
use crate::error::Result;
use crate::key::RegistryKey;
use crate::value::ValueDescriptor;
use tracing::debug;

/// A key, its values and its subkeys, captured recursively.
///
/// Built by [`RegistryKey::get_sub_key_recursive`]. The walk is not atomic:
/// keys changed by other processes during the walk may or may not be seen.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct KeyTree {
    /// Key name; empty for a hive root.
    pub name: String,
    /// Full address of the key.
    pub path: KeyAddress,
    /// Values, in enumeration order. Empty unless values were requested.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub values: Vec<ValueDescriptor>,
    /// Subkeys, in enumeration order.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub keys: Vec<KeyTree>,
}

impl KeyTree {
    pub(crate) fn build(key: &RegistryKey<'_>, include_values: bool) -> Result<Self> {
        let values = if include_values {
            key.values().collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let mut keys = Vec::new();
        for child in key.sub_keys() {
            keys.push(Self::build(&child?, include_values)?);
        }

        debug!(key = %key, values = values.len(), subkeys = keys.len(), "Exported key");
        Ok(Self {
            name: key.name().to_string(),
            path: key.address().clone(),
            values,
            keys,
        })
    }

    /// Returns the number of keys in the tree, this one included.
    pub fn key_count(&self) -> usize {
        1 + self.keys.iter().map(KeyTree::key_count).sum::<usize>()
    }

    /// Returns the number of values in the tree.
    pub fn value_count(&self) -> usize {
        self.values.len() + self.keys.iter().map(KeyTree::value_count).sum::<usize>()
    }

    /// Finds a direct subkey by name, ASCII case-insensitively.
    pub fn child(&self, name: &str) -> Option<&KeyTree> {
        self.keys.iter().find(|key| key.name.eq_ignore_ascii_case(name))
    }

    /// Finds a value by name, ASCII case-insensitively.
    pub fn value(&self, name: &str) -> Option<&ValueDescriptor> {
        self.values.iter().find(|value| value.name.eq_ignore_ascii_case(name))
    }

    /// Renders the tree as pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::Hive;
    use crate::memory::MemoryProvider;
    use crate::value::{ValueData, ValueType};

    #[test]
    fn test_build_counts() {
        let provider = MemoryProvider::new();
        let root = RegistryKey::new(&provider, KeyAddress::root(Hive::CurrentConfig));
        let app = root.create_sub_key("App").unwrap();
        app.set_value("Version", "1.0", ValueType::String).unwrap();
        let sub = app.create_sub_key("Sub").unwrap();
        sub.set_value("Flags", 3u32, ValueType::Dword).unwrap();

        let tree = root.get_sub_key_recursive("App", true).unwrap();
        assert_eq!(tree.name, "App");
        assert_eq!(tree.key_count(), 2);
        assert_eq!(tree.value_count(), 2);
        let sub_tree = tree.child("sub").unwrap();
        assert_eq!(sub_tree.value("flags").unwrap().data, ValueData::Dword(3));

        let bare = root.get_sub_key_recursive("App", false).unwrap();
        assert_eq!(bare.value_count(), 0);
        assert_eq!(bare.key_count(), 2);
    }
}
