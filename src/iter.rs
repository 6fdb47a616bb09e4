//! Forward-only cursors over the subkeys and values of a key.
//!
//! Each [`rewind`](SubKeys::rewind) makes one enumeration call and captures
//! its result as an immutable snapshot; the cursor then walks that snapshot.
//! Rewinding again re-queries the provider and may see a different registry.
//! Changing the key while a snapshot is being walked can leave names in the
//! snapshot that no longer resolve.
//!
//! Both cursors also implement [`Iterator`]. The first `next()` rewinds, and
//! an enumeration failure is yielded once before iteration ends.

use crate::error::{RegistryError, Result};
use crate::key::RegistryKey;
use crate::provider::Operation;
use crate::value::{ValueData, ValueDescriptor, ValueType};
use tracing::{debug, warn};

/// Cursor over the immediate subkeys of a key.
#[derive(Debug, Clone)]
pub struct SubKeys<'a> {
    key: RegistryKey<'a>,
    names: Vec<String>,
    position: usize,
    rewound: bool,
}

impl<'a> SubKeys<'a> {
    pub(crate) fn new(key: RegistryKey<'a>) -> Self {
        Self {
            key,
            names: Vec::new(),
            position: 0,
            rewound: false,
        }
    }

    /// Returns the key being enumerated.
    pub fn parent(&self) -> &RegistryKey<'a> {
        &self.key
    }

    /// Re-queries the subkey names and moves to the first one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::OperationFailed`] if enumeration fails; the
    /// snapshot is then empty.
    pub fn rewind(&mut self) -> Result<()> {
        self.rewound = true;
        self.names.clear();
        self.position = 0;

        let address = self.key.address();
        let reply = self.key.provider().enum_key(address.hive(), &address.path());
        if !reply.is_success() {
            warn!(key = %address, code = %reply.code, "EnumKey failed");
            return Err(RegistryError::operation_failed(Operation::EnumKey, address, reply.code));
        }
        self.names = reply.output.unwrap_or_default();
        debug!(key = %address, count = self.names.len(), "Captured subkey snapshot");
        Ok(())
    }

    /// Returns true while the cursor is inside the snapshot.
    pub fn valid(&self) -> bool {
        self.position < self.names.len()
    }

    /// Moves to the next entry. Does not check bounds.
    pub fn advance(&mut self) {
        self.position += 1;
    }

    /// Returns the subkey name at the cursor.
    pub fn key(&self) -> Result<&str> {
        self.names
            .get(self.position)
            .map(String::as_str)
            .ok_or(RegistryError::OutOfBounds {
                index: self.position,
                len: self.names.len(),
            })
    }

    /// Resolves the entry at the cursor to a key, probing that it still
    /// exists.
    pub fn current(&self) -> Result<RegistryKey<'a>> {
        let name = self.key()?;
        self.key.get_sub_key(name)
    }

    /// Returns true if the subkey at the cursor has subkeys of its own.
    pub fn has_children(&self) -> Result<bool> {
        let mut children = self.get_children()?;
        children.rewind()?;
        Ok(children.valid())
    }

    /// Returns a cursor over the subkeys of the entry at the cursor.
    ///
    /// The returned cursor has not been rewound.
    pub fn get_children(&self) -> Result<SubKeys<'a>> {
        let name = self.key()?;
        let child = RegistryKey::new(self.key.provider(), self.key.address().child(name));
        Ok(child.sub_keys())
    }

    /// Returns the number of names in the current snapshot.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the names in the current snapshot.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<'a> Iterator for SubKeys<'a> {
    type Item = Result<RegistryKey<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.rewound {
            if let Err(err) = self.rewind() {
                return Some(Err(err));
            }
        }
        if !self.valid() {
            return None;
        }
        let item = self.current();
        self.advance();
        Some(item)
    }
}

/// Cursor over the values of a key.
#[derive(Debug, Clone)]
pub struct Values<'a> {
    key: RegistryKey<'a>,
    names: Vec<String>,
    types: Vec<ValueType>,
    position: usize,
    rewound: bool,
}

impl<'a> Values<'a> {
    pub(crate) fn new(key: RegistryKey<'a>) -> Self {
        Self {
            key,
            names: Vec::new(),
            types: Vec::new(),
            position: 0,
            rewound: false,
        }
    }

    /// Returns the key being enumerated.
    pub fn parent(&self) -> &RegistryKey<'a> {
        &self.key
    }

    /// Re-queries value names and types and moves to the first value.
    ///
    /// A name without a matching type tag is reported as `REG_NONE`
    /// (`ValueType::Unknown(0)`).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::OperationFailed`] if enumeration fails; the
    /// snapshot is then empty.
    pub fn rewind(&mut self) -> Result<()> {
        self.rewound = true;
        self.names.clear();
        self.types.clear();
        self.position = 0;

        let address = self.key.address();
        let reply = self.key.provider().enum_values(address.hive(), &address.path());
        if !reply.is_success() {
            warn!(key = %address, code = %reply.code, "EnumValues failed");
            return Err(RegistryError::operation_failed(Operation::EnumValues, address, reply.code));
        }

        let (names, types) = reply.output;
        let names = names.unwrap_or_default();
        let types = types.unwrap_or_default();
        self.types = (0..names.len())
            .map(|i| types.get(i).copied().map_or(ValueType::Unknown(0), ValueType::from_u32))
            .collect();
        self.names = names;
        debug!(key = %address, count = self.names.len(), "Captured value snapshot");
        Ok(())
    }

    /// Returns true while the cursor is inside the snapshot.
    pub fn valid(&self) -> bool {
        self.position < self.names.len()
    }

    /// Moves to the next entry. Does not check bounds.
    pub fn advance(&mut self) {
        self.position += 1;
    }

    fn out_of_bounds(&self) -> RegistryError {
        RegistryError::OutOfBounds {
            index: self.position,
            len: self.names.len(),
        }
    }

    /// Returns the value name at the cursor.
    pub fn key(&self) -> Result<&str> {
        self.names
            .get(self.position)
            .map(String::as_str)
            .ok_or_else(|| self.out_of_bounds())
    }

    /// Returns the type tag captured for the value at the cursor, without a
    /// provider call.
    pub fn current_type(&self) -> Result<ValueType> {
        self.types.get(self.position).copied().ok_or_else(|| self.out_of_bounds())
    }

    /// Reads the data of the value at the cursor with its captured type.
    pub fn current(&self) -> Result<ValueData> {
        let name = self.key()?;
        self.key.get_value(name, Some(self.current_type()?))
    }

    /// Returns name, type and data of the value at the cursor.
    pub fn current_descriptor(&self) -> Result<ValueDescriptor> {
        Ok(ValueDescriptor {
            name: self.key()?.to_string(),
            value_type: self.current_type()?,
            data: self.current()?,
        })
    }

    /// Returns the number of values in the current snapshot.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the names in the current snapshot.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Iterator for Values<'_> {
    type Item = Result<ValueDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.rewound {
            if let Err(err) = self.rewind() {
                return Some(Err(err));
            }
        }
        if !self.valid() {
            return None;
        }
        let item = self.current_descriptor();
        self.advance();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::KeyAddress;
    use crate::hive::Hive;
    use crate::memory::MemoryProvider;

    #[test]
    fn test_cursor_bounds() {
        let provider = MemoryProvider::new();
        let root = RegistryKey::new(&provider, KeyAddress::root(Hive::Users));
        root.create_sub_key("Only").unwrap();

        let mut keys = root.sub_keys();
        assert!(!keys.valid());
        keys.rewind().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.key().unwrap(), "Only");
        keys.advance();
        assert!(!keys.valid());
        assert_eq!(
            keys.key().unwrap_err(),
            RegistryError::OutOfBounds { index: 1, len: 1 }
        );
        assert!(keys.current().is_err());
    }

    #[test]
    fn test_children() {
        let provider = MemoryProvider::new();
        let root = RegistryKey::new(&provider, KeyAddress::root(Hive::CurrentUser));
        root.create_sub_key(r"A\A1").unwrap();
        root.create_sub_key("B").unwrap();

        let mut keys = root.sub_keys();
        keys.rewind().unwrap();
        assert_eq!(keys.key().unwrap(), "A");
        assert!(keys.has_children().unwrap());
        let mut nested = keys.get_children().unwrap();
        nested.rewind().unwrap();
        assert_eq!(nested.names(), &["A1"]);

        keys.advance();
        assert_eq!(keys.key().unwrap(), "B");
        assert!(!keys.has_children().unwrap());
    }

    #[test]
    fn test_values_types_and_data() {
        let provider = MemoryProvider::new();
        let root = RegistryKey::new(&provider, KeyAddress::root(Hive::LocalMachine));
        let key = root.create_sub_key("V").unwrap();
        key.set_value("S", "text", ValueType::String).unwrap();
        key.set_value("D", 7u32, ValueType::Dword).unwrap();

        let mut values = key.values();
        values.rewind().unwrap();
        assert_eq!(values.current_type().unwrap(), ValueType::String);
        assert_eq!(values.current().unwrap(), ValueData::String("text".into()));
        values.advance();
        assert_eq!(values.current_type().unwrap(), ValueType::Dword);
        values.advance();
        assert!(values.current_type().is_err());

        let collected: Vec<ValueDescriptor> = key.values().collect::<Result<_>>().unwrap();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].data, ValueData::Dword(7));
    }

    #[test]
    fn test_failed_enumeration_is_yielded_once() {
        let provider = MemoryProvider::new();
        let missing = RegistryKey::new(&provider, KeyAddress::new(Hive::LocalMachine, "Missing"));
        let mut keys = missing.sub_keys();
        assert!(matches!(
            keys.next(),
            Some(Err(RegistryError::OperationFailed { .. }))
        ));
        assert!(keys.next().is_none());
    }
}
