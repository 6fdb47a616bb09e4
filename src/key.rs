//! Registry keys and the operations performed on them.
//!
//! A [`RegistryKey`] is a [`KeyAddress`] paired with the provider handle it
//! was obtained from. Every method that touches the registry makes one or
//! more blocking provider calls.

use crate::address::KeyAddress;
use crate::error::{RegistryError, Result};
use crate::export::KeyTree;
use crate::hive::Hive;
use crate::iter::{SubKeys, Values};
use crate::provider::{Operation, RegistryProvider, ReturnCode};
use crate::value::{self, ValueData, ValueInput, ValueType};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// A registry key with access to its provider.
#[derive(Clone)]
pub struct RegistryKey<'a> {
    provider: &'a dyn RegistryProvider,
    address: KeyAddress,
}

impl<'a> RegistryKey<'a> {
    /// Pairs an address with a provider. No provider call is made.
    pub fn new(provider: &'a dyn RegistryProvider, address: KeyAddress) -> Self {
        Self { provider, address }
    }

    /// Returns the address of this key.
    pub fn address(&self) -> &KeyAddress {
        &self.address
    }

    /// Returns the hive this key belongs to.
    pub fn hive(&self) -> Hive {
        self.address.hive()
    }

    /// Returns the qualified path below the hive root.
    pub fn path(&self) -> String {
        self.address.path()
    }

    /// Returns the key name (the last path segment).
    pub fn name(&self) -> &str {
        self.address.name()
    }

    /// Returns the provider handle this key uses.
    pub fn provider(&self) -> &'a dyn RegistryProvider {
        self.provider
    }

    fn with_address(&self, address: KeyAddress) -> Self {
        Self {
            provider: self.provider,
            address,
        }
    }

    /// Existence probe: an `EnumKey` call that succeeds only for existing keys.
    fn probe(&self, address: &KeyAddress) -> bool {
        let reply = self.provider.enum_key(address.hive(), &address.path());
        debug!(key = %address, code = %reply.code, "Existence probe");
        reply.is_success()
    }

    /// Returns true if the key at `relative` below this key exists.
    ///
    /// An empty name probes this key itself.
    pub fn exists(&self, relative: &str) -> bool {
        self.probe(&self.address.child(relative))
    }

    /// Resolves `relative` below this key and checks that it exists.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyNotFound`] if the existence probe fails.
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn get_sub_key(&self, relative: &str) -> Result<RegistryKey<'a>> {
        let address = self.address.child(relative);
        if !self.probe(&address) {
            return Err(RegistryError::key_not_found(&address));
        }
        Ok(self.with_address(address))
    }

    /// Returns the parent key. A hive root is its own parent.
    ///
    /// The parent of an existing key always exists, so no probe is made.
    pub fn get_parent_key(&self) -> RegistryKey<'a> {
        self.with_address(self.address.parent())
    }

    /// Creates the key at `relative`, including missing intermediate keys.
    ///
    /// Creating a key that already exists succeeds.
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn create_sub_key(&self, relative: &str) -> Result<RegistryKey<'a>> {
        let address = self.address.child(relative);
        let status = self.provider.create_key(address.hive(), &address.path());
        if !status.is_success() {
            warn!(code = %status.code, "CreateKey failed");
            return Err(RegistryError::operation_failed(
                Operation::CreateKey,
                &address,
                status.code,
            ));
        }
        info!(created = %address, "Created key");
        Ok(self.with_address(address))
    }

    /// Deletes the key at `relative`, which must have no subkeys.
    ///
    /// Returns the address of the deleted key.
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn delete_sub_key(&self, relative: &str) -> Result<KeyAddress> {
        let address = self.address.child(relative);
        let status = self.provider.delete_key(address.hive(), &address.path());
        if !status.is_success() {
            warn!(code = %status.code, "DeleteKey failed");
            return Err(RegistryError::operation_failed(
                Operation::DeleteKey,
                &address,
                status.code,
            ));
        }
        info!(deleted = %address, "Deleted key");
        Ok(address)
    }

    /// Deletes the key at `relative` together with everything below it.
    ///
    /// Children are visited in provider enumeration order; for each one its
    /// values are deleted, then its own children, then the child itself. The
    /// first failure aborts the walk and leaves what was already deleted
    /// deleted.
    ///
    /// Returns the address of the deleted key.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::OperationFailed`] with `ACCESS_DENIED` if `relative`
    ///   resolves to a hive root; nothing is deleted and no provider call is made
    /// - [`RegistryError::KeyNotFound`] if the key does not exist
    /// - the first error raised while deleting below it
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn delete_sub_key_recursive(&self, relative: &str) -> Result<KeyAddress> {
        let address = self.address.child(relative);
        if address.is_root() {
            warn!(%address, "Refusing to delete a hive root");
            return Err(RegistryError::operation_failed(
                Operation::DeleteKey,
                &address,
                ReturnCode::ACCESS_DENIED,
            ));
        }

        let target = self.get_sub_key(relative)?;
        target.delete_children()?;
        self.delete_sub_key(relative)
    }

    fn delete_children(&self) -> Result<()> {
        for child in self.sub_keys() {
            let child = child?;

            let mut values = child.values();
            values.rewind()?;
            while values.valid() {
                child.delete_value(values.key()?)?;
                values.advance();
            }

            child.delete_children()?;
            self.delete_sub_key(child.name())?;
        }
        Ok(())
    }

    /// Reads a value.
    ///
    /// When `value_type` is `None` the type is looked up first with
    /// [`get_value_type`](Self::get_value_type), which enumerates every value
    /// of the key. Pass the type whenever it is known.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ValueNotFound`] if the type lookup finds no such value
    /// - [`RegistryError::OperationFailed`] if the provider getter fails
    /// - [`RegistryError::InvalidType`] for types that cannot be read
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn get_value(&self, name: &str, value_type: Option<ValueType>) -> Result<ValueData> {
        let value_type = match value_type {
            Some(value_type) => value_type,
            None => self.get_value_type(name)?,
        };
        value::read(self.provider, &self.address, name, value_type)
    }

    /// Looks up the type of a value by scanning the key's values.
    ///
    /// Costs one enumeration call and is linear in the number of values.
    /// Names are compared ASCII case-insensitively. Results are never cached.
    pub fn get_value_type(&self, name: &str) -> Result<ValueType> {
        let mut values = self.values();
        values.rewind()?;
        while values.valid() {
            if values.key()?.eq_ignore_ascii_case(name) {
                return values.current_type();
            }
            values.advance();
        }
        Err(RegistryError::value_not_found(name, &self.address))
    }

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidType`] if `value` cannot be written as
    ///   `value_type`, or the type is not writable; no provider call is made
    /// - [`RegistryError::OperationFailed`] if the provider setter fails
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wmi_registry::{MemoryProvider, Registry, ValueType};
    ///
    /// # fn main() -> wmi_registry::Result<()> {
    /// let registry = Registry::new(MemoryProvider::new());
    /// let key = registry.current_user().create_sub_key(r"Software\Example")?;
    /// key.set_value("Count", 3u32, ValueType::Dword)?;
    /// key.set_value("Paths", vec!["a", "b"], ValueType::MultiString)?;
    /// assert_eq!(key.get_value("Count", None)?.as_u32(), Some(3));
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, value), fields(key = %self.address))]
    pub fn set_value(
        &self,
        name: &str,
        value: impl Into<ValueInput>,
        value_type: ValueType,
    ) -> Result<()> {
        value::write(self.provider, &self.address, name, value.into(), value_type)?;
        info!(value_name = name, %value_type, "Set value");
        Ok(())
    }

    /// Deletes a value.
    ///
    /// Only when the delete fails is the value probed again, to report
    /// [`RegistryError::ValueNotFound`] when the provider says it is absent
    /// and [`RegistryError::OperationFailed`] otherwise.
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn delete_value(&self, name: &str) -> Result<()> {
        let hive = self.address.hive();
        let path = self.address.path();
        let status = self.provider.delete_value(hive, &path, name);
        if status.is_success() {
            info!(value_name = name, "Deleted value");
            return Ok(());
        }

        let probe = self.provider.get_string_value(hive, &path, name);
        debug!(
            delete_code = %status.code,
            probe_code = %probe.code,
            "DeleteValue failed, probed value"
        );
        if probe.code == ReturnCode::NOT_FOUND {
            return Err(RegistryError::value_not_found(name, &self.address));
        }
        warn!(code = %status.code, "DeleteValue failed");
        Err(RegistryError::operation_failed(
            Operation::DeleteValue,
            format!("value '{}' in {}", name, self.address),
            status.code,
        ))
    }

    /// Exports the key at `relative` and everything below it.
    ///
    /// Read-only. Values are included only when `include_values` is set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyNotFound`] if the key does not exist, or
    /// the first error raised while walking it.
    #[instrument(skip(self), fields(key = %self.address))]
    pub fn get_sub_key_recursive(&self, relative: &str, include_values: bool) -> Result<KeyTree> {
        let target = self.get_sub_key(relative)?;
        KeyTree::build(&target, include_values)
    }

    /// Returns a cursor over the immediate subkeys. Nothing is queried until
    /// it is rewound or iterated.
    pub fn sub_keys(&self) -> SubKeys<'a> {
        SubKeys::new(self.clone())
    }

    /// Returns a cursor over the values. Nothing is queried until it is
    /// rewound or iterated.
    pub fn values(&self) -> Values<'a> {
        Values::new(self.clone())
    }
}

impl fmt::Debug for RegistryKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RegistryKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.address, f)
    }
}

impl PartialEq for RegistryKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}
