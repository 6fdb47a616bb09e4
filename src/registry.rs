//! Entry point: a provider handle and the five hive roots.

use crate::address::KeyAddress;
use crate::error::Result;
use crate::hive::Hive;
use crate::key::RegistryKey;
use crate::provider::RegistryProvider;
use tracing::{debug, instrument};

/// A connected registry.
///
/// Owns the provider handle produced by the connection step. Keys and
/// iterators borrow the handle, so they cannot outlive the `Registry`.
///
/// # Examples
///
/// ```rust
/// use wmi_registry::{MemoryProvider, Registry, RegistryError, ValueType};
///
/// let registry = Registry::new(MemoryProvider::new());
/// let key = registry.local_machine().create_sub_key(r"Software\MyKey\MySubKey").unwrap();
/// key.set_value("Example", 250u32, ValueType::Dword).unwrap();
/// assert_eq!(key.get_value("Example", Some(ValueType::Dword)).unwrap().as_u32(), Some(250));
///
/// assert!(matches!(
///     registry.open(r"HKLM\Software\Missing"),
///     Err(RegistryError::KeyNotFound { .. })
/// ));
/// ```
#[derive(Debug)]
pub struct Registry<P> {
    provider: P,
}

impl<P: RegistryProvider> Registry<P> {
    /// Wraps a connected provider.
    pub fn new(provider: P) -> Self {
        debug!("Registry handle created");
        Self { provider }
    }

    /// Returns the provider handle.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Releases the provider handle.
    pub fn into_inner(self) -> P {
        self.provider
    }

    /// Returns the root key of a hive. No provider call is made.
    pub fn hive(&self, hive: Hive) -> RegistryKey<'_> {
        RegistryKey::new(&self.provider, KeyAddress::root(hive))
    }

    /// Returns the root of `HKEY_CLASSES_ROOT`.
    pub fn classes_root(&self) -> RegistryKey<'_> {
        self.hive(Hive::ClassesRoot)
    }

    /// Returns the root of `HKEY_CURRENT_USER`.
    pub fn current_user(&self) -> RegistryKey<'_> {
        self.hive(Hive::CurrentUser)
    }

    /// Returns the root of `HKEY_LOCAL_MACHINE`.
    pub fn local_machine(&self) -> RegistryKey<'_> {
        self.hive(Hive::LocalMachine)
    }

    /// Returns the root of `HKEY_USERS`.
    pub fn users(&self) -> RegistryKey<'_> {
        self.hive(Hive::Users)
    }

    /// Returns the root of `HKEY_CURRENT_CONFIG`.
    pub fn current_config(&self) -> RegistryKey<'_> {
        self.hive(Hive::CurrentConfig)
    }

    /// Opens an existing key from its display form, such as
    /// `HKLM\Software\Vendor` or `HKEY_CURRENT_USER\Console`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidPath`](crate::RegistryError::InvalidPath) if the hive prefix
    ///   is unknown
    /// - [`RegistryError::KeyNotFound`](crate::RegistryError::KeyNotFound) if the key does not
    ///   exist
    #[instrument(skip(self))]
    pub fn open(&self, path: &str) -> Result<RegistryKey<'_>> {
        let address: KeyAddress = path.parse()?;
        self.hive(address.hive()).get_sub_key(&address.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProvider;

    #[test]
    fn test_hive_accessors() {
        let registry = Registry::new(MemoryProvider::new());
        let roots = [
            (registry.classes_root(), Hive::ClassesRoot),
            (registry.current_user(), Hive::CurrentUser),
            (registry.local_machine(), Hive::LocalMachine),
            (registry.users(), Hive::Users),
            (registry.current_config(), Hive::CurrentConfig),
        ];
        for (key, hive) in roots {
            assert_eq!(key.hive(), hive);
            assert_eq!(key.path(), "");
            assert!(key.address().is_root());
        }
    }

    #[test]
    fn test_open_root_and_nested() {
        let registry = Registry::new(MemoryProvider::new());
        registry.users().create_sub_key(r".DEFAULT\Console").unwrap();
        assert!(registry.open("HKU").unwrap().address().is_root());
        let console = registry.open(r"HKEY_USERS\.DEFAULT\Console").unwrap();
        assert_eq!(console.name(), "Console");
        assert!(registry.open(r"HKZZ\x").is_err());
    }
}
