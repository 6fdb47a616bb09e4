//! # WMI Registry
//!
//! Object-oriented access to the Windows Registry through the WMI
//! `StdRegProv` provider, locally or on a remote host.
//!
//! ## Features
//!
//! - **Typed provider calls**: one trait method per `StdRegProv` operation, with
//!   output parameters returned alongside the result code
//! - **Key addressing**: immutable hive + path values with parent/child navigation
//! - **Value codec**: `REG_SZ`, `REG_EXPAND_SZ`, `REG_BINARY`, `REG_DWORD`,
//!   `REG_MULTI_SZ` and `REG_QWORD` normalized into Rust types
//! - **Restartable cursors**: snapshot-based enumeration of subkeys and values
//! - **Subtree operations**: recursive delete and recursive export
//!
//! ## Architecture
//!
//! ```text
//! Registry<P>                     owns the provider handle
//!   └─ RegistryKey<'a>            KeyAddress + &'a dyn RegistryProvider
//!        ├─ value codec           get/set/delete values
//!        ├─ SubKeys<'a>           snapshot of EnumKey
//!        └─ Values<'a>            snapshot of EnumValues
//! ```
//!
//! Establishing the WMI connection (host, credentials, impersonation) is the
//! job of whatever produces the [`RegistryProvider`]. [`MemoryProvider`] is an
//! in-process implementation for tests and offline use.
//!
//! ## Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use wmi_registry::{MemoryProvider, Registry, ValueType};
//!
//! # fn main() -> wmi_registry::Result<()> {
//! let registry = Registry::new(MemoryProvider::new());
//!
//! let key = registry.local_machine().create_sub_key(r"Software\Vendor\App")?;
//! key.set_value("InstallDir", r"C:\App", ValueType::String)?;
//! key.set_value("Retries", 3u32, ValueType::Dword)?;
//!
//! for value in key.values() {
//!     let value = value?;
//!     println!("  {} ({}) = {}", value.name, value.value_type, value.data);
//! }
//!
//! let vendor = key.get_parent_key();
//! for subkey in vendor.sub_keys() {
//!     println!("  Subkey: {}", subkey?);
//! }
//!
//! registry.local_machine().delete_sub_key_recursive(r"Software\Vendor")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading Without Knowing the Type
//!
//! ```rust
//! use wmi_registry::{MemoryProvider, Registry, ValueData, ValueType};
//!
//! # fn main() -> wmi_registry::Result<()> {
//! let registry = Registry::new(MemoryProvider::new());
//! let key = registry.current_user().create_sub_key("Console")?;
//! key.set_value("FaceName", "Consolas", ValueType::String)?;
//!
//! // One extra enumeration call to find the type.
//! match key.get_value("FaceName", None)? {
//!     ValueData::String(s) => println!("String value: {}", s),
//!     ValueData::Dword(d) => println!("DWORD value: {}", d),
//!     _ => println!("Other type"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! - `REG_QWORD` values can be read but not written
//! - Multi-step operations are not atomic and are never rolled back
//! - Handles are single-threaded; serialize access to a shared provider

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod error;
pub mod export;
pub mod hive;
pub mod iter;
pub mod key;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod value;

// Python bindings (only compiled when python feature is enabled)
#[cfg(feature = "python")]
pub mod python;

// Re-export main types for convenience
pub use address::{KeyAddress, SEPARATOR};
pub use error::{RegistryError, Result};
pub use export::KeyTree;
pub use hive::Hive;
pub use iter::{SubKeys, Values};
pub use key::RegistryKey;
pub use memory::MemoryProvider;
pub use provider::{Operation, RegistryProvider, Reply, ReturnCode, Status};
pub use registry::Registry;
pub use value::{ValueData, ValueDescriptor, ValueInput, ValueType};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
