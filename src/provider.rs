//! The registry provider handle.
//!
//! [`RegistryProvider`] has one method per StdRegProv operation. Output
//! parameters come back as part of the [`Reply`] instead of being written
//! through references. A non-zero [`ReturnCode`] means the operation failed;
//! its meaning beyond that is defined by the provider.

use crate::hive::Hive;
use std::fmt;

/// Raw result code returned by every provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReturnCode(pub u32);

impl ReturnCode {
    /// The operation completed.
    pub const SUCCESS: ReturnCode = ReturnCode(0);

    /// The named value is absent. Used to tell "already gone" apart from
    /// other failures when a delete fails.
    pub const NOT_FOUND: ReturnCode = ReturnCode(1);

    /// The key is absent (`ERROR_FILE_NOT_FOUND`).
    pub const FILE_NOT_FOUND: ReturnCode = ReturnCode(2);

    /// Access denied, also reported when deleting a key that still has subkeys.
    pub const ACCESS_DENIED: ReturnCode = ReturnCode(5);

    /// `WBEM_E_FAILED`: the call did not reach the registry.
    pub const WBEM_FAILED: ReturnCode = ReturnCode(0x8004_1001);

    /// `WBEM_E_TYPE_MISMATCH`: the value exists with a different type.
    pub const TYPE_MISMATCH: ReturnCode = ReturnCode(0x8004_1005);

    /// Returns true if the code signals success.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0xFFFF {
            write!(f, "{:#010x}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Result code plus the operation's output parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<T> {
    /// Provider result code.
    pub code: ReturnCode,
    /// Output parameters. Only meaningful when `code` is success.
    pub output: T,
}

impl<T> Reply<T> {
    /// Creates a successful reply.
    pub fn ok(output: T) -> Self {
        Self {
            code: ReturnCode::SUCCESS,
            output,
        }
    }

    /// Returns true if the code signals success.
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

impl<T: Default> Reply<T> {
    /// Creates a failed reply with default outputs.
    pub fn failed(code: ReturnCode) -> Self {
        Self {
            code,
            output: T::default(),
        }
    }
}

/// Reply of an operation without output parameters.
pub type Status = Reply<()>;

/// Names of the provider operations, as StdRegProv spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum Operation {
    EnumKey,
    EnumValues,
    CreateKey,
    DeleteKey,
    DeleteValue,
    GetStringValue,
    GetExpandedStringValue,
    GetBinaryValue,
    GetDWORDValue,
    GetQWORDValue,
    GetMultiStringValue,
    SetStringValue,
    SetExpandedStringValue,
    SetBinaryValue,
    SetDWORDValue,
    SetMultiStringValue,
}

impl Operation {
    /// Returns the StdRegProv method name.
    pub fn name(self) -> &'static str {
        match self {
            Operation::EnumKey => "EnumKey",
            Operation::EnumValues => "EnumValues",
            Operation::CreateKey => "CreateKey",
            Operation::DeleteKey => "DeleteKey",
            Operation::DeleteValue => "DeleteValue",
            Operation::GetStringValue => "GetStringValue",
            Operation::GetExpandedStringValue => "GetExpandedStringValue",
            Operation::GetBinaryValue => "GetBinaryValue",
            Operation::GetDWORDValue => "GetDWORDValue",
            Operation::GetQWORDValue => "GetQWORDValue",
            Operation::GetMultiStringValue => "GetMultiStringValue",
            Operation::SetStringValue => "SetStringValue",
            Operation::SetExpandedStringValue => "SetExpandedStringValue",
            Operation::SetBinaryValue => "SetBinaryValue",
            Operation::SetDWORDValue => "SetDWORDValue",
            Operation::SetMultiStringValue => "SetMultiStringValue",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A connected registry provider.
///
/// Paths are qualified paths relative to the hive root, without a leading
/// separator; the empty path is the hive root itself. Implementations must
/// reach the live registry on every call.
///
/// The handle is shared by reference between every key and iterator derived
/// from it. Nothing here serializes calls, so a provider that is not
/// reentrant must be used from one thread.
pub trait RegistryProvider {
    /// Lists the immediate subkey names of a key.
    fn enum_key(&self, hive: Hive, path: &str) -> Reply<Option<Vec<String>>>;

    /// Lists value names and their parallel type tags.
    fn enum_values(&self, hive: Hive, path: &str) -> Reply<(Option<Vec<String>>, Option<Vec<u32>>)>;

    /// Creates a key and any missing intermediate keys.
    fn create_key(&self, hive: Hive, path: &str) -> Status;

    /// Deletes a key that has no subkeys.
    fn delete_key(&self, hive: Hive, path: &str) -> Status;

    /// Deletes a named value.
    fn delete_value(&self, hive: Hive, path: &str, name: &str) -> Status;

    /// Reads a `REG_SZ` value.
    fn get_string_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<String>>;

    /// Reads a `REG_EXPAND_SZ` value, expanded by the provider.
    fn get_expanded_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<String>>;

    /// Reads a `REG_BINARY` value.
    fn get_binary_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<Vec<u8>>>;

    /// Reads a `REG_DWORD` value.
    fn get_dword_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<u32>>;

    /// Reads a `REG_QWORD` value as decimal text.
    fn get_qword_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<String>>;

    /// Reads a `REG_MULTI_SZ` value.
    fn get_multi_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<Vec<String>>>;

    /// Writes a `REG_SZ` value.
    fn set_string_value(&self, hive: Hive, path: &str, name: &str, value: &str) -> Status;

    /// Writes a `REG_EXPAND_SZ` value.
    fn set_expanded_string_value(&self, hive: Hive, path: &str, name: &str, value: &str) -> Status;

    /// Writes a `REG_BINARY` value.
    fn set_binary_value(&self, hive: Hive, path: &str, name: &str, value: &[u8]) -> Status;

    /// Writes a `REG_DWORD` value.
    fn set_dword_value(&self, hive: Hive, path: &str, name: &str, value: u32) -> Status;

    /// Writes a `REG_MULTI_SZ` value.
    fn set_multi_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
        value: &[String],
    ) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_display() {
        assert_eq!(ReturnCode(2).to_string(), "2");
        assert_eq!(ReturnCode::WBEM_FAILED.to_string(), "0x80041001");
        assert!(ReturnCode::SUCCESS.is_success());
        assert!(!ReturnCode::NOT_FOUND.is_success());
    }

    #[test]
    fn test_reply_constructors() {
        let reply: Reply<Option<u32>> = Reply::failed(ReturnCode::FILE_NOT_FOUND);
        assert!(!reply.is_success());
        assert_eq!(reply.output, None);
        assert_eq!(Reply::ok(7u32).output, 7);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::GetDWORDValue.to_string(), "GetDWORDValue");
        assert_eq!(Operation::EnumValues.name(), "EnumValues");
    }
}
