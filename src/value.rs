//! Registry value types and the codec between them and provider calls.
//!
//! Reads pick the provider getter matching the value type and normalize its
//! output. Writes coerce a [`ValueInput`] into the shape the matching setter
//! expects, or fail with [`RegistryError::InvalidType`] before any call.

use crate::address::KeyAddress;
use crate::error::{RegistryError, Result};
use crate::provider::{Operation, RegistryProvider, Reply};
use std::fmt;
use tracing::{debug, warn};

/// Registry value data types.
///
/// The numeric tags are the platform's `REG_*` constants. Tags 0, 5, 6, 8,
/// 9 and 10 belong to types this crate does not read or write; they surface
/// as [`ValueType::Unknown`] during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// String (`REG_SZ`).
    String,

    /// String with environment variable references (`REG_EXPAND_SZ`).
    ExpandString,

    /// Binary data (`REG_BINARY`).
    Binary,

    /// 32-bit unsigned integer (`REG_DWORD`).
    Dword,

    /// Sequence of strings (`REG_MULTI_SZ`).
    MultiString,

    /// 64-bit unsigned integer (`REG_QWORD`). Read-only.
    Qword,

    /// Any other type tag, kept as reported.
    Unknown(u32),
}

impl ValueType {
    /// Maps a numeric tag to a value type.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            7 => ValueType::MultiString,
            11 => ValueType::Qword,
            other => ValueType::Unknown(other),
        }
    }

    /// Returns the numeric tag.
    pub fn id(self) -> u32 {
        match self {
            ValueType::String => 1,
            ValueType::ExpandString => 2,
            ValueType::Binary => 3,
            ValueType::Dword => 4,
            ValueType::MultiString => 7,
            ValueType::Qword => 11,
            ValueType::Unknown(other) => other,
        }
    }

    /// Returns the name of this value type.
    pub fn name(&self) -> String {
        match self {
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }

    /// Returns true if values of this type can be written.
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            ValueType::String
                | ValueType::ExpandString
                | ValueType::Binary
                | ValueType::Dword
                | ValueType::MultiString
        )
    }
}

impl From<u32> for ValueType {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ValueType {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Normalized value data, as read from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ValueData {
    /// String value.
    String(String),

    /// Expandable string value, already expanded by the provider.
    ExpandString(String),

    /// Binary data.
    Binary(Vec<u8>),

    /// 32-bit integer.
    Dword(u32),

    /// 64-bit integer as decimal text, the form the provider returns it in.
    Qword(String),

    /// Multiple strings.
    MultiString(Vec<String>),
}

impl ValueData {
    /// Returns the type this data was read as.
    pub fn value_type(&self) -> ValueType {
        match self {
            ValueData::String(_) => ValueType::String,
            ValueData::ExpandString(_) => ValueType::ExpandString,
            ValueData::Binary(_) => ValueType::Binary,
            ValueData::Dword(_) => ValueType::Dword,
            ValueData::Qword(_) => ValueType::Qword,
            ValueData::MultiString(_) => ValueType::MultiString,
        }
    }

    /// Returns the text of a string or QWORD value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueData::String(s) | ValueData::ExpandString(s) | ValueData::Qword(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes of a binary value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ValueData::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Returns a DWORD value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ValueData::Dword(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns a DWORD or QWORD value as a native integer.
    ///
    /// QWORD text that does not parse as a `u64` yields `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ValueData::Dword(d) => Some(u64::from(*d)),
            ValueData::Qword(q) => q.parse().ok(),
            _ => None,
        }
    }

    /// Returns the strings of a multi-string value.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ValueData::MultiString(strings) => Some(strings),
            _ => None,
        }
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueData::String(s) | ValueData::ExpandString(s) => f.write_str(s),
            ValueData::Binary(b) => f.write_str(&hex::encode_upper(b)),
            ValueData::Dword(d) => write!(f, "{} (0x{:08X})", d, d),
            ValueData::Qword(q) => f.write_str(q),
            ValueData::MultiString(strings) => f.write_str(&strings.join(", ")),
        }
    }
}

/// A value supplied by the caller for writing.
///
/// The declared [`ValueType`] decides which shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueInput {
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// An unsigned integer.
    Integer(u64),
    /// A sequence of strings.
    List(Vec<String>),
}

/// Provider-ready form of a [`ValueInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Coerced {
    Text(String),
    Bytes(Vec<u8>),
    Dword(u32),
    List(Vec<String>),
}

impl ValueInput {
    fn shape(&self) -> &'static str {
        match self {
            ValueInput::Text(_) => "text",
            ValueInput::Bytes(_) => "bytes",
            ValueInput::Integer(_) => "integer",
            ValueInput::List(_) => "string list",
        }
    }

    /// Converts the input into the form the setter for `value_type` takes.
    ///
    /// - `String`/`ExpandString`: text, or an integer rendered in decimal.
    /// - `Binary`: bytes, or text exploded into its UTF-8 bytes.
    /// - `Dword`: an integer or decimal text within `u32` range.
    /// - `MultiString`: a string list only.
    ///
    /// `Qword` and unknown types are never writable.
    pub(crate) fn coerce(self, value_type: ValueType) -> Result<Coerced> {
        if !value_type.is_writable() {
            return Err(RegistryError::invalid_type(format!(
                "{} values cannot be written",
                value_type
            )));
        }

        let shape = self.shape();
        let mismatch = || {
            RegistryError::invalid_type(format!("cannot write {} as {}", shape, value_type))
        };

        match (value_type, self) {
            (ValueType::String | ValueType::ExpandString, ValueInput::Text(s)) => {
                Ok(Coerced::Text(s))
            }
            (ValueType::String | ValueType::ExpandString, ValueInput::Integer(i)) => {
                Ok(Coerced::Text(i.to_string()))
            }
            (ValueType::Binary, ValueInput::Bytes(b)) => Ok(Coerced::Bytes(b)),
            (ValueType::Binary, ValueInput::Text(s)) => Ok(Coerced::Bytes(s.into_bytes())),
            (ValueType::Dword, ValueInput::Integer(i)) => {
                u32::try_from(i).map(Coerced::Dword).map_err(|_| mismatch())
            }
            (ValueType::Dword, ValueInput::Text(s)) => {
                s.trim().parse::<u32>().map(Coerced::Dword).map_err(|_| mismatch())
            }
            (ValueType::MultiString, ValueInput::List(strings)) => Ok(Coerced::List(strings)),
            _ => Err(mismatch()),
        }
    }
}

impl From<&str> for ValueInput {
    fn from(value: &str) -> Self {
        ValueInput::Text(value.to_string())
    }
}

impl From<String> for ValueInput {
    fn from(value: String) -> Self {
        ValueInput::Text(value)
    }
}

impl From<Vec<u8>> for ValueInput {
    fn from(value: Vec<u8>) -> Self {
        ValueInput::Bytes(value)
    }
}

impl From<&[u8]> for ValueInput {
    fn from(value: &[u8]) -> Self {
        ValueInput::Bytes(value.to_vec())
    }
}

impl From<u32> for ValueInput {
    fn from(value: u32) -> Self {
        ValueInput::Integer(u64::from(value))
    }
}

impl From<u64> for ValueInput {
    fn from(value: u64) -> Self {
        ValueInput::Integer(value)
    }
}

impl From<Vec<String>> for ValueInput {
    fn from(value: Vec<String>) -> Self {
        ValueInput::List(value)
    }
}

impl From<Vec<&str>> for ValueInput {
    fn from(value: Vec<&str>) -> Self {
        ValueInput::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<ValueData> for ValueInput {
    /// Turns read data back into writable input. QWORD text becomes text,
    /// which only a string type accepts.
    fn from(value: ValueData) -> Self {
        match value {
            ValueData::String(s) | ValueData::ExpandString(s) | ValueData::Qword(s) => {
                ValueInput::Text(s)
            }
            ValueData::Binary(b) => ValueInput::Bytes(b),
            ValueData::Dword(d) => ValueInput::Integer(u64::from(d)),
            ValueData::MultiString(strings) => ValueInput::List(strings),
        }
    }
}

/// A named, typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValueDescriptor {
    /// Value name.
    pub name: String,
    /// Value type.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub value_type: ValueType,
    /// Normalized data.
    pub data: ValueData,
}

fn target(address: &KeyAddress, name: &str) -> String {
    format!("value '{}' in {}", name, address)
}

fn checked<T>(
    reply: Reply<T>,
    operation: Operation,
    address: &KeyAddress,
    name: &str,
) -> Result<T> {
    if reply.is_success() {
        Ok(reply.output)
    } else {
        warn!(
            %operation,
            code = %reply.code,
            key = %address,
            value_name = name,
            "Provider call failed"
        );
        Err(RegistryError::operation_failed(operation, target(address, name), reply.code))
    }
}

/// Reads a value with the getter matching `value_type` and normalizes it.
pub(crate) fn read(
    provider: &dyn RegistryProvider,
    address: &KeyAddress,
    name: &str,
    value_type: ValueType,
) -> Result<ValueData> {
    let hive = address.hive();
    let path = address.path();
    debug!(key = %address, value_name = name, %value_type, "Reading value");

    let data = match value_type {
        ValueType::String => {
            let reply = provider.get_string_value(hive, &path, name);
            ValueData::String(
                checked(reply, Operation::GetStringValue, address, name)?.unwrap_or_default(),
            )
        }
        ValueType::ExpandString => {
            let reply = provider.get_expanded_string_value(hive, &path, name);
            ValueData::ExpandString(
                checked(reply, Operation::GetExpandedStringValue, address, name)?
                    .unwrap_or_default(),
            )
        }
        ValueType::Binary => {
            let reply = provider.get_binary_value(hive, &path, name);
            ValueData::Binary(
                checked(reply, Operation::GetBinaryValue, address, name)?.unwrap_or_default(),
            )
        }
        ValueType::Dword => {
            let reply = provider.get_dword_value(hive, &path, name);
            ValueData::Dword(checked(reply, Operation::GetDWORDValue, address, name)?.unwrap_or(0))
        }
        ValueType::Qword => {
            let reply = provider.get_qword_value(hive, &path, name);
            ValueData::Qword(
                checked(reply, Operation::GetQWORDValue, address, name)?
                    .unwrap_or_else(|| "0".to_string()),
            )
        }
        ValueType::MultiString => {
            let reply = provider.get_multi_string_value(hive, &path, name);
            ValueData::MultiString(
                checked(reply, Operation::GetMultiStringValue, address, name)?.unwrap_or_default(),
            )
        }
        ValueType::Unknown(id) => {
            return Err(RegistryError::invalid_type(format!(
                "cannot read value '{}' of unsupported type tag {}",
                name, id
            )))
        }
    };

    Ok(data)
}

/// Coerces `input` for `value_type` and writes it with the matching setter.
pub(crate) fn write(
    provider: &dyn RegistryProvider,
    address: &KeyAddress,
    name: &str,
    input: ValueInput,
    value_type: ValueType,
) -> Result<()> {
    let coerced = input.coerce(value_type)?;
    let hive = address.hive();
    let path = address.path();
    debug!(key = %address, value_name = name, %value_type, "Writing value");

    let (operation, status) = match (value_type, coerced) {
        (ValueType::ExpandString, Coerced::Text(s)) => (
            Operation::SetExpandedStringValue,
            provider.set_expanded_string_value(hive, &path, name, &s),
        ),
        (_, Coerced::Text(s)) => (
            Operation::SetStringValue,
            provider.set_string_value(hive, &path, name, &s),
        ),
        (_, Coerced::Bytes(b)) => (
            Operation::SetBinaryValue,
            provider.set_binary_value(hive, &path, name, &b),
        ),
        (_, Coerced::Dword(d)) => (
            Operation::SetDWORDValue,
            provider.set_dword_value(hive, &path, name, d),
        ),
        (_, Coerced::List(strings)) => (
            Operation::SetMultiStringValue,
            provider.set_multi_string_value(hive, &path, name, &strings),
        ),
    };

    checked(status, operation, address, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_tags() {
        assert_eq!(ValueType::from_u32(1), ValueType::String);
        assert_eq!(ValueType::from_u32(2), ValueType::ExpandString);
        assert_eq!(ValueType::from_u32(3), ValueType::Binary);
        assert_eq!(ValueType::from_u32(4), ValueType::Dword);
        assert_eq!(ValueType::from_u32(7), ValueType::MultiString);
        assert_eq!(ValueType::from_u32(11), ValueType::Qword);
        for reserved in [0, 5, 6, 8, 9, 10] {
            assert_eq!(ValueType::from_u32(reserved), ValueType::Unknown(reserved));
            assert_eq!(ValueType::from_u32(reserved).id(), reserved);
        }
        assert_eq!(ValueType::Dword.name(), "REG_DWORD");
    }

    #[test]
    fn test_coerce_text_types() {
        assert_eq!(
            ValueInput::from("abc").coerce(ValueType::String).unwrap(),
            Coerced::Text("abc".to_string())
        );
        assert_eq!(
            ValueInput::from(42u32).coerce(ValueType::ExpandString).unwrap(),
            Coerced::Text("42".to_string())
        );
        assert!(ValueInput::from(vec!["a"]).coerce(ValueType::String).is_err());
    }

    #[test]
    fn test_coerce_binary_explodes_text() {
        assert_eq!(
            ValueInput::from("AB").coerce(ValueType::Binary).unwrap(),
            Coerced::Bytes(vec![0x41, 0x42])
        );
        assert_eq!(
            ValueInput::from(vec![1u8, 2, 255]).coerce(ValueType::Binary).unwrap(),
            Coerced::Bytes(vec![1, 2, 255])
        );
    }

    #[test]
    fn test_coerce_dword_range() {
        assert_eq!(
            ValueInput::from(250u32).coerce(ValueType::Dword).unwrap(),
            Coerced::Dword(250)
        );
        assert_eq!(
            ValueInput::from(" 17 ").coerce(ValueType::Dword).unwrap(),
            Coerced::Dword(17)
        );
        assert!(ValueInput::from(u64::MAX).coerce(ValueType::Dword).is_err());
        assert!(ValueInput::from("seventeen").coerce(ValueType::Dword).is_err());
    }

    #[test]
    fn test_coerce_rejections() {
        let err = ValueInput::from("a").coerce(ValueType::MultiString).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidType(_)));
        assert!(ValueInput::from(1u64).coerce(ValueType::Qword).is_err());
        assert!(ValueInput::from("x").coerce(ValueType::Unknown(6)).is_err());
    }

    #[test]
    fn test_unwritable_types_reject_every_shape() {
        let inputs = [
            ValueInput::from("1"),
            ValueInput::from(vec![1u8]),
            ValueInput::from(1u64),
            ValueInput::from(vec!["1"]),
        ];
        for value_type in [ValueType::Qword, ValueType::Unknown(0), ValueType::Unknown(6)] {
            assert!(!value_type.is_writable());
            for input in inputs.clone() {
                let err = input.coerce(value_type).unwrap_err();
                assert_eq!(
                    err,
                    RegistryError::InvalidType(format!("{} values cannot be written", value_type))
                );
            }
        }
        assert!(ValueType::Dword.is_writable());
    }

    #[test]
    fn test_value_data_display() {
        assert_eq!(ValueData::Dword(250).to_string(), "250 (0x000000FA)");
        assert_eq!(ValueData::Binary(vec![0x01, 0xAB]).to_string(), "01AB");
        assert_eq!(
            ValueData::MultiString(vec!["a".into(), "b".into()]).to_string(),
            "a, b"
        );
    }

    #[test]
    fn test_value_data_accessors() {
        let qword = ValueData::Qword("18446744073709551615".to_string());
        assert_eq!(qword.as_u64(), Some(u64::MAX));
        assert_eq!(qword.value_type(), ValueType::Qword);
        assert_eq!(ValueData::Dword(5).as_u64(), Some(5));
        assert_eq!(ValueData::Binary(vec![9]).as_bytes(), Some(&[9u8][..]));
        assert_eq!(ValueData::String("s".into()).as_u32(), None);
    }
}
