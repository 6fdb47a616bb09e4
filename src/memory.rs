//! An in-process registry provider.
//!
//! [`MemoryProvider`] keeps one key tree per hive and answers every
//! [`RegistryProvider`] call the way StdRegProv does: names match
//! case-insensitively but keep their original case, enumeration returns
//! insertion order, and failures come back as result codes. It backs the
//! test suite and lets code written against the provider trait run without
//! a Windows host.

use crate::address::split_path;
use crate::error::{RegistryError, Result};
use crate::hive::Hive;
use crate::provider::{Operation, RegistryProvider, Reply, ReturnCode, Status};
use crate::value::{ValueData, ValueType};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
enum Stored {
    String(String),
    ExpandString(String),
    Binary(Vec<u8>),
    Dword(u32),
    Qword(u64),
    MultiString(Vec<String>),
    Unsupported(u32),
}

impl Stored {
    fn type_id(&self) -> u32 {
        match self {
            Stored::String(_) => ValueType::String.id(),
            Stored::ExpandString(_) => ValueType::ExpandString.id(),
            Stored::Binary(_) => ValueType::Binary.id(),
            Stored::Dword(_) => ValueType::Dword.id(),
            Stored::Qword(_) => ValueType::Qword.id(),
            Stored::MultiString(_) => ValueType::MultiString.id(),
            Stored::Unsupported(id) => *id,
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    values: Vec<(String, Stored)>,
    children: Vec<Node>,
}

impl Node {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn find(&self, path: &str) -> Option<&Node> {
        split_path(path).try_fold(self, |node, segment| {
            node.children.iter().find(|c| c.name.eq_ignore_ascii_case(segment))
        })
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut Node> {
        split_path(path).try_fold(self, |node, segment| {
            node.children
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(segment))
        })
    }

    fn value(&self, name: &str) -> Option<&Stored> {
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn put(&mut self, name: &str, value: Stored) {
        match self.values.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }
}

/// Registry provider backed by in-memory key trees.
///
/// Uses interior mutability and is meant for single-threaded use, like any
/// provider handle.
///
/// # Examples
///
/// ```rust
/// use wmi_registry::{Hive, MemoryProvider, Registry, ValueData};
///
/// let provider = MemoryProvider::new();
/// let big = ValueData::Qword(u64::MAX.to_string());
/// provider.insert(Hive::LocalMachine, r"Software\Vendor", "Big", big).unwrap();
///
/// let registry = Registry::new(provider);
/// let key = registry.open(r"HKLM\Software\Vendor").unwrap();
/// assert_eq!(key.get_value("Big", None).unwrap().as_u64(), Some(u64::MAX));
/// ```
#[derive(Debug)]
pub struct MemoryProvider {
    roots: RefCell<BTreeMap<Hive, Node>>,
    failures: RefCell<HashMap<Operation, ReturnCode>>,
    calls: Cell<usize>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Creates a provider with five empty hives.
    pub fn new() -> Self {
        Self {
            roots: RefCell::new(Hive::ALL.into_iter().map(|h| (h, Node::default())).collect()),
            failures: RefCell::new(HashMap::new()),
            calls: Cell::new(0),
        }
    }

    /// Makes the next call of `operation` return `code` without touching the
    /// tree.
    pub fn fail_next(&self, operation: Operation, code: ReturnCode) {
        self.failures.borrow_mut().insert(operation, code);
    }

    /// Returns the number of provider calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    /// Stores a value directly, creating the key path as needed.
    ///
    /// Unlike the provider setters this accepts every readable type,
    /// including `REG_QWORD`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidType`] if QWORD text is not a decimal
    /// `u64`. Nothing is stored in that case.
    pub fn insert(&self, hive: Hive, path: &str, name: &str, data: ValueData) -> Result<()> {
        let stored = match data {
            ValueData::String(s) => Stored::String(s),
            ValueData::ExpandString(s) => Stored::ExpandString(s),
            ValueData::Binary(b) => Stored::Binary(b),
            ValueData::Dword(d) => Stored::Dword(d),
            ValueData::Qword(q) => match q.trim().parse::<u64>() {
                Ok(number) => Stored::Qword(number),
                Err(_) => {
                    return Err(RegistryError::invalid_type(format!(
                        "REG_QWORD text '{}' is not a u64",
                        q
                    )))
                }
            },
            ValueData::MultiString(m) => Stored::MultiString(m),
        };
        self.insert_stored(hive, path, name, stored);
        Ok(())
    }

    /// Stores a value of a type this crate cannot read, such as `REG_NONE`.
    pub fn insert_unsupported(&self, hive: Hive, path: &str, name: &str, type_id: u32) {
        self.insert_stored(hive, path, name, Stored::Unsupported(type_id));
    }

    fn insert_stored(&self, hive: Hive, path: &str, name: &str, stored: Stored) {
        let mut roots = self.roots.borrow_mut();
        if let Some(root) = roots.get_mut(&hive) {
            create_path(root, path).put(name, stored);
        }
    }

    /// Counts the call and returns an injected failure, if one is pending.
    fn begin(&self, operation: Operation, hive: Hive, path: &str) -> Option<ReturnCode> {
        self.calls.set(self.calls.get() + 1);
        trace!(%operation, %hive, path, "Memory provider call");
        self.failures.borrow_mut().remove(&operation)
    }

    fn with_node<T: Default>(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        f: impl FnOnce(&Node) -> Reply<T>,
    ) -> Reply<T> {
        if let Some(code) = self.begin(operation, hive, path) {
            return Reply::failed(code);
        }
        let roots = self.roots.borrow();
        match roots.get(&hive).and_then(|root| root.find(path)) {
            Some(node) => f(node),
            None => Reply::failed(ReturnCode::FILE_NOT_FOUND),
        }
    }

    fn with_node_mut(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        f: impl FnOnce(&mut Node) -> Status,
    ) -> Status {
        if let Some(code) = self.begin(operation, hive, path) {
            return Reply::failed(code);
        }
        let mut roots = self.roots.borrow_mut();
        match roots.get_mut(&hive).and_then(|root| root.find_mut(path)) {
            Some(node) => f(node),
            None => Reply::failed(ReturnCode::FILE_NOT_FOUND),
        }
    }

    fn get<T>(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        name: &str,
        extract: impl FnOnce(&Stored) -> Option<T>,
    ) -> Reply<Option<T>> {
        self.with_node(operation, hive, path, |node| match node.value(name) {
            None => Reply::failed(ReturnCode::NOT_FOUND),
            Some(stored) => match extract(stored) {
                Some(output) => Reply::ok(Some(output)),
                None => Reply::failed(ReturnCode::TYPE_MISMATCH),
            },
        })
    }

    fn set(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        name: &str,
        value: Stored,
    ) -> Status {
        self.with_node_mut(operation, hive, path, |node| {
            node.put(name, value);
            Reply::ok(())
        })
    }
}

fn create_path<'n>(root: &'n mut Node, path: &str) -> &'n mut Node {
    let mut node = root;
    for segment in split_path(path) {
        let index = match node
            .children
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(segment))
        {
            Some(index) => index,
            None => {
                node.children.push(Node::named(segment));
                node.children.len() - 1
            }
        };
        node = &mut node.children[index];
    }
    node
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

impl RegistryProvider for MemoryProvider {
    fn enum_key(&self, hive: Hive, path: &str) -> Reply<Option<Vec<String>>> {
        self.with_node(Operation::EnumKey, hive, path, |node| {
            Reply::ok(non_empty(node.children.iter().map(|c| c.name.clone()).collect()))
        })
    }

    fn enum_values(
        &self,
        hive: Hive,
        path: &str,
    ) -> Reply<(Option<Vec<String>>, Option<Vec<u32>>)> {
        self.with_node(Operation::EnumValues, hive, path, |node| {
            let names: Vec<String> = node.values.iter().map(|(n, _)| n.clone()).collect();
            let types: Vec<u32> = node.values.iter().map(|(_, v)| v.type_id()).collect();
            Reply::ok((non_empty(names), non_empty(types)))
        })
    }

    fn create_key(&self, hive: Hive, path: &str) -> Status {
        if let Some(code) = self.begin(Operation::CreateKey, hive, path) {
            return Reply::failed(code);
        }
        let mut roots = self.roots.borrow_mut();
        match roots.get_mut(&hive) {
            Some(root) => {
                create_path(root, path);
                Reply::ok(())
            }
            None => Reply::failed(ReturnCode::FILE_NOT_FOUND),
        }
    }

    fn delete_key(&self, hive: Hive, path: &str) -> Status {
        if let Some(code) = self.begin(Operation::DeleteKey, hive, path) {
            return Reply::failed(code);
        }
        let segments: Vec<&str> = split_path(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Reply::failed(ReturnCode::ACCESS_DENIED);
        };

        let mut roots = self.roots.borrow_mut();
        let parent = roots
            .get_mut(&hive)
            .and_then(|root| root.find_mut(&parents.join("\\")));
        let Some(parent) = parent else {
            return Reply::failed(ReturnCode::FILE_NOT_FOUND);
        };
        let Some(index) = parent
            .children
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(last))
        else {
            return Reply::failed(ReturnCode::FILE_NOT_FOUND);
        };
        if !parent.children[index].children.is_empty() {
            return Reply::failed(ReturnCode::ACCESS_DENIED);
        }
        parent.children.remove(index);
        Reply::ok(())
    }

    fn delete_value(&self, hive: Hive, path: &str, name: &str) -> Status {
        self.with_node_mut(Operation::DeleteValue, hive, path, |node| {
            match node.values.iter().position(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(index) => {
                    node.values.remove(index);
                    Reply::ok(())
                }
                None => Reply::failed(ReturnCode::FILE_NOT_FOUND),
            }
        })
    }

    fn get_string_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<String>> {
        self.get(Operation::GetStringValue, hive, path, name, |v| match v {
            Stored::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn get_expanded_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<String>> {
        self.get(Operation::GetExpandedStringValue, hive, path, name, |v| match v {
            Stored::ExpandString(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn get_binary_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<Vec<u8>>> {
        self.get(Operation::GetBinaryValue, hive, path, name, |v| match v {
            Stored::Binary(b) => Some(b.clone()),
            _ => None,
        })
    }

    fn get_dword_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<u32>> {
        self.get(Operation::GetDWORDValue, hive, path, name, |v| match v {
            Stored::Dword(d) => Some(*d),
            _ => None,
        })
    }

    fn get_qword_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<String>> {
        self.get(Operation::GetQWORDValue, hive, path, name, |v| match v {
            Stored::Qword(q) => Some(q.to_string()),
            _ => None,
        })
    }

    fn get_multi_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<Vec<String>>> {
        self.get(Operation::GetMultiStringValue, hive, path, name, |v| match v {
            Stored::MultiString(m) => Some(m.clone()),
            _ => None,
        })
    }

    fn set_string_value(&self, hive: Hive, path: &str, name: &str, value: &str) -> Status {
        self.set(Operation::SetStringValue, hive, path, name, Stored::String(value.to_string()))
    }

    fn set_expanded_string_value(&self, hive: Hive, path: &str, name: &str, value: &str) -> Status {
        self.set(
            Operation::SetExpandedStringValue,
            hive,
            path,
            name,
            Stored::ExpandString(value.to_string()),
        )
    }

    fn set_binary_value(&self, hive: Hive, path: &str, name: &str, value: &[u8]) -> Status {
        self.set(Operation::SetBinaryValue, hive, path, name, Stored::Binary(value.to_vec()))
    }

    fn set_dword_value(&self, hive: Hive, path: &str, name: &str, value: u32) -> Status {
        self.set(Operation::SetDWORDValue, hive, path, name, Stored::Dword(value))
    }

    fn set_multi_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
        value: &[String],
    ) -> Status {
        self.set(
            Operation::SetMultiStringValue,
            hive,
            path,
            name,
            Stored::MultiString(value.to_vec()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_enumerate_preserves_case_and_order() {
        let provider = MemoryProvider::new();
        assert!(provider.create_key(Hive::Users, r"S-1\Zeta").is_success());
        assert!(provider.create_key(Hive::Users, r"s-1\Alpha").is_success());

        let reply = provider.enum_key(Hive::Users, "S-1");
        assert!(reply.is_success());
        assert_eq!(reply.output.unwrap(), vec!["Zeta", "Alpha"]);
        assert_eq!(provider.enum_key(Hive::Users, "").output.unwrap(), vec!["S-1"]);
    }

    #[test]
    fn test_empty_key_enumerates_to_null_outputs() {
        let provider = MemoryProvider::new();
        provider.create_key(Hive::CurrentUser, "Empty");
        let keys = provider.enum_key(Hive::CurrentUser, "Empty");
        assert!(keys.is_success());
        assert_eq!(keys.output, None);
        let values = provider.enum_values(Hive::CurrentUser, "Empty");
        assert_eq!(values.output, (None, None));
    }

    #[test]
    fn test_missing_key_and_value_codes() {
        let provider = MemoryProvider::new();
        assert_eq!(
            provider.enum_key(Hive::LocalMachine, "Missing").code,
            ReturnCode::FILE_NOT_FOUND
        );
        provider.create_key(Hive::LocalMachine, "K");
        assert_eq!(
            provider.get_string_value(Hive::LocalMachine, "K", "v").code,
            ReturnCode::NOT_FOUND
        );
        provider.set_dword_value(Hive::LocalMachine, "K", "v", 1);
        assert_eq!(
            provider.get_string_value(Hive::LocalMachine, "K", "v").code,
            ReturnCode::TYPE_MISMATCH
        );
        assert_eq!(
            provider.set_dword_value(Hive::LocalMachine, "Missing", "v", 1).code,
            ReturnCode::FILE_NOT_FOUND
        );
    }

    #[test]
    fn test_delete_key_rules() {
        let provider = MemoryProvider::new();
        provider.create_key(Hive::LocalMachine, r"A\B");
        assert_eq!(provider.delete_key(Hive::LocalMachine, "A").code, ReturnCode::ACCESS_DENIED);
        assert!(provider.delete_key(Hive::LocalMachine, r"a\b").is_success());
        assert!(provider.delete_key(Hive::LocalMachine, "A").is_success());
        assert_eq!(provider.delete_key(Hive::LocalMachine, "A").code, ReturnCode::FILE_NOT_FOUND);
        assert_eq!(provider.delete_key(Hive::LocalMachine, "").code, ReturnCode::ACCESS_DENIED);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let provider = MemoryProvider::new();
        provider.create_key(Hive::LocalMachine, "K");
        provider.set_string_value(Hive::LocalMachine, "K", "First", "1");
        provider.set_string_value(Hive::LocalMachine, "K", "Second", "2");
        provider.set_dword_value(Hive::LocalMachine, "K", "FIRST", 1);

        let (names, types) = provider.enum_values(Hive::LocalMachine, "K").output;
        assert_eq!(names.unwrap(), vec!["First", "Second"]);
        assert_eq!(types.unwrap(), vec![4, 1]);
    }

    #[test]
    fn test_insert_rejects_malformed_qword() {
        let provider = MemoryProvider::new();
        let err = provider
            .insert(Hive::LocalMachine, "K", "Big", ValueData::Qword("12ab".to_string()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidType(_)));
        assert_eq!(provider.enum_key(Hive::LocalMachine, "K").code, ReturnCode::FILE_NOT_FOUND);

        provider
            .insert(Hive::LocalMachine, "K", "Big", ValueData::Qword("42".to_string()))
            .unwrap();
        let reply = provider.get_qword_value(Hive::LocalMachine, "K", "Big");
        assert_eq!(reply.output.as_deref(), Some("42"));
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let provider = MemoryProvider::new();
        provider.fail_next(Operation::CreateKey, ReturnCode::ACCESS_DENIED);
        assert_eq!(provider.create_key(Hive::Users, "K").code, ReturnCode::ACCESS_DENIED);
        assert!(provider.create_key(Hive::Users, "K").is_success());
        assert_eq!(provider.call_count(), 2);
    }
}
