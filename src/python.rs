//! Python bindings using PyO3.
//!
//! The provider handle comes from Python: any object with StdRegProv method
//! names, such as `wmi.WMI(namespace="default").StdRegProv` from the `wmi`
//! package. Each call passes StdRegProv keyword arguments and expects a tuple
//! of the result code followed by the output parameters.

use pyo3::exceptions::{PyIndexError, PyKeyError, PyOSError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyList, PyString, PyTuple};
use std::sync::Arc;
use tracing::warn;

use crate::{
    Hive, KeyAddress, KeyTree, Operation, Registry, RegistryError, RegistryKey, RegistryProvider,
    Reply, ReturnCode, Status, ValueData, ValueInput, ValueType,
};

/// Convert Rust RegistryError to Python exception
fn registry_error_to_py(err: RegistryError) -> PyErr {
    match err {
        RegistryError::KeyNotFound { .. } | RegistryError::ValueNotFound { .. } => {
            PyKeyError::new_err(err.to_string())
        }
        RegistryError::InvalidType(_) => PyTypeError::new_err(err.to_string()),
        RegistryError::InvalidPath(_) => PyValueError::new_err(err.to_string()),
        RegistryError::OutOfBounds { .. } => PyIndexError::new_err(err.to_string()),
        RegistryError::OperationFailed { .. } => PyOSError::new_err(err.to_string()),
    }
}

/// Reads output parameter `index`, treating a missing or `None` entry as absent.
fn output<'p, T: FromPyObject<'p>>(outputs: &[&'p PyAny], index: usize) -> PyResult<Option<T>> {
    match outputs.get(index) {
        Some(item) if !item.is_none() => Ok(Some(item.extract()?)),
        _ => Ok(None),
    }
}

/// Provider that forwards every operation to a Python StdRegProv object.
pub struct PyStdRegProv {
    object: PyObject,
}

impl PyStdRegProv {
    fn invoke<T: Default>(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        arguments: impl FnOnce(&PyDict) -> PyResult<()>,
        extract: impl FnOnce(&[&PyAny]) -> PyResult<T>,
    ) -> Reply<T> {
        Python::with_gil(|py| {
            let call = || -> PyResult<Reply<T>> {
                let kwargs = PyDict::new(py);
                kwargs.set_item("hDefKey", hive.id())?;
                kwargs.set_item("sSubKeyName", path)?;
                arguments(kwargs)?;

                let returned = self
                    .object
                    .as_ref(py)
                    .call_method(operation.name(), (), Some(kwargs))?;
                let items: Vec<&PyAny> = match returned.downcast::<PyTuple>() {
                    Ok(tuple) => tuple.iter().collect(),
                    Err(_) => vec![returned],
                };

                let code = match items.first() {
                    Some(code) => ReturnCode(code.extract::<i64>()? as u32),
                    None => ReturnCode::WBEM_FAILED,
                };
                if !code.is_success() {
                    return Ok(Reply::failed(code));
                }
                Ok(Reply {
                    code,
                    output: extract(&items[1..])?,
                })
            };

            call().unwrap_or_else(|err| {
                warn!(%operation, %hive, path, error = %err, "Python provider call raised");
                Reply::failed(ReturnCode::WBEM_FAILED)
            })
        })
    }

    fn get<T: for<'p> FromPyObject<'p>>(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<T>> {
        self.invoke(
            operation,
            hive,
            path,
            |kwargs| kwargs.set_item("sValueName", name),
            |outputs| output(outputs, 0),
        )
    }

    fn set(
        &self,
        operation: Operation,
        hive: Hive,
        path: &str,
        name: &str,
        value: impl FnOnce(&PyDict) -> PyResult<()>,
    ) -> Status {
        self.invoke(
            operation,
            hive,
            path,
            |kwargs| {
                kwargs.set_item("sValueName", name)?;
                value(kwargs)
            },
            |_| Ok(()),
        )
    }
}

impl RegistryProvider for PyStdRegProv {
    fn enum_key(&self, hive: Hive, path: &str) -> Reply<Option<Vec<String>>> {
        self.invoke(Operation::EnumKey, hive, path, |_| Ok(()), |outputs| output(outputs, 0))
    }

    fn enum_values(
        &self,
        hive: Hive,
        path: &str,
    ) -> Reply<(Option<Vec<String>>, Option<Vec<u32>>)> {
        self.invoke(Operation::EnumValues, hive, path, |_| Ok(()), |outputs| {
            Ok((output(outputs, 0)?, output(outputs, 1)?))
        })
    }

    fn create_key(&self, hive: Hive, path: &str) -> Status {
        self.invoke(Operation::CreateKey, hive, path, |_| Ok(()), |_| Ok(()))
    }

    fn delete_key(&self, hive: Hive, path: &str) -> Status {
        self.invoke(Operation::DeleteKey, hive, path, |_| Ok(()), |_| Ok(()))
    }

    fn delete_value(&self, hive: Hive, path: &str, name: &str) -> Status {
        self.set(Operation::DeleteValue, hive, path, name, |_| Ok(()))
    }

    fn get_string_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<String>> {
        self.get(Operation::GetStringValue, hive, path, name)
    }

    fn get_expanded_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<String>> {
        self.get(Operation::GetExpandedStringValue, hive, path, name)
    }

    fn get_binary_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<Vec<u8>>> {
        self.get(Operation::GetBinaryValue, hive, path, name)
    }

    fn get_dword_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<u32>> {
        self.get(Operation::GetDWORDValue, hive, path, name)
    }

    fn get_qword_value(&self, hive: Hive, path: &str, name: &str) -> Reply<Option<String>> {
        // The wmi package hands uint64 back as text, but accept a Python int too.
        self.invoke(
            Operation::GetQWORDValue,
            hive,
            path,
            |kwargs| kwargs.set_item("sValueName", name),
            |outputs| match outputs.first() {
                Some(item) if item.is_none() => Ok(None),
                Some(item) => match item.extract::<u64>() {
                    Ok(number) => Ok(Some(number.to_string())),
                    Err(_) => Ok(Some(item.extract::<String>()?)),
                },
                None => Ok(None),
            },
        )
    }

    fn get_multi_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
    ) -> Reply<Option<Vec<String>>> {
        self.get(Operation::GetMultiStringValue, hive, path, name)
    }

    fn set_string_value(&self, hive: Hive, path: &str, name: &str, value: &str) -> Status {
        self.set(Operation::SetStringValue, hive, path, name, |kwargs| {
            kwargs.set_item("sValue", value)
        })
    }

    fn set_expanded_string_value(&self, hive: Hive, path: &str, name: &str, value: &str) -> Status {
        self.set(Operation::SetExpandedStringValue, hive, path, name, |kwargs| {
            kwargs.set_item("sValue", value)
        })
    }

    fn set_binary_value(&self, hive: Hive, path: &str, name: &str, value: &[u8]) -> Status {
        // StdRegProv takes an array of byte values, not a bytes object.
        self.set(Operation::SetBinaryValue, hive, path, name, |kwargs| {
            kwargs.set_item("uValue", value.to_vec())
        })
    }

    fn set_dword_value(&self, hive: Hive, path: &str, name: &str, value: u32) -> Status {
        self.set(Operation::SetDWORDValue, hive, path, name, |kwargs| {
            kwargs.set_item("uValue", value)
        })
    }

    fn set_multi_string_value(
        &self,
        hive: Hive,
        path: &str,
        name: &str,
        value: &[String],
    ) -> Status {
        self.set(Operation::SetMultiStringValue, hive, path, name, |kwargs| {
            kwargs.set_item("sValues", value.to_vec())
        })
    }
}

fn data_to_py(py: Python, data: ValueData) -> PyObject {
    match data {
        ValueData::String(s) | ValueData::ExpandString(s) => s.into_py(py),
        ValueData::Binary(b) => PyBytes::new(py, &b).into_py(py),
        ValueData::Dword(d) => d.into_py(py),
        ValueData::Qword(q) => match q.parse::<u64>() {
            Ok(number) => number.into_py(py),
            Err(_) => q.into_py(py),
        },
        ValueData::MultiString(strings) => strings.into_py(py),
    }
}

fn input_from_py(value: &PyAny) -> PyResult<ValueInput> {
    if let Ok(bytes) = value.downcast::<PyBytes>() {
        return Ok(ValueInput::Bytes(bytes.as_bytes().to_vec()));
    }
    if let Ok(text) = value.downcast::<PyString>() {
        return Ok(ValueInput::Text(text.to_str()?.to_string()));
    }
    if let Ok(number) = value.extract::<u64>() {
        return Ok(ValueInput::Integer(number));
    }
    if value.downcast::<PyList>().is_ok() || value.downcast::<PyTuple>().is_ok() {
        if let Ok(strings) = value.extract::<Vec<String>>() {
            return Ok(ValueInput::List(strings));
        }
        if let Ok(bytes) = value.extract::<Vec<u8>>() {
            return Ok(ValueInput::Bytes(bytes));
        }
    }
    Err(PyTypeError::new_err(format!(
        "unsupported value of type {}",
        value.get_type().name()?
    )))
}

fn tree_to_py(py: Python, tree: KeyTree) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    dict.set_item("name", tree.name)?;
    dict.set_item("path", tree.path.to_string())?;

    let values = PyList::empty(py);
    for value in tree.values {
        let entry = PyDict::new(py);
        entry.set_item("name", value.name)?;
        entry.set_item("type", value.value_type.id())?;
        entry.set_item("data", data_to_py(py, value.data))?;
        values.append(entry)?;
    }
    dict.set_item("values", values)?;

    let keys = PyList::empty(py);
    for key in tree.keys {
        keys.append(tree_to_py(py, key)?)?;
    }
    dict.set_item("keys", keys)?;

    Ok(dict.into_py(py))
}

/// Python wrapper for Registry
#[pyclass(name = "Registry")]
pub struct PyRegistry {
    inner: Arc<Registry<PyStdRegProv>>,
}

impl PyRegistry {
    fn root(&self, hive: Hive) -> PyRegistryKey {
        PyRegistryKey {
            registry: Arc::clone(&self.inner),
            address: KeyAddress::root(hive),
        }
    }
}

#[pymethods]
impl PyRegistry {
    /// Wrap a connected StdRegProv object
    #[new]
    fn new(provider: PyObject) -> Self {
        PyRegistry {
            inner: Arc::new(Registry::new(PyStdRegProv { object: provider })),
        }
    }

    /// Get the HKEY_CLASSES_ROOT root key
    fn classes_root(&self) -> PyRegistryKey {
        self.root(Hive::ClassesRoot)
    }

    /// Get the HKEY_CURRENT_USER root key
    fn current_user(&self) -> PyRegistryKey {
        self.root(Hive::CurrentUser)
    }

    /// Get the HKEY_LOCAL_MACHINE root key
    fn local_machine(&self) -> PyRegistryKey {
        self.root(Hive::LocalMachine)
    }

    /// Get the HKEY_USERS root key
    fn users(&self) -> PyRegistryKey {
        self.root(Hive::Users)
    }

    /// Get the HKEY_CURRENT_CONFIG root key
    fn current_config(&self) -> PyRegistryKey {
        self.root(Hive::CurrentConfig)
    }

    /// Open an existing key such as "HKLM\\Software\\Vendor"
    fn open(&self, path: &str) -> PyResult<PyRegistryKey> {
        let key = self.inner.open(path).map_err(registry_error_to_py)?;
        Ok(PyRegistryKey {
            registry: Arc::clone(&self.inner),
            address: key.address().clone(),
        })
    }

    fn __repr__(&self) -> String {
        "Registry(StdRegProv)".to_string()
    }
}

/// Python wrapper for RegistryKey
#[pyclass(name = "RegistryKey")]
#[derive(Clone)]
pub struct PyRegistryKey {
    registry: Arc<Registry<PyStdRegProv>>,
    address: KeyAddress,
}

impl PyRegistryKey {
    fn key(&self) -> RegistryKey<'_> {
        RegistryKey::new(self.registry.provider(), self.address.clone())
    }

    fn wrap(&self, address: KeyAddress) -> PyRegistryKey {
        PyRegistryKey {
            registry: Arc::clone(&self.registry),
            address,
        }
    }
}

#[pymethods]
impl PyRegistryKey {
    /// Get the key name
    #[getter]
    fn name(&self) -> &str {
        self.address.name()
    }

    /// Get the qualified path below the hive root
    #[getter]
    fn path(&self) -> String {
        self.address.path()
    }

    /// Get the hive identifier
    #[getter]
    fn hive(&self) -> u32 {
        self.address.hive().id()
    }

    /// Check whether a subkey exists
    #[pyo3(signature = (name = ""))]
    fn exists(&self, name: &str) -> bool {
        self.key().exists(name)
    }

    /// Get an existing subkey
    fn get_sub_key(&self, name: &str) -> PyResult<PyRegistryKey> {
        let key = self.key().get_sub_key(name).map_err(registry_error_to_py)?;
        Ok(self.wrap(key.address().clone()))
    }

    /// Get the parent key
    fn get_parent_key(&self) -> PyRegistryKey {
        self.wrap(self.address.parent())
    }

    /// Create a subkey
    fn create_sub_key(&self, name: &str) -> PyResult<PyRegistryKey> {
        let key = self.key().create_sub_key(name).map_err(registry_error_to_py)?;
        Ok(self.wrap(key.address().clone()))
    }

    /// Delete a subkey without subkeys of its own
    fn delete_sub_key(&self, name: &str) -> PyResult<String> {
        let deleted = self.key().delete_sub_key(name).map_err(registry_error_to_py)?;
        Ok(deleted.path())
    }

    /// Delete a subkey and everything below it
    fn delete_sub_key_recursive(&self, name: &str) -> PyResult<String> {
        let deleted = self
            .key()
            .delete_sub_key_recursive(name)
            .map_err(registry_error_to_py)?;
        Ok(deleted.path())
    }

    /// Read a value; the type is looked up when not given
    #[pyo3(signature = (name, value_type = None))]
    fn get_value(&self, name: &str, value_type: Option<u32>, py: Python) -> PyResult<PyObject> {
        let data = self
            .key()
            .get_value(name, value_type.map(ValueType::from_u32))
            .map_err(registry_error_to_py)?;
        Ok(data_to_py(py, data))
    }

    /// Get the type identifier of a value
    fn get_value_type(&self, name: &str) -> PyResult<u32> {
        let value_type = self.key().get_value_type(name).map_err(registry_error_to_py)?;
        Ok(value_type.id())
    }

    /// Write a value
    fn set_value(&self, name: &str, value: &PyAny, value_type: u32) -> PyResult<()> {
        let input = input_from_py(value)?;
        self.key()
            .set_value(name, input, ValueType::from_u32(value_type))
            .map_err(registry_error_to_py)
    }

    /// Delete a value
    fn delete_value(&self, name: &str) -> PyResult<()> {
        self.key().delete_value(name).map_err(registry_error_to_py)
    }

    /// Get the immediate subkeys
    fn sub_keys(&self) -> PyResult<Vec<PyRegistryKey>> {
        let mut result = Vec::new();
        for child in self.key().sub_keys() {
            let child = child.map_err(registry_error_to_py)?;
            result.push(self.wrap(child.address().clone()));
        }
        Ok(result)
    }

    /// Get (name, type) pairs for every value
    fn values(&self) -> PyResult<Vec<(String, u32)>> {
        let key = self.key();
        let mut values = key.values();
        values.rewind().map_err(registry_error_to_py)?;

        let mut result = Vec::with_capacity(values.len());
        while values.valid() {
            let name = values.key().map_err(registry_error_to_py)?.to_string();
            let value_type = values.current_type().map_err(registry_error_to_py)?;
            result.push((name, value_type.id()));
            values.advance();
        }
        Ok(result)
    }

    /// Export a subkey tree as nested dictionaries
    #[pyo3(signature = (name = "", include_values = true))]
    fn export(&self, name: &str, include_values: bool, py: Python) -> PyResult<PyObject> {
        let tree = self
            .key()
            .get_sub_key_recursive(name, include_values)
            .map_err(registry_error_to_py)?;
        tree_to_py(py, tree)
    }

    fn __repr__(&self) -> String {
        format!("RegistryKey('{}')", self.address)
    }

    fn __str__(&self) -> String {
        self.address.to_string()
    }
}

/// Python module definition
#[pymodule]
fn wmi_registry(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyRegistry>()?;
    m.add_class::<PyRegistryKey>()?;

    for hive in Hive::ALL {
        m.add(hive.name(), hive.id())?;
    }
    for value_type in [
        ValueType::String,
        ValueType::ExpandString,
        ValueType::Binary,
        ValueType::Dword,
        ValueType::MultiString,
        ValueType::Qword,
    ] {
        m.add(value_type.name().as_str(), value_type.id())?;
    }

    // Add version constant
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
