//! Recursive export of key subtrees.

use wmi_registry::{Hive, MemoryProvider, Registry, RegistryError, ValueData, ValueType};

fn populated() -> Registry<MemoryProvider> {
    let provider = MemoryProvider::new();
    let fixtures = [
        (r"Software\Vendor", "Version", ValueData::String("2.1".into())),
        (r"Software\Vendor\App", "Port", ValueData::Dword(8080)),
        (
            r"Software\Vendor\App",
            "Hosts",
            ValueData::MultiString(vec!["alpha".into(), "beta".into()]),
        ),
        (r"Software\Vendor\App\Cache", "Blob", ValueData::Binary(vec![1, 2, 3])),
        (
            r"Software\Vendor\Tools",
            "Path",
            ValueData::ExpandString(r"%ProgramFiles%\Tools".into()),
        ),
    ];
    for (path, name, data) in fixtures {
        provider.insert(Hive::LocalMachine, path, name, data).unwrap();
    }
    Registry::new(provider)
}

#[test]
fn test_export_with_values() {
    let registry = populated();
    let tree = registry
        .local_machine()
        .get_sub_key_recursive(r"Software\Vendor", true)
        .unwrap();

    assert_eq!(tree.name, "Vendor");
    assert_eq!(tree.path.to_string(), r"HKEY_LOCAL_MACHINE\Software\Vendor");
    assert_eq!(tree.key_count(), 4);
    assert_eq!(tree.value_count(), 5);

    let app = tree.child("app").unwrap();
    assert_eq!(app.value("Port").unwrap().data, ValueData::Dword(8080));
    assert_eq!(app.value("Hosts").unwrap().value_type, ValueType::MultiString);

    let cache = app.child("Cache").unwrap();
    assert!(cache.keys.is_empty());
    assert_eq!(cache.values[0].data.as_bytes(), Some(&[1u8, 2, 3][..]));
}

#[test]
fn test_export_without_values() {
    let registry = populated();
    let tree = registry
        .local_machine()
        .get_sub_key_recursive(r"Software\Vendor", false)
        .unwrap();

    assert_eq!(tree.key_count(), 4);
    assert_eq!(tree.value_count(), 0);
    let names: Vec<_> = tree.keys.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["App", "Tools"]);
}

#[test]
fn test_export_is_read_only() {
    let registry = populated();
    let hklm = registry.local_machine();
    let first = hklm.get_sub_key_recursive("Software", true).unwrap();
    let second = hklm.get_sub_key_recursive("Software", true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_export_missing_key() {
    let registry = populated();
    assert!(matches!(
        registry.local_machine().get_sub_key_recursive("Nowhere", true),
        Err(RegistryError::KeyNotFound { .. })
    ));
}

#[cfg(feature = "serde")]
#[test]
fn test_export_to_json() {
    let registry = populated();
    let tree = registry
        .local_machine()
        .get_sub_key_recursive(r"Software\Vendor\App", true)
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
    assert_eq!(json["name"], "App");
    assert_eq!(json["path"], r"HKEY_LOCAL_MACHINE\Software\Vendor\App");
    assert_eq!(json["values"][0]["name"], "Port");
    assert_eq!(json["values"][0]["type"], "REG_DWORD");
    assert_eq!(json["values"][0]["data"], 8080);
    assert_eq!(json["values"][1]["data"][1], "beta");
    assert_eq!(json["keys"][0]["name"], "Cache");
    assert!(json["keys"][0].get("keys").is_none());
}
