//! Property tests for key addressing.

use proptest::prelude::*;
use wmi_registry::{Hive, KeyAddress};

fn hive() -> impl Strategy<Value = Hive> {
    prop::sample::select(Hive::ALL.to_vec())
}

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9 ._-]{1,12}", 0..6)
}

proptest! {
    #[test]
    fn child_then_parent_is_identity(
        hive in hive(),
        base in segments(),
        name in "[A-Za-z0-9_]{1,16}"
    ) {
        let address = KeyAddress::new(hive, &base.join("\\"));
        let child = address.child(&name);
        prop_assert_eq!(child.parent(), address.clone());
        prop_assert_eq!(child.name(), name.as_str());
        prop_assert_eq!(child.depth(), address.depth() + 1);
        prop_assert!(address.is_ancestor_of(&child));
    }

    #[test]
    fn path_round_trips_through_new(hive in hive(), parts in segments()) {
        let path = parts.join("\\");
        let address = KeyAddress::new(hive, &path);
        prop_assert_eq!(address.path(), path);
        prop_assert_eq!(address.segments().len(), parts.len());
        prop_assert_eq!(address.is_root(), parts.is_empty());
    }

    #[test]
    fn display_parses_back(hive in hive(), parts in segments()) {
        let address = KeyAddress::new(hive, &parts.join("\\"));
        let parsed: KeyAddress = address.to_string().parse().unwrap();
        prop_assert_eq!(parsed, address);
    }

    #[test]
    fn redundant_separators_are_ignored(hive in hive(), parts in segments()) {
        let noisy = format!("\\{}\\\\", parts.join("\\\\"));
        let clean = KeyAddress::new(hive, &parts.join("\\"));
        prop_assert_eq!(KeyAddress::root(hive).child(&noisy), clean);
    }

    #[test]
    fn parent_chain_reaches_root(hive in hive(), parts in segments()) {
        let mut address = KeyAddress::new(hive, &parts.join("\\"));
        for _ in 0..parts.len() {
            address = address.parent();
        }
        prop_assert!(address.is_root());
        prop_assert_eq!(address.parent(), KeyAddress::root(hive));
    }
}

#[test]
fn test_short_and_long_hive_prefixes() {
    let short: KeyAddress = r"HKLM\Software\Vendor".parse().unwrap();
    let long: KeyAddress = r"HKEY_LOCAL_MACHINE\Software\Vendor".parse().unwrap();
    assert_eq!(short, long);
    assert_eq!(short.hive(), Hive::LocalMachine);
    assert_eq!(short.path(), r"Software\Vendor");
}
