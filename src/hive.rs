//! Registry hive roots.
//!
//! The numeric identifiers are the operating system's predefined `HKEY_*`
//! handle values, which StdRegProv expects as its `hDefKey` argument.

use crate::error::{RegistryError, Result};
use std::fmt;
use std::str::FromStr;

/// One of the five top-level registry roots reachable through StdRegProv.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Hive {
    /// `HKEY_CLASSES_ROOT`.
    ClassesRoot = 0x8000_0000,

    /// `HKEY_CURRENT_USER`.
    CurrentUser = 0x8000_0001,

    /// `HKEY_LOCAL_MACHINE`.
    LocalMachine = 0x8000_0002,

    /// `HKEY_USERS`.
    Users = 0x8000_0003,

    /// `HKEY_CURRENT_CONFIG`.
    CurrentConfig = 0x8000_0005,
}

impl Hive {
    /// All hives, in identifier order.
    pub const ALL: [Hive; 5] = [
        Hive::ClassesRoot,
        Hive::CurrentUser,
        Hive::LocalMachine,
        Hive::Users,
        Hive::CurrentConfig,
    ];

    /// Returns the predefined handle value passed to the provider.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Looks up a hive by its predefined handle value.
    ///
    /// `0x80000004` (`HKEY_PERFORMANCE_DATA`) is not reachable through the
    /// provider and is rejected like any other unknown value.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|hive| hive.id() == id)
    }

    /// Returns the full `HKEY_*` name.
    pub fn name(self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::Users => "HKEY_USERS",
            Hive::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    /// Returns the common abbreviation (`HKLM`, `HKCU`, ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKCR",
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
            Hive::Users => "HKU",
            Hive::CurrentConfig => "HKCC",
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hive {
    type Err = RegistryError;

    /// Accepts full and abbreviated names, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|hive| {
                s.eq_ignore_ascii_case(hive.name()) || s.eq_ignore_ascii_case(hive.short_name())
            })
            .ok_or_else(|| RegistryError::InvalidPath(format!("unknown hive '{}'", s)))
    }
}
