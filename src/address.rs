//! Key addresses: a hive plus a path of segments below it.
//!
//! Addresses are plain values. Building one never talks to the provider, so
//! an address may name a key that does not exist.

use crate::error::{RegistryError, Result};
use crate::hive::Hive;
use std::fmt;
use std::str::FromStr;

/// Separator between path segments in a qualified path.
pub const SEPARATOR: char = '\\';

const SEPARATOR_STR: &str = "\\";

/// Location of a registry key.
///
/// Segments never contain [`SEPARATOR`] and are never empty. An empty path
/// denotes the hive root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyAddress {
    hive: Hive,
    segments: Vec<String>,
}

impl KeyAddress {
    /// Returns the address of a hive root.
    pub fn root(hive: Hive) -> Self {
        Self {
            hive,
            segments: Vec::new(),
        }
    }

    /// Creates an address from a hive and a qualified path.
    ///
    /// Leading, trailing and doubled separators are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wmi_registry::{Hive, KeyAddress};
    ///
    /// let address = KeyAddress::new(Hive::LocalMachine, r"Software\Microsoft\");
    /// assert_eq!(address.path(), r"Software\Microsoft");
    /// assert_eq!(address.name(), "Microsoft");
    /// ```
    pub fn new(hive: Hive, path: &str) -> Self {
        Self::root(hive).child(path)
    }

    /// Returns the hive this address is rooted at.
    pub fn hive(&self) -> Hive {
        self.hive
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the qualified path, without a leading separator.
    ///
    /// This is the `sSubKeyName` argument handed to the provider.
    pub fn path(&self) -> String {
        self.segments.join(SEPARATOR_STR)
    }

    /// Returns the last path segment, or an empty string for a hive root.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Returns true if this address is a hive root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments below the hive root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns the address with `relative` appended.
    ///
    /// `relative` may itself contain separators; empty segments are skipped,
    /// so an empty name yields this address unchanged.
    pub fn child(&self, relative: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(split_path(relative).map(str::to_string));
        Self {
            hive: self.hive,
            segments,
        }
    }

    /// Returns the address with the last segment removed.
    ///
    /// A hive root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            hive: self.hive,
            segments,
        }
    }

    /// Returns true if `other` lies strictly below this address.
    pub fn is_ancestor_of(&self, other: &KeyAddress) -> bool {
        self.hive == other.hive
            && other.segments.len() > self.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl fmt::Display for KeyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hive.name())?;
        for segment in &self.segments {
            write!(f, "{}{}", SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl FromStr for KeyAddress {
    type Err = RegistryError;

    /// Parses `HIVE\path`, where `HIVE` is a full or abbreviated hive name.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim_start_matches(SEPARATOR);
        let (hive, rest) = match trimmed.split_once(SEPARATOR) {
            Some((hive, rest)) => (hive, rest),
            None => (trimmed, ""),
        };
        if hive.is_empty() {
            return Err(RegistryError::InvalidPath(format!("missing hive in '{}'", s)));
        }
        Ok(Self::new(hive.parse::<Hive>()?, rest))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for KeyAddress {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Splits a qualified path into its non-empty segments.
pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path_is_empty() {
        let root = KeyAddress::root(Hive::Users);
        assert!(root.is_root());
        assert_eq!(root.path(), "");
        assert_eq!(root.name(), "");
        assert_eq!(root.to_string(), "HKEY_USERS");
    }

    #[test]
    fn test_child_of_root_has_no_leading_separator() {
        let child = KeyAddress::root(Hive::LocalMachine).child("Software");
        assert_eq!(child.path(), "Software");
        assert_eq!(child.child("Vendor").path(), r"Software\Vendor");
    }

    #[test]
    fn test_child_with_nested_name() {
        let key = KeyAddress::root(Hive::CurrentUser).child(r"A\\B\C\");
        assert_eq!(key.segments(), &["A", "B", "C"]);
        assert_eq!(key.child(""), key);
    }

    #[test]
    fn test_parent_chain() {
        let key = KeyAddress::new(Hive::LocalMachine, r"A\B");
        let parent = key.parent();
        assert_eq!(parent.path(), "A");
        let root = parent.parent();
        assert!(root.is_root());
        assert_eq!(root.parent(), root);
    }

    #[test]
    fn test_parse_display_form() {
        let key: KeyAddress = r"HKLM\Software\Vendor".parse().unwrap();
        assert_eq!(key.hive(), Hive::LocalMachine);
        assert_eq!(key.to_string(), r"HKEY_LOCAL_MACHINE\Software\Vendor");

        let root: KeyAddress = "HKEY_CURRENT_CONFIG".parse().unwrap();
        assert!(root.is_root());

        assert!("".parse::<KeyAddress>().is_err());
        assert!(r"HKXX\Software".parse::<KeyAddress>().is_err());
    }

    #[test]
    fn test_ancestry() {
        let software = KeyAddress::new(Hive::LocalMachine, "Software");
        let vendor = software.child("Vendor");
        assert!(software.is_ancestor_of(&vendor));
        assert!(KeyAddress::new(Hive::LocalMachine, "SOFTWARE").is_ancestor_of(&vendor));
        assert!(!vendor.is_ancestor_of(&software));
        assert!(!software.is_ancestor_of(&software));
        assert!(!KeyAddress::new(Hive::Users, "Software").is_ancestor_of(&vendor));
    }
}
