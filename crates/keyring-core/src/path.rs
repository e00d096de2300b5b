//! BIP32 derivation paths.
//!
//! A derivation path is an ordered list of [`ChildIndex`] segments, parsed from
//! strings such as `m/44'/60'/0'/0/0`. Hardened segments are marked with a
//! trailing `'`, `h` or `H` and store their index with the high bit
//! (`0x8000_0000`) set.
//!
//! # Example
//!
//! ```
//! use evm_keyring_core::DerivationPath;
//!
//! let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
//! assert_eq!(path.len(), 5);
//! assert_eq!(path[0].index(), 0x8000_002C);
//! assert!(path[0].is_hardened());
//! assert_eq!(path.to_string(), "m/44'/60'/0'/0/0");
//! ```

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{Error, Result};

/// The bit that marks a hardened child index.
pub const HARDENED_BIT: u32 = 0x8000_0000;

/// A single segment of a derivation path.
///
/// `index` is the value fed to child derivation, so for hardened segments it
/// already includes [`HARDENED_BIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildIndex {
    index: u32,
    hardened: bool,
}

impl ChildIndex {
    /// Creates a non-hardened segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPathFormat`] if `index` has the high bit set.
    pub fn normal(index: u32) -> Result<Self> {
        if index & HARDENED_BIT != 0 {
            return Err(Error::InvalidPathFormat(format!(
                "index {index} does not fit in 31 bits"
            )));
        }
        Ok(Self {
            index,
            hardened: false,
        })
    }

    /// Creates a hardened segment from an unhardened index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPathFormat`] if `index` already has the high
    /// bit set.
    pub fn hardened(index: u32) -> Result<Self> {
        if index & HARDENED_BIT != 0 {
            return Err(Error::InvalidPathFormat(format!(
                "hardened index {index} does not fit in 31 bits"
            )));
        }
        Ok(Self {
            index: index | HARDENED_BIT,
            hardened: true,
        })
    }

    /// Builds a segment from its raw 32-bit form; the high bit decides
    /// hardening.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            index: raw,
            hardened: raw & HARDENED_BIT != 0,
        }
    }

    /// The raw index, including [`HARDENED_BIT`] for hardened segments.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// The index without the hardened bit.
    #[must_use]
    pub const fn unhardened_index(&self) -> u32 {
        self.index & !HARDENED_BIT
    }

    /// Whether this segment uses hardened derivation.
    #[must_use]
    pub const fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// Returns the next index with the same hardening, if one exists.
    ///
    /// Used by the BIP32 retry rule; never crosses from normal into the
    /// hardened range or wraps around.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        let next = self.unhardened_index().checked_add(1)?;
        if next & HARDENED_BIT != 0 {
            return None;
        }
        Some(Self {
            index: if self.hardened {
                next | HARDENED_BIT
            } else {
                next
            },
            hardened: self.hardened,
        })
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.unhardened_index())
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl FromStr for ChildIndex {
    type Err = Error;

    fn from_str(segment: &str) -> Result<Self> {
        let (digits, hardened) = match segment
            .strip_suffix('\'')
            .or_else(|| segment.strip_suffix('h'))
            .or_else(|| segment.strip_suffix('H'))
        {
            Some(digits) => (digits, true),
            None => (segment, false),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPathFormat(format!(
                "segment {segment:?} is not numeric"
            )));
        }

        let index: u32 = digits.parse().map_err(|_| {
            Error::InvalidPathFormat(format!("segment {segment:?} does not fit in 32 bits"))
        })?;

        if hardened {
            Self::hardened(index)
        } else {
            Self::normal(index)
        }
    }
}

/// An immutable, ordered BIP32 derivation path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    /// The empty path, `m`, which addresses the master key itself.
    #[must_use]
    pub const fn master() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path with `child` appended.
    #[must_use]
    pub fn child(&self, child: ChildIndex) -> Self {
        let mut segments = self.0.clone();
        segments.push(child);
        Self(segments)
    }

    /// Iterates over the segments in derivation order.
    pub fn iter(&self) -> impl Iterator<Item = &ChildIndex> {
        self.0.iter()
    }

    /// The number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the master path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ChildIndex] {
        &self.0
    }
}

impl Index<usize> for DerivationPath {
    type Output = ChildIndex;

    fn index(&self, index: usize) -> &ChildIndex {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a DerivationPath {
    type Item = &'a ChildIndex;
    type IntoIter = std::slice::Iter<'a, ChildIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ChildIndex> for DerivationPath {
    fn from_iter<I: IntoIterator<Item = ChildIndex>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidPathFormat("empty path".to_string()));
        }
        if path == "m" || path == "M" {
            return Ok(Self::master());
        }

        let body = path
            .strip_prefix("m/")
            .or_else(|| path.strip_prefix("M/"))
            .unwrap_or(path);

        body.split('/').map(ChildIndex::from_str).collect()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for DerivationPath {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
