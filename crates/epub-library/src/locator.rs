//! Container locations.
//!
//! A [`Locator`] records where a container lives *as given*: paths are not
//! canonicalized, so the same file reached through two spellings yields two
//! distinct locators.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Opaque, orderable reference to a container's location.
///
/// The canonical string form of [`Locator::Null`] is the empty string; every
/// other string is a filesystem path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Locator {
    /// No known location.
    #[default]
    Null,
    /// A file on the local filesystem.
    File(PathBuf),
}

impl Locator {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.as_os_str().is_empty() {
            Locator::Null
        } else {
            Locator::File(path)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Locator::Null)
    }

    /// Filesystem path, if this locator has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Locator::Null => None,
            Locator::File(path) => Some(path),
        }
    }

    /// Whether the string form reproduces this locator exactly.
    ///
    /// False for paths that are not valid UTF-8.
    pub fn is_utf8(&self) -> bool {
        match self {
            Locator::Null => true,
            Locator::File(path) => path.to_str().is_some(),
        }
    }
}

/// Non-UTF-8 bytes in a path are replaced with U+FFFD, so the output of such a
/// locator does not parse back to it (see [`Locator::is_utf8`]).
impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Null => Ok(()),
            Locator::File(path) => write!(f, "{}", path.to_string_lossy()),
        }
    }
}

impl FromStr for Locator {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Locator::file(s))
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Locator::file(s)
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator::file(s)
    }
}

impl From<PathBuf> for Locator {
    fn from(path: PathBuf) -> Self {
        Locator::file(path)
    }
}

impl From<&Path> for Locator {
    fn from(path: &Path) -> Self {
        Locator::file(path)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_roundtrip() {
        let locator = Locator::from("/books/a.epub");
        assert_eq!(locator.to_string(), "/books/a.epub");
        assert_eq!("/books/a.epub".parse::<Locator>().unwrap(), locator);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_flagged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let odd = Locator::from(Path::new(OsStr::from_bytes(b"/books/\xff.epub")));
        assert!(!odd.is_utf8());
        assert_ne!(odd.to_string().parse::<Locator>().unwrap(), odd);
        assert!(Locator::from("/books/a.epub").is_utf8());
        assert!(Locator::Null.is_utf8());
    }

    #[test]
    fn test_empty_string_is_null() {
        let locator: Locator = "".parse().unwrap();
        assert!(locator.is_null());
        assert_eq!(locator.to_string(), "");
        assert!(locator.path().is_none());
        assert_eq!(Locator::default(), Locator::Null);
    }

    #[test]
    fn test_null_orders_first() {
        let mut locators = vec![
            Locator::from("/books/b.epub"),
            Locator::Null,
            Locator::from("/books/a.epub"),
        ];
        locators.sort();
        assert_eq!(
            locators,
            vec![
                Locator::Null,
                Locator::from("/books/a.epub"),
                Locator::from("/books/b.epub"),
            ]
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let locator = Locator::from("/books/a.epub");
        let json = serde_json::to_string(&locator).unwrap();
        assert_eq!(json, "\"/books/a.epub\"");

        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locator);
    }
}
