//! Centralized configuration for the ePub library.
//!
//! Addressing-scheme constants, persisted-format delimiters and the policy
//! applied to malformed records when a library file is loaded.

/// Library-wide constants.
pub struct LibraryConfig;

impl LibraryConfig {
    pub const APP_NAME: &'static str = "epub-library";
    /// Scheme of inter-publication URLs (`epub3://<identifier>/`).
    pub const URL_SCHEME: &'static str = "epub3";
    pub const URL_SCHEME_SEPARATOR: &'static str = "://";
    pub const FRAGMENT_SEPARATOR: char = '#';
    /// Wrapper around CFI strings in fragment URLs: `#epubcfi(<cfi>)`.
    pub const CFI_PREFIX: &'static str = "epubcfi(";
    pub const CFI_SUFFIX: &'static str = ")";
}

/// Persisted library file layout.
pub struct StoreConfig;

impl StoreConfig {
    pub const FIELD_SEPARATOR: char = ',';
    pub const DEFAULT_FILE_NAME: &'static str = "library.csv";
    pub const TEMP_SUFFIX: &'static str = "tmp";
    pub const BACKUP_EXTENSION: &'static str = "bak";
}

/// What to do with a record that cannot be parsed while loading a library file.
///
/// A record is malformed when it has no field separator, an empty locator,
/// or an empty identifier. Blank lines are never records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRecordPolicy {
    /// Drop the whole record, log a warning, keep loading.
    #[default]
    Skip,
    /// Abort the load with [`crate::LibraryError::MalformedRecord`].
    Fail,
}

impl MalformedRecordPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedRecordPolicy::Skip => "skip",
            MalformedRecordPolicy::Fail => "fail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Some(MalformedRecordPolicy::Skip),
            "fail" => Some(MalformedRecordPolicy::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for MalformedRecordPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_roundtrip() {
        for policy in [MalformedRecordPolicy::Skip, MalformedRecordPolicy::Fail] {
            let parsed = MalformedRecordPolicy::from_str(policy.as_str()).expect("Should parse");
            assert_eq!(policy, parsed);
        }
        assert_eq!(MalformedRecordPolicy::from_str("FAIL"), Some(MalformedRecordPolicy::Fail));
        assert_eq!(MalformedRecordPolicy::from_str("ignore"), None);
    }

    #[test]
    fn test_default_policy_skips() {
        assert_eq!(MalformedRecordPolicy::default(), MalformedRecordPolicy::Skip);
    }
}
