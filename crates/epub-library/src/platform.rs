//! Platform-specific path utilities.

use crate::config::{LibraryConfig, StoreConfig};
use crate::error::{LibraryError, Result};
use std::path::PathBuf;

/// Default location of the persisted library file.
///
/// # Platform Behavior
/// - **Linux**: `~/.local/share/epub-library/library.csv`
/// - **Windows**: `%APPDATA%\epub-library\library.csv`
/// - **macOS**: `~/Library/Application Support/epub-library/library.csv`
pub fn default_library_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| LibraryError::InvalidLocator {
        message: "Could not determine the user data directory".to_string(),
    })?;
    Ok(data_dir
        .join(LibraryConfig::APP_NAME)
        .join(StoreConfig::DEFAULT_FILE_NAME))
}
