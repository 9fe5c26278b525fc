//! Command implementations.
//!
//! Each command returns the text to print so it can be tested without
//! capturing stdout.

use anyhow::{anyhow, bail, Context, Result};
use epub_library::{
    store, BoxError, Container, Library, LibraryEntry, Locator, MalformedRecordPolicy,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// JSON shape of `list --json`.
#[derive(Debug, Serialize)]
struct ListReport {
    containers: usize,
    publications: Vec<LibraryEntry>,
}

/// A library file opened for one command.
pub struct Session {
    path: PathBuf,
    library: Library,
}

impl Session {
    /// Load the library file, or start empty if it does not exist yet.
    pub fn open(path: PathBuf, strict: bool) -> Result<Self> {
        let opener = Arc::new(|locator: &Locator| -> Result<Arc<dyn Container>, BoxError> {
            Err(format!("cannot open {locator}: containers are not read by this tool").into())
        });

        let library = if path.exists() {
            let policy = if strict {
                MalformedRecordPolicy::Fail
            } else {
                MalformedRecordPolicy::Skip
            };
            Library::load(&Locator::from(path.clone()), opener, policy)
                .with_context(|| format!("Failed to load library file {}", path.display()))?
        } else {
            Library::new(opener)
        };

        Ok(Self { path, library })
    }

    pub fn list(&self, json: bool) -> Result<String> {
        let entries = self.library.entries();
        if json {
            let report = ListReport {
                containers: self.library.container_locators().len(),
                publications: entries,
            };
            return Ok(serde_json::to_string_pretty(&report)?);
        }

        Ok(entries
            .iter()
            .map(|entry| format!("{}\t{}", entry.identifier, entry.locator))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn locate(&self, identifier: &str) -> Result<String> {
        let locator = self.library.locator_for(identifier);
        if locator.is_null() {
            bail!("Publication not registered: {}", identifier);
        }
        Ok(locator.to_string())
    }

    pub fn url(&self, identifier: &str) -> Result<String> {
        Ok(self.library.epub_url_for_identifier(identifier)?)
    }

    pub fn register(&self, locator: &str, identifiers: Vec<String>) -> Result<String> {
        let locator = Locator::from(locator);
        if locator.is_null() {
            return Err(anyhow!("Locator must not be empty"));
        }
        let count = identifiers.len();
        self.library
            .register_identifiers(locator.clone(), identifiers)?;
        self.save()?;
        info!("Registered {} publications at {}", count, locator);
        Ok(String::new())
    }

    pub fn forget(&self, locator: &str) -> Result<String> {
        let locator = Locator::from(locator);
        if !self.library.forget_container(&locator) {
            bail!("Container not registered: {}", locator);
        }
        self.save()?;
        info!("Forgot container {}", locator);
        Ok(String::new())
    }

    fn save(&self) -> Result<()> {
        let text = store::format_records(&self.library.records());
        store::atomic_write_text(&self.path, &text, true)
            .with_context(|| format!("Failed to save library file {}", self.path.display()))
    }
}
