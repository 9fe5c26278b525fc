//! The process-wide main library.

use super::registry::Library;
use crate::config::MalformedRecordPolicy;
use crate::container::ContainerOpener;
use crate::locator::Locator;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

static MAIN_LIBRARY: Mutex<Option<Arc<Library>>> = Mutex::new(None);

fn main_slot() -> MutexGuard<'static, Option<Arc<Library>>> {
    MAIN_LIBRARY.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Library {
    /// The process-wide library, created on first call.
    ///
    /// The first call loads the library file at `locator` (unless it is null)
    /// and falls back to an empty library if that fails. Once an instance
    /// exists both arguments are ignored. Construction happens under a global
    /// lock, so concurrent first callers all receive the same instance.
    pub fn main_library(locator: &Locator, opener: Arc<dyn ContainerOpener>) -> Arc<Library> {
        let mut slot = main_slot();
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }

        let library = if locator.is_null() {
            debug!("Creating empty main library");
            Library::new(opener)
        } else {
            match Library::load(locator, Arc::clone(&opener), MalformedRecordPolicy::default()) {
                Ok(library) => {
                    info!("Loaded main library from {}", locator);
                    library
                }
                Err(e) => {
                    warn!(
                        "Failed to load main library from {}: {}; starting empty",
                        locator, e
                    );
                    Library::new(opener)
                }
            }
        };

        let library = Arc::new(library);
        *slot = Some(Arc::clone(&library));
        library
    }

    /// The process-wide library, if one has been created.
    pub fn current_main_library() -> Option<Arc<Library>> {
        main_slot().clone()
    }

    /// Release the process-wide library.
    ///
    /// Holders of the returned (or any earlier) `Arc` keep a working library;
    /// the next [`Library::main_library`] call builds a new one.
    pub fn reset_main_library() -> Option<Arc<Library>> {
        let previous = main_slot().take();
        if previous.is_some() {
            debug!("Released main library");
        }
        previous
    }
}
