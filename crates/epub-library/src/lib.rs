//! ePub Library - registry of ePub containers keyed by publication identifier.
//!
//! Maps publication unique identifiers to the containers (`.epub` files) that
//! hold them, loads containers and packages lazily, and resolves
//! `epub3://<identifier>/#epubcfi(...)` links between publications. Parsing
//! containers and packages is left to the application, which plugs in through
//! the traits in [`container`].
//!
//! # Example
//!
//! ```rust
//! use epub_library::memory::{MemoryContainer, MemoryOpener, MemoryPackage};
//! use epub_library::{Library, Locator};
//! use std::sync::Arc;
//!
//! # fn main() -> epub_library::Result<()> {
//! let opener = Arc::new(MemoryOpener::new());
//! opener.insert(
//!     "/books/a.epub",
//!     MemoryContainer::new([MemoryPackage::new("pub-a", ["cover", "chapter-1"])]),
//! );
//!
//! let library = Library::new(opener);
//! library.add_container_at(Locator::from("/books/a.epub"))?;
//!
//! let url = library.epub_url_for_identifier("pub-a")?;
//! assert_eq!(url, "epub3://pub-a/");
//!
//! let item = library.manifest_item_for_fragment_url("epub3://pub-a/#epubcfi(/6/4!)")?;
//! assert_eq!(item.item_id(), "chapter-1");
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod container;
pub mod error;
pub mod library;
pub mod locator;
pub mod memory;
pub mod platform;
pub mod store;

// Re-export commonly used types
pub use config::{LibraryConfig, MalformedRecordPolicy};
pub use container::{Container, ContainerOpener, ManifestItem, Package};
pub use error::{BoxError, LibraryError, Result};
pub use library::{Library, LibraryEntry};
pub use locator::Locator;
pub use store::LibraryRecord;
