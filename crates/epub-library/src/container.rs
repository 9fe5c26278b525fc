//! Collaborator traits consumed by the library.
//!
//! The library never parses OCF containers or package documents itself. An
//! application supplies a [`ContainerOpener`] that turns a [`Locator`] into a
//! [`Container`]; containers hand out [`Package`]s, and packages resolve CFI
//! strings into [`ManifestItem`]s.

use crate::error::BoxError;
use crate::locator::Locator;
use std::sync::Arc;

/// An opened publication container (an `.epub` file).
pub trait Container: Send + Sync {
    /// Unique identifiers of every package in the container, in the order the
    /// container lists them. Must not require parsing the packages.
    fn package_identifiers(&self) -> Vec<String>;

    /// Load the package with the given unique identifier.
    ///
    /// Returns `Ok(None)` when the container has no such package.
    fn package(&self, identifier: &str) -> Result<Option<Arc<dyn Package>>, BoxError>;
}

/// A parsed publication.
pub trait Package: Send + Sync {
    /// The publication's unique identifier.
    fn unique_id(&self) -> &str;

    fn manifest_items(&self) -> Vec<Arc<dyn ManifestItem>>;

    /// Resolve a CFI string (without the `epubcfi(...)` wrapper) relative to
    /// this package.
    fn manifest_item_for_cfi(&self, cfi: &str) -> Option<Arc<dyn ManifestItem>>;
}

/// An addressable content unit within a package.
pub trait ManifestItem: Send + Sync {
    /// Unique identifier of the owning package.
    fn package_id(&self) -> &str;

    /// The item's manifest `id`.
    fn item_id(&self) -> &str;

    /// CFI string addressing this item within its package.
    fn cfi(&self) -> String;
}

/// Opens containers on behalf of the library.
pub trait ContainerOpener: Send + Sync {
    fn open(&self, locator: &Locator) -> Result<Arc<dyn Container>, BoxError>;
}

impl<F> ContainerOpener for F
where
    F: Fn(&Locator) -> Result<Arc<dyn Container>, BoxError> + Send + Sync,
{
    fn open(&self, locator: &Locator) -> Result<Arc<dyn Container>, BoxError> {
        self(locator)
    }
}
