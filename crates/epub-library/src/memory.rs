//! In-memory collaborators.
//!
//! Useful when publications are already parsed by the embedding application,
//! and for exercising the library without real `.epub` files.

use crate::container::{Container, ContainerOpener, ManifestItem, Package};
use crate::error::BoxError;
use crate::locator::Locator;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A manifest item addressed by a fixed CFI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryManifestItem {
    package_id: String,
    item_id: String,
    cfi: String,
}

impl MemoryManifestItem {
    pub fn new(
        package_id: impl Into<String>,
        item_id: impl Into<String>,
        cfi: impl Into<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            item_id: item_id.into(),
            cfi: cfi.into(),
        }
    }
}

impl ManifestItem for MemoryManifestItem {
    fn package_id(&self) -> &str {
        &self.package_id
    }

    fn item_id(&self) -> &str {
        &self.item_id
    }

    fn cfi(&self) -> String {
        self.cfi.clone()
    }
}

/// A package whose spine is a flat list of items.
///
/// Item `n` (zero-based) gets the CFI `/6/{2 * (n + 1)}!`, the spine step a
/// package document with a single `<spine>` would produce.
#[derive(Debug, Clone)]
pub struct MemoryPackage {
    unique_id: String,
    items: Vec<Arc<MemoryManifestItem>>,
}

impl MemoryPackage {
    pub fn new<I, S>(unique_id: impl Into<String>, item_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique_id = unique_id.into();
        let items = item_ids
            .into_iter()
            .enumerate()
            .map(|(index, item_id)| {
                Arc::new(MemoryManifestItem::new(
                    unique_id.clone(),
                    item_id,
                    format!("/6/{}!", 2 * (index + 1)),
                ))
            })
            .collect();
        Self { unique_id, items }
    }

    /// Look up an item by manifest id.
    pub fn item(&self, item_id: &str) -> Option<Arc<MemoryManifestItem>> {
        self.items.iter().find(|item| item.item_id == item_id).cloned()
    }
}

impl Package for MemoryPackage {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn manifest_items(&self) -> Vec<Arc<dyn ManifestItem>> {
        self.items
            .iter()
            .map(|item| Arc::clone(item) as Arc<dyn ManifestItem>)
            .collect()
    }

    fn manifest_item_for_cfi(&self, cfi: &str) -> Option<Arc<dyn ManifestItem>> {
        self.items
            .iter()
            .find(|item| item.cfi == cfi)
            .map(|item| Arc::clone(item) as Arc<dyn ManifestItem>)
    }
}

/// A container holding already-built packages.
///
/// `advertised` may list identifiers with no backing package, which models a
/// container whose contents changed after it was registered.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    advertised: Vec<String>,
    packages: HashMap<String, Arc<MemoryPackage>>,
}

impl MemoryContainer {
    pub fn new(packages: impl IntoIterator<Item = MemoryPackage>) -> Self {
        let mut container = Self::default();
        for package in packages {
            container.advertised.push(package.unique_id.clone());
            container
                .packages
                .insert(package.unique_id.clone(), Arc::new(package));
        }
        container
    }

    /// Advertise an identifier without providing its package.
    pub fn with_advertised(mut self, identifier: impl Into<String>) -> Self {
        self.advertised.push(identifier.into());
        self
    }
}

impl Container for MemoryContainer {
    fn package_identifiers(&self) -> Vec<String> {
        self.advertised.clone()
    }

    fn package(&self, identifier: &str) -> Result<Option<Arc<dyn Package>>, BoxError> {
        Ok(self
            .packages
            .get(identifier)
            .map(|package| Arc::clone(package) as Arc<dyn Package>))
    }
}

/// Opener serving [`MemoryContainer`]s by locator, counting every open.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    containers: RwLock<HashMap<Locator, Arc<MemoryContainer>>>,
    opens: AtomicUsize,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `container` openable at `locator`, replacing any previous one.
    pub fn insert(&self, locator: impl Into<Locator>, container: MemoryContainer) {
        self.containers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.into(), Arc::new(container));
    }

    pub fn remove(&self, locator: &Locator) {
        self.containers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(locator);
    }

    /// Number of `open` calls so far, successful or not.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ContainerOpener for MemoryOpener {
    fn open(&self, locator: &Locator) -> Result<Arc<dyn Container>, BoxError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .map(|container| Arc::clone(container) as Arc<dyn Container>)
            .ok_or_else(|| format!("no container at {locator}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_assigns_spine_cfis() {
        let package = MemoryPackage::new("pub-a", ["cover", "chapter-1"]);
        let items = package.manifest_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].cfi(), "/6/2!");
        assert_eq!(items[1].cfi(), "/6/4!");
        assert_eq!(items[1].package_id(), "pub-a");

        let found = package.manifest_item_for_cfi("/6/4!").unwrap();
        assert_eq!(found.item_id(), "chapter-1");
        assert!(package.manifest_item_for_cfi("/6/8!").is_none());
    }

    #[test]
    fn test_container_advertises_packages_in_order() {
        let container = MemoryContainer::new([
            MemoryPackage::new("pub-b", ["x"]),
            MemoryPackage::new("pub-a", ["y"]),
        ])
        .with_advertised("ghost");
        assert_eq!(container.package_identifiers(), vec!["pub-b", "pub-a", "ghost"]);
        assert!(container.package("pub-a").unwrap().is_some());
        assert!(container.package("ghost").unwrap().is_none());
    }

    #[test]
    fn test_opener_survives_poisoned_lock() {
        let opener = Arc::new(MemoryOpener::new());
        let poisoner = Arc::clone(&opener);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.containers.write().unwrap();
            panic!("poison the container map");
        })
        .join();
        assert!(result.is_err());
        assert!(opener.containers.is_poisoned());

        opener.insert("/books/a.epub", MemoryContainer::default());
        assert!(opener.open(&Locator::from("/books/a.epub")).is_ok());

        opener.remove(&Locator::from("/books/a.epub"));
        assert!(opener.open(&Locator::from("/books/a.epub")).is_err());
    }

    #[test]
    fn test_opener_counts_failed_opens() {
        let opener = MemoryOpener::new();
        opener.insert("/books/a.epub", MemoryContainer::default());

        assert!(opener.open(&Locator::from("/books/a.epub")).is_ok());
        assert!(opener.open(&Locator::from("/books/missing.epub")).is_err());
        assert_eq!(opener.open_count(), 2);
    }
}
