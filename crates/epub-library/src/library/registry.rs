//! Publication registry keyed by unique identifier.

use crate::address;
use crate::config::MalformedRecordPolicy;
use crate::container::{Container, ContainerOpener, ManifestItem, Package};
use crate::locator::Locator;
use crate::store::{self, LibraryRecord};
use crate::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// A registered publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub identifier: String,
    pub locator: Locator,
    /// Whether the package is currently cached.
    pub loaded: bool,
}

/// Known container, opened or not.
#[derive(Default)]
struct ContainerSlot {
    container: Option<Arc<dyn Container>>,
    /// Identifiers in the order the container reported them. The package
    /// table is authoritative; an identifier later moved to another locator
    /// stays listed here but no longer counts as hosted.
    identifiers: Vec<String>,
}

/// Where a publication lives, and its package once loaded.
struct PackageSlot {
    locator: Locator,
    package: Option<Arc<dyn Package>>,
}

#[derive(Default)]
struct Tables {
    containers: BTreeMap<Locator, ContainerSlot>,
    packages: BTreeMap<String, PackageSlot>,
}

impl Tables {
    /// Record `locator` and point each identifier at it.
    ///
    /// A `None` container keeps an already-opened one in place.
    fn register(
        &mut self,
        locator: Locator,
        container: Option<Arc<dyn Container>>,
        identifiers: Vec<String>,
    ) {
        let mut ordered: Vec<String> = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            if !ordered.contains(&identifier) {
                ordered.push(identifier);
            }
        }

        for identifier in &ordered {
            if let Some(previous) = self.packages.get(identifier) {
                if previous.locator != locator {
                    debug!(
                        "Publication {} moved from {} to {}",
                        identifier, previous.locator, locator
                    );
                }
            }
            self.packages.insert(
                identifier.clone(),
                PackageSlot {
                    locator: locator.clone(),
                    package: None,
                },
            );
        }

        let slot = self.containers.entry(locator).or_default();
        if container.is_some() {
            slot.container = container;
        }
        // Newly reported identifiers lead; earlier ones stay listed after them.
        let earlier = std::mem::take(&mut slot.identifiers);
        slot.identifiers = ordered;
        for identifier in earlier {
            if !slot.identifiers.contains(&identifier) {
                slot.identifiers.push(identifier);
            }
        }
    }

    /// Identifiers the package table maps to `locator`.
    ///
    /// Those the container reported come first, in its order; any others
    /// follow sorted by identifier.
    fn hosted_by(&self, locator: &Locator, slot: &ContainerSlot) -> Vec<String> {
        let is_hosted = |identifier: &str| {
            self.packages
                .get(identifier)
                .map(|entry| &entry.locator == locator)
                .unwrap_or(false)
        };

        let mut hosted: Vec<String> = slot
            .identifiers
            .iter()
            .filter(|identifier| is_hosted(identifier))
            .cloned()
            .collect();
        for (identifier, entry) in &self.packages {
            if &entry.locator == locator && !hosted.contains(identifier) {
                hosted.push(identifier.clone());
            }
        }
        hosted
    }
}

/// Registry of ePub containers and the publications they host.
///
/// The container table maps each [`Locator`] to its (lazily opened)
/// [`Container`]; the package table maps each publication identifier to the
/// locator of its container and, once resolved, the [`Package`] itself. Every
/// locator in the package table is a key of the container table.
///
/// All methods take `&self`; both tables sit behind one `RwLock`, and
/// container/package loading happens with the lock released.
pub struct Library {
    tables: RwLock<Tables>,
    opener: Arc<dyn ContainerOpener>,
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.read_tables();
        f.debug_struct("Library")
            .field("containers", &tables.containers.len())
            .field("publications", &tables.packages.len())
            .finish()
    }
}

impl Library {
    /// Create an empty library that opens containers with `opener`.
    pub fn new(opener: Arc<dyn ContainerOpener>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            opener,
        }
    }

    /// Load a library from a file written by [`Library::save_to_locator`].
    ///
    /// Containers and packages stay unloaded until first resolved. Records
    /// for the same locator on several lines are merged.
    pub fn load(
        locator: &Locator,
        opener: Arc<dyn ContainerOpener>,
        policy: MalformedRecordPolicy,
    ) -> Result<Self> {
        let path = require_path(locator)?;
        let contents = store::read_text(path)?.ok_or_else(|| LibraryError::Persistence {
            message: format!("Library file not found: {}", path.display()),
            path: Some(path.to_path_buf()),
            source: None,
        })?;

        let mut merged: Vec<LibraryRecord> = Vec::new();
        for record in store::parse_records(&contents, policy)? {
            match merged.iter_mut().find(|r| r.locator == record.locator) {
                Some(existing) => existing.identifiers.extend(record.identifiers),
                None => merged.push(record),
            }
        }

        let library = Self::new(opener);
        {
            let mut tables = library.write_tables();
            for record in merged {
                tables.register(record.locator, None, record.identifiers);
            }
            debug!(
                "Loaded library from {}: {} containers, {} publications",
                path.display(),
                tables.containers.len(),
                tables.packages.len()
            );
        }
        Ok(library)
    }

    // Table lock acquisition. Critical sections never panic halfway through
    // an update, so a poisoned lock still guards consistent tables.
    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================
    // Registration
    // ========================================

    /// Register every publication in an opened container.
    ///
    /// Overwrites any previous entry for `locator` and for each identifier the
    /// container reports; cached packages for those identifiers are dropped.
    pub fn add_container(&self, container: Arc<dyn Container>, locator: Locator) -> Result<()> {
        require_path(&locator)?;
        let identifiers = container.package_identifiers();
        debug!(
            "Registering container {} with {} publications",
            locator,
            identifiers.len()
        );
        self.write_tables()
            .register(locator, Some(container), identifiers);
        Ok(())
    }

    /// Open the container at `locator` and register its publications.
    ///
    /// Nothing is registered if the container cannot be opened.
    pub fn add_container_at(&self, locator: Locator) -> Result<()> {
        require_path(&locator)?;
        let container = self
            .opener
            .open(&locator)
            .map_err(|e| LibraryError::load_failure(&locator, e))?;
        self.add_container(container, locator)
    }

    /// Register publications hosted at `locator` without opening it.
    pub fn register_identifiers<I, S>(&self, locator: Locator, identifiers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        require_path(&locator)?;
        let identifiers: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        if let Some(empty) = identifiers.iter().position(|id| id.is_empty()) {
            return Err(LibraryError::InvalidIdentifier {
                message: format!("empty identifier at position {empty} for {locator}"),
            });
        }
        self.write_tables().register(locator, None, identifiers);
        Ok(())
    }

    /// Forget a container and every publication pointing at it.
    ///
    /// Returns `false` if the locator was not registered.
    pub fn forget_container(&self, locator: &Locator) -> bool {
        let mut tables = self.write_tables();
        if tables.containers.remove(locator).is_none() {
            return false;
        }
        tables.packages.retain(|_, entry| &entry.locator != locator);
        debug!("Forgot container {}", locator);
        true
    }

    // ========================================
    // Lookup
    // ========================================

    /// The locator registered for `identifier`, or [`Locator::Null`].
    pub fn locator_for(&self, identifier: &str) -> Locator {
        self.read_tables()
            .packages
            .get(identifier)
            .map(|entry| entry.locator.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.read_tables().packages.contains_key(identifier)
    }

    /// All registered publication identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        self.read_tables().packages.keys().cloned().collect()
    }

    /// All known container locators, sorted.
    pub fn container_locators(&self) -> Vec<Locator> {
        self.read_tables().containers.keys().cloned().collect()
    }

    /// Snapshot of the package table, sorted by identifier.
    pub fn entries(&self) -> Vec<LibraryEntry> {
        self.read_tables()
            .packages
            .iter()
            .map(|(identifier, entry)| LibraryEntry {
                identifier: identifier.clone(),
                locator: entry.locator.clone(),
                loaded: entry.package.is_some(),
            })
            .collect()
    }

    /// Number of registered publications.
    pub fn len(&self) -> usize {
        self.read_tables().packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_tables().packages.is_empty()
    }

    // ========================================
    // epub3:// URLs
    // ========================================

    /// The `epub3://` URL of a package.
    pub fn epub_url_for_package(&self, package: &dyn Package) -> String {
        address::package_url(package.unique_id())
    }

    /// The `epub3://` URL of a registered publication.
    pub fn epub_url_for_identifier(&self, identifier: &str) -> Result<String> {
        if !self.contains(identifier) {
            return Err(LibraryError::NotFound {
                identifier: identifier.to_string(),
            });
        }
        Ok(address::package_url(identifier))
    }

    /// The fragment URL addressing `item`: its package URL plus
    /// `#epubcfi(<cfi>)`.
    pub fn fragment_url_for_manifest_item(&self, item: &dyn ManifestItem) -> String {
        address::fragment_url(item.package_id(), &item.cfi())
    }

    /// Resolve an `epub3://` URL to its package, loading it on first use.
    pub fn package_for_url(&self, url: &str) -> Result<Arc<dyn Package>> {
        let identifier = address::identifier_from_url(url)?;
        self.package_for_identifier(&identifier)
    }

    /// Resolve a fragment URL to the manifest item it addresses.
    pub fn manifest_item_for_fragment_url(&self, url: &str) -> Result<Arc<dyn ManifestItem>> {
        let (base, cfi) = address::split_fragment_url(url)?;
        let package = self.package_for_url(base)?;
        package
            .manifest_item_for_cfi(cfi)
            .ok_or_else(|| LibraryError::FragmentNotFound {
                identifier: package.unique_id().to_string(),
                fragment: cfi.to_string(),
            })
    }

    // ========================================
    // Lazy loading
    // ========================================

    /// Resolve a publication identifier to its package, loading it on first
    /// use.
    ///
    /// The container is opened and the package parsed with the table lock
    /// released. When two callers race on the same publication, the first to
    /// publish wins and the other's result is dropped.
    pub fn package_for_identifier(&self, identifier: &str) -> Result<Arc<dyn Package>> {
        let (locator, cached_container) = {
            let tables = self.read_tables();
            let entry = tables
                .packages
                .get(identifier)
                .ok_or_else(|| LibraryError::NotFound {
                    identifier: identifier.to_string(),
                })?;
            if let Some(package) = &entry.package {
                return Ok(Arc::clone(package));
            }
            let container = tables
                .containers
                .get(&entry.locator)
                .and_then(|slot| slot.container.clone());
            (entry.locator.clone(), container)
        };

        let container = match cached_container {
            Some(container) => container,
            None => self.open_container(&locator)?,
        };

        let package = container
            .package(identifier)
            .map_err(|e| LibraryError::load_failure(&locator, e))?
            .filter(|package| package.unique_id() == identifier)
            .ok_or_else(|| {
                warn!(
                    "Container at {} advertised {} but does not contain it",
                    locator, identifier
                );
                LibraryError::ConsistencyViolation {
                    identifier: identifier.to_string(),
                    locator: locator.to_string(),
                }
            })?;

        let mut tables = self.write_tables();
        match tables.packages.get_mut(identifier) {
            Some(entry) if entry.locator == locator => {
                if let Some(existing) = &entry.package {
                    debug!("Publication {} was loaded concurrently; keeping first", identifier);
                    return Ok(Arc::clone(existing));
                }
                entry.package = Some(Arc::clone(&package));
                debug!("Cached publication {} from {}", identifier, locator);
            }
            _ => {
                warn!(
                    "Publication {} was re-registered while loading from {}; not caching",
                    identifier, locator
                );
            }
        }
        Ok(package)
    }

    /// Open the container at `locator` and publish it to the container table.
    fn open_container(&self, locator: &Locator) -> Result<Arc<dyn Container>> {
        debug!("Opening container at {}", locator);
        let opened = self
            .opener
            .open(locator)
            .map_err(|e| LibraryError::load_failure(locator, e))?;

        let mut tables = self.write_tables();
        match tables.containers.get_mut(locator) {
            Some(slot) => match &slot.container {
                Some(existing) => Ok(Arc::clone(existing)),
                None => {
                    slot.container = Some(Arc::clone(&opened));
                    Ok(opened)
                }
            },
            None => Ok(opened),
        }
    }

    // ========================================
    // Persistence
    // ========================================

    /// One record per container that still hosts at least one publication.
    pub fn records(&self) -> Vec<LibraryRecord> {
        let tables = self.read_tables();
        tables
            .containers
            .iter()
            .filter_map(|(locator, slot)| {
                let identifiers = tables.hosted_by(locator, slot);
                if identifiers.is_empty() {
                    debug!("Not persisting {}: no publications", locator);
                    None
                } else {
                    Some(LibraryRecord {
                        locator: locator.clone(),
                        identifiers,
                    })
                }
            })
            .collect()
    }

    /// Write the library to the file at `locator`.
    ///
    /// Fails with [`LibraryError::InvalidLocator`] before writing anything if
    /// a container path is not valid UTF-8, since the file stores locators as
    /// text and such a path would not read back as the same locator.
    pub fn save_to_locator(&self, locator: &Locator) -> Result<()> {
        let path = require_path(locator)?;
        let records = self.records();
        if let Some(record) = records.iter().find(|r| !r.locator.is_utf8()) {
            return Err(LibraryError::InvalidLocator {
                message: format!("container path is not valid UTF-8: {}", record.locator),
            });
        }
        store::atomic_write_text(path, &store::format_records(&records), false)?;
        debug!("Saved {} containers to {}", records.len(), path.display());
        Ok(())
    }
}

fn require_path(locator: &Locator) -> Result<&std::path::Path> {
    locator.path().ok_or_else(|| LibraryError::InvalidLocator {
        message: "null locator".to_string(),
    })
}
