//! The publication library.
//!
//! This is a library in the smallest sense: it tracks ePub containers by the
//! unique identifiers of the publications inside them, storing each
//! container's location as given. Its job is inter-publication linking: an
//! `epub3://<identifier>/` URL keeps working wherever the file lives, as long
//! as the identifier stays registered.
//!
//! Two tables back it:
//! - **Containers**: every known container locator, with the opened
//!   container once something needed it
//! - **Publications**: identifier to container locator, with the parsed
//!   package once resolved
//!
//! Applications normally hold one library, reachable through
//! [`Library::main_library`]. It can be written to disk and handed back to
//! `main_library` at the next startup.

mod main_library;
mod registry;

pub use registry::{Library, LibraryEntry};
