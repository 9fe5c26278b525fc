//! Persistence of the library to a line-oriented text file.
//!
//! This module provides:
//! - The record format (`<locator>,<id1>,...,<idN>` per line)
//! - Atomic text file writes with optional backup

mod atomic;
mod records;

pub use atomic::{atomic_write_text, read_text};
pub use records::{format_records, parse_records, LibraryRecord};
