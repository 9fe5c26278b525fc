//! `epub3://` addressing.
//!
//! A publication URL names a publication by unique identifier only:
//! `epub3://<identifier>/`. Appending `#epubcfi(<cfi>)` addresses a location
//! inside it. Identifiers are percent-encoded so that `urn:uuid:...` style
//! identifiers stay a single authority component.

use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};

/// The URL of the publication with the given unique identifier.
pub fn package_url(identifier: &str) -> String {
    format!(
        "{}{}{}/",
        LibraryConfig::URL_SCHEME,
        LibraryConfig::URL_SCHEME_SEPARATOR,
        urlencoding::encode(identifier)
    )
}

/// A package URL followed by a CFI fragment.
pub fn fragment_url(identifier: &str, cfi: &str) -> String {
    format!(
        "{}{}{}{}{}",
        package_url(identifier),
        LibraryConfig::FRAGMENT_SEPARATOR,
        LibraryConfig::CFI_PREFIX,
        cfi,
        LibraryConfig::CFI_SUFFIX
    )
}

/// Extract the publication identifier from an `epub3://` URL.
///
/// Anything after the authority (path, query, fragment) is ignored.
pub fn identifier_from_url(url: &str) -> Result<String> {
    let prefix = format!(
        "{}{}",
        LibraryConfig::URL_SCHEME,
        LibraryConfig::URL_SCHEME_SEPARATOR
    );
    let scheme_len = prefix.len();
    let has_scheme = url
        .get(..scheme_len)
        .map(|head| head.eq_ignore_ascii_case(&prefix))
        .unwrap_or(false);
    if !has_scheme {
        return Err(invalid(url, "not an epub3:// URL"));
    }

    let rest = &url[scheme_len..];
    let end = rest.find(['/', '#', '?']).unwrap_or(rest.len());
    let encoded = &rest[..end];
    if encoded.is_empty() {
        return Err(invalid(url, "missing publication identifier"));
    }

    urlencoding::decode(encoded)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| invalid(url, "identifier is not valid UTF-8 after decoding"))
}

/// Split a fragment URL into its base URL and CFI.
///
/// The `epubcfi(...)` wrapper is optional on input; a bare fragment is taken
/// as the CFI itself.
pub fn split_fragment_url(url: &str) -> Result<(&str, &str)> {
    let (base, fragment) = url
        .split_once(LibraryConfig::FRAGMENT_SEPARATOR)
        .ok_or_else(|| invalid(url, "missing fragment"))?;

    let cfi = match fragment.strip_prefix(LibraryConfig::CFI_PREFIX) {
        Some(wrapped) => wrapped
            .strip_suffix(LibraryConfig::CFI_SUFFIX)
            .ok_or_else(|| invalid(url, "unterminated epubcfi( wrapper"))?,
        None => fragment,
    };

    if cfi.is_empty() {
        return Err(invalid(url, "empty fragment"));
    }
    Ok((base, cfi))
}

fn invalid(url: &str, reason: &str) -> LibraryError {
    LibraryError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
