//! Input validation and sanitization for saved items.
//!
//! Everything the store accepts from a caller passes through here before
//! it can reach the persisted collection: URLs are parsed and scheme-checked,
//! titles are stripped of markup-like tags and length-capped, and the
//! favicon location is derived from the host. Favicon *fetching* is a view
//! concern and out of scope; the derived URL is never re-validated at read
//! time.

use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Regex for markup-like tags: `<...>` spans without a nested `<`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// Parse and validate a URL for saving.
///
/// Accepts syntactically valid absolute URLs with scheme `http` or
/// `https`; everything else, including script-injection schemes like
/// `javascript:`, fails with [`Error::InvalidUrl`]. The returned [`Url`]
/// serializes to the canonical form used as the dedup key.
pub fn canonicalize_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let parsed =
        Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("'{trimmed}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!(
            "'{trimmed}': unsupported scheme '{other}'"
        ))),
    }
}

/// Sanitize a title for storage.
///
/// Strips markup-like tags until none remain (so tags reassembled by an
/// earlier removal are caught too), trims surrounding whitespace, then
/// hard-truncates to `max_len` code units. Truncation is silent; an
/// over-long title is not an error.
#[must_use]
pub fn sanitize_title(raw: &str, max_len: usize) -> String {
    let mut text = raw.to_string();
    loop {
        let stripped = TAG_RE.replace_all(&text, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    let trimmed = text.trim();
    let capped = match trimmed.char_indices().nth(max_len) {
        Some((cut, _)) => &trimmed[..cut],
        None => trimmed,
    };
    // The cut can expose whitespace that was interior before truncation.
    capped.trim_end().to_string()
}

/// Derive the favicon location for a saved URL.
///
/// Deterministic host-based derivation; `None` when the URL carries no
/// host. The result is stored as-is and never fetched or re-checked by
/// the core.
#[must_use]
pub fn favicon_url(url: &Url) -> Option<String> {
    url.host_str()
        .map(|host| format!("https://{host}/favicon.ico"))
}
