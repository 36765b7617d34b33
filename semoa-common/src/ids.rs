//! Identifier normalization
//!
//! Entity references arrive either bare (`W2741809807`) or as resource URIs
//! (`https://openalex.org/W2741809807`). Everything downstream keys on the
//! bare form, so every identifier is passed through [`normalize_id`] before it
//! is compared, stored in a frontier or written to a table.

/// Strip a resource URI down to its trailing identifier segment
///
/// Inputs that are not `http://` / `https://` URIs are returned unchanged, as
/// are URIs with no non-empty final segment. Idempotent: a stripped result has
/// no `/`, and an unstripped URI is left alone again on the second pass.
pub fn normalize_id(reference: &str) -> &str {
    let rest = match reference
        .strip_prefix("https://")
        .or_else(|| reference.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return reference,
    };

    match rest.trim_end_matches('/').rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => id,
        _ => reference,
    }
}
