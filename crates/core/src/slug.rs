//! Text normalization shared by categories and quiz urls.

/// Collapses every run of whitespace into a single hyphen.
///
/// Leading and trailing whitespace is dropped. Case and punctuation are kept,
/// so `"straw.berries"` stays as it is while `"black berries"` becomes
/// `"black-berries"`.
#[must_use]
pub fn hyphenate_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Builds a url-safe slug.
///
/// Whitespace runs become hyphens, anything that is neither alphanumeric nor
/// a hyphen is removed, hyphen runs collapse to one and the result never
/// starts or ends with a hyphen. The output is lowercase.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for ch in raw.chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.extend(ch.to_lowercase());
        }
        // other characters are dropped without breaking the current word
    }

    out
}
