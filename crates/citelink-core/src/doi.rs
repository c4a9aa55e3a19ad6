//! DOI string normalization.
//!
//! Accepts the messy forms seen in identifier lists and citation feeds
//! (resolver URLs, mixed case, trailing sentence punctuation, mojibake
//! hyphens) and reduces them to the bare lowercase `10.x/y` form.

use std::sync::LazyLock;

use regex::Regex;

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(10\.\d+/\S+)").expect("invalid DOI regex"));

/// Normalize a DOI-ish string to its bare lowercase form.
///
/// Returns `None` when no DOI can be found in the input, letting callers
/// flag the value as a non-DOI identifier rather than fail.
pub fn clean_doi(dirty: &str) -> Option<String> {
    // Mojibake non-breaking hyphen seen in scraped citation strings
    let repaired = dirty.trim().replace('\u{2010}', "-").replace("‚Äê", "-");
    let lowered = repaired.to_lowercase();

    let m = DOI_RE.find(&lowered)?;
    let mut doi: String = m
        .as_str()
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect();

    // Strip URL fragment and quotes (not valid in DOIs per doi.org syntax)
    if let Some(pos) = doi.find('#') {
        doi.truncate(pos);
    }
    doi.retain(|c| c != '"');

    // Trailing period or comma is likely sentence punctuation
    while doi.ends_with('.') || doi.ends_with(',') {
        doi.pop();
    }

    if doi.is_empty() { None } else { Some(doi) }
}
