//! Title marker patterns.
//!
//! All matching is case-insensitive and whole-word.

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

lazy_static! {
    /// A grading marker: an unambiguous company name, an ambiguous company
    /// name immediately followed by a grade, or the word "graded"/"slab".
    pub static ref GRADING_MARKER: Regex = Regex::new(
        r"(?i)\b(?:psa|bgs|cgc|sgc|beckett)(?:[\s\-]?\d|\b)|\b(?:ace|tag)[\s\-]?(?:10|[1-9](?:\.5)?)\b|\b(?:graded|slab|slabbed)\b"
    )
    .unwrap();

    /// Mint or near-mint condition markers.
    pub static ref MINT_MARKER: Regex =
        Regex::new(r"(?i)\b(?:gem mint|near mint|nm-mt|m/nm|nm|mint)\b").unwrap();

    /// Markers of a sealed or brand-new item.
    pub static ref SEALED_MARKER: Regex =
        Regex::new(r"(?i)\b(?:factory sealed|sealed|brand new|new|unopened)\b").unwrap();
}

/// Companies recognised when the request names no specific one.
const GRADING_COMPANIES: &[&str] = &["psa", "bgs", "cgc", "sgc", "beckett", "ace", "tag"];

/// Whole-word alternation of `terms`. `None` when there are no usable terms.
pub fn word_pattern(terms: &[String]) -> Option<Regex> {
    let escaped: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if escaped.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
    Regex::new(&pattern)
        .map_err(|e| warn!("Ignoring unusable term list {:?}: {}", terms, e))
        .ok()
}

/// Pattern for a specific company and/or grade token, e.g. `PSA 10`,
/// `PSA-10` or `PSA10`. Trailing zero decimals are the same grade
/// (`PSA 9` matches `PSA 9.0`), but a grade does not match a longer
/// half-grade (`PSA 9` does not match `PSA 9.5`).
pub fn grade_pattern(company: Option<&str>, grade: Option<&str>) -> Option<Regex> {
    let company = match company {
        Some(c) => regex::escape(c.trim()),
        None => GRADING_COMPANIES.join("|"),
    };
    let pattern = match grade {
        Some(g) => format!(
            r"(?i)\b(?:{})[\s\-]?{}(?:\.0+)?(?:$|[^0-9A-Za-z_.]|\.[^0-9]|\.$)",
            company,
            regex::escape(g.trim())
        ),
        None => format!(r"(?i)\b(?:{})\b", company),
    };
    Regex::new(&pattern)
        .map_err(|e| warn!("Ignoring unusable grade filter: {}", e))
        .ok()
}
