//! Flags clinical abbreviations used without their expansion.
//!
//! The note is advisory: it is appended to the answer and never blocks it.

use super::locale::Locale;

/// Spanish clinical abbreviations.
const SPANISH_ABBREVIATIONS: &[&str] = &[
    "HTA", "DM2", "IAM", "EPOC", "ICC", "ERC", "FA", "TEP", "ACV", "IRC", "TVP", "SCA", "IECA",
    "ARA-II", "AINE",
];

/// English clinical abbreviations.
const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "COPD", "CHF", "MI", "CKD", "AF", "PE", "DVT", "ACS", "ACE", "ARB", "NSAID", "HTN", "T2DM",
    "CVA", "GERD",
];

/// Abbreviations that appear in `text` but are never expanded.
///
/// Matching is case-sensitive and whole-word. An occurrence counts as
/// expanded when it sits right after `(` or is followed by a parenthesised
/// expansion, e.g. `EPOC (enfermedad pulmonar obstructiva crónica)`. One
/// expanded occurrence covers every other use of the same abbreviation.
/// Spanish terms are listed first, each list in its fixed order.
#[must_use]
pub fn find_unexpanded(text: &str) -> Vec<&'static str> {
    SPANISH_ABBREVIATIONS
        .iter()
        .chain(ENGLISH_ABBREVIATIONS)
        .copied()
        .filter(|term| {
            let mut seen = false;
            for (idx, _) in text.match_indices(term) {
                if !is_whole_word(text, idx, term.len()) {
                    continue;
                }
                if is_expanded(text, idx, term.len()) {
                    return false;
                }
                seen = true;
            }
            seen
        })
        .collect()
}

/// Builds the terminology note for `text`, if any abbreviation needs one.
#[must_use]
pub fn terminology_note(text: &str, locale: Locale) -> Option<String> {
    let terms = find_unexpanded(text);
    if terms.is_empty() {
        return None;
    }
    Some(format!(
        "*{}:* {} {}.",
        locale.terminology_header(),
        locale.terminology_lead(),
        terms.join(", ")
    ))
}

fn is_whole_word(text: &str, start: usize, len: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[start + len..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn is_expanded(text: &str, start: usize, len: usize) -> bool {
    let inside_parens = text[..start].trim_end().ends_with('(');
    let followed_by_parens = text[start + len..].trim_start().starts_with('(');
    inside_parens || followed_by_parens
}
