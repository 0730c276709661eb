//! Inline citation markers and trailing reference blocks.
//!
//! Agents answer with `[n]` markers in the body and a block such as
//!
//! ```text
//! References
//! [1] First source
//! [2] Second source,
//!     continued on an indented line
//! ```
//!
//! at the end. This module splits the two apart and shifts marker numbers
//! so several agents' citations can share one list.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::AgentError;

#[allow(clippy::expect_used)]
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("valid marker regex"));

#[allow(clippy::expect_used)]
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(\d+)\]\s*(.*)$").expect("valid entry regex"));

/// Header words that open a reference block (compared lower-cased).
const HEADER_WORDS: [&str; 4] = ["references", "reference", "referencias", "referencia"];

/// Citations found in one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationInfo {
    /// Reference strings in block order; entry `i` is cited as `[i + 1]`.
    pub references: Vec<String>,
    /// Marker numbers used in the body.
    pub cited: BTreeSet<u32>,
}

impl CitationInfo {
    /// Markers in the body with no matching reference.
    pub fn dangling(&self) -> impl Iterator<Item = u32> + '_ {
        let n = self.references.len();
        self.cited
            .iter()
            .copied()
            .filter(move |&m| m == 0 || !usize::try_from(m).is_ok_and(|m| m <= n))
    }

    /// References never cited in the body, as 1-based numbers.
    pub fn uncited(&self) -> impl Iterator<Item = u32> + '_ {
        (1..=self.references.len())
            .filter_map(|i| u32::try_from(i).ok())
            .filter(|i| !self.cited.contains(i))
    }
}

/// A response split into body and citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Text before the reference block, trailing whitespace removed.
    pub body: String,
    /// References and markers.
    pub citations: CitationInfo,
}

/// Splits `text` into its body and trailing reference block.
///
/// The last line that reads as a references header (any case, optional
/// markdown heading or emphasis, optional trailing colon, English or
/// Spanish) opens the block. Every non-blank line after it must be a
/// `[n] citation` entry or an indented continuation of the previous entry,
/// and entries must be numbered `1..=n` in order. The first unindented
/// non-entry line after at least one entry ends the block; it and everything
/// after it are appended to the body. Text with no header, or a header
/// followed by nothing, has no references and is returned whole.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] if the block is malformed.
pub fn parse_response(text: &str) -> Result<ParsedResponse, AgentError> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(header_idx) = lines.iter().rposition(|line| is_references_header(line)) else {
        return Ok(whole(text));
    };

    let mut references: Vec<String> = Vec::new();
    let mut trailer_idx = None;
    for (offset, line) in lines[header_idx + 1..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(caps) = ENTRY_RE.captures(line) {
            let number: Option<usize> = caps[1].parse().ok();
            let expected = references.len() + 1;
            if number != Some(expected) {
                return Err(malformed(
                    format!("reference [{}] out of order, expected [{expected}]", &caps[1]),
                    text,
                ));
            }
            references.push(caps[2].trim().to_string());
        } else if line.starts_with([' ', '\t']) {
            let Some(last) = references.last_mut() else {
                return Err(malformed(
                    "continuation line before the first reference".to_string(),
                    text,
                ));
            };
            last.push(' ');
            last.push_str(line.trim());
        } else if references.is_empty() {
            return Err(malformed(
                format!(
                    "line {} of the reference block is not an entry",
                    header_idx + offset + 2
                ),
                text,
            ));
        } else {
            trailer_idx = Some(header_idx + 1 + offset);
            break;
        }
    }

    if references.is_empty() {
        return Ok(whole(text));
    }

    let mut body = lines[..header_idx].join("\n").trim_end().to_string();
    if let Some(idx) = trailer_idx {
        let trailer = lines[idx..].join("\n");
        debug!(trailer = %trailer.trim(), "text after the reference block kept in the body");
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(trailer.trim());
    }
    let cited = cited_markers(&body);
    Ok(ParsedResponse {
        body,
        citations: CitationInfo { references, cited },
    })
}

/// Adds `offset` to every `[n]` marker in `body`.
///
/// Markers beyond the agent's own reference count are shifted too. A marker
/// whose shifted number would not fit in a `u32` is left as is.
#[must_use]
pub fn renumber_markers(body: &str, offset: u32) -> String {
    if offset == 0 {
        return body.to_string();
    }
    MARKER_RE
        .replace_all(body, |caps: &Captures<'_>| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(|n| n.checked_add(offset))
                .map_or_else(|| caps[0].to_string(), |n| format!("[{n}]"))
        })
        .into_owned()
}

/// Marker numbers appearing in `text`.
#[must_use]
pub fn cited_markers(text: &str) -> BTreeSet<u32> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Formats references as a block headed by `header`.
#[must_use]
pub fn format_reference_block(header: &str, references: &[String]) -> String {
    let mut block = header.to_string();
    for (i, reference) in references.iter().enumerate() {
        let _ = write!(block, "\n[{}] {reference}", i + 1);
    }
    block
}

fn is_references_header(line: &str) -> bool {
    let stripped = line
        .trim()
        .trim_start_matches('#')
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
        .trim_end_matches(':')
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
    let lower = stripped.to_lowercase();
    HEADER_WORDS.contains(&lower.as_str())
}

fn whole(text: &str) -> ParsedResponse {
    ParsedResponse {
        body: text.trim_end().to_string(),
        citations: CitationInfo {
            references: Vec::new(),
            cited: cited_markers(text),
        },
    }
}

fn malformed(message: String, text: &str) -> AgentError {
    AgentError::ResponseParse {
        message: format!("malformed reference block: {message}"),
        content: text.to_string(),
    }
}
