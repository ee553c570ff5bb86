//! Content checks and metadata extraction run before conversion.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::clean::clean;

static FRONT_MATTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n").unwrap());
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").unwrap());

/// Check Markdown for common structural mistakes.
///
/// Returns human-readable warnings; an empty list means nothing suspicious
/// was found. Warnings never block conversion.
#[must_use]
pub fn validate_content(text: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    if text.matches("```").count() % 2 != 0 {
        warnings.push("Unclosed code block detected".to_owned());
    }

    if text.matches('[').count() != text.matches(']').count() {
        warnings.push("Unclosed markdown links detected".to_owned());
    }

    let mut in_table = false;
    for (i, line) in text.split('\n').enumerate() {
        if line.trim_start().starts_with('|') {
            in_table = true;
        } else if in_table && line.trim().is_empty() {
            in_table = false;
        } else if in_table && !line.contains('|') {
            warnings.push(format!("Table formatting issue at line {}", i + 1));
        }
    }

    warnings
}

/// Extract `key: value` front matter and the first level-1 heading as `title`.
#[must_use]
pub fn extract_metadata(text: &str) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    if let Some(caps) = FRONT_MATTER_RE.captures(text) {
        for line in caps[1].split('\n') {
            if let Some((key, value)) = line.split_once(':') {
                metadata.insert(key.trim().to_owned(), value.trim().to_owned());
            }
        }
    }

    if let Some(caps) = TITLE_RE.captures(text) {
        metadata.insert("title".to_owned(), clean(&caps[1]));
    }

    metadata
}
