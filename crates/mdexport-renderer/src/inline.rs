//! Inline span formatting.
//!
//! Recognizes four inline constructs in a single left-to-right scan:
//! bold (`**text**`), italic (`*text*`), inline code (`` `text` ``) and links
//! (`[text](url)`). At each position the earliest match wins; when two
//! patterns start at the same offset, the order above decides.
//!
//! Matched spans are not scanned again, so `**bold *and italic***` yields a
//! single bold span whose text still contains the inner asterisk.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").unwrap());
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap());

/// Output mode for [`format_inline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineMode {
    /// Replace spans with `<b>`, `<i>`, `<code>` and `<a href>` markup.
    Markup,
    /// Collapse spans to their inner text, discarding link targets.
    Plain,
}

/// One span of a scanned text segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineSpan<'a> {
    /// Unformatted text.
    Text(&'a str),
    /// `**text**`.
    Bold(&'a str),
    /// `*text*`.
    Italic(&'a str),
    /// `` `text` ``.
    Code(&'a str),
    /// `[text](url)`.
    Link {
        /// Visible link text.
        text: &'a str,
        /// Link target.
        url: &'a str,
    },
}

impl InlineSpan<'_> {
    /// Visible text of the span.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text)
            | Self::Bold(text)
            | Self::Italic(text)
            | Self::Code(text)
            | Self::Link { text, .. } => text,
        }
    }
}

#[derive(Clone, Copy)]
enum SpanKind {
    Bold,
    Italic,
    Code,
    Link,
}

/// Patterns in tie-breaking priority order.
fn patterns() -> [(SpanKind, &'static Regex); 4] {
    [
        (SpanKind::Bold, &BOLD_RE),
        (SpanKind::Italic, &ITALIC_RE),
        (SpanKind::Code, &CODE_RE),
        (SpanKind::Link, &LINK_RE),
    ]
}

/// Scan a text segment into inline spans.
#[must_use]
pub fn parse_inline(text: &str) -> Vec<InlineSpan<'_>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];

        // Strict comparison keeps the higher-priority pattern on ties.
        let mut earliest: Option<(SpanKind, regex::Captures<'_>)> = None;
        for (kind, re) in patterns() {
            if let Some(caps) = re.captures(rest) {
                let start = caps.get(0).map_or(usize::MAX, |m| m.start());
                let better = earliest
                    .as_ref()
                    .is_none_or(|(_, best)| start < best.get(0).map_or(usize::MAX, |m| m.start()));
                if better {
                    earliest = Some((kind, caps));
                }
            }
        }

        let Some((kind, caps)) = earliest else {
            spans.push(InlineSpan::Text(rest));
            break;
        };

        let Some(whole) = caps.get(0) else {
            break;
        };
        if whole.start() > 0 {
            spans.push(InlineSpan::Text(&rest[..whole.start()]));
        }

        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
        spans.push(match kind {
            SpanKind::Bold => InlineSpan::Bold(group(1)),
            SpanKind::Italic => InlineSpan::Italic(group(1)),
            SpanKind::Code => InlineSpan::Code(group(1)),
            SpanKind::Link => InlineSpan::Link {
                text: group(1),
                url: group(2),
            },
        });

        pos += whole.end();
    }

    spans
}

/// Apply inline formatting to a text segment.
///
/// # Example
///
/// ```
/// use mdexport_renderer::{InlineMode, format_inline};
///
/// assert_eq!(format_inline("**bold**", InlineMode::Plain), "bold");
/// assert_eq!(format_inline("**bold**", InlineMode::Markup), "<b>bold</b>");
/// ```
#[must_use]
pub fn format_inline(text: &str, mode: InlineMode) -> String {
    let mut out = String::with_capacity(text.len());
    for span in parse_inline(text) {
        match (mode, span) {
            (InlineMode::Plain, span) => out.push_str(span.text()),
            (InlineMode::Markup, InlineSpan::Text(t)) => out.push_str(t),
            (InlineMode::Markup, InlineSpan::Bold(t)) => write!(out, "<b>{t}</b>").unwrap(),
            (InlineMode::Markup, InlineSpan::Italic(t)) => write!(out, "<i>{t}</i>").unwrap(),
            (InlineMode::Markup, InlineSpan::Code(t)) => {
                write!(out, "<code>{t}</code>").unwrap();
            }
            (InlineMode::Markup, InlineSpan::Link { text, url }) => {
                write!(out, r#"<a href="{url}">{text}</a>"#).unwrap();
            }
        }
    }
    out
}
