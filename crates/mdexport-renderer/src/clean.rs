//! Text cleaning pre-pass.
//!
//! Every document is reduced to plain ASCII before classification: emoji are
//! removed, remaining non-ASCII characters are transliterated with
//! [`deunicode`], and whatever still falls outside ASCII is dropped.

use std::sync::LazyLock;

use regex::Regex;

/// Emoji blocks, regional indicators, variation selectors, keycap and ZWJ joiners.
static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x{1F000}-\x{1FAFF}",
        r"\x{2600}-\x{27BF}",
        r"\x{2300}-\x{23FF}",
        r"\x{2B00}-\x{2BFF}",
        r"\x{3030}\x{303D}\x{3297}\x{3299}",
        r"\x{FE00}-\x{FE0F}",
        r"\x{200D}\x{20E3}",
        r"\x{E0020}-\x{E007F}]",
    ))
    .unwrap()
});

/// Configurable text cleaner.
///
/// The default cleaner removes emoji and transliterates Unicode. Either step
/// can be switched off; non-ASCII characters are always dropped at the end.
#[derive(Clone, Copy, Debug)]
pub struct TextCleaner {
    remove_emoji: bool,
    remove_unicode: bool,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self {
            remove_emoji: true,
            remove_unicode: true,
        }
    }
}

impl TextCleaner {
    /// Create a cleaner with both emoji removal and transliteration enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable emoji removal.
    #[must_use]
    pub fn remove_emoji(mut self, enabled: bool) -> Self {
        self.remove_emoji = enabled;
        self
    }

    /// Enable or disable transliteration of non-ASCII characters.
    ///
    /// When disabled, non-ASCII characters are dropped instead of transliterated.
    #[must_use]
    pub fn remove_unicode(mut self, enabled: bool) -> Self {
        self.remove_unicode = enabled;
        self
    }

    /// Clean a piece of text.
    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        let text = if self.remove_emoji {
            EMOJI_RE.replace_all(text, "")
        } else {
            text.into()
        };

        let text = if self.remove_unicode && !text.is_ascii() {
            deunicode::deunicode_with_tofu(&text, "").into()
        } else {
            text
        };

        let ascii: String = text.chars().filter(char::is_ascii).collect();
        ascii.trim().to_owned()
    }
}

/// Clean text with emoji removal and transliteration enabled.
///
/// Idempotent: `clean(&clean(x)) == clean(x)`.
#[must_use]
pub fn clean(text: &str) -> String {
    TextCleaner::default().clean(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ascii_text_unchanged() {
        let text = "# Title\n\nSome **bold** text.";
        assert_eq!(clean(text), text);
    }

    #[test]
    fn test_strips_surrounding_whitespace() {
        assert_eq!(clean("\n\n  hello  \n"), "hello");
    }

    #[test]
    fn test_removes_emoji() {
        let cleaned = clean("Launch \u{1F680} done \u{2705}!");
        assert_eq!(cleaned, "Launch  done !");
        assert!(cleaned.chars().all(|c| !EMOJI_RE.is_match(&c.to_string())));
    }

    #[test]
    fn test_removes_emoji_sequences() {
        // Family emoji joined with ZWJ plus a variation selector.
        let cleaned = clean("a\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}b \u{2764}\u{FE0F}c");
        assert_eq!(cleaned, "ab c");
    }

    #[test]
    fn test_transliterates_accents() {
        assert_eq!(clean("Caf\u{e9} na\u{ef}ve \u{fc}ber"), "Cafe naive uber");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("\u{1F600}"), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "plain",
            "  spaced  ",
            "R\u{e9}sum\u{e9} \u{1F4C4}",
            "\u{4e2d}\u{6587} text",
            "quotes \u{201c}smart\u{201d} \u{2014} dash",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_output_is_ascii() {
        let cleaned = clean("\u{3053}\u{3093}\u{306b}\u{3061}\u{306f} \u{0416} \u{2603} \u{00a9}");
        assert!(cleaned.is_ascii());
    }

    #[test]
    fn test_keep_emoji_still_drops_non_ascii() {
        let cleaner = TextCleaner::new().remove_emoji(false);
        let cleaned = cleaner.clean("ok \u{1F680}");
        assert!(cleaned.is_ascii());
        assert!(cleaned.starts_with("ok"));
    }

    #[test]
    fn test_without_transliteration_drops_accents() {
        let cleaner = TextCleaner::new().remove_unicode(false);
        assert_eq!(cleaner.clean("Caf\u{e9}"), "Caf");
    }
}
