//! Header/footer settings.
//!
//! Read either from the `[header_footer]` section of `mdexport.toml` or from a
//! standalone file with `[header]`, `[footer]` and `[page]` tables. Every
//! field is optional and falls back to the header or footer default.

use std::path::Path;

use mdexport_renderer::{Alignment, HeaderFooterConfig, HeaderFooterStyle, PageMargins};
use serde::Deserialize;

use crate::ConfigError;
use crate::expand::expand_opt;

/// Raw header or footer style as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StyleRaw {
    text: Option<String>,
    font_name: Option<String>,
    font_size: Option<f32>,
    alignment: Option<String>,
    color: Option<String>,
    bold: Option<bool>,
    italic: Option<bool>,
}

impl StyleRaw {
    fn resolve(&self, defaults: HeaderFooterStyle, field: &str) -> HeaderFooterStyle {
        let alignment = match self.alignment.as_deref().map(|v| (v, Alignment::parse(v))) {
            Some((_, Some(alignment))) => alignment,
            Some((value, None)) => {
                tracing::warn!(
                    field,
                    value,
                    "Alignment must be one of: left, center, right; using default"
                );
                defaults.alignment
            }
            None => defaults.alignment,
        };

        let style = HeaderFooterStyle {
            text: self.text.clone().unwrap_or(defaults.text),
            font_name: self.font_name.clone().unwrap_or(defaults.font_name),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            alignment,
            color: self.color.clone().unwrap_or(defaults.color),
            bold: self.bold.unwrap_or(defaults.bold),
            italic: self.italic.unwrap_or(defaults.italic),
        };

        // Kept as written; emitters skip an undrawable decoration at render time.
        if let Err(e) = style.validate() {
            tracing::warn!(field, error = %e, "Invalid header/footer style");
        }
        style
    }
}

/// Raw page geometry as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageRaw {
    margin_top: Option<f32>,
    margin_bottom: Option<f32>,
    margin_left: Option<f32>,
    margin_right: Option<f32>,
    header_distance: Option<f32>,
    footer_distance: Option<f32>,
}

impl PageRaw {
    fn resolve(&self, field: &str) -> PageMargins {
        let defaults = PageMargins::default();
        let pick = |name: &str, value: Option<f32>, default: f32| match value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(v) => {
                tracing::warn!(
                    field = %format!("{field}.{name}"),
                    value = v,
                    "Margin must be a non-negative number of inches; using default"
                );
                default
            }
            None => default,
        };
        PageMargins {
            top: pick("margin_top", self.margin_top, defaults.top),
            bottom: pick("margin_bottom", self.margin_bottom, defaults.bottom),
            left: pick("margin_left", self.margin_left, defaults.left),
            right: pick("margin_right", self.margin_right, defaults.right),
            header_distance: pick("header_distance", self.header_distance, defaults.header_distance),
            footer_distance: pick("footer_distance", self.footer_distance, defaults.footer_distance),
        }
    }
}

/// Raw `[header_footer]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct HeaderFooterRaw {
    pub(crate) enabled: bool,
    header: StyleRaw,
    footer: StyleRaw,
    page: PageRaw,
}

impl Default for HeaderFooterRaw {
    fn default() -> Self {
        Self {
            enabled: true,
            header: StyleRaw::default(),
            footer: StyleRaw::default(),
            page: PageRaw::default(),
        }
    }
}

impl HeaderFooterRaw {
    /// Expand `${VAR}` references in header and footer text.
    pub(crate) fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand_opt(&mut self.header.text, "header_footer.header.text")?;
        expand_opt(&mut self.footer.text, "header_footer.footer.text")?;
        Ok(())
    }

    /// Apply per-field defaults. `prefix` names the section in warnings.
    ///
    /// Out-of-range values never fail loading: alignment and margins fall
    /// back to their defaults, while unusable colors and font sizes are kept
    /// and the decoration is skipped when a document is rendered.
    pub(crate) fn resolve(&self, prefix: &str) -> HeaderFooterConfig {
        let field = |name: &str| {
            if prefix.is_empty() {
                name.to_owned()
            } else {
                format!("{prefix}.{name}")
            }
        };
        HeaderFooterConfig {
            header: self
                .header
                .resolve(HeaderFooterStyle::default_header(), &field("header")),
            footer: self
                .footer
                .resolve(HeaderFooterStyle::default_footer(), &field("footer")),
            page: self.page.resolve(&field("page")),
        }
    }
}

/// Load a standalone header/footer file.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_header_footer(path: &Path) -> Result<HeaderFooterConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Header/footer config not found, using defaults");
        return Ok(HeaderFooterConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let raw: HeaderFooterRaw = toml::from_str(&content)?;
    let config = raw.resolve("");
    tracing::info!(path = %path.display(), "Loaded header/footer config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_header_footer(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, HeaderFooterConfig::default());
    }

    #[test]
    fn test_per_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header_footer.toml");
        std::fs::write(
            &path,
            r##"
[header]
text = "Internal"
alignment = "right"

[footer]
font_size = 8

[page]
margin_top = 1.5
"##,
        )
        .unwrap();

        let config = load_header_footer(&path).unwrap();

        assert_eq!(config.header().text, "Internal");
        assert_eq!(config.header().alignment, Alignment::Right);
        assert_eq!(config.header().font_size, 10.0);
        assert_eq!(config.header().color, "#333333");

        assert_eq!(
            config.footer().text,
            "Copyright (c) 2025 GoAGI All rights reserved."
        );
        assert_eq!(config.footer().font_size, 8.0);
        assert_eq!(config.footer().color, "#666666");

        assert_eq!(config.page_margins().top, 1.5);
        assert_eq!(config.page_margins().bottom, 1.0);
        assert_eq!(config.page_margins().header_distance, 0.5);
    }

    #[test]
    fn test_invalid_alignment_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header_footer.toml");
        std::fs::write(&path, "[footer]\nalignment = \"justify\"\n").unwrap();

        let config = load_header_footer(&path).unwrap();
        assert_eq!(config.footer().alignment, Alignment::Center);
    }

    #[test]
    fn test_invalid_color_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header_footer.toml");
        std::fs::write(&path, "[header]\ncolor = \"red\"\nfont_size = -2\n").unwrap();

        let config = load_header_footer(&path).unwrap();

        assert_eq!(config.header().color, "red");
        assert!(config.header().validate().is_err());
        assert_eq!(config.footer(), &HeaderFooterStyle::default_footer());
    }

    #[test]
    fn test_negative_margin_falls_back() {
        let raw: HeaderFooterRaw =
            toml::from_str("[page]\nmargin_left = -1.0\nmargin_right = 0.75\n").unwrap();
        let config = raw.resolve("header_footer");
        assert_eq!(config.page_margins().left, PageMargins::default().left);
        assert_eq!(config.page_margins().right, 0.75);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header_footer.toml");
        std::fs::write(&path, "[header\n").unwrap();
        assert!(matches!(
            load_header_footer(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
