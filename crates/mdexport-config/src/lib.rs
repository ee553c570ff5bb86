//! Configuration management for mdexport.
//!
//! Parses `mdexport.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `diagrams.kroki_url`
//! - `diagrams.mmdc_path`
//! - `output_dir`
//! - `temp_dir`
//! - `header_footer.header.text`
//! - `header_footer.footer.text`

mod expand;
mod header_footer;

use std::path::{Path, PathBuf};
use std::time::Duration;

use mdexport_renderer::{Alignment, HeaderFooterConfig, OutputFormat};
use serde::Deserialize;

use header_footer::HeaderFooterRaw;
pub use header_footer::load_header_footer;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override diagram rendering.
    pub enable_mermaid: Option<bool>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override `mmdc` executable path.
    pub mmdc_path: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdexport.toml";

/// Default output directory for converted files.
const DEFAULT_OUTPUT_DIR: &str = "results";

/// Default directory for per-conversion working directories.
const DEFAULT_TEMP_DIR: &str = "temp";

/// Default per-diagram timeout in seconds.
const DEFAULT_DIAGRAM_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Conversion behaviour.
    pub conversion: ConversionConfig,
    /// Diagram rendering configuration (paths are relative strings from TOML).
    diagrams: DiagramsConfigRaw,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Input file restrictions.
    pub security: SecurityConfig,
    /// Header/footer settings as parsed from TOML.
    header_footer: HeaderFooterRaw,
    output_dir: Option<String>,
    temp_dir: Option<String>,

    /// Resolved output and temp directories (set after loading).
    #[serde(skip)]
    pub paths: PathsConfig,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Resolved header/footer, `None` when disabled (set after loading).
    #[serde(skip)]
    pub header_footer_resolved: Option<HeaderFooterConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8001,
        }
    }
}

/// Conversion configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Format used when none is requested: `word`, `pdf` or `html`.
    pub default_format: String,
    /// Render mermaid blocks to images.
    pub enable_mermaid: bool,
    /// Turn standalone `![alt](path)` lines into images.
    pub enable_images: bool,
    /// Word table alignment: `left`, `center` or `right`.
    pub table_alignment: String,
    /// Transliterate non-ASCII text.
    pub remove_unicode: bool,
    /// Strip emoji.
    pub remove_emoji: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            default_format: "word".to_owned(),
            enable_mermaid: true,
            enable_images: true,
            table_alignment: "left".to_owned(),
            remove_unicode: true,
            remove_emoji: true,
        }
    }
}

impl ConversionConfig {
    /// Parsed default format; `Word` if the value is invalid.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.default_format.parse().unwrap_or(OutputFormat::Word)
    }

    /// Parsed table alignment; `Left` if the value is invalid.
    #[must_use]
    pub fn table_alignment(&self) -> Alignment {
        Alignment::parse(&self.table_alignment).unwrap_or(Alignment::Left)
    }
}

/// Raw diagrams configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    kroki_url: Option<String>,
    mmdc_path: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved diagram rendering configuration.
#[derive(Debug, PartialEq, Eq)]
pub struct DiagramsConfig {
    /// Kroki server URL. Takes precedence over `mmdc` when set.
    pub kroki_url: Option<String>,
    /// Explicit `mmdc` executable. Looked up on `PATH` when unset.
    pub mmdc_path: Option<PathBuf>,
    /// Per-diagram timeout.
    pub timeout: Duration,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            kroki_url: None,
            mmdc_path: None,
            timeout: Duration::from_secs(DEFAULT_DIAGRAM_TIMEOUT_SECS),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level name: `DEBUG`, `INFO`, `WARNING`, `ERROR` or `CRITICAL`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_owned(),
        }
    }
}

impl LoggingConfig {
    /// `tracing` filter directive for the configured level.
    #[must_use]
    pub fn filter_directive(&self) -> &'static str {
        match self.level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

/// Input file restrictions.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Accepted input extensions, including the dot.
    pub allowed_extensions: Vec<String>,
    /// Maximum input size, e.g. `10MB`.
    pub max_file_size: String,
    /// Enforce `allowed_extensions`.
    pub validate_file_types: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".md".to_owned(), ".markdown".to_owned()],
            max_file_size: "10MB".to_owned(),
            validate_file_types: true,
        }
    }
}

impl SecurityConfig {
    /// Maximum input size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `max_file_size` is malformed.
    pub fn max_file_size_bytes(&self) -> Result<u64, ConfigError> {
        parse_size(&self.max_file_size)
    }

    /// Whether `path` has an allowed extension. Always true when
    /// `validate_file_types` is off.
    #[must_use]
    pub fn is_allowed(&self, path: &Path) -> bool {
        if !self.validate_file_types {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.allowed_extensions.iter().any(|allowed| {
            allowed
                .trim_start_matches('.')
                .eq_ignore_ascii_case(ext)
        })
    }
}

/// Parse a size such as `512B`, `64KB`, `10MB` or `1GB` (binary multiples).
///
/// # Errors
///
/// Returns `ConfigError::Validation` for a missing unit or a bad number.
pub fn parse_size(value: &str) -> Result<u64, ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!(
            "security.max_file_size must be a number ending with B, KB, MB, or GB, got {value:?}"
        ))
    };
    let upper = value.trim().to_ascii_uppercase();
    let (number, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        return Err(invalid());
    };
    let number: u64 = number.trim().parse().map_err(|_| invalid())?;
    number.checked_mul(multiplier).ok_or_else(invalid)
}

/// Resolved output and temp directories.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PathsConfig {
    /// Where converted files are saved.
    pub output_dir: PathBuf,
    /// Root for per-conversion working directories.
    pub temp_dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdexport.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.paths.output_dir.clone_from(output_dir);
        }
        if let Some(enable_mermaid) = settings.enable_mermaid {
            self.conversion.enable_mermaid = enable_mermaid;
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url = Some(kroki_url.clone());
        }
        if let Some(mmdc_path) = &settings.mmdc_path {
            self.diagrams_resolved.mmdc_path = Some(mmdc_path.clone());
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            conversion: ConversionConfig::default(),
            diagrams: DiagramsConfigRaw::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            header_footer: HeaderFooterRaw::default(),
            output_dir: None,
            temp_dir: None,
            paths: PathsConfig {
                output_dir: base.join(DEFAULT_OUTPUT_DIR),
                temp_dir: base.join(DEFAULT_TEMP_DIR),
            },
            diagrams_resolved: DiagramsConfig::default(),
            header_footer_resolved: Some(HeaderFooterConfig::default()),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_conversion()?;
        self.validate_diagrams()?;
        self.validate_logging()?;
        self.validate_security()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_conversion(&self) -> Result<(), ConfigError> {
        if self.conversion.default_format.parse::<OutputFormat>().is_err() {
            return Err(ConfigError::Validation(
                "conversion.default_format must be one of: word, pdf, html".to_owned(),
            ));
        }
        if Alignment::parse(&self.conversion.table_alignment).is_none() {
            return Err(ConfigError::Validation(
                "conversion.table_alignment must be one of: left, center, right".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        if let Some(ref kroki_url) = self.diagrams_resolved.kroki_url {
            require_non_empty(kroki_url, "diagrams.kroki_url")?;
            require_http_url(kroki_url, "diagrams.kroki_url")?;
        }
        if self.diagrams_resolved.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_logging(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

        if !LEVELS.contains(&self.logging.level.to_ascii_uppercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of: {}",
                LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_security(&self) -> Result<(), ConfigError> {
        self.security.max_file_size_bytes()?;
        if self.security.validate_file_types && self.security.allowed_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "security.allowed_extensions cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        expand::expand_opt(&mut self.diagrams.kroki_url, "diagrams.kroki_url")?;
        expand::expand_opt(&mut self.diagrams.mmdc_path, "diagrams.mmdc_path")?;
        expand::expand_opt(&mut self.output_dir, "output_dir")?;
        expand::expand_opt(&mut self.temp_dir, "temp_dir")?;
        self.header_footer.expand_env_vars()?;
        Ok(())
    }

    /// Resolve relative paths against the config directory and apply
    /// header/footer defaults.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths = PathsConfig {
            output_dir: resolve(self.output_dir.as_deref(), DEFAULT_OUTPUT_DIR),
            temp_dir: resolve(self.temp_dir.as_deref(), DEFAULT_TEMP_DIR),
        };

        self.diagrams_resolved = DiagramsConfig {
            kroki_url: self.diagrams.kroki_url.clone(),
            mmdc_path: self.diagrams.mmdc_path.as_deref().map(|p| config_dir.join(p)),
            timeout: Duration::from_secs(
                self.diagrams
                    .timeout_secs
                    .unwrap_or(DEFAULT_DIAGRAM_TIMEOUT_SECS),
            ),
        };

        self.header_footer_resolved = if self.header_footer.enabled {
            Some(self.header_footer.resolve("header_footer"))
        } else {
            None
        };

        Ok(())
    }
}
