//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! `NOTECOG_*` environment variables.
//!
//! ```toml
//! vault_path = "~/Notes"
//! usage_file = "~/Notes/.notecog/usage.json"
//!
//! [prompts]
//! folder = "copilot-custom-prompts"
//! extension = "md"
//!
//! [expansion]
//! fetch_concurrency = 4
//!
//! [logging]
//! format = "json"
//! file = "/tmp/notecog.log"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Default folder holding prompt templates inside the vault.
pub const DEFAULT_PROMPTS_FOLDER: &str = "copilot-custom-prompts";

/// Default file extension of prompt templates.
pub const DEFAULT_PROMPT_EXTENSION: &str = "md";

/// Default number of notes fetched concurrently for one variable.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Main configuration for notecog.
#[derive(Debug, Clone)]
pub struct NotecogConfig {
    /// Root directory of the note vault.
    pub vault_path: PathBuf,
    /// Prompt store settings.
    pub prompts: PromptSettings,
    /// Expansion settings.
    pub expansion: ExpansionSettings,
    /// JSON file persisting prompt usage records.
    pub usage_file: Option<PathBuf>,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Where prompt templates live inside the vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptSettings {
    /// Vault-relative folder of template documents.
    pub folder: String,
    /// Template file extension, without the dot.
    pub extension: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            folder: DEFAULT_PROMPTS_FOLDER.to_string(),
            extension: DEFAULT_PROMPT_EXTENSION.to_string(),
        }
    }
}

impl PromptSettings {
    /// Sets the template folder.
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into().trim_matches('/').to_string();
        self
    }

    /// Returns the vault-relative path of the document backing `title`.
    #[must_use]
    pub fn path_for(&self, title: &str) -> String {
        if self.folder.is_empty() {
            format!("{title}.{}", self.extension)
        } else {
            format!("{}/{title}.{}", self.folder, self.extension)
        }
    }
}

/// Tuning for template expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionSettings {
    /// Maximum notes read concurrently while resolving one variable.
    pub fetch_concurrency: usize,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl ExpansionSettings {
    /// Sets the fetch concurrency (clamped to at least 1).
    #[must_use]
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    pub format: Option<String>,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
    /// Filter directive, e.g. `notecog=debug`.
    pub filter: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Vault root.
    pub vault_path: Option<String>,
    /// Usage record file.
    pub usage_file: Option<String>,
    /// Prompt section.
    pub prompts: Option<ConfigFilePrompts>,
    /// Expansion section.
    pub expansion: Option<ConfigFileExpansion>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Prompts section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePrompts {
    /// Template folder.
    pub folder: Option<String>,
    /// Template extension.
    pub extension: Option<String>,
}

/// Expansion section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileExpansion {
    /// Concurrent note reads per variable.
    pub fetch_concurrency: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// "pretty" or "json".
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
}

impl Default for NotecogConfig {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::from("."),
            prompts: PromptSettings::default(),
            expansion: ExpansionSettings::default(),
            usage_file: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl NotecogConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", e))?;
        Self::parse_toml(&contents).map(Self::with_env_overrides)
    }

    /// Parses configuration from TOML text, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn parse_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/notecog/` on macOS)
    /// 2. XDG config dir (`~/.config/notecog/`)
    ///
    /// Falls back to defaults if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default().with_env_overrides();
        };

        let candidates = [
            base_dirs.config_dir().join("notecog").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("notecog")
                .join("config.toml"),
        ];

        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default().with_env_overrides()
    }

    /// Converts a `ConfigFile` to `NotecogConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(vault_path) = file.vault_path {
            config.vault_path = PathBuf::from(vault_path);
        }
        if let Some(usage_file) = file.usage_file {
            config.usage_file = Some(PathBuf::from(usage_file));
        }
        if let Some(prompts) = file.prompts {
            if let Some(folder) = prompts.folder {
                config.prompts = config.prompts.with_folder(folder);
            }
            if let Some(extension) = prompts.extension {
                config.prompts.extension = extension.trim_start_matches('.').to_string();
            }
        }
        if let Some(limit) = file.expansion.and_then(|e| e.fetch_concurrency) {
            config.expansion = config.expansion.with_fetch_concurrency(limit);
        }
        if let Some(logging) = file.logging {
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
            config.logging.filter = logging.filter;
        }

        config
    }

    /// Applies environment variable overrides.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `NOTECOG_VAULT_PATH` | Vault root |
    /// | `NOTECOG_PROMPTS_FOLDER` | Template folder |
    /// | `NOTECOG_FETCH_CONCURRENCY` | Concurrent note reads |
    /// | `NOTECOG_USAGE_FILE` | Usage record file |
    /// | `NOTECOG_LOG_FORMAT` | "pretty" or "json" |
    /// | `NOTECOG_LOG_FILE` | Log file path |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("NOTECOG_VAULT_PATH")
            && !v.trim().is_empty()
        {
            self.vault_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NOTECOG_PROMPTS_FOLDER") {
            self.prompts = self.prompts.with_folder(v);
        }
        if let Ok(v) = std::env::var("NOTECOG_FETCH_CONCURRENCY")
            && let Ok(parsed) = v.parse::<usize>()
        {
            self.expansion = self.expansion.with_fetch_concurrency(parsed);
        }
        if let Ok(v) = std::env::var("NOTECOG_USAGE_FILE")
            && !v.trim().is_empty()
        {
            self.usage_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("NOTECOG_LOG_FORMAT") {
            self.logging.format = Some(v);
        }
        if let Ok(v) = std::env::var("NOTECOG_LOG_FILE")
            && !v.trim().is_empty()
        {
            self.logging.file = Some(PathBuf::from(v));
        }
        self
    }

    /// Sets the vault path.
    #[must_use]
    pub fn with_vault_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vault_path = path.into();
        self
    }

    /// Returns the usage file, defaulting to `<vault>/.notecog/usage.json`.
    #[must_use]
    pub fn effective_usage_file(&self) -> PathBuf {
        self.usage_file
            .clone()
            .unwrap_or_else(|| self.vault_path.join(".notecog").join("usage.json"))
    }
}
