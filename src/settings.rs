//! Settings for the config-lint tool
//!
//! Supports loading settings from:
//! - Default values
//! - Settings file (config-lint.toml)
//! - Environment variables (CONFIG_LINT__*)
//!
//! ## Example settings file (config-lint.toml):
//! ```toml
//! [parser]
//! strict = true
//! expand_env = true
//!
//! [output]
//! format = "pretty"
//! show_config = false
//!
//! [logging]
//! filter = "info"
//! ```

use std::path::Path;

use config_crate::{Config, ConfigError as SettingsError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::yaml::{env_decoder_hook, multi_decoder_hook, DecoderHook};

/// Main settings of the tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Parser behaviour
    #[serde(default)]
    pub parser: ParserSettings,

    /// Report output
    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserSettings {
    /// Report fields that no schema declares
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Expand `$VAR` and `${VAR}` in string values
    #[serde(default = "default_true")]
    pub expand_env: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// JSON output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,

    /// Print the canonical configuration after checking a file
    #[serde(default)]
    pub show_config: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            strict: true,
            expand_env: true,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            show_config: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Settings {
    /// Load settings from default locations
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(None)
    }

    /// Load settings, layering `settings_path` over the default locations
    pub fn load_from(settings_path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();

        for location in ["config-lint.toml", ".config-lint.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("dev", "versioned-config", "config-lint") {
            let xdg_settings = dirs.config_dir().join("config-lint.toml");
            if xdg_settings.exists() {
                builder = builder.add_source(File::from(xdg_settings).required(false));
            }
        }

        if let Some(path) = settings_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // CONFIG_LINT__PARSER__STRICT=false
        builder = builder.add_source(
            Environment::with_prefix("CONFIG_LINT")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Decoder hook matching the parser settings, if any is needed
    pub fn decoder_hook(&self) -> Option<DecoderHook> {
        let mut hooks = Vec::new();
        if self.parser.expand_env {
            hooks.push(env_decoder_hook());
        }
        multi_decoder_hook(hooks)
    }
}
