//! Project configuration.
//!
//! # Responsibility
//! - Load `fieldnotes.yaml` into a typed config with defaults for every field.
//! - Reject values that would make the store or output unusable.
//!
//! # Invariants
//! - A missing config file is not an error; defaults apply.
//! - Unknown keys are rejected so typos surface early.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::logging::default_log_level;

pub const DEFAULT_CONFIG_FILE: &str = "fieldnotes.yaml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidYaml(String),
    /// A field holds an unusable value.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::InvalidYaml(message) => write!(f, "invalid config yaml: {message}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldnotesConfig {
    /// Directory holding `<uid>.md` note files.
    pub content_dir: PathBuf,
    /// Directory receiving `index.json` and `notes/<uid>.json`.
    pub output_dir: PathBuf,
    /// Href prefix for internal note links.
    pub link_base: String,
    pub highlight: bool,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for FieldnotesConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content/fieldnotes"),
            output_dir: PathBuf::from("public/fieldnotes"),
            link_base: "/fieldnotes".to_string(),
            highlight: false,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl FieldnotesConfig {
    /// Reads and validates the config at `path`, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::from_yaml(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|err| ConfigError::InvalidYaml(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("content_dir cannot be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_dir cannot be empty".to_string()));
        }
        if self.content_dir == self.output_dir {
            return Err(ConfigError::Invalid(
                "content_dir and output_dir must differ".to_string(),
            ));
        }
        if self.link_base.trim().is_empty() {
            return Err(ConfigError::Invalid("link_base cannot be empty".to_string()));
        }
        Ok(())
    }
}
