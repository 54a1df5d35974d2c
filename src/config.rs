//! Configuration for terminal instances
//!
//! Loaded from JSON; every field has a default so partial files work.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Palette, DEFAULT_SCROLLBACK_LINES};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Terminal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum scrollback lines (0 disables history)
    pub scrollback_lines: usize,
    /// Shell to run; falls back to $SHELL, then /bin/sh
    pub shell: Option<String>,
    /// Extra arguments passed to the shell
    pub shell_args: Vec<String>,
    /// Value exported as TERM in the child
    pub term: String,
    /// Distance between default tab stops
    pub tab_width: usize,
    /// Color table used when resolving cells to RGB
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
            shell: None,
            shell_args: Vec::new(),
            term: "xterm-256color".to_string(),
            tab_width: 8,
            palette: Palette::default(),
        }
    }
}

impl Config {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_width == 0 {
            return Err(ConfigError::Invalid("tab_width must be at least 1".into()));
        }
        if self.term.is_empty() || self.term.contains('\0') {
            return Err(ConfigError::Invalid(format!("bad term value {:?}", self.term)));
        }
        Ok(())
    }

    /// The shell program to spawn
    pub fn resolve_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scrollback_lines, 10_000);
        assert_eq!(config.term, "xterm-256color");
        assert_eq!(config.tab_width, 8);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json_str(r#"{"scrollback_lines": 50, "shell": "/bin/dash"}"#)
            .expect("valid config");
        assert_eq!(config.scrollback_lines, 50);
        assert_eq!(config.resolve_shell(), "/bin/dash");
        assert_eq!(config.tab_width, 8);
    }

    #[test]
    fn test_palette_override() {
        let config = Config::from_json_str(
            r#"{"palette": {"foreground": {"r": 1, "g": 2, "b": 3}}}"#,
        )
        .expect("valid config");
        assert_eq!(config.palette.foreground.g, 2);
        assert_eq!(config.palette.ansi, Palette::default().ansi);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_json_str(r#"{"tab_width": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"term": "xterm"}}"#).expect("write config");
        let config = Config::load(file.path()).expect("load config");
        assert_eq!(config.term, "xterm");

        let missing = Config::load("/nonexistent/termgrid.json");
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
