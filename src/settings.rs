//! Runtime settings
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags or environment variables. Relative directories are
//! resolved against the working directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QuillError, Result};
use crate::host::fs;

/// Default settings file looked up in the working directory
pub const SETTINGS_FILE: &str = "quill.toml";

/// Default suffix for feature and configuration files
pub const DEFAULT_SUFFIX: &str = ".lua";

/// Where a family of Lua files lives and how they are named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub dir: PathBuf,
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

impl SourceSettings {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Feature modules (trusted code)
    pub features: SourceSettings,
    /// Configuration files (sandboxed code)
    pub config: SourceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            features: SourceSettings::new("features", DEFAULT_SUFFIX),
            config: SourceSettings::new("config", DEFAULT_SUFFIX),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| QuillError::Settings(e.to_string()))
    }

    /// Load settings from `path`, or from `quill.toml` in `cwd` when present.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file simply yields the defaults.
    pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_toml(&fs::read_file(path)?)?,
            None => {
                let default_path = cwd.join(SETTINGS_FILE);
                if fs::file_exists(&default_path) {
                    Self::from_toml(&fs::read_file(&default_path)?)?
                } else {
                    Self::default()
                }
            }
        };
        settings.validate()?;
        Ok(settings.resolved(cwd))
    }

    /// Make relative directories absolute against `cwd`
    pub fn resolved(mut self, cwd: &Path) -> Self {
        if self.features.dir.is_relative() {
            self.features.dir = cwd.join(&self.features.dir);
        }
        if self.config.dir.is_relative() {
            self.config.dir = cwd.join(&self.config.dir);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (label, source) in [("features", &self.features), ("config", &self.config)] {
            if source.suffix.is_empty() {
                return Err(QuillError::Settings(format!(
                    "{} suffix must not be empty",
                    label
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.features.dir, PathBuf::from("features"));
        assert_eq!(settings.config.suffix, ".lua");
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = Settings::from_toml(
            r#"
            [config]
            dir = "/etc/quill"
            suffix = ".conf.lua"
            "#,
        )
        .unwrap();
        assert_eq!(settings.config.dir, PathBuf::from("/etc/quill"));
        assert_eq!(settings.config.suffix, ".conf.lua");
        assert_eq!(settings.features, Settings::default().features);
    }

    #[test]
    fn test_from_toml_invalid() {
        let result = Settings::from_toml("features = 3");
        assert!(matches!(result, Err(QuillError::Settings(_))));
    }

    #[test]
    fn test_load_resolves_relative_dirs() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(SETTINGS_FILE),
            "[features]\ndir = \"lib\"\n",
        )
        .unwrap();

        let settings = Settings::load(None, temp_dir.path()).unwrap();
        assert_eq!(settings.features.dir, temp_dir.path().join("lib"));
        assert_eq!(settings.features.suffix, ".lua");
        assert_eq!(settings.config.dir, temp_dir.path().join("config"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Settings::load(Some(&temp_dir.path().join("nope.toml")), temp_dir.path());
        assert!(matches!(result, Err(QuillError::Io { .. })));
    }

    #[test]
    fn test_empty_suffix_rejected() {
        let result = Settings::from_toml("[config]\ndir = \"c\"\nsuffix = \"\"\n")
            .and_then(|s| s.validate());
        assert!(result.is_err());
    }
}
