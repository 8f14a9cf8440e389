//! Feature discovery and loading
//!
//! Feature modules are trusted Lua files in the library directory. Each one is
//! executed once with the full host globals and may return a table with an
//! `entry` function and/or a `store` table.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use mlua::{Function, Lua, Table, Value, Variadic};
use regex::Regex;
use tracing::{debug, info};

use super::record::{FeatureRecord, Features};
use crate::error::{QuillError, Result};
use crate::host::fs;
use crate::settings::SourceSettings;

static FEATURE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("invalid regex"));

/// Whether `name` can be a feature name (no path separators, no leading dot)
pub fn is_valid_feature_name(name: &str) -> bool {
    FEATURE_NAME.is_match(name)
}

/// Loads feature modules into the shared feature table
pub struct FeatureLoader {
    lua: Lua,
    source: SourceSettings,
    features: Features,
}

impl FeatureLoader {
    pub fn new(lua: &Lua, source: SourceSettings) -> Self {
        Self {
            lua: lua.clone(),
            source,
            features: Features::default(),
        }
    }

    /// Handle to the feature table this loader fills
    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn library_dir(&self) -> &Path {
        &self.source.dir
    }

    fn ensure_library_dir(&self) -> Result<()> {
        if fs::directory_exists(&self.source.dir) {
            Ok(())
        } else {
            Err(QuillError::LibraryDirectoryMissing(self.source.dir.clone()))
        }
    }

    fn feature_path(&self, name: &str) -> PathBuf {
        self.source
            .dir
            .join(format!("{}{}", name, self.source.suffix))
    }

    /// Feature names found in the library directory, sorted
    pub fn discover_feature_names(&self) -> Result<Vec<String>> {
        self.ensure_library_dir()?;

        let names = fs::list_files_matching(&self.source.dir, &self.source.suffix)?
            .into_iter()
            .filter_map(|file| file.strip_suffix(&self.source.suffix).map(str::to_string))
            .filter(|name| {
                let valid = is_valid_feature_name(name);
                if !valid {
                    debug!(name = %name, "skipping file with invalid feature name");
                }
                valid
            })
            .collect();
        Ok(names)
    }

    /// Load one feature.
    ///
    /// Returns `false` without doing anything when the feature is already
    /// loaded or currently loading.
    pub fn load_feature(&self, name: &str) -> Result<bool> {
        if self.features.is_known(name) {
            debug!(feature = name, "feature already loaded");
            return Ok(false);
        }

        self.ensure_library_dir()?;
        if !is_valid_feature_name(name) {
            return Err(QuillError::UnknownFeature(name.to_string()));
        }
        let path = self.feature_path(name);
        if !fs::file_exists(&path) {
            return Err(QuillError::UnknownFeature(name.to_string()));
        }
        let code = fs::read_file(&path)?;

        self.features.begin(name);
        match self.execute(name, &path, &code) {
            Ok(record) => {
                debug!(feature = name, shape = %record.shape(), "loaded feature");
                self.features.finish(record);
                Ok(true)
            }
            Err(e) => {
                self.features.abandon(name);
                Err(e)
            }
        }
    }

    fn execute(&self, name: &str, path: &Path, code: &str) -> Result<FeatureRecord> {
        let result: Value = self
            .lua
            .load(code)
            .set_name(format!("@{}", path.display()))
            .call(())
            .map_err(|source| QuillError::FeatureLoad {
                name: name.to_string(),
                source,
            })?;

        let (entry, store) = classify(name, result)?;
        Ok(FeatureRecord {
            name: name.to_string(),
            path: path.to_path_buf(),
            entry,
            store,
            loaded_at: Utc::now(),
        })
    }

    /// Load every discoverable feature, stopping at the first failure.
    ///
    /// Returns the names this call actually loaded.
    pub fn load_all_features(&self) -> Result<Vec<String>> {
        let mut loaded = Vec::new();
        for name in self.discover_feature_names()? {
            if self.load_feature(&name)? {
                loaded.push(name);
            }
        }
        info!(count = loaded.len(), "features loaded");
        Ok(loaded)
    }

    pub fn resolve_entry(&self, name: &str) -> Option<Function> {
        self.features.entry(name)
    }

    pub fn resolve_store(&self, name: &str) -> Option<Table> {
        self.features.store(name)
    }

    /// Call a feature's entry with the residual arguments.
    ///
    /// An integer result becomes the exit status; `nil` and `true` mean 0,
    /// `false` means 1.
    pub fn invoke(&self, name: &str, args: &[String]) -> Result<i32> {
        let Some(record) = self.features.record(name) else {
            return Err(QuillError::UnknownFeature(name.to_string()));
        };
        let Some(entry) = record.entry else {
            return Err(QuillError::MissingEntry(name.to_string()));
        };

        debug!(feature = name, args = args.len(), "invoking feature");
        let result: Value = entry
            .call(args.iter().cloned().collect::<Variadic<String>>())
            .map_err(|source| QuillError::FeatureFailed {
                name: name.to_string(),
                source,
            })?;

        Ok(exit_status(&result))
    }
}

/// Map an entry's return value onto a process exit status.
///
/// Integral numbers in `0..=255` are used as is; any other number means
/// failure. `false` is 1, everything else 0.
fn exit_status(result: &Value) -> i32 {
    let code = match result {
        Value::Integer(code) => Some(*code),
        Value::Number(code) if code.fract() == 0.0 && (0.0..=255.0).contains(code) => {
            Some(*code as i64)
        }
        Value::Number(_) => None,
        Value::Boolean(false) => return 1,
        _ => return 0,
    };
    code.and_then(|code| u8::try_from(code).ok())
        .map(i32::from)
        .unwrap_or(1)
}

/// Check a module result against `{ entry?: function, store?: table }`
fn classify(name: &str, result: Value) -> Result<(Option<Function>, Option<Table>)> {
    let module = match result {
        Value::Nil => return Ok((None, None)),
        Value::Table(module) => module,
        other => {
            return Err(QuillError::InvalidFeatureModule {
                name: name.to_string(),
                found: other.type_name().to_string(),
            })
        }
    };

    let load_error = |source| QuillError::FeatureLoad {
        name: name.to_string(),
        source,
    };

    let entry = match module.get::<Value>("entry").map_err(load_error)? {
        Value::Nil => None,
        Value::Function(entry) => Some(entry),
        other => {
            return Err(QuillError::InvalidFeatureEntry {
                name: name.to_string(),
                found: other.type_name().to_string(),
            })
        }
    };

    let store = match module.get::<Value>("store").map_err(load_error)? {
        Value::Nil => None,
        Value::Table(store) => Some(store),
        other => {
            return Err(QuillError::InvalidFeatureStore {
                name: name.to_string(),
                found: other.type_name().to_string(),
            })
        }
    };

    Ok((entry, store))
}
