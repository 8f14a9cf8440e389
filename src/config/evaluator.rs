//! Configuration evaluation
//!
//! Every configuration file is compiled against its own fresh sandbox. The
//! sandbox of the last file that ran successfully becomes the published
//! configuration; earlier files are not merged into it.

use std::path::PathBuf;
use std::rc::Rc;

use mlua::Lua;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::result::{ConfigurationResult, Published};
use crate::error::{QuillError, Result};
use crate::host::fs;
use crate::security::SandboxBuilder;
use crate::settings::SourceSettings;

/// What a reload did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// The configuration directory does not exist; nothing changed
    MissingDirectory { dir: PathBuf },
    /// No file matched the suffix; nothing changed
    NoFiles { dir: PathBuf },
    /// Files were evaluated and the last one was published
    Applied {
        evaluated: Vec<PathBuf>,
        published: PathBuf,
    },
}

pub struct ConfigEvaluator {
    lua: Lua,
    source: SourceSettings,
    sandboxes: Rc<SandboxBuilder>,
    published: Published,
}

impl ConfigEvaluator {
    pub fn new(lua: &Lua, source: SourceSettings, sandboxes: Rc<SandboxBuilder>) -> Self {
        Self {
            lua: lua.clone(),
            source,
            sandboxes,
            published: Published::default(),
        }
    }

    /// Handle to the published configuration slot
    pub fn published(&self) -> &Published {
        &self.published
    }

    pub fn current(&self) -> Option<Rc<ConfigurationResult>> {
        self.published.current()
    }

    pub fn config_dir(&self) -> &std::path::Path {
        &self.source.dir
    }

    /// Re-evaluate every configuration file.
    ///
    /// A missing directory or an empty one is reported and leaves the
    /// published configuration untouched. A compile or runtime failure stops
    /// the reload; files that ran before it stay published.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        let dir = &self.source.dir;
        if !fs::directory_exists(dir) {
            warn!(dir = %dir.display(), "configuration directory not found, skipping reload");
            return Ok(ReloadOutcome::MissingDirectory { dir: dir.clone() });
        }

        let files = fs::list_files_matching(dir, &self.source.suffix)?;
        if files.is_empty() {
            warn!(
                dir = %dir.display(),
                suffix = %self.source.suffix,
                "no configuration files found, skipping reload"
            );
            return Ok(ReloadOutcome::NoFiles { dir: dir.clone() });
        }

        let mut evaluated = Vec::with_capacity(files.len());
        for file in files {
            let path = dir.join(&file);
            self.evaluate_file(&path)?;
            evaluated.push(path);
        }

        let published = evaluated.last().cloned().unwrap_or_else(|| dir.clone());
        info!(
            files = evaluated.len(),
            published = %published.display(),
            "configuration reloaded"
        );
        Ok(ReloadOutcome::Applied {
            evaluated,
            published,
        })
    }

    fn evaluate_file(&self, path: &std::path::Path) -> Result<()> {
        let code = fs::read_file(path)?;
        let sandbox = self.sandboxes.new_sandbox()?;

        let function = self
            .lua
            .load(code.as_str())
            .set_name(format!("@{}", path.display()))
            .set_environment(sandbox.environment().clone())
            .into_function()
            .map_err(|source| QuillError::ConfigurationLoad {
                file: path.to_path_buf(),
                source,
            })?;

        function
            .call::<()>(())
            .map_err(|source| QuillError::ConfigurationEval {
                file: path.to_path_buf(),
                source,
            })?;

        let result = ConfigurationResult::new(path.to_path_buf(), sandbox)?;
        debug!(
            file = %path.display(),
            bindings = result.view().len(),
            "configuration evaluated"
        );
        self.published.publish(result);
        Ok(())
    }
}
