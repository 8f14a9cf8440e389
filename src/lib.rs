//! Quill - a feature dispatcher with sandboxed Lua configuration
//!
//! Quill discovers feature modules on disk, loads them on demand, evaluates
//! configuration files inside a capability-restricted sandbox, and then runs
//! the selected feature.
//!
//! # Example
//!
//! ```no_run
//! use quill::{Dispatcher, Settings};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let settings = Settings::load(None, &cwd).unwrap();
//! let dispatcher = Dispatcher::new(settings).unwrap();
//! let status = dispatcher.run("greet", &["world".to_string()]).unwrap();
//! std::process::exit(status);
//! ```

pub mod cli;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod error;
pub mod feature;
pub mod host;
pub mod output;
pub mod registry;
pub mod security;
pub mod settings;

pub use config::{ConfigEvaluator, ConfigurationResult, ReloadOutcome};
pub use container::{dump, Key, Overlay, Protocol, ProtectedTable};
pub use dispatcher::Dispatcher;
pub use error::{QuillError, Result};
pub use feature::{FeatureLoader, FeatureRecord, FeatureShape};
pub use output::{format_output, OutputFormat};
pub use registry::Registry;
pub use security::{SandboxBuilder, SandboxContext};
pub use settings::{Settings, SourceSettings};
