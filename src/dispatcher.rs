//! The dispatcher ties the services together
//!
//! It owns the Lua state and every shared service, and runs the fixed
//! sequence for a feature invocation: load all features, reload the
//! configuration, then call the feature's entry.

use std::rc::Rc;

use mlua::{Function, Lua, Table};
use tracing::debug;

use crate::config::{ConfigEvaluator, ConfigurationResult, ReloadOutcome};
use crate::error::{QuillError, Result};
use crate::feature::{FeatureLoader, FeatureRecord};
use crate::host::api;
use crate::registry::Registry;
use crate::security::SandboxBuilder;
use crate::settings::Settings;

pub struct Dispatcher {
    lua: Lua,
    settings: Settings,
    registry: Registry,
    sandboxes: Rc<SandboxBuilder>,
    loader: FeatureLoader,
    evaluator: ConfigEvaluator,
}

impl Dispatcher {
    /// Create the Lua state and the services.
    ///
    /// The sandbox allow-list is captured here, before any feature code can
    /// touch the globals.
    pub fn new(settings: Settings) -> Result<Self> {
        let lua = Lua::new();
        let registry = Registry::new();
        let sandboxes = Rc::new(SandboxBuilder::new(&lua, &registry)?);
        let loader = FeatureLoader::new(&lua, settings.features.clone());
        let evaluator = ConfigEvaluator::new(&lua, settings.config.clone(), Rc::clone(&sandboxes));

        api::install(&lua, &registry, loader.features(), evaluator.published())?;
        debug!(
            features = %settings.features.dir.display(),
            config = %settings.config.dir.display(),
            "dispatcher ready"
        );

        Ok(Self {
            lua,
            settings,
            registry,
            sandboxes,
            loader,
            evaluator,
        })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sandboxes(&self) -> &SandboxBuilder {
        &self.sandboxes
    }

    pub fn list_discoverable_features(&self) -> Result<Vec<String>> {
        self.loader.discover_feature_names()
    }

    pub fn load_feature(&self, name: &str) -> Result<bool> {
        self.loader.load_feature(name)
    }

    pub fn load_all_features(&self) -> Result<Vec<String>> {
        self.loader.load_all_features()
    }

    pub fn reload(&self) -> Result<ReloadOutcome> {
        self.evaluator.reload()
    }

    pub fn resolve_entry(&self, name: &str) -> Option<Function> {
        self.loader.resolve_entry(name)
    }

    pub fn resolve_store(&self, name: &str) -> Option<Table> {
        self.loader.resolve_store(name)
    }

    pub fn loaded_features(&self) -> Vec<FeatureRecord> {
        self.loader.features().loaded()
    }

    pub fn configuration(&self) -> Option<Rc<ConfigurationResult>> {
        self.evaluator.current()
    }

    /// Run `feature` with `args` and return its exit status
    pub fn run(&self, feature: &str, args: &[String]) -> Result<i32> {
        if !self.list_discoverable_features()?.iter().any(|name| name == feature) {
            return Err(QuillError::UnknownFeature(feature.to_string()));
        }

        self.load_all_features()?;
        self.reload()?;
        self.loader.invoke(feature, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SourceSettings;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        dispatcher: Dispatcher,
    }

    fn fixture(features: &[(&str, &str)], configs: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let lib = dir.path().join("features");
        let conf = dir.path().join("config");
        fs::create_dir(&lib).unwrap();
        fs::create_dir(&conf).unwrap();
        for (name, code) in features {
            fs::write(lib.join(name), code).unwrap();
        }
        for (name, code) in configs {
            fs::write(conf.join(name), code).unwrap();
        }
        let settings = Settings {
            features: SourceSettings::new(lib, ".lua"),
            config: SourceSettings::new(conf, ".lua"),
        };
        Fixture {
            _dir: dir,
            dispatcher: Dispatcher::new(settings).unwrap(),
        }
    }

    #[test]
    fn test_greet_entry_and_store() {
        let fx = fixture(
            &[(
                "greet.lua",
                "return { entry = function(...) return select('#', ...) end, store = { x = 1 } }",
            )],
            &[],
        );
        fx.dispatcher.load_all_features().unwrap();

        assert!(fx.dispatcher.resolve_entry("greet").is_some());
        let store = fx.dispatcher.resolve_store("greet").unwrap();
        assert_eq!(store.get::<i64>("x").unwrap(), 1);
    }

    #[test]
    fn test_run_reads_published_configuration() {
        let fx = fixture(
            &[(
                "greet.lua",
                r#"
                return {
                    entry = function(who)
                        greeting = host.config().greeting .. ", " .. who
                        return #greeting
                    end
                }
                "#,
            )],
            &[
                ("a.lua", "greeting = 'ignored'"),
                ("b.lua", "greeting = 'Hello'"),
            ],
        );

        let code = fx.dispatcher.run("greet", &["world".to_string()]).unwrap();
        assert_eq!(code, "Hello, world".len() as i32);
        let greeting: String = fx.dispatcher.lua().globals().get("greeting").unwrap();
        assert_eq!(greeting, "Hello, world");
    }

    #[test]
    fn test_configuration_uses_registered_providers() {
        let fx = fixture(
            &[(
                "db.lua",
                r#"
                host.register("db", function(opts) return "db://" .. opts.host end)
                return { store = {} }
                "#,
            )],
            &[("main.lua", "url = provider('db')({ host = 'localhost' })")],
        );

        fx.dispatcher.load_all_features().unwrap();
        fx.dispatcher.reload().unwrap();

        let config = fx.dispatcher.configuration().unwrap();
        let url: String = fx
            .dispatcher
            .lua()
            .unpack(config.context().get("url").unwrap())
            .unwrap();
        assert_eq!(url, "db://localhost");
    }

    #[test]
    fn test_configuration_cannot_register_providers() {
        let fx = fixture(&[], &[("main.lua", "host.register('x', function() end)")]);
        let err = fx.dispatcher.reload().unwrap_err();
        assert!(matches!(err, QuillError::ConfigurationEval { .. }));
        assert!(fx.dispatcher.registry().is_empty());
    }

    #[test]
    fn test_run_unknown_feature_loads_nothing() {
        let fx = fixture(&[("other.lua", "loaded = true")], &[]);
        let err = fx.dispatcher.run("missing", &[]).unwrap_err();
        assert!(matches!(err, QuillError::UnknownFeature(_)));
        assert!(fx.dispatcher.loaded_features().is_empty());
    }

    #[test]
    fn test_feature_reads_other_store() {
        let fx = fixture(
            &[
                ("data.lua", "return { store = { answer = 42 } }"),
                (
                    "use.lua",
                    "return { entry = function() return host.store('data').answer end }",
                ),
            ],
            &[],
        );
        assert_eq!(fx.dispatcher.run("use", &[]).unwrap(), 42);
    }
}
