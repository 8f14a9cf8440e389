//! The `host` table visible to feature modules
//!
//! Feature code is trusted, so it runs with the full Lua globals. On top of
//! those it gets `host`, a sealed table bridging into the dispatcher's shared
//! services: the provider registry, feature stores and the published
//! configuration.

use std::path::Path;

use mlua::{ExternalError, Function, Lua, Table, Value};

use super::{fs, shell};
use crate::config::Published;
use crate::container::{Key, Protocol, ProtectedTable};
use crate::error::Result;
use crate::feature::Features;
use crate::registry::Registry;

/// Name of the global the API is installed under
pub const HOST_GLOBAL: &str = "host";

/// Build the sealed `host` table
pub fn host_table(
    lua: &Lua,
    registry: &Registry,
    features: &Features,
    published: &Published,
) -> Result<ProtectedTable<Value>> {
    let mut members: Vec<(&str, Function)> = Vec::new();

    let providers = registry.clone();
    members.push((
        "register",
        lua.create_function(move |_, (name, factory): (String, Value)| {
            providers
                .register(&name, factory)
                .map_err(|e| e.into_lua_err())
        })?,
    ));

    let providers = registry.clone();
    members.push((
        "resolve",
        lua.create_function(move |_, name: String| Ok(providers.resolve(&name)))?,
    ));

    let stores = features.clone();
    members.push((
        "store",
        lua.create_function(move |_, name: String| Ok(stores.store(&name)))?,
    ));

    let config = published.clone();
    members.push((
        "config",
        lua.create_function(move |_, ()| Ok(config.view()))?,
    ));

    members.push((
        "exec",
        lua.create_function(|_, command: String| {
            let output = shell::run_shell(&command).map_err(|e| e.into_lua_err())?;
            Ok((output.stdout, output.code))
        })?,
    ));

    members.push((
        "file_exists",
        lua.create_function(|_, path: String| Ok(fs::file_exists(Path::new(&path))))?,
    ));

    members.push((
        "dir_exists",
        lua.create_function(|_, path: String| Ok(fs::directory_exists(Path::new(&path))))?,
    ));

    members.push((
        "cwd",
        lua.create_function(|_, ()| {
            let cwd = fs::current_working_directory().map_err(|e| e.into_lua_err())?;
            Ok(cwd.display().to_string())
        })?,
    ));

    members.push((
        "log",
        lua.create_function(|_, (level, message): (String, String)| {
            match level.as_str() {
                "error" => tracing::error!(target: "quill::feature", "{}", message),
                "warn" => tracing::warn!(target: "quill::feature", "{}", message),
                "debug" => tracing::debug!(target: "quill::feature", "{}", message),
                "trace" => tracing::trace!(target: "quill::feature", "{}", message),
                _ => tracing::info!(target: "quill::feature", "{}", message),
            }
            Ok(())
        })?,
    ));

    Ok(ProtectedTable::seal(
        members
            .into_iter()
            .map(|(name, f)| (Key::from(name), Value::Function(f))),
        Some(Protocol::named(HOST_GLOBAL).strict()),
    ))
}

/// Install `host` into the Lua globals
pub fn install(
    lua: &Lua,
    registry: &Registry,
    features: &Features,
    published: &Published,
) -> Result<()> {
    let host = host_table(lua, registry, features, published)?;
    let globals: Table = lua.globals();
    globals.raw_set(HOST_GLOBAL, host)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Lua, Registry, Features, Published) {
        let lua = Lua::new();
        let registry = Registry::new();
        let features = Features::default();
        let published = Published::default();
        install(&lua, &registry, &features, &published).unwrap();
        (lua, registry, features, published)
    }

    #[test]
    fn test_register_and_resolve_from_lua() {
        let (lua, registry, _features, _published) = setup();

        lua.load("host.register('double', function(x) return x * 2 end)")
            .exec()
            .unwrap();
        assert!(registry.contains("double"));

        let doubled: i64 = lua
            .load("return host.resolve('double')(21)")
            .eval()
            .unwrap();
        assert_eq!(doubled, 42);
        let missing: Value = lua.load("return host.resolve('nope')").eval().unwrap();
        assert!(missing.is_nil());
    }

    #[test]
    fn test_register_rejects_non_functions() {
        let (lua, _registry, _features, _published) = setup();
        let err = lua.load("host.register('bad', 42)").exec().unwrap_err();
        assert!(err.to_string().contains("Invalid provider 'bad'"));
    }

    #[test]
    fn test_config_defaults_to_empty_sentinel() {
        let (lua, _registry, _features, _published) = setup();
        let count: i64 = lua
            .load("local n = 0 for _ in pairs(host.config()) do n = n + 1 end return n")
            .eval()
            .unwrap();
        assert_eq!(count, 0);
        let missing: Value = lua.load("return host.config().anything").eval().unwrap();
        assert!(missing.is_nil());
    }

    #[test]
    fn test_host_table_is_sealed() {
        let (lua, _registry, _features, _published) = setup();
        let err = lua.load("host.exec = nil").exec().unwrap_err();
        assert!(err.to_string().contains("protected table 'host'"));
    }

    #[test]
    fn test_store_lookup() {
        let (lua, _registry, _features, _published) = setup();
        let missing: Value = lua.load("return host.store('none')").eval().unwrap();
        assert!(missing.is_nil());
    }

    #[cfg(unix)]
    #[test]
    fn test_exec() {
        let (lua, _registry, _features, _published) = setup();
        let (out, code): (String, i64) = lua.load("return host.exec('echo hi')").eval().unwrap();
        assert_eq!(out.trim(), "hi");
        assert_eq!(code, 0);
    }
}
