//! Provider registry
//!
//! Maps provider names to factory functions registered by feature modules.
//! Feature code can register and resolve; configuration code only gets the
//! read-only `provider(name)` lookup.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use mlua::{Function, Value};

use crate::error::{QuillError, Result};

/// Shared handle to the provider table. Clones refer to the same registry.
#[derive(Clone, Default)]
pub struct Registry {
    providers: Rc<RefCell<IndexMap<String, Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any earlier one with the same name
    pub fn register(&self, name: &str, factory: Value) -> Result<()> {
        let Value::Function(factory) = factory else {
            return Err(QuillError::InvalidProvider {
                name: name.to_string(),
                found: factory.type_name().to_string(),
            });
        };

        let replaced = self
            .providers
            .borrow_mut()
            .insert(name.to_string(), factory)
            .is_some();
        tracing::debug!(provider = name, replaced, "registered provider");
        Ok(())
    }

    /// Look up a factory; `None` when nothing is registered under `name`
    pub fn resolve(&self, name: &str) -> Option<Function> {
        self.providers.borrow().get(name).cloned()
    }

    /// Like [`Registry::resolve`] but absence is an error
    pub fn require(&self, name: &str) -> Result<Function> {
        self.resolve(name)
            .ok_or_else(|| QuillError::UnknownProvider(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.borrow().contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.providers.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.borrow().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    #[test]
    fn test_register_and_resolve() {
        let lua = Lua::new();
        let registry = Registry::new();
        let factory = lua.create_function(|_, ()| Ok(42)).unwrap();

        registry.register("answer", Value::Function(factory)).unwrap();

        let resolved = registry.resolve("answer").unwrap();
        assert_eq!(resolved.call::<i64>(()).unwrap(), 42);
        assert!(registry.contains("answer"));
    }

    #[test]
    fn test_register_non_callable() {
        let registry = Registry::new();
        let result = registry.register("broken", Value::Integer(1));
        assert!(matches!(result, Err(QuillError::InvalidProvider { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let lua = Lua::new();
        let registry = Registry::new();
        let first = lua.create_function(|_, ()| Ok("first")).unwrap();
        let second = lua.create_function(|_, ()| Ok("second")).unwrap();

        registry.register("p", Value::Function(first)).unwrap();
        registry.register("p", Value::Function(second)).unwrap();

        assert_eq!(registry.len(), 1);
        let resolved = registry.resolve("p").unwrap();
        assert_eq!(resolved.call::<String>(()).unwrap(), "second");
    }

    #[test]
    fn test_resolve_missing() {
        let registry = Registry::new();
        assert!(registry.resolve("nope").is_none());
        assert!(matches!(
            registry.require("nope"),
            Err(QuillError::UnknownProvider(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_clones_share_state() {
        let lua = Lua::new();
        let registry = Registry::new();
        let handle = registry.clone();
        let factory = lua.create_function(|_, ()| Ok(())).unwrap();

        handle.register("shared", Value::Function(factory)).unwrap();
        assert_eq!(registry.names(), vec!["shared".to_string()]);
    }
}
