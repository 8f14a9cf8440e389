//! The published configuration

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use mlua::Value;

use crate::container::{Key, Protocol, ProtectedTable};
use crate::error::Result;
use crate::security::SandboxContext;

/// The context left behind by one evaluated configuration file
#[derive(Debug)]
pub struct ConfigurationResult {
    pub file: PathBuf,
    pub evaluated_at: DateTime<Utc>,
    context: SandboxContext,
    view: ProtectedTable<Value>,
}

impl ConfigurationResult {
    pub fn new(file: PathBuf, context: SandboxContext) -> Result<Self> {
        let view = context.own_bindings(Some(Protocol::named("config")))?;
        Ok(Self {
            file,
            evaluated_at: Utc::now(),
            context,
            view,
        })
    }

    /// The sandbox the file ran in, allow-list included
    pub fn context(&self) -> &SandboxContext {
        &self.context
    }

    /// Sealed snapshot of the file's top-level bindings
    pub fn view(&self) -> &ProtectedTable<Value> {
        &self.view
    }

    /// Top-level names the file bound, sorted
    pub fn bindings(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .view
            .keys()
            .map(|key| match key {
                Key::Str(s) => s.clone(),
                Key::Int(i) => i.to_string(),
            })
            .collect();
        names.sort();
        names
    }
}

/// Shared slot holding the current configuration. Clones refer to the same slot.
#[derive(Debug, Clone, Default)]
pub struct Published {
    current: Rc<RefCell<Option<Rc<ConfigurationResult>>>>,
}

impl Published {
    pub fn current(&self) -> Option<Rc<ConfigurationResult>> {
        self.current.borrow().clone()
    }

    /// Replace whatever was published before
    pub(crate) fn publish(&self, result: ConfigurationResult) {
        *self.current.borrow_mut() = Some(Rc::new(result));
    }

    /// The published view, or the empty sentinel when nothing is published
    pub fn view(&self) -> ProtectedTable<Value> {
        self.current()
            .map(|result| result.view().clone())
            .unwrap_or_else(ProtectedTable::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Overlay;
    use mlua::Lua;

    #[test]
    fn test_view_falls_back_to_empty_sentinel() {
        let published = Published::default();
        assert!(published.current().is_none());
        assert!(published.view().is_empty());
    }

    #[test]
    fn test_publish_replaces_previous() {
        let lua = Lua::new();
        let published = Published::default();

        let first = Overlay::new(&lua, Vec::new()).unwrap();
        first.set("a", 1).unwrap();
        published.publish(ConfigurationResult::new(PathBuf::from("a.lua"), first).unwrap());

        let second = Overlay::new(&lua, Vec::new()).unwrap();
        second.set("b", 2).unwrap();
        second.set("c", 3).unwrap();
        published.publish(ConfigurationResult::new(PathBuf::from("b.lua"), second).unwrap());

        let current = published.current().unwrap();
        assert_eq!(current.file, PathBuf::from("b.lua"));
        assert_eq!(current.bindings(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(published.view().name(), "config");
        assert!(!published.view().contains_key(&Key::from("a")));
    }
}
