//! Sandbox construction
//!
//! Every configuration file runs inside its own [`SandboxContext`]: a strict
//! overlay whose only backing layer is the shared allow-list.

use mlua::{Lua, Value};

use super::capabilities::build_allow_list;
use crate::container::{Overlay, ProtectedTable};
use crate::error::Result;
use crate::registry::Registry;

/// Per-file execution environment for configuration code
pub type SandboxContext = Overlay;

/// Builds sandboxes that all share one allow-list
pub struct SandboxBuilder {
    lua: Lua,
    allow_list: ProtectedTable<Value>,
}

impl SandboxBuilder {
    /// Build the allow-list once for this Lua state
    pub fn new(lua: &Lua, registry: &Registry) -> Result<Self> {
        Ok(Self {
            lua: lua.clone(),
            allow_list: build_allow_list(lua, registry)?,
        })
    }

    pub fn allow_list(&self) -> &ProtectedTable<Value> {
        &self.allow_list
    }

    /// A fresh context with empty own storage over the shared allow-list
    pub fn new_sandbox(&self) -> Result<SandboxContext> {
        Overlay::strict(&self.lua, vec![self.allow_list.clone()])
    }
}
