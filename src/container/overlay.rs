//! Layered lookup views
//!
//! An [`Overlay`] owns a plain Lua table for its own entries. Reads that miss
//! that table fall through the backing chain in order, and the first layer
//! holding the key wins. Writes only ever land in the overlay's own table.

use mlua::{ExternalError, IntoLua, Lua, Table, Value};

use super::protected::{Key, Protocol, ProtectedTable};
use crate::error::{QuillError, Result};

/// A mutable view over a chain of protected tables
#[derive(Debug, Clone)]
pub struct Overlay {
    own: Table,
    chain: Vec<ProtectedTable<Value>>,
    strict: bool,
}

impl Overlay {
    /// Create an overlay whose missing names read as nil
    pub fn new(lua: &Lua, chain: Vec<ProtectedTable<Value>>) -> Result<Self> {
        Self::build(lua, chain, false)
    }

    /// Create an overlay that raises `CapabilityNotFound` for names found in no layer
    pub fn strict(lua: &Lua, chain: Vec<ProtectedTable<Value>>) -> Result<Self> {
        Self::build(lua, chain, true)
    }

    fn build(lua: &Lua, chain: Vec<ProtectedTable<Value>>, strict: bool) -> Result<Self> {
        let own = lua.create_table()?;
        let meta = lua.create_table()?;

        let layers = chain.clone();
        let index = lua.create_function(move |_, (_, key): (Table, Value)| {
            fallback(&layers, &key, strict).map_err(|e| e.into_lua_err())
        })?;
        meta.set("__index", index)?;
        // Hide the metatable from getmetatable/setmetatable
        meta.set("__metatable", false)?;
        own.set_metatable(Some(meta));

        Ok(Self { own, chain, strict })
    }

    /// Read a key: own entries first, then each backing layer.
    ///
    /// Missing keys read as nil here even for strict overlays; strictness only
    /// applies to code running with this overlay as its environment.
    pub fn get(&self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        let own: Value = self.own.raw_get(key.clone())?;
        if !own.is_nil() {
            return Ok(own);
        }
        Ok(find_in_chain(&self.chain, &key).cloned().unwrap_or(Value::Nil))
    }

    /// Write a key into the overlay's own storage
    pub fn set(&self, key: impl Into<Key>, value: impl IntoLua) -> Result<()> {
        self.own.raw_set(key.into(), value)?;
        Ok(())
    }

    /// The table to use as a chunk environment
    pub fn environment(&self) -> &Table {
        &self.own
    }

    pub fn chain(&self) -> &[ProtectedTable<Value>] {
        &self.chain
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Seal a snapshot of the overlay's own entries, ignoring the backing chain
    pub fn own_bindings(&self, protocol: Option<Protocol>) -> Result<ProtectedTable<Value>> {
        ProtectedTable::from_lua(&self.own, protocol)
    }

    /// Names bound directly on the overlay, in iteration order
    pub fn own_keys(&self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        for pair in self.own.clone().pairs::<Value, Value>() {
            let (key, _) = pair?;
            if let Some(key) = Key::from_lua(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

fn find_in_chain<'a>(chain: &'a [ProtectedTable<Value>], key: &Key) -> Option<&'a Value> {
    chain.iter().find_map(|layer| layer.get(key))
}

fn fallback(chain: &[ProtectedTable<Value>], key: &Value, strict: bool) -> Result<Value> {
    let Some(key) = Key::from_lua(key) else {
        return Ok(Value::Nil);
    };
    if let Some(value) = find_in_chain(chain, &key) {
        return Ok(value.clone());
    }
    if strict {
        let name = match key {
            Key::Str(s) => s,
            Key::Int(i) => i.to_string(),
        };
        return Err(QuillError::CapabilityNotFound(name));
    }
    Ok(Value::Nil)
}
