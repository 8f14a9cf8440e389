//! Sealed key/value containers
//!
//! A [`ProtectedTable`] is filled once, at construction, and can never be
//! modified afterwards. Clones share the same storage, which is safe because
//! nothing can write to it.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use mlua::{
    AnyUserData, ExternalError, IntoLua, Lua, MetaMethod, MultiValue, Table, UserData,
    UserDataMethods, Value,
};

use crate::error::{QuillError, Result};

/// A container key: Lua strings and integers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Str(String),
    Int(i64),
}

impl Key {
    /// Convert a Lua value into a key.
    ///
    /// Floats with an exact integer value become integer keys, matching how
    /// Lua normalises table keys. Anything else cannot be stored.
    pub fn from_lua(value: &Value) -> Option<Key> {
        match value {
            Value::String(s) => Some(Key::Str(s.to_string_lossy().to_string())),
            Value::Integer(i) => Some(Key::Int(*i)),
            Value::Number(n) => float_to_int(*n).map(Key::Int),
            _ => None,
        }
    }

    /// Convert back into a Lua value
    pub fn to_lua(&self, lua: &Lua) -> mlua::Result<Value> {
        match self {
            Key::Str(s) => Ok(Value::String(lua.create_string(s)?)),
            Key::Int(i) => Ok(Value::Integer(*i)),
        }
    }
}

/// Exact integer value of `n`, like `math.tointeger`
fn float_to_int(n: f64) -> Option<i64> {
    // 2^63 is the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n)).then(|| n as i64)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "'{}'", s),
            Key::Int(i) => write!(f, "{}", i),
        }
    }
}

impl IntoLua for Key {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        self.to_lua(lua)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

/// Identity hooks applied when a table is sealed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protocol {
    /// Name used by `tostring` and in error messages
    pub name: Option<String>,
    /// Reading a missing key raises `CapabilityNotFound` instead of yielding nil
    pub strict: bool,
}

impl Protocol {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            strict: false,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

#[derive(Debug)]
struct Sealed<V> {
    entries: IndexMap<Key, V>,
    protocol: Protocol,
}

/// An immutable key/value container
#[derive(Debug)]
pub struct ProtectedTable<V> {
    inner: Rc<Sealed<V>>,
}

impl<V> Clone for ProtectedTable<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Shallow-copy `source` into `target`, or into a new map.
///
/// Later entries replace earlier ones with the same key.
pub fn dump<V, I>(source: I, target: Option<IndexMap<Key, V>>) -> IndexMap<Key, V>
where
    I: IntoIterator<Item = (Key, V)>,
{
    let mut target = target.unwrap_or_default();
    for (key, value) in source {
        target.insert(key, value);
    }
    target
}

impl<V> ProtectedTable<V> {
    /// Copy every entry of `source` and seal the result
    pub fn seal<I>(source: I, protocol: Option<Protocol>) -> Self
    where
        I: IntoIterator<Item = (Key, V)>,
    {
        Self {
            inner: Rc::new(Sealed {
                entries: dump(source, None),
                protocol: protocol.unwrap_or_default(),
            }),
        }
    }

    /// The sealed "no data" sentinel
    pub fn empty() -> Self {
        Self::seal(std::iter::empty(), None)
    }

    pub fn get(&self, key: &Key) -> Option<&V> {
        self.inner.entries.get(key)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.inner.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &V)> {
        self.inner.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.inner.entries.keys()
    }

    pub fn protocol(&self) -> &Protocol {
        &self.inner.protocol
    }

    pub fn name(&self) -> &str {
        self.inner.protocol.name.as_deref().unwrap_or("table")
    }

    pub fn is_strict(&self) -> bool {
        self.inner.protocol.strict
    }

    /// Whether both handles share the same sealed storage
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Writes are always rejected
    pub fn insert(&self, key: impl Into<Key>, _value: V) -> Result<()> {
        Err(self.write_error(&key.into()))
    }

    /// Deletes are always rejected
    pub fn remove(&self, key: impl Into<Key>) -> Result<()> {
        Err(self.write_error(&key.into()))
    }

    fn write_error(&self, key: &Key) -> QuillError {
        QuillError::ProtectedWrite {
            table: self.name().to_string(),
            key: key.to_string(),
        }
    }

    fn missing_error(&self, key: &Key) -> QuillError {
        match (&self.inner.protocol.name, key) {
            (Some(name), Key::Str(k)) => QuillError::CapabilityNotFound(format!("{}.{}", name, k)),
            (Some(name), Key::Int(i)) => QuillError::CapabilityNotFound(format!("{}[{}]", name, i)),
            (None, Key::Str(k)) => QuillError::CapabilityNotFound(k.clone()),
            (None, Key::Int(i)) => QuillError::CapabilityNotFound(i.to_string()),
        }
    }

    /// Border of the array part: the largest `n` with keys `1..=n` all present
    pub fn sequence_len(&self) -> i64 {
        let mut n = 0;
        while self.inner.entries.contains_key(&Key::Int(n + 1)) {
            n += 1;
        }
        n
    }
}

impl ProtectedTable<Value> {
    /// Dump a Lua table and seal the copy.
    ///
    /// Entries whose key is neither a string nor an integer are skipped.
    pub fn from_lua(table: &Table, protocol: Option<Protocol>) -> Result<Self> {
        let mut entries = Vec::new();
        for pair in table.clone().pairs::<Value, Value>() {
            let (key, value) = pair?;
            if let Some(key) = Key::from_lua(&key) {
                entries.push((key, value));
            }
        }
        Ok(Self::seal(entries, protocol))
    }

    /// Look up a Lua key, honouring the strict protocol
    pub fn lookup(&self, key: &Value) -> Result<Value> {
        match Key::from_lua(key) {
            Some(k) => match self.get(&k) {
                Some(value) => Ok(value.clone()),
                None if self.is_strict() => Err(self.missing_error(&k)),
                None => Ok(Value::Nil),
            },
            None => Ok(Value::Nil),
        }
    }

    /// Wrap the table as Lua userdata
    pub fn into_lua_userdata(self, lua: &Lua) -> mlua::Result<AnyUserData> {
        lua.create_userdata(self)
    }
}

impl UserData for ProtectedTable<Value> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |_, this, key: Value| {
            this.lookup(&key).map_err(|e| e.into_lua_err())
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, this, (key, _value): (Value, Value)| -> mlua::Result<()> {
                let key = Key::from_lua(&key).unwrap_or_else(|| Key::Str(key.type_name().into()));
                Err(this.write_error(&key).into_lua_err())
            },
        );

        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.sequence_len()));

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("protected {} ({} entries)", this.name(), this.len()))
        });

        methods.add_meta_method(MetaMethod::Pairs, |lua, this, ()| {
            let entries = this
                .iter()
                .map(|(k, v)| Ok((k.to_lua(lua)?, v.clone())))
                .collect::<mlua::Result<Vec<(Value, Value)>>>()?;
            let mut pos = 0;
            let next = lua.create_function_mut(move |_, _: MultiValue| {
                let item = entries.get(pos).cloned();
                pos += 1;
                Ok(item.unwrap_or((Value::Nil, Value::Nil)))
            })?;
            Ok((next, Value::Nil, Value::Nil))
        });
    }
}
