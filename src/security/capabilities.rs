//! The capability allow-list visible to configuration code
//!
//! Configuration files only ever see what is listed here. Each namespace is a
//! strict protected table, so a lookup such as `os.execute` fails with
//! `CapabilityNotFound` instead of quietly returning nil.

use mlua::{ExternalError, Function, Lua, Table, Value, Variadic};

use crate::container::{Key, Protocol, ProtectedTable};
use crate::error::Result;
use crate::registry::Registry;

/// Base functions copied from the host globals
pub const BASE_FUNCTIONS: &[&str] = &[
    "assert", "error", "ipairs", "next", "pairs", "pcall", "select", "tonumber", "tostring",
    "type",
];

/// Standard library namespaces and the members each one keeps
pub const NAMESPACES: &[(&str, &[&str])] = &[
    (
        "string",
        &[
            "byte", "char", "find", "format", "gmatch", "gsub", "len", "lower", "match", "rep",
            "reverse", "sub", "upper",
        ],
    ),
    (
        "math",
        &[
            "abs", "acos", "asin", "atan", "ceil", "cos", "exp", "floor", "fmod", "huge", "log",
            "max", "maxinteger", "min", "mininteger", "modf", "pi", "sin", "sqrt", "tan",
            "tointeger", "type", "ult",
        ],
    ),
    (
        "table",
        &["concat", "insert", "move", "pack", "remove", "sort", "unpack"],
    ),
    ("os", &["clock", "date", "difftime", "time"]),
];

/// Names that must never be reachable from the sandbox
pub const DENIED: &[&str] = &[
    "collectgarbage", "debug", "dofile", "getmetatable", "io", "load", "loadfile", "package",
    "rawequal", "rawget", "rawlen", "rawset", "require", "setmetatable", "_G",
];

/// Build the allow-list from the host's pristine globals.
///
/// Call this before any feature code runs so that globals rebound by features
/// cannot leak into the sandbox.
pub fn build_allow_list(lua: &Lua, registry: &Registry) -> Result<ProtectedTable<Value>> {
    let globals = lua.globals();
    let mut entries: Vec<(Key, Value)> = Vec::new();

    for name in BASE_FUNCTIONS {
        let value: Value = globals.raw_get(*name)?;
        if !value.is_nil() {
            entries.push((Key::from(*name), value));
        }
    }

    let table_lib: Table = globals.raw_get("table")?;
    entries.push((Key::from("unpack"), table_lib.raw_get("unpack")?));

    for (namespace, members) in NAMESPACES {
        let library: Table = globals.raw_get(*namespace)?;
        let mut picked = Vec::with_capacity(members.len());
        for member in *members {
            let value: Value = library.raw_get(*member)?;
            if !value.is_nil() {
                picked.push((Key::from(*member), value));
            }
        }
        let sealed = ProtectedTable::seal(picked, Some(Protocol::named(*namespace).strict()));
        entries.push((Key::from(*namespace), Value::UserData(sealed.into_lua_userdata(lua)?)));
    }

    let array = array_namespace(lua)?;
    entries.push((Key::from("array"), Value::UserData(array.into_lua_userdata(lua)?)));
    entries.push((Key::from("provider"), Value::Function(provider_lookup(lua, registry)?)));

    let allow_list = ProtectedTable::seal(entries, Some(Protocol::named("sandbox").strict()));
    tracing::debug!(capabilities = allow_list.len(), "built sandbox allow-list");
    Ok(allow_list)
}

/// Largest sequence `array.range` may build
pub const MAX_RANGE_LEN: i128 = 1_000_000;

/// Number of elements in `start..=stop` by `step`, computed without overflow
fn range_len(start: i64, stop: i64, step: i64) -> i128 {
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    if (step > 0 && start > stop) || (step < 0 && start < stop) {
        return 0;
    }
    (stop - start) / step + 1
}

/// `provider(name)`: resolve a registered factory, failing on unknown names
fn provider_lookup(lua: &Lua, registry: &Registry) -> Result<Function> {
    let registry = registry.clone();
    let lookup = lua.create_function(move |_, name: String| {
        registry.require(&name).map_err(|e| e.into_lua_err())
    })?;
    Ok(lookup)
}

fn array_namespace(lua: &Lua) -> Result<ProtectedTable<Value>> {
    let of = lua.create_function(|lua, items: Variadic<Value>| {
        lua.create_sequence_from(items.iter().cloned())
    })?;

    let range = lua.create_function(|lua, (first, last, step): (i64, Option<i64>, Option<i64>)| {
        let (start, stop) = match last {
            Some(last) => (first, last),
            None => (1, first),
        };
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(mlua::Error::RuntimeError(
                "array.range step must not be zero".to_string(),
            ));
        }
        let count = range_len(start, stop, step);
        if count > MAX_RANGE_LEN {
            return Err(mlua::Error::RuntimeError(format!(
                "array.range would produce {} elements (limit {})",
                count, MAX_RANGE_LEN
            )));
        }
        let mut items = Vec::with_capacity(count as usize);
        let mut current = Some(start);
        while let Some(value) = current.filter(|_| (items.len() as i128) < count) {
            items.push(value);
            current = value.checked_add(step);
        }
        lua.create_sequence_from(items)
    })?;

    let map = lua.create_function(|lua, (items, f): (Value, Function)| {
        let mapped = sequence(&items)?
            .into_iter()
            .enumerate()
            .map(|(i, v)| f.call::<Value>((v, i as i64 + 1)))
            .collect::<mlua::Result<Vec<Value>>>()?;
        lua.create_sequence_from(mapped)
    })?;

    let filter = lua.create_function(|lua, (items, f): (Value, Function)| {
        let mut kept = Vec::new();
        for (i, v) in sequence(&items)?.into_iter().enumerate() {
            if f.call::<bool>((v.clone(), i as i64 + 1))? {
                kept.push(v);
            }
        }
        lua.create_sequence_from(kept)
    })?;

    let concat = lua.create_function(|lua, lists: Variadic<Value>| {
        let mut joined = Vec::new();
        for list in lists.iter() {
            joined.extend(sequence(list)?);
        }
        lua.create_sequence_from(joined)
    })?;

    let contains = lua.create_function(|_, (items, needle): (Value, Value)| {
        Ok(sequence(&items)?.iter().any(|item| *item == needle))
    })?;

    let members = [
        ("of", of),
        ("range", range),
        ("map", map),
        ("filter", filter),
        ("concat", concat),
        ("contains", contains),
    ];
    Ok(ProtectedTable::seal(
        members
            .into_iter()
            .map(|(name, f)| (Key::from(name), Value::Function(f))),
        Some(Protocol::named("array").strict()),
    ))
}

/// Collect the sequence part of a Lua table or a protected table
fn sequence(value: &Value) -> mlua::Result<Vec<Value>> {
    match value {
        Value::Table(table) => table.clone().sequence_values::<Value>().collect(),
        Value::UserData(data) => {
            let sealed = data.borrow::<ProtectedTable<Value>>()?;
            Ok((1..=sealed.sequence_len())
                .filter_map(|i| sealed.get(&Key::Int(i)).cloned())
                .collect())
        }
        other => Err(mlua::Error::RuntimeError(format!(
            "expected a sequence, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandboxed(lua: &Lua, registry: &Registry) -> Table {
        let allow_list = build_allow_list(lua, registry).unwrap();
        let env = lua.create_table().unwrap();
        for (key, value) in allow_list.iter() {
            env.raw_set(key.clone(), value.clone()).unwrap();
        }
        env
    }

    #[test]
    fn test_array_helpers() {
        let lua = Lua::new();
        let env = sandboxed(&lua, &Registry::new());

        let summary: String = lua
            .load(
                r#"
                local evens = array.filter(array.range(10), function(v) return v % 2 == 0 end)
                local squares = array.map(evens, function(v) return v * v end)
                local all = array.concat(array.of(0), squares)
                return table.concat(all, ",") .. ";" .. tostring(array.contains(all, 16))
                "#,
            )
            .set_environment(env)
            .eval()
            .unwrap();
        assert_eq!(summary, "0,4,16,36,64,100;true");
    }

    #[test]
    fn test_range_with_step() {
        let lua = Lua::new();
        let env = sandboxed(&lua, &Registry::new());

        let joined: String = lua
            .load("return table.concat(array.range(10, 1, -3), ',')")
            .set_environment(env.clone())
            .eval()
            .unwrap();
        assert_eq!(joined, "10,7,4,1");

        let err = lua
            .load("return array.range(1, 5, 0)")
            .set_environment(env)
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("step must not be zero"));
    }

    #[test]
    fn test_range_at_integer_bounds() {
        let lua = Lua::new();
        let env = sandboxed(&lua, &Registry::new());

        let top: i64 = lua
            .load("return #array.range(math.maxinteger - 1, math.maxinteger)")
            .set_environment(env.clone())
            .eval()
            .unwrap();
        assert_eq!(top, 2);

        let bottom: i64 = lua
            .load("return #array.range(math.mininteger + 1, math.mininteger, -1)")
            .set_environment(env.clone())
            .eval()
            .unwrap();
        assert_eq!(bottom, 2);

        let last: i64 = lua
            .load("local r = array.range(math.maxinteger - 5, math.maxinteger, 4) return r[#r]")
            .set_environment(env)
            .eval()
            .unwrap();
        assert_eq!(last, i64::MAX - 1);
    }

    #[test]
    fn test_range_size_limit() {
        let lua = Lua::new();
        let env = sandboxed(&lua, &Registry::new());

        let err = lua
            .load("return array.range(1, math.maxinteger)")
            .set_environment(env.clone())
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("limit"));

        let len: i64 = lua
            .load("return #array.range(1000000)")
            .set_environment(env)
            .eval()
            .unwrap();
        assert_eq!(len, MAX_RANGE_LEN as i64);
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(range_len(5, 1, 1), 0);
        assert_eq!(range_len(1, 5, -1), 0);
        assert_eq!(range_len(i64::MIN, i64::MAX, i64::MAX), 3);
    }

    #[test]
    fn test_provider_lookup() {
        let lua = Lua::new();
        let registry = Registry::new();
        let env = sandboxed(&lua, &registry);

        let factory = lua.create_function(|_, n: i64| Ok(n + 1)).unwrap();
        registry.register("inc", Value::Function(factory)).unwrap();

        let value: i64 = lua
            .load("return provider('inc')(41)")
            .set_environment(env.clone())
            .eval()
            .unwrap();
        assert_eq!(value, 42);

        let err = lua
            .load("return provider('missing')")
            .set_environment(env)
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("Unknown provider: missing"));
    }

    #[test]
    fn test_namespaces_drop_unsafe_members() {
        let lua = Lua::new();
        let env = sandboxed(&lua, &Registry::new());

        let err = lua
            .load("return math.random()")
            .set_environment(env)
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("'math.random' is not available"));
    }
}
