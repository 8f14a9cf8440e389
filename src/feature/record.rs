//! Loaded feature records and the shared feature table

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use mlua::{Function, Table};
use serde::Serialize;

/// What a loaded feature module contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureShape {
    EntryOnly,
    StoreOnly,
    EntryAndStore,
    NoOp,
}

impl std::fmt::Display for FeatureShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FeatureShape::EntryOnly => "entry",
            FeatureShape::StoreOnly => "store",
            FeatureShape::EntryAndStore => "entry+store",
            FeatureShape::NoOp => "no-op",
        };
        write!(f, "{}", label)
    }
}

/// A successfully loaded feature
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub name: String,
    pub path: PathBuf,
    pub entry: Option<Function>,
    pub store: Option<Table>,
    pub loaded_at: DateTime<Utc>,
}

impl FeatureRecord {
    pub fn shape(&self) -> FeatureShape {
        match (&self.entry, &self.store) {
            (Some(_), Some(_)) => FeatureShape::EntryAndStore,
            (Some(_), None) => FeatureShape::EntryOnly,
            (None, Some(_)) => FeatureShape::StoreOnly,
            (None, None) => FeatureShape::NoOp,
        }
    }
}

/// Load state of a feature name. Names never seen are `Unloaded` and have no entry.
#[derive(Debug, Clone)]
pub enum FeatureState {
    Loading,
    Loaded(FeatureRecord),
}

/// Shared handle to every feature's state. Clones refer to the same table.
#[derive(Debug, Clone, Default)]
pub struct Features {
    states: Rc<RefCell<IndexMap<String, FeatureState>>>,
}

impl Features {
    /// Whether `name` has left the `Unloaded` state
    pub fn is_known(&self, name: &str) -> bool {
        self.states.borrow().contains_key(name)
    }

    pub fn is_loading(&self, name: &str) -> bool {
        matches!(self.states.borrow().get(name), Some(FeatureState::Loading))
    }

    pub(crate) fn begin(&self, name: &str) {
        self.states
            .borrow_mut()
            .insert(name.to_string(), FeatureState::Loading);
    }

    pub(crate) fn finish(&self, record: FeatureRecord) {
        self.states
            .borrow_mut()
            .insert(record.name.clone(), FeatureState::Loaded(record));
    }

    /// Return a failed load to `Unloaded`
    pub(crate) fn abandon(&self, name: &str) {
        self.states.borrow_mut().shift_remove(name);
    }

    pub fn record(&self, name: &str) -> Option<FeatureRecord> {
        match self.states.borrow().get(name) {
            Some(FeatureState::Loaded(record)) => Some(record.clone()),
            _ => None,
        }
    }

    pub fn entry(&self, name: &str) -> Option<Function> {
        self.record(name).and_then(|record| record.entry)
    }

    pub fn store(&self, name: &str) -> Option<Table> {
        self.record(name).and_then(|record| record.store)
    }

    /// Loaded records in load order
    pub fn loaded(&self) -> Vec<FeatureRecord> {
        self.states
            .borrow()
            .values()
            .filter_map(|state| match state {
                FeatureState::Loaded(record) => Some(record.clone()),
                FeatureState::Loading => None,
            })
            .collect()
    }
}
