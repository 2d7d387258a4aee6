//! The writable value store.
//!
//! Maps concrete path strings to typed [`Value`]s, carries the migration
//! counter, and round-trips through the persisted blob shape
//! `{"facts": {path: tagged-value}, "migrations": n}`.

use crate::dictionary::Dictionary;
use crate::error::StoreError;
use crate::migrate::{JsonMap, MigrationRegistry};
use crate::value::Value;
use factgraph_path::Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize)]
struct Blob {
    facts: JsonMap,
    migrations: u32,
}

/// Per-user writable values, keyed by concrete path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    facts: BTreeMap<String, Value>,
    migrations_applied: u32,
}

/// Paths whose values differ between two stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreDiff {
    /// Present here, absent there.
    pub added: Vec<String>,
    /// Absent here, present there.
    pub removed: Vec<String>,
    /// Present in both with different values.
    pub changed: Vec<String>,
}

impl Store {
    /// An empty store, stamped current for `registry`.
    pub fn new(registry: &MigrationRegistry) -> Self {
        Self {
            facts: BTreeMap::new(),
            migrations_applied: registry.total(),
        }
    }

    /// The value at a concrete path.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.facts.get(&path.to_string())
    }

    /// Unconditionally replaces (or inserts) the value at `path`.
    pub fn put(&mut self, path: &Path, value: Value) {
        self.facts.insert(path.to_string(), value);
    }

    /// Removes the value at `path`, returning whether one was present.
    pub fn delete(&mut self, path: &Path) -> bool {
        self.facts.remove(&path.to_string()).is_some()
    }

    /// Removes every value strictly under `prefix` (used when a collection
    /// member is removed). Returns how many entries were dropped.
    pub fn delete_prefix(&mut self, prefix: &Path) -> usize {
        let prefix = format!("{prefix}/");
        let doomed: Vec<String> = self
            .facts
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.facts.remove(key);
        }
        doomed.len()
    }

    /// Iterates stored `(path, value)` pairs in path order.
    pub fn writables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Drops every stored value, keeping the migration counter.
    pub fn clear(&mut self) {
        self.facts.clear();
    }

    /// How many migrations the persisted form has seen.
    pub fn migrations_applied(&self) -> u32 {
        self.migrations_applied
    }

    /// Serializes to the persisted blob shape.
    pub fn to_json(&self, pretty: bool) -> String {
        let mut facts = JsonMap::new();
        for (path, value) in &self.facts {
            facts.insert(path.clone(), value.to_tagged_json());
        }
        let blob = Blob {
            facts,
            migrations: self.migrations_applied,
        };
        let rendered = if pretty {
            serde_json::to_string_pretty(&blob)
        } else {
            serde_json::to_string(&blob)
        };
        // the blob is built from already-encodable values
        rendered.unwrap_or_else(|_| String::from("{\"facts\":{},\"migrations\":0}"))
    }

    /// Parses a persisted blob: applies pending migrations, stamps the
    /// counter to the registry total, and decodes each entry against the
    /// dictionary's declared writable types.
    ///
    /// Entries whose path is no longer declared writable, or whose value
    /// no longer decodes against the declared type, are dropped; the
    /// migration pipeline is the mechanism for carrying them forward.
    ///
    /// # Errors
    /// Returns a [`StoreError`] for malformed JSON or an over-migrated
    /// blob.
    pub fn from_json(
        input: &str,
        registry: &MigrationRegistry,
        dictionary: &Dictionary,
    ) -> Result<Self, StoreError> {
        let blob: Blob = serde_json::from_str(input)?;
        let facts = registry.apply_pending(blob.facts, blob.migrations)?;
        let mut store = Store {
            facts: BTreeMap::new(),
            migrations_applied: registry.total(),
        };
        for (key, tagged) in &facts {
            let Ok(path) = key.parse::<Path>() else {
                continue;
            };
            let Some(def) = dictionary.definition(&path.to_abstract()) else {
                continue;
            };
            if !def.is_writable() {
                continue;
            }
            let Ok(value) = Value::from_tagged_json(tagged, def.options.as_ref()) else {
                continue;
            };
            if value.kind() != def.kind {
                continue;
            }
            store.facts.insert(key.clone(), value);
        }
        Ok(store)
    }

    /// Drops entries whose abstract paths are no longer declared writable.
    /// Returns how many entries were dropped.
    pub fn sync_with_dictionary(&mut self, dictionary: &Dictionary) -> usize {
        let before = self.facts.len();
        self.facts.retain(|key, _| {
            key.parse::<Path>().is_ok_and(|path| {
                dictionary
                    .definition(&path.to_abstract())
                    .is_some_and(|def| def.is_writable())
            })
        });
        before - self.facts.len()
    }

    /// Paths added, removed or changed in `self` relative to `other`.
    pub fn diff(&self, other: &Store) -> StoreDiff {
        let mut diff = StoreDiff::default();
        for (key, value) in &self.facts {
            match other.facts.get(key) {
                None => diff.added.push(key.clone()),
                Some(theirs) if theirs != value => diff.changed.push(key.clone()),
                Some(_) => {}
            }
        }
        for key in other.facts.keys() {
            if !self.facts.contains_key(key) {
                diff.removed.push(key.clone());
            }
        }
        diff
    }
}
