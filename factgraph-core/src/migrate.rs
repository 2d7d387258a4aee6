//! Linear migrations over persisted store blobs.
//!
//! A migration is a pure `JsonMap → JsonMap` transform with a strictly
//! increasing ordinal. The registry is append-only: ordinals are contiguous
//! from 1, existing migrations are never edited or reordered, and a blob
//! records how many have been applied to it. Loading applies the missing
//! suffix and stamps the blob current.

use crate::error::StoreError;
use serde_json::Value as Json;

/// The raw facts map a migration transforms: path string → tagged value.
pub type JsonMap = serde_json::Map<String, Json>;

/// One registered migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Ordinal, contiguous from 1.
    pub number: u32,
    /// Short identifier for diagnostics.
    pub name: &'static str,
    /// The transform itself.
    pub run: fn(JsonMap) -> JsonMap,
}

/// The ordered migration registry.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
}

impl MigrationRegistry {
    /// A registry with no migrations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a registry, validating that ordinals run 1, 2, … without
    /// gaps.
    ///
    /// # Errors
    /// Returns [`StoreError::MigrationGap`] on the first out-of-sequence
    /// ordinal.
    pub fn new(migrations: Vec<Migration>) -> Result<Self, StoreError> {
        for (index, migration) in migrations.iter().enumerate() {
            let expected = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
            if migration.number != expected {
                return Err(StoreError::MigrationGap {
                    expected,
                    found: migration.number,
                });
            }
        }
        Ok(Self { migrations })
    }

    /// Total number of registered migrations.
    pub fn total(&self) -> u32 {
        u32::try_from(self.migrations.len()).unwrap_or(u32::MAX)
    }

    /// Applies migrations `applied+1 ..= total` in order.
    ///
    /// # Errors
    /// Returns [`StoreError::FromTheFuture`] when the blob claims more
    /// migrations than the registry knows.
    pub fn apply_pending(&self, facts: JsonMap, applied: u32) -> Result<JsonMap, StoreError> {
        let total = self.total();
        if applied > total {
            return Err(StoreError::FromTheFuture { applied, total });
        }
        let mut facts = facts;
        for migration in &self.migrations[applied as usize..] {
            facts = (migration.run)(facts);
        }
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rename_old_to_new(mut facts: JsonMap) -> JsonMap {
        if let Some(value) = facts.remove("/old") {
            facts.insert("/new".to_string(), value);
        }
        facts
    }

    fn double_count(mut facts: JsonMap) -> JsonMap {
        if let Some(item) = facts
            .get_mut("/count")
            .and_then(|tagged| tagged.get_mut("item"))
        {
            if let Some(n) = item.as_i64() {
                *item = json!(n * 2);
            }
        }
        facts
    }

    fn registry() -> MigrationRegistry {
        MigrationRegistry::new(vec![
            Migration {
                number: 1,
                name: "rename-old-to-new",
                run: rename_old_to_new,
            },
            Migration {
                number: 2,
                name: "double-count",
                run: double_count,
            },
        ])
        .unwrap()
    }

    fn sample() -> JsonMap {
        let mut facts = JsonMap::new();
        facts.insert("/old".to_string(), json!({"$type": "int", "item": 3}));
        facts.insert("/count".to_string(), json!({"$type": "int", "item": 5}));
        facts
    }

    #[test]
    fn test_apply_pending_runs_suffix() {
        let out = registry().apply_pending(sample(), 0).unwrap();
        assert!(out.contains_key("/new"));
        assert!(!out.contains_key("/old"));
        assert_eq!(out["/count"]["item"], json!(10));

        // already fully migrated: untouched
        let out = registry().apply_pending(sample(), 2).unwrap();
        assert!(out.contains_key("/old"));
        assert_eq!(out["/count"]["item"], json!(5));
    }

    #[test]
    fn test_split_application_equals_direct() {
        let direct = registry().apply_pending(sample(), 0).unwrap();
        // apply 1 only, then resume from 1
        let partial = MigrationRegistry::new(vec![Migration {
            number: 1,
            name: "rename-old-to-new",
            run: rename_old_to_new,
        }])
        .unwrap()
        .apply_pending(sample(), 0)
        .unwrap();
        let resumed = registry().apply_pending(partial, 1).unwrap();
        assert_eq!(direct, resumed);
    }

    #[test]
    fn test_registry_validation() {
        let err = MigrationRegistry::new(vec![Migration {
            number: 2,
            name: "skipped-one",
            run: rename_old_to_new,
        }])
        .unwrap_err();
        assert!(matches!(
            err,
            StoreError::MigrationGap {
                expected: 1,
                found: 2
            }
        ));

        let err = registry().apply_pending(sample(), 9).unwrap_err();
        assert!(matches!(err, StoreError::FromTheFuture { .. }));
    }
}
