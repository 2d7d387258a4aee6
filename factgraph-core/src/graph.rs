//! The graph runtime: lazy, memoized evaluation over a dictionary and a
//! store.
//!
//! A `Graph` owns its store and caches exclusively and is single-threaded
//! by construction (interior `RefCell` state); the dictionary is shared and
//! immutable. Reads are memoized per concrete path; every mutating
//! operation drops the whole result cache; writes are rare relative to
//! reads, and whole-cache invalidation is what keeps reads trivially
//! consistent. The fact-instance cache is monotonic for the graph's life.

use crate::dictionary::{Dictionary, FactSource};
use crate::error::{EvalError, GraphError};
use crate::expr::context::EvalContext;
use crate::expr::{writable, Evaluated};
use crate::fact::Fact;
use crate::limits::{self, LimitReport, LimitViolation};
use crate::migrate::MigrationRegistry;
use crate::result::{Computed, MaybeVec};
use crate::store::{Store, StoreDiff};
use crate::value::{Value, ValueKind};
use ahash::{AHashMap, AHashSet};
use chrono::NaiveDate;
use factgraph_path::{MemberId, Path, Segment};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// A live fact graph.
pub struct Graph {
    dictionary: Arc<Dictionary>,
    store: Store,
    facts: RefCell<AHashMap<String, Rc<Fact>>>,
    results: RefCell<AHashMap<String, Computed<Value>>>,
    in_flight: RefCell<AHashSet<String>>,
    today: Option<NaiveDate>,
}

impl Graph {
    /// A graph over `dictionary` with an empty store, stamped current for
    /// `registry`.
    pub fn new(dictionary: Arc<Dictionary>, registry: &MigrationRegistry) -> Self {
        Self::with_store(dictionary, Store::new(registry))
    }

    /// A graph over an existing store.
    pub fn with_store(dictionary: Arc<Dictionary>, store: Store) -> Self {
        Self {
            dictionary,
            store,
            facts: RefCell::new(AHashMap::new()),
            results: RefCell::new(AHashMap::new()),
            in_flight: RefCell::new(AHashSet::new()),
            today: None,
        }
    }

    /// Loads a persisted blob, running pending migrations.
    ///
    /// # Errors
    /// Returns [`GraphError::Store`] when the blob is malformed or claims
    /// migrations the registry does not know.
    pub fn load(
        dictionary: Arc<Dictionary>,
        blob: &str,
        registry: &MigrationRegistry,
    ) -> Result<Self, GraphError> {
        let store = Store::from_json(blob, registry, &dictionary)?;
        Ok(Self::with_store(dictionary, store))
    }

    /// Pins `Today` to a fixed date for reproducible evaluation.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today.into();
        self
    }

    /// The shared dictionary.
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// The owned store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub(crate) fn stored_value(&self, path: &Path) -> Option<Value> {
        self.store.get(path).cloned()
    }

    /// Reads one fact.
    ///
    /// The path must resolve to a single fact; reading through a wildcard
    /// is [`get_vect`](Self::get_vect)'s job.
    ///
    /// # Errors
    /// [`GraphError::UnknownPath`] for undeclared paths or absent members;
    /// [`GraphError::Eval`] for cycles and multiplicity misuse.
    pub fn get(&self, path: &str) -> Result<Computed<Value>, GraphError> {
        let path: Path = path.parse()?;
        match self.eval_path(&path, &Path::root()).map_err(graph_err)? {
            MaybeVec::Single(computed) => Ok(computed),
            MaybeVec::Multiple { items, .. } => Err(graph_err(EvalError::NotSingular {
                path: path.to_string(),
                count: items.len(),
            })),
        }
    }

    /// Reads through a wildcard, flattening to one result per member.
    ///
    /// # Errors
    /// As [`get`](Self::get).
    pub fn get_vect(&self, path: &str) -> Result<Vec<Computed<Value>>, GraphError> {
        let path: Path = path.parse()?;
        Ok(self
            .eval_path(&path, &Path::root())
            .map_err(graph_err)?
            .into_vec())
    }

    /// Writes a value.
    ///
    /// The value is stored even when limits fail (so `save` can report the
    /// aggregate); the returned report carries the immediate violations,
    /// with `ok` false on any error-severity violation.
    ///
    /// # Errors
    /// [`GraphError::TypeMismatch`] when the value's kind differs from the
    /// declaration; [`GraphError::NotWritable`] for derived facts;
    /// [`GraphError::UnknownPath`] / [`GraphError::AbstractPath`] for bad
    /// targets.
    pub fn set(&mut self, path: &str, value: Value) -> Result<LimitReport, GraphError> {
        let path = self.writable_target(path)?;
        let def = self.fact_at(&path).map_err(graph_err)?.definition().clone();
        if !def.is_writable() {
            return Err(GraphError::NotWritable {
                path: path.to_string(),
            });
        }
        if value.kind() != def.kind {
            return Err(GraphError::TypeMismatch {
                path: path.to_string(),
                expected: def.kind,
                actual: value.kind(),
            });
        }
        if let Some(declared) = enum_options_of(&value) {
            if Some(declared) != def.options.as_ref() {
                return Err(GraphError::TypeMismatch {
                    path: path.to_string(),
                    expected: def.kind,
                    actual: value.kind(),
                });
            }
        }
        self.store.put(&path, value.clone());
        self.invalidate();
        let violations = self.violations_for(&path, &value)?;
        Ok(LimitReport::from_violations(violations))
    }

    /// Removes a stored value, returning whether one was present.
    ///
    /// # Errors
    /// As [`set`](Self::set) for bad targets.
    pub fn delete(&mut self, path: &str) -> Result<bool, GraphError> {
        let path = self.writable_target(path)?;
        let present = self.store.delete(&path);
        self.invalidate();
        Ok(present)
    }

    /// Appends a member to a collection.
    ///
    /// # Errors
    /// [`GraphError::Value`] with a duplicate-member cause when the id is
    /// already present; [`GraphError::UnknownPath`] / [`GraphError::NotWritable`]
    /// for non-collection targets.
    pub fn add_member(&mut self, collection: &str, id: &str) -> Result<(), GraphError> {
        let (path, mut value) = self.collection_target(collection)?;
        let id = MemberId::new(id)?;
        value.add(id)?;
        self.store.put(&path, Value::Collection(value));
        self.invalidate();
        Ok(())
    }

    /// Removes a member and every stored value underneath it.
    ///
    /// # Errors
    /// [`GraphError::UnknownPath`] when the id is not a member.
    pub fn remove_member(&mut self, collection: &str, id: &str) -> Result<(), GraphError> {
        let (path, mut value) = self.collection_target(collection)?;
        let id = MemberId::new(id)?;
        let member_path = path.member(id.clone());
        if !value.remove(&id) {
            return Err(GraphError::UnknownPath {
                path: member_path.to_string(),
            });
        }
        self.store.put(&path, Value::Collection(value));
        self.store.delete_prefix(&member_path);
        self.invalidate();
        Ok(())
    }

    /// Evaluates every limit of every stored writable.
    ///
    /// # Errors
    /// Propagates fatal evaluation defects from limit bounds.
    pub fn save(&mut self) -> Result<LimitReport, GraphError> {
        self.invalidate();
        let stored: Vec<(String, Value)> = self
            .store
            .writables()
            .map(|(path, value)| (path.to_string(), value.clone()))
            .collect();
        let mut violations = Vec::new();
        for (key, value) in stored {
            let Ok(path) = key.parse::<Path>() else {
                continue;
            };
            if self.dictionary.definition(&path.to_abstract()).is_none() {
                continue;
            }
            violations.extend(self.violations_for(&path, &value)?);
        }
        Ok(LimitReport::from_violations(violations))
    }

    /// Serializes the store to the persisted blob shape.
    pub fn to_json(&self, pretty: bool) -> String {
        self.store.to_json(pretty)
    }

    /// Clears the store, keeping the dictionary and migration stamp.
    pub fn reset(&mut self) {
        self.store.clear();
        self.invalidate();
    }

    /// Paths differing between this store and another.
    pub fn diff(&self, other: &Store) -> StoreDiff {
        self.store.diff(other)
    }

    /// A human-readable derivation trace for `path`.
    ///
    /// # Errors
    /// As [`get`](Self::get).
    pub fn explain(&self, path: &str) -> Result<String, GraphError> {
        crate::explain::explain(self, path)
    }

    // ─── resolution and evaluation internals ───

    fn invalidate(&mut self) {
        self.results.borrow_mut().clear();
    }

    /// Parses and validates a concrete writable target path.
    fn writable_target(&self, path: &str) -> Result<Path, GraphError> {
        let path: Path = path.parse()?;
        if path.is_abstract() || !path.is_concrete() {
            return Err(GraphError::AbstractPath {
                path: path.to_string(),
            });
        }
        Ok(path)
    }

    /// Resolves a collection path to its definition and current membership.
    fn collection_target(&self, path: &str) -> Result<(Path, crate::value::Collection), GraphError> {
        let path = self.writable_target(path)?;
        let def = self
            .dictionary
            .definition(&path.to_abstract())
            .ok_or_else(|| GraphError::UnknownPath {
                path: path.to_string(),
            })?;
        if def.kind != ValueKind::Collection || !def.is_writable() {
            return Err(GraphError::NotWritable {
                path: path.to_string(),
            });
        }
        let value = match self.store.get(&path) {
            Some(Value::Collection(c)) => c.clone(),
            _ => crate::value::Collection::new(),
        };
        Ok((path, value))
    }

    fn violations_for(
        &self,
        path: &Path,
        value: &Value,
    ) -> Result<Vec<LimitViolation>, GraphError> {
        let fact = self.fact_at(path).map_err(graph_err)?;
        let def = fact.definition();
        let ctx = EvalContext::new(self, path.clone(), Some(def.clone()));
        let mut violations =
            limits::intrinsic(def.options.as_ref(), path, value, &ctx).map_err(graph_err)?;
        if let FactSource::Writable { limits: declared, .. } = &def.source {
            for limit in declared {
                if let Some(violation) =
                    limits::check(limit, path, value, &ctx).map_err(graph_err)?
                {
                    violations.push(violation);
                }
            }
        }
        Ok(violations)
    }

    /// Resolves and evaluates `path` (relative paths against `base`),
    /// expanding wildcards against current collection membership.
    pub(crate) fn eval_path(&self, path: &Path, base: &Path) -> Result<Evaluated, EvalError> {
        let resolved = path.resolve(base)?;
        if !resolved.is_abstract() {
            return Ok(MaybeVec::Single(self.force_concrete(&resolved)?));
        }
        let (paths, complete) = self.expand(&resolved)?;
        let items = paths
            .iter()
            .map(|concrete| self.force_concrete(concrete))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MaybeVec::Multiple { items, complete })
    }

    /// Wildcard expansion for callers outside the evaluation core
    /// (explain traces).
    pub(crate) fn expand_paths(&self, path: &Path) -> Result<Vec<Path>, GraphError> {
        self.expand(path).map(|(paths, _)| paths).map_err(graph_err)
    }

    /// Expands wildcards into concrete paths, left to right. The returned
    /// flag records whether every crossed collection was fully enumerated.
    fn expand(&self, path: &Path) -> Result<(Vec<Path>, bool), EvalError> {
        let mut prefixes = vec![Path::root()];
        let mut complete = true;
        for segment in path.segments() {
            match segment {
                Segment::Wildcard => {
                    let mut next = Vec::new();
                    for prefix in &prefixes {
                        let (members, enumerated) = self.collection_members(prefix)?;
                        complete = complete && enumerated;
                        next.extend(members.into_iter().map(|id| prefix.member(id)));
                    }
                    prefixes = next;
                }
                Segment::Child(name) => {
                    prefixes = prefixes
                        .iter()
                        .map(|p| p.child(name))
                        .collect::<Result<_, _>>()?;
                }
                Segment::Member(id) => {
                    prefixes = prefixes.iter().map(|p| p.member(id.clone())).collect();
                }
                Segment::Parent => {
                    return Err(EvalError::UnknownPath {
                        path: path.to_string(),
                    })
                }
            }
        }
        Ok((prefixes, complete))
    }

    /// The current membership of the collection at a concrete path, and
    /// whether that membership is definitively known.
    pub(crate) fn collection_members(
        &self,
        path: &Path,
    ) -> Result<(Vec<MemberId>, bool), EvalError> {
        let def = self
            .dictionary
            .definition(&path.to_abstract())
            .ok_or_else(|| EvalError::UnknownPath {
                path: path.to_string(),
            })?;
        if def.kind != ValueKind::Collection {
            return Err(EvalError::UnknownPath {
                path: path.to_string(),
            });
        }
        match self.force_concrete(path)? {
            Computed::Complete(Value::Collection(c)) => {
                Ok((c.iter().cloned().collect(), true))
            }
            Computed::Placeholder(Value::Collection(c)) => {
                Ok((c.iter().cloned().collect(), false))
            }
            _ => Ok((Vec::new(), false)),
        }
    }

    /// Forces one concrete fact: cache hit, or evaluate and memoize.
    pub(crate) fn force_concrete(&self, path: &Path) -> Result<Computed<Value>, EvalError> {
        let key = path.to_string();
        if let Some(hit) = self.results.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let fact = self.fact_at(path)?;
        if !self.in_flight.borrow_mut().insert(key.clone()) {
            return Err(EvalError::Cycle { path: key });
        }
        let ctx = EvalContext::new(self, path.clone(), Some(fact.definition().clone()));
        let outcome = match &fact.definition().source {
            FactSource::Writable { .. } => writable::eval(&ctx),
            FactSource::Derived { expr } => expr.eval(&ctx),
        };
        self.in_flight.borrow_mut().remove(&key);
        let computed = match outcome? {
            MaybeVec::Single(computed) => computed,
            MaybeVec::Multiple { items, .. } => {
                return Err(EvalError::NotSingular {
                    path: key,
                    count: items.len(),
                })
            }
        };
        self.results.borrow_mut().insert(key, computed.clone());
        Ok(computed)
    }

    /// The cached fact instance at a concrete path, materializing it (and
    /// validating any member segments against live membership) on first
    /// use.
    pub(crate) fn fact_at(&self, path: &Path) -> Result<Rc<Fact>, EvalError> {
        let key = path.to_string();
        if let Some(hit) = self.facts.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let def = self
            .dictionary
            .definition(&path.to_abstract())
            .ok_or_else(|| EvalError::UnknownPath { path: key.clone() })?
            .clone();
        let mut prefix = Path::root();
        for segment in path.segments() {
            if let Segment::Member(id) = segment {
                let (members, _) = self.collection_members(&prefix)?;
                if !members.contains(id) {
                    return Err(EvalError::UnknownPath { path: key });
                }
            }
            prefix = match segment {
                Segment::Child(name) => prefix.child(name)?,
                Segment::Member(id) => prefix.member(id.clone()),
                Segment::Wildcard => prefix.wildcard(),
                Segment::Parent => prefix,
            };
        }
        let fact = Rc::new(Fact::new(path.clone(), def));
        self.facts.borrow_mut().insert(key, fact.clone());
        Ok(fact)
    }
}

/// Surfaces resolution failures under their own taxonomy kind.
fn graph_err(err: EvalError) -> GraphError {
    match err {
        EvalError::UnknownPath { path } => GraphError::UnknownPath { path },
        other => GraphError::Eval(other),
    }
}

fn enum_options_of(value: &Value) -> Option<&Path> {
    match value {
        Value::Enum(e) => Some(&e.options_path),
        Value::MultiEnum(m) => Some(&m.options_path),
        _ => None,
    }
}
