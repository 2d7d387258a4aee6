//! Fact definitions and the frozen dictionary.
//!
//! A [`DictionaryBuilder`] accumulates [`FactDefinition`]s (the XML parser
//! drives this from the outside) and [`freeze`](DictionaryBuilder::freeze)s
//! them into an immutable [`Dictionary`]. Freezing is where authoring bugs
//! surface: duplicate or malformed paths, wildcards outside collections,
//! references to undeclared facts or modules, and expressions whose
//! inferred kind disagrees with the declaration.
//!
//! A frozen dictionary is shared across graphs behind an `Arc` and never
//! mutated.

use crate::error::DictionaryError;
use crate::expr::{DepRef, Expr};
use crate::limits::{Limit, LimitKind};
use crate::value::ValueKind;
use factgraph_path::{Path, Segment};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Descriptive side data attached to a definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    /// Human-readable name.
    pub name: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Whether the fact may leave the system through exports.
    pub exported: bool,
}

/// A conditional substitution of a writable's effective value.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// Trigger; must evaluate completely true to apply.
    pub condition: Expr,
    /// Replaces the stored value and placeholder while triggered.
    pub replacement: Expr,
}

/// Where a fact's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FactSource {
    /// User-supplied through the store.
    Writable {
        /// Declared limits, checked on `set` and `save`.
        limits: Vec<Limit>,
        /// Provisional value while unwritten.
        placeholder: Option<Expr>,
        /// Conditional substitutions, first trigger wins.
        overrides: Vec<Override>,
    },
    /// Computed from other facts.
    Derived {
        /// The defining expression.
        expr: Expr,
    },
}

/// One declared fact, keyed by its abstract path.
#[derive(Debug, Clone, PartialEq)]
pub struct FactDefinition {
    /// Abstract path (wildcards for collection positions, no members).
    pub path: Path,
    /// Declared value kind.
    pub kind: ValueKind,
    /// For enum kinds: the fact producing the option set.
    pub options: Option<Path>,
    /// Writable or derived.
    pub source: FactSource,
    /// Side data.
    pub meta: Meta,
    /// Owning module, when the dictionary is modular.
    pub module: Option<String>,
}

impl FactDefinition {
    /// A writable leaf of the given kind.
    pub fn writable(path: Path, kind: ValueKind) -> Self {
        Self {
            path,
            kind,
            options: None,
            source: FactSource::Writable {
                limits: Vec::new(),
                placeholder: None,
                overrides: Vec::new(),
            },
            meta: Meta::default(),
            module: None,
        }
    }

    /// A derived fact computed by `expr`.
    pub fn derived(path: Path, kind: ValueKind, expr: Expr) -> Self {
        Self {
            path,
            kind,
            options: None,
            source: FactSource::Derived { expr },
            meta: Meta::default(),
            module: None,
        }
    }

    /// A writable collection.
    pub fn collection(path: Path) -> Self {
        Self::writable(path, ValueKind::Collection)
    }

    /// Attaches a declared limit (writables only; checked at freeze).
    #[must_use]
    pub fn with_limit(mut self, limit: Limit) -> Self {
        if let FactSource::Writable { limits, .. } = &mut self.source {
            limits.push(limit);
        }
        self
    }

    /// Attaches a placeholder expression.
    #[must_use]
    pub fn with_placeholder(mut self, expr: Expr) -> Self {
        if let FactSource::Writable { placeholder, .. } = &mut self.source {
            *placeholder = Some(expr);
        }
        self
    }

    /// Attaches an override.
    #[must_use]
    pub fn with_override(mut self, condition: Expr, replacement: Expr) -> Self {
        if let FactSource::Writable { overrides, .. } = &mut self.source {
            overrides.push(Override {
                condition,
                replacement,
            });
        }
        self
    }

    /// Names the option-set fact for enum kinds.
    #[must_use]
    pub fn with_options(mut self, options: Path) -> Self {
        self.options = Some(options);
        self
    }

    /// Assigns the definition to a module.
    #[must_use]
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    /// Marks the fact exported.
    #[must_use]
    pub fn exported(mut self) -> Self {
        self.meta.exported = true;
        self
    }

    /// Whether the fact is user-writable.
    pub fn is_writable(&self) -> bool {
        matches!(self.source, FactSource::Writable { .. })
    }

    /// Every dependency reference of the definition: the defining
    /// expression (for deriveds) plus placeholder, override and limit-bound
    /// expressions (for writables), resolved against this path.
    pub fn deps(&self) -> Result<Vec<DepRef>, factgraph_path::PathError> {
        let mut out = Vec::new();
        match &self.source {
            FactSource::Derived { expr } => {
                out.extend(expr.deps(&self.path)?);
            }
            FactSource::Writable {
                limits,
                placeholder,
                overrides,
            } => {
                if let Some(placeholder) = placeholder {
                    out.extend(placeholder.deps(&self.path)?);
                }
                for over in overrides {
                    out.extend(over.condition.deps(&self.path)?);
                    out.extend(over.replacement.deps(&self.path)?);
                }
                for limit in limits {
                    out.extend(limit.bound.deps(&self.path)?);
                }
            }
        }
        Ok(out)
    }
}

/// Accumulates definitions; [`freeze`](Self::freeze) validates and
/// produces the immutable [`Dictionary`].
#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    modules: BTreeSet<String>,
    defs: Vec<FactDefinition>,
}

impl DictionaryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a module name for module-qualified references.
    pub fn declare_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.modules.insert(name.into());
        self
    }

    /// Adds a definition; all validation is deferred to freeze.
    pub fn add(&mut self, def: FactDefinition) -> &mut Self {
        self.defs.push(def);
        self
    }

    /// Validates the accumulated definitions and freezes them.
    ///
    /// # Errors
    /// Returns the first [`DictionaryError`] found; see the module docs for
    /// the checks performed.
    pub fn freeze(self) -> Result<Arc<Dictionary>, DictionaryError> {
        let DictionaryBuilder { modules, defs } = self;

        let mut keyed: HashMap<String, Arc<FactDefinition>> = HashMap::new();
        let mut order: Vec<Path> = Vec::new();
        for def in defs {
            let key = def.path.to_string();
            validate_path(&def)?;
            if let Some(module) = &def.module {
                if !modules.contains(module) {
                    return Err(DictionaryError::MissingModule {
                        module: module.clone(),
                        of: key,
                    });
                }
            }
            if keyed.insert(key.clone(), Arc::new(def)).is_some() {
                return Err(DictionaryError::DuplicatePath { path: key });
            }
            order.push(order_path(&keyed, &key));
        }

        let lookup = |path: &Path| -> Option<ValueKind> {
            keyed.get(&path.to_string()).map(|d| d.kind)
        };

        let mut reverse: HashMap<String, Vec<Path>> = HashMap::new();
        for def in keyed.values() {
            validate_structure(def, &keyed)?;
            validate_kinds(def, &lookup)?;
            validate_options(def, &keyed)?;
            validate_regexes(def)?;
            for dep in def.deps()? {
                validate_dep(def, &dep, &keyed, &modules)?;
                reverse
                    .entry(dep.path.to_string())
                    .or_default()
                    .push(def.path.clone());
            }
        }
        for targets in reverse.values_mut() {
            targets.sort_by_key(ToString::to_string);
            targets.dedup();
        }

        Ok(Arc::new(Dictionary {
            defs: keyed,
            order,
            reverse,
            modules,
        }))
    }
}

fn order_path(keyed: &HashMap<String, Arc<FactDefinition>>, key: &str) -> Path {
    keyed[key].path.clone()
}

fn validate_path(def: &FactDefinition) -> Result<(), DictionaryError> {
    let key = def.path.to_string();
    if !def.path.is_absolute() {
        return Err(DictionaryError::RelativeDefinition { path: key });
    }
    if def.path.segments().is_empty() {
        return Err(DictionaryError::RelativeDefinition { path: key });
    }
    if def
        .path
        .segments()
        .iter()
        .any(|s| matches!(s, Segment::Member(_)))
    {
        return Err(DictionaryError::MemberInDefinition { path: key });
    }
    Ok(())
}

/// Every wildcard must sit directly under a collection definition.
fn validate_structure(
    def: &FactDefinition,
    keyed: &HashMap<String, Arc<FactDefinition>>,
) -> Result<(), DictionaryError> {
    let segments = def.path.segments();
    let mut prefix = Path::root();
    for segment in segments {
        if matches!(segment, Segment::Wildcard) {
            let collection = keyed.get(&prefix.to_string());
            let is_collection =
                collection.is_some_and(|d| d.kind == ValueKind::Collection && d.is_writable());
            if !is_collection {
                return Err(DictionaryError::WildcardWithoutCollection {
                    path: def.path.to_string(),
                });
            }
        }
        prefix = append(prefix, segment.clone());
    }
    Ok(())
}

fn append(path: Path, segment: Segment) -> Path {
    match segment {
        Segment::Child(name) => path.child(&name).unwrap_or(path),
        Segment::Wildcard => path.wildcard(),
        Segment::Member(id) => path.member(id),
        Segment::Parent => path.parent().unwrap_or(path),
    }
}

fn validate_kinds(
    def: &FactDefinition,
    lookup: &dyn Fn(&Path) -> Option<ValueKind>,
) -> Result<(), DictionaryError> {
    let check = |expr: &Expr, expected: Option<ValueKind>| -> Result<(), DictionaryError> {
        let inferred = expr.infer_kind(&def.path, def.kind, lookup)?;
        if let (Some(inferred), Some(expected)) = (inferred, expected) {
            if inferred != expected {
                return Err(DictionaryError::KindMismatch {
                    path: def.path.to_string(),
                    declared: expected,
                    inferred,
                });
            }
        }
        Ok(())
    };
    match &def.source {
        FactSource::Derived { expr } => check(expr, Some(def.kind)),
        FactSource::Writable {
            limits,
            placeholder,
            overrides,
        } => {
            if let Some(placeholder) = placeholder {
                check(placeholder, Some(def.kind))?;
            }
            for over in overrides {
                check(&over.condition, Some(ValueKind::Bool))?;
                check(&over.replacement, Some(def.kind))?;
            }
            for limit in limits {
                let expected = match limit.kind {
                    LimitKind::Min | LimitKind::Max => None,
                    LimitKind::MinLength
                    | LimitKind::MaxLength
                    | LimitKind::MaxCollectionSize => Some(ValueKind::Int),
                    LimitKind::Match => Some(ValueKind::Str),
                };
                check(&limit.bound, expected)?;
            }
            Ok(())
        }
    }
}

fn validate_options(
    def: &FactDefinition,
    keyed: &HashMap<String, Arc<FactDefinition>>,
) -> Result<(), DictionaryError> {
    let needs_options =
        matches!(def.kind, ValueKind::Enum | ValueKind::MultiEnum) && def.is_writable();
    match (&def.options, needs_options) {
        (None, true) => Err(DictionaryError::MissingOptions {
            path: def.path.to_string(),
        }),
        (Some(options), _) => {
            let target = keyed.get(&options.to_string());
            match target {
                Some(target) if target.kind == ValueKind::MultiEnum => Ok(()),
                _ => Err(DictionaryError::InvalidOptions {
                    path: def.path.to_string(),
                    options: options.to_string(),
                }),
            }
        }
        (None, false) => Ok(()),
    }
}

/// `Match` bounds that are literals must compile.
fn validate_regexes(def: &FactDefinition) -> Result<(), DictionaryError> {
    let FactSource::Writable { limits, .. } = &def.source else {
        return Ok(());
    };
    for limit in limits {
        if limit.kind == LimitKind::Match {
            if let Expr::Const(crate::value::Value::Str(pattern)) = &limit.bound {
                regex::Regex::new(pattern).map_err(|source| DictionaryError::InvalidRegex {
                    path: def.path.to_string(),
                    source,
                })?;
            }
        }
    }
    Ok(())
}

fn validate_dep(
    def: &FactDefinition,
    dep: &DepRef,
    keyed: &HashMap<String, Arc<FactDefinition>>,
    modules: &BTreeSet<String>,
) -> Result<(), DictionaryError> {
    let Some(target) = keyed.get(&dep.path.to_string()) else {
        return Err(DictionaryError::UnknownDependency {
            path: dep.path.to_string(),
            of: def.path.to_string(),
        });
    };
    if let Some(module) = &dep.module {
        if !modules.contains(module) {
            return Err(DictionaryError::MissingModule {
                module: module.clone(),
                of: def.path.to_string(),
            });
        }
        if target.module.as_deref() != Some(module.as_str()) {
            return Err(DictionaryError::ModuleMismatch {
                path: dep.path.to_string(),
                module: module.clone(),
                of: def.path.to_string(),
            });
        }
    }
    Ok(())
}

/// The immutable, frozen set of fact definitions.
#[derive(Debug)]
pub struct Dictionary {
    defs: HashMap<String, Arc<FactDefinition>>,
    order: Vec<Path>,
    reverse: HashMap<String, Vec<Path>>,
    modules: BTreeSet<String>,
}

impl Dictionary {
    /// Starts an empty builder.
    pub fn builder() -> DictionaryBuilder {
        DictionaryBuilder::new()
    }

    /// The definition at an abstract path.
    pub fn definition(&self, path: &Path) -> Option<&Arc<FactDefinition>> {
        self.defs.get(&path.to_string())
    }

    /// Declared abstract paths, in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.order.iter()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Declared module names.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    /// Whether `path` (abstract) is a writable collection.
    pub fn is_collection(&self, path: &Path) -> bool {
        self.definition(path)
            .is_some_and(|d| d.kind == ValueKind::Collection && d.is_writable())
    }

    /// The dependency references of the definition at `path`.
    pub fn forward_deps(&self, path: &Path) -> Vec<DepRef> {
        self.definition(path)
            .and_then(|def| def.deps().ok())
            .unwrap_or_default()
    }

    /// The definitions that depend on `path`, precomputed at freeze.
    pub fn reverse_deps(&self, path: &Path) -> &[Path] {
        self.reverse
            .get(&path.to_string())
            .map_or(&[], Vec::as_slice)
    }
}
