//! Errors surfaced by the engine.
//!
//! Each area owns an error enum; everything flows into [`GraphError`] at the
//! operation boundary. Data-driven failures inside expression evaluation
//! (division by zero, missing inputs, out-of-range indexes) are *not*
//! errors: they collapse to [`Computed::Incomplete`](crate::Computed).
//! [`EvalError`] is reserved for dictionary and caller bugs and is
//! fatal to the operation that hit it. Limit failures are likewise not
//! errors; see [`LimitViolation`](crate::limits::LimitViolation).

use crate::value::ValueKind;
use factgraph_path::PathError;
use thiserror::Error;

/// A raw value failed its type's invariants.
#[derive(Debug, Error)]
pub enum ValueError {
    /// A numeric literal could not be parsed.
    #[error("malformed {kind} literal: \"{value}\"")]
    MalformedNumber {
        /// The kind being parsed.
        kind: ValueKind,
        /// The offending literal.
        value: String,
    },

    /// A date literal was not `YYYY-MM-DD` or named an impossible day.
    #[error("malformed date: \"{value}\"")]
    MalformedDate {
        /// The offending literal.
        value: String,
    },

    /// A rational was constructed with a zero denominator.
    #[error("rational denominator is zero")]
    ZeroDenominator,

    /// A validated string (TIN, EIN, phone, …) did not match its format.
    #[error("\"{value}\" is not a valid {kind}")]
    InvalidFormat {
        /// The kind being constructed.
        kind: ValueKind,
        /// The rejected input.
        value: String,
    },

    /// A structured field (address region, bank routing number, …) failed
    /// its format or checksum.
    #[error("invalid {field}: \"{value}\"")]
    InvalidField {
        /// Which field was rejected.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A member id was added to a collection which already contains it.
    #[error("collection already contains member \"{id}\"")]
    DuplicateMember {
        /// The duplicated id.
        id: String,
    },

    /// JSON did not have the shape required by the target kind.
    #[error("cannot decode {kind} from {json}")]
    UnexpectedJson {
        /// The kind being decoded.
        kind: ValueKind,
        /// A rendering of the offending JSON.
        json: String,
    },

    /// A tagged value carried an unrecognized `$type`.
    #[error("unknown value type tag \"{tag}\"")]
    UnknownTypeTag {
        /// The unrecognized tag.
        tag: String,
    },

    /// A member id embedded in a value was malformed.
    #[error(transparent)]
    MemberId(#[from] PathError),
}

/// A persisted store blob could not be loaded or migrated.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The blob was not valid JSON or did not match the persisted shape.
    #[error("malformed store blob: {source}")]
    MalformedJson {
        /// The underlying decode failure.
        #[from]
        source: serde_json::Error,
    },

    /// Migration ordinals must be contiguous from 1.
    #[error("migration {found} registered where {expected} was expected")]
    MigrationGap {
        /// The ordinal the registry required next.
        expected: u32,
        /// The ordinal actually registered.
        found: u32,
    },

    /// The blob claims more migrations than the registry knows about.
    #[error("store was written by a newer build: {applied} migration(s) applied, registry has {total}")]
    FromTheFuture {
        /// `migrations` recorded in the blob.
        applied: u32,
        /// Registry length.
        total: u32,
    },

    /// A persisted path failed to parse.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A persisted value failed to decode against its declared type.
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// The dictionary is internally inconsistent.
///
/// These are authoring bugs, reported when a
/// [`DictionaryBuilder`](crate::dictionary::DictionaryBuilder) freezes.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Two definitions share an abstract path.
    #[error("duplicate definition at {path}")]
    DuplicatePath {
        /// The duplicated abstract path.
        path: String,
    },

    /// Definition paths must be absolute.
    #[error("definition path {path} is not absolute")]
    RelativeDefinition {
        /// The offending path.
        path: String,
    },

    /// Definition paths are templates; they may not pin concrete members.
    #[error("definition path {path} names a collection member")]
    MemberInDefinition {
        /// The offending path.
        path: String,
    },

    /// A wildcard segment must sit directly under a collection definition.
    #[error("wildcard in {path} is not under a collection")]
    WildcardWithoutCollection {
        /// The offending path.
        path: String,
    },

    /// An expression references a path no definition covers.
    #[error("{of} depends on undeclared fact {path}")]
    UnknownDependency {
        /// The missing dependency.
        path: String,
        /// The definition holding the reference.
        of: String,
    },

    /// A dependency names a module the dictionary does not declare.
    #[error("{of} references undeclared module \"{module}\"")]
    MissingModule {
        /// The missing module name.
        module: String,
        /// The definition holding the reference.
        of: String,
    },

    /// A module-qualified dependency resolved to a fact in a different
    /// module.
    #[error("{of} expects {path} in module \"{module}\"")]
    ModuleMismatch {
        /// The dependency path.
        path: String,
        /// The module the reference claimed.
        module: String,
        /// The definition holding the reference.
        of: String,
    },

    /// A derived expression's inferred kind disagrees with the declared
    /// kind.
    #[error("{path} declares {declared} but its expression produces {inferred}")]
    KindMismatch {
        /// The definition path.
        path: String,
        /// The declared kind.
        declared: ValueKind,
        /// The inferred kind.
        inferred: ValueKind,
    },

    /// Enum and multi-enum writables must name an options fact.
    #[error("{path} is an enum writable with no options path")]
    MissingOptions {
        /// The definition path.
        path: String,
    },

    /// The options path of an enum writable must produce an option set.
    #[error("options of {path} resolve to {options}, which is not an option set")]
    InvalidOptions {
        /// The definition path.
        path: String,
        /// The options path given.
        options: String,
    },

    /// Limits, placeholders and overrides only attach to writables.
    #[error("{path} is derived; it cannot carry {feature}")]
    NotWritable {
        /// The definition path.
        path: String,
        /// The feature that was attached.
        feature: &'static str,
    },

    /// A `Match` limit carries an uncompilable pattern.
    #[error("invalid pattern on {path}: {source}")]
    InvalidRegex {
        /// The definition path.
        path: String,
        /// The underlying regex failure.
        source: regex::Error,
    },

    /// A definition path failed to parse.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// A fatal defect encountered while evaluating an expression.
///
/// Unlike missing data, these do not collapse to `Incomplete`: the
/// dictionary or the caller is wrong and the operation is abandoned.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Vectorized operands had incompatible multiplicities.
    #[error("vector length mismatch: {left} vs {right}")]
    ShapeMismatch {
        /// Length of the first multiple operand.
        left: usize,
        /// The disagreeing length.
        right: usize,
    },

    /// A single result was required but the path expanded to many.
    #[error("{path} names {count} facts where one was required")]
    NotSingular {
        /// The offending path.
        path: String,
        /// How many facts it resolved to.
        count: usize,
    },

    /// A fact's evaluation re-entered itself.
    #[error("dependency cycle through {path}")]
    Cycle {
        /// The concrete path that re-entered.
        path: String,
    },

    /// A `Match` limit bound evaluated to a pattern that does not compile.
    ///
    /// Literal patterns are rejected when the dictionary freezes; this
    /// catches bounds that only produce their pattern at evaluation time.
    #[error("uncompilable pattern \"{pattern}\" in a limit on {path}")]
    InvalidPattern {
        /// The writable carrying the limit.
        path: String,
        /// The pattern that failed to compile.
        pattern: String,
    },

    /// A dependency resolved to a path with no definition.
    #[error("no fact is declared at {path}")]
    UnknownPath {
        /// The unresolvable path.
        path: String,
    },

    /// A dependency path failed to resolve structurally.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Top-level error type returned by [`Graph`](crate::graph::Graph)
/// operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The supplied path could not be parsed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The supplied value failed its type's invariants.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A write carried a value of the wrong type.
    #[error("type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The written path.
        path: String,
        /// The declared writable kind.
        expected: ValueKind,
        /// The kind actually supplied.
        actual: ValueKind,
    },

    /// The path names no declared fact (or a member absent from its
    /// collection).
    #[error("no fact exists at {path}")]
    UnknownPath {
        /// The unresolvable path.
        path: String,
    },

    /// A write targeted a derived fact.
    #[error("{path} is not writable")]
    NotWritable {
        /// The target path.
        path: String,
    },

    /// A concrete path was required but an abstract one was supplied.
    #[error("a concrete path is required, got {path}")]
    AbstractPath {
        /// The abstract path supplied.
        path: String,
    },

    /// Evaluation hit a fatal defect.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The persisted state could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The dictionary is inconsistent.
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
}
