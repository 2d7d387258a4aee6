//! The boundary adapter: structured requests over a [`Graph`].
//!
//! A [`Session`] owns one graph and maps wire-shaped [`Request`]s onto the
//! core API, coercing JSON values through the dictionary's declared types
//! and translating the error taxonomy into [`Response::Error`] without
//! leaking internals. Embedding services (REST, CLI, test harnesses) parse
//! their transport into `Request` and serialize `Response` back out.

use factgraph_core::{
    Dictionary, EvalError, Graph, GraphError, LimitViolation, MigrationRegistry, Path, Store,
    Value, ValueKind,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::sync::Arc;

/// Environment variable naming the dictionary directory or file; read by
/// the embedding service at startup.
pub const DICTIONARY_PATH_VAR: &str = "FACT_DICTIONARY_PATH";

/// One boundary operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Request {
    /// Abstract paths declared in the dictionary.
    ListPaths,
    /// Type tag, writability and metadata for one declared fact.
    DescribeFact {
        /// Abstract path.
        path: String,
    },
    /// Paths the fact's expressions reference.
    ForwardDeps {
        /// Abstract path.
        path: String,
    },
    /// Paths whose expressions reference this fact.
    ReverseDeps {
        /// Abstract path.
        path: String,
    },
    /// Evaluate one fact.
    Get {
        /// Concrete path.
        path: String,
    },
    /// Write one fact, coercing the JSON value through the declared type.
    Set {
        /// Concrete path.
        path: String,
        /// Value in the type's canonical JSON form.
        value: Json,
    },
    /// Apply several writes in order; later writes see earlier ones.
    BatchSet {
        /// The writes, applied in order.
        writes: Vec<Write>,
    },
    /// Human-readable derivation trace.
    Explain {
        /// Concrete or abstract path.
        path: String,
    },
    /// The persisted state blob.
    Snapshot,
    /// Replace the store from a persisted blob (running migrations).
    Load {
        /// The blob, as produced by `Snapshot`.
        state: Json,
    },
    /// Compare the live store against a persisted blob.
    Diff {
        /// The blob compared against.
        state: Json,
    },
    /// Append a collection member.
    AddMember {
        /// Collection path.
        path: String,
        /// New member id.
        member: String,
    },
    /// Remove a collection member and its stored values.
    RemoveMember {
        /// Collection path.
        path: String,
        /// Member id to remove.
        member: String,
    },
    /// Clear the store, keeping the dictionary.
    Reset,
}

/// One entry of a [`Request::BatchSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Write {
    /// Concrete path.
    pub path: String,
    /// Value in the type's canonical JSON form.
    pub value: Json,
}

/// The error taxonomy exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed path, JSON or literal.
    Parse,
    /// A value failed its type's invariants.
    InvalidValue,
    /// Value type disagrees with the declaration, or the target is not
    /// writable.
    TypeMismatch,
    /// No fact at the path.
    UnknownPath,
    /// Multiplicity misuse (vector length mismatch, abstract path where a
    /// concrete one is required).
    ShapeMismatch,
    /// Evaluation re-entered itself.
    Cycle,
    /// The dictionary is inconsistent.
    Dictionary,
}

/// Description of one declared fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactInfo {
    /// Stable type tag.
    pub type_tag: ValueKind,
    /// Whether the fact is user-writable.
    pub writable: bool,
    /// Longer description, when declared.
    pub description: Option<String>,
    /// Whether the fact may leave the system through exports.
    pub exported: bool,
}

/// One dependency edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepInfo {
    /// Abstract path of the dependency.
    pub path: String,
    /// Module qualifier, when the reference carried one.
    pub module: Option<String>,
}

/// Per-item outcome of a batch write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    /// The written path.
    pub path: String,
    /// False on error or any error-severity violation.
    pub ok: bool,
    /// Failing limits, when the write itself succeeded.
    pub violations: Vec<LimitViolation>,
    /// The error message, when the write was rejected outright.
    pub error: Option<String>,
}

/// A boundary response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum Response {
    /// Declared abstract paths.
    Paths {
        /// In declaration order.
        paths: Vec<String>,
    },
    /// One fact's description.
    Fact {
        /// The description.
        #[serde(flatten)]
        info: FactInfo,
    },
    /// Dependency edges.
    Deps {
        /// The edges.
        deps: Vec<DepInfo>,
    },
    /// An evaluated fact; `value` is present iff the result carries one.
    Value {
        /// Canonical JSON form, when present.
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Json>,
        /// Whether the result is definitive.
        complete: bool,
    },
    /// Outcome of a validated write.
    Outcome {
        /// False on any error-severity violation.
        ok: bool,
        /// Every failing limit.
        violations: Vec<LimitViolation>,
    },
    /// Per-item outcomes of a batch write.
    Outcomes {
        /// In request order.
        results: Vec<WriteOutcome>,
    },
    /// A derivation trace.
    Explanation {
        /// The rendered trace.
        text: String,
    },
    /// The persisted state blob.
    State {
        /// `{"facts": …, "migrations": n}`.
        state: Json,
    },
    /// Difference between two stores.
    DiffResult {
        /// Paths present live but not in the blob.
        added: Vec<String>,
        /// Paths present in the blob but not live.
        removed: Vec<String>,
        /// Paths present in both with different values.
        changed: Vec<String>,
    },
    /// The operation completed with nothing to report.
    Done,
    /// The operation failed.
    Error {
        /// Taxonomy kind.
        kind: ErrorKind,
        /// Human-readable message.
        message: String,
    },
}

impl Response {
    fn error(err: &GraphError) -> Self {
        Response::Error {
            kind: kind_of(err),
            message: err.to_string(),
        }
    }
}

fn kind_of(err: &GraphError) -> ErrorKind {
    match err {
        GraphError::Path(_) => ErrorKind::Parse,
        GraphError::Value(_) => ErrorKind::InvalidValue,
        GraphError::TypeMismatch { .. } | GraphError::NotWritable { .. } => {
            ErrorKind::TypeMismatch
        }
        GraphError::UnknownPath { .. } => ErrorKind::UnknownPath,
        GraphError::AbstractPath { .. } => ErrorKind::ShapeMismatch,
        GraphError::Eval(eval) => match eval {
            EvalError::Cycle { .. } => ErrorKind::Cycle,
            EvalError::UnknownPath { .. } => ErrorKind::UnknownPath,
            EvalError::Path(_) => ErrorKind::Parse,
            EvalError::InvalidPattern { .. } => ErrorKind::Dictionary,
            EvalError::ShapeMismatch { .. } | EvalError::NotSingular { .. } => {
                ErrorKind::ShapeMismatch
            }
        },
        GraphError::Store(_) => ErrorKind::Parse,
        GraphError::Dictionary(_) => ErrorKind::Dictionary,
    }
}

/// A boundary session: one graph, driven by [`Request`]s.
pub struct Session {
    graph: Graph,
    registry: MigrationRegistry,
}

impl Session {
    /// Wraps a graph. The registry is kept for `Load` and `Diff`, which
    /// accept persisted blobs.
    pub fn new(graph: Graph, registry: MigrationRegistry) -> Self {
        Self { graph, registry }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Executes one request.
    pub fn dispatch(&mut self, request: Request) -> Response {
        let span = tracing::info_span!("boundary", op = op_name(&request));
        let _guard = span.enter();
        let response = self.dispatch_inner(request);
        if let Response::Error { kind, message } = &response {
            tracing::warn!(?kind, %message, "request failed");
        }
        response
    }

    fn dispatch_inner(&mut self, request: Request) -> Response {
        match request {
            Request::ListPaths => Response::Paths {
                paths: self
                    .graph
                    .dictionary()
                    .paths()
                    .map(ToString::to_string)
                    .collect(),
            },
            Request::DescribeFact { path } => self.describe(&path),
            Request::ForwardDeps { path } => self.forward_deps(&path),
            Request::ReverseDeps { path } => self.reverse_deps(&path),
            Request::Get { path } => match self.graph.get(&path) {
                Ok(computed) => Response::Value {
                    complete: computed.is_complete(),
                    value: computed.into_value().map(|v| v.to_json()),
                },
                Err(err) => Response::error(&err),
            },
            Request::Set { path, value } => match self.write(&path, &value) {
                Ok(report) => Response::Outcome {
                    ok: report.ok,
                    violations: report.violations,
                },
                Err(err) => Response::error(&err),
            },
            Request::BatchSet { writes } => {
                let results = writes
                    .into_iter()
                    .map(|write| match self.write(&write.path, &write.value) {
                        Ok(report) => WriteOutcome {
                            path: write.path,
                            ok: report.ok,
                            violations: report.violations,
                            error: None,
                        },
                        Err(err) => WriteOutcome {
                            path: write.path,
                            ok: false,
                            violations: Vec::new(),
                            error: Some(err.to_string()),
                        },
                    })
                    .collect();
                Response::Outcomes { results }
            }
            Request::Explain { path } => match self.graph.explain(&path) {
                Ok(text) => Response::Explanation { text },
                Err(err) => Response::error(&err),
            },
            Request::Snapshot => Response::State {
                state: serde_json::from_str(&self.graph.to_json(false))
                    .unwrap_or_else(|_| json!({})),
            },
            Request::Load { state } => match Graph::load(
                self.graph.dictionary().clone(),
                &state.to_string(),
                &self.registry,
            ) {
                Ok(graph) => {
                    self.graph = graph;
                    Response::Done
                }
                Err(err) => Response::error(&err),
            },
            Request::Diff { state } => {
                let other = Store::from_json(
                    &state.to_string(),
                    &self.registry,
                    self.graph.dictionary(),
                );
                match other {
                    Ok(other) => {
                        let diff = self.graph.diff(&other);
                        Response::DiffResult {
                            added: diff.added,
                            removed: diff.removed,
                            changed: diff.changed,
                        }
                    }
                    Err(err) => Response::error(&GraphError::Store(err)),
                }
            }
            Request::AddMember { path, member } => {
                match self.graph.add_member(&path, &member) {
                    Ok(()) => Response::Done,
                    Err(err) => Response::error(&err),
                }
            }
            Request::RemoveMember { path, member } => {
                match self.graph.remove_member(&path, &member) {
                    Ok(()) => Response::Done,
                    Err(err) => Response::error(&err),
                }
            }
            Request::Reset => {
                self.graph.reset();
                Response::Done
            }
        }
    }

    fn describe(&self, path: &str) -> Response {
        match self.definition(path) {
            Ok(def) => Response::Fact {
                info: FactInfo {
                    type_tag: def.kind,
                    writable: def.is_writable(),
                    description: def.meta.description.clone(),
                    exported: def.meta.exported,
                },
            },
            Err(err) => Response::error(&err),
        }
    }

    fn forward_deps(&self, path: &str) -> Response {
        match self.parse(path) {
            Ok(parsed) => Response::Deps {
                deps: self
                    .graph
                    .dictionary()
                    .forward_deps(&parsed.to_abstract())
                    .into_iter()
                    .map(|dep| DepInfo {
                        path: dep.path.to_string(),
                        module: dep.module,
                    })
                    .collect(),
            },
            Err(err) => Response::error(&err),
        }
    }

    fn reverse_deps(&self, path: &str) -> Response {
        match self.parse(path) {
            Ok(parsed) => Response::Deps {
                deps: self
                    .graph
                    .dictionary()
                    .reverse_deps(&parsed.to_abstract())
                    .iter()
                    .map(|dependent| DepInfo {
                        path: dependent.to_string(),
                        module: None,
                    })
                    .collect(),
            },
            Err(err) => Response::error(&err),
        }
    }

    fn parse(&self, path: &str) -> Result<Path, GraphError> {
        Ok(path.parse::<Path>()?)
    }

    fn definition(
        &self,
        path: &str,
    ) -> Result<Arc<factgraph_core::FactDefinition>, GraphError> {
        let parsed = self.parse(path)?;
        self.graph
            .dictionary()
            .definition(&parsed.to_abstract())
            .cloned()
            .ok_or(GraphError::UnknownPath {
                path: path.to_string(),
            })
    }

    /// Coerces the JSON value through the declared type, then writes.
    fn write(
        &mut self,
        path: &str,
        value: &Json,
    ) -> Result<factgraph_core::LimitReport, GraphError> {
        let def = self.definition(path)?;
        let value = Value::from_json(def.kind, value, def.options.as_ref())?;
        self.graph.set(path, value)
    }
}

fn op_name(request: &Request) -> &'static str {
    match request {
        Request::ListPaths => "list-paths",
        Request::DescribeFact { .. } => "describe-fact",
        Request::ForwardDeps { .. } => "forward-deps",
        Request::ReverseDeps { .. } => "reverse-deps",
        Request::Get { .. } => "get",
        Request::Set { .. } => "set",
        Request::BatchSet { .. } => "batch-set",
        Request::Explain { .. } => "explain",
        Request::Snapshot => "snapshot",
        Request::Load { .. } => "load",
        Request::Diff { .. } => "diff",
        Request::AddMember { .. } => "add-member",
        Request::RemoveMember { .. } => "remove-member",
        Request::Reset => "reset",
    }
}

/// Builds a session directly from a frozen dictionary.
pub fn session(dictionary: Arc<Dictionary>, registry: MigrationRegistry) -> Session {
    let graph = Graph::new(dictionary, &registry);
    Session::new(graph, registry)
}
