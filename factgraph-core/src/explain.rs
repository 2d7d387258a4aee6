//! Human-readable derivation traces.

use crate::dictionary::FactSource;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::result::Computed;
use crate::value::Value;
use factgraph_path::Path;
use std::collections::HashSet;
use std::fmt::Write;

/// Renders the derivation tree rooted at `path`: each line shows a
/// concrete path, its evaluated result and its source, with dependencies
/// indented beneath it. Repeated facts and cycles render once and are
/// referenced thereafter.
pub(crate) fn explain(graph: &Graph, path: &str) -> Result<String, GraphError> {
    let path: Path = path.parse()?;
    let mut out = String::new();
    let mut seen = HashSet::new();
    if path.is_abstract() {
        for concrete in graph.expand_paths(&path)? {
            render(graph, &concrete, 0, &mut out, &mut seen)?;
        }
    } else {
        render(graph, &path, 0, &mut out, &mut seen)?;
    }
    Ok(out)
}

fn render(
    graph: &Graph,
    path: &Path,
    depth: usize,
    out: &mut String,
    seen: &mut HashSet<String>,
) -> Result<(), GraphError> {
    let key = path.to_string();
    let indent = "  ".repeat(depth);
    let fact = graph.fact_at(path).map_err(GraphError::Eval)?;
    let computed = graph.force_concrete(path).map_err(GraphError::Eval)?;
    let source = if fact.definition().is_writable() {
        "writable"
    } else {
        "derived"
    };
    if !seen.insert(key.clone()) {
        let _ = writeln!(out, "{indent}{key} = {} [{source}] (shown above)", fmt(&computed));
        return Ok(());
    }
    let _ = writeln!(out, "{indent}{key} = {} [{source}]", fmt(&computed));
    match &fact.definition().source {
        FactSource::Derived { expr } => {
            let _ = writeln!(out, "{indent}  \u{2190} {}", expr.describe());
            for dep in expr.deps_at(path).map_err(GraphError::Path)? {
                render_dep(graph, &dep.path, depth + 1, out, seen)?;
            }
        }
        FactSource::Writable {
            placeholder,
            overrides,
            ..
        } => {
            if graph.store().get(path).is_none() {
                if let Some(placeholder) = placeholder {
                    let _ = writeln!(
                        out,
                        "{indent}  \u{2190} placeholder: {}",
                        placeholder.describe()
                    );
                    for dep in placeholder.deps_at(path).map_err(GraphError::Path)? {
                        render_dep(graph, &dep.path, depth + 1, out, seen)?;
                    }
                }
            }
            for over in overrides {
                let _ = writeln!(
                    out,
                    "{indent}  \u{2190} override when {}: {}",
                    over.condition.describe(),
                    over.replacement.describe()
                );
            }
        }
    }
    Ok(())
}

fn render_dep(
    graph: &Graph,
    path: &Path,
    depth: usize,
    out: &mut String,
    seen: &mut HashSet<String>,
) -> Result<(), GraphError> {
    if path.is_abstract() {
        for concrete in graph.expand_paths(path)? {
            render(graph, &concrete, depth, out, seen)?;
        }
        Ok(())
    } else {
        render(graph, path, depth, out, seen)
    }
}

fn fmt(computed: &Computed<Value>) -> String {
    match computed {
        Computed::Complete(v) => format!("Complete({v})"),
        Computed::Placeholder(v) => format!("Placeholder({v})"),
        Computed::Incomplete => "Incomplete".to_string(),
    }
}
