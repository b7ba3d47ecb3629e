// validate.rs — Structural graph validation
//
// Checks the local well-formedness properties of a graph before any
// scheduling happens. Checks run in a fixed order and stop at the first
// violation so the reported error is deterministic:
//   (0) every node names exactly as many ports as its operator declares;
//   (a) input identifiers unique, including the sink names r, g, b;
//   (b) output identifiers unique, including the source names x, y, t, and
//       (GLSL target only) valid GLSL variable names;
//   (c) every binding resolves: consumers to declared inputs, producers to
//       declared outputs or sources.
// Acyclicity is not checked here; the scheduler discovers cycles.
//
// Preconditions: none.
// Postconditions: `Ok(())` means checks (0)-(c) hold for `target`.
// Failure modes: first violated check → `GraphError`.
// Side effects: none.

use std::collections::HashSet;

use crate::codegen::is_glsl_identifier;
use crate::diag::GraphError;
use crate::graph::{Graph, Producer, Sink, Source};

/// Backend the graph is validated for. Identifier syntax only matters when
/// output identifiers become variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Eval,
    Glsl,
}

pub fn validate(graph: &Graph, target: Target) -> Result<(), GraphError> {
    check_arity(graph)?;
    let inputs = check_inputs(graph)?;
    let outputs = check_outputs(graph, target)?;
    check_edges(graph, &inputs, &outputs)
}

/// (0)
fn check_arity(graph: &Graph) -> Result<(), GraphError> {
    graph
        .node_ids()
        .try_for_each(|id| graph.node(id).check_arity(id))
}

/// Identifier syntax of every output, as (b) applies it for `Target::Glsl`.
/// Lets a graph validated for `Target::Eval` be checked before emission.
pub fn check_glsl_identifiers(graph: &Graph) -> Result<(), GraphError> {
    match graph
        .nodes
        .iter()
        .flat_map(|node| &node.outputs)
        .find(|id| !is_glsl_identifier(id))
    {
        Some(id) => Err(GraphError::InvalidIdentifier(id.clone())),
        None => Ok(()),
    }
}

/// (a) Returns the declared input identifiers.
fn check_inputs(graph: &Graph) -> Result<HashSet<&str>, GraphError> {
    let mut seen: HashSet<&str> = Sink::ALL.iter().map(|s| s.name()).collect();
    for node in &graph.nodes {
        for id in &node.inputs {
            if !seen.insert(id.as_str()) {
                return Err(GraphError::DuplicateInputIdentifier(id.clone()));
            }
        }
    }
    for sink in Sink::ALL {
        seen.remove(sink.name());
    }
    Ok(seen)
}

/// (b) Returns the declared output identifiers.
fn check_outputs(graph: &Graph, target: Target) -> Result<HashSet<&str>, GraphError> {
    let mut seen: HashSet<&str> = Source::ALL.iter().map(|s| s.name()).collect();
    for node in &graph.nodes {
        for id in &node.outputs {
            if target == Target::Glsl && !is_glsl_identifier(id) {
                return Err(GraphError::InvalidIdentifier(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(GraphError::DuplicateOutputIdentifier(id.clone()));
            }
        }
    }
    for source in Source::ALL {
        seen.remove(source.name());
    }
    Ok(seen)
}

/// (c) Edges in consumer order, then sink bindings in r, g, b order.
fn check_edges(
    graph: &Graph,
    inputs: &HashSet<&str>,
    outputs: &HashSet<&str>,
) -> Result<(), GraphError> {
    let declared = |p: &Producer| match p {
        Producer::Source(_) => true,
        Producer::Output(id) => outputs.contains(id.as_str()),
    };
    let dangling = |consumer: &str, producer: &Producer| GraphError::DanglingEdge {
        consumer: consumer.to_string(),
        producer: producer.name().to_string(),
    };

    for (consumer, producer) in &graph.edges {
        if !inputs.contains(consumer.as_str()) || !declared(producer) {
            return Err(dangling(consumer, producer));
        }
    }
    for (sink, producer) in graph.sinks.bound() {
        if !declared(producer) {
            return Err(dangling(sink.name(), producer));
        }
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────
