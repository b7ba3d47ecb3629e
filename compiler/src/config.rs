// config.rs — JSON graph configuration
//
// Graphs are supplied as data. A document lists the nodes (operator plus
// the identifier attached to each port) and an `edges` table mapping
// consumer → producer. In the textual form the keys `r`, `g`, `b` bind
// sinks and the values `x`, `y`, `t` name sources; everything else is an
// ordinary input or output identifier.
//
//   { "nodes": [ { "type": "const", "value": 6.28, "out": "two_pi" },
//                { "type": "cos", "theta": "c_in", "out": "wave" } ],
//     "edges": { "c_in": "two_pi", "r": "wave" } }
//
// Preconditions: none.
// Postconditions: `into_graph` ∘ `to_config` is the identity on graphs whose
//                 nodes pass `Node::check_arity`.
// Failure modes: unreadable file, malformed JSON → `ConfigError`.
// Side effects: `load_graph` reads one file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{Graph, Node, Sink};
use crate::registry::Op;

// ── Document types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    pub nodes: Vec<NodeConfig>,
    /// Consumer identifier → producer identifier.
    #[serde(default)]
    pub edges: BTreeMap<String, String>,
}

/// One node; field names are the operator's port names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Const {
        value: f64,
        out: String,
    },
    Abs {
        op: String,
        abs: String,
    },
    Plus {
        op1: String,
        op2: String,
        sum: String,
    },
    Mult {
        op1: String,
        op2: String,
        prod: String,
    },
    RectToPolar {
        x: String,
        y: String,
        r: String,
        theta: String,
    },
    Cos {
        theta: String,
        out: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: invalid graph document: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ── Conversion ──────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn to_node(&self) -> Node {
        match self {
            NodeConfig::Const { value, out } => Node::constant(*value, out),
            NodeConfig::Abs { op, abs } => Node::abs(op, abs),
            NodeConfig::Plus { op1, op2, sum } => Node::plus(op1, op2, sum),
            NodeConfig::Mult { op1, op2, prod } => Node::mult(op1, op2, prod),
            NodeConfig::RectToPolar { x, y, r, theta } => Node::rect_to_polar(x, y, r, theta),
            NodeConfig::Cos { theta, out } => Node::cos(theta, out),
        }
    }

    /// Ports a malformed node lacks (see `Node::check_arity`) are written as
    /// empty identifiers.
    pub fn from_node(node: &Node) -> NodeConfig {
        let input = |i: usize| node.inputs.get(i).cloned().unwrap_or_default();
        let output = |i: usize| node.outputs.get(i).cloned().unwrap_or_default();
        match node.op {
            Op::Const(value) => NodeConfig::Const {
                value,
                out: output(0),
            },
            Op::Abs => NodeConfig::Abs {
                op: input(0),
                abs: output(0),
            },
            Op::Plus => NodeConfig::Plus {
                op1: input(0),
                op2: input(1),
                sum: output(0),
            },
            Op::Mult => NodeConfig::Mult {
                op1: input(0),
                op2: input(1),
                prod: output(0),
            },
            Op::RectToPolar => NodeConfig::RectToPolar {
                x: input(0),
                y: input(1),
                r: output(0),
                theta: output(1),
            },
            Op::Cos => NodeConfig::Cos {
                theta: input(0),
                out: output(0),
            },
        }
    }
}

impl GraphConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Compact JSON with sorted edge keys; stable for hashing.
    pub fn canonical_json(&self) -> String {
        // string-keyed maps and plain structs never fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn into_graph(self) -> Graph {
        let mut graph = Graph::new(self.nodes.iter().map(NodeConfig::to_node).collect());
        for (consumer, producer) in self.edges {
            match Sink::from_name(&consumer) {
                Some(sink) => graph.bind_sink(sink, producer.as_str()),
                None => graph.bind(consumer, producer.as_str()),
            }
        }
        graph
    }
}

impl Graph {
    pub fn to_config(&self) -> GraphConfig {
        let mut edges: BTreeMap<String, String> = self
            .edges
            .iter()
            .map(|(consumer, producer)| (consumer.clone(), producer.name().to_string()))
            .collect();
        for (sink, producer) in self.sinks.bound() {
            edges.insert(sink.name().to_string(), producer.name().to_string());
        }
        GraphConfig {
            nodes: self.nodes.iter().map(NodeConfig::from_node).collect(),
            edges,
        }
    }
}

/// Read and parse a graph document.
pub fn load_graph(path: &Path) -> Result<Graph, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = GraphConfig::from_json(&text).map_err(|e| ConfigError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(config.into_graph())
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Producer, Source};

    const DOC: &str = r#"{
        "nodes": [
            { "type": "const", "value": 10, "out": "ten" },
            { "type": "rect_to_polar", "x": "px", "y": "py", "r": "rad2", "theta": "ang" },
            { "type": "mult", "op1": "m1", "op2": "m2", "prod": "scaled" }
        ],
        "edges": {
            "px": "x",
            "py": "t",
            "m1": "ten",
            "m2": "rad2",
            "r": "scaled",
            "b": "y"
        }
    }"#;

    #[test]
    fn parses_nodes_and_edges() {
        let graph = GraphConfig::from_json(DOC).unwrap().into_graph();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.nodes[0], Node::constant(10.0, "ten"));
        assert_eq!(graph.nodes[1], Node::rect_to_polar("px", "py", "rad2", "ang"));
        assert_eq!(graph.edges.len(), 4);
        assert_eq!(graph.producer_of("px"), Some(&Producer::Source(Source::X)));
        assert_eq!(graph.producer_of("m2"), Some(&Producer::output("rad2")));
        assert_eq!(graph.sinks.get(Sink::R), Some(&Producer::output("scaled")));
        assert_eq!(graph.sinks.get(Sink::G), None);
        assert_eq!(graph.sinks.get(Sink::B), Some(&Producer::Source(Source::Y)));
    }

    #[test]
    fn edges_default_to_empty() {
        let config = GraphConfig::from_json(r#"{ "nodes": [] }"#).unwrap();
        assert!(config.edges.is_empty());
    }

    #[test]
    fn unknown_operator_rejected() {
        let err = GraphConfig::from_json(r#"{ "nodes": [ { "type": "sin", "theta": "a", "out": "b" } ] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn missing_port_rejected() {
        let err = GraphConfig::from_json(r#"{ "nodes": [ { "type": "plus", "op1": "a", "sum": "s" } ] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_top_level_field_rejected() {
        assert!(GraphConfig::from_json(r#"{ "nodes": [], "edgez": {} }"#).is_err());
    }

    #[test]
    fn graph_config_roundtrip() {
        let graph = GraphConfig::from_json(DOC).unwrap().into_graph();
        let again = graph.to_config().into_graph();
        assert_eq!(graph, again);
    }

    #[test]
    fn canonical_json_is_stable_and_sorted() {
        let config = GraphConfig::from_json(DOC).unwrap();
        let a = config.canonical_json();
        let b = GraphConfig::from_json(&a).unwrap().canonical_json();
        assert_eq!(a, b);
        assert!(a.contains(r#""edges":{"b":"y","m1":"ten","m2":"rad2","px":"x","py":"t","r":"scaled"}"#));
        assert!(a.contains(r#"{"type":"const","value":10.0,"out":"ten"}"#));
    }

    #[test]
    fn load_graph_reports_missing_file() {
        let err = load_graph(Path::new("/nonexistent/graph.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("/nonexistent/graph.json: "));
    }

    #[test]
    fn node_missing_ports_converts_without_panicking() {
        let short = Node {
            op: Op::Plus,
            inputs: vec!["a".into()],
            outputs: vec![],
        };
        assert_eq!(
            NodeConfig::from_node(&short),
            NodeConfig::Plus {
                op1: "a".into(),
                op2: String::new(),
                sum: String::new(),
            }
        );
    }
}
