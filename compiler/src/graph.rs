// graph.rs — Dataflow graph model
//
// A graph is a list of operator nodes, a binding table from consumer
// (input) identifiers to producers, and the three sink bindings. The
// coordinate/time sources and the color sinks are their own enums rather
// than reserved strings, so a producer reference is either a source or a
// node output, and sink bindings never share the input namespace.
//
// Preconditions: none (construction performs no checks; see `validate`).
// Postconditions: the graph is plain data and never mutated by later phases.
// Failure modes: none.
// Side effects: none.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::diag::GraphError;
use crate::registry::{InputDecl, Op, OpDescriptor};

// ── Implicit identifiers ────────────────────────────────────────────────────

/// Always-available value with no producing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    X,
    Y,
    T,
}

/// Result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sink {
    R,
    G,
    B,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::X, Source::Y, Source::T];

    pub fn name(self) -> &'static str {
        match self {
            Source::X => "x",
            Source::Y => "y",
            Source::T => "t",
        }
    }

    pub fn from_name(name: &str) -> Option<Source> {
        Source::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl Sink {
    pub const ALL: [Sink; 3] = [Sink::R, Sink::G, Sink::B];

    pub fn name(self) -> &'static str {
        match self {
            Sink::R => "r",
            Sink::G => "g",
            Sink::B => "b",
        }
    }

    pub fn from_name(name: &str) -> Option<Sink> {
        Sink::ALL.into_iter().find(|s| s.name() == name)
    }

    fn index(self) -> usize {
        match self {
            Sink::R => 0,
            Sink::G => 1,
            Sink::B => 2,
        }
    }
}

/// The value side of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Producer {
    Source(Source),
    /// A node output identifier.
    Output(String),
}

impl Producer {
    pub fn output(id: impl Into<String>) -> Self {
        Producer::Output(id.into())
    }

    /// The identifier as written in configuration and generated code.
    pub fn name(&self) -> &str {
        match self {
            Producer::Source(s) => s.name(),
            Producer::Output(id) => id,
        }
    }
}

/// Textual form: `x`, `y` and `t` name the sources, anything else an output.
impl From<&str> for Producer {
    fn from(name: &str) -> Self {
        match Source::from_name(name) {
            Some(source) => Producer::Source(source),
            None => Producer::Output(name.to_string()),
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Nodes ───────────────────────────────────────────────────────────────────

/// Index of a node within `Graph::nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An operator instance. `inputs[i]` is the consumer identifier of the
/// descriptor's i-th input port, `outputs[i]` the produced identifier of
/// its i-th output port.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub op: Op,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl Node {
    fn with_ports(op: Op, inputs: &[&str], outputs: &[&str]) -> Self {
        Node {
            op,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn constant(value: f64, out: &str) -> Self {
        Self::with_ports(Op::Const(value), &[], &[out])
    }

    pub fn abs(op: &str, abs: &str) -> Self {
        Self::with_ports(Op::Abs, &[op], &[abs])
    }

    pub fn plus(op1: &str, op2: &str, sum: &str) -> Self {
        Self::with_ports(Op::Plus, &[op1, op2], &[sum])
    }

    pub fn mult(op1: &str, op2: &str, prod: &str) -> Self {
        Self::with_ports(Op::Mult, &[op1, op2], &[prod])
    }

    pub fn rect_to_polar(x: &str, y: &str, r: &str, theta: &str) -> Self {
        Self::with_ports(Op::RectToPolar, &[x, y], &[r, theta])
    }

    pub fn cos(theta: &str, out: &str) -> Self {
        Self::with_ports(Op::Cos, &[theta], &[out])
    }

    pub fn descriptor(&self) -> &'static OpDescriptor {
        self.op.descriptor()
    }

    /// Port lists must match the descriptor's arity. Nodes assembled
    /// through the public fields rather than the builders may not.
    pub fn check_arity(&self, id: NodeId) -> Result<(), GraphError> {
        let d = self.descriptor();
        let sides = [
            ("input", d.inputs.len(), self.inputs.len()),
            ("output", d.outputs.len(), self.outputs.len()),
        ];
        for (side, expected, found) in sides {
            if expected != found {
                return Err(GraphError::PortCountMismatch {
                    node: id.to_string(),
                    side,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Input declarations paired with this node's consumer identifiers.
    pub fn input_ports(&self) -> impl Iterator<Item = (&'static InputDecl, &str)> {
        self.descriptor()
            .inputs
            .iter()
            .zip(self.inputs.iter().map(String::as_str))
    }

    /// Output port names paired with this node's produced identifiers.
    pub fn output_ports(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.descriptor()
            .outputs
            .iter()
            .copied()
            .zip(self.outputs.iter().map(String::as_str))
    }
}

// ── Graph ───────────────────────────────────────────────────────────────────

/// Producer bound to each sink; `None` means the channel is literal zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkBindings([Option<Producer>; 3]);

impl SinkBindings {
    pub fn get(&self, sink: Sink) -> Option<&Producer> {
        self.0[sink.index()].as_ref()
    }

    pub fn set(&mut self, sink: Sink, producer: Option<Producer>) {
        self.0[sink.index()] = producer;
    }

    /// Bound sinks in r, g, b order.
    pub fn bound(&self) -> impl Iterator<Item = (Sink, &Producer)> {
        Sink::ALL
            .into_iter()
            .filter_map(move |s| self.get(s).map(|p| (s, p)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<Node>,
    /// Consumer (input) identifier → producer. One entry per input at most.
    pub edges: BTreeMap<String, Producer>,
    pub sinks: SinkBindings,
}

impl Graph {
    pub fn new(nodes: Vec<Node>) -> Self {
        Graph {
            nodes,
            edges: BTreeMap::new(),
            sinks: SinkBindings::default(),
        }
    }

    /// Bind an input identifier to a producer, replacing any earlier binding.
    pub fn bind(&mut self, consumer: impl Into<String>, producer: impl Into<Producer>) {
        self.edges.insert(consumer.into(), producer.into());
    }

    pub fn bind_sink(&mut self, sink: Sink, producer: impl Into<Producer>) {
        self.sinks.set(sink, Some(producer.into()));
    }

    pub fn with_edge(mut self, consumer: &str, producer: &str) -> Self {
        self.bind(consumer, producer);
        self
    }

    pub fn with_sink(mut self, sink: Sink, producer: &str) -> Self {
        self.bind_sink(sink, producer);
        self
    }

    /// Panics if `id` is not from this graph. Ids taken from a schedule go
    /// through `checked_node`.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node `id`, provided it exists and its ports match its operator.
    pub fn checked_node(&self, id: NodeId) -> Result<&Node, GraphError> {
        let node = self
            .get_node(id)
            .ok_or_else(|| GraphError::UndefinedReference(id.to_string()))?;
        node.check_arity(id)?;
        Ok(node)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Producer bound to an input identifier, if any.
    pub fn producer_of(&self, consumer: &str) -> Option<&Producer> {
        self.edges.get(consumer)
    }

    /// Map from output identifier to the node producing it. On duplicate
    /// identifiers (only possible before validation) the first node wins.
    pub fn producer_index(&self) -> HashMap<&str, NodeId> {
        let mut index = HashMap::new();
        for id in self.node_ids() {
            for output in &self.node(id).outputs {
                index.entry(output.as_str()).or_insert(id);
            }
        }
        index
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph ({} nodes, {} edges)", self.nodes.len(), self.edges.len())?;
        for id in self.node_ids() {
            write_node(f, id, self.node(id))?;
        }
        for (consumer, producer) in &self.edges {
            writeln!(f, "  {} <- {}", consumer, producer)?;
        }
        for sink in Sink::ALL {
            match self.sinks.get(sink) {
                Some(p) => writeln!(f, "  sink {} <- {}", sink.name(), p)?,
                None => writeln!(f, "  sink {} <- 0", sink.name())?,
            }
        }
        Ok(())
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, id: NodeId, node: &Node) -> fmt::Result {
    write!(f, "  {}: {}", id, node.op.kind())?;
    if let Op::Const(value) = node.op {
        write!(f, " {:?}", value)?;
    }
    let inputs: Vec<String> = node
        .input_ports()
        .map(|(decl, id)| format!("{}={}", decl.name, id))
        .collect();
    let outputs: Vec<String> = node
        .output_ports()
        .map(|(name, id)| format!("{}={}", name, id))
        .collect();
    writeln!(f, " ({}) -> ({})", inputs.join(", "), outputs.join(", "))
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_from_text_separates_sources() {
        assert_eq!(Producer::from("x"), Producer::Source(Source::X));
        assert_eq!(Producer::from("t"), Producer::Source(Source::T));
        assert_eq!(Producer::from("xx"), Producer::output("xx"));
        // sink names are not sources
        assert_eq!(Producer::from("r"), Producer::output("r"));
    }

    #[test]
    fn node_ports_follow_descriptor_order() {
        let node = Node::rect_to_polar("px", "py", "pr", "pt");
        let inputs: Vec<_> = node.input_ports().map(|(d, id)| (d.name, id)).collect();
        assert_eq!(inputs, vec![("x", "px"), ("y", "py")]);
        let outputs: Vec<_> = node.output_ports().collect();
        assert_eq!(outputs, vec![("r", "pr"), ("theta", "pt")]);
    }

    #[test]
    fn arity_checked_against_descriptor() {
        assert_eq!(Node::rect_to_polar("a", "b", "c", "d").check_arity(NodeId(0)), Ok(()));
        let short = Node {
            op: Op::Plus,
            inputs: vec!["a".into()],
            outputs: vec!["s".into()],
        };
        assert_eq!(
            short.check_arity(NodeId(3)),
            Err(GraphError::PortCountMismatch {
                node: "n3".into(),
                side: "input",
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn checked_node_rejects_foreign_ids() {
        let g = Graph::new(vec![Node::constant(1.0, "c")]);
        assert_eq!(g.get_node(NodeId(1)), None);
        assert_eq!(
            g.checked_node(NodeId(7)),
            Err(GraphError::UndefinedReference("n7".into()))
        );
        assert_eq!(g.checked_node(NodeId(0)), Ok(&g.nodes[0]));
    }

    #[test]
    fn sink_bindings_iterate_in_channel_order() {
        let g = Graph::new(vec![])
            .with_sink(Sink::B, "t")
            .with_sink(Sink::R, "x");
        let bound: Vec<_> = g.sinks.bound().map(|(s, p)| (s, p.name())).collect();
        assert_eq!(bound, vec![(Sink::R, "x"), (Sink::B, "t")]);
        assert!(g.sinks.get(Sink::G).is_none());
    }

    #[test]
    fn bind_replaces_previous_edge() {
        let g = Graph::new(vec![Node::abs("a_in", "a_out")])
            .with_edge("a_in", "x")
            .with_edge("a_in", "y");
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.producer_of("a_in"), Some(&Producer::Source(Source::Y)));
    }

    #[test]
    fn producer_index_first_wins() {
        let g = Graph::new(vec![Node::constant(1.0, "c"), Node::constant(2.0, "c")]);
        assert_eq!(g.producer_index().get("c"), Some(&NodeId(0)));
    }

    #[test]
    fn display_lists_nodes_edges_and_sinks() {
        let g = Graph::new(vec![Node::constant(0.5, "half"), Node::cos("c_in", "c_out")])
            .with_edge("c_in", "half")
            .with_sink(Sink::G, "c_out");
        let text = format!("{g}");
        assert!(text.starts_with("Graph (2 nodes, 1 edges)\n"));
        assert!(text.contains("  n0: Const 0.5 () -> (out=half)\n"));
        assert!(text.contains("  n1: Cos (theta=c_in) -> (out=c_out)\n"));
        assert!(text.contains("  c_in <- half\n"));
        assert!(text.contains("  sink r <- 0\n"));
        assert!(text.contains("  sink g <- c_out\n"));
    }
}
