// dot.rs — Graphviz DOT output for shader graphs
//
// Renders nodes, sources, sinks and every data edge in DOT format for `dot`
// or other Graphviz layout engines. When a schedule is supplied, node labels
// carry their position in it and nodes outside the schedule are drawn grey.
//
// Preconditions: none; dangling edges are drawn to a dashed placeholder.
// Postconditions: returns a complete `digraph` string; output is
//                 deterministic for a given graph.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::graph::{Graph, NodeId, Producer, Sink, Source};
use crate::schedule::Schedule;

/// Emit the graph as a Graphviz DOT string.
pub fn emit_dot(graph: &Graph, schedule: Option<&Schedule>) -> String {
    let mut buf = String::new();
    let _ = writeln!(buf, "digraph sgc {{");
    let _ = writeln!(buf, "    rankdir=LR;");
    let _ = writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];");
    let _ = writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];");

    let position: HashMap<NodeId, usize> = schedule
        .map(|s| s.order.iter().enumerate().map(|(i, id)| (*id, i)).collect())
        .unwrap_or_default();

    let _ = writeln!(buf);
    for source in Source::ALL {
        let _ = writeln!(
            buf,
            "    src_{0} [shape=circle, style=filled, fillcolor=lightgreen, label=\"{0}\"];",
            source.name()
        );
    }
    for sink in Sink::ALL {
        let _ = writeln!(
            buf,
            "    sink_{0} [shape=doublecircle, style=filled, fillcolor={1}, label=\"{0}\"];",
            sink.name(),
            sink_color(sink)
        );
    }

    let _ = writeln!(buf);
    for id in graph.node_ids() {
        let node = graph.node(id);
        let label = match (schedule, position.get(&id)) {
            (_, Some(step)) => format!("#{} {}", step, node.op.kind()),
            (Some(_), None) => format!("{} (unused)", node.op.kind()),
            (None, None) => node.op.kind().to_string(),
        };
        let fill = if schedule.is_some() && !position.contains_key(&id) {
            "gray85"
        } else {
            "lightblue"
        };
        let _ = writeln!(
            buf,
            "    {} [shape=box, style=filled, fillcolor={}, label=\"{}\"];",
            id,
            fill,
            escape(&label)
        );
    }

    // Producers that no node declares get a dashed placeholder.
    let producers = graph.producer_index();
    let mut dangling: BTreeSet<String> = BTreeSet::new();
    let mut endpoint = |producer: &Producer| -> String {
        match producer {
            Producer::Source(s) => format!("src_{}", s.name()),
            Producer::Output(name) => match producers.get(name.as_str()) {
                Some(id) => id.to_string(),
                None => {
                    dangling.insert(name.clone());
                    format!("missing_{}", sanitize(name))
                }
            },
        }
    };

    let mut edges: Vec<String> = Vec::new();
    for id in graph.node_ids() {
        let node = graph.node(id);
        for (decl, input) in node.input_ports() {
            if let Some(producer) = graph.producer_of(input) {
                let from = endpoint(producer);
                edges.push(format!(
                    "    {} -> {} [label=\"{} → {}\"];",
                    from,
                    id,
                    escape(producer.name()),
                    escape(decl.name)
                ));
            }
        }
    }
    for (sink, producer) in graph.sinks.bound() {
        let from = endpoint(producer);
        edges.push(format!(
            "    {} -> sink_{} [label=\"{}\"];",
            from,
            sink.name(),
            escape(producer.name())
        ));
    }

    if !dangling.is_empty() {
        let _ = writeln!(buf);
        for name in &dangling {
            let _ = writeln!(
                buf,
                "    missing_{} [shape=box, style=dashed, color=red, label=\"{}?\"];",
                sanitize(name),
                escape(name)
            );
        }
    }

    let _ = writeln!(buf);
    for edge in &edges {
        let _ = writeln!(buf, "{}", edge);
    }

    let _ = writeln!(buf, "}}");
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn sink_color(sink: Sink) -> &'static str {
    match sink {
        Sink::R => "lightpink",
        Sink::G => "palegreen",
        Sink::B => "lightskyblue",
    }
}

/// Sanitize a name to valid DOT identifier characters.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

// ── Tests ───────────────────────────────────────────────────────────────────
