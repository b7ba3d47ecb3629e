// schedule.rs — Demand-driven evaluation order
//
// Walks backwards from the bound sinks with an explicit work stack and
// emits nodes in dependency order. Only nodes reachable from a sink are
// visited, so unreferenced nodes never appear in the order. A node that
// is revisited while still blocked on its own dependencies closes a cycle.
//
// Preconditions: none (an unvalidated graph fails with `UndefinedReference`
//                where the validator would report a dangling edge).
// Postconditions: `Schedule::order` is a topological order of the
//                 sink-reachable subgraph; `verify_schedule` checks it.
// Failure modes: `UndefinedReference`, `CycleDetected`.
// Side effects: none. All working sets are local to one call.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write as _};

use log::trace;

use crate::diag::GraphError;
use crate::graph::{Graph, NodeId, Producer};

// ── Public types ────────────────────────────────────────────────────────────

/// Evaluation order for the sink-reachable nodes of one graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    pub order: Vec<NodeId>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.order.contains(&id)
    }

    /// Nodes of `graph` that were elided as unreachable, in node order.
    pub fn unscheduled(&self, graph: &Graph) -> Vec<NodeId> {
        let scheduled: HashSet<NodeId> = self.order.iter().copied().collect();
        graph
            .node_ids()
            .filter(|id| !scheduled.contains(id))
            .collect()
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Compute the evaluation order for `graph`.
pub fn schedule(graph: &Graph) -> Result<Schedule, GraphError> {
    let producers = graph.producer_index();

    // Sources are always known; only node outputs are tracked.
    let mut known: HashSet<&str> = HashSet::new();
    let mut awaiting: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<&Producer> = graph.sinks.bound().map(|(_, p)| p).collect();
    let mut order = Vec::new();

    let is_known = |known: &HashSet<&str>, p: &Producer| match p {
        Producer::Source(_) => true,
        Producer::Output(id) => known.contains(id.as_str()),
    };

    while let Some(&top) = stack.last() {
        if is_known(&known, top) {
            stack.pop();
            continue;
        }
        let top_id = top.name();
        let node_id = *producers
            .get(top_id)
            .ok_or_else(|| GraphError::UndefinedReference(top_id.to_string()))?;
        let node = graph.node(node_id);

        let unresolved: Vec<&Producer> = node
            .inputs
            .iter()
            .filter_map(|input| graph.producer_of(input))
            .filter(|p| !is_known(&known, p))
            .collect();

        if unresolved.is_empty() {
            trace!("schedule: {} ready ({})", node_id, top_id);
            order.push(node_id);
            known.extend(node.outputs.iter().map(String::as_str));
            awaiting.remove(&node_id);
            stack.pop();
        } else if awaiting.insert(node_id) {
            trace!(
                "schedule: {} waits on {} identifier(s) for {}",
                node_id,
                unresolved.len(),
                top_id
            );
            stack.extend(unresolved);
        } else {
            return Err(GraphError::CycleDetected(top_id.to_string()));
        }
    }

    Ok(Schedule { order })
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Machine-checkable evidence for schedule postconditions (S1-S3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCert {
    /// S1: No node appears more than once.
    pub s1_unique: bool,
    /// S2: Every node appears after the producers of all its bound inputs.
    pub s2_dependencies_first: bool,
    /// S3: The scheduled set equals the set of sink-reachable nodes.
    pub s3_exactly_reachable: bool,
}

impl ScheduleCert {
    pub fn all_pass(&self) -> bool {
        self.s1_unique && self.s2_dependencies_first && self.s3_exactly_reachable
    }

    pub fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("S1_unique", self.s1_unique),
            ("S2_dependencies_first", self.s2_dependencies_first),
            ("S3_exactly_reachable", self.s3_exactly_reachable),
        ]
    }
}

/// Verify schedule postconditions against the graph it was computed from.
pub fn verify_schedule(graph: &Graph, schedule: &Schedule) -> ScheduleCert {
    let producers = graph.producer_index();
    ScheduleCert {
        s1_unique: verify_s1_unique(schedule),
        s2_dependencies_first: verify_s2_dependencies_first(graph, schedule, &producers),
        s3_exactly_reachable: verify_s3_exactly_reachable(graph, schedule, &producers),
    }
}

fn verify_s1_unique(schedule: &Schedule) -> bool {
    let mut seen = HashSet::with_capacity(schedule.len());
    schedule.order.iter().all(|id| seen.insert(*id))
}

fn verify_s2_dependencies_first(
    graph: &Graph,
    schedule: &Schedule,
    producers: &HashMap<&str, NodeId>,
) -> bool {
    let position: HashMap<NodeId, usize> = schedule
        .order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    schedule.order.iter().enumerate().all(|(i, id)| {
        // an id outside the graph fails the obligation
        graph.get_node(*id).is_some_and(|node| {
            node.inputs.iter().all(|input| match graph.producer_of(input) {
                None | Some(Producer::Source(_)) => true,
                Some(Producer::Output(out)) => producers
                    .get(out.as_str())
                    .and_then(|p| position.get(p))
                    .is_some_and(|&pos| pos < i),
            })
        })
    })
}

fn verify_s3_exactly_reachable(
    graph: &Graph,
    schedule: &Schedule,
    producers: &HashMap<&str, NodeId>,
) -> bool {
    let reachable = reachable_nodes(graph, producers);
    let scheduled: HashSet<NodeId> = schedule.order.iter().copied().collect();
    reachable == scheduled
}

/// Nodes transitively feeding any bound sink.
fn reachable_nodes(graph: &Graph, producers: &HashMap<&str, NodeId>) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut worklist: Vec<&Producer> = graph.sinks.bound().map(|(_, p)| p).collect();
    while let Some(p) = worklist.pop() {
        let Producer::Output(id) = p else { continue };
        let Some(&node_id) = producers.get(id.as_str()) else {
            continue;
        };
        if visited.insert(node_id) {
            worklist.extend(
                graph
                    .node(node_id)
                    .inputs
                    .iter()
                    .filter_map(|input| graph.producer_of(input)),
            );
        }
    }
    visited
}

// ── Display ─────────────────────────────────────────────────────────────────

/// One line per scheduled node: position, node, kind, produced identifiers.
pub fn format_order(graph: &Graph, schedule: &Schedule) -> String {
    let mut buf = String::new();
    for (i, id) in schedule.order.iter().enumerate() {
        let Some(node) = graph.get_node(*id) else {
            let _ = writeln!(buf, "{:>3}  {:<4} (not in graph)", i, id.to_string());
            continue;
        };
        let _ = writeln!(
            buf,
            "{:>3}  {:<4} {:<12} -> {}",
            i,
            id.to_string(),
            node.op.kind().name(),
            node.outputs.join(", ")
        );
    }
    buf
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.order.iter().map(|id| id.to_string()).collect();
        write!(f, "[{}]", ids.join(", "))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Sink};

    fn kinds(graph: &Graph, schedule: &Schedule) -> Vec<&'static str> {
        schedule
            .order
            .iter()
            .map(|id| graph.node(*id).op.kind().name())
            .collect()
    }

    fn scenario_d() -> Graph {
        Graph::new(vec![
            Node::cos("c_in", "outv"),
            Node::mult("radius", "m_in2", "scaledR"),
            Node::constant(6.28, "twoPi"),
        ])
        .with_edge("m_in2", "twoPi")
        .with_edge("c_in", "scaledR")
        .with_sink(Sink::R, "outv")
        .with_sink(Sink::G, "outv")
        .with_sink(Sink::B, "outv")
    }

    #[test]
    fn chain_is_ordered_producers_first() {
        let g = scenario_d();
        let s = schedule(&g).unwrap();
        assert_eq!(kinds(&g, &s), vec!["Const", "Mult", "Cos"]);
        assert_eq!(s.order, vec![NodeId(2), NodeId(1), NodeId(0)]);
        assert!(verify_schedule(&g, &s).all_pass());
    }

    #[test]
    fn unbound_sinks_schedule_nothing() {
        let g = Graph::new(vec![Node::constant(1.0, "c")]);
        let s = schedule(&g).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.unscheduled(&g), vec![NodeId(0)]);
    }

    #[test]
    fn sinks_bound_to_sources_schedule_nothing() {
        let g = Graph::new(vec![])
            .with_sink(Sink::R, "x")
            .with_sink(Sink::G, "y")
            .with_sink(Sink::B, "t");
        assert!(schedule(&g).unwrap().is_empty());
    }

    #[test]
    fn unreachable_nodes_are_elided() {
        let g = Graph::new(vec![
            Node::constant(1.0, "used"),
            Node::constant(2.0, "dead"),
            Node::abs("dead_in", "dead_abs"),
        ])
        .with_edge("dead_in", "dead")
        .with_sink(Sink::R, "used");
        let s = schedule(&g).unwrap();
        assert_eq!(s.order, vec![NodeId(0)]);
        assert_eq!(s.unscheduled(&g), vec![NodeId(1), NodeId(2)]);
        assert!(verify_schedule(&g, &s).all_pass());
    }

    #[test]
    fn shared_dependency_scheduled_once() {
        // diamond: c feeds both a1 and a2, which feed s
        let g = Graph::new(vec![
            Node::plus("s_in1", "s_in2", "s"),
            Node::abs("a1_in", "a1"),
            Node::cos("a2_in", "a2"),
            Node::constant(-3.0, "c"),
        ])
        .with_edge("s_in1", "a1")
        .with_edge("s_in2", "a2")
        .with_edge("a1_in", "c")
        .with_edge("a2_in", "c")
        .with_sink(Sink::R, "s")
        .with_sink(Sink::G, "a1")
        .with_sink(Sink::B, "c");
        let s = schedule(&g).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.order[0], NodeId(3));
        assert_eq!(s.order[3], NodeId(0));
        assert!(verify_schedule(&g, &s).all_pass());
    }

    #[test]
    fn multi_output_node_resolves_both_identifiers() {
        let g = Graph::new(vec![
            Node::rect_to_polar("px", "py", "rad2", "theta"),
            Node::plus("s_in1", "s_in2", "s"),
        ])
        .with_edge("px", "x")
        .with_edge("py", "y")
        .with_edge("s_in1", "rad2")
        .with_edge("s_in2", "theta")
        .with_sink(Sink::R, "s");
        let s = schedule(&g).unwrap();
        assert_eq!(s.order, vec![NodeId(0), NodeId(1)]);
    }

    #[test]
    fn two_node_cycle_detected() {
        let g = Graph::new(vec![Node::abs("p_in", "p"), Node::abs("q_in", "q")])
            .with_edge("p_in", "q")
            .with_edge("q_in", "p")
            .with_sink(Sink::R, "p");
        assert_eq!(schedule(&g), Err(GraphError::CycleDetected("p".into())));
    }

    #[test]
    fn self_loop_detected() {
        let g = Graph::new(vec![Node::cos("loop_in", "loop_out")])
            .with_edge("loop_in", "loop_out")
            .with_sink(Sink::G, "loop_out");
        assert_eq!(
            schedule(&g),
            Err(GraphError::CycleDetected("loop_out".into()))
        );
    }

    #[test]
    fn unreachable_cycle_is_not_reported() {
        let g = Graph::new(vec![
            Node::abs("p_in", "p"),
            Node::abs("q_in", "q"),
            Node::constant(1.0, "c"),
        ])
        .with_edge("p_in", "q")
        .with_edge("q_in", "p")
        .with_sink(Sink::R, "c");
        assert_eq!(schedule(&g).unwrap().order, vec![NodeId(2)]);
    }

    #[test]
    fn undefined_producer_reported_at_schedule_time() {
        let g = Graph::new(vec![Node::abs("in1", "a")])
            .with_edge("in1", "missing")
            .with_sink(Sink::R, "a");
        assert_eq!(
            schedule(&g),
            Err(GraphError::UndefinedReference("missing".into()))
        );
    }

    #[test]
    fn unbound_inputs_add_no_dependencies() {
        let g = Graph::new(vec![Node::mult("m1", "m2", "m")]).with_sink(Sink::R, "m");
        assert_eq!(schedule(&g).unwrap().order, vec![NodeId(0)]);
    }

    #[test]
    fn repeated_scheduling_is_identical() {
        let g = scenario_d();
        assert_eq!(schedule(&g), schedule(&g));
    }

    #[test]
    fn cert_flags_bad_order() {
        let g = scenario_d();
        let reversed = Schedule {
            order: vec![NodeId(0), NodeId(1), NodeId(2)],
        };
        let cert = verify_schedule(&g, &reversed);
        assert!(cert.s1_unique);
        assert!(!cert.s2_dependencies_first);
        assert!(cert.s3_exactly_reachable);

        let duplicated = Schedule {
            order: vec![NodeId(2), NodeId(2), NodeId(1), NodeId(0)],
        };
        assert!(!verify_schedule(&g, &duplicated).s1_unique);

        let partial = Schedule {
            order: vec![NodeId(2)],
        };
        assert!(!verify_schedule(&g, &partial).all_pass());
    }

    #[test]
    fn display_and_format_order() {
        let g = scenario_d();
        let s = schedule(&g).unwrap();
        assert_eq!(s.to_string(), "[n2, n1, n0]");
        let text = format_order(&g, &s);
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().next().unwrap().contains("Const"));
        assert!(text.lines().last().unwrap().ends_with("-> outv"));
    }

    #[test]
    fn ids_outside_the_graph_fail_the_cert() {
        let g = scenario_d();
        let foreign = Schedule {
            order: vec![NodeId(2), NodeId(1), NodeId(0), NodeId(9)],
        };
        let cert = verify_schedule(&g, &foreign);
        assert!(cert.s1_unique);
        assert!(!cert.s2_dependencies_first);
        assert!(!cert.s3_exactly_reachable);
        let text = format_order(&g, &foreign);
        assert_eq!(text.lines().last(), Some("  3  n9   (not in graph)"));
    }
}
