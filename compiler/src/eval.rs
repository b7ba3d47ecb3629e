// eval.rs — Numeric interpreter backend
//
// Evaluates a scheduled graph at one sample point (x, y, t) and returns the
// three color channels. The value cache lives for one call only, so
// independent samples may be evaluated from any number of threads sharing
// the same `Graph` and `Schedule`.
//
// Preconditions: `schedule` was computed from `graph`.
// Postconditions: unbound sinks read 0.0; unbound inputs use their default.
// Failure modes: scheduling errors from `evaluate`; `UndefinedReference` if
//                a schedule does not belong to the graph; `PortCountMismatch`
//                for a scheduled node with missing or extra ports.
// Side effects: none.

use std::collections::HashMap;

use serde::Serialize;

use crate::diag::GraphError;
use crate::graph::{Graph, Producer, Sink, Source};
use crate::registry::{Op, MAX_PORTS};
use crate::schedule::{schedule, Schedule};

// ── Public types ────────────────────────────────────────────────────────────

/// Values of the three implicit sources for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Sample { x, y, t }
    }

    pub fn value(&self, source: Source) -> f64 {
        match source {
            Source::X => self.x,
            Source::Y => self.y,
            Source::T => self.t,
        }
    }
}

/// Interpreter result, one value per sink.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn channel(&self, sink: Sink) -> f64 {
        match sink {
            Sink::R => self.r,
            Sink::G => self.g,
            Sink::B => self.b,
        }
    }

    /// Channels with the fixed opaque alpha appended.
    pub fn to_rgba(self) -> [f64; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

// ── Operator semantics ──────────────────────────────────────────────────────

/// Apply one operator. `args` holds the inputs in descriptor order; the
/// result holds the outputs in descriptor order. Unused slots are zero.
pub fn apply(op: Op, args: [f64; MAX_PORTS]) -> [f64; MAX_PORTS] {
    let [a, b] = args;
    match op {
        Op::Const(value) => [value, 0.0],
        Op::Abs => [a.abs(), 0.0],
        Op::Plus => [a + b, 0.0],
        Op::Mult => [a * b, 0.0],
        // squared radius, see registry
        Op::RectToPolar => [a * a + b * b, b.atan2(a)],
        Op::Cos => [a.cos(), 0.0],
    }
}

// ── Public entry points ─────────────────────────────────────────────────────

/// Schedule `graph` and evaluate it at `sample`.
pub fn evaluate(graph: &Graph, sample: Sample) -> Result<Color, GraphError> {
    let schedule = schedule(graph)?;
    evaluate_scheduled(graph, &schedule, sample)
}

/// Evaluate with a precomputed order.
pub fn evaluate_scheduled(
    graph: &Graph,
    schedule: &Schedule,
    sample: Sample,
) -> Result<Color, GraphError> {
    let mut cache: HashMap<&str, f64> = HashMap::with_capacity(schedule.len() * MAX_PORTS);

    for id in &schedule.order {
        let node = graph.checked_node(*id)?;
        let mut args = [0.0; MAX_PORTS];
        for (slot, (decl, input)) in args.iter_mut().zip(node.input_ports()) {
            *slot = match graph.producer_of(input) {
                Some(p) => read(&cache, sample, p)?,
                None => decl.default,
            };
        }
        let results = apply(node.op, args);
        for (output, value) in node.outputs.iter().zip(results) {
            cache.insert(output.as_str(), value);
        }
    }

    let channel = |sink: Sink| -> Result<f64, GraphError> {
        match graph.sinks.get(sink) {
            Some(p) => read(&cache, sample, p),
            None => Ok(0.0),
        }
    };
    Ok(Color {
        r: channel(Sink::R)?,
        g: channel(Sink::G)?,
        b: channel(Sink::B)?,
    })
}

fn read(cache: &HashMap<&str, f64>, sample: Sample, producer: &Producer) -> Result<f64, GraphError> {
    match producer {
        Producer::Source(source) => Ok(sample.value(*source)),
        Producer::Output(id) => cache
            .get(id.as_str())
            .copied()
            .ok_or_else(|| GraphError::UndefinedReference(id.clone())),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId};

    fn single(node: Node, input_edges: &[(&str, &str)], out: &str) -> Graph {
        let mut g = Graph::new(vec![node]).with_sink(Sink::R, out);
        for (consumer, producer) in input_edges {
            g.bind(*consumer, *producer);
        }
        g
    }

    fn eval_r(g: &Graph, sample: Sample) -> f64 {
        evaluate(g, sample).unwrap().r
    }

    #[test]
    fn operator_table() {
        assert_eq!(apply(Op::Const(2.5), [9.0, 9.0]), [2.5, 0.0]);
        assert_eq!(apply(Op::Abs, [-3.0, 0.0]), [3.0, 0.0]);
        assert_eq!(apply(Op::Plus, [1.5, 2.0]), [3.5, 0.0]);
        assert_eq!(apply(Op::Mult, [1.5, -2.0]), [-3.0, 0.0]);
        assert_eq!(apply(Op::Cos, [0.0, 0.0]), [1.0, 0.0]);
    }

    #[test]
    fn rect_to_polar_yields_squared_radius() {
        let [r, theta] = apply(Op::RectToPolar, [3.0, 4.0]);
        assert_eq!(r, 25.0);
        assert!((theta - 4.0f64.atan2(3.0)).abs() < 1e-15);
    }

    #[test]
    fn defaults_substituted_for_unbound_inputs() {
        let sample = Sample::new(5.0, 7.0, 11.0);
        assert_eq!(eval_r(&single(Node::abs("i", "o"), &[], "o"), sample), 0.0);
        assert_eq!(eval_r(&single(Node::plus("i1", "i2", "o"), &[], "o"), sample), 0.0);
        assert_eq!(eval_r(&single(Node::mult("i1", "i2", "o"), &[], "o"), sample), 1.0);
        assert_eq!(eval_r(&single(Node::cos("i", "o"), &[], "o"), sample), 1.0);
        assert_eq!(
            eval_r(&single(Node::rect_to_polar("i1", "i2", "o", "th"), &[], "o"), sample),
            0.0
        );
        // one bound, one default
        assert_eq!(
            eval_r(&single(Node::mult("i1", "i2", "o"), &[("i2", "t")], "o"), sample),
            11.0
        );
    }

    #[test]
    fn sources_feed_inputs() {
        let g = single(
            Node::rect_to_polar("px", "py", "rad2", "theta"),
            &[("px", "x"), ("py", "y")],
            "rad2",
        )
        .with_sink(Sink::G, "theta");
        let c = evaluate(&g, Sample::new(1.0, 1.0, 0.0)).unwrap();
        assert_eq!(c.r, 2.0);
        assert!((c.g - std::f64::consts::FRAC_PI_4).abs() < 1e-15);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn sinks_read_sources_directly() {
        let g = Graph::new(vec![])
            .with_sink(Sink::R, "t")
            .with_sink(Sink::G, "y")
            .with_sink(Sink::B, "x");
        let c = evaluate(&g, Sample::new(0.25, 0.5, 0.75)).unwrap();
        assert_eq!(c.to_rgba(), [0.75, 0.5, 0.25, 1.0]);
        assert_eq!(c.channel(Sink::G), 0.5);
    }

    #[test]
    fn unbound_sinks_are_zero() {
        let g = Graph::new(vec![Node::constant(4.0, "c")]).with_sink(Sink::G, "c");
        assert_eq!(
            evaluate(&g, Sample::default()).unwrap(),
            Color {
                r: 0.0,
                g: 4.0,
                b: 0.0
            }
        );
    }

    #[test]
    fn errors_propagate_from_scheduling() {
        let g = Graph::new(vec![Node::abs("p_in", "p")])
            .with_edge("p_in", "p")
            .with_sink(Sink::R, "p");
        assert_eq!(
            evaluate(&g, Sample::default()),
            Err(GraphError::CycleDetected("p".into()))
        );
    }

    #[test]
    fn foreign_schedule_is_rejected() {
        let g = Graph::new(vec![Node::abs("a_in", "a"), Node::constant(1.0, "c")])
            .with_edge("a_in", "c")
            .with_sink(Sink::R, "a");
        let wrong = Schedule {
            order: vec![NodeId(0)],
        };
        assert_eq!(
            evaluate_scheduled(&g, &wrong, Sample::default()),
            Err(GraphError::UndefinedReference("c".into()))
        );
    }

    #[test]
    fn out_of_range_schedule_is_rejected() {
        let g = Graph::new(vec![Node::constant(1.0, "c")]).with_sink(Sink::R, "c");
        let wrong = Schedule {
            order: vec![NodeId(7)],
        };
        assert_eq!(
            evaluate_scheduled(&g, &wrong, Sample::default()),
            Err(GraphError::UndefinedReference("n7".into()))
        );
    }

    #[test]
    fn node_without_outputs_is_rejected() {
        let g = Graph::new(vec![Node {
            op: Op::Abs,
            inputs: vec!["a_in".into()],
            outputs: vec![],
        }]);
        let order = Schedule {
            order: vec![NodeId(0)],
        };
        assert_eq!(
            evaluate_scheduled(&g, &order, Sample::default()),
            Err(GraphError::PortCountMismatch {
                node: "n0".into(),
                side: "output",
                expected: 1,
                found: 0,
            })
        );
    }

    #[test]
    fn evaluation_is_bit_identical_across_runs() {
        let g = single(
            Node::rect_to_polar("px", "py", "rad2", "theta"),
            &[("px", "x"), ("py", "t")],
            "theta",
        );
        let s = Sample::new(0.3, 0.0, -0.7);
        let a = evaluate(&g, s).unwrap();
        let b = evaluate(&g, s).unwrap();
        assert_eq!(a.r.to_bits(), b.r.to_bits());
    }
}
