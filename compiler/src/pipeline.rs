// pipeline.rs — Compilation phases and provenance
//
// Runs validate → schedule → verify for one graph and target, timing each
// phase at debug level, and keeps the resulting schedule so the graph can
// be evaluated at many samples or emitted without rescheduling. Nodes left
// out of the schedule are reported as warnings, never as errors.
//
// Preconditions: none.
// Postconditions: `Compiled::schedule` passed `verify_schedule`.
// Failure modes: the first `GraphError` of validate or schedule; no
//                partial result is returned.
// Side effects: log output only.

use std::time::{Duration, Instant};

use log::debug;
use sha2::{Digest, Sha256};

use crate::codegen::{emit_scheduled, EmittedCode};
use crate::diag::{codes, Diagnostic, GraphError};
use crate::eval::{evaluate_scheduled, Color, Sample};
use crate::graph::Graph;
use crate::schedule::{schedule, verify_schedule, Schedule};
use crate::validate::{check_glsl_identifiers, validate, Target};

// ── Phases ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validate,
    Schedule,
    Verify,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::Schedule => "schedule",
            Phase::Verify => "verify",
        }
    }
}

fn finish_phase(phase: Phase, started: Instant) {
    let elapsed: Duration = started.elapsed();
    debug!(
        "sgc: {} complete, {:.1}ms",
        phase.name(),
        elapsed.as_secs_f64() * 1000.0
    );
}

// ── Compiled graph ─────────────────────────────────────────────────────────

/// A validated, scheduled graph ready for either backend.
#[derive(Debug, Clone)]
pub struct Compiled<'g> {
    pub graph: &'g Graph,
    pub target: Target,
    pub schedule: Schedule,
    /// Warnings only.
    pub diagnostics: Vec<Diagnostic>,
}

impl Compiled<'_> {
    /// Evaluate at one sample with the stored order.
    pub fn evaluate(&self, sample: Sample) -> Result<Color, GraphError> {
        evaluate_scheduled(self.graph, &self.schedule, sample)
    }

    /// GLSL statements for the stored order. A graph compiled for
    /// `Target::Eval` skipped the identifier checks, so they run here first.
    pub fn emit(&self) -> Result<EmittedCode, GraphError> {
        if self.target != Target::Glsl {
            check_glsl_identifiers(self.graph)?;
        }
        emit_scheduled(self.graph, &self.schedule)
    }
}

/// Run all phases for `target`.
pub fn compile(graph: &Graph, target: Target) -> Result<Compiled<'_>, GraphError> {
    let started = Instant::now();
    validate(graph, target)?;
    finish_phase(Phase::Validate, started);

    let started = Instant::now();
    let schedule = schedule(graph)?;
    finish_phase(Phase::Schedule, started);

    let started = Instant::now();
    let cert = verify_schedule(graph, &schedule);
    for (name, ok) in cert.obligations() {
        debug!("sgc: {} {}", name, if ok { "ok" } else { "FAILED" });
    }
    debug_assert!(cert.all_pass(), "schedule postconditions violated: {cert:?}");
    finish_phase(Phase::Verify, started);

    let diagnostics = schedule
        .unscheduled(graph)
        .into_iter()
        .map(|id| {
            let node = graph.node(id);
            Diagnostic::warning(format!(
                "node {} ({} -> {}) does not reach any output channel and was dropped",
                id,
                node.op.kind(),
                node.outputs.join(", ")
            ))
            .with_code(codes::W0201)
        })
        .collect();

    Ok(Compiled {
        graph,
        target,
        schedule,
        diagnostics,
    })
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Identity of a compilation input, for `--emit build-info` and shader headers.
///
/// `graph_hash`: SHA-256 of the graph's canonical compact JSON.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub graph_hash: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    /// Hex string of the graph hash (64 characters).
    pub fn graph_hash_hex(&self) -> String {
        bytes_to_hex(&self.graph_hash)
    }

    /// Serialize provenance as a JSON string.
    pub fn to_json(&self) -> String {
        let value = serde_json::json!({
            "graph_hash": self.graph_hash_hex(),
            "compiler_version": self.compiler_version,
        });
        format!("{:#}\n", value)
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Hash the canonical JSON form so formatting and edge order in the source
/// document do not change the result.
pub fn compute_provenance(graph: &Graph) -> Provenance {
    let canonical = graph.to_config().canonical_json();
    let digest = Sha256::digest(canonical.as_bytes());
    let mut graph_hash = [0u8; 32];
    graph_hash.copy_from_slice(&digest);
    Provenance {
        graph_hash,
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
