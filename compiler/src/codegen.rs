// codegen.rs — GLSL statement emission
//
// Transforms a scheduled graph into GLSL source: one statement per
// scheduled node (a `float` declaration per output), followed by a single
// `gl_FragColor` assignment built from the three sink bindings. The text
// is the body of a fragment shader `main`; the surrounding skeleton comes
// from the caller (see `shader`).
//
// Preconditions: the graph validated for `Target::Glsl`; `schedule` was
//                computed from it.
// Postconditions: returns `EmittedCode`; emission order equals schedule order.
// Failure modes: scheduling errors from `emit`; `UndefinedReference` or
//                `PortCountMismatch` for a scheduled id that is not a
//                well-formed node of `graph`.
// Side effects: none.

use std::fmt::Write as _;

use crate::diag::GraphError;
use crate::graph::{Graph, Node, Sink};
use crate::registry::Op;
use crate::schedule::{schedule, Schedule};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedCode {
    /// One entry per scheduled node, in order. A multi-output node's
    /// statement spans one line per output.
    pub statements: Vec<String>,
    /// The aggregate `gl_FragColor = vec4(r, g, b, 1.0);` statement.
    pub output: String,
}

impl EmittedCode {
    /// Statements and the output assignment, one line each, `\n`-terminated.
    pub fn body(&self) -> String {
        let mut body = String::new();
        for stmt in &self.statements {
            body.push_str(stmt);
            body.push('\n');
        }
        body.push_str(&self.output);
        body.push('\n');
        body
    }
}

// ── Identifiers ─────────────────────────────────────────────────────────────

/// Words that would clash with the language or with names the generated
/// code and shader skeleton rely on.
const RESERVED_WORDS: &[&str] = &[
    // GLSL ES 1.00 keywords
    "attribute", "const", "uniform", "varying", "break", "continue", "do", "for", "while",
    "if", "else", "in", "out", "inout", "float", "int", "void", "bool", "true", "false",
    "lowp", "mediump", "highp", "precision", "invariant", "discard", "return", "mat2",
    "mat3", "mat4", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "bvec2", "bvec3",
    "bvec4", "sampler2D", "samplerCube", "struct",
    // GLSL ES 1.00 words reserved for future use
    "asm", "class", "union", "enum", "typedef", "template", "this", "packed", "goto",
    "switch", "default", "case", "inline", "noinline", "volatile", "public", "static",
    "extern", "external", "interface", "flat", "long", "short", "double", "half",
    "fixed", "unsigned", "superp", "input", "output", "hvec2", "hvec3", "hvec4",
    "dvec2", "dvec3", "dvec4", "fvec2", "fvec3", "fvec4", "sampler1D", "sampler3D",
    "sampler1DShadow", "sampler2DShadow", "sampler2DRect", "sampler3DRect",
    "sampler2DRectShadow", "sizeof", "cast", "namespace", "using",
    // built-ins referenced by emitted statements
    "abs", "cos", "atan",
    // shader skeleton
    "main", "u_time", "u_resolution", "xy_pos",
];

/// Whether `name` can be declared as a GLSL `float` variable in emitted code:
/// `[A-Za-z_][A-Za-z0-9_]*`, not reserved, not in the `gl_` namespace, and
/// without the reserved double underscore.
pub fn is_glsl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("gl_")
        && !name.contains("__")
        && !RESERVED_WORDS.contains(&name)
}

/// Render a float literal that GLSL parses as `float`: integral values keep
/// an explicit `.0`, negatives are parenthesized.
pub fn float_literal(value: f64) -> String {
    if value.is_nan() {
        return "(0.0 / 0.0)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            "(1.0 / 0.0)".to_string()
        } else {
            "(-1.0 / 0.0)".to_string()
        };
    }
    // `{:?}` always keeps a fractional part or exponent (1.0, 0.5, 1e-7)
    let text = format!("{:?}", value);
    if value.is_sign_negative() && value != 0.0 {
        format!("({})", text)
    } else if value == 0.0 {
        "0.0".to_string()
    } else {
        text
    }
}

// ── Public entry points ─────────────────────────────────────────────────────

/// Schedule `graph` and emit its statements.
pub fn emit(graph: &Graph) -> Result<EmittedCode, GraphError> {
    let schedule = schedule(graph)?;
    emit_scheduled(graph, &schedule)
}

/// Emit with a precomputed order.
pub fn emit_scheduled(graph: &Graph, schedule: &Schedule) -> Result<EmittedCode, GraphError> {
    let statements: Vec<String> = schedule
        .order
        .iter()
        .map(|id| Ok(emit_node(graph, graph.checked_node(*id)?)))
        .collect::<Result<_, GraphError>>()?;
    Ok(EmittedCode {
        statements,
        output: emit_output(graph),
    })
}

// ── Templates ───────────────────────────────────────────────────────────────

// `node` passed `check_arity`, so every port index below is in range.
fn emit_node(graph: &Graph, node: &Node) -> String {
    let arg = |i: usize| operand(graph, node, i);
    let out = |i: usize| node.outputs[i].as_str();
    match node.op {
        Op::Const(value) => format!("float {} = {};", out(0), float_literal(value)),
        Op::Abs => format!("float {} = abs({});", out(0), arg(0)),
        Op::Plus => format!("float {} = {} + {};", out(0), arg(0), arg(1)),
        Op::Mult => format!("float {} = {} * {};", out(0), arg(0), arg(1)),
        Op::RectToPolar => {
            let (x, y) = (arg(0), arg(1));
            let mut stmt = String::new();
            let _ = writeln!(stmt, "float {} = ({x} * {x}) + ({y} * {y});", out(0));
            let _ = write!(stmt, "float {} = atan({y}, {x});", out(1));
            stmt
        }
        Op::Cos => format!("float {} = cos({});", out(0), arg(0)),
    }
}

/// The i-th input as an expression: the bound producer's variable, or the
/// port default as a literal.
fn operand(graph: &Graph, node: &Node, i: usize) -> String {
    let input = node.inputs[i].as_str();
    match graph.producer_of(input) {
        Some(p) => p.name().to_string(),
        None => float_literal(node.descriptor().inputs[i].default),
    }
}

fn emit_output(graph: &Graph) -> String {
    let channels: Vec<String> = Sink::ALL
        .iter()
        .map(|s| match graph.sinks.get(*s) {
            Some(p) => p.name().to_string(),
            None => float_literal(0.0),
        })
        .collect();
    format!("gl_FragColor = vec4({}, 1.0);", channels.join(", "))
}

// ── Tests ───────────────────────────────────────────────────────────────────
