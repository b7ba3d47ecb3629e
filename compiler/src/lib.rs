// sgc — Shade Graph Compiler
//
// Library root. A shader graph (operator nodes wired by named identifiers,
// with implicit sources x/y/t and color sinks r/g/b) is validated,
// scheduled into a dependency-respecting order, and then either evaluated
// numerically (`eval`) or emitted as GLSL statements (`codegen`).

pub mod codegen;
pub mod config;
pub mod diag;
pub mod dot;
pub mod eval;
pub mod graph;
pub mod pipeline;
pub mod registry;
pub mod schedule;
pub mod shader;
pub mod validate;
