// shader.rs — WebGL shader skeleton around emitted statements
//
// The compiler core only produces statements. This module supplies the
// program around them for a WebGL 1 full-screen quad: uniforms for time and
// resolution, x/y normalized to [-1, 1] from the fragment coordinate, and
// the matching vertex shader. When a graph fails to compile, callers may
// substitute `FALLBACK_FRAGMENT_SOURCE` (flat magenta).

use std::fmt::Write as _;

use crate::codegen::EmittedCode;
use crate::pipeline::Provenance;

pub const VERTEX_SOURCE: &str = "\
attribute vec2 xy_pos;
void main() {
  gl_Position = vec4(xy_pos, 0, 1);
}
";

pub const FALLBACK_FRAGMENT_SOURCE: &str = "\
void main() {
  gl_FragColor = vec4(1, 0, 1, 1);
}
";

const PREAMBLE: &str = "\
precision highp float;
uniform float u_time;
uniform vec2 u_resolution;
void main() {
  float x = (gl_FragCoord.x / u_resolution.x) * 2.0 - 1.0;
  float y = (gl_FragCoord.y / u_resolution.y) * 2.0 - 1.0;
  float t = u_time;
";

/// Complete fragment shader for `code`. With provenance, the source starts
/// with a comment naming the compiler version and graph hash.
pub fn fragment_source(code: &EmittedCode, provenance: Option<&Provenance>) -> String {
    let mut out = String::with_capacity(PREAMBLE.len() + 64 * (code.statements.len() + 2));
    if let Some(p) = provenance {
        let _ = writeln!(out, "// Generated by sgc {}", p.compiler_version);
        let _ = writeln!(out, "// graph sha256: {}", p.graph_hash_hex());
    }
    out.push_str(PREAMBLE);
    for line in code.body().lines() {
        let _ = writeln!(out, "  {}", line);
    }
    out.push_str("}\n");
    out
}
