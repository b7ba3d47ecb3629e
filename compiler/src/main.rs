use clap::Parser;
use log::{debug, warn};
use std::path::PathBuf;

use sgc::diag::GraphError;
use sgc::eval::Sample;
use sgc::graph::Graph;
use sgc::pipeline::{compile, compute_provenance, Compiled};
use sgc::validate::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    /// Complete WebGL fragment shader
    Glsl,
    /// Statements and the gl_FragColor assignment only
    Body,
    /// Pass-through vertex shader for the full-screen quad
    Vertex,
    /// Graphviz DOT
    Dot,
    /// Evaluation order
    Order,
    /// Interpreted color at --x/--y/--t, as JSON
    Eval,
    /// Graph hash and compiler version, as JSON
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "sgc",
    version,
    about = "Shade Graph Compiler: compiles JSON shader graphs to GLSL or evaluates them"
)]
struct Cli {
    /// Input graph document (.json)
    graph: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Glsl)]
    emit: EmitStage,

    /// Sample x coordinate for --emit eval
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x: f64,

    /// Sample y coordinate for --emit eval
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    y: f64,

    /// Sample time for --emit eval
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    t: f64,

    /// On graph errors, report them and emit the flat fallback shader
    #[arg(long)]
    fallback: bool,

    /// Print compiler phases and timing
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let logger = flexi_logger::Logger::try_with_env_or_str(level)
        .and_then(|logger| logger.log_to_stderr().start());
    let _logger = match logger {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("sgc: warning: logging disabled: {}", e);
            None
        }
    };

    debug!("sgc: graph  = {}", cli.graph.display());
    debug!("sgc: emit   = {:?}", cli.emit);

    // ── Load graph ──
    let graph = match sgc::config::load_graph(&cli.graph) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("sgc: error: {}", e);
            std::process::exit(2);
        }
    };
    debug!(
        "sgc: loaded {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len() + graph.sinks.bound().count()
    );

    // ── Compile and render ──
    let text = match render(&cli, &graph) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("sgc: {}", e.to_diagnostic());
            let shader_stage = matches!(cli.emit, EmitStage::Glsl | EmitStage::Body);
            if !(cli.fallback && shader_stage) {
                std::process::exit(1);
            }
            warn!("sgc: emitting fallback shader");
            sgc::shader::FALLBACK_FRAGMENT_SOURCE.to_string()
        }
    };

    // ── Write output ──
    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &text) {
                eprintln!("sgc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            debug!("sgc: wrote {} bytes to {}", text.len(), path.display());
        }
        None => print!("{}", text),
    }
}

fn render(cli: &Cli, graph: &Graph) -> Result<String, GraphError> {
    Ok(match cli.emit {
        EmitStage::Glsl => {
            let compiled = compile_reporting(graph, Target::Glsl)?;
            let provenance = compute_provenance(graph);
            sgc::shader::fragment_source(&compiled.emit()?, Some(&provenance))
        }
        EmitStage::Body => compile_reporting(graph, Target::Glsl)?.emit()?.body(),
        EmitStage::Vertex => sgc::shader::VERTEX_SOURCE.to_string(),
        // drawn even when scheduling fails
        EmitStage::Dot => {
            let schedule = sgc::schedule::schedule(graph).ok();
            sgc::dot::emit_dot(graph, schedule.as_ref())
        }
        EmitStage::Order => {
            let compiled = compile_reporting(graph, Target::Eval)?;
            sgc::schedule::format_order(graph, &compiled.schedule)
        }
        EmitStage::Eval => {
            let compiled = compile_reporting(graph, Target::Eval)?;
            let color = compiled.evaluate(Sample::new(cli.x, cli.y, cli.t))?;
            // non-finite channels serialize as null
            let mut json = serde_json::to_string_pretty(&color).unwrap_or_default();
            json.push('\n');
            json
        }
        EmitStage::BuildInfo => compute_provenance(graph).to_json(),
    })
}

/// Compile and print warnings to stderr.
fn compile_reporting(graph: &Graph, target: Target) -> Result<Compiled<'_>, GraphError> {
    let compiled = compile(graph, target)?;
    for diag in &compiled.diagnostics {
        eprintln!("sgc: {}", diag);
    }
    Ok(compiled)
}
