//! Model Validator CLI
//!
//! Loads a model document (plus any referenced model documents), runs
//! structural validation, and reports every finding with its code and
//! source position.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use edmgraph::analysis::ReferenceGraph;
use edmgraph::import;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edm-validate")]
#[command(about = "Validate an entity data model document")]
struct Cli {
    /// Path to the model document (.json)
    model: PathBuf,

    /// Referenced model documents, loaded before the main model
    #[arg(short, long)]
    reference: Vec<PathBuf>,

    /// Emit a JSON report instead of human-readable output
    #[arg(long)]
    json: bool,

    /// Write the reference graph as GraphViz DOT to this path
    #[arg(long)]
    dot: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut references = Vec::new();
    for path in &cli.reference {
        let reference = import::from_path(path)
            .with_context(|| format!("loading reference model {}", path.display()))?;
        references.push(reference);
    }
    let model = import::from_path_with_references(&cli.model, references)
        .with_context(|| format!("loading model {}", cli.model.display()))?;

    if !cli.json {
        println!("🔍 Validating {} ...", cli.model.display());
        println!(
            "   {} types, {} containers, {} operations, {} terms",
            model.type_count(),
            model.container_count(),
            model.operation_count(),
            model.term_count()
        );
    }

    let report = model.validate();
    let critical = report.iter().filter(|e| e.is_interface_critical()).count();

    if let Some(path) = &cli.dot {
        let graph = ReferenceGraph::project(&model);
        std::fs::write(path, graph.to_dot())
            .with_context(|| format!("writing DOT to {}", path.display()))?;
        if !cli.json {
            println!("📈 Reference graph written to {}", path.display());
        }
    }

    if cli.json {
        let json = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "model": cli.model.display().to_string(),
            "types": model.type_count(),
            "containers": model.container_count(),
            "operations": model.operation_count(),
            "terms": model.term_count(),
            "errors": report,
            "critical": critical,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if report.is_empty() {
        println!("✅ Model is structurally valid");
    } else {
        println!("❌ {} problem(s) found:", report.len());
        for error in &report {
            println!("   {}", error);
        }
        if critical > 0 {
            println!();
            println!("   {} of these leave parts of the model unusable", critical);
        }
    }

    if !report.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
