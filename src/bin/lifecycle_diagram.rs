//! Render the test-case lifecycle as a Mermaid state diagram.
//!
//! Usage:
//!   cargo run --bin lifecycle_diagram                       # stdout
//!   cargo run --bin lifecycle_diagram -- --out LIFECYCLE.md

use std::path::PathBuf;

use clap::Parser;

use redis_operator_harness::harness::lifecycle::{CasePhase, TRANSITIONS};

#[derive(Parser, Debug)]
#[command(name = "lifecycle_diagram", about = "Mermaid diagram of the case lifecycle")]
struct Args {
    /// Write the diagram to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let md = generate();

    match args.out {
        Some(path) => {
            std::fs::write(&path, &md)?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{md}"),
    }
    Ok(())
}

fn generate() -> String {
    let mut out = String::new();
    out.push_str("# Test Case Lifecycle\n\n");
    out.push_str("Generated from the `TRANSITIONS` table in `harness/lifecycle.rs`.\n\n");
    out.push_str("```mermaid\nstateDiagram-v2\n");
    out.push_str(&format!("    [*] --> {}\n", CasePhase::Created));

    for t in TRANSITIONS.iter() {
        out.push_str(&format!("    {} --> {} : {}\n", t.from, t.to, t.trigger));
    }

    out.push_str(&format!("    {} --> [*]\n", CasePhase::Reclaimed));
    out.push_str("```\n");
    out
}
