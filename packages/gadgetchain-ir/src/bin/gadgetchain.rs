//! Gadget chain discovery CLI
//!
//! # Usage
//!
//! ```bash
//! # Analyze a program dump, text report to stdout
//! gadgetchain analyze --program program.json --rules rules.yaml
//!
//! # Thorough preset, JSON report to a file
//! gadgetchain analyze --program program.json --rules rules.yaml --preset thorough --out chains.json --json
//!
//! # Resolve a rule file against a program without analyzing
//! gadgetchain check-rules --program program.json --rules rules.yaml
//! ```

use clap::{Parser, Subcommand};
use gadgetchain_ir::features::gadget_chain::ChainSink;
use gadgetchain_ir::{AnalysisOptions, GadgetChainPipeline, JsonReportWriter, Preset, TextReportWriter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gadgetchain")]
#[command(about = "Deserialization gadget chain discovery over a program dump", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the program and report every chain found
    Analyze {
        /// Program dump (JSON)
        #[arg(short, long)]
        program: PathBuf,

        /// Rule table (YAML)
        #[arg(short, long)]
        rules: PathBuf,

        /// Analysis options (YAML); takes precedence over --preset
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// fast | balanced | thorough
        #[arg(long, default_value = "balanced")]
        preset: String,

        /// Maximum chain length, overriding the preset or config
        #[arg(long)]
        max_len: Option<usize>,

        /// Report file (stdout when absent)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a rule table against a program and print its statistics
    CheckRules {
        /// Program dump (JSON)
        #[arg(short, long)]
        program: PathBuf,

        /// Rule table (YAML)
        #[arg(short, long)]
        rules: PathBuf,

        /// Treat rules naming absent methods as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            program,
            rules,
            config,
            preset,
            max_len,
            out,
            json,
        } => {
            let mut options = match config {
                Some(path) => AnalysisOptions::from_yaml(path)?,
                None => AnalysisOptions::preset(Preset::parse(&preset)?),
            };
            if let Some(len) = max_len {
                options = options.max_len(len);
            }
            analyze(&program, &rules, options, out.as_deref(), json)?;
        }
        Commands::CheckRules { program, rules, strict } => {
            check_rules(&program, &rules, strict)?;
        }
    }

    Ok(())
}

fn analyze(
    program: &Path,
    rules: &Path,
    options: AnalysisOptions,
    out: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = GadgetChainPipeline::new(options)?;

    let sink: Box<dyn ChainSink> = match (out, json) {
        (Some(path), true) => Box::new(JsonReportWriter::create(path)?),
        (Some(path), false) => Box::new(TextReportWriter::create(path)?),
        (None, true) => Box::new(JsonReportWriter::new(std::io::stdout())),
        (None, false) => Box::new(TextReportWriter::new(std::io::stdout())),
    };

    let result = pipeline.run_files(program, rules, sink.as_ref())?;

    eprintln!("{}", result.summary());
    let mut by_sink: Vec<(String, usize)> = result.chains_by_sink().into_iter().collect();
    by_sink.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (sink, count) in by_sink {
        eprintln!("  {:>5}  {}", count, sink);
    }
    for stage in &result.stage_metrics {
        eprintln!("  stage {:<8} {:>10.2?}  ({} items)", stage.name, stage.duration, stage.items);
    }
    if let Some(path) = out {
        eprintln!("report written to {}", path.display());
    }
    Ok(())
}

fn check_rules(program: &Path, rules: &Path, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    let options = AnalysisOptions::default().strict_rules(strict);
    let pipeline = GadgetChainPipeline::new(options)?;
    let stats = pipeline.check_rules(program, rules)?;

    println!("sources:   {}", stats.sources);
    println!("sinks:     {}", stats.sinks);
    println!("transfers: {}", stats.transfers);
    println!("imitates:  {}", stats.imitates);
    println!("ignores:   {}", stats.ignores);
    if stats.missing > 0 {
        println!("missing:   {} (methods absent from the program)", stats.missing);
    }
    Ok(())
}
