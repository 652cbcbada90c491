use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;

use inventory_flattener::collectors::{build_source, SourceKind};
use inventory_flattener::out::{self, OutFormat};
use inventory_flattener::{init_tracing, reports, Config};

#[derive(Parser)]
#[command(name = "inventory-report")]
#[command(about = "Flatten cloud inventory listings into spreadsheet-friendly reports")]
#[command(
    after_help = "Environment:\n  INVENTORY_SOURCE__SUBSCRIPTION   Subscription for every listing\n  RUST_LOG                         Log filter override"
)]
struct Cli {
    /// Config file (TOML/JSON), layered over config/default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_enum)]
    source: Option<SourceKind>,
    /// Directory of saved listings for `--source file`.
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    subscription: Option<String>,
    #[arg(long, global = true)]
    az_path: Option<String>,
    #[arg(long, global = true, value_enum)]
    format: Option<OutFormat>,
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,
    /// Value written for columns that cannot be resolved.
    #[arg(long, global = true)]
    sentinel: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in or configured report.
    Report { name: String },
    /// List available report names.
    Reports,
}

impl Cli {
    /// Command-line flags win over config files and environment.
    fn apply(&self, config: &mut Config) {
        if let Some(kind) = self.source {
            config.source.kind = kind;
        }
        if let Some(dir) = &self.input_dir {
            config.source.input_dir = dir.clone();
        }
        if let Some(sub) = &self.subscription {
            config.source.subscription = Some(sub.clone());
        }
        if let Some(az) = &self.az_path {
            config.source.az_path = az.clone();
        }
        if let Some(format) = self.format {
            config.report.format = format;
        }
        if let Some(output) = &self.output {
            config.report.output = Some(output.clone());
        }
        if let Some(sentinel) = &self.sentinel {
            config.report.sentinel = sentinel.clone();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);

    init_tracing(&config.logging).map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    match &cli.command {
        Commands::Reports => {
            for name in reports::available(&config) {
                println!("{name}");
            }
        }
        Commands::Report { name } => {
            let definition = reports::resolve(name, &config)?;
            let source = build_source(&config.source)?;
            let report = definition.run(name, source.as_ref(), &config.report.sentinel)?;

            match &config.report.output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    out::emit(&mut BufWriter::new(file), config.report.format, &report.header, &report.rows)?;
                    info!(path = %path.display(), rows = report.rows.len(), "report written");
                }
                None => {
                    let stdout = io::stdout();
                    out::emit(&mut stdout.lock(), config.report.format, &report.header, &report.rows)?;
                }
            }
        }
    }

    Ok(())
}
