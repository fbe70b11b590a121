//! confmatrix - many-configuration build and test driver
//!
//! Builds the project under test with a curated sample of configure-flag
//! combinations, probes each built artifact for its effective capabilities,
//! runs the test suites valid for that variant, and stops the whole run on
//! the first failure, leaving the build state on disk for inspection.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use confmatrix_core::{
    init_tracing, standard_plan, EnvironmentProbe, MatrixDriver, ProcessExecutor, ProjectLayout,
    Reporter,
};

#[derive(Parser)]
#[command(name = "confmatrix")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Configuration-matrix build and test driver", long_about = None)]
struct Cli {
    /// Print the full capability report for every built variant
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Source tree of the project under test (default: current directory)
    #[arg(long, default_value = ".")]
    source: PathBuf,

    /// Project layout overrides as a JSON file
    #[arg(long)]
    layout: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let layout: ProjectLayout = match &cli.layout {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse layout file {}", path.display()))?
        }
        None => ProjectLayout::default(),
    };

    let source = cli
        .source
        .canonicalize()
        .with_context(|| format!("Source tree {} not found", cli.source.display()))?;

    let exec = Arc::new(ProcessExecutor);
    let env = EnvironmentProbe::new(exec.clone()).probe(&source).await;
    info!(
        compiler = %env.compiler,
        extended_warnings = env.extended_warnings,
        "environment probed"
    );

    let plan = standard_plan(&env, &layout);
    let reporter = Reporter::new(cli.verbose);
    let mut driver = MatrixDriver::new(exec, layout, source, reporter);

    if driver.run(&plan, &env).await.is_err() {
        // Diagnostics were already dumped by the reporter.
        std::process::exit(1);
    }
    Ok(())
}
