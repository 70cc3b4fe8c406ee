mod error;

use std::fmt;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use route_probe::{DEFAULT_INTERFACE, DEFAULT_ROUTE_COUNT, Report, RunConfig};
use route_probe_nl::check_prerequisites;
use tracing::Level;
use tracing_subscriber::fmt::time::FormatTime;

use crate::error::ReproResult;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

/// Measure heap growth while dumping a large routing table.
#[derive(Parser, Debug)]
#[command(name = "repro", version)]
struct Cli {
    /// Number of /32 host routes to install
    #[arg(long, env = "REPRO_ROUTES", default_value_t = DEFAULT_ROUTE_COUNT)]
    routes: u32,
    /// Egress interface for installed routes
    #[arg(long, env = "REPRO_INTERFACE", default_value = DEFAULT_INTERFACE)]
    interface: String,
    /// Routing table id for installed routes (kernel main table if omitted)
    #[arg(long)]
    table: Option<u32>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            routes: self.routes,
            interface: self.interface.clone(),
            table: self.table,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    match execute(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> ReproResult<String> {
    check_prerequisites()?;

    let report = route_probe_nl::run(&cli.run_config())?;

    render(&report, cli.json)
}

fn render(report: &Report, json: bool) -> ReproResult<String> {
    if json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        Ok(report.to_string())
    }
}
