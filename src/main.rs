use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tableau_sql_extractor::extract::{ExtractOptions, SqlExtractor};
use tableau_sql_extractor::fetch::{FetchConfig, TableauServerFetcher, DEFAULT_API_VERSION};
use tableau_sql_extractor::{ExtractionExecutor, ExtractionReport, Source};
use tracing::error;
use tracing_subscriber::EnvFilter;

const EXAMPLES: &str = "\
Examples:
  Local file:
    tableau-sql mydata.tdsx
    tableau-sql mydata.tdsx ./extracted_sql

  Tableau Server/Cloud URL:
    tableau-sql 'https://tableau.com/#/site/mysite/datasources/abc123' --token YOUR_TOKEN

  Direct REST API URL:
    tableau-sql 'https://tableau.com/api/3.17/sites/site-id/datasources/ds-id/content' --token YOUR_TOKEN";

const RULE_WIDTH: usize = 60;

#[derive(Debug, Parser)]
#[command(
    name = "tableau-sql",
    version = env!("CARGO_PKG_VERSION"),
    about = "Extract SQL queries from Tableau packaged data sources (.tdsx)",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Path to a .tdsx file, or a Tableau Server/Cloud data source URL
    source: String,

    /// Directory to save one .sql file per query
    output_dir: Option<PathBuf>,

    /// Access token for Tableau Server/Cloud authentication
    #[arg(long, env = "TABLEAU_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// REST API version used when rewriting web UI URLs
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print the extracted queries as a JSON object
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut fetch_config = FetchConfig::default().with_api_version(cli.api_version);
    if let Some(secs) = cli.timeout {
        fetch_config = fetch_config.with_timeout(Duration::from_secs(secs));
    }

    let mut options = ExtractOptions::default();
    if let Some(dir) = cli.output_dir {
        options = options.with_output_dir(dir);
    }

    let executor = ExtractionExecutor::new(
        TableauServerFetcher::new(fetch_config)?,
        SqlExtractor::new(options),
    )
    .with_token(cli.token);

    let report = executor.execute(Source::parse(&cli.source)).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.extraction.mapping)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ExtractionReport) {
    let mapping = &report.extraction.mapping;

    if mapping.is_empty() {
        println!("No SQL queries found in {}.", report.source);
        return;
    }

    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    println!("{heavy}");
    println!("Found {} SQL query/queries in {}:", mapping.len(), report.source);
    println!("{heavy}\n");

    for entry in mapping {
        println!("--- {} ---", entry.label);
        println!("{}", entry.sql);
        println!("\n{light}\n");
    }

    if !report.extraction.written.is_empty() {
        println!("Saved {} file(s).", report.extraction.written.len());
    }
}
