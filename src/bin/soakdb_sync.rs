use std::net::SocketAddr;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use soakdb_sync::api;
use soakdb_sync::app::{App, FindResult, ProgressSink, RegisterResult, TransferResult};
use soakdb_sync::config::{ConfigLoader, ResolvedConfig};
use soakdb_sync::error::SyncError;
use soakdb_sync::groups::SystemGroupResolver;
use soakdb_sync::output::{JsonOutput, LogSink, OutputMode};

#[derive(Parser)]
#[command(name = "soakdb-sync")]
#[command(about = "Aggregate SoakDB files into a central crystallography store and serve it")]
#[command(version, author)]
struct Cli {
    /// Print step results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    /// Central store database file
    #[arg(long, global = true)]
    db: Option<Utf8PathBuf>,

    /// Directory holding file lists and completion markers
    #[arg(long, global = true)]
    artifacts: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Locate SoakDB files and write the dated file list")]
    Find(BatchArgs),
    #[command(about = "Register files and proposal members in the central store")]
    Fedids(BatchArgs),
    #[command(about = "Rebuild the aggregate tables from the listed SoakDB files")]
    Transfer(BatchArgs),
    #[command(about = "Run find, fedids and transfer in order")]
    Run(BatchArgs),
    #[command(about = "Serve the central store as read-only JSON")]
    Serve(ServeArgs),
}

#[derive(Args, Clone)]
struct BatchArgs {
    /// Run date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Data root to search instead of the configured one
    #[arg(long)]
    root: Option<Utf8PathBuf>,
}

#[derive(Args, Clone)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::ConfigRead(_) | SyncError::ConfigParse(_) | SyncError::InvalidConfig(_) => 2,
        SyncError::CentralStore(_) | SyncError::GroupLookup(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.central_db = db;
    }
    if let Some(artifacts) = cli.artifacts {
        config.artifacts_dir = artifacts;
    }

    match cli.command {
        Commands::Serve(args) => run_serve(config, args),
        Commands::Find(args) => {
            let (app, date) = batch_app(config, &args);
            let result = app.find_files(date, sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_find(&result).into_diagnostic()?,
                OutputMode::Human => print_find_summary(&result),
            }
            Ok(())
        }
        Commands::Fedids(args) => {
            let (app, date) = batch_app(config, &args);
            let result = app.register_access(date, sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_register(&result).into_diagnostic()?,
                OutputMode::Human => print_register_summary(&result),
            }
            Ok(())
        }
        Commands::Transfer(args) => {
            let (app, date) = batch_app(config, &args);
            let result = app.transfer_records(date, sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_transfer(&result).into_diagnostic()?,
                OutputMode::Human => print_transfer_summary(&result),
            }
            Ok(())
        }
        Commands::Run(args) => {
            let (app, date) = batch_app(config, &args);
            let result = app.run_all(date, sink_for(output_mode))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
                OutputMode::Human => {
                    print_find_summary(&result.find);
                    print_register_summary(&result.fedids);
                    print_transfer_summary(&result.transfer);
                }
            }
            Ok(())
        }
    }
}

fn batch_app(
    mut config: ResolvedConfig,
    args: &BatchArgs,
) -> (App<SystemGroupResolver>, NaiveDate) {
    if let Some(root) = &args.root {
        config.data_root = root.clone();
    }
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    (App::new(config, SystemGroupResolver::new()), date)
}

fn sink_for(mode: OutputMode) -> &'static dyn ProgressSink {
    match mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogSink,
    }
}

fn run_serve(config: ResolvedConfig, args: ServeArgs) -> miette::Result<()> {
    let bind = args.bind.unwrap_or(config.bind);
    let runtime =
        tokio::runtime::Runtime::new().map_err(|err| SyncError::Server(err.to_string()))?;
    runtime.block_on(api::serve(bind, config.central_db))?;
    Ok(())
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn print_find_summary(result: &FindResult) {
    println!("{CYAN}soakdb-sync find {}{RESET}", result.date);
    println!("{GREEN}Located files: {}{RESET}", result.files.len());
    println!("   list: {}", result.list_path);
}

fn print_register_summary(result: &RegisterResult) {
    let report = &result.report;
    println!("{CYAN}soakdb-sync fedids {}{RESET}", result.date);
    println!(
        "{GREEN}New files: {} of {}{RESET}",
        report.files_inserted, report.files_seen
    );
    if report.files_skipped > 0 {
        println!("{YELLOW}Skipped files: {}{RESET}", report.files_skipped);
    }
    println!(
        "Proposals resolved: {} ({} new memberships)",
        report.proposals_resolved, report.memberships_inserted
    );
    println!("   marker: {}", result.marker_path);
}

fn print_transfer_summary(result: &TransferResult) {
    let report = &result.report;
    println!("{CYAN}soakdb-sync transfer {}{RESET}", result.date);
    println!(
        "{GREEN}Transferred files: {} of {}{RESET}",
        report.files_transferred, report.files_seen
    );
    for (table, rows) in &report.rows {
        println!("   {table}: {rows} rows");
    }
    for failure in &report.failures {
        println!("{RED}Failed {}: {}{RESET}", failure.path, failure.error);
    }
    println!("   marker: {}", result.marker_path);
}
