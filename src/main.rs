use anyhow::{Context, Result};
use aws_backup_report::aws::auth::{
    check_region, list_regions, load_sdk_config, parse_region_choice, resolve_credentials,
    sdk_region,
};
use aws_backup_report::aws::BackupClient;
use aws_backup_report::config::Config;
use aws_backup_report::fetcher::fetch_inventory;
use aws_backup_report::model::JobStatus;
use aws_backup_report::render::write_reports;
use aws_backup_report::{aggregate, BackupReport, ReportError, VERSION};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Inventory AWS Backup for one region into JSON and Excel reports
#[derive(Parser, Debug)]
#[command(name = "aws-backup-report", version, about, long_about = None)]
struct Args {
    /// AWS region to report on
    #[arg(short, long)]
    region: Option<String>,

    /// Named profile from the shared AWS config and credentials files
    #[arg(short, long)]
    profile: Option<String>,

    /// Include backup jobs created within this many days [default: 90]
    #[arg(short, long)]
    days: Option<u32>,

    /// Directory for the report files [default: .]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// AWS Backup endpoint override (VPC endpoints, testing)
    #[arg(long)]
    endpoint: Option<String>,

    /// Print the known AWS regions and exit
    #[arg(long)]
    list_regions: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("aws-backup-report {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir
            .join("aws-backup-report")
            .join("aws-backup-report.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".aws-backup-report").join("aws-backup-report.log");
    }
    PathBuf::from("aws-backup-report.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_regions {
        for region in list_regions() {
            println!("{}", region);
        }
        return ExitCode::SUCCESS;
    }

    let _log_guard = setup_logging(args.log_level);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Run failed: {:#}", err);
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<ReportError>()
                .map(ReportError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let mut config = Config::load();

    let profile = config.effective_profile(args.profile.as_deref());
    let explicit_region = config.effective_region(args.region.as_deref());
    if let Some(region) = &explicit_region {
        check_region(region)?;
    }

    let sdk_config = load_sdk_config(profile.as_deref(), explicit_region.as_deref()).await;
    let (region, sdk_config) = match explicit_region.or_else(|| sdk_region(&sdk_config)) {
        Some(region) => (region, sdk_config),
        None => {
            // Role and SSO providers need the region too
            let region = prompt_region()?;
            let sdk_config = load_sdk_config(profile.as_deref(), Some(&region)).await;
            (region, sdk_config)
        }
    };
    check_region(&region)?;

    // Credentials are resolved before any request goes out
    let credentials = resolve_credentials(&sdk_config).await?;

    let options = config.client_options(args.endpoint.as_deref());
    let client = BackupClient::new(credentials, &region, &options)
        .map_err(|e| ReportError::Config(e.to_string()))?;

    let lookback_days = config.effective_lookback_days(args.days);
    tracing::info!("Using region: {}, lookback: {} days", region, lookback_days);
    println!(
        "Fetching AWS Backup data for {} (jobs from the last {} days)...",
        region, lookback_days
    );

    let inventory = fetch_inventory(&client, &config.fetch_options(lookback_days)).await?;
    let report = aggregate(&inventory, &region)?;

    let output_dir = config.effective_output_dir(args.output_dir.as_deref());
    let stamp = report.generated_at.format("%Y%m%d_%H%M%S");
    let json_path = output_dir.join(format!("aws_backup_report_{}.json", stamp));
    let xlsx_path = output_dir.join(format!("aws_backup_analysis_{}.xlsx", stamp));

    write_reports(&report, &json_path, &xlsx_path).context("Failed to write reports")?;

    print_summary(&report, &json_path, &xlsx_path);

    if config.region.as_deref() != Some(region.as_str()) {
        if let Err(e) = config.set_region(&region) {
            tracing::warn!("Failed to save region to config: {}", e);
        }
    }

    Ok(())
}

fn no_region_error() -> ReportError {
    ReportError::Config("No AWS region configured. Set AWS_REGION or use --region".to_string())
}

/// Ask for a region from the numbered list; only on an interactive terminal
fn prompt_region() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return Err(no_region_error().into());
    }

    let regions = list_regions();
    println!("No AWS region configured. Available regions:");
    for (i, region) in regions.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, region);
    }

    let stdin = std::io::stdin();
    loop {
        print!("Select a region (number or name): ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(no_region_error().into());
        }
        match parse_region_choice(&line, &regions) {
            Some(region) => {
                tracing::info!("Region selected interactively: {}", region);
                return Ok(region);
            }
            None => println!("Invalid selection '{}'. Try again.", line.trim()),
        }
    }
}

fn print_summary(report: &BackupReport, json_path: &Path, xlsx_path: &Path) {
    println!();
    println!("JSON report:  {}", json_path.display());
    println!("Spreadsheet:  {}", xlsx_path.display());
    println!();
    println!("Total jobs: {}", report.job_summary.total);
    for status in JobStatus::ALL {
        let count = report.job_summary.count(status);
        if count > 0 {
            println!("  {:<10} {}", status.as_str(), count);
        }
    }
    println!(
        "Protected resources: {} ({} without a successful backup)",
        report.statistics.unique_resource_count, report.statistics.resources_without_backup
    );

    let diagnostics = &report.diagnostics;
    if !diagnostics.fetch_warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &diagnostics.fetch_warnings {
            println!("  [{}] {}", warning.collection, warning.message);
        }
    }
    if !diagnostics.notes.is_empty() {
        println!(
            "{} data-quality notes recorded in the report diagnostics",
            diagnostics.notes.len()
        );
    }
}
