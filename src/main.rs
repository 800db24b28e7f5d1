//! site-backup main entry point
//!
//! Three subcommands make up the archival pipeline: `run` mirrors the site,
//! `wait` blocks until a run has finished, and `upload` ships the mirror to
//! S3.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use site_backup::config::{load_config_with_hash, validate, Config};
use site_backup::logging::init_logging;
use site_backup::mirror::MirrorMode;
use site_backup::run::{
    report_setup_failure, run_backup, wait_for_completion, MailNotifier, Notifier, RunOptions,
    WaitOptions,
};
use site_backup::upload::{upload_directory, verify_credentials, S3Store, StorageClass};
use site_backup::{error_chain, BackupError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;

/// site-backup: mirror a website, patch node gaps, archive to S3
#[derive(Parser, Debug)]
#[command(name = "site-backup")]
#[command(version)]
#[command(about = "Website archival pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror a site and reconcile missing nodes
    Run(RunArgs),

    /// Wait for a run's completion marker
    Wait(WaitArgs),

    /// Upload a directory to S3
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Site URL to back up
    #[arg(long)]
    url: String,

    /// Re-fetch every file, ignoring timestamps
    #[arg(long)]
    force_redownload: bool,

    /// Notification recipient
    #[arg(long)]
    email: Option<String>,

    /// Base log file path; a timestamp is added per run
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Directory the mirror is written under
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Probe for and fetch nodes the mirror missed
    #[arg(long)]
    reconcile: bool,
}

#[derive(Args, Debug)]
struct WaitArgs {
    /// Download directory of the run being waited for
    #[arg(long)]
    download_dir: PathBuf,

    /// Site name, for log lines
    #[arg(long)]
    name: String,

    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Maximum time to wait (seconds)
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Interval between checks (seconds)
    #[arg(long, default_value_t = 5)]
    check_interval: u64,
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Local directory to upload
    #[arg(value_name = "DIRECTORY")]
    directory: PathBuf,

    /// Key prefix ("folder") inside the bucket
    #[arg(long)]
    s3_folder: String,

    /// Bucket name, overriding the config file
    #[arg(long)]
    bucket: Option<String>,

    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Storage class, overriding the config file
    #[arg(long, value_enum)]
    storage_class: Option<StorageClass>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_hash) = match load(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            if let Commands::Run(args) = &cli.command {
                report_unloaded_run(args, &e, cli.verbose, cli.quiet).await;
            }
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run(args) => {
            handle_run(config, config_hash, args, cli.verbose, cli.quiet).await
        }
        Commands::Wait(args) => handle_wait(config, args, cli.verbose, cli.quiet).await,
        Commands::Upload(args) => handle_upload(config, args, cli.verbose, cli.quiet).await,
    }
}

/// Loads the config file if one was given, defaults otherwise
fn load(path: &Option<PathBuf>) -> anyhow::Result<(Config, Option<String>)> {
    let Some(path) = path else {
        return Ok((Config::default(), None));
    };

    let (config, hash) =
        load_config_with_hash(path).with_context(|| format!("reading {}", path.display()))?;
    Ok((config, Some(hash)))
}

fn start_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&PathBuf>,
    config: &Config,
) -> Result<Option<WorkerGuard>, BackupError> {
    init_logging(
        verbose,
        quiet,
        log_file.map(PathBuf::as_path),
        config.logging.retention_days,
    )
}

/// Applies `run` flags on top of the loaded configuration
fn apply_run_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(dir) = &args.download_dir {
        config.mirror.download_dir = dir.clone();
    }
    if let Some(email) = &args.email {
        config.notify.email = Some(email.clone());
    }
    if let Some(log_file) = &args.log_file {
        config.logging.log_file = Some(log_file.clone());
    }
    if args.reconcile {
        config.reconcile.enabled = true;
    }
}

fn mail_notifier(config: &Config) -> Option<MailNotifier> {
    config
        .notify
        .email
        .as_ref()
        .map(|email| MailNotifier::new(config.notify.mail_program.clone(), email.clone()))
}

/// Reports a `run` whose config file could not be loaded
///
/// Defaults plus the command-line flags still say where the marker goes and
/// who gets told, so the waiting side is not left to time out.
async fn report_unloaded_run(args: &RunArgs, error: &anyhow::Error, verbose: u8, quiet: bool) {
    let mut config = Config::default();
    apply_run_overrides(&mut config, args);

    let _guard = start_logging(verbose, quiet, config.logging.log_file.as_ref(), &config)
        .ok()
        .flatten();
    let notifier = mail_notifier(&config);
    let notifier = notifier.as_ref().map(|n| n as &dyn Notifier);

    report_setup_failure(&config, &**error, notifier).await;
}

/// Handles `run`: one complete backup
async fn handle_run(
    mut config: Config,
    config_hash: Option<String>,
    args: RunArgs,
    verbose: u8,
    quiet: bool,
) -> ExitCode {
    apply_run_overrides(&mut config, &args);

    let notifier = mail_notifier(&config);
    let notifier = notifier.as_ref().map(|n| n as &dyn Notifier);

    let _guard = match start_logging(verbose, quiet, config.logging.log_file.as_ref(), &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to setup logging: {}", e);
            report_setup_failure(&config, &e, notifier).await;
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        report_setup_failure(&config, &BackupError::Config(e), notifier).await;
        return ExitCode::FAILURE;
    }

    tracing::info!("Starting backup script");
    if let Some(hash) = config_hash {
        tracing::info!("Configuration loaded (hash: {})", hash);
    }
    tracing::info!("Backing up URL: {}", args.url);

    let options = RunOptions {
        url: args.url,
        mode: if args.force_redownload {
            MirrorMode::ForceRedownload
        } else {
            MirrorMode::Incremental
        },
    };

    match run_backup(&config, &options, notifier).await {
        Ok(report) => {
            if !report.issues.is_empty() {
                tracing::warn!("{} non-critical issues encountered", report.issues.len());
            }
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}

/// Handles `wait`: blocks until the completion marker shows up
async fn handle_wait(config: Config, args: WaitArgs, verbose: u8, quiet: bool) -> ExitCode {
    let log_file = args.log_file.or(config.logging.log_file.clone());
    let _guard = match start_logging(verbose, quiet, log_file.as_ref(), &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to setup logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = WaitOptions {
        timeout_secs: args.timeout,
        check_interval_secs: args.check_interval,
        ..WaitOptions::new(args.download_dir, args.name)
    };

    match wait_for_completion(&options).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            tracing::error!("{}", error_chain(&e));
            ExitCode::from(2)
        }
    }
}

/// Handles `upload`: ships a directory to S3
async fn handle_upload(config: Config, args: UploadArgs, verbose: u8, quiet: bool) -> ExitCode {
    let log_file = args.log_file.or(config.logging.log_file.clone());
    let _guard = match start_logging(verbose, quiet, log_file.as_ref(), &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to setup logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let bucket = args.bucket.unwrap_or(config.upload.bucket);
    let storage_class = args.storage_class.unwrap_or(config.upload.storage_class);

    let store = S3Store::from_env().await;
    if verify_credentials(&store).await.is_err() {
        return ExitCode::FAILURE;
    }

    match upload_directory(
        &store,
        &args.directory,
        &bucket,
        &args.s3_folder,
        storage_class,
    )
    .await
    {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Upload failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
