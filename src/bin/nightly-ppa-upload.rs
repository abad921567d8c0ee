//! Nightly PPA upload CLI
//!
//! Uploads the nightly Amarok source packages to the Launchpad PPA

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use nightly_ppa_upload::{
    BuildContext, ConfigLoadOptions, ConfigLoader, DebianToolchain, UploadConfig, UploadError,
    UploadOrchestrator, UploadPlan,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Nightly PPA upload orchestrator
#[derive(Parser)]
#[command(name = "nightly-ppa-upload")]
#[command(version)]
#[command(about = "Upload nightly source packages to a Launchpad PPA", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./.nightly-upload.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and upload the selected packages, then the main package
    Upload {
        #[command(flatten)]
        run: RunArgs,

        /// Print the run report as JSON when the run succeeds
        #[arg(long)]
        json: bool,
    },

    /// Show what an upload would do without touching anything
    Plan {
        #[command(flatten)]
        run: RunArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Directory the per-run directory is created in
    #[arg(long)]
    root: PathBuf,

    /// Exported source tree with one directory per package
    #[arg(long)]
    base: PathBuf,

    /// Distro packaging directory holding <package>-debian trees
    #[arg(long)]
    packaging_dir: PathBuf,

    /// Upload revision for this date
    #[arg(long)]
    revision: u32,

    /// Date stamp (defaults to today, YYYYMMDD in UTC)
    #[arg(long)]
    date: Option<String>,

    /// Comma-separated list of components to upload
    #[arg(long, value_delimiter = ',')]
    packages: Vec<String>,
}

impl RunArgs {
    fn context(&self) -> Result<BuildContext, UploadError> {
        let date = self.date.clone().unwrap_or_else(BuildContext::today);
        BuildContext::new(
            date,
            self.revision,
            &self.root,
            &self.base,
            &self.packaging_dir,
        )
    }

    fn selected(&self) -> Vec<String> {
        self.packages
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("nightly_ppa_upload")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let result = run().await;

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    initialize_logger(cli.debug)?;

    let config = match load_config(cli.config).await {
        Ok(config) => config,
        Err(e) => return Ok(report_failure(&e)),
    };

    match cli.command {
        Commands::Upload { run, json } => upload_command(config, run, json).await,
        Commands::Plan { run, json } => plan_command(config, run, json),
    }
}

async fn load_config(config_path: Option<PathBuf>) -> Result<UploadConfig, UploadError> {
    let options = ConfigLoadOptions {
        config_path,
        search_dir: PathBuf::from("."),
        env: std::env::vars().collect(),
    };
    ConfigLoader::load(options).await
}

async fn upload_command(config: UploadConfig, args: RunArgs, json: bool) -> Result<i32> {
    let context = match args.context() {
        Ok(context) => context,
        Err(e) => return Ok(report_failure(&e)),
    };

    let toolchain = Arc::new(DebianToolchain::from_config(&config));
    let orchestrator = UploadOrchestrator::new(config, toolchain);

    match orchestrator.run(&context, &args.selected()).await {
        Ok(report) => {
            info!(
                "uploaded {} package(s) from {}",
                report.cycles.len(),
                report.run_dir.display()
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(0)
        }
        Err(e) => Ok(report_failure(&e)),
    }
}

fn plan_command(config: UploadConfig, args: RunArgs, json: bool) -> Result<i32> {
    let context = match args.context() {
        Ok(context) => context,
        Err(e) => return Ok(report_failure(&e)),
    };

    let plan = UploadPlan::build(&config, &context, &args.selected());
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", plan.summary());
    }

    Ok(0)
}

fn report_failure(e: &UploadError) -> i32 {
    error!("[{}] {}", e.code(), e);
    for action in e.suggested_actions() {
        error!("  - {}", action);
    }
    1
}
