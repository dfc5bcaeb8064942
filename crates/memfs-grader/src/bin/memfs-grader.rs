//! memfs-grader binary
//!
//! Runs the built-in scenarios or a syscall script against a fresh
//! in-memory filesystem.
//!
//! ## Usage
//!
//! ```bash
//! memfs-grader list
//! memfs-grader run all
//! memfs-grader run files_unlink --sessions 8
//! memfs-grader script crates/memfs-grader/scripts/unlink_while_open.txt
//! memfs-grader --config memfs.toml --capacity 4096 run filesys_dir
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memfs_grader::{Grader, Report, Scenario, Script, run_parallel};
use memfs_kernel::{FileSystem, FsConfig};
use strum::IntoEnumIterator;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Acceptance harness for the memfs in-memory filesystem.
#[derive(Parser, Debug)]
#[command(name = "memfs-grader")]
#[command(about = "Run filesystem scenarios and syscall scripts against memfs")]
struct Args {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override capacity in bytes
    #[arg(long, global = true)]
    capacity: Option<u64>,

    /// Override the per-session descriptor limit
    #[arg(long, global = true)]
    max_open_files: Option<usize>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a built-in scenario, or `all`
    Run {
        target: String,

        /// Concurrent sessions, each in its own directory
        #[arg(long, default_value_t = 1)]
        sessions: usize,
    },
    /// Run a syscall script
    Script { file: PathBuf },
    /// List built-in scenarios
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<FsConfig> {
    let mut config = match &args.config {
        Some(path) => FsConfig::load(path)?,
        None => FsConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        config = config.with_capacity(capacity);
    }
    if let Some(max_open_files) = args.max_open_files {
        config = config.with_max_open_files(max_open_files);
    }
    config.validate()?;
    Ok(config)
}

/// Returns whether every assertion passed.
async fn run(args: Args) -> Result<bool> {
    let config = load_config(&args)?;

    match &args.command {
        Command::List => {
            for scenario in Scenario::iter() {
                println!("{scenario}");
            }
            Ok(true)
        }
        Command::Run { target, sessions } => {
            let scenarios: Vec<Scenario> = if target == "all" {
                Scenario::iter().collect()
            } else {
                vec![
                    target
                        .parse()
                        .with_context(|| format!("unknown scenario `{target}`"))?,
                ]
            };

            let fs = FileSystem::new(config);
            let mut ok = true;
            for scenario in scenarios {
                let report = run_parallel(&fs, scenario, *sessions).await?;
                ok &= report.is_success();
                print_report(&report, args.json)?;
            }
            tracing::info!(free = fs.free_space(), "finished");
            Ok(ok)
        }
        Command::Script { file } => {
            let script = Script::load(file)?;
            let fs = FileSystem::new(config);
            let mut session = fs.session();
            let mut grader = Grader::new(script.name.clone());

            let outcomes = script.run(&mut session, &mut grader);
            if !args.json {
                for outcome in &outcomes {
                    let mark = if outcome.passed { " " } else { "!" };
                    match &outcome.output {
                        Some(output) => println!(
                            "{mark} {:>4}  {} -> {} {output:?}",
                            outcome.line, outcome.call, outcome.result
                        ),
                        None => println!(
                            "{mark} {:>4}  {} -> {}",
                            outcome.line, outcome.call, outcome.result
                        ),
                    }
                }
            }

            let report = grader.done();
            print_report(&report, args.json)?;
            Ok(report.is_success())
        }
    }
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
