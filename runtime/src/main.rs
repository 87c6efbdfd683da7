// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use chargewatch::DEFAULT_HISTORY_LIMIT;
use chargewatch_runtime::cli::{
    self, analyze_cmd::AnalyzeArgs, output::Output, GlobalOpts,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chargewatch",
    about = "Chargewatch — charging station status monitor and utilization analyzer",
    version,
    after_help = "Run 'chargewatch <command> --help' for details on each command."
)]
struct Cli {
    /// Path to a JSON config file (default: ./config.json, then ~/.chargewatch/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the acquisition scheduler in the foreground
    Run {
        /// Also start the HTTP REST API on this port
        #[arg(long)]
        http_port: Option<u16>,
        /// Minutes between checks (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Serve the REST API only
    Serve {
        /// Listening port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one status check and store the result
    Check,
    /// Show the most recent stored status
    Latest,
    /// Show recent stored statuses, newest first
    History {
        /// Number of rows (clamped to 0..=1000)
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT as i64)]
        limit: i64,
    },
    /// Analyze utilization over a trailing window
    Analyze {
        /// Window length in days
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// Availability percentage that makes an hour "optimal"
        #[arg(long)]
        threshold: Option<f64>,
        /// Hours east of UTC used to bucket hours and weekdays
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        utc_offset: i32,
        /// Also write the insights as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print widget status JSON (remote snapshot, local database, fallback)
    Widget {
        /// URL of the published snapshot file
        #[arg(long)]
        remote: Option<String>,
        /// Database path to probe; repeatable, tried in order
        #[arg(long = "db-candidate")]
        db_candidates: Vec<PathBuf>,
    },
    /// Create the database and a starter config file
    Init,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let opts = GlobalOpts {
        config: cli.config.clone(),
        db: cli.db.clone(),
        output: Output::new(cli.json),
    };

    let result = dispatch(&cli, &opts).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        opts.output.error(e);
        std::process::exit(1);
    }
    result
}

async fn dispatch(cli: &Cli, opts: &GlobalOpts) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "chargewatch", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = opts.load_config()?;
    cli::logging::init(&config.log_level, cli.verbose, cli.log_json);
    let out = opts.output;

    match &cli.command {
        Commands::Run {
            http_port,
            interval,
        } => {
            if let Some(minutes) = interval {
                config.interval_minutes = *minutes;
            }
            cli::run_cmd::run(opts, config, *http_port, cli::shutdown_channel()).await
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = *port;
            }
            cli::run_cmd::serve(config, cli::shutdown_channel()).await
        }
        Commands::Check => cli::store_cmd::check(config, out).await,
        Commands::Latest => cli::store_cmd::latest(&config, out),
        Commands::History { limit } => cli::store_cmd::history(&config, *limit, out),
        Commands::Analyze {
            days,
            threshold,
            utc_offset,
            output,
        } => cli::analyze_cmd::run(
            &config,
            AnalyzeArgs {
                days: *days,
                threshold: *threshold,
                utc_offset_hours: *utc_offset,
                output_file: output.as_deref(),
            },
            out,
        ),
        Commands::Widget {
            remote,
            db_candidates,
        } => {
            let mut candidates = db_candidates.clone();
            if let Some(db) = &opts.db {
                candidates.insert(0, db.clone());
            }
            cli::widget_cmd::run(remote.clone(), candidates, out).await
        }
        Commands::Init => cli::init_cmd::run(&config, opts.config.as_deref(), out),
        Commands::Completions { .. } => Ok(()),
    }
}
