//! route-tabs CLI: daily status-tab pages for bus routes
//!
//! Usage:
//!   route-tabs publish [--config F] [--routes-file F] [--force]   Publish to the output branch
//!   route-tabs render --out DIR [--routes-file F] [--force]       Render the site into a directory
//!   route-tabs plan <route> [--date YYYY-MM-DD]                   Print one route's tab plan

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use route_tabs::window::{london_today, ScheduleWindow};
use route_tabs::{
    init_logging, open_plan_for_route, run, token_from_env, FileRouteSource, GitHubStore,
    LocalDirStore, PublishConfig, RepoSlug, RouteId, RunOptions, RunOutcome,
};

#[derive(Parser)]
#[command(
    name = "route-tabs",
    about = "route-tabs: daily status-tab pages for bus routes",
    version,
    long_about = "Generates one page per route that opens the live, per-day and weekend\nstatus lookups in order, and publishes them with an index to a Git branch."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// JSON config file (all fields optional)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read routes from a local file instead of the source branch
    #[arg(long)]
    routes_file: Option<PathBuf>,
    /// Run even if today's success marker is present
    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and publish the site to the output branch
    Publish {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Generate the site into a local directory
    Render {
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Print the tab plan for a single route
    Plan {
        /// Route identifier (e.g. 24, N29, SL10)
        route: String,
        /// Day the window starts on (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// JSON config file (all fields optional)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PublishConfig> {
    match path {
        Some(p) => Ok(PublishConfig::load(p)?),
        None => Ok(PublishConfig::default()),
    }
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Skipped { date } => {
            println!("Skip: already succeeded today ({}).", date);
        }
        RunOutcome::Published(receipt) => {
            println!(
                "OK: published {} files to {}: {}",
                receipt.files, receipt.target, receipt.revision
            );
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Publish { args } => {
            let config = load_config(args.config.as_ref())?;
            let repo = RepoSlug::detect()?;
            let store = GitHubStore::new(repo, &config, token_from_env());
            let now = Utc::now().with_timezone(&config.timezone);
            let options = RunOptions { force: args.force };

            let outcome = match &args.routes_file {
                Some(path) => {
                    run(&store, &FileRouteSource::new(path), &config, now, options).await
                }
                None => run(&store, &store, &config, now, options).await,
            }
            .context("publish failed")?;
            report(&outcome);
        }
        Commands::Render { out, args } => {
            let config = load_config(args.config.as_ref())?;
            let store = LocalDirStore::new(out, config.state_path.clone());
            let routes_path = args
                .routes_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.route_file_path));
            let now = Utc::now().with_timezone(&config.timezone);

            let outcome = run(
                &store,
                &FileRouteSource::new(routes_path),
                &config,
                now,
                RunOptions { force: args.force },
            )
            .await
            .context("render failed")?;
            report(&outcome);
        }
        Commands::Plan { route, date, config } => {
            let config = load_config(config.as_ref())?;
            let route = RouteId::new(route).context("route must not be blank")?;
            let today = date.unwrap_or_else(|| {
                london_today(&Utc::now().with_timezone(&config.timezone))
            });
            let window = ScheduleWindow::rolling(today, config.window_days);

            for entry in open_plan_for_route(&route, &window, today) {
                println!("{:>6} ms  {}", entry.delay_ms, entry.label);
                println!("           {}", entry.url);
            }
        }
    }

    Ok(())
}
