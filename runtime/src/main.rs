//! ward-scrape command-line entry point.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ward_scrape::cli::{doctor, gallery_cmd, weekly_cmd};

#[derive(Parser)]
#[command(name = "ward-scrape", version, about = "Ward website scrapers")]
struct Cli {
    /// Machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Only print errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    no_color: bool,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write this week's lesson summary.
    Weekly {
        /// Lesson week (1-52). Defaults to the ISO week of --date or today.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=52))]
        week: Option<u32>,

        /// Pick the week containing this date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        out: Option<PathBuf>,

        /// Manual slug, e.g. come-follow-me-for-home-and-church-old-testament-2026.
        #[arg(long)]
        manual: Option<String>,
    },

    /// Export every unit history story with its full-size images.
    UnitHistory {
        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        zip_name: Option<PathBuf>,

        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Show the browser window.
        #[arg(long)]
        headed: bool,

        /// Re-download stories whose folder already exists.
        #[arg(long)]
        no_skip_existing: bool,

        #[arg(long)]
        no_zip: bool,

        /// Where the storage state is written and read.
        #[arg(long)]
        storage_state: Option<PathBuf>,

        /// Chromium binary to launch.
        #[arg(long)]
        chromium: Option<PathBuf>,
    },

    /// Check that the browser, auth and output locations are ready.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    for (on, var) in [
        (cli.json, "WARD_JSON"),
        (cli.quiet, "WARD_QUIET"),
        (cli.verbose, "WARD_VERBOSE"),
        (cli.no_color, "WARD_NO_COLOR"),
    ] {
        if on {
            std::env::set_var(var, "1");
        }
    }

    init_tracing(&cli);

    let result = match cli.command {
        Command::Weekly {
            week,
            date,
            out,
            manual,
        } => weekly_cmd::run(week, date, out, manual).await,
        Command::UnitHistory {
            out_dir,
            zip_name,
            manifest,
            headed,
            no_skip_existing,
            no_zip,
            storage_state,
            chromium,
        } => {
            gallery_cmd::run(gallery_cmd::GalleryOverrides {
                out_dir,
                zip_name,
                manifest,
                storage_state,
                chromium,
                headed,
                no_skip_existing,
                no_zip,
            })
            .await
        }
        Command::Doctor => doctor::run().await,
    };

    if let Err(e) = result {
        eprintln!("ERROR {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "ward_scrape=debug"
    } else if cli.quiet {
        "ward_scrape=warn"
    } else {
        "ward_scrape=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
