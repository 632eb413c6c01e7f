use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use launchpad_mp::cache::Cache;
use launchpad_mp::config::Config;
use launchpad_mp::launchpad::LaunchpadSession;
use launchpad_mp::loader::{self, LoadOptions, ProposalSource};
use launchpad_mp::{aggregate_file_stats, resolve_comments, RawInlineComment};

#[derive(Parser, Debug)]
#[command(name = "lpmp")]
#[command(about = "Launchpad merge proposals with inline comments mapped onto files and lines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Force refresh, ignore cached listings
    #[arg(long, global = true)]
    refresh: bool,

    /// Listing cache TTL in seconds (default from config: 300)
    #[arg(long, global = true)]
    cache_ttl: Option<u64>,

    /// Launchpad API root (e.g. https://api.staging.launchpad.net/devel/)
    #[arg(long, global = true)]
    api_root: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List merge proposals of a user or project
    #[command(group(ArgGroup::new("source").required(true).args(["user", "me", "project"])))]
    Mps {
        #[arg(long)]
        user: Option<String>,

        /// The authenticated user
        #[arg(long)]
        me: bool,

        #[arg(long)]
        project: Option<String>,

        /// Include preview diffs with resolved inline comments
        #[arg(long)]
        diffs: bool,
    },
    /// Show one merge proposal
    Mp {
        /// Merge proposal web link
        url: String,

        #[arg(long)]
        diffs: bool,
    },
    /// Map inline comments (JSON list with 1-based `diff_line`) onto a diff file
    Resolve {
        #[arg(long)]
        diff: PathBuf,

        #[arg(long)]
        comments: PathBuf,
    },
    /// Per-file added/deleted counts and status of a diff file
    Stats {
        #[arg(long)]
        diff: PathBuf,
    },
    /// Pre-change contents of the files touched by a preview diff
    BaseFiles {
        url: String,

        /// Preview diff id (default: the newest)
        #[arg(long)]
        diff_id: Option<u64>,
    },
    /// Latest general comment created on a date
    LatestComment {
        url: String,

        /// MM/DD/YYYY
        #[arg(long)]
        date: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // offline commands need neither config nor network
    match &cli.command {
        Commands::Resolve { diff, comments } => {
            let diff = read_file(diff)?;
            let raw: Vec<RawInlineComment> = serde_json::from_str(&read_file(comments)?)
                .context("Failed to parse comments JSON")?;
            return print_json(&resolve_comments(raw, &diff)?);
        }
        Commands::Stats { diff } => {
            return print_json(&aggregate_file_stats(&read_file(diff)?)?);
        }
        _ => {}
    }

    let config = Config::load()?;
    let api_root = cli
        .api_root
        .as_deref()
        .unwrap_or(config.launchpad.api_root.as_str());
    let session = LaunchpadSession::new(api_root, config.credentials());
    let cache = Cache::new(Cache::default_dir());

    let options = |fetch_diffs: bool| LoadOptions {
        fetch_diffs,
        review: config.review.clone(),
        line_base: config.diff.service_line_base,
        cache: config.cache.enabled.then(|| cache.clone()),
        refresh: cli.refresh,
        cache_ttl: cli.cache_ttl.unwrap_or(config.cache.ttl_secs),
    };

    match &cli.command {
        Commands::Mps {
            user,
            me,
            project,
            diffs,
        } => {
            let source = match (user, project) {
                (Some(user), _) => ProposalSource::User(user.clone()),
                (_, Some(project)) => ProposalSource::Project(project.clone()),
                _ if *me => {
                    if !session.is_authenticated() {
                        anyhow::bail!(
                            "--me needs OAuth credentials (LP_OAUTH_TOKEN and LP_OAUTH_TOKEN_SECRET)"
                        );
                    }
                    ProposalSource::Me
                }
                _ => anyhow::bail!("one of --user, --me or --project is required"),
            };
            let mps = loader::merge_proposals(&session, &source, &options(*diffs)).await?;
            print_json(&mps)
        }
        Commands::Mp { url, diffs } => {
            let mp = loader::merge_proposal_from_url(&session, url, &options(*diffs)).await?;
            print_json(&mp)
        }
        Commands::BaseFiles { url, diff_id } => {
            let files = loader::base_files(&session, url, *diff_id, &cache).await?;
            print_json(&files)
        }
        Commands::LatestComment { url, date } => {
            let comment = loader::latest_comment(&session, url, date).await?;
            print_json(&comment)
        }
        Commands::Resolve { .. } | Commands::Stats { .. } => Ok(()),
    }
}
