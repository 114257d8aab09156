use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use map_reduce::{ClusterConfig, JobSummary};
use mutual_friends::stream::{map_stream, reduce_stream};
use mutual_friends::MutualFriends;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Recommends people to befriend, ranked by the number of shared friends.
#[derive(Parser)]
#[command(name = "mutual-friends", version)]
struct Cli {
    /// Verbosity level (-v, -vv). Without it, RUST_LOG picks the filter
    /// and defaults to info; with it, RUST_LOG is ignored
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand adjacency lines on stdin into observation lines on stdout
    Map,
    /// Rank recommendations from observation lines on stdin, in any order
    Reduce {
        /// Keep at most this many recommendations per user
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Run the whole pipeline on the local cluster
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Adjacency list, one `user<TAB>f1,f2,...` line per user
    #[arg(long)]
    input: PathBuf,
    /// Where to write one `user<TAB>r1,r2,...` line per user
    #[arg(long)]
    output: PathBuf,
    /// Cluster config; defaults to ./config.json when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keep at most this many recommendations per user
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long)]
    mappers: Option<usize>,
    #[arg(long)]
    reducers: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let summary = match cli.command {
        Commands::Map => map_stream(io::stdin().lock(), io::stdout().lock())
            .context("mapper failed")?,
        Commands::Reduce { top_n } => {
            reduce_stream(io::stdin().lock(), io::stdout().lock(), top_n)
                .context("reducer failed")?
        }
        Commands::Run(args) => run(args)?,
    };
    report(&summary);
    Ok(())
}

fn run(args: RunArgs) -> Result<JobSummary> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(mappers) = args.mappers {
        config = config.with_mappers(mappers);
    }
    if let Some(reducers) = args.reducers {
        config = config.with_reducers(reducers);
    }

    let cluster = map_reduce::init(config).context("cannot start cluster")?;
    let job = MutualFriends::with_top_n(args.top_n);
    cluster
        .run_mapred(&job, &args.input, &args.output)
        .with_context(|| format!("job over {} failed", args.input.display()))
}

fn load_config(path: Option<&Path>) -> Result<ClusterConfig> {
    let default_path = Path::new("config.json");
    let path = match path {
        Some(path) => path,
        None if default_path.exists() => default_path,
        None => return Ok(ClusterConfig::default()),
    };
    ClusterConfig::load(path)
        .with_context(|| format!("error while opening config file {}", path.display()))
}

fn report(summary: &JobSummary) {
    if summary.error_count() > 0 {
        warn!(%summary, errors = summary.error_count(), "finished with errors");
    } else {
        info!(%summary, "finished");
    }
}

/// An explicit `-v` wins over `RUST_LOG`.
fn log_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(io::stderr)
        .init();
}
