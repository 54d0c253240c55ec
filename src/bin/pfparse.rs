use std::path::PathBuf;
use std::process;
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use pfparse::ParseConfig;
use pfparse::common::reset_sigpipe;

const TOOL_NAME: &str = "pfparse";

#[derive(Parser)]
#[command(
    name = "pfparse",
    version,
    about = "Split FILE into overlapping words at rolling-hash boundaries and write \
             the dictionary (.dict, .occ), the parse (.parse) and the last-char \
             stream (.last, optionally .sai)"
)]
struct Cli {
    /// Sliding window size
    #[arg(short = 'w', long = "window", default_value_t = 10)]
    window: usize,

    /// Modulus used during parsing: a window whose fingerprint is divisible by it ends a word
    #[arg(short = 'p', long = "modulus", default_value_t = 100)]
    modulus: u64,

    /// Number of scanner threads
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,

    /// Number of dictionary shards (0 = 8 per thread)
    #[arg(long = "shards", default_value_t = 0)]
    shards: usize,

    /// Also write the ending position of every word (.sai)
    #[arg(short = 's', long = "sa-info")]
    sa_info: bool,

    /// Maximum number of occurrences of a single dictionary word
    #[arg(long = "max-occ", value_name = "N", default_value_t = u32::MAX)]
    max_occ: u32,

    /// Keep the per-thread intermediate files
    #[arg(short = 'k', long = "keep-temp")]
    keep_temp: bool,

    /// Base name of the output files (defaults to FILE)
    #[arg(short = 'o', long = "output", value_name = "BASE")]
    output: Option<PathBuf>,

    /// Verbosity level (repeat for more detail)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Input file; bytes 0x00..=0x02 are reserved and must not occur
    file: PathBuf,
}

/// RUST_LOG wins; otherwise -v picks info, -vv debug.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::WARN);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = ParseConfig {
        window: cli.window,
        modulus: cli.modulus,
        threads: cli.threads,
        shards: cli.shards,
        sa_info: cli.sa_info,
        max_occurrences: cli.max_occ,
        keep_temp: cli.keep_temp,
    };
    let base = cli.output.clone().unwrap_or_else(|| cli.file.clone());

    info!(
        window = config.window,
        modulus = config.modulus,
        threads = config.threads,
        sa_info = config.sa_info,
        "parsing {}",
        cli.file.display()
    );
    let start = Instant::now();
    let summary = pfparse::run(&cli.file, &base, &config)
        .with_context(|| format!("cannot parse '{}'", cli.file.display()))?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "text length {}, {} words, {} distinct, dictionary {} bytes",
        summary.file_len,
        summary.words,
        summary.distinct_words,
        summary.dict_bytes
    );
    Ok(())
}

fn main() {
    reset_sigpipe();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{}: {:#}", TOOL_NAME, e);
        process::exit(1);
    }
}
