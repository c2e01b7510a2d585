//! Bulk loader CLI for line-oriented time-series telemetry.
//!
//! Loads configuration from (in precedence order): defaults, config file,
//! environment variables (`TSLOAD_*`), and CLI flags. Reads records from a
//! file or stdin, runs the worker pool against the configured store, and
//! prints a throughput summary.
//!
//! The binary ships with a discarding storage sink, which makes it a
//! read-speed benchmark out of the box; a deployment wires a real store by
//! implementing `StoreConnector` and handing it to `run_load`.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use tsload::client::DiscardConnector;
use tsload::runner::{run_load, LoadConfig};

// ---------- CLI ----------

/// Bulk loader for line-oriented time-series telemetry.
#[derive(Parser, Debug)]
#[command(name = "tsload", version, about)]
pub struct Cli {
    /// Path to config file (TOML). If omitted, no file is loaded unless the default path exists.
    #[arg(long, env = "TSLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not load any config file; use defaults + env + CLI only.
    #[arg(long, default_value_t = false)]
    pub no_config: bool,

    /// File name to read data from (stdin when omitted).
    #[arg(long, env = "TSLOAD_FILE")]
    pub file: Option<PathBuf>,

    /// Number of rows to batch together in a single insert.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Number of parallel clients inserting.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Number of rows to insert (0 = all of them).
    #[arg(long)]
    pub limit: Option<u64>,

    /// Whether to write data. Set to false to check input read speed.
    #[arg(long)]
    pub do_load: Option<bool>,

    /// Capacity of each worker's batch channel.
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Period between throughput reports, in seconds (0 disables reporting).
    #[arg(long)]
    pub reporting_period_secs: Option<u64>,

    /// PRNG seed for endpoint shuffling (default: 0, which uses the current timestamp).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Comma-separated storage endpoints (host:port,host:port,...).
    #[arg(long, env = "TSLOAD_ENDPOINTS", value_delimiter = ',')]
    pub endpoints: Option<Vec<String>>,

    /// Load and validate config (file + env + CLI), print the effective settings, then exit.
    #[arg(long, default_value_t = false)]
    pub validate_config: bool,
}

// ---------- File/env config (all optional for partial config) ----------

/// Top-level loader config as read from file + env. Every field optional for layering.
#[derive(Debug, Default, serde::Deserialize)]
pub struct LoaderFileConfig {
    pub file: Option<String>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub limit: Option<u64>,
    pub do_load: Option<bool>,
    pub channel_capacity: Option<usize>,
    pub reporting_period_secs: Option<u64>,
    pub seed: Option<u64>,
    pub endpoints: Option<Vec<String>>,
    pub buffer_capacity: Option<usize>,
}

/// Load merged config plus the input file path. CLI overrides file/env.
fn load_loader_config(cli: &Cli) -> Result<(LoadConfig, Option<PathBuf>), String> {
    let mut builder = Config::builder();

    if !cli.no_config {
        if let Some(ref path) = cli.config {
            if !path.exists() {
                return Err(format!("config file not found: {}", path.display()));
            }
            builder = builder.add_source(File::from(path.as_path()).required(false));
        } else {
            let default_path = PathBuf::from("tsload.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path.as_path()).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("TSLOAD")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true)
            .list_separator(",")
            .with_list_parse_key("endpoints"),
    );

    let merged = builder.build().map_err(|e| e.to_string())?;
    let partial: LoaderFileConfig = merged.try_deserialize().map_err(|e| e.to_string())?;

    let mut load_config = LoadConfig::default();
    merge_into_load_config(&mut load_config, &partial);
    merge_cli_overrides(&mut load_config, cli);

    let input = cli
        .file
        .clone()
        .or_else(|| partial.file.as_ref().map(PathBuf::from));

    Ok((load_config, input))
}

/// Merge file/env partial config onto `LoadConfig`. Only overwrites fields that are `Some`.
fn merge_into_load_config(base: &mut LoadConfig, partial: &LoaderFileConfig) {
    if let Some(n) = partial.batch_size {
        base.batch_size = n;
    }
    if let Some(n) = partial.workers {
        base.workers = n;
    }
    if let Some(n) = partial.limit {
        base.limit = row_limit(n);
    }
    if let Some(b) = partial.do_load {
        base.do_load = b;
    }
    if let Some(n) = partial.channel_capacity {
        base.channel_capacity = n;
    }
    if let Some(secs) = partial.reporting_period_secs {
        base.reporting_interval = Duration::from_secs(secs);
    }
    if let Some(seed) = partial.seed {
        base.seed = Some(seed);
    }
    if let Some(ref endpoints) = partial.endpoints {
        base.endpoints = endpoints.clone();
    }
    if let Some(n) = partial.buffer_capacity {
        base.buffer_capacity = n;
    }
}

fn merge_cli_overrides(base: &mut LoadConfig, cli: &Cli) {
    if let Some(n) = cli.batch_size {
        base.batch_size = n;
    }
    if let Some(n) = cli.workers {
        base.workers = n;
    }
    if let Some(n) = cli.limit {
        base.limit = row_limit(n);
    }
    if let Some(b) = cli.do_load {
        base.do_load = b;
    }
    if let Some(n) = cli.channel_capacity {
        base.channel_capacity = n;
    }
    if let Some(secs) = cli.reporting_period_secs {
        base.reporting_interval = Duration::from_secs(secs);
    }
    if let Some(seed) = cli.seed {
        base.seed = Some(seed);
    }
    if let Some(ref endpoints) = cli.endpoints {
        base.endpoints = endpoints.clone();
    }
}

/// A limit of 0 means "all of them".
fn row_limit(n: u64) -> Option<u64> {
    if n == 0 {
        None
    } else {
        Some(n)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let (config, input) = match load_loader_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("tsload: {}", e);
            std::process::exit(2);
        }
    };

    if cli.validate_config {
        println!(
            "workers={} batch_size={} limit={:?} do_load={} endpoints={:?} file={:?}",
            config.workers, config.batch_size, config.limit, config.do_load, config.endpoints, input
        );
        return;
    }

    let connector = Arc::new(DiscardConnector);
    let result = match input {
        Some(ref path) => match std::fs::File::open(path) {
            Ok(file) => run_load(&config, BufReader::new(file), connector),
            Err(e) => {
                eprintln!("tsload: cannot open {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => run_load(&config, io::stdin().lock(), connector),
    };

    match result {
        Ok(summary) => {
            println!(
                "loaded {} metrics and {} rows in {} batches over {:.3}s ({:.0} metrics/sec)",
                summary.metrics,
                summary.rows,
                summary.batches,
                summary.elapsed.as_secs_f64(),
                summary.metrics_per_sec()
            );
        }
        Err(e) => {
            log::error!("load failed: {}", e);
            std::process::exit(1);
        }
    }
}
