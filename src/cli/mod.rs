use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "chatstats", version, about = "Map-reduce statistics over day-partitioned chat logs")]
pub struct Args {
    /// Root directory of the log files (names must contain YYYY-MM-DD)
    #[arg(long, value_name = "PATH")]
    pub input_dir: Option<String>,

    /// File name glob, default *.html
    #[arg(long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Newline-delimited stop-word list
    #[arg(long, value_name = "PATH")]
    pub stop_words: Option<String>,

    /// Directory receiving <outfile>.txt / <outfile>.png
    #[arg(long, value_name = "PATH")]
    pub output_dir: Option<String>,

    /// Comma-separated job names to run (default: all)
    #[arg(long, value_name = "NAMES")]
    pub jobs: Option<String>,

    /// Total worker threads (default: CPU cores - 2)
    #[arg(long, value_name = "INT")]
    pub workers: Option<usize>,

    /// File ingestion threads (default: min(4, file count))
    #[arg(long, value_name = "INT")]
    pub read_workers: Option<usize>,

    /// Bounded queue capacity between ingestion workers and the collector
    #[arg(long, value_name = "INT", default_value_t = 32)]
    pub queue_cap: usize,

    /// Metrics snapshot interval in seconds, 0 disables periodic snapshots
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    pub metrics_interval: u64,

    /// Optional TOML file with defaults; explicit flags win
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Aggregate but do not write any report files
    #[arg(long, default_value_t = false)]
    pub no_write: bool,
}

pub fn parse() -> Args { Args::parse() }
