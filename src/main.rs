use anyhow::Result;
use chatstats::{cli, config, pipeline, scanner};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = cli::parse();
    let cfg = config::Config::from_args(&args)?;
    tracing::info!(?cfg, "starting chatstats");

    let files = scanner::list_log_files(&cfg.input_dir, &cfg.pattern)?;
    tracing::info!(count = %files.len(), "log files matched");

    let report = pipeline::run(cfg, files)?;
    if report.failure_count() > 0 {
        anyhow::bail!(
            "{} file(s) and {} job(s) failed; see errors above",
            report.file_failures.len(),
            report.job_failures.len()
        );
    }
    Ok(())
}
