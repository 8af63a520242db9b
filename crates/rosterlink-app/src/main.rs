// rosterlink entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config (copying defaults on first run)
// 3. Run every linkage job
// 4. Print per-job matched/unmatched counts

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rosterlink_app::{config, run};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset: the binary and both crates at info,
/// dependencies (reqwest, hyper) at warn.
const DEFAULT_LOG_FILTER: &str = "rosterlink=info,rosterlink_app=info,rosterlink_core=info,warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let log_path = init_tracing(&base_dir.join("logs"))?;
    info!("rosterlink starting up in {}", base_dir.display());

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: roster={}, {} jobs, {} exceptions",
        config.roster.path,
        config.jobs.len(),
        config.exceptions.len()
    );

    let summary = run::run(&config, &base_dir).await?;

    for job in &summary.jobs {
        println!(
            "{}: {} matched, {} unmatched ({} scraped, {} pages failed)",
            job.name, job.matched, job.unmatched, job.scraped, job.pages_failed
        );
    }
    println!(
        "outputs written to {}, log at {}",
        base_dir.join(&config.output.dir).display(),
        log_path.display()
    );

    info!("rosterlink finished");
    Ok(())
}

/// Send tracing output to `<log_dir>/rosterlink.log`, truncated each run.
/// Stdout stays reserved for the per-job counts.
fn init_tracing(log_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("rosterlink.log");
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(log_path)
}
