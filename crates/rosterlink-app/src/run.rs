// Run orchestration: load the roster once, then execute every configured
// linkage job and write its outputs plus a combined summary.

use std::path::Path;

use anyhow::Context;
use rosterlink_core::{CandidateIndex, CanonicalPlayer, FuzzyMatcher, NameNormalizer, Position, Reconciler};
use tracing::{info, warn};

use crate::config::{Config, JobConfig};
use crate::output::{self, JobSummary, OutputColumns, RunSummary};
use crate::pages;
use crate::roster::{self, Roster};

pub const SUMMARY_FILE: &str = "summary.json";

/// Execute every job in `config`. Relative paths (roster, pages, output dir)
/// resolve against `base_dir`.
pub async fn run(config: &Config, base_dir: &Path) -> anyhow::Result<RunSummary> {
    let roster = roster::load_roster(base_dir, &config.roster)
        .context("failed to load canonical roster")?;

    let mut jobs = Vec::with_capacity(config.jobs.len());
    for job in &config.jobs {
        let summary = run_job(config, job, &roster, base_dir)
            .await
            .with_context(|| format!("job '{}' failed", job.name))?;
        jobs.push(summary);
    }

    let summary = RunSummary {
        run_at: chrono::Local::now().to_rfc3339(),
        jobs,
    };
    let summary_path = base_dir.join(&config.output.dir).join(SUMMARY_FILE);
    output::write_summary(&summary_path, &summary).context("failed to write run summary")?;
    info!("run summary written to {}", summary_path.display());

    Ok(summary)
}

/// Build the per-job normalizer from the job's rule and, when enabled, the
/// configured exception table.
pub fn normalizer_for(config: &Config, job: &JobConfig) -> NameNormalizer {
    let normalizer = NameNormalizer::new(job.shorten_rule());
    if job.use_exceptions {
        normalizer.with_exceptions(config.exception_table())
    } else {
        normalizer
    }
}

/// Roster players whose primary position is in `positions`, or every player
/// when `positions` is empty.
pub fn candidates_for(roster: &Roster, position_column: &str, positions: &[Position]) -> Vec<CanonicalPlayer> {
    roster
        .players
        .iter()
        .filter(|p| {
            positions.is_empty()
                || positions.contains(&Position::primary(p.attribute(position_column).unwrap_or("")))
        })
        .cloned()
        .collect()
}

pub async fn run_job(
    config: &Config,
    job: &JobConfig,
    roster: &Roster,
    base_dir: &Path,
) -> anyhow::Result<JobSummary> {
    info!("job '{}': threshold {}, rule {:?}", job.name, job.threshold, job.rule);

    let threshold = job.threshold()?;
    let normalizer = normalizer_for(config, job);
    let candidates = candidates_for(roster, &config.roster.position_column, &job.position_filter());
    if !job.positions.is_empty() {
        info!(
            "job '{}': {} of {} roster players at {}",
            job.name,
            candidates.len(),
            roster.players.len(),
            job.positions.join("/")
        );
    }
    let roster_players = candidates.len();
    let index = CandidateIndex::build(candidates, &normalizer);
    for collision in index.collisions() {
        warn!(
            "job '{}': key '{}' shared by '{}' and '{}'; keeping '{}'",
            job.name, collision.key, collision.kept, collision.dropped, collision.kept
        );
    }
    let matcher = FuzzyMatcher::new(threshold).with_initial_expansion(job.expand_initials);

    let source = pages::source_for_job(job, base_dir)
        .with_context(|| format!("failed to build page source for job '{}'", job.name))?;
    let collected = pages::collect(source.as_ref()).await;
    let scraped = collected.records.len();

    let mut result = Reconciler::new(&index, &normalizer, &matcher).reconcile(collected.records);
    if config.output.order_by_position {
        result.order_by_position(&config.roster.position_column);
    }

    let out_dir = base_dir.join(&config.output.dir);
    let columns = OutputColumns {
        name_column: &config.roster.name_column,
        attribute_columns: &roster.attribute_columns,
        value_columns: &job.value_columns,
    };
    output::write_joined(&out_dir.join(format!("{}_joined.csv", job.name)), &result, &columns)?;
    output::write_unmatched(&out_dir.join(format!("{}_unmatched.csv", job.name)), &result, &columns)?;

    let summary = JobSummary {
        name: job.name.clone(),
        threshold: threshold.value(),
        roster_players,
        key_collisions: index.collisions().len(),
        pages_loaded: collected.pages_loaded,
        pages_failed: collected.pages_failed,
        scraped,
        matched: result.matched_count(),
        unmatched: result.unmatched_count(),
        repeat_matches: result.repeat_matches(),
        by_position: result
            .position_counts(&config.roster.position_column)
            .into_iter()
            .map(|(pos, n)| (pos.to_string(), n))
            .collect(),
    };
    info!(
        "job '{}': {} matched, {} unmatched of {} scraped",
        job.name, summary.matched, summary.unmatched, summary.scraped
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
