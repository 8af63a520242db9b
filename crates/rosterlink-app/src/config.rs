// Configuration loading and parsing (reconcile.toml, exceptions.toml).

use rosterlink_core::{ExceptionTable, Position, ShortenRule, Threshold};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const RECONCILE_FILE: &str = "reconcile.toml";
pub const EXCEPTIONS_FILE: &str = "exceptions.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub roster: RosterConfig,
    pub output: OutputConfig,
    pub jobs: Vec<JobConfig>,
    /// Raw name -> normalized key overrides from exceptions.toml.
    pub exceptions: BTreeMap<String, String>,
}

impl Config {
    pub fn exception_table(&self) -> ExceptionTable {
        self.exceptions.iter().collect()
    }
}

// ---------------------------------------------------------------------------
// reconcile.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire reconcile.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ReconcileFile {
    roster: RosterConfig,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    pub path: String,
    #[serde(default = "default_player_column")]
    pub name_column: String,
    #[serde(default = "default_position_column")]
    pub position_column: String,
    #[serde(default = "default_minutes_column")]
    pub minutes_column: String,
    /// Keep only players with strictly more minutes than this.
    #[serde(default)]
    pub min_minutes: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// Reorder joined rows into GK, DF, MF, FW buckets before writing.
    #[serde(default)]
    pub order_by_position: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            order_by_position: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    LeadingTokens,
    FirstLast,
}

/// One linkage call site: a page source, how to read it, and how strictly to
/// match it.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub threshold: u32,
    #[serde(default = "default_rule")]
    pub rule: RuleKind,
    #[serde(default = "default_leading_tokens")]
    pub leading_tokens: usize,
    #[serde(default)]
    pub use_exceptions: bool,
    #[serde(default = "default_true")]
    pub expand_initials: bool,
    #[serde(default = "default_player_column")]
    pub name_column: String,
    pub value_columns: Vec<String>,
    /// Primary position codes (GK, DF, MF, FW) the roster is narrowed to
    /// before matching. Empty means the whole roster.
    #[serde(default)]
    pub positions: Vec<String>,
    pub source: SourceConfig,
}

impl JobConfig {
    pub fn shorten_rule(&self) -> ShortenRule {
        match self.rule {
            RuleKind::LeadingTokens => ShortenRule::LeadingTokens(self.leading_tokens),
            RuleKind::FirstLast => ShortenRule::FirstLast,
        }
    }

    /// Parsed `positions`. Codes `validate` would reject are dropped.
    pub fn position_filter(&self) -> Vec<Position> {
        self.positions.iter().filter_map(|code| Position::from_code(code)).collect()
    }

    /// Validated threshold. `validate` has already checked the range for
    /// configs produced by `load_config_from`.
    pub fn threshold(&self) -> Result<Threshold, ConfigError> {
        Threshold::new(self.threshold).map_err(|e| ConfigError::ValidationError {
            field: format!("jobs.{}.threshold", self.name),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Local CSV files, one page each, read in order.
    Files { paths: Vec<String> },
    /// CSV pages served over HTTP; `{page}` in the template is replaced with
    /// each number in `first_page..=last_page`.
    Http {
        url_template: String,
        first_page: u32,
        last_page: u32,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

// ---------------------------------------------------------------------------
// exceptions.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
struct ExceptionsFile {
    #[serde(default)]
    exceptions: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_player_column() -> String {
    "Player".into()
}

fn default_position_column() -> String {
    "Position".into()
}

fn default_minutes_column() -> String {
    "Minutes".into()
}

fn default_output_dir() -> String {
    "output".into()
}

fn default_rule() -> RuleKind {
    RuleKind::LeadingTokens
}

fn default_leading_tokens() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/reconcile.toml` and
/// (optionally) `config/exceptions.toml`, relative to `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- reconcile.toml (required) ---
    let reconcile_path = config_dir.join(RECONCILE_FILE);
    let reconcile_text = read_file(&reconcile_path)?;
    let reconcile: ReconcileFile =
        toml::from_str(&reconcile_text).map_err(|e| ConfigError::ParseError {
            path: reconcile_path.clone(),
            source: e,
        })?;

    // --- exceptions.toml (optional) ---
    let exceptions_path = config_dir.join(EXCEPTIONS_FILE);
    let exceptions = if exceptions_path.exists() {
        let text = read_file(&exceptions_path)?;
        let file: ExceptionsFile =
            toml::from_str(&text).map_err(|e| ConfigError::ParseError {
                path: exceptions_path.clone(),
                source: e,
            })?;
        file.exceptions
    } else {
        BTreeMap::new()
    };

    let config = Config {
        roster: reconcile.roster,
        output: reconcile.output,
        jobs: reconcile.jobs,
        exceptions,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` from `defaults/` with whichever of `reconcile.toml` and
/// `exceptions.toml` it lacks. Existing config files are never overwritten.
/// Returns the files that were copied.
///
/// Fails only when `reconcile.toml` is in neither directory; a missing
/// exceptions default is not an error.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let copy_error = |message: String| ConfigError::DefaultsCopyError { message };

    let mut copied = Vec::new();
    for name in [RECONCILE_FILE, EXCEPTIONS_FILE] {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.exists() {
            if name == RECONCILE_FILE {
                return Err(copy_error(format!(
                    "{name} found in neither {} nor {}",
                    config_dir.display(),
                    defaults_dir.display()
                )));
            }
            continue;
        }

        std::fs::create_dir_all(&config_dir)
            .map_err(|e| copy_error(format!("failed to create {}: {e}", config_dir.display())))?;
        std::fs::copy(&source, &target)
            .map_err(|e| copy_error(format!("failed to copy {}: {e}", source.display())))?;
        info!("seeded {} from {}", target.display(), source.display());
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.roster.path.trim().is_empty() {
        return Err(invalid("roster.path", "must not be empty"));
    }
    if config.roster.name_column.trim().is_empty() {
        return Err(invalid("roster.name_column", "must not be empty"));
    }
    if let Some(min) = config.roster.min_minutes {
        if !min.is_finite() || min < 0.0 {
            return Err(invalid(
                "roster.min_minutes",
                format!("must be a non-negative number, got {min}"),
            ));
        }
    }

    if config.jobs.is_empty() {
        return Err(invalid("jobs", "at least one [[jobs]] entry is required"));
    }

    let mut names = HashSet::new();
    for job in &config.jobs {
        let prefix = format!("jobs.{}", job.name);

        if job.name.trim().is_empty() {
            return Err(invalid("jobs.name", "must not be empty"));
        }
        if !names.insert(job.name.as_str()) {
            return Err(invalid("jobs.name", format!("duplicate job name '{}'", job.name)));
        }
        job.threshold()?;
        if job.rule == RuleKind::LeadingTokens && job.leading_tokens == 0 {
            return Err(invalid(format!("{prefix}.leading_tokens"), "must be > 0"));
        }
        if job.value_columns.is_empty() {
            return Err(invalid(
                format!("{prefix}.value_columns"),
                "at least one value column is required",
            ));
        }
        if let Some(bad) = job.positions.iter().find(|code| Position::from_code(code).is_none()) {
            return Err(invalid(
                format!("{prefix}.positions"),
                format!("unknown position '{bad}', expected GK, DF, MF or FW"),
            ));
        }

        match &job.source {
            SourceConfig::Files { paths } => {
                if paths.is_empty() {
                    return Err(invalid(format!("{prefix}.source.paths"), "must not be empty"));
                }
            }
            SourceConfig::Http {
                url_template,
                first_page,
                last_page,
                timeout_secs,
            } => {
                if !url_template.contains("{page}") {
                    return Err(invalid(
                        format!("{prefix}.source.url_template"),
                        "must contain a {page} placeholder",
                    ));
                }
                if first_page > last_page {
                    return Err(invalid(
                        format!("{prefix}.source.first_page"),
                        format!("must be <= last_page ({first_page} > {last_page})"),
                    ));
                }
                if *timeout_secs == 0 {
                    return Err(invalid(format!("{prefix}.source.timeout_secs"), "must be > 0"));
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
