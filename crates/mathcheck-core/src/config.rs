//! Verifier and grading configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Absolute tolerance for numeric equality.
///
/// Loose enough to forgive truncated irrational decimals (`3.14` for `π`),
/// at the cost of accepting a wrong answer that lands within 0.02 of the
/// right one.
pub const DEFAULT_TOLERANCE: f64 = 0.02;

/// Alternative marking a slot that needs no answer (diagram or narrative parts).
pub const DEFAULT_NO_ANSWER_SENTINEL: &str = "<none>";

/// How inputs are assigned to pooled alternatives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// First unconsumed equivalent alternative, slot by slot.
    #[default]
    Greedy,
    /// Maximum bipartite matching over all slots.
    Optimal,
}

impl FromStr for MatchStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(MatchStrategy::Greedy),
            "optimal" => Ok(MatchStrategy::Optimal),
            other => anyhow::bail!("unknown matching strategy '{other}' (expected greedy or optimal)"),
        }
    }
}

/// Settings that change grading outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Absolute tolerance for the numeric fallback.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub matching: MatchStrategy,
    #[serde(default = "default_sentinel")]
    pub no_answer_sentinel: String,
    /// Compare expressions with free symbols at sample points.
    #[serde(default = "default_true")]
    pub sample_free_symbols: bool,
    /// Term cap for symbolic expansion.
    #[serde(default = "default_max_terms")]
    pub max_expansion_terms: usize,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}
fn default_sentinel() -> String {
    DEFAULT_NO_ANSWER_SENTINEL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_terms() -> usize {
    256
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            matching: MatchStrategy::default(),
            no_answer_sentinel: default_sentinel(),
            sample_free_symbols: true,
            max_expansion_terms: default_max_terms(),
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            anyhow::bail!(
                "tolerance must be a finite, non-negative number (got {})",
                self.tolerance
            );
        }
        if self.max_expansion_terms == 0 {
            anyhow::bail!("max_expansion_terms must be at least 1");
        }
        if self.no_answer_sentinel.trim().is_empty() {
            anyhow::bail!("no_answer_sentinel must not be empty");
        }
        Ok(())
    }
}

/// Batch grading defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Max submissions graded at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Overall batch timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Output directory for batch reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./mathcheck-results")
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_ms: None,
            output_dir: default_output_dir(),
        }
    }
}

/// Top-level mathcheck configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathcheckConfig {
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub grading: GradingConfig,
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mathcheck.toml` in the current directory
/// 2. `~/.config/mathcheck/config.toml`
///
/// Environment variable overrides: `MATHCHECK_TOLERANCE`, `MATHCHECK_MATCHING`.
pub fn load_config() -> Result<MathcheckConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MathcheckConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("mathcheck.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MathcheckConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MathcheckConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    config.verifier.validate().context("invalid verifier config")?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut MathcheckConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = lookup("MATHCHECK_TOLERANCE") {
        config.verifier.tolerance = raw
            .trim()
            .parse()
            .with_context(|| format!("MATHCHECK_TOLERANCE is not a number: '{raw}'"))?;
    }
    if let Some(raw) = lookup("MATHCHECK_MATCHING") {
        config.verifier.matching = raw.parse().context("invalid MATHCHECK_MATCHING")?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mathcheck"))
}
