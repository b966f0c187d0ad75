//! The `mathcheck equiv` command.

use std::path::PathBuf;

use anyhow::Result;

use mathcheck_core::config::load_config_from;
use mathcheck_core::equivalence::EquivalenceChecker;

pub fn execute(
    config_path: Option<PathBuf>,
    a: String,
    b: String,
    tolerance: Option<f64>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(tolerance) = tolerance {
        config.verifier.tolerance = tolerance;
        config.verifier.validate()?;
    }

    let checker = EquivalenceChecker::new(&config.verifier);
    match checker.compare(&a, &b) {
        Some(strategy) => println!("equivalent ({strategy})"),
        None => println!("not equivalent"),
    }

    Ok(())
}
