//! The `mathcheck parse` command.

use std::path::PathBuf;

use anyhow::Result;

use mathcheck_core::canonical::Canonicalizer;
use mathcheck_core::config::load_config_from;
use mathcheck_core::normalize::normalize;
use mathcheck_core::parser::parse;

pub fn execute(config_path: Option<PathBuf>, expr: String) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let normalized = normalize(&expr);
    println!("normalized: {normalized}");

    let parsed = match parse(&normalized) {
        Ok(parsed) => parsed,
        Err(e) => anyhow::bail!("parse error: {e}"),
    };
    println!("parsed:     {parsed}");

    let canonicalizer = Canonicalizer::new(config.verifier.max_expansion_terms);
    match canonicalizer.canonicalize(&parsed) {
        Ok(canonical) => println!("canonical:  {canonical}"),
        Err(e) => println!("canonical:  unavailable ({e})"),
    }

    Ok(())
}
