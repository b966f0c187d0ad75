//! The `mathcheck validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mathcheck_core::config::load_config_from;
use mathcheck_core::question::{load_question_sets, validate_question_set};

pub fn execute(config_path: Option<PathBuf>, question_set_path: PathBuf) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let sets = load_question_sets(&question_set_path)?;

    let mut total_warnings = 0;

    for set in &sets {
        println!(
            "Question set: {} ({} questions, {} parts)",
            set.name,
            set.questions.len(),
            set.part_count()
        );

        let warnings = validate_question_set(set, &config.verifier.no_answer_sentinel);
        for w in &warnings {
            println!("  WARNING: {w}");
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All question sets valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
