//! The `mathcheck check` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mathcheck_core::config::load_config_from;
use mathcheck_core::model::{MatchResult, SlotStatus};
use mathcheck_core::question::parse_question_set;
use mathcheck_core::verify::Verifier;

pub fn execute(
    config_path: Option<PathBuf>,
    question_set_path: PathBuf,
    question_id: String,
    part_id: String,
    inputs: Vec<String>,
    json: bool,
    fail_on_wrong: bool,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let set = parse_question_set(&question_set_path)?;

    let Some(part) = set.find_part(&question_id, &part_id) else {
        anyhow::bail!(
            "question part {question_id}/{part_id} not found in {}",
            set.id
        );
    };
    anyhow::ensure!(
        !part.self_assessed,
        "question part {question_id}/{part_id} is self-assessed"
    );

    let verifier = Verifier::new(config.verifier);
    let result = verifier.verify(&inputs, &part.slots);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_table(&result);
    }

    if fail_on_wrong && !result.passed {
        std::process::exit(1);
    }

    Ok(())
}

fn print_table(result: &MatchResult) {
    let mut table = Table::new();
    table.set_header(vec!["Slot", "Input", "Outcome", "Credited as", "Strategy"]);

    for outcome in &result.slots {
        let input = outcome.input.as_deref().unwrap_or("-");
        let (label, credited, strategy) = match &outcome.status {
            SlotStatus::Matched {
                value, strategy, ..
            } => ("matched", value.clone(), strategy.to_string()),
            SlotStatus::Unmatched => ("unmatched", String::new(), String::new()),
            SlotStatus::NotRequired => ("not required", String::new(), String::new()),
        };
        table.add_row(vec![
            Cell::new(outcome.slot + 1),
            Cell::new(input),
            Cell::new(label),
            Cell::new(credited),
            Cell::new(strategy),
        ]);
    }

    println!("{table}");
    if let Some(mismatch) = &result.mismatch {
        println!("{mismatch}");
    }
    println!("{}", if result.passed { "PASS" } else { "FAIL" });
}
