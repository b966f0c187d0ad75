//! The `mathcheck init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mathcheck.toml").exists() {
        println!("mathcheck.toml already exists, skipping.");
    } else {
        std::fs::write("mathcheck.toml", SAMPLE_CONFIG)?;
        println!("Created mathcheck.toml");
    }

    std::fs::create_dir_all("question-sets")?;
    let example_path = std::path::Path::new("question-sets/example.toml");
    if example_path.exists() {
        println!("question-sets/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUESTION_SET)?;
        println!("Created question-sets/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: mathcheck validate --question-set question-sets/example.toml");
    println!(
        "  2. Run: mathcheck check --question-set question-sets/example.toml \
         --question roots --part a --input 3 --input -3"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mathcheck configuration

[verifier]
# Absolute tolerance for numeric comparison.
tolerance = 0.02
# "greedy" or "optimal"
matching = "greedy"
no_answer_sentinel = "<none>"
sample_free_symbols = true
max_expansion_terms = 256

[grading]
parallelism = 4
# timeout_ms = 60000
output_dir = "./mathcheck-results"
"#;

const EXAMPLE_QUESTION_SET: &str = r#"[question_set]
id = "example"
name = "Example Question Set"
description = "A small question set to get started"

[[questions]]
id = "roots"
title = "Solve x^2 = 9"
topic = "quadratics"

[[questions.parts]]
id = "a"
prompt = "Give both solutions, in any order."
slots = [["3", "-3"], ["3", "-3"]]

[[questions]]
id = "simplify"
title = "Simplify 2/4"

[[questions.parts]]
id = "a"
prompt = "Write the simplified value."
slots = [{ alternatives = ['\frac{1}{2}', "0.5"] }]
"#;
