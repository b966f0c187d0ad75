//! TOML question set loader.
//!
//! Loads question sets from TOML files and directories, and validates them.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerAlternative, AnswerSlot, Question, QuestionPart, QuestionSet};
use crate::normalize::normalize;
use crate::parser::parse_notation;

/// Intermediate TOML structure for parsing question set files.
#[derive(Debug, Deserialize)]
struct TomlQuestionFile {
    question_set: TomlQuestionSetHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestionSetHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    parts: Vec<TomlPart>,
}

#[derive(Debug, Deserialize)]
struct TomlPart {
    id: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    slots: Vec<AnswerSlot>,
    #[serde(default)]
    self_assessed: bool,
}

/// Parse a single TOML file into a `QuestionSet`.
pub fn parse_question_set(path: &Path) -> Result<QuestionSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question set file: {}", path.display()))?;

    parse_question_set_str(&content, path)
}

/// Parse a TOML string into a `QuestionSet`.
pub fn parse_question_set_str(content: &str, source_path: &Path) -> Result<QuestionSet> {
    let parsed: TomlQuestionFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            title: q.title,
            topic: q.topic,
            parts: q
                .parts
                .into_iter()
                .map(|p| QuestionPart {
                    id: p.id,
                    prompt: p.prompt,
                    slots: p.slots,
                    self_assessed: p.self_assessed,
                })
                .collect(),
        })
        .collect();

    Ok(QuestionSet {
        id: parsed.question_set.id,
        name: parsed.question_set.name,
        description: parsed.question_set.description,
        questions,
    })
}

/// Load a question set from a file, or every set under a directory.
pub fn load_question_sets(path: &Path) -> Result<Vec<QuestionSet>> {
    if path.is_dir() {
        load_question_directory(path)
    } else {
        Ok(vec![parse_question_set(path)?])
    }
}

/// Recursively load all `.toml` question set files from a directory.
pub fn load_question_directory(dir: &Path) -> Result<Vec<QuestionSet>> {
    let mut sets = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            sets.extend(load_question_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_set(&path) {
                Ok(set) => sets.push(set),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(sets)
}

/// A warning from question set validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub question_id: Option<String>,
    pub part_id: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.question_id, &self.part_id) {
            (Some(q), Some(p)) => write!(f, "[{q}/{p}] {}", self.message),
            (Some(q), None) => write!(f, "[{q}] {}", self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Validate a question set for common authoring mistakes.
pub fn validate_question_set(set: &QuestionSet, sentinel: &str) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_questions = HashSet::new();
    for question in &set.questions {
        let warn_question = |message: String| ValidationWarning {
            question_id: Some(question.id.clone()),
            part_id: None,
            message,
        };

        if !seen_questions.insert(&question.id) {
            warnings.push(warn_question(format!("duplicate question ID: {}", question.id)));
        }
        if question.parts.is_empty() {
            warnings.push(warn_question("question has no parts".into()));
        }

        let mut seen_parts = HashSet::new();
        for part in &question.parts {
            if !seen_parts.insert(&part.id) {
                warnings.push(warn_question(format!("duplicate part ID: {}", part.id)));
            }
            for message in part_problems(part, sentinel) {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    part_id: Some(part.id.clone()),
                    message,
                });
            }
        }
    }

    warnings
}

fn part_problems(part: &QuestionPart, sentinel: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if part.self_assessed {
        if !part.slots.is_empty() {
            problems.push("self-assessed part declares slots that will never be checked".into());
        }
        return problems;
    }
    if part.slots.is_empty() {
        problems.push("part has no slots".into());
    }

    let mut pool_users: HashMap<Vec<String>, usize> = HashMap::new();
    for (idx, slot) in part.slots.iter().enumerate() {
        let n = idx + 1;
        if slot.alternatives.is_empty() {
            problems.push(format!("slot {n} has no alternatives"));
            continue;
        }
        if slot.is_not_required(sentinel) {
            continue;
        }

        for alternative in &slot.alternatives {
            let values: &[String] = match alternative {
                AnswerAlternative::Fixed(value) => std::slice::from_ref(value),
                AnswerAlternative::Pool(members) => {
                    if members.is_empty() {
                        problems.push(format!("slot {n} has an empty pool"));
                    }
                    let mut key: Vec<String> = members.iter().map(|m| normalize(m)).collect();
                    key.sort();
                    *pool_users.entry(key).or_default() += 1;
                    members
                }
            };
            for value in values {
                if value.trim() == sentinel {
                    problems.push(format!(
                        "slot {n} mixes the no-answer sentinel with other alternatives"
                    ));
                } else if value.trim().is_empty() {
                    problems.push(format!("slot {n} has an empty alternative"));
                } else if let Err(e) = parse_notation(value) {
                    problems.push(format!("slot {n} alternative '{value}' does not parse: {e}"));
                }
            }
        }
    }

    for (pool, users) in pool_users {
        if users == 1 && pool.len() > 1 {
            problems.push(format!(
                "pool [{}] is used by only one slot",
                pool.join(", ")
            ));
        }
    }
    problems.sort();
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[question_set]
id = "algebra"
name = "Algebra"
description = "Quadratics and fractions"

[[questions]]
id = "quadratic"
title = "Solve x^2 = 4"
topic = "quadratics"

[[questions.parts]]
id = "a"
prompt = "Give both roots."
slots = [["2", "-2"], ["2", "-2"]]

[[questions.parts]]
id = "b"
prompt = "Sketch the curve."
slots = ["<none>"]

[[questions]]
id = "half"
title = "Simplify"

[[questions.parts]]
id = "a"
slots = [{ alternatives = ['\frac{1}{2}', "0.5"] }]
"#;

    #[test]
    fn parse_valid_toml() {
        let set = parse_question_set_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(set.id, "algebra");
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.part_count(), 3);

        let part = set.find_part("quadratic", "a").unwrap();
        assert_eq!(part.slots.len(), 2);
        assert_eq!(part.slots[0], AnswerSlot::pool(["2", "-2"]));

        let part = set.find_part("half", "a").unwrap();
        assert_eq!(part.slots[0].alternatives.len(), 2);
        assert!(set.find_part("half", "z").is_none());
        assert!(set.find_part("nope", "a").is_none());
    }

    #[test]
    fn valid_set_has_no_warnings() {
        let set = parse_question_set_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_question_set(&set, "<none>");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[question_set]
id = "minimal"
name = "Minimal"

[[questions]]
id = "q1"

[[questions.parts]]
id = "a"
slots = ["3"]
"#;
        let set = parse_question_set_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert!(set.description.is_empty());
        assert!(set.questions[0].topic.is_none());
        assert!(!set.questions[0].parts[0].self_assessed);
    }

    #[test]
    fn validate_duplicates_and_empty_parts() {
        let toml = r#"
[question_set]
id = "dupes"
name = "Dupes"

[[questions]]
id = "same"

[[questions]]
id = "same"

[[questions.parts]]
id = "a"
slots = ["1"]

[[questions.parts]]
id = "a"
"#;
        let set = parse_question_set_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_question_set(&set, "<none>");
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.contains(&"duplicate question ID: same"));
        assert!(messages.contains(&"duplicate part ID: a"));
        assert!(messages.contains(&"question has no parts"));
        assert!(messages.contains(&"part has no slots"));
    }

    #[test]
    fn validate_slot_contents() {
        let toml = r#"
[question_set]
id = "slots"
name = "Slots"

[[questions]]
id = "q"

[[questions.parts]]
id = "a"
slots = ["(x+1", ["1", "2"], { alternatives = ["<none>", "3"] }, ""]

[[questions.parts]]
id = "proof"
self_assessed = true
slots = ["1"]
"#;
        let set = parse_question_set_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_question_set(&set, "<none>");
        let text: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
        assert!(text.iter().any(|w| w.starts_with("[q/a] slot 1 alternative '(x+1' does not parse")));
        assert!(text.iter().any(|w| w.contains("pool [1, 2] is used by only one slot")));
        assert!(text.iter().any(|w| w.contains("slot 3 mixes the no-answer sentinel")));
        assert!(text.iter().any(|w| w.contains("slot 4 has an empty alternative")));
        assert!(text.iter().any(|w| w.starts_with("[q/proof] self-assessed part")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_question_set_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("bad.toml"), "not toml {").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("more.toml"),
            VALID_TOML.replace(r#"id = "algebra""#, r#"id = "algebra-2""#),
        )
        .unwrap();

        let sets = load_question_directory(dir.path()).unwrap();
        let ids: Vec<_> = sets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["algebra", "algebra-2"]);

        let single = load_question_sets(&dir.path().join("good.toml")).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn load_directory_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.toml");
        std::fs::write(&file, VALID_TOML).unwrap();
        assert!(load_question_directory(&file).is_err());
    }
}
