//! Verification entry point.

use crate::config::{MatchStrategy, VerifierConfig};
use crate::equivalence::EquivalenceChecker;
use crate::matcher::{GreedyMatcher, MatchContext, OptimalMatcher, SlotMatcher};
use crate::model::{AnswerSlot, MatchResult};
use crate::normalize::normalize;

/// Grades one question part's inputs against its slots.
///
/// Holds no per-call state; one `Verifier` can serve any number of
/// concurrent calls.
pub struct Verifier {
    config: VerifierConfig,
    checker: EquivalenceChecker,
    matcher: Box<dyn SlotMatcher>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .field("matcher", &self.matcher.name())
            .finish()
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        let matcher: Box<dyn SlotMatcher> = match config.matching {
            MatchStrategy::Greedy => Box::new(GreedyMatcher),
            MatchStrategy::Optimal => Box::new(OptimalMatcher),
        };
        Self::with_matcher(config, matcher)
    }

    /// Use a custom matcher instead of the one named in the config.
    pub fn with_matcher(config: VerifierConfig, matcher: Box<dyn SlotMatcher>) -> Self {
        Self {
            checker: EquivalenceChecker::new(&config),
            config,
            matcher,
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn checker(&self) -> &EquivalenceChecker {
        &self.checker
    }

    pub fn verify<S: AsRef<str>>(&self, inputs: &[S], slots: &[AnswerSlot]) -> MatchResult {
        let normalized: Vec<String> = inputs.iter().map(|i| normalize(i.as_ref())).collect();
        let ctx = MatchContext {
            checker: &self.checker,
            sentinel: &self.config.no_answer_sentinel,
        };
        let result = self.matcher.assign(&normalized, slots, &ctx);
        tracing::debug!(
            matcher = self.matcher.name(),
            slots = slots.len(),
            matched = result.matched_count(),
            passed = result.passed,
            "verified"
        );
        result
    }
}

/// Verify with the default configuration.
pub fn verify<S: AsRef<str>>(inputs: &[S], slots: &[AnswerSlot]) -> MatchResult {
    Verifier::default().verify(inputs, slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerAlternative, SlotStatus};

    #[test]
    fn pooled_roots() {
        let slots = vec![AnswerSlot::pool(["2", "-2"]), AnswerSlot::pool(["2", "-2"])];
        assert!(verify(&["2", "-2"], &slots).passed);
        assert!(verify(&["-2", "2"], &slots).passed);
        assert!(!verify(&["2", "2"], &slots).passed);
    }

    #[test]
    fn inputs_are_normalized() {
        let slots = vec![AnswerSlot::fixed(r"\frac{1}{2}")];
        let result = verify(&[r"\left( 0.5 \right)"], &slots);
        assert!(result.passed);
        assert_eq!(result.slots[0].input.as_deref(), Some("( 0.5 )"));
    }

    #[test]
    fn count_mismatch() {
        let slots = vec![AnswerSlot::fixed("1"), AnswerSlot::fixed("2")];
        assert!(!verify(&["1"], &slots).passed);
        assert!(!verify(&["1", "2", "3"], &slots).passed);
    }

    #[test]
    fn malformed_input_never_panics() {
        let slots = vec![AnswerSlot::fixed("x+1")];
        for input in ["(x+1", r"\frac{", "|", "x^", r"\sqrt[", "1/0", "", "@#!", "((((((("] {
            let result = verify(&[input], &slots);
            assert!(!result.passed, "{input:?}");
            assert_eq!(result.slots[0].status, SlotStatus::Unmatched);
        }
    }

    #[test]
    fn deeply_nested_input_is_unmatched() {
        let slots = vec![AnswerSlot::fixed("1")];
        let inputs = [
            format!("{}1{}", "(".repeat(2000), ")".repeat(2000)),
            format!("{}1{}", "(".repeat(100), ")".repeat(100)),
            format!("{}1", "-".repeat(100_000)),
            format!("{}1{}", r"\sqrt{".repeat(500), "}".repeat(500)),
        ];
        for input in &inputs {
            let result = verify(&[input], &slots);
            assert!(!result.passed);
            assert_eq!(result.slots[0].status, SlotStatus::Unmatched);
        }
    }

    #[test]
    fn idempotent() {
        let slots = vec![
            AnswerSlot::pool(["(1,2)", "(3,4)"]),
            AnswerSlot::pool(["(1,2)", "(3,4)"]),
            AnswerSlot::fixed("<none>"),
        ];
        let inputs = ["(3, 4)", "(1.0, 2)", ""];
        let verifier = Verifier::default();
        let first = verifier.verify(&inputs, &slots);
        let second = verifier.verify(&inputs, &slots);
        assert!(first.passed);
        assert_eq!(first, second);
    }

    #[test]
    fn optimal_matching_from_config() {
        let slots = vec![
            AnswerSlot::pool(["1", "1.03"]),
            AnswerSlot::pool(["1", "1.03"]),
        ];
        let greedy = Verifier::default();
        let optimal = Verifier::new(VerifierConfig {
            matching: MatchStrategy::Optimal,
            ..VerifierConfig::default()
        });
        assert!(!greedy.verify(&["1.015", "1"], &slots).passed);
        assert!(optimal.verify(&["1.015", "1"], &slots).passed);
    }

    #[test]
    fn custom_sentinel() {
        let verifier = Verifier::new(VerifierConfig {
            no_answer_sentinel: "N/A".into(),
            ..VerifierConfig::default()
        });
        let slots = vec![AnswerSlot::new(vec![AnswerAlternative::Fixed("N/A".into())])];
        let result = verifier.verify(&["anything"], &slots);
        assert!(result.passed);
        assert_eq!(result.slots[0].status, SlotStatus::NotRequired);
    }

    #[test]
    fn verifier_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Verifier>();

        let verifier = std::sync::Arc::new(Verifier::default());
        let slots = vec![AnswerSlot::pool(["2", "-2"]), AnswerSlot::pool(["2", "-2"])];
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let verifier = verifier.clone();
                let slots = slots.clone();
                std::thread::spawn(move || verifier.verify(&["-2", "2"], &slots).passed)
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
