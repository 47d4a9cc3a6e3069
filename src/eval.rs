//! Accuracy evaluation against reference answers.

use serde::{Deserialize, Serialize};

/// Correct/total counts for one strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub total: usize,
    pub correct: usize,
}

impl EvaluationResult {
    /// Fraction of correct predictions, `0.0` when nothing was evaluated.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Canonical form used for answer comparison.
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Case-insensitive, whitespace-trimmed equality.
pub fn exact_match(prediction: &str, reference: &str) -> bool {
    normalize_answer(prediction) == normalize_answer(reference)
}

/// Score `(prediction, reference)` pairs.
pub fn evaluate<P, R>(pairs: impl IntoIterator<Item = (P, R)>) -> EvaluationResult
where
    P: AsRef<str>,
    R: AsRef<str>,
{
    let mut result = EvaluationResult::default();

    for (prediction, reference) in pairs {
        result.total += 1;
        if exact_match(prediction.as_ref(), reference.as_ref()) {
            result.correct += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        assert!(exact_match(" Paris\n", "paris"));
        assert!(exact_match("42", "42"));
        assert!(!exact_match("42", "4 2"));
    }

    #[test]
    fn test_evaluate_counts_correct() {
        let result = evaluate([("10", "10"), ("5", "10")]);
        assert_eq!(result, EvaluationResult { total: 2, correct: 1 });
        assert_eq!(result.accuracy(), 0.5);
    }

    #[test]
    fn test_evaluate_empty() {
        let result = evaluate(Vec::<(String, String)>::new());
        assert_eq!(result.total, 0);
        assert_eq!(result.accuracy(), 0.0);
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  YES "), "yes");
    }
}
