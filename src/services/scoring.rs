// src/services/scoring.rs

/// Percentage of correct answers relative to the attempt's question count.
///
/// A quiz without questions scores 0. The result is clamped to `[0, 100]`,
/// which matters when questions were added to a quiz after the attempt took
/// its snapshot of the question count. No rounding is applied.
pub fn calculate_score(total_questions: i32, correct_answers: i32) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }

    let score = (correct_answers as f64 / total_questions as f64) * 100.0;
    score.clamp(0.0, 100.0)
}
