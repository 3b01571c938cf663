use crate::models::attempt::AttemptAnswer;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Fixed grade-band cutoffs, highest first, first match wins.
pub fn letter_grade(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A+"
    } else if percentage >= 80.0 {
        "A"
    } else if percentage >= 70.0 {
        "B+"
    } else if percentage >= 60.0 {
        "B"
    } else if percentage >= 50.0 {
        "C+"
    } else if percentage >= 40.0 {
        "C"
    } else if percentage >= 30.0 {
        "D"
    } else {
        "F"
    }
}

/// A selection is correct when it matches the canonical answer index set,
/// order-independent. Duplicate indices are compared as given, not deduped.
pub fn is_correct_selection(selected: &[i32], correct: &[i32]) -> bool {
    let mut selected = selected.to_vec();
    let mut correct = correct.to_vec();
    selected.sort_unstable();
    correct.sort_unstable();
    selected == correct
}

pub fn percentage(obtained_marks: i32, total_marks: i32) -> f64 {
    if total_marks > 0 {
        (obtained_marks as f64 / total_marks as f64) * 100.0
    } else {
        0.0
    }
}

/// Stored form of a percentage, 2 decimal places. Grading always uses the
/// unrounded value so 89.999 stays below the A+ cutoff.
pub fn percentage_decimal(percentage: f64) -> Decimal {
    Decimal::from_f64(percentage)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

/// Derived attribute: sum of per-slot marks, recomputed on every mutation.
pub fn total_obtained(slots: &[AttemptAnswer]) -> i32 {
    slots.iter().map(|a| a.marks_obtained).sum()
}
