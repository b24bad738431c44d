// src/services/grading.rs

use crate::models::{ledger::Answers, quiz::AnswerKeyEntry};

/// Uniform one-point-per-question grading.
///
/// Unanswered questions and answers to unknown question ids score nothing,
/// so the result always lies in `[0, key.len()]`.
pub fn grade(key: &[AnswerKeyEntry], answers: &Answers) -> i32 {
    key.iter()
        .filter(|entry| answers.get(&entry.question_id) == Some(entry.correct_answer.as_str()))
        .count() as i32
}
