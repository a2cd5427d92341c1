use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a question expects one selected option or several.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
}

impl Default for QuestionType {
    fn default() -> Self {
        Self::Single
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Multiple => f.write_str("multiple"),
        }
    }
}

/// Canonical in-app form of an answer: the distinct A-E letters of the
/// input, uppercased, in order of first appearance, concatenated with no
/// separator. Everything that is not an answer letter is ignored, so any
/// of the encodings in circulation ("AC", "A，C", "答案：a、c") collapse
/// to the same string.
pub fn ui_form(answer: &str) -> String {
    let mut seen = [false; 5];
    let mut letters = String::new();

    for c in answer.chars() {
        let letter = c.to_ascii_uppercase();

        if ('A'..='E').contains(&letter) {
            let index = letter as usize - 'A' as usize;

            if !seen[index] {
                seen[index] = true;
                letters.push(letter);
            }
        }
    }

    letters
}

/// Persisted form of an answer: a single letter stays bare, several
/// letters are joined with a full-width comma.
pub fn storage_form(answer: &str) -> String {
    let letters = ui_form(answer);

    if letters.chars().count() <= 1 {
        return letters;
    }

    letters
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join("，")
}

/// A question is multi-select exactly when its answer carries more than
/// one distinct letter. Separator choice and letter order never matter;
/// an empty or unrecognizable answer counts as single.
pub fn infer_type(answer: &str) -> QuestionType {
    if ui_form(answer).len() > 1 {
        QuestionType::Multiple
    } else {
        QuestionType::Single
    }
}
