use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::answer::ui_form;
use crate::data::QuestionData;
use crate::helpers::write_data;

pub const RECORDS_FILE: &str = ".answer-records.json";
pub const WRONG_BOOK_FILE: &str = ".wrong-book.json";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnswerRecord {
    pub question_id: u32,
    pub selected: String,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Grade a selection against a question. The selection may arrive in any
/// encoding; both sides are compared in UI form, so "c,a" against a
/// canonical "AC" is correct.
pub fn grade(question: &QuestionData, selected: &str) -> AnswerRecord {
    let selected = ui_form(selected);
    let correct = selected == question.answer;

    AnswerRecord {
        question_id: question.id,
        selected,
        correct,
        answered_at: Utc::now(),
    }
}

pub fn load_records(path: &Path) -> Result<Vec<AnswerRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

pub fn append_record(path: PathBuf, record: AnswerRecord) -> Result<()> {
    let mut records = load_records(&path)?;

    records.push(record);
    write_data(path, serde_json::to_string_pretty(&records)?)
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StudySession {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub records: Vec<AnswerRecord>,
}

impl StudySession {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            records: Vec::new(),
        }
    }

    pub fn answer(&mut self, question: &QuestionData, selected: &str) -> bool {
        let record = grade(question, selected);
        let correct = record.correct;

        self.records.push(record);

        correct
    }

    pub fn correct_count(&self) -> usize {
        self.records.iter().filter(|record| record.correct).count()
    }

    pub fn wrong_count(&self) -> usize {
        self.records.len() - self.correct_count()
    }

    pub fn accuracy(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }

        self.correct_count() as f64 / self.records.len() as f64 * 100.0
    }

    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WrongEntry {
    pub wrong_count: u32,
    pub last_wrong_at: DateTime<Utc>,
}

/// Per-question wrong-answer counter, persisted next to the bank files.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WrongBook {
    pub entries: HashMap<u32, WrongEntry>,
}

impl WrongBook {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    pub fn write(&self, path: PathBuf) -> Result<()> {
        write_data(path, serde_json::to_string_pretty(self)?)
    }

    pub fn record_wrong(&mut self, question_id: u32) {
        let now = Utc::now();
        let entry = self.entries.entry(question_id).or_insert(WrongEntry {
            wrong_count: 0,
            last_wrong_at: now,
        });

        entry.wrong_count += 1;
        entry.last_wrong_at = now;
    }

    pub fn remove(&mut self, question_id: u32) -> bool {
        self.entries.remove(&question_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::raw_data::RawQuestionData;

    fn question(answer: &str) -> QuestionData {
        QuestionData::from(RawQuestionData {
            id: 1,
            question: "题干".to_owned(),
            options: vec!["A、甲".to_owned(), "B、乙".to_owned(), "C、丙".to_owned()],
            answer: answer.to_owned(),
            explanation: None,
            has_image: None,
            image_path: None,
            question_type: None,
        })
    }

    #[test]
    fn grading_ignores_encoding() {
        let question = question("A，C");

        assert!(grade(&question, "AC").correct);
        assert!(grade(&question, "a、c").correct);
        assert!(!grade(&question, "c,a").correct);
        assert!(!grade(&question, "A").correct);
        assert!(!grade(&question, "").correct);
    }

    #[test]
    fn session_tallies_and_accuracy() {
        let question = question("B");
        let mut session = StudySession::start();

        assert!(session.answer(&question, "b"));
        assert!(!session.answer(&question, "A"));
        assert!(session.answer(&question, "B"));

        assert_eq!(session.correct_count(), 2);
        assert_eq!(session.wrong_count(), 1);
        assert!((session.accuracy() - 200.0 / 3.0).abs() < 1e-9);

        session.end();
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn wrong_book_counts_repeat_misses() {
        let mut book = WrongBook::default();

        book.record_wrong(7);
        book.record_wrong(7);
        book.record_wrong(9);

        assert_eq!(book.entries[&7].wrong_count, 2);
        assert_eq!(book.entries[&9].wrong_count, 1);

        assert!(book.remove(9));
        assert!(!book.remove(9));
    }
}
