use std::collections::HashSet;
use std::fs::DirEntry;
use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::answer::{infer_type, ui_form, QuestionType};
use crate::helpers::{read_dir_entry_data, write_data};
use crate::raw_data::RawQuestionData;

/// One bank file: a JSON array of questions, keyed by the file stem.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuestionBankData {
    pub key: String,

    #[serde(skip)]
    pub questions: Vec<QuestionData>,

    pub hash: String,
}

impl QuestionBankData {
    pub fn new(key: String, questions: Vec<QuestionData>) -> Self {
        let hash = Self::hash_data(&key, &questions[..]);

        Self {
            key,
            questions,
            hash,
        }
    }

    fn hash_data(key: &str, questions: &[QuestionData]) -> String {
        let mut hasher = blake3::Hasher::new();

        hasher.update(key.as_bytes());
        hasher.update(
            questions
                .iter()
                .map(|question| question.hash.clone())
                .collect::<Vec<_>>()
                .join("")
                .as_bytes(),
        );

        hasher.finalize().to_string()
    }

    pub fn load_and_write_formatted(dir_entry: DirEntry) -> Result<Self> {
        let path = dir_entry.path();
        let mut data = Self::load(path.clone(), dir_entry)?;

        data.sort();
        data.deduplicate();
        data.check()?;

        // Sorting and deduplication change the content the bank hash
        // covers, so re-derive it before anything records the hash.
        let data = Self::new(data.key, data.questions);
        data.clone().write(path)?;

        Ok(data)
    }

    pub fn load(path: PathBuf, dir_entry: DirEntry) -> Result<Self> {
        let raw_data = read_dir_entry_data(dir_entry)?;

        let key = path
            .file_stem()
            .and_then(|name| name.to_str())
            .expect("invalid file name")
            .to_owned();
        let questions = QuestionData::from_slice(&raw_data[..])?;

        Ok(Self::new(key, questions))
    }

    pub fn write(self, path: PathBuf) -> Result<()> {
        let raw_questions = self
            .questions
            .into_iter()
            .map(Into::into)
            .collect::<Vec<RawQuestionData>>();
        let raw_data = serde_json::to_string_pretty(&raw_questions)?;

        write_data(path, raw_data)
    }

    fn sort(&mut self) {
        self.questions.sort_by_key(|question| question.id);
    }

    fn deduplicate(&mut self) {
        self.questions.dedup_by(|a, b| a.eq_data(b));
    }

    fn check(&self) -> Result<()> {
        let mut ids = HashSet::new();

        for question in &self.questions {
            question.check()?;

            if !ids.insert(question.id) {
                bail!("Bank {} has duplicate question id {}", self.key, question.id);
            }
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuestionData {
    pub id: u32,

    pub question: String,
    pub options: Vec<String>,
    /// Canonical UI form; raw records are normalized on load.
    pub answer: String,
    pub explanation: String,
    pub has_image: bool,
    pub image_path: String,
    pub question_type: QuestionType,

    pub hash: String,
}

impl QuestionData {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u32,
        question: String,
        options: Vec<String>,
        answer: String,
        explanation: String,
        has_image: bool,
        image_path: String,
        question_type: QuestionType,
    ) -> Self {
        let hash = Self::hash_data(
            id,
            &question,
            &options[..],
            &answer,
            &explanation,
            has_image,
            &image_path,
            question_type,
        );

        Self {
            id,
            question,
            options,
            answer,
            explanation,
            has_image,
            image_path,
            question_type,
            hash,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn hash_data(
        id: u32,
        question: &str,
        options: &[String],
        answer: &str,
        explanation: &str,
        has_image: bool,
        image_path: &str,
        question_type: QuestionType,
    ) -> String {
        let mut hasher = blake3::Hasher::new();

        hasher.update(&id.to_le_bytes());
        hasher.update(question.as_bytes());
        hasher.update(options.join("\n").as_bytes());
        hasher.update(answer.as_bytes());
        hasher.update(explanation.as_bytes());
        hasher.update(&[has_image as u8]);
        hasher.update(image_path.as_bytes());
        hasher.update(&[question_type as u8]);

        hasher.finalize().to_string()
    }

    fn from_slice(raw_data: &[u8]) -> Result<Vec<Self>> {
        let raw_questions: Vec<RawQuestionData> = serde_json::from_slice(raw_data)?;

        Ok(raw_questions.into_iter().map(Into::into).collect())
    }

    /// Fold a model suggestion into the question. The answer may arrive
    /// in any encoding; it is canonicalized and the type re-inferred.
    pub fn apply_suggestion(&mut self, answer: &str, explanation: &str) {
        let answer = ui_form(answer);
        let question_type = infer_type(&answer);

        *self = Self::new(
            self.id,
            self.question.clone(),
            self.options.clone(),
            answer,
            explanation.to_owned(),
            self.has_image,
            self.image_path.clone(),
            question_type,
        );
    }

    fn eq_data(&self, other: &Self) -> bool {
        self.question == other.question
            && self.options == other.options
            && self.answer == other.answer
    }

    fn check(&self) -> Result<()> {
        if self.id == 0 {
            bail!("Question ids must be positive");
        }

        if self.options.len() < 2 || self.options.len() > 5 {
            bail!(
                "Question {} has {} option(s)",
                self.id,
                self.options.len()
            );
        }

        if self.answer.is_empty() {
            bail!("Question {} has no answer", self.id);
        }

        // The option list implies the allowed letters: 4 options allow
        // A through D.
        let last_allowed = (b'A' + self.options.len() as u8 - 1) as char;

        for letter in self.answer.chars() {
            if letter > last_allowed {
                bail!(
                    "Question {} answer {} exceeds its {} options",
                    self.id,
                    self.answer,
                    self.options.len()
                );
            }
        }

        if self.question_type == QuestionType::Single
            && infer_type(&self.answer) == QuestionType::Multiple
        {
            bail!(
                "Question {} is single-select but its answer is {}",
                self.id,
                self.answer
            );
        }

        Ok(())
    }
}

impl From<RawQuestionData> for QuestionData {
    fn from(raw: RawQuestionData) -> Self {
        // The single reconciliation point: whatever encoding the record
        // carried, the in-memory answer is the UI form and the type falls
        // back to inference when the record predates the type column.
        let answer = ui_form(&raw.answer);
        let question_type = raw
            .question_type
            .unwrap_or_else(|| infer_type(&answer));

        Self::new(
            raw.id,
            raw.question,
            raw.options,
            answer,
            raw.explanation.unwrap_or_default(),
            raw.has_image.unwrap_or(false),
            raw.image_path.unwrap_or_default(),
            question_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: u32, answer: &str) -> RawQuestionData {
        RawQuestionData {
            id,
            question: format!("题目{id}"),
            options: vec![
                "A、一".to_owned(),
                "B、二".to_owned(),
                "C、三".to_owned(),
                "D、四".to_owned(),
            ],
            answer: answer.to_owned(),
            explanation: None,
            has_image: None,
            image_path: None,
            question_type: None,
        }
    }

    #[test]
    fn load_normalizes_answer_and_infers_type() {
        let question = QuestionData::from(raw(1, "A，C"));

        assert_eq!(question.answer, "AC");
        assert_eq!(question.question_type, QuestionType::Multiple);

        let question = QuestionData::from(raw(2, "b"));

        assert_eq!(question.answer, "B");
        assert_eq!(question.question_type, QuestionType::Single);
    }

    #[test]
    fn declared_type_wins_over_inference() {
        let mut record = raw(1, "A");
        record.question_type = Some(QuestionType::Multiple);

        let question = QuestionData::from(record);

        assert_eq!(question.question_type, QuestionType::Multiple);
    }

    #[test]
    fn camel_case_records_parse() {
        let json = r#"[{
            "id": 7,
            "question": "最常见的表现是？",
            "options": ["A、甲", "B、乙", "C、丙"],
            "answer": "A，C",
            "explanation": "见教材。",
            "hasImage": true,
            "imagePath": "/images/xray/7.png"
        }]"#;

        let questions = QuestionData::from_slice(json.as_bytes()).unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "AC");
        assert!(questions[0].has_image);
        assert_eq!(questions[0].image_path, "/images/xray/7.png");
    }

    #[test]
    fn check_rejects_out_of_range_letters() {
        let mut record = raw(1, "E");
        record.options.truncate(3);

        let question = QuestionData::from(record);

        assert!(question.check().is_err());
    }

    #[test]
    fn check_rejects_multi_letter_answer_on_single_select() {
        let mut record = raw(1, "A、C");
        record.question_type = Some(QuestionType::Single);

        let question = QuestionData::from(record);

        assert!(question.check().is_err());
    }

    #[test]
    fn check_rejects_duplicate_ids() {
        let questions = vec![
            QuestionData::from(raw(1, "A")),
            QuestionData::from(raw(1, "B")),
        ];
        let bank = QuestionBankData::new("radiology".to_owned(), questions);

        assert!(bank.check().is_err());
    }

    #[test]
    fn deduplicate_drops_identical_questions() {
        let questions = vec![
            QuestionData::from(raw(3, "A")),
            QuestionData::from(raw(3, "A")),
            QuestionData::from(raw(4, "B")),
        ];
        let mut bank = QuestionBankData::new("radiology".to_owned(), questions);

        bank.deduplicate();

        assert_eq!(bank.questions.len(), 2);
    }

    #[test]
    fn sort_orders_by_id() {
        let questions = vec![
            QuestionData::from(raw(9, "A")),
            QuestionData::from(raw(2, "B")),
        ];
        let mut bank = QuestionBankData::new("radiology".to_owned(), questions);

        bank.sort();

        let ids: Vec<u32> = bank.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn apply_suggestion_canonicalizes_and_rehashes() {
        let mut question = QuestionData::from(raw(1, "A"));
        let old_hash = question.hash.clone();

        question.apply_suggestion("B、D", "最终解析文本");

        assert_eq!(question.answer, "BD");
        assert_eq!(question.question_type, QuestionType::Multiple);
        assert_eq!(question.explanation, "最终解析文本");
        assert_ne!(question.hash, old_hash);
    }
}
