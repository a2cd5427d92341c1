use serde::{Deserialize, Serialize};

use crate::answer::{storage_form, QuestionType};
use crate::data::QuestionData;

/// A question as it sits in a bank file or arrives from an import. The
/// answer may be in any encoding; field names cover both the snake_case
/// schema and the camelCase spelling older exports used.
#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RawQuestionData {
    pub id: u32,

    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, alias = "hasImage", skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    #[serde(default, alias = "imagePath", skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
}

impl From<QuestionData> for RawQuestionData {
    fn from(data: QuestionData) -> Self {
        Self {
            id: data.id,
            question: data.question,
            options: data.options,
            // Persisted records carry the storage form.
            answer: storage_form(&data.answer),
            explanation: if data.explanation.is_empty() {
                None
            } else {
                Some(data.explanation)
            },
            has_image: if data.has_image {
                Some(data.has_image)
            } else {
                None
            },
            image_path: if data.image_path.is_empty() {
                None
            } else {
                Some(data.image_path)
            },
            question_type: Some(data.question_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::answer::ui_form;

    #[test]
    fn round_trip_through_storage_encoding() {
        let json = r#"[{
            "id": 12,
            "question": "下列哪些征象提示该病？",
            "options": ["A、甲", "B、乙", "C、丙", "D、丁"],
            "answer": "答案：D、B",
            "question_type": "multiple"
        }]"#;

        let raw: Vec<RawQuestionData> = serde_json::from_str(json).unwrap();
        let question = QuestionData::from(raw.into_iter().next().unwrap());

        assert_eq!(question.answer, "DB");

        let written = RawQuestionData::from(question.clone());

        assert_eq!(written.answer, "D，B");
        assert_eq!(written.question_type, Some(QuestionType::Multiple));
        assert_eq!(ui_form(&written.answer), question.answer);
    }

    #[test]
    fn single_letter_answer_stays_bare() {
        let raw = RawQuestionData {
            id: 1,
            question: "题干".to_owned(),
            options: vec!["A、甲".to_owned(), "B、乙".to_owned()],
            answer: "b".to_owned(),
            explanation: None,
            has_image: None,
            image_path: None,
            question_type: None,
        };

        let written = RawQuestionData::from(QuestionData::from(raw));

        assert_eq!(written.answer, "B");
        assert_eq!(written.question_type, Some(QuestionType::Single));
    }
}
