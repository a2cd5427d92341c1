use once_cell::sync::Lazy;
use regex::Regex;

use crate::answer::ui_form;

/// A run of answer letters as models and humans write them: A-E in either
/// case, separated by 、 , ， or whitespace.
const LETTER_RUN: &str = r"[A-Ea-e](?:[、,，\s]*[A-Ea-e])*";

static ANSWER_LABEL: Lazy<Regex> = Lazy::new(|| {
    // 为/是 shows up on either side of the colon in the wild: 答案为A,
    // 答案：是B.
    Regex::new(&format!(r"答案\s*[为是]?\s*[:：]?\s*[为是]?\s*({LETTER_RUN})")).unwrap()
});

static EXPLANATION_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"解析[:：]\s*({LETTER_RUN})")).unwrap());

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"[（(]({LETTER_RUN})[）)]")).unwrap());

static EXPLANATION_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"解析[:：]").unwrap());

static ANSWER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^.*?答案[:：][^\n]*").unwrap());

/// What a model completion boils down to: the suggested answer letters
/// and the explanation text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Distinct letters in order of first appearance; several letters are
    /// joined with 、, a single letter stays bare, none yields "".
    pub answer: String,
    pub explanation: String,
}

/// Pull the suggested answer and explanation out of free-form completion
/// text. Total over all inputs: an unrecognizable completion degrades to
/// empty fields, never an error.
///
/// Answer precedence, first match wins:
/// 1. a 答案 label (optional 为/是, optional colon) followed by letters;
/// 2. a 解析 head that opens with letters;
/// 3. a parenthesized letter run anywhere.
pub fn extract(raw: &str) -> ExtractionResult {
    ExtractionResult {
        answer: extract_answer(raw),
        explanation: extract_explanation(raw),
    }
}

fn extract_answer(raw: &str) -> String {
    let run = ANSWER_LABEL
        .captures(raw)
        .or_else(|| EXPLANATION_HEAD.captures(raw))
        .or_else(|| BRACKETED.captures(raw))
        .and_then(|captures| captures.get(1))
        .map(|letters| letters.as_str())
        .unwrap_or("");

    let letters = ui_form(run);

    if letters.chars().count() <= 1 {
        return letters;
    }

    letters
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join("、")
}

fn extract_explanation(raw: &str) -> String {
    // The last 解析： marker wins; earlier ones are drafts the model
    // revised.
    if let Some(mark) = EXPLANATION_MARK.find_iter(raw).last() {
        return raw[mark.end()..].trim().to_owned();
    }

    let after_answer = ANSWER_LINE.replacen(raw, 1, "");
    let after_answer = after_answer.trim();

    if after_answer.is_empty() {
        raw.trim().to_owned()
    } else {
        after_answer.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_single_answer() {
        assert_eq!(extract("答案：A").answer, "A");
        assert_eq!(extract("答案：为 B").answer, "B");
        assert_eq!(extract("答案是C，理由如下").answer, "C");
    }

    #[test]
    fn labeled_multiple_answers_join_with_enumeration_comma() {
        assert_eq!(extract("答案：A、C").answer, "A、C");
        assert_eq!(extract("答案：A,C").answer, "A、C");
        assert_eq!(extract("答案：a c e").answer, "A、C、E");
        assert_eq!(extract("答案：A、C、A").answer, "A、C");
    }

    #[test]
    fn explanation_head_letters_are_second_choice() {
        let raw = "解析：B 本题考查的是基本概念。";

        let result = extract(raw);
        assert_eq!(result.answer, "B");
        assert_eq!(result.explanation, "B 本题考查的是基本概念。");
    }

    #[test]
    fn bracket_fallback() {
        let result = extract("这道题比较复杂，正确选择是（A）");
        assert_eq!(result.answer, "A");
        assert_eq!(result.explanation, "这道题比较复杂，正确选择是（A）");
    }

    #[test]
    fn labeled_answer_outranks_bracket() {
        let raw = "备选（D）不对。\n答案：B";
        assert_eq!(extract(raw).answer, "B");
    }

    #[test]
    fn last_explanation_marker_wins() {
        let raw = "答案：B、D\n解析：因为……原因一\n解析：最终解析文本";

        let result = extract(raw);
        assert_eq!(result.answer, "B、D");
        assert_eq!(result.explanation, "最终解析文本");
    }

    #[test]
    fn explanation_falls_back_to_text_after_answer_line() {
        let raw = "前置说明\n答案：C 选项正确\n由于该征象只见于此病。";

        let result = extract(raw);
        assert_eq!(result.answer, "C");
        assert_eq!(result.explanation, "由于该征象只见于此病。");
    }

    #[test]
    fn explanation_falls_back_to_whole_text() {
        let raw = "  （B）是正确的  ";

        let result = extract(raw);
        assert_eq!(result.answer, "B");
        assert_eq!(result.explanation, "（B）是正确的");
    }

    #[test]
    fn no_letters_anywhere_degrades_to_empty_answer() {
        let result = extract("无法确定正确选项。");
        assert_eq!(result.answer, "");
        assert_eq!(result.explanation, "无法确定正确选项。");
    }

    #[test]
    fn empty_input() {
        assert_eq!(extract(""), ExtractionResult::default());
    }
}
