use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::answer::QuestionType;
use crate::data::QuestionData;
use crate::extract::extract;

pub const DEFAULT_MODEL: &str = "hunyuan-lite";

/// Client for an OpenAI-style chat completions endpoint that suggests an
/// answer and explanation for one question.
pub struct AiClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
}

/// What the model suggested for a question. `answer` is the extracted
/// letter run (、-joined when several); `content` keeps the full
/// completion for display.
#[derive(Clone, Debug)]
pub struct Suggestion {
    pub answer: String,
    pub explanation: String,
    pub content: String,
}

impl AiClient {
    pub fn new(base_url: Url, api_key: SecretString, model: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    pub async fn suggest(&self, question: &QuestionData) -> Result<Suggestion> {
        let url = completions_url(&self.base_url)?;
        let prompt = build_prompt(question);

        debug!("requesting completion for question {}", question.id);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "enable_enhancement": true,
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            bail!("completion request failed: {status} {text}");
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("malformed completion response")?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        let parsed = extract(&content);

        Ok(Suggestion {
            answer: parsed.answer,
            explanation: parsed.explanation,
            content,
        })
    }
}

/// The prompt pins the two-line 答案/解析 output format the extractor
/// understands and tells the model the question type so a single-select
/// question gets exactly one letter back.
pub fn build_prompt(question: &QuestionData) -> String {
    let mut lines = vec![
        "请按以下格式输出两行：".to_owned(),
        "答案：,（根据题型给出答案，单选只能是一个答案，多选使用中文顿号“、”分隔）".to_owned(),
        "解析：……".to_owned(),
        format!(
            "题型：{}",
            match question.question_type {
                QuestionType::Multiple => "多选",
                QuestionType::Single => "单选",
            }
        ),
        format!("题目：{}", question.question),
        "选项：".to_owned(),
    ];

    for option in &question.options {
        lines.push(format!("- {option}"));
    }

    lines.join("\n")
}

fn completions_url(base: &Url) -> Result<Url> {
    let mut url = base.clone();

    url.path_segments_mut()
        .map_err(|_| anyhow!("AI base URL cannot be a base"))?
        .pop_if_empty()
        .extend(["chat", "completions"]);

    Ok(url)
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}
