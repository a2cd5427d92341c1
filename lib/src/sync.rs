use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use log::info;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::answer::{storage_form, QuestionType};
use crate::data::{QuestionBankData, QuestionData};
use crate::helpers::{load_banks_and_write_formatted, write_data};

const BATCH_SIZE: usize = 500;
const METADATA_FILE: &str = ".sync-metadata.json";

/// Content hashes recorded at the last successful sync, keyed by bank and
/// question id. A question whose hash is unchanged is not pushed again.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SyncMetadata {
    pub banks: HashMap<String, String>,
    pub questions: HashMap<u32, String>,
}

impl SyncMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    pub fn write(&self, path: PathBuf) -> Result<()> {
        write_data(path, serde_json::to_string_pretty(self)?)
    }

    pub fn stale<'a>(&self, bank: &'a QuestionBankData) -> Vec<&'a QuestionData> {
        if self.banks.get(&bank.key) == Some(&bank.hash) {
            return Vec::new();
        }

        bank.questions
            .iter()
            .filter(|question| self.questions.get(&question.id) != Some(&question.hash))
            .collect()
    }

    pub fn record(&mut self, bank: &QuestionBankData) {
        self.banks.insert(bank.key.clone(), bank.hash.clone());

        for question in &bank.questions {
            self.questions
                .insert(question.id, question.hash.clone());
        }
    }
}

/// One row of the hosted `questions` table. The schema is fixed: the
/// answer column holds the storage form and the type column is always
/// `question_type`.
#[derive(Serialize, Debug)]
struct QuestionRow<'a> {
    id: u32,
    question: &'a str,
    options: &'a [String],
    answer: String,
    explanation: &'a str,
    has_image: bool,
    image_path: &'a str,
    question_type: QuestionType,
}

impl<'a> From<&'a QuestionData> for QuestionRow<'a> {
    fn from(question: &'a QuestionData) -> Self {
        Self {
            id: question.id,
            question: &question.question,
            options: &question.options[..],
            answer: storage_form(&question.answer),
            explanation: &question.explanation,
            has_image: question.has_image,
            image_path: &question.image_path,
            question_type: question.question_type,
        }
    }
}

pub struct SyncClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
}

impl SyncClient {
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key,
        }
    }

    pub async fn upsert_questions(&self, questions: &[&QuestionData]) -> Result<()> {
        let url = questions_url(&self.base_url)?;

        for batch in questions.chunks(BATCH_SIZE) {
            let rows = batch
                .iter()
                .map(|question| QuestionRow::from(*question))
                .collect::<Vec<_>>();

            let response = self
                .http
                .post(url.clone())
                .header("apikey", self.api_key.expose_secret())
                .bearer_auth(self.api_key.expose_secret())
                .header("Prefer", "resolution=merge-duplicates")
                .json(&rows)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();

                bail!("upsert of {} question(s) failed: {status} {text}", rows.len());
            }
        }

        Ok(())
    }
}

/// Format every bank in the data directory, then push the questions whose
/// content hash changed since the last recorded sync.
pub async fn sync(data_path: PathBuf, client: &SyncClient) -> Result<()> {
    let metadata_path = data_path.join(METADATA_FILE);
    let mut metadata = SyncMetadata::load(&metadata_path)?;

    let banks = load_banks_and_write_formatted(data_path)?;

    for bank in &banks {
        let stale = metadata.stale(bank);

        if stale.is_empty() {
            info!("{}: up to date", bank.key);
            continue;
        }

        info!("{}: syncing {} question(s)", bank.key, stale.len());

        client.upsert_questions(&stale[..]).await?;
        metadata.record(bank);
    }

    metadata.write(metadata_path)?;

    Ok(())
}

fn questions_url(base: &Url) -> Result<Url> {
    let mut url = base.clone();

    url.path_segments_mut()
        .map_err(|_| anyhow!("sync base URL cannot be a base"))?
        .pop_if_empty()
        .extend(["rest", "v1", "questions"]);

    Ok(url)
}
