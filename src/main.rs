use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::info;
use mcq_study::ai::{AiClient, DEFAULT_MODEL};
use mcq_study::helpers::load_banks_and_write_formatted;
use mcq_study::session::{self, WrongBook, RECORDS_FILE, WRONG_BOOK_FILE};
use mcq_study::sync::{self, SyncClient};
use mcq_study::{QuestionBankData, QuestionData};
use secrecy::SecretString;
use url::Url;

#[derive(Parser)]
#[clap(name = "mcq-study", about = "Quiz bank formatter, grader and synchronizer")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize every bank file in the data directory in place.
    Format {
        #[clap(short, long, value_parser, value_name = "PATH")]
        data_path: PathBuf,
    },
    /// Upsert changed questions to the hosted backend.
    Sync {
        #[clap(short, long, value_parser, value_name = "PATH")]
        data_path: PathBuf,

        #[clap(long, value_parser, env = "SYNC_BASE_URL")]
        base_url: Url,

        #[clap(long, value_parser, env = "SYNC_API_KEY", hide_env_values = true)]
        api_key: String,
    },
    /// Ask the model to suggest an answer and explanation for a question.
    Suggest {
        #[clap(short, long, value_parser, value_name = "PATH")]
        data_path: PathBuf,

        #[clap(short, long, value_parser)]
        question_id: u32,

        #[clap(long, value_parser, env = "AI_BASE_URL")]
        base_url: Url,

        #[clap(long, value_parser, env = "AI_API_KEY", hide_env_values = true)]
        api_key: String,

        #[clap(long, value_parser, env = "AI_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// Write the suggested answer and explanation back into the bank.
        #[clap(long, action)]
        apply: bool,
    },
    /// Grade a selection against a question and record the attempt.
    Answer {
        #[clap(short, long, value_parser, value_name = "PATH")]
        data_path: PathBuf,

        #[clap(short, long, value_parser)]
        question_id: u32,

        #[clap(short, long, value_parser)]
        selected: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "env-file")]
    dotenvy::dotenv().ok();

    pretty_env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Format { data_path } => format(data_path),
        Command::Sync {
            data_path,
            base_url,
            api_key,
        } => {
            let client = SyncClient::new(base_url, SecretString::new(api_key));

            sync::sync(data_path, &client).await
        }
        Command::Suggest {
            data_path,
            question_id,
            base_url,
            api_key,
            model,
            apply,
        } => {
            let client = AiClient::new(base_url, SecretString::new(api_key), model);

            suggest(data_path, question_id, &client, apply).await
        }
        Command::Answer {
            data_path,
            question_id,
            selected,
        } => answer(data_path, question_id, &selected),
    }
}

fn format(data_path: PathBuf) -> Result<()> {
    for bank in load_banks_and_write_formatted(data_path)? {
        info!(
            "{}: {} question(s), hash {}",
            bank.key,
            bank.questions.len(),
            bank.hash
        );
    }

    Ok(())
}

async fn suggest(
    data_path: PathBuf,
    question_id: u32,
    client: &AiClient,
    apply: bool,
) -> Result<()> {
    let (mut bank, index) = find_question(data_path.clone(), question_id)?;

    let suggestion = client.suggest(&bank.questions[index]).await?;

    if suggestion.answer.is_empty() {
        println!("{}", suggestion.content);
        bail!("no answer detected in the completion for question {question_id}");
    }

    println!("答案：{}", suggestion.answer);
    println!("解析：{}", suggestion.explanation);

    if apply {
        bank.questions[index].apply_suggestion(&suggestion.answer, &suggestion.explanation);

        let path = data_path.join(format!("{}.json", bank.key));
        let bank = QuestionBankData::new(bank.key, bank.questions);

        bank.write(path)?;

        info!("question {question_id} updated");
    }

    Ok(())
}

fn answer(data_path: PathBuf, question_id: u32, selected: &str) -> Result<()> {
    let (bank, index) = find_question(data_path.clone(), question_id)?;
    let question: &QuestionData = &bank.questions[index];

    let record = session::grade(question, selected);
    let correct = record.correct;

    session::append_record(data_path.join(RECORDS_FILE), record)?;

    if correct {
        println!("正确");
    } else {
        let wrong_book_path = data_path.join(WRONG_BOOK_FILE);
        let mut wrong_book = WrongBook::load(&wrong_book_path)?;

        wrong_book.record_wrong(question_id);
        wrong_book.write(wrong_book_path)?;

        println!("错误，正确答案：{}", question.answer);
    }

    Ok(())
}

fn find_question(data_path: PathBuf, question_id: u32) -> Result<(QuestionBankData, usize)> {
    for bank in load_banks_and_write_formatted(data_path)? {
        if let Some(index) = bank
            .questions
            .iter()
            .position(|question| question.id == question_id)
        {
            return Ok((bank, index));
        }
    }

    bail!("question {question_id} not found")
}
