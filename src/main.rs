use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use gail_rag::core;
use gail_rag::core::config::AppPaths;
use gail_rag::history::ConversationStore;
use gail_rag::rag::load_documents;
use gail_rag::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "gail-rag",
    about = "Answer questions about the GAIL website from an indexed page corpus"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the index from a scraped pages export
    Ingest {
        /// JSON array of pages, or an object with `documents`/`pages`
        documents: PathBuf,
    },
    /// Add or refresh pages in the existing index
    Update { documents: PathBuf },
    /// Answer one question
    Ask {
        /// Conversation to continue; a fresh one is started when omitted
        #[arg(long)]
        session: Option<String>,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Interactive session on stdin (`clear` resets it, `exit` quits)
    Chat,
    /// Index statistics as JSON
    Stats,
    /// Suggested starter questions
    Suggest,
    /// Effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);
    let state = AppState::initialize_with(paths).await?;

    match cli.command {
        Command::Ingest { documents } => {
            let documents = load_documents(&documents)?;
            let report = state
                .rag
                .rebuild_index(&documents)
                .await
                .context("Failed to rebuild index")?;
            print_json(&report)?;
        }
        Command::Update { documents } => {
            let documents = load_documents(&documents)?;
            let indexed = state.rag.upsert_documents(&documents).await?;
            tracing::info!("Upserted {} chunks", indexed);
            print_json(&state.rag.index_stats().await)?;
        }
        Command::Ask { session, question } => {
            let session_id = session.unwrap_or_else(ConversationStore::new_session_id);
            let answer = state.rag.answer(&question.join(" "), &session_id).await;
            print_json(&answer)?;
        }
        Command::Chat => chat(&state).await?,
        Command::Stats => print_json(&state.rag.index_stats().await)?,
        Command::Suggest => print_json(&state.rag.suggested_questions().await)?,
        Command::Config => {
            let config = state.config.load_config()?;
            print_json(&state.config.redact_sensitive_values(&config))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn chat(state: &AppState) -> anyhow::Result<()> {
    let session_id = ConversationStore::new_session_id();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for question in state.rag.suggested_questions().await {
        stdout.write_all(format!("  - {}\n", question).as_bytes()).await?;
    }

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                state.rag.clear_session(&session_id).await;
                stdout.write_all(b"Conversation cleared.\n").await?;
            }
            question => {
                let answer = state.rag.answer(question, &session_id).await;
                let mut reply = format!("{}\n", answer.text);
                for (i, source) in answer.sources.iter().enumerate() {
                    reply.push_str(&format!(
                        "  [{}] {} ({}, {:.2})\n",
                        i + 1,
                        source.title,
                        source.url,
                        source.similarity_score
                    ));
                }
                reply.push_str(&format!("  confidence: {:.2}\n", answer.confidence));
                stdout.write_all(reply.as_bytes()).await?;
            }
        }
    }

    Ok(())
}
