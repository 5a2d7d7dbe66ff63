//! Chat command handler.
//!
//! Streams a grounded answer for a question, optionally continuing a prior
//! conversation loaded from a history file.

use clap::Args;
use futures::StreamExt;
use ragline_chat::{ChatPipeline, ChatRequest};
use ragline_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Ask a question, optionally continuing a conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// The question to ask (alternative to --file)
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// JSON file with prior turns: an array of {"human": ..., "ai": ...}
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Output the full answer as JSON instead of streaming text
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Chat command options: {:?}", self);

        let question = self
            .get_question()
            .ok_or_else(|| AppError::Config("No question provided".to_string()))?;

        let request = match self.load_history()? {
            Some(history) => ChatRequest::with_history(question, history),
            None => ChatRequest::new(question),
        };

        let pipeline = ChatPipeline::from_config(config)?;
        let mut stream = pipeline.answer(&request, None).await?;

        let mut full_answer = String::new();

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            full_answer.push_str(&fragment);

            if !self.json {
                // Stream to stdout in real-time
                print!("{}", fragment);
                use std::io::Write;
                std::io::stdout().flush().ok();
            }
        }

        if self.json {
            let output = serde_json::json!({
                "answer": full_answer,
                "question": request.question,
                "model": pipeline.registry().default_key(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            // Add newline after streaming output
            println!();
        }

        Ok(())
    }

    /// Get the question text from the positional argument or a file.
    fn get_question(&self) -> Option<String> {
        self.question.clone().or_else(|| {
            self.file.as_ref().and_then(|path| {
                std::fs::read_to_string(path)
                    .map_err(|e| tracing::error!("Failed to read question file: {}", e))
                    .ok()
                    .map(|s| s.trim().to_string())
            })
        })
    }

    /// Load prior turns from the history file, if given.
    fn load_history(&self) -> AppResult<Option<Vec<serde_json::Value>>> {
        let Some(ref path) = self.history else {
            return Ok(None);
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read history file {:?}: {}", path, e))
        })?;

        let turns: Vec<serde_json::Value> = serde_json::from_str(&contents).map_err(|e| {
            AppError::Validation(format!("History file {:?} is not a JSON array: {}", path, e))
        })?;

        Ok(Some(turns))
    }
}
