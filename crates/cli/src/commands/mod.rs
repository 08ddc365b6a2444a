//! Subcommand implementations.
//!
//! Commands print their results to stdout; logs go to stderr.

pub mod auth;
pub mod book;
pub mod notifications;
pub mod session;
pub mod shop;
pub mod ugc;

use std::io::Write;

use thiserror::Error;

use avenue_client::config::Language;
use avenue_client::session::SessionError;
use avenue_client::store::StoreError;
use avenue_client::{ApiClient, ClientConfig, ClientError};

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command cannot run as invoked.
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Message for the terminal; client errors are localized.
    pub fn user_message(&self, language: Language) -> String {
        match self {
            Self::Client(e) => e.user_message(language),
            other => other.to_string(),
        }
    }
}

impl From<avenue_client::ValidationError> for CliError {
    fn from(err: avenue_client::ValidationError) -> Self {
        Self::Client(err.into())
    }
}

/// Shared state for one command run.
pub struct Context {
    pub api: ApiClient,
    pub config: ClientConfig,
}

/// Print `label` and read one trimmed line from stdin.
pub async fn prompt(label: &str) -> Result<String, CliError> {
    print!("{label}: ");
    std::io::stdout().flush()?;

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .map_err(|e| CliError::Usage(format!("input task failed: {e}")))??;

    Ok(line.trim().to_string())
}

/// Ask a yes/no question; anything but `y`/`s` is no.
pub async fn confirm(question: &str) -> Result<bool, CliError> {
    let answer = prompt(&format!("{question} [y/N]")).await?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí"))
}
