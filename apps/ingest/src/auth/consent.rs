use async_trait::async_trait;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentError {
    #[error("interactive consent is disabled")]
    Disabled,
    #[error("consent was not granted")]
    Refused,
    #[error("could not read the access token: {0}")]
    Io(String),
}

/// Boundary to the identity provider.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    /// A token obtainable without user interaction, if any.
    async fn silent_token(&self) -> Option<String>;

    /// Asks the user to grant access. May wait indefinitely.
    async fn interactive_token(&self) -> Result<String, ConsentError>;

    /// The account the current token belongs to, when known.
    fn account(&self) -> Option<String>;
}

type PromptLines = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Line input shared by every terminal prompt. Clones read from the same
/// buffer, so lines read ahead by one prompt are seen by the next.
#[derive(Clone)]
pub struct PromptInput {
    lines: Arc<tokio::sync::Mutex<PromptLines>>,
}

impl PromptInput {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader<R: AsyncBufRead + Send + Unpin + 'static>(reader: R) -> Self {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Arc::new(tokio::sync::Mutex::new(reader.lines())),
        }
    }

    /// Writes `prompt` to stderr and reads one line. End of input reads as
    /// an empty line.
    pub async fn ask(&self, prompt: &str) -> io::Result<String> {
        let mut stderr = tokio::io::stderr();
        stderr.write_all(prompt.as_bytes()).await?;
        stderr.flush().await?;

        let line = self.lines.lock().await.next_line().await?;
        Ok(line.unwrap_or_default())
    }
}

impl fmt::Debug for PromptInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptInput").finish_non_exhaustive()
    }
}

/// Terminal consent: the silent token comes from configuration and the
/// interactive step asks the user to paste an OAuth access token.
///
/// Without [`PromptConsent::with_input`] interactive consent fails with
/// [`ConsentError::Disabled`].
#[derive(Debug)]
pub struct PromptConsent {
    token: Mutex<Option<String>>,
    account: Option<String>,
    input: Option<PromptInput>,
}

impl PromptConsent {
    pub fn new(token: Option<String>, account: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
            account,
            input: None,
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: PromptInput) -> Self {
        self.input = Some(input);
        self
    }

    fn cached(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember(&self, token: &str) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }
}

#[async_trait]
impl ConsentProvider for PromptConsent {
    async fn silent_token(&self) -> Option<String> {
        self.cached()
    }

    async fn interactive_token(&self) -> Result<String, ConsentError> {
        let Some(input) = &self.input else {
            return Err(ConsentError::Disabled);
        };

        let line = input
            .ask(
                "This sheet is private. Paste a Google OAuth access token with the \
                 spreadsheets.readonly scope and press Enter (empty to cancel):\n> ",
            )
            .await
            .map_err(|error| ConsentError::Io(error.to_string()))?;
        let token = line.trim();
        if token.is_empty() {
            return Err(ConsentError::Refused);
        }

        self.remember(token);
        Ok(token.to_string())
    }

    fn account(&self) -> Option<String> {
        self.account.clone()
    }
}
