//! User-facing copy for classified errors.

use serde::Serialize;

use crate::error::{ClassifiedError, ErrorKind};
use crate::source::SourceKind;

pub const FAQ_URL: &str = "https://www.thoughtworks.com/radar/byor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub headline: String,
    pub hint: Option<String>,
    /// Whether the switch-account retry should be offered.
    pub switch_account: bool,
}

const fn file_label(source_kind: Option<SourceKind>) -> &'static str {
    match source_kind {
        Some(SourceKind::Json) => "JSON file",
        Some(SourceKind::Sheet) => "Google Sheet",
        Some(SourceKind::Csv) | None => "CSV file",
    }
}

pub fn user_message(error: &ClassifiedError) -> UserMessage {
    let default_hint = Some(format!("Please check FAQs ({FAQ_URL}) for possible solutions."));

    match error.kind {
        ErrorKind::FileNotFound => UserMessage {
            headline: format!(
                "Oops! We can't find the {} you've entered",
                file_label(error.source_kind)
            ),
            hint: default_hint,
            switch_account: false,
        },
        ErrorKind::InvalidContent => {
            let label = match error.source_kind {
                Some(SourceKind::Json) => "JSON",
                _ => "CSV",
            };
            let mut headline =
                format!("Invalid content of {label} file. Please check the content of file.");
            if let Some(details) = &error.details {
                headline.push('\n');
                headline.push_str(details);
            }
            UserMessage {
                headline,
                hint: default_hint,
                switch_account: false,
            }
        }
        ErrorKind::MalformedData => UserMessage {
            headline: error.message.clone(),
            hint: default_hint,
            switch_account: false,
        },
        ErrorKind::SheetNotFound => UserMessage {
            headline: "Oops! We can't find the Google Sheet you've entered, please check the URL of your sheet."
                .to_string(),
            hint: Some(format!(
                "You can also check the FAQs ({FAQ_URL}) for other possible solutions"
            )),
            switch_account: false,
        },
        ErrorKind::Unauthorized => {
            let account = error.account.as_deref().unwrap_or("an account");
            UserMessage {
                headline: format!(
                    "Oops! Looks like you are accessing this sheet using {account}, which does not have permission. Try switching to another account."
                ),
                hint: Some("Switch account, or go back to try a different sheet.".to_string()),
                switch_account: true,
            }
        }
        ErrorKind::InvalidConfig => UserMessage {
            headline: error.message.clone(),
            hint: None,
            switch_account: false,
        },
    }
}
