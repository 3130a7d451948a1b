//! Headless rendering stage: a text summary or a JSON document of the radar.

pub mod messages;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Stdout, Write};

use crate::config::Branding;
use crate::domain::{Blip, Radar};
use crate::error::ClassifiedError;
use crate::presenter::{Phase, Presenter};

use self::messages::{user_message, UserMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct RadarReport<'a> {
    generated_at: String,
    title: &'a str,
    current_sheet: &'a str,
    alternatives: &'a [String],
    total_blips: usize,
    by_quadrant: Vec<(String, usize)>,
    by_ring: Vec<(String, usize)>,
    radar: &'a Radar,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: &'a ClassifiedError,
    message: UserMessage,
}

fn build_report(radar: &Radar) -> RadarReport<'_> {
    let by_quadrant = radar
        .quadrants
        .iter()
        .map(|quadrant| (quadrant.name.clone(), quadrant.blips.len()))
        .collect();

    let by_ring = radar
        .rings
        .iter()
        .map(|ring| {
            let count = radar
                .blips()
                .filter(|(_, blip)| blip.ring == ring.name)
                .count();
            (ring.name.clone(), count)
        })
        .collect();

    RadarReport {
        generated_at: Utc::now().to_rfc3339(),
        title: &radar.title,
        current_sheet: &radar.current_sheet,
        alternatives: &radar.alternatives,
        total_blips: radar.blip_count(),
        by_quadrant,
        by_ring,
        radar,
    }
}

/// Presenter for the command line. Writes to stdout unless built with
/// [`ConsolePresenter::with_writer`].
pub struct ConsolePresenter<W: Write = Stdout> {
    format: OutputFormat,
    branding: Option<Branding>,
    out: W,
    title: String,
    last_error: Option<ClassifiedError>,
}

impl ConsolePresenter<Stdout> {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, io::stdout())
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn with_writer(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            branding: None,
            out,
            title: String::new(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn with_branding(mut self, branding: Branding) -> Self {
        self.branding = Some(branding);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub const fn last_error(&self) -> Option<&ClassifiedError> {
        self.last_error.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(error) = writeln!(self.out, "{text}") {
            log::error!("could not write output: {error}");
        }
    }

    fn emit_json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => self.emit(&json),
            Err(error) => log::error!("could not serialize output: {error}"),
        }
    }

    fn render_text(&mut self, radar: &Radar) {
        let report = build_report(radar);
        let mut lines = Vec::new();

        lines.push(String::new());
        lines.push(report.title.to_string());
        lines.push("=".repeat(report.title.chars().count().max(10)));
        if let Some(branding) = &self.branding {
            lines.push(format!(
                "{} ({})",
                branding.company_name, branding.company_url
            ));
        }
        lines.push(format!("Sheet: {}", report.current_sheet));
        if !report.alternatives.is_empty() {
            lines.push(format!("Other sheets: {}", report.alternatives.join(", ")));
        }
        lines.push(format!("Total blips: {}", report.total_blips));

        lines.push("\nBlips by Quadrant:".to_string());
        for (quadrant, count) in &report.by_quadrant {
            lines.push(format!("- {quadrant}: {count}"));
        }

        lines.push("\nBlips by Ring:".to_string());
        for (ring, count) in &report.by_ring {
            lines.push(format!("- {ring}: {count}"));
        }

        lines.push("\nBlips:".to_string());
        for (quadrant, blip) in radar.blips() {
            lines.push(blip_line(&quadrant.name, blip));
        }

        self.emit(&lines.join("\n"));
    }
}

fn blip_line(quadrant: &str, blip: &Blip) -> String {
    let marker = if blip.is_new { " (new)" } else { "" };
    format!(
        "{:>3}. {}{marker} | {quadrant} | {}",
        blip.number, blip.name, blip.ring
    )
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn phase(&mut self, phase: Phase) {
        log::info!("phase: {phase}");
        if phase == Phase::Loading && self.format == OutputFormat::Text {
            if let Err(error) = io::stderr().write_all(b"Loading radar...\n") {
                log::debug!("could not write progress: {error}");
            }
        }
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn request_locator(&mut self) {
        let title = self.title.clone();
        match self.format {
            OutputFormat::Text => self.emit(&format!(
                "{title}\n\nEnter the URL of your Google Sheet, CSV or JSON file \
                 (e.g. tech-radar-ingest https://example.com/radar.csv)."
            )),
            OutputFormat::Json => self.emit_json(&serde_json::json!({
                "title": title,
                "awaiting_input": true,
            })),
        }
    }

    fn show_error(&mut self, error: &ClassifiedError) {
        self.last_error = Some(error.clone());
        let message = user_message(error);
        match self.format {
            OutputFormat::Text => {
                let mut text = message.headline.clone();
                if let Some(hint) = &message.hint {
                    text.push('\n');
                    text.push_str(hint);
                }
                self.emit(&text);
            }
            OutputFormat::Json => self.emit_json(&ErrorReport { error, message }),
        }
    }

    fn show_unauthorized(&mut self, error: &ClassifiedError) {
        self.show_error(error);
    }

    fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn render(&mut self, radar: &Radar) {
        self.title = radar.title.clone();
        match self.format {
            OutputFormat::Text => self.render_text(radar),
            OutputFormat::Json => {
                let report = build_report(radar);
                self.emit_json(&report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quadrant, Ring};
    use crate::error::ErrorKind;
    use crate::source::SourceKind;

    fn radar() -> Radar {
        Radar {
            title: "Engineering Radar".to_string(),
            current_sheet: "2024".to_string(),
            alternatives: vec!["2023".to_string()],
            rings: vec![
                Ring {
                    name: "Adopt".to_string(),
                    order: 0,
                },
                Ring {
                    name: "Hold".to_string(),
                    order: 1,
                },
            ],
            quadrants: vec![Quadrant {
                name: "Tools".to_string(),
                blips: vec![Blip {
                    number: 1,
                    name: "Terraform".to_string(),
                    ring: "Adopt".to_string(),
                    is_new: true,
                    status: String::new(),
                    topic: String::new(),
                    description: String::new(),
                }],
            }],
        }
    }

    #[test]
    fn text_output_lists_counts_and_blips() -> Result<(), Box<dyn std::error::Error>> {
        let mut presenter = ConsolePresenter::with_writer(OutputFormat::Text, Vec::new());
        presenter.render(&radar());

        let text = String::from_utf8(presenter.into_inner())?;
        assert!(text.contains("Engineering Radar"));
        assert!(text.contains("Other sheets: 2023"));
        assert!(text.contains("- Tools: 1"));
        assert!(text.contains("- Hold: 0"));
        assert!(text.contains("  1. Terraform (new) | Tools | Adopt"));
        Ok(())
    }

    #[test]
    fn json_output_carries_the_radar() -> Result<(), Box<dyn std::error::Error>> {
        let mut presenter = ConsolePresenter::with_writer(OutputFormat::Json, Vec::new());
        presenter.render(&radar());

        let value: serde_json::Value = serde_json::from_slice(&presenter.into_inner())?;
        assert_eq!(value["total_blips"], 1);
        assert_eq!(value["radar"]["quadrants"][0]["blips"][0]["name"], "Terraform");
        assert!(value["generated_at"].is_string());
        Ok(())
    }

    #[test]
    fn errors_are_remembered_until_cleared() {
        let error = ClassifiedError {
            kind: ErrorKind::SheetNotFound,
            source_kind: Some(SourceKind::Sheet),
            message: "status 404".to_string(),
            details: None,
            account: None,
        };
        let mut presenter = ConsolePresenter::with_writer(OutputFormat::Text, Vec::new());

        presenter.show_error(&error);
        assert_eq!(presenter.last_error(), Some(&error));

        presenter.clear_error();
        assert_eq!(presenter.last_error(), None);
    }
}
