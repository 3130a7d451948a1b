//! The boundary between the pipeline and whatever displays its results.

use std::fmt;

use crate::domain::Radar;
use crate::error::ClassifiedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Unauthorized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
            Self::Unauthorized => write!(f, "Unauthorized"),
        }
    }
}

pub trait Presenter {
    fn phase(&mut self, phase: Phase);

    fn set_title(&mut self, title: &str);

    /// Shown when no source could be resolved from the locator.
    fn request_locator(&mut self);

    fn show_error(&mut self, error: &ClassifiedError);

    /// Offers the switch-account retry, naming the account when known.
    fn show_unauthorized(&mut self, error: &ClassifiedError);

    fn clear_error(&mut self);

    fn render(&mut self, radar: &Radar);
}

/// Everything the pipeline told a presenter, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presented {
    Phase(Phase),
    Title(String),
    LocatorRequested,
    Error(ClassifiedError),
    Unauthorized(ClassifiedError),
    ErrorCleared,
    Rendered(Radar),
}

/// Presenter that only records what it was asked to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingPresenter {
    pub events: Vec<Presented>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Presented::Phase(phase) => Some(*phase),
                _ => None,
            })
            .collect()
    }

    pub fn last_title(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            Presented::Title(title) => Some(title.as_str()),
            _ => None,
        })
    }

    pub fn rendered(&self) -> Option<&Radar> {
        self.events.iter().rev().find_map(|event| match event {
            Presented::Rendered(radar) => Some(radar),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn phase(&mut self, phase: Phase) {
        self.events.push(Presented::Phase(phase));
    }

    fn set_title(&mut self, title: &str) {
        self.events.push(Presented::Title(title.to_string()));
    }

    fn request_locator(&mut self) {
        self.events.push(Presented::LocatorRequested);
    }

    fn show_error(&mut self, error: &ClassifiedError) {
        self.events.push(Presented::Error(error.clone()));
    }

    fn show_unauthorized(&mut self, error: &ClassifiedError) {
        self.events.push(Presented::Unauthorized(error.clone()));
    }

    fn clear_error(&mut self) {
        self.events.push(Presented::ErrorCleared);
    }

    fn render(&mut self, radar: &Radar) {
        self.events.push(Presented::Rendered(radar.clone()));
    }
}
