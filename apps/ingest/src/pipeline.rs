//! Wires resolution, loading and assembly together for one session.

use crate::assemble::{AssemblyPolicy, RadarAssembler};
use crate::auth::{AuthSession, ConsentProvider};
use crate::config::RadarConfig;
use crate::domain::Radar;
use crate::error::{classify, ClassifiedError, LoadFailure};
use crate::loader::{LoadContext, LoadedDocument, Loader, SheetLoader};
use crate::net::Fetcher;
use crate::presenter::{Phase, Presenter};
use crate::source::{resolve, Locator, ResolvedSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Rendered(Radar),
    /// No source could be resolved; the user has been asked for one.
    AwaitingInput,
    Failed(ClassifiedError),
}

impl LoadOutcome {
    pub const fn is_unauthorized(&self) -> bool {
        match self {
            Self::Failed(error) => error.is_unauthorized(),
            _ => false,
        }
    }

    pub const fn radar(&self) -> Option<&Radar> {
        match self {
            Self::Rendered(radar) => Some(radar),
            _ => None,
        }
    }

    pub const fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Owns the collaborators and the authorization session across loads.
pub struct Pipeline<F, C> {
    config: RadarConfig,
    fetcher: F,
    consent: C,
    session: AuthSession,
    assembler: RadarAssembler,
    input_disabled: bool,
    active_sheet: Option<SheetLoader>,
}

impl<F: Fetcher, C: ConsentProvider> Pipeline<F, C> {
    pub fn new(config: RadarConfig, fetcher: F, consent: C) -> Self {
        let assembler = RadarAssembler::new(AssemblyPolicy::from_config(&config));
        Self {
            config,
            fetcher,
            consent,
            session: AuthSession::new(),
            assembler,
            input_disabled: false,
            active_sheet: None,
        }
    }

    pub const fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub const fn consent(&self) -> &C {
        &self.consent
    }

    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    /// False once a configuration error has been reported.
    pub const fn accepts_input(&self) -> bool {
        !self.input_disabled
    }

    pub async fn load(&mut self, locator: &Locator, presenter: &mut dyn Presenter) -> LoadOutcome {
        if let Err(error) = self.config.validate() {
            self.input_disabled = true;
            let classified = ClassifiedError::invalid_config(&error);
            log::warn!("configuration rejected: {error}");
            presenter.show_error(&classified);
            return LoadOutcome::Failed(classified);
        }

        let source = resolve(locator, &self.config);
        log::debug!("resolved source: {source:?}");
        let Some(loader) = Loader::for_source(&source) else {
            if let ResolvedSource::None { title } = &source {
                presenter.set_title(title);
            }
            presenter.request_locator();
            return LoadOutcome::AwaitingInput;
        };

        loader.init(presenter);
        self.active_sheet = match &loader {
            Loader::Sheet(sheet) => Some(sheet.clone()),
            Loader::Csv(_) | Loader::Json(_) => None,
        };

        let mut ctx = LoadContext {
            fetcher: &self.fetcher,
            consent: &self.consent,
            session: &mut self.session,
            config: &self.config,
        };
        let result = loader.build(&mut ctx).await;
        self.finish(result, presenter)
    }

    /// Retries the last sheet with forced interactive consent.
    pub async fn switch_account(&mut self, presenter: &mut dyn Presenter) -> LoadOutcome {
        let Some(loader) = self.active_sheet.clone() else {
            presenter.request_locator();
            return LoadOutcome::AwaitingInput;
        };

        presenter.phase(Phase::Loading);
        let mut ctx = LoadContext {
            fetcher: &self.fetcher,
            consent: &self.consent,
            session: &mut self.session,
            config: &self.config,
        };
        let result = loader.authenticate(true, &mut ctx).await;
        if result.is_ok() {
            presenter.clear_error();
        }
        self.finish(result, presenter)
    }

    fn finish(
        &self,
        result: Result<LoadedDocument, ClassifiedError>,
        presenter: &mut dyn Presenter,
    ) -> LoadOutcome {
        let document = match result {
            Ok(document) => document,
            Err(error) => return fail(error, presenter),
        };

        match self
            .assembler
            .assemble(&document.records, &document.metadata)
        {
            Ok(radar) => {
                log::info!(
                    "assembled {} blips in {} quadrants",
                    radar.blip_count(),
                    radar.quadrants.len()
                );
                presenter.set_title(&radar.title);
                presenter.phase(Phase::Ready);
                presenter.render(&radar);
                LoadOutcome::Rendered(radar)
            }
            Err(error) => fail(
                classify(&LoadFailure::Assembly(error), document.source_kind),
                presenter,
            ),
        }
    }
}

fn fail(error: ClassifiedError, presenter: &mut dyn Presenter) -> LoadOutcome {
    if error.is_unauthorized() {
        presenter.phase(Phase::Unauthorized);
        presenter.show_unauthorized(&error);
    } else {
        presenter.show_error(&error);
    }
    LoadOutcome::Failed(error)
}
