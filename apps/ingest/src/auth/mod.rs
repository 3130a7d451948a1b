//! Silent-then-interactive authorization for private sheets.

mod consent;

pub use consent::{ConsentError, ConsentProvider, PromptConsent, PromptInput};

use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

use crate::net::{FetchError, FetchRequest, FetchResponse, Fetcher};

/// Remembers whether interactive consent already ran. Lives as long as the
/// pipeline; only [`AuthFlow`] changes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthSession {
    consent_attempted: bool,
}

impl AuthSession {
    pub const fn new() -> Self {
        Self {
            consent_attempted: false,
        }
    }

    pub const fn consent_attempted(&self) -> bool {
        self.consent_attempted
    }

    pub(crate) fn mark_consent_attempted(&mut self) {
        self.consent_attempted = true;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AuthState {
    Unattempted,
    SilentAttempt,
    PublicOk,
    PrivateDetected,
    InteractiveConsent,
    Authorized,
    Denied,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unattempted => write!(f, "Unattempted"),
            Self::SilentAttempt => write!(f, "SilentAttempt"),
            Self::PublicOk => write!(f, "PublicOk"),
            Self::PrivateDetected => write!(f, "PrivateDetected"),
            Self::InteractiveConsent => write!(f, "InteractiveConsent"),
            Self::Authorized => write!(f, "Authorized"),
            Self::Denied => write!(f, "Denied"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AuthEvent {
    Begin { force: bool },
    /// Any answer other than 403.
    Answered { status: u16 },
    Forbidden { consent_attempted: bool },
    RequestConsent,
    ConsentRefused,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin { force } => write!(f, "Begin(force={force})"),
            Self::Answered { status } => write!(f, "Answered({status})"),
            Self::Forbidden { consent_attempted } => {
                write!(f, "Forbidden(consent_attempted={consent_attempted})")
            }
            Self::RequestConsent => write!(f, "RequestConsent"),
            Self::ConsentRefused => write!(f, "ConsentRefused"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition from {from} with event {event}")]
pub struct AuthTransitionError {
    from: AuthState,
    event: AuthEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("access to the sheet was refused")]
    Denied,
    #[error(transparent)]
    Consent(#[from] ConsentError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Transition(#[from] AuthTransitionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMachine {
    state: AuthState,
}

impl Default for AuthMachine {
    fn default() -> Self {
        Self::new(AuthState::Unattempted)
    }
}

impl AuthMachine {
    pub const fn new(initial_state: AuthState) -> Self {
        Self {
            state: initial_state,
        }
    }

    pub const fn state(&self) -> AuthState {
        self.state
    }

    pub fn process_event(&mut self, event: &AuthEvent) -> Result<AuthState, AuthTransitionError> {
        let next_state = NextState::try_from((self.state, event))?;
        log::info!("auth: {} --{event}--> {}", self.state, next_state.0);
        self.state = next_state.0;
        Ok(self.state)
    }
}

struct NextState(AuthState);

impl NextState {
    const fn new(state: AuthState) -> Self {
        Self(state)
    }
}

impl AuthState {
    const fn next_state(self) -> NextState {
        NextState::new(self)
    }
}

impl TryFrom<(AuthState, &AuthEvent)> for NextState {
    type Error = AuthTransitionError;

    fn try_from(value: (AuthState, &AuthEvent)) -> Result<Self, Self::Error> {
        let (current_state, event) = value;

        match (current_state, event) {
            (AuthState::Unattempted, AuthEvent::Begin { force: false }) => {
                Ok(AuthState::SilentAttempt.next_state())
            }
            (AuthState::Unattempted, AuthEvent::Begin { force: true })
            | (AuthState::PrivateDetected, AuthEvent::RequestConsent) => {
                Ok(AuthState::InteractiveConsent.next_state())
            }
            (AuthState::SilentAttempt, AuthEvent::Answered { .. }) => {
                Ok(AuthState::PublicOk.next_state())
            }
            (
                AuthState::SilentAttempt,
                AuthEvent::Forbidden {
                    consent_attempted: false,
                },
            ) => Ok(AuthState::PrivateDetected.next_state()),
            (
                AuthState::SilentAttempt,
                AuthEvent::Forbidden {
                    consent_attempted: true,
                },
            )
            | (
                AuthState::InteractiveConsent,
                AuthEvent::Forbidden { .. } | AuthEvent::ConsentRefused,
            ) => Ok(AuthState::Denied.next_state()),
            (AuthState::InteractiveConsent, AuthEvent::Answered { .. }) => {
                Ok(AuthState::Authorized.next_state())
            }
            _ => Err(AuthTransitionError {
                from: current_state,
                event: event.clone(),
            }),
        }
    }
}

/// A response obtained through the flow plus the token that got it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub response: FetchResponse,
    pub token: Option<String>,
}

/// One run of the escalation for one request.
pub struct AuthFlow<'a> {
    fetcher: &'a dyn Fetcher,
    consent: &'a dyn ConsentProvider,
    machine: AuthMachine,
}

impl<'a> AuthFlow<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, consent: &'a dyn ConsentProvider) -> Self {
        Self {
            fetcher,
            consent,
            machine: AuthMachine::default(),
        }
    }

    pub const fn state(&self) -> AuthState {
        self.machine.state()
    }

    /// Requests `url`, escalating to interactive consent on the first 403 of
    /// the session. `force` skips the silent attempt.
    pub async fn access(
        &mut self,
        session: &mut AuthSession,
        url: &str,
        force: bool,
    ) -> Result<Access, AuthError> {
        self.machine.process_event(&AuthEvent::Begin { force })?;
        if force {
            return self.interactive(session, url).await;
        }

        let token = self.consent.silent_token().await;
        let response = self
            .fetcher
            .fetch(&FetchRequest::get(url).with_bearer(token.clone()))
            .await?;
        if !response.is_forbidden() {
            self.machine.process_event(&AuthEvent::Answered {
                status: response.status,
            })?;
            return Ok(Access { response, token });
        }

        let consent_attempted = session.consent_attempted();
        self.machine
            .process_event(&AuthEvent::Forbidden { consent_attempted })?;
        if consent_attempted {
            return Err(AuthError::Denied);
        }

        self.machine.process_event(&AuthEvent::RequestConsent)?;
        self.interactive(session, url).await
    }

    async fn interactive(&mut self, session: &mut AuthSession, url: &str) -> Result<Access, AuthError> {
        session.mark_consent_attempted();

        let token = match self.consent.interactive_token().await {
            Ok(token) => token,
            Err(error) => {
                self.machine.process_event(&AuthEvent::ConsentRefused)?;
                return Err(error.into());
            }
        };

        let response = self
            .fetcher
            .fetch(&FetchRequest::get(url).with_bearer(Some(token.clone())))
            .await?;
        if response.is_forbidden() {
            self.machine.process_event(&AuthEvent::Forbidden {
                consent_attempted: true,
            })?;
            return Err(AuthError::Denied);
        }

        self.machine.process_event(&AuthEvent::Answered {
            status: response.status,
        })?;
        Ok(Access {
            response,
            token: Some(token),
        })
    }
}
