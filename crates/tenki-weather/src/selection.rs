//! Selection state machine (region → office → fetch → display).
//!
//! Hosts feed [`SelectionCommand`]s; every transition lives in
//! [`SelectionState::apply`]. [`ForecastSession`] pairs the machine with a
//! resolver and cancels a fetch as soon as a newer selection replaces it.

use tokio_util::sync::CancellationToken;

use tenki_core::{ForecastError, ForecastErrorKind};

use crate::hierarchy::AreaHierarchyIndex;
use crate::resolver::{ForecastOutcome, SelectionResolver};

/// Input events from the host.
#[derive(Debug)]
pub enum SelectionCommand {
    SelectRegion(String),
    SelectOffice(String),
    FetchStarted {
        ticket: u64,
    },
    FetchCompleted {
        ticket: u64,
        result: Result<ForecastOutcome, ForecastError>,
    },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    RegionSelected {
        region_code: String,
    },
    OfficeSelected {
        region_code: String,
        office_code: String,
    },
    Fetching {
        region_code: String,
        office_code: String,
        ticket: u64,
    },
    Displayed {
        region_code: String,
        outcome: ForecastOutcome,
    },
    /// Terminal for this interaction; a new region selection starts over.
    Failed {
        kind: ForecastErrorKind,
        message: String,
    },
}

impl SelectionState {
    pub fn region_code(&self) -> Option<&str> {
        match self {
            Self::RegionSelected { region_code }
            | Self::OfficeSelected { region_code, .. }
            | Self::Fetching { region_code, .. }
            | Self::Displayed { region_code, .. } => Some(region_code.as_str()),
            Self::Idle | Self::Failed { .. } => None,
        }
    }

    fn failed(err: ForecastError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Transition table.
    pub fn apply(self, command: SelectionCommand, index: &AreaHierarchyIndex) -> Self {
        match (self, command) {
            (_, SelectionCommand::Reset) => Self::Idle,

            (_, SelectionCommand::SelectRegion(name)) => match index.resolve_region_code(&name) {
                Ok(code) => Self::RegionSelected {
                    region_code: code.to_string(),
                },
                Err(e) => Self::failed(e),
            },

            (state @ (Self::Idle | Self::Failed { .. }), SelectionCommand::SelectOffice(name)) => {
                tracing::warn!(office = %name, "Office selected before a region; ignoring");
                state
            }

            (state, SelectionCommand::SelectOffice(name)) => {
                let Some(region_code) = state.region_code().map(str::to_string) else {
                    return state;
                };
                match index.resolve_office_code(&name, &region_code) {
                    Ok(office_code) => Self::OfficeSelected {
                        office_code: office_code.to_string(),
                        region_code,
                    },
                    Err(e) => Self::failed(e),
                }
            }

            (
                Self::OfficeSelected {
                    region_code,
                    office_code,
                },
                SelectionCommand::FetchStarted { ticket },
            ) => Self::Fetching {
                region_code,
                office_code,
                ticket,
            },

            (
                Self::Fetching {
                    region_code,
                    ticket: current,
                    ..
                },
                SelectionCommand::FetchCompleted { ticket, result },
            ) if ticket == current => match result {
                Ok(outcome) => Self::Displayed {
                    region_code,
                    outcome,
                },
                Err(e) => Self::failed(e),
            },

            (state, SelectionCommand::FetchCompleted { ticket, .. }) => {
                tracing::debug!(ticket, "Ignoring superseded fetch result");
                state
            }

            (state, SelectionCommand::FetchStarted { .. }) => state,
        }
    }
}

/// A fetch detached from the session so the host can run it anywhere.
pub struct FetchJob {
    ticket: u64,
    office_code: String,
    cancel: CancellationToken,
    resolver: SelectionResolver,
}

/// Result of a [`FetchJob`], handed back through [`ForecastSession::finish`].
#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: u64,
    pub result: Result<ForecastOutcome, ForecastError>,
}

impl FetchJob {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn office_code(&self) -> &str {
        &self.office_code
    }

    pub async fn run(self) -> FetchCompletion {
        let result = self
            .resolver
            .fetch_office(&self.office_code, &self.cancel)
            .await;
        FetchCompletion {
            ticket: self.ticket,
            result,
        }
    }
}

/// One user's interaction: state plus the in-flight fetch, if any.
pub struct ForecastSession {
    resolver: SelectionResolver,
    state: SelectionState,
    next_ticket: u64,
    inflight: Option<CancellationToken>,
}

impl ForecastSession {
    pub fn new(resolver: SelectionResolver) -> Self {
        Self {
            resolver,
            state: SelectionState::Idle,
            next_ticket: 0,
            inflight: None,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    fn dispatch(&mut self, command: SelectionCommand) -> &SelectionState {
        let state = std::mem::take(&mut self.state);
        self.state = state.apply(command, self.resolver.index());
        &self.state
    }

    fn cancel_inflight(&mut self) {
        if let Some(token) = self.inflight.take() {
            token.cancel();
        }
    }

    pub fn reset(&mut self) -> &SelectionState {
        self.cancel_inflight();
        self.dispatch(SelectionCommand::Reset)
    }

    pub fn select_region(&mut self, name: &str) -> &SelectionState {
        self.cancel_inflight();
        self.dispatch(SelectionCommand::SelectRegion(name.to_string()))
    }

    /// Record the office choice without fetching.
    pub fn choose_office(&mut self, name: &str) -> &SelectionState {
        self.cancel_inflight();
        self.dispatch(SelectionCommand::SelectOffice(name.to_string()))
    }

    /// Start fetching the selected office; `None` unless an office is selected.
    pub fn begin_fetch(&mut self) -> Option<FetchJob> {
        let SelectionState::OfficeSelected { office_code, .. } = &self.state else {
            return None;
        };
        let office_code = office_code.clone();

        self.cancel_inflight();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let cancel = CancellationToken::new();
        self.inflight = Some(cancel.clone());
        self.dispatch(SelectionCommand::FetchStarted { ticket });

        Some(FetchJob {
            ticket,
            office_code,
            cancel,
            resolver: self.resolver.clone(),
        })
    }

    pub fn finish(&mut self, completion: FetchCompletion) -> &SelectionState {
        if matches!(self.state, SelectionState::Fetching { ticket, .. } if ticket == completion.ticket)
        {
            self.inflight = None;
        }
        self.dispatch(SelectionCommand::FetchCompleted {
            ticket: completion.ticket,
            result: completion.result,
        })
    }

    /// Choose an office and fetch its forecast in place.
    pub async fn select_office(&mut self, name: &str) -> &SelectionState {
        self.choose_office(name);
        match self.begin_fetch() {
            Some(job) => {
                let completion = job.run().await;
                self.finish(completion)
            }
            None => &self.state,
        }
    }
}
