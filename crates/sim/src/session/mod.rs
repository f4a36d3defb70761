//! The simulation state machine as a reducer.
//!
//! A [`Session`] never performs I/O. Each transition returns the
//! [`Command`]s the caller must execute; their results come back as
//! [`Completion`]s through [`Session::apply`]. Every command carries the
//! session generation it was issued under. `reset` and `teardown` bump the
//! generation, so results of calls issued before them are recognised as
//! stale and dropped instead of overwriting newer state.

use std::fmt;
use std::time::Duration;

use lineage_core::{Snapshot, TransactionStep, Transformation};
use lineage_service::{InitResponse, ProcessResponse, ResetResponse, ServiceError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// How long the processing flag is held after a step completes.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);

// ──────────────────────────────────────────────
// Status and errors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Loading,
    Ready,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Loading => "loading",
            Status::Ready => "ready",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Which call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Fetching steps or creating the transaction. Blocks the whole view.
    Initialization,
    Step,
    Reset,
}

impl ErrorKind {
    fn headline(self) -> &'static str {
        match self {
            ErrorKind::Initialization => "Failed to initialize transaction simulation",
            ErrorKind::Step => "Failed to process transaction step",
            ErrorKind::Reset => "Failed to reset transaction",
        }
    }
}

/// A failure surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}: {message}", .kind.headline())]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    fn new(kind: ErrorKind, source: &ServiceError) -> Self {
        SessionError {
            kind,
            message: source.to_string(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.kind == ErrorKind::Initialization
    }
}

// ──────────────────────────────────────────────
// Commands and completions
// ──────────────────────────────────────────────

/// Identifies a step call (or its settle timer) within one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTicket {
    pub generation: u64,
    pub transaction_id: String,
    pub step_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub generation: u64,
    pub transaction_id: String,
}

/// Work the caller must perform on the session's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchSteps { generation: u64 },
    Initialize { generation: u64 },
    ProcessStep(StepTicket),
    Reset(ResetTicket),
    /// Wait, then report [`Completion::Settled`].
    Settle(StepTicket, Duration),
}

/// The outcome of a [`Command`].
#[derive(Debug, Clone)]
pub enum Completion {
    Steps {
        generation: u64,
        result: Result<Vec<TransactionStep>, ServiceError>,
    },
    Initialized {
        generation: u64,
        result: Result<InitResponse, ServiceError>,
    },
    Processed {
        ticket: StepTicket,
        result: Result<ProcessResponse, ServiceError>,
    },
    ResetDone {
        ticket: ResetTicket,
        result: Result<ResetResponse, ServiceError>,
    },
    Settled {
        ticket: StepTicket,
    },
}

impl Completion {
    pub fn generation(&self) -> u64 {
        match self {
            Completion::Steps { generation, .. } | Completion::Initialized { generation, .. } => {
                *generation
            }
            Completion::Processed { ticket, .. } | Completion::Settled { ticket } => {
                ticket.generation
            }
            Completion::ResetDone { ticket, .. } => ticket.generation,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Completion::Steps { .. } => "steps",
            Completion::Initialized { .. } => "initialize",
            Completion::Processed { .. } => "process",
            Completion::ResetDone { .. } => "reset",
            Completion::Settled { .. } => "settle",
        }
    }
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    transaction_id: Option<String>,
    steps: Vec<TransactionStep>,
    current_step: usize,
    snapshot: Snapshot,
    transformations: Vec<Transformation>,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<SessionError>,
    /// The processing flag is held after a step result was applied.
    settling: bool,
    generation: u64,
    #[serde(skip)]
    torn_down: bool,
    /// The process call issued last, until its completion arrives. Survives
    /// reset: the call is still running on the service even though its
    /// result will be discarded.
    #[serde(skip)]
    step_in_flight: Option<StepTicket>,
    /// Steps fetched during initialization, held until the transaction exists.
    #[serde(skip)]
    pending_steps: Option<Vec<TransactionStep>>,
    #[serde(skip)]
    settle: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE)
    }
}

impl Session {
    pub fn new(settle: Duration) -> Self {
        Session {
            transaction_id: None,
            steps: Vec::new(),
            current_step: 0,
            snapshot: Snapshot::new(),
            transformations: Vec::new(),
            status: Status::Loading,
            error: None,
            settling: false,
            generation: 0,
            torn_down: false,
            step_in_flight: None,
            pending_steps: None,
            settle,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn steps(&self) -> &[TransactionStep] {
        &self.steps
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// True once the last step has been reached.
    pub fn is_last_step(&self) -> bool {
        !self.steps.is_empty() && self.current_step + 1 == self.steps.len()
    }

    /// A process call has been issued and has not answered yet, whether or
    /// not its result is still wanted.
    pub fn has_step_in_flight(&self) -> bool {
        self.step_in_flight.is_some()
    }

    /// Ready, or Completed when there is nothing left to process.
    fn idle_status(&self) -> Status {
        if self.is_last_step() {
            Status::Completed
        } else {
            Status::Ready
        }
    }

    // ── Transitions ──────────────────────────────

    /// Begin a full initialization: fetch steps, then create a transaction.
    pub fn start(&mut self) -> Vec<Command> {
        if self.torn_down {
            return Vec::new();
        }
        self.generation += 1;
        self.status = Status::Loading;
        self.error = None;
        self.settling = false;
        self.pending_steps = None;
        info!(generation = self.generation, "initializing simulation");
        vec![Command::FetchSteps {
            generation: self.generation,
        }]
    }

    /// Leave the current step. Ignored unless Ready with a step ahead.
    pub fn advance(&mut self) -> Vec<Command> {
        if self.torn_down || self.status != Status::Ready || self.is_last_step() {
            debug!(status = %self.status, step = self.current_step, "advance ignored");
            return Vec::new();
        }
        if let Some(pending) = &self.step_in_flight {
            debug!(
                issued = pending.generation,
                step = pending.step_index,
                "advance ignored, earlier step call unanswered"
            );
            return Vec::new();
        }
        let Some(transaction_id) = self.transaction_id.clone() else {
            return Vec::new();
        };
        self.status = Status::Processing;
        info!(step = self.current_step, %transaction_id, "processing step");
        let ticket = StepTicket {
            generation: self.generation,
            transaction_id,
            step_index: self.current_step,
        };
        self.step_in_flight = Some(ticket.clone());
        vec![Command::ProcessStep(ticket)]
    }

    /// Return to step 0. Falls back to a full initialization when no
    /// transaction was ever created.
    pub fn reset(&mut self) -> Vec<Command> {
        if self.torn_down || self.status == Status::Loading {
            debug!(status = %self.status, "reset ignored");
            return Vec::new();
        }
        let Some(transaction_id) = self.transaction_id.clone() else {
            return self.start();
        };
        self.generation += 1;
        self.status = Status::Loading;
        self.error = None;
        self.settling = false;
        info!(%transaction_id, generation = self.generation, "resetting transaction");
        vec![Command::Reset(ResetTicket {
            generation: self.generation,
            transaction_id,
        })]
    }

    /// Clear a step or reset failure so the user can try again.
    ///
    /// Initialization failures are not dismissable; only [`reset`](Self::reset)
    /// leaves them.
    pub fn dismiss_error(&mut self) -> Vec<Command> {
        match &self.error {
            Some(err) if self.status == Status::Error && !err.is_blocking() => {
                self.error = None;
                self.status = self.idle_status();
                debug!(status = %self.status, "error dismissed");
            }
            _ => {}
        }
        Vec::new()
    }

    /// The owner is going away. Every later completion is discarded.
    pub fn teardown(&mut self) {
        if !self.torn_down {
            self.torn_down = true;
            self.generation += 1;
            info!("session torn down");
        }
    }

    /// Fold a completion into the session.
    pub fn apply(&mut self, completion: Completion) -> Vec<Command> {
        if let Completion::Processed { ticket, .. } = &completion {
            if self.step_in_flight.as_ref() == Some(ticket) {
                self.step_in_flight = None;
            }
        }
        if self.torn_down {
            debug!(call = completion.name(), "completion after teardown discarded");
            return Vec::new();
        }
        if completion.generation() != self.generation {
            debug!(
                call = completion.name(),
                issued = completion.generation(),
                current = self.generation,
                "stale completion discarded"
            );
            return Vec::new();
        }

        match completion {
            Completion::Steps { result, .. } => match result {
                Ok(steps) if steps.is_empty() => {
                    self.fail_initialization(&ServiceError::Backend(
                        "service returned an empty step list".into(),
                    ));
                    Vec::new()
                }
                Ok(steps) => {
                    debug!(count = steps.len(), "steps fetched");
                    self.pending_steps = Some(steps);
                    vec![Command::Initialize {
                        generation: self.generation,
                    }]
                }
                Err(e) => {
                    self.fail_initialization(&e);
                    Vec::new()
                }
            },
            Completion::Initialized { result, .. } => {
                match (result, self.pending_steps.take()) {
                    (Ok(init), Some(steps)) => {
                        info!(transaction_id = %init.transaction_id, steps = steps.len(), "simulation ready");
                        self.steps = steps;
                        self.transaction_id = Some(init.transaction_id);
                        self.snapshot = init.initial_data;
                        self.transformations.clear();
                        self.current_step = 0;
                        self.status = self.idle_status();
                    }
                    (Ok(_), None) => self.fail_initialization(&ServiceError::Backend(
                        "transaction created before steps were fetched".into(),
                    )),
                    (Err(e), _) => self.fail_initialization(&e),
                }
                Vec::new()
            }
            Completion::Processed { ticket, result } => {
                if self.status != Status::Processing
                    || self.settling
                    || ticket.step_index != self.current_step
                {
                    debug!(step = ticket.step_index, "unexpected step result discarded");
                    return Vec::new();
                }
                match result {
                    Ok(resp) => {
                        self.snapshot = resp.current_data;
                        self.transformations = resp.transformations;
                        self.current_step += 1;
                        self.settling = true;
                        info!(step = self.current_step, "step applied");
                        vec![Command::Settle(
                            StepTicket {
                                step_index: self.current_step,
                                ..ticket
                            },
                            self.settle,
                        )]
                    }
                    Err(e) => {
                        warn!(step = ticket.step_index, error = %e, "step failed");
                        self.status = Status::Error;
                        self.error = Some(SessionError::new(ErrorKind::Step, &e));
                        Vec::new()
                    }
                }
            }
            Completion::Settled { ticket } => {
                if self.settling && ticket.step_index == self.current_step {
                    self.settling = false;
                    self.status = self.idle_status();
                    debug!(status = %self.status, "processing flag released");
                }
                Vec::new()
            }
            Completion::ResetDone { result, .. } => {
                match result {
                    Ok(resp) => {
                        info!("transaction reset to step 0");
                        self.snapshot = resp.data;
                        self.transformations.clear();
                        self.current_step = 0;
                        self.status = self.idle_status();
                    }
                    Err(e) => {
                        warn!(error = %e, "reset failed");
                        self.status = Status::Error;
                        self.error = Some(SessionError::new(ErrorKind::Reset, &e));
                    }
                }
                Vec::new()
            }
        }
    }

    fn fail_initialization(&mut self, source: &ServiceError) {
        warn!(error = %source, "initialization failed");
        self.transaction_id = None;
        self.steps.clear();
        self.snapshot.clear();
        self.transformations.clear();
        self.current_step = 0;
        self.pending_steps = None;
        self.status = Status::Error;
        self.error = Some(SessionError::new(ErrorKind::Initialization, source));
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
