//! Executes session commands against a [`SimulationService`].
//!
//! One tokio task per command. Results are funnelled back over an mpsc
//! channel so the owner applies them on its own task, in arrival order,
//! while pointer and zoom input keeps being handled in between.

use std::sync::Arc;

use lineage_service::SimulationService;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{Command, Completion};

pub struct Runtime<S: SimulationService + ?Sized = dyn SimulationService> {
    service: Arc<S>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    tasks: Vec<JoinHandle<()>>,
    in_flight: usize,
}

impl<S: SimulationService + ?Sized> Runtime<S> {
    pub fn new(service: Arc<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Runtime {
            service,
            tx,
            rx,
            tasks: Vec::new(),
            in_flight: 0,
        }
    }

    /// Commands issued whose completion has not been received yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    pub fn execute(&mut self, commands: Vec<Command>) {
        self.tasks.retain(|handle| !handle.is_finished());
        for command in commands {
            debug!(?command, "spawning");
            let service = Arc::clone(&self.service);
            let tx = self.tx.clone();
            self.in_flight += 1;
            self.tasks.push(tokio::spawn(async move {
                let completion = run(service.as_ref(), command).await;
                // The receiver only disappears when the runtime is dropped.
                let _ = tx.send(completion);
            }));
        }
    }

    /// Wait for the next result. `None` when nothing is outstanding.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(completion)
    }

    /// Abort every outstanding task. Their results are never delivered.
    pub fn shutdown(&mut self) {
        let aborted = self.tasks.len();
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        while self.rx.try_recv().is_ok() {}
        self.in_flight = 0;
        debug!(aborted, "runtime shut down");
    }
}

impl<S: SimulationService + ?Sized> Drop for Runtime<S> {
    fn drop(&mut self) {
        for handle in &self.tasks {
            handle.abort();
        }
    }
}

async fn run<S: SimulationService + ?Sized>(service: &S, command: Command) -> Completion {
    match command {
        Command::FetchSteps { generation } => Completion::Steps {
            generation,
            result: service.fetch_steps().await,
        },
        Command::Initialize { generation } => Completion::Initialized {
            generation,
            result: service.initialize().await,
        },
        Command::ProcessStep(ticket) => {
            let result = service
                .process_step(&ticket.transaction_id, ticket.step_index)
                .await;
            Completion::Processed { ticket, result }
        }
        Command::Reset(ticket) => {
            let result = service.reset(&ticket.transaction_id).await;
            Completion::ResetDone { ticket, result }
        }
        Command::Settle(ticket, delay) => {
            tokio::time::sleep(delay).await;
            Completion::Settled { ticket }
        }
    }
}
