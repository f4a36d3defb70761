//! A scripted service for driving the simulator deterministically.
//!
//! Answers come from a fixed script. Individual calls can be made to fail
//! once, and step processing can be held open until the caller releases it,
//! which is how tests observe the in-flight window.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lineage_core::{Snapshot, TransactionStep, Transformation};
use tokio::sync::Semaphore;

use crate::error::ServiceError;
use crate::traits::SimulationService;
use crate::wire::{InitResponse, ProcessResponse, ResetResponse};

/// Which operation a call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    FetchSteps,
    Initialize,
    Process,
    Reset,
}

/// A call as recorded by [`ScriptedService::calls`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchSteps,
    Initialize,
    Process {
        transaction_id: String,
        step_index: usize,
    },
    Reset {
        transaction_id: String,
    },
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::FetchSteps => CallKind::FetchSteps,
            Call::Initialize => CallKind::Initialize,
            Call::Process { .. } => CallKind::Process,
            Call::Reset { .. } => CallKind::Reset,
        }
    }
}

pub struct ScriptedService {
    steps: Vec<TransactionStep>,
    transaction_id: String,
    initial: Snapshot,
    /// `responses[i]` answers `process_step(_, i)`.
    responses: Vec<ProcessResponse>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<CallKind>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedService {
    pub fn new(
        steps: Vec<TransactionStep>,
        transaction_id: &str,
        initial: Snapshot,
        responses: Vec<ProcessResponse>,
    ) -> Self {
        ScriptedService {
            steps,
            transaction_id: transaction_id.to_string(),
            initial,
            responses,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gate: None,
        }
    }

    /// Three steps `A`, `B`, `C`; each step adds one field.
    pub fn three_steps() -> Self {
        let steps = vec![
            TransactionStep::new("1", "A", "Front Office", "first"),
            TransactionStep::new("2", "B", "Middle Office", "second"),
            TransactionStep::new("3", "C", "Operations", "third"),
        ];
        let mut initial = Snapshot::new();
        initial.insert("a".into(), serde_json::json!(1));

        let mut responses = Vec::new();
        let mut data = initial.clone();
        for field in ["b", "c"] {
            data.insert(field.into(), serde_json::json!(field.to_uppercase()));
            responses.push(ProcessResponse {
                current_data: data.clone(),
                transformations: vec![Transformation::new(
                    field,
                    lineage_core::TransformAction::Added,
                    "scripted",
                )],
            });
        }
        Self::new(steps, "TXN-SCRIPTED", initial, responses)
    }

    /// Hold every `process_step` call until [`release`](Self::release) is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held `process_step` calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Make the next call of this kind fail with a backend error.
    pub fn fail_next(&self, kind: CallKind) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(kind);
        }
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|c| c.kind() == kind).count()
    }

    fn record(&self, call: Call) -> Result<(), ServiceError> {
        let kind = call.kind();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        let fail = self
            .failing
            .lock()
            .map(|mut failing| failing.remove(&kind))
            .unwrap_or(false);
        if fail {
            return Err(ServiceError::Backend(format!("scripted {:?} failure", kind)));
        }
        Ok(())
    }

    fn check_id(&self, transaction_id: &str) -> Result<(), ServiceError> {
        if transaction_id == self.transaction_id {
            Ok(())
        } else {
            Err(ServiceError::UnknownTransaction {
                transaction_id: transaction_id.to_string(),
            })
        }
    }
}

#[async_trait]
impl SimulationService for ScriptedService {
    async fn fetch_steps(&self) -> Result<Vec<TransactionStep>, ServiceError> {
        self.record(Call::FetchSteps)?;
        Ok(self.steps.clone())
    }

    async fn initialize(&self) -> Result<InitResponse, ServiceError> {
        self.record(Call::Initialize)?;
        Ok(InitResponse {
            transaction_id: self.transaction_id.clone(),
            initial_data: self.initial.clone(),
        })
    }

    async fn process_step(
        &self,
        transaction_id: &str,
        step_index: usize,
    ) -> Result<ProcessResponse, ServiceError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ServiceError::Backend(e.to_string()))?;
            permit.forget();
        }
        self.record(Call::Process {
            transaction_id: transaction_id.to_string(),
            step_index,
        })?;
        self.check_id(transaction_id)?;
        self.responses
            .get(step_index)
            .cloned()
            .ok_or(ServiceError::StepOutOfRange {
                step_index,
                step_count: self.steps.len(),
            })
    }

    async fn reset(&self, transaction_id: &str) -> Result<ResetResponse, ServiceError> {
        self.record(Call::Reset {
            transaction_id: transaction_id.to_string(),
        })?;
        self.check_id(transaction_id)?;
        Ok(ResetResponse {
            data: self.initial.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_are_one_shot() {
        let svc = ScriptedService::three_steps();
        svc.fail_next(CallKind::Initialize);
        assert!(svc.initialize().await.is_err());
        assert!(svc.initialize().await.is_ok());
        assert_eq!(svc.count(CallKind::Initialize), 2);
    }

    #[tokio::test]
    async fn gate_holds_processing() {
        let svc = Arc::new(ScriptedService::three_steps().gated());
        let worker = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.process_step("TXN-SCRIPTED", 0).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(svc.count(CallKind::Process), 0);

        svc.release(1);
        let resp = worker.await.unwrap().unwrap();
        assert_eq!(resp.current_data.len(), 2);
    }

    #[tokio::test]
    async fn wrong_transaction_is_rejected() {
        let svc = ScriptedService::three_steps();
        assert!(matches!(
            svc.reset("TXN-OTHER").await,
            Err(ServiceError::UnknownTransaction { .. })
        ));
    }
}
