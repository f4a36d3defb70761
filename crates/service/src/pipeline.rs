//! In-memory trade processing pipeline.
//!
//! Serves the same contract as a remote backend: six fixed steps from
//! trade capture to regulatory reporting. Each transaction keeps only its
//! initial data; the state at step `k` is recomputed by replaying steps
//! `1..=k`, so `process` and `reset` are pure functions of the id.
//!
//! The table holds at most [`DEFAULT_CAPACITY`] transactions; creating one
//! more evicts the oldest.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use lineage_core::{Snapshot, TransactionStep, TransformAction, Transformation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, Weekday};
use tracing::{debug, info};

/// Transactions kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 10_000;

use crate::error::ServiceError;
use crate::traits::SimulationService;
use crate::wire::{InitResponse, ProcessResponse, ResetResponse};

/// The pipeline's steps, in order.
pub fn trade_steps() -> Vec<TransactionStep> {
    vec![
        TransactionStep::new(
            "1",
            "Trade Capture",
            "Front Office",
            "Trade is captured from the trading system with basic details",
        ),
        TransactionStep::new(
            "2",
            "Trade Validation",
            "Middle Office",
            "Trade details are validated against reference data and limits",
        ),
        TransactionStep::new(
            "3",
            "Trade Enrichment",
            "Middle Office",
            "Trade is enriched with market data and settlement terms",
        ),
        TransactionStep::new(
            "4",
            "Risk Calculation",
            "Risk Management",
            "Risk metrics are calculated for the position",
        ),
        TransactionStep::new(
            "5",
            "Settlement",
            "Operations",
            "Settlement instructions are generated for the custodian",
        ),
        TransactionStep::new(
            "6",
            "Regulatory Reporting",
            "Compliance",
            "Trade is reported to the regulator",
        ),
    ]
}

struct Securities {
    id: &'static str,
    name: &'static str,
    price: f64,
}

const SECURITIES: &[Securities] = &[
    Securities {
        id: "US0378331005",
        name: "Apple Inc.",
        price: 189.25,
    },
    Securities {
        id: "US5949181045",
        name: "Microsoft Corp.",
        price: 415.1,
    },
    Securities {
        id: "US02079K3059",
        name: "Alphabet Inc.",
        price: 172.6,
    },
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn number(data: &Snapshot, field: &str) -> f64 {
    data.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn text(data: &Snapshot, field: &str) -> String {
    data.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone)]
struct TransactionRecord {
    initial: Snapshot,
    created_at: OffsetDateTime,
}

/// Records plus their creation order, oldest first.
#[derive(Debug, Default)]
struct TransactionTable {
    records: HashMap<String, TransactionRecord>,
    order: VecDeque<String>,
}

impl TransactionTable {
    fn insert(&mut self, transaction_id: String, record: TransactionRecord, capacity: usize) {
        if self.records.insert(transaction_id.clone(), record).is_none() {
            self.order.push_back(transaction_id);
        }
        while self.records.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.records.remove(&oldest);
            debug!(transaction_id = %oldest, "evicted");
        }
    }
}

/// The reference pipeline. Cheap to share behind an `Arc`.
pub struct TradePipeline {
    steps: Vec<TransactionStep>,
    transactions: Mutex<TransactionTable>,
    capacity: usize,
    rng: Mutex<StdRng>,
    /// Fixed clock for reproducible output; `None` reads the system clock.
    clock: Option<OffsetDateTime>,
}

impl Default for TradePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TradePipeline {
    pub fn new() -> Self {
        TradePipeline {
            steps: trade_steps(),
            transactions: Mutex::new(TransactionTable::default()),
            capacity: DEFAULT_CAPACITY,
            rng: Mutex::new(StdRng::from_entropy()),
            clock: None,
        }
    }

    /// A pipeline whose ids, trades and timestamps are reproducible.
    pub fn deterministic(seed: u64, clock: OffsetDateTime) -> Self {
        TradePipeline {
            steps: trade_steps(),
            transactions: Mutex::new(TransactionTable::default()),
            capacity: DEFAULT_CAPACITY,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            clock: Some(clock),
        }
    }

    /// Keep at most `capacity` transactions (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Transactions currently held.
    pub fn len(&self) -> usize {
        self.transactions
            .lock()
            .map(|t| t.records.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn now(&self) -> OffsetDateTime {
        self.clock.unwrap_or_else(OffsetDateTime::now_utc)
    }

    fn record(&self, transaction_id: &str) -> Result<TransactionRecord, ServiceError> {
        let transactions = self
            .transactions
            .lock()
            .map_err(|_| ServiceError::Backend("transaction table lock poisoned".into()))?;
        transactions
            .records
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownTransaction {
                transaction_id: transaction_id.to_string(),
            })
    }

    /// Create a transaction and return its id and step-0 data.
    pub fn create(&self) -> Result<InitResponse, ServiceError> {
        let created_at = self.now();
        let (transaction_id, initial) = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| ServiceError::Backend("rng lock poisoned".into()))?;
            let id = format!("TXN-{:08X}", rng.gen::<u32>());
            let security = &SECURITIES[rng.gen_range(0..SECURITIES.len())];
            let quantity = rng.gen_range(1..=50) * 100;
            let client = rng.gen_range(1000..10000);
            let trade_type = if rng.gen_bool(0.5) { "BUY" } else { "SELL" };
            let trade_date = created_at
                .date()
                .format(format_description!("[year]-[month]-[day]"))
                .map_err(|e| ServiceError::Backend(e.to_string()))?;

            let mut data = Snapshot::new();
            data.insert(
                "tradeId".into(),
                json!(format!("T{}", rng.gen_range(100000..1000000))),
            );
            data.insert("clientId".into(), json!(format!("CLIENT-{}", client)));
            data.insert("securityId".into(), json!(security.id));
            data.insert("quantity".into(), json!(quantity));
            data.insert("price".into(), json!(security.price));
            data.insert("tradeDate".into(), json!(trade_date));
            data.insert("tradeType".into(), json!(trade_type));
            (id, data)
        };

        self.transactions
            .lock()
            .map_err(|_| ServiceError::Backend("transaction table lock poisoned".into()))?
            .insert(
                transaction_id.clone(),
                TransactionRecord {
                    initial: initial.clone(),
                    created_at,
                },
                self.capacity,
            );
        info!(%transaction_id, "transaction created");

        Ok(InitResponse {
            transaction_id,
            initial_data: initial,
        })
    }

    /// The data and transformations after leaving step `step_index`.
    pub fn advance(
        &self,
        transaction_id: &str,
        step_index: usize,
    ) -> Result<ProcessResponse, ServiceError> {
        if step_index >= self.steps.len().saturating_sub(1) {
            return Err(ServiceError::StepOutOfRange {
                step_index,
                step_count: self.steps.len(),
            });
        }
        let record = self.record(transaction_id)?;
        let mut data = record.initial.clone();
        let mut transformations = Vec::new();
        for target in 1..=step_index + 1 {
            transformations = apply_step(target, &mut data, record.created_at)?;
        }
        debug!(%transaction_id, step_index, "step processed");
        Ok(ProcessResponse {
            current_data: data,
            transformations,
        })
    }

    pub fn restart(&self, transaction_id: &str) -> Result<ResetResponse, ServiceError> {
        let record = self.record(transaction_id)?;
        info!(%transaction_id, "transaction reset");
        Ok(ResetResponse {
            data: record.initial,
        })
    }
}

/// `days` business days after `date`, skipping Saturdays and Sundays.
fn add_business_days(mut date: Date, days: u32) -> Date {
    let mut left = days;
    while left > 0 {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday) {
            left -= 1;
        }
    }
    date
}

/// Apply the transition into step `target` (1-based position after capture).
fn apply_step(
    target: usize,
    data: &mut Snapshot,
    created_at: OffsetDateTime,
) -> Result<Vec<Transformation>, ServiceError> {
    use TransformAction::{Added, Modified, Renamed};

    let fmt_err = |e: time::error::Format| ServiceError::Backend(e.to_string());
    let mut out = Vec::new();
    let mut put = |data: &mut Snapshot, field: &str, value: Value, action, description: &str| {
        data.insert(field.to_string(), value);
        out.push(Transformation::new(field, action, description));
    };

    match target {
        1 => {
            let validated_at = (created_at + Duration::seconds(2))
                .format(&Rfc3339)
                .map_err(fmt_err)?;
            put(data, "validationStatus", json!("VALID"), Added, "Result of validation against reference data");
            put(data, "validationTimestamp", json!(validated_at), Added, "Time the trade passed validation");
        }
        2 => {
            let security_id = text(data, "securityId");
            let name = SECURITIES
                .iter()
                .find(|s| s.id == security_id)
                .map(|s| s.name)
                .unwrap_or("Unknown Security");
            let market_value = round2(number(data, "quantity") * number(data, "price"));
            let settlement_date = add_business_days(created_at.date(), 2)
                .format(format_description!("[year]-[month]-[day]"))
                .map_err(fmt_err)?;
            put(data, "securityName", json!(name), Added, "Security name from the market data feed");
            put(data, "marketValue", json!(market_value), Added, "Quantity multiplied by price");
            put(data, "currency", json!("USD"), Added, "Trading currency from market data");
            put(data, "settlementDate", json!(settlement_date), Added, "Trade date plus two business days");
        }
        3 => {
            let market_value = number(data, "marketValue");
            put(data, "varValue", json!(round2(market_value * 0.05)), Added, "One-day 95% value at risk");
            put(data, "deltaValue", json!(1.0), Added, "Delta of a cash equity position");
            put(data, "gammaValue", json!(0.0), Added, "Gamma of a cash equity position");
            put(data, "marketValue", json!(round2(market_value * 1.002)), Modified, "Re-marked at the risk price");
        }
        4 => {
            let currency = data.shift_remove("currency").unwrap_or_else(|| json!("USD"));
            put(data, "valueCurrency", currency.clone(), Renamed, "Renamed from currency");
            put(data, "settlementCurrency", currency, Added, "Currency the trade settles in");
            put(data, "settlementInstructions", json!("DVP via DTC"), Added, "Delivery versus payment instructions");
            put(
                data,
                "accountDetails",
                json!({"custodian": "State Street", "account": "SS-884201"}),
                Added,
                "Custody account for settlement",
            );
        }
        5 => {
            let regulatory_id = format!("UTI-{}", text(data, "tradeId"));
            put(data, "securityType", json!("EQUITY"), Added, "Asset class for the report");
            put(data, "tradingDesk", json!("US Equities"), Added, "Desk that booked the trade");
            put(data, "reportingStatus", json!("REPORTED"), Added, "Submission status");
            put(data, "regulatoryId", json!(regulatory_id), Added, "Unique transaction identifier");
        }
        _ => {}
    }
    Ok(out)
}

#[async_trait]
impl SimulationService for TradePipeline {
    async fn fetch_steps(&self) -> Result<Vec<TransactionStep>, ServiceError> {
        Ok(self.steps.clone())
    }

    async fn initialize(&self) -> Result<InitResponse, ServiceError> {
        self.create()
    }

    async fn process_step(
        &self,
        transaction_id: &str,
        step_index: usize,
    ) -> Result<ProcessResponse, ServiceError> {
        self.advance(transaction_id, step_index)
    }

    async fn reset(&self, transaction_id: &str) -> Result<ResetResponse, ServiceError> {
        self.restart(transaction_id)
    }
}
