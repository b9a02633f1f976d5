//! Dairy Breeding Core Library
//!
//! Local-first breeding-cycle tracking for a dairy herd: AI services,
//! pregnancy diagnosis (PD), deliveries, and a daily attention list.
//!
//! # Architecture
//!
//! ```text
//! cows + breeding_cycles (SQLite)
//!            │
//!            ▼
//!   build_summaries ── one summary per cow, from its latest cycle
//!            │
//!            ▼
//!   classify_and_sort ── priority bucket + in-bucket day count
//!            │
//!            ▼
//!   attention list / JSON + CSV export
//!
//! record_ai ──▶ CycleGuard ──▶ create_cycle (guard re-checked in-transaction)
//! ```
//!
//! # Core Principle
//!
//! **One open cycle per cow.** A new AI can only be recorded once the
//! previous cycle has a PD outcome.
//!
//! # Modules
//!
//! - [`db`]: SQLite storage for cows, cycles and alert settings
//! - [`models`]: Domain types (Cow, BreedingCycle, CowSummary, AlertConfig)
//! - [`engine`]: Due dates, status derivation, prioritisation, guard, workflows
//! - [`store`]: Record-store trait the engine runs against
//! - [`export`]: Attention list export
//! - [`logging`]: `tracing` subscriber setup

pub mod db;
pub mod engine;
pub mod export;
pub mod logging;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use db::Database;
pub use engine::{
    build_summaries, classify_and_sort, derive_status, ClassifiedCow, CycleGuard, CycleLifecycle,
    EngineError, GuardResult, MilkingAction, MilkingWorkflow, OpenCycleOutcome, SortGroup,
};
pub use export::{AttentionExporter, AttentionReport};
pub use models::{
    AiStatus, AlertConfig, BreedingCycle, CalfGender, Cow, CowSummary, CycleStatus,
    MilkingGroupState, NewCycle, PdResult,
};
pub use store::RecordStore;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use models::{Delivery, PdOutcome};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum BreedingError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for BreedingError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => BreedingError::NotFound(what),
            db::DbError::Constraint(msg) => BreedingError::InvalidInput(msg),
            other => BreedingError::DatabaseError(other.to_string()),
        }
    }
}

impl From<EngineError> for BreedingError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(msg) => BreedingError::InvalidInput(msg),
            EngineError::NotFound(what) => BreedingError::NotFound(what),
            EngineError::Store(source) => match source.downcast::<db::DbError>() {
                Ok(db_err) => (*db_err).into(),
                Err(other) => BreedingError::DatabaseError(other.to_string()),
            },
        }
    }
}

impl From<models::ParseEnumError> for BreedingError {
    fn from(e: models::ParseEnumError) -> Self {
        BreedingError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for BreedingError {
    fn from(e: serde_json::Error) -> Self {
        BreedingError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for BreedingError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        BreedingError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<DairyBreedingCore>, BreedingError> {
    let db = Database::open(&path)?;
    tracing::info!(%path, "opened breeding database");
    Ok(Arc::new(DairyBreedingCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<DairyBreedingCore>, BreedingError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(DairyBreedingCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Route library logs to stderr, filtered by `RUST_LOG`.
#[uniffi::export]
pub fn init_logging() {
    logging::init();
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct DairyBreedingCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl DairyBreedingCore {
    // =========================================================================
    // Cow Operations
    // =========================================================================

    /// Register a new cow.
    pub fn create_cow(&self, cow_number: String) -> Result<FfiCow, BreedingError> {
        let cow_number = cow_number.trim().to_string();
        if cow_number.is_empty() {
            return Err(BreedingError::InvalidInput("cow number is empty".into()));
        }
        let db = self.db.lock()?;
        let cow = Cow::new(cow_number);
        db.insert_cow(&cow)?;
        Ok(cow.into())
    }

    /// Get a cow by ID.
    pub fn get_cow(&self, cow_id: String) -> Result<Option<FfiCow>, BreedingError> {
        let db = self.db.lock()?;
        Ok(db.get_cow(&cow_id)?.map(|c| c.into()))
    }

    /// Get a cow by herd number.
    pub fn get_cow_by_number(&self, cow_number: String) -> Result<Option<FfiCow>, BreedingError> {
        let db = self.db.lock()?;
        Ok(db.get_cow_by_number(cow_number.trim())?.map(|c| c.into()))
    }

    /// List all cows.
    pub fn list_cows(&self) -> Result<Vec<FfiCow>, BreedingError> {
        let db = self.db.lock()?;
        let cows = db.list_cows()?;
        Ok(cows.into_iter().map(|c| c.into()).collect())
    }

    /// Delete a cow together with its cycles.
    pub fn delete_cow(&self, cow_id: String) -> Result<bool, BreedingError> {
        let db = self.db.lock()?;
        Ok(db.delete_cow(&cow_id)?)
    }

    // =========================================================================
    // Breeding Cycle Operations
    // =========================================================================

    /// Whether the cow may start a new breeding cycle.
    pub fn can_start_new_cycle(&self, cow_id: String) -> Result<FfiGuardResult, BreedingError> {
        let db = self.db.lock()?;
        let result = CycleGuard::new(&*db).can_start_new_cycle(&cow_id)?;
        Ok(result.into())
    }

    /// Record an AI service, opening a new cycle if the guard allows it.
    ///
    /// A blocked AI is reported through `blocking_record`, not as an error.
    pub fn record_ai(
        &self,
        cow_id: String,
        ai_date: String,
        ai_status: Option<String>,
        expected_delivery_date: Option<String>,
        notes: Option<String>,
    ) -> Result<FfiRecordAiResult, BreedingError> {
        let mut new_cycle = NewCycle::new(cow_id, engine::parse_date(&ai_date)?);
        if let Some(status) = ai_status.as_deref() {
            new_cycle.ai_status = status.parse()?;
        }
        new_cycle.expected_delivery_date =
            engine::parse_optional_date(expected_delivery_date.as_deref())?;
        new_cycle.notes = notes.filter(|n| !n.trim().is_empty());

        let db = self.db.lock()?;
        let outcome = CycleGuard::new(&*db).open_cycle(&new_cycle)?;
        Ok(outcome.into())
    }

    /// Record the pregnancy diagnosis for a cycle.
    pub fn record_pd(
        &self,
        cycle_id: String,
        result: String,
        pd_date: String,
    ) -> Result<FfiBreedingCycle, BreedingError> {
        let outcome = PdOutcome {
            result: result.parse()?,
            date: engine::parse_date(&pd_date)?,
        };
        let db = self.db.lock()?;
        let cycle = CycleLifecycle::new(&*db).record_pd(&cycle_id, outcome)?;
        Ok(cycle.into())
    }

    /// Record the delivery for a pregnant cycle.
    pub fn record_delivery(
        &self,
        cycle_id: String,
        delivery_date: String,
        calf_gender: Option<String>,
    ) -> Result<FfiBreedingCycle, BreedingError> {
        let delivery = Delivery {
            date: engine::parse_date(&delivery_date)?,
            calf_gender: calf_gender
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::parse::<CalfGender>)
                .transpose()?,
        };
        let db = self.db.lock()?;
        let cycle = CycleLifecycle::new(&*db).record_delivery(&cycle_id, delivery)?;
        Ok(cycle.into())
    }

    /// Change the AI status of a cycle that has no PD yet.
    pub fn set_ai_status(
        &self,
        cycle_id: String,
        ai_status: String,
    ) -> Result<FfiBreedingCycle, BreedingError> {
        let status: AiStatus = ai_status.parse()?;
        let db = self.db.lock()?;
        let cycle = CycleLifecycle::new(&*db).set_ai_status(&cycle_id, status)?;
        Ok(cycle.into())
    }

    /// Get a cycle by ID.
    pub fn get_cycle(&self, cycle_id: String) -> Result<Option<FfiBreedingCycle>, BreedingError> {
        let db = self.db.lock()?;
        Ok(db.get_cycle(&cycle_id)?.map(|c| c.into()))
    }

    /// All cycles of a cow, oldest first.
    pub fn list_cycles_for_cow(&self, cow_id: String) -> Result<Vec<FfiBreedingCycle>, BreedingError> {
        let db = self.db.lock()?;
        let cycles = db.list_cycles_for_cow(&cow_id)?;
        Ok(cycles.into_iter().map(|c| c.into()).collect())
    }

    // =========================================================================
    // Attention List
    // =========================================================================

    /// Classified herd in attention order for `today` (YYYY-MM-DD).
    pub fn attention_list(&self, today: String) -> Result<Vec<FfiAttentionItem>, BreedingError> {
        let today = engine::parse_date(&today)?;
        let db = self.db.lock()?;
        let classified = AttentionExporter::new(&db).classify(today)?;
        Ok(classified.into_iter().map(|c| c.into()).collect())
    }

    // =========================================================================
    // Milking Group Workflow
    // =========================================================================

    /// Flag a cow for moving to the milking group.
    pub fn flag_for_move(&self, cow_id: String) -> Result<FfiCow, BreedingError> {
        let db = self.db.lock()?;
        let cow = MilkingWorkflow::new(&*db).flag_for_move(&cow_id, Utc::now())?;
        Ok(cow.into())
    }

    /// Clear a move flag.
    pub fn undo_flag(&self, cow_id: String) -> Result<FfiCow, BreedingError> {
        let db = self.db.lock()?;
        let cow = MilkingWorkflow::new(&*db).undo_flag(&cow_id, Utc::now())?;
        Ok(cow.into())
    }

    /// Mark a cow as moved to the milking group.
    pub fn mark_moved(&self, cow_id: String) -> Result<FfiCow, BreedingError> {
        let db = self.db.lock()?;
        let cow = MilkingWorkflow::new(&*db).mark_moved(&cow_id, Utc::now())?;
        Ok(cow.into())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Current alert thresholds.
    pub fn get_alert_config(&self) -> Result<FfiAlertConfig, BreedingError> {
        let db = self.db.lock()?;
        Ok(db.get_alert_config()?.into())
    }

    /// Persist alert thresholds.
    pub fn set_alert_config(&self, config: FfiAlertConfig) -> Result<(), BreedingError> {
        let db = self.db.lock()?;
        db.set_alert_config(&config.into())?;
        Ok(())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export the attention list as JSON.
    pub fn export_attention_json(&self, today: String) -> Result<String, BreedingError> {
        let today = engine::parse_date(&today)?;
        let db = self.db.lock()?;
        let report = AttentionExporter::new(&db).export(today)?;
        Ok(report.to_json()?)
    }

    /// Export the attention list as CSV.
    pub fn export_attention_csv(&self, today: String) -> Result<String, BreedingError> {
        let today = engine::parse_date(&today)?;
        let db = self.db.lock()?;
        let report = AttentionExporter::new(&db).export(today)?;
        Ok(report.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

fn date_string(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

fn timestamp_string(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|t| t.to_rfc3339())
}

/// FFI-safe cow.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCow {
    pub id: String,
    pub cow_number: String,
    /// `normal`, `flagged_for_move` or `moved_to_milking`
    pub milking_state: String,
    pub needs_milking_move: bool,
    pub needs_milking_move_at: Option<String>,
    pub moved_to_milking: bool,
    pub moved_to_milking_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Cow> for FfiCow {
    fn from(cow: Cow) -> Self {
        Self {
            milking_state: cow.milking.label().to_string(),
            needs_milking_move: cow.needs_milking_move(),
            needs_milking_move_at: timestamp_string(cow.needs_milking_move_at()),
            moved_to_milking: cow.moved_to_milking(),
            moved_to_milking_at: timestamp_string(cow.moved_to_milking_at()),
            id: cow.id,
            cow_number: cow.cow_number,
            created_at: cow.created_at,
            updated_at: cow.updated_at,
        }
    }
}

/// FFI-safe breeding cycle.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBreedingCycle {
    pub id: String,
    pub cow_id: String,
    pub service_number: u32,
    pub ai_date: String,
    pub ai_status: String,
    pub pd_done: bool,
    pub pd_result: Option<String>,
    pub pd_date: Option<String>,
    pub expected_delivery_date: Option<String>,
    pub actual_delivery_date: Option<String>,
    pub calf_gender: Option<String>,
    pub notes: Option<String>,
}

impl From<BreedingCycle> for FfiBreedingCycle {
    fn from(cycle: BreedingCycle) -> Self {
        Self {
            pd_done: cycle.pd_done(),
            pd_result: cycle.pd_result().map(|r| r.as_str().to_string()),
            pd_date: date_string(cycle.pd_date()),
            service_number: cycle.service_number,
            ai_date: cycle.ai_date.to_string(),
            ai_status: cycle.ai_status.as_str().to_string(),
            expected_delivery_date: date_string(cycle.expected_delivery_date),
            actual_delivery_date: date_string(cycle.actual_delivery_date),
            calf_gender: cycle.calf_gender.map(|g| g.as_str().to_string()),
            id: cycle.id,
            cow_id: cycle.cow_id,
            notes: cycle.notes,
        }
    }
}

/// FFI-safe guard result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiGuardResult {
    pub allowed: bool,
    pub blocking_record: Option<FfiBreedingCycle>,
}

impl From<GuardResult> for FfiGuardResult {
    fn from(result: GuardResult) -> Self {
        match result {
            GuardResult::Allowed => Self {
                allowed: true,
                blocking_record: None,
            },
            GuardResult::Blocked { blocking_record } => Self {
                allowed: false,
                blocking_record: Some(blocking_record.into()),
            },
        }
    }
}

/// FFI-safe result of recording an AI.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecordAiResult {
    /// The new cycle, when the AI was accepted
    pub cycle: Option<FfiBreedingCycle>,
    /// The open cycle that prevented it, when blocked
    pub blocking_record: Option<FfiBreedingCycle>,
}

impl From<OpenCycleOutcome> for FfiRecordAiResult {
    fn from(outcome: OpenCycleOutcome) -> Self {
        match outcome {
            OpenCycleOutcome::Opened(cycle) => Self {
                cycle: Some(cycle.into()),
                blocking_record: None,
            },
            OpenCycleOutcome::Blocked { blocking_record } => Self {
                cycle: None,
                blocking_record: Some(blocking_record.into()),
            },
        }
    }
}

/// FFI-safe attention list entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAttentionItem {
    pub bucket: String,
    pub sort_days: Option<i64>,
    pub days_to_delivery: Option<i64>,
    pub cow_id: String,
    pub cow_number: String,
    pub cycle_id: String,
    pub status: String,
    pub service_number: u32,
    pub latest_ai_date: String,
    pub pd_result: Option<String>,
    pub pd_date: Option<String>,
    pub expected_delivery_date: String,
    pub delivered_date: Option<String>,
    pub needs_milking_move: bool,
    pub moved_to_milking: bool,
    pub pd_due: bool,
    pub pd_overdue: bool,
    pub about_to_deliver: bool,
    pub move_to_close_up: bool,
    pub move_to_milking: bool,
}

impl From<ClassifiedCow> for FfiAttentionItem {
    fn from(item: ClassifiedCow) -> Self {
        let s = item.summary;
        Self {
            bucket: item.bucket.as_str().to_string(),
            sort_days: item.sort_days,
            days_to_delivery: item.days_to_delivery,
            cycle_id: s.cycle.id.clone(),
            cow_id: s.cow_id,
            cow_number: s.cow_number,
            status: s.status.as_str().to_string(),
            service_number: s.service_number,
            latest_ai_date: s.latest_ai_date.to_string(),
            pd_result: s.pd_result.map(|r| r.as_str().to_string()),
            pd_date: date_string(s.pd_date),
            expected_delivery_date: s.expected_delivery_date.to_string(),
            delivered_date: date_string(s.delivered_date),
            needs_milking_move: s.needs_milking_move,
            moved_to_milking: s.moved_to_milking,
            pd_due: item.flags.pd_due,
            pd_overdue: item.flags.pd_overdue,
            about_to_deliver: item.flags.about_to_deliver,
            move_to_close_up: item.flags.move_to_close_up,
            move_to_milking: item.flags.move_to_milking,
        }
    }
}

/// FFI-safe alert thresholds.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlertConfig {
    pub pd_alert_days: u32,
    pub delivery_expected_days: u32,
    pub pd_overdue_days: u32,
}

impl From<AlertConfig> for FfiAlertConfig {
    fn from(config: AlertConfig) -> Self {
        Self {
            pd_alert_days: config.pd_alert_days,
            delivery_expected_days: config.delivery_expected_days,
            pd_overdue_days: config.pd_overdue_days,
        }
    }
}

impl From<FfiAlertConfig> for AlertConfig {
    fn from(config: FfiAlertConfig) -> Self {
        AlertConfig {
            pd_alert_days: config.pd_alert_days,
            delivery_expected_days: config.delivery_expected_days,
            pd_overdue_days: config.pd_overdue_days,
        }
    }
}
