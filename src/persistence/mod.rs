use crate::error::ValidationError;
use crate::state::PlanState;
use crate::task_validation::{validate_leaves, validate_projects, validate_resources, validate_task_collection};
use polars::prelude::PolarsError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid records: {0}")]
    Validation(#[from] ValidationError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage for the whole planning aggregate.
pub trait ScheduleStore {
    fn save_state(&self, state: &PlanState) -> PersistenceResult<()>;
    /// `None` when nothing has been stored yet.
    fn load_state(&self) -> PersistenceResult<Option<PlanState>>;
}

/// Record-level checks run on every save and load. Cycles are left to the
/// scheduler.
pub fn validate_state(state: &PlanState) -> PersistenceResult<()> {
    validate_projects(&state.projects)?;
    validate_resources(&state.resources)?;
    validate_task_collection(&state.tasks)?;
    validate_leaves(&state.leaves)?;
    Ok(())
}

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod file;

pub use file::{
    JsonFileStore, load_schedule_from_csv, load_state_from_json, load_tasks_from_csv, save_schedule_to_csv,
    save_state_to_json, save_tasks_to_csv,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteScheduleStore;
