use super::{PersistenceError, PersistenceResult, ScheduleStore};
use crate::state::PlanState;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `PlanState` in a SQLite file: one metadata row plus one JSON row per
/// record, keyed by collection and position so load order matches save order.
pub struct SqliteScheduleStore {
    connection: Mutex<Connection>,
}

impl SqliteScheduleStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS plan_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                start_date TEXT
            );
            CREATE TABLE IF NOT EXISTS plan_records (
                collection TEXT NOT NULL,
                position INTEGER NOT NULL,
                record_id TEXT NOT NULL,
                record_json TEXT NOT NULL,
                PRIMARY KEY (collection, position)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    fn save_collection<T: Serialize>(
        tx: &Transaction,
        collection: &str,
        records: &[T],
        id_of: impl Fn(&T) -> &str,
    ) -> PersistenceResult<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO plan_records (collection, position, record_id, record_json) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, record) in records.iter().enumerate() {
            let json = serde_json::to_string(record)?;
            stmt.execute(params![collection, position as i64, id_of(record), json])?;
        }
        Ok(())
    }

    fn load_collection<T: DeserializeOwned>(conn: &Connection, collection: &str) -> PersistenceResult<Vec<T>> {
        let mut stmt =
            conn.prepare("SELECT record_json FROM plan_records WHERE collection = ?1 ORDER BY position ASC")?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn save_state(&self, state: &PlanState) -> PersistenceResult<()> {
        super::validate_state(state)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM plan_metadata", [])?;
        tx.execute(
            "INSERT INTO plan_metadata (id, start_date) VALUES (1, ?1)",
            params![state.start_date.map(|d| d.format(DATE_FORMAT).to_string())],
        )?;
        tx.execute("DELETE FROM plan_records", [])?;
        Self::save_collection(&tx, "project", &state.projects, |p| p.id.as_str())?;
        Self::save_collection(&tx, "task", &state.tasks, |t| t.id.as_str())?;
        Self::save_collection(&tx, "resource", &state.resources, |r| r.id.as_str())?;
        Self::save_collection(&tx, "schedule", &state.schedule, |s| s.task_id.as_str())?;
        Self::save_collection(&tx, "leave", &state.leaves, |l| l.id.as_str())?;
        Self::save_collection(&tx, "reduced_capacity", &state.reduced_capacities, |c| c.id.as_str())?;
        tx.commit()?;
        debug!(tasks = state.tasks.len(), "plan state saved to sqlite");
        Ok(())
    }

    fn load_state(&self) -> PersistenceResult<Option<PlanState>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT start_date FROM plan_metadata WHERE id = 1")?;
        let metadata: Option<Option<String>> = stmt.query_row([], |row| row.get(0)).optional()?;
        let Some(start_date) = metadata else {
            return Ok(None);
        };
        let start_date = start_date
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map_err(|e| PersistenceError::InvalidData(format!("invalid start date '{raw}': {e}")))
            })
            .transpose()?;

        let state = PlanState {
            projects: Self::load_collection(&conn, "project")?,
            tasks: Self::load_collection(&conn, "task")?,
            resources: Self::load_collection(&conn, "resource")?,
            schedule: Self::load_collection(&conn, "schedule")?,
            leaves: Self::load_collection(&conn, "leave")?,
            reduced_capacities: Self::load_collection(&conn, "reduced_capacity")?,
            start_date,
        };
        super::validate_state(&state)?;
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leave::Leave;
    use crate::resource::Resource;
    use crate::task::Task;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = SqliteScheduleStore::in_memory().unwrap();
        assert!(store.load_state().unwrap().is_none());
    }

    #[test]
    fn save_replaces_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteScheduleStore::new(dir.path().join("plan.db")).unwrap();

        let mut state = PlanState {
            start_date: Some(d(2024, 1, 1)),
            ..PlanState::default()
        };
        state.resources.push(Resource::new("R1", "Alice", "Dev"));
        state.tasks.push(Task::new("T1", "Design", 8).assigned("R1"));
        state.tasks.push(Task::new("T2", "Build", 16).depends_on(["T1"]));
        state.leaves.push(Leave::new("L1", "R1", d(2024, 1, 2), d(2024, 1, 3)));
        store.save_state(&state).unwrap();

        state.tasks.remove(1);
        store.save_state(&state).unwrap();

        let loaded = store.load_state().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.tasks.len(), 1);
    }

    #[test]
    fn invalid_state_is_not_written() {
        let store = SqliteScheduleStore::in_memory().unwrap();
        let mut state = PlanState::default();
        state.tasks.push(Task::new("T1", "Ghost", 4).depends_on(["T9"]));
        assert!(matches!(store.save_state(&state), Err(PersistenceError::Validation(_))));
        assert!(store.load_state().unwrap().is_none());
    }
}
