use super::{PersistenceError, PersistenceResult, ScheduleStore};
use crate::schedule::ScheduledTask;
use crate::state::PlanState;
use crate::task::{Complexity, Health, Task};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn save_state_to_json<P: AsRef<Path>>(state: &PlanState, path: P) -> PersistenceResult<()> {
    super::validate_state(state)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, state)?;
    Ok(())
}

pub fn load_state_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<PlanState> {
    let file = File::open(path)?;
    let state: PlanState = serde_json::from_reader(file)?;
    super::validate_state(&state)?;
    Ok(state)
}

/// A `PlanState` kept in one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleStore for JsonFileStore {
    fn save_state(&self, state: &PlanState) -> PersistenceResult<()> {
        debug!(path = %self.path.display(), "saving plan state");
        save_state_to_json(state, &self.path)
    }

    fn load_state(&self) -> PersistenceResult<Option<PlanState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_state_from_json(&self.path).map(Some)
    }
}

#[derive(Serialize, Deserialize)]
struct ScheduledTaskCsvRecord {
    task_id: String,
    task_name: String,
    resource_id: String,
    resource_name: String,
    start: String,
    end: String,
    project_id: String,
}

impl From<&ScheduledTask> for ScheduledTaskCsvRecord {
    fn from(entry: &ScheduledTask) -> Self {
        Self {
            task_id: entry.task_id.clone(),
            task_name: entry.task_name.clone(),
            resource_id: entry.resource_id.clone(),
            resource_name: entry.resource_name.clone(),
            start: entry.start.format(DATETIME_FORMAT).to_string(),
            end: entry.end.format(DATETIME_FORMAT).to_string(),
            project_id: entry.project_id.clone(),
        }
    }
}

impl ScheduledTaskCsvRecord {
    fn into_scheduled(self) -> PersistenceResult<ScheduledTask> {
        let start = parse_datetime(&self.start)?;
        let end = parse_datetime(&self.end)?;
        if end < start {
            return Err(PersistenceError::InvalidData(format!(
                "task {} ends before it starts",
                self.task_id
            )));
        }
        Ok(ScheduledTask {
            task_id: self.task_id,
            task_name: self.task_name,
            resource_id: self.resource_id,
            resource_name: self.resource_name,
            start,
            end,
            project_id: self.project_id,
        })
    }
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(schedule: &[ScheduledTask], path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for entry in schedule {
        writer.serialize(ScheduledTaskCsvRecord::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_schedule_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<ScheduledTask>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut schedule = Vec::new();
    for record in reader.deserialize::<ScheduledTaskCsvRecord>() {
        schedule.push(record?.into_scheduled()?);
    }
    Ok(schedule)
}

#[derive(Serialize, Deserialize)]
struct TaskCsvRecord {
    id: String,
    name: String,
    duration_hours: u32,
    dependencies: String,
    assigned_to: String,
    priority: String,
    project_id: String,
    complexity: String,
    required_skillset: String,
    health: String,
    status_note: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            duration_hours: task.duration_hours,
            dependencies: join_strings(&task.dependencies),
            assigned_to: task.assigned_to.clone().unwrap_or_default(),
            priority: task.priority.to_string(),
            project_id: task.project_id.clone(),
            complexity: task.complexity.as_str().to_string(),
            required_skillset: task.required_skillset.clone().unwrap_or_default(),
            health: task.health.as_str().to_string(),
            status_note: task.status_note.clone().unwrap_or_default(),
        }
    }
}

impl TaskCsvRecord {
    fn into_task(self) -> PersistenceResult<Task> {
        let mut task = Task::new(self.id, self.name, self.duration_hours);
        task.dependencies = split_strings(&self.dependencies);
        task.assigned_to = parse_string_option(self.assigned_to);
        if !self.priority.trim().is_empty() {
            task.priority = self.priority.trim().parse::<i32>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid priority '{}': {e}", self.priority))
            })?;
        }
        task.project_id = self.project_id;
        task.complexity = Complexity::from_str(&self.complexity).map_err(PersistenceError::InvalidData)?;
        task.required_skillset = parse_string_option(self.required_skillset);
        task.health = Health::from_str(&self.health).map_err(PersistenceError::InvalidData)?;
        task.status_note = parse_string_option(self.status_note);
        Ok(task)
    }
}

pub fn save_tasks_to_csv<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads task records; dependencies are `;`-separated ids.
pub fn load_tasks_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Task>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut tasks = Vec::new();
    for record in reader.deserialize::<TaskCsvRecord>() {
        tasks.push(record?.into_task()?);
    }
    if tasks.is_empty() {
        return Err(PersistenceError::InvalidData("CSV file contained no tasks".into()));
    }
    crate::task_validation::validate_task_collection(&tasks)?;
    Ok(tasks)
}

fn parse_datetime(input: &str) -> PersistenceResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), DATETIME_FORMAT)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid datetime '{input}': {e}")))
}

fn join_strings(values: &[String]) -> String {
    values.join(";")
}

fn split_strings(input: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    input.split(';').map(|s| s.trim().to_string()).collect()
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
