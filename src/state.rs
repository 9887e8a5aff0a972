//! The planning aggregate and the typed partial updates applied to it.

use crate::calculations::shift_pass::project_buffer_hours;
use crate::error::ValidationError;
use crate::leave::Leave;
pub use crate::leave::LeaveUpdate;
use crate::project::{HolidayConfig, Project, WorkWeekConfig};
use crate::resource::{ReducedCapacity, Resource};
use crate::schedule::ScheduledTask;
use crate::task::{Complexity, Health, Task};
use crate::task_validation::{
    validate_leave, validate_project, validate_resources, validate_task, validate_task_collection,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything a planning run reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanState {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub resources: Vec<Resource>,
    pub schedule: Vec<ScheduledTask>,
    pub leaves: Vec<Leave>,
    pub reduced_capacities: Vec<ReducedCapacity>,
    /// Day the next solve starts from; falls back to the earliest project start.
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub duration_hours: Option<u32>,
    pub dependencies: Option<Vec<String>>,
    pub assigned_to: Option<Option<String>>,
    pub priority: Option<i32>,
    pub project_id: Option<String>,
    pub complexity: Option<Complexity>,
    pub required_skillset: Option<Option<String>>,
    pub health: Option<Health>,
    pub status_note: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(hours) = self.duration_hours {
            task.duration_hours = hours;
        }
        if let Some(deps) = &self.dependencies {
            task.dependencies = deps.clone();
        }
        if let Some(assigned) = &self.assigned_to {
            task.assigned_to = assigned.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(project_id) = &self.project_id {
            task.project_id = project_id.clone();
        }
        if let Some(complexity) = self.complexity {
            task.complexity = complexity;
        }
        if let Some(skillset) = &self.required_skillset {
            task.required_skillset = skillset.clone();
        }
        if let Some(health) = self.health {
            task.health = health;
        }
        if let Some(note) = &self.status_note {
            task.status_note = note.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceUpdate {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
}

impl ResourceUpdate {
    pub fn apply_to(&self, resource: &mut Resource) {
        if let Some(name) = &self.name {
            resource.name = name.clone();
        }
        if let Some(role) = &self.role {
            resource.role = role.clone();
        }
        if let Some(email) = &self.email {
            resource.email = email.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub work_week: Option<WorkWeekConfig>,
    pub holidays: Option<HolidayConfig>,
    pub total_actual_hours: Option<u32>,
}

impl ProjectUpdate {
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(start) = self.start_date {
            project.start_date = start;
        }
        if let Some(end) = self.end_date {
            project.end_date = end;
        }
        if let Some(week) = &self.work_week {
            project.work_week = week.clone();
        }
        if let Some(holidays) = &self.holidays {
            project.holidays = holidays.clone();
        }
        if let Some(actual) = self.total_actual_hours {
            project.total_actual_hours = actual;
        }
    }
}

/// Record counts of a `PlanState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanStatistics {
    pub projects: usize,
    pub tasks: usize,
    pub resources: usize,
    pub leaves: usize,
    pub scheduled: usize,
}

fn not_found(kind: &str, id: &str) -> ValidationError {
    ValidationError::NotFound(format!("{kind} {id}"))
}

impl PlanState {
    /// Earliest project start when no explicit start date is set.
    pub fn effective_start_date(&self) -> Option<NaiveDate> {
        self.start_date
            .or_else(|| self.projects.iter().map(|p| p.start_date).min())
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), ValidationError> {
        validate_task(&task)?;
        let mut candidate = self.tasks.clone();
        candidate.push(task);
        validate_task_collection(&candidate)?;
        self.tasks = candidate;
        Ok(())
    }

    /// Removes the task and drops it from other tasks' dependency lists.
    pub fn remove_task(&mut self, task_id: &str) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == task_id)?;
        let removed = self.tasks.remove(pos);
        for task in &mut self.tasks {
            task.dependencies.retain(|d| d != task_id);
        }
        self.schedule.retain(|s| s.task_id != task_id);
        Some(removed)
    }

    pub fn update_task(&mut self, task_id: &str, update: &TaskUpdate) -> Result<(), ValidationError> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| not_found("task", task_id))?;
        let mut candidate = self.tasks.clone();
        update.apply_to(&mut candidate[pos]);
        validate_task_collection(&candidate)?;
        self.tasks = candidate;
        Ok(())
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<(), ValidationError> {
        let mut candidate = self.resources.clone();
        candidate.push(resource);
        validate_resources(&candidate)?;
        self.resources = candidate;
        Ok(())
    }

    /// Removes the resource and unassigns its tasks and leave.
    pub fn remove_resource(&mut self, resource_id: &str) -> Option<Resource> {
        let pos = self.resources.iter().position(|r| r.id == resource_id)?;
        let removed = self.resources.remove(pos);
        for task in &mut self.tasks {
            if task.assigned_to.as_deref() == Some(resource_id) {
                task.assigned_to = None;
            }
        }
        self.leaves.retain(|l| l.resource_id != resource_id);
        Some(removed)
    }

    pub fn update_resource(&mut self, resource_id: &str, update: &ResourceUpdate) -> Result<(), ValidationError> {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| not_found("resource", resource_id))?;
        update.apply_to(resource);
        Ok(())
    }

    pub fn add_project(&mut self, project: Project) -> Result<(), ValidationError> {
        validate_project(&project)?;
        if self.project(&project.id).is_some() {
            return Err(ValidationError::DuplicateId {
                kind: "project",
                id: project.id,
            });
        }
        self.projects.push(project);
        Ok(())
    }

    pub fn remove_project(&mut self, project_id: &str) -> Option<Project> {
        let pos = self.projects.iter().position(|p| p.id == project_id)?;
        Some(self.projects.remove(pos))
    }

    pub fn update_project(&mut self, project_id: &str, update: &ProjectUpdate) -> Result<(), ValidationError> {
        let pos = self
            .projects
            .iter()
            .position(|p| p.id == project_id)
            .ok_or_else(|| not_found("project", project_id))?;
        let mut candidate = self.projects[pos].clone();
        update.apply_to(&mut candidate);
        validate_project(&candidate)?;
        self.projects[pos] = candidate;
        Ok(())
    }

    pub fn add_leave(&mut self, leave: Leave) -> Result<(), ValidationError> {
        validate_leave(&leave)?;
        if self.leaves.iter().any(|l| l.id == leave.id) {
            return Err(ValidationError::DuplicateId {
                kind: "leave",
                id: leave.id,
            });
        }
        self.leaves.push(leave);
        Ok(())
    }

    pub fn remove_leave(&mut self, leave_id: &str) -> Option<Leave> {
        let pos = self.leaves.iter().position(|l| l.id == leave_id)?;
        Some(self.leaves.remove(pos))
    }

    pub fn update_leave(&mut self, leave_id: &str, update: &LeaveUpdate) -> Result<(), ValidationError> {
        let pos = self
            .leaves
            .iter()
            .position(|l| l.id == leave_id)
            .ok_or_else(|| not_found("leave", leave_id))?;
        let mut candidate = self.leaves[pos].clone();
        update.apply_to(&mut candidate);
        validate_leave(&candidate)?;
        self.leaves[pos] = candidate;
        Ok(())
    }

    /// Recomputes each project's estimated hours and buffer from its tasks.
    pub fn refresh_project_totals(&mut self, buffer_ratio: f64) {
        for project in &mut self.projects {
            project.total_estimated_hours = self
                .tasks
                .iter()
                .filter(|t| t.project_id == project.id)
                .map(|t| t.duration_hours)
                .sum();
            project.buffer_hours = project_buffer_hours(&self.tasks, &project.id, buffer_ratio);
        }
    }

    pub fn statistics(&self) -> PlanStatistics {
        PlanStatistics {
            projects: self.projects.len(),
            tasks: self.tasks.len(),
            resources: self.resources.len(),
            leaves: self.leaves.len(),
            scheduled: self.schedule.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn state() -> PlanState {
        let mut state = PlanState::default();
        state.add_project(Project::new("P1", "Alpha", d(4))).unwrap();
        state.add_resource(Resource::new("R1", "Ada", "dev")).unwrap();
        state
            .add_task(Task::new("T1", "a", 10).in_project("P1").with_complexity(Complexity::Low).assigned("R1"))
            .unwrap();
        state
            .add_task(Task::new("T2", "b", 6).in_project("P1").depends_on(["T1"]))
            .unwrap();
        state
    }

    #[test]
    fn update_is_rejected_without_side_effects() {
        let mut state = state();
        let bad = TaskUpdate {
            dependencies: Some(vec!["T9".into()]),
            ..Default::default()
        };
        assert!(state.update_task("T2", &bad).is_err());
        assert_eq!(state.task("T2").unwrap().dependencies, ["T1"]);

        let good = TaskUpdate {
            duration_hours: Some(8),
            status_note: Some(Some("waiting on review".into())),
            ..Default::default()
        };
        state.update_task("T2", &good).unwrap();
        assert_eq!(state.task("T2").unwrap().duration_hours, 8);
    }

    #[test]
    fn removing_a_task_clears_dangling_dependencies() {
        let mut state = state();
        state.remove_task("T1");
        assert!(state.task("T2").unwrap().dependencies.is_empty());
        assert!(validate_task_collection(&state.tasks).is_ok());
    }

    #[test]
    fn removing_a_resource_unassigns_its_work() {
        let mut state = state();
        state.add_leave(Leave::new("L1", "R1", d(5), d(6))).unwrap();
        state.remove_resource("R1");
        assert_eq!(state.task("T1").unwrap().assigned_to, None);
        assert!(state.leaves.is_empty());
    }

    #[test]
    fn leave_update_keeps_range_ordered() {
        let mut state = state();
        state.add_leave(Leave::new("L1", "R1", d(5), d(6))).unwrap();
        let update = LeaveUpdate {
            end_date: Some(d(1)),
            ..Default::default()
        };
        assert!(matches!(
            state.update_leave("L1", &update),
            Err(ValidationError::LeaveRange { .. })
        ));
        assert_eq!(state.leaves[0].end_date, d(6));
    }

    #[test]
    fn project_totals_follow_tasks() {
        let mut state = state();
        state.refresh_project_totals(0.2);
        let project = state.project("P1").unwrap();
        assert_eq!(project.total_estimated_hours, 16);
        assert_eq!(project.buffer_hours, 2);
        assert_eq!(state.effective_start_date(), Some(d(4)));
    }
}
