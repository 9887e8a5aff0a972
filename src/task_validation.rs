use crate::error::ValidationError;
use crate::leave::Leave;
use crate::project::Project;
use crate::resource::Resource;
use crate::task::Task;
use std::collections::HashSet;

pub fn validate_task(task: &Task) -> Result<(), ValidationError> {
    if task.id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind: "task" });
    }
    if task.duration_hours == 0 {
        return Err(ValidationError::NonPositiveDuration {
            task_id: task.id.clone(),
        });
    }
    if task.dependencies.iter().any(|dep| dep == &task.id) {
        return Err(ValidationError::SelfDependency {
            task_id: task.id.clone(),
        });
    }
    Ok(())
}

/// Checks every task on its own, then id uniqueness and dependency references.
pub fn validate_task_collection(tasks: &[Task]) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        validate_task(task)?;
        if !seen_ids.insert(task.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "task",
                id: task.id.clone(),
            });
        }
    }
    for task in tasks {
        for dep in &task.dependencies {
            if !seen_ids.contains(dep.as_str()) {
                return Err(ValidationError::UnknownDependency {
                    task_id: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

pub fn validate_resources(resources: &[Resource]) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::with_capacity(resources.len());
    for resource in resources {
        if resource.id.trim().is_empty() {
            return Err(ValidationError::EmptyId { kind: "resource" });
        }
        if !seen_ids.insert(resource.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "resource",
                id: resource.id.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_leave(leave: &Leave) -> Result<(), ValidationError> {
    if leave.end_date < leave.start_date {
        return Err(ValidationError::LeaveRange {
            leave_id: leave.id.clone(),
            start: leave.start_date,
            end: leave.end_date,
        });
    }
    Ok(())
}

pub fn validate_leaves(leaves: &[Leave]) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::with_capacity(leaves.len());
    for leave in leaves {
        validate_leave(leave)?;
        if !seen_ids.insert(leave.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "leave",
                id: leave.id.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.work_week.working_days.is_empty() {
        return Err(ValidationError::EmptyWorkWeek {
            project_id: project.id.clone(),
        });
    }
    if let Some(&index) = project.work_week.working_days.iter().find(|d| **d > 6) {
        return Err(ValidationError::InvalidWeekday {
            project_id: project.id.clone(),
            index,
        });
    }
    Ok(())
}

pub fn validate_projects(projects: &[Project]) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::with_capacity(projects.len());
    for project in projects {
        validate_project(project)?;
        if !seen_ids.insert(project.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "project",
                id: project.id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = validate_task(&Task::new("T1", "Empty", 0)).unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveDuration { .. }));
    }

    #[test]
    fn duplicate_task_ids_are_rejected() {
        let tasks = vec![Task::new("T1", "A", 1), Task::new("T1", "B", 2)];
        let err = validate_task_collection(&tasks).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateId {
                kind: "task",
                id: "T1".into()
            }
        );
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let tasks = vec![Task::new("T1", "A", 1).depends_on(["T9"])];
        let err = validate_task_collection(&tasks).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownDependency { .. }));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let err = validate_task(&Task::new("T1", "A", 1).depends_on(["T1"])).unwrap_err();
        assert!(matches!(err, ValidationError::SelfDependency { .. }));
    }

    #[test]
    fn inverted_leave_is_rejected() {
        let leave = Leave::new("L1", "R1", d(2024, 3, 8), d(2024, 3, 4));
        assert!(matches!(
            validate_leave(&leave),
            Err(ValidationError::LeaveRange { .. })
        ));
        let single_day = Leave::new("L2", "R1", d(2024, 3, 4), d(2024, 3, 4));
        assert!(validate_leave(&single_day).is_ok());
    }

    #[test]
    fn project_needs_a_valid_work_week() {
        let mut project = Project::new("P1", "Alpha", d(2024, 3, 4));
        project.work_week.working_days.clear();
        assert!(matches!(
            validate_project(&project),
            Err(ValidationError::EmptyWorkWeek { .. })
        ));
        project.work_week.working_days = vec![0, 7];
        assert!(matches!(
            validate_project(&project),
            Err(ValidationError::InvalidWeekday { index: 7, .. })
        ));
    }
}
