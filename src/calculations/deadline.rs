use crate::resource::Resource;
use crate::schedule::{ScheduledTask, makespan_end};
use crate::task::{PRIORITY_HIGH, Task};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineSettings {
    /// Tasks at this priority or better never get reassignment suggestions.
    pub top_priority: i32,
    pub max_alternatives: usize,
    pub max_overrun_ratio: f64,
}

impl Default for DeadlineSettings {
    fn default() -> Self {
        Self {
            top_priority: PRIORITY_HIGH,
            max_alternatives: 3,
            max_overrun_ratio: 0.10,
        }
    }
}

/// Advisory reassignment candidates for an at-risk task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub task_id: String,
    pub current_resource: String,
    pub alternatives: Vec<String>,
}

fn ends_by_task(schedule: &[ScheduledTask]) -> HashMap<&str, NaiveDateTime> {
    schedule.iter().map(|s| (s.task_id.as_str(), s.end)).collect()
}

/// Tasks whose scheduled end is after 00:00 on `deadline`, in task order.
pub fn tasks_at_risk(tasks: &[Task], schedule: &[ScheduledTask], deadline: NaiveDate) -> Vec<Task> {
    let cutoff = deadline.and_time(NaiveTime::MIN);
    let ends = ends_by_task(schedule);
    tasks
        .iter()
        .filter(|t| ends.get(t.id.as_str()).is_some_and(|end| *end > cutoff))
        .cloned()
        .collect()
}

/// Up to `max_alternatives` other resources, in resource order, for each
/// at-risk task that is assigned and below top priority. Tasks with no other
/// resource to move to get no suggestion.
pub fn suggest_compression(
    at_risk: &[Task],
    resources: &[Resource],
    settings: &DeadlineSettings,
) -> Vec<Suggestion> {
    at_risk
        .iter()
        .filter(|t| t.priority > settings.top_priority)
        .filter_map(|t| {
            let current = t.assigned_to.as_deref()?;
            let alternatives: Vec<String> = resources
                .iter()
                .filter(|r| r.id != current)
                .take(settings.max_alternatives)
                .map(|r| r.id.clone())
                .collect();
            if alternatives.is_empty() {
                return None;
            }
            Some(Suggestion {
                task_id: t.id.clone(),
                current_resource: current.to_string(),
                alternatives,
            })
        })
        .collect()
}

/// Tasks that share the latest scheduled end.
pub fn critical_path_tasks(tasks: &[Task], schedule: &[ScheduledTask]) -> Vec<Task> {
    let ends = ends_by_task(schedule);
    let Some(latest) = tasks.iter().filter_map(|t| ends.get(t.id.as_str())).max().copied() else {
        return Vec::new();
    };
    tasks
        .iter()
        .filter(|t| ends.get(t.id.as_str()) == Some(&latest))
        .cloned()
        .collect()
}

/// How far a project's latest end moved past its originally projected end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineOverrun {
    pub project_id: String,
    pub original_end: NaiveDateTime,
    pub latest_end: Option<NaiveDateTime>,
    pub overrun: Duration,
    pub allowed: Duration,
}

impl DeadlineOverrun {
    pub fn within_limit(&self) -> bool {
        self.overrun <= self.allowed
    }
}

/// Compares the project's latest end with `original_end`. The allowed
/// overrun is `max_overrun_ratio` of the time from `reference` to
/// `original_end`. A project with no scheduled tasks never overruns.
pub fn deadline_overrun(
    schedule: &[ScheduledTask],
    project_id: &str,
    original_end: NaiveDateTime,
    reference: NaiveDateTime,
    max_overrun_ratio: f64,
) -> DeadlineOverrun {
    let project_tasks: Vec<ScheduledTask> = schedule
        .iter()
        .filter(|s| s.project_id == project_id)
        .cloned()
        .collect();
    let latest_end = makespan_end(&project_tasks);
    let original_seconds = (original_end - reference).num_seconds() as f64;
    let allowed = Duration::seconds((original_seconds * max_overrun_ratio).floor() as i64);
    let overrun = latest_end
        .map(|end| end - original_end)
        .unwrap_or_else(Duration::zero);
    DeadlineOverrun {
        project_id: project_id.to_string(),
        original_end,
        latest_end,
        overrun,
        allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{PRIORITY_LOW, PRIORITY_MEDIUM};

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn placed(id: &str, end: NaiveDateTime) -> ScheduledTask {
        ScheduledTask {
            task_id: id.into(),
            task_name: id.into(),
            resource_id: "R1".into(),
            resource_name: "Ada".into(),
            start: end - Duration::hours(1),
            end,
            project_id: "P1".into(),
        }
    }

    #[test]
    fn end_at_midnight_of_deadline_is_not_at_risk() {
        let tasks = vec![Task::new("T1", "a", 1), Task::new("T2", "b", 1)];
        let schedule = vec![placed("T1", at(8, 0)), placed("T2", at(8, 9))];
        let deadline = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let risky = tasks_at_risk(&tasks, &schedule, deadline);
        assert_eq!(risky.len(), 1);
        assert_eq!(risky[0].id, "T2");
    }

    #[test]
    fn suggestions_skip_top_priority_and_unassigned() {
        let at_risk = vec![
            Task::new("T1", "a", 1).assigned("R1"),
            Task::new("T2", "b", 1).assigned("R1").with_priority(PRIORITY_MEDIUM),
            Task::new("T3", "c", 1).with_priority(PRIORITY_LOW),
        ];
        let resources: Vec<Resource> = ["R1", "R2", "R3", "R4", "R5"]
            .into_iter()
            .map(|id| Resource::new(id, id, "dev"))
            .collect();
        let suggestions = suggest_compression(&at_risk, &resources, &DeadlineSettings::default());
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].task_id, "T2");
        assert_eq!(suggestions[0].alternatives, ["R2", "R3", "R4"]);
    }

    #[test]
    fn critical_path_keeps_every_task_on_the_latest_end() {
        let tasks = vec![Task::new("T1", "a", 1), Task::new("T2", "b", 1), Task::new("T3", "c", 1)];
        let schedule = vec![placed("T1", at(6, 17)), placed("T2", at(7, 17)), placed("T3", at(7, 17))];
        let ids: Vec<String> = critical_path_tasks(&tasks, &schedule).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["T2", "T3"]);
        assert!(critical_path_tasks(&tasks, &[]).is_empty());
    }

    #[test]
    fn overrun_is_measured_against_original_duration() {
        let schedule = vec![placed("T1", at(12, 0))];
        // Ten days planned, one day allowed.
        let check = deadline_overrun(&schedule, "P1", at(11, 0), at(1, 0), 0.10);
        assert_eq!(check.overrun, Duration::days(1));
        assert_eq!(check.allowed, Duration::days(1));
        assert!(check.within_limit());
        let late = deadline_overrun(&[placed("T1", at(12, 1))], "P1", at(11, 0), at(1, 0), 0.10);
        assert!(!late.within_limit());
    }
}
