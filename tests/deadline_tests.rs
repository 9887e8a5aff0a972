use chrono::{Duration, NaiveDate, NaiveDateTime};
use workplan::calculations::deadline::deadline_overrun;
use workplan::calculations::{DeadlineSettings, critical_path_tasks, suggest_compression, tasks_at_risk};
use workplan::resource::Resource;
use workplan::schedule::ScheduledTask;
use workplan::task::{PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_MEDIUM, Task};

fn at(day: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn placed(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> ScheduledTask {
    ScheduledTask {
        task_id: id.to_string(),
        task_name: id.to_string(),
        resource_id: "R1".to_string(),
        resource_name: "Alice".to_string(),
        start,
        end,
        project_id: "P1".to_string(),
    }
}

fn fixture() -> (Vec<Task>, Vec<ScheduledTask>) {
    let tasks = vec![
        Task::new("T1", "Plan", 8).assigned("R1").with_priority(PRIORITY_HIGH),
        Task::new("T2", "Build", 8).assigned("R1").with_priority(PRIORITY_MEDIUM),
        Task::new("T3", "Ship", 8).with_priority(PRIORITY_LOW),
        Task::new("T4", "Docs", 8).assigned("R2").with_priority(PRIORITY_LOW),
    ];
    let schedule = vec![
        placed("T1", at(4, 9), at(4, 17)),
        placed("T2", at(5, 9), at(5, 17)),
        placed("T3", at(6, 9), at(6, 17)),
        placed("T4", at(5, 9), at(6, 17)),
    ];
    (tasks, schedule)
}

#[test]
fn tasks_ending_after_deadline_midnight_are_at_risk() {
    let (tasks, schedule) = fixture();
    let deadline = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let ids: Vec<String> = tasks_at_risk(&tasks, &schedule, deadline)
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec!["T2", "T3", "T4"]);
}

#[test]
fn suggestions_skip_top_priority_and_unassigned() {
    let (tasks, schedule) = fixture();
    let deadline = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let at_risk = tasks_at_risk(&tasks, &schedule, deadline);
    let resources: Vec<Resource> = ["R1", "R2", "R3", "R4", "R5"]
        .iter()
        .map(|id| Resource::new(*id, *id, "Dev"))
        .collect();

    let suggestions = suggest_compression(&at_risk, &resources, &DeadlineSettings::default());
    let ids: Vec<&str> = suggestions.iter().map(|s| s.task_id.as_str()).collect();
    assert_eq!(ids, vec!["T2", "T4"]);
    assert_eq!(suggestions[0].alternatives, vec!["R2", "R3", "R4"]);
    assert_eq!(suggestions[1].alternatives, vec!["R1", "R3", "R4"]);
}

#[test]
fn sole_resource_gets_no_suggestion() {
    let at_risk = vec![Task::new("T1", "Build", 8).assigned("R1").with_priority(PRIORITY_LOW)];
    let resources = vec![Resource::new("R1", "Alice", "Dev")];
    assert!(suggest_compression(&at_risk, &resources, &DeadlineSettings::default()).is_empty());
}

#[test]
fn critical_path_is_every_task_sharing_latest_end() {
    let (tasks, schedule) = fixture();
    let ids: Vec<String> = critical_path_tasks(&tasks, &schedule).into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["T3", "T4"]);
    assert!(critical_path_tasks(&tasks, &[]).is_empty());
}

#[test]
fn overrun_is_measured_against_original_duration() {
    let (_, schedule) = fixture();
    let reference = at(1, 9);
    // 5 days from reference to original end, so 12h of slack at 10%
    let report = deadline_overrun(&schedule, "P1", at(6, 9), reference, 0.10);
    assert_eq!(report.latest_end, Some(at(6, 17)));
    assert_eq!(report.overrun, Duration::hours(8));
    assert_eq!(report.allowed, Duration::hours(12));
    assert!(report.within_limit());

    let tight = deadline_overrun(&schedule, "P1", at(6, 9), reference, 0.05);
    assert!(!tight.within_limit());
}
