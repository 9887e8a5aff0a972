//! Columnar views of a schedule for reporting.

use crate::schedule::ScheduledTask;
use polars::prelude::*;

/// One row per placement. `span_minutes` is the wall-clock length.
pub fn schedule_to_dataframe(schedule: &[ScheduledTask]) -> PolarsResult<DataFrame> {
    let task_ids: Vec<&str> = schedule.iter().map(|t| t.task_id.as_str()).collect();
    let task_names: Vec<&str> = schedule.iter().map(|t| t.task_name.as_str()).collect();
    let resource_ids: Vec<&str> = schedule.iter().map(|t| t.resource_id.as_str()).collect();
    let resource_names: Vec<&str> = schedule.iter().map(|t| t.resource_name.as_str()).collect();
    let project_ids: Vec<&str> = schedule.iter().map(|t| t.project_id.as_str()).collect();
    let starts: Vec<_> = schedule.iter().map(|t| t.start).collect();
    let ends: Vec<_> = schedule.iter().map(|t| t.end).collect();
    let spans: Vec<i64> = schedule.iter().map(|t| t.span().num_minutes()).collect();

    df!(
        "task_id" => task_ids,
        "task_name" => task_names,
        "resource_id" => resource_ids,
        "resource_name" => resource_names,
        "project_id" => project_ids,
        "start" => starts,
        "end" => ends,
        "span_minutes" => spans,
    )
}

/// Task count and wall-clock minutes per resource, sorted by resource id.
pub fn resource_load(schedule: &[ScheduledTask]) -> PolarsResult<DataFrame> {
    schedule_to_dataframe(schedule)?
        .lazy()
        .group_by([col("resource_id")])
        .agg([
            col("task_id").count().alias("tasks"),
            col("span_minutes").sum().alias("scheduled_minutes"),
        ])
        .sort(["resource_id"], SortMultipleOptions::default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: &str, resource: &str, day: u32, hours: u32) -> ScheduledTask {
        let start = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        ScheduledTask {
            task_id: id.to_string(),
            task_name: format!("Task {id}"),
            resource_id: resource.to_string(),
            resource_name: resource.to_string(),
            start,
            end: start + chrono::Duration::hours(hours as i64),
            project_id: "P1".to_string(),
        }
    }

    #[test]
    fn frame_has_one_row_per_task() {
        let schedule = vec![entry("T1", "R1", 1, 8), entry("T2", "R2", 2, 4)];
        let df = schedule_to_dataframe(&schedule).unwrap();
        assert_eq!(df.height(), 2);
        let spans = df.column("span_minutes").unwrap().i64().unwrap();
        assert_eq!(spans.get(1), Some(240));
    }

    #[test]
    fn load_is_grouped_per_resource() {
        let schedule = vec![entry("T1", "R1", 1, 8), entry("T2", "R2", 2, 4), entry("T3", "R1", 3, 2)];
        let load = resource_load(&schedule).unwrap();
        assert_eq!(load.height(), 2);
        let ids = load.column("resource_id").unwrap().str().unwrap();
        let minutes = load.column("scheduled_minutes").unwrap().i64().unwrap();
        assert_eq!(ids.get(0), Some("R1"));
        assert_eq!(minutes.get(0), Some(600));
    }
}
