use crate::resource::UNASSIGNED;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A task placed on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub task_name: String,
    pub resource_id: String,
    pub resource_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub project_id: String,
}

impl ScheduledTask {
    pub fn is_unassigned(&self) -> bool {
        self.resource_id == UNASSIGNED
    }

    /// Wall-clock length of the placement.
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &ScheduledTask) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Moves the task so it starts at `start`, keeping its span.
    pub fn move_to(&mut self, start: NaiveDateTime) {
        let span = self.span();
        self.start = start;
        self.end = start + span;
    }
}

/// Sorts by start, then task id so equal starts have a stable order.
pub fn sort_by_start(schedule: &mut [ScheduledTask]) {
    schedule.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.task_id.cmp(&b.task_id)));
}

pub fn find<'a>(schedule: &'a [ScheduledTask], task_id: &str) -> Option<&'a ScheduledTask> {
    schedule.iter().find(|s| s.task_id == task_id)
}

/// Latest end across the schedule.
pub fn makespan_end(schedule: &[ScheduledTask]) -> Option<NaiveDateTime> {
    schedule.iter().map(|s| s.end).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn entry(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> ScheduledTask {
        ScheduledTask {
            task_id: id.into(),
            task_name: id.into(),
            resource_id: "R1".into(),
            resource_name: "Ada".into(),
            start,
            end,
            project_id: String::new(),
        }
    }

    #[test]
    fn move_to_preserves_span() {
        let mut s = entry("T1", at(4, 9), at(5, 17));
        let span = s.span();
        s.move_to(at(7, 9));
        assert_eq!(s.start, at(7, 9));
        assert_eq!(s.span(), span);
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = entry("A", at(4, 9), at(4, 17));
        let b = entry("B", at(4, 17), at(5, 9));
        assert!(!a.overlaps(&b));
        let c = entry("C", at(4, 16), at(4, 17));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn sort_by_start_breaks_ties_on_id() {
        let mut v = vec![
            entry("B", at(4, 9), at(4, 10)),
            entry("A", at(4, 9), at(4, 10)),
            entry("C", at(3, 9), at(3, 10)),
        ];
        sort_by_start(&mut v);
        let ids: Vec<_> = v.iter().map(|s| s.task_id.as_str()).collect();
        assert_eq!(ids, ["C", "A", "B"]);
        assert_eq!(makespan_end(&v), Some(at(4, 10)));
    }
}
