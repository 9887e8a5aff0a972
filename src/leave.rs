use crate::calendar::CalendarPolicy;
use crate::error::ValidationError;
use crate::task_validation::validate_leave;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Default window scanned by `next_available_working_day`.
pub const LEAVE_SEARCH_DAYS: i64 = 365;

fn default_leave_type() -> String {
    "vacation".to_string()
}

/// A resource's unavailability over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub id: String,
    pub resource_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_leave_type")]
    pub leave_type: String,
}

impl Leave {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            start_date,
            end_date,
            leave_type: default_leave_type(),
        }
    }

    pub fn with_type(mut self, leave_type: impl Into<String>) -> Self {
        self.leave_type = leave_type.into();
        self
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// True when the leave shares at least one day with `[start, end]`.
    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }

    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Leave totals for one resource over one year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaveSummary {
    pub total_days: i64,
    pub by_type: BTreeMap<String, i64>,
}

/// Partial change to a `Leave`; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveUpdate {
    pub resource_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub leave_type: Option<String>,
}

impl LeaveUpdate {
    pub fn apply_to(&self, leave: &mut Leave) {
        if let Some(resource_id) = &self.resource_id {
            leave.resource_id = resource_id.clone();
        }
        if let Some(start) = self.start_date {
            leave.start_date = start;
        }
        if let Some(end) = self.end_date {
            leave.end_date = end;
        }
        if let Some(kind) = &self.leave_type {
            leave.leave_type = kind.clone();
        }
    }
}

/// Leave records indexed by resource.
#[derive(Debug, Clone, Default)]
pub struct LeaveAvailability {
    leaves: Vec<Leave>,
    by_resource: HashMap<String, Vec<usize>>,
}

impl LeaveAvailability {
    pub fn new(leaves: Vec<Leave>) -> Result<Self, ValidationError> {
        for leave in &leaves {
            validate_leave(leave)?;
        }
        let mut index = Self {
            leaves,
            by_resource: HashMap::new(),
        };
        index.rebuild();
        Ok(index)
    }

    fn rebuild(&mut self) {
        self.by_resource.clear();
        for (i, leave) in self.leaves.iter().enumerate() {
            self.by_resource
                .entry(leave.resource_id.clone())
                .or_default()
                .push(i);
        }
    }

    pub fn leaves(&self) -> &[Leave] {
        &self.leaves
    }

    pub fn into_leaves(self) -> Vec<Leave> {
        self.leaves
    }

    pub fn add_leave(&mut self, leave: Leave) -> Result<(), ValidationError> {
        validate_leave(&leave)?;
        if self.get(&leave.id).is_some() {
            return Err(ValidationError::DuplicateId {
                kind: "leave",
                id: leave.id,
            });
        }
        debug!(leave_id = %leave.id, resource_id = %leave.resource_id, "leave added");
        self.leaves.push(leave);
        self.rebuild();
        Ok(())
    }

    pub fn remove_leave(&mut self, leave_id: &str) -> Option<Leave> {
        let pos = self.leaves.iter().position(|l| l.id == leave_id)?;
        let removed = self.leaves.remove(pos);
        self.rebuild();
        Some(removed)
    }

    /// Applies a partial update; the record is left untouched when the result
    /// would be invalid.
    pub fn update_leave(
        &mut self,
        leave_id: &str,
        update: &LeaveUpdate,
    ) -> Result<&Leave, ValidationError> {
        let pos = self
            .leaves
            .iter()
            .position(|l| l.id == leave_id)
            .ok_or_else(|| ValidationError::NotFound(format!("leave {leave_id}")))?;
        let mut candidate = self.leaves[pos].clone();
        update.apply_to(&mut candidate);
        validate_leave(&candidate)?;
        self.leaves[pos] = candidate;
        self.rebuild();
        Ok(&self.leaves[pos])
    }

    pub fn get(&self, leave_id: &str) -> Option<&Leave> {
        self.leaves.iter().find(|l| l.id == leave_id)
    }

    pub fn leaves_for(&self, resource_id: &str) -> impl Iterator<Item = &Leave> {
        self.by_resource
            .get(resource_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.leaves[i])
    }

    pub fn is_available(&self, resource_id: &str, date: NaiveDate) -> bool {
        !self.leaves_for(resource_id).any(|l| l.covers(date))
    }

    /// Days in `[start, end]` on which the resource is on leave.
    pub fn conflict_days(&self, resource_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !self.is_available(resource_id, *d))
            .collect()
    }

    pub fn conflicting_leaves(&self, resource_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<&Leave> {
        self.leaves_for(resource_id)
            .filter(|l| l.intersects(start, end))
            .collect()
    }

    /// Leaves of every resource touching `[start, end]`.
    pub fn leaves_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Leave> {
        self.leaves.iter().filter(|l| l.intersects(start, end)).collect()
    }

    /// Leave days of a resource within a year, or within one month of it.
    pub fn unavailable_dates(&self, resource_id: &str, year: i32, month: Option<u32>) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .leaves_for(resource_id)
            .flat_map(|l| l.start_date.iter_days().take_while(move |d| *d <= l.end_date))
            .filter(|d| d.year() == year && month.is_none_or(|m| d.month() == m))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    pub fn summary(&self, resource_id: &str, year: i32) -> LeaveSummary {
        let mut summary = LeaveSummary::default();
        for leave in self.leaves_for(resource_id) {
            let days = leave
                .start_date
                .iter_days()
                .take_while(|d| *d <= leave.end_date)
                .filter(|d| d.year() == year)
                .count() as i64;
            if days == 0 {
                continue;
            }
            summary.total_days += days;
            *summary.by_type.entry(leave.leave_type.clone()).or_insert(0) += days;
        }
        summary
    }

    /// First day after `after` that is a working day under `policy` and free
    /// of leave, searching `search_days` days ahead.
    pub fn next_available_working_day(
        &self,
        resource_id: &str,
        after: NaiveDate,
        policy: &CalendarPolicy,
        search_days: i64,
    ) -> NaiveDate {
        let found = (1..=search_days)
            .map(|offset| after + Duration::days(offset))
            .find(|d| policy.is_working_day(*d) && self.is_available(resource_id, *d));
        match found {
            Some(date) => date,
            None => {
                warn!(
                    resource_id,
                    %after,
                    search_days,
                    "no available working day found, placing in far future"
                );
                after + Duration::days(search_days)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn index() -> LeaveAvailability {
        LeaveAvailability::new(vec![
            Leave::new("L1", "R1", d(2024, 3, 5), d(2024, 3, 6)),
            Leave::new("L2", "R1", d(2024, 12, 30), d(2025, 1, 2)).with_type("sick"),
            Leave::new("L3", "R2", d(2024, 3, 4), d(2024, 3, 4)),
        ])
        .unwrap()
    }

    #[test]
    fn update_reindexes_the_moved_leave() {
        let mut leaves = index();
        let update = LeaveUpdate {
            resource_id: Some("R2".into()),
            end_date: Some(d(2024, 3, 8)),
            ..LeaveUpdate::default()
        };
        let updated = leaves.update_leave("L1", &update).unwrap();
        assert_eq!(updated.start_date, d(2024, 3, 5));
        assert_eq!(updated.end_date, d(2024, 3, 8));
        assert!(leaves.is_available("R1", d(2024, 3, 5)));
        assert!(!leaves.is_available("R2", d(2024, 3, 7)));

        let backwards = LeaveUpdate {
            end_date: Some(d(2024, 3, 1)),
            ..LeaveUpdate::default()
        };
        assert!(leaves.update_leave("L1", &backwards).is_err());
        assert_eq!(leaves.get("L1").unwrap().end_date, d(2024, 3, 8));
    }

    #[test]
    fn conflict_days_are_inclusive() {
        let leaves = index();
        assert_eq!(
            leaves.conflict_days("R1", d(2024, 3, 4), d(2024, 3, 6)),
            vec![d(2024, 3, 5), d(2024, 3, 6)]
        );
        assert!(leaves.conflict_days("R3", d(2024, 3, 4), d(2024, 3, 6)).is_empty());
        assert!(leaves.is_available("R1", d(2024, 3, 7)));
    }

    #[test]
    fn next_available_day_skips_leave_and_weekend() {
        let leaves = LeaveAvailability::new(vec![Leave::new("L1", "R1", d(2024, 3, 8), d(2024, 3, 11))]).unwrap();
        let policy = CalendarPolicy::default();
        assert_eq!(
            leaves.next_available_working_day("R1", d(2024, 3, 7), &policy, LEAVE_SEARCH_DAYS),
            d(2024, 3, 12)
        );
    }

    #[test]
    fn next_available_day_falls_back_when_nothing_matches() {
        let leaves = LeaveAvailability::default();
        let policy = CalendarPolicy::new(Vec::<Weekday>::new(), Vec::<NaiveDate>::new());
        assert_eq!(
            leaves.next_available_working_day("R1", d(2024, 3, 7), &policy, 365),
            d(2024, 3, 7) + Duration::days(365)
        );
    }

    #[test]
    fn summary_counts_days_inside_the_year() {
        let summary = index().summary("R1", 2024);
        assert_eq!(summary.total_days, 4);
        assert_eq!(summary.by_type.get("sick"), Some(&2));
        assert_eq!(summary.by_type.get("vacation"), Some(&2));
        assert_eq!(index().unavailable_dates("R1", 2025, Some(1)).len(), 2);
    }

    #[test]
    fn index_follows_add_and_remove() {
        let mut leaves = index();
        leaves
            .add_leave(Leave::new("L4", "R3", d(2024, 3, 4), d(2024, 3, 4)))
            .unwrap();
        assert!(!leaves.is_available("R3", d(2024, 3, 4)));
        assert!(leaves.add_leave(Leave::new("L4", "R3", d(2024, 4, 1), d(2024, 4, 1))).is_err());
        leaves.remove_leave("L4");
        assert!(leaves.is_available("R3", d(2024, 3, 4)));
        assert_eq!(leaves.leaves_in_range(d(2024, 3, 4), d(2024, 3, 4)).len(), 1);
    }
}
