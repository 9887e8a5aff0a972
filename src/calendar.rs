use crate::holidays::HolidayCalendar;
use crate::project::Project;
use crate::resource::ReducedCapacity;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Upper bound on day-by-day scans that look for the next working day.
const MAX_DAY_SCAN: i64 = 3660;

/// Fixed part of the projection iteration budget (`10 * hours + this`).
pub const PROJECTION_ITERATION_SLACK: u64 = 10_000;

/// Daily working window, whole hours on a 24h clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
        }
    }
}

impl WorkingHours {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start_hour < self.end_hour && self.end_hour <= 24
    }

    /// Standard capacity of one working day.
    pub fn daily_hours(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }

    pub fn start_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.start_hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn day_start(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start_time())
    }
}

/// Answers "is this a working day" and "how many hours are available" for one
/// project's work week, holidays and capacity overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarPolicy {
    working_days: HashSet<Weekday>,
    holidays: HashSet<NaiveDate>,
    reduced_capacities: Vec<ReducedCapacity>,
    hours: WorkingHours,
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self::new(
            [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            Vec::<NaiveDate>::new(),
        )
    }
}

impl CalendarPolicy {
    pub fn new<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        Self {
            working_days: working_days.into_iter().collect(),
            holidays: holidays.into_iter().collect(),
            reduced_capacities: Vec::new(),
            hours: WorkingHours::default(),
        }
    }

    /// Policy for a project's work week and holiday configuration.
    pub fn for_project(project: &Project, holidays: &mut HolidayCalendar) -> Self {
        Self {
            working_days: project.work_week.weekdays(),
            holidays: holidays.resolve(&project.holidays),
            reduced_capacities: Vec::new(),
            hours: WorkingHours::default(),
        }
    }

    pub fn with_reduced_capacities(mut self, reduced: Vec<ReducedCapacity>) -> Self {
        self.reduced_capacities = reduced;
        self
    }

    pub fn with_working_hours(mut self, hours: WorkingHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn working_hours(&self) -> WorkingHours {
        self.hours
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    /// Hours `resource_id` can work on `date`.
    ///
    /// An override naming the resource beats a global one; among overrides
    /// of the same kind the first listed wins.
    pub fn capacity_hours(&self, date: NaiveDate, resource_id: Option<&str>) -> u32 {
        let mut global = None;
        for rc in self.reduced_capacities.iter().filter(|rc| rc.matches(date, resource_id)) {
            if rc.resource_id.is_some() {
                return rc.available_hours;
            }
            global = global.or(Some(rc.available_hours));
        }
        global.unwrap_or_else(|| self.hours.daily_hours())
    }

    /// First working day strictly after `from`, if one exists within ten years.
    pub fn next_working_day(&self, from: NaiveDate) -> Option<NaiveDate> {
        (1..=MAX_DAY_SCAN)
            .map(|offset| from + Duration::days(offset))
            .find(|date| self.is_working_day(*date))
    }

    pub fn working_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_working_day(*date))
            .collect()
    }

    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> usize {
        self.working_days_in_range(start, end).len()
    }
}

/// Maps business-hour offsets from a start instant onto the calendar.
pub struct CalendarProjector<'a> {
    start: NaiveDateTime,
    policy: &'a CalendarPolicy,
}

impl<'a> CalendarProjector<'a> {
    pub fn new(start: NaiveDateTime, policy: &'a CalendarPolicy) -> Self {
        Self { start, policy }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// The instant after `hour_offset` working hours of `resource_id` have
    /// elapsed since the start instant.
    pub fn project(&self, hour_offset: u32, resource_id: Option<&str>) -> NaiveDateTime {
        self.walk(hour_offset, resource_id, false)
    }

    /// Like `project`, then moves forward to the next instant at which a
    /// working hour can actually be spent, so starts never sit on a closing
    /// bell or an exhausted day.
    pub fn project_start(&self, hour_offset: u32, resource_id: Option<&str>) -> NaiveDateTime {
        self.walk(hour_offset, resource_id, true)
    }

    fn walk(&self, hour_offset: u32, resource_id: Option<&str>, settle: bool) -> NaiveDateTime {
        let hours = self.policy.working_hours();
        let max_iterations = u64::from(hour_offset) * 10 + PROJECTION_ITERATION_SLACK;
        let mut iteration: u64 = 0;
        let mut current = self.start;
        let mut remaining = i64::from(hour_offset);
        let mut used_today = 0u32;
        let mut current_date = current.date();

        loop {
            if remaining == 0 && !settle {
                break;
            }
            iteration += 1;
            if iteration > max_iterations {
                warn!(
                    hour_offset,
                    remaining, "calendar projection exceeded its iteration bound, adding hours linearly"
                );
                return current + Duration::hours(remaining);
            }

            if !self.policy.is_working_day(current.date()) {
                current = hours.day_start(current.date() + Duration::days(1));
                used_today = 0;
                current_date = current.date();
                continue;
            }

            if current.date() != current_date {
                used_today = 0;
                current_date = current.date();
            }

            if used_today >= self.policy.capacity_hours(current_date, resource_id) {
                current = hours.day_start(current.date() + Duration::days(1));
                used_today = 0;
                current_date = current.date();
                continue;
            }

            if current.hour() >= hours.end_hour {
                current = hours.day_start(current.date() + Duration::days(1));
                continue;
            }
            if current.hour() < hours.start_hour {
                current = hours.day_start(current.date());
                continue;
            }

            if remaining == 0 {
                break;
            }
            current += Duration::hours(1);
            remaining -= 1;
            used_today += 1;
        }

        current
    }
}

/// Calendar policy per project id, with a Mon-Fri fallback.
#[derive(Debug, Clone, Default)]
pub struct ProjectCalendars {
    by_project: HashMap<String, CalendarPolicy>,
    fallback: CalendarPolicy,
}

impl ProjectCalendars {
    pub fn new(
        projects: &[Project],
        reduced_capacities: &[ReducedCapacity],
        hours: WorkingHours,
        holidays: &mut HolidayCalendar,
    ) -> Self {
        let by_project = projects
            .iter()
            .map(|p| {
                let policy = CalendarPolicy::for_project(p, holidays)
                    .with_reduced_capacities(reduced_capacities.to_vec())
                    .with_working_hours(hours);
                (p.id.clone(), policy)
            })
            .collect();
        let fallback = CalendarPolicy::default()
            .with_reduced_capacities(reduced_capacities.to_vec())
            .with_working_hours(hours);
        Self { by_project, fallback }
    }

    pub fn policy_for(&self, project_id: &str) -> &CalendarPolicy {
        self.by_project.get(project_id).unwrap_or(&self.fallback)
    }

    /// Whether `project_id` names a known project rather than the fallback.
    pub fn contains(&self, project_id: &str) -> bool {
        self.by_project.contains_key(project_id)
    }
}
