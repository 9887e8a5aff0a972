use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Working weekdays as indices, 0 = Monday through 6 = Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWeekConfig {
    pub working_days: Vec<u8>,
}

impl Default for WorkWeekConfig {
    fn default() -> Self {
        Self {
            working_days: vec![0, 1, 2, 3, 4],
        }
    }
}

impl WorkWeekConfig {
    pub fn new<I>(days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        let mut working_days: Vec<u8> = days
            .into_iter()
            .map(|wd| wd.num_days_from_monday() as u8)
            .collect();
        working_days.sort_unstable();
        working_days.dedup();
        Self { working_days }
    }

    /// Indices above 6 are ignored; validation reports them separately.
    pub fn weekdays(&self) -> HashSet<Weekday> {
        self.working_days
            .iter()
            .filter_map(|idx| weekday_from_index(*idx))
            .collect()
    }
}

pub fn weekday_from_index(idx: u8) -> Option<Weekday> {
    match idx {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Where a project's public holidays come from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HolidayConfig {
    #[default]
    None,
    /// Resolved through the injected holiday source.
    Country { country_code: String, year: i32 },
    /// Explicit list; bypasses the holiday source.
    Dates { dates: Vec<NaiveDate> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    /// Deadline, if the project has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub work_week: WorkWeekConfig,
    #[serde(default)]
    pub holidays: HolidayConfig,
    #[serde(default)]
    pub total_estimated_hours: u32,
    #[serde(default)]
    pub total_actual_hours: u32,
    #[serde(default)]
    pub buffer_hours: u32,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            start_date,
            end_date: None,
            work_week: WorkWeekConfig::default(),
            holidays: HolidayConfig::default(),
            total_estimated_hours: 0,
            total_actual_hours: 0,
            buffer_hours: 0,
        }
    }

    pub fn with_deadline(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_work_week(mut self, work_week: WorkWeekConfig) -> Self {
        self.work_week = work_week;
        self
    }

    pub fn with_holidays(mut self, holidays: HolidayConfig) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn with_buffer_hours(mut self, hours: u32) -> Self {
        self.buffer_hours = hours;
        self
    }
}
