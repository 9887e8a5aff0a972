//! Public holiday lookup.
//!
//! `HolidaySource` is the pure lookup `holidays(country_code, year)`.
//! `HolidayCalendar` wraps a source, memoizes per country/year and resolves a
//! project's `HolidayConfig` into a date set. Build one per process or per
//! request and pass it in; nothing here is global.

use crate::project::HolidayConfig;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub trait HolidaySource {
    fn holidays(&self, country_code: &str, year: i32) -> HashSet<NaiveDate>;
}

/// Source that knows no holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidaySource for NoHolidays {
    fn holidays(&self, _country_code: &str, _year: i32) -> HashSet<NaiveDate> {
        HashSet::new()
    }
}

/// US federal holidays computed from their fixed rules. Other country codes
/// resolve to an empty set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FederalHolidays;

impl FederalHolidays {
    fn us_holidays(year: i32) -> HashSet<NaiveDate> {
        let candidates = [
            // New Year's Day
            NaiveDate::from_ymd_opt(year, 1, 1),
            // Martin Luther King Jr. Day (3rd Monday in January)
            nth_weekday(year, 1, Weekday::Mon, 3),
            // Presidents' Day (3rd Monday in February)
            nth_weekday(year, 2, Weekday::Mon, 3),
            // Memorial Day (last Monday in May)
            last_weekday(year, 5, Weekday::Mon),
            // Juneteenth
            NaiveDate::from_ymd_opt(year, 6, 19),
            // Independence Day
            NaiveDate::from_ymd_opt(year, 7, 4),
            // Labor Day (1st Monday in September)
            nth_weekday(year, 9, Weekday::Mon, 1),
            // Columbus Day (2nd Monday in October)
            nth_weekday(year, 10, Weekday::Mon, 2),
            // Veterans Day
            NaiveDate::from_ymd_opt(year, 11, 11),
            // Thanksgiving (4th Thursday in November)
            nth_weekday(year, 11, Weekday::Thu, 4),
            // Christmas
            NaiveDate::from_ymd_opt(year, 12, 25),
        ];
        candidates.into_iter().flatten().collect()
    }
}

impl HolidaySource for FederalHolidays {
    fn holidays(&self, country_code: &str, year: i32) -> HashSet<NaiveDate> {
        if country_code.eq_ignore_ascii_case("US") {
            Self::us_holidays(year)
        } else {
            warn!(country_code, "country code not supported, assuming no holidays");
            HashSet::new()
        }
    }
}

/// The nth occurrence of a weekday in a month.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut count = 0;
    while date.month() == month {
        if date.weekday() == weekday {
            count += 1;
            if count == n {
                return Some(date);
            }
        }
        date += Duration::days(1);
    }
    None
}

/// The last occurrence of a weekday in a month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut date = first_of_next - Duration::days(1);
    while date.weekday() != weekday {
        date -= Duration::days(1);
    }
    Some(date)
}

/// Memoizing front for a `HolidaySource`.
pub struct HolidayCalendar {
    source: Box<dyn HolidaySource + Send + Sync>,
    cache: HashMap<(String, i32), HashSet<NaiveDate>>,
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::new(FederalHolidays)
    }
}

impl HolidayCalendar {
    pub fn new<S>(source: S) -> Self
    where
        S: HolidaySource + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
            cache: HashMap::new(),
        }
    }

    pub fn holidays(&mut self, country_code: &str, year: i32) -> &HashSet<NaiveDate> {
        let key = (country_code.to_ascii_uppercase(), year);
        let source = &self.source;
        self.cache.entry(key).or_insert_with(|| {
            debug!(country_code, year, "resolving holidays");
            source.holidays(country_code, year)
        })
    }

    pub fn resolve(&mut self, config: &HolidayConfig) -> HashSet<NaiveDate> {
        match config {
            HolidayConfig::None => HashSet::new(),
            HolidayConfig::Dates { dates } => dates.iter().copied().collect(),
            HolidayConfig::Country { country_code, year } => {
                self.holidays(country_code, *year).clone()
            }
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn us_rules_cover_floating_holidays() {
        let set = FederalHolidays.holidays("US", 2024);
        assert!(set.contains(&d(2024, 1, 1)));
        assert!(set.contains(&d(2024, 1, 15))); // MLK day
        assert!(set.contains(&d(2024, 5, 27))); // Memorial day
        assert!(set.contains(&d(2024, 11, 28))); // Thanksgiving
        assert!(set.contains(&d(2024, 12, 25)));
        assert!(!set.contains(&d(2024, 3, 4)));
    }

    #[test]
    fn unknown_country_has_no_holidays() {
        assert!(FederalHolidays.holidays("ZZ", 2024).is_empty());
    }

    struct CountingSource(Arc<AtomicUsize>);

    impl HolidaySource for CountingSource {
        fn holidays(&self, _country_code: &str, year: i32) -> HashSet<NaiveDate> {
            self.0.fetch_add(1, Ordering::SeqCst);
            HashSet::from([d(year, 1, 2)])
        }
    }

    #[test]
    fn calendar_memoizes_per_country_and_year() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut calendar = HolidayCalendar::new(CountingSource(calls.clone()));
        calendar.holidays("ae", 2024);
        calendar.holidays("AE", 2024);
        calendar.holidays("AE", 2025);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(calendar.cached_entries(), 2);
    }

    #[test]
    fn explicit_dates_bypass_the_source() {
        let mut calendar = HolidayCalendar::new(NoHolidays);
        let config = HolidayConfig::Dates {
            dates: vec![d(2024, 3, 5)],
        };
        assert_eq!(calendar.resolve(&config), HashSet::from([d(2024, 3, 5)]));
        assert_eq!(calendar.cached_entries(), 0);
    }
}
