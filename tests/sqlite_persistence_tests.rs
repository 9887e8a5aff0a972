#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use workplan::leave::Leave;
use workplan::persistence::{ScheduleStore, SqliteScheduleStore};
use workplan::planner::Planner;
use workplan::project::{HolidayConfig, Project};
use workplan::resource::{ReducedCapacity, Resource};
use workplan::state::PlanState;
use workplan::task::Task;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn planned_state() -> PlanState {
    let mut state = PlanState {
        start_date: Some(d(2024, 3, 4)),
        ..PlanState::default()
    };
    state
        .add_project(
            Project::new("P1", "SQLite Project", d(2024, 3, 4))
                .with_deadline(d(2024, 3, 29))
                .with_holidays(HolidayConfig::Dates {
                    dates: vec![d(2024, 3, 8)],
                }),
        )
        .unwrap();
    state.add_resource(Resource::new("R1", "Alice", "Developer")).unwrap();
    state.add_resource(Resource::new("R2", "Bob", "Designer")).unwrap();
    state
        .add_task(Task::new("T1", "Design", 8).assigned("R2").in_project("P1"))
        .unwrap();
    state
        .add_task(Task::new("T2", "Build", 24).assigned("R1").in_project("P1").depends_on(["T1"]))
        .unwrap();
    state.add_leave(Leave::new("L1", "R1", d(2024, 3, 6), d(2024, 3, 6))).unwrap();
    state
        .reduced_capacities
        .push(ReducedCapacity::new("RC1", d(2024, 3, 5), 6).for_resource("R1"));
    Planner::default().run(&mut state).unwrap();
    state
}

#[test]
fn sqlite_store_round_trip_state() {
    let file = NamedTempFile::new().unwrap();
    let store = SqliteScheduleStore::new(file.path()).unwrap();
    let state = planned_state();
    store.save_state(&state).unwrap();

    let loaded = store.load_state().unwrap().expect("state stored");
    assert_eq!(loaded, state);
    assert_eq!(loaded.schedule.len(), 2);
    assert_eq!(loaded.start_date, Some(d(2024, 3, 4)));
}

#[test]
fn reopened_file_keeps_the_saved_state() {
    let file = NamedTempFile::new().unwrap();
    let state = planned_state();
    {
        let store = SqliteScheduleStore::new(file.path()).unwrap();
        store.save_state(&state).unwrap();
    }
    let reopened = SqliteScheduleStore::new(file.path()).unwrap();
    assert_eq!(reopened.load_state().unwrap(), Some(state));
}

#[test]
fn state_without_start_date_round_trips() {
    let store = SqliteScheduleStore::in_memory().unwrap();
    let mut state = PlanState::default();
    state.add_resource(Resource::new("R1", "Alice", "Developer")).unwrap();
    store.save_state(&state).unwrap();
    let loaded = store.load_state().unwrap().unwrap();
    assert_eq!(loaded.start_date, None);
    assert_eq!(loaded.resources.len(), 1);
}
