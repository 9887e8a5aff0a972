pub mod calculations;
pub mod calendar;
pub mod config;
pub mod error;
pub mod frame;
pub mod graph;
pub mod holidays;
pub mod leave;
pub mod logging;
pub mod persistence;
pub mod planner;
pub mod project;
pub mod resource;
pub mod schedule;
pub mod scheduler;
pub mod solver;
pub mod state;
pub mod task;
pub mod task_validation;

pub use calendar::{CalendarPolicy, CalendarProjector, WorkingHours};
pub use config::PlannerConfig;
pub use error::{PlanError, PlanResult, ValidationError};
pub use graph::DependencyGraph;
pub use holidays::HolidayCalendar;
pub use leave::{Leave, LeaveAvailability};
pub use planner::{PlanReport, Planner};
pub use project::Project;
pub use resource::{ReducedCapacity, Resource};
pub use schedule::ScheduledTask;
pub use scheduler::{ConstraintScheduler, ScheduleInput, SolvedSchedule};
pub use state::PlanState;
pub use task::Task;
