use crate::solver::SolverStatus;
use thiserror::Error;

/// Malformed input detected before any scheduling work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },
    #[error("task {task_id} has non-positive duration")]
    NonPositiveDuration { task_id: String },
    #[error("task {task_id} depends on unknown task {dependency}")]
    UnknownDependency { task_id: String, dependency: String },
    #[error("task {task_id} depends on itself")]
    SelfDependency { task_id: String },
    #[error("leave {leave_id} ends on {end} before it starts on {start}")]
    LeaveRange {
        leave_id: String,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("project {project_id} has no working days")]
    EmptyWorkWeek { project_id: String },
    #[error("project {project_id} lists weekday index {index} (expected 0-6)")]
    InvalidWeekday { project_id: String, index: u8 },
    #[error("working hours {start}:00-{end}:00 are not a valid day")]
    WorkingHours { start: u32, end: u32 },
    #[error("{0} not found")]
    NotFound(String),
}

/// Crate-level error taxonomy for a planning request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("circular dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
    #[error("no solution found. Solver status: {status}")]
    NoSolution { status: SolverStatus },
}

impl PlanError {
    /// True when the caller has to fix the task graph or records; false when
    /// retrying with relaxed constraints could help.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PlanError::Validation(_) | PlanError::CyclicDependency { .. }
        )
    }
}

pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = PlanError::CyclicDependency {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "circular dependency detected: A -> B -> A");
        assert!(err.is_input_error());
    }

    #[test]
    fn no_solution_is_not_an_input_error() {
        let err = PlanError::NoSolution {
            status: SolverStatus::Unknown,
        };
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("UNKNOWN"));
    }
}
