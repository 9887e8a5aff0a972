//! Constraint model and solver used by the scheduler.
//!
//! The scheduler builds a `CpModel` (fixed-duration intervals, precedence,
//! per-resource no-overlap, makespan objective) and hands it to any
//! `CpSolver`. `PumpkinSolver` is the shipped implementation.

pub mod model;
pub mod pumpkin;

pub use model::{CpModel, IntervalVar, Precedence};
pub use pumpkin::PumpkinSolver;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Best possible objective, proven.
    Optimal,
    /// A solution was found but the search stopped before proving it best.
    Feasible,
    /// Proven to have no solution.
    Infeasible,
    /// Stopped before finding any solution.
    Unknown,
}

impl SolverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::Optimal => "OPTIMAL",
            SolverStatus::Feasible => "FEASIBLE",
            SolverStatus::Infeasible => "INFEASIBLE",
            SolverStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn has_solution(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Wall-clock budget; the best solution found so far is kept when it runs out.
    pub time_limit: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalSolution {
    pub name: String,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpSolution {
    pub status: SolverStatus,
    /// Same order as the model's intervals; empty without a solution.
    pub intervals: Vec<IntervalSolution>,
    pub makespan: i64,
}

impl CpSolution {
    pub fn without_solution(status: SolverStatus) -> Self {
        Self {
            status,
            intervals: Vec::new(),
            makespan: 0,
        }
    }

    pub fn is_solution_found(&self) -> bool {
        self.status.has_solution()
    }

    pub fn get(&self, name: &str) -> Option<&IntervalSolution> {
        self.intervals.iter().find(|iv| iv.name == name)
    }
}

pub trait CpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}
