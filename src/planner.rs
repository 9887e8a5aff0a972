//! End-to-end planning run over a `PlanState`: solve, repair against leave,
//! then report deadline risk.

use crate::calculations::deadline::{DeadlineOverrun, deadline_overrun};
use crate::calculations::{
    Adjustment, ShiftOptimizer, ShiftOutcome, Suggestion, critical_path_tasks, suggest_compression, tasks_at_risk,
};
use crate::calendar::ProjectCalendars;
use crate::config::PlannerConfig;
use crate::error::{PlanResult, ValidationError};
use crate::graph::DependencyGraph;
use crate::holidays::HolidayCalendar;
use crate::leave::LeaveAvailability;
use crate::scheduler::{ConstraintScheduler, ScheduleInput, SolvedSchedule};
use crate::schedule::ScheduledTask;
use crate::solver::SolverStatus;
use crate::state::PlanState;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRisk {
    pub project_id: String,
    pub deadline: NaiveDate,
    pub at_risk: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeadlineReport {
    pub projects: Vec<ProjectRisk>,
    pub suggestions: Vec<Suggestion>,
    pub critical_path: Vec<String>,
}

impl DeadlineReport {
    pub fn at_risk_count(&self) -> usize {
        self.projects.iter().map(|p| p.at_risk.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub status: SolverStatus,
    pub makespan_hours: i64,
    pub adjustments: Vec<Adjustment>,
    pub buffer_used: BTreeMap<String, u32>,
    pub deadlines: DeadlineReport,
}

pub struct Planner {
    config: PlannerConfig,
    holidays: HolidayCalendar,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            holidays: HolidayCalendar::default(),
        }
    }

    pub fn with_holidays(mut self, holidays: HolidayCalendar) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn calendars(&mut self, state: &PlanState) -> ProjectCalendars {
        ProjectCalendars::new(
            &state.projects,
            &state.reduced_capacities,
            self.config.working_hours,
            &mut self.holidays,
        )
    }

    /// Solves the state's tasks without touching the state.
    pub fn solve(&mut self, state: &PlanState) -> PlanResult<SolvedSchedule> {
        let start_date = match state.effective_start_date() {
            Some(date) => date,
            None if state.tasks.is_empty() => {
                return Ok(SolvedSchedule {
                    tasks: Vec::new(),
                    status: SolverStatus::Optimal,
                    makespan_hours: 0,
                });
            }
            None => return Err(ValidationError::NotFound("start date".to_string()).into()),
        };
        let scheduler = ConstraintScheduler::new(self.config.solver.to_solver_config())
            .with_working_hours(self.config.working_hours);
        scheduler.solve(
            ScheduleInput {
                tasks: &state.tasks,
                resources: &state.resources,
                projects: &state.projects,
                reduced_capacities: &state.reduced_capacities,
                start_date,
            },
            &mut self.holidays,
        )
    }

    /// Runs the leave repair pass over `schedule`.
    pub fn shift(&mut self, state: &PlanState, schedule: Vec<ScheduledTask>) -> PlanResult<ShiftOutcome> {
        let dag = DependencyGraph::build(&state.tasks)?;
        let leaves = LeaveAvailability::new(state.leaves.clone())?;
        let calendars = self.calendars(state);
        Ok(ShiftOptimizer::new(&state.tasks, &dag, &leaves, &calendars)
            .with_settings(self.config.shift)
            .optimize(schedule))
    }

    /// Deadline risk for every project that has a deadline, reassignment
    /// suggestions and the critical path of the current schedule.
    pub fn analyze(&self, state: &PlanState) -> DeadlineReport {
        let mut report = DeadlineReport::default();
        let mut all_at_risk = Vec::new();
        for project in &state.projects {
            let Some(deadline) = project.end_date else {
                continue;
            };
            let project_tasks: Vec<_> = state
                .tasks
                .iter()
                .filter(|t| t.project_id == project.id)
                .cloned()
                .collect();
            let at_risk = tasks_at_risk(&project_tasks, &state.schedule, deadline);
            report.projects.push(ProjectRisk {
                project_id: project.id.clone(),
                deadline,
                at_risk: at_risk.iter().map(|t| t.id.clone()).collect(),
            });
            all_at_risk.extend(at_risk);
        }
        report.suggestions = suggest_compression(&all_at_risk, &state.resources, &self.config.deadline);
        report.critical_path = critical_path_tasks(&state.tasks, &state.schedule)
            .into_iter()
            .map(|t| t.id)
            .collect();
        report
    }

    /// Whether `project_id`'s current latest end stays within the configured
    /// overrun of `original_end`, measured from the working-day start of
    /// `reference`.
    pub fn overrun(
        &self,
        state: &PlanState,
        project_id: &str,
        original_end: NaiveDateTime,
        reference: NaiveDate,
    ) -> DeadlineOverrun {
        deadline_overrun(
            &state.schedule,
            project_id,
            original_end,
            self.config.working_hours.day_start(reference),
            self.config.deadline.max_overrun_ratio,
        )
    }

    /// Solve, repair against leave, store the schedule on `state` and report.
    pub fn run(&mut self, state: &mut PlanState) -> PlanResult<PlanReport> {
        state.refresh_project_totals(self.config.shift.buffer_ratio);
        let solved = self.solve(state)?;
        let outcome = self.shift(state, solved.tasks)?;
        state.schedule = outcome.schedule;
        let deadlines = self.analyze(state);
        info!(
            tasks = state.schedule.len(),
            adjustments = outcome.adjustments.len(),
            at_risk = deadlines.at_risk_count(),
            "planning run finished"
        );
        Ok(PlanReport {
            status: solved.status,
            makespan_hours: solved.makespan_hours,
            adjustments: outcome.adjustments,
            buffer_used: outcome.buffer_used,
            deadlines,
        })
    }
}
