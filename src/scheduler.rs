use crate::calendar::{CalendarProjector, ProjectCalendars, WorkingHours};
use crate::error::{PlanError, PlanResult, ValidationError};
use crate::graph::DependencyGraph;
use crate::holidays::HolidayCalendar;
use crate::project::Project;
use crate::resource::{ReducedCapacity, Resource, UNASSIGNED};
use crate::schedule::{ScheduledTask, sort_by_start};
use crate::solver::{CpModel, CpSolver, IntervalSolution, IntervalVar, PumpkinSolver, SolverConfig, SolverStatus};
use crate::task::Task;
use crate::task_validation::{validate_projects, validate_task_collection};
use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Slack added to the summed durations to form the model horizon.
pub const HORIZON_SLACK_HOURS: i64 = 100;

/// Result of one solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedSchedule {
    pub tasks: Vec<ScheduledTask>,
    pub status: SolverStatus,
    /// Makespan in working hours.
    pub makespan_hours: i64,
}

/// Everything a solve reads besides the solver settings.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleInput<'a> {
    pub tasks: &'a [Task],
    pub resources: &'a [Resource],
    pub projects: &'a [Project],
    pub reduced_capacities: &'a [ReducedCapacity],
    pub start_date: NaiveDate,
}

/// Assigns tasks to working hours minimizing the makespan, then maps the
/// abstract hours onto each task's project calendar.
pub struct ConstraintScheduler<S = PumpkinSolver> {
    solver: S,
    config: SolverConfig,
    hours: WorkingHours,
}

impl ConstraintScheduler {
    pub fn new(config: SolverConfig) -> Self {
        Self::with_solver(PumpkinSolver, config)
    }
}

impl Default for ConstraintScheduler {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<S: CpSolver> ConstraintScheduler<S> {
    pub fn with_solver(solver: S, config: SolverConfig) -> Self {
        Self {
            solver,
            config,
            hours: WorkingHours::default(),
        }
    }

    pub fn with_working_hours(mut self, hours: WorkingHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn schedule(&self, input: ScheduleInput<'_>, holidays: &mut HolidayCalendar) -> PlanResult<Vec<ScheduledTask>> {
        self.solve(input, holidays).map(|solved| solved.tasks)
    }

    pub fn solve(&self, input: ScheduleInput<'_>, holidays: &mut HolidayCalendar) -> PlanResult<SolvedSchedule> {
        if input.tasks.is_empty() {
            return Ok(SolvedSchedule {
                tasks: Vec::new(),
                status: SolverStatus::Optimal,
                makespan_hours: 0,
            });
        }
        if !self.hours.is_valid() {
            return Err(ValidationError::WorkingHours {
                start: self.hours.start_hour,
                end: self.hours.end_hour,
            }
            .into());
        }
        validate_task_collection(input.tasks)?;
        validate_projects(input.projects)?;
        let dag = DependencyGraph::build(input.tasks)?;

        info!(
            tasks = input.tasks.len(),
            resources = input.resources.len(),
            start_date = %input.start_date,
            "solving schedule"
        );
        let model = self.build_model(input.tasks, &dag);
        let solution = self.solver.solve(&model, &self.config);
        if !solution.is_solution_found() {
            warn!(status = %solution.status, "solver found no schedule");
            return Err(PlanError::NoSolution {
                status: solution.status,
            });
        }
        info!(status = %solution.status, makespan_hours = solution.makespan, "schedule solved");

        let calendars = ProjectCalendars::new(input.projects, input.reduced_capacities, self.hours, holidays);
        let start = self.hours.day_start(input.start_date);
        let names: HashMap<&str, &str> = input
            .resources
            .iter()
            .map(|r| (r.id.as_str(), r.name.as_str()))
            .collect();

        let mut placed: Vec<ScheduledTask> = input
            .tasks
            .par_iter()
            .zip(solution.intervals.par_iter())
            .map(|(task, iv)| {
                let policy = calendars.policy_for(&task.project_id);
                let projector = CalendarProjector::new(start, policy);
                let resource = task.assigned_to.as_deref();
                let (resource_id, resource_name) = match resource {
                    None => (UNASSIGNED.to_string(), UNASSIGNED.to_string()),
                    Some(id) => match names.get(id) {
                        Some(name) => (id.to_string(), name.to_string()),
                        None => {
                            warn!(task_id = %task.id, resource_id = id, "task assigned to unknown resource");
                            (id.to_string(), UNASSIGNED.to_string())
                        }
                    },
                };
                ScheduledTask {
                    task_id: task.id.clone(),
                    task_name: task.name.clone(),
                    resource_id,
                    resource_name,
                    start: projector.project_start(hours_offset(iv.start), resource),
                    end: projector.project(hours_offset(iv.end), resource),
                    project_id: task.project_id.clone(),
                }
            })
            .collect();

        align_to_calendar(&mut placed, input.tasks, &dag, &solution.intervals, &calendars);
        sort_by_start(&mut placed);

        Ok(SolvedSchedule {
            tasks: placed,
            status: solution.status,
            makespan_hours: solution.makespan,
        })
    }

    /// One interval per task (same order as `tasks`), an edge per
    /// dependency and one no-overlap group per assigned resource.
    pub fn build_model(&self, tasks: &[Task], dag: &DependencyGraph) -> CpModel {
        let horizon = tasks.iter().map(|t| i64::from(t.duration_hours)).sum::<i64>() + HORIZON_SLACK_HOURS;
        let mut model = CpModel::new("workplan", horizon);
        for task in tasks {
            model.add_interval(IntervalVar::within_horizon(
                task.id.clone(),
                i64::from(task.duration_hours),
                horizon,
            ));
        }
        for (before, after) in dag.edges() {
            model.add_precedence(before, after, 0);
        }

        let mut by_resource: Vec<(&str, Vec<usize>)> = Vec::new();
        for (i, task) in tasks.iter().enumerate() {
            let Some(resource) = task.assigned_to.as_deref() else {
                continue;
            };
            match by_resource.iter_mut().find(|(r, _)| *r == resource) {
                Some((_, members)) => members.push(i),
                None => by_resource.push((resource, vec![i])),
            }
        }
        for (_, members) in by_resource {
            model.add_no_overlap(members);
        }
        model
    }
}

fn hours_offset(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Projections of tasks on different resources or projects can disagree
/// (a reduced day for one resource, a different work week for another
/// project). Walk the tasks in solved order and push any task that would
/// start before a dependency or its resource's previous task ends.
fn align_to_calendar(
    placed: &mut [ScheduledTask],
    tasks: &[Task],
    dag: &DependencyGraph,
    intervals: &[IntervalSolution],
    calendars: &ProjectCalendars,
) {
    let mut order: Vec<usize> = (0..placed.len()).collect();
    order.sort_by_key(|&i| (intervals[i].start, i));
    let mut resource_free: HashMap<String, NaiveDateTime> = HashMap::new();

    for i in order {
        let task = &tasks[i];
        let mut earliest = placed[i].start;
        for dep in dag.dependencies_of(&task.id) {
            if let Some(j) = dag.id_to_index.get(dep).map(|ix| ix.index()) {
                earliest = earliest.max(placed[j].end);
            }
        }
        if let Some(resource) = task.assigned_to.as_deref() {
            if let Some(&free) = resource_free.get(resource) {
                earliest = earliest.max(free);
            }
        }

        if earliest > placed[i].start {
            let policy = calendars.policy_for(&task.project_id);
            let projector = CalendarProjector::new(earliest, policy);
            let resource = task.assigned_to.as_deref();
            let start = projector.project_start(0, resource);
            let end = CalendarProjector::new(start, policy).project(task.duration_hours, resource);
            debug!(
                task_id = %task.id,
                from = %placed[i].start,
                to = %start,
                "moved task to keep calendar order"
            );
            placed[i].start = start;
            placed[i].end = end;
        }

        if let Some(resource) = task.assigned_to.as_deref() {
            resource_free.insert(resource.to_string(), placed[i].end);
        }
    }
}
