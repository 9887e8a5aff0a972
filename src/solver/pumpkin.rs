use super::model::CpModel;
use super::{CpSolution, CpSolver, IntervalSolution, SolverConfig, SolverStatus};
use pumpkin_solver::Solver;
use pumpkin_solver::constraints as cp;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution, SolutionReference};
use pumpkin_solver::termination::TimeBudget;
use pumpkin_solver::variables::{DomainId, TransformableVariable};
use std::time::Instant;
use tracing::{debug, warn};

/// Makespan minimization with the Pumpkin CP solver.
///
/// Each interval becomes a start variable, precedences become linear
/// inequalities and each no-overlap group a unit-capacity `cumulative`.
/// The returned starts are left-justified: every interval is pulled as early
/// as its predecessors and its resources' previous intervals allow, which
/// never moves an end later.
#[derive(Debug, Clone, Copy, Default)]
pub struct PumpkinSolver;

fn noop_callback<B>(_: &Solver, _: SolutionReference, _: &B) {}

fn to_domain(value: i64) -> Option<i32> {
    i32::try_from(value).ok()
}

impl CpSolver for PumpkinSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        if model.intervals.is_empty() {
            return CpSolution {
                status: SolverStatus::Optimal,
                intervals: Vec::new(),
                makespan: 0,
            };
        }
        let n = model.intervals.len();
        if model.precedences.iter().any(|p| p.before >= n || p.after >= n)
            || model.no_overlaps.iter().flatten().any(|&i| i >= n)
        {
            warn!(model = %model.name, "model references unknown intervals");
            return CpSolution::without_solution(SolverStatus::Infeasible);
        }

        let mut bounds = Vec::with_capacity(n);
        for iv in &model.intervals {
            let upper = iv.start_max.min(iv.end_max - iv.duration);
            if iv.duration < 0 || iv.start_min > upper {
                warn!(model = %model.name, interval = %iv.name, "interval cannot fit its bounds");
                return CpSolution::without_solution(SolverStatus::Infeasible);
            }
            match (to_domain(iv.start_min), to_domain(upper), to_domain(iv.duration)) {
                (Some(lo), Some(hi), Some(duration)) => bounds.push((lo, hi, duration)),
                _ => {
                    warn!(model = %model.name, interval = %iv.name, "interval bounds exceed the solver domain");
                    return CpSolution::without_solution(SolverStatus::Unknown);
                }
            }
        }
        let Some(horizon) = to_domain(model.horizon) else {
            warn!(model = %model.name, horizon = model.horizon, "horizon exceeds the solver domain");
            return CpSolution::without_solution(SolverStatus::Unknown);
        };

        let mut solver = Solver::default();
        let tag = solver.new_constraint_tag();
        let starts: Vec<DomainId> = bounds
            .iter()
            .map(|&(lo, hi, _)| solver.new_bounded_integer(lo, hi))
            .collect();
        let durations: Vec<i32> = bounds.iter().map(|&(_, _, duration)| duration).collect();

        let mut posted = true;
        for p in &model.precedences {
            let Some(gap) = to_domain(model.intervals[p.before].duration + p.min_delay) else {
                return CpSolution::without_solution(SolverStatus::Unknown);
            };
            // start[after] - start[before] >= duration[before] + delay
            let terms = vec![starts[p.after].scaled(1), starts[p.before].scaled(-1)];
            posted &= solver
                .add_constraint(cp::greater_than_or_equals(terms, gap, tag))
                .post()
                .is_ok();
        }
        for group in &model.no_overlaps {
            posted &= solver
                .add_constraint(cp::cumulative(
                    group.iter().map(|&i| starts[i]).collect::<Vec<_>>(),
                    group.iter().map(|&i| durations[i]).collect::<Vec<_>>(),
                    vec![1; group.len()],
                    1,
                    tag,
                ))
                .post()
                .is_ok();
        }

        let makespan = solver.new_bounded_integer(0, horizon);
        for (&start, &duration) in starts.iter().zip(&durations) {
            let terms = vec![makespan.scaled(1), start.scaled(-1)];
            posted &= solver
                .add_constraint(cp::greater_than_or_equals(terms, duration, tag))
                .post()
                .is_ok();
        }
        if !posted {
            debug!(model = %model.name, "constraints conflict at the root");
            return CpSolution::without_solution(SolverStatus::Infeasible);
        }

        let mut brancher = solver.default_brancher();
        let mut termination = TimeBudget::starting_now(config.time_limit);
        let result = solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, makespan, noop_callback),
        );

        let (status, values): (SolverStatus, Vec<i64>) = match result {
            OptimisationResult::Optimal(solution) => (
                SolverStatus::Optimal,
                starts.iter().map(|&v| i64::from(solution.get_integer_value(v))).collect(),
            ),
            OptimisationResult::Satisfiable(solution) => (
                SolverStatus::Feasible,
                starts.iter().map(|&v| i64::from(solution.get_integer_value(v))).collect(),
            ),
            OptimisationResult::Unsatisfiable => (SolverStatus::Infeasible, Vec::new()),
            OptimisationResult::Unknown => (SolverStatus::Unknown, Vec::new()),
        };
        debug!(
            model = %model.name,
            intervals = n,
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solver finished"
        );
        if values.is_empty() {
            return CpSolution::without_solution(status);
        }

        let values = left_justify(model, &values);
        let intervals: Vec<IntervalSolution> = model
            .intervals
            .iter()
            .zip(&values)
            .map(|(iv, &start)| IntervalSolution {
                name: iv.name.clone(),
                start,
                end: start + iv.duration,
            })
            .collect();
        let makespan = intervals.iter().map(|iv| iv.end).max().unwrap_or(0);
        CpSolution {
            status,
            intervals,
            makespan,
        }
    }
}

/// Keeps the order the solver chose on every resource and pulls each
/// interval back to its earliest feasible start.
fn left_justify(model: &CpModel, starts: &[i64]) -> Vec<i64> {
    let n = starts.len();
    let duration = |i: usize| model.intervals[i].duration;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (starts[i], starts[i] + duration(i), i));

    let mut groups_of: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (g, group) in model.no_overlaps.iter().enumerate() {
        for &i in group {
            groups_of[i].push(g);
        }
    }
    let mut group_free: Vec<Option<i64>> = vec![None; model.no_overlaps.len()];
    let mut placed = starts.to_vec();

    for i in order {
        let mut earliest = model.intervals[i].start_min;
        for p in model.precedences.iter().filter(|p| p.after == i) {
            earliest = earliest.max(placed[p.before] + duration(p.before) + p.min_delay);
        }
        for &g in &groups_of[i] {
            if let Some(free) = group_free[g] {
                earliest = earliest.max(free);
            }
        }
        placed[i] = earliest.min(starts[i]);
        for &g in &groups_of[i] {
            group_free[g] = Some(placed[i] + duration(i));
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::IntervalVar;
    use std::time::Duration;

    fn model_with(durations: &[i64]) -> CpModel {
        let horizon = durations.iter().sum::<i64>() + 100;
        let mut model = CpModel::new("test", horizon);
        for (i, &d) in durations.iter().enumerate() {
            model.add_interval(IntervalVar::within_horizon(format!("t{i}"), d, horizon));
        }
        model
    }

    fn starts(solution: &CpSolution) -> Vec<i64> {
        solution.intervals.iter().map(|iv| iv.start).collect()
    }

    #[test]
    fn chain_runs_back_to_back() {
        let mut model = model_with(&[8, 16, 8]);
        model.add_precedence(0, 1, 0);
        model.add_precedence(1, 2, 0);
        let solution = PumpkinSolver.solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(starts(&solution), vec![0, 8, 24]);
        assert_eq!(solution.makespan, 32);
    }

    #[test]
    fn shared_resource_serializes_and_free_tasks_start_at_zero() {
        let mut model = model_with(&[8, 8, 5]);
        model.add_no_overlap(vec![0, 1]);
        let solution = PumpkinSolver.solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.makespan, 16);
        assert_eq!(solution.intervals[2].start, 0);
        assert!(model.is_feasible(&starts(&solution)));
    }

    #[test]
    fn job_shop_instance_is_solved_to_optimality() {
        // Three jobs of two operations on two machines.
        let mut model = model_with(&[3, 2, 2, 4, 4, 1]);
        model.add_precedence(0, 1, 0);
        model.add_precedence(2, 3, 0);
        model.add_precedence(4, 5, 0);
        model.add_no_overlap(vec![0, 3, 4]);
        model.add_no_overlap(vec![1, 2, 5]);
        let solution = PumpkinSolver.solve(&model, &SolverConfig::default().with_time_limit(Duration::from_secs(5)));
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert!(model.is_feasible(&starts(&solution)));
        // Machine 0 carries 11 units of work.
        assert_eq!(solution.makespan, 11);
    }

    #[test]
    fn cyclic_precedence_is_infeasible() {
        let mut model = model_with(&[1, 1]);
        model.add_precedence(0, 1, 0);
        model.add_precedence(1, 0, 0);
        let solution = PumpkinSolver.solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Infeasible);
        assert!(!solution.is_solution_found());
    }

    #[test]
    fn tight_horizon_without_room_is_infeasible() {
        let mut model = CpModel::new("tight", 10);
        let a = model.add_interval(IntervalVar::within_horizon("a", 6, 10));
        let b = model.add_interval(IntervalVar::within_horizon("b", 6, 10));
        model.add_no_overlap(vec![a, b]);
        let solution = PumpkinSolver.solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Infeasible);
    }

    #[test]
    fn left_justify_closes_gaps_without_reordering() {
        let mut model = model_with(&[4, 3, 2]);
        model.add_precedence(0, 2, 0);
        model.add_no_overlap(vec![0, 1]);
        let justified = left_justify(&model, &[7, 2, 20]);
        assert_eq!(justified, vec![3, 0, 7]);
        assert!(model.is_feasible(&justified));
    }
}
