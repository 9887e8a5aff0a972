use crate::calendar::ProjectCalendars;
use crate::graph::DependencyGraph;
use crate::leave::{LEAVE_SEARCH_DAYS, LeaveAvailability};
use crate::schedule::{ScheduledTask, sort_by_start};
use crate::task::Task;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info};

/// Ratios and bounds used by the leave repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftSettings {
    /// Share of a project's low-complexity hours held back as buffer.
    pub buffer_ratio: f64,
    /// Largest share of a task that compression may cut from its end.
    pub compression_ratio: f64,
    pub leave_search_days: i64,
}

impl Default for ShiftSettings {
    fn default() -> Self {
        Self {
            buffer_ratio: 0.2,
            compression_ratio: 0.2,
            leave_search_days: LEAVE_SEARCH_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Compressed,
    Shifted,
    Cascaded,
}

/// One change the pass made to a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub task_id: String,
    pub kind: AdjustmentKind,
    pub before_start: NaiveDateTime,
    pub before_end: NaiveDateTime,
    pub after_start: NaiveDateTime,
    pub after_end: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftOutcome {
    pub schedule: Vec<ScheduledTask>,
    pub adjustments: Vec<Adjustment>,
    /// Buffer hours spent on compression, per project.
    pub buffer_used: BTreeMap<String, u32>,
}

impl ShiftOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// `floor(ratio * hours of the project's low-complexity tasks)`.
pub fn project_buffer_hours(tasks: &[Task], project_id: &str, ratio: f64) -> u32 {
    let low_hours: u32 = tasks
        .iter()
        .filter(|t| t.project_id == project_id && t.is_low_complexity())
        .map(|t| t.duration_hours)
        .sum();
    (f64::from(low_hours) * ratio).floor() as u32
}

/// Repairs a solved schedule against resource leave.
///
/// Tasks are visited in start order. A task overlapping its resource's
/// leave is absorbed into its project's buffer when the buffer covers one
/// hour per conflicting day (tasks outside any known project have no
/// buffer); otherwise it moves to the next leave-free
/// working day after its end and every dependent that would now start too
/// early is pushed behind it.
pub struct ShiftOptimizer<'a> {
    tasks: &'a [Task],
    dag: &'a DependencyGraph,
    leaves: &'a LeaveAvailability,
    calendars: &'a ProjectCalendars,
    settings: ShiftSettings,
}

impl<'a> ShiftOptimizer<'a> {
    pub fn new(
        tasks: &'a [Task],
        dag: &'a DependencyGraph,
        leaves: &'a LeaveAvailability,
        calendars: &'a ProjectCalendars,
    ) -> Self {
        Self {
            tasks,
            dag,
            leaves,
            calendars,
            settings: ShiftSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ShiftSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn optimize(&self, schedule: Vec<ScheduledTask>) -> ShiftOutcome {
        let mut schedule = schedule;
        sort_by_start(&mut schedule);
        let tasks: HashMap<&str, &Task> = self.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut buffers: HashMap<String, u32> = HashMap::new();
        let mut outcome = ShiftOutcome::default();

        let visit_order: Vec<String> = schedule.iter().map(|s| s.task_id.clone()).collect();
        for task_id in visit_order {
            let Some(idx) = position(&schedule, &task_id) else {
                continue;
            };
            let entry = &schedule[idx];
            let conflicts = leave_conflicts(entry, self.leaves);
            if conflicts.is_empty() {
                continue;
            }
            info!(
                task_id = %entry.task_id,
                resource_id = %entry.resource_id,
                conflict_days = conflicts.len(),
                "leave conflict"
            );

            let project_id = entry.project_id.clone();
            let needed = conflicts.len() as u32;
            let available = *buffers.entry(project_id.clone()).or_insert_with(|| {
                if self.calendars.contains(&project_id) {
                    project_buffer_hours(self.tasks, &project_id, self.settings.buffer_ratio)
                } else {
                    0
                }
            });

            if available >= needed {
                let absorbed = self.compress(&mut schedule, &tasks, &project_id, needed, &mut outcome.adjustments);
                buffers.insert(project_id.clone(), available.saturating_sub(absorbed));
                *outcome.buffer_used.entry(project_id).or_insert(0) += absorbed;
            } else {
                self.shift(&mut schedule, idx, &mut outcome.adjustments);
            }
        }

        sort_by_start(&mut schedule);
        outcome.schedule = schedule;
        outcome
    }

    /// Pulls in the ends of the project's low-complexity tasks, earliest
    /// first, until `needed` hours are saved. Returns the hours absorbed.
    fn compress(
        &self,
        schedule: &mut [ScheduledTask],
        tasks: &HashMap<&str, &Task>,
        project_id: &str,
        needed: u32,
        adjustments: &mut Vec<Adjustment>,
    ) -> u32 {
        let mut candidates: Vec<usize> = schedule
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.project_id == project_id
                    && tasks.get(s.task_id.as_str()).is_some_and(|t| t.is_low_complexity())
            })
            .map(|(i, _)| i)
            .collect();
        candidates.sort_by(|&a, &b| {
            schedule[a]
                .start
                .cmp(&schedule[b].start)
                .then_with(|| schedule[a].task_id.cmp(&schedule[b].task_id))
        });

        let target = i64::from(needed) * 60;
        let mut saved = 0i64;
        for i in candidates {
            if saved >= target {
                break;
            }
            let entry = &mut schedule[i];
            let worked = tasks
                .get(entry.task_id.as_str())
                .map(|t| i64::from(t.duration_hours) * 60)
                .unwrap_or(0);
            let span = entry.span().num_minutes().min(worked);
            let cut = ((span as f64) * self.settings.compression_ratio).floor() as i64;
            let cut = cut.min(target - saved);
            if cut <= 0 {
                continue;
            }
            let before_end = entry.end;
            entry.end -= Duration::minutes(cut);
            saved += cut;
            debug!(task_id = %entry.task_id, minutes = cut, "compressed task end");
            adjustments.push(Adjustment {
                task_id: entry.task_id.clone(),
                kind: AdjustmentKind::Compressed,
                before_start: entry.start,
                before_end,
                after_start: entry.start,
                after_end: entry.end,
            });
        }
        info!(project_id, hours = needed, saved_minutes = saved, "absorbed leave into buffer");
        ((saved + 59) / 60) as u32
    }

    fn shift(&self, schedule: &mut [ScheduledTask], idx: usize, adjustments: &mut Vec<Adjustment>) {
        let entry = &schedule[idx];
        let policy = self.calendars.policy_for(&entry.project_id);
        let next_day = self.leaves.next_available_working_day(
            &entry.resource_id,
            entry.end.date(),
            policy,
            self.settings.leave_search_days,
        );
        let new_start = next_day.and_time(entry.start.time());
        let task_id = entry.task_id.clone();
        move_entry(schedule, idx, new_start, AdjustmentKind::Shifted, adjustments);
        info!(task_id = %task_id, start = %new_start, "shifted task past leave");
        self.cascade(schedule, &task_id, adjustments);
    }

    /// Pushes dependents behind `task_id` until no dependent starts before
    /// its dependency ends.
    fn cascade(&self, schedule: &mut [ScheduledTask], task_id: &str, adjustments: &mut Vec<Adjustment>) {
        let mut queue = VecDeque::from([task_id.to_string()]);
        while let Some(current) = queue.pop_front() {
            let Some(end) = position(schedule, &current).map(|i| schedule[i].end) else {
                continue;
            };
            for dependent in self.dag.dependents_of(&current) {
                let Some(j) = position(schedule, dependent) else {
                    continue;
                };
                if schedule[j].start < end {
                    move_entry(schedule, j, end, AdjustmentKind::Cascaded, adjustments);
                    debug!(task_id = dependent, start = %end, "cascaded dependent");
                    queue.push_back(dependent.to_string());
                }
            }
        }
    }
}

fn position(schedule: &[ScheduledTask], task_id: &str) -> Option<usize> {
    schedule.iter().position(|s| s.task_id == task_id)
}

fn move_entry(
    schedule: &mut [ScheduledTask],
    idx: usize,
    start: NaiveDateTime,
    kind: AdjustmentKind,
    adjustments: &mut Vec<Adjustment>,
) {
    let entry = &mut schedule[idx];
    let (before_start, before_end) = (entry.start, entry.end);
    entry.move_to(start);
    adjustments.push(Adjustment {
        task_id: entry.task_id.clone(),
        kind,
        before_start,
        before_end,
        after_start: entry.start,
        after_end: entry.end,
    });
}

/// Leave days of the task's resource inside its calendar-day span.
pub fn leave_conflicts(entry: &ScheduledTask, leaves: &LeaveAvailability) -> Vec<NaiveDate> {
    if entry.is_unassigned() {
        return Vec::new();
    }
    leaves.conflict_days(&entry.resource_id, entry.start.date(), entry.end.date())
}
