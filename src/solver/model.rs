use serde::Serialize;

/// A fixed-duration interval in abstract time units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalVar {
    pub name: String,
    pub start_min: i64,
    pub start_max: i64,
    pub duration: i64,
    pub end_max: i64,
}

impl IntervalVar {
    pub fn new(name: impl Into<String>, start_min: i64, start_max: i64, duration: i64, end_max: i64) -> Self {
        Self {
            name: name.into(),
            start_min,
            start_max,
            duration,
            end_max,
        }
    }

    /// An interval that may start anywhere it still fits under `horizon`.
    pub fn within_horizon(name: impl Into<String>, duration: i64, horizon: i64) -> Self {
        Self::new(name, 0, horizon - duration, duration, horizon)
    }
}

/// `start(after) >= end(before) + min_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Precedence {
    pub before: usize,
    pub after: usize,
    pub min_delay: i64,
}

/// Intervals plus precedence and no-overlap constraints, solved for the
/// smallest latest end. Intervals are referred to by the index
/// `add_interval` returned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CpModel {
    pub name: String,
    pub horizon: i64,
    pub intervals: Vec<IntervalVar>,
    pub precedences: Vec<Precedence>,
    pub no_overlaps: Vec<Vec<usize>>,
}

impl CpModel {
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            ..Default::default()
        }
    }

    pub fn add_interval(&mut self, interval: IntervalVar) -> usize {
        self.intervals.push(interval);
        self.intervals.len() - 1
    }

    pub fn add_precedence(&mut self, before: usize, after: usize, min_delay: i64) {
        self.precedences.push(Precedence {
            before,
            after,
            min_delay,
        });
    }

    /// Pairwise no-overlap over `intervals`. Groups of fewer than two are
    /// dropped.
    pub fn add_no_overlap(&mut self, intervals: Vec<usize>) {
        if intervals.len() > 1 {
            self.no_overlaps.push(intervals);
        }
    }

    pub fn interval_index(&self, name: &str) -> Option<usize> {
        self.intervals.iter().position(|iv| iv.name == name)
    }

    /// Checks a start assignment against every constraint of the model.
    pub fn is_feasible(&self, starts: &[i64]) -> bool {
        if starts.len() != self.intervals.len() {
            return false;
        }
        let within_bounds = self.intervals.iter().zip(starts).all(|(iv, &s)| {
            s >= iv.start_min && s <= iv.start_max && s + iv.duration <= iv.end_max
        });
        let ordered = self.precedences.iter().all(|p| {
            starts[p.after] >= starts[p.before] + self.intervals[p.before].duration + p.min_delay
        });
        let disjoint = self.no_overlaps.iter().all(|group| {
            group.iter().enumerate().all(|(k, &a)| {
                group[k + 1..].iter().all(|&b| {
                    let a_end = starts[a] + self.intervals[a].duration;
                    let b_end = starts[b] + self.intervals[b].duration;
                    a_end <= starts[b] || b_end <= starts[a]
                })
            })
        });
        within_bounds && ordered && disjoint
    }
}
