pub mod deadline;
pub mod shift_pass;

pub use deadline::{DeadlineSettings, Suggestion, critical_path_tasks, suggest_compression, tasks_at_risk};
pub use shift_pass::{Adjustment, AdjustmentKind, ShiftOptimizer, ShiftOutcome, ShiftSettings};
