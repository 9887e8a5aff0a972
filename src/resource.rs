use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name reported for scheduled tasks without an assignee.
pub const UNASSIGNED: &str = "Unassigned";

/// A person who can execute tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique identifier referenced by `Task::assigned_to` and `Leave::resource_id`.
    pub id: String,
    pub name: String,
    pub role: String,
    /// Contact address, informational only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            email: String::new(),
        }
    }
}

fn default_reason() -> String {
    "reduced_capacity".to_string()
}

/// Overrides the standard daily capacity on a single date, e.g. a demo day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedCapacity {
    pub id: String,
    pub date: NaiveDate,
    /// When set, only this resource is affected; otherwise every resource is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Working hours available on `date`. Expected to be within the standard day.
    pub available_hours: u32,
    #[serde(default = "default_reason")]
    pub reason: String,
}

impl ReducedCapacity {
    pub fn new(id: impl Into<String>, date: NaiveDate, available_hours: u32) -> Self {
        Self {
            id: id.into(),
            date,
            resource_id: None,
            available_hours,
            reason: default_reason(),
        }
    }

    pub fn for_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Whether this override applies to `resource_id` on `date`.
    pub fn matches(&self, date: NaiveDate, resource_id: Option<&str>) -> bool {
        if self.date != date {
            return false;
        }
        match self.resource_id.as_deref() {
            None => true,
            Some(id) => Some(id) == resource_id,
        }
    }
}
