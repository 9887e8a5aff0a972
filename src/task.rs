use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task complexity; only `Low` tasks contribute to a project's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Complexity::Low),
            "medium" | "" => Ok(Complexity::Medium),
            "high" => Ok(Complexity::High),
            other => Err(format!("unknown complexity '{other}'")),
        }
    }
}

/// Observational health flag. Never read by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    #[default]
    OnTrack,
    AtRisk,
    Blocked,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::OnTrack => "on_track",
            Health::AtRisk => "at_risk",
            Health::Blocked => "blocked",
        }
    }
}

impl FromStr for Health {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_track" | "" => Ok(Health::OnTrack),
            "at_risk" => Ok(Health::AtRisk),
            "blocked" => Ok(Health::Blocked),
            other => Err(format!("unknown health '{other}'")),
        }
    }
}

pub const PRIORITY_HIGH: i32 = 1;
pub const PRIORITY_MEDIUM: i32 = 2;
pub const PRIORITY_LOW: i32 = 3;

fn default_priority() -> i32 {
    PRIORITY_HIGH
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Estimated effort in whole working hours.
    pub duration_hours: u32,
    /// Ids of tasks that must finish before this one starts.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Lower value = higher priority.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_skillset: Option<String>,
    #[serde(default)]
    pub health: Health,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration_hours: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_hours,
            dependencies: Vec::new(),
            assigned_to: None,
            priority: PRIORITY_HIGH,
            project_id: String::new(),
            complexity: Complexity::default(),
            required_skillset: None,
            health: Health::default(),
            status_note: None,
        }
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn assigned(mut self, resource_id: impl Into<String>) -> Self {
        self.assigned_to = Some(resource_id.into());
        self
    }

    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_low_complexity(&self) -> bool {
        self.complexity == Complexity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let task = Task::new("T2", "Build API", 16)
            .depends_on(["T1"])
            .assigned("R1")
            .in_project("P1")
            .with_complexity(Complexity::Low)
            .with_priority(PRIORITY_LOW);
        assert_eq!(task.dependencies, vec!["T1".to_string()]);
        assert_eq!(task.assigned_to.as_deref(), Some("R1"));
        assert_eq!(task.project_id, "P1");
        assert!(task.is_low_complexity());
        assert_eq!(task.priority, 3);
    }

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{"id":"T1","name":"Kickoff","duration_hours":4}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, PRIORITY_HIGH);
        assert_eq!(task.complexity, Complexity::Medium);
        assert_eq!(task.health, Health::OnTrack);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn complexity_parses_case_insensitively() {
        assert_eq!("LOW".parse::<Complexity>().unwrap(), Complexity::Low);
        assert!("extreme".parse::<Complexity>().is_err());
    }
}
