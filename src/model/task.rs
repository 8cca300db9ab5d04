use super::job::{self, Job};
use serde::{Deserialize, Serialize};

/// Cron expression new tasks start with: every minute, at second zero.
pub const DEFAULT_SCHEDULE: &str = "0 * * * * *";
/// Default command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// A scheduled task as reported by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    /// Cron expression, evaluated server-side.
    #[serde(default)]
    pub scheduled_time: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default, deserialize_with = "job::from_json_string")]
    pub job: Job,
    #[serde(default)]
    pub owner_name: String,
}

/// Request body for `POST /tasks/add_shell_task`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewShellTask {
    pub task_name: String,
    pub description: String,
    pub command: String,
    pub args: Vec<String>,
    pub scheduled_time: String,
    pub timeout: u64,
    pub use_shell: bool,
}

impl Default for NewShellTask {
    fn default() -> Self {
        Self {
            task_name: String::new(),
            description: String::new(),
            command: String::new(),
            args: Vec::new(),
            scheduled_time: DEFAULT_SCHEDULE.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            use_shell: true,
        }
    }
}

impl NewShellTask {
    /// Split a free-form argument line on whitespace.
    #[must_use]
    pub fn split_args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    /// Check required fields locally so obviously bad input never hits the wire.
    pub fn validate(&self) -> Result<(), crate::api::Error> {
        let missing: Vec<&str> = [
            ("task_name", &self.task_name),
            ("command", &self.command),
            ("scheduled_time", &self.scheduled_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::api::Error::Validation(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskList {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddedTask {
    pub task_id: String,
}

/// Body for task-scoped calls (`run`, `delete`).
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TaskRef<'a> {
    pub task_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<&'a str>,
}
