//! Task execution logs.

use super::job::{self, Job};
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// Prefix of Go's zero `time.Time`, which the backend emits for unset timestamps.
const ZERO_TIME_PREFIX: &str = "0001-01-01";

/// One execution of a task. Wire keys are PascalCase.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskLog {
    #[serde(rename = "ID", alias = "id")]
    pub id: u64,
    #[serde(rename = "TaskId", alias = "task_id", default)]
    pub task_id: String,
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    #[serde(
        rename = "Content",
        alias = "content",
        default,
        deserialize_with = "job::from_json_string"
    )]
    pub content: Job,
    #[serde(rename = "Output", alias = "output", default)]
    pub output: String,
    #[serde(rename = "ErrOutput", alias = "err_output", default)]
    pub err_output: String,
    #[serde(rename = "StartTime", alias = "start_time", default)]
    pub start_time: String,
    #[serde(rename = "EndTime", alias = "end_time", default)]
    pub end_time: String,
}

impl TaskLog {
    #[must_use]
    pub fn status(&self) -> LogStatus {
        LogStatus::derive(&self.err_output, &self.end_time)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.start_time)
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.end_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Running,
    Success,
    Error,
}

impl LogStatus {
    /// Any error output means failure. Otherwise a real end time means success.
    #[must_use]
    pub fn derive(err_output: &str, end_time: &str) -> Self {
        if !err_output.is_empty() {
            Self::Error
        } else if !is_unset_time(end_time) {
            Self::Success
        } else {
            Self::Running
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Success => "Success",
            Self::Error => "Failed",
        }
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// True for empty strings and the zero-time sentinel.
#[must_use]
pub fn is_unset_time(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with(ZERO_TIME_PREFIX)
}

#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if is_unset_time(value) {
        return None;
    }
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

/// Human-readable local time, `-` when unset, raw text when unparseable.
#[must_use]
pub fn format_timestamp(value: &str) -> String {
    if is_unset_time(value) {
        return "-".to_string();
    }
    match parse_timestamp(value) {
        Some(ts) => ts
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => value.to_string(),
    }
}

/// One page of execution logs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LogPage {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub list: Vec<TaskLog>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub total: u64,
}

impl LogPage {
    #[must_use]
    pub fn total_pages(&self, page_size: u32) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(page_size))
    }
}

/// Query parameters for `GET /tasks/logs`. Pages start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl LogQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(user) = &self.user_name {
            pairs.push(("user_name", user.clone()));
        }
        pairs
    }
}
