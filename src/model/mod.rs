//! Backend data shapes, parsed once at the API boundary.

mod job;
mod task;
mod task_log;

pub use job::{Job, ShellJob};
pub use task::{AddedTask, DEFAULT_SCHEDULE, DEFAULT_TIMEOUT_SECS, NewShellTask, Task};
pub use task_log::{
    LogPage, LogQuery, LogStatus, TaskLog, format_timestamp, is_unset_time, parse_timestamp,
};

pub(crate) use task::{TaskList, TaskRef};

use serde::{Deserialize, Deserializer};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FileList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct FileRef<'a> {
    pub file_name: &'a str,
}

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
