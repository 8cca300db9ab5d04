//! Job payloads carried by tasks and execution logs.
//!
//! The backend ships these as JSON serialized into a string field. They are
//! parsed once at deserialization time into [`Job`].

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A shell command job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShellJob {
    pub command: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub use_shell: Option<bool>,
    /// Keys this client does not model, kept for the details view.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Shell(ShellJob),
    /// Anything that is not a recognizable job shape. Holds the raw text.
    Opaque(String),
}

impl Job {
    /// Parse a serialized job string. Never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(value, raw),
            Err(_) => Self::Opaque(raw.to_string()),
        }
    }

    fn from_value(value: Value, raw: &str) -> Self {
        let is_shell = value
            .get("command")
            .is_some_and(|command| command.is_string());
        if is_shell && let Ok(job) = serde_json::from_value::<ShellJob>(value) {
            return Self::Shell(job);
        }
        Self::Opaque(raw.to_string())
    }

    /// One-line summary: `command arg1 arg2` for shell jobs, raw text otherwise.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Shell(job) => {
                if job.args.is_empty() {
                    job.command.trim().to_string()
                } else {
                    format!("{} {}", job.command, job.args.join(" "))
                        .trim()
                        .to_string()
                }
            }
            Self::Opaque(raw) => raw.clone(),
        }
    }

    /// Key/value rows for a details view.
    ///
    /// Returns None when the payload is not a JSON object; show the raw text then.
    #[must_use]
    pub fn fields(&self) -> Option<Vec<(String, String)>> {
        match self {
            Self::Shell(job) => {
                let mut rows = vec![("command".to_string(), job.command.clone())];
                if !job.args.is_empty() {
                    rows.push(("args".to_string(), job.args.join(" ")));
                }
                if let Some(timeout) = job.timeout {
                    rows.push(("timeout".to_string(), timeout.to_string()));
                }
                if let Some(use_shell) = job.use_shell {
                    rows.push(("use_shell".to_string(), yes_no(use_shell).to_string()));
                }
                rows.extend(job.extra.iter().map(|(k, v)| (k.clone(), render_value(v))));
                Some(rows)
            }
            Self::Opaque(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Some(
                    map.iter()
                        .map(|(k, v)| (k.clone(), render_value(v)))
                        .collect(),
                ),
                _ => None,
            },
        }
    }

    #[must_use]
    pub fn is_shell(&self) -> bool {
        matches!(self, Self::Shell(_))
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::Opaque(String::new())
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => yes_no(*b).to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Deserialize a job from its string-encoded wire form.
///
/// Also accepts an inline object or `null`, in case the backend stops
/// double-encoding the field.
pub(crate) fn from_json_string<'de, D>(deserializer: D) -> Result<Job, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(raw) => Job::parse(&raw),
        Value::Null => Job::default(),
        other => {
            let raw = other.to_string();
            Job::from_value(other, &raw)
        }
    })
}
