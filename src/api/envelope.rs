use serde::Deserialize;
use serde_json::Value;

/// The only envelope code that signals success.
pub const SUCCESS_CODE: i64 = 200;
/// Envelope code the backend uses for a rejected credential.
pub const UNAUTHORIZED_CODE: i64 = 401;

/// Response wrapper shared by every endpoint: `{code, msg, data}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub msg: String,
    /// Missing and `null` both decode as `Value::Null`.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Backend message, or a generic one when it sent none.
    #[must_use]
    pub fn error_message(&self) -> String {
        if self.msg.trim().is_empty() {
            format!("Request failed (code {})", self.code)
        } else {
            self.msg.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let env: Envelope =
            serde_json::from_str(r#"{"code":200,"msg":"ok","data":{"token":"abc"}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.data["token"], "abc");
    }

    #[test]
    fn test_missing_data_and_msg() {
        let env: Envelope = serde_json::from_str(r#"{"code":500,"msg":null}"#).unwrap();
        assert!(!env.is_success());
        assert!(env.data.is_null());
        assert_eq!(env.error_message(), "Request failed (code 500)");
    }

    #[test]
    fn test_error_message_passthrough() {
        let env: Envelope =
            serde_json::from_str(r#"{"code":401,"msg":"token expired","data":null}"#).unwrap();
        assert_eq!(env.code, UNAUTHORIZED_CODE);
        assert_eq!(env.error_message(), "token expired");
    }
}
