//! Decoding of parameter server responses.

use crate::error::{ParamError, ParamResult};
use crate::state::VersionedState;
use serde_json::{Map, Value};

/// Status assumed when a response carries none.
pub const MISSING_STATUS: &str = "error/server/missingStatus";

/// What a response status means for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// `success/noSuchFile`: the file does not exist.
    NoSuchFile,
    /// `success/unchanged`: the expected version is still current.
    Unchanged,
    /// Any other `success*`: the response carries a new state.
    Updated,
    /// `error/client/limit*`: the server asked us to back off.
    RateLimited,
    /// Anything else.
    Failed,
}

impl ResponseStatus {
    /// Classifies a status string by prefix.
    pub fn classify(status: &str) -> Self {
        if status.starts_with("success") {
            if status.starts_with("success/noSuchFile") {
                ResponseStatus::NoSuchFile
            } else if status.starts_with("success/unchanged") {
                ResponseStatus::Unchanged
            } else {
                ResponseStatus::Updated
            }
        } else if status.starts_with("error/client/limit") {
            ResponseStatus::RateLimited
        } else {
            ResponseStatus::Failed
        }
    }

    /// Returns true for the three success variants.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ResponseStatus::NoSuchFile | ResponseStatus::Unchanged | ResponseStatus::Updated
        )
    }
}

/// A decoded `getFile` response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Raw status string.
    pub status: String,
    /// Server-side delay estimate in milliseconds.
    pub staleness_slop: u64,
    /// Human-readable message, usually present on errors.
    pub message: Option<String>,
    fields: Map<String, Value>,
}

impl FetchResponse {
    /// Parses raw response text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a JSON object or `stalenessSlop` is not an integer.
    pub fn parse(raw: &str) -> ParamResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(fields) = value else {
            return Err(ParamError::Protocol("response is not a JSON object".into()));
        };

        let status = match fields.get("status") {
            None | Some(Value::Null) => MISSING_STATUS.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        let staleness_slop = match fields.get("stalenessSlop") {
            None | Some(Value::Null) => 0,
            Some(v) => u64::try_from(json_to_i64(v, "stalenessSlop")?.max(0)).unwrap_or(0),
        };

        let message = match fields.get("message") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            status,
            staleness_slop,
            message,
            fields,
        })
    }

    /// Classifies the status.
    pub fn classify(&self) -> ResponseStatus {
        ResponseStatus::classify(&self.status)
    }

    /// Builds the state carried by a content-bearing success response.
    ///
    /// # Errors
    ///
    /// Fails if `version`, `content`, `createDate` or `modDate` is missing or
    /// malformed, or if the version is the missing-file sentinel.
    pub fn to_state(&self) -> ParamResult<VersionedState> {
        let version = self.require_i64("version")?;
        let version = u64::try_from(version)
            .map_err(|_| ParamError::Protocol(format!("negative version {version}")))?;
        let content = match self.fields.get("content") {
            Some(Value::String(s)) => s.as_str(),
            _ => return Err(ParamError::Protocol("missing field content".into())),
        };
        let create_date = self.require_i64("createDate")?;
        let mod_date = self.require_i64("modDate")?;

        VersionedState::present(version, content, create_date, mod_date)
    }

    fn require_i64(&self, name: &str) -> ParamResult<i64> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Err(ParamError::Protocol(format!("missing field {name}"))),
            Some(v) => json_to_i64(v, name),
        }
    }
}

/// Reads an integer from a JSON number or numeric string.
fn json_to_i64(value: &Value, name: &str) -> ParamResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParamError::Protocol(format!("field {name} is not an integer: {value}")))
}
