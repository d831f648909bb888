// src/crypto/envelope.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FunsizeError, Result};

/// Envelope format version understood by the worker.
pub const ENVELOPE_VERSION: &str = "1";

/// Plaintext of an encrypted environment variable.
///
/// Field order is fixed by declaration order, so serialization is stable.
/// Times are epoch milliseconds; the worker refuses the secret outside
/// `[start_time, end_time]` or when `task_id` is not its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub message_version: String,
    pub task_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub name: String,
    pub value: String,
}

impl Envelope {
    pub fn new(
        task_id: &str,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        name: &str,
        value: &str,
    ) -> Self {
        Self {
            message_version: ENVELOPE_VERSION.to_string(),
            task_id: task_id.to_string(),
            start_time: valid_from.timestamp_millis(),
            end_time: valid_until.timestamp_millis(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn to_canonical_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FunsizeError::EncryptionFailure(format!("envelope serialization: {e}")))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| FunsizeError::EncryptionFailure(format!("envelope decoding: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_form_has_stable_field_order() {
        let from = Utc.with_ymd_and_hms(2015, 5, 1, 12, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2015, 5, 2, 12, 0, 0).unwrap();
        let json = Envelope::new("abc", from, until, "BALROG_USERNAME", "ffxbld")
            .to_canonical_json()
            .unwrap();
        assert_eq!(
            json,
            format!(
                r#"{{"messageVersion":"1","taskId":"abc","startTime":{},"endTime":{},"name":"BALROG_USERNAME","value":"ffxbld"}}"#,
                from.timestamp_millis(),
                until.timestamp_millis()
            )
        );
    }
}
