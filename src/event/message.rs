// src/event/message.rs

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{FunsizeError, Result};

/// A single "build finished" notification.
///
/// Built once per delivered message and never mutated. The routing key is
/// kept for diagnostics only; classification looks at the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEvent {
    pub routing_key: String,
    pub builder_name: String,
    pub result_code: i64,
    /// Build properties in delivery order. Keys may repeat.
    pub properties: Vec<(String, Value)>,
}

impl BuildEvent {
    /// Decode one bus message body.
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawBuildMessage = serde_json::from_str(body)
            .map_err(|e| FunsizeError::MalformedEvent(format!("invalid message JSON: {e}")))?;
        BuildEvent::try_from(raw)
    }
}

/// Wire shape of a bus message.
///
/// ```json
/// {
///   "routingKey": "build.mozilla-central-linux64-nightly.12.finished",
///   "payload": {
///     "results": 0,
///     "build": {
///       "builderName": "Linux x86-64 mozilla-central nightly",
///       "properties": [["branch", "mozilla-central", "BuildSlave"]]
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBuildMessage {
    #[serde(default)]
    pub routing_key: String,
    pub payload: RawPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPayload {
    pub results: i64,
    pub build: RawBuild,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBuild {
    pub builder_name: String,
    /// `[name, value, source]` triples; only the first two are used.
    #[serde(default)]
    pub properties: Vec<Vec<Value>>,
}

impl TryFrom<RawBuildMessage> for BuildEvent {
    type Error = FunsizeError;

    fn try_from(raw: RawBuildMessage) -> std::result::Result<Self, Self::Error> {
        let mut properties = Vec::with_capacity(raw.payload.build.properties.len());

        for (idx, prop) in raw.payload.build.properties.into_iter().enumerate() {
            let mut parts = prop.into_iter();
            let key = match parts.next() {
                Some(Value::String(key)) => key,
                _ => {
                    return Err(FunsizeError::MalformedEvent(format!(
                        "property #{idx} has no string name"
                    )));
                }
            };
            let value = parts.next().ok_or_else(|| {
                FunsizeError::MalformedEvent(format!("property '{key}' has no value"))
            })?;
            properties.push((key, value));
        }

        Ok(BuildEvent {
            routing_key: raw.routing_key,
            builder_name: raw.payload.build.builder_name,
            result_code: raw.payload.results,
            properties,
        })
    }
}
