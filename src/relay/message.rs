//! Source response schema and its interpretation.
//!
//! The source answers `{"success": bool, "data": {id, title, content} | null}`.
//! [`interpret`] turns a raw body into a [`Fetched`] value or an
//! `upstream-bad-response` error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Title sent when the source message has none.
pub const DEFAULT_TITLE: &str = "no title";

#[derive(Debug, Deserialize)]
struct SourceEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<SourceMessage>,
}

#[derive(Debug, Deserialize)]
struct SourceMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
}

impl RelayMessage {
    #[must_use]
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("N/A")
    }

    #[must_use]
    pub fn payload(&self) -> ForwardPayload<'_> {
        ForwardPayload {
            title: &self.title,
            content: &self.content,
        }
    }
}

/// JSON body posted to the destination.
#[derive(Debug, Serialize)]
pub struct ForwardPayload<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// `success` with `data: null`.
    NoMessage,
    /// A message without content; never forwarded.
    Incomplete { id: Option<String> },
    Message(RelayMessage),
}

fn id_string(id: Option<Value>) -> Option<String> {
    match id? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub fn interpret(body: &[u8]) -> Result<Fetched, RelayError> {
    let bad_response = || RelayError::UpstreamBadResponse {
        raw: String::from_utf8_lossy(body).into_owned(),
    };

    let envelope: SourceEnvelope = serde_json::from_slice(body).map_err(|_| bad_response())?;
    if !envelope.success {
        return Err(bad_response());
    }

    let Some(data) = envelope.data else {
        return Ok(Fetched::NoMessage);
    };

    let id = id_string(data.id);
    match data.content.filter(|c| !c.is_empty()) {
        Some(content) => Ok(Fetched::Message(RelayMessage {
            id,
            title: data.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content,
        })),
        None => Ok(Fetched::Incomplete { id }),
    }
}
