use anyhow::{anyhow, Context};
use serde_json::json;

use crate::{CommentId, CorrelationId, Uuid};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0:?}")]
    NotFound(CommentId),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Comment is empty")]
    EmptyComment,

    #[error("Another comment is already being added {0:?}")]
    AddInFlight(CorrelationId),

    #[error("Mutation rejected by server: {0}")]
    MutationRejected(String),

    #[error("Subscription transport error: {0}")]
    SubscriptionTransport(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::EmptyComment => StatusCode::BAD_REQUEST,
            Error::AddInFlight(_) => StatusCode::CONFLICT,
            Error::MutationRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::SubscriptionTransport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NotFound(id) => json!({
                "message": "comment not found",
                "type": "not-found",
                "id": id.0,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::EmptyComment => json!({
                "message": "comment content is empty",
                "type": "empty-comment",
            }),
            Error::AddInFlight(c) => json!({
                "message": "another comment is already being added",
                "type": "add-in-flight",
                "correlation": c.0,
            }),
            Error::MutationRejected(msg) => json!({
                "message": msg,
                "type": "mutation-rejected",
            }),
            Error::SubscriptionTransport(msg) => json!({
                "message": msg,
                "type": "subscription-transport",
            }),
        })
        .expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "permission-denied" => Error::PermissionDenied,
                "not-found" => Error::NotFound(CommentId(
                    data.get("id")
                        .and_then(|id| id.as_i64())
                        .ok_or_else(|| anyhow!("error is a not-found without a comment id"))?,
                )),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "empty-comment" => Error::EmptyComment,
                "add-in-flight" => Error::AddInFlight(CorrelationId(
                    data.get("correlation")
                        .and_then(|c| c.as_str())
                        .and_then(|c| Uuid::try_parse(c).ok())
                        .ok_or_else(|| anyhow!("error is an add-in-flight without a proper uuid"))?,
                )),
                "mutation-rejected" => Error::MutationRejected(message()),
                "subscription-transport" => Error::SubscriptionTransport(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
