use crate::{Comment, CommentId, PostId, Uuid};

/// Client-generated identifier of one optimistic mutation, from its speculative
/// application until the server confirms or rejects it
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> CorrelationId {
        CorrelationId(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Action {
    Add {
        correlation: CorrelationId,
        content: String,
        post_id: PostId,
    },
    Edit { id: CommentId, content: String },
    Delete { id: CommentId },
}

impl Action {
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            Action::Add { content, .. } | Action::Edit { content, .. } => {
                crate::validate_content(content)
            }
            Action::Delete { .. } => Ok(()),
        }
    }
}

/// What the server answered to a successful `Action`
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Settlement {
    Added(Comment),
    Edited(Comment),
    Deleted(CommentId),
}
