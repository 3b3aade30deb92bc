use crate::{Action, CommentId, PostId};

/// One line of a replayable session trace
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStep {
    /// Start viewing a post
    Observe(PostId),

    /// Load a comment into the edit form
    Select(CommentId),

    /// Submit the edit form with this content
    Submit(String),

    /// Delete a comment from the list
    Delete(CommentId),

    /// Another client acting directly on the server
    Remote(Action),
}
