use crate::{CorrelationId, Error, Uuid, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn stub() -> PostId {
        PostId(STUB_UUID)
    }
}

/// Identifier assigned by the server once a comment is stored
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    /// None until the server confirmed the comment
    pub id: Option<CommentId>,
    pub content: String,
    pub post_id: PostId,

    /// Set by the server to the client-generated id of the add that created
    /// this comment, so the author can recognize its own comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationId>,
}

impl Comment {
    pub fn confirmed(id: CommentId, content: String, post_id: PostId) -> Comment {
        Comment {
            id: Some(id),
            content,
            post_id,
            correlation: None,
        }
    }

    pub fn pending(content: String, post_id: PostId) -> Comment {
        Comment {
            id: None,
            content,
            post_id,
            correlation: None,
        }
    }

    pub fn with_correlation(self, correlation: CorrelationId) -> Comment {
        Comment {
            correlation: Some(correlation),
            ..self
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.content)
    }
}

/// The comment currently loaded into the edit form
///
/// `id == None` means the form is creating a new comment.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SelectedComment {
    pub id: Option<CommentId>,
    pub content: String,
}

impl SelectedComment {
    pub fn empty() -> SelectedComment {
        SelectedComment {
            id: None,
            content: String::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

impl From<&Comment> for SelectedComment {
    fn from(c: &Comment) -> SelectedComment {
        SelectedComment {
            id: c.id,
            content: c.content.clone(),
        }
    }
}
