use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::api::{
    Action, Comment, CommentId, CorrelationId, Error, FeedMessage, PostId, Settlement,
};

/// Server side of comment mutations
#[async_trait]
pub trait Mutator: Send + Sync {
    /// The stored comment is expected to carry `correlation` back
    async fn add_comment(
        &self,
        correlation: CorrelationId,
        content: String,
        post_id: PostId,
    ) -> Result<Comment, Error>;
    async fn edit_comment(&self, id: CommentId, content: String) -> Result<Comment, Error>;
    async fn delete_comment(&self, id: CommentId) -> Result<CommentId, Error>;
}

pub type FeedStream = Pin<Box<dyn Send + Stream<Item = Result<FeedMessage, Error>>>>;

/// Server side of comment listing and live updates
#[async_trait]
pub trait CommentFeed: Send + Sync {
    async fn fetch_comments(&self, post_id: PostId) -> Result<Vec<Comment>, Error>;

    /// The returned stream ends or yields an error when the transport fails
    async fn subscribe(&self, post_id: PostId) -> Result<FeedStream, Error>;
}

pub async fn execute<M>(mutator: &M, action: Action) -> Result<Settlement, Error>
where
    M: ?Sized + Mutator,
{
    Ok(match action {
        Action::Add {
            correlation,
            content,
            post_id,
        } => Settlement::Added(mutator.add_comment(correlation, content, post_id).await?),
        Action::Edit { id, content } => Settlement::Edited(mutator.edit_comment(id, content).await?),
        Action::Delete { id } => Settlement::Deleted(mutator.delete_comment(id).await?),
    })
}
