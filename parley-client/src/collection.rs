use std::cmp;

use crate::api::{Comment, CommentId, CorrelationId, Error, FeedMessage, Mutation, PostId};

/// Ordered list of the comments of one post, in display order
///
/// No two entries share the same server id, and at most one entry is still
/// waiting for its server id. That entry is owned by `pending`.
///
/// All the `apply_*` functions leave `self` untouched and return the next
/// collection, which is cheap thanks to the persistent vector underneath.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentCollection {
    comments: im::Vector<Comment>,
    pending: Option<CorrelationId>,
}

impl CommentCollection {
    pub fn new() -> CommentCollection {
        CommentCollection {
            comments: im::Vector::new(),
            pending: None,
        }
    }

    /// Builds a collection out of server data, skipping anything that would break
    /// the collection invariants
    pub fn from_confirmed<I>(comments: I) -> CommentCollection
    where
        I: IntoIterator<Item = Comment>,
    {
        comments
            .into_iter()
            .fold(CommentCollection::new(), |res, c| match c.id {
                None => {
                    tracing::warn!(comment=?c, "server sent a comment without id");
                    res
                }
                Some(_) => res.apply_create(c),
            })
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Comment> {
        self.comments.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Comment> {
        self.comments.get(index)
    }

    pub fn to_vec(&self) -> Vec<Comment> {
        self.comments.iter().cloned().collect()
    }

    /// Correlation id of the optimistic add currently displayed, if any
    pub fn pending(&self) -> Option<CorrelationId> {
        self.pending
    }

    pub fn position(&self, id: CommentId) -> Option<usize> {
        self.comments.iter().position(|c| c.id == Some(id))
    }

    pub fn contains(&self, id: CommentId) -> bool {
        self.position(id).is_some()
    }

    pub fn find(&self, id: CommentId) -> Option<&Comment> {
        self.position(id).and_then(|idx| self.comments.get(idx))
    }

    /// Whether the comment created by the add `correlation` is displayed as
    /// confirmed
    pub fn has_correlated(&self, correlation: CorrelationId) -> bool {
        self.comments
            .iter()
            .any(|c| c.id.is_some() && c.correlation == Some(correlation))
    }

    fn sentinel_position(&self) -> Option<usize> {
        self.comments.iter().position(|c| c.is_pending())
    }

    /// Adds a server-confirmed comment
    ///
    /// Already-known ids are ignored. If an optimistic add is displayed, the
    /// confirmed comment takes its place instead of being appended, unless it
    /// carries the correlation id of another add.
    pub fn apply_create(&self, c: Comment) -> CommentCollection {
        let id = match c.id {
            Some(id) => id,
            None => {
                tracing::warn!(comment=?c, "ignoring creation of a comment without id");
                return self.clone();
            }
        };
        if self.contains(id) {
            tracing::trace!(?id, "suppressing duplicate comment creation");
            return self.clone();
        }
        let mut res = self.clone();
        let sentinel = match (c.correlation, self.pending) {
            (Some(theirs), Some(ours)) if theirs != ours => None,
            _ => self.sentinel_position(),
        };
        match sentinel {
            Some(idx) => {
                tracing::debug!(?id, pending=?self.pending, "confirmed comment replaces pending one");
                res.comments.set(idx, c);
                res.pending = None;
            }
            None => res.comments.push_back(c),
        }
        res
    }

    pub fn apply_delete(&self, id: CommentId) -> CommentCollection {
        let mut res = self.clone();
        match self.position(id) {
            Some(idx) => {
                res.comments.remove(idx);
            }
            None => tracing::trace!(?id, "comment to delete is not in collection"),
        }
        res
    }

    /// Replaces the content of the comment with the same id, if it is displayed
    pub fn apply_edit(&self, c: &Comment) -> CommentCollection {
        let mut res = self.clone();
        if let Some(entry) = c
            .id
            .and_then(|id| self.position(id))
            .and_then(|idx| res.comments.get_mut(idx))
        {
            entry.content = c.content.clone();
        }
        res
    }

    /// Displays a new comment before the server assigned it an id
    pub fn apply_optimistic_add(
        &self,
        content: String,
        post_id: PostId,
    ) -> Result<(CommentCollection, CorrelationId), Error> {
        let correlation = CorrelationId::new();
        Ok((self.restore_optimistic_add(correlation, content, post_id)?, correlation))
    }

    pub(crate) fn restore_optimistic_add(
        &self,
        correlation: CorrelationId,
        content: String,
        post_id: PostId,
    ) -> Result<CommentCollection, Error> {
        if let Some(pending) = self.pending {
            return Err(Error::AddInFlight(pending));
        }
        let mut res = self.clone();
        res.comments.push_back(Comment::pending(content, post_id));
        res.pending = Some(correlation);
        Ok(res)
    }

    /// Applies the server's answer to the optimistic add `correlation`
    pub fn apply_confirmed_create(
        &self,
        correlation: CorrelationId,
        c: Comment,
    ) -> CommentCollection {
        if self.pending != Some(correlation) {
            // a push already replaced the pending comment
            return self.apply_create(c);
        }
        match (c.id, self.sentinel_position()) {
            (Some(id), _) if self.contains(id) => self.discard_pending(correlation),
            (Some(_), Some(idx)) => {
                let mut res = self.clone();
                res.comments.set(idx, c);
                res.pending = None;
                res
            }
            (id, idx) => {
                tracing::warn!(?id, ?idx, ?correlation, "inconsistent confirmation of pending comment");
                self.discard_pending(correlation)
            }
        }
    }

    /// Removes the pending comment owned by `correlation`, if it is still displayed
    pub fn discard_pending(&self, correlation: CorrelationId) -> CommentCollection {
        if self.pending != Some(correlation) {
            return self.clone();
        }
        let mut res = self.clone();
        if let Some(idx) = self.sentinel_position() {
            res.comments.remove(idx);
        }
        res.pending = None;
        res
    }

    /// Returns the edited collection along with the content that was replaced
    pub fn apply_optimistic_edit(
        &self,
        id: CommentId,
        content: String,
    ) -> Option<(CommentCollection, String)> {
        let idx = self.position(id)?;
        let mut res = self.clone();
        let entry = res.comments.get_mut(idx)?;
        let previous = std::mem::replace(&mut entry.content, content);
        Some((res, previous))
    }

    /// Returns the collection without `id`, along with where it was and what it was
    pub fn apply_optimistic_delete(
        &self,
        id: CommentId,
    ) -> Option<(CommentCollection, usize, Comment)> {
        let idx = self.position(id)?;
        let mut res = self.clone();
        let removed = res.comments.remove(idx);
        Some((res, idx, removed))
    }

    /// Puts a deleted comment back as close as possible to where it was
    pub(crate) fn restore_at(&self, index: usize, c: Comment) -> CommentCollection {
        match c.id {
            Some(id) if !self.contains(id) => {
                let mut res = self.clone();
                res.comments.insert(cmp::min(index, self.len()), c);
                res
            }
            _ => self.clone(),
        }
    }

    pub fn on_subscription_event(&self, msg: &FeedMessage) -> CommentCollection {
        let node = || {
            msg.node.clone().map(|mut n| {
                n.id.get_or_insert(msg.id);
                n
            })
        };
        match &msg.mutation {
            Mutation::Created => match node() {
                Some(n) => self.apply_create(n),
                None => {
                    tracing::warn!(?msg, "creation event without node");
                    self.clone()
                }
            },
            Mutation::Updated => match node() {
                Some(n) => self.apply_edit(&n),
                None => {
                    tracing::warn!(?msg, "update event without node");
                    self.clone()
                }
            },
            Mutation::Deleted => self.apply_delete(msg.id),
            Mutation::Other(kind) => {
                tracing::debug!(?kind, "ignoring subscription event of unknown kind");
                self.clone()
            }
        }
    }
}
