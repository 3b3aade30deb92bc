use chrono::Utc;

use crate::{
    api::{Action, Comment, CommentId, CorrelationId, PostId, Time},
    CommentCollection,
};

/// A change displayed before the server confirmed it, along with what is
/// needed to undo it
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingMutation {
    pub correlation: CorrelationId,
    pub post_id: PostId,
    pub submitted_at: Time,
    pub kind: PendingKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PendingKind {
    Add {
        content: String,
    },
    Edit {
        id: CommentId,
        content: String,
        previous: String,
    },
    Delete {
        index: usize,
        removed: Comment,
        /// The server is known to no longer hold `removed`
        confirmed: bool,
    },
}

impl PendingMutation {
    pub fn new(correlation: CorrelationId, post_id: PostId, kind: PendingKind) -> PendingMutation {
        PendingMutation {
            correlation,
            post_id,
            submitted_at: Utc::now(),
            kind,
        }
    }

    /// The request to send to the server for this change
    pub fn action(&self) -> Action {
        match &self.kind {
            PendingKind::Add { content } => Action::Add {
                correlation: self.correlation,
                content: content.clone(),
                post_id: self.post_id,
            },
            PendingKind::Edit { id, content, .. } => Action::Edit {
                id: *id,
                content: content.clone(),
            },
            PendingKind::Delete { removed, .. } => Action::Delete {
                id: removed
                    .id
                    .expect("pending deletion of a comment that has no id"),
            },
        }
    }

    /// Records that the server removed comment `id`, which makes a pending
    /// deletion of it impossible to roll back
    pub fn confirm_deleted(&mut self, id: CommentId) {
        if let PendingKind::Delete {
            removed, confirmed, ..
        } = &mut self.kind
        {
            if removed.id == Some(id) {
                *confirmed = true;
            }
        }
    }

    /// Undoes this change on `collection`
    ///
    /// Only the part of the change that is still visible gets undone: if a push
    /// already replaced the pending comment or removed the edited one, there is
    /// nothing left to revert. Likewise a deleted comment the server no longer
    /// holds stays deleted.
    pub fn rollback(&self, collection: &CommentCollection) -> CommentCollection {
        match &self.kind {
            PendingKind::Add { .. } => collection.discard_pending(self.correlation),
            PendingKind::Edit {
                id,
                content,
                previous,
            } => match collection.find(*id) {
                Some(c) if c.content == *content => collection.apply_edit(&Comment {
                    content: previous.clone(),
                    ..c.clone()
                }),
                _ => collection.clone(),
            },
            PendingKind::Delete { confirmed: true, .. } => collection.clone(),
            PendingKind::Delete { index, removed, .. } => {
                collection.restore_at(*index, removed.clone())
            }
        }
    }

    /// Applies this change again on top of freshly loaded server data, updating
    /// the rollback information to match it
    pub fn reapply(&mut self, collection: &CommentCollection) -> CommentCollection {
        match &mut self.kind {
            PendingKind::Add { .. } if collection.has_correlated(self.correlation) => {
                tracing::debug!(correlation=?self.correlation, "pending comment already stored by the server");
                collection.clone()
            }
            PendingKind::Add { content } => {
                match collection.restore_optimistic_add(
                    self.correlation,
                    content.clone(),
                    self.post_id,
                ) {
                    Ok(res) => res,
                    Err(err) => {
                        tracing::warn!(?err, correlation=?self.correlation, "could not redisplay pending comment");
                        collection.clone()
                    }
                }
            }
            PendingKind::Edit {
                id,
                content,
                previous,
            } => match collection.apply_optimistic_edit(*id, content.clone()) {
                Some((res, prev)) => {
                    *previous = prev;
                    res
                }
                None => collection.clone(),
            },
            PendingKind::Delete {
                index,
                removed,
                confirmed,
            } => {
                let id = removed.id.expect("pending deletion of a comment that has no id");
                match collection.apply_optimistic_delete(id) {
                    Some((res, idx, rem)) => {
                        *index = idx;
                        *removed = rem;
                        res
                    }
                    None => {
                        *confirmed = true;
                        collection.clone()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, content: &str) -> Comment {
        Comment::confirmed(CommentId(id), String::from(content), PostId::stub())
    }

    fn base() -> CommentCollection {
        CommentCollection::from_confirmed(vec![comment(1, "a"), comment(2, "b"), comment(3, "c")])
    }

    #[test]
    fn rollback_add() {
        let (c, corr) = base()
            .apply_optimistic_add(String::from("d"), PostId::stub())
            .unwrap();
        let p = PendingMutation::new(
            corr,
            PostId::stub(),
            PendingKind::Add {
                content: String::from("d"),
            },
        );
        assert_eq!(p.rollback(&c), base());
    }

    #[test]
    fn rollback_add_after_push_keeps_pushed_comment() {
        let (c, corr) = base()
            .apply_optimistic_add(String::from("d"), PostId::stub())
            .unwrap();
        let c = c.apply_create(comment(4, "theirs"));
        let p = PendingMutation::new(
            corr,
            PostId::stub(),
            PendingKind::Add {
                content: String::from("d"),
            },
        );
        assert_eq!(p.rollback(&c), c);
    }

    #[test]
    fn rollback_edit() {
        let (c, previous) = base()
            .apply_optimistic_edit(CommentId(2), String::from("B"))
            .unwrap();
        let p = PendingMutation::new(
            CorrelationId::new(),
            PostId::stub(),
            PendingKind::Edit {
                id: CommentId(2),
                content: String::from("B"),
                previous,
            },
        );
        assert_eq!(p.rollback(&c), base());

        // someone else edited it in the meantime: their version wins
        let c = c.apply_edit(&comment(2, "theirs"));
        assert_eq!(p.rollback(&c), c);
    }

    #[test]
    fn rollback_delete() {
        let (c, index, removed) = base().apply_optimistic_delete(CommentId(2)).unwrap();
        let p = PendingMutation::new(
            CorrelationId::new(),
            PostId::stub(),
            PendingKind::Delete {
                index,
                removed,
                confirmed: false,
            },
        );
        assert_eq!(p.action(), Action::Delete { id: CommentId(2) });
        assert_eq!(p.rollback(&c), base());
        let shorter = c.apply_delete(CommentId(3));
        assert_eq!(
            p.rollback(&shorter).to_vec(),
            vec![comment(1, "a"), comment(2, "b")]
        );
    }

    #[test]
    fn reapply_updates_rollback_information() {
        let mut p = PendingMutation::new(
            CorrelationId::new(),
            PostId::stub(),
            PendingKind::Edit {
                id: CommentId(3),
                content: String::from("C"),
                previous: String::from("stale"),
            },
        );
        let c = p.reapply(&base());
        assert_eq!(c.find(CommentId(3)).unwrap().content, "C");
        assert_eq!(p.rollback(&c), base());

        let mut p = PendingMutation::new(
            CorrelationId::new(),
            PostId::stub(),
            PendingKind::Delete {
                index: 0,
                removed: comment(3, "c"),
                confirmed: false,
            },
        );
        let c = p.reapply(&base());
        assert_eq!(c.to_vec(), vec![comment(1, "a"), comment(2, "b")]);
        assert_eq!(p.rollback(&c), base());
    }

    #[test]
    fn deletion_done_by_server_is_not_rolled_back() {
        let (c, index, removed) = base().apply_optimistic_delete(CommentId(2)).unwrap();
        let mut p = PendingMutation::new(
            CorrelationId::new(),
            PostId::stub(),
            PendingKind::Delete {
                index,
                removed,
                confirmed: false,
            },
        );
        p.confirm_deleted(CommentId(3));
        assert_eq!(p.rollback(&c), base(), "another comment's deletion confirms nothing");
        p.confirm_deleted(CommentId(2));
        assert_eq!(p.rollback(&c), c);

        // reloading from a server that no longer holds the comment
        let mut p = PendingMutation::new(
            CorrelationId::new(),
            PostId::stub(),
            PendingKind::Delete {
                index: 1,
                removed: comment(2, "b"),
                confirmed: false,
            },
        );
        let reloaded = base().apply_delete(CommentId(2));
        let c = p.reapply(&reloaded);
        assert_eq!(p.rollback(&c), reloaded);
    }

    #[test]
    fn reapply_skips_add_already_stored() {
        let correlation = CorrelationId::new();
        let mut p = PendingMutation::new(
            correlation,
            PostId::stub(),
            PendingKind::Add {
                content: String::from("d"),
            },
        );
        let stored = base().apply_create(comment(4, "d").with_correlation(correlation));
        let c = p.reapply(&stored);
        assert_eq!(c, stored);
        assert_eq!(c.pending(), None);

        // not stored yet: shown again as pending
        let c = p.reapply(&base());
        assert_eq!(c.len(), 4);
        assert_eq!(c.pending(), Some(correlation));
    }
}
