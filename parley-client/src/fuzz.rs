use std::collections::HashSet;

use bolero::generator::gen_with;

use crate::{
    api::{Comment, CommentId, Error, FeedMessage, PostId, Settlement},
    CommentCollection, Msg, PendingKind, PostComments,
};

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    Submit {
        #[generator(gen_with::<String>().len(0..8usize))]
        content: String,
    },
    Select {
        idx: u8,
    },
    Delete {
        idx: u8,
    },
    PushCreated {
        id: u8,
    },
    PushUpdated {
        id: u8,
    },
    PushDeleted {
        id: u8,
    },
    Settle {
        idx: u8,
        accept: bool,
        id: u8,
    },
}

fn comment(id: u8, content: &str) -> Comment {
    Comment::confirmed(CommentId(id as i64), String::from(content), PostId::stub())
}

fn check_invariants(view: &PostComments) {
    let comments = view.comments();
    let mut ids = HashSet::new();
    for c in comments.iter() {
        if let Some(id) = c.id {
            assert!(ids.insert(id), "duplicate id {id:?} in {comments:?}");
        }
    }
    let sentinels = comments.iter().filter(|c| c.is_pending()).count();
    assert!(sentinels <= 1, "multiple pending comments in {comments:?}");
    assert_eq!(
        sentinels == 1,
        comments.pending().is_some(),
        "pending marker does not match displayed comments {comments:?}"
    );
    if let Some(corr) = comments.pending() {
        assert!(
            view.pending()
                .iter()
                .any(|p| p.correlation == corr && matches!(p.kind, PendingKind::Add { .. })),
            "pending comment {corr:?} has no matching mutation in flight"
        );
    }
}

fn execute_fuzz_op(view: &mut PostComments, op: &FuzzOp) {
    let handle = view
        .subscription()
        .handle()
        .expect("fuzzed view lost its subscription");
    let pick = |idx: u8| {
        let len = view.comments().len();
        (len > 0)
            .then(|| view.comments().get(idx as usize % len).cloned())
            .flatten()
    };
    let msg = match op {
        FuzzOp::Submit { content } => Msg::Submit(content.clone()),
        FuzzOp::Select { idx } => match pick(*idx) {
            Some(c) => Msg::Select(c),
            None => return,
        },
        FuzzOp::Delete { idx } => match pick(*idx).and_then(|c| c.id) {
            Some(id) => Msg::Delete(id),
            None => return,
        },
        FuzzOp::PushCreated { id } => Msg::FeedEvent {
            handle,
            msg: FeedMessage::created(comment(*id, "pushed")),
        },
        FuzzOp::PushUpdated { id } => Msg::FeedEvent {
            handle,
            msg: FeedMessage::updated(comment(*id, "updated")),
        },
        FuzzOp::PushDeleted { id } => Msg::FeedEvent {
            handle,
            msg: FeedMessage::deleted(CommentId(*id as i64)),
        },
        FuzzOp::Settle { idx, accept, id } => {
            let len = view.pending().len();
            if len == 0 {
                return;
            }
            let p = &view.pending()[*idx as usize % len];
            let result = match (accept, &p.kind) {
                (false, _) => Err(Error::PermissionDenied),
                (true, PendingKind::Add { content }) => Ok(Settlement::Added(comment(*id, content))),
                (true, PendingKind::Edit { id, content, .. }) => Ok(Settlement::Edited(
                    Comment::confirmed(*id, content.clone(), PostId::stub()),
                )),
                (true, PendingKind::Delete { removed, .. }) => Ok(Settlement::Deleted(
                    removed.id.expect("pending deletion without id"),
                )),
            };
            Msg::Settled {
                correlation: p.correlation,
                result,
            }
        }
    };
    view.update(msg);
}

#[test]
fn reconciler_keeps_invariants() {
    bolero::check!()
        .with_generator(gen_with::<Vec<FuzzOp>>().len(0..64usize))
        .for_each(|ops| {
            let mut view = PostComments::new();
            view.update(Msg::Observe(PostId::stub()));
            let handle = view.subscription().handle().expect("observing did not bind");
            view.update(Msg::SnapshotLoaded {
                handle,
                comments: Vec::new(),
            });
            for op in ops {
                execute_fuzz_op(&mut view, op);
                check_invariants(&view);
            }
        })
}

#[test]
fn accepting_everything_leaves_nothing_pending() {
    bolero::check!()
        .with_generator(gen_with::<Vec<FuzzOp>>().len(0..64usize))
        .for_each(|ops| {
            let mut view = PostComments::new();
            view.update(Msg::Observe(PostId::stub()));
            let handle = view.subscription().handle().expect("observing did not bind");
            view.update(Msg::SnapshotLoaded {
                handle,
                comments: Vec::new(),
            });
            for op in ops {
                execute_fuzz_op(&mut view, op);
            }
            // Drain with fresh server ids, as a real server would allocate them
            let mut next_id = 1000;
            while let Some(p) = view.pending().front().cloned() {
                let result = match p.kind {
                    PendingKind::Add { content } => {
                        next_id += 1;
                        Settlement::Added(Comment::confirmed(
                            CommentId(next_id),
                            content,
                            PostId::stub(),
                        ))
                    }
                    PendingKind::Edit { id, content, .. } => {
                        Settlement::Edited(Comment::confirmed(id, content, PostId::stub()))
                    }
                    PendingKind::Delete { removed, .. } => Settlement::Deleted(
                        removed.id.expect("pending deletion without id"),
                    ),
                };
                view.update(Msg::Settled {
                    correlation: p.correlation,
                    result: Ok(result),
                });
                check_invariants(&view);
            }
            assert_eq!(view.comments().pending(), None);
            assert!(view.comments().iter().all(|c| !c.is_pending()));
        })
}

#[test]
fn collection_properties() {
    bolero::check!()
        .with_type::<(Vec<u8>, u8)>()
        .for_each(|(ids, x)| {
            let c = CommentCollection::from_confirmed(ids.iter().map(|id| comment(*id, "c")));
            let x_comment = comment(*x, "x");
            let x_id = CommentId(*x as i64);

            let created = c.apply_create(x_comment.clone());
            assert_eq!(created.apply_create(x_comment.clone()), created);
            if c.contains(x_id) {
                assert_eq!(created, c);
                let deleted = c.apply_delete(x_id);
                assert_eq!(deleted.len(), c.len() - 1);
                assert_eq!(deleted.apply_delete(x_id), deleted);
            } else {
                assert_eq!(c.apply_delete(x_id), c);
                assert_eq!(created.len(), c.len() + 1);
                assert_eq!(created.to_vec()[..c.len()], c.to_vec()[..]);
                assert_eq!(created.get(c.len()), Some(&x_comment));
            }
        })
}
