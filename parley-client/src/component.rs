use std::collections::VecDeque;

use chrono::Utc;

use crate::{
    api::{
        Action, Comment, CommentId, CorrelationId, Error, FeedMessage, Mutation, PostId,
        Settlement,
    },
    select_for_edit, submit, CommentCollection, PendingKind, PendingMutation, SelectionSlot,
    SelectionStore, Submission, Subscription, SubscriptionHandle, Transition,
};

#[derive(Debug)]
pub enum Msg {
    Observe(PostId),

    SnapshotLoaded {
        handle: SubscriptionHandle,
        comments: Vec<Comment>,
    },
    FeedEvent {
        handle: SubscriptionHandle,
        msg: FeedMessage,
    },
    FeedError {
        handle: SubscriptionHandle,
        error: Error,
    },

    Select(Comment),
    Submit(String),
    Delete(CommentId),
    Settled {
        correlation: CorrelationId,
        result: Result<Settlement, Error>,
    },
}

/// Work `PostComments::update` asks its caller to carry out, in order
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    OpenFeed(SubscriptionHandle),
    CloseFeed(SubscriptionHandle),
    Mutate {
        correlation: CorrelationId,
        action: Action,
    },
    FormSubmitted,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Load {
    /// Feed events received before the initial comment list, to replay on top of it
    Loading(VecDeque<FeedMessage>),
    Loaded,
}

/// State of the comment thread of the currently viewed post
pub struct PostComments<S = SelectionSlot> {
    post: Option<PostId>,
    collection: CommentCollection,
    selection: S,
    subscription: Subscription,
    load: Load,
    pending: VecDeque<PendingMutation>,
    last_error: Option<Error>,
}

impl PostComments<SelectionSlot> {
    pub fn new() -> PostComments<SelectionSlot> {
        PostComments::with_selection(SelectionSlot::new())
    }
}

impl Default for PostComments<SelectionSlot> {
    fn default() -> PostComments<SelectionSlot> {
        PostComments::new()
    }
}

impl<S: SelectionStore> PostComments<S> {
    pub fn with_selection(mut selection: S) -> PostComments<S> {
        selection.reset();
        PostComments {
            post: None,
            collection: CommentCollection::new(),
            selection,
            subscription: Subscription::new(),
            load: Load::Loaded,
            pending: VecDeque::new(),
            last_error: None,
        }
    }

    pub fn post(&self) -> Option<PostId> {
        self.post
    }

    pub fn comments(&self) -> &CommentCollection {
        &self.collection
    }

    pub fn selection(&self) -> &S {
        &self.selection
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn load(&self) -> &Load {
        &self.load
    }

    pub fn pending(&self) -> &VecDeque<PendingMutation> {
        &self.pending
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    fn mount(&mut self, post: PostId) {
        if !self.pending.is_empty() {
            tracing::debug!(
                num_pending = self.pending.len(),
                "leaving post with mutations in flight, their results will be ignored"
            );
        }
        self.post = Some(post);
        self.collection = CommentCollection::new();
        self.selection.reset();
        self.pending.clear();
        self.last_error = None;
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Observe(post) => {
                let effects = match self.subscription.observe(post) {
                    Transition::Unchanged => return Vec::new(),
                    Transition::Bind(open) => vec![Effect::OpenFeed(open)],
                    Transition::Rebind { close, open } => {
                        vec![Effect::CloseFeed(close), Effect::OpenFeed(open)]
                    }
                };
                if self.post != Some(post) {
                    self.mount(post);
                }
                self.load = Load::Loading(VecDeque::new());
                tracing::debug!(?post, "observing post");
                effects
            }
            Msg::SnapshotLoaded { handle, comments } => {
                if !self.subscription.accepts(handle) {
                    tracing::debug!(?handle, "ignoring comment list from stale feed");
                    return Vec::new();
                }
                let buffered = match std::mem::replace(&mut self.load, Load::Loaded) {
                    Load::Loading(buffered) => buffered,
                    Load::Loaded => {
                        tracing::warn!(?handle, "received comment list twice for the same feed");
                        VecDeque::new()
                    }
                };
                let mut collection = CommentCollection::from_confirmed(comments);
                for p in self.pending.iter_mut() {
                    collection = p.reapply(&collection);
                }
                for e in buffered {
                    collection = collection.on_subscription_event(&e);
                }
                self.collection = collection;
                tracing::debug!(?handle, num_comments = self.collection.len(), "comment list loaded");
                Vec::new()
            }
            Msg::FeedEvent { handle, msg } => {
                if !self.subscription.accepts(handle) {
                    tracing::debug!(?handle, ?msg, "ignoring event from stale feed");
                    return Vec::new();
                }
                tracing::trace!(?msg, "received feed event");
                if msg.mutation == Mutation::Deleted {
                    for p in self.pending.iter_mut() {
                        p.confirm_deleted(msg.id);
                    }
                }
                match &mut self.load {
                    Load::Loading(buffered) => buffered.push_back(msg),
                    Load::Loaded => self.collection = self.collection.on_subscription_event(&msg),
                }
                Vec::new()
            }
            Msg::FeedError { handle, error } => {
                if !self.subscription.fail(handle) {
                    tracing::debug!(?handle, ?error, "ignoring error from stale feed");
                    return Vec::new();
                }
                tracing::error!(?handle, ?error, "comment feed failed, live updates stopped");
                if let Load::Loading(buffered) = std::mem::replace(&mut self.load, Load::Loaded) {
                    for e in buffered {
                        self.collection = self.collection.on_subscription_event(&e);
                    }
                }
                self.last_error = Some(match error {
                    Error::SubscriptionTransport(e) => Error::SubscriptionTransport(e),
                    e => Error::SubscriptionTransport(e.to_string()),
                });
                vec![Effect::CloseFeed(handle)]
            }
            Msg::Select(comment) => {
                if comment.is_pending() {
                    tracing::warn!(?comment, "cannot edit a comment the server did not confirm yet");
                    return Vec::new();
                }
                self.selection.set(select_for_edit(&comment));
                Vec::new()
            }
            Msg::Submit(content) => self.submit(content),
            Msg::Delete(id) => self.delete(id),
            Msg::Settled {
                correlation,
                result,
            } => {
                self.settle(correlation, result);
                Vec::new()
            }
        }
    }

    fn submit(&mut self, content: String) -> Vec<Effect> {
        let post_id = match self.post {
            Some(p) => p,
            None => {
                tracing::warn!("submitting a comment while not viewing any post");
                return Vec::new();
            }
        };
        let pending = match submit(&self.selection.get(), content, post_id) {
            Submission::Add { content, post_id } => {
                match self
                    .collection
                    .apply_optimistic_add(content.clone(), post_id)
                {
                    Ok((collection, correlation)) => {
                        self.collection = collection;
                        PendingMutation::new(correlation, post_id, PendingKind::Add { content })
                    }
                    Err(err) => {
                        tracing::info!(?err, "refusing comment submission");
                        self.last_error = Some(err);
                        return Vec::new();
                    }
                }
            }
            Submission::Edit { id, content } => {
                match self.collection.apply_optimistic_edit(id, content.clone()) {
                    Some((collection, previous)) => {
                        self.collection = collection;
                        PendingMutation::new(
                            CorrelationId::new(),
                            post_id,
                            PendingKind::Edit {
                                id,
                                content,
                                previous,
                            },
                        )
                    }
                    None => {
                        tracing::info!(?id, "edited comment disappeared before submission");
                        self.selection.reset();
                        self.last_error = Some(Error::NotFound(id));
                        return Vec::new();
                    }
                }
            }
        };
        tracing::debug!(correlation=?pending.correlation, kind=?pending.kind, "submitted comment");
        let effect = Effect::Mutate {
            correlation: pending.correlation,
            action: pending.action(),
        };
        self.pending.push_back(pending);
        self.selection.reset();
        vec![effect, Effect::FormSubmitted]
    }

    fn delete(&mut self, id: CommentId) -> Vec<Effect> {
        if self.selection.get().id == Some(id) {
            self.selection.reset();
        }
        let (collection, index, removed) = match self.collection.apply_optimistic_delete(id) {
            Some(res) => res,
            None => {
                tracing::debug!(?id, "deleting a comment that is not displayed");
                return Vec::new();
            }
        };
        self.collection = collection;
        let pending = PendingMutation::new(
            CorrelationId::new(),
            removed.post_id,
            PendingKind::Delete {
                index,
                removed,
                confirmed: false,
            },
        );
        let effect = Effect::Mutate {
            correlation: pending.correlation,
            action: pending.action(),
        };
        self.pending.push_back(pending);
        vec![effect]
    }

    fn settle(&mut self, correlation: CorrelationId, result: Result<Settlement, Error>) {
        let pending = match self
            .pending
            .iter()
            .position(|p| p.correlation == correlation)
            .and_then(|idx| self.pending.remove(idx))
        {
            Some(p) => p,
            None => {
                tracing::debug!(?correlation, "ignoring result of a mutation for a post no longer viewed");
                return;
            }
        };
        let latency = Utc::now() - pending.submitted_at;
        match result {
            Ok(s) => {
                tracing::debug!(?correlation, latency_ms = latency.num_milliseconds(), "mutation confirmed");
                self.collection = match s {
                    Settlement::Added(c) => self.collection.apply_confirmed_create(correlation, c),
                    Settlement::Edited(c) => self.collection.apply_edit(&c),
                    Settlement::Deleted(id) => self.collection.apply_delete(id),
                };
            }
            Err(Error::NotFound(id)) if pending.action() == (Action::Delete { id }) => {
                tracing::debug!(?correlation, ?id, "comment to delete was already gone from the server");
                self.collection = self.collection.apply_delete(id);
            }
            Err(err) => {
                tracing::warn!(?err, action=?pending.action(), latency_ms = latency.num_milliseconds(), "server rejected mutation, rolling back");
                self.collection = pending.rollback(&self.collection);
                self.last_error = Some(Error::MutationRejected(err.to_string()));
            }
        }
    }
}
