use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Context;
use futures::{
    channel::{mpsc, oneshot},
    select, FutureExt, StreamExt,
};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    api::{Comment, CommentId, Error, PostId, SelectedComment},
    execute, CommentFeed, Effect, FormNotifier, Load, Msg, Mutator, PostComments, SelectionStore,
    SubscriptionHandle, SubscriptionState,
};

/// What a renderer needs to know about the comment view
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViewSnapshot {
    pub post: Option<PostId>,
    pub comments: Vec<Comment>,
    pub selected: SelectedComment,
    pub subscription: SubscriptionState,
    pub loading: bool,
    pub num_pending: usize,
    pub last_error: Option<Error>,

    /// Number of `ViewHandle` requests already handled
    processed: u64,
}

impl ViewSnapshot {
    fn of<S: SelectionStore>(view: &PostComments<S>, processed: u64) -> ViewSnapshot {
        ViewSnapshot {
            post: view.post(),
            comments: view.comments().to_vec(),
            selected: view.selection().get(),
            subscription: view.subscription().state(),
            loading: matches!(view.load(), Load::Loading(_)),
            num_pending: view.pending().len(),
            last_error: view.last_error().cloned(),
            processed,
        }
    }

    pub fn find(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == Some(id))
    }
}

#[derive(Debug)]
enum Input {
    /// Requests from a `ViewHandle`
    User(Msg),
    /// Results of effects
    Internal(Msg),
    Shutdown,
}

/// Handle to a comment view running in the background
///
/// Every request is handled in order, one at a time, along with feed events and
/// mutation results.
#[derive(Clone)]
pub struct ViewHandle {
    sender: mpsc::UnboundedSender<Input>,
    snapshots: watch::Receiver<ViewSnapshot>,
    sent: Arc<AtomicU64>,
}

impl ViewHandle {
    fn send(&self, msg: Msg) {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.sender.unbounded_send(Input::User(msg)).is_err() {
            tracing::warn!("sending request to a comment view that is no longer running");
        }
    }

    pub fn observe(&self, post: PostId) {
        self.send(Msg::Observe(post))
    }

    pub fn select(&self, comment: Comment) {
        self.send(Msg::Select(comment))
    }

    pub fn submit(&self, content: String) {
        self.send(Msg::Submit(content))
    }

    pub fn delete(&self, id: CommentId) {
        self.send(Msg::Delete(id))
    }

    pub fn shutdown(&self) {
        let _ = self.sender.unbounded_send(Input::Shutdown);
    }

    /// Latest published state, which may not include the latest requests yet
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Waits until every request sent so far is handled and `f` holds
    pub async fn wait_until<F>(&mut self, mut f: F) -> anyhow::Result<ViewSnapshot>
    where
        F: FnMut(&ViewSnapshot) -> bool,
    {
        let sent = self.sent.load(Ordering::SeqCst);
        loop {
            {
                let s = self.snapshots.borrow_and_update();
                if s.processed >= sent && f(&*s) {
                    return Ok(s.clone());
                }
            }
            self.snapshots
                .changed()
                .await
                .context("comment view stopped")?;
        }
    }

    /// Waits until the comment list is loaded and no mutation is in flight
    pub async fn settled(&mut self) -> anyhow::Result<ViewSnapshot> {
        self.wait_until(|s| !s.loading && s.num_pending == 0).await
    }
}

struct Driver<M, F, N> {
    view: PostComments,
    mutator: Arc<M>,
    feed: Arc<F>,
    notifier: N,
    sender: mpsc::UnboundedSender<Input>,
    feeds: HashMap<u64, oneshot::Sender<()>>,
    snapshots: watch::Sender<ViewSnapshot>,
    processed: u64,
}

/// Starts a comment view, which runs until `ViewHandle::shutdown` is called
pub fn spawn_view<M, F, N>(mutator: Arc<M>, feed: Arc<F>, notifier: N) -> (ViewHandle, JoinHandle<()>)
where
    M: 'static + Mutator,
    F: 'static + CommentFeed,
    N: 'static + Send + FormNotifier,
{
    let (sender, receiver) = mpsc::unbounded();
    let view = PostComments::new();
    let (snapshots, snapshots_receiver) = watch::channel(ViewSnapshot::of(&view, 0));
    let driver = Driver {
        view,
        mutator,
        feed,
        notifier,
        sender: sender.clone(),
        feeds: HashMap::new(),
        snapshots,
        processed: 0,
    };
    let join = tokio::spawn(driver.run(receiver));
    let handle = ViewHandle {
        sender,
        snapshots: snapshots_receiver,
        sent: Arc::new(AtomicU64::new(0)),
    };
    (handle, join)
}

impl<M, F, N> Driver<M, F, N>
where
    M: 'static + Mutator,
    F: 'static + CommentFeed,
    N: 'static + Send + FormNotifier,
{
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = receiver.next().await {
            let msg = match input {
                Input::User(msg) => {
                    self.processed += 1;
                    msg
                }
                Input::Internal(msg) => msg,
                Input::Shutdown => break,
            };
            tracing::trace!(?msg, "handling comment view message");
            for effect in self.view.update(msg) {
                self.apply(effect);
            }
            self.snapshots
                .send_replace(ViewSnapshot::of(&self.view, self.processed));
        }
        for (_, cancel) in self.feeds.drain() {
            let _ = cancel.send(());
        }
        tracing::debug!("comment view stopped");
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::OpenFeed(handle) => {
                let (cancel, cancelled) = oneshot::channel();
                self.feeds.insert(handle.generation, cancel);
                tokio::spawn(run_feed(
                    self.feed.clone(),
                    handle,
                    self.sender.clone(),
                    cancelled,
                ));
            }
            Effect::CloseFeed(handle) => {
                if let Some(cancel) = self.feeds.remove(&handle.generation) {
                    // the feed task may already be gone after a transport error
                    let _ = cancel.send(());
                }
            }
            Effect::Mutate {
                correlation,
                action,
            } => {
                let mutator = self.mutator.clone();
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    let result = execute(&*mutator, action).await;
                    let _ = sender.unbounded_send(Input::Internal(Msg::Settled {
                        correlation,
                        result,
                    }));
                });
            }
            Effect::FormSubmitted => self.notifier.form_submitted(),
        }
    }
}

async fn run_feed<F>(
    feed: Arc<F>,
    handle: SubscriptionHandle,
    sender: mpsc::UnboundedSender<Input>,
    cancelled: oneshot::Receiver<()>,
) where
    F: ?Sized + CommentFeed,
{
    let send = |msg| sender.unbounded_send(Input::Internal(msg)).is_ok();

    // Subscribe before listing, so that no change can fall in-between
    let stream = match feed.subscribe(handle.post_id).await {
        Ok(s) => s,
        Err(error) => {
            send(Msg::FeedError { handle, error });
            return;
        }
    };
    match feed.fetch_comments(handle.post_id).await {
        Ok(comments) => {
            if !send(Msg::SnapshotLoaded { handle, comments }) {
                return;
            }
        }
        Err(error) => {
            send(Msg::FeedError { handle, error });
            return;
        }
    }
    tracing::debug!(?handle, "comment feed connected");

    let mut stream = stream.fuse();
    let mut cancelled = cancelled.fuse();
    loop {
        select! {
            _ = cancelled => {
                tracing::debug!(?handle, "comment feed closed");
                return;
            }
            msg = stream.next() => {
                let (msg, stop) = match msg {
                    Some(Ok(msg)) => (Msg::FeedEvent { handle, msg }, false),
                    Some(Err(error)) => (Msg::FeedError { handle, error }, true),
                    None => (
                        Msg::FeedError {
                            handle,
                            error: Error::SubscriptionTransport(String::from("feed ended")),
                        },
                        true,
                    ),
                };
                if !send(msg) || stop {
                    return;
                }
            }
        }
    }
}
