use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use futures::{channel::mpsc, StreamExt};
use parley_client::{
    api::{Action, Comment, CommentId, CorrelationId, Error, FeedMessage, PostId, Settlement},
    CommentFeed, FeedStream, Mutator,
};
use tokio::sync::{Mutex, MutexGuard};

/// In-memory stand-in for the comment server
pub struct MockServer {
    posts: BTreeMap<PostId, Post>,
    next_id: i64,
    fail_every: Option<usize>,
    num_mutations: usize,
}

#[derive(Debug, Default)]
struct Post {
    comments: Vec<Comment>,
    feeds: Vec<mpsc::UnboundedSender<FeedMessage>>,
}

impl Post {
    fn relay(&mut self, msg: FeedMessage) {
        self.feeds
            .retain(|f| matches!(f.unbounded_send(msg.clone()), Ok(())));
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            posts: BTreeMap::new(),
            next_id: 1,
            fail_every: None,
            num_mutations: 0,
        }
    }

    /// Rejects every `n`-th mutation, to exercise client rollbacks
    pub fn with_fail_every(n: usize) -> MockServer {
        MockServer {
            fail_every: Some(n).filter(|n| *n > 0),
            ..MockServer::new()
        }
    }

    /// Return the comments currently stored for `post`
    pub fn test_comments(&self, post: PostId) -> Vec<Comment> {
        self.fetch_comments(post)
    }

    /// Return the current number of live feeds for `post`
    pub fn test_num_feeds(&self, post: PostId) -> usize {
        self.posts.get(&post).map(|p| p.feeds.len()).unwrap_or(0)
    }

    /// Drop every feed of `post`, as a lost connection would
    pub fn test_break_feeds(&mut self, post: PostId) {
        if let Some(p) = self.posts.get_mut(&post) {
            p.feeds.clear();
        }
    }

    fn check_injected_failure(&mut self) -> Result<(), Error> {
        self.num_mutations += 1;
        match self.fail_every {
            Some(n) if self.num_mutations % n == 0 => {
                tracing::debug!(num_mutations = self.num_mutations, "injecting mutation failure");
                Err(Error::Unknown(String::from("injected failure")))
            }
            _ => Ok(()),
        }
    }

    fn find_mut(&mut self, id: CommentId) -> Result<(&mut Post, usize), Error> {
        for p in self.posts.values_mut() {
            if let Some(idx) = p.comments.iter().position(|c| c.id == Some(id)) {
                return Ok((p, idx));
            }
        }
        Err(Error::NotFound(id))
    }

    /// Adds a comment on behalf of a client that does not track its adds
    pub fn add_comment(&mut self, content: String, post_id: PostId) -> Result<Comment, Error> {
        self.store_comment(None, content, post_id)
    }

    pub fn add_correlated_comment(
        &mut self,
        correlation: CorrelationId,
        content: String,
        post_id: PostId,
    ) -> Result<Comment, Error> {
        self.store_comment(Some(correlation), content, post_id)
    }

    fn store_comment(
        &mut self,
        correlation: Option<CorrelationId>,
        content: String,
        post_id: PostId,
    ) -> Result<Comment, Error> {
        self.check_injected_failure()?;
        let c = Comment {
            correlation,
            ..Comment::confirmed(CommentId(self.next_id), content, post_id)
        };
        c.validate()?;
        self.next_id += 1;
        let post = self.posts.entry(post_id).or_default();
        post.comments.push(c.clone());
        post.relay(FeedMessage::created(c.clone()));
        Ok(c)
    }

    pub fn edit_comment(&mut self, id: CommentId, content: String) -> Result<Comment, Error> {
        self.check_injected_failure()?;
        parley_client::api::validate_content(&content)?;
        let (post, idx) = self.find_mut(id)?;
        post.comments[idx].content = content;
        let c = post.comments[idx].clone();
        post.relay(FeedMessage::updated(c.clone()));
        Ok(c)
    }

    pub fn delete_comment(&mut self, id: CommentId) -> Result<CommentId, Error> {
        self.check_injected_failure()?;
        let (post, idx) = self.find_mut(id)?;
        post.comments.remove(idx);
        post.relay(FeedMessage::deleted(id));
        Ok(id)
    }

    pub fn submit_action(&mut self, a: Action) -> Result<Settlement, Error> {
        a.validate()?;
        Ok(match a {
            Action::Add {
                correlation,
                content,
                post_id,
            } => Settlement::Added(self.add_correlated_comment(correlation, content, post_id)?),
            Action::Edit { id, content } => Settlement::Edited(self.edit_comment(id, content)?),
            Action::Delete { id } => Settlement::Deleted(self.delete_comment(id)?),
        })
    }

    pub fn fetch_comments(&self, post: PostId) -> Vec<Comment> {
        self.posts
            .get(&post)
            .map(|p| p.comments.clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&mut self, post: PostId) -> mpsc::UnboundedReceiver<FeedMessage> {
        let (sender, receiver) = mpsc::unbounded();
        self.posts.entry(post).or_default().feeds.push(sender);
        receiver
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

/// Shareable `MockServer`, usable as the backend of a comment view
#[derive(Clone)]
pub struct MockHandle(Arc<Mutex<MockServer>>);

impl MockHandle {
    pub fn new(server: MockServer) -> MockHandle {
        MockHandle(Arc::new(Mutex::new(server)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, MockServer> {
        self.0.lock().await
    }
}

/// Hands `res` over the way an HTTP API would, errors being sent as a status
/// code and a JSON body
fn over_the_wire<T>(res: Result<T, Error>) -> Result<T, Error> {
    res.map_err(|e| {
        let status = e.status_code();
        match Error::parse(&e.contents()) {
            Ok(e) => e,
            Err(err) => Error::Unknown(format!("unparseable {status} error body: {err:#}")),
        }
    })
}

#[async_trait]
impl Mutator for MockHandle {
    async fn add_comment(
        &self,
        correlation: CorrelationId,
        content: String,
        post_id: PostId,
    ) -> Result<Comment, Error> {
        over_the_wire(
            self.lock()
                .await
                .add_correlated_comment(correlation, content, post_id),
        )
    }

    async fn edit_comment(&self, id: CommentId, content: String) -> Result<Comment, Error> {
        over_the_wire(self.lock().await.edit_comment(id, content))
    }

    async fn delete_comment(&self, id: CommentId) -> Result<CommentId, Error> {
        over_the_wire(self.lock().await.delete_comment(id))
    }
}

#[async_trait]
impl CommentFeed for MockHandle {
    async fn fetch_comments(&self, post_id: PostId) -> Result<Vec<Comment>, Error> {
        Ok(self.lock().await.fetch_comments(post_id))
    }

    async fn subscribe(&self, post_id: PostId) -> Result<FeedStream, Error> {
        let receiver = self.lock().await.subscribe(post_id);
        Ok(Box::pin(receiver.map(Ok)))
    }
}
