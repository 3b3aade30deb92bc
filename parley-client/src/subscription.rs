use crate::api::PostId;

/// One live-update feed, bound to one post
///
/// `generation` grows on every bind, so that a feed closed because the viewed
/// post changed cannot be mistaken for the current one, even when coming back
/// to the same post.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionHandle {
    pub post_id: PostId,
    pub generation: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscriptionState {
    Unbound,
    Bound(SubscriptionHandle),
}

/// What the caller must do with feeds after `Subscription::observe`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    Unchanged,
    Bind(SubscriptionHandle),
    /// `close` must be closed before `open` is opened
    Rebind {
        close: SubscriptionHandle,
        open: SubscriptionHandle,
    },
}

#[derive(Clone, Debug)]
pub struct Subscription {
    state: SubscriptionState,
    generation: u64,
}

impl Subscription {
    pub fn new() -> Subscription {
        Subscription {
            state: SubscriptionState::Unbound,
            generation: 0,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn handle(&self) -> Option<SubscriptionHandle> {
        match self.state {
            SubscriptionState::Unbound => None,
            SubscriptionState::Bound(h) => Some(h),
        }
    }

    fn next_handle(&mut self, post_id: PostId) -> SubscriptionHandle {
        self.generation += 1;
        SubscriptionHandle {
            post_id,
            generation: self.generation,
        }
    }

    pub fn observe(&mut self, post_id: PostId) -> Transition {
        match self.state {
            SubscriptionState::Bound(h) if h.post_id == post_id => Transition::Unchanged,
            SubscriptionState::Bound(close) => {
                let open = self.next_handle(post_id);
                self.state = SubscriptionState::Bound(open);
                Transition::Rebind { close, open }
            }
            SubscriptionState::Unbound => {
                let open = self.next_handle(post_id);
                self.state = SubscriptionState::Bound(open);
                Transition::Bind(open)
            }
        }
    }

    /// Whether data coming from `handle` must be applied
    pub fn accepts(&self, handle: SubscriptionHandle) -> bool {
        self.state == SubscriptionState::Bound(handle)
    }

    /// Records a transport failure of `handle`, returning whether it was the
    /// bound one (and thus got unbound)
    pub fn fail(&mut self, handle: SubscriptionHandle) -> bool {
        if !self.accepts(handle) {
            return false;
        }
        self.state = SubscriptionState::Unbound;
        true
    }
}

impl Default for Subscription {
    fn default() -> Subscription {
        Subscription::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Uuid;

    #[test]
    fn first_observation_binds() {
        let mut s = Subscription::new();
        let p = PostId(Uuid::new_v4());
        let h = match s.observe(p) {
            Transition::Bind(h) => h,
            t => panic!("unexpected transition {t:?}"),
        };
        assert_eq!(h.post_id, p);
        assert_eq!(s.state(), SubscriptionState::Bound(h));
        assert_eq!(s.observe(p), Transition::Unchanged);
    }

    #[test]
    fn switching_post_closes_before_opening() {
        let mut s = Subscription::new();
        let (p1, p2) = (PostId(Uuid::new_v4()), PostId(Uuid::new_v4()));
        s.observe(p1);
        let old = s.handle().unwrap();
        match s.observe(p2) {
            Transition::Rebind { close, open } => {
                assert_eq!(close, old);
                assert_eq!(open.post_id, p2);
                assert!(open.generation > close.generation);
                assert!(!s.accepts(close));
                assert!(s.accepts(open));
            }
            t => panic!("unexpected transition {t:?}"),
        }
    }

    #[test]
    fn coming_back_to_a_post_gets_a_fresh_handle() {
        let mut s = Subscription::new();
        let (p1, p2) = (PostId(Uuid::new_v4()), PostId(Uuid::new_v4()));
        s.observe(p1);
        let first = s.handle().unwrap();
        s.observe(p2);
        s.observe(p1);
        assert_ne!(s.handle().unwrap(), first);
        assert!(!s.accepts(first));
    }

    #[test]
    fn failure_unbinds_until_next_observation() {
        let mut s = Subscription::new();
        let p = PostId(Uuid::new_v4());
        s.observe(p);
        let h = s.handle().unwrap();
        assert!(s.fail(h));
        assert_eq!(s.state(), SubscriptionState::Unbound);
        assert!(!s.fail(h), "a handle only fails once");
        assert!(matches!(s.observe(p), Transition::Bind(_)));
    }
}
