mod collection;
pub use collection::CommentCollection;

mod component;
pub use component::{Effect, Load, Msg, PostComments};

mod driver;
pub use driver::{spawn_view, ViewHandle, ViewSnapshot};

mod pending;
pub use pending::{PendingKind, PendingMutation};

mod remote;
pub use remote::{execute, CommentFeed, FeedStream, Mutator};

mod selection;
pub use selection::{
    select_for_edit, submit, FormNotifier, SelectionSlot, SelectionStore, Submission,
};

mod subscription;
pub use subscription::{Subscription, SubscriptionHandle, SubscriptionState, Transition};

#[cfg(test)]
mod fuzz;

pub mod api {
    pub use parley_api::*;
}
