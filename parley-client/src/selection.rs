use crate::api::{Action, Comment, CommentId, CorrelationId, PostId, SelectedComment};

/// Slot holding the comment loaded into the edit form
pub trait SelectionStore {
    fn get(&self) -> SelectedComment;
    fn set(&mut self, selected: SelectedComment);

    fn reset(&mut self) {
        self.set(SelectedComment::empty())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectionSlot(SelectedComment);

impl SelectionSlot {
    pub fn new() -> SelectionSlot {
        SelectionSlot(SelectedComment::empty())
    }
}

impl SelectionStore for SelectionSlot {
    fn get(&self) -> SelectedComment {
        self.0.clone()
    }

    fn set(&mut self, selected: SelectedComment) {
        self.0 = selected;
    }
}

/// Signal that the edit form was submitted and its input should be cleared
pub trait FormNotifier {
    fn form_submitted(&mut self);
}

impl<F: FnMut()> FormNotifier for F {
    fn form_submitted(&mut self) {
        self()
    }
}

pub fn select_for_edit(comment: &Comment) -> SelectedComment {
    SelectedComment::from(comment)
}

/// The `Action`s submitting the edit form can lead to
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Submission {
    Add { content: String, post_id: PostId },
    Edit { id: CommentId, content: String },
}

impl Submission {
    pub fn into_action(self, correlation: CorrelationId) -> Action {
        match self {
            Submission::Add { content, post_id } => Action::Add {
                correlation,
                content,
                post_id,
            },
            Submission::Edit { id, content } => Action::Edit { id, content },
        }
    }
}

/// Decides what submitting the edit form with `content` means
pub fn submit(selected: &SelectedComment, content: String, post_id: PostId) -> Submission {
    match selected.id {
        None => Submission::Add { content, post_id },
        Some(id) => Submission::Edit { id, content },
    }
}
