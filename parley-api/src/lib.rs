use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod action;
pub use action::{Action, CorrelationId, Settlement};

mod comment;
pub use comment::{Comment, CommentId, PostId, SelectedComment};

mod error;
pub use error::Error;

mod feed;
pub use feed::{FeedMessage, Mutation};

mod trace;
pub use trace::TraceStep;

// Validators, that are used both client-side and server-side. They return an Error
// that can be directly surfaced to the user.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

pub fn validate_content(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::EmptyComment);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_validation() {
        assert_eq!(validate_content("hello"), Ok(()));
        assert_eq!(validate_content("  \n"), Err(Error::EmptyComment));
        assert_eq!(
            validate_content("a\0b"),
            Err(Error::NullByteInString(String::from("a\0b")))
        );
    }
}
