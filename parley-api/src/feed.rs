use crate::{Comment, CommentId};

/// Kind of change carried by a subscription push
///
/// Kinds this client does not know about deserialize into `Other` so that a newer
/// server cannot break older clients.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(from = "String", into = "String")]
pub enum Mutation {
    Created,
    Updated,
    Deleted,
    Other(String),
}

impl From<String> for Mutation {
    fn from(s: String) -> Mutation {
        match &s as &str {
            "CREATED" => Mutation::Created,
            "UPDATED" => Mutation::Updated,
            "DELETED" => Mutation::Deleted,
            _ => Mutation::Other(s),
        }
    }
}

impl From<Mutation> for String {
    fn from(m: Mutation) -> String {
        match m {
            Mutation::Created => String::from("CREATED"),
            Mutation::Updated => String::from("UPDATED"),
            Mutation::Deleted => String::from("DELETED"),
            Mutation::Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FeedMessage {
    pub mutation: Mutation,
    pub id: CommentId,
    pub node: Option<Comment>,
}

impl FeedMessage {
    /// Panics if `c` has not been confirmed by the server
    pub fn created(c: Comment) -> FeedMessage {
        FeedMessage {
            mutation: Mutation::Created,
            id: c.id.expect("pushing creation of an unconfirmed comment"),
            node: Some(c),
        }
    }

    /// Panics if `c` has not been confirmed by the server
    pub fn updated(c: Comment) -> FeedMessage {
        FeedMessage {
            mutation: Mutation::Updated,
            id: c.id.expect("pushing update of an unconfirmed comment"),
            node: Some(c),
        }
    }

    pub fn deleted(id: CommentId) -> FeedMessage {
        FeedMessage {
            mutation: Mutation::Deleted,
            id,
            node: None,
        }
    }
}
