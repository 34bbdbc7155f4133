use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GroupSummary, UserSummary};

/// Post entity - a short text entry, optionally filed under a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub text: String,
    /// Reference to an already stored image (URL or storage path).
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post.
    pub fn new(
        author_id: Uuid,
        group_id: Option<Uuid>,
        text: String,
        image: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            group_id,
            text,
            image,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A post together with the author and group it is rendered with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub group: Option<GroupSummary>,
}
