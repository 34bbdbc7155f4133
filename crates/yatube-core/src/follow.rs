//! Follow and unfollow rules.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Follow;
use crate::error::DomainError;
use crate::ports::FollowRepository;

/// Result of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// Follower and author are the same user; nothing was written.
    SelfFollow,
    Created,
    AlreadyFollowing,
}

/// Result of an unfollow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowRepository>) -> Self {
        Self { follows }
    }

    /// Create the edge `follower -> author` if it does not exist yet.
    pub async fn follow(&self, follower: Uuid, author: Uuid) -> Result<FollowOutcome, DomainError> {
        if follower == author {
            return Ok(FollowOutcome::SelfFollow);
        }

        let created = self
            .follows
            .insert_if_absent(Follow::new(follower, author))
            .await?;

        Ok(if created {
            FollowOutcome::Created
        } else {
            FollowOutcome::AlreadyFollowing
        })
    }

    /// Remove the edge `follower -> author` if present.
    pub async fn unfollow(
        &self,
        follower: Uuid,
        author: Uuid,
    ) -> Result<UnfollowOutcome, DomainError> {
        let removed = self.follows.delete_pair(follower, author).await?;
        Ok(if removed {
            UnfollowOutcome::Removed
        } else {
            UnfollowOutcome::NotFollowing
        })
    }

    pub async fn is_following(&self, viewer: Uuid, author: Uuid) -> Result<bool, DomainError> {
        Ok(self.follows.exists(viewer, author).await?)
    }
}
