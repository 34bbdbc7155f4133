//! Authorization predicates over (actor, resource).

use uuid::Uuid;

use crate::domain::Post;

/// Only the author may edit or delete a post.
pub fn can_modify_post(actor: Option<Uuid>, post: &Post) -> bool {
    actor == Some(post.author_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_may_modify_own_post() {
        let author = Uuid::new_v4();
        let post = Post::new(author, None, "text".to_string(), None);
        assert!(can_modify_post(Some(author), &post));
    }

    #[test]
    fn test_others_may_not_modify_post() {
        let post = Post::new(Uuid::new_v4(), None, "text".to_string(), None);
        assert!(!can_modify_post(Some(Uuid::new_v4()), &post));
        assert!(!can_modify_post(None, &post));
    }
}
