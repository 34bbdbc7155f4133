//! In-memory entity store - used when no database is configured and in tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, User};
use yatube_core::error::RepoError;
use yatube_core::feed::{FeedScope, newest_first};
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    follows: Vec<Follow>,
}

impl Tables {
    /// Posts visible in `scope`, unordered.
    fn scoped_posts(&self, scope: &FeedScope) -> Vec<&Post> {
        match *scope {
            FeedScope::Index => self.posts.values().collect(),
            FeedScope::Group(group_id) => self
                .posts
                .values()
                .filter(|p| p.group_id == Some(group_id))
                .collect(),
            FeedScope::Author(author_id) => self
                .posts
                .values()
                .filter(|p| p.author_id == author_id)
                .collect(),
            FeedScope::Following(viewer) => {
                let followed: HashSet<Uuid> = self
                    .follows
                    .iter()
                    .filter(|f| f.user_id == viewer)
                    .map(|f| f.author_id)
                    .collect();
                self.posts
                    .values()
                    .filter(|p| followed.contains(&p.author_id))
                    .collect()
            }
        }
    }
}

/// All tables behind a single lock, so multi-row checks are atomic.
///
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        let owned_posts: HashSet<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|_, p| p.author_id != id);
        tables
            .comments
            .retain(|_, c| c.author_id != id && !owned_posts.contains(&c.post_id));
        tables
            .follows
            .retain(|f| f.user_id != id && f.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn insert(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint(format!(
                "group slug '{}' already exists",
                group.slug
            )));
        }
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .values()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(RepoError::Constraint(format!(
                "group slug '{}' already exists",
                group.slug
            )));
        }
        match tables.groups.get_mut(&group.id) {
            Some(slot) => {
                *slot = group.clone();
                Ok(group)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.groups.get(id).cloned())
            .collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(RepoError::Constraint("post author does not exist".to_string()));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.posts.get_mut(&post.id) {
            Some(slot) => {
                *slot = post.clone();
                Ok(post)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn count_feed(&self, scope: &FeedScope) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.scoped_posts(scope).len() as u64)
    }

    async fn find_feed(
        &self,
        scope: &FeedScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts = tables.scoped_posts(scope);
        posts.sort_by(|a, b| newest_first(a, b));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint("comment post does not exist".to_string()));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(&comment.id) {
            Some(slot) => {
                *slot = comment.clone();
                Ok(comment)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn insert_if_absent(&self, follow: Follow) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id)
        {
            return Ok(false);
        }
        tables.follows.push(follow);
        Ok(true)
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use yatube_core::feed::FeedService;
    use yatube_core::follow::FollowService;
    use yatube_core::pagination::RequestedPage;

    fn feed(store: &Arc<InMemoryStore>) -> FeedService {
        FeedService::new(store.clone(), store.clone(), store.clone())
    }

    async fn add_user(store: &Arc<InMemoryStore>, username: &str) -> User {
        let users: Arc<dyn UserRepository> = store.clone();
        users
            .insert(User::new(
                username.to_string(),
                format!("{username}@example.com"),
                "hash".to_string(),
            ))
            .await
            .unwrap()
    }

    async fn add_posts(
        store: &Arc<InMemoryStore>,
        author: &User,
        group: Option<Uuid>,
        n: usize,
    ) -> Vec<Post> {
        let posts: Arc<dyn PostRepository> = store.clone();
        let base = Utc::now() - Duration::hours(1);
        let mut created = Vec::new();
        for i in 0..n {
            let mut post = Post::new(author.id, group, format!("{} post", i + 1), None);
            post.created_at = base + Duration::seconds(i as i64);
            created.push(posts.insert(post).await.unwrap());
        }
        created
    }

    #[tokio::test]
    async fn test_index_pages_newest_first() {
        let store = Arc::new(InMemoryStore::new());
        let author = add_user(&store, "auth").await;
        let posts = add_posts(&store, &author, None, 13).await;

        let first = feed(&store)
            .page(FeedScope::Index, RequestedPage::first())
            .await
            .unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.items[0].post.id, posts[12].id);
        assert_eq!(first.items[9].post.id, posts[3].id);
        assert_eq!(first.items[0].author.username, "auth");

        let second = feed(&store)
            .page(FeedScope::Index, RequestedPage::number(2))
            .await
            .unwrap();
        let ids: Vec<Uuid> = second.items.iter().map(|c| c.post.id).collect();
        assert_eq!(ids, vec![posts[2].id, posts[1].id, posts[0].id]);
    }

    #[tokio::test]
    async fn test_group_and_author_scopes() {
        let store = Arc::new(InMemoryStore::new());
        let groups: Arc<dyn GroupRepository> = store.clone();
        let group = groups
            .insert(Group::new(
                "Test group".to_string(),
                "testslug".to_string(),
                String::new(),
            ))
            .await
            .unwrap();
        let alice = add_user(&store, "alice").await;
        let bob = add_user(&store, "bob").await;
        add_posts(&store, &alice, Some(group.id), 3).await;
        add_posts(&store, &bob, None, 2).await;

        let by_group = feed(&store)
            .page(FeedScope::Group(group.id), RequestedPage::first())
            .await
            .unwrap();
        assert_eq!(by_group.meta.count, 3);
        assert!(
            by_group
                .items
                .iter()
                .all(|c| c.group.as_ref().map(|g| g.slug.as_str()) == Some("testslug"))
        );

        let by_bob = feed(&store)
            .page(FeedScope::Author(bob.id), RequestedPage::first())
            .await
            .unwrap();
        assert_eq!(by_bob.meta.count, 2);
        assert!(by_bob.items.iter().all(|c| c.author.id == bob.id));
    }

    #[tokio::test]
    async fn test_follow_feed_only_shows_followed_authors() {
        let store = Arc::new(InMemoryStore::new());
        let follows = FollowService::new(store.clone());
        let a = add_user(&store, "author").await;
        let b = add_user(&store, "follower").await;
        let c = add_user(&store, "stranger").await;
        let post = add_posts(&store, &a, None, 1).await.remove(0);
        add_posts(&store, &c, None, 4).await;

        follows.follow(b.id, a.id).await.unwrap();

        let b_feed = feed(&store)
            .page(FeedScope::Following(b.id), RequestedPage::first())
            .await
            .unwrap();
        assert_eq!(b_feed.len(), 1);
        assert_eq!(b_feed.items[0].post.id, post.id);

        let c_feed = feed(&store)
            .page(FeedScope::Following(c.id), RequestedPage::first())
            .await
            .unwrap();
        assert!(c_feed.is_empty());
        assert_eq!(c_feed.meta.num_pages, 1);
    }

    #[tokio::test]
    async fn test_follow_pair_is_unique() {
        let store = Arc::new(InMemoryStore::new());
        let follows: Arc<dyn FollowRepository> = store.clone();
        let (user, author) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(follows.insert_if_absent(Follow::new(user, author)).await.unwrap());
        assert!(!follows.insert_if_absent(Follow::new(user, author)).await.unwrap());
        assert!(follows.delete_pair(user, author).await.unwrap());
        assert!(!follows.exists(user, author).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_constraint_error() {
        let store = Arc::new(InMemoryStore::new());
        add_user(&store, "dup").await;
        let users: Arc<dyn UserRepository> = store.clone();
        let result = users
            .insert(User::new(
                "dup".to_string(),
                "other@example.com".to_string(),
                "hash".to_string(),
            ))
            .await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_deleting_post_removes_its_comments() {
        let store = Arc::new(InMemoryStore::new());
        let author = add_user(&store, "auth").await;
        let post = add_posts(&store, &author, None, 1).await.remove(0);
        let comments: Arc<dyn CommentRepository> = store.clone();
        comments
            .insert(Comment::new(post.id, author.id, "nice".to_string()))
            .await
            .unwrap();

        let posts: Arc<dyn PostRepository> = store.clone();
        posts.delete(post.id).await.unwrap();

        assert!(comments.find_by_post(post.id).await.unwrap().is_empty());
    }
}
