#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::database::entity::post;
    use crate::database::postgres_repo::{PostgresFollowRepository, PostgresPostRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use yatube_core::domain::{Follow, Post};
    use yatube_core::feed::FeedScope;
    use yatube_core::ports::{BaseRepository, FollowRepository, PostRepository};

    fn post_model(author_id: uuid::Uuid) -> post::Model {
        let now = chrono::Utc::now();
        post::Model {
            id: uuid::Uuid::new_v4(),
            author_id,
            group_id: None,
            text: "Test text".to_owned(),
            image: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn test_find_post_by_id() {
        let author_id = uuid::Uuid::new_v4();
        let model = post_model(author_id);
        let post_id = model.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

        let post = result.expect("post should be found");
        assert_eq!(post.text, "Test text");
        assert_eq!(post.id, post_id);
        assert_eq!(post.author_id, author_id);
    }

    #[tokio::test]
    async fn test_follow_feed_uses_semi_join() {
        let viewer = uuid::Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[BTreeMap::from([(
                "num_items",
                Value::BigInt(Some(1)),
            )])]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let count = repo.count_feed(&FeedScope::Following(viewer)).await.unwrap();
        assert_eq!(count, 1);

        let log = format!("{:?}", repo.db.into_transaction_log());
        assert!(log.contains("IN (SELECT"));
        assert!(log.contains("follows"));
    }

    #[tokio::test]
    async fn test_feed_slice_is_ordered_and_limited() {
        let author_id = uuid::Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post_model(author_id), post_model(author_id)]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let posts = repo
            .find_feed(&FeedScope::Author(author_id), 10, 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);

        let log = format!("{:?}", repo.db.into_transaction_log());
        assert!(log.contains("ORDER BY"));
        assert!(log.contains("DESC"));
        assert!(log.contains("LIMIT"));
        assert!(log.contains("OFFSET"));
    }

    #[tokio::test]
    async fn test_duplicate_follow_reports_no_insert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PostgresFollowRepository::new(db);
        let follow = Follow::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        assert!(!repo.insert_if_absent(follow).await.unwrap());
    }
}
