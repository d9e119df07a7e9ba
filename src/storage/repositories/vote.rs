use std::sync::Arc;
use tracing::debug;

use super::thread::find_thread;
use super::user::find_user;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{Thread, ThreadRef, VoteRequest};
use crate::storage::database::Database;

pub struct VoteRepository {
    db: Arc<Database>,
}

impl VoteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Cast or change a vote and return the thread with its new tally.
    ///
    /// The upsert is a single statement and the `votes_apply` trigger moves
    /// the tally inside it, so concurrent votes on one thread cannot drift.
    pub async fn vote(&self, thread: &ThreadRef, request: VoteRequest) -> AppResult<Thread> {
        if request.voice != 1 && request.voice != -1 {
            return Err(AppError::InvalidRequest(format!(
                "voice must be 1 or -1, got {}",
                request.voice
            )));
        }

        let pool = self.db.pool();
        let target = find_thread(pool, thread).await?;
        let voter = find_user(pool, &request.nickname).await?;

        sqlx::query(
            r#"
            INSERT INTO votes (nickname, thread, voice)
            VALUES ($1, $2, $3)
            ON CONFLICT (nickname, thread) DO UPDATE SET voice = EXCLUDED.voice
            "#,
        )
        .bind(&voter.nickname)
        .bind(target.id)
        .bind(request.voice as i16)
        .execute(pool)
        .await?;

        debug!(thread = target.id, nickname = %voter.nickname, voice = request.voice, "vote recorded");
        find_thread(pool, &ThreadRef::Id(target.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CreateForumRequest, CreateThreadRequest};
    use crate::storage::repositories::testing::{database, unique, user_request};
    use crate::storage::repositories::{ForumRepository, Insert, ThreadRepository, UserRepository};

    #[tokio::test]
    async fn voice_outside_unit_range_is_rejected_before_database() {
        // A lazy pool never connects, the validation must fail first.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@localhost:1/none")
            .unwrap();
        let repo = VoteRepository::new(Arc::new(Database::from_pool(pool)));

        let err = repo
            .vote(
                &ThreadRef::Id(1),
                VoteRequest {
                    nickname: "alice".into(),
                    voice: 2,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn revote_replaces_previous_voice() {
        let db = database().await;
        let users = UserRepository::new(Arc::clone(&db));
        let forums = ForumRepository::new(Arc::clone(&db));
        let threads = ThreadRepository::new(Arc::clone(&db));
        let votes = VoteRepository::new(Arc::clone(&db));

        let voter = unique("voter");
        users.create(&voter, user_request(&voter)).await.unwrap();
        let forum = unique("forum");
        forums
            .create(CreateForumRequest {
                title: "Polls".into(),
                user: voter.clone(),
                slug: forum.clone(),
            })
            .await
            .unwrap();
        let slug = unique("poll");
        let thread = match threads
            .create(
                &forum,
                CreateThreadRequest {
                    title: "Poll".into(),
                    author: voter.clone(),
                    message: "vote!".into(),
                    slug: Some(slug.clone()),
                    created: None,
                },
            )
            .await
            .unwrap()
        {
            Insert::Created(thread) => thread,
            Insert::Existing(_) => panic!("thread should be new"),
        };
        let by_slug = ThreadRef::Slug(slug);

        let cast = |voice| VoteRequest {
            nickname: voter.clone(),
            voice,
        };

        assert_eq!(votes.vote(&by_slug, cast(1)).await.unwrap().votes, 1);
        assert_eq!(votes.vote(&by_slug, cast(-1)).await.unwrap().votes, -1);
        assert_eq!(votes.vote(&by_slug, cast(-1)).await.unwrap().votes, -1);
        assert_eq!(threads.get(&ThreadRef::Id(thread.id)).await.unwrap().votes, -1);

        let err = votes
            .vote(
                &by_slug,
                VoteRequest {
                    nickname: unique("ghost"),
                    voice: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
