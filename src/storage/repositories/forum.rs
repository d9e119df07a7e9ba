use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::debug;

use super::user::find_user;
use super::Insert;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{CreateForumRequest, Forum, ForumThreadsQuery, ForumUsersQuery, Thread, User};
use crate::storage::database::Database;

pub struct ForumRepository {
    db: Arc<Database>,
}

impl ForumRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a forum owned by an existing user.
    pub async fn create(&self, request: CreateForumRequest) -> AppResult<Insert<Forum>> {
        let owner = find_user(self.db.pool(), &request.user).await?;

        let created = sqlx::query_as::<_, Forum>(
            r#"
            INSERT INTO forums (slug, title, "user")
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO NOTHING
            RETURNING title, "user", slug, posts, threads
            "#,
        )
        .bind(&request.slug)
        .bind(&request.title)
        .bind(&owner.nickname)
        .fetch_optional(self.db.pool())
        .await?;

        match created {
            Some(forum) => Ok(Insert::Created(forum)),
            None => {
                debug!(slug = %request.slug, "forum already exists");
                Ok(Insert::Existing(find_forum(self.db.pool(), &request.slug).await?))
            }
        }
    }

    pub async fn get(&self, slug: &str) -> AppResult<Forum> {
        find_forum(self.db.pool(), slug).await
    }

    /// Users who wrote a thread or post in the forum, ordered by nickname.
    pub async fn users(&self, slug: &str, query: ForumUsersQuery) -> AppResult<Vec<User>> {
        let forum = find_forum(self.db.pool(), slug).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT u.nickname, u.fullname, u.about, u.email
            FROM forum_users fu
            JOIN users u ON u.nickname = fu.nickname
            WHERE fu.forum = "#,
        );
        qb.push_bind(forum.slug).push("::citext");

        if let Some(since) = query.since {
            qb.push(if query.desc {
                " AND fu.nickname < "
            } else {
                " AND fu.nickname > "
            });
            qb.push_bind(since).push("::citext");
        }

        qb.push(if query.desc {
            " ORDER BY u.nickname DESC"
        } else {
            " ORDER BY u.nickname"
        });
        qb.push(" LIMIT ").push_bind(query.limit.max(0));

        let users = qb
            .build_query_as::<User>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(users)
    }

    /// Threads of the forum ordered by creation time; `since` is inclusive.
    pub async fn threads(&self, slug: &str, query: ForumThreadsQuery) -> AppResult<Vec<Thread>> {
        let forum = find_forum(self.db.pool(), slug).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT id, title, author, forum, message, votes, slug, created
            FROM threads
            WHERE forum = "#,
        );
        qb.push_bind(forum.slug).push("::citext");

        if let Some(since) = query.since {
            qb.push(if query.desc {
                " AND created <= "
            } else {
                " AND created >= "
            });
            qb.push_bind(since);
        }

        qb.push(if query.desc {
            " ORDER BY created DESC, id DESC"
        } else {
            " ORDER BY created, id"
        });
        qb.push(" LIMIT ").push_bind(query.limit.max(0));

        let threads = qb
            .build_query_as::<Thread>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(threads)
    }
}

pub(crate) async fn find_forum(pool: &PgPool, slug: &str) -> AppResult<Forum> {
    sqlx::query_as::<_, Forum>(
        r#"SELECT title, "user", slug, posts, threads FROM forums WHERE slug = $1::citext"#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Can't find forum with slug: {}", slug)))
}
