use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::forum::find_forum;
use super::user::find_user;
use super::Insert;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{
    non_empty, CreateThreadRequest, Post, PostSort, Thread, ThreadPostsQuery, ThreadRef,
    UpdateThreadRequest,
};
use crate::storage::database::Database;

const THREAD_COLUMNS: &str = "id, title, author, forum, message, votes, slug, created";
const POST_SELECT: &str =
    "SELECT id, parent, author, message, is_edited, forum, thread, created FROM posts";

pub struct ThreadRepository {
    db: Arc<Database>,
}

impl ThreadRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a thread in the forum named by `forum_slug`.
    pub async fn create(
        &self,
        forum_slug: &str,
        request: CreateThreadRequest,
    ) -> AppResult<Insert<Thread>> {
        let pool = self.db.pool();
        let author = find_user(pool, &request.author).await?;
        let forum = find_forum(pool, forum_slug).await?;
        let slug = non_empty(request.slug);
        let created = request.created.unwrap_or_else(Utc::now);

        let inserted = sqlx::query_as::<_, Thread>(&format!(
            r#"
            INSERT INTO threads (title, author, forum, message, slug, created)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slug) DO NOTHING
            RETURNING {}
            "#,
            THREAD_COLUMNS
        ))
        .bind(&request.title)
        .bind(&author.nickname)
        .bind(&forum.slug)
        .bind(&request.message)
        .bind(&slug)
        .bind(created)
        .fetch_optional(pool)
        .await?;

        match (inserted, slug) {
            (Some(thread), _) => Ok(Insert::Created(thread)),
            (None, Some(slug)) => {
                debug!(%slug, "thread already exists");
                let existing = find_thread(pool, &ThreadRef::Slug(slug)).await?;
                Ok(Insert::Existing(existing))
            }
            (None, None) => Err(AppError::Internal(
                "thread insert without slug returned no row".to_string(),
            )),
        }
    }

    pub async fn get(&self, thread: &ThreadRef) -> AppResult<Thread> {
        find_thread(self.db.pool(), thread).await
    }

    /// Absent or empty fields keep their stored value.
    pub async fn update(
        &self,
        thread: &ThreadRef,
        request: UpdateThreadRequest,
    ) -> AppResult<Thread> {
        let current = find_thread(self.db.pool(), thread).await?;
        let title = non_empty(request.title);
        let message = non_empty(request.message);
        if title.is_none() && message.is_none() {
            return Ok(current);
        }

        let updated = sqlx::query_as::<_, Thread>(&format!(
            r#"
            UPDATE threads SET
                title = COALESCE($2, title),
                message = COALESCE($3, message)
            WHERE id = $1
            RETURNING {}
            "#,
            THREAD_COLUMNS
        ))
        .bind(current.id)
        .bind(title)
        .bind(message)
        .fetch_one(self.db.pool())
        .await?;
        Ok(updated)
    }

    /// One page of the thread's posts in the requested order.
    pub async fn posts(&self, thread: &ThreadRef, query: ThreadPostsQuery) -> AppResult<Vec<Post>> {
        let thread = find_thread(self.db.pool(), thread).await?;
        let since = query.cursor();
        let sql = thread_posts_sql(query.sort, query.desc, since.is_some());

        let mut posts = sqlx::query_as::<_, Post>(&sql)
            .bind(thread.id)
            .bind(query.limit.max(0));
        if let Some(since) = since {
            posts = posts.bind(since);
        }

        Ok(posts.fetch_all(self.db.pool()).await?)
    }
}

pub(crate) async fn find_thread(pool: &PgPool, thread: &ThreadRef) -> AppResult<Thread> {
    let found = match thread {
        ThreadRef::Id(id) => {
            sqlx::query_as::<_, Thread>(&format!(
                "SELECT {} FROM threads WHERE id = $1",
                THREAD_COLUMNS
            ))
            .bind(*id)
            .fetch_optional(pool)
            .await?
        }
        ThreadRef::Slug(slug) => {
            sqlx::query_as::<_, Thread>(&format!(
                "SELECT {} FROM threads WHERE slug = $1::citext",
                THREAD_COLUMNS
            ))
            .bind(slug)
            .fetch_optional(pool)
            .await?
        }
    };

    found.ok_or_else(|| AppError::NotFound(format!("Can't find thread by slug or id: {}", thread)))
}

/// SQL for one page of thread posts. Binds: `$1` thread id, `$2` limit,
/// `$3` the `since` post id when `with_since` is set.
///
/// Tree orders rely on `path`, the ancestor ids of a post followed by its
/// own id, so lexicographic path order is depth-first order. Parent-tree
/// pages count root posts: `$2` limits the roots and every descendant of a
/// selected root comes along.
pub(crate) fn thread_posts_sql(sort: PostSort, desc: bool, with_since: bool) -> String {
    let (cmp, dir) = if desc { ("<", " DESC") } else { (">", "") };

    match sort {
        PostSort::Flat => {
            let since = if with_since {
                format!(" AND id {} $3", cmp)
            } else {
                String::new()
            };
            format!(
                "{} WHERE thread = $1{} ORDER BY created{dir}, id{dir} LIMIT $2",
                POST_SELECT,
                since,
                dir = dir
            )
        }
        PostSort::Tree => {
            let since = if with_since {
                format!(" AND path {} (SELECT path FROM posts WHERE id = $3)", cmp)
            } else {
                String::new()
            };
            format!(
                "{} WHERE thread = $1{} ORDER BY path{} LIMIT $2",
                POST_SELECT, since, dir
            )
        }
        PostSort::ParentTree => {
            let since = if with_since {
                format!(" AND id {} (SELECT path[1] FROM posts WHERE id = $3)", cmp)
            } else {
                String::new()
            };
            let order = if desc { "path[1] DESC, path" } else { "path" };
            format!(
                "{} WHERE path[1] IN (SELECT id FROM posts WHERE thread = $1 AND parent = 0{} ORDER BY id{} LIMIT $2) ORDER BY {}",
                POST_SELECT, since, dir, order
            )
        }
    }
}
