use chrono::{SubsecRound, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::forum::find_forum;
use super::thread::find_thread;
use super::user::{find_user, user_not_found};
use crate::core::error::{AppError, AppResult};
use crate::core::types::{
    non_empty, CreatePostRequest, Post, PostDetails, Related, ThreadRef, UpdatePostRequest,
};
use crate::storage::database::Database;

const POST_COLUMNS: &str = "id, parent, author, message, is_edited, forum, thread, created";

pub struct PostRepository {
    db: Arc<Database>,
}

impl PostRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a batch of posts in one thread. Every post of the batch gets
    /// the same `created` timestamp; the result keeps request order.
    pub async fn create(
        &self,
        thread: &ThreadRef,
        requests: Vec<CreatePostRequest>,
    ) -> AppResult<Vec<Post>> {
        let pool = self.db.pool();
        let thread = find_thread(pool, thread).await?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        check_parents(pool, thread.id, &requests).await?;
        let authors = canonical_authors(pool, &requests).await?;

        let mut parents = Vec::with_capacity(requests.len());
        let mut nicknames = Vec::with_capacity(requests.len());
        let mut messages = Vec::with_capacity(requests.len());
        for request in requests {
            let author = authors
                .get(&request.author)
                .cloned()
                .ok_or_else(|| user_not_found(&request.author))?;
            parents.push(request.parent);
            nicknames.push(author);
            messages.push(request.message);
        }

        let created = Utc::now().trunc_subsecs(3);
        let mut posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (parent, author, message, forum, thread, created)
            SELECT p.parent, p.author, p.message, $4, $5, $6
            FROM UNNEST($1::bigint[], $2::citext[], $3::text[]) WITH ORDINALITY
                AS p(parent, author, message, n)
            ORDER BY p.n
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(&parents)
        .bind(&nicknames)
        .bind(&messages)
        .bind(&thread.forum)
        .bind(thread.id)
        .bind(created)
        .fetch_all(pool)
        .await?;

        // Ids are handed out in insertion order.
        posts.sort_by_key(|post| post.id);
        debug!(thread = thread.id, count = posts.len(), "posts created");
        Ok(posts)
    }

    pub async fn get(&self, id: i64, related: &[Related]) -> AppResult<PostDetails> {
        let pool = self.db.pool();
        let post = find_post(pool, id).await?;

        let mut details = PostDetails {
            post,
            author: None,
            thread: None,
            forum: None,
        };
        for item in related {
            match item {
                Related::User => {
                    details.author = Some(find_user(pool, &details.post.author).await?);
                }
                Related::Thread => {
                    let thread = ThreadRef::Id(details.post.thread);
                    details.thread = Some(find_thread(pool, &thread).await?);
                }
                Related::Forum => {
                    details.forum = Some(find_forum(pool, &details.post.forum).await?);
                }
            }
        }
        Ok(details)
    }

    /// Replaces the message and marks the post edited, unless the new
    /// message is absent, empty or identical.
    pub async fn update(&self, id: i64, request: UpdatePostRequest) -> AppResult<Post> {
        let current = find_post(self.db.pool(), id).await?;
        let message = match non_empty(request.message) {
            Some(message) if message != current.message => message,
            _ => return Ok(current),
        };

        let updated = sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET message = $2, is_edited = TRUE WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        ))
        .bind(id)
        .bind(message)
        .fetch_one(self.db.pool())
        .await?;
        Ok(updated)
    }
}

async fn find_post(pool: &PgPool, id: i64) -> AppResult<Post> {
    sqlx::query_as::<_, Post>(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Can't find post with id: {}", id)))
}

/// Every non-root parent must be a post of the same thread.
async fn check_parents(pool: &PgPool, thread: i32, requests: &[CreatePostRequest]) -> AppResult<()> {
    let mut parents: Vec<i64> = requests
        .iter()
        .map(|r| r.parent)
        .filter(|&parent| parent != 0)
        .collect();
    parents.sort_unstable();
    parents.dedup();
    if parents.is_empty() {
        return Ok(());
    }

    let (found,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM posts WHERE thread = $1 AND id = ANY($2)")
            .bind(thread)
            .bind(&parents)
            .fetch_one(pool)
            .await?;

    if found as usize != parents.len() {
        return Err(AppError::Conflict(
            "Parent post was created in another thread".to_string(),
        ));
    }
    Ok(())
}

/// Maps each requested nickname, as spelled in the request, to the stored
/// spelling. Matching happens in the database so it follows citext rules.
async fn canonical_authors(
    pool: &PgPool,
    requests: &[CreatePostRequest],
) -> AppResult<HashMap<String, String>> {
    let mut wanted: Vec<String> = requests.iter().map(|r| r.author.clone()).collect();
    wanted.sort_unstable();
    wanted.dedup();

    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT w.requested::text, u.nickname::text
        FROM UNNEST($1::text[]) AS w(requested)
        JOIN users u ON u.nickname = w.requested::citext
        "#,
    )
    .bind(&wanted)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
