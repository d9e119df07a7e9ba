use std::sync::Arc;
use tracing::info;

use crate::core::error::AppResult;
use crate::core::types::ServiceStatus;
use crate::storage::database::Database;

pub struct ServiceRepository {
    db: Arc<Database>,
}

impl ServiceRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn status(&self) -> AppResult<ServiceStatus> {
        let status = sqlx::query_as::<_, ServiceStatus>(
            r#"
            SELECT
                (SELECT count(*) FROM users) AS "user",
                (SELECT count(*) FROM forums) AS forum,
                (SELECT count(*) FROM threads) AS thread,
                (SELECT count(*) FROM posts) AS post
            "#,
        )
        .fetch_one(self.db.pool())
        .await?;
        Ok(status)
    }

    /// Drops every row of every table.
    pub async fn clear(&self) -> AppResult<()> {
        sqlx::query(
            "TRUNCATE TABLE votes, forum_users, posts, threads, forums, users RESTART IDENTITY CASCADE",
        )
        .execute(self.db.pool())
        .await?;
        info!("all tables cleared");
        Ok(())
    }
}
