use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::Insert;
use crate::core::error::{conflict_on_unique, AppError, AppResult};
use crate::core::types::{non_empty, CreateUserRequest, UpdateUserRequest, User};
use crate::storage::database::Database;

pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a user. When the nickname or email is taken, every user
    /// holding either one is returned instead.
    pub async fn create(
        &self,
        nickname: &str,
        request: CreateUserRequest,
    ) -> AppResult<Insert<User, Vec<User>>> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (nickname, fullname, about, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING nickname, fullname, about, email
            "#,
        )
        .bind(nickname)
        .bind(&request.fullname)
        .bind(&request.about)
        .bind(&request.email)
        .fetch_optional(self.db.pool())
        .await?;

        if let Some(user) = created {
            return Ok(Insert::Created(user));
        }

        debug!(nickname, email = %request.email, "user already exists");
        let existing = sqlx::query_as::<_, User>(
            r#"
            SELECT nickname, fullname, about, email
            FROM users
            WHERE nickname = $1::citext OR email = $2::citext
            ORDER BY nickname
            "#,
        )
        .bind(nickname)
        .bind(&request.email)
        .fetch_all(self.db.pool())
        .await?;

        Ok(Insert::Existing(existing))
    }

    pub async fn get(&self, nickname: &str) -> AppResult<User> {
        find_user(self.db.pool(), nickname).await
    }

    /// Absent or empty fields keep their stored value.
    pub async fn update(&self, nickname: &str, request: UpdateUserRequest) -> AppResult<User> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                fullname = COALESCE($2, fullname),
                about = COALESCE($3, about),
                email = COALESCE($4::citext, email)
            WHERE nickname = $1::citext
            RETURNING nickname, fullname, about, email
            "#,
        )
        .bind(nickname)
        .bind(non_empty(request.fullname))
        .bind(non_empty(request.about))
        .bind(non_empty(request.email))
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "This email is already registered by another user"))?;

        updated.ok_or_else(|| user_not_found(nickname))
    }
}

pub(crate) async fn find_user(pool: &PgPool, nickname: &str) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "SELECT nickname, fullname, about, email FROM users WHERE nickname = $1::citext",
    )
    .bind(nickname)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| user_not_found(nickname))
}

pub(crate) fn user_not_found(nickname: &str) -> AppError {
    AppError::NotFound(format!("Can't find user by nickname: {}", nickname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::testing::{database, unique, user_request};

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_nickname_or_email_returns_all_holders() {
        let repo = UserRepository::new(database().await);
        let first = unique("alice");
        let second = unique("bob");

        match repo.create(&first, user_request(&first)).await.unwrap() {
            Insert::Created(user) => assert_eq!(user, {
                let request = user_request(&first);
                User {
                    nickname: first.clone(),
                    fullname: request.fullname,
                    about: request.about,
                    email: request.email,
                }
            }),
            Insert::Existing(_) => panic!("user should be new"),
        }
        repo.create(&second, user_request(&second)).await.unwrap();

        // Nickname of the first, email of the second.
        let mut clash = user_request(&first.to_uppercase());
        clash.email = user_request(&second).email;
        let outcome = repo.create(&first.to_uppercase(), clash).await.unwrap();

        match outcome {
            Insert::Existing(users) => {
                let mut nicknames: Vec<_> = users.into_iter().map(|u| u.nickname).collect();
                nicknames.sort();
                let mut expected = vec![first, second];
                expected.sort();
                assert_eq!(nicknames, expected);
            }
            Insert::Created(_) => panic!("expected a conflict"),
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn update_keeps_absent_fields_and_rejects_taken_email() {
        let repo = UserRepository::new(database().await);
        let first = unique("carol");
        let second = unique("dave");
        repo.create(&first, user_request(&first)).await.unwrap();
        repo.create(&second, user_request(&second)).await.unwrap();

        let updated = repo
            .update(
                &first,
                UpdateUserRequest {
                    about: Some("sailor".into()),
                    fullname: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.about, "sailor");
        assert_eq!(updated.fullname, user_request(&first).fullname);

        let err = repo
            .update(
                &first,
                UpdateUserRequest {
                    email: Some(user_request(&second).email),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = repo.get(&unique("nobody")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
