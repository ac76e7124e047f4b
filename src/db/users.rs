//! User account persistence

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::Identity;
use crate::error::Result;

/// Persisted user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, avatar_url, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, avatar_url, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Look up the account for an authenticated identity, creating it on
    /// first contact. Accounts are keyed by email; the display name defaults
    /// to the local part of the address.
    ///
    /// Insert-or-ignore keeps concurrent first requests from the same user
    /// race-free: whichever insert lands first wins, the other is a no-op
    /// and both fetch the same row.
    pub async fn find_or_create(&self, identity: &Identity) -> Result<User> {
        let name = identity
            .name
            .clone()
            .or_else(|| identity.email.split('@').next().map(|s| s.to_string()));

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, avatar_url)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(&identity.external_id)
        .bind(&identity.email)
        .bind(&name)
        .bind(&identity.avatar_url)
        .execute(self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(email = %identity.email, "created user account");
        }

        self.find_by_email(&identity.email)
            .await?
            .ok_or_else(|| crate::error::AppError::Internal("failed to fetch created user".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn identity(email: &str) -> Identity {
        Identity {
            external_id: format!("ext-{email}"),
            email: email.to_string(),
            name: None,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn find_or_create_materializes_lazily() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);

        assert!(repo.find_by_email("a@example.com").await.unwrap().is_none());

        let user = repo.find_or_create(&identity("a@example.com")).await.unwrap();
        assert_eq!(user.email, "a@example.com");
        // Name defaults to the local part of the email.
        assert_eq!(user.name.as_deref(), Some("a"));

        // Second resolution returns the same row, no duplicate.
        let again = repo.find_or_create(&identity("a@example.com")).await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn losing_insert_for_the_same_email_returns_the_existing_row() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);

        let first = repo.find_or_create(&identity("c@example.com")).await.unwrap();

        // Same email arriving under a different external id, as happens when
        // two first requests race: the insert is a no-op, not an error.
        let mut late = identity("c@example.com");
        late.external_id = "ext-other".to_string();
        let second = repo.find_or_create(&late).await.unwrap();

        assert_eq!(second.id, first.id);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn provided_name_wins_over_default() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);

        let mut id = identity("b@example.com");
        id.name = Some("Bea".to_string());
        let user = repo.find_or_create(&id).await.unwrap();
        assert_eq!(user.name.as_deref(), Some("Bea"));
    }
}
