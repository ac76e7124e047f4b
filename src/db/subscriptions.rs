//! Subscription persistence
//!
//! Rows are written only by the billing webhook handlers; request-serving
//! code reads them to resolve the caller's plan tier.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::quota::PlanTier;

/// Persisted subscription row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    pub status: String,
    pub plan: String,
    pub current_period_start: Option<String>,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
    pub created_at: String,
}

/// Pick the subscription that currently governs a user's plan: the most
/// recently created row with an entitling status. `None` means the free
/// plan.
pub fn select_current_subscription(rows: &[Subscription]) -> Option<&Subscription> {
    rows.iter()
        .filter(|s| matches!(s.status.as_str(), "active" | "trialing"))
        .max_by(|a, b| a.created_at.cmp(&b.created_at))
}

/// Fields updated by subscription webhook events.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub status: String,
    pub current_period_start: Option<String>,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
}

/// Subscription repository
pub struct SubscriptionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SubscriptionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, provider_customer_id, provider_subscription_id,
                   status, plan, current_period_start, current_period_end,
                   cancel_at_period_end, created_at
            FROM subscriptions
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Resolve the user's current plan tier from their subscription rows.
    pub async fn current_tier(&self, user_id: &str) -> Result<PlanTier> {
        let rows = self.list_for_user(user_id).await?;
        Ok(select_current_subscription(&rows)
            .map(|s| PlanTier::from_db(&s.plan))
            .unwrap_or(PlanTier::Free))
    }

    /// Create or update a subscription keyed by the provider's id.
    pub async fn upsert_by_provider_id(
        &self,
        provider_subscription_id: &str,
        user_id: &str,
        provider_customer_id: Option<&str>,
        plan: &str,
        update: &SubscriptionUpdate,
    ) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, provider_customer_id, provider_subscription_id,
                status, plan, current_period_start, current_period_end,
                cancel_at_period_end, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(provider_subscription_id) DO UPDATE SET
                provider_customer_id = excluded.provider_customer_id,
                status = excluded.status,
                plan = excluded.plan,
                current_period_start = excluded.current_period_start,
                current_period_end = excluded.current_period_end,
                cancel_at_period_end = excluded.cancel_at_period_end
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(provider_customer_id)
        .bind(provider_subscription_id)
        .bind(&update.status)
        .bind(plan)
        .bind(&update.current_period_start)
        .bind(&update.current_period_end)
        .bind(update.cancel_at_period_end)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Apply a subscription.updated event.
    pub async fn update_by_provider_id(
        &self,
        provider_subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = ?,
                current_period_start = ?,
                current_period_end = ?,
                cancel_at_period_end = ?
            WHERE provider_subscription_id = ?
            "#,
        )
        .bind(&update.status)
        .bind(&update.current_period_start)
        .bind(&update.current_period_end)
        .bind(update.cancel_at_period_end)
        .bind(provider_subscription_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply a subscription.canceled event.
    pub async fn cancel_by_provider_id(&self, provider_subscription_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'canceled',
                cancel_at_period_end = 0
            WHERE provider_subscription_id = ?
            "#,
        )
        .bind(provider_subscription_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, plan: &str, created_at: &str) -> Subscription {
        Subscription {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            provider_customer_id: None,
            provider_subscription_id: Some(Uuid::new_v4().to_string()),
            status: status.to_string(),
            plan: plan.to_string(),
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn no_rows_means_no_current_subscription() {
        assert!(select_current_subscription(&[]).is_none());
    }

    #[test]
    fn canceled_rows_are_ignored() {
        let rows = vec![row("canceled", "premium", "2026-08-01T00:00:00+00:00")];
        assert!(select_current_subscription(&rows).is_none());
    }

    #[test]
    fn most_recent_entitling_row_wins() {
        let rows = vec![
            row("active", "starter", "2026-06-01T00:00:00+00:00"),
            row("canceled", "premium", "2026-08-10T00:00:00+00:00"),
            row("trialing", "standard", "2026-07-01T00:00:00+00:00"),
        ];
        let current = select_current_subscription(&rows).unwrap();
        assert_eq!(current.plan, "standard");
        assert_eq!(current.status, "trialing");
    }

    #[tokio::test]
    async fn current_tier_defaults_to_free() {
        let pool = crate::db::test_pool().await;
        let repo = SubscriptionRepository::new(&pool);
        assert_eq!(repo.current_tier("u1").await.unwrap(), PlanTier::Free);
    }

    #[tokio::test]
    async fn redelivered_created_event_updates_cancel_flag() {
        let pool = crate::db::test_pool().await;
        let repo = SubscriptionRepository::new(&pool);

        repo.upsert_by_provider_id(
            "sub_1",
            "u1",
            Some("cus_1"),
            "starter",
            &SubscriptionUpdate {
                status: "active".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        repo.upsert_by_provider_id(
            "sub_1",
            "u1",
            Some("cus_2"),
            "starter",
            &SubscriptionUpdate {
                status: "active".to_string(),
                cancel_at_period_end: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let rows = repo.list_for_user("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].cancel_at_period_end);
        assert_eq!(rows[0].provider_customer_id.as_deref(), Some("cus_2"));
    }

    #[tokio::test]
    async fn upsert_then_update_then_cancel() {
        let pool = crate::db::test_pool().await;
        let repo = SubscriptionRepository::new(&pool);

        repo.upsert_by_provider_id(
            "sub_1",
            "u1",
            Some("cus_1"),
            "starter",
            &SubscriptionUpdate {
                status: "active".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.current_tier("u1").await.unwrap(), PlanTier::Starter);

        // Upsert with the same provider id does not create a second row.
        repo.upsert_by_provider_id(
            "sub_1",
            "u1",
            Some("cus_1"),
            "standard",
            &SubscriptionUpdate {
                status: "active".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let rows = repo.list_for_user("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(repo.current_tier("u1").await.unwrap(), PlanTier::Standard);

        let updated = repo
            .update_by_provider_id(
                "sub_1",
                &SubscriptionUpdate {
                    status: "past_due".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);
        assert_eq!(repo.current_tier("u1").await.unwrap(), PlanTier::Free);

        assert!(repo.cancel_by_provider_id("sub_1").await.unwrap());
        let rows = repo.list_for_user("u1").await.unwrap();
        assert_eq!(rows[0].status, "canceled");
    }
}
