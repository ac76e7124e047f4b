//! Payment audit log

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Payment repository
pub struct PaymentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PaymentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        provider_payment_id: Option<&str>,
        provider_checkout_id: Option<&str>,
        amount: f64,
        currency: &str,
        status: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, provider_payment_id, provider_checkout_id, amount, currency, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(provider_payment_id)
        .bind(provider_checkout_id)
        .bind(amount)
        .bind(currency)
        .bind(status)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
