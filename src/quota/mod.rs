//! Quota policy engine
//!
//! Decides whether a user may consume a metered capability (a summary
//! generation or a chat turn) under their subscription plan, and reports
//! used/limit counts for client display. The ground truth for consumption is
//! the usage ledger (`db::usage`); plan limits are an injected, immutable
//! table so tests can supply custom tiers.

mod engine;
mod plan;

pub use engine::{start_of_current_month, CapabilityCheck, FileSizeCheck, QuotaEngine};
pub use plan::{Capability, CountingWindow, PlanLimits, PlanTable, PlanTier, QuotaLimit};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure inside a ledger implementation.
///
/// Opaque on purpose: the engine decides policy over counts and must not
/// know what store backs them.
#[derive(Debug, Error)]
#[error("usage ledger error: {0}")]
pub struct LedgerError(Box<dyn std::error::Error + Send + Sync>);

impl LedgerError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// Read/append access to the usage event log.
///
/// Counting and recording are deliberately separate calls: a capability check
/// is read-only, and an event is recorded only after the gated operation has
/// succeeded. The count-then-record sequence is not transactional; two
/// concurrent requests near a quota boundary may both be admitted, which is
/// acceptable for a soft usage cap.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Count events of one capability for a user, optionally restricted to
    /// events at or after `since`.
    async fn count(
        &self,
        user_id: &str,
        capability: Capability,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, LedgerError>;

    /// Append one usage event.
    async fn record(
        &self,
        user_id: &str,
        capability: Capability,
        file_id: Option<&str>,
    ) -> Result<(), LedgerError>;
}
