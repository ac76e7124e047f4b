//! Plan tiers and their limits

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const MB: u64 = 1024 * 1024;

/// A metered action type.
///
/// Shared by the ledger, the limits table and the recording call so that an
/// invalid capability is a compile error rather than a silently miscounted
/// string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Summary,
    Chat,
}

impl Capability {
    /// Stable string form used as the database discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Summary => "summary",
            Capability::Chat => "chat",
        }
    }

    /// Human-readable noun for denial messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Capability::Summary => "summary",
            Capability::Chat => "chat",
        }
    }
}

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Starter,
    Standard,
    Premium,
}

impl PlanTier {
    /// Parse a tier from its persisted string form.
    ///
    /// An unrecognized tier falls back to `Free` so a stale or garbled
    /// subscription row never grants more than the free plan.
    pub fn from_db(value: &str) -> Self {
        match value {
            "starter" => PlanTier::Starter,
            "standard" => PlanTier::Standard,
            "premium" => PlanTier::Premium,
            _ => PlanTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Standard => "standard",
            PlanTier::Premium => "premium",
        }
    }
}

/// A per-capability quota, either a finite count or unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLimit {
    Limited(u32),
    Unlimited,
}

impl QuotaLimit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, QuotaLimit::Unlimited)
    }

    /// Finite value, or `None` for unlimited (serialized as JSON null).
    pub fn value(&self) -> Option<u32> {
        match self {
            QuotaLimit::Limited(n) => Some(*n),
            QuotaLimit::Unlimited => None,
        }
    }
}

/// The time range over which usage events are summed for quota purposes.
///
/// This is an explicit attribute of the plan, never inferred from the tier
/// name, so adding a new tier cannot silently pick the wrong window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingWindow {
    /// All events ever recorded for the user count.
    Lifetime,
    /// Only events since the first of the current calendar month count.
    Monthly,
}

/// Limits attached to one plan tier.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub max_file_size: u64,
    pub max_summaries: QuotaLimit,
    pub max_chats: QuotaLimit,
    pub window: CountingWindow,
}

impl PlanLimits {
    pub fn capability_limit(&self, capability: Capability) -> QuotaLimit {
        match capability {
            Capability::Summary => self.max_summaries,
            Capability::Chat => self.max_chats,
        }
    }
}

/// Immutable tier → limits table.
#[derive(Debug, Clone)]
pub struct PlanTable {
    limits: HashMap<PlanTier, PlanLimits>,
}

impl PlanTable {
    pub fn new(limits: HashMap<PlanTier, PlanLimits>) -> Self {
        Self { limits }
    }

    /// The production plan catalog.
    pub fn production() -> Self {
        let mut limits = HashMap::new();
        limits.insert(
            PlanTier::Free,
            PlanLimits {
                max_file_size: 50 * MB,
                max_summaries: QuotaLimit::Limited(1),
                max_chats: QuotaLimit::Limited(3),
                window: CountingWindow::Lifetime,
            },
        );
        limits.insert(
            PlanTier::Starter,
            PlanLimits {
                max_file_size: 100 * MB,
                max_summaries: QuotaLimit::Limited(10),
                max_chats: QuotaLimit::Limited(50),
                window: CountingWindow::Monthly,
            },
        );
        limits.insert(
            PlanTier::Standard,
            PlanLimits {
                max_file_size: 200 * MB,
                max_summaries: QuotaLimit::Unlimited,
                max_chats: QuotaLimit::Unlimited,
                window: CountingWindow::Monthly,
            },
        );
        limits.insert(
            PlanTier::Premium,
            PlanLimits {
                max_file_size: 500 * MB,
                max_summaries: QuotaLimit::Unlimited,
                max_chats: QuotaLimit::Unlimited,
                window: CountingWindow::Monthly,
            },
        );
        Self { limits }
    }

    /// Limits for a tier, falling back to the free tier's limits if the tier
    /// has no row.
    pub fn limits(&self, tier: PlanTier) -> PlanLimits {
        self.limits
            .get(&tier)
            .or_else(|| self.limits.get(&PlanTier::Free))
            .copied()
            .unwrap_or(PlanLimits {
                max_file_size: 0,
                max_summaries: QuotaLimit::Limited(0),
                max_chats: QuotaLimit::Limited(0),
                window: CountingWindow::Lifetime,
            })
    }

    /// Largest file size any tier admits, used for the HTTP body limit.
    pub fn max_file_size_any_tier(&self) -> u64 {
        self.limits
            .values()
            .map(|l| l.max_file_size)
            .max()
            .unwrap_or(0)
    }
}

impl Default for PlanTable {
    fn default() -> Self {
        Self::production()
    }
}
