//! Admit-or-deny decisions for metered capabilities

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use super::plan::{Capability, CountingWindow, PlanTable, PlanTier, QuotaLimit};
use super::{LedgerError, UsageLedger};

/// Result of a capability check.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityCheck {
    pub allowed: bool,
    pub used: u32,
    /// `None` means unlimited.
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of a file size check.
#[derive(Debug, Clone, Serialize)]
pub struct FileSizeCheck {
    pub allowed: bool,
    pub max_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Quota policy engine.
///
/// Stateless apart from the injected plan table; the ledger is passed per
/// call so the engine can be exercised against test doubles.
#[derive(Debug, Clone)]
pub struct QuotaEngine {
    plans: PlanTable,
}

impl QuotaEngine {
    pub fn new(plans: PlanTable) -> Self {
        Self { plans }
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    /// Check whether a user on `tier` may consume `capability`.
    ///
    /// Read-only: recording the consumption is a separate step taken only
    /// after the gated operation succeeds. Unlimited plans short-circuit
    /// without touching the ledger.
    pub async fn check_capability(
        &self,
        ledger: &dyn UsageLedger,
        user_id: &str,
        tier: PlanTier,
        capability: Capability,
    ) -> Result<CapabilityCheck, LedgerError> {
        let limits = self.plans.limits(tier);

        let QuotaLimit::Limited(limit) = limits.capability_limit(capability) else {
            return Ok(CapabilityCheck {
                allowed: true,
                used: 0,
                limit: None,
                message: None,
            });
        };

        let since = match limits.window {
            CountingWindow::Monthly => Some(start_of_current_month(Utc::now())),
            CountingWindow::Lifetime => None,
        };

        let used = ledger.count(user_id, capability, since).await?;
        let allowed = used < limit;

        let message = if allowed {
            None
        } else {
            Some(match limits.window {
                CountingWindow::Monthly => format!(
                    "You have reached your monthly {} limit ({limit}). Please upgrade to continue.",
                    capability.noun()
                ),
                CountingWindow::Lifetime => format!(
                    "You have reached your {} limit ({limit}). Please upgrade to continue.",
                    capability.noun()
                ),
            })
        };

        Ok(CapabilityCheck {
            allowed,
            used,
            limit: Some(limit),
            message,
        })
    }

    /// Check an upload size against the tier's maximum. No ledger access.
    pub fn check_file_size(&self, tier: PlanTier, byte_size: u64) -> FileSizeCheck {
        let max_size = self.plans.limits(tier).max_file_size;
        let allowed = byte_size <= max_size;

        FileSizeCheck {
            allowed,
            max_size,
            message: (!allowed).then(|| {
                format!(
                    "File size exceeds your plan limit ({}MB). Please upgrade to upload larger files.",
                    max_size / (1024 * 1024)
                )
            }),
        }
    }

    /// Append one usage event.
    ///
    /// Must be called exactly once per successfully completed gated
    /// operation, after it succeeds.
    pub async fn record_usage(
        &self,
        ledger: &dyn UsageLedger,
        user_id: &str,
        capability: Capability,
        file_id: Option<&str>,
    ) -> Result<(), LedgerError> {
        ledger.record(user_id, capability, file_id).await
    }
}

/// 00:00:00 UTC on the first day of `now`'s calendar month.
pub fn start_of_current_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first of the month is a valid timestamp")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;

    /// In-memory ledger that counts how often it is queried.
    #[derive(Default)]
    struct MockLedger {
        events: Mutex<Vec<(String, Capability, DateTime<Utc>)>>,
        count_calls: AtomicUsize,
    }

    impl MockLedger {
        fn with_events(events: Vec<(&str, Capability, DateTime<Utc>)>) -> Self {
            Self {
                events: Mutex::new(
                    events
                        .into_iter()
                        .map(|(u, c, t)| (u.to_string(), c, t))
                        .collect(),
                ),
                count_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UsageLedger for MockLedger {
        async fn count(
            &self,
            user_id: &str,
            capability: Capability,
            since: Option<DateTime<Utc>>,
        ) -> Result<u32, LedgerError> {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .filter(|(u, c, t)| {
                    u == user_id && *c == capability && since.map_or(true, |s| *t >= s)
                })
                .count() as u32)
        }

        async fn record(
            &self,
            user_id: &str,
            capability: Capability,
            _file_id: Option<&str>,
        ) -> Result<(), LedgerError> {
            self.events
                .lock()
                .unwrap()
                .push((user_id.to_string(), capability, Utc::now()));
            Ok(())
        }
    }

    fn engine() -> QuotaEngine {
        QuotaEngine::new(PlanTable::production())
    }

    #[tokio::test]
    async fn free_tier_first_summary_allowed_then_denied() {
        // 0 prior events -> allowed; after recording -> denied with
        // used=1, limit=1.
        let ledger = MockLedger::default();
        let engine = engine();

        let check = engine
            .check_capability(&ledger, "u1", PlanTier::Free, Capability::Summary)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.used, 0);
        assert_eq!(check.limit, Some(1));

        engine
            .record_usage(&ledger, "u1", Capability::Summary, None)
            .await
            .unwrap();

        let check = engine
            .check_capability(&ledger, "u1", PlanTier::Free, Capability::Summary)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.used, 1);
        assert_eq!(check.limit, Some(1));
        let message = check.message.unwrap();
        assert!(message.contains("limit (1)"));
        assert!(!message.contains("monthly"));
    }

    #[tokio::test]
    async fn unlimited_tier_never_queries_the_ledger() {
        let ledger = MockLedger::default();
        let engine = engine();

        let check = engine
            .check_capability(&ledger, "u1", PlanTier::Premium, Capability::Summary)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.used, 0);
        assert_eq!(check.limit, None);
        assert_eq!(ledger.count_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn monthly_window_ignores_last_months_events() {
        // A starter-tier user with 5 summaries dated last month and none
        // this month is allowed again.
        let last_month = start_of_current_month(Utc::now()) - Duration::hours(1);
        let ledger = MockLedger::with_events(
            (0..5)
                .map(|_| ("u1", Capability::Summary, last_month))
                .collect(),
        );
        let engine = engine();

        let check = engine
            .check_capability(&ledger, "u1", PlanTier::Starter, Capability::Summary)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.used, 0);
        assert_eq!(check.limit, Some(10));
    }

    #[tokio::test]
    async fn monthly_window_counts_this_months_events() {
        let now = Utc::now();
        let mut events: Vec<(&str, Capability, DateTime<Utc>)> =
            (0..10).map(|_| ("u1", Capability::Summary, now)).collect();
        // A different capability and a different user must not count.
        events.push(("u1", Capability::Chat, now));
        events.push(("u2", Capability::Summary, now));
        let ledger = MockLedger::with_events(events);
        let engine = engine();

        let check = engine
            .check_capability(&ledger, "u1", PlanTier::Starter, Capability::Summary)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.used, 10);
        assert!(check.message.unwrap().contains("monthly"));
    }

    #[tokio::test]
    async fn denial_is_idempotent_without_recording() {
        let ledger = MockLedger::with_events(vec![
            ("u1", Capability::Chat, Utc::now()),
            ("u1", Capability::Chat, Utc::now()),
            ("u1", Capability::Chat, Utc::now()),
        ]);
        let engine = engine();

        for _ in 0..3 {
            let check = engine
                .check_capability(&ledger, "u1", PlanTier::Free, Capability::Chat)
                .await
                .unwrap();
            assert!(!check.allowed);
            assert_eq!(check.used, 3);
            assert_eq!(check.limit, Some(3));
        }
    }

    #[tokio::test]
    async fn record_then_check_reflects_increment() {
        let ledger = MockLedger::default();
        let engine = engine();

        for expected in 0..3u32 {
            let check = engine
                .check_capability(&ledger, "u1", PlanTier::Free, Capability::Chat)
                .await
                .unwrap();
            assert_eq!(check.used, expected);
            engine
                .record_usage(&ledger, "u1", Capability::Chat, Some("f1"))
                .await
                .unwrap();
        }
    }

    #[test]
    fn file_size_check_boundaries() {
        let engine = engine();
        let max = 50 * 1024 * 1024;

        let at_limit = engine.check_file_size(PlanTier::Free, max);
        assert!(at_limit.allowed);
        assert!(at_limit.message.is_none());

        let over = engine.check_file_size(PlanTier::Free, max + 1);
        assert!(!over.allowed);
        assert_eq!(over.max_size, max);
        assert!(over.message.unwrap().contains("50MB"));
    }

    #[test]
    fn month_start_is_midnight_of_day_one() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 17, 45, 12).unwrap();
        let start = start_of_current_month(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }
}
