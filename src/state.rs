//! Shared application state

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::ai::CompletionBackend;
use crate::auth::IdentityProvider;
use crate::billing::CheckoutProvider;
use crate::config::Config;
use crate::db::SqliteUsageLedger;
use crate::quota::{PlanTable, QuotaEngine};
use crate::storage::FileStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    file_store: FileStore,
    backend: Arc<dyn CompletionBackend>,
    identity: Arc<dyn IdentityProvider>,
    checkout: Arc<dyn CheckoutProvider>,
    quota: QuotaEngine,
    ledger: SqliteUsageLedger,
}

impl AppState {
    pub fn new(
        config: Config,
        db: SqlitePool,
        file_store: FileStore,
        backend: Arc<dyn CompletionBackend>,
        identity: Arc<dyn IdentityProvider>,
        checkout: Arc<dyn CheckoutProvider>,
    ) -> Self {
        let ledger = SqliteUsageLedger::new(db.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                file_store,
                backend,
                identity,
                checkout,
                quota: QuotaEngine::new(PlanTable::production()),
                ledger,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn file_store(&self) -> &FileStore {
        &self.inner.file_store
    }

    pub fn backend(&self) -> &dyn CompletionBackend {
        self.inner.backend.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    pub fn checkout(&self) -> &dyn CheckoutProvider {
        self.inner.checkout.as_ref()
    }

    pub fn quota(&self) -> &QuotaEngine {
        &self.inner.quota
    }

    pub fn ledger(&self) -> &SqliteUsageLedger {
        &self.inner.ledger
    }
}
