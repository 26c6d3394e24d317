use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use fleetdesk::error::AppError;
use fleetdesk::store::MemoryStore;
use fleetdesk::workflows::access::{seed_access_control, AccessControlService, AccessSeed, NewAdmin};
use fleetdesk::workflows::matching::MatchingService;
use fleetdesk::workflows::verification::{VerificationConfig, VerificationService};
use metrics_exporter_prometheus::PrometheusHandle;

pub(crate) const BOOTSTRAP_ADMIN_NAME: &str = "Fleet Desk Root";
pub(crate) const BOOTSTRAP_ADMIN_EMAIL: &str = "root@fleetdesk.local";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every workflow service wired to one in-memory store.
pub(crate) struct Backoffice {
    pub(crate) access: Arc<AccessControlService<MemoryStore>>,
    pub(crate) verification: Arc<VerificationService<MemoryStore>>,
    pub(crate) matching: Arc<MatchingService<MemoryStore>>,
    pub(crate) seed: AccessSeed,
}

impl Backoffice {
    /// Build the services and install the default roles plus the bootstrap admin.
    pub(crate) fn bootstrap(config: VerificationConfig) -> Result<Self, AppError> {
        let store = Arc::new(MemoryStore::new());
        let access = Arc::new(AccessControlService::new(store.clone()));
        let seed = seed_access_control(&access, bootstrap_admin())?;
        let verification = Arc::new(VerificationService::new(
            store.clone(),
            access.clone(),
            config,
        ));
        let matching = Arc::new(MatchingService::new(store, access.clone()));
        Ok(Self {
            access,
            verification,
            matching,
            seed,
        })
    }
}

pub(crate) fn bootstrap_admin() -> NewAdmin {
    NewAdmin {
        name: BOOTSTRAP_ADMIN_NAME.to_string(),
        email: BOOTSTRAP_ADMIN_EMAIL.to_string(),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
