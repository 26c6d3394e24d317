use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::domain::{
    BulkUpdate, CheckId, CheckKind, CheckStatus, Company, CompanyId, CompanyRegistration,
    Document, DocumentId, DocumentStatus, Driver, DriverId, DriverRegistration, DriverStatus,
    IdentityCheck, KycStatus, NewDocument, PurgeReport, ReviewTrail, TransitionOutcome,
    VerificationStatus,
};
use super::repository::VerificationStore;
use super::transitions::{self, Review};
use crate::clock::{Clock, SystemClock};
use crate::query::{CompareOp, Filter, Page, Query, SortKey, Trashed};
use crate::store::{join_ids, Repository, RepositoryError};
use crate::workflows::access::{permissions, AdminId, Authorizer};
use crate::workflows::{DomainError, Violations};

pub const DEFAULT_BULK_LIMIT: usize = 200;

/// Tunables for the verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationConfig {
    /// Maximum number of distinct ids accepted by one bulk status update.
    pub bulk_limit: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            bulk_limit: DEFAULT_BULK_LIMIT,
        }
    }
}

/// Driver, company, document and identity-check verification.
///
/// Every mutating call names the acting admin and is checked against the
/// [`Authorizer`] before anything is written.
pub struct VerificationService<S> {
    store: Arc<S>,
    gate: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    config: VerificationConfig,
}

impl<S> VerificationService<S>
where
    S: VerificationStore + 'static,
{
    pub fn new(store: Arc<S>, gate: Arc<dyn Authorizer>, config: VerificationConfig) -> Self {
        Self::with_clock(store, gate, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<S>,
        gate: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            store,
            gate,
            clock,
            config,
        }
    }

    pub fn config(&self) -> VerificationConfig {
        self.config
    }

    pub fn register_driver(&self, registration: DriverRegistration) -> Result<Driver, DomainError> {
        registration.validate().finish()?;
        let driver = Driver::register(registration, self.clock.now());
        let stored = self
            .store
            .drivers()
            .insert(driver)
            .map_err(email_taken)?;
        info!(driver_id = %stored.id, "driver registered");
        Ok(stored)
    }

    pub fn register_company(
        &self,
        registration: CompanyRegistration,
    ) -> Result<Company, DomainError> {
        registration.validate().finish()?;
        let company = Company::register(registration, self.clock.now());
        let stored = self
            .store
            .companies()
            .insert(company)
            .map_err(email_taken)?;
        info!(company_id = %stored.id, "company registered");
        Ok(stored)
    }

    /// A driver that exists and is not trashed.
    pub fn driver(&self, driver_id: DriverId) -> Result<Driver, DomainError> {
        match self.store.drivers().fetch(driver_id)? {
            Some(driver) if !driver.is_trashed() => Ok(driver),
            _ => Err(driver_not_found(driver_id)),
        }
    }

    pub fn company(&self, company_id: CompanyId) -> Result<Company, DomainError> {
        self.store
            .companies()
            .fetch(company_id)?
            .ok_or_else(|| DomainError::not_found(format!("company {company_id} not found")))
    }

    pub fn search_drivers(&self, query: &Query) -> Result<Page<Driver>, DomainError> {
        Ok(self.store.drivers().find(query)?)
    }

    pub fn search_companies(&self, query: &Query) -> Result<Page<Company>, DomainError> {
        Ok(self.store.companies().find(query)?)
    }

    /// Move a driver to `target`, writing the dependent fields in the same update.
    pub fn set_driver_status(
        &self,
        driver_id: DriverId,
        target: VerificationStatus,
        actor: AdminId,
        notes: Option<String>,
    ) -> Result<TransitionOutcome<Driver>, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_VERIFY)?;
        let review = self.review(actor, notes);
        let outcome = self.modify_live_driver(driver_id, |driver| {
            transitions::transition_driver(driver, target, &review)
        })?;
        log_transition("driver", driver_id.0, actor, target.label(), &outcome);
        Ok(outcome)
    }

    /// Apply one status to every listed driver, or to none of them.
    pub fn bulk_set_driver_status(
        &self,
        driver_ids: &[DriverId],
        target: VerificationStatus,
        actor: AdminId,
        notes: Option<String>,
    ) -> Result<BulkUpdate, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_VERIFY)?;
        let ids = self.bulk_ids(driver_ids)?;
        let review = self.review(actor, notes);
        let mut changed = 0;
        let updated = self
            .store
            .drivers()
            .modify_many(&ids, |driver| {
                if transitions::transition_driver(driver, target, &review) {
                    changed += 1;
                }
            })
            .map_err(bulk_missing)?;
        info!(
            entity = "driver",
            %actor,
            status = target.label(),
            affected = updated.len(),
            changed,
            "bulk verification status applied"
        );
        Ok(BulkUpdate {
            affected: updated.len(),
            changed,
        })
    }

    pub fn set_company_status(
        &self,
        company_id: CompanyId,
        target: VerificationStatus,
        actor: AdminId,
        notes: Option<String>,
    ) -> Result<TransitionOutcome<Company>, DomainError> {
        self.gate.authorize(actor, permissions::COMPANIES_VERIFY)?;
        let review = self.review(actor, notes);
        let mut changed = false;
        let company = self.store.companies().modify(company_id, |company| {
            changed = transitions::transition_company(company, target, &review);
        })?;
        let outcome = outcome_of(changed, company);
        log_transition("company", company_id.0, actor, target.label(), &outcome);
        Ok(outcome)
    }

    pub fn bulk_set_company_status(
        &self,
        company_ids: &[CompanyId],
        target: VerificationStatus,
        actor: AdminId,
        notes: Option<String>,
    ) -> Result<BulkUpdate, DomainError> {
        self.gate.authorize(actor, permissions::COMPANIES_VERIFY)?;
        let ids = self.bulk_ids(company_ids)?;
        let review = self.review(actor, notes);
        let mut changed = 0;
        let updated = self
            .store
            .companies()
            .modify_many(&ids, |company| {
                if transitions::transition_company(company, target, &review) {
                    changed += 1;
                }
            })
            .map_err(bulk_missing)?;
        info!(
            entity = "company",
            %actor,
            status = target.label(),
            affected = updated.len(),
            changed,
            "bulk verification status applied"
        );
        Ok(BulkUpdate {
            affected: updated.len(),
            changed,
        })
    }

    pub fn set_kyc_status(
        &self,
        driver_id: DriverId,
        target: KycStatus,
        actor: AdminId,
    ) -> Result<TransitionOutcome<Driver>, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_VERIFY)?;
        let outcome =
            self.modify_live_driver(driver_id, |driver| transitions::set_kyc(driver, target))?;
        log_transition("driver kyc", driver_id.0, actor, target.label(), &outcome);
        Ok(outcome)
    }

    pub fn suspend_driver(
        &self,
        driver_id: DriverId,
        actor: AdminId,
    ) -> Result<TransitionOutcome<Driver>, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_MANAGE)?;
        let outcome = self.modify_live_driver(driver_id, transitions::suspend)?;
        log_transition("driver", driver_id.0, actor, DriverStatus::Suspended.label(), &outcome);
        Ok(outcome)
    }

    /// Lift a suspension; fails with `Conflict` when the driver is not suspended.
    pub fn reactivate_driver(&self, driver_id: DriverId, actor: AdminId) -> Result<Driver, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_MANAGE)?;
        match self.modify_live_driver(driver_id, transitions::reactivate)? {
            TransitionOutcome::Applied(driver) => {
                info!(%driver_id, %actor, status = driver.status.label(), "driver reactivated");
                Ok(driver)
            }
            TransitionOutcome::Unchanged(driver) => Err(DomainError::conflict(format!(
                "driver {driver_id} is {} and not suspended",
                driver.status
            ))),
        }
    }

    /// Soft delete. Trashed drivers disappear from default queries until restored.
    pub fn trash_driver(
        &self,
        driver_id: DriverId,
        actor: AdminId,
    ) -> Result<TransitionOutcome<Driver>, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_MANAGE)?;
        let now = self.clock.now();
        let mut changed = false;
        let driver = self.store.drivers().modify(driver_id, |driver| {
            if driver.deleted_at.is_none() {
                driver.deleted_at = Some(now);
                changed = true;
            }
        })?;
        let outcome = outcome_of(changed, driver);
        log_transition("driver", driver_id.0, actor, "trashed", &outcome);
        Ok(outcome)
    }

    pub fn restore_driver(
        &self,
        driver_id: DriverId,
        actor: AdminId,
    ) -> Result<TransitionOutcome<Driver>, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_MANAGE)?;
        let mut changed = false;
        let driver = self.store.drivers().modify(driver_id, |driver| {
            changed = driver.deleted_at.take().is_some();
        })?;
        let outcome = outcome_of(changed, driver);
        log_transition("driver", driver_id.0, actor, "restored", &outcome);
        Ok(outcome)
    }

    pub fn trashed_drivers(&self, query: &Query) -> Result<Page<Driver>, DomainError> {
        let query = query.clone().trashed(Trashed::Only);
        Ok(self.store.drivers().find(&query)?)
    }

    /// Hard delete a driver together with its documents, checks and placements.
    ///
    /// The driver row goes last, so a purge interrupted part way can be re-run.
    pub fn purge_driver(&self, driver_id: DriverId, actor: AdminId) -> Result<PurgeReport, DomainError> {
        self.gate.authorize(actor, permissions::DRIVERS_DELETE)?;
        if self.store.drivers().fetch(driver_id)?.is_none() {
            return Err(driver_not_found(driver_id));
        }

        let matches = self.store.release_driver(driver_id)?;
        let owned = [Filter::equals("driver_id", driver_id.0)];
        let documents = self.store.documents().delete_where(&owned)?;
        let checks = self.store.checks().delete_where(&owned)?;
        self.store
            .drivers()
            .delete_where(&[Filter::equals("id", driver_id.0)])?;

        info!(%driver_id, %actor, documents, checks, matches, "driver purged");
        Ok(PurgeReport {
            driver_id,
            documents,
            checks,
            matches,
        })
    }

    pub fn upload_document(&self, new: NewDocument) -> Result<Document, DomainError> {
        let mut violations = Violations::new();
        violations.require_text("document_type", &new.document_type);
        violations.require_text("file_name", &new.file_name);
        violations.finish()?;
        self.driver(new.driver_id)?;

        let document = Document {
            id: DocumentId::default(),
            driver_id: new.driver_id,
            document_type: new.document_type.trim().to_lowercase(),
            file_name: new.file_name.trim().to_string(),
            review: ReviewTrail::new(DocumentStatus::Pending),
            expiry_date: new.expiry_date,
            uploaded_at: self.clock.now(),
        };
        let stored = self.store.documents().insert(document)?;
        info!(document_id = %stored.id, driver_id = %stored.driver_id, "document uploaded");
        Ok(stored)
    }

    pub fn set_document_status(
        &self,
        document_id: DocumentId,
        target: DocumentStatus,
        actor: AdminId,
        notes: Option<String>,
    ) -> Result<TransitionOutcome<Document>, DomainError> {
        self.gate.authorize(actor, permissions::DOCUMENTS_VERIFY)?;
        let review = self.review(actor, notes);
        let mut changed = false;
        let document = self.store.documents().modify(document_id, |document| {
            changed = transitions::transition_document(document, target, &review);
        })?;
        let outcome = outcome_of(changed, document);
        log_transition("document", document_id.0, actor, target.label(), &outcome);
        Ok(outcome)
    }

    pub fn documents_for(&self, driver_id: DriverId) -> Result<Vec<Document>, DomainError> {
        self.driver(driver_id)?;
        let query = Query::new()
            .filter(Filter::equals("driver_id", driver_id.0))
            .sort_by(SortKey::asc("uploaded_at"))
            .all();
        Ok(self.store.documents().find(&query)?.items)
    }

    /// Documents whose expiry date is before `on`, soonest-expired first.
    pub fn expired_documents(&self, on: NaiveDate) -> Result<Vec<Document>, DomainError> {
        let query = Query::new()
            .filter(Filter::compare("expiry_date", CompareOp::Lt, on))
            .sort_by(SortKey::asc("expiry_date"))
            .all();
        Ok(self.store.documents().find(&query)?.items)
    }

    pub fn open_check(
        &self,
        driver_id: DriverId,
        kind: CheckKind,
        reference: Option<String>,
        actor: AdminId,
    ) -> Result<IdentityCheck, DomainError> {
        self.gate.authorize(actor, permissions::CHECKS_MANAGE)?;
        self.driver(driver_id)?;

        let check = IdentityCheck {
            id: CheckId::default(),
            driver_id,
            kind,
            reference,
            status: CheckStatus::Pending,
            retry_count: 0,
            verified_at: None,
            failed_at: None,
            last_error: None,
            created_at: self.clock.now(),
        };
        let stored = self.store.checks().insert(check).map_err(|err| match err {
            RepositoryError::Conflict { .. } => {
                DomainError::conflict(format!("driver {driver_id} already has a {kind} check"))
            }
            other => other.into(),
        })?;
        info!(check_id = %stored.id, %driver_id, kind = kind.label(), %actor, "check opened");
        Ok(stored)
    }

    pub fn checks_for(&self, driver_id: DriverId) -> Result<Vec<IdentityCheck>, DomainError> {
        self.driver(driver_id)?;
        let query = Query::new()
            .filter(Filter::equals("driver_id", driver_id.0))
            .all();
        Ok(self.store.checks().find(&query)?.items)
    }

    /// Record a successful check. Failed checks must be retried first.
    pub fn record_check_success(
        &self,
        check_id: CheckId,
        actor: AdminId,
    ) -> Result<TransitionOutcome<IdentityCheck>, DomainError> {
        self.gate.authorize(actor, permissions::CHECKS_MANAGE)?;
        let now = self.clock.now();
        let mut changed = false;
        let check = self.store.checks().modify(check_id, |check| {
            if check.status != CheckStatus::Failed {
                changed = transitions::check_succeeded(check, now);
            }
        })?;
        if check.status == CheckStatus::Failed {
            return Err(check_not_pending(&check));
        }
        let outcome = outcome_of(changed, check);
        log_transition("check", check_id.0, actor, CheckStatus::Success.label(), &outcome);
        Ok(outcome)
    }

    /// Record a failed attempt; only pending checks accept a failure.
    pub fn record_check_failure(
        &self,
        check_id: CheckId,
        reason: &str,
        actor: AdminId,
    ) -> Result<IdentityCheck, DomainError> {
        self.gate.authorize(actor, permissions::CHECKS_MANAGE)?;
        let now = self.clock.now();
        let mut applied = false;
        let check = self.store.checks().modify(check_id, |check| {
            if check.status == CheckStatus::Pending {
                transitions::check_failed(check, reason, now);
                applied = true;
            }
        })?;
        if !applied {
            return Err(check_not_pending(&check));
        }
        info!(%check_id, %actor, retry_count = check.retry_count, "check failed");
        Ok(check)
    }

    /// Put a failed check back to pending so it can be attempted again.
    pub fn retry_check(&self, check_id: CheckId, actor: AdminId) -> Result<IdentityCheck, DomainError> {
        self.gate.authorize(actor, permissions::CHECKS_MANAGE)?;
        let mut applied = false;
        let check = self.store.checks().modify(check_id, |check| {
            if check.status == CheckStatus::Failed {
                applied = transitions::check_reset(check);
            }
        })?;
        if !applied {
            return Err(DomainError::conflict(format!(
                "check {check_id} is {} and cannot be retried",
                check.status
            )));
        }
        info!(%check_id, %actor, retry_count = check.retry_count, "check queued for retry");
        Ok(check)
    }

    fn review(&self, actor: AdminId, notes: Option<String>) -> Review {
        Review {
            actor,
            at: self.clock.now(),
            notes: notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
        }
    }

    /// Apply `change` to a driver that is not trashed, inside one store write.
    fn modify_live_driver<F>(
        &self,
        driver_id: DriverId,
        change: F,
    ) -> Result<TransitionOutcome<Driver>, DomainError>
    where
        F: FnOnce(&mut Driver) -> bool,
    {
        let mut trashed = false;
        let mut changed = false;
        let driver = self
            .store
            .drivers()
            .modify(driver_id, |driver| {
                if driver.is_trashed() {
                    trashed = true;
                } else {
                    changed = change(driver);
                }
            })
            .map_err(|err| match err {
                RepositoryError::NotFound { .. } => driver_not_found(driver_id),
                other => other.into(),
            })?;
        if trashed {
            return Err(driver_not_found(driver_id));
        }
        Ok(outcome_of(changed, driver))
    }

    fn bulk_ids<I: Copy + Ord>(&self, ids: &[I]) -> Result<Vec<I>, DomainError> {
        let mut seen = BTreeSet::new();
        let distinct: Vec<I> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut violations = Violations::new();
        violations.check("ids", !distinct.is_empty(), "at least one id is required");
        violations.check(
            "ids",
            distinct.len() <= self.config.bulk_limit,
            format!(
                "no more than {} ids may be updated at once",
                self.config.bulk_limit
            ),
        );
        violations.finish()?;
        Ok(distinct)
    }
}

fn outcome_of<T>(changed: bool, value: T) -> TransitionOutcome<T> {
    if changed {
        TransitionOutcome::Applied(value)
    } else {
        TransitionOutcome::Unchanged(value)
    }
}

fn log_transition<T>(
    entity: &str,
    id: u64,
    actor: AdminId,
    target: &str,
    outcome: &TransitionOutcome<T>,
) {
    if outcome.is_applied() {
        info!(entity, id, %actor, status = target, "status changed");
    } else {
        debug!(entity, id, %actor, status = target, "status already current");
    }
}

/// A bulk update naming absent or trashed ids; nothing was written.
fn bulk_missing(err: RepositoryError) -> DomainError {
    if let RepositoryError::Missing { entity, ids } = &err {
        warn!(entity = *entity, missing = %join_ids(ids), "bulk update names unknown ids");
    }
    err.into()
}

fn driver_not_found(driver_id: DriverId) -> DomainError {
    DomainError::not_found(format!("driver {driver_id} not found"))
}

fn check_not_pending(check: &IdentityCheck) -> DomainError {
    DomainError::conflict(format!(
        "check {} is {}; retry it before recording a new outcome",
        check.id, check.status
    ))
}

fn email_taken(err: RepositoryError) -> DomainError {
    match err {
        RepositoryError::Conflict { .. } => {
            DomainError::invalid_field("email", "email has already been taken")
        }
        other => other.into(),
    }
}
