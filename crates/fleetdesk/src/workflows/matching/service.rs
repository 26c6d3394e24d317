use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{
    Assignment, DriverMatch, DriverRequest, MatchId, NewDriverRequest, RequestId, RequestStatus,
};
use super::repository::MatchingStore;
use crate::clock::{Clock, SystemClock};
use crate::query::{Filter, Page, Query, SortKey};
use crate::store::{Repository, RepositoryError};
use crate::workflows::access::{permissions, AdminId, Authorizer};
use crate::workflows::verification::{Driver, DriverId, VerificationStatus};
use crate::workflows::DomainError;

/// Places verified drivers on open requests from verified companies.
pub struct MatchingService<S> {
    store: Arc<S>,
    gate: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
}

impl<S> MatchingService<S>
where
    S: MatchingStore + 'static,
{
    pub fn new(store: Arc<S>, gate: Arc<dyn Authorizer>) -> Self {
        Self::with_clock(store, gate, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, gate: Arc<dyn Authorizer>, clock: Arc<dyn Clock>) -> Self {
        Self { store, gate, clock }
    }

    /// Open a request on behalf of a company; only verified companies may ask for drivers.
    pub fn open_request(&self, new: NewDriverRequest) -> Result<DriverRequest, DomainError> {
        new.validate().finish()?;
        let company = self
            .store
            .companies()
            .fetch(new.company_id)?
            .ok_or_else(|| {
                DomainError::not_found(format!("company {} not found", new.company_id))
            })?;
        if !company.is_verified() {
            warn!(company_id = %company.id, "unverified company requested drivers");
            return Err(DomainError::conflict(format!(
                "company {} must be verified before requesting drivers",
                company.id
            )));
        }

        let request = DriverRequest::open(new, self.clock.now());
        let stored = self.store.requests().insert(request)?;
        info!(
            request_id = %stored.id,
            company_id = %stored.company_id,
            drivers_needed = stored.drivers_needed,
            "driver request opened"
        );
        Ok(stored)
    }

    pub fn request(&self, request_id: RequestId) -> Result<DriverRequest, DomainError> {
        self.store
            .requests()
            .fetch(request_id)?
            .ok_or_else(|| request_not_found(request_id))
    }

    pub fn search_requests(&self, query: &Query) -> Result<Page<DriverRequest>, DomainError> {
        Ok(self.store.requests().find(query)?)
    }

    pub fn matches_for(&self, request_id: RequestId) -> Result<Vec<DriverMatch>, DomainError> {
        self.request(request_id)?;
        let query = Query::new()
            .filter(Filter::equals("request_id", request_id.0))
            .sort_by(SortKey::asc("matched_at"))
            .all();
        Ok(self.store.matches().find(&query)?.items)
    }

    /// Drivers that could fill the request: verified, active and not yet on it.
    pub fn candidates(&self, request_id: RequestId) -> Result<Vec<Driver>, DomainError> {
        let placed: BTreeSet<DriverId> = self
            .matches_for(request_id)?
            .into_iter()
            .map(|placed| placed.driver_id)
            .collect();
        let query = Query::new()
            .filter(Filter::equals("verification_status", VerificationStatus::Verified))
            .filter(Filter::equals("is_active", true))
            .sort_by(SortKey::asc("last_name"))
            .sort_by(SortKey::asc("first_name"))
            .all();
        let drivers = self.store.drivers().find(&query)?.items;
        Ok(drivers
            .into_iter()
            .filter(|driver| driver.is_matchable() && !placed.contains(&driver.id))
            .collect())
    }

    /// Place `driver_id` on the request, taking one of its open slots.
    pub fn match_driver(
        &self,
        request_id: RequestId,
        driver_id: DriverId,
        actor: AdminId,
    ) -> Result<Assignment, DomainError> {
        self.gate.authorize(actor, permissions::MATCHING_MANAGE)?;
        let driver = match self.store.drivers().fetch(driver_id)? {
            Some(driver) if !driver.is_trashed() => driver,
            _ => return Err(DomainError::not_found(format!("driver {driver_id} not found"))),
        };
        if !driver.is_matchable() {
            return Err(DomainError::conflict(format!(
                "driver {driver_id} must be verified and active to be matched"
            )));
        }

        let company_id = self.request(request_id)?.company_id;
        let company_verified = self
            .store
            .companies()
            .fetch(company_id)?
            .is_some_and(|company| company.is_verified());
        if !company_verified {
            warn!(%request_id, %company_id, "placement refused for unverified company");
            return Err(DomainError::conflict(format!(
                "company {company_id} must be verified before drivers are matched to request {request_id}"
            )));
        }

        let now = self.clock.now();
        let mut reserved = false;
        let request = self
            .store
            .requests()
            .modify(request_id, |request| reserved = request.reserve(now))
            .map_err(|err| request_error(request_id, err))?;
        if !reserved {
            return Err(DomainError::conflict(format!(
                "request {request_id} is {} and takes no more drivers",
                request.status
            )));
        }

        let placement = DriverMatch {
            id: MatchId::default(),
            request_id,
            driver_id,
            matched_by: actor,
            matched_at: now,
        };
        let placed = match self.store.matches().insert(placement) {
            Ok(placed) => placed,
            Err(err) => {
                self.store
                    .requests()
                    .modify(request_id, DriverRequest::release)?;
                return Err(match err {
                    RepositoryError::Conflict { .. } => DomainError::conflict(format!(
                        "driver {driver_id} is already matched to request {request_id}"
                    )),
                    other => other.into(),
                });
            }
        };

        info!(
            %request_id,
            %driver_id,
            %actor,
            matched = request.matched,
            status = request.status.label(),
            "driver matched"
        );
        Ok(Assignment { placed, request })
    }

    /// Take a driver off a request; a fulfilled request opens again.
    pub fn unmatch_driver(
        &self,
        request_id: RequestId,
        driver_id: DriverId,
        actor: AdminId,
    ) -> Result<DriverRequest, DomainError> {
        self.gate.authorize(actor, permissions::MATCHING_MANAGE)?;
        self.request(request_id)?;
        let removed = self.store.matches().delete_where(&[
            Filter::equals("request_id", request_id.0),
            Filter::equals("driver_id", driver_id.0),
        ])?;
        if removed == 0 {
            return Err(DomainError::not_found(format!(
                "driver {driver_id} is not matched to request {request_id}"
            )));
        }

        let request = self
            .store
            .requests()
            .modify(request_id, DriverRequest::release)
            .map_err(|err| request_error(request_id, err))?;
        info!(%request_id, %driver_id, %actor, matched = request.matched, "driver unmatched");
        Ok(request)
    }

    /// Cancel an open request. Fulfilled and cancelled requests are left alone.
    pub fn cancel_request(
        &self,
        request_id: RequestId,
        actor: AdminId,
    ) -> Result<DriverRequest, DomainError> {
        self.gate.authorize(actor, permissions::MATCHING_MANAGE)?;
        let now = self.clock.now();
        let mut cancelled = false;
        let request = self
            .store
            .requests()
            .modify(request_id, |request| cancelled = request.cancel(now))
            .map_err(|err| request_error(request_id, err))?;
        if !cancelled {
            return Err(DomainError::conflict(format!(
                "request {request_id} is {}; only open requests can be cancelled",
                request.status
            )));
        }
        info!(%request_id, %actor, status = RequestStatus::Cancelled.label(), "driver request cancelled");
        Ok(request)
    }
}

fn request_not_found(request_id: RequestId) -> DomainError {
    DomainError::not_found(format!("driver request {request_id} not found"))
}

fn request_error(request_id: RequestId, err: RepositoryError) -> DomainError {
    match err {
        RepositoryError::NotFound { .. } => request_not_found(request_id),
        other => other.into(),
    }
}
