use super::domain::{DriverMatch, DriverRequest};
use crate::query::{Filter, Query};
use crate::store::{Repository, RepositoryError};
use crate::workflows::verification::{DriverId, VerificationStore};

/// Request and match tables, alongside the verification tables they refer to.
pub trait MatchingStore: VerificationStore {
    type Requests: Repository<DriverRequest>;
    type Matches: Repository<DriverMatch>;

    fn requests(&self) -> &Self::Requests;
    fn matches(&self) -> &Self::Matches;
}

/// Delete every placement of `driver_id` and hand each slot back to its request.
///
/// A match row is removed before its slot is released, so re-running after a
/// failure never releases the same slot twice.
pub(crate) fn release_placements<S: MatchingStore>(
    store: &S,
    driver_id: DriverId,
) -> Result<usize, RepositoryError> {
    let query = Query::new()
        .filter(Filter::equals("driver_id", driver_id.0))
        .all();
    let mut released = 0;
    for placement in store.matches().find(&query)?.items {
        let removed = store
            .matches()
            .delete_where(&[Filter::equals("id", placement.id.0)])?;
        if removed == 1 {
            store
                .requests()
                .modify(placement.request_id, DriverRequest::release)?;
            released += 1;
        }
    }
    Ok(released)
}
