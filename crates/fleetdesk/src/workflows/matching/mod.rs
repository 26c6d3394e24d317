//! Company driver requests and the placement of verified drivers on them.
//!
//! Slots are reserved on the request row before the match row is written, so
//! concurrent placements can never push `matched` past `drivers_needed`.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Assignment, DriverMatch, DriverRequest, MatchId, NewDriverRequest, RequestId, RequestStatus,
};
pub use repository::MatchingStore;
pub(crate) use repository::release_placements;
pub use router::matching_router;
pub use service::MatchingService;
