use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::FieldValue;
use crate::store::{entity_id, Record};
use crate::workflows::access::AdminId;
use crate::workflows::status::status_enum;
use crate::workflows::verification::{CompanyId, DriverId};
use crate::workflows::Violations;

entity_id!(RequestId);
entity_id!(MatchId);

status_enum!(
    /// Lifecycle of a company's request for drivers.
    RequestStatus("request status") {
        Open => "open",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
    }
);

/// A company asking for `drivers_needed` drivers.
///
/// `matched` never exceeds `drivers_needed`; the request is fulfilled exactly
/// when the two are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRequest {
    pub id: RequestId,
    pub company_id: CompanyId,
    pub title: String,
    pub drivers_needed: u32,
    pub matched: u32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl DriverRequest {
    pub fn open(new: NewDriverRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: RequestId::default(),
            company_id: new.company_id,
            title: new.title.trim().to_string(),
            drivers_needed: new.drivers_needed,
            matched: 0,
            status: RequestStatus::Open,
            created_at: now,
            fulfilled_at: None,
            cancelled_at: None,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.drivers_needed.saturating_sub(self.matched)
    }

    /// Take one slot; fulfils the request when it was the last one.
    pub(crate) fn reserve(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != RequestStatus::Open || self.remaining() == 0 {
            return false;
        }
        self.matched += 1;
        if self.remaining() == 0 {
            self.status = RequestStatus::Fulfilled;
            self.fulfilled_at = Some(now);
        }
        true
    }

    /// Give one slot back; a fulfilled request opens again.
    pub(crate) fn release(&mut self) {
        self.matched = self.matched.saturating_sub(1);
        if self.status == RequestStatus::Fulfilled && self.remaining() > 0 {
            self.status = RequestStatus::Open;
            self.fulfilled_at = None;
        }
    }

    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != RequestStatus::Open {
            return false;
        }
        self.status = RequestStatus::Cancelled;
        self.cancelled_at = Some(now);
        true
    }
}

impl Record for DriverRequest {
    type Id = RequestId;
    const ENTITY: &'static str = "driver request";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "company_id",
        "title",
        "drivers_needed",
        "matched",
        "status",
        "created_at",
        "fulfilled_at",
        "cancelled_at",
    ];

    fn id(&self) -> RequestId {
        self.id
    }

    fn assign_id(&mut self, id: RequestId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "company_id" => Some(self.company_id.0.into()),
            "title" => Some(self.title.clone().into()),
            "drivers_needed" => Some(self.drivers_needed.into()),
            "matched" => Some(self.matched.into()),
            "status" => Some(self.status.into()),
            "created_at" => Some(self.created_at.into()),
            "fulfilled_at" => Some(self.fulfilled_at.into()),
            "cancelled_at" => Some(self.cancelled_at.into()),
            _ => None,
        }
    }
}

/// A driver placed on a request by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverMatch {
    pub id: MatchId,
    pub request_id: RequestId,
    pub driver_id: DriverId,
    pub matched_by: AdminId,
    pub matched_at: DateTime<Utc>,
}

impl Record for DriverMatch {
    type Id = MatchId;
    const ENTITY: &'static str = "driver match";
    const FIELDS: &'static [&'static str] =
        &["id", "request_id", "driver_id", "matched_by", "matched_at"];

    fn id(&self) -> MatchId {
        self.id
    }

    fn assign_id(&mut self, id: MatchId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "request_id" => Some(self.request_id.0.into()),
            "driver_id" => Some(self.driver_id.0.into()),
            "matched_by" => Some(self.matched_by.0.into()),
            "matched_at" => Some(self.matched_at.into()),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.request_id, self.driver_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDriverRequest {
    pub company_id: CompanyId,
    pub title: String,
    pub drivers_needed: u32,
}

impl NewDriverRequest {
    pub(crate) fn validate(&self) -> Violations {
        let mut violations = Violations::new();
        violations.require_text("title", &self.title);
        violations.check(
            "drivers_needed",
            self.drivers_needed >= 1,
            "at least one driver must be requested",
        );
        violations
    }
}

/// Result of placing a driver: the new match and the request after the slot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    #[serde(rename = "match")]
    pub placed: DriverMatch,
    pub request: DriverRequest,
}
