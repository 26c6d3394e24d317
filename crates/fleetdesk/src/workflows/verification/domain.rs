use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::query::FieldValue;
use crate::store::{entity_id, Record};
use crate::workflows::access::AdminId;
use crate::workflows::status::status_enum;
use crate::workflows::Violations;

entity_id!(DriverId);
entity_id!(CompanyId);
entity_id!(DocumentId);
entity_id!(CheckId);

status_enum!(
    /// Review state of a driver or company.
    VerificationStatus("verification status") {
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
);

status_enum!(
    KycStatus("kyc status") {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Rejected => "rejected",
    }
);

status_enum!(
    DriverStatus("driver status") {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
);

status_enum!(
    CompanyStatus("company status") {
        Active => "active",
        Inactive => "inactive",
    }
);

status_enum!(
    /// Review state of an uploaded document; `verified` is accepted as an alias of `approved`.
    DocumentStatus("document status") {
        Pending => "pending",
        Approved => "approved" | "verified",
        Rejected => "rejected",
    }
);

status_enum!(
    CheckStatus("check status") {
        Pending => "pending",
        Success => "success",
        Failed => "failed",
    }
);

status_enum!(
    /// Identity check performed against an external registry.
    CheckKind("check kind") {
        Nin => "nin",
        Bvn => "bvn",
        Frsc => "frsc",
        Address => "address",
        Guarantor => "guarantor",
    }
);

/// Where a review status sits in the pending / accepted / rejected lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStage {
    Pending,
    Accepted,
    Rejected,
}

/// Status enums that drive a [`ReviewTrail`].
pub trait ReviewStatus: Copy + Eq + std::fmt::Display {
    fn stage(self) -> ReviewStage;
}

impl ReviewStatus for VerificationStatus {
    fn stage(self) -> ReviewStage {
        match self {
            VerificationStatus::Pending => ReviewStage::Pending,
            VerificationStatus::Verified => ReviewStage::Accepted,
            VerificationStatus::Rejected => ReviewStage::Rejected,
        }
    }
}

impl ReviewStatus for DocumentStatus {
    fn stage(self) -> ReviewStage {
        match self {
            DocumentStatus::Pending => ReviewStage::Pending,
            DocumentStatus::Approved => ReviewStage::Accepted,
            DocumentStatus::Rejected => ReviewStage::Rejected,
        }
    }
}

/// Review fields shared by drivers, companies and documents.
///
/// `verified_at` and `rejected_at` are never both set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTrail<S> {
    pub verification_status: S,
    pub verified_by: Option<AdminId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl<S: ReviewStatus> ReviewTrail<S> {
    pub fn new(initial: S) -> Self {
        Self {
            verification_status: initial,
            verified_by: None,
            verified_at: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue>
    where
        S: Into<FieldValue>,
    {
        match name {
            "verification_status" => Some(self.verification_status.into()),
            "verified_by" => Some(self.verified_by.map(|id| id.0).into()),
            "verified_at" => Some(self.verified_at.into()),
            "rejected_at" => Some(self.rejected_at.into()),
            _ => None,
        }
    }
}

const REVIEW_FIELDS: [&str; 4] = ["verification_status", "verified_by", "verified_at", "rejected_at"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub review: ReviewTrail<VerificationStatus>,
    pub kyc_status: KycStatus,
    pub status: DriverStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Driver {
    /// A freshly registered driver: pending review, inactive until verified.
    pub fn register(registration: DriverRegistration, now: DateTime<Utc>) -> Self {
        Self {
            id: DriverId::default(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            email: registration.email.trim().to_lowercase(),
            phone: registration
                .phone
                .map(|phone| phone.trim().to_string())
                .filter(|phone| !phone.is_empty()),
            review: ReviewTrail::new(VerificationStatus::Pending),
            kyc_status: KycStatus::Pending,
            status: DriverStatus::Inactive,
            is_active: false,
            created_at: now,
            deleted_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Verified, active and not trashed.
    pub fn is_matchable(&self) -> bool {
        self.review.verification_status == VerificationStatus::Verified
            && self.is_active
            && self.status == DriverStatus::Active
            && !self.is_trashed()
    }
}

impl Record for Driver {
    type Id = DriverId;
    const ENTITY: &'static str = "driver";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "first_name",
        "last_name",
        "email",
        "phone",
        "verification_status",
        "verified_by",
        "verified_at",
        "rejected_at",
        "kyc_status",
        "status",
        "is_active",
        "created_at",
        "deleted_at",
    ];

    fn id(&self) -> DriverId {
        self.id
    }

    fn assign_id(&mut self, id: DriverId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "name" => Some(self.full_name().into()),
            "first_name" => Some(self.first_name.clone().into()),
            "last_name" => Some(self.last_name.clone().into()),
            "email" => Some(self.email.clone().into()),
            "phone" => Some(self.phone.clone().into()),
            "kyc_status" => Some(self.kyc_status.into()),
            "status" => Some(self.status.into()),
            "is_active" => Some(self.is_active.into()),
            "created_at" => Some(self.created_at.into()),
            "deleted_at" => Some(self.deleted_at.into()),
            other if REVIEW_FIELDS.contains(&other) => self.review.field(other),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub registration_number: Option<String>,
    #[serde(flatten)]
    pub review: ReviewTrail<VerificationStatus>,
    pub status: CompanyStatus,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn register(registration: CompanyRegistration, now: DateTime<Utc>) -> Self {
        Self {
            id: CompanyId::default(),
            name: registration.name.trim().to_string(),
            email: registration.email.trim().to_lowercase(),
            phone: registration.phone,
            registration_number: registration.registration_number,
            review: ReviewTrail::new(VerificationStatus::Pending),
            status: CompanyStatus::Inactive,
            created_at: now,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.review.verification_status == VerificationStatus::Verified
            && self.status == CompanyStatus::Active
    }
}

impl Record for Company {
    type Id = CompanyId;
    const ENTITY: &'static str = "company";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "registration_number",
        "verification_status",
        "verified_by",
        "verified_at",
        "rejected_at",
        "status",
        "created_at",
    ];

    fn id(&self) -> CompanyId {
        self.id
    }

    fn assign_id(&mut self, id: CompanyId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "name" => Some(self.name.clone().into()),
            "email" => Some(self.email.clone().into()),
            "registration_number" => Some(self.registration_number.clone().into()),
            "status" => Some(self.status.into()),
            "created_at" => Some(self.created_at.into()),
            other if REVIEW_FIELDS.contains(&other) => self.review.field(other),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }
}

/// Uploaded file metadata; the file itself lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub driver_id: DriverId,
    pub document_type: String,
    pub file_name: String,
    #[serde(flatten)]
    pub review: ReviewTrail<DocumentStatus>,
    pub expiry_date: Option<NaiveDate>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Expired once `on` is past the expiry date, whatever the review status.
    pub fn is_expired(&self, on: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < on)
    }
}

impl Record for Document {
    type Id = DocumentId;
    const ENTITY: &'static str = "document";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "driver_id",
        "document_type",
        "verification_status",
        "verified_by",
        "verified_at",
        "rejected_at",
        "expiry_date",
        "uploaded_at",
    ];

    fn id(&self) -> DocumentId {
        self.id
    }

    fn assign_id(&mut self, id: DocumentId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "driver_id" => Some(self.driver_id.0.into()),
            "document_type" => Some(self.document_type.clone().into()),
            "expiry_date" => Some(self.expiry_date.into()),
            "uploaded_at" => Some(self.uploaded_at.into()),
            other if REVIEW_FIELDS.contains(&other) => self.review.field(other),
            _ => None,
        }
    }
}

/// One identity check for a driver. `verified_at` and `failed_at` are never
/// both set, and `retry_count` counts recorded failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCheck {
    pub id: CheckId,
    pub driver_id: DriverId,
    pub kind: CheckKind,
    pub reference: Option<String>,
    pub status: CheckStatus,
    pub retry_count: u32,
    pub verified_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for IdentityCheck {
    type Id = CheckId;
    const ENTITY: &'static str = "verification check";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "driver_id",
        "kind",
        "status",
        "retry_count",
        "verified_at",
        "failed_at",
        "created_at",
    ];

    fn id(&self) -> CheckId {
        self.id
    }

    fn assign_id(&mut self, id: CheckId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "driver_id" => Some(self.driver_id.0.into()),
            "kind" => Some(self.kind.into()),
            "status" => Some(self.status.into()),
            "retry_count" => Some(self.retry_count.into()),
            "verified_at" => Some(self.verified_at.into()),
            "failed_at" => Some(self.failed_at.into()),
            "created_at" => Some(self.created_at.into()),
            _ => None,
        }
    }

    /// One check per kind per driver; failed checks are retried in place.
    fn unique_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.driver_id, self.kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl DriverRegistration {
    pub(crate) fn validate(&self) -> Violations {
        let mut violations = Violations::new();
        violations.require_text("first_name", &self.first_name);
        violations.require_text("last_name", &self.last_name);
        violations.require_email("email", &self.email);
        if let Some(phone) = &self.phone {
            violations.check(
                "phone",
                phone
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-')),
                "phone may only contain digits, spaces, '+' and '-'",
            );
        }
        violations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRegistration {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
}

impl CompanyRegistration {
    pub(crate) fn validate(&self) -> Violations {
        let mut violations = Violations::new();
        violations.require_text("name", &self.name);
        violations.require_email("email", &self.email);
        violations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub driver_id: DriverId,
    pub document_type: String,
    pub file_name: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Result of a status write: `Unchanged` when the entity already held the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome<T> {
    Applied(T),
    Unchanged(T),
}

impl<T> TransitionOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            TransitionOutcome::Applied(value) | TransitionOutcome::Unchanged(value) => value,
        }
    }
}

/// Rows removed when a driver is purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub driver_id: DriverId,
    pub documents: usize,
    pub checks: usize,
    /// Placements removed from driver requests.
    pub matches: usize,
}

/// Rows touched by a bulk status update; `changed` excludes rows already in the target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkUpdate {
    pub affected: usize,
    pub changed: usize,
}
