//! Role-based access control: a level-ordered role hierarchy, permission sets
//! per role, and admin role membership.
//!
//! Admins carry roles only through membership rows; the display label of an
//! admin's role is derived from the most senior active role.

pub mod domain;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AdminId, AdminProfile, AdminUser, GrantId, GrantOutcome, MembershipId, NewAdmin,
    NewPermission, NewRole, Permission, PermissionId, Role, RoleId, RoleMembership,
    RolePermission,
};
pub use repository::{AccessStore, Authorizer};
pub use router::access_router;
pub use seed::{seed_access_control, AccessSeed};
pub use service::AccessControlService;

/// Permission names checked by the workflows.
pub mod permissions {
    pub const DRIVERS_VERIFY: &str = "drivers.verify";
    pub const DRIVERS_MANAGE: &str = "drivers.manage";
    pub const DRIVERS_DELETE: &str = "drivers.delete";
    pub const COMPANIES_VERIFY: &str = "companies.verify";
    pub const DOCUMENTS_VERIFY: &str = "documents.verify";
    pub const CHECKS_MANAGE: &str = "checks.manage";
    pub const MATCHING_MANAGE: &str = "matching.manage";
    pub const ROLES_MANAGE: &str = "roles.manage";
    pub const ADMINS_MANAGE: &str = "admins.manage";

    pub const ALL: &[&str] = &[
        DRIVERS_VERIFY,
        DRIVERS_MANAGE,
        DRIVERS_DELETE,
        COMPANIES_VERIFY,
        DOCUMENTS_VERIFY,
        CHECKS_MANAGE,
        MATCHING_MANAGE,
        ROLES_MANAGE,
        ADMINS_MANAGE,
    ];
}
