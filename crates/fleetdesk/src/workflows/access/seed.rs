use tracing::info;

use super::domain::{AdminProfile, NewAdmin, NewPermission, NewRole, Role};
use super::permissions;
use super::repository::AccessStore;
use super::service::AccessControlService;
use crate::workflows::DomainError;

/// Roles created by [`seed_access_control`] and the bootstrap admin holding the top one.
#[derive(Debug, Clone)]
pub struct AccessSeed {
    pub super_admin: Role,
    pub admin: Role,
    pub verifier: Role,
    pub bootstrap: AdminProfile,
}

const ADMIN_GRANTS: &[&str] = &[
    permissions::DRIVERS_VERIFY,
    permissions::DRIVERS_MANAGE,
    permissions::DRIVERS_DELETE,
    permissions::COMPANIES_VERIFY,
    permissions::DOCUMENTS_VERIFY,
    permissions::CHECKS_MANAGE,
    permissions::MATCHING_MANAGE,
    permissions::ADMINS_MANAGE,
];

const VERIFIER_GRANTS: &[&str] = &[
    permissions::DRIVERS_VERIFY,
    permissions::COMPANIES_VERIFY,
    permissions::DOCUMENTS_VERIFY,
    permissions::CHECKS_MANAGE,
];

/// Install the default role ladder (super_admin 100, admin 50, verifier 10),
/// every workflow permission, and a bootstrap super admin. Safe to re-run.
pub fn seed_access_control<S>(
    service: &AccessControlService<S>,
    bootstrap: NewAdmin,
) -> Result<AccessSeed, DomainError>
where
    S: AccessStore + 'static,
{
    for name in permissions::ALL {
        if service.permission_named(name)?.is_none() {
            service.create_permission(
                NewPermission {
                    name: (*name).to_string(),
                    category: None,
                    resource: None,
                    action: None,
                    description: None,
                },
                None,
            )?;
        }
    }

    let super_admin = ensure_role(service, "super_admin", 100, None)?;
    let admin = ensure_role(service, "admin", 50, Some(&super_admin))?;
    let verifier = ensure_role(service, "verifier", 10, Some(&admin))?;

    grant_all(service, &super_admin, permissions::ALL)?;
    grant_all(service, &admin, ADMIN_GRANTS)?;
    grant_all(service, &verifier, VERIFIER_GRANTS)?;

    let email = bootstrap.email.trim().to_lowercase();
    let existing = service
        .admins_by_email(&email)?
        .into_iter()
        .next();
    let bootstrap_admin = match existing {
        Some(admin) => admin,
        None => service.create_admin(bootstrap)?,
    };
    let bootstrap = service.assign_role(bootstrap_admin.id, super_admin.id, None)?;

    info!(admin_id = %bootstrap.admin.id, "access control seeded");
    Ok(AccessSeed {
        super_admin,
        admin,
        verifier,
        bootstrap,
    })
}

fn ensure_role<S>(
    service: &AccessControlService<S>,
    name: &str,
    level: u32,
    parent: Option<&Role>,
) -> Result<Role, DomainError>
where
    S: AccessStore + 'static,
{
    if let Some(role) = service.role_named(name)? {
        return Ok(role);
    }
    service.create_role(
        NewRole {
            name: name.to_string(),
            level,
            parent_id: parent.map(|role| role.id),
            description: None,
        },
        None,
    )
}

fn grant_all<S>(
    service: &AccessControlService<S>,
    role: &Role,
    names: &[&str],
) -> Result<(), DomainError>
where
    S: AccessStore + 'static,
{
    for name in names {
        let permission = service
            .permission_named(name)?
            .ok_or_else(|| DomainError::not_found(format!("permission '{name}' not found")))?;
        service.assign_permission(role.id, permission.id, None)?;
    }
    Ok(())
}
