use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{
    natural_key, AdminId, AdminProfile, AdminUser, GrantOutcome, NewAdmin, NewPermission,
    NewRole, Permission, PermissionId, Role, RoleId, RoleMembership, RolePermission,
};
use super::permissions;
use super::repository::{AccessStore, Authorizer};
use crate::clock::{Clock, SystemClock};
use crate::query::{Filter, Query, SortKey};
use crate::store::{join_ids, Repository, RepositoryError};
use crate::workflows::{DomainError, Violations};

/// Role hierarchy, permission sets and admin role membership.
pub struct AccessControlService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> AccessControlService<S>
where
    S: AccessStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn role(&self, role_id: RoleId) -> Result<Role, DomainError> {
        self.store
            .roles()
            .fetch(role_id)?
            .ok_or_else(|| DomainError::not_found(format!("role {role_id} not found")))
    }

    pub fn role_named(&self, name: &str) -> Result<Option<Role>, DomainError> {
        let key = natural_key(name);
        let roles = self.store.roles().find(&Query::new().all())?;
        Ok(roles.items.into_iter().find(|role| natural_key(&role.name) == key))
    }

    pub fn permission(&self, permission_id: PermissionId) -> Result<Permission, DomainError> {
        self.store
            .permissions()
            .fetch(permission_id)?
            .ok_or_else(|| DomainError::not_found(format!("permission {permission_id} not found")))
    }

    pub fn permission_named(&self, name: &str) -> Result<Option<Permission>, DomainError> {
        let key = natural_key(name);
        let permissions = self.store.permissions().find(&Query::new().all())?;
        Ok(permissions
            .items
            .into_iter()
            .find(|permission| natural_key(&permission.name) == key))
    }

    pub fn admin(&self, admin_id: AdminId) -> Result<AdminUser, DomainError> {
        self.store
            .admins()
            .fetch(admin_id)?
            .ok_or_else(|| DomainError::not_found(format!("admin {admin_id} not found")))
    }

    /// Admins whose email matches `email`, compared case-insensitively.
    pub fn admins_by_email(&self, email: &str) -> Result<Vec<AdminUser>, DomainError> {
        let key = natural_key(email);
        let query = Query::new().filter(Filter::equals("email", key)).all();
        Ok(self.store.admins().find(&query)?.items)
    }

    /// Create a role. An acting admin may only create roles at or below their own level.
    pub fn create_role(&self, new: NewRole, actor: Option<AdminId>) -> Result<Role, DomainError> {
        let mut violations = Violations::new();
        violations.require_text("name", &new.name);
        violations.finish()?;

        if let Some(actor) = actor {
            self.require_authority(actor, permissions::ROLES_MANAGE, new.level, &new.name)?;
        }

        if let Some(parent_id) = new.parent_id {
            let parent = self.role(parent_id)?;
            let mut violations = Violations::new();
            violations.check(
                "parent_id",
                parent.level >= new.level,
                format!(
                    "parent role '{}' (level {}) sits below level {}",
                    parent.name, parent.level, new.level
                ),
            );
            violations.finish()?;
        }

        let role = Role {
            id: RoleId::default(),
            name: new.name.trim().to_string(),
            level: new.level,
            parent_id: new.parent_id,
            description: new.description,
            is_active: true,
            created_at: self.clock.now(),
        };
        let stored = self.store.roles().insert(role)?;
        info!(role_id = %stored.id, name = %stored.name, level = stored.level, "role created");
        Ok(stored)
    }

    /// Create a permission; `resource` and `action` default to the halves of a
    /// dotted name such as `drivers.verify`.
    pub fn create_permission(
        &self,
        new: NewPermission,
        actor: Option<AdminId>,
    ) -> Result<Permission, DomainError> {
        let mut violations = Violations::new();
        violations.require_text("name", &new.name);
        violations.finish()?;

        if let Some(actor) = actor {
            self.authorize(actor, permissions::ROLES_MANAGE)?;
        }

        let name = new.name.trim().to_string();
        let (default_resource, default_action) = match name.split_once('.') {
            Some((resource, action)) => (resource.to_string(), action.to_string()),
            None => (name.clone(), "access".to_string()),
        };
        let resource = new.resource.unwrap_or(default_resource);
        let permission = Permission {
            id: PermissionId::default(),
            category: new.category.unwrap_or_else(|| resource.clone()),
            resource,
            action: new.action.unwrap_or(default_action),
            description: new.description,
            is_active: true,
            name,
        };
        let stored = self.store.permissions().insert(permission)?;
        info!(permission_id = %stored.id, name = %stored.name, "permission created");
        Ok(stored)
    }

    /// Add `permission_id` to the role's set. Re-granting is a no-op.
    pub fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        granted_by: Option<AdminId>,
    ) -> Result<GrantOutcome, DomainError> {
        if let Some(actor) = granted_by {
            self.authorize(actor, permissions::ROLES_MANAGE)?;
        }
        self.role(role_id)?;
        self.permission(permission_id)?;

        if self.grant_exists(role_id, permission_id)? {
            debug!(%role_id, %permission_id, "permission already granted");
            return Ok(GrantOutcome::AlreadyGranted);
        }

        let grant = RolePermission {
            id: Default::default(),
            role_id,
            permission_id,
            assigned_by: granted_by,
            assigned_at: self.clock.now(),
        };
        match self.store.role_permissions().insert(grant) {
            Ok(_) => {
                info!(%role_id, %permission_id, ?granted_by, "permission granted");
                Ok(GrantOutcome::Granted)
            }
            // lost a race with an identical grant
            Err(RepositoryError::Conflict { .. }) => Ok(GrantOutcome::AlreadyGranted),
            Err(other) => Err(other.into()),
        }
    }

    /// Remove `permission_id` from the role's set; returns whether a grant was removed.
    pub fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        actor: Option<AdminId>,
    ) -> Result<bool, DomainError> {
        if let Some(actor) = actor {
            self.authorize(actor, permissions::ROLES_MANAGE)?;
        }
        self.role(role_id)?;
        self.permission(permission_id)?;

        let removed = self.store.role_permissions().delete_where(&[
            Filter::equals("role_id", role_id.0),
            Filter::equals("permission_id", permission_id.0),
        ])?;
        if removed > 0 {
            info!(%role_id, %permission_id, ?actor, "permission revoked");
        }
        Ok(removed > 0)
    }

    /// Replace the role's permission set with exactly `permission_ids`.
    ///
    /// Not atomic across grants. Stale grants are removed before new ones are
    /// added, so an interrupted sync leaves a subset of the old set, and a
    /// re-run diffs against what is stored and converges.
    pub fn sync_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
        granted_by: Option<AdminId>,
    ) -> Result<Vec<Permission>, DomainError> {
        if let Some(actor) = granted_by {
            self.authorize(actor, permissions::ROLES_MANAGE)?;
        }
        self.role(role_id)?;

        let wanted: BTreeSet<PermissionId> = permission_ids.iter().copied().collect();
        let mut missing = Vec::new();
        for permission_id in &wanted {
            if self.store.permissions().fetch(*permission_id)?.is_none() {
                missing.push(permission_id.0);
            }
        }
        if !missing.is_empty() {
            return Err(DomainError::not_found(format!(
                "permission ids not found: {}",
                join_ids(&missing)
            )));
        }

        let current: BTreeSet<PermissionId> = self
            .grants_for(role_id)?
            .into_iter()
            .map(|grant| grant.permission_id)
            .collect();

        for stale in current.difference(&wanted) {
            self.store.role_permissions().delete_where(&[
                Filter::equals("role_id", role_id.0),
                Filter::equals("permission_id", stale.0),
            ])?;
        }
        for fresh in wanted.difference(&current) {
            self.assign_permission(role_id, *fresh, None)?;
        }

        info!(%role_id, count = wanted.len(), ?granted_by, "role permissions synced");
        self.permissions_for(role_id)
    }

    /// Permissions granted to a role, ordered by name.
    pub fn permissions_for(&self, role_id: RoleId) -> Result<Vec<Permission>, DomainError> {
        self.role(role_id)?;
        let mut granted = Vec::new();
        for grant in self.grants_for(role_id)? {
            if let Some(permission) = self.store.permissions().fetch(grant.permission_id)? {
                granted.push(permission);
            }
        }
        granted.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(granted)
    }

    /// Active roles ordered by level descending, then name ascending.
    pub fn hierarchy(&self) -> Result<Vec<Role>, DomainError> {
        let query = Query::new()
            .filter(Filter::equals("is_active", true))
            .sort_by(SortKey::desc("level"))
            .sort_by(SortKey::asc("name"))
            .all();
        Ok(self.store.roles().find(&query)?.items)
    }

    /// Active roles a holder of `acting_role` may grant: those at or below its level.
    pub fn roles_assignable_by(&self, acting_role: RoleId) -> Result<Vec<Role>, DomainError> {
        let acting = self.role(acting_role)?;
        if !acting.is_active {
            debug!(role_id = %acting.id, "inactive role carries no authority");
            return Ok(Vec::new());
        }
        Ok(self
            .hierarchy()?
            .into_iter()
            .filter(|role| acting.can_assign(role))
            .collect())
    }

    pub fn deactivate_role(&self, role_id: RoleId, actor: Option<AdminId>) -> Result<Role, DomainError> {
        self.set_role_active(role_id, false, actor)
    }

    pub fn restore_role(&self, role_id: RoleId, actor: Option<AdminId>) -> Result<Role, DomainError> {
        self.set_role_active(role_id, true, actor)
    }

    pub fn create_admin(&self, new: NewAdmin) -> Result<AdminUser, DomainError> {
        let mut violations = Violations::new();
        violations.require_text("name", &new.name);
        violations.require_email("email", &new.email);
        violations.finish()?;

        let admin = AdminUser {
            id: AdminId::default(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_lowercase(),
            is_active: true,
            created_at: self.clock.now(),
        };
        let stored = self.store.admins().insert(admin)?;
        info!(admin_id = %stored.id, "admin created");
        Ok(stored)
    }

    /// Active roles held by `admin_id`, most senior first.
    pub fn admin_roles(&self, admin_id: AdminId) -> Result<Vec<Role>, DomainError> {
        let memberships = self
            .store
            .memberships()
            .find(&Query::new().filter(Filter::equals("admin_id", admin_id.0)).all())?;
        let held: BTreeSet<RoleId> = memberships
            .items
            .into_iter()
            .map(|membership| membership.role_id)
            .collect();
        Ok(self
            .hierarchy()?
            .into_iter()
            .filter(|role| held.contains(&role.id))
            .collect())
    }

    pub fn admin_profile(&self, admin_id: AdminId) -> Result<AdminProfile, DomainError> {
        let admin = self.admin(admin_id)?;
        let roles = self.admin_roles(admin_id)?;
        Ok(AdminProfile::new(admin, roles))
    }

    /// Highest level among the admin's active roles.
    pub fn authority_of(&self, admin_id: AdminId) -> Result<Option<u32>, DomainError> {
        Ok(self
            .admin_roles(admin_id)?
            .iter()
            .map(|role| role.level)
            .max())
    }

    /// Give `admin_id` the role. An acting admin needs authority at or above the role's level.
    pub fn assign_role(
        &self,
        admin_id: AdminId,
        role_id: RoleId,
        actor: Option<AdminId>,
    ) -> Result<AdminProfile, DomainError> {
        self.admin(admin_id)?;
        let role = self.role(role_id)?;
        if !role.is_active {
            return Err(DomainError::invalid_argument(format!(
                "role '{}' is inactive and cannot be assigned",
                role.name
            )));
        }
        if let Some(actor) = actor {
            self.require_authority(actor, permissions::ADMINS_MANAGE, role.level, &role.name)?;
        }

        let membership = RoleMembership {
            id: Default::default(),
            admin_id,
            role_id,
            assigned_by: actor,
            assigned_at: self.clock.now(),
        };
        match self.store.memberships().insert(membership) {
            Ok(_) => info!(%admin_id, %role_id, ?actor, "role assigned"),
            Err(RepositoryError::Conflict { .. }) => {
                debug!(%admin_id, %role_id, "role already held")
            }
            Err(other) => return Err(other.into()),
        }
        self.admin_profile(admin_id)
    }

    pub fn revoke_role(
        &self,
        admin_id: AdminId,
        role_id: RoleId,
        actor: Option<AdminId>,
    ) -> Result<AdminProfile, DomainError> {
        self.admin(admin_id)?;
        let role = self.role(role_id)?;
        if let Some(actor) = actor {
            self.require_authority(actor, permissions::ADMINS_MANAGE, role.level, &role.name)?;
        }

        let removed = self.store.memberships().delete_where(&[
            Filter::equals("admin_id", admin_id.0),
            Filter::equals("role_id", role_id.0),
        ])?;
        if removed > 0 {
            info!(%admin_id, %role_id, ?actor, "role revoked");
        }
        self.admin_profile(admin_id)
    }

    /// Whether the admin holds `permission` through any active role.
    pub fn has_permission(&self, admin_id: AdminId, permission: &str) -> Result<bool, DomainError> {
        let Some(permission) = self.permission_named(permission)? else {
            return Ok(false);
        };
        if !permission.is_active {
            return Ok(false);
        }
        let role_ids: Vec<u64> = self
            .admin_roles(admin_id)?
            .into_iter()
            .map(|role| role.id.0)
            .collect();
        if role_ids.is_empty() {
            return Ok(false);
        }
        let grants = self.store.role_permissions().find(
            &Query::new()
                .filter(Filter::one_of("role_id", role_ids))
                .filter(Filter::equals("permission_id", permission.id.0))
                .all(),
        )?;
        Ok(grants.total > 0)
    }

    fn grants_for(&self, role_id: RoleId) -> Result<Vec<RolePermission>, DomainError> {
        Ok(self
            .store
            .role_permissions()
            .find(&Query::new().filter(Filter::equals("role_id", role_id.0)).all())?
            .items)
    }

    fn grant_exists(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool, DomainError> {
        let grants = self.store.role_permissions().find(
            &Query::new()
                .filter(Filter::equals("role_id", role_id.0))
                .filter(Filter::equals("permission_id", permission_id.0))
                .all(),
        )?;
        Ok(grants.total > 0)
    }

    fn set_role_active(
        &self,
        role_id: RoleId,
        active: bool,
        actor: Option<AdminId>,
    ) -> Result<Role, DomainError> {
        let role = self.role(role_id)?;
        if let Some(actor) = actor {
            self.require_authority(actor, permissions::ROLES_MANAGE, role.level, &role.name)?;
        }
        let updated = self
            .store
            .roles()
            .modify(role_id, |role| role.is_active = active)?;
        info!(%role_id, active, ?actor, "role activity changed");
        Ok(updated)
    }

    fn require_authority(
        &self,
        actor: AdminId,
        permission: &str,
        level: u32,
        role_name: &str,
    ) -> Result<(), DomainError> {
        self.authorize(actor, permission)?;
        let authority = self.authority_of(actor)?.unwrap_or(0);
        if level > authority {
            warn!(%actor, authority, level, role = role_name, "role outranks acting admin");
            return Err(DomainError::insufficient_authority(format!(
                "admin {actor} (level {authority}) cannot manage role '{role_name}' (level {level})"
            )));
        }
        Ok(())
    }
}

impl<S> Authorizer for AccessControlService<S>
where
    S: AccessStore + 'static,
{
    fn authorize(&self, admin_id: AdminId, permission: &str) -> Result<(), DomainError> {
        let admin = self.admin(admin_id)?;
        if !admin.is_active {
            warn!(%admin_id, permission, "inactive admin attempted an action");
            return Err(DomainError::insufficient_authority(format!(
                "admin {admin_id} is inactive"
            )));
        }
        if !self.has_permission(admin_id, permission)? {
            warn!(%admin_id, permission, "permission denied");
            return Err(DomainError::insufficient_authority(format!(
                "admin {admin_id} lacks permission '{permission}'"
            )));
        }
        Ok(())
    }
}
