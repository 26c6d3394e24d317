use super::domain::{AdminUser, Permission, Role, RoleMembership, RolePermission};
use crate::store::Repository;
use crate::workflows::DomainError;

/// Tables backing role-based access control.
pub trait AccessStore: Send + Sync {
    type Roles: Repository<Role>;
    type Permissions: Repository<Permission>;
    type RolePermissions: Repository<RolePermission>;
    type Admins: Repository<AdminUser>;
    type Memberships: Repository<RoleMembership>;

    fn roles(&self) -> &Self::Roles;
    fn permissions(&self) -> &Self::Permissions;
    fn role_permissions(&self) -> &Self::RolePermissions;
    fn admins(&self) -> &Self::Admins;
    fn memberships(&self) -> &Self::Memberships;
}

/// Gate consulted by other workflows before any mutating operation.
pub trait Authorizer: Send + Sync {
    /// Succeed only when `admin` is active and holds `permission` through an active role.
    fn authorize(&self, admin: super::AdminId, permission: &str) -> Result<(), DomainError>;
}
