use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::FieldValue;
use crate::store::{entity_id, Record};

entity_id!(
    /// Back-office administrator identifier; every mutating call names one.
    AdminId
);
entity_id!(RoleId);
entity_id!(PermissionId);
entity_id!(GrantId);
entity_id!(MembershipId);

/// A named authority level. Higher `level` means more authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub level: u32,
    pub parent_id: Option<RoleId>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// A role may hand out `other` when it sits at or above `other`'s level.
    pub fn can_assign(&self, other: &Role) -> bool {
        other.level <= self.level
    }
}

impl Record for Role {
    type Id = RoleId;
    const ENTITY: &'static str = "role";
    const FIELDS: &'static [&'static str] =
        &["id", "name", "level", "parent_id", "is_active", "created_at"];

    fn id(&self) -> RoleId {
        self.id
    }

    fn assign_id(&mut self, id: RoleId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "name" => Some(self.name.clone().into()),
            "level" => Some(self.level.into()),
            "parent_id" => Some(self.parent_id.map(|id| id.0).into()),
            "is_active" => Some(self.is_active.into()),
            "created_at" => Some(self.created_at.into()),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(natural_key(&self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub category: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl Record for Permission {
    type Id = PermissionId;
    const ENTITY: &'static str = "permission";
    const FIELDS: &'static [&'static str] =
        &["id", "name", "category", "resource", "action", "is_active"];

    fn id(&self) -> PermissionId {
        self.id
    }

    fn assign_id(&mut self, id: PermissionId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "name" => Some(self.name.clone().into()),
            "category" => Some(self.category.clone().into()),
            "resource" => Some(self.resource.clone().into()),
            "action" => Some(self.action.clone().into()),
            "is_active" => Some(self.is_active.into()),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(natural_key(&self.name))
    }
}

/// Role ⇄ permission assignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub id: GrantId,
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    /// `None` when granted by seeding rather than by an administrator.
    pub assigned_by: Option<AdminId>,
    pub assigned_at: DateTime<Utc>,
}

impl Record for RolePermission {
    type Id = GrantId;
    const ENTITY: &'static str = "role permission";
    const FIELDS: &'static [&'static str] = &["id", "role_id", "permission_id", "assigned_by"];

    fn id(&self) -> GrantId {
        self.id
    }

    fn assign_id(&mut self, id: GrantId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "role_id" => Some(self.role_id.0.into()),
            "permission_id" => Some(self.permission_id.0.into()),
            "assigned_by" => Some(self.assigned_by.map(|id| id.0).into()),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.role_id, self.permission_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: AdminId,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for AdminUser {
    type Id = AdminId;
    const ENTITY: &'static str = "admin";
    const FIELDS: &'static [&'static str] = &["id", "name", "email", "is_active", "created_at"];

    fn id(&self) -> AdminId {
        self.id
    }

    fn assign_id(&mut self, id: AdminId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "name" => Some(self.name.clone().into()),
            "email" => Some(self.email.clone().into()),
            "is_active" => Some(self.is_active.into()),
            "created_at" => Some(self.created_at.into()),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(natural_key(&self.email))
    }
}

/// Admin ⇄ role membership row; the only source of an admin's roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMembership {
    pub id: MembershipId,
    pub admin_id: AdminId,
    pub role_id: RoleId,
    pub assigned_by: Option<AdminId>,
    pub assigned_at: DateTime<Utc>,
}

impl Record for RoleMembership {
    type Id = MembershipId;
    const ENTITY: &'static str = "role membership";
    const FIELDS: &'static [&'static str] = &["id", "admin_id", "role_id", "assigned_by"];

    fn id(&self) -> MembershipId {
        self.id
    }

    fn assign_id(&mut self, id: MembershipId) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.0.into()),
            "admin_id" => Some(self.admin_id.0.into()),
            "role_id" => Some(self.role_id.0.into()),
            "assigned_by" => Some(self.assigned_by.map(|id| id.0).into()),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.admin_id, self.role_id))
    }
}

/// Admin snapshot with its role set; `role_label` is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminProfile {
    pub admin: AdminUser,
    pub roles: Vec<Role>,
    pub role_label: String,
}

impl AdminProfile {
    pub(crate) fn new(admin: AdminUser, roles: Vec<Role>) -> Self {
        // roles arrive in hierarchy order, so the first is the most senior
        let role_label = roles
            .first()
            .map(|role| role.name.clone())
            .unwrap_or_else(|| "none".to_string());
        Self {
            admin,
            roles,
            role_label,
        }
    }

    pub fn authority(&self) -> Option<u32> {
        self.roles.iter().map(|role| role.level).max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub parent_id: Option<RoleId>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
}

/// Outcome of an idempotent grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOutcome {
    Granted,
    AlreadyGranted,
}

pub(crate) fn natural_key(value: &str) -> String {
    value.trim().to_lowercase()
}
