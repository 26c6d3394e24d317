use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Record, Repository, RepositoryError};
use crate::query::{compare_records, validate_fields, validate_operands, Filter, Page, Query};
use crate::workflows::access::{
    AccessStore, AdminUser, Permission, Role, RoleMembership, RolePermission,
};
use crate::workflows::matching::{release_placements, DriverMatch, DriverRequest, MatchingStore};
use crate::workflows::verification::{
    Company, Document, Driver, DriverId, IdentityCheck, VerificationStore,
};

struct Rows<T: Record> {
    next_id: u64,
    records: BTreeMap<T::Id, T>,
}

/// Mutex-guarded table; every repository call holds the lock for its whole
/// duration, which makes each call atomic with respect to the others.
pub struct InMemoryTable<T: Record> {
    rows: Mutex<Rows<T>>,
}

impl<T: Record> Default for InMemoryTable<T> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Rows {
                next_id: 1,
                records: BTreeMap::new(),
            }),
        }
    }
}

impl<T: Record> InMemoryTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rows<T>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable(format!("{} table lock poisoned", T::ENTITY)))
    }
}

impl<T: Record> Repository<T> for InMemoryTable<T> {
    fn insert(&self, mut record: T) -> Result<T, RepositoryError> {
        let mut rows = self.lock()?;
        if let Some(key) = record.unique_key() {
            let taken = rows
                .records
                .values()
                .any(|existing| existing.unique_key().as_deref() == Some(key.as_str()));
            if taken {
                return Err(RepositoryError::Conflict {
                    entity: T::ENTITY,
                    key,
                });
            }
        }

        let id = T::Id::from(rows.next_id);
        rows.next_id += 1;
        record.assign_id(id);
        rows.records.insert(id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: T::Id) -> Result<Option<T>, RepositoryError> {
        let rows = self.lock()?;
        Ok(rows.records.get(&id).cloned())
    }

    fn modify<F>(&self, id: T::Id, change: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut T),
    {
        let mut rows = self.lock()?;
        let record = rows
            .records
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound {
                entity: T::ENTITY,
                id: id.into(),
            })?;
        change(record);
        Ok(record.clone())
    }

    fn modify_many<F>(&self, ids: &[T::Id], mut change: F) -> Result<Vec<T>, RepositoryError>
    where
        F: FnMut(&mut T),
    {
        let mut rows = self.lock()?;
        let missing: Vec<u64> = ids
            .iter()
            .filter(|id| {
                rows.records
                    .get(*id)
                    .map_or(true, |record| record.deleted_at().is_some())
            })
            .map(|id| (*id).into())
            .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::Missing {
                entity: T::ENTITY,
                ids: missing,
            });
        }

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = rows.records.get_mut(id) {
                change(record);
                updated.push(record.clone());
            }
        }
        Ok(updated)
    }

    fn find(&self, query: &Query) -> Result<Page<T>, RepositoryError> {
        query.validate(T::ENTITY, T::FIELDS)?;
        let rows = self.lock()?;
        let mut matched: Vec<T> = rows
            .records
            .values()
            .filter(|record| query.trashed.admits(record.deleted_at().is_some()))
            .filter(|record| query.filters.iter().all(|filter| filter.matches(*record)))
            .cloned()
            .collect();
        drop(rows);

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| compare_records(a, b, &query.sort));
        }
        Ok(query.page.slice(matched))
    }

    fn delete_where(&self, filters: &[Filter]) -> Result<usize, RepositoryError> {
        if filters.is_empty() {
            return Err(RepositoryError::InvalidQuery(format!(
                "refusing to delete every {} without a filter",
                T::ENTITY
            )));
        }
        validate_fields(T::ENTITY, T::FIELDS, filters.iter().map(Filter::field))?;
        validate_operands(filters)?;

        let mut rows = self.lock()?;
        let before = rows.records.len();
        rows.records
            .retain(|_, record| !filters.iter().all(|filter| filter.matches(&*record)));
        Ok(before - rows.records.len())
    }
}

/// Every table the back office needs, held in memory.
#[derive(Default)]
pub struct MemoryStore {
    drivers: InMemoryTable<Driver>,
    companies: InMemoryTable<Company>,
    documents: InMemoryTable<Document>,
    checks: InMemoryTable<IdentityCheck>,
    requests: InMemoryTable<DriverRequest>,
    matches: InMemoryTable<DriverMatch>,
    roles: InMemoryTable<Role>,
    permissions: InMemoryTable<Permission>,
    role_permissions: InMemoryTable<RolePermission>,
    admins: InMemoryTable<AdminUser>,
    memberships: InMemoryTable<RoleMembership>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerificationStore for MemoryStore {
    type Drivers = InMemoryTable<Driver>;
    type Companies = InMemoryTable<Company>;
    type Documents = InMemoryTable<Document>;
    type Checks = InMemoryTable<IdentityCheck>;

    fn drivers(&self) -> &Self::Drivers {
        &self.drivers
    }

    fn companies(&self) -> &Self::Companies {
        &self.companies
    }

    fn documents(&self) -> &Self::Documents {
        &self.documents
    }

    fn checks(&self) -> &Self::Checks {
        &self.checks
    }

    fn release_driver(&self, driver_id: DriverId) -> Result<usize, RepositoryError> {
        release_placements(self, driver_id)
    }
}

impl MatchingStore for MemoryStore {
    type Requests = InMemoryTable<DriverRequest>;
    type Matches = InMemoryTable<DriverMatch>;

    fn requests(&self) -> &Self::Requests {
        &self.requests
    }

    fn matches(&self) -> &Self::Matches {
        &self.matches
    }
}

impl AccessStore for MemoryStore {
    type Roles = InMemoryTable<Role>;
    type Permissions = InMemoryTable<Permission>;
    type RolePermissions = InMemoryTable<RolePermission>;
    type Admins = InMemoryTable<AdminUser>;
    type Memberships = InMemoryTable<RoleMembership>;

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn permissions(&self) -> &Self::Permissions {
        &self.permissions
    }

    fn role_permissions(&self) -> &Self::RolePermissions {
        &self.role_permissions
    }

    fn admins(&self) -> &Self::Admins {
        &self.admins
    }

    fn memberships(&self) -> &Self::Memberships {
        &self.memberships
    }
}
