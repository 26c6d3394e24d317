use super::domain::{Company, Document, Driver, DriverId, IdentityCheck};
use crate::store::{Repository, RepositoryError};

/// Tables backing driver, company, document and identity-check verification.
pub trait VerificationStore: Send + Sync {
    type Drivers: Repository<Driver>;
    type Companies: Repository<Company>;
    type Documents: Repository<Document>;
    type Checks: Repository<IdentityCheck>;

    fn drivers(&self) -> &Self::Drivers;
    fn companies(&self) -> &Self::Companies;
    fn documents(&self) -> &Self::Documents;
    fn checks(&self) -> &Self::Checks;

    /// Drop what other workflows hold for a driver about to be purged and
    /// return how many rows went. Stores without such tables have nothing to drop.
    fn release_driver(&self, _driver_id: DriverId) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}
