use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::http::Responder;
use crate::store::MemoryStore;
use crate::workflows::access::{
    seed_access_control, AccessControlService, AccessSeed, AdminId, NewAdmin, Role,
};
use crate::workflows::matching::{
    matching_router, DriverRequest, MatchingService, NewDriverRequest,
};
use crate::workflows::verification::tests::common::{company_registration, driver_registration};
use crate::workflows::verification::{
    Company, Driver, VerificationConfig, VerificationService, VerificationStatus,
};

pub(super) struct Harness {
    pub(super) access: Arc<AccessControlService<MemoryStore>>,
    pub(super) verification: Arc<VerificationService<MemoryStore>>,
    pub(super) service: Arc<MatchingService<MemoryStore>>,
    pub(super) seed: AccessSeed,
}

impl Harness {
    pub(super) fn root(&self) -> AdminId {
        self.seed.bootstrap.admin.id
    }

    pub(super) fn admin_with_role(&self, name: &str, role: &Role) -> AdminId {
        let admin = self
            .access
            .create_admin(NewAdmin {
                name: name.to_string(),
                email: format!("{}@fleetdesk.test", name.to_lowercase()),
            })
            .expect("admin created");
        self.access
            .assign_role(admin.id, role.id, Some(self.root()))
            .expect("role assigned");
        admin.id
    }

    pub(super) fn pending_driver(&self, first_name: &str) -> Driver {
        self.verification
            .register_driver(driver_registration(first_name))
            .expect("driver registered")
    }

    pub(super) fn verified_driver(&self, first_name: &str) -> Driver {
        let driver = self.pending_driver(first_name);
        self.verification
            .set_driver_status(driver.id, VerificationStatus::Verified, self.root(), None)
            .expect("driver verified")
            .into_inner()
    }

    pub(super) fn verified_company(&self, name: &str) -> Company {
        let company = self
            .verification
            .register_company(company_registration(name))
            .expect("company registered");
        self.verification
            .set_company_status(company.id, VerificationStatus::Verified, self.root(), None)
            .expect("company verified")
            .into_inner()
    }

    pub(super) fn request_for(&self, company: &Company, drivers_needed: u32) -> DriverRequest {
        self.service
            .open_request(NewDriverRequest {
                company_id: company.id,
                title: format!("{} haulage drivers", company.name),
                drivers_needed,
            })
            .expect("request opened")
    }

    pub(super) fn router(&self) -> axum::Router {
        matching_router(self.service.clone(), Responder::new(true))
    }
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let access = Arc::new(AccessControlService::new(store.clone()));
    let seed = seed_access_control(
        &access,
        NewAdmin {
            name: "Root".to_string(),
            email: "root@fleetdesk.test".to_string(),
        },
    )
    .expect("seed succeeds");
    let verification = Arc::new(VerificationService::new(
        store.clone(),
        access.clone(),
        VerificationConfig::default(),
    ));
    let service = Arc::new(MatchingService::new(store, access.clone()));
    Harness {
        access,
        verification,
        service,
        seed,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
