use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::http::Responder;
use crate::store::MemoryStore;
use crate::workflows::access::{
    seed_access_control, AccessControlService, AccessSeed, AdminId, NewAdmin, Role,
};
use crate::workflows::verification::{
    verification_router, Company, CompanyRegistration, Driver, DriverRegistration,
    VerificationConfig, VerificationService,
};

pub(crate) fn driver_registration(first_name: &str) -> DriverRegistration {
    DriverRegistration {
        first_name: first_name.to_string(),
        last_name: "Okafor".to_string(),
        email: format!("{}@drivers.test", first_name.to_lowercase()),
        phone: Some("+234 803 555 0100".to_string()),
    }
}

pub(crate) fn company_registration(name: &str) -> CompanyRegistration {
    CompanyRegistration {
        name: name.to_string(),
        email: format!("ops@{}.test", name.to_lowercase().replace(' ', "-")),
        phone: None,
        registration_number: Some("RC-104233".to_string()),
    }
}

pub(super) struct Harness {
    pub(super) access: Arc<AccessControlService<MemoryStore>>,
    pub(super) service: Arc<VerificationService<MemoryStore>>,
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

    pub(super) fn reviewer(&self) -> AdminId {
        let verifier = self.seed.verifier.clone();
        self.admin_with_role("Reviewer", &verifier)
    }

    pub(super) fn driver(&self, first_name: &str) -> Driver {
        self.service
            .register_driver(driver_registration(first_name))
            .expect("driver registered")
    }

    pub(super) fn company(&self, name: &str) -> Company {
        self.service
            .register_company(company_registration(name))
            .expect("company registered")
    }

    pub(super) fn router(&self) -> axum::Router {
        verification_router(self.service.clone(), Responder::new(true))
    }
}

pub(super) fn harness() -> Harness {
    harness_with(VerificationConfig::default())
}

pub(super) fn harness_with(config: VerificationConfig) -> Harness {
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
    let service = Arc::new(VerificationService::new(store, access.clone(), config));
    Harness {
        access,
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
