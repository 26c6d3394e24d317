use std::sync::Arc;

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::http::Responder;
use crate::store::MemoryStore;
use crate::workflows::access::{
    access_router, seed_access_control, AccessControlService, AccessSeed, AdminId, NewAdmin,
    NewRole, Role,
};

pub(super) struct Harness {
    pub(super) service: Arc<AccessControlService<MemoryStore>>,
    pub(super) seed: AccessSeed,
}

impl Harness {
    pub(super) fn root(&self) -> AdminId {
        self.seed.bootstrap.admin.id
    }

    /// Create an admin holding `role`, assigned by the bootstrap admin.
    pub(super) fn admin_with_role(&self, name: &str, role: &Role) -> AdminId {
        let admin = self
            .service
            .create_admin(NewAdmin {
                name: name.to_string(),
                email: format!("{}@fleetdesk.test", name.to_lowercase()),
            })
            .expect("admin created");
        self.service
            .assign_role(admin.id, role.id, Some(self.root()))
            .expect("role assigned");
        admin.id
    }

    pub(super) fn router(&self) -> axum::Router {
        access_router(self.service.clone(), Responder::new(true))
    }
}

pub(super) fn harness() -> Harness {
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap());
    let service = Arc::new(AccessControlService::with_clock(
        Arc::new(MemoryStore::new()),
        Arc::new(clock),
    ));
    let seed = seed_access_control(
        &service,
        NewAdmin {
            name: "Root".to_string(),
            email: "root@fleetdesk.test".to_string(),
        },
    )
    .expect("seed succeeds");
    Harness { service, seed }
}

pub(super) fn new_role(name: &str, level: u32) -> NewRole {
    NewRole {
        name: name.to_string(),
        level,
        parent_id: None,
        description: None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
