//! `service` crate: per-entity services over the generic record mapper.
//!
//! Services validate required fields, apply the list policy (an empty table
//! is reported as [`ServiceError::NoRecords`]) and expose the health check.

pub mod entity;
pub mod error;
pub mod health;
pub mod required;

use std::sync::Arc;

use db::models::{AuditEntry, BusinessUnit, Equipment, EquipmentAssignment, Manufacturer, User};
use db::RecordMapper;

pub use entity::EntityService;
pub use error::ServiceError;
pub use health::{HealthReport, HealthService, HealthState, ServiceHealth};
pub use required::RequiredFields;

/// Every service the HTTP layer needs, sharing one mapper.
pub struct Services {
    pub business_units: EntityService<BusinessUnit>,
    pub equipment: EntityService<Equipment>,
    pub assignments: EntityService<EquipmentAssignment>,
    pub manufacturers: EntityService<Manufacturer>,
    pub users: EntityService<User>,
    pub audit_log: EntityService<AuditEntry>,
    pub health: HealthService,
}

impl Services {
    pub fn new(mapper: Arc<RecordMapper>) -> Self {
        Self {
            business_units: EntityService::new(mapper.clone()),
            equipment: EntityService::new(mapper.clone()),
            assignments: EntityService::new(mapper.clone()),
            manufacturers: EntityService::new(mapper.clone()),
            users: EntityService::new(mapper.clone()),
            audit_log: EntityService::new(mapper.clone()),
            health: HealthService::new(mapper.manager().clone()),
        }
    }
}
