use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use db::models::{AuditEntry, BusinessUnit, Equipment, EquipmentAssignment, Manufacturer, User};
use db::Record;
use serde::{de::DeserializeOwned, Serialize};
use service::{EntityService, RequiredFields, Services};

use super::AppState;
use crate::error::ApiError;

/// A record kind exposed over HTTP.
pub trait Resource: Record + Serialize {
    /// Path segment under the root path, e.g. `business_unit`.
    const PATH: &'static str;

    fn service(services: &Services) -> &EntityService<Self>;
}

impl Resource for BusinessUnit {
    const PATH: &'static str = "business_unit";
    fn service(services: &Services) -> &EntityService<Self> {
        &services.business_units
    }
}

impl Resource for Equipment {
    const PATH: &'static str = "equipment";
    fn service(services: &Services) -> &EntityService<Self> {
        &services.equipment
    }
}

impl Resource for EquipmentAssignment {
    const PATH: &'static str = "equipment_assignment";
    fn service(services: &Services) -> &EntityService<Self> {
        &services.assignments
    }
}

impl Resource for Manufacturer {
    const PATH: &'static str = "manufacturer";
    fn service(services: &Services) -> &EntityService<Self> {
        &services.manufacturers
    }
}

impl Resource for User {
    const PATH: &'static str = "user";
    fn service(services: &Services) -> &EntityService<Self> {
        &services.users
    }
}

impl Resource for AuditEntry {
    const PATH: &'static str = "audit_log";
    fn service(services: &Services) -> &EntityService<Self> {
        &services.audit_log
    }
}

#[derive(Serialize)]
pub struct Created<I> {
    pub id: I,
}

pub async fn list<R: Resource>(State(state): State<AppState>) -> Result<Json<Vec<R>>, ApiError> {
    Ok(Json(R::service(&state.services).list().await?))
}

pub async fn get<R>(
    Path(id): Path<R::Id>,
    State(state): State<AppState>,
) -> Result<Json<R>, ApiError>
where
    R: Resource,
    R::Id: DeserializeOwned,
{
    Ok(Json(R::service(&state.services).get(id).await?))
}

pub async fn create<R>(
    State(state): State<AppState>,
    Json(record): Json<R>,
) -> Result<(StatusCode, Json<Created<R::Id>>), ApiError>
where
    R: Resource + RequiredFields + DeserializeOwned,
    R::Id: Serialize,
{
    let id = R::service(&state.services).add(&record).await?;
    Ok((StatusCode::ACCEPTED, Json(Created { id })))
}

pub async fn update<R>(
    Path(id): Path<R::Id>,
    State(state): State<AppState>,
    Json(record): Json<R>,
) -> Result<StatusCode, ApiError>
where
    R: Resource + RequiredFields + DeserializeOwned,
    R::Id: DeserializeOwned,
{
    R::service(&state.services).update(id, &record).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn delete<R>(
    Path(id): Path<R::Id>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError>
where
    R: Resource,
    R::Id: DeserializeOwned,
{
    R::service(&state.services).delete(id).await?;
    Ok(StatusCode::OK)
}
