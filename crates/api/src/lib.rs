//! `api` crate: HTTP REST API layer.
//!
//! Exposes, under a configurable root path:
//!   GET    /                      (403)
//!   GET    /health
//!   POST   /{resource}  and  /{resource}/
//!   GET    /{resource}/
//!   GET    /{resource}/{id}
//!   PUT    /{resource}/{id}
//!   DELETE /{resource}/{id}
//!   GET    /audit_log/
//!   GET    /audit_log/{log_id}
//!
//! where `{resource}` is one of `business_unit`, `equipment`,
//! `equipment_assignment`, `manufacturer` or `user`.

pub mod error;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use db::models::{AuditEntry, BusinessUnit, Equipment, EquipmentAssignment, Manufacturer, User};
use serde::{de::DeserializeOwned, Serialize};
use service::{RequiredFields, Services};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use handlers::records::{self, Resource};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

/// Build the application router. An empty or `/` root path mounts the
/// routes at the server root.
pub fn router(state: AppState, root_path: &str) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .merge(crud::<BusinessUnit>())
        .merge(crud::<Equipment>())
        .merge(crud::<EquipmentAssignment>())
        .merge(crud::<Manufacturer>())
        .merge(crud::<User>())
        .merge(read_only::<AuditEntry>());

    let app = match normalize_root(root_path) {
        Some(root) => Router::new().nest(&root, routes),
        None => routes,
    };

    app.layer(cors()).layer(TraceLayer::new_for_http()).with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: &str, state: AppState, root_path: &str, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}{}", listener.local_addr()?, root_path);
    axum::serve(listener, router(state, root_path))
        .with_graceful_shutdown(shutdown)
        .await
}

fn crud<R>() -> Router<AppState>
where
    R: Resource + RequiredFields + DeserializeOwned,
    R::Id: DeserializeOwned + Serialize,
{
    Router::new()
        .route(
            &format!("/{}", R::PATH),
            get(records::list::<R>).post(records::create::<R>),
        )
        .route(
            &format!("/{}/", R::PATH),
            get(records::list::<R>).post(records::create::<R>),
        )
        .route(
            &format!("/{}/:id", R::PATH),
            get(records::get::<R>)
                .put(records::update::<R>)
                .delete(records::delete::<R>),
        )
}

fn read_only<R>() -> Router<AppState>
where
    R: Resource,
    R::Id: DeserializeOwned,
{
    Router::new()
        .route(&format!("/{}/", R::PATH), get(records::list::<R>))
        .route(&format!("/{}/:id", R::PATH), get(records::get::<R>))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

fn normalize_root(root_path: &str) -> Option<String> {
    let trimmed = root_path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('/') {
        Some(trimmed.to_owned())
    } else {
        Some(format!("/{trimmed}"))
    }
}
