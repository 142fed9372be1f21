pub mod deploy;
pub mod error;
pub mod projects;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use hk_core::services::launcher::DeployLauncher;
use hk_core::services::storage::ProjectStore;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub launcher: Arc<DeployLauncher>,
    pub store: Arc<dyn ProjectStore>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        launcher: Arc<DeployLauncher>,
        store: Arc<dyn ProjectStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            launcher,
            store,
            max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/api/test/", get(projects::test_api))
        .route(
            "/api/projects/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/api/projects/list_dynamic/", get(projects::list_projects))
        .route("/api/projects/upload/", post(projects::upload))
        .route("/api/projects/upload_folder/", post(projects::upload_folder))
        .route("/api/projects/delete_folder/", delete(projects::delete_folder))
        .route("/api/projects/delete/", delete(projects::delete_project))
        .route("/api/projects/deploy/", post(deploy::deploy))
        .route("/api/projects/stop/", post(deploy::stop))
        .route("/api/projects/get-user-port/", get(deploy::get_user_port))
        .route("/api/deployments/", get(deploy::list_deployments))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
