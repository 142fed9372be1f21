use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use hk_core::models::DeploymentInfo;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct DeployBody {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub output: &'static str,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct PortResponse {
    pub port: u16,
}

pub async fn deploy(
    State(state): State<AppState>,
    payload: Result<Json<DeployBody>, JsonRejection>,
) -> Result<Json<DeployResponse>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::bad_request("Invalid JSON"))?;
    let (path, email) = (body.path.trim(), body.email.trim());
    if path.is_empty() || email.is_empty() {
        return Err(ApiError::bad_request("Path and email is required"));
    }

    // Unknown identities are reported ahead of path problems.
    state.launcher.port_for(email)?;
    let root = state.store.deploy_path(path)?;

    tracing::info!(email, path, root = %root.display(), "deploy requested");
    let outcome = state.launcher.deploy(email, &root).await?;
    Ok(Json(DeployResponse {
        output: "running",
        port: outcome.port,
    }))
}

pub async fn stop(
    State(state): State<AppState>,
    payload: Result<Json<EmailBody>, JsonRejection>,
) -> Result<Json<StopResponse>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::bad_request("Invalid JSON"))?;
    let email = required_email(&body.email)?;
    let port = state.launcher.port_for(email)?;
    let stopped = state.launcher.stop(email).await?;
    Ok(Json(StopResponse { stopped, port }))
}

pub async fn get_user_port(
    State(state): State<AppState>,
    Query(query): Query<EmailBody>,
) -> Result<Json<PortResponse>, ApiError> {
    let email = required_email(&query.email)?;
    let port = state.launcher.port_for(email)?;
    Ok(Json(PortResponse { port }))
}

pub async fn list_deployments(State(state): State<AppState>) -> Json<Vec<DeploymentInfo>> {
    Json(state.launcher.deployments())
}

fn required_email(raw: &str) -> Result<&str, ApiError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    Ok(email)
}
