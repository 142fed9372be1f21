use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use hk_core::models::{DirectoryEntry, UploadedFile};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub directory: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub directory: String,
}

#[derive(Debug, Deserialize)]
pub struct FolderBody {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub directory: String,
}

pub async fn test_api() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    Ok(Json(state.store.list(&query.directory).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<ProjectBody>, JsonRejection>,
) -> Result<(StatusCode, Json<String>), ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::bad_request("Invalid JSON"))?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Project name is required"));
    }
    state.store.create_project(&body.directory, name).await?;
    Ok((StatusCode::CREATED, Json(name.to_string())))
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let form = UploadForm::read(multipart).await?;
    let project = form.project()?;
    if form.files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let files = form
        .files
        .into_iter()
        .map(|(file_name, contents)| UploadedFile::new(file_name, contents))
        .collect();
    state
        .store
        .upload_files(&form.directory, &project, files)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Files uploaded successfully" })),
    ))
}

pub async fn upload_folder(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let form = UploadForm::read(multipart).await?;
    let project = form.project()?;
    if form.files.is_empty() || form.files.len() != form.paths.len() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let files = form
        .files
        .into_iter()
        .zip(form.paths)
        .map(|((_, contents), relative_path)| UploadedFile::new(relative_path, contents))
        .collect();
    state
        .store
        .upload_folder(&form.directory, &project, files)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Folder and files uploaded successfully" })),
    ))
}

pub async fn delete_folder(
    State(state): State<AppState>,
    payload: Result<Json<FolderBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::bad_request("Invalid JSON data"))?;
    let (project, folder) = (body.project.trim(), body.folder.trim());
    if project.is_empty() || folder.is_empty() {
        return Err(ApiError::bad_request("Project and folder name are required"));
    }
    state
        .store
        .delete_folder(&body.directory, project, folder)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Folder deleted successfully",
    })))
}

pub async fn delete_project(
    State(state): State<AppState>,
    payload: Result<Json<ProjectBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::bad_request("Invalid JSON data"))?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Project name is required"));
    }
    state.store.delete_project(&body.directory, name).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Project {name} deleted successfully"),
    })))
}

/// Fields shared by both upload endpoints. `file` and `files` parts are
/// collected in order; `paths` parts pair up with them by position.
#[derive(Default)]
struct UploadForm {
    project: String,
    directory: String,
    files: Vec<(String, Vec<u8>)>,
    paths: Vec<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "project" => form.project = field.text().await.map_err(multipart_error)?,
                "directory" => form.directory = field.text().await.map_err(multipart_error)?,
                "paths" => form.paths.push(field.text().await.map_err(multipart_error)?),
                "file" | "files" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let contents = field.bytes().await.map_err(multipart_error)?;
                    form.files.push((file_name, contents.to_vec()));
                }
                other => tracing::debug!(field = other, "ignoring unknown upload field"),
            }
        }
        Ok(form)
    }

    fn project(&self) -> Result<String, ApiError> {
        let project = self.project.trim();
        if project.is_empty() {
            return Err(ApiError::bad_request("Project name is required"));
        }
        Ok(project.to_string())
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::bad_request(format!("Invalid upload: {}", e.body_text()))
}
