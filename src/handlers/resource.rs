//! Resource handlers: list, create, read, replace, merge, delete; singular read and write.

use crate::config::ResourceKind;
use crate::error::AppError;
use crate::response::{created, empty_object, ok};
use crate::service::{CrudService, RequestValidator, UpdateMode};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

/// GET /:name — all records of a collection, or the singular object.
pub async fn list(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    let resource = state
        .model
        .resource(&name)
        .ok_or_else(|| AppError::NotFound(name.clone()))?;
    match resource.kind {
        ResourceKind::Plural => {
            let records = state.store.read(|doc| CrudService::list(doc, &name)).await?;
            Ok(ok(records).into_response())
        }
        ResourceKind::Singular => {
            let value = state.store.read(|doc| CrudService::read_singular(doc, &name)).await?;
            Ok(ok(value).into_response())
        }
    }
}

/// POST /:name — append to a collection, or replace the singular object.
pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let resource = state
        .model
        .resource(&name)
        .ok_or_else(|| AppError::NotFound(name.clone()))?;
    let body = RequestValidator::object_body(&body)?;
    let value = match resource.kind {
        ResourceKind::Plural => {
            let id_field = state.id_field().to_string();
            state
                .store
                .write(|doc| CrudService::create(doc, &name, &id_field, body))
                .await?
        }
        ResourceKind::Singular => {
            state
                .store
                .write(|doc| CrudService::write_singular(doc, &name, body, UpdateMode::Replace))
                .await?
        }
    };
    tracing::debug!(resource = %name, "created");
    Ok(created(value).into_response())
}

/// PUT /:name — replace the singular object.
pub async fn replace_singular(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    write_singular(state, name, body, UpdateMode::Replace).await
}

/// PATCH /:name — merge into the singular object.
pub async fn merge_singular(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    write_singular(state, name, body, UpdateMode::Merge).await
}

async fn write_singular(state: AppState, name: String, body: Bytes, mode: UpdateMode) -> Result<Response, AppError> {
    state.model.require(&name, ResourceKind::Singular)?;
    let body = RequestValidator::object_body(&body)?;
    let value = state
        .store
        .write(|doc| CrudService::write_singular(doc, &name, body, mode))
        .await?;
    Ok(ok(value).into_response())
}

/// GET /:name/:id
pub async fn read(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    state.model.require(&name, ResourceKind::Plural)?;
    let record = state
        .store
        .read(|doc| CrudService::read(doc, &name, state.id_field(), &id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", name, id)))?;
    Ok(ok(record).into_response())
}

/// PUT /:name/:id
pub async fn replace(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, AppError> {
    update(state, name, id, body, UpdateMode::Replace).await
}

/// PATCH /:name/:id
pub async fn merge(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, AppError> {
    update(state, name, id, body, UpdateMode::Merge).await
}

async fn update(state: AppState, name: String, id: String, body: Bytes, mode: UpdateMode) -> Result<Response, AppError> {
    state.model.require(&name, ResourceKind::Plural)?;
    let body = RequestValidator::object_body(&body)?;
    let id_field = state.id_field().to_string();
    let record = state
        .store
        .write(|doc| {
            CrudService::update(doc, &name, &id_field, &id, body, mode)?
                .ok_or_else(|| AppError::NotFound(format!("{}/{}", name, id)))
        })
        .await?;
    Ok(ok(record).into_response())
}

/// DELETE /:name/:id — responds `200 {}`.
pub async fn delete(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    state.model.require(&name, ResourceKind::Plural)?;
    let id_field = state.id_field().to_string();
    state
        .store
        .write(|doc| {
            CrudService::delete(doc, &name, &id_field, &id)?
                .ok_or_else(|| AppError::NotFound(format!("{}/{}", name, id)))
        })
        .await?;
    tracing::debug!(resource = %name, id = %id, "deleted");
    Ok(empty_object().into_response())
}
