use crate::error::ApiError;
use crate::models::{parse_create_request, parse_update_request};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::Todo;
use serde_json::{json, Value};

/// 公開 API のバージョン（クレートのバージョンとは独立）
pub const API_VERSION: &str = "1.0.0";

/// API の概要
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Todo API is running",
        "version": API_VERSION,
        "endpoints": {
            "GET /todos": "Get all todos",
            "GET /todos/<id>": "Get a specific todo",
            "POST /todos": "Create a new todo",
            "PUT /todos/<id>": "Update a todo",
            "DELETE /todos/<id>": "Delete a todo",
        }
    }))
}

/// ヘルスチェック
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.repo.get_all().await?;
    Ok(Json(todos))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    state
        .repo
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Todo not found".to_string()))
}

pub async fn create_todo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let new = parse_create_request(&body)?;
    let todo = state.repo.create(new).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Todo>, ApiError> {
    let changes = parse_update_request(&body)?;
    state
        .repo
        .update(&id, changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Todo not found or update failed".to_string()))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.repo.delete(&id).await? {
        Ok(Json(json!({ "message": "Todo deleted successfully" })))
    } else {
        Err(ApiError::NotFound(
            "Todo not found or delete failed".to_string(),
        ))
    }
}
