// src/handlers/todos.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{CanManageTodos, RequireCapability},
    models::todo::{CreateTodoPayload, Todo, UpdateTodoPayload},
    services::scope::Context,
};

#[utoipa::path(
    get,
    path = "/api/todos",
    tag = "Todos",
    responses((status = 200, description = "The organization's todos, newest first", body = Vec<Todo>)),
    security(("api_jwt" = []))
)]
pub async fn list_todos(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTodos>,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = app_state.todo_service.list(&ctx).await?;
    Ok(Json(todos))
}

#[utoipa::path(
    post,
    path = "/api/todos",
    tag = "Todos",
    request_body = CreateTodoPayload,
    responses(
        (status = 201, description = "Todo created", body = Todo),
        (status = 400, description = "Invalid title")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_todo(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTodos>,
    Json(payload): Json<CreateTodoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let todo = app_state.todo_service.create(&ctx, &payload).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[utoipa::path(
    get,
    path = "/api/todos/{id}",
    tag = "Todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "The todo", body = Todo),
        (status = 403, description = "Belongs to another organization"),
        (status = 404, description = "No such todo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_todo(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTodos>,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, AppError> {
    let todo = app_state.todo_service.get_by_id(&ctx, id).await?;
    Ok(Json(todo))
}

#[utoipa::path(
    patch,
    path = "/api/todos/{id}",
    tag = "Todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = UpdateTodoPayload,
    responses(
        (status = 200, description = "Todo updated", body = Todo),
        (status = 403, description = "Belongs to another organization"),
        (status = 404, description = "No such todo")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_todo(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTodos>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTodoPayload>,
) -> Result<Json<Todo>, AppError> {
    payload.validate()?;
    let todo = app_state.todo_service.update(&ctx, id, &payload).await?;
    Ok(Json(todo))
}

#[utoipa::path(
    post,
    path = "/api/todos/{id}/toggle",
    tag = "Todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Completion flipped", body = Todo),
        (status = 403, description = "Belongs to another organization"),
        (status = 404, description = "No such todo")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_todo(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTodos>,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, AppError> {
    let todo = app_state.todo_service.toggle(&ctx, id).await?;
    Ok(Json(todo))
}

#[utoipa::path(
    delete,
    path = "/api/todos/{id}",
    tag = "Todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 403, description = "Belongs to another organization"),
        (status = 404, description = "No such todo")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_todo(
    State(app_state): State<AppState>,
    ctx: Context,
    _guard: RequireCapability<CanManageTodos>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.todo_service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
