// src/services/todo_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TodoRepository,
    models::todo::{CreateTodoPayload, Todo, UpdateTodoPayload},
    services::scope::{validate_context, Context},
};

/// Tenant-scoped todo access. Every call validates the context first.
#[derive(Clone)]
pub struct TodoService {
    todo_repo: TodoRepository,
}

impl TodoService {
    pub fn new(todo_repo: TodoRepository) -> Self {
        Self { todo_repo }
    }

    pub async fn list(&self, ctx: &Context) -> Result<Vec<Todo>, AppError> {
        validate_context(ctx)?;
        self.todo_repo.list_by_tenant(ctx.tenant_id).await
    }

    /// Owner ids come from the context; nothing in the payload can set them.
    pub async fn create(&self, ctx: &Context, payload: &CreateTodoPayload) -> Result<Todo, AppError> {
        validate_context(ctx)?;
        self.todo_repo
            .create(ctx.tenant_id, ctx.user_id, payload.title.trim())
            .await
    }

    /// Present in another tenant is `Forbidden`, absent everywhere is `NotFound`.
    pub async fn get_by_id(&self, ctx: &Context, id: Uuid) -> Result<Todo, AppError> {
        validate_context(ctx)?;
        let todo = self
            .todo_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Todo".into()))?;

        if todo.tenant_id != ctx.tenant_id {
            tracing::warn!(todo_id = %id, tenant_id = %ctx.tenant_id, "Cross-tenant todo access rejected");
            return Err(AppError::Forbidden("You do not have access to this todo.".into()));
        }
        Ok(todo)
    }

    pub async fn update(&self, ctx: &Context, id: Uuid, payload: &UpdateTodoPayload) -> Result<Todo, AppError> {
        self.get_by_id(ctx, id).await?;
        self.todo_repo
            .update(id, ctx.tenant_id, payload.title.as_deref().map(str::trim), payload.completed)
            .await?
            .ok_or_else(|| AppError::NotFound("Todo".into()))
    }

    pub async fn toggle(&self, ctx: &Context, id: Uuid) -> Result<Todo, AppError> {
        self.get_by_id(ctx, id).await?;
        self.todo_repo
            .toggle(id, ctx.tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Todo".into()))
    }

    pub async fn delete(&self, ctx: &Context, id: Uuid) -> Result<(), AppError> {
        self.get_by_id(ctx, id).await?;
        if !self.todo_repo.delete(id, ctx.tenant_id).await? {
            return Err(AppError::NotFound("Todo".into()));
        }
        Ok(())
    }
}
