// src/db/todo_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::todo::Todo};

const TODO_COLUMNS: &str = "id, title, completed, user_id, tenant_id, created_at, updated_at";

// Every write carries `tenant_id = $n` in its predicate, even after the
// service has checked ownership.
#[derive(Clone)]
pub struct TodoRepository {
    pool: PgPool,
}

impl TodoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Todo>, AppError> {
        let todos = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE tenant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(todos)
    }

    /// Unscoped on purpose: the caller compares `tenant_id` to tell 403 from 404.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    pub async fn create(&self, tenant_id: Uuid, user_id: Uuid, title: &str) -> Result<Todo, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos (title, user_id, tenant_id) VALUES ($1, $2, $3) RETURNING {TODO_COLUMNS}"
        ))
        .bind(title)
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(todo)
    }

    pub async fn update(
        &self,
        id: Uuid,
        tenant_id: Uuid,
        title: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Option<Todo>, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos SET
                title = COALESCE($3, title),
                completed = COALESCE($4, completed),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(tenant_id)
        .bind(title)
        .bind(completed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(todo)
    }

    pub async fn toggle(&self, id: Uuid, tenant_id: Uuid) -> Result<Option<Todo>, AppError> {
        let todo = sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos SET completed = NOT completed, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(todo)
    }

    pub async fn delete(&self, id: Uuid, tenant_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
