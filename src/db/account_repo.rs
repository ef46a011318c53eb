// src/db/account_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique, error::AppError},
    models::account::{OAuthAccount, OAuthTokens},
};

const ACCOUNT_COLUMNS: &str = "id, user_id, provider, provider_account_id, access_token, refresh_token, \
                               expires_at, token_type, scope, id_token, created_at";

// OAuth links. (provider, provider_account_id) is globally unique; the only
// callers run inside the sign-in transaction, so there is no pool here.
#[derive(Clone, Default)]
pub struct AccountRepository;

impl AccountRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_provider<'e, E>(
        &self,
        executor: E,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<OAuthAccount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, OAuthAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM oauth_accounts WHERE provider = $1 AND provider_account_id = $2"
        ))
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(executor)
        .await?;
        Ok(account)
    }

    pub async fn link<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        provider: &str,
        provider_account_id: &str,
        tokens: &OAuthTokens,
    ) -> Result<OAuthAccount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, OAuthAccount>(&format!(
            r#"
            INSERT INTO oauth_accounts
                (user_id, provider, provider_account_id, access_token, refresh_token,
                 expires_at, token_type, scope, id_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(provider)
        .bind(provider_account_id)
        .bind(tokens.access_token.as_deref())
        .bind(tokens.refresh_token.as_deref())
        .bind(tokens.expires_at)
        .bind(tokens.token_type.as_deref())
        .bind(tokens.scope.as_deref())
        .bind(tokens.id_token.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique(e, || AppError::Conflict("This external account is already linked.".into())))
    }
}
