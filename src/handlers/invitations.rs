// src/handlers/invitations.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::invitation::{
        AcceptInvitationPayload, AcceptInvitationResponse, CreateInvitationPayload,
        CreateInvitationResponse, InvitationPreview, InvitationTokenQuery, PendingInvitation,
    },
    services::mail::{self, templates},
};

#[utoipa::path(
    get,
    path = "/api/invitations",
    tag = "Invitations",
    responses(
        (status = 200, description = "Pending invitations with their inviter", body = Vec<PendingInvitation>),
        (status = 403, description = "Members cannot see invitations")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invitations(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<Vec<PendingInvitation>>, AppError> {
    let ctx = session.context()?;
    let invitations = app_state
        .invitation_service
        .list_pending(&ctx, session.role())
        .await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    post,
    path = "/api/invitations",
    tag = "Invitations",
    request_body = CreateInvitationPayload,
    responses(
        (status = 201, description = "Invitation created", body = CreateInvitationResponse),
        (status = 400, description = "Already a member or already invited"),
        (status = 403, description = "Role may not invite into that role")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<CreateInvitationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let ctx = session.context()?;
    let invitation = app_state
        .invitation_service
        .create(&ctx, session.role(), &payload)
        .await?;

    let invite_url = app_state.config.tenant_path_url(
        &session.tenant.slug,
        &format!("/accept-invitation?token={}", invitation.token),
    );
    let email_sent = mail::deliver(
        &app_state.mail,
        templates::invitation_email(
            &invitation.email,
            &session.user.name,
            &session.tenant.name,
            invitation.role.as_str(),
            &invite_url,
        ),
    )
    .await;

    let expose = !app_state.config.is_production();
    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            token: expose.then(|| invitation.token.clone()),
            invite_url: expose.then_some(invite_url),
            invitation,
            email_sent,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/invitations/{id}",
    tag = "Invitations",
    params(("id" = Uuid, Path, description = "Invitation id")),
    responses(
        (status = 204, description = "Invitation revoked"),
        (status = 400, description = "Invitation is not pending"),
        (status = 403, description = "Not allowed or another organization's invitation"),
        (status = 404, description = "No such invitation")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let ctx = session.context()?;
    app_state
        .invitation_service
        .revoke(&ctx, session.role(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/invitations/accept",
    tag = "Invitations",
    params(InvitationTokenQuery),
    responses(
        (status = 200, description = "Organization, email and role behind the link, and whether it can still be accepted", body = InvitationPreview),
        (status = 404, description = "No such invitation")
    )
)]
pub async fn preview_invitation(
    State(app_state): State<AppState>,
    Query(query): Query<InvitationTokenQuery>,
) -> Result<Json<InvitationPreview>, AppError> {
    let preview = app_state.invitation_service.preview(&query.token).await?;
    Ok(Json(preview))
}

/// Public: the token is the credential.
#[utoipa::path(
    post,
    path = "/api/invitations/accept",
    tag = "Invitations",
    request_body = AcceptInvitationPayload,
    responses(
        (status = 201, description = "Account created in the inviting organization", body = AcceptInvitationResponse),
        (status = 400, description = "Invitation expired or no longer valid"),
        (status = 404, description = "No such invitation")
    )
)]
pub async fn accept_invitation(
    State(app_state): State<AppState>,
    Json(payload): Json<AcceptInvitationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (invitation, user) = app_state
        .invitation_service
        .accept(&payload.token, &payload.name, &payload.password)
        .await?;

    let tenant = app_state
        .tenant_service
        .get_by_id(invitation.tenant_id)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    let login_url = app_state.config.tenant_path_url(&tenant.slug, "/login");
    mail::deliver(
        &app_state.mail,
        templates::welcome_email(&user.email, &user.name, &tenant.name, &login_url),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(AcceptInvitationResponse {
            message: format!("Welcome to {}! You can now sign in.", tenant.name),
            tenant_url: app_state.config.tenant_url(&tenant.slug),
            tenant_slug: tenant.slug,
        }),
    ))
}
