use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::auth_service::AuthResult;
use crate::domain::user::{LoginRequest, RegisterRequest, User};
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppResult;
use crate::presentation::http::middleware::auth::AuthenticatedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct RegisterDto {
    #[validate(length(min = 3, max = 64))]
    pub(crate) username: String,
    #[validate(email)]
    pub(crate) email: String,
    #[validate(length(min = 8, max = 128))]
    pub(crate) password: String,
}

/// Either `username` or `email` identifies the account; `email` wins when both are sent.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct LoginDto {
    #[validate(length(min = 1, max = 64))]
    pub(crate) username: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub(crate) email: Option<String>,
    #[validate(length(min = 1))]
    pub(crate) password: String,
    #[serde(default)]
    pub(crate) remember: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct SendCodeDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct VerifyCodeDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) email: String,
    #[validate(length(min = 1, max = 16))]
    pub(crate) code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct UserDto {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) verified: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct SessionUserDto {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
}

/// Login response: the bearer token plus the full account row it was issued for.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionDto {
    pub(crate) token: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) user: UserDto,
}

impl From<AuthResult> for SessionDto {
    fn from(result: AuthResult) -> Self {
        Self {
            token: result.session.token,
            expires_at: result.session.expires_at,
            user: result.user.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct StatusDto {
    pub(crate) status: String,
}

impl StatusDto {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterDto,
    responses(
        (status = 201, description = "Registered successfully", body = UserDto),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(dto): Json<RegisterDto>,
) -> AppResult<(StatusCode, Json<UserDto>)> {
    dto.validate()?;

    let req = RegisterRequest {
        username: dto.username,
        email: dto.email,
        password: dto.password,
    };

    let user = state.auth_service.register(req).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Login successful", body = SessionDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(dto): Json<LoginDto>,
) -> AppResult<(StatusCode, Json<SessionDto>)> {
    dto.validate()?;

    let req = LoginRequest {
        username: dto.username,
        email: dto.email,
        password: dto.password,
        remember: dto.remember,
    };

    let result = state.auth_service.login(req).await?;

    Ok((StatusCode::OK, Json(result.into())))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Unauthorized")
    )
)]
pub(crate) async fn logout(State(state): State<AppState>, auth: AuthenticatedUser) -> StatusCode {
    state.auth_service.logout(&auth.token);
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current session user", body = SessionUserDto),
        (status = 401, description = "Unauthorized")
    )
)]
pub(crate) async fn me(auth: AuthenticatedUser) -> Json<SessionUserDto> {
    Json(SessionUserDto {
        id: auth.user_id,
        username: auth.username,
        email: auth.email,
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/send-code",
    tag = "auth",
    request_body = SendCodeDto,
    responses(
        (status = 200, description = "Verification code issued", body = StatusDto),
        (status = 401, description = "Unknown user"),
        (status = 503, description = "Storage or delivery unavailable")
    )
)]
pub(crate) async fn send_code(
    State(state): State<AppState>,
    Json(dto): Json<SendCodeDto>,
) -> AppResult<Json<StatusDto>> {
    dto.validate()?;
    state.auth_service.send_verification_code(&dto.email).await?;
    Ok(Json(StatusDto::ok()))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-code",
    tag = "auth",
    request_body = VerifyCodeDto,
    responses(
        (status = 200, description = "Email verified", body = StatusDto),
        (status = 401, description = "Code mismatched, expired or unknown user"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub(crate) async fn verify_code(
    State(state): State<AppState>,
    Json(dto): Json<VerifyCodeDto>,
) -> AppResult<Json<StatusDto>> {
    dto.validate()?;
    state
        .auth_service
        .verify_code(&dto.email, &dto.code)
        .await?;
    Ok(Json(StatusDto::ok()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::SessionDto;
    use crate::application::auth_service::AuthResult;
    use crate::application::session_manager::{Session, SessionUser};
    use crate::domain::user::User;

    #[test]
    fn login_response_carries_token_and_full_user() {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let user = User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            verified: true,
            created_at,
        };
        let session = Session {
            token: "ab".repeat(32),
            user: SessionUser::from(&user),
            expires_at: created_at + Duration::hours(24),
        };

        let dto = SessionDto::from(AuthResult { user, session });

        assert_eq!(dto.token.len(), 64);
        assert_eq!(dto.expires_at, created_at + Duration::hours(24));
        assert_eq!(dto.user.id, 7);
        assert!(dto.user.verified);
        assert_eq!(dto.user.created_at, created_at);

        let json = serde_json::to_value(&dto).expect("must serialize");
        assert!(json.get("expiresAt").is_some());
        assert_eq!(json["user"]["username"], "alice");
    }
}
