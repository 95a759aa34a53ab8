use super::error::*;
use crate::application_port::*;
use crate::domain_model::SubjectId;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// The client-facing half of a token pair. Session ids stay server-side.
#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl From<TokenPair> for TokensResponse {
    fn from(pair: TokenPair) -> Self {
        TokensResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_token_expires_at: pair.access_token_expires_at,
            refresh_token_expires_at: pair.refresh_token_expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: SubjectId,
    pub first_name: String,
    pub last_name: String,
    pub tokens: TokensResponse,
}

pub async fn login(
    body: LoginRequest,
    credential_verifier: Arc<dyn CredentialVerifier>,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let identity = credential_verifier
        .verify_credentials(&body.email, &body.password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let pair = token_service
        .issue_session(identity.id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let login_response = LoginResponse {
        user_id: identity.id,
        first_name: identity.first_name,
        last_name: identity.last_name,
        tokens: pair.into(),
    };
    Ok(warp::reply::json(&ApiResponse::ok(login_response)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = token_service
        .refresh_session(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(TokensResponse::from(pair)));
    Ok(warp::reply::with_status(json, StatusCode::CREATED))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

pub async fn logout(
    authorization: Option<String>,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    token_service
        .logout(authorization.as_deref())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse {
        message: "Successfully logged out",
    })))
}

pub async fn session(metadata: SessionMetadata) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(metadata)))
}

pub async fn me(
    metadata: SessionMetadata,
    user_lookup: Arc<dyn UserLookup>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let identity = user_lookup
        .resolve(metadata.subject_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(identity)))
}
