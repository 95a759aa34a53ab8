use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::domain_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (*code, code.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        debug!("rejected request body: {}", e);
        (ApiErrorCode::BadRequest, e.to_string())
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        (ApiErrorCode::BadRequest, "Expected a JSON body".to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (
            ApiErrorCode::PayloadTooLarge,
            ApiErrorCode::PayloadTooLarge.to_string(),
        )
    } else if err.find::<reject::LengthRequired>().is_some() {
        (ApiErrorCode::BadRequest, "Missing content-length".to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::MethodNotAllowed.to_string(),
        )
    } else {
        warn!("unhandled rejection: {:?}", err);
        (
            ApiErrorCode::InternalError,
            ApiErrorCode::InternalError.to_string(),
        )
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Authentication backend temporarily unavailable")]
    TemporarilyUnavailable,
    #[error("Malformed request")]
    BadRequest,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn unavailable<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Backend unavailable: {}", error);
        ApiErrorCode::TemporarilyUnavailable
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials | ApiErrorCode::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated => ApiErrorCode::InvalidToken,
            AuthError::BackendUnavailable(e) => ApiErrorCode::unavailable(e),
            AuthError::IssueFailed(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<CredentialError> for ApiErrorCode {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            CredentialError::Unavailable(e) => ApiErrorCode::unavailable(e),
            CredentialError::Hash(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<UserLookupError> for ApiErrorCode {
    fn from(error: UserLookupError) -> Self {
        match error {
            UserLookupError::NotFound => ApiErrorCode::InvalidToken,
            UserLookupError::Unavailable(e) => ApiErrorCode::unavailable(e),
        }
    }
}
