use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::HeaderMap;
use warp::{Filter, reject};

const AUTHORIZATION: &str = "authorization";
const JSON_BODY_LIMIT: u64 = 4 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with(server.credential_verifier.clone()))
        .and(with(server.token_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path("refresh")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with(server.token_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::post())
        .and(authorization())
        .and(with(server.token_service.clone()))
        .and_then(handler::logout);

    let session = warp::path("session")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_authentication(server.token_service.clone()))
        .and_then(handler::session);

    let me = warp::path("me")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_authentication(server.token_service.clone()))
        .and(with(server.user_lookup.clone()))
        .and_then(handler::me);

    login.or(refresh).or(logout).or(session).or(me)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// The raw `Authorization` value. A value that is not valid UTF-8 reads as
/// absent, so it ends up as "no usable token" instead of a header rejection.
fn authorization() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::header::headers_cloned().map(|headers: HeaderMap| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from)
    })
}

/// Gate for protected routes: yields the caller's session or rejects.
fn with_authentication(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (SessionMetadata,), Error = warp::Rejection> + Clone {
    authorization().and_then(
        move |header: Option<String>| {
            let token_service = token_service.clone();
            async move {
                token_service
                    .authenticate_request(header.as_deref())
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)
            }
        },
    )
}
