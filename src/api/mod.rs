use crate::server::Server;
use std::sync::Arc;
use warp::Filter;

pub mod v1;

/// The full `/api/v1` tree with error recovery applied.
pub fn api(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(v1::routes(server))
        .recover(v1::recover_error)
}
