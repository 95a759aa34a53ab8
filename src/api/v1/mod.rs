mod error;
mod handler;
mod router;

pub use error::recover_error;
pub use handler::{ApiResponse, LoginRequest, RefreshRequest};
pub use router::routes;
