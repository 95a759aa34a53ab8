mod session_store;
mod user_directory;

pub use session_store::*;
pub use user_directory::*;
