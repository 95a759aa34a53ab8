mod session_store_memory;
mod user_directory_static;

pub use session_store_memory::*;
pub use user_directory_static::*;
