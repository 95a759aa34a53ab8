mod session;
mod subject;

pub use session::*;
pub use subject::*;
