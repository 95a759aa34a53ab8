mod claims_codec;
mod credential_hasher;
mod token_service;

pub use claims_codec::*;
pub use credential_hasher::*;
pub use token_service::*;
