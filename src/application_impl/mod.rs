mod claims_codec_jwt;
mod credential_hasher_argon2;
mod token_service_impl;

pub use claims_codec_jwt::*;
pub use credential_hasher_argon2::*;
pub use token_service_impl::*;
