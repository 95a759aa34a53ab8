use crate::application_port::*;
use crate::domain_model::*;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .finish()
    }
}

struct PurposeKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl PurposeKeys {
    fn from_secret(secret: &[u8]) -> Self {
        PurposeKeys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// HS256 codec with one secret per token purpose, so a refresh secret can
/// never mint access tokens and the other way round.
pub struct JwtHs256Codec {
    issuer: String,
    audience: String,
    access: PurposeKeys,
    refresh: PurposeKeys,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec {
            access: PurposeKeys::from_secret(&cfg.access_secret),
            refresh: PurposeKeys::from_secret(&cfg.refresh_secret),
            issuer: cfg.issuer,
            audience: cfg.audience,
        }
    }

    fn keys(&self, purpose: Purpose) -> &PurposeKeys {
        match purpose {
            Purpose::Access => &self.access,
            Purpose::Refresh => &self.refresh,
        }
    }

    fn validation(&self, check_exp: bool) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 0;
        v.validate_exp = check_exp;
        v.set_audience(&[&self.audience]);
        v.set_issuer(&[&self.issuer]);
        v
    }

    fn verify(&self, token: &str, purpose: Purpose, check_exp: bool) -> Result<Claims, CodecError> {
        let data = decode::<Claims>(
            token,
            &self.keys(purpose).decoding,
            &self.validation(check_exp),
        )
        .map_err(|e| classify(e.kind()))?;
        let claims = data.claims;

        // jsonwebtoken accepts exp == now; a token is dead at its expiry instant.
        if check_exp && claims.exp <= Utc::now().timestamp() {
            return Err(CodecError::Expired);
        }
        if claims.purpose != purpose {
            return Err(CodecError::WrongPurpose);
        }
        if !pairing_matches(purpose, claims.rsid) {
            return Err(CodecError::Malformed);
        }
        Ok(claims)
    }
}

fn classify(kind: &ErrorKind) -> CodecError {
    match kind {
        ErrorKind::ExpiredSignature => CodecError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => CodecError::InvalidSignature,
        _ => CodecError::Malformed,
    }
}

/// Access tokens name their refresh session, refresh tokens name none.
fn pairing_matches(purpose: Purpose, refresh_session_id: Option<SessionId>) -> bool {
    match purpose {
        Purpose::Access => refresh_session_id.is_some(),
        Purpose::Refresh => refresh_session_id.is_none(),
    }
}

impl ClaimsCodec for JwtHs256Codec {
    fn encode(
        &self,
        subject: SubjectId,
        purpose: Purpose,
        ttl: Duration,
        refresh_session_id: Option<SessionId>,
    ) -> Result<EncodedToken, CodecError> {
        if !pairing_matches(purpose, refresh_session_id) {
            return Err(CodecError::Encode(format!(
                "{purpose} token with mismatched refresh session pairing"
            )));
        }

        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CodecError::Encode(e.to_string()))?;
        let issued_at = Utc::now();
        let exp = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| CodecError::Encode("expiry out of range".to_string()))?
            .timestamp();

        let session_id = SessionId::new_random();
        let claims = Claims {
            sub: subject,
            sid: session_id,
            rsid: refresh_session_id,
            purpose,
            iat: issued_at.timestamp(),
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| CodecError::Encode("expiry out of range".to_string()))?;

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(purpose).encoding,
        )
        .map_err(|e| CodecError::Encode(e.to_string()))?;

        Ok(EncodedToken {
            token,
            session_id,
            expires_at,
        })
    }

    fn decode(&self, token: &str, purpose: Purpose) -> Result<Claims, CodecError> {
        self.verify(token, purpose, true)
    }

    fn inspect(&self, token: &str, purpose: Purpose) -> Result<Claims, CodecError> {
        self.verify(token, purpose, false)
    }
}
