use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::SubjectId;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
    pub credential_verifier: Arc<dyn CredentialVerifier>,
    pub user_lookup: Arc<dyn UserLookup>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token = &settings.token;
        let codec: Arc<dyn ClaimsCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: token.issuer.clone(),
            audience: token.audience.clone(),
            access_secret: token.access_secret.clone().into_bytes(),
            refresh_secret: token.refresh_secret.clone().into_bytes(),
        }));
        let policy = SessionPolicy {
            access_ttl: Duration::from_secs(token.access_ttl_secs),
            refresh_ttl: Duration::from_secs(token.refresh_ttl_secs),
        };

        let session_store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "redis" => {
                let url = settings
                    .session
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("session.redis_url is not set"))?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = tokio::time::timeout(
                    settings.session.timeout() * 10,
                    redis_client.get_connection_manager(),
                )
                .await
                .map_err(|_| anyhow::anyhow!("timed out connecting to redis"))??;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session.key_prefix.clone(),
                    settings.session.timeout(),
                ))
            }
            "memory" => {
                warn!("memory session store: sessions do not survive restarts or span replicas");
                Arc::new(MemorySessionStore::new())
            }
            other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
        };

        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let directory = match settings.user.backend.as_str() {
            "static" => {
                let mut accounts = Vec::with_capacity(settings.user.accounts.len());
                for account in &settings.user.accounts {
                    let password_hash = match (&account.password_hash, &account.password) {
                        (Some(hash), _) => hash.clone(),
                        (None, Some(plain)) => {
                            warn!(id = account.id, "hashing plaintext password from settings");
                            hasher.hash_password(plain).await?
                        }
                        (None, None) => {
                            return Err(anyhow::anyhow!("account {} has no password", account.id));
                        }
                    };
                    accounts.push(StaticAccount {
                        identity: Identity {
                            id: SubjectId(account.id),
                            email: account.email.clone(),
                            first_name: account.first_name.clone(),
                            last_name: account.last_name.clone(),
                        },
                        password_hash,
                    });
                }
                Arc::new(StaticUserDirectory::new(accounts, hasher))
            }
            other => return Err(anyhow::anyhow!("Unknown user backend: {}", other)),
        };

        let user_lookup: Arc<dyn UserLookup> = directory.clone();
        let credential_verifier: Arc<dyn CredentialVerifier> = directory;
        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            codec,
            session_store,
            user_lookup.clone(),
            policy,
        ));

        info!(
            session_backend = %settings.session.backend,
            accounts = settings.user.accounts.len(),
            "server started"
        );

        Ok(Self::from_parts(token_service, credential_verifier, user_lookup))
    }

    pub fn from_parts(
        token_service: Arc<dyn TokenService>,
        credential_verifier: Arc<dyn CredentialVerifier>,
        user_lookup: Arc<dyn UserLookup>,
    ) -> Self {
        Self {
            token_service,
            credential_verifier,
            user_lookup,
        }
    }
}
