use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub token: Token,
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Token {
    pub issuer: String,
    pub audience: String,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "redis" or "memory"
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub timeout_ms: u64,
}

impl Session {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub backend: String, // "static"
    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Deserialize)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string.
    pub password_hash: Option<String>,
    /// Plaintext, hashed at startup. Development only.
    pub password: Option<String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "SESSIONGATE";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let config = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?;

    from_config(config)
}

fn from_config(config: Config) -> Result<Settings> {
    let settings: Settings = config.try_deserialize().map_err(|e| anyhow!(e))?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let token = &self.token;
        if token.access_secret.is_empty() || token.refresh_secret.is_empty() {
            bail!("token secrets must not be empty");
        }
        if token.access_secret == token.refresh_secret {
            bail!("access and refresh tokens must be signed with distinct secrets");
        }
        if token.access_ttl_secs == 0 || token.access_ttl_secs >= token.refresh_ttl_secs {
            bail!(
                "token TTLs must satisfy 0 < access ({}s) < refresh ({}s)",
                token.access_ttl_secs,
                token.refresh_ttl_secs
            );
        }
        if self.session.backend == "redis" && self.session.redis_url.is_none() {
            bail!("session.redis_url is required for the redis backend");
        }
        if self.session.timeout_ms == 0 {
            bail!("session.timeout_ms must be positive");
        }
        for account in &self.user.accounts {
            if account.password_hash.is_none() && account.password.is_none() {
                bail!("account {} has neither password_hash nor password", account.id);
            }
        }
        if self.http.cert_path.is_some() != self.http.key_path.is_some() {
            bail!("http.cert_path and http.key_path must be set together");
        }
        Ok(())
    }
}
