use crate::application_port::CredentialHasher;
use crate::domain_model::SubjectId;
use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StaticAccount {
    pub identity: Identity,
    pub password_hash: String,
}

/// Fixed set of accounts loaded at startup.
pub struct StaticUserDirectory {
    accounts: HashMap<SubjectId, StaticAccount>,
    hasher: Arc<dyn CredentialHasher>,
}

impl StaticUserDirectory {
    pub fn new(accounts: Vec<StaticAccount>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.identity.id, account))
            .collect();
        Self { accounts, hasher }
    }

    fn find_by_email(&self, email: &str) -> Option<&StaticAccount> {
        self.accounts
            .values()
            .find(|account| account.identity.email.eq_ignore_ascii_case(email.trim()))
    }
}

#[async_trait::async_trait]
impl UserLookup for StaticUserDirectory {
    async fn resolve(&self, subject: SubjectId) -> Result<Identity, UserLookupError> {
        self.accounts
            .get(&subject)
            .map(|account| account.identity.clone())
            .ok_or(UserLookupError::NotFound)
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for StaticUserDirectory {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, CredentialError> {
        let Some(account) = self.find_by_email(email) else {
            // Pay for one verification anyway so unknown emails answer no faster.
            if let Some(decoy) = self.accounts.values().next() {
                let _ = self
                    .hasher
                    .verify_password(password, &decoy.password_hash)
                    .await;
            }
            return Err(CredentialError::InvalidCredentials);
        };
        if !self
            .hasher
            .verify_password(password, &account.password_hash)
            .await?
        {
            return Err(CredentialError::InvalidCredentials);
        }
        Ok(account.identity.clone())
    }
}
