//! Durable account records and their embedded favorite lists.

use std::{fmt::Debug, path::PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    auth::NewAccount,
    error::{AuthError, StoreError},
    model::{AccountId, Location},
};

/// Public view of an account, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub username: String,
    pub email: String,
}

/// Account as persisted, including its bcrypt password hash and favorites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub cities: Vec<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Storage of accounts and their favorite lists.
///
/// Favorites are always read and written as a whole list.
#[async_trait]
pub trait AccountStore: Send + Sync + Debug {
    async fn create_account(&self, account: NewAccount) -> Result<AccountSummary, StoreError>;

    async fn find_account(&self, id: AccountId) -> Result<AccountSummary, StoreError>;

    async fn load_favorites(&self, id: AccountId) -> Result<Vec<Location>, StoreError>;

    async fn save_favorites(&self, id: AccountId, favorites: Vec<Location>) -> Result<(), StoreError>;
}

/// Checks a login secret against the stored credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn verify_credential(&self, email: &str, secret: &str) -> Result<AccountSummary, AuthError>;
}

/// bcrypt work factor for new password hashes.
pub const HASH_COST: u32 = 12;

async fn hash_secret(secret: String, cost: u32) -> Result<String, StoreError> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(secret, cost)).await??)
}

async fn secret_matches(secret: String, hash: String) -> Result<bool, StoreError> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash)).await??)
}

/// Account store kept in memory and, when a path is given, mirrored to a JSON file
/// after every mutation.
#[derive(Debug)]
pub struct JsonAccountStore {
    accounts: RwLock<Vec<AccountRecord>>,
    path: Option<PathBuf>,
    hash_cost: u32,
}

impl JsonAccountStore {
    pub fn in_memory() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            path: None,
            hash_cost: HASH_COST,
        }
    }

    /// Overrides the bcrypt cost used for accounts created from now on.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Opens the store at `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let accounts = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        log::info!("loaded {} account(s) from {}", accounts.len(), path.display());

        Ok(Self {
            accounts: RwLock::new(accounts),
            path: Some(path),
            hash_cost: HASH_COST,
        })
    }

    /// Writes `accounts` to disk; the in-memory state is only replaced by the caller
    /// once this succeeded.
    async fn persist(&self, accounts: &[AccountRecord]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(accounts)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;

        Ok(())
    }
}

#[async_trait]
impl AccountStore for JsonAccountStore {
    async fn create_account(&self, account: NewAccount) -> Result<AccountSummary, StoreError> {
        let password_hash = hash_secret(account.password, self.hash_cost).await?;
        let mut accounts = self.accounts.write().await;

        if let Some(existing) = accounts
            .iter()
            .find(|a| a.email == account.email || a.username == account.username)
        {
            let message = if existing.email == account.email {
                "this email is already registered"
            } else {
                "this username is already taken"
            };
            return Err(StoreError::DuplicateAccount(message.to_string()));
        }

        let now = Utc::now();
        let record = AccountRecord {
            id: AccountId::new(),
            username: account.username,
            email: account.email,
            password_hash,
            cities: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let summary = record.summary();

        let mut updated = accounts.clone();
        updated.push(record);
        self.persist(&updated).await?;
        *accounts = updated;

        log::info!("created account {}", summary.id);
        Ok(summary)
    }

    async fn find_account(&self, id: AccountId) -> Result<AccountSummary, StoreError> {
        let accounts = self.accounts.read().await;
        accounts
            .iter()
            .find(|a| a.id == id)
            .map(AccountRecord::summary)
            .ok_or(StoreError::AccountNotFound)
    }

    async fn load_favorites(&self, id: AccountId) -> Result<Vec<Location>, StoreError> {
        let accounts = self.accounts.read().await;
        accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.cities.clone())
            .ok_or(StoreError::AccountNotFound)
    }

    async fn save_favorites(&self, id: AccountId, favorites: Vec<Location>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;

        let mut updated = accounts.clone();
        let record = updated
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::AccountNotFound)?;
        record.cities = favorites;
        record.updated_at = Utc::now();

        self.persist(&updated).await?;
        *accounts = updated;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for JsonAccountStore {
    async fn verify_credential(&self, email: &str, secret: &str) -> Result<AccountSummary, AuthError> {
        let email = email.trim().to_lowercase();
        let (summary, hash) = {
            let accounts = self.accounts.read().await;
            let record = accounts
                .iter()
                .find(|a| a.email == email)
                .ok_or(AuthError::InvalidCredentials)?;
            (record.summary(), record.password_hash.clone())
        };

        if secret_matches(secret.to_string(), hash).await? {
            Ok(summary)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
