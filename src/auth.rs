use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: i64,
  pub username: String,
  pub display_name: String,
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
  #[error("Username already taken: {0}")]
  UsernameTaken(String),

  #[error("Invalid username or password")]
  InvalidCredentials,

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Password hashing failed: {0}")]
  Hash(String),
}

impl Serialize for AuthError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Credential Store
/// ---------------------------------------------------------------------------

/// Account registry used by whatever front end signs users in.
/// Usernames are matched case-insensitively after trimming.
pub trait CredentialStore: Send + Sync {
  fn verify(&self, username: &str, password: &str) -> Result<User, AuthError>;
  fn register(&self, username: &str, password: &str, display_name: &str) -> Result<User, AuthError>;
}

struct Account {
  user: User,
  password_hash: String,
}

#[derive(Default)]
struct Accounts {
  by_username: HashMap<String, Account>,
  next_id: i64,
}

/// Process-local store with argon2 password hashes
#[derive(Default)]
pub struct InMemoryCredentialStore {
  accounts: RwLock<Accounts>,
}

impl InMemoryCredentialStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.accounts.read().unwrap_or_else(|e| e.into_inner()).by_username.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn normalize(username: &str) -> String {
  username.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| AuthError::Hash(e.to_string()))
}

impl CredentialStore for InMemoryCredentialStore {
  fn verify(&self, username: &str, password: &str) -> Result<User, AuthError> {
    let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
    let account = accounts
      .by_username
      .get(&normalize(username))
      .ok_or(AuthError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&account.password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;

    if Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .is_err()
    {
      warn!("Failed sign-in for {}", account.user.username);
      return Err(AuthError::InvalidCredentials);
    }

    Ok(account.user.clone())
  }

  fn register(&self, username: &str, password: &str, display_name: &str) -> Result<User, AuthError> {
    let key = normalize(username);
    if key.is_empty() {
      return Err(AuthError::InvalidInput("username is required".into()));
    }
    if password.is_empty() {
      return Err(AuthError::InvalidInput("password is required".into()));
    }

    // Hash before taking the write lock
    let password_hash = hash_password(password)?;

    let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
    if accounts.by_username.contains_key(&key) {
      return Err(AuthError::UsernameTaken(username.trim().to_string()));
    }

    accounts.next_id += 1;
    let display_name = match display_name.trim() {
      "" => username.trim().to_string(),
      name => name.to_string(),
    };
    let user = User {
      id: accounts.next_id,
      username: username.trim().to_string(),
      display_name,
    };
    accounts.by_username.insert(
      key,
      Account {
        user: user.clone(),
        password_hash,
      },
    );

    info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
