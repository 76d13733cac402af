use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::rand_core::OsRng;
use password_hash::SaltString;
use uuid::Uuid;

use crate::error::AccountError;

pub const MAX_USERNAME_LEN: usize = 12;

/// Account data a player carries for its whole stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub password_hash: String,
    pub uuid: Uuid,
    pub display_name: String,
    pub privilege: u8,
    pub banned: bool,
}

/// Verifies credentials.
///
/// Hashing is slow on purpose, so callers run this on a blocking pool,
/// never on the tick thread.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<Profile, AccountError>;
}

/// Accounts kept in memory, created on first login.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<HashMap<String, Profile>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_banned(&self, username: &str, banned: bool) -> bool {
        self.update(username, |profile| profile.banned = banned)
    }

    pub fn set_privilege(&self, username: &str, privilege: u8) -> bool {
        self.update(username, |profile| profile.privilege = privilege)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn update(&self, username: &str, f: impl FnOnce(&mut Profile)) -> bool {
        match self.lock().get_mut(&normalize(username)) {
            Some(profile) => {
                f(profile);
                true
            }
            None => false,
        }
    }

    // A panic elsewhere cannot leave a half-written profile behind, so a
    // poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Profile>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Authenticator for InMemoryAccounts {
    fn authenticate(&self, username: &str, password: &str) -> Result<Profile, AccountError> {
        if !valid_username(username) {
            return Err(AccountError::InvalidUsername(username.to_string()));
        }
        if password.is_empty() {
            return Err(AccountError::InvalidPassword);
        }
        let key = normalize(username);

        // Hash outside the lock so one login never holds up another.
        let existing = self.lock().get(&key).cloned();
        if let Some(profile) = existing {
            return check(profile, password);
        }
        let hash = hash_password(password)?;

        let mut accounts = self.lock();
        match accounts.entry(key) {
            // Registered by a concurrent first login while we were hashing.
            Entry::Occupied(entry) => {
                let profile = entry.get().clone();
                drop(accounts);
                check(profile, password)
            }
            Entry::Vacant(entry) => {
                let profile = Profile {
                    display_name: display_name(entry.key()),
                    username: entry.key().clone(),
                    password_hash: hash,
                    uuid: Uuid::new_v4(),
                    privilege: 0,
                    banned: false,
                };
                tracing::info!(username = %profile.username, uuid = %profile.uuid, "created account");
                Ok(entry.insert(profile).clone())
            }
        }
    }
}

fn check(profile: Profile, password: &str) -> Result<Profile, AccountError> {
    if verify_password(password, &profile.password_hash)? {
        Ok(profile)
    } else {
        Err(AccountError::InvalidPassword)
    }
}

/// Salted argon2 hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(AccountError::from)
}

/// `Ok(false)` for a wrong password, `Err` if `hash` is not a PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn normalize(username: &str) -> String {
    username.trim().to_ascii_lowercase().replace(' ', "_")
}

fn valid_username(username: &str) -> bool {
    let name = username.trim();
    !name.is_empty()
        && name.len() <= MAX_USERNAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_')
}

/// "zezima_pk" → "Zezima Pk"
fn display_name(normalized: &str) -> String {
    normalized
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
