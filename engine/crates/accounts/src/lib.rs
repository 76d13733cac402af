//! Player accounts and the credential check behind login.

pub mod account;
pub mod error;

pub use account::{
    hash_password, verify_password, Authenticator, InMemoryAccounts, Profile, MAX_USERNAME_LEN,
};
pub use error::AccountError;
