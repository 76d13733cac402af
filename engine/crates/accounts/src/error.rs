use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("password hashing error: {0}")]
    HashError(String),
}

impl From<password_hash::Error> for AccountError {
    fn from(e: password_hash::Error) -> Self {
        AccountError::HashError(e.to_string())
    }
}
