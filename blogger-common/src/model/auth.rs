//! Passwords and the session tokens handed out at sign-in.
//!
//! A token reads `<user id>:<core>:<salt>` with base64 core and salt. Only the
//! argon2 hash of the core is stored, so a leaked table cannot be replayed.
//! Passwords are stored as argon2 PHC strings.

use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{
    Argon2, Params,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const TOKEN_CORE_LEN: usize = 24;
pub const TOKEN_SALT_LEN: usize = 18;
pub const TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;
pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing session token failed: {0}")]
pub struct TokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(argon2::password_hash::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum TokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; TOKEN_CORE_LEN],
    pub salt: [u8; TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TokenHash(pub Box<[u8; TOKEN_HASH_LEN]>);

/// Argon2 hash of a user's password in PHC string form.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordDigest(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The stored password hash is not a PHC string")]
pub struct InvalidPasswordDigestError;

impl PasswordDigest {
    pub fn hash(password: &str) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Wraps a digest read back from storage.
    pub fn from_stored(digest: String) -> Result<Self, InvalidPasswordDigestError> {
        PasswordHash::new(&digest).map_err(|_| InvalidPasswordDigestError)?;
        Ok(Self(digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, password: &str) -> Result<bool, PasswordHashError> {
        let hash = PasswordHash::new(&self.0).map_err(PasswordHashError)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    }
}

/// A stored session.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub token_hash: TokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl SessionToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        Self {
            user_id,
            core: rand::random(),
            salt: rand::random(),
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{core}:{salt}")
    }

    pub fn hash(&self) -> Result<TokenHash, TokenHashError> {
        let mut hash = Box::new([0; TOKEN_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(TokenHashError)?;

        Ok(TokenHash(hash))
    }
}

impl FromStr for SessionToken {
    type Err = TokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let mut next_part = || parts.next().ok_or(TokenDecodeError::NotEnoughParts);

        let user_id = next_part()?
            .parse::<u64>()
            .map_err(TokenDecodeError::InvalidUserId)?
            .into();
        let core = BASE64_STANDARD
            .decode(next_part()?)?
            .try_into()
            .map_err(|_| TokenDecodeError::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(next_part()?)?
            .try_into()
            .map_err(|_| TokenDecodeError::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}

impl Debug for TokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The session token hash had an invalid length")]
pub struct InvalidTokenHashError;

impl TryFrom<Vec<u8>> for TokenHash {
    type Error = InvalidTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let hash: [u8; TOKEN_HASH_LEN] = value.try_into().map_err(|_| InvalidTokenHashError)?;
        Ok(Self(Box::new(hash)))
    }
}
