//! Edit-session tokens.
//!
//! Every staged intent belongs to exactly one session. A session key is opaque
//! to the engine: it is only compared for equality inside the ledger.

use std::fmt;

use tether_core::{Result, SQLParam, TetherError};

use crate::relation::MasterRecord;

/// A validated session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    /// Longest key accepted by [`SessionKey::new`].
    pub const DEFAULT_MAX_LEN: usize = 255;

    /// Validates `key` against the default length limit.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        SessionScope::default().key(key)
    }

    /// Mints a fresh random token for a new edit session.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for SessionKey {
    type Error = TetherError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = TetherError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

/// Validation rules for session keys and the fallback used when a caller does
/// not pass one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionScope {
    max_key_length: usize,
}

impl Default for SessionScope {
    fn default() -> Self {
        Self {
            max_key_length: SessionKey::DEFAULT_MAX_LEN,
        }
    }
}

impl SessionScope {
    pub const fn new(max_key_length: usize) -> Self {
        Self { max_key_length }
    }

    #[inline]
    pub const fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    /// Validates a raw key.
    ///
    /// ```
    /// use tether::session::SessionScope;
    ///
    /// let scope = SessionScope::new(8);
    /// assert!(scope.key("abc").is_ok());
    /// assert!(scope.key("").is_err());
    /// assert!(scope.key(" abc").is_err());
    /// assert!(scope.key("far-too-long").is_err());
    /// ```
    pub fn key(&self, key: impl Into<String>) -> Result<SessionKey> {
        let key = key.into();
        self.check(&key)?;
        Ok(SessionKey(key))
    }

    /// Applies the same rules as [`SessionScope::key`] to an existing key, so a
    /// key accepted under a looser limit is refused here too.
    pub fn check(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(TetherError::Configuration(
                "session key must not be empty".into(),
            ));
        }
        if key.trim() != key {
            return Err(TetherError::Configuration(format!(
                "session key {key:?} has surrounding whitespace"
            )));
        }
        if key.len() > self.max_key_length {
            return Err(TetherError::Configuration(format!(
                "session key is {} bytes, longer than the {} allowed",
                key.len(),
                self.max_key_length
            )));
        }
        Ok(())
    }

    /// Picks the session for a resolution: the explicit key when given,
    /// otherwise the key associated with the master record.
    pub fn resolve<V: SQLParam>(
        &self,
        explicit: Option<&str>,
        master: &MasterRecord<'_, V>,
    ) -> Result<SessionKey> {
        match explicit.or_else(|| master.session_key()) {
            Some(key) => self.key(key),
            None => Err(TetherError::Configuration(format!(
                "no session key given and none associated with {} record",
                master.type_name()
            ))),
        }
    }
}
