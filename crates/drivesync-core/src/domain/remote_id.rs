//! Drive object identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Identifier of a Drive file or folder
///
/// Drive issues ids made of ASCII letters, digits, `-` and `_`. Ids are
/// interpolated into request paths and listing queries, so anything else is
/// rejected up front rather than escaped later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

impl RemoteId {
    /// # Errors
    /// Returns [`DomainError::InvalidRemoteId`] for an empty id or one with
    /// a character Drive never issues.
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId("empty identifier".to_string()));
        }
        if let Some(pos) = id.bytes().position(|b| !is_id_byte(b)) {
            return Err(DomainError::InvalidRemoteId(format!(
                "{id:?} has an unexpected character at offset {pos}"
            )));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}
