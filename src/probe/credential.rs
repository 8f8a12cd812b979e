//! Database credential decoded from the cached secret payload.

use serde::Deserialize;
use thiserror::Error;

use crate::secrets::SecretString;

/// Why a payload could not be turned into a [`Credential`].
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The payload is not a JSON object of the expected shape.
    #[error("secret payload is not valid credential JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is absent or empty.
    #[error("secret payload has no '{field}' field")]
    MissingField { field: &'static str },
}

/// Wire shape of the secret. Other fields written by the store (`username`,
/// `host`, `engine`, ...) are ignored.
#[derive(Deserialize)]
struct RawCredential {
    password: Option<SecretString>,
    dbname: Option<String>,
}

/// Password and database name of the probed database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub password: SecretString,
    pub database_name: String,
}

impl Credential {
    /// Decode a cached payload.
    ///
    /// # Errors
    ///
    /// [`CredentialError::Malformed`] for invalid JSON and
    /// [`CredentialError::MissingField`] when `password` or `dbname` is absent
    /// or empty; no default credential is ever produced.
    pub fn decode(payload: &SecretString) -> Result<Self, CredentialError> {
        // Only a JSON object is a credential; serde would otherwise map an
        // array onto the struct fields by position.
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(payload.expose_secret())?;
        let raw = RawCredential::deserialize(serde_json::Value::Object(object))?;

        let password = raw
            .password
            .filter(|p| !p.is_empty())
            .ok_or(CredentialError::MissingField { field: "password" })?;
        let database_name = raw
            .dbname
            .filter(|d| !d.is_empty())
            .ok_or(CredentialError::MissingField { field: "dbname" })?;

        Ok(Self { password, database_name })
    }
}
