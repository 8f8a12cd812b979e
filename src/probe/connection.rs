//! libpq-style key/value connection strings.
//!
//! The probe renders `host=<H> port=<P> user=<U> password=<PW> dbname=<D>
//! sslmode=disable` and the driver parses it back into connection options.
//! Values that are empty or contain whitespace, quotes or backslashes are
//! single-quoted with backslash escapes, as libpq expects.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::DatabaseEnv;
use crate::secrets::SecretString;

use super::credential::Credential;

/// A rendered connection string. The password is only visible through
/// [`ConnectionString::expose`]; `Display` and `Debug` mask it.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    rendered: SecretString,
    sanitized: String,
}

impl ConnectionString {
    /// Build the connection string for the probed database.
    pub fn new(env: &DatabaseEnv, credential: &Credential) -> Self {
        let pairs = |password: &str| {
            [
                ("host", env.host.as_str()),
                ("port", env.port.as_str()),
                ("user", env.username.as_str()),
                ("password", password),
                ("dbname", credential.database_name.as_str()),
                ("sslmode", "disable"),
            ]
            .iter()
            .map(|(key, value)| format!("{}={}", key, quote(value)))
            .collect::<Vec<_>>()
            .join(" ")
        };

        Self {
            rendered: SecretString::new(pairs(credential.password.expose_secret())),
            sanitized: pairs("***"),
        }
    }

    /// The full connection string including the password. Never log it.
    pub fn expose(&self) -> &str {
        self.rendered.expose_secret()
    }

    /// Parse the string back into its key/value pairs.
    pub fn parameters(&self) -> Result<BTreeMap<String, String>, String> {
        parse(self.expose())
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sanitized)
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString").field(&self.sanitized).finish()
    }
}

fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.chars().any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Parse `key=value` pairs separated by whitespace. Errors never include
/// values, since one of them is a password.
fn parse(input: &str) -> Result<BTreeMap<String, String>, String> {
    let mut params = BTreeMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return Ok(params);
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next() != Some('=') {
            return Err(format!("missing '=' after parameter '{}'", key));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => value.push(escaped),
                        None => return Err(format!("unterminated value for parameter '{}'", key)),
                    },
                    Some('\'') => break,
                    Some(c) => value.push(c),
                    None => return Err(format!("unterminated quoted value for parameter '{}'", key)),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
        }

        params.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> DatabaseEnv {
        DatabaseEnv {
            host: "tutorial.rds.local".to_string(),
            port: "5432".to_string(),
            username: "postgres".to_string(),
        }
    }

    fn credential(password: &str) -> Credential {
        Credential { password: SecretString::new(password), database_name: "tutorial".to_string() }
    }

    #[test]
    fn test_renders_libpq_format() {
        let dsn = ConnectionString::new(&env(), &credential("pw1"));
        assert_eq!(
            dsn.expose(),
            "host=tutorial.rds.local port=5432 user=postgres password=pw1 dbname=tutorial sslmode=disable"
        );
    }

    #[test]
    fn test_display_masks_password() {
        let dsn = ConnectionString::new(&env(), &credential("pw1"));
        let shown = dsn.to_string();
        assert!(shown.contains("password=***"));
        assert!(!shown.contains("pw1"));
        assert!(!format!("{:?}", dsn).contains("pw1"));
    }

    #[test]
    fn test_awkward_password_survives_parse() {
        let password = "p w'x\\y";
        let dsn = ConnectionString::new(&env(), &credential(password));
        let params = dsn.parameters().unwrap();

        assert_eq!(params["password"], password);
        assert_eq!(params["dbname"], "tutorial");
        assert_eq!(params["sslmode"], "disable");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("host").is_err());
        assert!(parse("password='unterminated").is_err());
        assert_eq!(parse("  ").unwrap().len(), 0);
    }
}
