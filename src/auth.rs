//! SASL-style authentication.
//!
//! The handshake exchanges opaque tokens: the server names an authenticator
//! class in `AUTHENTICATE`, the client answers with `AUTH_RESPONSE`, and the
//! server may keep challenging via `AUTH_CHALLENGE` before `AUTH_SUCCESS`.
//! This driver only ships the trivial `PasswordAuthenticator` a real
//! Cassandra deployment's `PasswordAuthenticator` class expects; anything
//! else is a caller-supplied [`Authenticator`] impl.
use std::fmt;

/// A pluggable credential responder for the connection handshake.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// The initial token sent in `AUTH_RESPONSE`, given the authenticator
    /// class name the server reported in `AUTHENTICATE`.
    fn initial_response(&self, authenticator_class: &str) -> Vec<u8>;

    /// Answers a server `AUTH_CHALLENGE`. The default rejects any challenge,
    /// since `PasswordAuthenticator` never issues one.
    fn evaluate_challenge(&self, _challenge: &[u8]) -> Result<Vec<u8>, crate::error::Error> {
        Err(crate::error::Error::authentication("authenticator does not support server challenges"))
    }
}

/// Matches Cassandra's built-in `PasswordAuthenticator`: the initial token
/// is `\0username\0password`.
#[derive(Debug, Clone)]
pub struct PasswordAuthenticator {
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> PasswordAuthenticator {
        PasswordAuthenticator { username: username.into(), password: password.into() }
    }
}

impl Authenticator for PasswordAuthenticator {
    fn initial_response(&self, _authenticator_class: &str) -> Vec<u8> {
        let mut token = Vec::with_capacity(2 + self.username.len() + self.password.len());
        token.push(0);
        token.extend_from_slice(self.username.as_bytes());
        token.push(0);
        token.extend_from_slice(self.password.as_bytes());
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_token_layout() {
        let auth = PasswordAuthenticator::new("cassandra", "cassandra");
        let token = auth.initial_response("org.apache.cassandra.auth.PasswordAuthenticator");
        assert_eq!(token, b"\0cassandra\0cassandra");
    }

    #[test]
    fn default_challenge_is_rejected() {
        let auth = PasswordAuthenticator::new("u", "p");
        assert!(auth.evaluate_challenge(b"anything").is_err());
    }
}
