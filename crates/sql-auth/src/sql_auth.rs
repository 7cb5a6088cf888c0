//! Authenticator selection from [`Credentials`].

use crate::credentials::Credentials;
use crate::error::AuthError;

/// Resolves [`Credentials`] into the auth mechanism an engine should drive.
///
/// This crate doesn't build wire packets itself — Login7/StartupMessage/
/// HandshakeResponse41 encoding lives in each protocol crate, since the
/// packet shape differs per engine. What's shared is deciding which
/// mechanism a given set of credentials asks for and validating that the
/// target engine supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    /// Plain username/password, interpreted by the engine's own negotiated
    /// sub-mechanism (TDS SQL auth, PostgreSQL MD5/SCRAM, MySQL native/
    /// caching_sha2).
    UsernamePassword,
    /// NTLM three-message exchange (TDS only).
    Ntlm,
}

impl AuthMechanism {
    /// Determine the mechanism these credentials require.
    #[must_use]
    pub fn for_credentials(credentials: &Credentials) -> Self {
        if credentials.is_ntlm() {
            Self::Ntlm
        } else {
            Self::UsernamePassword
        }
    }
}

/// Validate that `credentials` are usable with an engine that doesn't
/// support NTLM (PostgreSQL, MySQL).
pub fn require_username_password(credentials: &Credentials) -> Result<(), AuthError> {
    if credentials.is_ntlm() {
        return Err(AuthError::UnsupportedMethod(
            "NTLM authentication is only supported by the TDS engine".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mechanism_detection() {
        let up = Credentials::username_password("sa", "pw");
        assert_eq!(AuthMechanism::for_credentials(&up), AuthMechanism::UsernamePassword);

        let ntlm = Credentials::ntlm("CORP", "bob", "pw", "WS01");
        assert_eq!(AuthMechanism::for_credentials(&ntlm), AuthMechanism::Ntlm);
    }

    #[test]
    fn ntlm_rejected_for_non_tds_engines() {
        let ntlm = Credentials::ntlm("CORP", "bob", "pw", "WS01");
        assert!(require_username_password(&ntlm).is_err());

        let up = Credentials::username_password("sa", "pw");
        assert!(require_username_password(&up).is_ok());
    }
}
