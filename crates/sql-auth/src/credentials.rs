//! Credential types for authentication.

use std::borrow::Cow;

/// Credentials presented to a server during login.
///
/// Every engine accepts [`Credentials::UsernamePassword`] (TDS SQL
/// authentication, PostgreSQL cleartext/MD5/SCRAM, MySQL
/// `mysql_native_password`/`caching_sha2_password`). [`Credentials::Ntlm`]
/// is TDS-only: it enables the three-message NTLM exchange in place of a
/// plain Login7 password.
#[derive(Clone)]
pub enum Credentials {
    /// Username and password, interpreted by each engine's own auth
    /// mechanism negotiation.
    UsernamePassword {
        /// Username.
        username: Cow<'static, str>,
        /// Password.
        password: Cow<'static, str>,
    },

    /// Windows-domain NTLM credentials (TDS only).
    Ntlm {
        /// Domain name.
        domain: Cow<'static, str>,
        /// Username.
        username: Cow<'static, str>,
        /// Password.
        password: Cow<'static, str>,
        /// Workstation name advertised in the NTLM authenticate message.
        workstation: Cow<'static, str>,
    },
}

impl Credentials {
    /// Create username/password credentials.
    pub fn username_password(
        username: impl Into<Cow<'static, str>>,
        password: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create NTLM domain credentials.
    pub fn ntlm(
        domain: impl Into<Cow<'static, str>>,
        username: impl Into<Cow<'static, str>>,
        password: impl Into<Cow<'static, str>>,
        workstation: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Ntlm {
            domain: domain.into(),
            username: username.into(),
            password: password.into(),
            workstation: workstation.into(),
        }
    }

    /// Username for either credential kind.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::UsernamePassword { username, .. } => username,
            Self::Ntlm { username, .. } => username,
        }
    }

    /// Password for either credential kind.
    #[must_use]
    pub fn password(&self) -> &str {
        match self {
            Self::UsernamePassword { password, .. } => password,
            Self::Ntlm { password, .. } => password,
        }
    }

    /// True if these credentials drive the NTLM exchange.
    #[must_use]
    pub fn is_ntlm(&self) -> bool {
        matches!(self, Self::Ntlm { .. })
    }

    /// Human-readable method name, for logging.
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::UsernamePassword { .. } => "username/password",
            Self::Ntlm { .. } => "NTLM",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Ntlm {
                domain,
                username,
                workstation,
                ..
            } => f
                .debug_struct("Ntlm")
                .field("domain", domain)
                .field("username", username)
                .field("password", &"[REDACTED]")
                .field("workstation", workstation)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::username_password("sa", "hunter2");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn ntlm_flag() {
        assert!(Credentials::ntlm("CORP", "bob", "pw", "WS01").is_ntlm());
        assert!(!Credentials::username_password("bob", "pw").is_ntlm());
    }
}
