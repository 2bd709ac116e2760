//! Credential resolution
//!
//! Environment session credentials take precedence over a named profile, but
//! only when the whole triple is present. Anything less falls back to the
//! profile silently.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

/// Environment variable holding the access key id
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding the session token
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// All variables that must be non-empty for the environment path
pub const REQUIRED_ENV_VARS: [&str; 3] =
    [ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR, SESSION_TOKEN_VAR];

/// A complete set of session credentials read from the environment
#[derive(Clone, PartialEq, Eq)]
pub struct EnvironmentCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for EnvironmentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Where a session takes its authentication material from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Literal credentials from the process environment
    Environment(EnvironmentCredentials),
    /// A named profile in the local credential store
    Profile(String),
}

impl CredentialSource {
    pub fn kind(&self) -> CredentialKind {
        match self {
            CredentialSource::Environment(_) => CredentialKind::Environment,
            CredentialSource::Profile(_) => CredentialKind::Profile,
        }
    }
}

/// Credential path a session was built from, without the secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Environment,
    Profile,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::Environment => write!(f, "environment"),
            CredentialKind::Profile => write!(f, "profile"),
        }
    }
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Decides between environment and profile credentials
///
/// Nothing is cached: every call reads the variables again, so changes to
/// the environment between sessions are observed.
#[derive(Clone)]
pub struct CredentialResolver {
    lookup: Lookup,
}

impl CredentialResolver {
    /// Resolver reading the process environment
    pub fn from_env() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Resolver reading variables through a custom lookup
    ///
    /// # Example
    /// ```
    /// use s3utils_core::CredentialResolver;
    ///
    /// let resolver = CredentialResolver::with_lookup(|_| None);
    /// assert!(!resolver.has_env_credentials());
    /// ```
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.is_empty())
    }

    /// Read the environment triple, or `None` if any part is missing or empty
    pub fn environment_credentials(&self) -> Option<EnvironmentCredentials> {
        let access_key_id = self.var(ACCESS_KEY_ID_VAR);
        let secret_access_key = self.var(SECRET_ACCESS_KEY_VAR);
        let session_token = self.var(SESSION_TOKEN_VAR);

        match (access_key_id, secret_access_key, session_token) {
            (Some(access_key_id), Some(secret_access_key), Some(session_token)) => {
                Some(EnvironmentCredentials {
                    access_key_id,
                    secret_access_key,
                    session_token,
                })
            }
            (a, s, t) => {
                let missing: Vec<&str> = REQUIRED_ENV_VARS
                    .iter()
                    .zip([a.is_none(), s.is_none(), t.is_none()])
                    .filter_map(|(name, absent)| absent.then_some(*name))
                    .collect();
                debug!(?missing, "incomplete environment credentials");
                info!("AWS env credentials not fully set, falling back to profile");
                None
            }
        }
    }

    /// Whether all three environment variables are present and non-empty
    pub fn has_env_credentials(&self) -> bool {
        self.environment_credentials().is_some()
    }

    /// Pick the credential source for a new session
    pub fn resolve(&self, profile: &str) -> CredentialSource {
        match self.environment_credentials() {
            Some(creds) => {
                info!("Using AWS credentials from environment variables");
                CredentialSource::Environment(creds)
            }
            None => {
                info!(profile, "Using AWS credentials from profile");
                CredentialSource::Profile(profile.to_string())
            }
        }
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}
