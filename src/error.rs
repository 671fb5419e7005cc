//! Error taxonomy for a lookup run.
//!
//! Request-level failures ([`LookupError`]) abort the run. Field-level failures
//! ([`DecodeError`], [`CalculationError`]) never leave the normalizer; they are
//! turned into display sentinels there. "Not found" is not an error at all, see
//! [`crate::search::AccountSearch`].

/// A directory timestamp could not be parsed as an integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid directory timestamp: {0:?}")]
pub struct DecodeError(pub String);

/// The password expiry estimate could not be produced.
///
/// Covers unparseable input, a "never expires" value and an estimate past the
/// representable range alike.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to calculate password expiry")]
pub struct CalculationError;

/// Failure reported by a directory session backend.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Ldap(#[from] ldap3::LdapError),
    #[error("{0}")]
    Backend(String),
}

/// Missing or contradictory settings, detected before any connection is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no directory host configured (--host / LDAP_HOST)")]
    MissingHost,
    #[error("no search containers configured (--container / SEARCH_OU, ADMIN_SEARCH_OU)")]
    MissingContainers,
    #[error("no group container configured (--group-base / GROUP_SEARCH_OU)")]
    MissingGroupBase,
    #[error("no bind user configured (--user / LDAP_USER)")]
    MissingUser,
    #[error("no password available (--password-stdin / LDAP_PASSWORD)")]
    MissingPassword,
    #[error("search fragment must not be empty")]
    EmptyFragment,
    #[error("failed to read password from stdin: {0}")]
    PasswordInput(#[source] std::io::Error),
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
}

/// Request-level failure: always aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("authentication to {url} as {user} failed: {source}")]
    Auth {
        url: String,
        user: String,
        #[source]
        source: SessionError,
    },
    #[error("search of {base} failed: {source}")]
    Search {
        base: String,
        #[source]
        source: SessionError,
    },
    #[error("lookup interrupted")]
    Interrupted,
}

pub type Result<T, E = LookupError> = std::result::Result<T, E>;
