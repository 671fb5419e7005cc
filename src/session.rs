//! Directory session collaborator.
//!
//! [`Session`] is the seam the search orchestrator works against. The real
//! implementation, [`LdapSession`], wraps a synchronous `ldap3` connection;
//! tests substitute the generated `MockSession`. [`SessionGuard`] pairs the
//! bind with exactly one unbind on every exit path.
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, Scope, SearchEntry};
use log::{debug, info, warn};

use crate::entry::RawEntry;
use crate::error::{LookupError, SessionError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Session {
    fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<RawEntry>, SessionError>;

    fn unbind(&mut self) -> Result<(), SessionError>;
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// `ldaps://host:636` or `ldap://host:389`.
    pub url: String,
    pub starttls: bool,
    pub timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(host: &str, port: u16, tls: bool) -> Self {
        let scheme = if tls { "ldaps" } else { "ldap" };
        Self {
            url: format!("{scheme}://{host}:{port}"),
            starttls: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    /// NetBIOS domain; when set the bind name is `DOMAIN\user`.
    pub domain: Option<String>,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn bind_name(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{domain}\\{}", self.user),
            None => self.user.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct LdapSession {
    conn: LdapConn,
    timeout: Duration,
}

impl LdapSession {
    /// Connect and simple-bind. Any failure here is an authentication error;
    /// it is never retried.
    pub fn bind(config: &DirectoryConfig, creds: &Credentials) -> Result<Self, LookupError> {
        let bind_name = creds.bind_name();
        let auth_error = |source: SessionError| LookupError::Auth {
            url: config.url.clone(),
            user: bind_name.clone(),
            source,
        };
        let settings = LdapConnSettings::new()
            .set_conn_timeout(config.timeout)
            .set_starttls(config.starttls);
        debug!("connecting to {}", config.url);
        let mut conn = LdapConn::with_settings(settings, &config.url)
            .map_err(|e| auth_error(e.into()))?;
        conn.with_timeout(config.timeout)
            .simple_bind(&bind_name, &creds.password)
            .and_then(|res| res.success())
            .map_err(|e| auth_error(e.into()))?;
        info!("login successful: bound to {} as {}", config.url, bind_name);
        Ok(Self {
            conn,
            timeout: config.timeout,
        })
    }
}

impl Session for LdapSession {
    fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<RawEntry>, SessionError> {
        let (entries, _res) = self
            .conn
            .with_timeout(self.timeout)
            .search(base, scope.into(), filter, attributes.to_vec())?
            .success()?;
        Ok(entries
            .into_iter()
            .filter(|e| !e.is_ref())
            .map(SearchEntry::construct)
            .map(RawEntry::from)
            .collect())
    }

    fn unbind(&mut self) -> Result<(), SessionError> {
        self.conn.unbind()?;
        Ok(())
    }
}

/// Owns a bound session and unbinds it exactly once: on [`release`] or,
/// failing that, on drop.
///
/// [`release`]: SessionGuard::release
pub struct SessionGuard<S: Session> {
    session: S,
    released: bool,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.session.unbind() {
            Ok(()) => debug!("directory session released"),
            Err(e) => warn!("error during unbind: {}", e),
        }
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.release_once();
    }
}
