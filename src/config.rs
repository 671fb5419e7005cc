//! Configuration resolution.
//!
//! Flags win over environment variables, which may come from a `.env` file
//! loaded by [`load_env_file`]. Resolution takes the environment as a lookup
//! function so it can be exercised without touching the process environment.
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::normalize::NormalizeOptions;
use crate::search::{LookupPlan, Mode};
use crate::session::{Credentials, DEFAULT_TIMEOUT, DirectoryConfig};
use crate::timestamp::DEFAULT_PASSWORD_MAX_AGE_DAYS;

pub const ENV_HOST: &str = "LDAP_HOST";
pub const ENV_SEARCH_OU: &str = "SEARCH_OU";
pub const ENV_ADMIN_SEARCH_OU: &str = "ADMIN_SEARCH_OU";
pub const ENV_GROUP_SEARCH_OU: &str = "GROUP_SEARCH_OU";
pub const ENV_DOMAIN: &str = "LDAP_DOMAIN";
pub const ENV_USER: &str = "LDAP_USER";
pub const ENV_PASSWORD: &str = "LDAP_PASSWORD";

pub const LDAPS_PORT: u16 = 636;
pub const LDAP_PORT: u16 = 389;

/// Raw inputs as collected from the command line.
#[derive(Clone)]
pub struct Settings {
    pub fragment: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_tls: bool,
    pub starttls: bool,
    pub containers: Vec<String>,
    pub group_base: Option<String>,
    pub domain: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub mode: Mode,
    pub timeout: Duration,
    pub password_max_age_days: u32,
}

impl Settings {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            host: None,
            port: None,
            no_tls: false,
            starttls: false,
            containers: Vec::new(),
            group_base: None,
            domain: None,
            user: None,
            password: None,
            mode: Mode::default(),
            timeout: DEFAULT_TIMEOUT,
            password_max_age_days: DEFAULT_PASSWORD_MAX_AGE_DAYS,
        }
    }

    pub fn resolve<F>(self, env: F) -> Result<Resolved, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        resolve(self, env)
    }
}

/// Fully validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub directory: DirectoryConfig,
    pub credentials: Credentials,
    pub plan: LookupPlan,
    pub normalize: NormalizeOptions,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn resolve<F>(settings: Settings, env: F) -> Result<Resolved, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| non_empty(env(name));

    let fragment = settings.fragment.trim().to_string();
    if fragment.is_empty() {
        return Err(ConfigError::EmptyFragment);
    }
    let (want_users, want_groups) = settings.mode.selects(&fragment);

    let host = non_empty(settings.host)
        .or_else(|| var(ENV_HOST))
        .ok_or(ConfigError::MissingHost)?;

    let standard_ou = var(ENV_SEARCH_OU);
    let mut containers: Vec<String> = settings
        .containers
        .into_iter()
        .filter_map(|c| non_empty(Some(c)))
        .collect();
    if containers.is_empty() {
        containers = [standard_ou.clone(), var(ENV_ADMIN_SEARCH_OU)]
            .into_iter()
            .flatten()
            .collect();
    }
    if want_users && containers.is_empty() {
        return Err(ConfigError::MissingContainers);
    }

    let group_base = non_empty(settings.group_base)
        .or_else(|| var(ENV_GROUP_SEARCH_OU))
        .or_else(|| {
            standard_ou
                .or_else(|| containers.first().cloned())
                .map(|ou| format!("OU=Groups,{ou}"))
        });
    let group_base = match group_base {
        Some(base) => base,
        None if want_groups => return Err(ConfigError::MissingGroupBase),
        None => String::new(),
    };

    let user = non_empty(settings.user)
        .or_else(|| var(ENV_USER))
        .or_else(|| var("USER"))
        .or_else(|| var("USERNAME"))
        .ok_or(ConfigError::MissingUser)?;
    // an empty password would turn the bind into an anonymous one
    let password = settings
        .password
        .filter(|p| !p.is_empty())
        .or_else(|| env(ENV_PASSWORD).filter(|p| !p.is_empty()))
        .ok_or(ConfigError::MissingPassword)?;

    let ldaps = !settings.no_tls && !settings.starttls;
    let port = settings
        .port
        .unwrap_or(if ldaps { LDAPS_PORT } else { LDAP_PORT });
    let mut directory = DirectoryConfig::new(&host, port, ldaps);
    directory.starttls = settings.starttls;
    directory.timeout = settings.timeout;

    Ok(Resolved {
        directory,
        credentials: Credentials {
            domain: non_empty(settings.domain).or_else(|| var(ENV_DOMAIN)),
            user,
            password,
        },
        plan: LookupPlan {
            fragment,
            containers,
            group_base,
            mode: settings.mode,
        },
        normalize: NormalizeOptions {
            password_max_age_days: settings.password_max_age_days,
        },
    })
}

/// Load `path`, or `.env` from the working directory when no path is given.
/// A missing default `.env` is not an error.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(p) => dotenvy::from_path(p)
            .map(|()| Some(p.to_path_buf()))
            .map_err(|source| ConfigError::EnvFile {
                path: p.display().to_string(),
                source,
            }),
        None => match dotenvy::dotenv() {
            Ok(p) => Ok(Some(p)),
            Err(e) if e.not_found() => Ok(None),
            Err(source) => Err(ConfigError::EnvFile {
                path: ".env".to_string(),
                source,
            }),
        },
    }
}

/// First line of `reader`, without the line terminator.
pub fn read_password_line<R: BufRead>(mut reader: R) -> Result<String, ConfigError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(ConfigError::PasswordInput)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
