//! Search orchestration: runs account and group queries against an injected
//! [`Session`], merges per-container results and applies the not-found and
//! interrupt policy.
//!
//! Typical usage:
//!
//! ```no_run
//! use ulu::search::{LookupPlan, Mode, Searcher};
//! use ulu::session::{Credentials, DirectoryConfig, LdapSession, SessionGuard};
//! # fn main() -> anyhow::Result<()> {
//! let config = DirectoryConfig::new("dc01.corp.example", 636, true);
//! let creds = Credentials {
//!     domain: Some("CORP".into()),
//!     user: "alice".into(),
//!     password: "secret".into(),
//! };
//! let mut session = SessionGuard::new(LdapSession::bind(&config, &creds)?);
//! let plan = LookupPlan {
//!     fragment: "smith".into(),
//!     containers: vec!["OU=Staff,DC=corp,DC=example".into()],
//!     group_base: "OU=Groups,OU=Staff,DC=corp,DC=example".into(),
//!     mode: Mode::Users,
//! };
//! let outcome = Searcher::new(&mut *session).run(&plan)?;
//! session.release();
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ldap3::ldap_escape;
use log::{debug, info};

use crate::entry::RawEntry;
use crate::error::{LookupError, Result};
use crate::session::{SearchScope, Session};

pub const ALL_USER_ATTRIBUTES: &str = "*";
pub const ALL_OPERATIONAL_ATTRIBUTES: &str = "+";
/// Character that marks a fragment as a group name under [`Mode::Auto`].
pub const GROUP_NAME_DELIMITER: char = '_';

/// Which searches a lookup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Account containers only
    #[default]
    Users,
    /// Group container only
    Groups,
    /// Accounts and groups
    Both,
    /// Accounts, plus groups when the fragment contains '_'
    Auto,
}

impl Mode {
    /// `(search accounts, search groups)` for `fragment`.
    pub fn selects(self, fragment: &str) -> (bool, bool) {
        match self {
            Mode::Users => (true, false),
            Mode::Groups => (false, true),
            Mode::Both => (true, true),
            Mode::Auto => (true, fragment.contains(GROUP_NAME_DELIMITER)),
        }
    }
}

/// Cancellation flag shared with the Ctrl+C handler.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_triggered() {
            return Err(LookupError::Interrupted);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHits {
    pub container: String,
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSearch {
    /// Hits from each container that had any, in query order.
    Found(Vec<ContainerHits>),
    NotFound,
}

impl AccountSearch {
    pub fn entries(&self) -> impl Iterator<Item = &RawEntry> {
        let hits: &[ContainerHits] = match self {
            AccountSearch::Found(hits) => hits,
            AccountSearch::NotFound => &[],
        };
        hits.iter().flat_map(|h| h.entries.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSearch {
    Found(Vec<RawEntry>),
    NotFound,
}

impl GroupSearch {
    pub fn entries(&self) -> &[RawEntry] {
        match self {
            GroupSearch::Found(entries) => entries,
            GroupSearch::NotFound => &[],
        }
    }
}

/// Everything one invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupPlan {
    pub fragment: String,
    pub containers: Vec<String>,
    pub group_base: String,
    pub mode: Mode,
}

/// Result of a whole run; `None` means that search was not requested.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupOutcome {
    pub users: Option<AccountSearch>,
    pub groups: Option<GroupSearch>,
}

pub fn account_filter(fragment: &str) -> String {
    format!(
        "(&(objectClass=person)(sAMAccountName=*{}*))",
        ldap_escape(fragment)
    )
}

pub const GROUP_FILTER: &str = "(objectClass=group)";

fn dedup_in_order(entries: Vec<RawEntry>) -> Vec<RawEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

pub struct Searcher<'s, S: Session + ?Sized> {
    session: &'s mut S,
    interrupt: Interrupt,
}

impl<'s, S: Session + ?Sized> Searcher<'s, S> {
    pub fn new(session: &'s mut S) -> Self {
        Self {
            session,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<RawEntry>> {
        self.interrupt.check()?;
        debug!("searching {} with {}", base, filter);
        self.session
            .search(base, SearchScope::Subtree, filter, attributes)
            .map_err(|source| LookupError::Search {
                base: base.to_string(),
                source,
            })
    }

    /// Search each container for person objects whose `sAMAccountName`
    /// contains `fragment`. `NotFound` only when every container is empty.
    pub fn find_accounts(
        &mut self,
        containers: &[String],
        fragment: &str,
    ) -> Result<AccountSearch> {
        let filter = account_filter(fragment);
        let mut found = Vec::new();
        for container in containers {
            let entries =
                dedup_in_order(self.search(container, &filter, &[ALL_USER_ATTRIBUTES])?);
            if entries.is_empty() {
                info!("{} was not located in {}!", fragment, container);
                continue;
            }
            info!("{} was located in {}!", fragment, container);
            found.push(ContainerHits {
                container: container.clone(),
                entries,
            });
        }
        if found.is_empty() {
            Ok(AccountSearch::NotFound)
        } else {
            Ok(AccountSearch::Found(found))
        }
    }

    /// Fetch every group under `base` and keep those whose
    /// `distinguishedName` contains `fragment`, in DN order.
    pub fn find_groups(&mut self, base: &str, fragment: &str) -> Result<GroupSearch> {
        let mut entries = self.search(
            base,
            GROUP_FILTER,
            &[ALL_USER_ATTRIBUTES, ALL_OPERATIONAL_ATTRIBUTES],
        )?;
        entries.sort();
        let matches: Vec<RawEntry> = entries
            .into_iter()
            .filter(|e| {
                e.first("distinguishedName")
                    .is_some_and(|dn| dn.contains(fragment))
            })
            .collect();
        if matches.is_empty() {
            info!("{} was not located in {} groups!", fragment, base);
            Ok(GroupSearch::NotFound)
        } else {
            info!("{} matched {} group(s) in {}", fragment, matches.len(), base);
            Ok(GroupSearch::Found(matches))
        }
    }

    pub fn run(&mut self, plan: &LookupPlan) -> Result<LookupOutcome> {
        let (users, groups) = plan.mode.selects(&plan.fragment);
        if plan.mode == Mode::Auto {
            info!(
                "mode auto: group search {} by '{}' heuristic",
                if groups { "enabled" } else { "skipped" },
                GROUP_NAME_DELIMITER
            );
        }
        let mut outcome = LookupOutcome::default();
        if users {
            outcome.users = Some(self.find_accounts(&plan.containers, &plan.fragment)?);
        }
        if groups {
            outcome.groups = Some(self.find_groups(&plan.group_base, &plan.fragment)?);
        }
        // a Ctrl+C that landed while the last query was blocking
        self.interrupt.check()?;
        Ok(outcome)
    }
}
