//! Turn sparse [`RawEntry`] attribute sets into fixed-shape display records.
//!
//! Every field of a normalized record always holds a string: the source value
//! or a sentinel. Records are built once per entry and never mutated.
use serde::Serialize;

use crate::entry::RawEntry;
use crate::timestamp::{
    DEFAULT_PASSWORD_MAX_AGE_DAYS, decode_timestamp, estimate_password_expiry_with, format_time,
};

pub const MISSING: &str = "Missing.";
pub const ERROR_CALCULATING: &str = "Error calculating.";
pub const NOT_AVAILABLE: &str = "NA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedUser {
    pub cn: String,
    pub company: String,
    pub department: String,
    pub description: String,
    pub distinguished_name: String,
    pub mail: String,
    pub manager: String,
    pub member_of: String,
    pub dn: String,
    pub last_logon_timestamp: String,
    /// Estimated password expiry derived from `pwdLastSet`.
    pub pwd_last_set: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedGroup {
    pub cn: String,
    pub distinguished_name: String,
    pub member_of: String,
    pub member: String,
    pub managed_by: String,
    pub mail: String,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub password_max_age_days: u32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            password_max_age_days: DEFAULT_PASSWORD_MAX_AGE_DAYS,
        }
    }
}

fn first_or(raw: &RawEntry, name: &str, sentinel: &str) -> String {
    raw.first(name).unwrap_or(sentinel).to_string()
}

/// One line per group, each followed by `" \n"`, in directory order.
pub fn format_member_of(values: &[String]) -> String {
    values.iter().map(|v| format!("{v} \n")).collect()
}

/// Both derived timestamps, or `None` if either attribute is absent or
/// fails to decode. The two fields succeed or fail together.
fn timestamps(raw: &RawEntry, opts: &NormalizeOptions) -> Option<(String, String)> {
    let last_logon = decode_timestamp(raw.first("lastLogonTimestamp")?).ok()?;
    let expires =
        estimate_password_expiry_with(raw.first("pwdLastSet")?, opts.password_max_age_days)
            .ok()?;
    Some((last_logon.to_string(), format_time(&expires)))
}

pub fn normalize_user(raw: &RawEntry) -> NormalizedUser {
    normalize_user_with(raw, &NormalizeOptions::default())
}

pub fn normalize_user_with(raw: &RawEntry, opts: &NormalizeOptions) -> NormalizedUser {
    let (last_logon_timestamp, pwd_last_set) = timestamps(raw, opts).unwrap_or_else(|| {
        log::debug!("timestamp calculation failed for {}", raw.dn);
        (ERROR_CALCULATING.to_string(), ERROR_CALCULATING.to_string())
    });
    NormalizedUser {
        cn: first_or(raw, "cn", MISSING),
        company: first_or(raw, "company", MISSING),
        department: first_or(raw, "department", MISSING),
        description: first_or(raw, "description", MISSING),
        distinguished_name: first_or(raw, "distinguishedName", MISSING),
        mail: first_or(raw, "mail", MISSING),
        manager: first_or(raw, "manager", MISSING),
        member_of: raw
            .values("memberOf")
            .map(format_member_of)
            .unwrap_or_else(|| MISSING.to_string()),
        dn: raw.dn.clone(),
        last_logon_timestamp,
        pwd_last_set,
    }
}

fn joined_or_na(raw: &RawEntry, name: &str) -> String {
    raw.values(name)
        .map(|v| v.join("\n"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn normalize_group(raw: &RawEntry) -> NormalizedGroup {
    NormalizedGroup {
        cn: joined_or_na(raw, "cn"),
        distinguished_name: joined_or_na(raw, "distinguishedName"),
        member_of: joined_or_na(raw, "memberOf"),
        member: joined_or_na(raw, "member"),
        managed_by: joined_or_na(raw, "managedBy"),
        mail: joined_or_na(raw, "mail"),
    }
}

pub fn normalize_users<'a, I>(entries: I, opts: &NormalizeOptions) -> Vec<NormalizedUser>
where
    I: IntoIterator<Item = &'a RawEntry>,
{
    entries
        .into_iter()
        .map(|e| normalize_user_with(e, opts))
        .collect()
}

pub fn normalize_groups<'a, I>(entries: I) -> Vec<NormalizedGroup>
where
    I: IntoIterator<Item = &'a RawEntry>,
{
    entries.into_iter().map(normalize_group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> RawEntry {
        RawEntry::new("CN=Alice Smith,OU=Staff,DC=corp,DC=example")
            .with("cn", "Alice Smith")
            .with("company", "Example Corp")
            .with("department", "Finance")
            .with("description", "Analyst")
            .with("distinguishedName", "CN=Alice Smith,OU=Staff,DC=corp,DC=example")
            .with("mail", "alice@example.com")
            .with("manager", "CN=Bob Jones,OU=Staff,DC=corp,DC=example")
            .with_values("memberOf", ["GroupA", "GroupB"])
            .with("lastLogonTimestamp", "133500000000000000")
            .with("pwdLastSet", "132000000000000000")
    }

    #[test]
    fn full_entry_keeps_source_values() {
        let u = normalize_user(&alice());
        assert_eq!(u.cn, "Alice Smith");
        assert_eq!(u.company, "Example Corp");
        assert_eq!(u.dn, "CN=Alice Smith,OU=Staff,DC=corp,DC=example");
        assert_eq!(u.last_logon_timestamp, "2024-01-17 21:20:00");
        assert_eq!(u.pwd_last_set, "2019-07-16 18:40:00");
    }

    #[test]
    fn member_of_is_one_line_per_group_in_order() {
        let u = normalize_user(&alice());
        assert_eq!(u.member_of, "GroupA \nGroupB \n");
    }

    #[test]
    fn missing_fields_get_sentinel() {
        let raw = RawEntry::new("CN=Ghost").with("cn", "Ghost");
        let u = normalize_user(&raw);
        assert_eq!(u.company, MISSING);
        assert_eq!(u.department, MISSING);
        assert_eq!(u.mail, MISSING);
        assert_eq!(u.manager, MISSING);
        assert_eq!(u.member_of, MISSING);
        assert_eq!(u.dn, "CN=Ghost");
    }

    #[test]
    fn one_bad_timestamp_blanks_both() {
        let raw = alice().with("pwdLastSet", "not-a-number");
        let u = normalize_user(&raw);
        assert_eq!(u.last_logon_timestamp, ERROR_CALCULATING);
        assert_eq!(u.pwd_last_set, ERROR_CALCULATING);

        let mut raw = alice();
        raw.attributes.remove("lastLogonTimestamp");
        let u = normalize_user(&raw);
        assert_eq!(u.last_logon_timestamp, ERROR_CALCULATING);
        assert_eq!(u.pwd_last_set, ERROR_CALCULATING);
    }

    #[test]
    fn never_logged_on_past_calendar_shows_never_expires() {
        let raw = alice().with("lastLogonTimestamp", "9223372036854775807");
        let u = normalize_user(&raw);
        assert_eq!(u.last_logon_timestamp, "Never Expires");
        assert_eq!(u.pwd_last_set, "2019-07-16 18:40:00");
    }

    #[test]
    fn password_age_is_configurable() {
        let u = normalize_user_with(
            &alice(),
            &NormalizeOptions {
                password_max_age_days: 30,
            },
        );
        assert_eq!(u.pwd_last_set, "2019-05-17 18:40:00");
    }

    #[test]
    fn group_missing_fields_are_na() {
        let raw = RawEntry::new("CN=ops_admins,OU=Groups")
            .with("cn", "ops_admins")
            .with("distinguishedName", "CN=ops_admins,OU=Groups")
            .with_values("member", ["CN=A", "CN=B"]);
        let g = normalize_group(&raw);
        assert_eq!(g.cn, "ops_admins");
        assert_eq!(g.member, "CN=A\nCN=B");
        assert_eq!(g.managed_by, NOT_AVAILABLE);
        assert_eq!(g.mail, NOT_AVAILABLE);
        assert_eq!(g.member_of, NOT_AVAILABLE);
    }
}
