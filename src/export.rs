//! Machine-readable exports of normalized lookup results.
//!
//! - `render_json` produces `{ "users": [...], "groups": [...] }`.
//! - `render_csv` writes a users block then a groups block, each with its own
//!   header row.
//! - `save_users_csv` / `save_groups_csv` write one record type per file.
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use csv::Writer;
use serde::Serialize;

use crate::normalize::{NormalizedGroup, NormalizedUser};

#[derive(Serialize)]
struct Report<'a> {
    users: &'a [NormalizedUser],
    groups: &'a [NormalizedGroup],
}

pub fn render_json(users: &[NormalizedUser], groups: &[NormalizedGroup]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Report { users, groups })?)
}

fn write_records<W: Write, T: Serialize>(out: W, records: &[T]) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn render_csv(users: &[NormalizedUser], groups: &[NormalizedGroup]) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    if !users.is_empty() {
        write_records(&mut buf, users)?;
    }
    if !groups.is_empty() {
        if !buf.is_empty() {
            buf.push(b'\n');
        }
        write_records(&mut buf, groups)?;
    }
    Ok(String::from_utf8(buf)?)
}

pub fn save_users_csv<P: AsRef<Path>>(users: &[NormalizedUser], path: P) -> Result<()> {
    write_records(std::fs::File::create(path)?, users)
}

pub fn save_groups_csv<P: AsRef<Path>>(groups: &[NormalizedGroup], path: P) -> Result<()> {
    write_records(std::fs::File::create(path)?, groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::RawEntry;
    use crate::normalize::{normalize_group, normalize_user};
    use tempfile::tempdir;

    fn sample() -> (Vec<NormalizedUser>, Vec<NormalizedGroup>) {
        let user = normalize_user(
            &RawEntry::new("CN=Alice,OU=Staff")
                .with("cn", "Alice")
                .with_values("memberOf", ["GroupA", "GroupB"]),
        );
        let group = normalize_group(
            &RawEntry::new("CN=ops_admins,OU=Groups")
                .with("cn", "ops_admins")
                .with("distinguishedName", "CN=ops_admins,OU=Groups"),
        );
        (vec![user], vec![group])
    }

    #[test]
    fn json_carries_every_field() {
        let (users, groups) = sample();
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&users, &groups).unwrap()).unwrap();
        let u = &json["users"][0];
        for key in [
            "cn",
            "company",
            "department",
            "description",
            "distinguishedName",
            "mail",
            "manager",
            "memberOf",
            "dn",
            "lastLogonTimestamp",
            "pwdLastSet",
        ] {
            assert!(u.get(key).is_some(), "missing {key}");
        }
        assert_eq!(u["memberOf"], "GroupA \nGroupB \n");
        assert_eq!(u["company"], "Missing.");
        assert_eq!(json["groups"][0]["managedBy"], "NA");
    }

    #[test]
    fn csv_has_header_per_block() {
        let (users, groups) = sample();
        let out = render_csv(&users, &groups).unwrap();
        assert!(out.starts_with("cn,company,department,description,distinguishedName"));
        assert!(out.contains("\ncn,distinguishedName,memberOf,member,managedBy,mail\n"));
        // multi-line memberOf stays in one quoted field
        assert!(out.contains("\"GroupA \nGroupB \n\""));
    }

    #[test]
    fn writes_csv_files() {
        let (users, groups) = sample();
        let dir = tempdir().unwrap();
        let users_path = dir.path().join("users.csv");
        let groups_path = dir.path().join("groups.csv");
        save_users_csv(&users, &users_path).unwrap();
        save_groups_csv(&groups, &groups_path).unwrap();
        let u = std::fs::read_to_string(users_path).unwrap();
        let g = std::fs::read_to_string(groups_path).unwrap();
        assert!(u.contains("CN=Alice,OU=Staff"));
        assert!(g.contains("ops_admins"));
    }
}
