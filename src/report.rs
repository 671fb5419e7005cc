//! Human-readable report rendering for terminal output.
//!
//! Users get a summary table followed by a detail table (manager, group
//! membership and DN per user). Groups get a field-by-field dump. Colour goes
//! through `colored`, so the global colour override set in `main` applies.
use colored::*;

use crate::normalize::{NormalizedGroup, NormalizedUser};

const RULE: &str = "-----------------------------------------------------------";

pub const SUMMARY_HEADERS: [&str; 7] = [
    "cn",
    "company",
    "department",
    "description",
    "mail",
    "lastLogonTimestamp",
    "passwordExpires",
];

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(visible_len(s));
    format!("{}{}", " ".repeat(fill), s)
}

fn border(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}\n", left, segments.join(mid), right)
}

/// Boxed table with a rule between every row. Cells may span several lines
/// and are right-aligned.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_len(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let w = cell.lines().map(visible_len).max().unwrap_or(0);
            if let Some(slot) = widths.get_mut(i) {
                *slot = (*slot).max(w);
            }
        }
    }

    let render_row = |cells: &[String]| -> String {
        let split: Vec<Vec<&str>> = cells.iter().map(|c| c.lines().collect()).collect();
        let height = split.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut s = String::new();
        for line in 0..height {
            s.push('│');
            for (i, width) in widths.iter().enumerate() {
                let text = split.get(i).and_then(|c| c.get(line)).copied().unwrap_or("");
                s.push(' ');
                s.push_str(&pad_left(text, *width));
                s.push_str(" │");
            }
            s.push('\n');
        }
        s
    };

    let mut out = border(&widths, "┌", "┬", "┐");
    out.push_str(&render_row(headers));
    for row in rows {
        out.push_str(&border(&widths, "├", "┼", "┤"));
        out.push_str(&render_row(row));
    }
    out.push_str(&border(&widths, "└", "┴", "┘"));
    out
}

/// Apply `paint` to each line separately so colour codes never span a line
/// break (table borders sit between lines).
fn paint_lines<F>(text: &str, paint: F) -> String
where
    F: Fn(&str) -> String,
{
    text.split('\n')
        .map(|line| if line.is_empty() { String::new() } else { paint(line) })
        .collect::<Vec<_>>()
        .join("\n")
}

fn green(text: &str) -> String {
    paint_lines(text, |l| l.green().to_string())
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.cyan().to_string()).collect()
}

pub fn render_user_summary(users: &[NormalizedUser]) -> String {
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| {
            [
                &u.cn,
                &u.company,
                &u.department,
                &u.description,
                &u.mail,
                &u.last_logon_timestamp,
                &u.pwd_last_set,
            ]
            .iter()
            .map(|v| green(v))
            .collect()
        })
        .collect();
    render_table(&headers(&SUMMARY_HEADERS), &rows)
}

pub fn render_user_details(users: &[NormalizedUser]) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for u in users {
        for (key, value) in [("manager", &u.manager), ("memberOf", &u.member_of), ("dn", &u.dn)] {
            rows.push(vec![key.green().to_string(), value.clone()]);
        }
    }
    render_table(&headers(&["key", "result"]), &rows)
}

pub fn render_users(users: &[NormalizedUser]) -> String {
    let mut out = render_user_summary(users);
    out.push_str(&render_user_details(users));
    out
}

pub fn render_groups(groups: &[NormalizedGroup]) -> String {
    let mut out = format!("{}\n", "--- GROUP SEARCH RESULTS ---".bold().red());
    for g in groups {
        for (label, value) in [
            ("---- Group ----", &g.cn),
            ("-- distinguishedName --", &g.distinguished_name),
            ("-- memberOf --", &g.member_of),
            ("-- member --", &g.member),
            ("-- managedBy --", &g.managed_by),
            ("-- mail --", &g.mail),
        ] {
            out.push_str(&format!("{}\n", RULE.cyan()));
            out.push_str(&format!("{} {}\n", label.yellow(), green(value)));
        }
    }
    out
}

pub fn render_not_found(fragment: &str, scope: &str) -> String {
    format!("{} {} was not located in {}", "[!]".bold().red(), fragment, scope)
}
