//! CLI entrypoint for `ulu`.
//!
//! Loads configuration from flags, the environment and an optional `.env`
//! file, binds to the directory, runs the requested account/group searches,
//! releases the session, then prints a terminal report (or JSON/CSV) and
//! optionally writes CSV exports when an output directory is provided.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, error, info, warn};
use ulu::{
    config::{Resolved, Settings, load_env_file, read_password_line},
    error::LookupError,
    export::{render_csv, render_json, save_groups_csv, save_users_csv},
    normalize::{NormalizedGroup, NormalizedUser, normalize_groups, normalize_users},
    report::{render_groups, render_not_found, render_users},
    search::{AccountSearch, GroupSearch, Interrupt, Mode, Searcher},
    session::{LdapSession, SessionGuard},
    timestamp::DEFAULT_PASSWORD_MAX_AGE_DAYS,
};

const EXIT_CONFIG: i32 = 2;
const EXIT_AUTH: i32 = 3;
const EXIT_SEARCH: i32 = 4;
const EXIT_EXPORT: i32 = 5;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "ulu",
    version,
    about = "Look up Active Directory users and groups by partial name"
)]
struct Args {
    /// Partial account (sAMAccountName) or group name to search for
    fragment: String,

    /// Directory server host [env: LDAP_HOST]
    #[arg(long = "host")]
    host: Option<String>,

    /// Server port (default 636, or 389 with --no-tls/--starttls)
    #[arg(long = "port")]
    port: Option<u16>,

    /// Connect with plain ldap:// instead of ldaps://
    #[arg(long = "no-tls")]
    no_tls: bool,

    /// Connect with ldap:// and upgrade via StartTLS
    #[arg(long = "starttls", conflicts_with = "no_tls")]
    starttls: bool,

    /// Container DN to search for accounts; repeat for several
    /// [env: SEARCH_OU, ADMIN_SEARCH_OU]
    #[arg(short = 'c', long = "container")]
    containers: Vec<String>,

    /// Container DN holding groups [env: GROUP_SEARCH_OU]
    #[arg(long = "group-base")]
    group_base: Option<String>,

    /// NetBIOS domain used to bind as DOMAIN\user [env: LDAP_DOMAIN]
    #[arg(short = 'D', long = "domain")]
    domain: Option<String>,

    /// Account to bind as [env: LDAP_USER, default: current login]
    #[arg(short = 'u', long = "user")]
    user: Option<String>,

    /// Read the bind password from the first line of stdin
    /// (otherwise LDAP_PASSWORD is used)
    #[arg(long = "password-stdin")]
    password_stdin: bool,

    /// Env file to load (default: ./.env when present)
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,

    /// Which searches to run
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Users)]
    mode: Mode,

    /// Output format for results printed to stdout
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Directory to write CSV exports into
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Password rotation age used to estimate expiry, in days
    #[arg(long = "password-max-age-days", default_value_t = DEFAULT_PASSWORD_MAX_AGE_DAYS)]
    password_max_age_days: u32,

    /// Connect/operation timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress report output (still writes exports if -o is provided)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn resolve_config(args: &Args) -> Result<Resolved> {
    if let Some(path) = load_env_file(args.env_file.as_deref())? {
        info!("loaded environment from {}", path.display());
    }
    let password = if args.password_stdin {
        Some(read_password_line(io::stdin().lock())?)
    } else {
        None
    };
    let settings = Settings {
        fragment: args.fragment.clone(),
        host: args.host.clone(),
        port: args.port,
        no_tls: args.no_tls,
        starttls: args.starttls,
        containers: args.containers.clone(),
        group_base: args.group_base.clone(),
        domain: args.domain.clone(),
        user: args.user.clone(),
        password,
        mode: args.mode,
        timeout: Duration::from_secs(args.timeout),
        password_max_age_days: args.password_max_age_days,
    };
    Ok(settings.resolve(|name| std::env::var(name).ok())?)
}

fn install_interrupt_handler() -> Interrupt {
    let interrupt = Interrupt::new();
    let flag = interrupt.clone();
    let res = ctrlc::set_handler(move || {
        if flag.is_triggered() {
            // second Ctrl+C while blocked on the server: give up immediately
            eprintln!("{}", "[XXX] Exiting now..".bold().red());
            std::process::exit(EXIT_INTERRUPTED);
        }
        flag.trigger();
    });
    if let Err(e) = res {
        warn!("failed to install Ctrl+C handler: {}", e);
    }
    interrupt
}

fn write_exports(
    outdir: &Path,
    users: &[NormalizedUser],
    groups: &[NormalizedGroup],
) -> Result<()> {
    fs::create_dir_all(outdir)
        .with_context(|| format!("failed to create output directory {}", outdir.display()))?;
    let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S");
    if !users.is_empty() {
        let path = outdir.join(format!("ulu_users_{}.csv", ts));
        save_users_csv(users, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if !groups.is_empty() {
        let path = outdir.join(format!("ulu_groups_{}.csv", ts));
        save_groups_csv(groups, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    let interrupt = install_interrupt_handler();

    let config = match resolve_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let session = match LdapSession::bind(&config.directory, &config.credentials) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_AUTH);
        }
    };
    let mut session = SessionGuard::new(session);
    let outcome = Searcher::new(&mut *session)
        .with_interrupt(interrupt)
        .run(&config.plan);
    session.release();

    let outcome = match outcome {
        Ok(o) => o,
        Err(LookupError::Interrupted) => {
            eprintln!("\n{}", "[!!!] Ctrl + C Detected!".bold().red());
            eprintln!("{}", "[XXX] Exiting now..".bold().red());
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_SEARCH);
        }
    };

    let plan = &config.plan;
    if outcome.users == Some(AccountSearch::NotFound) {
        eprintln!(
            "{}",
            render_not_found(&plan.fragment, &plan.containers.join(" or "))
        );
    }
    if outcome.groups == Some(GroupSearch::NotFound) {
        eprintln!(
            "{}",
            render_not_found(&plan.fragment, &format!("{} groups", plan.group_base))
        );
    }
    let users = outcome
        .users
        .as_ref()
        .map(|s| normalize_users(s.entries(), &config.normalize))
        .unwrap_or_default();
    let groups = outcome
        .groups
        .as_ref()
        .map(|s| normalize_groups(s.entries()))
        .unwrap_or_default();

    if !args.quiet {
        let rendered = match args.format {
            OutputFormat::Table => {
                let mut out = String::new();
                if !users.is_empty() {
                    out.push_str(&render_users(&users));
                }
                if !groups.is_empty() {
                    out.push_str(&render_groups(&groups));
                }
                Ok(out)
            }
            OutputFormat::Json => render_json(&users, &groups).map(|s| s + "\n"),
            OutputFormat::Csv => render_csv(&users, &groups),
        };
        match rendered {
            Ok(s) => print!("{}", s),
            Err(e) => {
                error!("failed to render results: {}", e);
                std::process::exit(EXIT_EXPORT);
            }
        }
    }

    if let Some(outdir) = &args.output {
        if let Err(e) = write_exports(outdir, &users, &groups) {
            error!("{:#}", e);
            std::process::exit(EXIT_EXPORT);
        }
    }
}
