use crate::cli::{prompt, CliContext};
use crate::constants;
use crate::core::generator::{OsRngGenerator, PasswordGenerator};
use crate::core::identity::SystemIdentity;
use crate::error::SafeError;
use crate::models::credential::Credential;
use crate::models::safe::Safe;
use crate::util::clipboard;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use serde::Serialize;
use zeroize::Zeroizing;

fn parse_alias(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("alias cannot be empty".into());
    }
    Ok(s.to_string())
}

fn parse_length(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    check_length(n)?;
    Ok(n)
}

fn check_length(n: usize) -> Result<(), String> {
    if n == 0 || n > constants::MAX_GENERATED_LENGTH {
        return Err(format!(
            "length must be between 1 and {}",
            constants::MAX_GENERATED_LENGTH
        ));
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Credential alias (prompted if omitted)
    #[arg(value_parser = parse_alias)]
    pub alias: Option<String>,

    /// Username (prompted if omitted)
    pub username: Option<String>,

    /// Password (generated or prompted if omitted)
    pub password: Option<String>,

    /// Generate the password without asking
    #[arg(long, conflicts_with = "password")]
    pub generate: bool,

    /// Generated password length (default from config, 50)
    #[arg(long, value_parser = parse_length)]
    pub length: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AliasArgs {
    /// Credential alias
    #[arg(value_parser = parse_alias)]
    pub alias: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,
}

pub fn run_init(ctx: &CliContext) -> Result<()> {
    let _lock = ctx.lock_safe()?;
    let safe_file = ctx.safe_file();
    let safe = safe_file.create(&SystemIdentity)?;
    let mut password = ctx.master_password(true);
    safe_file.save(&safe, &mut password)?;
    ctx.audit("init", "");
    println!("Created safe at {}", safe_file.path().display());
    Ok(())
}

pub fn run_add(ctx: &CliContext, args: AddArgs) -> Result<()> {
    let _lock = ctx.lock_safe()?;
    let safe_file = ctx.safe_file();

    let created = !safe_file.exists();
    let (mut safe, mut password) = if created {
        if !prompt::confirm(ctx.non_interactive, "Unable to find safe, create new", true)? {
            return Err(SafeError::NoSafe {
                path: safe_file.path().to_path_buf(),
            }
            .into());
        }
        (safe_file.create(&SystemIdentity)?, ctx.master_password(true))
    } else {
        let mut password = ctx.master_password(false);
        (safe_file.load(&mut password)?, password)
    };

    let alias = match args.alias {
        Some(alias) => alias,
        None => prompt::input(ctx.non_interactive, "Alias")?,
    };
    if alias.is_empty() {
        return Err(SafeError::InvalidAlias("alias cannot be empty".into()).into());
    }
    // refuse before asking for anything else
    if safe.contains(&alias) {
        return Err(SafeError::DuplicateAlias(alias).into());
    }

    let username = match args.username {
        Some(username) => username,
        None => prompt::input(ctx.non_interactive, "Username")?,
    };

    let secret = match args.password {
        Some(secret) => Zeroizing::new(secret),
        None if args.generate
            || prompt::confirm(ctx.non_interactive, "Generate password", true)? =>
        {
            let length = args.length.unwrap_or(ctx.config.generator.length);
            check_length(length).map_err(anyhow::Error::msg)?;
            OsRngGenerator.generate(length)
        }
        None => prompt::secret(ctx.non_interactive, "Password")?,
    };

    safe.add(Credential::new(alias.as_str(), username, secret.as_str()))?;
    safe_file.save(&safe, &mut password)?;

    if created {
        ctx.audit("init", "");
    }
    ctx.audit("add", &alias);
    println!("Credential '{}' added", alias);
    Ok(())
}

pub fn run_cat(ctx: &CliContext, args: AliasArgs) -> Result<()> {
    let safe = load(ctx)?;
    let cred = safe.get(&args.alias)?;
    let json = Zeroizing::new(serde_json::to_string_pretty(cred).context("serialize credential")?);
    println!("{}", json.as_str());
    ctx.audit("cat", &args.alias);
    Ok(())
}

pub fn run_cp(ctx: &CliContext, args: AliasArgs) -> Result<()> {
    let safe = load(ctx)?;
    let cred = safe.get(&args.alias)?;
    clipboard::copy(&cred.secret)?;
    ctx.audit("cp", &args.alias);
    println!("Password for '{}' copied to clipboard", args.alias);
    Ok(())
}

pub fn run_rm(ctx: &CliContext, args: AliasArgs) -> Result<()> {
    let _lock = ctx.lock_safe()?;
    let safe_file = ctx.safe_file();
    let mut password = ctx.master_password(false);
    let mut safe = safe_file.load(&mut password)?;
    safe.remove(&args.alias)?;
    safe_file.save(&safe, &mut password)?;
    ctx.audit("rm", &args.alias);
    println!("Credential '{}' removed", args.alias);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListItem<'a> {
    alias: &'a str,
    username: &'a str,
    created_on: i64,
}

fn list_items(safe: &Safe) -> Vec<ListItem<'_>> {
    safe.credentials()
        .map(|c| ListItem {
            alias: &c.alias,
            username: &c.username,
            created_on: c.created_on,
        })
        .collect()
}

pub fn run_ls(ctx: &CliContext, args: LsArgs) -> Result<()> {
    let safe = load(ctx)?;
    let items = list_items(&safe);

    if args.format == ListFormat::Json {
        let json = serde_json::to_string_pretty(&items).context("serialize list")?;
        println!("{}", json);
        return Ok(());
    }

    if items.is_empty() {
        println!("No credentials found");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Alias").add_attribute(Attribute::Bold),
        Cell::new("Username").add_attribute(Attribute::Bold),
        Cell::new("Created").add_attribute(Attribute::Bold),
    ]);
    for item in &items {
        table.add_row(vec![
            item.alias.to_string(),
            item.username.to_string(),
            format_date(item.created_on),
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn load(ctx: &CliContext) -> Result<Safe> {
    let safe_file = ctx.safe_file();
    if !safe_file.exists() {
        bail!(
            "no safe found at {} (run `pick init` or `pick add`)",
            safe_file.path().display()
        );
    }
    let mut password = ctx.master_password(false);
    Ok(safe_file.load(&mut password)?)
}

fn format_date(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}
