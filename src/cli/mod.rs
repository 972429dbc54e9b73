//! CLI routing and command dispatch.

use crate::constants;
use crate::core::file_lock::FileLock;
use crate::core::password::CachedPassword;
use crate::core::paths::{self, PickPaths};
use crate::core::safe_file::SafeFile;
use crate::models::config::PickConfig;
use crate::util::fs as pick_fs;
use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use prompt::MasterPassword;
use std::path::PathBuf;

pub mod audit;
pub mod credential;
pub mod prompt;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: PickPaths,
    pub config: PickConfig,
    pub non_interactive: bool,
}

impl CliContext {
    pub fn safe_file(&self) -> SafeFile {
        SafeFile::new(&self.paths.safe, self.config.kdf)
    }

    /// Master password for the rest of this command, asked at most once.
    pub fn master_password(&self, confirm: bool) -> CachedPassword<MasterPassword> {
        let source = if self.non_interactive {
            MasterPassword::Stdin
        } else {
            MasterPassword::Prompt {
                prompt: "Master password".to_string(),
                confirm,
            }
        };
        CachedPassword::new(source)
    }

    /// Hold the safe's advisory lock for a mutating command.
    pub fn lock_safe(&self) -> Result<FileLock> {
        match FileLock::try_exclusive(&self.paths.safe_lock)? {
            Some(lock) => Ok(lock),
            None => bail!(
                "{} is in use by another pick process",
                self.paths.safe.display()
            ),
        }
    }

    /// Write an audit log line. Failures are reported, never fatal.
    pub fn audit(&self, action: &str, alias: &str) {
        if !self.config.audit.enabled {
            return;
        }
        if let Err(e) = crate::core::audit_log::log(&self.paths, action, alias) {
            eprintln!("warning: audit log failed: {:#}", e);
        }
    }

    fn warn_if_exposed(&self) {
        if !self.paths.safe.exists() {
            return;
        }
        match pick_fs::mode_of(&self.paths.safe) {
            Ok(mode) if mode & 0o077 != 0 => eprintln!(
                "warning: {} has mode {:o}, expected {:o}",
                self.paths.safe.display(),
                mode,
                constants::SAFE_FILE_MODE
            ),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "cannot stat safe"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pick",
    version,
    about = "Minimal password manager",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print version
    #[arg(
        short = 'v',
        long,
        action = ArgAction::Version,
        value_parser = clap::value_parser!(bool)
    )]
    version: (),

    /// Safe file (default: ~/.pick.safe)
    #[arg(long, global = true, value_name = "PATH", env = "PICK_SAFE")]
    pub safe: Option<PathBuf>,

    /// Config file (default: ~/.pick.toml)
    #[arg(long, global = true, value_name = "PATH", env = "PICK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read the master password from stdin and never prompt
    #[arg(long, global = true, env = "PICK_NON_INTERACTIVE")]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config_path = paths::config_path(self.config)?;
        let config = crate::core::config::load(&config_path)?;
        let paths = PickPaths::resolve(self.safe, &config)?;
        tracing::debug!(%paths, config = %config_path.display(), "resolved paths");

        let ctx = CliContext {
            paths,
            config,
            non_interactive: self.non_interactive,
        };
        ctx.warn_if_exposed();

        match self.command {
            Commands::Init => credential::run_init(&ctx),
            Commands::Add(args) => credential::run_add(&ctx, args),
            Commands::Cat(args) => credential::run_cat(&ctx, args),
            Commands::Cp(args) => credential::run_cp(&ctx, args),
            Commands::Rm(args) => credential::run_rm(&ctx, args),
            Commands::Ls(args) => credential::run_ls(&ctx, args),
            Commands::Audit { command } => audit::run(&ctx, command),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new, empty safe
    Init,
    /// Add a credential
    Add(credential::AddArgs),
    /// Print a credential
    Cat(credential::AliasArgs),
    /// Copy a credential's password to the clipboard
    Cp(credential::AliasArgs),
    /// Remove a credential
    Rm(credential::AliasArgs),
    /// List credentials
    Ls(credential::LsArgs),
    /// View or verify the audit trail
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },
}
