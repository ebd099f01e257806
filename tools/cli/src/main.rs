//! osdbg - inspect OS debugging session configurations
//!
//! Loads the same configuration the debug adapter receives at attach time
//! and answers the questions that usually go wrong when setting one up:
//! which group a source file lands in, which symbol file a group loads, and
//! whether an address counts as kernel or user memory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use osdbg_core::address::parse_address;
use osdbg_core::{Config, Domain, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "osdbg")]
#[command(about = "Check OS debugging session configurations")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a configuration and print what it declares
    Check {
        /// JSON (launch arguments) or TOML configuration
        config: PathBuf,
    },

    /// Report which domain an address belongs to
    Classify {
        config: PathBuf,
        /// `0x`-prefixed hex or decimal
        address: String,
    },

    /// Show the groups owning a source file and their symbol files
    Map {
        config: PathBuf,
        path: String,
    },
}

fn load(path: &Path) -> Result<SessionConfig> {
    debug!("loading {}", path.display());
    SessionConfig::load(path).with_context(|| format!("invalid configuration {}", path.display()))
}

fn describe(config: &SessionConfig) -> Result<String> {
    let layout = config.memory_layout()?;
    let mut out = String::new();
    writeln!(out, "current group: {}", config.first_breakpoint_group)?;
    writeln!(out, "next group:    {}", config.second_breakpoint_group)?;
    writeln!(out, "pc register:   {}", config.program_counter_id)?;
    writeln!(out, "hook timeout:  {} ms", config.hook_timeout_ms)?;
    for domain in [Domain::Kernel, Domain::User] {
        writeln!(out, "{domain} ranges:")?;
        for range in layout.ranges(domain) {
            writeln!(out, "  {range}")?;
        }
    }

    let groups = config.group_mapper()?;
    writeln!(out, "borders:")?;
    for border in &config.border_breakpoints {
        writeln!(out, "  {border} -> {}", groups.groups_for(&border.filepath).join(", "))?;
    }
    writeln!(out, "hooks:")?;
    for hook in config.hooks() {
        writeln!(
            out,
            "  {} ({}) -> {}",
            hook.location,
            hook.behavior.describe(),
            groups.groups_for(&hook.location.file).join(", ")
        )?;
    }
    Ok(out)
}

fn classify(config: &SessionConfig, address: &str) -> Result<String> {
    let address = parse_address(address)?;
    let layout = config.memory_layout()?;
    Ok(match layout.classify(address) {
        Some(domain) => format!("{address:#x}: {domain}"),
        None => format!("{address:#x}: outside every configured range"),
    })
}

fn map(config: &SessionConfig, path: &str) -> Result<String> {
    let groups = config.group_mapper()?;
    let symbols = config.symbol_mapper()?;
    let mut out = String::new();
    for group in groups.groups_for(path) {
        match symbols.symbol_file_for(&group) {
            Some(file) => writeln!(out, "{group} (symbols: {file})")?,
            None => writeln!(out, "{group} (no symbol file)")?,
        }
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let report = match &args.command {
        Command::Check { config } => {
            let config = load(config)?;
            info!("configuration is valid");
            describe(&config)?
        }
        Command::Classify { config, address } => classify(&load(config)?, address)?,
        Command::Map { config, path } => map(&load(config)?, path)?,
    };
    print!("{report}");
    if !report.ends_with('\n') {
        println!();
    }
    Ok(())
}
