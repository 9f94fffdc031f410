//! engramx console
//!
//! Command-line front end over the engram client crates. Invite lifecycles
//! run against the in-memory backend with a scaled clock, so a 24h guardian
//! invite can be watched end to end in seconds. Guarded engrams are kept in
//! the file named by `store_path`.

#![allow(missing_docs)]

pub mod guardians;
pub mod inspect;
pub mod simulate;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use engram_core::telemetry::init_tracing;
use engram_core::EngramConfig;
use std::path::PathBuf;

pub use simulate::{Outcome, SimulationOptions, SimulationReport};

/// Command-line definition of `engramx`
#[must_use]
pub fn cli() -> Command {
    Command::new("engramx")
        .version(engram_core::VERSION)
        .about("Engram invitation console")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run an invite lifecycle against an in-memory engram")
                .arg(
                    Arg::new("kind")
                        .required(true)
                        .value_parser(["guardian", "operator"])
                        .help("Invite kind"),
                )
                .arg(
                    Arg::new("accept-after")
                        .long("accept-after")
                        .value_parser(value_parser!(u64))
                        .help("Redeem the code after this many simulated seconds"),
                )
                .arg(
                    Arg::new("tick-ms")
                        .long("tick-ms")
                        .default_value("10")
                        .value_parser(value_parser!(u64).range(1..))
                        .help("Wall-clock milliseconds per simulated second"),
                )
                .arg(
                    Arg::new("ttl")
                        .long("ttl")
                        .value_parser(value_parser!(u64).range(1..))
                        .help("Override code validity in simulated seconds"),
                ),
        )
        .subcommand(
            Command::new("route")
                .about("Resolve an application path")
                .arg(Arg::new("path").required(true).help("Path with optional query"))
                .arg(
                    Arg::new("signed-in")
                        .long("signed-in")
                        .action(ArgAction::SetTrue)
                        .help("Resolve as a signed-in user"),
                ),
        )
        .subcommand(
            Command::new("link")
                .about("Decode a guardian invite link")
                .arg(Arg::new("url").required(true).help("Invite link")),
        )
        .subcommand(
            Command::new("guardians")
                .about("Manage the locally remembered guarded engrams")
                .subcommand(Command::new("list").about("List guarded engrams"))
                .subcommand(
                    Command::new("add")
                        .about("Remember a guarded engram")
                        .arg(Arg::new("canister").required(true).help("Canister id")),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Forget a guarded engram")
                        .arg(Arg::new("canister").required(true).help("Canister id")),
                )
                .subcommand(Command::new("clear").about("Forget every guarded engram")),
        )
}

/// Load `--config` (or defaults), overlay the environment and validate
///
/// # Errors
/// Fails if the file cannot be read or parsed, or the result is invalid.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngramConfig> {
    let config = match path {
        Some(path) => EngramConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EngramConfig::default(),
    }
    .with_env();
    config.validate()?;
    Ok(config)
}

/// Execute parsed command-line arguments
///
/// # Errors
/// Propagates configuration, simulation and decoding failures.
pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(matches.get_one::<PathBuf>("config"))?;
    init_tracing(&config.log);

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let options = SimulationOptions::from_args(args)?;
            let report = simulate::run(&config, &options).await?;
            println!("{report}");
        }
        Some(("route", args)) => {
            let path = args
                .get_one::<String>("path")
                .context("missing path argument")?;
            println!("{}", inspect::route(path, args.get_flag("signed-in")));
        }
        Some(("link", args)) => {
            let url = args
                .get_one::<String>("url")
                .context("missing url argument")?;
            println!("{}", inspect::link(url)?);
        }
        Some(("guardians", args)) => {
            let store = guardians::open(&config);
            tracing::debug!(path = %config.resolved_store_path().display(), "guardian store");
            println!("{}", guardians::run(&store, args)?);
        }
        Some((other, _)) => anyhow::bail!("unknown command {other}"),
        None => anyhow::bail!("no command given"),
    }
    Ok(())
}
