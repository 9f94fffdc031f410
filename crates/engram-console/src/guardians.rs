//! Locally remembered guarded engrams

use clap::ArgMatches;
use engram_core::{CanisterId, EngramConfig};
use engram_session::GuardianSessionStore;

/// Store at the configured path, or the platform default
#[must_use]
pub fn open(config: &EngramConfig) -> GuardianSessionStore {
    GuardianSessionStore::at_path(config.resolved_store_path())
}

/// One canister id per line, or a note when the list is empty
#[must_use]
pub fn list(store: &GuardianSessionStore) -> String {
    let engrams = store.guardian_engrams();
    if engrams.is_empty() {
        return "no guarded engrams".to_string();
    }
    engrams
        .iter()
        .map(|entry| entry.canister_id.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply the `guardians` subcommand to `store`
///
/// # Errors
/// Fails on an invalid canister id or when the store cannot be written.
pub fn run(store: &GuardianSessionStore, args: &ArgMatches) -> anyhow::Result<String> {
    match args.subcommand() {
        Some(("add", args)) => {
            let canister_id = canister_arg(args)?;
            Ok(if store.add_guardian_engram(canister_id.clone())? {
                format!("added {canister_id}")
            } else {
                format!("{canister_id} already listed")
            })
        }
        Some(("remove", args)) => {
            let canister_id = canister_arg(args)?;
            Ok(if store.remove_guardian_engram(&canister_id)? {
                format!("removed {canister_id}")
            } else {
                format!("{canister_id} not listed")
            })
        }
        Some(("clear", _)) => {
            store.clear()?;
            Ok("cleared".to_string())
        }
        Some(("list", _)) | None => Ok(list(store)),
        Some((other, _)) => anyhow::bail!("unknown guardians command {other}"),
    }
}

fn canister_arg(args: &ArgMatches) -> anyhow::Result<CanisterId> {
    let text = args
        .get_one::<String>("canister")
        .ok_or_else(|| anyhow::anyhow!("missing canister argument"))?;
    Ok(CanisterId::parse(text)?)
}
