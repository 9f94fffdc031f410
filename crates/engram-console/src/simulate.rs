//! Invite lifecycle simulation
//!
//! Runs one invite against an `InMemoryEngram` with every duration scaled
//! so that one simulated second lasts `tick` of wall-clock time.

use anyhow::Context;
use clap::ArgMatches;
use engram_core::memory::InMemoryEngram;
use engram_core::{
    connected, CanisterId, EngramConfig, GuardianPermissions, InviteTiming, Principal,
};
use engram_invite::{GuardianInvite, InviteKind, MemoryClipboard, OperatorInvite};
use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const SIM_OWNER: &str = "aaaaa-aa";
const SIM_ENGRAM: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
const SIM_GUARDIAN: &str = "rdmx6-jaaaa-aaaaa-aaadq-cai";

/// How a simulated invite ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Expired,
    /// Operator paired and the code was dismissed
    Dismissed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Dismissed => "dismissed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOptions {
    pub kind: InviteKind,
    /// Simulated seconds until the code is redeemed
    pub accept_after: Option<u64>,
    /// Wall-clock length of one simulated second
    pub tick: Duration,
    /// Code validity override in simulated seconds
    pub ttl_secs: Option<u64>,
}

impl SimulationOptions {
    #[must_use]
    pub fn new(kind: InviteKind) -> Self {
        Self {
            kind,
            accept_after: None,
            tick: Duration::from_millis(10),
            ttl_secs: None,
        }
    }

    /// Options from the `simulate` subcommand
    ///
    /// # Errors
    /// Fails on an unknown invite kind.
    pub fn from_args(args: &ArgMatches) -> anyhow::Result<Self> {
        let kind = match args.get_one::<String>("kind").map(String::as_str) {
            Some("guardian") => InviteKind::Guardian,
            Some("operator") => InviteKind::Operator,
            other => anyhow::bail!("unknown invite kind {other:?}"),
        };
        Ok(Self {
            kind,
            accept_after: args.get_one::<u64>("accept-after").copied(),
            tick: Duration::from_millis(args.get_one::<u64>("tick-ms").copied().unwrap_or(10)),
            ttl_secs: args.get_one::<u64>("ttl").copied(),
        })
    }

    /// Engine timing scaled to the simulated clock
    #[must_use]
    pub fn timing(&self, base: &InviteTiming) -> InviteTiming {
        let tick_ms = u64::try_from(self.tick.as_millis()).unwrap_or(u64::MAX).max(1);
        let poll_ms = base
            .poll_interval_ms
            .saturating_mul(tick_ms)
            .checked_div(base.tick_interval_ms)
            .unwrap_or(base.poll_interval_ms)
            .max(1);
        let mut timing = InviteTiming {
            poll_interval_ms: poll_ms,
            tick_interval_ms: tick_ms,
            ..*base
        };
        match (self.kind, self.ttl_secs) {
            (InviteKind::Guardian, Some(ttl)) => timing.guardian_ttl_secs = ttl,
            (InviteKind::Operator, Some(ttl)) => timing.operator_ttl_secs = ttl,
            (_, None) => {}
        }
        timing
    }

    fn delay(&self, simulated_secs: u64) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(simulated_secs).unwrap_or(u32::MAX))
    }
}

/// Summary of one simulated invite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub kind: InviteKind,
    pub code: String,
    /// Invite link or pairing command
    pub share: String,
    pub outcome: Outcome,
    /// Remaining validity when the run ended
    pub remaining: String,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "kind:      {}", self.kind)?;
        writeln!(f, "code:      {}", self.code)?;
        writeln!(f, "share:     {}", self.share)?;
        writeln!(f, "outcome:   {}", self.outcome)?;
        write!(f, "remaining: {}", self.remaining)
    }
}

/// Run one simulated invite to completion
///
/// # Errors
/// Fails when the backend rejects the invite or the clipboard write fails.
pub async fn run(
    config: &EngramConfig,
    options: &SimulationOptions,
) -> anyhow::Result<SimulationReport> {
    let canister = CanisterId::parse(SIM_ENGRAM)?;
    let engram = Arc::new(InMemoryEngram::new(
        Principal::parse(SIM_OWNER)?,
        canister.clone(),
    ));
    tracing::info!(kind = %options.kind, tick = ?options.tick, "starting simulation");

    match options.kind {
        InviteKind::Guardian => guardian(config, options, engram, canister).await,
        InviteKind::Operator => operator(config, options, engram, canister).await,
    }
}

/// Resolves after `after` simulated seconds, or never
fn deadline(options: &SimulationOptions, after: Option<u64>) -> impl Future<Output = ()> {
    let delay = after.map(|secs| options.delay(secs));
    async move {
        match delay {
            Some(delay) => sleep(delay).await,
            None => future::pending().await,
        }
    }
}

fn progress_step(ttl_secs: u64) -> u64 {
    (ttl_secs / 10).max(1)
}

async fn guardian(
    config: &EngramConfig,
    options: &SimulationOptions,
    engram: Arc<InMemoryEngram>,
    canister: CanisterId,
) -> anyhow::Result<SimulationReport> {
    let timing = options.timing(&config.invites);
    let invite = GuardianInvite::from_config(
        connected(engram.clone()),
        canister,
        config,
        Arc::new(MemoryClipboard::new()),
    )?
    .with_timing(timing);

    invite
        .create_invite("console-guardian", GuardianPermissions::all())
        .await;
    let state = invite.state();
    if let Some(error) = state.error {
        anyhow::bail!("guardian invite rejected: {error}");
    }
    let code = state.code.context("no guardian invite code issued")?;
    let share = invite.copy_invite_link()?.unwrap_or_default();
    println!("guardian invite {code} valid for {}", invite.countdown_text());
    println!("  {share}");

    let guardian = Principal::parse(SIM_GUARDIAN)?;
    let accept = deadline(options, options.accept_after);
    tokio::pin!(accept);
    let mut accept_pending = options.accept_after.is_some();

    let step = progress_step(timing.guardian_ttl_secs);
    let mut changes = invite.subscribe();
    let outcome = loop {
        tokio::select! {
            () = &mut accept, if accept_pending => {
                accept_pending = false;
                match engram.accept_guardian_invite(&code, guardian.clone()) {
                    Ok(()) => println!("  invite redeemed by {guardian}"),
                    Err(message) => tracing::warn!(%message, "simulated redemption failed"),
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break Outcome::Expired;
                }
                let state = changes.borrow_and_update().clone();
                if state.accepted {
                    break Outcome::Accepted;
                }
                if state.code.is_none() {
                    break Outcome::Expired;
                }
                if state.seconds_left % step == 0 {
                    println!("  {} left", state.countdown_text());
                }
            }
        }
    };

    Ok(SimulationReport {
        kind: InviteKind::Guardian,
        code,
        share,
        outcome,
        remaining: invite.countdown_text(),
    })
}

async fn operator(
    config: &EngramConfig,
    options: &SimulationOptions,
    engram: Arc<InMemoryEngram>,
    canister: CanisterId,
) -> anyhow::Result<SimulationReport> {
    let timing = options.timing(&config.invites);
    let invite = OperatorInvite::from_config(
        connected(engram),
        canister,
        config,
        Arc::new(MemoryClipboard::new()),
    )
    .with_timing(timing);

    invite.create_invite("console-operator").await;
    let state = invite.state();
    if let Some(error) = state.error {
        anyhow::bail!("operator invite rejected: {error}");
    }
    let code = state.code.context("no operator pairing code issued")?;
    let share = invite.copy_pair_command()?.unwrap_or_default();
    println!("operator pairing code {code} valid for {}", invite.countdown_text());
    println!("  {share}");

    let paired = deadline(options, options.accept_after);
    tokio::pin!(paired);

    let step = progress_step(timing.operator_ttl_secs);
    let mut changes = invite.subscribe();
    let outcome = loop {
        tokio::select! {
            () = &mut paired => {
                println!("  operator paired, dismissing code");
                invite.dismiss();
                break Outcome::Dismissed;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break Outcome::Expired;
                }
                let state = changes.borrow_and_update().clone();
                if state.code.is_none() {
                    break Outcome::Expired;
                }
                if state.seconds_left % step == 0 {
                    println!("  {} left", state.countdown_text());
                }
            }
        }
    };

    Ok(SimulationReport {
        kind: InviteKind::Operator,
        code,
        share,
        outcome,
        remaining: invite.countdown_text(),
    })
}
