// rust_core/src/session.rs
// Session driver. One account's session is a strict pipeline:
// login -> cards -> quest -> ECR gate -> rewards -> quest skip -> match -> record.
// Accounts run one after another, never in parallel.
//
// The game client (browser automation) is only ever seen through the
// `GameClient` trait; page structure never leaks in here.

use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::account::AccountDataSource;
use crate::advisor::BattleAdvisor;
use crate::config::{Account, BotConfig};
use crate::error::{CoreError, CoreResult};
use crate::history::HistoryStore;
use crate::models::{BattleRules, MatchReport, TeamComposition};
use crate::quest;
use crate::scorer::Insights;

/// ECR regained per hour of rest.
pub const ECR_RECOVERY_PER_HOUR: f64 = 1.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    Season,
    DailyQuest,
}

#[async_trait]
pub trait GameClient: Send {
    async fn login(&mut self) -> CoreResult<()>;

    /// None when the page doesn't show a readable value.
    async fn read_energy_capture_rate(&mut self) -> CoreResult<Option<f64>>;

    async fn navigate_to_match(&mut self) -> CoreResult<()>;

    async fn find_opponent(&mut self) -> CoreResult<bool>;

    async fn read_match_constraints(&mut self) -> CoreResult<BattleRules>;

    async fn submit_team(&mut self, team: &TeamComposition) -> CoreResult<MatchReport>;

    async fn claim_rewards(&mut self, kind: RewardKind) -> CoreResult<()>;

    async fn skip_quest(&mut self) -> CoreResult<()>;
}

/// How a single account's session ended. Only `Played` touches history.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Played {
        team: TeamComposition,
        report: MatchReport,
        insights: Insights,
    },
    EcrTooLow {
        ecr: f64,
        recovery_hours: f64,
    },
    NoOpponent,
    NoLegalTeam,
}

/// Hours of rest until `current` ECR reaches `target`.
pub fn ecr_recovery_hours(current: f64, target: f64) -> f64 {
    ((target - current) / ECR_RECOVERY_PER_HOUR).max(0.0)
}

pub async fn run_session<S, A, C>(
    config: &BotConfig,
    account: &Account,
    source: &A,
    advisor: &mut BattleAdvisor<S>,
    client: &mut C,
) -> CoreResult<SessionOutcome>
where
    S: HistoryStore,
    A: AccountDataSource + ?Sized,
    C: GameClient + ?Sized,
{
    client.login().await?;
    info!("Logged in as {}", account.name);

    let cards = source.fetch_cards(&account.name).await;
    let mut current_quest = source.fetch_quest(&account.name).await;

    // 1. Energy gate
    match client.read_energy_capture_rate().await? {
        Some(ecr) => {
            info!("Current Energy Capture Rate is {:.0}%", ecr);
            if let Some(limit) = config.ecr_stop_limit {
                if ecr < limit {
                    let recovery_hours = ecr_recovery_hours(ecr, config.ecr_recover_to);
                    info!(
                        "ECR is below {}%. About {:.1} hours to recover to {}%",
                        limit, recovery_hours, config.ecr_recover_to
                    );
                    return Ok(SessionOutcome::EcrTooLow { ecr, recovery_hours });
                }
            }
        }
        None => warn!("Could not read ECR, continuing"),
    }

    // 2. Rewards (best effort)
    if config.claim_season_reward {
        if let Err(e) = client.claim_rewards(RewardKind::Season).await {
            error!("Error claiming season rewards: {}", e);
        }
    }
    if config.claim_daily_quest_reward {
        if let Err(e) = client.claim_rewards(RewardKind::DailyQuest).await {
            error!("Error claiming daily quest rewards: {}", e);
        }
    }

    // 3. Unwanted quest
    if quest::should_skip(current_quest.as_ref(), &config.team.skip_quest) {
        match client.skip_quest().await {
            Ok(()) => current_quest = source.fetch_quest(&account.name).await,
            Err(e) => error!("Error skipping quest: {}", e),
        }
    }

    // 4. Match
    client.navigate_to_match().await?;
    if !client.find_opponent().await? {
        warn!("No opponent found for {}, skipping", account.name);
        return Ok(SessionOutcome::NoOpponent);
    }
    let rules = client.read_match_constraints().await?;
    info!("Mana cap {}, rules {:?}, inactive {:?}", rules.mana_cap, rules.rules, rules.inactive_elements);

    let Some(team) = advisor.find_optimal_team(&cards, &rules, current_quest.as_ref(), &config.team) else {
        warn!("No legal team for {} at mana cap {}, skipping match", account.name, rules.mana_cap);
        return Ok(SessionOutcome::NoLegalTeam);
    };

    // 5. Submit and learn
    let report = client.submit_team(&team).await?;
    // One short synchronous append + fsync, run inline on this task. Nothing
    // is awaited while it runs, so a cancel can never cut a record in half.
    let insights = advisor.record_outcome(team.clone(), &rules, report.clone())?;

    Ok(SessionOutcome::Played { team, report, insights })
}

/// Runs one session unless `cancel` fires first. None means cancelled; the
/// session future is dropped at its current await point.
async fn session_or_cancel<S, A, C>(
    config: &BotConfig,
    account: &Account,
    source: &A,
    advisor: &mut BattleAdvisor<S>,
    client: &mut C,
    cancel: &CancellationToken,
) -> Option<CoreResult<SessionOutcome>>
where
    S: HistoryStore,
    A: AccountDataSource + ?Sized,
    C: GameClient + ?Sized,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Cancelled during the session for {}", account.name);
            None
        }
        result = run_session(config, account, source, advisor, client) => Some(result),
    }
}

/// Runs every configured account.
///
/// Single-account mode runs one session and returns its error, if any.
/// Multi-account mode loops forever: each account's failure is logged and the
/// next account proceeds. `cancel` stops either mode at once, mid-session or
/// during the pause between passes.
pub async fn run_accounts<S, A, C, F>(
    config: &BotConfig,
    source: &A,
    advisor: &mut BattleAdvisor<S>,
    mut make_client: F,
    cancel: CancellationToken,
) -> CoreResult<()>
where
    S: HistoryStore,
    A: AccountDataSource + ?Sized,
    C: GameClient,
    F: FnMut(&Account) -> CoreResult<C>,
{
    if !config.multi_account {
        let account = config
            .accounts
            .first()
            .ok_or_else(|| CoreError::Config("no account configured".into()))?;
        let mut client = make_client(account)?;
        if let Some(result) = session_or_cancel(config, account, source, advisor, &mut client, &cancel).await {
            info!("Session for {} finished: {}", account.name, describe(&result?));
        }
        return Ok(());
    }

    let pause = Duration::from_secs(config.minutes_battles_interval * 60);
    let mut pass = 1u64;

    loop {
        info!("Running bot iteration [{}] over {} accounts", pass, config.accounts.len());

        for (i, account) in config.accounts.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Cancelled before account {}", account.name);
                return Ok(());
            }
            info!("Running account {}/{}: {}", i + 1, config.accounts.len(), account.name);

            let result = match make_client(account) {
                Ok(mut client) => {
                    match session_or_cancel(config, account, source, advisor, &mut client, &cancel).await {
                        Some(result) => result,
                        None => return Ok(()),
                    }
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => info!("Finished {}: {}", account.name, describe(&outcome)),
                Err(e) => error!("Error running account {}: {}", account.name, e),
            }
        }

        info!("Waiting {} minutes for the next pass", config.minutes_battles_interval);
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Cancelled, stopping after pass {}", pass);
                return Ok(());
            }
            _ = tokio::time::sleep(pause) => {}
        }
        pass += 1;
    }
}

fn describe(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Played { report, insights, .. } => format!(
            "{:?} ({:+} rating), win rate {:.1}%",
            report.outcome,
            report.rating_delta,
            insights.win_rate * 100.0
        ),
        SessionOutcome::EcrTooLow { ecr, recovery_hours } => {
            format!("ECR {:.1}% too low, {:.1}h to recover", ecr, recovery_hours)
        }
        SessionOutcome::NoOpponent => "no opponent".to_string(),
        SessionOutcome::NoLegalTeam => "no legal team".to_string(),
    }
}
