// rust_core/src/bin/advisor.rs
// Command-line front end for the decision core, for the cases where no
// browser is involved: pick a team for given rules, record a result by hand,
// print the running statistics. Output is JSON on stdout; logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use splinter_logic_core::{
    AccountDataSource, BattleAdvisor, BattleRules, CardCatalog, CardId, DataSettings, Element,
    HistoryStore, HttpAccountSource, JsonlHistory, MatchReport, Outcome, PerformanceReport,
    TeamComposition, TeamPreferences,
};

#[derive(Parser, Debug)]
#[command(version, about = "Team picker and battle log for Splinterlands", long_about = None)]
struct Cli {
    /// Directory holding the card catalog and battle history (default: $DATA_DIR or "data").
    #[arg(global = true, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the account's cards and quest, then pick a team.
    Pick {
        #[arg(long, env = "ACCOUNT")]
        account: String,

        #[arg(long)]
        mana_cap: u32,

        /// Ruleset name, repeatable.
        #[arg(long = "rule")]
        rules: Vec<String>,

        /// Element that may not be played, repeatable (color or name).
        #[arg(long = "inactive")]
        inactive: Vec<Element>,

        /// Skip the quest bias, whatever QUEST_PRIORITY says.
        #[arg(long, default_value_t = false)]
        ignore_quest: bool,

        /// Try rented cards first among equal-mana monsters, whatever
        /// DELEGATED_CARDS_PRIORITY says.
        #[arg(long, default_value_t = false)]
        prefer_rented: bool,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Append a finished match to the history.
    Record {
        #[arg(long)]
        summoner: CardId,

        #[arg(long, value_delimiter = ',')]
        monsters: Vec<CardId>,

        #[arg(long)]
        mana_cap: u32,

        #[arg(long = "rule")]
        rules: Vec<String>,

        #[arg(long, value_enum)]
        outcome: OutcomeArg,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        rating_delta: i32,
    },

    /// Print totals over the whole history.
    Stats {
        /// Also write a timestamped performance report into this directory.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutcomeArg {
    Win,
    Loss,
    Draw,
}

impl From<OutcomeArg> for Outcome {
    fn from(value: OutcomeArg) -> Self {
        match value {
            OutcomeArg::Win => Outcome::Win,
            OutcomeArg::Loss => Outcome::Loss,
            OutcomeArg::Draw => Outcome::Draw,
        }
    }
}

fn open_advisor(settings: &DataSettings, seed: Option<u64>) -> Result<BattleAdvisor<JsonlHistory>> {
    let catalog = CardCatalog::load_or_empty(&settings.catalog_path());
    let history = JsonlHistory::open(settings.history_path()).context("opening battle history")?;
    Ok(match seed {
        Some(seed) => BattleAdvisor::with_seed(catalog, history, seed),
        None => BattleAdvisor::new(catalog, history),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `performance_report_<YYYYmmdd_HHMMSS>.json` into `dir`.
fn write_report(report: &PerformanceReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let file = dir.join(format!(
        "performance_report_{}.json",
        report.generated_at.format("%Y%m%d_%H%M%S")
    ));
    fs::write(&file, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing {}", file.display()))?;
    Ok(file)
}

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env is optional.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = DataSettings::from_env().with_data_dir(cli.data_dir);

    match cli.command {
        Command::Pick {
            account,
            mana_cap,
            rules,
            inactive,
            ignore_quest,
            prefer_rented,
            seed,
        } => {
            let mut prefs = TeamPreferences::from_env().context("reading team preferences")?;
            if ignore_quest {
                prefs.quest_priority = false;
            }
            if prefer_rented {
                prefs.delegated_cards_priority = true;
            }

            let mut advisor = open_advisor(&settings, seed)?;
            if advisor.catalog().is_empty() {
                bail!(
                    "no card catalog in {}; run the ingest binary first",
                    settings.data_dir.display()
                );
            }

            let source = HttpAccountSource::new(settings.endpoints())?;
            info!("Fetching account data for {} from {}", account, source.endpoints().join(", "));
            let cards = source.fetch_cards(&account).await;
            let quest = if prefs.quest_priority {
                source.fetch_quest(&account).await
            } else {
                None
            };

            let rules = BattleRules::new(mana_cap).with_rules(rules).with_inactive(inactive);

            match advisor.find_optimal_team(&cards, &rules, quest.as_ref(), &prefs) {
                Some(team) => print_json(&team)?,
                None => bail!("no legal team for mana cap {}", mana_cap),
            }
        }

        Command::Record {
            summoner,
            monsters,
            mana_cap,
            rules,
            outcome,
            rating_delta,
        } => {
            let mut advisor = open_advisor(&settings, None)?;

            let mut lineup = vec![summoner];
            lineup.extend_from_slice(&monsters);
            let element = advisor
                .catalog()
                .team_element(&lineup)
                .with_context(|| format!("summoner {} is not in the card catalog", summoner))?;

            let team = TeamComposition {
                summoner,
                total_mana: advisor.catalog().team_mana(&lineup),
                monsters,
                element,
            };
            let report = MatchReport {
                outcome: outcome.into(),
                rating_delta,
                opponent: None,
            };

            let insights = advisor.record_outcome(team, &BattleRules::new(mana_cap).with_rules(rules), report)?;
            info!(
                "Recorded battle #{} in {}",
                insights.record_id,
                advisor.scorer().store().path().display()
            );
            print_json(&insights)?;
        }

        Command::Stats { report } => {
            let advisor = open_advisor(&settings, None)?;
            info!(
                "{} battles on record in {}",
                advisor.scorer().store().len(),
                advisor.scorer().store().path().display()
            );
            print_json(&advisor.statistics())?;

            if let Some(dir) = report {
                let file = write_report(&advisor.performance_report(), &dir)?;
                info!("Performance report written to {}", file.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use splinter_logic_core::MemoryHistory;

    #[test]
    fn report_file_is_named_by_its_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = BattleAdvisor::with_seed(CardCatalog::default(), MemoryHistory::new(), 1);
        let report = advisor.performance_report();

        let file = write_report(&report, &dir.path().join("reports")).unwrap();

        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            name,
            format!("performance_report_{}.json", report.generated_at.format("%Y%m%d_%H%M%S"))
        );
        let written: PerformanceReport = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written, report);
    }
}
