// rust_core/src/lib.rs
// Decision core for a Splinterlands battle bot.
// Given an account's cards, the match rules and the daily quest, it picks a
// legal team and learns from the result. Browser automation stays outside:
// Python drives the page and calls in through the `python` bridge (feature
// "python"), and Rust callers use `session` with their own `GameClient`.
//
// Pipeline: collection -> quest -> composer -> scorer -> history.

pub mod account;
pub mod advisor;
pub mod catalog;
pub mod collection;
pub mod composer;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod quest;
pub mod scorer;
pub mod session;

#[cfg(feature = "python")]
mod python;

pub use account::{AccountDataSource, HttpAccountSource};
pub use advisor::BattleAdvisor;
pub use catalog::CardCatalog;
pub use collection::PlayerCards;
pub use composer::Composer;
pub use config::{Account, BotConfig, DataSettings, TeamPreferences};
pub use error::{CoreError, CoreResult};
pub use history::{HistoryStore, JsonlHistory, MemoryHistory};
pub use models::{
    BattleRecord, BattleRules, Card, CardId, CardType, CollectionEntry, Element, MatchReport,
    Outcome, Quest, QuestCategory, TeamComposition,
};
pub use scorer::{BattleStatistics, Insights, OutcomeScorer, PerformanceReport};
pub use session::{GameClient, RewardKind, SessionOutcome};
