// rust_core/src/advisor.rs
// The battle advisor: catalog + composer + scorer behind one handle.
// This is what the session driver and the Python bridge talk to.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::catalog::CardCatalog;
use crate::collection::PlayerCards;
use crate::composer::Composer;
use crate::config::TeamPreferences;
use crate::error::CoreResult;
use crate::history::HistoryStore;
use crate::models::{BattleRecord, BattleRules, MatchReport, Quest, TeamComposition};
use crate::scorer::{BattleStatistics, Insights, OutcomeScorer, PerformanceReport};

pub struct BattleAdvisor<S: HistoryStore> {
    catalog: CardCatalog,
    scorer: OutcomeScorer<S>,
    rng: StdRng,
}

impl<S: HistoryStore> BattleAdvisor<S> {
    pub fn new(catalog: CardCatalog, store: S) -> Self {
        Self {
            catalog,
            scorer: OutcomeScorer::new(store),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Fixed seed, reproducible cold-start picks.
    pub fn with_seed(catalog: CardCatalog, store: S, seed: u64) -> Self {
        Self {
            catalog,
            scorer: OutcomeScorer::new(store),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn scorer(&self) -> &OutcomeScorer<S> {
        &self.scorer
    }

    /// Composes every legal candidate and lets the scorer pick one.
    /// The quest only biases summoner order when `prefs` allow it.
    /// None means no legal team exists for this match.
    pub fn find_optimal_team(
        &mut self,
        cards: &PlayerCards,
        rules: &BattleRules,
        quest: Option<&Quest>,
        prefs: &TeamPreferences,
    ) -> Option<TeamComposition> {
        if self.catalog.is_empty() {
            warn!("Card catalog is empty; no team can be composed");
            return None;
        }

        let candidates = Composer::new(&self.catalog).candidates(
            &cards.playable,
            prefs.preferred(&cards.rented),
            rules,
            prefs.quest_bias(quest),
        );
        let chosen = self.scorer.select(&candidates, rules, &mut self.rng)?;

        info!(
            "Selected {} team: summoner {} + {:?} ({}/{} mana) out of {} candidates",
            chosen.element,
            chosen.summoner,
            chosen.monsters,
            chosen.total_mana,
            rules.mana_cap,
            candidates.len()
        );
        Some(chosen)
    }

    pub fn record_outcome(
        &mut self,
        team: TeamComposition,
        rules: &BattleRules,
        report: MatchReport,
    ) -> CoreResult<Insights> {
        self.scorer.record(BattleRecord::new(team, rules, report))
    }

    pub fn statistics(&self) -> BattleStatistics {
        self.scorer.statistics()
    }

    pub fn performance_report(&self) -> PerformanceReport {
        self.scorer.performance_report()
    }
}
