// rust_core/src/scorer.rs
// Outcome scorer: picks one team out of the composer's candidates using past
// results, and folds every finished match back into the history.
//
// Selection is a single greedy pass. With history it is fully deterministic;
// with no history at all it picks uniformly at random from an injected RNG.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::history::HistoryStore;
use crate::models::{BattleRecord, BattleRules, CardId, Outcome, TeamComposition};

/// Window for the headline win rate.
pub const ROLLING_WINDOW: usize = 100;
/// Window for the "we are losing lately" suggestion.
pub const TREND_WINDOW: usize = 20;

const BASE_SCORE: f64 = 1.0;
const MANA_WEIGHT: f64 = 0.5;
const SIZE_WEIGHT: f64 = 0.1;
const HISTORY_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPerformance {
    pub usage_count: usize,
    pub win_rate: f64,
    pub total_rating_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEffectiveness {
    pub battles_count: usize,
    pub win_rate: f64,
    pub rules: Vec<String>,
}

/// What `record` learned from the match just played. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub record_id: u64,
    pub win_rate: f64,
    pub total_battles_analyzed: usize,
    pub team_performance: TeamPerformance,
    pub rule_effectiveness: RuleEffectiveness,
    pub suggested_improvements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStatistics {
    pub total_battles: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    pub win_rate: f64,
    pub total_rating_change: i64,
}

/// Snapshot of how the bot is doing, written out by `advisor stats --report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub battle_statistics: BattleStatistics,
    pub recent_win_rate: f64,
    pub recent_battles: usize,
    pub recommendations: Vec<String>,
}

fn win_rate<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a BattleRecord>,
{
    let (wins, total) = records
        .into_iter()
        .fold((0usize, 0usize), |(w, t), r| (w + r.is_win() as usize, t + 1));
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64
    }
}

pub struct OutcomeScorer<S: HistoryStore> {
    store: S,
}

impl<S: HistoryStore> OutcomeScorer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Past battles at the same mana cap, fought with the same element.
    pub fn similar_battles(&self, team: &TeamComposition, rules: &BattleRules) -> Vec<&BattleRecord> {
        self.store.filter(&|r: &BattleRecord| {
            r.mana_cap == rules.mana_cap && r.team.element == team.element
        })
    }

    pub fn score(&self, team: &TeamComposition, rules: &BattleRules) -> f64 {
        let cap = rules.mana_cap.max(1) as f64;
        let mana_efficiency = team.total_mana as f64 / cap;
        let history = win_rate(self.similar_battles(team, rules));

        BASE_SCORE
            + MANA_WEIGHT * mana_efficiency
            + SIZE_WEIGHT * team.monsters.len() as f64
            + HISTORY_WEIGHT * history
    }

    /// Highest score wins; the earliest candidate wins a tie.
    pub fn select<R: Rng + ?Sized>(
        &self,
        candidates: &[TeamComposition],
        rules: &BattleRules,
        rng: &mut R,
    ) -> Option<TeamComposition> {
        if candidates.is_empty() {
            return None;
        }

        // Cold start: no data, no bias.
        if self.store.is_empty() {
            return Some(candidates[rng.random_range(0..candidates.len())].clone());
        }

        let mut best: Option<(&TeamComposition, f64)> = None;
        for team in candidates {
            let score = self.score(team, rules);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((team, score)),
            }
        }
        best.map(|(team, _)| team.clone())
    }

    /// Appends the finished match to history and reports how we are doing.
    pub fn record(&mut self, record: BattleRecord) -> CoreResult<Insights> {
        let stored = self.store.append(record)?;

        let recent = self.store.recent(ROLLING_WINDOW);
        let insights = Insights {
            record_id: stored.id,
            win_rate: win_rate(recent),
            total_battles_analyzed: recent.len(),
            team_performance: self.team_performance(&stored.team.to_list()),
            rule_effectiveness: self.rule_effectiveness(&stored.rules),
            suggested_improvements: self.suggestions(&stored),
        };

        info!(
            "Battle #{} recorded: {:?}, win rate {:.1}% over {} battles",
            stored.id,
            stored.outcome,
            insights.win_rate * 100.0,
            insights.total_battles_analyzed
        );
        for suggestion in &insights.suggested_improvements {
            info!("  - {}", suggestion);
        }
        Ok(insights)
    }

    pub fn statistics(&self) -> BattleStatistics {
        let all = self.store.all();
        let count = |o: Outcome| all.iter().filter(|r| r.outcome == o).count();

        BattleStatistics {
            total_battles: all.len(),
            wins: count(Outcome::Win),
            losses: count(Outcome::Loss),
            draws: count(Outcome::Draw),
            win_rate: win_rate(all),
            total_rating_change: all.iter().map(|r| r.rating_delta as i64).sum(),
        }
    }

    /// Totals plus the rolling window and the suggestions for the latest battle.
    pub fn performance_report(&self) -> PerformanceReport {
        let recent = self.store.recent(ROLLING_WINDOW);
        PerformanceReport {
            generated_at: Utc::now(),
            battle_statistics: self.statistics(),
            recent_win_rate: win_rate(recent),
            recent_battles: recent.len(),
            recommendations: self
                .store
                .all()
                .last()
                .map(|latest| self.suggestions(latest))
                .unwrap_or_default(),
        }
    }

    /// Summoner-first line-up, compared position by position.
    pub fn team_performance(&self, lineup: &[CardId]) -> TeamPerformance {
        let battles = self.store.filter(&|r: &BattleRecord| r.team.to_list() == lineup);

        TeamPerformance {
            usage_count: battles.len(),
            win_rate: win_rate(battles.iter().copied()),
            total_rating_change: battles.iter().map(|r| r.rating_delta as i64).sum(),
        }
    }

    /// Battles fought under exactly this set of rules (order ignored).
    pub fn rule_effectiveness(&self, rules: &[String]) -> RuleEffectiveness {
        let wanted: BTreeSet<&str> = rules.iter().map(String::as_str).collect();
        let battles = self.store.filter(&|r: &BattleRecord| r.rule_set() == wanted);

        RuleEffectiveness {
            battles_count: battles.len(),
            win_rate: win_rate(battles),
            rules: rules.to_vec(),
        }
    }

    fn suggestions(&self, latest: &BattleRecord) -> Vec<String> {
        let mut improvements = Vec::new();

        let trend = self.store.recent(TREND_WINDOW);
        if win_rate(trend) < 0.4 {
            improvements.push(format!(
                "Consider adjusting team selection strategy - win rate is below 40% over the last {} battles",
                trend.len()
            ));
        }

        if latest.outcome == Outcome::Loss {
            improvements.push("Analyze opponent's team composition for future reference".to_string());
            improvements.push("Consider alternative strategies for these battle rules".to_string());
        }

        let same_cap = self.store.filter(&|r: &BattleRecord| r.mana_cap == latest.mana_cap);
        if same_cap.len() > 5 {
            let rate = win_rate(same_cap);
            if rate < 0.3 {
                improvements.push(format!(
                    "Low win rate ({:.1}%) for {} mana battles",
                    rate * 100.0,
                    latest.mana_cap
                ));
            }
        }

        improvements
    }
}
