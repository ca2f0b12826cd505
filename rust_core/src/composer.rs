// rust_core/src/composer.rs
// Team composer. Enumerates legal summoner + monster line-ups for one match.
// Like the rest of the core, this is pure: the card ids and the match rules go
// in, an ordered candidate list comes out. Nothing here touches the network.
//
// The monster picker is a greedy walk, not a knapsack solver. Its ordering
// (mana descending, preferred cards ahead on ties) decides which team we field,
// so keep it stable.

use std::collections::HashSet;

use log::{debug, info};

use crate::catalog::CardCatalog;
use crate::models::{BattleRules, CardId, Element, Quest, TeamComposition};
use crate::quest;

/// Summoners evaluated per match.
pub const MAX_SUMMONERS: usize = 10;
/// Monster slots on the battlefield.
pub const MAX_TEAM_SIZE: usize = 6;
/// Line-ups kept per summoner.
pub const MAX_LINEUPS_PER_SUMMONER: usize = 5;

pub struct Composer<'a> {
    catalog: &'a CardCatalog,
}

impl<'a> Composer<'a> {
    pub fn new(catalog: &'a CardCatalog) -> Self {
        Self { catalog }
    }

    /// The first candidate, or None when no legal team exists.
    /// None means "skip this match", not "try again".
    pub fn compose(
        &self,
        playable: &[CardId],
        preferred: &[CardId],
        rules: &BattleRules,
        quest: Option<&Quest>,
    ) -> Option<TeamComposition> {
        self.candidates(playable, preferred, rules, quest).into_iter().next()
    }

    /// Every candidate line-up, quest summoners first.
    pub fn candidates(
        &self,
        playable: &[CardId],
        preferred: &[CardId],
        rules: &BattleRules,
        quest: Option<&Quest>,
    ) -> Vec<TeamComposition> {
        let mut seen = HashSet::new();
        let playable: Vec<CardId> = playable.iter().copied().filter(|id| seen.insert(*id)).collect();

        // 1. Partition by card type
        let monsters: Vec<CardId> = playable
            .iter()
            .copied()
            .filter(|&id| self.catalog.is_monster(id))
            .collect();

        // 2. Summoners of a known, active element
        let mut summoners: Vec<(CardId, Element)> = playable
            .iter()
            .copied()
            .filter(|&id| self.catalog.is_summoner(id))
            .filter_map(|id| match self.catalog.element(id) {
                Some(element) if !rules.is_inactive(element) => Some((id, element)),
                Some(element) => {
                    debug!("Summoner {} dropped: {} is inactive", id, element);
                    None
                }
                None => None,
            })
            .collect();

        // 3. Quest element goes first; the sort is stable so input order survives
        if let Some(wanted) = quest::preferred_element(quest) {
            if summoners.iter().any(|(_, e)| *e == wanted) {
                summoners.sort_by_key(|(_, e)| *e != wanted);
            }
        }

        // 4. Bounded search
        summoners.truncate(MAX_SUMMONERS);

        let teams: Vec<TeamComposition> = summoners
            .into_iter()
            .flat_map(|(summoner, element)| {
                self.teams_for_summoner(summoner, element, &monsters, preferred, rules)
            })
            .collect();

        info!("Generated {} possible teams for {} mana", teams.len(), rules.mana_cap);
        teams
    }

    fn teams_for_summoner(
        &self,
        summoner: CardId,
        element: Element,
        monsters: &[CardId],
        preferred: &[CardId],
        rules: &BattleRules,
    ) -> Vec<TeamComposition> {
        // Unknown cost counts as free
        let summoner_mana = self.catalog.mana_cost(summoner).unwrap_or(0);
        let Some(budget) = rules.mana_cap.checked_sub(summoner_mana) else {
            return Vec::new();
        };

        // 5. Same element or neutral, and affordable on its own
        let pool: Vec<CardId> = monsters
            .iter()
            .copied()
            .filter(|&id| match self.catalog.element(id) {
                Some(e) => e == element || e == Element::Neutral,
                None => false,
            })
            .filter(|&id| self.catalog.mana_cost(id).is_some_and(|m| m <= budget))
            .collect();

        // 6. Nothing to field
        if pool.is_empty() {
            return Vec::new();
        }

        // 7. One greedy line-up per team size
        let ordered = self.monster_order(&pool, preferred);
        let lineups = (1..=MAX_TEAM_SIZE)
            .map(|size| self.greedy_lineup(&ordered, budget, size))
            .filter(|lineup| !lineup.is_empty())
            .take(MAX_LINEUPS_PER_SUMMONER);

        // 8. Final mana check
        lineups
            .filter_map(|lineup| {
                let total_mana = summoner_mana + self.catalog.team_mana(&lineup);
                (total_mana <= rules.mana_cap).then_some(TeamComposition {
                    summoner,
                    monsters: lineup,
                    total_mana,
                    element,
                })
            })
            .collect()
    }

    /// Preferred monsters ahead of the rest, then a stable sort by mana, highest first.
    fn monster_order(&self, pool: &[CardId], preferred: &[CardId]) -> Vec<CardId> {
        let (mut ordered, regular): (Vec<CardId>, Vec<CardId>) =
            pool.iter().copied().partition(|id| preferred.contains(id));
        ordered.extend(regular);
        ordered.sort_by_key(|&id| std::cmp::Reverse(self.catalog.mana_cost(id).unwrap_or(0)));
        ordered
    }

    fn greedy_lineup(&self, ordered: &[CardId], budget: u32, target_size: usize) -> Vec<CardId> {
        let mut lineup = Vec::with_capacity(target_size);
        let mut remaining = budget;

        for &monster in ordered {
            if lineup.len() >= target_size {
                break;
            }
            let mana = self.catalog.mana_cost(monster).unwrap_or(0);
            if mana <= remaining {
                lineup.push(monster);
                remaining -= mana;
            }
        }
        lineup
    }
}

// --- TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Card, CardStats, CardType};
    use crate::quest::new_quest;

    fn card(id: CardId, element: Element, card_type: CardType, mana: u32) -> Card {
        Card {
            id,
            name: format!("card-{}", id),
            element: Some(element),
            card_type,
            stats: CardStats {
                mana,
                ..CardStats::default()
            },
        }
    }

    fn summoner(id: CardId, element: Element, mana: u32) -> Card {
        card(id, element, CardType::Summoner, mana)
    }

    fn monster(id: CardId, element: Element, mana: u32) -> Card {
        card(id, element, CardType::Monster, mana)
    }

    #[test]
    fn fire_scenario_never_exceeds_cap() {
        // Scenario: 20 mana, Fire summoner (3), monsters 5 Fire, 4 Neutral, 12 Fire
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Fire, 3),
            monster(10, Element::Fire, 5),
            monster(11, Element::Neutral, 4),
            monster(12, Element::Fire, 12),
        ]);
        let composer = Composer::new(&catalog);
        let rules = BattleRules::new(20);

        let teams = composer.candidates(&[1, 10, 11, 12], &[], &rules, None);

        assert!(!teams.is_empty());
        for team in &teams {
            assert!(team.total_mana <= 20, "{:?}", team);
            assert!(!(team.monsters.contains(&12)
                && team.monsters.contains(&10)
                && team.monsters.contains(&11)));
        }
        // Greedy by mana: 12 first, then 5 fits (3 + 12 + 5 = 20), 4 no longer does.
        assert_eq!(teams[0].monsters, vec![12]);
        assert_eq!(teams[1].monsters, vec![12, 10]);
        assert_eq!(teams[1].total_mana, 20);
    }

    #[test]
    fn monsters_match_summoner_or_neutral() {
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Water, 2),
            summoner(2, Element::Death, 2),
            monster(10, Element::Water, 3),
            monster(11, Element::Neutral, 3),
            monster(12, Element::Fire, 3),
            monster(13, Element::Death, 3),
        ]);
        let composer = Composer::new(&catalog);
        let rules = BattleRules::new(30);

        for team in composer.candidates(&[1, 2, 10, 11, 12, 13], &[], &rules, None) {
            for id in &team.monsters {
                let e = catalog.element(*id).unwrap();
                assert!(e == team.element || e == Element::Neutral);
            }
            assert_eq!(catalog.element(team.summoner), Some(team.element));
        }
    }

    #[test]
    fn inactive_summoners_are_dropped() {
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Fire, 2),
            summoner(2, Element::Life, 2),
            monster(10, Element::Fire, 3),
            monster(11, Element::Life, 3),
        ]);
        let composer = Composer::new(&catalog);
        let rules = BattleRules::new(20).with_inactive([Element::Fire]);

        let teams = composer.candidates(&[1, 2, 10, 11], &[], &rules, None);

        assert!(!teams.is_empty());
        assert!(teams.iter().all(|t| t.element == Element::Life));
        assert!(teams.iter().all(|t| !rules.is_inactive(t.element)));
    }

    #[test]
    fn quest_summoners_are_tried_first() {
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Fire, 2),
            summoner(2, Element::Water, 2),
            monster(10, Element::Fire, 3),
            monster(11, Element::Water, 3),
        ]);
        let composer = Composer::new(&catalog);
        let rules = BattleRules::new(20);
        let quest = new_quest("pirate", 5, 0);

        let plain = composer.compose(&[1, 2, 10, 11], &[], &rules, None).unwrap();
        let biased = composer.compose(&[1, 2, 10, 11], &[], &rules, Some(&quest)).unwrap();

        assert_eq!(plain.summoner, 1);
        assert_eq!(biased.summoner, 2);
    }

    #[test]
    fn quest_without_matching_summoner_keeps_order() {
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Fire, 2),
            monster(10, Element::Fire, 3),
        ]);
        let composer = Composer::new(&catalog);
        let quest = new_quest("defend", 5, 0);

        let team = composer
            .compose(&[1, 10], &[], &BattleRules::new(20), Some(&quest))
            .unwrap();
        assert_eq!(team.summoner, 1);
    }

    #[test]
    fn preferred_monsters_win_mana_ties() {
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Earth, 0),
            monster(10, Element::Earth, 4),
            monster(11, Element::Earth, 4),
            monster(12, Element::Earth, 6),
        ]);
        let composer = Composer::new(&catalog);
        let playable = [1, 10, 11, 12];

        let plain = composer.candidates(&playable, &[], &BattleRules::new(4), None);
        let preferring = composer.candidates(&playable, &[11], &BattleRules::new(4), None);
        let outranked = composer.candidates(&playable, &[11], &BattleRules::new(6), None);

        assert_eq!(plain[0].monsters, vec![10]);
        assert_eq!(preferring[0].monsters, vec![11]);
        // Mana still leads: the 6-drop beats the preferred 4-drop.
        assert_eq!(outranked[0].monsters, vec![12]);
    }

    #[test]
    fn at_most_five_lineups_per_summoner_and_ten_summoners() {
        let mut cards = Vec::new();
        let mut playable = Vec::new();
        for s in 0..12 {
            cards.push(summoner(100 + s, Element::Death, 1));
            playable.push(100 + s);
        }
        for m in 0..8 {
            cards.push(monster(200 + m, Element::Death, 1));
            playable.push(200 + m);
        }
        let catalog = CardCatalog::new(cards);
        let composer = Composer::new(&catalog);

        let teams = composer.candidates(&playable, &[], &BattleRules::new(99), None);

        assert_eq!(teams.len(), MAX_SUMMONERS * MAX_LINEUPS_PER_SUMMONER);
        let sizes: Vec<usize> = teams[..5].iter().map(|t| t.monsters.len()).collect();
        assert_eq!(sizes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn nothing_playable_means_no_team() {
        let catalog = CardCatalog::new(vec![summoner(1, Element::Fire, 3)]);
        let composer = Composer::new(&catalog);

        assert_eq!(composer.compose(&[], &[], &BattleRules::new(20), None), None);
        // Summoner alone, no monsters in pool
        assert_eq!(composer.compose(&[1], &[], &BattleRules::new(20), None), None);
    }

    #[test]
    fn summoner_over_cap_is_skipped() {
        let catalog = CardCatalog::new(vec![
            summoner(1, Element::Fire, 9),
            summoner(2, Element::Fire, 2),
            monster(10, Element::Fire, 1),
        ]);
        let composer = Composer::new(&catalog);

        let teams = composer.candidates(&[1, 2, 10], &[], &BattleRules::new(5), None);
        assert!(teams.iter().all(|t| t.summoner == 2));
    }
}
