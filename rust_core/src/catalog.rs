// rust_core/src/catalog.rs
// Read-only card lookup. Everything the composer knows about a card (type,
// element, mana) comes through here, keyed by the numeric card id.
// A miss is a normal answer (None), never an error.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::models::{Card, CardId, CardType, Element};

#[derive(Debug, Default, Clone)]
pub struct CardCatalog {
    cards: HashMap<CardId, Card>,
}

impl CardCatalog {
    pub fn new<I: IntoIterator<Item = Card>>(cards: I) -> Self {
        Self {
            cards: cards.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Loads a card-details file. Three layouts are understood:
    /// a JSON array of cards, a JSON object keyed by id, or JSON lines
    /// (what the `ingest` binary writes).
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let catalog = Self::from_json_str(&raw)?;
        info!("Loaded {} cards from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Same as `load`, but a missing or broken file yields an empty catalog.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Card details unavailable ({}), starting with an empty catalog", e);
                Self::default()
            }
        }
    }

    pub fn from_json_str(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim_start();

        // JSON lines: one card object per line
        if trimmed.starts_with('{') && trimmed.lines().nth(1).is_some() {
            if let Ok(cards) = trimmed
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(serde_json::from_str::<Card>)
                .collect::<Result<Vec<_>, _>>()
            {
                return Ok(Self::new(cards));
            }
        }

        let cards = match serde_json::from_str::<Value>(raw)? {
            // A lone card (one-line JSON lines file)
            Value::Object(map) if map.contains_key("id") => {
                vec![serde_json::from_value::<Card>(Value::Object(map))?]
            }
            Value::Object(map) => map
                .into_iter()
                .map(|(_, v)| serde_json::from_value::<Card>(v))
                .collect::<Result<Vec<_>, _>>()?,
            other => serde_json::from_value::<Vec<Card>>(other)?,
        };
        Ok(Self::new(cards))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn card_type(&self, id: CardId) -> Option<CardType> {
        self.get(id).map(|c| c.card_type)
    }

    pub fn element(&self, id: CardId) -> Option<Element> {
        self.get(id).and_then(|c| c.element)
    }

    pub fn mana_cost(&self, id: CardId) -> Option<u32> {
        self.get(id).map(|c| c.stats.mana)
    }

    pub fn is_summoner(&self, id: CardId) -> bool {
        self.card_type(id) == Some(CardType::Summoner)
    }

    pub fn is_monster(&self, id: CardId) -> bool {
        self.card_type(id) == Some(CardType::Monster)
    }

    /// Total mana of a line-up; unknown cards count as zero.
    pub fn team_mana(&self, ids: &[CardId]) -> u32 {
        ids.iter().filter_map(|&id| self.mana_cost(id)).sum()
    }

    /// Element of a summoner-first line-up. Falls back to the first faction
    /// card among the monsters when the summoner is unknown.
    pub fn team_element(&self, ids: &[CardId]) -> Option<Element> {
        let (summoner, monsters) = ids.split_first()?;
        self.element(*summoner).or_else(|| {
            monsters
                .iter()
                .filter_map(|&id| self.element(id))
                .find(|e| !matches!(e, Element::Neutral | Element::Dragon))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardStats;

    fn card(id: CardId, color: Element, card_type: CardType, mana: u32) -> Card {
        Card {
            id,
            name: format!("card-{}", id),
            element: Some(color),
            card_type,
            stats: CardStats {
                mana,
                ..CardStats::default()
            },
        }
    }

    #[test]
    fn lookups_and_misses() {
        let catalog = CardCatalog::new(vec![
            card(1, Element::Fire, CardType::Summoner, 3),
            card(2, Element::Neutral, CardType::Monster, 4),
        ]);

        assert!(catalog.is_summoner(1));
        assert!(catalog.is_monster(2));
        assert_eq!(catalog.mana_cost(2), Some(4));
        assert_eq!(catalog.get(99), None);
        assert!(!catalog.is_summoner(99));
        assert_eq!(catalog.team_mana(&[1, 2, 99]), 7);
    }

    #[test]
    fn team_element_prefers_summoner() {
        let catalog = CardCatalog::new(vec![
            card(1, Element::Life, CardType::Summoner, 3),
            card(2, Element::Neutral, CardType::Monster, 4),
            card(3, Element::Water, CardType::Monster, 4),
        ]);

        assert_eq!(catalog.team_element(&[1, 2, 3]), Some(Element::Life));
        assert_eq!(catalog.team_element(&[77, 2, 3]), Some(Element::Water));
        assert_eq!(catalog.team_element(&[]), None);
    }

    #[test]
    fn parses_array_map_and_lines() {
        let array = r#"[{"id": 5, "color": "Blue", "type": "Monster", "stats": {"mana": [2, 2]}}]"#;
        let map = r#"{"5": {"id": 5, "color": "Blue", "type": "Monster", "stats": {"mana": 2}}}"#;
        let lines = "{\"id\": 5, \"color\": \"Blue\", \"type\": \"Monster\"}\n{\"id\": 6, \"color\": \"Gray\", \"type\": \"Monster\"}\n";

        assert_eq!(CardCatalog::from_json_str(array).unwrap().mana_cost(5), Some(2));
        assert_eq!(CardCatalog::from_json_str(map).unwrap().mana_cost(5), Some(2));

        let from_lines = CardCatalog::from_json_str(lines).unwrap();
        assert_eq!(from_lines.len(), 2);
        assert_eq!(from_lines.element(6), Some(Element::Neutral));
    }

    #[test]
    fn missing_file_gives_empty_catalog() {
        let catalog = CardCatalog::load_or_empty(Path::new("/definitely/not/here.json"));
        assert!(catalog.is_empty());
    }
}
