// rust_core/src/models.rs
// Typed entities for the battle advisor.
// The game API and the page reader hand us loosely shaped JSON. We turn it into
// enums and plain structs here, at the edge, so the composer and the scorer
// never deal with a missing key or a stray string. An unknown color can't
// sneak into team building: it either maps to an Element or it is dropped.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type CardId = u32;

// --- ENUMS ---

/// Game faction ("splinter"). Dragon is cross-faction, Neutral is colorless.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[serde(try_from = "String", into = "String")]
pub enum Element {
    Fire,
    Water,
    Earth,
    Life,
    Death,
    Dragon,
    Neutral,
}

impl Element {
    pub const ALL: [Element; 7] = [
        Element::Fire,
        Element::Water,
        Element::Earth,
        Element::Life,
        Element::Death,
        Element::Dragon,
        Element::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Fire => "Fire",
            Element::Water => "Water",
            Element::Earth => "Earth",
            Element::Life => "Life",
            Element::Death => "Death",
            Element::Dragon => "Dragon",
            Element::Neutral => "Neutral",
        }
    }

    /// Card color as printed in the card feed.
    pub fn color(&self) -> &'static str {
        match self {
            Element::Fire => "Red",
            Element::Water => "Blue",
            Element::Earth => "Green",
            Element::Life => "White",
            Element::Death => "Black",
            Element::Dragon => "Gold",
            Element::Neutral => "Gray",
        }
    }

    /// Accepts either the feed color ("Red") or the element name ("fire").
    pub fn from_color(raw: &str) -> Option<Element> {
        let raw = raw.trim();
        Element::ALL.into_iter().find(|e| {
            e.color().eq_ignore_ascii_case(raw) || e.as_str().eq_ignore_ascii_case(raw)
        })
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::from_color(s).ok_or_else(|| format!("unknown element '{}'", s))
    }
}

impl TryFrom<String> for Element {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Element> for String {
    fn from(value: Element) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum CardType {
    Summoner,
    Monster,
    #[default]
    #[serde(other)]
    Unknown, // Safety fallback
}

/// What a displayed quest name asks for. Only the first six bias element choice.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    Fire,
    Water,
    Earth,
    Life,
    Death,
    Dragon,
    Snipe,
    Sneak,
    Neutral,
    Unknown,
}

impl QuestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestCategory::Fire => "fire",
            QuestCategory::Water => "water",
            QuestCategory::Earth => "earth",
            QuestCategory::Life => "life",
            QuestCategory::Death => "death",
            QuestCategory::Dragon => "dragon",
            QuestCategory::Snipe => "snipe",
            QuestCategory::Sneak => "sneak",
            QuestCategory::Neutral => "neutral",
            QuestCategory::Unknown => "unknown",
        }
    }

    /// The game element a summoner must have to progress this quest.
    pub fn element(&self) -> Option<Element> {
        match self {
            QuestCategory::Fire => Some(Element::Fire),
            QuestCategory::Water => Some(Element::Water),
            QuestCategory::Earth => Some(Element::Earth),
            QuestCategory::Life => Some(Element::Life),
            QuestCategory::Death => Some(Element::Death),
            QuestCategory::Dragon => Some(Element::Dragon),
            _ => None,
        }
    }

    /// Snipe, sneak and neutral quests are about tactics, not factions.
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            QuestCategory::Snipe | QuestCategory::Sneak | QuestCategory::Neutral
        )
    }
}

impl fmt::Display for QuestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

// --- CARDS ---

/// Combat stats. The card feed ships most stats per level; we keep level one.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CardStats {
    #[serde(default, deserialize_with = "first_level")]
    pub mana: u32,
    #[serde(default, deserialize_with = "first_level")]
    pub attack: i32,
    #[serde(default, deserialize_with = "first_level")]
    pub health: i32,
    #[serde(default, deserialize_with = "first_level")]
    pub speed: i32,
    #[serde(default, deserialize_with = "first_level")]
    pub armor: i32,
    #[serde(default, deserialize_with = "first_level")]
    pub abilities: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,

    #[serde(default)]
    pub name: String,

    // None when the feed uses a color we don't know; such a card never joins a team.
    #[serde(rename = "color", alias = "element", default, deserialize_with = "element_from_color")]
    pub element: Option<Element>,

    #[serde(rename = "type", default)]
    pub card_type: CardType,

    #[serde(default)]
    pub stats: CardStats,
}

// --- COLLECTION ---

/// One owned, delegated or rented card as reported by the account API.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CollectionEntry {
    #[serde(rename = "card_detail_id")]
    pub card_id: CardId,

    // Owning player
    #[serde(default, deserialize_with = "blank_as_none")]
    pub player: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub delegated_to: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub market_listing_status: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub unlock_date: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub last_used_player: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_used_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub edition: Option<u32>,
}

// --- QUEST ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Quest {
    pub name: String,
    pub category: QuestCategory,
    pub required: u32,
    pub completed: u32,
}

impl Quest {
    pub fn progress_percentage(&self) -> f64 {
        if self.required == 0 {
            return 0.0;
        }
        self.completed as f64 / self.required as f64 * 100.0
    }

    pub fn is_completed(&self) -> bool {
        self.completed >= self.required
    }
}

// --- MATCH ---

/// Constraints read off the match screen. Fixed for the duration of one match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BattleRules {
    // Always >= 1 when read from the game.
    pub mana_cap: u32,

    #[serde(default)]
    pub rules: Vec<String>,

    #[serde(default, alias = "inactive_splinters")]
    pub inactive_elements: BTreeSet<Element>,
}

impl BattleRules {
    pub fn new(mana_cap: u32) -> Self {
        Self {
            mana_cap,
            rules: Vec::new(),
            inactive_elements: BTreeSet::new(),
        }
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_inactive<I: IntoIterator<Item = Element>>(mut self, elements: I) -> Self {
        self.inactive_elements = elements.into_iter().collect();
        self
    }

    pub fn has_rule(&self, rule_name: &str) -> bool {
        self.rules.iter().any(|r| r.eq_ignore_ascii_case(rule_name))
    }

    pub fn is_inactive(&self, element: Element) -> bool {
        self.inactive_elements.contains(&element)
    }
}

/// A summoner plus its ordered monster line-up.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TeamComposition {
    pub summoner: CardId,
    pub monsters: Vec<CardId>,
    pub total_mana: u32,
    pub element: Element,
}

impl TeamComposition {
    /// Summoner first, then monsters in position order (the submission format).
    pub fn to_list(&self) -> Vec<CardId> {
        let mut ids = Vec::with_capacity(self.monsters.len() + 1);
        ids.push(self.summoner);
        ids.extend_from_slice(&self.monsters);
        ids
    }
}

/// What the game client reports once a submitted match resolves.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MatchReport {
    pub outcome: Outcome,
    #[serde(default)]
    pub rating_delta: i32,
    #[serde(default)]
    pub opponent: Option<Vec<CardId>>,
}

/// One line of battle history. Never edited once written.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BattleRecord {
    // Assigned by the history store on append.
    #[serde(default)]
    pub id: u64,
    pub team: TeamComposition,
    #[serde(default)]
    pub opponent: Option<Vec<CardId>>,
    pub mana_cap: u32,
    #[serde(default)]
    pub rules: Vec<String>,
    pub outcome: Outcome,
    #[serde(default)]
    pub rating_delta: i32,
    pub timestamp: DateTime<Utc>,
}

impl BattleRecord {
    pub fn new(team: TeamComposition, rules: &BattleRules, report: MatchReport) -> Self {
        Self {
            id: 0,
            team,
            opponent: report.opponent,
            mana_cap: rules.mana_cap,
            rules: rules.rules.clone(),
            outcome: report.outcome,
            rating_delta: report.rating_delta,
            timestamp: Utc::now(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }

    pub fn rule_set(&self) -> BTreeSet<&str> {
        self.rules.iter().map(String::as_str).collect()
    }
}

// --- BOUNDARY HELPERS ---

#[derive(Deserialize)]
#[serde(untagged)]
enum Leveled<T> {
    One(T),
    Levels(Vec<T>),
}

// `5`, `[5, 6, 7]` and a missing value all land on a single number.
fn first_level<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(match Option::<Leveled<T>>::deserialize(deserializer)? {
        Some(Leveled::One(value)) => value,
        Some(Leveled::Levels(levels)) => levels.into_iter().next().unwrap_or_default(),
        None => T::default(),
    })
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// Unparseable dates read as "no date", which the rental rule treats as expired.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.and_then(|raw| {
        DateTime::parse_from_rfc3339(raw.trim_matches('"'))
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }))
}

fn element_from_color<'de, D>(deserializer: D) -> Result<Option<Element>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.and_then(|raw| Element::from_color(&raw)))
}

// --- TESTS ---
