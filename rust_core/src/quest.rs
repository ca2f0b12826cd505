// rust_core/src/quest.rs
// Quest advisor. The daily quest only ever nudges summoner order; it never
// changes which monsters are legal.

use log::info;

use crate::models::{Element, Quest, QuestCategory};

/// Displayed quest name -> what it asks for.
const QUEST_CATEGORIES: &[(&str, QuestCategory)] = &[
    ("defend", QuestCategory::Life),
    ("pirate", QuestCategory::Water),
    ("High Priority Targets", QuestCategory::Snipe),
    ("lyanna", QuestCategory::Earth),
    ("stir", QuestCategory::Fire),
    ("rising", QuestCategory::Death),
    ("Stubborn Mercenaries", QuestCategory::Neutral),
    ("gloridax", QuestCategory::Dragon),
    ("Stealth Mission", QuestCategory::Sneak),
];

pub fn resolve(quest_name: &str) -> QuestCategory {
    QUEST_CATEGORIES
        .iter()
        .find(|(name, _)| *name == quest_name)
        .map(|(_, category)| *category)
        .unwrap_or(QuestCategory::Unknown)
}

pub fn new_quest(name: impl Into<String>, required: u32, completed: u32) -> Quest {
    let name = name.into();
    Quest {
        category: resolve(&name),
        name,
        required,
        completed,
    }
}

fn in_skip_list(category: QuestCategory, skip_list: &[String]) -> bool {
    skip_list
        .iter()
        .any(|s| s.trim().eq_ignore_ascii_case(category.as_str()))
}

/// True when the caller has asked to skip quests of this kind.
pub fn should_skip(quest: Option<&Quest>, skip_list: &[String]) -> bool {
    quest.is_some_and(|q| in_skip_list(q.category, skip_list))
}

/// Should the composer try summoners of the quest's element first?
pub fn should_prioritize(quest: Option<&Quest>, skip_list: &[String]) -> bool {
    let Some(quest) = quest else {
        return false;
    };

    if in_skip_list(quest.category, skip_list) {
        info!("Skipping quest {} ({}): in skip list", quest.name, quest.category);
        return false;
    }
    if quest.is_completed() {
        info!("Quest {} is already completed", quest.name);
        return false;
    }
    if quest.category.is_special() {
        info!("Quest {} ({}) does not map to an element", quest.name, quest.category);
        return false;
    }
    true
}

/// The element to favour, if the quest has one.
pub fn preferred_element(quest: Option<&Quest>) -> Option<Element> {
    quest.and_then(|q| q.category.element())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_and_unknown_names() {
        assert_eq!(resolve("stir"), QuestCategory::Fire);
        assert_eq!(resolve("gloridax"), QuestCategory::Dragon);
        assert_eq!(resolve("Stealth Mission"), QuestCategory::Sneak);
        assert_eq!(resolve("Brand New Quest"), QuestCategory::Unknown);
    }

    #[test]
    fn skip_list_blocks_priority() {
        let quest = new_quest("stir", 5, 1);
        let skip = vec!["fire".to_string()];

        assert!(!should_prioritize(Some(&quest), &skip));
        assert!(should_skip(Some(&quest), &skip));
        assert!(should_prioritize(Some(&quest), &[]));
    }

    #[test]
    fn no_priority_for_missing_done_or_special_quests() {
        assert!(!should_prioritize(None, &[]));
        assert!(!should_prioritize(Some(&new_quest("stir", 5, 5)), &[]));
        assert!(!should_prioritize(Some(&new_quest("High Priority Targets", 5, 0)), &[]));
        assert!(!should_prioritize(Some(&new_quest("Stealth Mission", 5, 0)), &[]));
        assert!(!should_prioritize(Some(&new_quest("Stubborn Mercenaries", 5, 0)), &[]));
    }

    #[test]
    fn preferred_element_only_for_factions() {
        assert_eq!(preferred_element(Some(&new_quest("pirate", 5, 0))), Some(Element::Water));
        assert_eq!(preferred_element(Some(&new_quest("Stealth Mission", 5, 0))), None);
        assert_eq!(preferred_element(None), None);
    }
}
