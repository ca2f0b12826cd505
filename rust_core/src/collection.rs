// rust_core/src/collection.rs
// Collection filter: which of the account's cards may actually be played right now.
// Pure functions over (entries, viewer, now). Same inputs, same verdicts.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CardId, CollectionEntry};

/// Starter cards every account can field regardless of its collection.
pub const BASIC_CARDS: &[CardId] = &[
    157, 158, 159, 160, 395, 396, 397, 398, 399, 161, 162, 163, 167, 400, 401, 402, 403, 440,
    168, 169, 170, 171, 381, 382, 383, 384, 385, 172, 173, 174, 178, 386, 387, 388, 389, 437,
    179, 180, 181, 182, 334, 367, 368, 369, 370, 371, 183, 184, 185, 189, 372, 373, 374, 375,
    439, 146, 147, 148, 149, 409, 410, 411, 412, 413, 150, 151, 152, 156, 414, 415, 416, 417,
    135, 135, 136, 137, 138, 353, 354, 355, 356, 357, 139, 140, 141, 145, 358, 359, 360, 361,
    438, 224, 190, 191, 192, 157, 423, 424, 425, 426, 194, 195, 196, 427, 428, 429, 441,
];

/// Gladiator edition: tournament-only, barred from ranked play.
pub const TOURNAMENT_EDITION: u32 = 6;

/// A borrowed card used by someone else stays locked this long.
pub const RENTAL_LOCK_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCards {
    pub playable: Vec<CardId>,
    pub rented: Vec<CardId>,
}

impl PlayerCards {
    /// Starter set only. What an account gets when its collection can't be read.
    pub fn baseline() -> Self {
        Self {
            playable: dedup(BASIC_CARDS.iter().copied()),
            rented: Vec::new(),
        }
    }
}

fn is_viewer(field: &Option<String>, viewer: &str) -> bool {
    field.as_deref() == Some(viewer)
}

pub fn rental_lock_satisfied(entry: &CollectionEntry, viewer: &str, now: DateTime<Utc>) -> bool {
    match &entry.last_used_player {
        None => true,
        Some(player) if player == viewer => true,
        Some(_) => match entry.last_used_date {
            None => true,
            Some(used) => now.signed_duration_since(used) > Duration::hours(RENTAL_LOCK_HOURS),
        },
    }
}

pub fn is_playable(entry: &CollectionEntry, viewer: &str, now: DateTime<Utc>) -> bool {
    let delegated_ok = entry.delegated_to.is_none() || is_viewer(&entry.delegated_to, viewer);
    let market_ok = entry.market_listing_status.is_none() || is_viewer(&entry.delegated_to, viewer);
    let unlock_ok = entry.unlock_date.is_none();
    let edition_ok = entry.edition != Some(TOURNAMENT_EDITION);

    delegated_ok && market_ok && unlock_ok && edition_ok && rental_lock_satisfied(entry, viewer, now)
}

pub fn is_rented(entry: &CollectionEntry, viewer: &str, now: DateTime<Utc>) -> bool {
    is_viewer(&entry.delegated_to, viewer)
        && !is_viewer(&entry.player, viewer)
        && entry.unlock_date.is_none()
        && rental_lock_satisfied(entry, viewer, now)
}

/// Splits a fetched collection into playable and rented ids.
/// Starter cards are always appended to the playable side, never to rented.
pub fn classify(entries: &[CollectionEntry], viewer: &str, now: DateTime<Utc>) -> PlayerCards {
    let playable = entries
        .iter()
        .filter(|e| is_playable(e, viewer, now))
        .map(|e| e.card_id)
        .chain(BASIC_CARDS.iter().copied());

    let rented = entries
        .iter()
        .filter(|e| is_rented(e, viewer, now))
        .map(|e| e.card_id);

    PlayerCards {
        playable: dedup(playable),
        rented: dedup(rented),
    }
}

// First-seen order is kept; the composer's summoner order depends on it.
fn dedup<I: IntoIterator<Item = CardId>>(ids: I) -> Vec<CardId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
