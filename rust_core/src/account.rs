// rust_core/src/account.rs
// Account data: the card collection and the daily quest, fetched from the
// public game API. Endpoints are tried in order; the first one that answers
// with usable data wins. Nothing here ever fails outward: a dead API degrades
// to the starter set and "no quest".

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::collection::{self, PlayerCards};
use crate::error::CoreResult;
use crate::models::{CollectionEntry, Quest};
use crate::quest;

const USER_AGENT: &str = "SplinterLogicCore/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[async_trait]
pub trait AccountDataSource: Send + Sync {
    /// Playable and rented ids. Falls back to the starter set.
    async fn fetch_cards(&self, account: &str) -> PlayerCards;

    /// The current daily quest, if any endpoint knows it.
    async fn fetch_quest(&self, account: &str) -> Option<Quest>;
}

#[derive(Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    cards: Vec<CollectionEntry>,
}

#[derive(Deserialize)]
struct QuestResponse {
    name: String,
    #[serde(default)]
    total_items: u32,
    #[serde(default)]
    completed_items: u32,
}

pub struct HttpAccountSource {
    client: Client,
    endpoints: Vec<String>,
}

impl HttpAccountSource {
    pub fn new<I, S>(endpoints: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoints: endpoints
                .into_iter()
                .map(|e| e.into().trim_end_matches('/').to_string())
                .collect(),
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn collection_from(&self, base: &str, account: &str) -> CoreResult<Vec<CollectionEntry>> {
        let url = format!("{}/cards/collection/{}", base, account);
        let body: CollectionResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.cards)
    }

    async fn quest_from(&self, base: &str, account: &str) -> CoreResult<Option<QuestResponse>> {
        let url = format!("{}/players/quests", base);
        let body: Vec<QuestResponse> = self
            .client
            .get(&url)
            .query(&[("username", account)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.into_iter().next())
    }
}

#[async_trait]
impl AccountDataSource for HttpAccountSource {
    async fn fetch_cards(&self, account: &str) -> PlayerCards {
        for base in &self.endpoints {
            match self.collection_from(base, account).await {
                Ok(entries) if !entries.is_empty() => {
                    let cards = collection::classify(&entries, account, Utc::now());
                    info!(
                        "Found {} playable and {} rented cards for {} via {}",
                        cards.playable.len(),
                        cards.rented.len(),
                        account,
                        base
                    );
                    return cards;
                }
                Ok(_) => warn!("No cards found for {} at {}", account, base),
                Err(e) => warn!("Collection request to {} failed: {}", base, e),
            }
        }

        warn!("Every collection endpoint failed for {}; using starter cards only", account);
        PlayerCards::baseline()
    }

    async fn fetch_quest(&self, account: &str) -> Option<Quest> {
        for base in &self.endpoints {
            match self.quest_from(base, account).await {
                Ok(Some(raw)) => {
                    let quest = quest::new_quest(raw.name, raw.total_items, raw.completed_items);
                    info!(
                        "Quest for {}: {} ({}) - {}/{} ({:.1}%)",
                        account,
                        quest.name,
                        quest.category,
                        quest.completed,
                        quest.required,
                        quest.progress_percentage()
                    );
                    return Some(quest);
                }
                Ok(None) => warn!("No quest data for {} at {}", account, base),
                Err(e) => warn!("Quest request to {} failed: {}", base, e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::BASIC_CARDS;
    use crate::models::QuestCategory;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Nothing listens on the discard port.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

    /// Minimal HTTP/1.1 responder: picks the body by path prefix, 404 otherwise.
    async fn serve(routes: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    let request = String::from_utf8_lossy(&buf[..read]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, body) = routes
                        .iter()
                        .find(|(prefix, _)| path.starts_with(prefix))
                        .map(|(_, body)| ("200 OK", *body))
                        .unwrap_or(("404 Not Found", "{}"));
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    const COLLECTION: &str = r#"{"cards": [
        {"card_detail_id": 9100, "player": "hero", "delegated_to": null, "market_listing_status": null,
         "unlock_date": null, "last_used_player": null, "last_used_date": null, "edition": 4},
        {"card_detail_id": 9200, "player": "landlord", "delegated_to": "hero", "market_listing_status": null,
         "unlock_date": null, "last_used_player": "", "last_used_date": "", "edition": 7},
        {"card_detail_id": 9300, "player": "hero", "edition": 6}
    ]}"#;

    #[tokio::test]
    async fn falls_back_to_the_second_endpoint() {
        let live = serve(vec![("/cards/collection/hero", COLLECTION)]).await;
        let source = HttpAccountSource::new([DEAD_ENDPOINT.to_string(), live]).unwrap();

        let cards = source.fetch_cards("hero").await;

        assert_eq!(&cards.playable[..2], &[9100, 9200]);
        assert!(!cards.playable.contains(&9300));
        assert_eq!(cards.rented, vec![9200]);
    }

    #[tokio::test]
    async fn empty_collection_moves_on_then_degrades_to_baseline() {
        let empty = serve(vec![("/cards/collection/", r#"{"cards": []}"#)]).await;
        let source = HttpAccountSource::new([empty, DEAD_ENDPOINT.to_string()]).unwrap();

        let cards = source.fetch_cards("hero").await;

        assert_eq!(cards, PlayerCards::baseline());
        assert!(BASIC_CARDS.iter().all(|id| cards.playable.contains(id)));
    }

    #[tokio::test]
    async fn quest_is_read_and_classified() {
        let live = serve(vec![(
            "/players/quests",
            r#"[{"name": "pirate", "total_items": 5, "completed_items": 2, "player": "hero"}]"#,
        )])
        .await;
        let source = HttpAccountSource::new([live]).unwrap();

        let quest = source.fetch_quest("hero").await.unwrap();

        assert_eq!(quest.category, QuestCategory::Water);
        assert_eq!((quest.completed, quest.required), (2, 5));
    }

    #[tokio::test]
    async fn no_quest_when_every_endpoint_fails() {
        let blank = serve(vec![("/players/quests", "[]")]).await;
        let source = HttpAccountSource::new([blank, DEAD_ENDPOINT.to_string()]).unwrap();
        assert_eq!(source.fetch_quest("hero").await, None);
    }
}
