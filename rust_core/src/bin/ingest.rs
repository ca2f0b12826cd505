// rust_core/src/bin/ingest.rs
// Builds the card catalog: downloads the card-details feed, stream-parses it
// and writes one card per line to <data_dir>/cardsDetails.jsonl.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use log::{info, warn};
use reqwest::Client;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use splinter_logic_core::{CardCatalog, CardType, DataSettings};

const RAW_FILE: &str = "cards_raw.json";

#[derive(Parser, Debug)]
#[command(version, about = "Download the card-details feed into a JSON-lines catalog")]
struct Cli {
    /// Output directory (default: $DATA_DIR or "data"). API hosts come from
    /// API_PRIMARY and API_FALLBACK.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Download again even if a raw feed is already on disk.
    #[arg(long, default_value_t = false)]
    refresh: bool,
}

// --- 1. What we keep of each feed entry ---
// Stats stay as the feed ships them (per level); the catalog loader picks level one.
#[derive(Debug, Serialize, Deserialize)]
struct FeedCard {
    id: u32,
    name: String,

    #[serde(default)]
    color: String,

    #[serde(rename = "type", default)]
    card_type: CardType,

    #[serde(default)]
    rarity: Option<u32>,

    #[serde(default)]
    editions: Option<String>,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    stats: Value,
}

// --- 2. The stream logic ---
// Pulls one card at a time out of the top-level array.
struct CardArrayVisitor<'a, W: Write> {
    writer: &'a mut W,
    kept: &'a mut usize,
    skipped: &'a mut usize,
}

impl<'de, W: Write> Visitor<'de> for CardArrayVisitor<'_, W> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of card details")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(card) = seq.next_element::<FeedCard>()? {
            if card.card_type == CardType::Unknown {
                *self.skipped += 1;
                continue;
            }

            serde_json::to_writer(&mut *self.writer, &card).map_err(serde::de::Error::custom)?;
            self.writer.write_all(b"\n").map_err(serde::de::Error::custom)?;

            *self.kept += 1;
            if *self.kept % 100 == 0 {
                info!("Processed: {} | Skipped: {}", self.kept, self.skipped);
            }
        }
        Ok(())
    }
}

async fn download(client: &Client, endpoints: &[String], target: &Path) -> Result<()> {
    for base in endpoints {
        let url = format!("{}/cards/get_details", base.trim_end_matches('/'));
        info!("Downloading card details from {}", url);

        let response = match client.get(&url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                warn!("Card feed request to {} failed: {}", base, e);
                continue;
            }
        };

        // Stream to disk; a failed transfer must not leave a half file behind.
        let partial = target.with_extension("part");
        let mut file = File::create(&partial).with_context(|| format!("creating {}", partial.display()))?;
        let mut stream = response.bytes_stream();
        let mut failed = false;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => file.write_all(&bytes)?,
                Err(e) => {
                    warn!("Card feed transfer from {} broke off: {}", base, e);
                    failed = true;
                    break;
                }
            }
        }
        drop(file);

        if failed {
            let _ = fs::remove_file(&partial);
            continue;
        }
        fs::rename(&partial, target).with_context(|| format!("moving feed into {}", target.display()))?;
        return Ok(());
    }
    bail!("every card-details endpoint failed")
}

fn write_catalog(raw: &Path, output: &Path) -> Result<(usize, usize)> {
    let reader = BufReader::new(File::open(raw).with_context(|| format!("opening {}", raw.display()))?);
    let partial = output.with_extension("part");
    let mut writer = BufWriter::new(File::create(&partial)?);

    let mut kept = 0;
    let mut skipped = 0;

    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    deserializer
        .deserialize_seq(CardArrayVisitor {
            writer: &mut writer,
            kept: &mut kept,
            skipped: &mut skipped,
        })
        .context("parsing card feed")?;

    writer.flush()?;
    drop(writer);
    fs::rename(&partial, output)?;
    Ok((kept, skipped))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = DataSettings::from_env().with_data_dir(cli.data_dir);
    fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("creating {}", settings.data_dir.display()))?;

    let raw = settings.data_dir.join(RAW_FILE);
    let output = settings.catalog_path();

    // --- Step 1: Download ---
    if raw.exists() && !cli.refresh {
        info!("Raw feed {} exists, skipping download (use --refresh to force)", raw.display());
    } else {
        let client = Client::builder().user_agent("SplinterLogicCore/1.0").build()?;
        download(&client, &settings.endpoints(), &raw).await?;
    }

    // --- Step 2: Stream-parse and filter ---
    let (kept, skipped) = write_catalog(&raw, &output)?;

    // --- Step 3: Sanity check with the real loader ---
    let catalog = CardCatalog::load(&output)?;
    info!(
        "Ingestion complete: {} cards written, {} skipped, {} loadable from {}",
        kept,
        skipped,
        catalog.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use splinter_logic_core::config::CATALOG_FILE;

    #[test]
    fn feed_is_filtered_into_a_loadable_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join(RAW_FILE);
        let output = dir.path().join(CATALOG_FILE);
        fs::write(
            &raw,
            r#"[
                {"id": 157, "name": "Malric Inferno", "color": "Red", "type": "Summoner", "rarity": 1,
                 "editions": "1", "stats": {"mana": [4, 4, 4], "attack": [0, 0, 0]}},
                {"id": 158, "name": "Fire Beetle", "color": "Red", "type": "Monster", "rarity": 1,
                 "editions": "1,4", "stats": {"mana": [2, 2], "attack": [1, 1], "health": [3, 4],
                 "abilities": [["Shield"], []]}},
                {"id": 999, "name": "Mystery Box", "color": "Gray", "type": "Pack"}
            ]"#,
        )
        .unwrap();

        let (kept, skipped) = write_catalog(&raw, &output).unwrap();
        assert_eq!((kept, skipped), (2, 1));

        let catalog = CardCatalog::load(&output).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.mana_cost(157), Some(4));
        assert!(catalog.is_monster(158));
        assert_eq!(catalog.get(158).unwrap().stats.abilities, vec!["Shield".to_string()]);
    }
}
