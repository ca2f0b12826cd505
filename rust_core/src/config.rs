// rust_core/src/config.rs
// Bot settings, read from environment variables.
// The binaries seed the environment from a `.env` file first (dotenvy);
// this module only ever looks variables up.

use std::fmt;
use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};
use crate::models::{CardId, Quest};
use crate::quest;

pub const DEFAULT_API_PRIMARY: &str = "https://api2.splinterlands.com";
pub const DEFAULT_API_FALLBACK: &str = "https://api.splinterlands.io";

pub const CATALOG_FILE: &str = "cardsDetails.jsonl";
pub const HISTORY_FILE: &str = "battle_history.jsonl";

#[derive(Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub password: String,
}

// Keeps secrets out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a team gets picked: quest bias and rented-card preference.
/// Read on its own by callers that need no credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamPreferences {
    pub quest_priority: bool,
    pub skip_quest: Vec<String>,
    pub delegated_cards_priority: bool,
}

impl Default for TeamPreferences {
    fn default() -> Self {
        Self {
            quest_priority: true,
            skip_quest: Vec::new(),
            delegated_cards_priority: false,
        }
    }
}

impl TeamPreferences {
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| cleaned(&lookup, key);
        Ok(Self {
            quest_priority: parse_bool(&var, "QUEST_PRIORITY", true)?,
            skip_quest: var("SKIP_QUEST")
                .map(|raw| split_list(&raw).map(str::to_lowercase).collect())
                .unwrap_or_default(),
            delegated_cards_priority: parse_bool(&var, "DELEGATED_CARDS_PRIORITY", false)?,
        })
    }

    /// The quest the composer may bias towards. None when quest priority is
    /// off, or the quest is missing, done, skipped or has no element.
    pub fn quest_bias<'q>(&self, quest: Option<&'q Quest>) -> Option<&'q Quest> {
        if self.quest_priority && quest::should_prioritize(quest, &self.skip_quest) {
            quest
        } else {
            None
        }
    }

    /// Cards to try first among equal-mana monsters.
    pub fn preferred<'c>(&self, rented: &'c [CardId]) -> &'c [CardId] {
        if self.delegated_cards_priority {
            rented
        } else {
            &[]
        }
    }
}

/// Where the catalog and history live and which API hosts to ask.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub data_dir: PathBuf,
    pub api_primary: String,
    pub api_fallback: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_primary: DEFAULT_API_PRIMARY.to_string(),
            api_fallback: DEFAULT_API_FALLBACK.to_string(),
        }
    }
}

impl DataSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            data_dir: cleaned(&lookup, "DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            api_primary: cleaned(&lookup, "API_PRIMARY").unwrap_or(defaults.api_primary),
            api_fallback: cleaned(&lookup, "API_FALLBACK").unwrap_or(defaults.api_fallback),
        }
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    /// Primary first, fallback second.
    pub fn endpoints(&self) -> Vec<String> {
        vec![self.api_primary.clone(), self.api_fallback.clone()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub accounts: Vec<Account>,
    pub multi_account: bool,
    pub minutes_battles_interval: u64,
    pub claim_season_reward: bool,
    pub claim_daily_quest_reward: bool,
    pub ecr_stop_limit: Option<f64>,
    pub ecr_recover_to: f64,
    pub team: TeamPreferences,
    pub data: DataSettings,
}

impl BotConfig {
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(env_var)
    }

    /// Same as `from_env`, with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| cleaned(&lookup, key);

        let multi_account = parse_bool(&var, "MULTI_ACCOUNT", false)?;
        let accounts = parse_accounts(
            &var("ACCOUNT").unwrap_or_default(),
            &var("PASSWORD").unwrap_or_default(),
            multi_account,
        )?;

        Ok(Self {
            accounts,
            multi_account,
            minutes_battles_interval: parse_number(&var, "MINUTES_BATTLES_INTERVAL")?.unwrap_or(30),
            claim_season_reward: parse_bool(&var, "CLAIM_SEASON_REWARD", false)?,
            claim_daily_quest_reward: parse_bool(&var, "CLAIM_DAILY_QUEST_REWARD", true)?,
            ecr_stop_limit: parse_number(&var, "ECR_STOP_LIMIT")?,
            ecr_recover_to: parse_number(&var, "ECR_RECOVER_TO")?.unwrap_or(99.0),
            team: TeamPreferences::from_lookup(&lookup)?,
            data: DataSettings::from_lookup(&lookup),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn cleaned<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_accounts(names: &str, passwords: &str, multi_account: bool) -> CoreResult<Vec<Account>> {
    if names.is_empty() || passwords.is_empty() {
        return Err(CoreError::Config("ACCOUNT and PASSWORD must both be set".into()));
    }

    let (names, passwords): (Vec<&str>, Vec<&str>) = if multi_account {
        (split_list(names).collect(), split_list(passwords).collect())
    } else {
        (vec![names], vec![passwords])
    };

    if multi_account && names.len() < 2 {
        return Err(CoreError::Config(
            "Multi-account mode requires at least 2 accounts".into(),
        ));
    }
    if names.len() != passwords.len() {
        return Err(CoreError::Config(format!(
            "Number of passwords ({}) must match number of accounts ({})",
            passwords.len(),
            names.len()
        )));
    }

    Ok(names
        .into_iter()
        .zip(passwords)
        .map(|(name, password)| Account {
            // Login e-mails carry the account name before the '@'.
            name: name.split('@').next().unwrap_or(name).to_string(),
            password: password.to_string(),
        })
        .collect())
}

fn parse_bool<F>(var: &F, key: &str, default: bool) -> CoreResult<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
        Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
        Some(raw) => Err(CoreError::Config(format!("{} must be true or false, got {:?}", key, raw))),
    }
}

fn parse_number<F, T>(var: &F, key: &str) -> CoreResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| CoreError::Config(format!("{} is not a valid number: {:?}", key, raw)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> CoreResult<BotConfig> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn single_account_with_defaults() {
        let cfg = config(&[("ACCOUNT", "testuser@example.com"), ("PASSWORD", "testkey")]).unwrap();

        assert_eq!(cfg.accounts.len(), 1);
        assert_eq!(cfg.accounts[0].name, "testuser");
        assert!(!cfg.multi_account);
        assert!(cfg.team.quest_priority);
        assert_eq!(cfg.minutes_battles_interval, 30);
        assert!(!cfg.claim_season_reward);
        assert!(cfg.claim_daily_quest_reward);
        assert_eq!(cfg.ecr_stop_limit, None);
        assert_eq!(cfg.ecr_recover_to, 99.0);
        assert!(cfg.team.skip_quest.is_empty());
        assert_eq!(cfg.data, DataSettings::default());
    }

    #[test]
    fn multi_account_lists() {
        let cfg = config(&[
            ("ACCOUNT", "user1, user2,user3"),
            ("PASSWORD", "key1,key2,key3"),
            ("MULTI_ACCOUNT", "TRUE"),
            ("SKIP_QUEST", "Life, snipe,,neutral"),
            ("ECR_STOP_LIMIT", "55.5"),
        ])
        .unwrap();

        let names: Vec<&str> = cfg.accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["user1", "user2", "user3"]);
        assert_eq!(cfg.accounts[2].password, "key3");
        assert_eq!(cfg.team.skip_quest, vec!["life", "snipe", "neutral"]);
        assert_eq!(cfg.ecr_stop_limit, Some(55.5));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            config(&[("ACCOUNT", "u1,u2"), ("PASSWORD", "k1,k2,k3"), ("MULTI_ACCOUNT", "true")]),
            Err(CoreError::Config(msg)) if msg.contains("must match")
        ));
        assert!(config(&[("ACCOUNT", "u1"), ("PASSWORD", "k1"), ("MULTI_ACCOUNT", "true")]).is_err());
        assert!(config(&[("PASSWORD", "k1")]).is_err());
        assert!(config(&[("ACCOUNT", "u1"), ("PASSWORD", "k1"), ("MINUTES_BATTLES_INTERVAL", "soon")]).is_err());
        assert!(config(&[("ACCOUNT", "u1"), ("PASSWORD", "k1"), ("QUEST_PRIORITY", "maybe")]).is_err());
    }

    #[test]
    fn preferences_and_data_settings_need_no_account() {
        let env: HashMap<&str, &str> = [
            ("SKIP_QUEST", "Water"),
            ("DELEGATED_CARDS_PRIORITY", "true"),
            ("DATA_DIR", "/srv/bot"),
            ("API_FALLBACK", "http://127.0.0.1:8080"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let team = TeamPreferences::from_lookup(lookup).unwrap();
        assert!(team.quest_priority);
        assert_eq!(team.skip_quest, vec!["water"]);
        assert_eq!(team.preferred(&[7, 8]).to_vec(), vec![7, 8]);

        let data = DataSettings::from_lookup(lookup).with_data_dir(None);
        assert_eq!(data.history_path(), PathBuf::from("/srv/bot").join(HISTORY_FILE));
        assert_eq!(data.endpoints(), vec![DEFAULT_API_PRIMARY.to_string(), "http://127.0.0.1:8080".to_string()]);
        assert_eq!(
            data.with_data_dir(Some(PathBuf::from("elsewhere"))).catalog_path(),
            PathBuf::from("elsewhere").join(CATALOG_FILE)
        );
    }

    #[test]
    fn quest_bias_respects_priority_skip_list_and_progress() {
        let open_water = quest::new_quest("pirate", 5, 2);
        let done_water = quest::new_quest("pirate", 5, 5);

        let team = TeamPreferences::default();
        assert_eq!(team.quest_bias(Some(&open_water)), Some(&open_water));
        assert_eq!(team.quest_bias(Some(&done_water)), None);
        assert!(team.preferred(&[7, 8]).is_empty());

        let skipping = TeamPreferences {
            skip_quest: vec!["water".into()],
            ..TeamPreferences::default()
        };
        assert_eq!(skipping.quest_bias(Some(&open_water)), None);

        let off = TeamPreferences {
            quest_priority: false,
            ..TeamPreferences::default()
        };
        assert_eq!(off.quest_bias(Some(&open_water)), None);
    }

    #[test]
    fn debug_output_hides_passwords() {
        let cfg = config(&[("ACCOUNT", "hero"), ("PASSWORD", "hunter2")]).unwrap();
        let printed = format!("{:?}", cfg);
        assert!(printed.contains("hero"));
        assert!(!printed.contains("hunter2"));
    }
}
