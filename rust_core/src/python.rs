// rust_core/src/python.rs
// Python bridge. The browser automation lives in Python and calls in here for
// every decision. All functions speak JSON strings both ways; failures come
// back as {"status": "error", "message": ...} instead of raising, so a bad
// payload never takes the Python process down.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use chrono::Utc;
use pyo3::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tokio::runtime::Runtime;

use crate::account::{AccountDataSource, HttpAccountSource};
use crate::advisor::BattleAdvisor;
use crate::catalog::CardCatalog;
use crate::collection::{self, PlayerCards};
use crate::config::{DataSettings, TeamPreferences};
use crate::history::{HistoryStore, JsonlHistory};
use crate::models::{BattleRules, CardId, CollectionEntry, MatchReport, Quest, TeamComposition};
use crate::session;

// --- SINGLETONS ---

// 1. Advisor (catalog + history file). Set once by `init`.
static ADVISOR: OnceLock<Mutex<BattleAdvisor<JsonlHistory>>> = OnceLock::new();

fn with_advisor<T>(f: impl FnOnce(&mut BattleAdvisor<JsonlHistory>) -> T) -> Result<T, String> {
    let advisor = ADVISOR.get().ok_or("advisor not initialised; call init() first")?;
    let mut guard = advisor.lock().map_err(|_| "advisor lock poisoned".to_string())?;
    Ok(f(&mut guard))
}

// 2. Tokio Runtime, created once and reused for every network call.
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn get_runtime() -> Result<&'static Runtime, String> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Runtime::new().map_err(|e| format!("Failed to create Tokio runtime: {}", e))?;
    // Another thread may have won the race; either runtime is fine.
    let _ = RUNTIME.set(rt);
    RUNTIME.get().ok_or_else(|| "Tokio runtime unavailable".to_string())
}

// --- HELPERS ---

fn error_json(message: impl std::fmt::Display) -> String {
    json!({ "status": "error", "message": message.to_string() }).to_string()
}

fn respond<T: serde::Serialize>(result: Result<T, String>) -> String {
    match result.and_then(|value| serde_json::to_string(&value).map_err(|e| e.to_string())) {
        Ok(body) => body,
        Err(message) => error_json(message),
    }
}

fn account_source(endpoints: Option<Vec<String>>) -> Result<HttpAccountSource, String> {
    let endpoints = endpoints
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DataSettings::from_env().endpoints());
    HttpAccountSource::new(endpoints).map_err(|e| e.to_string())
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct TeamRequest {
    playable: Vec<CardId>,
    #[serde(default)]
    preferred: Vec<CardId>,
    rules: BattleRules,
    #[serde(default)]
    quest: Option<Quest>,
    #[serde(default = "default_true")]
    quest_priority: bool,
    #[serde(default)]
    skip_quest: Vec<String>,
}

#[derive(Deserialize)]
struct OutcomeRequest {
    team: TeamComposition,
    rules: BattleRules,
    report: MatchReport,
}

// --- SETUP ---

/// Loads the catalog and opens the history file under `data_dir`.
#[pyfunction]
#[pyo3(signature = (data_dir=None, seed=None))]
fn init(data_dir: Option<String>, seed: Option<u64>) -> PyResult<String> {
    let settings = DataSettings::from_env().with_data_dir(data_dir.map(PathBuf::from));

    if ADVISOR.get().is_some() {
        return Ok(json!({ "status": "already_initialised" }).to_string());
    }

    let catalog = CardCatalog::load_or_empty(&settings.catalog_path());
    let history = match JsonlHistory::open(settings.history_path()) {
        Ok(history) => history,
        Err(e) => return Ok(error_json(e)),
    };
    let cards = catalog.len();
    let battles = history.len();
    let history_file = history.path().display().to_string();

    let advisor = match seed {
        Some(seed) => BattleAdvisor::with_seed(catalog, history, seed),
        None => BattleAdvisor::new(catalog, history),
    };
    let _ = ADVISOR.set(Mutex::new(advisor));

    Ok(json!({ "status": "ok", "cards": cards, "battles": battles, "history": history_file }).to_string())
}

// --- ACCOUNT ---

#[pyfunction]
fn classify_collection(entries_json: String, viewer: String) -> PyResult<String> {
    let result = serde_json::from_str::<Vec<CollectionEntry>>(&entries_json)
        .map_err(|e| format!("JSON Parse Error: {}", e))
        .map(|entries| collection::classify(&entries, &viewer, Utc::now()));
    Ok(respond(result))
}

#[pyfunction]
#[pyo3(signature = (account, endpoints=None))]
fn fetch_cards(py: Python<'_>, account: String, endpoints: Option<Vec<String>>) -> PyResult<String> {
    let result = py.detach(|| {
        let source = account_source(endpoints)?;
        Ok(get_runtime()?.block_on(source.fetch_cards(&account)))
    });
    Ok(respond(result))
}

#[pyfunction]
#[pyo3(signature = (account, endpoints=None))]
fn fetch_quest(py: Python<'_>, account: String, endpoints: Option<Vec<String>>) -> PyResult<String> {
    let result = py.detach(|| {
        let source = account_source(endpoints)?;
        Ok(get_runtime()?.block_on(source.fetch_quest(&account)))
    });
    Ok(respond(result))
}

// --- BATTLE ---

#[pyfunction]
fn find_team(request_json: String) -> PyResult<String> {
    let request: TeamRequest = match serde_json::from_str(&request_json) {
        Ok(r) => r,
        Err(e) => return Ok(error_json(format!("JSON Parse Error: {}", e))),
    };

    // An explicit preferred list is always honoured.
    let prefs = TeamPreferences {
        quest_priority: request.quest_priority,
        skip_quest: request.skip_quest,
        delegated_cards_priority: true,
    };
    let cards = PlayerCards {
        playable: request.playable,
        rented: request.preferred,
    };

    let team = with_advisor(|advisor| advisor.find_optimal_team(&cards, &request.rules, request.quest.as_ref(), &prefs));

    Ok(match team {
        Ok(Some(team)) => json!({ "status": "ok", "team": team }).to_string(),
        Ok(None) => json!({ "status": "no_team" }).to_string(),
        Err(message) => error_json(message),
    })
}

#[pyfunction]
fn record_battle(request_json: String) -> PyResult<String> {
    let request: OutcomeRequest = match serde_json::from_str(&request_json) {
        Ok(r) => r,
        Err(e) => return Ok(error_json(format!("JSON Parse Error: {}", e))),
    };

    let insights = with_advisor(|advisor| {
        advisor
            .record_outcome(request.team, &request.rules, request.report)
            .map_err(|e| e.to_string())
    })
    .and_then(|r| r);
    Ok(respond(insights))
}

#[pyfunction]
fn battle_statistics() -> PyResult<String> {
    Ok(respond(with_advisor(|advisor| advisor.statistics())))
}

#[pyfunction]
fn performance_report() -> PyResult<String> {
    Ok(respond(with_advisor(|advisor| advisor.performance_report())))
}

#[pyfunction]
fn ecr_recovery_hours(current: f64, target: f64) -> f64 {
    session::ecr_recovery_hours(current, target)
}

#[pymodule]
fn splinter_logic_core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Route Rust `log` records into Python's logging.
    let _ = pyo3_log::try_init();

    m.add_function(wrap_pyfunction!(init, m)?)?;
    m.add_function(wrap_pyfunction!(classify_collection, m)?)?;
    m.add_function(wrap_pyfunction!(fetch_cards, m)?)?;
    m.add_function(wrap_pyfunction!(fetch_quest, m)?)?;
    m.add_function(wrap_pyfunction!(find_team, m)?)?;
    m.add_function(wrap_pyfunction!(record_battle, m)?)?;
    m.add_function(wrap_pyfunction!(battle_statistics, m)?)?;
    m.add_function(wrap_pyfunction!(performance_report, m)?)?;
    m.add_function(wrap_pyfunction!(ecr_recovery_hours, m)?)?;
    Ok(())
}
