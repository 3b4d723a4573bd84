//! WASM bindings for narrative-interpreter — powers the browser front-end.
//!
//! State crosses the boundary as JSON strings: the page holds the current
//! `GameState` and hands it back with each action.

use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

use narrative_interpreter::core::view::stat_readings;
use narrative_interpreter::schema::catalog::Catalog;
use narrative_interpreter::{Engine, GameState};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct ProfileInfo<'a> {
    id: &'a str,
    info: Option<&'a str>,
}

#[derive(serde::Serialize)]
struct CatalogInfo<'a> {
    version: Option<&'a str>,
    personas: Vec<ProfileInfo<'a>>,
    locations: Vec<ProfileInfo<'a>>,
}

fn profiles<'a>(
    ids: impl Iterator<Item = &'a String>,
    info: &'a BTreeMap<String, String>,
) -> Vec<ProfileInfo<'a>> {
    ids.map(|id| ProfileInfo {
        id,
        info: info.get(id).map(String::as_str),
    })
    .collect()
}

fn parse_state(state_json: &str) -> Result<GameState, JsError> {
    serde_json::from_str(state_json).map_err(|e| JsError::new(&format!("Invalid state JSON: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// StoryPlayer — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct StoryPlayer {
    engine: Engine,
}

#[wasm_bindgen]
impl StoryPlayer {
    /// Create a player from a catalog JSON document.
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str, start_node: &str, seed: u64) -> Result<StoryPlayer, JsError> {
        let catalog = Catalog::from_json_str(catalog_json)
            .map_err(|e| JsError::new(&format!("Catalog error: {e}")))?;
        let engine = Engine::builder()
            .catalog(catalog)
            .start_node(start_node)
            .seed(seed)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(StoryPlayer { engine })
    }

    /// Start a game with a random persona and location. Returns state JSON.
    pub fn new_game(&mut self) -> Result<String, JsError> {
        let state = self
            .engine
            .new_game()
            .map_err(|e| JsError::new(&format!("Start error: {e}")))?;
        to_json(&state)
    }

    /// Start a game with an explicit persona and location. Returns state JSON.
    pub fn new_game_with(&mut self, persona: &str, location: &str) -> Result<String, JsError> {
        let state = self
            .engine
            .new_game_with(persona, location)
            .map_err(|e| JsError::new(&format!("Start error: {e}")))?;
        to_json(&state)
    }

    /// Apply an action to a state. An empty `option_id` means "continue".
    pub fn apply_option(&mut self, state_json: &str, option_id: &str) -> Result<String, JsError> {
        let state = parse_state(state_json)?;
        let option = (!option_id.is_empty()).then_some(option_id);
        let next = self
            .engine
            .apply_option(&state, option)
            .map_err(|e| JsError::new(&format!("Action error: {e}")))?;
        to_json(&next)
    }

    /// Return the display view for a state as JSON.
    pub fn view(&self, state_json: &str) -> Result<String, JsError> {
        let state = parse_state(state_json)?;
        to_json(&self.engine.view(&state))
    }

    /// Return every stat reading (value and bounds) for a state as JSON.
    pub fn stats(&self, state_json: &str) -> Result<String, JsError> {
        let state = parse_state(state_json)?;
        to_json(&stat_readings(&state, self.engine.catalog()))
    }

    /// Return the persona and location tables as JSON.
    pub fn catalog_info(&self) -> Result<String, JsError> {
        let catalog = self.engine.catalog();
        let info = CatalogInfo {
            version: catalog.version.as_deref(),
            personas: profiles(catalog.personas.keys(), &catalog.persona_info),
            locations: profiles(catalog.locations.keys(), &catalog.location_info),
        };
        to_json(&info)
    }

    /// Return the lint report for the loaded catalog as a JSON object.
    pub fn lint(&self) -> Result<String, JsError> {
        let report = self.engine.lint();
        to_json(&serde_json::json!({
            "errors": report.errors,
            "warnings": report.warnings,
        }))
    }

    /// Restart the random stream with a new seed.
    pub fn reseed(&mut self, seed: u64) {
        self.engine.reseed(seed);
    }
}
