/// The top-level interpreter: owns a catalog, a config, and a seedable RNG.
///
/// Built via `Engine::builder()`. Every game action goes through here so
/// callers never have to thread the catalog or RNG themselves.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::delta::apply_delta;
use crate::core::lint::{lint_catalog, LintReport};
use crate::core::router::{auto_advance, RoutingError};
use crate::core::transition;
use crate::core::view::{self, NodeView};
use crate::schema::catalog::{Catalog, CatalogError, Choice, Node};
use crate::schema::stat::Stat;
use crate::schema::state::GameState;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),
    #[error("no catalog provided to the builder")]
    MissingCatalog,
    #[error("unknown persona: {0}")]
    UnknownPersona(String),
    #[error("unknown location: {0}")]
    UnknownLocation(String),
}

/// Runtime settings, usually loaded from a RON file.
///
/// ```ron
/// (
///     start_node: "DAY0_LOCATION",
///     max_auto_advance: 256,
///     seed: Some(42),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub start_node: String,
    /// Router hops allowed in one auto-advance run.
    pub max_auto_advance: usize,
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_node: "DAY0_LOCATION".to_string(),
            max_auto_advance: 256,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, EngineError> {
        Ok(ron::from_str(input)?)
    }
}

pub struct Engine {
    catalog: Catalog,
    config: EngineConfig,
    rng: StdRng,
}

/// Builder for constructing an `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    catalog: Option<Catalog>,
    catalog_path: Option<PathBuf>,
    config: Option<EngineConfig>,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    start_node: Option<String>,
    max_auto_advance: Option<usize>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Restart the random stream from a fixed seed.
    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = Some(seed);
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Start a game with a uniformly random persona and location.
    pub fn new_game(&mut self) -> Result<GameState, EngineError> {
        let persona = pick_key(&self.catalog.personas, &mut self.rng)
            .ok_or_else(|| EngineError::UnknownPersona(String::new()))?;
        let location = pick_key(&self.catalog.locations, &mut self.rng)
            .ok_or_else(|| EngineError::UnknownLocation(String::new()))?;
        self.new_game_with(&persona, &location)
    }

    /// Start a game with an explicit persona and location.
    ///
    /// The persona's start delta touches only the five variables; skills
    /// start from their authored values. The location's delta follows and
    /// may adjust any stat. Both are clamped before auto-advancing from the
    /// start node.
    pub fn new_game_with(&mut self, persona: &str, location: &str) -> Result<GameState, EngineError> {
        let persona_profile = self
            .catalog
            .personas
            .get(persona)
            .ok_or_else(|| EngineError::UnknownPersona(persona.to_string()))?;
        let location_profile = self
            .catalog
            .locations
            .get(location)
            .ok_or_else(|| EngineError::UnknownLocation(location.to_string()))?;

        let mut state = GameState::new(
            &self.config.start_node,
            persona,
            location,
            self.catalog.initial_stats(),
        );
        let persona_delta = persona_profile.delta.restricted_to(&Stat::VARIABLES);
        apply_delta(&mut state, &persona_delta, self.catalog.bounds());
        apply_delta(&mut state, &location_profile.delta, self.catalog.bounds());

        log::info!("new game: {} at {}", persona, location);
        auto_advance(&mut state, &self.catalog, self.config.max_auto_advance)?;
        Ok(state)
    }

    /// Apply a player action by option id; `None` is a narrative continue.
    ///
    /// An id that does not name an option on the current decision node is
    /// treated as no selection.
    pub fn apply_option(
        &mut self,
        state: &GameState,
        option_id: Option<&str>,
    ) -> Result<GameState, EngineError> {
        let choice = option_id.and_then(|id| find_choice(&self.catalog, &state.node, id));
        Ok(transition::apply_option(
            state,
            choice,
            &self.catalog,
            self.config.max_auto_advance,
            &mut self.rng,
        )?)
    }

    /// Apply a player action with an option already in hand.
    pub fn apply_choice(
        &mut self,
        state: &GameState,
        choice: Option<&Choice>,
    ) -> Result<GameState, EngineError> {
        Ok(transition::apply_option(
            state,
            choice,
            &self.catalog,
            self.config.max_auto_advance,
            &mut self.rng,
        )?)
    }

    pub fn view(&self, state: &GameState) -> NodeView {
        view::view(state, &self.catalog)
    }

    pub fn lint(&self) -> LintReport {
        lint_catalog(&self.catalog, &self.config.start_node)
    }
}

fn find_choice<'a>(catalog: &'a Catalog, node: &str, id: &str) -> Option<&'a Choice> {
    let found = match catalog.node(node) {
        Some(Node::Decision(decision)) => decision.option(id),
        _ => None,
    };
    if found.is_none() {
        log::debug!("no option '{}' at '{}'", id, node);
    }
    found
}

fn pick_key<V, R: Rng>(
    map: &std::collections::BTreeMap<String, V>,
    rng: &mut R,
) -> Option<String> {
    if map.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..map.len());
    map.keys().nth(index).cloned()
}

impl EngineBuilder {
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Overrides any seed from the config.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn start_node(mut self, node: &str) -> Self {
        self.start_node = Some(node.to_string());
        self
    }

    pub fn max_auto_advance(mut self, hops: usize) -> Self {
        self.max_auto_advance = Some(hops);
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::default(),
        };
        if let Some(node) = self.start_node {
            config.start_node = node;
        }
        if let Some(hops) = self.max_auto_advance {
            config.max_auto_advance = hops;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        let catalog = match (self.catalog, self.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => Catalog::load(&path)?,
            (None, None) => return Err(EngineError::MissingCatalog),
        };

        if catalog.node(&config.start_node).is_none() {
            log::warn!("start node '{}' is not in the catalog", config.start_node);
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Engine {
            catalog,
            config,
            rng,
        })
    }
}
