/// Content catalog: the authored node graph and the rules around it.
///
/// The catalog is read-only once loaded. Loading runs structural validation
/// (every stat bounded, persona/location tables non-empty); graph-level
/// checks live in `core::lint`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use super::stat::{BoundsTable, Stat, StatBounds, Stats};
use super::state::GameState;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Signed adjustments keyed by stat symbol.
///
/// Keys that are not a known stat are carried but ignored when applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(pub BTreeMap<String, i32>);

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The amount for a stat, if the delta names it.
    pub fn get(&self, stat: Stat) -> Option<i32> {
        self.0.get(stat.key()).copied()
    }

    /// The entries naming one of `stats`, dropping everything else.
    pub fn restricted_to(&self, stats: &[Stat]) -> Delta {
        Delta(
            self.0
                .iter()
                .filter(|(key, _)| Stat::from_key(key).map_or(false, |s| stats.contains(&s)))
                .map(|(key, amount)| (key.clone(), *amount))
                .collect(),
        )
    }

    /// Keys that do not name a stat.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| Stat::from_key(k).is_none())
    }
}

impl<const N: usize> From<[(Stat, i32); N]> for Delta {
    fn from(entries: [(Stat, i32); N]) -> Self {
        Delta(
            entries
                .into_iter()
                .map(|(stat, amount)| (stat.key().to_string(), amount))
                .collect(),
        )
    }
}

/// A single flag name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagList {
    One(String),
    Many(Vec<String>),
}

impl FlagList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::One(flag) => std::slice::from_ref(flag),
            Self::Many(flags) => flags,
        };
        slice.iter().map(String::as_str)
    }
}

/// Per-stat inclusive gate on an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValueGate {
    #[serde(default)]
    pub min: Option<i32>,
    #[serde(default)]
    pub max: Option<i32>,
}

impl ValueGate {
    pub fn admits(&self, value: i32) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// One weighted entry of a probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityEntry {
    #[serde(default)]
    pub condition: Option<String>,
    pub chance: f64,
    #[serde(default)]
    pub effect: Delta,
}

/// Persona-specific replacement effects for an option.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonaOverride {
    #[serde(default)]
    pub delta: Option<Delta>,
    /// Replaces the option's own table when present, even if empty.
    #[serde(default)]
    pub probability: Option<Vec<ProbabilityEntry>>,
}

/// A player-selectable option on a decision node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub requires_flag: Option<String>,
    #[serde(default)]
    pub requires_value: BTreeMap<String, ValueGate>,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub flag: Option<FlagList>,
    #[serde(default)]
    pub probability: Vec<ProbabilityEntry>,
    #[serde(default)]
    pub persona_overrides: BTreeMap<String, PersonaOverride>,
    pub next: String,
}

impl Choice {
    /// Whether the option's flag and value gates admit the given state.
    ///
    /// Gates naming an unknown stat are ignored.
    pub fn is_available(&self, state: &GameState) -> bool {
        if let Some(ref flag) = self.requires_flag {
            if !state.has_flag(flag) {
                return false;
            }
        }
        self.requires_value.iter().all(|(key, gate)| match Stat::from_key(key) {
            Some(stat) => gate.admits(state.stats.get(stat)),
            None => true,
        })
    }

    pub fn persona_override(&self, persona: &str) -> Option<&PersonaOverride> {
        self.persona_overrides.get(persona)
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flag.iter().flat_map(FlagList::iter)
    }
}

/// Displayable text of a node, with optional persona/location variants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeText {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_by_persona: BTreeMap<String, String>,
    #[serde(default)]
    pub text_by_location: BTreeMap<String, String>,
}

impl NodeText {
    /// Location text wins over persona text, which wins over the base text.
    pub fn resolve(&self, persona: &str, location: &str) -> &str {
        self.text_by_location
            .get(location)
            .or_else(|| self.text_by_persona.get(persona))
            .or(self.text.as_ref())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// A conditional branch of a router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterBranch {
    /// A branch without a condition never matches.
    #[serde(rename = "if", default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub next: String,
    #[serde(default)]
    pub apply_delta: Delta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeNode {
    #[serde(flatten)]
    pub text: NodeText,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub next_by_location: Option<BTreeMap<String, String>>,
}

impl NarrativeNode {
    /// The successor for a location: the location branch if authored for
    /// it, else the plain `next`.
    pub fn successor(&self, location: &str) -> Option<&str> {
        self.next_by_location
            .as_ref()
            .and_then(|by_location| by_location.get(location))
            .or(self.next.as_ref())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionNode {
    #[serde(flatten)]
    pub text: NodeText,
    #[serde(default)]
    pub options: Vec<Choice>,
}

impl DecisionNode {
    pub fn option(&self, id: &str) -> Option<&Choice> {
        self.options.iter().find(|o| o.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterNode {
    #[serde(default)]
    pub conditions: Vec<RouterBranch>,
    #[serde(default)]
    pub default_next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterMultiNode {
    #[serde(default)]
    pub conditions: Vec<RouterBranch>,
    pub next_after_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeNode {
    #[serde(flatten)]
    pub text: NodeText,
}

/// One vertex of the content graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Narrative(NarrativeNode),
    Decision(DecisionNode),
    Router(RouterNode),
    RouterMulti(RouterMultiNode),
    Outcome(OutcomeNode),
}

impl Node {
    /// The `type` tag as written in content.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Narrative(_) => "narrative",
            Self::Decision(_) => "decision",
            Self::Router(_) => "router",
            Self::RouterMulti(_) => "router_multi",
            Self::Outcome(_) => "outcome",
        }
    }

    /// Narrative and decision nodes wait for the player.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Narrative(_) | Self::Decision(_))
    }

    pub fn text(&self) -> Option<&NodeText> {
        match self {
            Self::Narrative(n) => Some(&n.text),
            Self::Decision(n) => Some(&n.text),
            Self::Outcome(n) => Some(&n.text),
            Self::Router(_) | Self::RouterMulti(_) => None,
        }
    }

    /// Every node id this node can lead to, in authored order.
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Self::Narrative(n) => {
                let mut out: Vec<&str> = n
                    .next_by_location
                    .iter()
                    .flat_map(|m| m.values().map(String::as_str))
                    .collect();
                out.extend(n.next.as_deref());
                out
            }
            Self::Decision(n) => n.options.iter().map(|o| o.next.as_str()).collect(),
            Self::Router(n) => {
                let mut out: Vec<&str> = n.conditions.iter().map(|c| c.next.as_str()).collect();
                out.extend(n.default_next.as_deref());
                out
            }
            Self::RouterMulti(n) => {
                let mut out: Vec<&str> = n.conditions.iter().map(|c| c.next.as_str()).collect();
                out.push(n.next_after_feedback.as_str());
                out
            }
            Self::Outcome(_) => Vec::new(),
        }
    }
}

/// An ending, chosen by the lowest-priority rule whose condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRule {
    pub condition: String,
    #[serde(default)]
    pub priority: i32,
    pub result: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A rubric entry. The first present matcher decides:
/// `condition`, then `if`, then `if_flag`, then `if_any_flag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteracyRule {
    pub id: String,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(rename = "if", default)]
    pub if_expr: Option<String>,
    #[serde(default)]
    pub if_flag: Option<String>,
    #[serde(default)]
    pub if_any_flag: Option<Vec<String>>,
    #[serde(default, alias = "explanation")]
    pub explain_success: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiteracyScoring {
    #[serde(default)]
    pub rules: Vec<LiteracyRule>,
    #[serde(default)]
    pub max_score: i32,
}

/// Bounds and starting values for stats.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemSection {
    #[serde(default)]
    pub variables: BTreeMap<String, StatBounds>,
    #[serde(default)]
    pub skills: BTreeMap<String, StatBounds>,
    #[serde(default)]
    pub initial_values: BTreeMap<String, i32>,
}

/// Start-of-game adjustment for a persona or location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartProfile {
    #[serde(default)]
    pub delta: Delta,
}

// The on-disk shape. `Catalog` is built from it after validation.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    version: Option<String>,
    system: SystemSection,
    personas: BTreeMap<String, StartProfile>,
    locations: BTreeMap<String, StartProfile>,
    #[serde(default)]
    persona_info: BTreeMap<String, String>,
    #[serde(default)]
    location_info: BTreeMap<String, String>,
    nodes: HashMap<String, Node>,
    #[serde(default)]
    outcomes: Vec<OutcomeRule>,
    #[serde(default)]
    literacy_scoring: LiteracyScoring,
}

/// The validated, read-only content catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub version: Option<String>,
    pub system: SystemSection,
    pub personas: BTreeMap<String, StartProfile>,
    pub locations: BTreeMap<String, StartProfile>,
    pub persona_info: BTreeMap<String, String>,
    pub location_info: BTreeMap<String, String>,
    pub nodes: HashMap<String, Node>,
    pub outcomes: Vec<OutcomeRule>,
    pub literacy_scoring: LiteracyScoring,
    bounds: BoundsTable,
}

impl Catalog {
    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Catalog, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a catalog from a JSON string.
    pub fn from_json_str(input: &str) -> Result<Catalog, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(input)?;
        Self::from_document(doc)
    }

    fn from_document(doc: CatalogDocument) -> Result<Catalog, CatalogError> {
        let mut bounds = BoundsTable::uniform(StatBounds::new(0, 0));
        for stat in Stat::ALL {
            let (primary, secondary) = if stat.is_skill() {
                (&doc.system.skills, &doc.system.variables)
            } else {
                (&doc.system.variables, &doc.system.skills)
            };
            let b = primary
                .get(stat.key())
                .or_else(|| secondary.get(stat.key()))
                .copied()
                .ok_or_else(|| {
                    CatalogError::Invalid(format!("no bounds authored for stat '{}'", stat))
                })?;
            if b.min > b.max {
                return Err(CatalogError::Invalid(format!(
                    "bounds for stat '{}' have min {} > max {}",
                    stat, b.min, b.max
                )));
            }
            bounds.set(stat, b);
        }

        if doc.personas.is_empty() {
            return Err(CatalogError::Invalid("no personas authored".to_string()));
        }
        if doc.locations.is_empty() {
            return Err(CatalogError::Invalid("no locations authored".to_string()));
        }

        Ok(Catalog {
            version: doc.version,
            system: doc.system,
            personas: doc.personas,
            locations: doc.locations,
            persona_info: doc.persona_info,
            location_info: doc.location_info,
            nodes: doc.nodes,
            outcomes: doc.outcomes,
            literacy_scoring: doc.literacy_scoring,
            bounds,
        })
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn bounds(&self) -> &BoundsTable {
        &self.bounds
    }

    /// Authored starting values, clamped. Unauthored stats start at 0.
    pub fn initial_stats(&self) -> Stats {
        let mut stats = Stats::default();
        for stat in Stat::ALL {
            let base = self
                .system
                .initial_values
                .get(stat.key())
                .copied()
                .unwrap_or(0);
            stats.set(stat, self.bounds.get(stat).clamp(base));
        }
        stats
    }
}
