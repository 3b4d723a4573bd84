//! Narrative Interpreter — runs data-driven branching stories.
//!
//! Interprets an authored catalog of narrative, decision, router, and outcome
//! nodes: evaluates conditions against player stats and flags, applies
//! clamped deltas and weighted random effects, auto-advances through routers,
//! and scores the ending against a literacy rubric.

pub mod core;
pub mod schema;

pub use crate::core::engine::{Engine, EngineBuilder, EngineConfig, EngineError};
pub use crate::core::view::NodeView;
pub use crate::schema::catalog::Catalog;
pub use crate::schema::state::GameState;
