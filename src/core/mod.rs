pub mod condition;
pub mod delta;
pub mod engine;
pub mod lint;
pub mod probability;
pub mod router;
pub mod scoring;
pub mod transition;
pub mod view;
