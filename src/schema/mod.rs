pub mod catalog;
pub mod stat;
pub mod state;
