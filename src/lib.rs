//! Weft - A chart parser for context-conditioned grammars.
//!
//! This is the main library crate that re-exports functionality from the
//! component crates in the workspace.

// Re-export the chart engine
pub use weft_chart_engine as engine;

pub use weft_chart_engine::{Expect, Forest, MatchRef, Parser, Polarity, RuleDef};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
